use scraper::Html;
use slog::{debug, info, Logger};
use std::{fmt, sync::Arc};

use crate::{records::parse_selector, Error, Transport};

/// Present in every page rendered for a logged-in user.
pub const LOGIN_SUCCESS_MARKER: &str = "kit.js";

const VIEW_STATE: &str = "__VIEWSTATE";
const VIEW_STATE_GENERATOR: &str = "__VIEWSTATEGENERATOR";
const EVENT_VALIDATION: &str = "__EVENTVALIDATION";
const LOGIN_BUTTON_ID: &str = "ctl01_CentralHolder_MLogin_LoginButton";

const USERNAME_FIELD: &str = "ctl01$CentralHolder$MLogin$UserName";
const PASSWORD_FIELD: &str = "ctl01$CentralHolder$MLogin$Password";
const LOGIN_BUTTON_FIELD: &str = "ctl01$CentralHolder$MLogin$LoginButton";

#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"********")
            .finish()
    }
}

/// Anti-forgery values the login form must echo back.
#[derive(Debug, Clone, PartialEq)]
pub struct LoginTokens {
    pub view_state: String,
    pub view_state_generator: String,
    pub event_validation: String,
    pub login_button: String,
}

impl LoginTokens {
    /// Full POST body for the login form.
    pub fn into_form(self, credentials: &Credentials) -> Vec<(String, String)> {
        vec![
            (String::from("__EVENTTARGET"), String::new()),
            (String::from("__EVENTARGUMENT"), String::new()),
            (String::from(VIEW_STATE), self.view_state),
            (String::from(VIEW_STATE_GENERATOR), self.view_state_generator),
            (String::from(EVENT_VALIDATION), self.event_validation),
            (String::from(USERNAME_FIELD), credentials.username.clone()),
            (String::from(PASSWORD_FIELD), credentials.password.clone()),
            (String::from(LOGIN_BUTTON_FIELD), self.login_button),
        ]
    }
}

/// Reads the hidden inputs and the submit button value out of the login page.
pub fn parse_login_tokens(body: &str) -> Result<LoginTokens, Error> {
    let document = Html::parse_document(body);
    let form_selector = parse_selector("body > form")?;
    let form = document
        .select(&form_selector)
        .next()
        .ok_or(Error::TokenNotFound("form"))?;

    let input_value = |id: &'static str| -> Result<String, Error> {
        let selector = parse_selector(&format!("input#{}", id))?;
        form.select(&selector)
            .next()
            .and_then(|input| input.value().attr("value"))
            .map(str::to_string)
            .ok_or(Error::TokenNotFound(id))
    };

    // The button may sit outside the form in older layouts
    let button_selector = parse_selector(&format!("input#{}", LOGIN_BUTTON_ID))?;
    let login_button = document
        .select(&button_selector)
        .next()
        .and_then(|input| input.value().attr("value"))
        .map(str::to_string)
        .ok_or(Error::TokenNotFound(LOGIN_BUTTON_ID))?;

    Ok(LoginTokens {
        view_state: input_value(VIEW_STATE)?,
        view_state_generator: input_value(VIEW_STATE_GENERATOR)?,
        event_validation: input_value(EVENT_VALIDATION)?,
        login_button,
    })
}

/// Logged-in HTTP client, cookies included.
#[derive(Clone)]
pub struct Session {
    transport: Arc<dyn Transport>,
}

impl Session {
    pub fn transport(&self) -> &dyn Transport {
        self.transport.as_ref()
    }
}

pub struct SessionManager {
    logger: Logger,
    login_url: String,
}

impl SessionManager {
    pub fn new(logger: Logger, login_url: String) -> Self {
        Self { logger, login_url }
    }

    /// Performs the GET/POST login handshake on `transport`.
    ///
    /// No retries: a rejected login or a changed form layout is reported as is.
    pub async fn login(
        &self,
        transport: Arc<dyn Transport>,
        credentials: &Credentials,
    ) -> Result<Session, Error> {
        debug!(self.logger, "requesting login page: {}", self.login_url);
        let login_page = transport.get(&self.login_url).await?;
        if !login_page.is_success() {
            return Err(Error::HttpStatus {
                url: self.login_url.clone(),
                status: login_page.status,
            });
        }

        let tokens = parse_login_tokens(&login_page.body)?;
        debug!(self.logger, "login tokens found, submitting credentials");

        let response = transport
            .post_form(&self.login_url, tokens.into_form(credentials))
            .await?;
        if !response.body.contains(LOGIN_SUCCESS_MARKER) {
            return Err(Error::LoginRejected {
                status: response.status,
            });
        }

        info!(self.logger, "logged in"; "user" => &credentials.username, "status" => response.status);
        Ok(Session { transport })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{http::MockTransport, Page};
    use mockall::Sequence;

    const LOGIN_URL: &str = "http://amp.example.test/LoginPage.aspx";

    fn login_page(omit: Option<&str>) -> String {
        let input = |id: &str, value: &str| {
            if omit == Some(id) {
                String::new()
            } else {
                format!(r#"<input type="hidden" name="{id}" id="{id}" value="{value}" />"#)
            }
        };
        format!(
            r#"<html><head><title>Вход</title></head><body><form method="post" action="./LoginPage.aspx">
            <div class="aspNetHidden">{}{}{}</div>
            <div><input type="submit" id="{}" value="Войти" /></div>
            </form></body></html>"#,
            input(VIEW_STATE, "dDwtMTA4MzE0MjEwNTs7Pg=="),
            input(VIEW_STATE_GENERATOR, "C2EE9ABB"),
            input(EVENT_VALIDATION, "/wEdAAT4"),
            LOGIN_BUTTON_ID,
        )
    }

    fn credentials() -> Credentials {
        Credentials {
            username: String::from("observer"),
            password: String::from("s3cret"),
        }
    }

    fn logger() -> Logger {
        Logger::root(slog::Discard, slog::o!())
    }

    #[test]
    fn parses_all_tokens() {
        let tokens = parse_login_tokens(&login_page(None)).unwrap();
        assert_eq!(
            tokens,
            LoginTokens {
                view_state: String::from("dDwtMTA4MzE0MjEwNTs7Pg=="),
                view_state_generator: String::from("C2EE9ABB"),
                event_validation: String::from("/wEdAAT4"),
                login_button: String::from("Войти"),
            }
        );
    }

    #[test]
    fn each_missing_token_is_reported_by_name() {
        for id in [VIEW_STATE, VIEW_STATE_GENERATOR, EVENT_VALIDATION, LOGIN_BUTTON_ID] {
            let body = if id == LOGIN_BUTTON_ID {
                login_page(None).replace(LOGIN_BUTTON_ID, "SomeOtherButton")
            } else {
                login_page(Some(id))
            };
            match parse_login_tokens(&body) {
                Err(Error::TokenNotFound(name)) => assert_eq!(name, id),
                other => panic!("expected TokenNotFound({id}), got {other:?}"),
            }
        }
    }

    #[test]
    fn page_without_form_has_no_tokens() {
        assert!(matches!(
            parse_login_tokens("<html><body><p>maintenance</p></body></html>"),
            Err(Error::TokenNotFound("form"))
        ));
    }

    #[test]
    fn form_carries_tokens_and_credentials() {
        let form = parse_login_tokens(&login_page(None))
            .unwrap()
            .into_form(&credentials());
        let names: Vec<_> = form.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "__EVENTTARGET",
                "__EVENTARGUMENT",
                VIEW_STATE,
                VIEW_STATE_GENERATOR,
                EVENT_VALIDATION,
                USERNAME_FIELD,
                PASSWORD_FIELD,
                LOGIN_BUTTON_FIELD,
            ]
        );
        assert_eq!(form[0].1, "");
        assert_eq!(form[1].1, "");
        assert_eq!(form[5].1, "observer");
        assert_eq!(form[6].1, "s3cret");
        assert_eq!(form[7].1, "Войти");
    }

    #[test]
    fn debug_hides_password() {
        let printed = format!("{:?}", credentials());
        assert!(printed.contains("observer"));
        assert!(!printed.contains("s3cret"));
    }

    #[tokio::test]
    async fn login_posts_tokens_and_accepts_marker() {
        let mut transport = MockTransport::new();
        let mut seq = Sequence::new();
        transport
            .expect_get()
            .withf(|url| url == LOGIN_URL)
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(Page::new(200, login_page(None))));
        transport
            .expect_post_form()
            .withf(|url, form| {
                url == LOGIN_URL
                    && form.contains(&(String::from(VIEW_STATE), String::from("dDwtMTA4MzE0MjEwNTs7Pg==")))
                    && form.contains(&(String::from(PASSWORD_FIELD), String::from("s3cret")))
            })
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| {
                Ok(Page::new(
                    200,
                    r#"<html><head><script src="/js/kit.js"></script></head></html>"#,
                ))
            });

        let manager = SessionManager::new(logger(), String::from(LOGIN_URL));
        let session = manager.login(Arc::new(transport), &credentials()).await;
        assert!(session.is_ok());
    }

    #[tokio::test]
    async fn missing_token_stops_before_post() {
        let mut transport = MockTransport::new();
        transport
            .expect_get()
            .times(1)
            .returning(|_| Ok(Page::new(200, login_page(Some(EVENT_VALIDATION)))));
        transport.expect_post_form().never();

        let manager = SessionManager::new(logger(), String::from(LOGIN_URL));
        let result = manager.login(Arc::new(transport), &credentials()).await;
        assert!(matches!(result, Err(Error::TokenNotFound(EVENT_VALIDATION))));
    }

    #[tokio::test]
    async fn ok_status_without_marker_is_rejected() {
        let mut transport = MockTransport::new();
        transport
            .expect_get()
            .returning(|_| Ok(Page::new(200, login_page(None))));
        transport
            .expect_post_form()
            .times(1)
            .returning(|_, _| Ok(Page::new(200, login_page(None))));

        let manager = SessionManager::new(logger(), String::from(LOGIN_URL));
        let result = manager.login(Arc::new(transport), &credentials()).await;
        assert!(matches!(result, Err(Error::LoginRejected { status: 200 })));
    }

    #[tokio::test]
    async fn login_page_error_status_is_transport_error() {
        let mut transport = MockTransport::new();
        transport
            .expect_get()
            .returning(|_| Ok(Page::new(503, "Service Unavailable")));
        transport.expect_post_form().never();

        let manager = SessionManager::new(logger(), String::from(LOGIN_URL));
        let err = manager
            .login(Arc::new(transport), &credentials())
            .await
            .err()
            .unwrap();
        assert!(err.is_transport());
        assert!(matches!(err, Error::HttpStatus { status: 503, .. }));
    }
}
