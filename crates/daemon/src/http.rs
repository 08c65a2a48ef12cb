use async_trait::async_trait;
use encoding_rs::{Encoding, UTF_8};
use reqwest::{
    header::{self, HeaderMap, HeaderValue},
    Client,
};
use std::time::Duration;

use crate::Error;

/// Status and decoded body of one HTTP exchange.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub status: u16,
    pub body: String,
}

impl Page {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// HTTP client that keeps cookies between calls.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, url: &str) -> Result<Page, Error>;
    async fn post_form(&self, url: &str, form: Vec<(String, String)>) -> Result<Page, Error>;
}

#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub user_agent: String,
    pub origin: String,
    pub timeout: Duration,
}

pub fn default_headers(settings: &ClientSettings) -> Result<HeaderMap, anyhow::Error> {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::ACCEPT_LANGUAGE,
        HeaderValue::from_static("ru-RU,ru;q=0.8,en-US;q=0.5,en;q=0.3"),
    );
    headers.insert(
        header::USER_AGENT,
        HeaderValue::from_str(&settings.user_agent)?,
    );
    headers.insert(
        header::ACCEPT,
        HeaderValue::from_static(
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
        ),
    );
    headers.insert(header::ACCEPT_ENCODING, HeaderValue::from_static("gzip"));
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("max-age=0"));
    headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
    headers.insert(header::ORIGIN, HeaderValue::from_str(&settings.origin)?);
    Ok(headers)
}

pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(settings: &ClientSettings) -> Result<Self, anyhow::Error> {
        let client = Client::builder()
            .cookie_store(true)
            .default_headers(default_headers(settings)?)
            .timeout(settings.timeout)
            .build()?;
        Ok(Self { client })
    }

    async fn read(url: &str, response: reqwest::Response) -> Result<Page, Error> {
        let status = response.status().as_u16();
        let header_charset = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .and_then(charset_label);
        let bytes = response.bytes().await.map_err(|source| Error::Request {
            url: url.to_string(),
            source,
        })?;
        Ok(Page {
            status,
            body: decode_body(&bytes, header_charset.as_deref()),
        })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn get(&self, url: &str) -> Result<Page, Error> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| Error::Request {
                url: url.to_string(),
                source,
            })?;
        Self::read(url, response).await
    }

    async fn post_form(&self, url: &str, form: Vec<(String, String)>) -> Result<Page, Error> {
        let response = self
            .client
            .post(url)
            .form(&form)
            .send()
            .await
            .map_err(|source| Error::Request {
                url: url.to_string(),
                source,
            })?;
        Self::read(url, response).await
    }
}

/// How far into the body a `<meta charset>` is looked for.
const META_SNIFF_LEN: usize = 1024;

/// Decodes a response body.
///
/// The charset comes from the `Content-Type` header, else from a `<meta>` tag
/// near the top of the document, else UTF-8. A byte order mark overrides all three.
pub fn decode_body(bytes: &[u8], header_charset: Option<&str>) -> String {
    let encoding = header_charset
        .and_then(|label| Encoding::for_label(label.as_bytes()))
        .or_else(|| {
            let head = String::from_utf8_lossy(&bytes[..bytes.len().min(META_SNIFF_LEN)]);
            charset_label(&head).and_then(|label| Encoding::for_label(label.as_bytes()))
        })
        .unwrap_or(UTF_8);
    let (text, _, _) = encoding.decode(bytes);
    text.into_owned()
}

// Value of the first `charset=` parameter, lowercased and unquoted.
fn charset_label(text: &str) -> Option<String> {
    let lower = text.to_ascii_lowercase();
    let start = lower.find("charset=")? + "charset=".len();
    let label: String = lower[start..]
        .trim_start_matches(['"', '\''])
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | ':'))
        .collect();
    (!label.is_empty()).then_some(label)
}
