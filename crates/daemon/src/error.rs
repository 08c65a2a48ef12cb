use crate::Zone;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("request to {url} returned HTTP {status}")]
    HttpStatus { url: String, status: u16 },
    #[error("login page has no `{0}`, the form layout has probably changed")]
    TokenNotFound(&'static str),
    #[error("login rejected (HTTP {status}), check credentials")]
    LoginRejected { status: u16 },
    #[error("page for zone {zone} does not contain `{marker}`")]
    IncorrectPage { zone: Zone, marker: &'static str },
    #[error("page for zone {zone} has no table matching `{selector}`")]
    TableNotFound { zone: Zone, selector: &'static str },
    #[error("row {row} has {found} cells but the header has {expected}")]
    MalformedRow {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("{location}: field `{field}` {reason}")]
    Parse {
        location: String,
        field: String,
        reason: String,
    },
    #[error("invalid selector `{0}`")]
    Selector(String),
}

impl Error {
    /// Network failures and non-success HTTP statuses.
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Request { .. } | Error::HttpStatus { .. })
    }

    pub(crate) fn missing_field(location: impl Into<String>, field: &str) -> Self {
        Error::Parse {
            location: location.into(),
            field: field.to_string(),
            reason: String::from("is missing"),
        }
    }
}
