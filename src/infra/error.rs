use thiserror::Error;

#[derive(Debug, Error)]
pub enum InfraError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// Non-2xx answer; `message` is the server's error field when it sent one.
    #[error("{}", describe_status(*status, message.as_deref()))]
    Status { status: u16, message: Option<String> },
    #[error("http error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),
    #[error("unexpected response: {message}")]
    Decode { message: String },
    #[error("file watcher error: {message}")]
    Watch { message: String },
    #[error("telemetry initialization failed: {0}")]
    Telemetry(String),
    #[error("configuration error: {message}")]
    Configuration { message: String },
    #[error("`{segment}` cannot be used as a resource id")]
    InvalidSegment { segment: String },
}

impl InfraError {
    pub fn status(status: u16, message: Option<String>) -> Self {
        Self::Status { status, message }
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    pub fn watch(message: impl Into<String>) -> Self {
        Self::Watch {
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn telemetry(message: impl Into<String>) -> Self {
        Self::Telemetry(message.into())
    }
}

impl From<notify::Error> for InfraError {
    fn from(err: notify::Error) -> Self {
        Self::watch(err.to_string())
    }
}

pub(crate) fn describe_status(status: u16, message: Option<&str>) -> String {
    match message {
        Some(message) => format!("request failed ({status}): {message}"),
        None => format!("request failed with status {status}"),
    }
}
