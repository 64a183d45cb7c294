use serde_json::Value;

/// Coarse classification of a failed request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Network failure or an unparsable body. No structured payload.
    Transport,
    /// 4xx other than 404; the payload maps fields to messages.
    Validation,
    /// 404.
    NotFound,
    /// 5xx.
    Server,
}

/// A non-2xx response from the API.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRejection {
    /// HTTP status code.
    pub status: u16,
    /// Canonical reason phrase for `status`.
    pub status_text: String,
    /// Parsed error body when the server returned JSON.
    pub payload: Option<Value>,
}

impl ApiRejection {
    pub fn kind(&self) -> ErrorKind {
        match self.status {
            404 => ErrorKind::NotFound,
            400..=499 => ErrorKind::Validation,
            _ => ErrorKind::Server,
        }
    }

    /// Message for the user: status line, then the first payload field.
    ///
    /// `{"sequence": ["Invalid code"]}` on a 400 becomes
    /// `"400: Bad Request\nInvalid code"`.
    pub fn snackify(&self) -> String {
        let detail = match &self.payload {
            Some(Value::Object(fields)) => fields.values().next().map(display_value),
            Some(Value::Null) | None => None,
            Some(other) => Some(display_value(other)),
        };
        format!(
            "{}: {}\n{}",
            self.status,
            self.status_text,
            detail.unwrap_or_default()
        )
    }
}

/// Render a JSON value the way a browser stringifies it: strings bare,
/// arrays comma-joined.
fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(display_value)
            .collect::<Vec<_>>()
            .join(","),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

impl std::fmt::Display for ApiRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.status, self.status_text)
    }
}

/// Errors from the REST transport layer.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The HTTP request itself failed (network, DNS, timeout, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The API answered with a non-2xx status.
    #[error("API rejected request: {0}")]
    Rejected(ApiRejection),

    /// A 2xx body did not have the expected shape.
    #[error("Unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),

    /// Invalid client configuration.
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl ClientError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ClientError::Rejected(rejection) => rejection.kind(),
            ClientError::Request(_) | ClientError::Decode(_) | ClientError::Config(_) => {
                ErrorKind::Transport
            }
        }
    }

    pub fn rejection(&self) -> Option<&ApiRejection> {
        match self {
            ClientError::Rejected(rejection) => Some(rejection),
            _ => None,
        }
    }

    /// Text suitable for a user notification.
    pub fn user_message(&self) -> String {
        match self {
            ClientError::Rejected(rejection) => rejection.snackify(),
            other => other.to_string(),
        }
    }
}
