use reqwest::StatusCode;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, PlannerError>;

#[derive(Debug, Error)]
pub enum PlannerError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server returned {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("request was not authorized")]
    Unauthorized,

    #[error("not signed in")]
    NotAuthenticated,

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid input: {message}")]
    Invalid { message: String },
}

impl PlannerError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }

    /// Build the error for a non-success response.
    pub fn from_status(status: StatusCode, body: String) -> Self {
        if status == StatusCode::UNAUTHORIZED {
            Self::Unauthorized
        } else {
            Self::Status { status, body }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unauthorized_status_maps_to_dedicated_variant() {
        let err = PlannerError::from_status(StatusCode::UNAUTHORIZED, String::new());
        assert!(matches!(err, PlannerError::Unauthorized));
    }

    #[test]
    fn other_status_keeps_body() {
        let err = PlannerError::from_status(StatusCode::BAD_REQUEST, "bad day".into());
        assert_eq!(err.to_string(), "server returned 400 Bad Request: bad day");
    }
}
