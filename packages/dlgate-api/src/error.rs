use hyper::StatusCode;
use thiserror::Error;

/// Request-handling failure taxonomy. Validation errors carry the first
/// failing check's message verbatim; upstream failures stay generic so
/// dependency details do not leak to clients.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Upstream(String),
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn upstream(message: impl Into<String>) -> Self {
        Self::Upstream(message.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ApiError::validation("bad input").status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::not_found("no such product").status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::upstream("mail relay failed").status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
