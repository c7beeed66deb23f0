use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Unauthorized - token may be expired")]
    Unauthorized,

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Rate limited - please wait before retrying")]
    RateLimited,

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let mut end = MAX_ERROR_BODY_LENGTH;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
        }
    }

    /// Pull the `message` field out of a JSON error body, if there is one
    fn message_from_body(body: &str) -> Option<String> {
        let value: serde_json::Value = serde_json::from_str(body).ok()?;
        value
            .get("message")
            .and_then(|m| m.as_str())
            .map(str::to_string)
    }

    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let detail = Self::message_from_body(body).unwrap_or_else(|| Self::truncate_body(body));
        match status.as_u16() {
            401 => ApiError::Unauthorized,
            403 => ApiError::AccessDenied(detail),
            404 => ApiError::NotFound(detail),
            429 => ApiError::RateLimited,
            500..=599 => ApiError::ServerError(detail),
            _ => ApiError::InvalidResponse(format!("Status {}: {}", status, detail)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn test_from_status_mapping() {
        assert!(matches!(
            ApiError::from_status(StatusCode::UNAUTHORIZED, ""),
            ApiError::Unauthorized
        ));
        assert!(matches!(
            ApiError::from_status(StatusCode::TOO_MANY_REQUESTS, ""),
            ApiError::RateLimited
        ));
        assert!(matches!(
            ApiError::from_status(StatusCode::BAD_GATEWAY, "upstream"),
            ApiError::ServerError(ref s) if s == "upstream"
        ));
    }

    #[test]
    fn test_from_status_uses_json_message() {
        let err = ApiError::from_status(StatusCode::FORBIDDEN, r#"{"message":"Admins only"}"#);
        assert_eq!(err.to_string(), "Access denied: Admins only");
    }

    #[test]
    fn test_truncate_body() {
        let long = "x".repeat(MAX_ERROR_BODY_LENGTH + 20);
        let truncated = ApiError::truncate_body(&long);
        assert!(truncated.ends_with(&format!("(truncated, {} total bytes)", long.len())));
        assert_eq!(ApiError::truncate_body("short"), "short");
    }
}
