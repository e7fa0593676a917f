//! Platform API errors

/// Errors surfaced by the remote platform collaborator.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Transport-level failure (connect, TLS, body read)
    #[error("http transport error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success response from the platform
    #[error("{method} {endpoint} failed with {status}: {body}")]
    Status {
        method: &'static str,
        endpoint: String,
        status: u16,
        body: String,
    },

    /// Access token could not be signed
    #[error("access token generation failed: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    /// Response body did not match the expected shape
    #[error("malformed response from {endpoint}: {source}")]
    MalformedResponse {
        endpoint: String,
        #[source]
        source: serde_json::Error,
    },

    /// Required environment variable absent
    #[error("missing environment variable {name}")]
    MissingEnv { name: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_error_display() {
        let err = ApiError::Status {
            method: "POST",
            endpoint: "flows".into(),
            status: 422,
            body: "invalid".into(),
        };
        assert_eq!(err.to_string(), "POST flows failed with 422: invalid");
    }

    #[test]
    fn missing_env_display() {
        let err = ApiError::MissingEnv {
            name: "EXPORT_WORKSPACE_KEY".into(),
        };
        assert!(err.to_string().contains("EXPORT_WORKSPACE_KEY"));
    }
}
