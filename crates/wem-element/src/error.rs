//! Element model errors

/// Errors raised while interpreting wire documents.
#[derive(Debug, thiserror::Error)]
pub enum ElementError {
    /// Document root was not a JSON object
    #[error("element document is not an object")]
    NotAnObject,

    /// Required `key` attribute missing or not a string
    #[error("element document has no key")]
    MissingKey,

    /// Connector/integration document failed to deserialize
    #[error("malformed {entity} document: {source}")]
    MalformedEntity {
        entity: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        assert_eq!(
            ElementError::MissingKey.to_string(),
            "element document has no key"
        );
    }
}
