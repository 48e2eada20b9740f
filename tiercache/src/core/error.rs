use thiserror::Error;

/// Main error type for tiered cache operations
#[derive(Debug, Error)]
pub enum CacheError {
    /// Generic layer failure; displays the message verbatim
    #[error("{0}")]
    Layer(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[cfg(feature = "redis")]
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// A broadcast write stopped at `level`; earlier levels were already applied
    #[error("cache layer {level} ({name}) {op} failed: {source}")]
    Broadcast {
        op: &'static str,
        level: usize,
        name: String,
        #[source]
        source: Box<CacheError>,
    },
}

impl CacheError {
    /// Build a generic layer error from a message
    pub fn layer(message: impl Into<String>) -> Self {
        Self::Layer(message.into())
    }

    /// 1-based level a broadcast write failed at
    pub fn failed_level(&self) -> Option<usize> {
        match self {
            Self::Broadcast { level, .. } => Some(*level),
            _ => None,
        }
    }
}

/// Result type alias for tiered cache operations
pub type Result<T> = std::result::Result<T, CacheError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layer_error_displays_verbatim() {
        assert_eq!(CacheError::layer("l1 error").to_string(), "l1 error");
    }

    #[test]
    fn test_broadcast_error_names_level() {
        let err = CacheError::Broadcast {
            op: "batch_delete",
            level: 2,
            name: "l2".to_string(),
            source: Box::new(CacheError::layer("boom")),
        };
        assert_eq!(err.failed_level(), Some(2));
        assert_eq!(err.to_string(), "cache layer 2 (l2) batch_delete failed: boom");
        assert_eq!(CacheError::layer("boom").failed_level(), None);
    }
}
