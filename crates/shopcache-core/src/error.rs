use std::time::Duration;

use thiserror::Error;

use crate::resource::ResourceKey;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to load {key}: {cause:#}")]
    Fetch { key: ResourceKey, cause: anyhow::Error },

    #[error("Timed out loading {key} after {}s", .after.as_secs_f32())]
    Timeout { key: ResourceKey, after: Duration },

    #[error("Shop stock requires a user with an assigned shop")]
    MissingShop,

    #[error("Discarded {0} - the store was reset or a newer preload started")]
    Superseded(ResourceKey),
}

impl StoreError {
    pub fn key(&self) -> Option<ResourceKey> {
        match self {
            StoreError::Fetch { key, .. } | StoreError::Timeout { key, .. } => Some(*key),
            StoreError::Superseded(key) => Some(*key),
            StoreError::MissingShop => Some(ResourceKey::SubStocks),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_error_includes_cause_chain() {
        let cause = anyhow::anyhow!("connection refused").context("Failed to send GET request");
        let err = StoreError::Fetch {
            key: ResourceKey::Brands,
            cause,
        };
        let message = err.to_string();
        assert!(message.starts_with("Failed to load brands"));
        assert!(message.contains("connection refused"));
    }

    #[test]
    fn test_timeout_message() {
        let err = StoreError::Timeout {
            key: ResourceKey::Products,
            after: Duration::from_millis(1500),
        };
        assert_eq!(err.to_string(), "Timed out loading products after 1.5s");
        assert_eq!(err.key(), Some(ResourceKey::Products));
    }
}
