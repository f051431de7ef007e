//! Store Error Types
//!
//! Only fatal conditions are errors: lock-discipline violations, lock
//! timeouts, misconfiguration and rejected construction input. Recoverable
//! validation failures are reported through the diagnostic sink and surface
//! as `Ok(false)` / `Ok(None)` instead.

use crate::models::InitNode;
use thiserror::Error;

/// Fatal store errors
#[derive(Error, Debug)]
pub enum StoreError {
    /// Operation invoked in safe mode without holding the index lock
    #[error("please lock the index to access it")]
    LockNotHeld,

    /// Lock acquisition gave up; nothing was mutated
    #[error("timed out after {timeout_ms}ms waiting for the index lock")]
    LockTimeout { timeout_ms: u64 },

    /// Construction-time configuration error
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// One or more construction items failed validation
    #[error("unable to create nodes from items:\n{}", render_items(.items))]
    RejectedItems { items: Vec<InitNode> },

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    /// Create an invalid configuration error
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Create a rejected items error
    pub fn rejected_items(items: Vec<InitNode>) -> Self {
        Self::RejectedItems { items }
    }

    /// Create a lock timeout error
    pub fn lock_timeout(timeout_ms: u64) -> Self {
        Self::LockTimeout { timeout_ms }
    }
}

fn render_items(items: &[InitNode]) -> String {
    serde_json::to_string(items).unwrap_or_else(|_| format!("{:?}", items))
}

pub type Result<T> = std::result::Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NodeInit;

    #[test]
    fn test_rejected_items_message_lists_items() {
        let err = StoreError::rejected_items(vec![InitNode::new(
            NodeInit::with_id("2"),
            Default::default(),
        )]);
        let msg = err.to_string();
        assert!(msg.starts_with("unable to create nodes from items:"));
        assert!(msg.contains("\"id\":\"2\""));
    }

    #[test]
    fn test_lock_messages() {
        assert_eq!(
            StoreError::LockNotHeld.to_string(),
            "please lock the index to access it"
        );
        assert!(StoreError::lock_timeout(50).to_string().contains("50ms"));
    }
}
