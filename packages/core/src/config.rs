//! Index configuration
//!
//! Configuration is plain serde data so it can be embedded in a host
//! application's own settings file. Field names are camelCase on the wire.

use crate::db::{Result, StoreError};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for a node index
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IndexConfig {
    /// Data fields whose values must be unique across nodes
    pub uniq_keys: Option<Vec<String>>,

    /// Data field that identifies (and creates) zombie placeholders
    pub zombie_key: Option<String>,

    /// Maintain a value → id secondary index for each unique field
    pub index_uniq_keys: bool,

    /// Custom id alphabet and length
    pub nanoid: Option<IdConfig>,

    /// Locking discipline
    pub thread: Option<ThreadConfig>,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            uniq_keys: None,
            zombie_key: None,
            index_uniq_keys: true,
            nanoid: None,
            thread: None,
        }
    }
}

/// Parameters for alphabet-based id generation. Both fields are required.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdConfig {
    pub alphabet: Option<String>,
    pub size: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ThreadConfig {
    /// Require the index lock to be held for every operation
    pub safe: bool,

    /// Give up waiting for the lock after this many milliseconds
    pub timeout_ms: Option<u64>,
}

impl IndexConfig {
    /// Parse a configuration from JSON
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn with_uniq_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.uniq_keys = Some(keys.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_zombie_key(mut self, key: impl Into<String>) -> Self {
        self.zombie_key = Some(key.into());
        self
    }

    pub fn with_nanoid(mut self, alphabet: impl Into<String>, size: usize) -> Self {
        self.nanoid = Some(IdConfig {
            alphabet: Some(alphabet.into()),
            size: Some(size),
        });
        self
    }

    pub fn thread_safe(mut self, timeout: Option<Duration>) -> Self {
        self.thread = Some(ThreadConfig {
            safe: true,
            timeout_ms: timeout.map(|t| t.as_millis() as u64),
        });
        self
    }

    pub fn is_safe(&self) -> bool {
        self.thread.as_ref().is_some_and(|thread| thread.safe)
    }

    pub fn lock_timeout(&self) -> Option<Duration> {
        self.thread
            .as_ref()
            .and_then(|thread| thread.timeout_ms)
            .map(Duration::from_millis)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if let Some(nanoid) = &self.nanoid {
            match (&nanoid.alphabet, nanoid.size) {
                (Some(alphabet), Some(size)) => {
                    if alphabet.is_empty() {
                        return Err(StoreError::invalid_config("nanoid alphabet cannot be empty"));
                    }
                    if size == 0 {
                        return Err(StoreError::invalid_config(
                            "nanoid size must be greater than 0",
                        ));
                    }
                }
                _ => {
                    return Err(StoreError::invalid_config(
                        "when using \"nanoid\" options, please be sure to fill in both \"alphabet\" and \"size\" properties",
                    ));
                }
            }
        }

        if let Some(keys) = &self.uniq_keys {
            if keys.iter().any(|key| key.is_empty()) {
                return Err(StoreError::invalid_config("uniqKeys cannot contain an empty key"));
            }
        }

        if matches!(&self.zombie_key, Some(key) if key.is_empty()) {
            return Err(StoreError::invalid_config("zombieKey cannot be empty"));
        }

        Ok(())
    }
}
