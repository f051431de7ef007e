//! Node id generation

use crate::config::IdConfig;
use rand::Rng;
use uuid::Uuid;

/// Produces ids for nodes created without an explicit id
pub trait IdGenerator: Send + Sync {
    fn generate(&self) -> String;
}

impl<F> IdGenerator for F
where
    F: Fn() -> String + Send + Sync,
{
    fn generate(&self) -> String {
        self()
    }
}

/// Random v4 UUIDs (the default)
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidGenerator;

impl IdGenerator for UuidGenerator {
    fn generate(&self) -> String {
        Uuid::new_v4().to_string()
    }
}

/// Fixed-length ids drawn uniformly from a custom alphabet
#[derive(Debug, Clone)]
pub struct AlphabetGenerator {
    alphabet: Vec<char>,
    size: usize,
}

impl AlphabetGenerator {
    /// Returns `None` for an empty alphabet or a zero size
    pub fn new(alphabet: &str, size: usize) -> Option<Self> {
        let alphabet: Vec<char> = alphabet.chars().collect();
        if alphabet.is_empty() || size == 0 {
            return None;
        }
        Some(Self { alphabet, size })
    }

    pub(crate) fn from_config(config: &IdConfig) -> Option<Self> {
        match (&config.alphabet, config.size) {
            (Some(alphabet), Some(size)) => Self::new(alphabet, size),
            _ => None,
        }
    }
}

impl IdGenerator for AlphabetGenerator {
    fn generate(&self) -> String {
        let mut rng = rand::thread_rng();
        (0..self.size)
            .map(|_| self.alphabet[rng.gen_range(0..self.alphabet.len())])
            .collect()
    }
}
