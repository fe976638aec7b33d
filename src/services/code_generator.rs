use std::sync::Arc;

use crate::services::random::{Random, ThreadRandom};

/// Characters that humans rarely misread: no `0`/`O`, `1`/`I`/`L` or `Q`
pub const EXPLICIT_CHARS: &str = "ABCDEFGHJKMNPRSTUVWXYZ23456789";

const DEFAULT_CODE_LENGTH: usize = 6;

/// Generates short random codes meant to be read back by humans
///
/// Character choice is driven by an injected [`Random`] source so code
/// sequences can be made deterministic in tests.
pub struct CodeGenerator {
    chars: Vec<char>,
    default_length: usize,
    random: Arc<dyn Random>,
}

impl CodeGenerator {
    /// Create a generator with the default charset and length
    pub fn new() -> Self {
        Self::with_random(Arc::new(ThreadRandom))
    }

    /// Create a generator with the default charset and an injected randomness source
    pub fn with_random(random: Arc<dyn Random>) -> Self {
        Self::with_charset(EXPLICIT_CHARS, DEFAULT_CODE_LENGTH, random)
    }

    /// Create a fully customized generator
    ///
    /// An empty `charset` falls back to [`EXPLICIT_CHARS`] so a blank
    /// configuration value cannot produce a generator that panics.
    pub fn with_charset(charset: &str, default_length: usize, random: Arc<dyn Random>) -> Self {
        let charset = if charset.is_empty() {
            tracing::warn!("empty charset configured, falling back to the default one");
            EXPLICIT_CHARS
        } else {
            charset
        };

        tracing::debug!("code generation service initialized");
        Self {
            chars: charset.chars().collect(),
            default_length,
            random,
        }
    }

    /// Generate a code of the configured default length
    pub fn generate(&self) -> String {
        self.generate_len(self.default_length)
    }

    /// Generate a code of `length` characters
    pub fn generate_len(&self, length: usize) -> String {
        let code: String = (0..length)
            .map(|_| {
                let index = (self.random.pick() * self.chars.len() as f64) as usize;
                self.chars[index.min(self.chars.len() - 1)]
            })
            .collect();

        tracing::debug!(%code, "generated a new code");
        code
    }
}

impl Default for CodeGenerator {
    fn default() -> Self {
        Self::new()
    }
}
