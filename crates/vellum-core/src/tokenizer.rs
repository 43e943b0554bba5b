//! The tokenizer seam.
//!
//! A [`Tokenizer`] turns a whole document into flat [`Token`]s. Implementations may be slow
//! (a grammar engine, a language server round-trip), so the call is async and runs off the input
//! path inside the [`TokenizationPipeline`](crate::TokenizationPipeline).

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::tokens::Token;

/// Errors a tokenizer may report.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenizerError {
    /// No grammar is registered for the file extension.
    #[error("no grammar for file extension `{0}`")]
    UnsupportedExtension(String),
    /// The tokenizer ran but failed.
    #[error("tokenization failed: {0}")]
    Failed(String),
}

/// Asynchronous whole-document tokenizer.
#[async_trait]
pub trait Tokenizer: Send + Sync {
    /// Tokenize `content`, choosing a grammar by `file_extension` (without the dot).
    ///
    /// Returned tokens should be sorted by `start`.
    async fn tokenize(
        &self,
        content: Arc<str>,
        file_extension: &str,
    ) -> Result<Vec<Token>, TokenizerError>;
}
