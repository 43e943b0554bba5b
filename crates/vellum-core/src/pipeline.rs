//! Tokenization Pipeline
//!
//! Schedules tokenizer runs off the input path and applies their results without ever letting
//! them desynchronize from the buffer.
//!
//! # Scheduling
//!
//! - Opening a document requests tokens immediately; content changes are debounced.
//! - Every request bumps a generation counter and replaces the in-flight [`RefreshTask`]. Dropping
//!   a task aborts it, so a superseded tokenizer run never completes.
//! - Results travel back over a channel tagged with `(generation, document, version)`. Anything
//!   that does not match the latest request is discarded as stale.
//!
//! # Caching
//!
//! The last applied token set of each document is kept in an LRU cache. Re-opening a cached
//! document shows its tokens right away while a fresh request runs in the background.
//!
//! # Failures
//!
//! A failing tokenizer is logged and the previous tokens stay in place.

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

use lru::LruCache;
use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use crate::buffer::DocumentId;
use crate::tokenizer::{Tokenizer, TokenizerError};
use crate::tokens::Token;

/// Default debounce applied to content changes.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);
/// Default number of documents whose tokens are cached.
pub const DEFAULT_TOKEN_CACHE_CAPACITY: usize = 32;

/// Pipeline tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Delay between the last content change and the tokenizer run.
    pub debounce: Duration,
    /// Number of documents kept in the token cache.
    pub cache_capacity: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_DEBOUNCE,
            cache_capacity: DEFAULT_TOKEN_CACHE_CAPACITY,
        }
    }
}

/// Tokens for one document version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenSet {
    /// Document the tokens belong to.
    pub document: DocumentId,
    /// Buffer version that was tokenized.
    pub version: u64,
    /// Tokens sorted by start offset.
    pub tokens: Arc<[Token]>,
}

/// Something the host should react to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineEvent {
    /// A fresh token set was applied.
    Tokens(TokenSet),
    /// The latest run failed; previous tokens are kept.
    Failed {
        /// Document being tokenized.
        document: DocumentId,
        /// Version that failed.
        version: u64,
        /// Reported error.
        error: TokenizerError,
    },
}

/// Handle of an in-flight tokenizer run. Dropping it aborts the run.
#[derive(Debug)]
pub struct RefreshTask {
    generation: u64,
    handle: JoinHandle<()>,
}

impl RefreshTask {
    /// Generation this task was spawned for.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Returns `true` once the task has completed or been aborted.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for RefreshTask {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

struct TokenizeOutcome {
    generation: u64,
    document: DocumentId,
    version: u64,
    result: Result<Vec<Token>, TokenizerError>,
}

#[derive(Debug, Clone)]
struct ActiveDocument {
    id: DocumentId,
    extension: Arc<str>,
    version: u64,
}

/// Debounced, cancellable tokenization for the active document.
pub struct TokenizationPipeline {
    tokenizer: Arc<dyn Tokenizer>,
    runtime: Handle,
    config: PipelineConfig,
    active: Option<ActiveDocument>,
    current: Option<TokenSet>,
    cache: LruCache<DocumentId, TokenSet>,
    pending: Option<RefreshTask>,
    generation: u64,
    tx: UnboundedSender<TokenizeOutcome>,
    rx: UnboundedReceiver<TokenizeOutcome>,
}

impl std::fmt::Debug for TokenizationPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenizationPipeline")
            .field("config", &self.config)
            .field("active", &self.active)
            .field("generation", &self.generation)
            .field("pending", &self.pending.is_some())
            .finish()
    }
}

impl TokenizationPipeline {
    /// Create a pipeline that spawns tokenizer runs on `runtime`.
    pub fn new(tokenizer: Arc<dyn Tokenizer>, runtime: Handle, config: PipelineConfig) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let capacity = NonZeroUsize::new(config.cache_capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            tokenizer,
            runtime,
            config,
            active: None,
            current: None,
            cache: LruCache::new(capacity),
            pending: None,
            generation: 0,
            tx,
            rx,
        }
    }

    /// Pipeline tuning in use.
    pub fn config(&self) -> PipelineConfig {
        self.config
    }

    /// Change the debounce for future requests.
    pub fn set_debounce(&mut self, debounce: Duration) {
        self.config.debounce = debounce;
    }

    /// Tokens currently applied for the active document.
    pub fn current(&self) -> Option<&TokenSet> {
        self.current.as_ref()
    }

    /// Returns `true` while a tokenizer run is scheduled or in flight.
    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Generation of the latest request.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Cached tokens for `document`, without touching recency.
    pub fn cached(&self, document: &DocumentId) -> Option<&TokenSet> {
        self.cache.peek(document)
    }

    /// Make `document` active and request tokens immediately.
    ///
    /// Cached tokens for the document (if any) are applied right away and returned.
    pub fn open_document(
        &mut self,
        document: DocumentId,
        file_extension: &str,
        content: Arc<str>,
        version: u64,
    ) -> Option<TokenSet> {
        self.current = self.cache.get(&document).cloned();
        debug!(
            document = %document,
            cached = self.current.is_some(),
            "tokenization: open document"
        );
        self.active = Some(ActiveDocument {
            id: document,
            extension: Arc::from(file_extension),
            version,
        });
        self.schedule(content, Duration::ZERO);
        self.current.clone()
    }

    /// Record a content change and schedule a debounced run.
    pub fn content_changed(&mut self, content: Arc<str>, version: u64) {
        let Some(active) = self.active.as_mut() else {
            debug!("tokenization: content change without an active document");
            return;
        };
        active.version = version;
        let debounce = self.config.debounce;
        self.schedule(content, debounce);
    }

    /// Stop tracking `document`, cancelling any run for it.
    pub fn close_document(&mut self, document: &DocumentId) {
        if self.active.as_ref().is_some_and(|a| &a.id == document) {
            self.cancel();
            self.active = None;
            self.current = None;
        }
    }

    /// Abort the in-flight run, if any.
    pub fn cancel(&mut self) {
        if let Some(task) = self.pending.take() {
            trace!(generation = task.generation(), "tokenization: cancel");
        }
    }

    fn schedule(&mut self, content: Arc<str>, delay: Duration) {
        let Some(active) = self.active.clone() else {
            return;
        };

        self.generation += 1;
        let generation = self.generation;
        let tokenizer = Arc::clone(&self.tokenizer);
        let tx = self.tx.clone();

        trace!(generation, version = active.version, ?delay, "tokenization: schedule");

        let handle = self.runtime.spawn(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            let result = tokenizer.tokenize(content, &active.extension).await;
            let _ = tx.send(TokenizeOutcome {
                generation,
                document: active.id,
                version: active.version,
                result,
            });
        });

        // Replacing the previous task drops it, which aborts it.
        self.pending = Some(RefreshTask { generation, handle });
    }

    fn accept(&mut self, outcome: TokenizeOutcome) -> Option<PipelineEvent> {
        let is_current = outcome.generation == self.generation
            && self
                .active
                .as_ref()
                .is_some_and(|a| a.id == outcome.document && a.version == outcome.version);
        if !is_current {
            debug!(
                generation = outcome.generation,
                latest = self.generation,
                version = outcome.version,
                "tokenization: discarding stale result"
            );
            return None;
        }

        self.pending = None;

        match outcome.result {
            Ok(tokens) => {
                let set = TokenSet {
                    document: outcome.document,
                    version: outcome.version,
                    tokens: Arc::from(tokens),
                };
                self.cache.put(set.document.clone(), set.clone());
                self.current = Some(set.clone());
                Some(PipelineEvent::Tokens(set))
            }
            Err(error) => {
                warn!(
                    document = %outcome.document,
                    version = outcome.version,
                    %error,
                    "tokenization failed; keeping previous tokens"
                );
                Some(PipelineEvent::Failed {
                    document: outcome.document,
                    version: outcome.version,
                    error,
                })
            }
        }
    }

    /// Apply any finished run without waiting.
    pub fn try_recv_event(&mut self) -> Option<PipelineEvent> {
        while let Ok(outcome) = self.rx.try_recv() {
            if let Some(event) = self.accept(outcome) {
                return Some(event);
            }
        }
        None
    }

    /// Wait for the next current (non-stale) result and apply it.
    pub async fn next_event(&mut self) -> Option<PipelineEvent> {
        loop {
            let outcome = self.rx.recv().await?;
            if let Some(event) = self.accept(outcome) {
                return Some(event);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct WordTokenizer {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Tokenizer for WordTokenizer {
        async fn tokenize(
            &self,
            content: Arc<str>,
            file_extension: &str,
        ) -> Result<Vec<Token>, TokenizerError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if file_extension == "bad" {
                return Err(TokenizerError::Failed("boom".into()));
            }
            Ok(vec![Token::new(0, content.chars().count(), "word")])
        }
    }

    fn pipeline() -> (TokenizationPipeline, Arc<WordTokenizer>) {
        let tokenizer = Arc::new(WordTokenizer {
            calls: AtomicUsize::new(0),
        });
        let pipeline = TokenizationPipeline::new(
            tokenizer.clone(),
            Handle::current(),
            PipelineConfig::default(),
        );
        (pipeline, tokenizer)
    }

    #[tokio::test(start_paused = true)]
    async fn test_open_requests_immediately() {
        let (mut pipeline, tokenizer) = pipeline();
        pipeline.open_document(DocumentId::from("a.txt"), "txt", Arc::from("abc"), 0);

        let Some(PipelineEvent::Tokens(set)) = pipeline.next_event().await else {
            panic!("expected tokens");
        };
        assert_eq!(set.version, 0);
        assert_eq!(set.tokens.as_ref(), &[Token::new(0, 3, "word")]);
        assert_eq!(tokenizer.calls.load(Ordering::SeqCst), 1);
        assert!(!pipeline.has_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_keeps_previous_tokens() {
        let (mut pipeline, _) = pipeline();
        let doc = DocumentId::from("a.bad");
        pipeline.open_document(doc.clone(), "bad", Arc::from("abc"), 0);

        let event = pipeline.next_event().await;
        assert!(matches!(event, Some(PipelineEvent::Failed { version: 0, .. })));
        assert!(pipeline.current().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_cancels_pending_run() {
        let (mut pipeline, tokenizer) = pipeline();
        let doc = DocumentId::from("a.txt");
        pipeline.open_document(doc.clone(), "txt", Arc::from("abc"), 0);
        pipeline.next_event().await;

        pipeline.content_changed(Arc::from("abcd"), 1);
        assert!(pipeline.has_pending());
        pipeline.close_document(&doc);
        assert!(!pipeline.has_pending());

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(pipeline.try_recv_event().is_none());
        assert_eq!(tokenizer.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reopen_applies_cached_tokens() {
        let (mut pipeline, _) = pipeline();
        let a = DocumentId::from("a.txt");
        let b = DocumentId::from("b.txt");

        pipeline.open_document(a.clone(), "txt", Arc::from("abc"), 0);
        pipeline.next_event().await;
        pipeline.open_document(b, "txt", Arc::from("xy"), 0);
        pipeline.next_event().await;

        let cached = pipeline.open_document(a.clone(), "txt", Arc::from("abc"), 0);
        assert_eq!(cached.map(|set| set.document), Some(a));
    }
}
