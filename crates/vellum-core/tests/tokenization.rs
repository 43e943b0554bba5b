use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::runtime::Handle;
use vellum_core::{
    DocumentId, EditorApi, EditorSession, EditorSettings, LineToken, PipelineConfig,
    PipelineEvent, Position, Token, TokenizationPipeline, Tokenizer, TokenizerError,
};

/// Marks every `let` as a keyword and counts its invocations.
#[derive(Default)]
struct LetTokenizer {
    calls: AtomicUsize,
}

#[async_trait]
impl Tokenizer for LetTokenizer {
    async fn tokenize(
        &self,
        content: Arc<str>,
        file_extension: &str,
    ) -> Result<Vec<Token>, TokenizerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if file_extension != "kw" {
            return Err(TokenizerError::UnsupportedExtension(file_extension.to_string()));
        }
        let chars: Vec<char> = content.chars().collect();
        let tokens = chars
            .windows(3)
            .enumerate()
            .filter(|(_, w)| **w == ['l', 'e', 't'])
            .map(|(i, _)| Token::new(i, i + 3, "keyword"))
            .collect();
        Ok(tokens)
    }
}

fn keyword(start_column: usize) -> LineToken {
    LineToken {
        start_column,
        end_column: start_column + 3,
        class: Arc::from("keyword"),
    }
}

#[tokio::test(start_paused = true)]
async fn test_debounce_collapses_a_burst_into_one_request() {
    let tokenizer = Arc::new(LetTokenizer::default());
    let mut pipeline =
        TokenizationPipeline::new(tokenizer.clone(), Handle::current(), PipelineConfig::default());
    pipeline.open_document(DocumentId::from("a.kw"), "kw", Arc::from("let"), 0);
    pipeline.next_event().await;
    let before = tokenizer.calls.load(Ordering::SeqCst);

    // 10 edits within 50 ms, well inside the 300 ms window.
    let mut text = String::from("let");
    for version in 1..=10u64 {
        text.push('x');
        pipeline.content_changed(Arc::from(text.as_str()), version);
        tokio::time::advance(Duration::from_millis(5)).await;
    }

    let Some(PipelineEvent::Tokens(set)) = pipeline.next_event().await else {
        panic!("expected a token set");
    };
    assert_eq!(set.version, 10);
    assert_eq!(tokenizer.calls.load(Ordering::SeqCst) - before, 1);
}

#[tokio::test(start_paused = true)]
async fn test_superseded_results_are_never_applied() {
    let tokenizer = Arc::new(LetTokenizer::default());
    let mut pipeline = TokenizationPipeline::new(
        tokenizer.clone(),
        Handle::current(),
        PipelineConfig {
            debounce: Duration::from_millis(10),
            ..PipelineConfig::default()
        },
    );
    pipeline.open_document(DocumentId::from("a.kw"), "kw", Arc::from("let"), 0);
    pipeline.content_changed(Arc::from("let let"), 1);

    let Some(PipelineEvent::Tokens(set)) = pipeline.next_event().await else {
        panic!("expected a token set");
    };
    assert_eq!(set.version, 1);
    assert_eq!(set.tokens.len(), 2);
    assert!(pipeline.try_recv_event().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_session_carries_tokens_until_fresh_ones_arrive() {
    let api = EditorApi::new("main.kw", "let a\nlet b", EditorSettings::default());
    let tokenizer = Arc::new(LetTokenizer::default());
    let mut session =
        EditorSession::new(api, 200.0, 400.0).with_tokenizer(tokenizer.clone(), Handle::current());

    assert!(matches!(
        session.wait_for_tokens().await,
        Some(PipelineEvent::Tokens(_))
    ));
    assert_eq!(&session.line_tokens(1).unwrap()[..], &[keyword(0)]);

    session.edit(|api| api.insert(Position::new(1, 0, 0), "  "));
    // Shifted through the edit before the tokenizer runs again.
    assert_eq!(&session.line_tokens(1).unwrap()[..], &[keyword(2)]);
    let untouched = Arc::clone(session.line_tokens(0).unwrap());

    session.wait_for_tokens().await;
    assert_eq!(&session.line_tokens(1).unwrap()[..], &[keyword(2)]);
    assert!(Arc::ptr_eq(&untouched, session.line_tokens(0).unwrap()));
    assert_eq!(tokenizer.calls.load(Ordering::SeqCst), 2);
    assert!(session.wait_for_tokens().await.is_none());

    let frame = session.render_frame();
    assert_eq!(&frame.lines[1].tokens[..], &[keyword(2)]);
}

#[tokio::test(start_paused = true)]
async fn test_tokenizer_failure_then_cached_reopen() {
    let api = EditorApi::new("main.kw", "let a", EditorSettings::default());
    let mut session = EditorSession::new(api, 200.0, 400.0)
        .with_tokenizer(Arc::new(LetTokenizer::default()), Handle::current());
    session.wait_for_tokens().await;

    session.open_document("notes.txt", "txt", "let me");
    let event = session.wait_for_tokens().await;
    assert!(matches!(event, Some(PipelineEvent::Failed { .. })));
    assert!(session.tokens().is_empty());

    // Re-opening the first document shows its cached tokens immediately.
    session.open_document("main.kw", "kw", "let a");
    assert_eq!(session.tokens(), &[Token::new(0, 3, "keyword")]);
}
