//! Session walkthrough
//!
//! Drives an `EditorSession` the way a host would: key input, typed text, a custom extension with
//! a decoration provider, asynchronous tokenization and frame rendering.
//!
//! Run with `RUST_LOG=vellum_core=debug cargo run --example session_walkthrough` to see dispatch
//! and pipeline logs.

use std::rc::Rc;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::runtime::Handle;
use tracing_subscriber::EnvFilter;
use vellum_core::{
    Command, CoreEditing, Decoration, DecorationProvider, EditorApi, EditorSession,
    EditorSettings, Extension, KeyChord, RenderFrame, Token, Tokenizer, TokenizerError,
};

/// Classifies digits as numbers and everything alphabetic as identifiers.
struct CharClassTokenizer;

#[async_trait]
impl Tokenizer for CharClassTokenizer {
    async fn tokenize(
        &self,
        content: Arc<str>,
        _file_extension: &str,
    ) -> Result<Vec<Token>, TokenizerError> {
        let mut tokens: Vec<Token> = Vec::new();
        for (offset, ch) in content.chars().enumerate() {
            let class = if ch.is_ascii_digit() {
                "number"
            } else if ch.is_alphabetic() {
                "identifier"
            } else {
                continue;
            };
            match tokens.last_mut() {
                Some(last) if last.end == offset && &*last.class == class => last.end += 1,
                _ => tokens.push(Token::new(offset, offset + 1, class)),
            }
        }
        Ok(tokens)
    }
}

/// Highlights the first line and adds an uppercase command.
struct Banner;

impl Extension for Banner {
    fn name(&self) -> &str {
        "demo.banner"
    }

    fn commands(&self) -> Vec<Command> {
        vec![Command::new("demo.upcase", "Uppercase Selection", |ctx| {
            let (Some(range), Some(text)) = (ctx.api().selection(), ctx.api().selected_text())
            else {
                return Ok(());
            };
            ctx.api_mut().replace(range, &text.to_uppercase());
            Ok(())
        })]
    }

    fn keybindings(&self) -> Vec<(KeyChord, String)> {
        match KeyChord::parse("ctrl+shift+u") {
            Ok(chord) => vec![(chord, "demo.upcase".to_string())],
            Err(_) => Vec::new(),
        }
    }

    fn decoration_provider(&self) -> Option<DecorationProvider> {
        Some(Rc::new(|| {
            vec![Decoration::line(Default::default(), "banner")]
        }))
    }
}

fn print_frame(title: &str, frame: &RenderFrame<'_>) {
    println!("--- {title} (scroll_top = {}) ---", frame.scroll_top);
    for line in &frame.lines {
        let classes: Vec<_> = line
            .tokens
            .iter()
            .map(|t| format!("{}..{}:{}", t.start_column, t.end_column, t.class))
            .collect();
        println!("{:>4} | {:<28} {}", line.index, line.text, classes.join(" "));
    }
    for rect in &frame.decorations.rects {
        println!(
            "     rect line {} class {} x={:.1} w={:.1}",
            rect.line, rect.class_name, rect.rect.x, rect.rect.width
        );
    }
    if let Some(caret) = frame.caret {
        println!("     caret at x={:.1} y={:.1}", caret.x, caret.y);
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let settings = EditorSettings::from_json_str(r#"{ "tab_size": 2, "line_height": 18 }"#)?;
    let api = EditorApi::new("walkthrough.txt", "hello world\nline 2\nline 3", settings);
    let mut session = EditorSession::new(api, 90.0, 480.0)
        .with_tokenizer(Arc::new(CharClassTokenizer), Handle::current());

    session.load_extension(Box::new(CoreEditing))?;
    session.load_extension(Box::new(Banner))?;
    session.wait_for_tokens().await;
    print_frame("opened", &session.render_frame());

    session.handle_key(&KeyChord::parse("shift+end")?)?;
    session.handle_key(&KeyChord::parse("ctrl+shift+u")?)?;
    session.handle_key(&KeyChord::parse("ctrl+end")?)?;
    session.handle_key(&KeyChord::parse("enter")?)?;
    session.handle_text_input("line 4 was typed");
    session.wait_for_tokens().await;
    print_frame("edited", &session.render_frame());

    println!("content:\n{}", session.api().content());
    Ok(())
}
