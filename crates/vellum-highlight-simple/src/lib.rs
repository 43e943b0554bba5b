//! `vellum-highlight-simple` - Simple (regex-based) tokenizers for `vellum-core`.
//!
//! This crate is intended for lightweight formats (JSON/INI/TOML) and a keyword-level Rust
//! grammar, where a full parser or a language server would be overkill.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use regex::Regex;
use vellum_core::{Token, Tokenizer, TokenizerError};

/// Token classes produced by the default grammars.
pub mod class {
    /// String literal.
    pub const STRING: &str = "string";
    /// Numeric literal.
    pub const NUMBER: &str = "number";
    /// `true` / `false`.
    pub const BOOLEAN: &str = "boolean";
    /// `null`.
    pub const NULL: &str = "null";
    /// `[section]` header.
    pub const SECTION: &str = "section";
    /// `key =` in key/value formats.
    pub const KEY: &str = "key";
    /// Comment.
    pub const COMMENT: &str = "comment";
    /// Language keyword.
    pub const KEYWORD: &str = "keyword";
}

/// A single regex highlighting rule.
#[derive(Debug, Clone)]
pub struct RegexRule {
    regex: Regex,
    class: Arc<str>,
    capture_group: Option<usize>,
}

impl RegexRule {
    /// Compile a rule producing tokens of `class`.
    pub fn new(pattern: &str, class: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            regex: Regex::new(pattern)?,
            class: Arc::from(class),
            capture_group: None,
        })
    }

    /// Highlight only a capture group of each match.
    ///
    /// Example (INI key):
    /// - pattern: `^\\s*([^=\\s]+)\\s*=`
    /// - capture_group: `1` (the key)
    pub fn with_capture_group(mut self, group: usize) -> Self {
        self.capture_group = Some(group);
        self
    }

    /// Class of the produced tokens.
    pub fn class(&self) -> &str {
        &self.class
    }
}

/// A simple regex-based syntax highlighter.
///
/// Rules are matched per line. When two matches overlap, the one that starts first wins; on a tie
/// the earlier rule wins. It is *not* intended to be a full parser.
#[derive(Debug, Clone)]
pub struct RegexHighlighter {
    rules: Vec<RegexRule>,
}

impl RegexHighlighter {
    /// Create a highlighter from rules in priority order.
    pub fn new(rules: Vec<RegexRule>) -> Self {
        Self { rules }
    }

    /// Rules in priority order.
    pub fn rules(&self) -> &[RegexRule] {
        &self.rules
    }

    /// Run all rules over `text` and return non-overlapping tokens (char offsets), sorted.
    pub fn highlight(&self, text: &str) -> Vec<Token> {
        // (start, rule index, token)
        let mut found: Vec<(usize, usize, Token)> = Vec::new();
        let mut line_start = 0usize;

        for line_text in text.split('\n') {
            for (rule_index, rule) in self.rules.iter().enumerate() {
                let spans: Vec<(usize, usize)> = match rule.capture_group {
                    Some(group) => rule
                        .regex
                        .captures_iter(line_text)
                        .filter_map(|caps| caps.get(group))
                        .map(|m| (m.start(), m.end()))
                        .collect(),
                    None => rule
                        .regex
                        .find_iter(line_text)
                        .map(|m| (m.start(), m.end()))
                        .collect(),
                };
                for (start_byte, end_byte) in spans {
                    if let Some(token) =
                        token_from_match(line_start, line_text, start_byte, end_byte, &rule.class)
                    {
                        found.push((token.start, rule_index, token));
                    }
                }
            }
            line_start += line_text.chars().count() + 1;
        }

        found.sort_by_key(|(start, rule, _)| (*start, *rule));

        let mut tokens: Vec<Token> = Vec::with_capacity(found.len());
        for (_, _, token) in found {
            if tokens.last().is_none_or(|last| token.start >= last.end) {
                tokens.push(token);
            }
        }
        tokens
    }

    /// A small default JSON grammar (strings, numbers, booleans, null).
    pub fn json_default() -> Result<Self, regex::Error> {
        Ok(Self::new(vec![
            // JSON string (single-line, handles escapes)
            RegexRule::new(r#""(?:\\.|[^"\\])*""#, class::STRING)?,
            // JSON number
            RegexRule::new(r#"-?(?:0|[1-9]\d*)(?:\.\d+)?(?:[eE][+-]?\d+)?"#, class::NUMBER)?,
            RegexRule::new(r#"\b(?:true|false)\b"#, class::BOOLEAN)?,
            RegexRule::new(r#"\bnull\b"#, class::NULL)?,
        ]))
    }

    /// A small default INI grammar (section, key, comment).
    pub fn ini_default() -> Result<Self, regex::Error> {
        Ok(Self::new(vec![
            // Comment: ;... or #...
            RegexRule::new(r#"^\s*[;#].*$"#, class::COMMENT)?,
            // Section header: [section]
            RegexRule::new(r#"^\s*\[([^\]]+)\]\s*$"#, class::SECTION)?.with_capture_group(1),
            // Key: key = value
            RegexRule::new(r#"^\s*([^=\s]+)\s*="#, class::KEY)?.with_capture_group(1),
        ]))
    }

    /// A small default TOML grammar (tables, keys, strings, numbers, booleans, comments).
    pub fn toml_default() -> Result<Self, regex::Error> {
        Ok(Self::new(vec![
            RegexRule::new(r#""(?:\\.|[^"\\])*"|'[^']*'"#, class::STRING)?,
            RegexRule::new(r#"#.*$"#, class::COMMENT)?,
            // [table] and [[array.of.tables]]
            RegexRule::new(r#"^\s*\[\[?([^\]]+)\]\]?\s*$"#, class::SECTION)?.with_capture_group(1),
            RegexRule::new(r#"^\s*([A-Za-z0-9_.-]+)\s*="#, class::KEY)?.with_capture_group(1),
            RegexRule::new(r#"\b(?:true|false)\b"#, class::BOOLEAN)?,
            RegexRule::new(r#"[+-]?\b\d[\d_]*(?:\.\d+)?(?:[eE][+-]?\d+)?\b"#, class::NUMBER)?,
        ]))
    }

    /// A keyword-level Rust grammar (comments, strings, numbers, keywords).
    pub fn rust_default() -> Result<Self, regex::Error> {
        Ok(Self::new(vec![
            // `//` outside of string literals, up to the end of the line.
            RegexRule::new(r#"^(?:[^"/]|"(?:\\.|[^"\\])*"|/[^/"])*(//.*)$"#, class::COMMENT)?
                .with_capture_group(1),
            RegexRule::new(r#""(?:\\.|[^"\\])*""#, class::STRING)?,
            RegexRule::new(
                r#"\b(?:as|async|await|break|const|continue|crate|dyn|else|enum|extern|fn|for|if|impl|in|let|loop|match|mod|move|mut|pub|ref|return|self|Self|static|struct|super|trait|type|unsafe|use|where|while)\b"#,
                class::KEYWORD,
            )?,
            RegexRule::new(r#"\b(?:true|false)\b"#, class::BOOLEAN)?,
            RegexRule::new(r#"\b\d[\d_]*(?:\.\d+)?(?:[iu](?:8|16|32|64|128|size)|f32|f64)?\b"#, class::NUMBER)?,
        ]))
    }
}

/// A [`Tokenizer`] that picks a [`RegexHighlighter`] by file extension.
#[derive(Debug, Clone, Default)]
pub struct SimpleTokenizer {
    grammars: HashMap<String, Arc<RegexHighlighter>>,
}

impl SimpleTokenizer {
    /// A tokenizer with the built-in grammars: `json`, `ini`/`cfg`, `toml` and `rs`.
    pub fn new() -> Result<Self, regex::Error> {
        let ini = Arc::new(RegexHighlighter::ini_default()?);
        Ok(Self::default()
            .with_grammar("json", RegexHighlighter::json_default()?)
            .with_grammar("toml", RegexHighlighter::toml_default()?)
            .with_grammar("rs", RegexHighlighter::rust_default()?)
            .with_shared_grammar("ini", Arc::clone(&ini))
            .with_shared_grammar("cfg", ini))
    }

    /// Register a grammar for `extension` (case-insensitive, without the dot).
    pub fn with_grammar(self, extension: &str, highlighter: RegexHighlighter) -> Self {
        self.with_shared_grammar(extension, Arc::new(highlighter))
    }

    fn with_shared_grammar(mut self, extension: &str, highlighter: Arc<RegexHighlighter>) -> Self {
        self.grammars
            .insert(extension.to_ascii_lowercase(), highlighter);
        self
    }

    /// Grammar registered for `extension`.
    pub fn grammar(&self, extension: &str) -> Option<&RegexHighlighter> {
        self.grammars
            .get(&extension.to_ascii_lowercase())
            .map(Arc::as_ref)
    }
}

#[async_trait]
impl Tokenizer for SimpleTokenizer {
    async fn tokenize(
        &self,
        content: Arc<str>,
        file_extension: &str,
    ) -> Result<Vec<Token>, TokenizerError> {
        let highlighter = self
            .grammar(file_extension)
            .ok_or_else(|| TokenizerError::UnsupportedExtension(file_extension.to_string()))?;
        Ok(highlighter.highlight(&content))
    }
}

fn token_from_match(
    line_start_offset: usize,
    line_text: &str,
    match_start_byte: usize,
    match_end_byte: usize,
    class: &Arc<str>,
) -> Option<Token> {
    if match_start_byte >= match_end_byte || match_end_byte > line_text.len() {
        return None;
    }

    let start_col = line_text[..match_start_byte].chars().count();
    let end_col = line_text[..match_end_byte].chars().count();
    if start_col >= end_col {
        return None;
    }

    Some(Token::new(
        line_start_offset + start_col,
        line_start_offset + end_col,
        Arc::clone(class),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classes(tokens: &[Token]) -> Vec<&str> {
        tokens.iter().map(|t| &*t.class).collect()
    }

    #[test]
    fn test_json_strings_use_char_offsets() {
        let text = r#"{ "key": "值", "n": 12, "ok": true, "x": null }"#;
        let highlighter = RegexHighlighter::json_default().unwrap();
        let tokens = highlighter.highlight(text);

        assert!(tokens.len() >= 6);
        let value = tokens.iter().find(|t| t.start == 9).unwrap();
        assert_eq!((value.end, &*value.class), (12, class::STRING));
        assert!(tokens.iter().any(|t| &*t.class == class::NUMBER));
        assert!(tokens.iter().any(|t| &*t.class == class::NULL));
    }

    #[test]
    fn test_ini_capture_groups_and_offsets() {
        let text = "[core]\nname = vellum\n;comment\n";
        let highlighter = RegexHighlighter::ini_default().unwrap();
        let tokens = highlighter.highlight(text);

        assert_eq!(
            classes(&tokens),
            vec![class::SECTION, class::KEY, class::COMMENT]
        );
        assert_eq!((tokens[0].start, tokens[0].end), (1, 5));
        assert_eq!((tokens[1].start, tokens[1].end), (7, 11));
    }

    #[test]
    fn test_rust_string_beats_comment_marker() {
        let text = "let url = \"http://x\"; // done";
        let highlighter = RegexHighlighter::rust_default().unwrap();
        let tokens = highlighter.highlight(text);

        assert_eq!(
            classes(&tokens),
            vec![class::KEYWORD, class::STRING, class::COMMENT]
        );
        assert!(tokens.windows(2).all(|w| w[0].end <= w[1].start));
    }

    #[tokio::test]
    async fn test_tokenizer_dispatches_by_extension() {
        let tokenizer = SimpleTokenizer::new().unwrap();
        let tokens = tokenizer
            .tokenize(Arc::from("[a]\nx = 1"), "TOML")
            .await
            .unwrap();
        assert_eq!(
            classes(&tokens),
            vec![class::SECTION, class::KEY, class::NUMBER]
        );

        let err = tokenizer
            .tokenize(Arc::from("x"), "md")
            .await
            .unwrap_err();
        assert_eq!(err, TokenizerError::UnsupportedExtension("md".into()));
    }
}
