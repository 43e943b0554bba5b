//! Line endings.
//!
//! Buffers hold LF-only text so that every terminator is exactly one character wide and offsets
//! stay comparable across platforms. A document's original convention is detected on load and
//! put back by [`DocumentBuffer::text_for_saving`](crate::DocumentBuffer::text_for_saving).

/// Newline convention of a document on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LineEnding {
    /// `'\n'`
    #[default]
    Lf,
    /// `"\r\n"`
    Crlf,
}

impl LineEnding {
    /// The terminator as written to disk.
    pub fn as_str(self) -> &'static str {
        match self {
            LineEnding::Lf => "\n",
            LineEnding::Crlf => "\r\n",
        }
    }

    /// Pick the convention used by most terminators in `text`. Ties and texts without any
    /// newline resolve to [`LineEnding::Lf`].
    pub fn detect(text: &str) -> Self {
        let mut crlf = 0usize;
        let mut lf = 0usize;
        let mut prev = None;
        for byte in text.bytes() {
            if byte == b'\n' {
                if prev == Some(b'\r') {
                    crlf += 1;
                } else {
                    lf += 1;
                }
            }
            prev = Some(byte);
        }
        if crlf > lf { LineEnding::Crlf } else { LineEnding::Lf }
    }

    /// Rewrite every `"\r\n"` as `'\n'`. A lone `'\r'` is ordinary content.
    pub fn normalize(text: &str) -> String {
        match text.contains('\r') {
            true => text.replace("\r\n", "\n"),
            false => text.to_owned(),
        }
    }

    /// Expand an LF-only text to this convention.
    pub fn apply_to_text(self, text: &str) -> String {
        match self {
            LineEnding::Lf => text.to_owned(),
            LineEnding::Crlf => text.replace('\n', self.as_str()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_majority() {
        assert_eq!(LineEnding::detect("a\r\nb\r\nc\n"), LineEnding::Crlf);
        assert_eq!(LineEnding::detect("a\r\nb\nc\n"), LineEnding::Lf);
        assert_eq!(LineEnding::detect("no newline"), LineEnding::Lf);
    }

    #[test]
    fn test_normalize_and_restore() {
        let source = "a\r\nb\r\n";
        let normalized = LineEnding::normalize(source);
        assert_eq!(normalized, "a\nb\n");
        assert_eq!(LineEnding::Crlf.apply_to_text(&normalized), source);
        assert_eq!(LineEnding::normalize("a\rb"), "a\rb");
    }
}
