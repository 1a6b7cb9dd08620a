//! Comment stripping and identifier splitting for object definitions.
//!
//! The scanner understands just enough SQL lexing to tell comments from
//! code: quoted literals (`'...'`, `"..."`, a doubled quote escapes), line
//! comments (`--`, `//`) and block comments (`/* ... */`). Everything else is
//! split into whitespace-separated runs.

use tracing::warn;

/// Kind of a scanned token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// A quoted literal, quotes included.
    Quoted,
    /// A run of whitespace.
    Whitespace,
    /// A line or block comment, markers included.
    Comment,
    /// Any other run of characters.
    Text,
}

/// A slice of the scanned input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    /// What the slice is.
    pub kind: TokenKind,
    /// The slice itself.
    pub text: &'a str,
}

/// Reasons the scanner gives up on an input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScanError {
    /// A quoted literal is never closed.
    #[error("unterminated quoted string starting at byte {offset}")]
    UnterminatedQuote {
        /// Byte offset of the opening quote.
        offset: usize,
    },
    /// A block comment is never closed.
    #[error("unterminated block comment starting at byte {offset}")]
    UnterminatedComment {
        /// Byte offset of the opening marker.
        offset: usize,
    },
}

/// Splits `text` into tokens.
///
/// # Errors
///
/// Returns a [`ScanError`] on an unterminated quote or block comment.
pub fn tokenize(text: &str) -> Result<Vec<Token<'_>>, ScanError> {
    let bytes = text.as_bytes();
    let mut tokens = Vec::new();
    let mut pos = 0;

    while let Some(&byte) = bytes.get(pos) {
        let start = pos;
        let rest = bytes.get(pos..).unwrap_or_default();
        let kind = if byte.is_ascii_whitespace() {
            pos += count_while(rest, |b| b.is_ascii_whitespace());
            TokenKind::Whitespace
        } else if byte == b'\'' || byte == b'"' {
            pos = closing_quote(bytes, pos, byte)
                .ok_or(ScanError::UnterminatedQuote { offset: start })?;
            TokenKind::Quoted
        } else if rest.starts_with(b"--") || rest.starts_with(b"//") {
            pos += count_while(rest, |b| b != b'\n');
            TokenKind::Comment
        } else if rest.starts_with(b"/*") {
            let close = find(bytes, pos + 2, b"*/")
                .ok_or(ScanError::UnterminatedComment { offset: start })?;
            pos = close + 2;
            TokenKind::Comment
        } else {
            pos += text_run_len(rest);
            TokenKind::Text
        };

        // Token boundaries only fall on ASCII bytes, so slicing stays on char boundaries.
        if let Some(slice) = text.get(start..pos) {
            tokens.push(Token { kind, text: slice });
        }
    }

    Ok(tokens)
}

/// Removes comments from `text`, joining the remaining tokens with single spaces.
///
/// # Errors
///
/// Returns the scan error if a quoted literal or block comment is unterminated.
pub fn strip_comments(text: &str) -> Result<String, ScanError> {
    Ok(tokenize(text)?
        .iter()
        .filter(|token| matches!(token.kind, TokenKind::Quoted | TokenKind::Text))
        .map(|token| token.text)
        .collect::<Vec<_>>()
        .join(" "))
}

/// Like [`strip_comments`], but never fails: if the text cannot be scanned,
/// a warning tagged with `label` is logged and the original text is returned
/// unchanged.
#[must_use]
pub fn remove_comments(text: &str, label: &str) -> String {
    strip_comments(text).unwrap_or_else(|error| {
        log_fallback(label, &error);
        text.to_string()
    })
}

pub(crate) fn log_fallback(label: &str, error: &ScanError) {
    warn!(
        label,
        %error,
        "failed to remove comments; scanning the original text instead"
    );
}

/// Splits `text` into identifier-like words.
///
/// Word characters are alphanumerics plus `_`, `$` and `#`.
pub fn split_tokens(text: &str) -> impl Iterator<Item = &str> {
    text.split(|c: char| !is_word_char(c))
        .filter(|word| !word.is_empty())
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '$' | '#')
}

fn count_while(bytes: &[u8], predicate: impl Fn(u8) -> bool) -> usize {
    bytes.iter().take_while(|&&b| predicate(b)).count()
}

fn text_run_len(rest: &[u8]) -> usize {
    let mut len = 0;
    while let Some(&byte) = rest.get(len) {
        let tail = rest.get(len..).unwrap_or_default();
        let boundary = byte.is_ascii_whitespace()
            || byte == b'\''
            || byte == b'"'
            || tail.starts_with(b"--")
            || tail.starts_with(b"//")
            || tail.starts_with(b"/*");
        if boundary && len > 0 {
            break;
        }
        len += 1;
    }
    len.max(1)
}

/// Returns the position just past the quote closing the literal opened at `open`.
fn closing_quote(bytes: &[u8], open: usize, quote: u8) -> Option<usize> {
    let mut pos = open + 1;
    loop {
        let offset = bytes.get(pos..)?.iter().position(|&b| b == quote)?;
        let candidate = pos + offset;
        if bytes.get(candidate + 1) == Some(&quote) {
            pos = candidate + 2;
        } else {
            return Some(candidate + 1);
        }
    }
}

fn find(bytes: &[u8], from: usize, needle: &[u8]) -> Option<usize> {
    bytes
        .get(from..)?
        .windows(needle.len())
        .position(|window| window == needle)
        .map(|offset| from + offset)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn squash(text: &str) -> String {
        text.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    #[test]
    fn removes_line_and_block_comments() {
        let text = "create procedure sp1\n\
            \t\t        // Comment sp2\n\
            \t\t        -- Comment sp2\n\
            \x20               call sp_3(1234)  -- end of line comment sp5\n\
            \t\t        /* Comment sp5 */\n\
            \t\t        sp6 -- ensure that this line still remains (w/ the sp6) between the block comments\n\
            \t\t        /*--------- Comment\n\
            \t\t        sp5\n\
            Ensure that the end-block comment is still recognized, even though the line itself starts w/ a comment.\n\
            This is because this part is within a block\n\
            ---------*/\n\
            \t\t\t\tcall sp4(1234)\n\
            \n\
            \t\t///\t\t/*\n\
            \t\tThis should not get commented out, as the previous 'start block' was itself commented out\n\
            \t\t\t\t */\n\
            \n\
            \n\
            \t\t\t\tend\n";

        assert_eq!(
            squash(&remove_comments(text, "testlog")),
            "create procedure sp1 call sp_3(1234) sp6 call sp4(1234) \
             This should not get commented out, as the previous 'start block' \
             was itself commented out */ end"
        );
    }

    #[test]
    fn returns_original_text_when_quote_is_unclosed() {
        let content = "abc \"def\" un-closed quote \" un-closed /* comment not removed */ quote";
        assert_eq!(remove_comments(content, "testlog"), content);
    }

    #[test]
    fn returns_original_text_when_block_comment_is_unclosed() {
        let content = "select 1 /* never closed";
        assert_eq!(remove_comments(content, "testlog"), content);
        assert!(strip_comments(content).is_err());
        assert_eq!(
            tokenize(content),
            Err(ScanError::UnterminatedComment { offset: 9 })
        );
    }

    #[test]
    fn quotes_inside_comments_are_ignored() {
        let content = "abc \"def\" '1' ghi /* comment ' removed */  '2' jkl";
        assert_eq!(
            squash(&remove_comments(content, "testlog")),
            "abc \"def\" '1' ghi '2' jkl"
        );
    }

    #[test]
    fn comment_markers_inside_quotes_are_kept() {
        let content = "insert into t values ('--not a comment', '/* nor this */')";
        assert_eq!(
            squash(&remove_comments(content, "testlog")),
            "insert into t values ( '--not a comment' , '/* nor this */' )"
        );
    }

    #[test]
    fn doubled_quote_is_an_escape() {
        let tokens = tokenize("'it''s' x").expect("scans");
        assert_eq!(
            tokens.first(),
            Some(&Token {
                kind: TokenKind::Quoted,
                text: "'it''s'"
            })
        );
    }

    #[test]
    fn comment_ends_a_text_run() {
        let tokens = tokenize("sp_3(1)--tail").expect("scans");
        let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(kinds, vec![TokenKind::Text, TokenKind::Comment]);
    }

    #[test]
    fn split_tokens_keeps_sql_identifier_characters() {
        let words: Vec<_> = split_tokens("sp# sp1 ('a')sp2('a') $tmp obj_1").collect();
        assert_eq!(words, vec!["sp#", "sp1", "a", "sp2", "a", "$tmp", "obj_1"]);
    }

    #[test]
    fn non_ascii_text_is_preserved() {
        assert_eq!(remove_comments("select \u{e9}t\u{e9} -- r\u{e9}sum\u{e9}", "utf8"), "select \u{e9}t\u{e9}");
    }
}
