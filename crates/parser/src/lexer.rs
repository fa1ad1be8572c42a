//! Logos-based lexer for the textual operation stream.
//!
//! One operation per line, case-insensitive:
//!
//! ```text
//! begin(T1)
//! R(T1,x3)
//! W(T1,x3,25)
//! end(T1)
//! fail(2)
//! recover(2)
//! dump()
//! exit
//! ```
//!
//! The lexer only classifies; the winnow parser in
//! [`parser`](crate::parser) builds the typed operation records. It is also
//! used on its own to decide whether a line carries anything to parse at
//! all (blank lines and comments are trivia).

use core::ops::Range;

/// All token kinds of the operation grammar.
#[derive(::logos::Logos, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// A line comment starting with `//` and running to end of line.
    #[regex(r"//[^\n]*", allow_greedy = true)]
    Comment,

    /// Opening parenthesis `(`.
    #[token("(")]
    ParenOpen,

    /// Closing parenthesis `)`.
    #[token(")")]
    ParenClose,

    /// Argument separator `,`.
    #[token(",")]
    Comma,

    /// An identifier: operation name, transaction id, or variable name.
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*")]
    Ident,

    /// An integer literal, optionally negative.
    #[regex(r"-?[0-9]+")]
    Integer,

    /// A newline (`\n` or `\r\n`).
    #[regex(r"\r?\n")]
    Newline,

    /// Spaces or tabs.
    #[regex(r"[ \t]+")]
    Whitespace,
}

impl TokenKind {
    /// Tokens that carry no meaning for the parser.
    #[must_use]
    pub const fn is_trivia(self) -> bool {
        matches!(self, Self::Comment | Self::Newline | Self::Whitespace)
    }
}

/// A single token with its kind and the byte-offset span in the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// What kind of token this is.
    pub kind: TokenKind,
    /// Byte range `start..end` into the original input string.
    pub span: Range<usize>,
}

impl Token {
    #[must_use]
    pub const fn new(kind: TokenKind, span: Range<usize>) -> Self {
        Self { kind, span }
    }

    /// Return the source text for this token given the original input.
    #[must_use]
    pub fn text<'a>(&self, input: &'a str) -> &'a str {
        &input[self.span.clone()]
    }
}

/// Tokenize `input` and return all valid tokens.
///
/// Tokens the lexer cannot recognise are silently skipped; the parser
/// reports them as syntax errors with a position instead.
#[must_use]
pub fn tokenize(input: &str) -> Vec<Token> {
    use logos::Logos as _;
    TokenKind::lexer(input)
        .spanned()
        .filter_map(|(result, span)| result.ok().map(|kind| Token { kind, span }))
        .collect()
}

/// Whether a line holds nothing but whitespace and comments.
#[must_use]
pub fn is_trivia_line(input: &str) -> bool {
    tokenize(input).iter().all(|token| token.kind.is_trivia())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenizes_a_write_operation() {
        let kinds: Vec<_> = tokenize("W(T1,x3,25)").iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::Ident,
                TokenKind::ParenOpen,
                TokenKind::Ident,
                TokenKind::Comma,
                TokenKind::Ident,
                TokenKind::Comma,
                TokenKind::Integer,
                TokenKind::ParenClose,
            ]
        );
    }

    #[test]
    fn token_text_recovers_the_source_slice() {
        let input = "begin(T1)";
        let tokens = tokenize(input);
        assert_eq!(tokens[0].text(input), "begin");
        assert_eq!(tokens[2].text(input), "T1");
    }

    #[test]
    fn negative_integers_are_one_token() {
        let tokens = tokenize("w(t1,x2,-7)");
        let ints: Vec<_> = tokens
            .iter()
            .filter(|t| t.kind == TokenKind::Integer)
            .collect();
        assert_eq!(ints.len(), 1);
        assert_eq!(ints[0].text("w(t1,x2,-7)"), "-7");
    }

    #[test]
    fn trivia_lines() {
        assert!(is_trivia_line(""));
        assert!(is_trivia_line("   \t"));
        assert!(is_trivia_line("// a comment"));
        assert!(!is_trivia_line("dump()"));
        assert!(!is_trivia_line("  end(t1) // trailing"));
    }

    #[test]
    fn unrecognized_bytes_are_skipped() {
        let kinds: Vec<_> = tokenize("fail(2)!").iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::Ident,
                TokenKind::ParenOpen,
                TokenKind::Integer,
                TokenKind::ParenClose,
            ]
        );
    }
}
