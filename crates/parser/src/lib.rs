//! Textual operation grammar for the replisim simulator.
//!
//! Turns one input line at a time into the core's typed
//! [`Operation`](replisim_core::Operation) records: a [`logos`] lexer for
//! token classification ([`lexer`]) and a [`winnow`] combinator parser for
//! the command structure ([`parser`]).

pub mod lexer;
pub mod parser;

pub use lexer::{is_trivia_line, tokenize, Token, TokenKind};
pub use parser::{parse_line, Command, ParseError};
