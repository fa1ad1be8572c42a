//! Winnow-based parser for the textual operation grammar.
//!
//! Grammar (case-insensitive, one command per line):
//!
//! ```text
//! line      = WS? call WS? COMMENT?
//! call      = "exit"
//!           | name "(" WS? args WS? ")"
//! name      = IDENT
//! args      = (arg (WS? "," WS? arg)*)?
//! arg       = IDENT | INTEGER
//! ```
//!
//! A well-formed call whose name is not one of the seven operation kinds
//! parses to [`Operation::Unknown`]; the core reports and ignores it.
//! Malformed syntax and out-of-range arguments are rejected here, at the
//! boundary, with a [`ParseError`].

use replisim_core::types::{SiteId, VariableId};
use replisim_core::{Operation, TransactionId};
use winnow::combinator::{opt, separated};
use winnow::prelude::*;
use winnow::token::{literal, one_of, take_while};
use winnow::ModalResult;

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// One parsed input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// An operation record for the transaction manager.
    Op(Operation),
    /// `exit` -- the driving loop terminates immediately.
    Exit,
}

/// A parse error with human-readable location information.
#[derive(Debug, Clone)]
pub struct ParseError {
    pub message: String,
    /// 1-based column of the offending input (1 for argument errors that
    /// concern the call as a whole).
    pub column: usize,
}

impl core::fmt::Display for ParseError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "parse error at column {}: {}", self.column, self.message)
    }
}

impl std::error::Error for ParseError {}

impl ParseError {
    fn semantic(message: String) -> Self {
        Self { message, column: 1 }
    }
}

// ---------------------------------------------------------------------------
// Public entry point
// ---------------------------------------------------------------------------

/// Parse a single input line into a [`Command`].
///
/// The line is lowercased first, so `Begin(T1)` and `begin(t1)` are the
/// same command.
///
/// # Errors
///
/// Returns a [`ParseError`] when the line does not conform to the grammar
/// or an argument is malformed or out of range.
pub fn parse_line(input: &str) -> Result<Command, ParseError> {
    let lowered = input.to_lowercase();
    let mut stream: &str = lowered.as_str();

    let call = match line_parser.parse_next(&mut stream) {
        Ok(call) => call,
        Err(e) => {
            let consumed = lowered.len().saturating_sub(stream.len());
            return Err(ParseError {
                message: e.to_string(),
                column: consumed + 1,
            });
        }
    };
    if !stream.is_empty() {
        let consumed = lowered.len() - stream.len();
        return Err(ParseError {
            message: format!("trailing input {stream:?}"),
            column: consumed + 1,
        });
    }
    command_from(&call)
}

// ---------------------------------------------------------------------------
// Structural parsers
// ---------------------------------------------------------------------------

/// A structurally parsed call, before argument interpretation.
#[derive(Debug)]
struct Call {
    name: String,
    args: Vec<String>,
}

/// Optional inline whitespace: spaces and tabs only.
fn opt_ws(input: &mut &str) -> ModalResult<()> {
    take_while(0.., |c: char| c == ' ' || c == '\t')
        .void()
        .parse_next(input)
}

/// An identifier: a letter or underscore, then letters, digits, underscores.
fn ident(input: &mut &str) -> ModalResult<String> {
    (
        one_of(|c: char| c.is_ascii_alphabetic() || c == '_'),
        take_while(0.., |c: char| c.is_ascii_alphanumeric() || c == '_'),
    )
        .take()
        .map(str::to_string)
        .parse_next(input)
}

/// One call argument: an identifier or an (optionally negative) integer.
fn arg(input: &mut &str) -> ModalResult<String> {
    take_while(1.., |c: char| {
        c.is_ascii_alphanumeric() || c == '_' || c == '-'
    })
    .map(str::to_string)
    .parse_next(input)
}

/// Argument separator: `WS? "," WS?`.
fn arg_separator(input: &mut &str) -> ModalResult<()> {
    opt_ws.parse_next(input)?;
    literal(",").parse_next(input)?;
    opt_ws.parse_next(input)
}

/// A trailing `// comment`, consumed and discarded.
fn trailing_comment(input: &mut &str) -> ModalResult<()> {
    literal("//").parse_next(input)?;
    take_while(0.., |c: char| c != '\n')
        .void()
        .parse_next(input)
}

/// `WS? name ( "(" WS? args WS? ")" )? WS? COMMENT?` -- the parenthesized
/// part is absent only for `exit`.
fn line_parser(input: &mut &str) -> ModalResult<Call> {
    opt_ws.parse_next(input)?;
    let name = ident.parse_next(input)?;

    if name == "exit" {
        opt_ws.parse_next(input)?;
        return Ok(Call {
            name,
            args: Vec::new(),
        });
    }

    literal("(").parse_next(input)?;
    opt_ws.parse_next(input)?;
    let args: Vec<String> = separated(0.., arg, arg_separator).parse_next(input)?;
    opt_ws.parse_next(input)?;
    literal(")").parse_next(input)?;
    opt_ws.parse_next(input)?;
    opt(trailing_comment).void().parse_next(input)?;
    Ok(Call { name, args })
}

// ---------------------------------------------------------------------------
// Argument interpretation
// ---------------------------------------------------------------------------

fn command_from(call: &Call) -> Result<Command, ParseError> {
    let op = match call.name.as_str() {
        "exit" => return Ok(Command::Exit),
        "begin" => Operation::Begin {
            tx: tx_arg(call, 0)?,
        },
        "r" => Operation::Read {
            tx: tx_arg(call, 0)?,
            variable: variable_arg(call, 1)?,
        },
        "w" => Operation::Write {
            tx: tx_arg(call, 0)?,
            variable: variable_arg(call, 1)?,
            value: value_arg(call, 2)?,
        },
        "end" => Operation::End {
            tx: tx_arg(call, 0)?,
        },
        "fail" => Operation::Fail {
            site: site_arg(call, 0)?,
        },
        "recover" => Operation::Recover {
            site: site_arg(call, 0)?,
        },
        "dump" => Operation::Dump,
        _ => Operation::Unknown,
    };
    Ok(Command::Op(op))
}

fn raw_arg<'a>(call: &'a Call, index: usize) -> Result<&'a str, ParseError> {
    call.args.get(index).map(String::as_str).ok_or_else(|| {
        ParseError::semantic(format!(
            "{} expects at least {} argument(s), got {}",
            call.name,
            index + 1,
            call.args.len()
        ))
    })
}

fn tx_arg(call: &Call, index: usize) -> Result<TransactionId, ParseError> {
    raw_arg(call, index).map(TransactionId::new)
}

fn variable_arg(call: &Call, index: usize) -> Result<VariableId, ParseError> {
    let raw = raw_arg(call, index)?;
    VariableId::from_name(raw)
        .ok_or_else(|| ParseError::semantic(format!("{raw:?} is not a variable (expected x1..x20)")))
}

fn value_arg(call: &Call, index: usize) -> Result<i64, ParseError> {
    let raw = raw_arg(call, index)?;
    raw.parse::<i64>()
        .map_err(|_| ParseError::semantic(format!("{raw:?} is not an integer value")))
}

fn site_arg(call: &Call, index: usize) -> Result<SiteId, ParseError> {
    let raw = raw_arg(call, index)?;
    let id = raw
        .parse::<u8>()
        .map_err(|_| ParseError::semantic(format!("{raw:?} is not a site id")))?;
    SiteId::new(id)
        .ok_or_else(|| ParseError::semantic(format!("site {id} is out of range (1..=10)")))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
