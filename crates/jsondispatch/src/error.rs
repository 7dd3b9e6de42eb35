use std::io;

use thiserror::Error;

/// Error type returned by handler callbacks.
pub type BoxError = Box<dyn core::error::Error + Send + Sync>;

/// Error returned by every decoding entry point.
///
/// Syntax, dispatch and conversion failures carry the line and column where
/// they were detected. Failures raised by handlers and by the underlying
/// reader are passed through untouched so callers can downcast them.
#[derive(Error, Debug)]
pub enum Error {
    /// The input ended before a complete value was read.
    #[error("unexpected end of input")]
    Eof,
    /// The underlying reader failed.
    #[error(transparent)]
    Io(io::Error),
    /// A handler callback rejected the value it was given.
    #[error(transparent)]
    Handler(BoxError),
    /// The input is not acceptable JSON for the registered handlers.
    #[error(transparent)]
    Parse(#[from] ParserError),
}

impl Error {
    /// Returns `true` if the input ended before a complete value was read.
    #[must_use]
    pub fn is_eof(&self) -> bool {
        matches!(self, Self::Eof)
    }

    /// Returns the positional error, if this is one.
    #[must_use]
    pub fn as_parse(&self) -> Option<&ParserError> {
        match self {
            Self::Parse(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        if err.kind() == io::ErrorKind::UnexpectedEof {
            Self::Eof
        } else {
            Self::Io(err)
        }
    }
}

/// A decoding failure with the cursor position where it was detected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind} at {line}:{column}")]
pub struct ParserError {
    pub(crate) kind: ErrorKind,
    /// 1-based line of the cursor when the error was raised.
    pub line: usize,
    /// 1-based column of the cursor when the error was raised.
    pub column: usize,
}

impl ParserError {
    /// What went wrong.
    #[must_use]
    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }
}

/// The reason a value could not be decoded.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
#[allow(missing_docs)]
pub enum ErrorKind {
    #[error("JSON syntax error")]
    Syntax,
    #[error("unexpected '{{' in JSON")]
    UnexpectedObject,
    #[error("unexpected '[' in JSON")]
    UnexpectedArray,
    #[error("expected string key in JSON")]
    ExpectedKey,
    #[error("unexpected key \"{0}\" in JSON")]
    UnexpectedKey(String),
    #[error("expected ':' in JSON")]
    ExpectedColon,
    #[error("expected '}}' or ',' in JSON")]
    ExpectedObjectEnd,
    #[error("expected ']' or ',' in JSON")]
    ExpectedArrayEnd,
    #[error("JSON number too long")]
    NumberTooLong,
    #[error("invalid JSON number")]
    InvalidNumber,
    #[error("JSON number is not an integer")]
    NotAnInteger,
    #[error("JSON integer out of range")]
    IntegerOutOfRange,
    #[error("unexpected number in JSON")]
    UnexpectedNumber,
    #[error("unexpected Boolean in JSON")]
    UnexpectedBoolean,
    #[error("unexpected null in JSON")]
    UnexpectedNull,
    #[error("unquoted string in JSON")]
    UnquotedString,
    #[error("unexpected control character in JSON string")]
    ControlCharacter,
    #[error("invalid Unicode escape in JSON string")]
    InvalidUnicodeEscape,
    #[error("unexpected escape sequence in JSON string")]
    UnexpectedEscape,
    #[error("unexpected string in JSON")]
    UnexpectedString,
    #[error("invalid time string in JSON")]
    InvalidTime,
    #[error("extra text after JSON")]
    ExtraText,
    #[error("JSON nesting too deep")]
    NestingTooDeep,
    #[error("decoder stopped after an earlier error")]
    Stopped,
}
