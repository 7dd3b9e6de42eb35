//! Handler-driven JSON decoder.
//!
//! The decoder is a recursive descent over the input that never builds a
//! value tree. For every value it skips leading whitespace, classifies the
//! value by its first character and hands it to the matching callback of the
//! caller's [`Handlers`]:
//!
//! | first character | value   | callbacks consulted, in order       |
//! |-----------------|---------|-------------------------------------|
//! | `{`             | object  | object key mapping                  |
//! | `[`             | array   | array element handlers              |
//! | `0`-`9`, `-`    | number  | `int`, then `float`                 |
//! | `t`, `f`, `n`   | keyword | `bool` or `null`                    |
//! | `"`             | string  | `time`, then `string`               |
//!
//! A value with no usable callback is discarded when the set has `ignore`
//! enabled and is an error otherwise. The first error anywhere aborts the
//! whole parse; the decoder refuses further work afterwards.

use std::io::{BufRead, BufReader, Read};

use chrono::DateTime;

use crate::{
    error::{Error, ErrorKind, ParserError},
    handlers::{ArrayDispatch, Handlers, ObjectDispatch},
    options::DecoderOptions,
    pool::Pooled,
    runes::Runes,
};

/// Longest numeric token accepted.
const MAX_NUMBER_LEN: usize = 64;
/// Length of the longest keyword, `false`.
const MAX_KEYWORD_LEN: usize = 5;

/// A decoder over a buffered reader.
///
/// Most callers want [`parse`], [`from_str`] or [`from_slice`]. Use a
/// `Decoder` directly to parse several values from one stream, or to inspect
/// the cursor position.
#[derive(Debug)]
pub struct Decoder<R> {
    input: Runes<R>,
    scratch: Pooled<String>,
    options: DecoderOptions,
    depth: usize,
    stopped: bool,
}

impl<R: BufRead> Decoder<R> {
    /// Creates a decoder with default options.
    pub fn new(reader: R) -> Self {
        Self::with_options(reader, DecoderOptions::default())
    }

    /// Creates a decoder with the given options.
    pub fn with_options(reader: R, options: DecoderOptions) -> Self {
        Self {
            input: Runes::new(reader),
            scratch: Pooled::take(),
            options,
            depth: 0,
            stopped: false,
        }
    }

    /// The 1-based line and column of the next unread character.
    #[must_use]
    pub fn position(&self) -> (usize, usize) {
        self.input.position()
    }

    /// Consumes exactly one JSON value, dispatching it to `handlers`.
    ///
    /// Leading whitespace is skipped; whatever follows the value is left
    /// unread.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Eof`] if the input ends first, [`Error::Parse`] for
    /// malformed input or a value the handlers do not accept, and passes
    /// handler and I/O failures through unchanged. After any error the decoder
    /// is stopped and every later call fails with [`ErrorKind::Stopped`].
    pub fn parse_value(&mut self, handlers: &mut Handlers<'_>) -> Result<(), Error> {
        self.run(|d| d.value(handlers))
    }

    /// Skips whitespace and reports whether the input is exhausted.
    ///
    /// # Errors
    ///
    /// Fails if the decoder is stopped or the reader fails.
    pub fn at_end(&mut self) -> Result<bool, Error> {
        self.run(|d| {
            d.input.skip_whitespace()?;
            match d.input.next_char()? {
                Some(c) => {
                    d.input.unread(c);
                    Ok(false)
                }
                None => Ok(true),
            }
        })
    }

    /// Checks that nothing but whitespace remains in the input.
    ///
    /// Any Unicode whitespace is accepted here, not just the four characters
    /// JSON allows between tokens.
    ///
    /// # Errors
    ///
    /// Fails with [`ErrorKind::ExtraText`] at the first other character.
    pub fn finish(mut self) -> Result<(), Error> {
        self.run(|d| {
            while let Some(c) = d.input.next_char()? {
                if !c.is_whitespace() {
                    return Err(d.error(ErrorKind::ExtraText));
                }
            }
            Ok(())
        })
    }

    fn run<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T, Error>) -> Result<T, Error> {
        if self.stopped {
            return Err(self.error(ErrorKind::Stopped));
        }
        let result = f(self);
        if result.is_err() {
            self.stopped = true;
        }
        result
    }

    fn error(&self, kind: ErrorKind) -> Error {
        let (line, column) = self.input.position();
        log::debug!("{kind} at {line}:{column}");
        Error::Parse(ParserError { kind, line, column })
    }

    fn next_or_eof(&mut self) -> Result<char, Error> {
        self.input.next_char()?.ok_or(Error::Eof)
    }

    // ---------------------------------------------------------------------
    // Dispatch
    // ---------------------------------------------------------------------

    fn value(&mut self, handlers: &mut Handlers<'_>) -> Result<(), Error> {
        self.input.skip_whitespace()?;
        let c = self.next_or_eof()?;
        match c {
            '{' => self.nested(|d| d.object(handlers)),
            '[' => self.nested(|d| d.array(handlers)),
            '0'..='9' | '-' => {
                self.input.unread(c);
                self.number(handlers)
            }
            't' | 'f' | 'n' => {
                self.input.unread(c);
                self.keyword(handlers)
            }
            '"' => self.string(handlers),
            _ => Err(self.error(ErrorKind::Syntax)),
        }
    }

    fn nested(&mut self, f: impl FnOnce(&mut Self) -> Result<(), Error>) -> Result<(), Error> {
        if self.depth >= self.options.max_depth {
            return Err(self.error(ErrorKind::NestingTooDeep));
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    // ---------------------------------------------------------------------
    // Objects and arrays
    // ---------------------------------------------------------------------

    fn object(&mut self, handlers: &mut Handlers<'_>) -> Result<(), Error> {
        match handlers.object.as_mut() {
            Some(ObjectDispatch::Keys(keys)) => self.members(|d| {
                let mut value = keys(d.scratch.as_str());
                d.member(&mut value)
            }),
            Some(ObjectDispatch::PerObject(start)) => {
                let mut keys = start();
                self.members(|d| {
                    let mut value = keys(d.scratch.as_str());
                    d.member(&mut value)
                })
            }
            Some(ObjectDispatch::Fields(fields)) => self.members(|d| {
                let mut value = fields.handlers(d.scratch.as_str());
                d.member(&mut value)
            }),
            None if handlers.ignore => self.members(|d| d.member(&mut Handlers::ignore())),
            None => Err(self.error(ErrorKind::UnexpectedObject)),
        }
    }

    /// Walks an object body after its `{`. `each` is called with the key in
    /// the scratch buffer and must consume the `:` and the value.
    fn members(&mut self, mut each: impl FnMut(&mut Self) -> Result<(), Error>) -> Result<(), Error> {
        self.input.skip_whitespace()?;
        match self.next_or_eof()? {
            '}' => return Ok(()),
            c => self.input.unread(c),
        }
        loop {
            self.key()?;
            each(self)?;
            self.input.skip_whitespace()?;
            match self.next_or_eof()? {
                '}' => return Ok(()),
                ',' => {}
                _ => return Err(self.error(ErrorKind::ExpectedObjectEnd)),
            }
        }
    }

    fn key(&mut self) -> Result<(), Error> {
        self.input.skip_whitespace()?;
        match self.next_or_eof()? {
            '"' => self.read_string(),
            _ => Err(self.error(ErrorKind::ExpectedKey)),
        }
    }

    fn member(&mut self, handlers: &mut Handlers<'_>) -> Result<(), Error> {
        if handlers.is_empty() {
            let key = self.scratch.as_str().to_owned();
            return Err(self.error(ErrorKind::UnexpectedKey(key)));
        }
        self.input.skip_whitespace()?;
        if self.next_or_eof()? != ':' {
            return Err(self.error(ErrorKind::ExpectedColon));
        }
        self.value(handlers)
    }

    fn array(&mut self, handlers: &mut Handlers<'_>) -> Result<(), Error> {
        match handlers.array.as_mut() {
            Some(ArrayDispatch::Elements(elements)) => self.elements(elements),
            Some(ArrayDispatch::PerArray(start)) => {
                let mut elements = start();
                self.elements(&mut elements)
            }
            None if handlers.ignore => self.elements(&mut Handlers::ignore()),
            None => Err(self.error(ErrorKind::UnexpectedArray)),
        }
    }

    fn elements(&mut self, handlers: &mut Handlers<'_>) -> Result<(), Error> {
        self.input.skip_whitespace()?;
        match self.next_or_eof()? {
            ']' => return Ok(()),
            c => self.input.unread(c),
        }
        loop {
            self.value(handlers)?;
            self.input.skip_whitespace()?;
            match self.next_or_eof()? {
                ']' => return Ok(()),
                ',' => {}
                _ => return Err(self.error(ErrorKind::ExpectedArrayEnd)),
            }
        }
    }

    // ---------------------------------------------------------------------
    // Numbers and keywords
    // ---------------------------------------------------------------------

    fn number(&mut self, handlers: &mut Handlers<'_>) -> Result<(), Error> {
        let mut buf = [0u8; MAX_NUMBER_LEN];
        let mut len = 0;
        while let Some(c) = self.input.next_char()? {
            let Ok(b @ (b'0'..=b'9' | b'-' | b'+' | b'e' | b'E' | b'.')) = u8::try_from(c) else {
                self.input.unread(c);
                break;
            };
            if len == MAX_NUMBER_LEN {
                return Err(self.error(ErrorKind::NumberTooLong));
            }
            buf[len] = b;
            len += 1;
        }
        let Ok(text) = core::str::from_utf8(&buf[..len]) else {
            return Err(self.error(ErrorKind::InvalidNumber));
        };

        if let Some(on_int) = handlers.int.as_mut() {
            if let Ok(i) = text.parse::<i64>() {
                return on_int(i).map_err(Error::Handler);
            }
        }
        let float = text.parse::<f64>().ok().filter(|f| f.is_finite());
        if let Some(on_float) = handlers.float.as_mut() {
            return match float {
                Some(f) => on_float(f).map_err(Error::Handler),
                None => Err(self.error(ErrorKind::InvalidNumber)),
            };
        }
        if handlers.int.is_some() {
            let kind = if float.is_none() {
                ErrorKind::InvalidNumber
            } else if text.contains(['.', 'e', 'E']) {
                ErrorKind::NotAnInteger
            } else {
                ErrorKind::IntegerOutOfRange
            };
            return Err(self.error(kind));
        }
        match float {
            Some(_) if handlers.ignore => Ok(()),
            None if handlers.ignore => Err(self.error(ErrorKind::InvalidNumber)),
            _ => Err(self.error(ErrorKind::UnexpectedNumber)),
        }
    }

    fn keyword(&mut self, handlers: &mut Handlers<'_>) -> Result<(), Error> {
        let mut buf = [0u8; MAX_KEYWORD_LEN];
        let mut len = 0;
        let mut overlong = false;
        while let Some(c) = self.input.next_char()? {
            let Ok(b @ (b'a' | b'e' | b'f' | b'l' | b'n' | b'r' | b's' | b't' | b'u')) =
                u8::try_from(c)
            else {
                self.input.unread(c);
                break;
            };
            if len == MAX_KEYWORD_LEN {
                overlong = true;
            } else {
                buf[len] = b;
                len += 1;
            }
        }
        let word: &[u8] = if overlong { &[] } else { &buf[..len] };
        match word {
            b"true" | b"false" => match handlers.boolean.as_mut() {
                Some(on_bool) => on_bool(word == b"true").map_err(Error::Handler),
                None if handlers.ignore => Ok(()),
                None => Err(self.error(ErrorKind::UnexpectedBoolean)),
            },
            b"null" => match handlers.null.as_mut() {
                Some(on_null) => on_null().map_err(Error::Handler),
                None if handlers.ignore => Ok(()),
                None => Err(self.error(ErrorKind::UnexpectedNull)),
            },
            _ => Err(self.error(ErrorKind::UnquotedString)),
        }
    }

    // ---------------------------------------------------------------------
    // Strings
    // ---------------------------------------------------------------------

    fn string(&mut self, handlers: &mut Handlers<'_>) -> Result<(), Error> {
        self.read_string()?;
        let text = self.scratch.as_str();
        if let Some(on_time) = handlers.time.as_mut() {
            if let Ok(t) = DateTime::parse_from_rfc3339(text) {
                return on_time(t).map_err(Error::Handler);
            }
        }
        if let Some(on_string) = handlers.string.as_mut() {
            return on_string(text).map_err(Error::Handler);
        }
        if handlers.time.is_some() {
            return Err(self.error(ErrorKind::InvalidTime));
        }
        if handlers.ignore {
            return Ok(());
        }
        Err(self.error(ErrorKind::UnexpectedString))
    }

    /// Decodes a string body, after its opening quote, into the scratch
    /// buffer.
    fn read_string(&mut self) -> Result<(), Error> {
        self.scratch.clear();
        // A `\u` high surrogate waiting for its low half.
        let mut high: Option<u32> = None;
        loop {
            let c = self.next_or_eof()?;
            if c == '\\' {
                let e = self.next_or_eof()?;
                if e == 'u' {
                    let code = self.hex4()?;
                    if let Some(hi) = high.take() {
                        if (0xDC00..=0xDFFF).contains(&code) {
                            let combined = 0x10000 + ((hi - 0xD800) << 10) + (code - 0xDC00);
                            self.scratch
                                .push(char::from_u32(combined).unwrap_or(char::REPLACEMENT_CHARACTER));
                            continue;
                        }
                        self.scratch.push(char::REPLACEMENT_CHARACTER);
                    }
                    if (0xD800..=0xDBFF).contains(&code) {
                        high = Some(code);
                    } else {
                        self.scratch
                            .push(char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER));
                    }
                    continue;
                }
                if high.take().is_some() {
                    self.scratch.push(char::REPLACEMENT_CHARACTER);
                }
                let unescaped = match e {
                    '"' | '\\' | '/' => e,
                    'b' => '\u{8}',
                    'f' => '\u{c}',
                    'n' => '\n',
                    'r' => '\r',
                    't' => '\t',
                    _ => return Err(self.error(ErrorKind::UnexpectedEscape)),
                };
                self.scratch.push(unescaped);
                continue;
            }
            if high.take().is_some() {
                self.scratch.push(char::REPLACEMENT_CHARACTER);
            }
            match c {
                '"' => return Ok(()),
                '\0'..='\u{1f}' => return Err(self.error(ErrorKind::ControlCharacter)),
                _ => self.scratch.push(c),
            }
        }
    }

    fn hex4(&mut self) -> Result<u32, Error> {
        let mut code = 0;
        for _ in 0..4 {
            let c = self.next_or_eof()?;
            let Some(digit) = c.to_digit(16) else {
                return Err(self.error(ErrorKind::InvalidUnicodeEscape));
            };
            code = (code << 4) | digit;
        }
        Ok(code)
    }
}

/// Parses exactly one JSON value from `reader`, which must contain nothing
/// else but whitespace.
///
/// The reader is wrapped in a [`BufReader`]; pass an already buffered reader
/// to [`Decoder`] directly to avoid double buffering.
///
/// # Errors
///
/// See [`Decoder::parse_value`] and [`Decoder::finish`].
pub fn parse<R: Read>(reader: R, handlers: Handlers<'_>) -> Result<(), Error> {
    parse_one(BufReader::new(reader), handlers)
}

/// Parses exactly one JSON value from a byte slice.
///
/// # Errors
///
/// See [`parse`].
pub fn from_slice(bytes: &[u8], handlers: Handlers<'_>) -> Result<(), Error> {
    parse_one(bytes, handlers)
}

/// Parses exactly one JSON value from a string.
///
/// # Errors
///
/// See [`parse`].
pub fn from_str(text: &str, handlers: Handlers<'_>) -> Result<(), Error> {
    parse_one(text.as_bytes(), handlers)
}

fn parse_one<R: BufRead>(reader: R, mut handlers: Handlers<'_>) -> Result<(), Error> {
    log::trace!("parse: start");
    let mut decoder = Decoder::new(reader);
    decoder.parse_value(&mut handlers)?;
    decoder.finish()?;
    log::trace!("parse: done");
    Ok(())
}

/// Parses a sequence of whitespace-separated JSON values, such as JSON Lines,
/// dispatching each one to the same `handlers`. Returns the number of values.
///
/// ```
/// use std::cell::Cell;
/// use jsondispatch::{parse_each, Handlers};
///
/// let sum = Cell::new(0);
/// let n = parse_each("1\n2\n3\n".as_bytes(), Handlers::int(|i| {
///     sum.set(sum.get() + i);
///     Ok(())
/// }))
/// .unwrap();
/// assert_eq!((n, sum.get()), (3, 6));
/// ```
///
/// # Errors
///
/// See [`Decoder::parse_value`]. Reaching the end of the input between values
/// is not an error.
pub fn parse_each<R: Read>(reader: R, mut handlers: Handlers<'_>) -> Result<usize, Error> {
    log::trace!("parse_each: start");
    let mut decoder = Decoder::new(BufReader::new(reader));
    let mut count = 0;
    while !decoder.at_end()? {
        decoder.parse_value(&mut handlers)?;
        count += 1;
    }
    log::trace!("parse_each: {count} values");
    Ok(count)
}
