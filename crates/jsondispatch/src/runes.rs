//! Code-point cursor over a buffered byte reader.
//!
//! [`Runes`] decodes UTF-8 one `char` at a time, tracks the 1-based line and
//! column of the next unread character and supports pushing back the most
//! recently read character. A malformed UTF-8 sequence decodes to a single
//! U+FFFD, so the cursor never fails on bad encoding.

use std::io::{self, BufRead};

use crate::error::Error;

#[derive(Debug)]
pub(crate) struct Runes<R> {
    reader: R,
    pushed: Option<char>,
    line: usize,
    column: usize,
    prev_line: usize,
    prev_column: usize,
}

/// Expected length of the UTF-8 sequence introduced by `lead`.
#[inline]
fn sequence_len(lead: u8) -> usize {
    match lead {
        0xC2..=0xDF => 2,
        0xE0..=0xEF => 3,
        0xF0..=0xF4 => 4,
        _ => 1,
    }
}

impl<R: BufRead> Runes<R> {
    pub(crate) fn new(reader: R) -> Self {
        Self {
            reader,
            pushed: None,
            line: 1,
            column: 1,
            prev_line: 1,
            prev_column: 1,
        }
    }

    /// Line and column of the next unread character.
    pub(crate) fn position(&self) -> (usize, usize) {
        (self.line, self.column)
    }

    fn peek_byte(&mut self) -> Result<Option<u8>, Error> {
        loop {
            match self.reader.fill_buf() {
                Ok(buf) => return Ok(buf.first().copied()),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e.into()),
            }
        }
    }

    fn next_byte(&mut self) -> Result<Option<u8>, Error> {
        let byte = self.peek_byte()?;
        if byte.is_some() {
            self.reader.consume(1);
        }
        Ok(byte)
    }

    fn next_continuation(&mut self) -> Result<Option<u8>, Error> {
        match self.peek_byte()? {
            Some(b) if b & 0xC0 == 0x80 => {
                self.reader.consume(1);
                Ok(Some(b))
            }
            _ => Ok(None),
        }
    }

    fn decode(&mut self) -> Result<Option<char>, Error> {
        let Some(lead) = self.next_byte()? else {
            return Ok(None);
        };
        if lead.is_ascii() {
            return Ok(Some(char::from(lead)));
        }
        let mut bytes = [lead, 0, 0, 0];
        let mut len = 1;
        while len < sequence_len(lead) {
            match self.next_continuation()? {
                Some(b) => {
                    bytes[len] = b;
                    len += 1;
                }
                None => break,
            }
        }
        let (ch, _) = bstr::decode_utf8(&bytes[..len]);
        Ok(Some(ch.unwrap_or(char::REPLACEMENT_CHARACTER)))
    }

    /// Reads the next character, or `None` at end of input.
    pub(crate) fn next_char(&mut self) -> Result<Option<char>, Error> {
        let ch = match self.pushed.take() {
            Some(ch) => Some(ch),
            None => self.decode()?,
        };
        if let Some(ch) = ch {
            self.prev_line = self.line;
            self.prev_column = self.column;
            if ch == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
        Ok(ch)
    }

    /// Pushes back `ch`, which must be the character just read.
    pub(crate) fn unread(&mut self, ch: char) {
        debug_assert!(self.pushed.is_none(), "only one character of pushback");
        self.pushed = Some(ch);
        self.line = self.prev_line;
        self.column = self.prev_column;
    }

    /// Skips JSON whitespace: space, tab, carriage return and line feed.
    pub(crate) fn skip_whitespace(&mut self) -> Result<(), Error> {
        while let Some(ch) = self.next_char()? {
            if !matches!(ch, ' ' | '\t' | '\r' | '\n') {
                self.unread(ch);
                break;
            }
        }
        Ok(())
    }
}
