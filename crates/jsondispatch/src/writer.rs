//! Incremental JSON encoder.
//!
//! A [`Writer`] turns a sequence of calls into JSON text. Objects and arrays
//! are written by passing a closure that writes their contents, so nesting in
//! the output mirrors nesting in the calling code:
//!
//! ```
//! use jsondispatch::Writer;
//!
//! let mut w = Writer::new(Vec::new());
//! w.object(|w| {
//!     w.prop("name", "ada");
//!     w.prop_with("tags", |w| {
//!         w.array(|w| {
//!             w.string("x");
//!             w.int(1);
//!         });
//!     });
//!     w.prop("missing", None::<i64>);
//! });
//! let out = w.close().unwrap();
//! assert_eq!(out, br#"{"name":"ada","tags":["x",1],"missing":null}"#);
//! ```
//!
//! The writer keeps just enough state to place separators and to catch calls
//! that would produce malformed JSON. Such calls are bugs in the caller, not
//! bad data, so they panic instead of returning an error:
//!
//! - inside an object body, only properties may be written;
//! - properties may only be written inside an object body;
//! - a property takes exactly one value;
//! - only one value may be written at the top level.
//!
//! [`Writer::raw`] and [`Writer::raw_byte`] bypass all of this.

use core::fmt;
use std::io::{self, Write};

use chrono::{DateTime, SecondsFormat, TimeZone};

use crate::{escape, options::WriterOptions, pool::Pooled};

/// A JSON encoder writing to `W`.
///
/// Output is collected in a pooled buffer and written through to the sink in
/// chunks of about [`WriterOptions::flush_threshold`] bytes. The first I/O
/// error is kept and returned by [`Writer::close`]; everything written after it
/// is discarded.
///
/// Dropping a writer without closing it discards output that has not been
/// written through yet.
pub struct Writer<W: Write> {
    sink: W,
    buf: Pooled<Vec<u8>>,
    threshold: usize,
    // A value has been written at this level, so the next one needs a comma.
    comma: bool,
    // Directly inside an object body, where only properties may go.
    in_object: bool,
    // Writing the value of a property.
    in_prop: bool,
    depth: usize,
    error: Option<io::Error>,
}

impl<W: Write> Writer<W> {
    /// Creates a writer with default options.
    pub fn new(sink: W) -> Self {
        Self::with_options(sink, WriterOptions::default())
    }

    /// Creates a writer with the given options.
    pub fn with_options(sink: W, options: WriterOptions) -> Self {
        Self {
            sink,
            buf: Pooled::take(),
            threshold: options.flush_threshold,
            comma: false,
            in_object: false,
            in_prop: false,
            depth: 0,
            error: None,
        }
    }

    /// Writes an object; `body` writes its properties.
    ///
    /// # Panics
    ///
    /// If a value may not be written here, or `body` writes anything but
    /// properties.
    pub fn object(&mut self, body: impl FnOnce(&mut Self)) {
        self.nested(b'{', b'}', true, body);
    }

    /// Writes an array; `body` writes its elements.
    ///
    /// # Panics
    ///
    /// If a value may not be written here.
    pub fn array(&mut self, body: impl FnOnce(&mut Self)) {
        self.nested(b'[', b']', false, body);
    }

    fn nested(&mut self, open: u8, close: u8, object: bool, body: impl FnOnce(&mut Self)) {
        self.begin_value();
        let in_prop = core::mem::replace(&mut self.in_prop, false);
        self.buf.push(open);
        self.depth += 1;
        self.comma = false;
        self.in_object = object;
        body(self);
        self.buf.push(close);
        self.depth -= 1;
        self.in_object = false;
        self.in_prop = in_prop;
        self.end_value();
    }

    /// Writes a property whose value is a primitive.
    ///
    /// # Panics
    ///
    /// If not directly inside an object body.
    pub fn prop(&mut self, name: &str, value: impl Primitive) {
        self.prop_with(name, |w| value.write_to(w));
    }

    /// Writes a property; `value` must write exactly one value.
    ///
    /// # Panics
    ///
    /// If not directly inside an object body, or if `value` writes no value
    /// or more than one.
    pub fn prop_with(&mut self, name: &str, value: impl FnOnce(&mut Self)) {
        self.key(name);
        self.in_object = false;
        self.in_prop = true;
        self.comma = false;
        value(self);
        assert!(self.comma, "a property value must be written");
        self.in_prop = false;
        self.in_object = true;
    }

    /// Writes a property whose value is pre-rendered JSON, copied verbatim.
    ///
    /// # Panics
    ///
    /// If not directly inside an object body.
    pub fn prop_raw(&mut self, name: &str, json: &str) {
        self.key(name);
        self.buf.extend_from_slice(json.as_bytes());
        self.comma = true;
        self.drain();
    }

    fn key(&mut self, name: &str) {
        assert!(
            self.in_object,
            "properties may only be written inside an object"
        );
        if self.comma {
            self.buf.push(b',');
        }
        escape::quote(&mut self.buf, name.as_bytes());
        self.buf.push(b':');
    }

    /// Writes `null`.
    pub fn null(&mut self) {
        self.literal(b"null");
    }

    /// Writes `true` or `false`.
    pub fn bool(&mut self, b: bool) {
        self.literal(if b { b"true" } else { b"false" });
    }

    /// Writes a signed integer.
    pub fn int(&mut self, i: i64) {
        self.display(i);
    }

    /// Writes an unsigned integer.
    pub fn uint(&mut self, u: u64) {
        self.display(u);
    }

    /// Writes a number in its shortest round-tripping form. NaN and the
    /// infinities have no JSON representation and are written as `null`.
    pub fn float(&mut self, f: f64) {
        if f.is_finite() {
            self.display(format_args!("{f:?}"));
        } else {
            self.null();
        }
    }

    /// Writes a string.
    pub fn string(&mut self, s: &str) {
        self.string_bytes(s.as_bytes());
    }

    /// Writes a string from bytes that should be UTF-8. Malformed sequences
    /// are written as the escape `\ufffd`.
    pub fn string_bytes(&mut self, s: &[u8]) {
        self.begin_value();
        escape::quote(&mut self.buf, s);
        self.end_value();
    }

    /// Writes an RFC 3339 timestamp string, with as many fractional digits as
    /// the value needs and `Z` for UTC.
    pub fn time<Tz>(&mut self, t: &DateTime<Tz>)
    where
        Tz: TimeZone,
        Tz::Offset: fmt::Display,
    {
        let text = t.to_rfc3339_opts(SecondsFormat::AutoSi, true);
        self.string(&text);
    }

    /// Copies `json` to the output without escaping or separators.
    pub fn raw(&mut self, json: &str) {
        self.buf.extend_from_slice(json.as_bytes());
        self.drain();
    }

    /// Copies one byte to the output without escaping or separators.
    pub fn raw_byte(&mut self, b: u8) {
        self.buf.push(b);
        self.drain();
    }

    /// Writes any remaining output, flushes the sink and returns it.
    ///
    /// # Errors
    ///
    /// Returns the first I/O error the sink reported during the writer's
    /// lifetime, or the error from the final write or flush.
    pub fn close(self) -> io::Result<W> {
        let mut sink = self.into_sink()?;
        sink.flush()?;
        log::trace!("writer closed");
        Ok(sink)
    }

    /// Writes any remaining output and returns the sink unflushed.
    pub(crate) fn into_sink(mut self) -> io::Result<W> {
        self.write_through();
        if let Some(e) = self.error.take() {
            return Err(e);
        }
        let Self { sink, .. } = self;
        Ok(sink)
    }

    fn begin_value(&mut self) {
        assert!(
            !self.in_object,
            "an object body may only contain properties"
        );
        if self.comma {
            assert!(!self.in_prop, "a property takes exactly one value");
            assert!(
                self.depth > 0,
                "only one top-level JSON value may be written"
            );
            self.buf.push(b',');
        }
    }

    fn end_value(&mut self) {
        self.comma = true;
        self.drain();
    }

    fn literal(&mut self, text: &[u8]) {
        self.begin_value();
        self.buf.extend_from_slice(text);
        self.end_value();
    }

    fn display(&mut self, value: impl fmt::Display) {
        self.begin_value();
        // Formatting into a Vec cannot fail.
        let _ = write!(&mut *self.buf, "{value}");
        self.end_value();
    }

    fn drain(&mut self) {
        if self.buf.len() >= self.threshold {
            self.write_through();
        }
    }

    fn write_through(&mut self) {
        if self.error.is_none() && !self.buf.is_empty() {
            if let Err(e) = self.sink.write_all(&self.buf) {
                log::debug!("JSON writer sink failed: {e}");
                self.error = Some(e);
            }
        }
        self.buf.clear();
    }
}

impl<W: Write> fmt::Debug for Writer<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Writer")
            .field("buffered", &self.buf.len())
            .field("depth", &self.depth)
            .field("comma", &self.comma)
            .field("in_object", &self.in_object)
            .field("failed", &self.error.is_some())
            .finish_non_exhaustive()
    }
}

/// A value that [`Writer::prop`] can write directly.
pub trait Primitive {
    /// Writes `self` as one JSON value.
    fn write_to<W: Write>(self, writer: &mut Writer<W>);
}

impl Primitive for () {
    fn write_to<W: Write>(self, writer: &mut Writer<W>) {
        writer.null();
    }
}

impl Primitive for bool {
    fn write_to<W: Write>(self, writer: &mut Writer<W>) {
        writer.bool(self);
    }
}

macro_rules! primitive_int {
    ($method:ident: $wide:ty => $($t:ty),*) => {
        $(
            impl Primitive for $t {
                fn write_to<W: Write>(self, writer: &mut Writer<W>) {
                    writer.$method(<$wide>::from(self));
                }
            }
        )*
    };
}

primitive_int!(int: i64 => i8, i16, i32, i64);
primitive_int!(uint: u64 => u8, u16, u32, u64);

impl Primitive for isize {
    fn write_to<W: Write>(self, writer: &mut Writer<W>) {
        match i64::try_from(self) {
            Ok(n) => writer.int(n),
            Err(_) => writer.display(self),
        }
    }
}

impl Primitive for usize {
    fn write_to<W: Write>(self, writer: &mut Writer<W>) {
        match u64::try_from(self) {
            Ok(n) => writer.uint(n),
            Err(_) => writer.display(self),
        }
    }
}

impl Primitive for f32 {
    fn write_to<W: Write>(self, writer: &mut Writer<W>) {
        if self.is_finite() {
            // Print the f32's own shortest form rather than its f64 widening.
            writer.display(format_args!("{self:?}"));
        } else {
            writer.null();
        }
    }
}

impl Primitive for f64 {
    fn write_to<W: Write>(self, writer: &mut Writer<W>) {
        writer.float(self);
    }
}

impl Primitive for &str {
    fn write_to<W: Write>(self, writer: &mut Writer<W>) {
        writer.string(self);
    }
}

impl Primitive for String {
    fn write_to<W: Write>(self, writer: &mut Writer<W>) {
        writer.string(&self);
    }
}

impl Primitive for &String {
    fn write_to<W: Write>(self, writer: &mut Writer<W>) {
        writer.string(self);
    }
}

impl<Tz> Primitive for DateTime<Tz>
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    fn write_to<W: Write>(self, writer: &mut Writer<W>) {
        writer.time(&self);
    }
}

impl<T: Primitive> Primitive for Option<T> {
    fn write_to<W: Write>(self, writer: &mut Writer<W>) {
        match self {
            Some(v) => v.write_to(writer),
            None => writer.null(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(f: impl FnOnce(&mut Writer<Vec<u8>>)) -> String {
        let mut w = Writer::new(Vec::new());
        f(&mut w);
        String::from_utf8(w.close().unwrap()).unwrap()
    }

    #[test]
    fn separators_between_siblings() {
        let out = render(|w| {
            w.array(|w| {
                w.int(1);
                w.array(|_| {});
                w.object(|_| {});
                w.null();
            });
        });
        assert_eq!(out, "[1,[],{},null]");
    }

    #[test]
    fn nothing_written_closes_empty() {
        assert_eq!(render(|_| {}), "");
    }

    #[test]
    #[should_panic(expected = "an object body may only contain properties")]
    fn primitive_in_object_body_panics() {
        render(|w| w.object(|w| w.int(1)));
    }

    #[test]
    #[should_panic(expected = "properties may only be written inside an object")]
    fn prop_in_array_panics() {
        render(|w| w.array(|w| w.prop("a", 1)));
    }

    #[test]
    #[should_panic(expected = "properties may only be written inside an object")]
    fn prop_at_top_level_panics() {
        render(|w| w.prop("a", 1));
    }

    #[test]
    #[should_panic(expected = "a property value must be written")]
    fn empty_prop_value_panics() {
        render(|w| w.object(|w| w.prop_with("a", |_| {})));
    }

    #[test]
    #[should_panic(expected = "a property takes exactly one value")]
    fn two_prop_values_panic() {
        render(|w| {
            w.object(|w| {
                w.prop_with("a", |w| {
                    w.int(1);
                    w.int(2);
                });
            });
        });
    }

    #[test]
    #[should_panic(expected = "only one top-level JSON value may be written")]
    fn second_top_level_value_panics() {
        render(|w| {
            w.int(1);
            w.int(2);
        });
    }

    #[test]
    fn small_threshold_writes_through_early() {
        let mut w = Writer::with_options(Vec::new(), WriterOptions { flush_threshold: 4 });
        w.array(|w| {
            w.string("abcdef");
            assert_eq!(w.sink, b"[\"abcdef\"");
            w.int(7);
        });
        assert_eq!(w.close().unwrap(), b"[\"abcdef\",7]");
    }

    #[derive(Debug)]
    struct FailingSink;

    impl Write for FailingSink {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            Err(io::Error::other("disk full"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn first_sink_error_is_returned_by_close() {
        let mut w = Writer::with_options(FailingSink, WriterOptions { flush_threshold: 1 });
        w.array(|w| {
            w.int(1);
            w.int(2);
        });
        let err = w.close().unwrap_err();
        assert_eq!(err.to_string(), "disk full");
    }

    #[test]
    fn dropping_unclosed_writer_discards_buffer() {
        let mut sink = Vec::new();
        {
            let mut w = Writer::new(&mut sink);
            w.string("never flushed");
        }
        assert!(sink.is_empty());
    }
}
