//! Gzip-compressed JSON output.

use core::ops::{Deref, DerefMut};
use std::io::{self, BufWriter, Write};

use flate2::{Compression, write::GzEncoder};

use crate::writer::Writer;

/// A [`Writer`] whose output is gzip-compressed on its way to `W`.
///
/// All encoding calls go through [`Deref`] to the inner JSON writer; only
/// construction and [`close`](GzipWriter::close) differ.
///
/// ```
/// use std::io::Read;
/// use flate2::read::GzDecoder;
/// use jsondispatch::GzipWriter;
///
/// let mut w = GzipWriter::new(Vec::new());
/// w.array(|w| w.string("zipped"));
/// let compressed = w.close().unwrap();
///
/// let mut json = String::new();
/// GzDecoder::new(&compressed[..]).read_to_string(&mut json).unwrap();
/// assert_eq!(json, r#"["zipped"]"#);
/// ```
pub struct GzipWriter<W: Write> {
    json: Writer<GzEncoder<BufWriter<W>>>,
}

impl<W: Write> GzipWriter<W> {
    /// Creates a writer with the default compression level.
    pub fn new(sink: W) -> Self {
        Self::with_level(sink, Compression::default())
    }

    /// Creates a writer with the given compression level.
    pub fn with_level(sink: W, level: Compression) -> Self {
        let encoder = GzEncoder::new(BufWriter::new(sink), level);
        Self {
            json: Writer::new(encoder),
        }
    }

    /// Finishes the JSON output, then the gzip stream, then flushes and
    /// returns the underlying sink.
    ///
    /// # Errors
    ///
    /// Returns the first I/O error from any of the three layers.
    pub fn close(self) -> io::Result<W> {
        let encoder = self.json.into_sink()?;
        let buffered = encoder.finish()?;
        let mut sink = buffered.into_inner().map_err(io::IntoInnerError::into_error)?;
        sink.flush()?;
        log::trace!("gzip writer closed");
        Ok(sink)
    }
}

impl<W: Write> Deref for GzipWriter<W> {
    type Target = Writer<GzEncoder<BufWriter<W>>>;

    fn deref(&self) -> &Self::Target {
        &self.json
    }
}

impl<W: Write> DerefMut for GzipWriter<W> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.json
    }
}
