/// Default limit on object/array nesting.
pub const DEFAULT_MAX_DEPTH: usize = 128;

/// Default number of buffered bytes after which a writer passes its output on
/// to the sink.
pub const DEFAULT_FLUSH_THRESHOLD: usize = 4096;

/// Configuration options for the decoder.
///
/// # Default
///
/// `max_depth` defaults to [`DEFAULT_MAX_DEPTH`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecoderOptions {
    /// Maximum nesting of objects and arrays.
    ///
    /// The decoder descends recursively, one native stack frame group per
    /// nesting level, so an unbounded depth would let hostile input exhaust
    /// the stack. Exceeding this limit fails the parse with
    /// [`ErrorKind::NestingTooDeep`](crate::ErrorKind::NestingTooDeep).
    ///
    /// # Examples
    ///
    /// `[[1]]` has a depth of 2.
    ///
    /// # Default
    ///
    /// `128`
    pub max_depth: usize,
}

impl Default for DecoderOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl DecoderOptions {
    /// Sets [`max_depth`](Self::max_depth).
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
}

/// Configuration options for [`Writer`](crate::Writer).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriterOptions {
    /// Number of buffered bytes after which output is written through to the
    /// sink. The sink itself is flushed only once, when the writer is closed.
    ///
    /// # Default
    ///
    /// `4096`
    pub flush_threshold: usize,
}

impl Default for WriterOptions {
    fn default() -> Self {
        Self {
            flush_threshold: DEFAULT_FLUSH_THRESHOLD,
        }
    }
}

impl WriterOptions {
    /// Sets [`flush_threshold`](Self::flush_threshold).
    #[must_use]
    pub fn with_flush_threshold(mut self, flush_threshold: usize) -> Self {
        self.flush_threshold = flush_threshold;
        self
    }
}
