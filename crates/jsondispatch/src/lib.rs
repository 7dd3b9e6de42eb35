//! Streaming JSON without a value tree.
//!
//! The decoder reads JSON from any [`Read`](std::io::Read) and hands each
//! value straight to a callback chosen by the caller. Nested objects and arrays
//! are described by nested [`Handlers`], so the shape of the handler tree is
//! the schema of the accepted document: values of a kind nobody registered for
//! are errors unless the handler set was told to ignore them.
//!
//! The [`Writer`] goes the other way, producing JSON from a sequence of calls
//! and panicking on any sequence that would not be well-formed JSON.
//!
//! ```
//! use std::cell::RefCell;
//! use jsondispatch::{from_str, Handlers, Writer};
//!
//! let names = RefCell::new(Vec::new());
//! from_str(
//!     r#"[{"name": "ada", "born": 1815}, {"name": "grace"}]"#,
//!     Handlers::array(Handlers::object(|key| match key {
//!         "name" => Handlers::string(|s| {
//!             names.borrow_mut().push(s.to_owned());
//!             Ok(())
//!         }),
//!         _ => Handlers::ignore(),
//!     })),
//! )
//! .unwrap();
//!
//! let mut w = Writer::new(Vec::new());
//! w.array(|w| {
//!     for name in names.borrow().iter() {
//!         w.string(name);
//!     }
//! });
//! assert_eq!(w.close().unwrap(), br#"["ada","grace"]"#);
//! ```
//!
//! # Features
//!
//! - `gzip`: [`GzipWriter`], a writer that compresses its output.

mod decoder;
mod error;
mod escape;
#[cfg(feature = "gzip")]
mod gzip;
mod handlers;
mod options;
mod pool;
mod runes;
mod writer;

#[cfg(test)]
mod tests;

pub use decoder::{Decoder, from_slice, from_str, parse, parse_each};
pub use error::{BoxError, Error, ErrorKind, ParserError};
#[cfg(feature = "gzip")]
pub use gzip::GzipWriter;
pub use handlers::{HandlerResult, Handlers, KeyHandler, KeyMap};
pub use options::{DEFAULT_FLUSH_THRESHOLD, DEFAULT_MAX_DEPTH, DecoderOptions, WriterOptions};
pub use writer::{Primitive, Writer};
