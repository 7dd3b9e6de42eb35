//! Per-value handler sets.
//!
//! A [`Handlers`] value describes how the decoder may treat the next JSON
//! value: it holds one optional callback per kind of value plus an `ignore`
//! flag. The decoder looks at the value's first character, picks the matching
//! callback and calls it; if there is none, the value is discarded when
//! `ignore` is set and rejected otherwise.
//!
//! Objects and arrays do not produce a value of their own. Instead their
//! callbacks hand back nested handler sets: a key mapping for objects, which is
//! asked once per key, and a single element handler set for arrays, which is
//! reused for every element.
//!
//! ```
//! use std::cell::{Cell, RefCell};
//! use jsondispatch::{from_str, Handlers};
//!
//! let name = RefCell::new(String::new());
//! let scores = RefCell::new(Vec::new());
//! let active = Cell::new(false);
//!
//! from_str(
//!     r#"{"name": "ada", "scores": [3, 4.5], "active": true, "extra": {"x": [1]}}"#,
//!     Handlers::object(|key| match key {
//!         "name" => Handlers::string(|s| {
//!             name.replace(s.to_owned());
//!             Ok(())
//!         }),
//!         "scores" => Handlers::array(Handlers::float(|f| {
//!             scores.borrow_mut().push(f);
//!             Ok(())
//!         })),
//!         "active" => Handlers::bool(|b| {
//!             active.set(b);
//!             Ok(())
//!         }),
//!         "extra" => Handlers::ignore(),
//!         _ => Handlers::reject(),
//!     }),
//! )
//! .unwrap();
//!
//! assert_eq!(*name.borrow(), "ada");
//! assert_eq!(*scores.borrow(), [3.0, 4.5]);
//! assert!(active.get());
//! ```

use core::fmt;

use chrono::{DateTime, FixedOffset};

use crate::error::BoxError;

/// What a handler callback returns. An `Err` aborts the whole parse and is
/// returned to the caller as [`Error::Handler`](crate::Error::Handler).
pub type HandlerResult = Result<(), BoxError>;

type Callback<'a, T> = Box<dyn FnMut(T) -> HandlerResult + 'a>;

/// A key-to-handler mapping as a boxed closure.
pub type KeyMap<'a> = Box<dyn FnMut(&str) -> Handlers<'a> + 'a>;

/// A key-to-handler mapping whose handler sets may borrow from the mapping
/// itself.
///
/// This is the shape to use when the value handlers need mutable access to
/// the fields of a struct being filled in:
///
/// ```
/// use jsondispatch::{from_str, Handlers, KeyHandler};
///
/// #[derive(Default)]
/// struct Point {
///     x: i64,
///     y: i64,
/// }
///
/// impl KeyHandler for Point {
///     fn handlers(&mut self, key: &str) -> Handlers<'_> {
///         match key {
///             "x" => Handlers::int(move |v| {
///                 self.x = v;
///                 Ok(())
///             }),
///             "y" => Handlers::int(move |v| {
///                 self.y = v;
///                 Ok(())
///             }),
///             _ => Handlers::reject(),
///         }
///     }
/// }
///
/// let mut p = Point::default();
/// from_str(r#"{"x": 1, "y": -2}"#, Handlers::fields(&mut p)).unwrap();
/// assert_eq!((p.x, p.y), (1, -2));
/// ```
pub trait KeyHandler {
    /// Returns the handlers for the value of `key`. Returning an empty set
    /// (see [`Handlers::is_empty`]) rejects the key.
    fn handlers(&mut self, key: &str) -> Handlers<'_>;
}

impl<T: KeyHandler + ?Sized> KeyHandler for &mut T {
    fn handlers(&mut self, key: &str) -> Handlers<'_> {
        (**self).handlers(key)
    }
}

pub(crate) enum ObjectDispatch<'a> {
    Keys(KeyMap<'a>),
    PerObject(Box<dyn FnMut() -> KeyMap<'a> + 'a>),
    Fields(Box<dyn KeyHandler + 'a>),
}

pub(crate) enum ArrayDispatch<'a> {
    Elements(Box<Handlers<'a>>),
    PerArray(Box<dyn FnMut() -> Handlers<'a> + 'a>),
}

/// The callbacks that may consume one JSON value.
///
/// Precedence between overlapping callbacks is fixed:
///
/// - a number is given to the integer callback when it converts to an `i64`,
///   and to the float callback otherwise;
/// - a string is given to the timestamp callback when it parses as an
///   RFC 3339 date-time, and to the string callback otherwise.
///
/// A set with no callbacks and `ignore` unset rejects every value; see
/// [`Handlers::reject`].
#[derive(Default)]
pub struct Handlers<'a> {
    pub(crate) null: Option<Box<dyn FnMut() -> HandlerResult + 'a>>,
    pub(crate) int: Option<Callback<'a, i64>>,
    pub(crate) float: Option<Callback<'a, f64>>,
    pub(crate) string: Option<Box<dyn FnMut(&str) -> HandlerResult + 'a>>,
    pub(crate) time: Option<Callback<'a, DateTime<FixedOffset>>>,
    pub(crate) boolean: Option<Callback<'a, bool>>,
    pub(crate) object: Option<ObjectDispatch<'a>>,
    pub(crate) array: Option<ArrayDispatch<'a>>,
    pub(crate) ignore: bool,
}

impl<'a> Handlers<'a> {
    /// The empty set: any value routed to it is an error.
    #[must_use]
    pub fn reject() -> Self {
        Self::default()
    }

    /// Accepts and discards any value, recursively, without calling anything.
    #[must_use]
    pub fn ignore() -> Self {
        Self {
            ignore: true,
            ..Self::default()
        }
    }

    /// Accepts `null`.
    pub fn null(f: impl FnMut() -> HandlerResult + 'a) -> Self {
        Self::default().with_null(f)
    }

    /// Accepts integral numbers.
    pub fn int(f: impl FnMut(i64) -> HandlerResult + 'a) -> Self {
        Self::default().with_int(f)
    }

    /// Accepts any number.
    pub fn float(f: impl FnMut(f64) -> HandlerResult + 'a) -> Self {
        Self::default().with_float(f)
    }

    /// Accepts strings.
    pub fn string(f: impl FnMut(&str) -> HandlerResult + 'a) -> Self {
        Self::default().with_string(f)
    }

    /// Accepts strings holding an RFC 3339 date-time.
    pub fn time(f: impl FnMut(DateTime<FixedOffset>) -> HandlerResult + 'a) -> Self {
        Self::default().with_time(f)
    }

    /// Accepts `true` and `false`.
    pub fn bool(f: impl FnMut(bool) -> HandlerResult + 'a) -> Self {
        Self::default().with_bool(f)
    }

    /// Accepts objects, mapping each key to the handlers for its value.
    pub fn object(keys: impl FnMut(&str) -> Handlers<'a> + 'a) -> Self {
        Self::default().with_object(keys)
    }

    /// Accepts objects, calling `start` once per object to obtain that
    /// object's key mapping.
    pub fn object_with<F>(start: impl FnMut() -> F + 'a) -> Self
    where
        F: FnMut(&str) -> Handlers<'a> + 'a,
    {
        Self::default().with_object_with(start)
    }

    /// Accepts objects, asking `fields` for the handlers of each key.
    pub fn fields(fields: impl KeyHandler + 'a) -> Self {
        Self::default().with_fields(fields)
    }

    /// Accepts arrays whose elements are all handled by `elements`.
    #[must_use]
    pub fn array(elements: Handlers<'a>) -> Self {
        Self::default().with_array(elements)
    }

    /// Accepts arrays, calling `start` once per array to obtain the handlers
    /// for its elements.
    pub fn array_with(start: impl FnMut() -> Handlers<'a> + 'a) -> Self {
        Self::default().with_array_with(start)
    }

    /// Adds a `null` callback.
    #[must_use]
    pub fn with_null(mut self, f: impl FnMut() -> HandlerResult + 'a) -> Self {
        self.null = Some(Box::new(f));
        self
    }

    /// Adds an integer callback.
    #[must_use]
    pub fn with_int(mut self, f: impl FnMut(i64) -> HandlerResult + 'a) -> Self {
        self.int = Some(Box::new(f));
        self
    }

    /// Adds a float callback.
    #[must_use]
    pub fn with_float(mut self, f: impl FnMut(f64) -> HandlerResult + 'a) -> Self {
        self.float = Some(Box::new(f));
        self
    }

    /// Adds a string callback.
    #[must_use]
    pub fn with_string(mut self, f: impl FnMut(&str) -> HandlerResult + 'a) -> Self {
        self.string = Some(Box::new(f));
        self
    }

    /// Adds a timestamp callback.
    #[must_use]
    pub fn with_time(mut self, f: impl FnMut(DateTime<FixedOffset>) -> HandlerResult + 'a) -> Self {
        self.time = Some(Box::new(f));
        self
    }

    /// Adds a boolean callback.
    #[must_use]
    pub fn with_bool(mut self, f: impl FnMut(bool) -> HandlerResult + 'a) -> Self {
        self.boolean = Some(Box::new(f));
        self
    }

    /// Adds an object key mapping.
    #[must_use]
    pub fn with_object(mut self, keys: impl FnMut(&str) -> Handlers<'a> + 'a) -> Self {
        self.object = Some(ObjectDispatch::Keys(Box::new(keys)));
        self
    }

    /// Adds a per-object key mapping factory.
    #[must_use]
    pub fn with_object_with<F>(mut self, mut start: impl FnMut() -> F + 'a) -> Self
    where
        F: FnMut(&str) -> Handlers<'a> + 'a,
    {
        self.object = Some(ObjectDispatch::PerObject(Box::new(move || {
            Box::new(start()) as KeyMap<'a>
        })));
        self
    }

    /// Adds a [`KeyHandler`] for objects.
    #[must_use]
    pub fn with_fields(mut self, fields: impl KeyHandler + 'a) -> Self {
        self.object = Some(ObjectDispatch::Fields(Box::new(fields)));
        self
    }

    /// Adds an element handler set for arrays.
    #[must_use]
    pub fn with_array(mut self, elements: Handlers<'a>) -> Self {
        self.array = Some(ArrayDispatch::Elements(Box::new(elements)));
        self
    }

    /// Adds a per-array element handler factory.
    #[must_use]
    pub fn with_array_with(mut self, start: impl FnMut() -> Handlers<'a> + 'a) -> Self {
        self.array = Some(ArrayDispatch::PerArray(Box::new(start)));
        self
    }

    /// Discards values of any kind that has no callback in this set.
    #[must_use]
    pub fn ignoring(mut self) -> Self {
        self.ignore = true;
        self
    }

    /// Returns `true` if the set has no callbacks and does not ignore.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        !self.ignore
            && self.null.is_none()
            && self.int.is_none()
            && self.float.is_none()
            && self.string.is_none()
            && self.time.is_none()
            && self.boolean.is_none()
            && self.object.is_none()
            && self.array.is_none()
    }
}

impl fmt::Debug for Handlers<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut set = f.debug_set();
        for (name, present) in [
            ("null", self.null.is_some()),
            ("int", self.int.is_some()),
            ("float", self.float.is_some()),
            ("string", self.string.is_some()),
            ("time", self.time.is_some()),
            ("bool", self.boolean.is_some()),
            ("object", self.object.is_some()),
            ("array", self.array.is_some()),
            ("ignore", self.ignore),
        ] {
            if present {
                set.entry(&format_args!("{name}"));
            }
        }
        set.finish()
    }
}
