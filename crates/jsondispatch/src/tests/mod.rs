mod writer_good;

use std::{cell::RefCell, io::Write, rc::Rc};

use quickcheck::{Arbitrary, Gen};
use serde_json::{Map, Value};

use crate::{Error, ErrorKind, Handlers, Writer, from_str};

/// A decoded value whose containers can still grow while the decoder fills
/// them in.
pub(crate) enum Node {
    Leaf(Value),
    Array(Rc<RefCell<Vec<Node>>>),
    Object(Rc<RefCell<Vec<(String, Node)>>>),
}

impl Node {
    fn to_value(&self) -> Value {
        match self {
            Node::Leaf(v) => v.clone(),
            Node::Array(items) => Value::Array(items.borrow().iter().map(Node::to_value).collect()),
            Node::Object(members) => Value::Object(
                members
                    .borrow()
                    .iter()
                    .map(|(k, n)| (k.clone(), n.to_value()))
                    .collect(),
            ),
        }
    }
}

type Emit = Rc<dyn Fn(Node)>;

/// Handlers accepting any JSON value and passing it to `emit`. Containers are
/// emitted when opened and filled as their contents arrive.
pub(crate) fn tree_handlers(emit: Emit) -> Handlers<'static> {
    let on_null = emit.clone();
    let on_bool = emit.clone();
    let on_int = emit.clone();
    let on_float = emit.clone();
    let on_string = emit.clone();
    let on_array = emit.clone();
    let on_object = emit;
    Handlers::null(move || {
        on_null(Node::Leaf(Value::Null));
        Ok(())
    })
    .with_bool(move |b| {
        on_bool(Node::Leaf(Value::Bool(b)));
        Ok(())
    })
    .with_int(move |i| {
        on_int(Node::Leaf(Value::from(i)));
        Ok(())
    })
    .with_float(move |f| {
        on_float(Node::Leaf(Value::from(f)));
        Ok(())
    })
    .with_string(move |s| {
        on_string(Node::Leaf(Value::from(s)));
        Ok(())
    })
    .with_array_with(move || {
        let items = Rc::new(RefCell::new(Vec::new()));
        on_array(Node::Array(items.clone()));
        tree_handlers(Rc::new(move |n: Node| items.borrow_mut().push(n)))
    })
    .with_object_with(move || {
        let members = Rc::new(RefCell::new(Vec::new()));
        on_object(Node::Object(members.clone()));
        move |key: &str| {
            let members = members.clone();
            let key = key.to_owned();
            tree_handlers(Rc::new(move |n: Node| {
                members.borrow_mut().push((key.clone(), n));
            }))
        }
    })
}

/// Decodes `json` into a `serde_json::Value` through the handler machinery.
pub(crate) fn decode(json: &str) -> Result<Value, Error> {
    let root: Rc<RefCell<Option<Node>>> = Rc::default();
    let slot = root.clone();
    from_str(
        json,
        tree_handlers(Rc::new(move |n: Node| *slot.borrow_mut() = Some(n))),
    )?;
    let value = root.borrow().as_ref().map_or(Value::Null, Node::to_value);
    Ok(value)
}

pub(crate) fn write_value<W: Write>(w: &mut Writer<W>, v: &Value) {
    match v {
        Value::Null => w.null(),
        Value::Bool(b) => w.bool(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                w.int(i);
            } else if let Some(u) = n.as_u64() {
                w.uint(u);
            } else {
                w.float(n.as_f64().unwrap());
            }
        }
        Value::String(s) => w.string(s),
        Value::Array(items) => w.array(|w| {
            for item in items {
                write_value(w, item);
            }
        }),
        Value::Object(members) => w.object(|w| {
            for (k, item) in members {
                w.prop_with(k, |w| write_value(w, item));
            }
        }),
    }
}

/// Encodes `v` with [`Writer`].
pub(crate) fn encode(v: &Value) -> String {
    let mut w = Writer::new(Vec::new());
    write_value(&mut w, v);
    String::from_utf8(w.close().unwrap()).unwrap()
}

/// The kind of a positional error, panicking on any other error.
pub(crate) fn kind(err: &Error) -> ErrorKind {
    match err.as_parse() {
        Some(e) => e.kind().clone(),
        None => panic!("expected a parse error, got {err:?}"),
    }
}

/// A random JSON document of bounded depth. Floats are multiples of 1/8 so
/// that every float survives text formatting and any parser bit for bit.
#[derive(Clone, Debug)]
pub(crate) struct Doc(pub Value);

impl Arbitrary for Doc {
    fn arbitrary(g: &mut Gen) -> Self {
        Doc(arbitrary_value(g, 3))
    }

    fn shrink(&self) -> Box<dyn Iterator<Item = Self>> {
        match &self.0 {
            Value::Array(items) => Box::new(items.clone().into_iter().map(Doc)),
            Value::Object(members) => Box::new(members.clone().into_iter().map(|(_, v)| Doc(v))),
            _ => Box::new(std::iter::empty()),
        }
    }
}

fn arbitrary_value(g: &mut Gen, depth: usize) -> Value {
    let kinds = if depth == 0 { 5 } else { 7 };
    match u8::arbitrary(g) % kinds {
        0 => Value::Null,
        1 => Value::Bool(bool::arbitrary(g)),
        2 => Value::from(i64::arbitrary(g)),
        3 => Value::from(f64::from(i32::arbitrary(g)) / 8.0),
        4 => Value::String(String::arbitrary(g)),
        5 => {
            let len = usize::arbitrary(g) % 4;
            Value::Array((0..len).map(|_| arbitrary_value(g, depth - 1)).collect())
        }
        _ => {
            let len = usize::arbitrary(g) % 4;
            let mut members = Map::new();
            for _ in 0..len {
                members.insert(String::arbitrary(g), arbitrary_value(g, depth - 1));
            }
            Value::Object(members)
        }
    }
}
