#![no_main]
use std::cell::RefCell;

use arbitrary::Arbitrary;
use jsondispatch::{ErrorKind, Handlers, Writer, from_slice};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
struct Input {
    /// Arbitrary bytes to decode.
    json: Vec<u8>,
    /// A string to write and read back.
    text: String,
    /// An integer to write and read back.
    int: i64,
}

fuzz_target!(|input: Input| {
    // Anything serde_json accepts must decode, unless it holds a number longer
    // than the decoder buffers. The reverse does not hold: trailing Unicode
    // whitespace and a few loose number forms are accepted here but not there.
    let ours = from_slice(&input.json, Handlers::ignore());
    if serde_json::from_slice::<serde_json::Value>(&input.json).is_ok() {
        if let Err(err) = ours {
            let too_long = err
                .as_parse()
                .is_some_and(|e| *e.kind() == ErrorKind::NumberTooLong);
            assert!(
                too_long,
                "rejected valid JSON {:?}: {err}",
                String::from_utf8_lossy(&input.json)
            );
        }
    }

    let mut w = Writer::new(Vec::new());
    w.array(|w| {
        w.string(&input.text);
        w.int(input.int);
    });
    let written = w.close().unwrap();
    assert!(serde_json::from_slice::<serde_json::Value>(&written).is_ok());

    let text = RefCell::new(String::new());
    let int = RefCell::new(None);
    from_slice(
        &written,
        Handlers::array(
            Handlers::string(|s| {
                text.borrow_mut().push_str(s);
                Ok(())
            })
            .with_int(|i| {
                int.replace(Some(i));
                Ok(())
            }),
        ),
    )
    .unwrap();
    assert_eq!(text.into_inner(), input.text);
    assert_eq!(int.into_inner(), Some(input.int));
});
