use std::io::Write;

use chrono::{FixedOffset, TimeDelta, TimeZone, Utc};
use rstest::rstest;

use crate::{Writer, WriterOptions};

fn render(f: impl FnOnce(&mut Writer<Vec<u8>>)) -> String {
    let mut w = Writer::new(Vec::new());
    f(&mut w);
    String::from_utf8(w.close().unwrap()).unwrap()
}

#[test_log::test]
fn nested_document() {
    let out = render(|w| {
        w.object(|w| {
            w.prop("id", 7_u32);
            w.prop("name", "widget");
            w.prop("price", 9.5);
            w.prop("active", true);
            w.prop("note", ());
            w.prop_with("tags", |w| {
                w.array(|w| {
                    w.string("a");
                    w.string("b");
                });
            });
            w.prop_with("dims", |w| {
                w.object(|w| {
                    w.prop("w", 2);
                    w.prop("h", 3);
                });
            });
            w.prop_with("empty", |w| w.object(|_| {}));
        });
    });
    insta::assert_snapshot!(out, @r#"{"id":7,"name":"widget","price":9.5,"active":true,"note":null,"tags":["a","b"],"dims":{"w":2,"h":3},"empty":{}}"#);
}

#[test]
fn arrays_of_arrays() {
    let out = render(|w| {
        w.array(|w| {
            for i in 0..3 {
                w.array(|w| {
                    for j in 0..i {
                        w.int(j);
                    }
                });
            }
        });
    });
    insta::assert_snapshot!(out, @"[[],[0],[0,1]]");
}

#[rstest]
#[case::int_min(|w: &mut Writer<Vec<u8>>| w.int(i64::MIN), "-9223372036854775808")]
#[case::uint_max(|w: &mut Writer<Vec<u8>>| w.uint(u64::MAX), "18446744073709551615")]
#[case::float_integral(|w: &mut Writer<Vec<u8>>| w.float(2.0), "2.0")]
#[case::float_fraction(|w: &mut Writer<Vec<u8>>| w.float(-0.125), "-0.125")]
#[case::float_large(|w: &mut Writer<Vec<u8>>| w.float(1e300), "1e300")]
#[case::float_small(|w: &mut Writer<Vec<u8>>| w.float(1.5e-9), "1.5e-9")]
#[case::nan(|w: &mut Writer<Vec<u8>>| w.float(f64::NAN), "null")]
#[case::infinity(|w: &mut Writer<Vec<u8>>| w.float(f64::NEG_INFINITY), "null")]
#[case::bool_false(|w: &mut Writer<Vec<u8>>| w.bool(false), "false")]
#[case::escaped(|w: &mut Writer<Vec<u8>>| w.string("\"\\\n\u{1}"), r#""\"\\\n\u0001""#)]
#[case::invalid_bytes(|w: &mut Writer<Vec<u8>>| w.string_bytes(b"ok\xc3"), r#""ok\ufffd""#)]
fn primitives(#[case] write: fn(&mut Writer<Vec<u8>>), #[case] expected: &str) {
    assert_eq!(render(write), expected);
}

#[test]
fn primitive_impls() {
    let out = render(|w| {
        w.object(|w| {
            w.prop("i8", -8_i8);
            w.prop("u16", 16_u16);
            w.prop("usize", 42_usize);
            w.prop("isize", -42_isize);
            w.prop("f32", 0.1_f32);
            w.prop("string", String::from("owned"));
            w.prop("some", Some("x"));
            w.prop("none", None::<bool>);
        });
    });
    insta::assert_snapshot!(out, @r#"{"i8":-8,"u16":16,"usize":42,"isize":-42,"f32":0.1,"string":"owned","some":"x","none":null}"#);
}

#[test]
fn timestamps_use_rfc3339() {
    let utc = Utc.with_ymd_and_hms(2024, 2, 29, 12, 30, 0).unwrap();
    let offset = FixedOffset::east_opt(2 * 3600)
        .unwrap()
        .with_ymd_and_hms(2024, 2, 29, 14, 30, 0)
        .unwrap();
    let out = render(|w| {
        w.array(|w| {
            w.time(&utc);
            w.time(&offset);
            w.time(&(utc + TimeDelta::milliseconds(250)));
        });
    });
    insta::assert_snapshot!(out, @r#"["2024-02-29T12:30:00Z","2024-02-29T14:30:00+02:00","2024-02-29T12:30:00.250Z"]"#);

    let out = render(|w| w.object(|w| w.prop("at", utc)));
    insta::assert_snapshot!(out, @r#"{"at":"2024-02-29T12:30:00Z"}"#);
}

#[test]
fn raw_fragments_bypass_bookkeeping() {
    let out = render(|w| {
        w.array(|w| {
            w.int(1);
            w.raw(",{\"pre\":\"rendered\"}");
            w.raw_byte(b',');
            w.raw("2");
        });
    });
    insta::assert_snapshot!(out, @r#"[1,{"pre":"rendered"},2]"#);
}

#[test]
fn prop_raw_counts_as_a_value() {
    let out = render(|w| {
        w.object(|w| {
            w.prop_raw("cached", "[1,2,3]");
            w.prop("next", 4);
        });
    });
    insta::assert_snapshot!(out, @r#"{"cached":[1,2,3],"next":4}"#);
}

#[test]
fn keys_are_escaped() {
    let out = render(|w| w.object(|w| w.prop("a\"b\n", 1)));
    insta::assert_snapshot!(out, @r#"{"a\"b\n":1}"#);
}

#[test]
fn output_matches_serde_json() {
    let out = render(|w| {
        w.object(|w| {
            w.prop("text", "tab\there \u{7f} é 😀 \u{0}");
            w.prop_with("list", |w| {
                w.array(|w| {
                    w.float(0.1);
                    w.null();
                    w.uint(3);
                });
            });
        });
    });
    let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(
        parsed,
        serde_json::json!({
            "text": "tab\there \u{7f} é 😀 \u{0}",
            "list": [0.1, null, 3],
        })
    );
}

/// A sink that records the size of every write and counts flushes.
#[derive(Default)]
struct Recording {
    writes: Vec<usize>,
    flushes: usize,
}

impl Write for Recording {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.writes.push(buf.len());
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.flushes += 1;
        Ok(())
    }
}

#[test]
fn sink_is_written_in_chunks_and_flushed_once() {
    let mut sink = Recording::default();
    let options = WriterOptions::default().with_flush_threshold(64);
    let mut w = Writer::with_options(&mut sink, options);
    w.array(|w| {
        for _ in 0..100 {
            w.string("0123456789");
        }
    });
    w.close().unwrap();
    assert_eq!(sink.flushes, 1);
    assert_eq!(sink.writes.iter().sum::<usize>(), 2 + 100 * 12 + 99);
    assert!(sink.writes.len() > 1);
    assert!(sink.writes.iter().all(|&n| n < 64 + 16));
}

#[test]
fn small_documents_are_written_in_one_piece() {
    let mut sink = Recording::default();
    let mut w = Writer::new(&mut sink);
    w.object(|w| w.prop("k", "v"));
    w.close().unwrap();
    assert_eq!(sink.writes, [9]);
    assert_eq!(sink.flushes, 1);
}

#[test]
fn buffers_are_reused_across_writers() {
    // Warm the pool, then make sure a second writer starts clean.
    render(|w| w.string(&"x".repeat(1000)));
    assert_eq!(render(|w| w.int(1)), "1");
}
