//! Summarizes request latencies from a JSON Lines access log.
//!
//! Each input line is an object such as
//!
//! ```text
//! {"at": "2024-05-01T10:00:00Z", "route": "/users", "status": 200, "ms": 12.5, "headers": {...}}
//! ```
//!
//! Only `route`, `status` and `ms` are looked at; everything else is skipped
//! without being materialized. The report is written back out as one JSON
//! object per route.
//!
//! Run with
//!
//! ```bash
//! cargo run -p jsondispatch --example latency_report < access.log
//! ```
//!
//! or without input to use a built-in sample.

#![allow(missing_docs)]

use std::{
    cell::RefCell,
    collections::BTreeMap,
    io::{self, IsTerminal, Read},
};

use jsondispatch::{Handlers, Writer, parse_each};

#[derive(Default)]
struct Route {
    requests: u64,
    errors: u64,
    total_ms: f64,
    max_ms: f64,
}

#[derive(Default)]
struct Line {
    route: String,
    status: i64,
    ms: f64,
}

const SAMPLE: &str = r#"
{"at": "2024-05-01T10:00:00Z", "route": "/users", "status": 200, "ms": 12.5, "headers": {"ua": "curl"}}
{"at": "2024-05-01T10:00:01Z", "route": "/users", "status": 500, "ms": 80, "headers": {}}
{"at": "2024-05-01T10:00:02Z", "route": "/health", "status": 200, "ms": 0.4}
"#;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let stdin = io::stdin();
    let input: Box<dyn Read> = if stdin.is_terminal() {
        Box::new(SAMPLE.as_bytes())
    } else {
        Box::new(stdin.lock())
    };

    let routes = &RefCell::new(BTreeMap::<String, Route>::new());
    let line = &RefCell::new(Line::default());

    let lines = parse_each(
        input,
        Handlers::object_with(move || {
            // Fold the previous line in before starting the next one.
            flush(line, routes);
            move |key: &str| match key {
                "route" => Handlers::string(move |s| {
                    line.borrow_mut().route = s.to_owned();
                    Ok(())
                }),
                "status" => Handlers::int(move |i| {
                    line.borrow_mut().status = i;
                    Ok(())
                }),
                "ms" => Handlers::float(move |f| {
                    line.borrow_mut().ms = f;
                    Ok(())
                }),
                _ => Handlers::ignore(),
            }
        }),
    )?;
    flush(line, routes);

    let mut w = Writer::new(io::stdout().lock());
    w.object(|w| {
        w.prop("lines", lines);
        w.prop_with("routes", |w| {
            w.object(|w| {
                for (name, r) in routes.borrow().iter() {
                    w.prop_with(name, |w| {
                        w.object(|w| {
                            w.prop("requests", r.requests);
                            w.prop("errors", r.errors);
                            #[allow(clippy::cast_precision_loss)]
                            w.prop("mean_ms", r.total_ms / r.requests as f64);
                            w.prop("max_ms", r.max_ms);
                        });
                    });
                }
            });
        });
    });
    w.raw_byte(b'\n');
    w.close()?;
    Ok(())
}

fn flush(line: &RefCell<Line>, routes: &RefCell<BTreeMap<String, Route>>) {
    let line = line.take();
    if line.route.is_empty() {
        return;
    }
    let mut routes = routes.borrow_mut();
    let route = routes.entry(line.route).or_default();
    route.requests += 1;
    route.errors += u64::from(line.status >= 500);
    route.total_ms += line.ms;
    route.max_ms = route.max_ms.max(line.ms);
}
