#![forbid(unsafe_code)]

//! JSONL evidence log for end-to-end tests.
//!
//! Records are buffered and written to stderr on [`JsonlLog::flush`], one
//! `[JSONL] <test>: <record>` line each, so `--nocapture` runs can be
//! post-processed.

use std::io::Write as _;
use std::sync::Mutex;

use fluid_engine::TickReport;
use serde_json::{Value, json};
use web_time::Instant;

#[derive(Debug)]
pub struct JsonlLog {
    test: String,
    start: Instant,
    entries: Mutex<Vec<Value>>,
}

impl JsonlLog {
    #[must_use]
    pub fn new(test: &str) -> Self {
        Self {
            test: test.to_owned(),
            start: Instant::now(),
            entries: Mutex::new(Vec::new()),
        }
    }

    pub fn emit(&self, entry: Value) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.push(entry);
        }
    }

    /// Record one tick with its viewport width.
    pub fn tick(&self, width: f64, report: &TickReport) {
        self.emit(json!({
            "test": self.test,
            "phase": "tick",
            "viewport_width": width,
            "breakpoint_index": report.breakpoint_index,
            "elements": report.elements,
            "flushed": report.flushed,
            "recomputed": report.recomputed,
            "repeated": report.repeated,
            "writes": report.writes,
            "failures": report.failures,
            "elapsed_ns": self.start.elapsed().as_nanos() as u64,
        }));
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().map_or(0, |entries| entries.len())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn flush(&self) {
        let Ok(entries) = self.entries.lock() else {
            return;
        };
        let mut stderr = std::io::stderr().lock();
        for entry in entries.iter() {
            let _ = writeln!(stderr, "[JSONL] {}: {entry}", self.test);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tick_records_carry_report_fields() {
        let log = JsonlLog::new("jsonl_smoke");
        assert!(log.is_empty());
        log.tick(
            800.0,
            &TickReport {
                breakpoint_index: 1,
                writes: 3,
                ..TickReport::default()
            },
        );
        log.emit(json!({"phase": "verify"}));
        assert_eq!(log.len(), 2);
        let entries = log.entries.lock().unwrap();
        assert_eq!(entries[0]["writes"], 3);
        assert_eq!(entries[0]["breakpoint_index"], 1);
        assert_eq!(entries[0]["test"], "jsonl_smoke");
    }
}
