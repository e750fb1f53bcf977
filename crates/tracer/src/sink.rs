// Copyright Katana Graph Authors
// SPDX-License-Identifier: Apache-2.0

//! Tracer backends: JSON (one record per event), Text (one line per
//! event), and Noop (discards everything). All three share a mutex around
//! emission so that logging and tagging existing spans stay thread-safe
//! even though starting/finishing spans is a single-threaded contract.

use std::io::Write;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::context::SpanContext;
use crate::host::HostStats;
use crate::value::Tags;

/// A tracer output backend. Implementations must be safe to call
/// concurrently from multiple threads for `on_tags`/`on_log`/`on_finish`
/// (starting and finishing spans is itself serialized by the owning
/// [`crate::Tracer`], but log/tag calls on already-open spans are not).
pub trait TracerSink: Send + Sync {
    /// Emitted when a span starts.
    fn on_start(&self, context: &SpanContext, name: &str, parent_span_id: Option<&str>);
    /// Emitted when tags are attached to a span.
    fn on_tags(&self, context: &SpanContext, tags: &Tags);
    /// Emitted on a log call; `rss_bytes` is the resident set size sampled
    /// at call time.
    fn on_log(&self, context: &SpanContext, message: &str, tags: &Tags, host: &HostStats, rss_bytes: u64);
    /// Emitted when a span finishes.
    fn on_finish(&self, context: &SpanContext);
}

/// Discards every event. Installed as the tracer after teardown so that
/// late calls from lingering references are harmless.
#[derive(Debug, Default)]
pub struct NoopSink;

impl TracerSink for NoopSink {
    fn on_start(&self, _context: &SpanContext, _name: &str, _parent_span_id: Option<&str>) {}
    fn on_tags(&self, _context: &SpanContext, _tags: &Tags) {}
    fn on_log(&self, _context: &SpanContext, _message: &str, _tags: &Tags, _host: &HostStats, _rss_bytes: u64) {}
    fn on_finish(&self, _context: &SpanContext) {}
}

/// Writes one JSON object per line to the wrapped sink.
pub struct JsonSink {
    out: Mutex<Box<dyn Write + Send>>,
}

impl JsonSink {
    /// Build a sink writing newline-delimited JSON to `out`.
    pub fn new(out: impl Write + Send + 'static) -> Arc<Self> {
        Arc::new(Self {
            out: Mutex::new(Box::new(out)),
        })
    }

    fn emit(&self, value: serde_json::Value) {
        let mut out = self.out.lock();
        // A write failure here (e.g. broken pipe) is not actionable by the
        // tracer itself; best-effort emission matches the "never let
        // tracing bring down the program" posture.
        let _ = writeln!(out, "{value}");
    }

    fn tags_json(tags: &Tags) -> serde_json::Value {
        serde_json::Value::Array(
            tags.iter()
                .map(|(name, value)| {
                    serde_json::json!({"name": name, "value": serde_json::Value::from(value)})
                })
                .collect(),
        )
    }
}

impl TracerSink for JsonSink {
    fn on_start(&self, context: &SpanContext, name: &str, parent_span_id: Option<&str>) {
        self.emit(serde_json::json!({
            "event": "start",
            "trace_id": context.trace_id(),
            "span_id": context.span_id(),
            "span_name": name,
            "parent_id": parent_span_id,
        }));
    }

    fn on_tags(&self, context: &SpanContext, tags: &Tags) {
        self.emit(serde_json::json!({
            "event": "tags",
            "trace_id": context.trace_id(),
            "span_id": context.span_id(),
            "tags": Self::tags_json(tags),
        }));
    }

    fn on_log(&self, context: &SpanContext, message: &str, tags: &Tags, host: &HostStats, rss_bytes: u64) {
        self.emit(serde_json::json!({
            "event": "log",
            "trace_id": context.trace_id(),
            "span_id": context.span_id(),
            "message": message,
            "tags": Self::tags_json(tags),
            "host": {
                "hostname": host.hostname,
                "nprocs": host.nprocs,
                "ram_gb": host.ram_gb,
                "pid": host.pid,
            },
            "rss_bytes": rss_bytes,
        }));
    }

    fn on_finish(&self, context: &SpanContext) {
        self.emit(serde_json::json!({
            "event": "finish",
            "trace_id": context.trace_id(),
            "span_id": context.span_id(),
        }));
    }
}

/// Writes one human-readable line per event.
pub struct TextSink {
    out: Mutex<Box<dyn Write + Send>>,
}

impl TextSink {
    /// Build a sink writing plain text lines to `out`.
    pub fn new(out: impl Write + Send + 'static) -> Arc<Self> {
        Arc::new(Self {
            out: Mutex::new(Box::new(out)),
        })
    }

    fn emit(&self, line: &str) {
        let mut out = self.out.lock();
        let _ = writeln!(out, "{line}");
    }
}

impl TracerSink for TextSink {
    fn on_start(&self, context: &SpanContext, name: &str, parent_span_id: Option<&str>) {
        self.emit(&format!(
            "start span={} name={name} parent={}",
            context.span_id(),
            parent_span_id.unwrap_or("-")
        ));
    }

    fn on_tags(&self, context: &SpanContext, tags: &Tags) {
        self.emit(&format!(
            "tags span={} {}",
            context.span_id(),
            format_tags(tags)
        ));
    }

    fn on_log(&self, context: &SpanContext, message: &str, tags: &Tags, host: &HostStats, rss_bytes: u64) {
        self.emit(&format!(
            "log span={} host={} pid={} rss_bytes={} msg=\"{message}\" {}",
            context.span_id(),
            host.hostname,
            host.pid,
            rss_bytes,
            format_tags(tags)
        ));
    }

    fn on_finish(&self, context: &SpanContext) {
        self.emit(&format!("finish span={}", context.span_id()));
    }
}

fn format_tags(tags: &Tags) -> String {
    tags.iter()
        .map(|(name, value)| format!("{name}={value}"))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_sink_writes_one_line_per_event() {
        let buf: Arc<Mutex<Vec<u8>>> = Arc::new(Mutex::new(Vec::new()));
        struct SharedWriter(Arc<Mutex<Vec<u8>>>);
        impl Write for SharedWriter {
            fn write(&mut self, data: &[u8]) -> std::io::Result<usize> {
                self.0.lock().extend_from_slice(data);
                Ok(data.len())
            }
            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }
        let sink = JsonSink::new(SharedWriter(buf.clone()));
        let ctx = SpanContext::new_trace();
        sink.on_start(&ctx, "work", None);
        sink.on_finish(&ctx);
        let text = String::from_utf8(buf.lock().clone()).unwrap();
        assert_eq!(text.lines().count(), 2);
        assert!(text.contains("\"event\":\"start\""));
    }
}
