// Copyright Katana Graph Authors
// SPDX-License-Identifier: Apache-2.0

//! Span context: the `(trace_id, span_id)` pair that can be injected into
//! and extracted from a carrier string to pass a span across process or
//! thread boundaries.

use std::fmt;

/// Identifies a span within a trace. Cheap to clone; carried by value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SpanContext {
    trace_id: String,
    span_id: String,
}

impl SpanContext {
    /// Construct a context for a brand-new trace: a fresh trace id and span id.
    #[must_use]
    pub fn new_trace() -> Self {
        Self {
            trace_id: new_id(),
            span_id: new_id(),
        }
    }

    /// Construct a child context: same trace id, fresh span id.
    #[must_use]
    pub fn child_of(parent: &SpanContext) -> Self {
        Self {
            trace_id: parent.trace_id.clone(),
            span_id: new_id(),
        }
    }

    /// The trace id shared by every span in this trace.
    #[must_use]
    pub fn trace_id(&self) -> &str {
        &self.trace_id
    }

    /// The id of this particular span.
    #[must_use]
    pub fn span_id(&self) -> &str {
        &self.span_id
    }

    /// Serialize this context to a carrier string suitable for crossing a
    /// process or thread boundary.
    #[must_use]
    pub fn inject(&self) -> String {
        format!("{}:{}", self.trace_id, self.span_id)
    }

    /// Parse a context previously produced by [`SpanContext::inject`].
    /// Returns `None` if the carrier is malformed.
    #[must_use]
    pub fn extract(carrier: &str) -> Option<Self> {
        let (trace_id, span_id) = carrier.split_once(':')?;
        if trace_id.is_empty() || span_id.is_empty() {
            return None;
        }
        Some(Self {
            trace_id: trace_id.to_string(),
            span_id: span_id.to_string(),
        })
    }
}

impl fmt::Display for SpanContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.inject())
    }
}

fn new_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}
