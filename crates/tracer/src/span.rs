// Copyright Katana Graph Authors
// SPDX-License-Identifier: Apache-2.0

//! Spans: named units of work with a start and a finish, nested under a
//! parent span.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

use crate::context::SpanContext;
use crate::host::{HostStats, rss_bytes};
use crate::sink::TracerSink;
use crate::value::Tags;

struct SpanInner {
    name: String,
    context: SpanContext,
    parent: Option<Span>,
    finished: AtomicBool,
    scope_closed: AtomicBool,
    tags: Mutex<Tags>,
    sink: Arc<dyn TracerSink>,
}

/// A shared handle to a unit of work. Cloning a `Span` is cheap (it clones
/// an `Arc`); every clone refers to the same underlying span state.
///
/// A span's `finish` is idempotent: calling it twice (directly, or once
/// directly and once via its owning [`crate::Scope`] dropping) only emits
/// one finish record. A parent may outlive its children — nothing prevents
/// a parent span's own `finish` from being called while children are still
/// open; the parent simply stops accepting new children logically (callers
/// are expected not to start new children of a finished span, though
/// nothing enforces this at the type level, matching the upstream contract).
#[derive(Clone)]
pub struct Span {
    inner: Arc<SpanInner>,
}

impl Span {
    pub(crate) fn new_root(
        name: impl Into<String>,
        sink: Arc<dyn TracerSink>,
    ) -> Self {
        let context = SpanContext::new_trace();
        Self::new(name, context, None, sink)
    }

    pub(crate) fn new_child(
        name: impl Into<String>,
        parent: &Span,
        sink: Arc<dyn TracerSink>,
    ) -> Self {
        let context = SpanContext::child_of(parent.context());
        Self::new(name, context, Some(parent.clone()), sink)
    }

    fn new(
        name: impl Into<String>,
        context: SpanContext,
        parent: Option<Span>,
        sink: Arc<dyn TracerSink>,
    ) -> Self {
        let name = name.into();
        let parent_id = parent.as_ref().map(|p| p.context().span_id().to_string());
        sink.on_start(&context, &name, parent_id.as_deref());
        Self {
            inner: Arc::new(SpanInner {
                name,
                context,
                parent,
                finished: AtomicBool::new(false),
                scope_closed: AtomicBool::new(false),
                tags: Mutex::new(Vec::new()),
                sink,
            }),
        }
    }

    /// This span's human-readable name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// This span's context, usable with [`SpanContext::inject`].
    #[must_use]
    pub fn context(&self) -> &SpanContext {
        &self.inner.context
    }

    /// The parent span, if any.
    #[must_use]
    pub fn parent(&self) -> Option<&Span> {
        self.inner.parent.as_ref()
    }

    /// Attach tags to this span.
    pub fn set_tags(&self, tags: Tags) {
        self.inner.sink.on_tags(self.context(), &tags);
        self.inner.tags.lock().extend(tags);
    }

    /// Mark this span as having encountered an error.
    pub fn set_error(&self) {
        self.set_tags(vec![("error".to_string(), crate::value::Value::Bool(true))]);
    }

    /// Attach a log message plus tags. Every log record also carries a
    /// standard metrics bundle (timestamp, host, pid, RSS, peak RSS).
    pub fn log(&self, message: &str, tags: Tags) {
        let host = HostStats::gather();
        let rss = rss_bytes();
        self.inner
            .sink
            .on_log(self.context(), message, &tags, &host, rss);
    }

    /// Log an error-flagged message with no additional tags.
    pub fn log_error(&self, message: &str) {
        self.log(message, vec![("event".to_string(), "error".into())]);
    }

    /// Whether this span's scope (if any) has closed.
    #[must_use]
    pub fn scope_closed(&self) -> bool {
        self.inner.scope_closed.load(Ordering::Acquire)
    }

    pub(crate) fn mark_scope_closed(&self) {
        self.inner.scope_closed.store(true, Ordering::Release);
    }

    /// Whether [`Span::finish`] has already been called.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.inner.finished.load(Ordering::Acquire)
    }

    /// Finish this span. Idempotent: only the first call emits a finish
    /// record; later calls are no-ops.
    pub fn finish(&self) {
        if self
            .inner
            .finished
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            self.inner.sink.on_finish(self.context());
        }
    }

    pub(crate) fn same_span_as(&self, other: &Span) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl std::fmt::Debug for Span {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Span")
            .field("name", &self.inner.name)
            .field("context", &self.inner.context)
            .field("finished", &self.is_finished())
            .finish()
    }
}
