// Copyright Katana Graph Authors
// SPDX-License-Identifier: Apache-2.0

//! RAII scope objects that close their span on drop.

use crate::span::Span;
use crate::tracer::Tracer;

/// Owns a span for its lifetime and closes it when dropped (or when
/// [`Scope::close`] is called explicitly).
///
/// A scope only actually finishes its span when that span is the tracer's
/// current active span — see [`Tracer::start_active_span`]. If scopes are
/// closed out of their nesting order, a scope that closes while its span
/// is not active simply marks the span's scope as closed; the span is
/// finished later, when it becomes active again (this happens automatically
/// as soon as the scope that is currently active closes, via the cascade in
/// [`Tracer::finish_active_span_if_matches`]).
#[must_use = "a Scope must be held (or closed) for its span to have a bounded lifetime"]
pub struct Scope<'t> {
    tracer: &'t Tracer,
    span: Span,
    closed: bool,
}

impl<'t> Scope<'t> {
    pub(crate) fn new(tracer: &'t Tracer, span: Span) -> Self {
        Self {
            tracer,
            span,
            closed: false,
        }
    }

    /// The span owned by this scope.
    #[must_use]
    pub fn span(&self) -> &Span {
        &self.span
    }

    /// Close this scope early. Idempotent; called automatically on drop if
    /// not called explicitly.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.span.mark_scope_closed();
        self.tracer.finish_active_span_if_matches(&self.span);
    }
}

impl Drop for Scope<'_> {
    fn drop(&mut self) {
        self.close();
    }
}
