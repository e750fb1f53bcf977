// Copyright Katana Graph Authors
// SPDX-License-Identifier: Apache-2.0

//! Structured observability spine for the graph analytics substrate.
//!
//! Data Model:
//! - [`Tracer`] owns the active-span stack and an installed [`TracerSink`].
//! - [`Span`] is a named unit of work, nested under a parent, carrying a
//!   [`SpanContext`] and a tag/log trail.
//! - [`Scope`] is the RAII handle returned by [`Tracer::start_active_span`];
//!   it closes its span on drop, subject to the active-span rule described
//!   on [`Scope`].
//!
//! Three backends are provided: [`sink::JsonSink`] (one JSON object per
//! event), [`sink::TextSink`] (one line per event), and [`sink::NoopSink`]
//! (discards everything — installed after teardown).
//!
//! Unlike the source this substrate distills, there is no implicit global
//! tracer: callers construct a [`Tracer`] and pass it to whatever
//! subsystems need it (the memory supervisor, the property cache, the
//! parallel loop runtime). Call sites that want a process-wide default may
//! hold the `Tracer` behind an `Arc` and clone references into each
//! subsystem's constructor.

pub mod context;
pub mod host;
pub mod scope;
pub mod sink;
pub mod span;
#[allow(clippy::module_inception)]
mod tracer;
pub mod value;

pub use context::SpanContext;
pub use host::HostStats;
pub use scope::Scope;
pub use sink::{JsonSink, NoopSink, TextSink, TracerSink};
pub use span::Span;
pub use tracer::Tracer;
pub use value::{Tag, Tags, Value};
