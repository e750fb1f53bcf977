// Copyright Katana Graph Authors
// SPDX-License-Identifier: Apache-2.0

//! The closed loop-option vocabulary (spec.md §4.6). Upstream expresses
//! these as a variadic bag of tag types resolved at compile time; here
//! they are one small `Clone` struct plus an explicitly constructed
//! worklist object, per the redesign called for when a tag-dispatch API
//! has no natural Rust equivalent.
//!
//! `det_id=fn` has no field here: it is a property of the
//! [`katana_worklist::Deterministic`] worklist object itself (supplied to
//! `Deterministic::new`), the same way `wl<W>(args)` is expressed as a
//! constructed worklist rather than an option-bag entry. `det_parallel_break=pred`
//! likewise has no field here — unlike every other option, it needs a
//! closure typed over the loop's item type, which this non-generic struct
//! cannot hold — it is instead a parameter of
//! [`crate::for_each_deterministic`], the only loop entry point it
//! applies to.

/// Options shared by [`crate::do_all`], [`crate::for_each`], and
/// [`crate::on_each`]. Not every field applies to every loop kind — e.g.
/// `parallel_break` and `local_state` are meaningless for `do_all`, which
/// has no `Context` to expose them through — but keeping one struct
/// avoids the three call sites drifting out of sync with §4.6's table.
#[derive(Debug, Clone)]
pub struct LoopOptions {
    /// Name used in spans/stats (`loopname=s`).
    pub loopname: String,
    /// Unit of work stealing (`chunk_size=K`).
    pub chunk_size: usize,
    /// Enable inter-worker stealing (`steal`).
    pub steal: bool,
    /// Suppress stats emission (`no_stats`).
    pub no_stats: bool,
    /// The body will not push to its context (`no_pushes`); enforced at
    /// runtime by [`crate::Context::push`].
    pub no_pushes: bool,
    /// Body is conflict-free by construction (`disable_conflict_detection`).
    pub disable_conflict_detection: bool,
    /// Scratch allocator per iteration (`per_iter_alloc`). This crate has
    /// no custom allocator of its own; set the flag for stats/tracing
    /// purposes and let the body manage its own scratch buffers.
    pub per_iter_alloc: bool,
    /// Body may call `ctx.break_loop()` (`parallel_break`).
    pub parallel_break: bool,
    /// Per-iteration scratch state object requested (`local_state<T>`);
    /// the actual `T` is supplied by the caller's closure captures.
    pub local_state: bool,
    /// Operator touches a statically known neighborhood (`fixed_neighborhood`).
    pub fixed_neighborhood: bool,
    /// Read-only body hint (`intent_to_read`).
    pub intent_to_read: bool,
}

impl LoopOptions {
    /// Options named `loopname` with every other field at its default.
    #[must_use]
    pub fn named(loopname: impl Into<String>) -> Self {
        Self {
            loopname: loopname.into(),
            ..Self::default()
        }
    }

    /// Set `chunk_size`.
    #[must_use]
    pub fn chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Enable inter-worker stealing.
    #[must_use]
    pub fn steal(mut self, steal: bool) -> Self {
        self.steal = steal;
        self
    }

    /// Suppress stats emission.
    #[must_use]
    pub fn no_stats(mut self, no_stats: bool) -> Self {
        self.no_stats = no_stats;
        self
    }

    /// Mark the body as push-free; enforced at runtime.
    #[must_use]
    pub fn no_pushes(mut self, no_pushes: bool) -> Self {
        self.no_pushes = no_pushes;
        self
    }

    /// Allow the body to call `ctx.break_loop()`.
    #[must_use]
    pub fn parallel_break(mut self, parallel_break: bool) -> Self {
        self.parallel_break = parallel_break;
        self
    }
}

impl Default for LoopOptions {
    fn default() -> Self {
        Self {
            loopname: String::from("loop"),
            chunk_size: 1,
            steal: false,
            no_stats: false,
            no_pushes: false,
            disable_conflict_detection: false,
            per_iter_alloc: false,
            parallel_break: false,
            local_state: false,
            fixed_neighborhood: false,
            intent_to_read: false,
        }
    }
}
