//! Watch-mode orchestration.
//!
//! ```text
//! bundler watch ─┐
//! stylesheets ───┤                 ┌──────────────┐   effects   ┌─────────────┐
//! public dir ────┼── Event ──────▶ │ Orchestrator │ ──────────▶ │ Coordinator │
//! template ──────┘                 └──────────────┘             └─────────────┘
//! ```
//!
//! [`Orchestrator`] is a pure state machine: `(state, event) -> effects`.
//! [`Coordinator`] owns the I/O. It is a single task, so effects (and with
//! them every `index.html` write) are applied strictly one after another.

mod machine;
mod runtime;

#[cfg(test)]
mod tests;

pub use machine::{Effect, Event, Orchestrator, Phase};
pub use runtime::Coordinator;
