//! Consumer session tracking

pub mod bindings;
pub mod handoff;

pub use bindings::SessionBindings;
pub use handoff::HandoffStore;
