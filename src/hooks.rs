//! Authoring surface for test hooks: case keys, phases, the per-case context,
//! cross-case scratch state, and the registry tying them to hook callables.

pub mod context;
pub mod hook;
pub mod key;
pub mod phase;
pub mod registry;
pub mod state;
