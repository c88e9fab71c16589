//! Application-level orchestration.
//!
//! The controller resolves command names against the registry, schedules
//! executions through the engine and aggregates completions. The CLI layer
//! calls into this module and only consumes the events it emits.

mod controller;

pub(crate) use controller::Controller;
