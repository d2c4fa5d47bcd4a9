//! Word-wheel text mutation engine.
//!
//! A session shows a text buffer and, on every tick, rewrites a few of its
//! words toward a target text. Targets come from a text-generation service,
//! with at most one request outstanding at a time; each completed request
//! supplies the next target and counts as one cycle.
//!
//! # Layout
//! - [`core`]: tokenizer, [`WordWheel`] buffer and [`SessionParams`]. Pure, no clock.
//! - [`runtime`]: single-flight [`GenerationClient`], [`TickScheduler`] and the
//!   [`SessionController`] that owns all mutable state.
//! - [`config`], [`logging`], [`providers`]: wiring for the headless runner.

pub mod config;
pub mod core;
pub mod logging;
pub mod providers;
pub mod runtime;

pub use crate::config::EnvConfig;
pub use crate::core::params::{ParamError, ParamUpdate, SessionParams};
pub use crate::core::tokenizer::{detokenize, tokenize, Token};
pub use crate::core::wheel::WordWheel;
pub use crate::runtime::generation::{
    GenerationClient, GenerationOutcome, GenerationReport, RequestState,
};
pub use crate::runtime::scheduler::{SchedulerState, TickScheduler};
pub use crate::runtime::session::{SessionController, SessionError, UpdateOutcome};
pub use crate::runtime::snapshot::{latency_label, SessionSnapshot};
