//! Time- and I/O-driven pieces: the generation client, the tick scheduler and
//! the session controller that ties them to the word wheel.

pub mod generation;
pub mod scheduler;
pub mod session;
pub mod snapshot;
