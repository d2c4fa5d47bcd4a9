//! Pure engine types (tokenizer, word-wheel buffer, session parameters).
//!
//! Nothing here touches the clock or the network; the runtime layer owns all
//! scheduling and calls into these types from inside a tick.

pub mod params;
pub mod tokenizer;
pub mod wheel;
