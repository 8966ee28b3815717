//! Utility functions
//!
//! Provides bounded buffers, the session clock and logging setup.

pub mod bounded;
pub mod clock;
pub mod logging;

pub use bounded::BoundedString;
pub use clock::{Clock, MonotonicClock};
