//! Progress throttling.
//!
//! This module rate-limits the progress events forwarded from a
//! synchronizer to the batch observer.

mod throttle;

pub use throttle::ProgressThrottle;
