//! Port definitions (trait abstractions) for the batch loader's collaborators.
//!
//! Ports define the interfaces the batch loader expects from the rest of
//! the application. They contain no implementation details and use only
//! domain types.
//!
//! # Design Rules
//!
//! - No HTTP or archive types in any signature
//! - The synchronizer and observer are shared services (`Arc<dyn …>`)
//! - The retry policy is owned by the loader (`Box<dyn RetryPolicy>`)

pub mod batch_observer;
pub mod retry_policy;
pub mod synchronizer;

pub use batch_observer::{BatchObserverPort, ChannelBatchObserver, NoopBatchObserver};
pub use retry_policy::RetryPolicy;
pub use synchronizer::PresentationSynchronizerPort;
