// Application layer - use cases and orchestration over the ledger store.
// The settlement engine itself lives in `domain`; this layer loads a consistent
// snapshot per event and turns engine output into what clients display.

pub mod error;
mod locks;
pub mod report;
mod service;

pub use error::*;
pub use locks::EventLocks;
pub use report::*;
pub use service::*;
