// src/lib.rs
// Public library surface for integration tests (and potential reuse).

pub mod aggregate;
pub mod api;
pub mod cache;
pub mod directory;
pub mod feed;
pub mod metrics;
pub mod storage;

// ---- Re-exports for stable public API ----
pub use crate::api::{router, AppState};
pub use crate::cache::ResponseCache;
pub use crate::feed::event::{ChangeEvent, Operation};
pub use crate::feed::FeedSnapshot;
