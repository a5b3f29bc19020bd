// src/storage/mod.rs
pub mod azure;
pub mod client;
pub mod memory;
pub mod types;

pub use azure::AzureBlobStore;
pub use client::BlobStore;
pub use memory::MemoryStore;
pub use types::BlobItem;
