//! In-memory storage implementations.

mod oauth;

pub use oauth::MemoryOAuthStorage;
