//! PostgreSQL persistence module.
//!
//! Provides the connection pool used by the PostgreSQL content, recipient
//! and message backends.

pub mod pool;

pub use pool::{PostgresPool, PostgresPoolError};
