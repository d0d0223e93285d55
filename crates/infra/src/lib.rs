//! Infrastructure layer: persistence gateway implementations.
//!
//! The in-memory gateway backs tests and local runs; a database-backed
//! implementation would provide the same traits over a connection pool.

pub mod integration_tests;
pub mod memory;

pub use memory::InMemoryGateway;
