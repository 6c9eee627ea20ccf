//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the parcel data access contract.
//! - Isolate SQLite query details from service orchestration.
//!
//! # Invariants
//! - Repository APIs return the semantic `NotFound` error in addition to
//!   storage transport errors.

pub mod parcel_repo;
