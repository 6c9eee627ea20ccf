//! Domain model for parcel tracking.
//!
//! # Responsibility
//! - Define the data structures shared by repository and service layers.
//!
//! # Invariants
//! - Every stored parcel is identified by a storage-assigned `ParcelNumber`.
//! - Deletion is a hard delete; there are no tombstones.

pub mod parcel;
