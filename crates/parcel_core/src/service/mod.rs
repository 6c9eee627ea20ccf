//! Core use-case services.

pub mod parcel_service;
