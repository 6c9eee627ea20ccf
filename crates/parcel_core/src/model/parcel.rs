//! Parcel domain model.
//!
//! # Responsibility
//! - Define the canonical parcel record persisted by the repository layer.
//! - Name the statuses the tracker knows how to advance.
//!
//! # Invariants
//! - `number` is assigned by storage and never reused for another parcel.
//! - `client` and `created_at` never change after creation.
//! - `address` may change, and the record may be deleted, only while
//!   `status == ParcelStatus::Registered`.

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Storage-assigned parcel identifier.
pub type ParcelNumber = i64;

/// Identifier of the client that owns a parcel.
pub type ClientId = i64;

/// Parcel lifecycle state.
///
/// Stored as plain text. Values outside the known set are kept verbatim in
/// `Other` so that rows written by other tools survive a read/write cycle.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ParcelStatus {
    /// Initial state. Address changes and deletion are allowed.
    Registered,
    /// Handed over to the carrier.
    Sent,
    /// Received by the addressee.
    Delivered,
    /// Status string not known to this crate.
    Other(String),
}

impl ParcelStatus {
    /// Stored text of [`ParcelStatus::Registered`].
    pub const REGISTERED: &'static str = "registered";
    /// Stored text of [`ParcelStatus::Sent`].
    pub const SENT: &'static str = "sent";
    /// Stored text of [`ParcelStatus::Delivered`].
    pub const DELIVERED: &'static str = "delivered";

    /// Returns the storage representation.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Registered => Self::REGISTERED,
            Self::Sent => Self::SENT,
            Self::Delivered => Self::DELIVERED,
            Self::Other(value) => value.as_str(),
        }
    }

    /// Returns the status that follows this one in the delivery flow.
    ///
    /// `Delivered` is terminal and unknown statuses have no successor.
    pub fn next(&self) -> Option<Self> {
        match self {
            Self::Registered => Some(Self::Sent),
            Self::Sent => Some(Self::Delivered),
            Self::Delivered | Self::Other(_) => None,
        }
    }

    /// Returns whether this is the initial `registered` status.
    pub fn is_registered(&self) -> bool {
        matches!(self, Self::Registered)
    }
}

impl From<&str> for ParcelStatus {
    fn from(value: &str) -> Self {
        match value {
            Self::REGISTERED => Self::Registered,
            Self::SENT => Self::Sent,
            Self::DELIVERED => Self::Delivered,
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<String> for ParcelStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            Self::REGISTERED | Self::SENT | Self::DELIVERED => Self::from(value.as_str()),
            _ => Self::Other(value),
        }
    }
}

impl From<ParcelStatus> for String {
    fn from(value: ParcelStatus) -> Self {
        match value {
            ParcelStatus::Other(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

impl Display for ParcelStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical parcel record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parcel {
    /// `None` until the parcel has been stored.
    pub number: Option<ParcelNumber>,
    pub client: ClientId,
    pub status: ParcelStatus,
    /// Free-form delivery address.
    pub address: String,
    /// RFC 3339 timestamp, UTC.
    pub created_at: String,
}

impl Parcel {
    /// Creates an unsaved `registered` parcel stamped with the current time.
    pub fn new(client: ClientId, address: impl Into<String>) -> Self {
        Self::with_created_at(client, address, now_rfc3339())
    }

    /// Creates an unsaved `registered` parcel with a caller-provided timestamp.
    ///
    /// Used by import paths and tests that need deterministic timestamps.
    pub fn with_created_at(
        client: ClientId,
        address: impl Into<String>,
        created_at: impl Into<String>,
    ) -> Self {
        Self {
            number: None,
            client,
            status: ParcelStatus::Registered,
            address: address.into(),
            created_at: created_at.into(),
        }
    }

    /// Returns whether address edits and deletion are still allowed.
    pub fn is_mutable(&self) -> bool {
        self.status.is_registered()
    }
}

/// Current UTC time in the format stored in `parcel.created_at`.
pub fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

#[cfg(test)]
mod tests {
    use super::{now_rfc3339, Parcel, ParcelStatus};

    #[test]
    fn known_statuses_map_to_variants() {
        assert_eq!(ParcelStatus::from("registered"), ParcelStatus::Registered);
        assert_eq!(ParcelStatus::from("sent".to_string()), ParcelStatus::Sent);
        assert_eq!(ParcelStatus::from("delivered"), ParcelStatus::Delivered);
    }

    #[test]
    fn unknown_status_is_kept_verbatim() {
        let status = ParcelStatus::from("lost".to_string());
        assert_eq!(status, ParcelStatus::Other("lost".to_string()));
        assert_eq!(status.as_str(), "lost");
        assert_eq!(String::from(status), "lost");
    }

    #[test]
    fn next_walks_delivery_flow_and_stops() {
        assert_eq!(ParcelStatus::Registered.next(), Some(ParcelStatus::Sent));
        assert_eq!(ParcelStatus::Sent.next(), Some(ParcelStatus::Delivered));
        assert_eq!(ParcelStatus::Delivered.next(), None);
        assert_eq!(ParcelStatus::Other("lost".to_string()).next(), None);
    }

    #[test]
    fn new_parcel_is_registered_and_unsaved() {
        let parcel = Parcel::new(1000, "test");
        assert_eq!(parcel.number, None);
        assert_eq!(parcel.status, ParcelStatus::Registered);
        assert!(parcel.is_mutable());
        assert!(parcel.created_at.ends_with('Z'));
    }

    #[test]
    fn status_serializes_as_plain_string() {
        let parcel = Parcel::with_created_at(7, "addr", "2024-01-02T03:04:05Z");
        let json = serde_json::to_value(&parcel).unwrap();
        assert_eq!(json["status"], "registered");
        assert_eq!(json["number"], serde_json::Value::Null);

        let back: Parcel = serde_json::from_value(json).unwrap();
        assert_eq!(back, parcel);
    }

    #[test]
    fn timestamp_uses_second_precision() {
        let stamp = now_rfc3339();
        assert_eq!(stamp.len(), "2024-01-02T03:04:05Z".len());
    }
}
