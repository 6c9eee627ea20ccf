//! Parcel use-case service.
//!
//! # Responsibility
//! - Provide register/list/advance/re-address/delete entry points for callers.
//! - Delegate persistence and the status gate to repository implementations.
//!
//! # Invariants
//! - Status only moves forward along `registered -> sent -> delivered`.
//! - Address changes and deletion keep the repository's no-op semantics for
//!   parcels that are no longer `registered`.
//! - Log events carry identifiers and statuses only, never addresses.

use crate::model::parcel::{ClientId, Parcel, ParcelNumber, ParcelStatus};
use crate::repo::parcel_repo::{ParcelRepository, RepoError};
use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type ServiceResult<T> = Result<T, ParcelServiceError>;

/// Service error for parcel use-cases.
#[derive(Debug)]
pub enum ParcelServiceError {
    /// Target parcel does not exist.
    ParcelNotFound(ParcelNumber),
    /// Persistence-layer failure.
    Repo(RepoError),
}

impl Display for ParcelServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ParcelNotFound(number) => write!(f, "parcel not found: {number}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ParcelServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            Self::ParcelNotFound(_) => None,
        }
    }
}

impl From<RepoError> for ParcelServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound(number) => Self::ParcelNotFound(number),
            other => Self::Repo(other),
        }
    }
}

/// Parcel service facade over repository implementations.
pub struct ParcelService<R: ParcelRepository> {
    repo: R,
}

impl<R: ParcelRepository> ParcelService<R> {
    /// Creates a service using the provided repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Registers a new parcel for `client` and returns the stored record.
    pub fn register(&self, client: ClientId, address: impl Into<String>) -> ServiceResult<Parcel> {
        let mut parcel = Parcel::new(client, address);
        let number = self.repo.add(&parcel)?;
        parcel.number = Some(number);

        info!("event=parcel_register module=service status=ok number={number} client={client}");
        Ok(parcel)
    }

    /// Loads one parcel by number.
    pub fn parcel(&self, number: ParcelNumber) -> ServiceResult<Parcel> {
        Ok(self.repo.get(number)?)
    }

    /// Lists all parcels owned by `client`, oldest first.
    pub fn client_parcels(&self, client: ClientId) -> ServiceResult<Vec<Parcel>> {
        Ok(self.repo.get_by_client(client)?)
    }

    /// Advances a parcel to the next delivery status.
    ///
    /// Returns the new status, or `None` when the parcel is already in a
    /// terminal or unknown status (nothing is written in that case).
    pub fn next_status(&self, number: ParcelNumber) -> ServiceResult<Option<ParcelStatus>> {
        let parcel = self.repo.get(number)?;
        let Some(next) = parcel.status.next() else {
            info!(
                "event=parcel_next_status module=service status=skipped number={number} current={}",
                parcel.status
            );
            return Ok(None);
        };

        self.repo.set_status(number, &next)?;
        info!(
            "event=parcel_next_status module=service status=ok number={number} from={} to={next}",
            parcel.status
        );
        Ok(Some(next))
    }

    /// Changes the delivery address of a `registered` parcel.
    ///
    /// Returns `false` without writing when the parcel has left `registered`.
    /// The repository gate still applies if the status changes in between.
    pub fn change_address(&self, number: ParcelNumber, address: &str) -> ServiceResult<bool> {
        if !self.ensure_mutable("parcel_change_address", number)? {
            return Ok(false);
        }

        self.repo.set_address(number, address)?;
        info!("event=parcel_change_address module=service status=ok number={number}");
        Ok(true)
    }

    /// Deletes a `registered` parcel.
    ///
    /// Returns `false` without deleting when the parcel has left `registered`.
    pub fn delete(&self, number: ParcelNumber) -> ServiceResult<bool> {
        if !self.ensure_mutable("parcel_delete", number)? {
            return Ok(false);
        }

        self.repo.delete(number)?;
        info!("event=parcel_delete module=service status=ok number={number}");
        Ok(true)
    }

    fn ensure_mutable(&self, event: &str, number: ParcelNumber) -> ServiceResult<bool> {
        let parcel = self.repo.get(number)?;
        if !parcel.is_mutable() {
            info!(
                "event={event} module=service status=skipped reason=not_registered number={number} current={}",
                parcel.status
            );
            return Ok(false);
        }
        Ok(true)
    }
}
