//! Tender and bid procurement: versioned entities, status lifecycle, and the
//! submission decision.
//!
//! Tenders and bids share one generic versioned store ([`versioning`]) over a
//! transactional repository ([`repository`]). The [`service`] wraps every
//! operation in a single transaction, and [`router`] exposes it over HTTP.

pub mod domain;
mod error;
pub mod identity;
pub mod memory;
pub mod repository;
pub mod router;
pub mod service;
pub mod status;
pub mod versioning;
pub mod workflow;

#[cfg(test)]
mod tests;

pub use domain::{
    Bid, BidFields, BidId, BidPatch, DecisionOutcome, Entity, EntityKind, OrganizationId,
    PrincipalId, RowId, StatusView, Tender, TenderFields, TenderId, TenderPatch,
};
pub use error::ProcurementError;
pub use identity::PrincipalDirectory;
pub use memory::{MemoryStore, MemoryTransaction};
pub use repository::{ProcurementRepository, RepositoryError, Transaction, VersionStore};
pub use router::procurement_router;
pub use service::ProcurementService;
pub use status::{Status, Transition, TransitionError};
pub use versioning::{EntityFields, EntityId, HistoryEntry, NewVersionRow, VersionRow};
