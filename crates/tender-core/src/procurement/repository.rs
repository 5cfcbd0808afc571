use super::domain::{BidFields, PrincipalId, RowId, TenderFields};
use super::identity::PrincipalDirectory;
use super::status::Status;
use super::versioning::{EntityFields, HistoryEntry, NewVersionRow, VersionRow};

/// Storage abstraction so the procurement service can be exercised against any backend.
///
/// Every service operation opens one transaction, runs all of its reads and
/// writes through it and commits once. Dropping a transaction without
/// committing must discard everything it wrote.
pub trait ProcurementRepository: Send + Sync {
    type Tx<'a>: Transaction
    where
        Self: 'a;

    fn begin(&self) -> Result<Self::Tx<'_>, RepositoryError>;
}

/// An open unit of work spanning principals, tenders, and bids.
pub trait Transaction:
    PrincipalDirectory + VersionStore<TenderFields> + VersionStore<BidFields>
{
    fn commit(self) -> Result<(), RepositoryError>;
}

/// Row-level operations on the version rows, owning links, and history log of one entity type.
pub trait VersionStore<F: EntityFields> {
    fn insert_row(&mut self, row: NewVersionRow<F>) -> Result<RowId, RepositoryError>;

    /// Create the owning identity for a freshly inserted version 1 row.
    fn insert_owner(&mut self, principal: PrincipalId, row: RowId) -> Result<F::Id, RepositoryError>;

    /// Point the owning identity at its new latest row.
    fn repoint_owner(&mut self, id: F::Id, row: RowId) -> Result<(), RepositoryError>;

    fn append_history(&mut self, id: F::Id, row: RowId, version: u32) -> Result<(), RepositoryError>;

    fn current_row(&mut self, id: F::Id) -> Result<Option<VersionRow<F>>, RepositoryError>;

    fn row_at_version(
        &mut self,
        id: F::Id,
        version: u32,
    ) -> Result<Option<VersionRow<F>>, RepositoryError>;

    /// Highest version recorded in the history log, `None` for unknown ids.
    fn max_version(&mut self, id: F::Id) -> Result<Option<u32>, RepositoryError>;

    fn history(&mut self, id: F::Id) -> Result<Vec<HistoryEntry<F::Id>>, RepositoryError>;

    /// Overwrite the status of the current row only. Never creates a version.
    fn set_current_status(&mut self, id: F::Id, status: Status) -> Result<(), RepositoryError>;

    fn current_rows(&mut self) -> Result<Vec<(F::Id, VersionRow<F>)>, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
