use super::domain::EntityKind;
use super::repository::RepositoryError;
use super::status::TransitionError;
use super::versioning::{EntityFields, EntityId};

/// Error raised by procurement operations.
///
/// Not-found, not-published and authorization failures are expected business
/// outcomes; only `Storage` and `VersionConflict` indicate a fault.
#[derive(Debug, thiserror::Error)]
pub enum ProcurementError {
    #[error("organization responsible employee not found")]
    PrincipalNotFound,
    #[error("{kind} {id} not found")]
    NotFound { kind: EntityKind, id: i64 },
    #[error("{kind} {id} has no version {version}")]
    VersionNotFound {
        kind: EntityKind,
        id: i64,
        version: u32,
    },
    #[error("{kind} {id} is not published")]
    NotPublished { kind: EntityKind, id: i64 },
    #[error("{kind} {id}: {source}")]
    IllegalTransition {
        kind: EntityKind,
        id: i64,
        source: TransitionError,
    },
    #[error(
        "{kind} {id} has inconsistent versions (current row {row_version}, history {history_version:?})"
    )]
    VersionConflict {
        kind: EntityKind,
        id: i64,
        row_version: u32,
        history_version: Option<u32>,
    },
    #[error("storage failure in {operation}: {source}")]
    Storage {
        operation: &'static str,
        source: RepositoryError,
    },
}

impl ProcurementError {
    pub(crate) fn not_found<F: EntityFields>(id: F::Id) -> Self {
        Self::NotFound {
            kind: F::KIND,
            id: id.raw(),
        }
    }

    pub(crate) fn not_published<F: EntityFields>(id: F::Id) -> Self {
        Self::NotPublished {
            kind: F::KIND,
            id: id.raw(),
        }
    }

    /// Attach the service operation name to storage failures.
    pub(crate) fn during(self, operation: &'static str) -> Self {
        match self {
            Self::Storage { source, .. } => Self::Storage { operation, source },
            other => other,
        }
    }

    /// The entity kind the error refers to, if any.
    pub fn entity_kind(&self) -> Option<EntityKind> {
        match self {
            Self::NotFound { kind, .. }
            | Self::VersionNotFound { kind, .. }
            | Self::NotPublished { kind, .. }
            | Self::IllegalTransition { kind, .. }
            | Self::VersionConflict { kind, .. } => Some(*kind),
            Self::PrincipalNotFound | Self::Storage { .. } => None,
        }
    }
}

impl From<RepositoryError> for ProcurementError {
    fn from(source: RepositoryError) -> Self {
        Self::Storage {
            operation: "repository",
            source,
        }
    }
}
