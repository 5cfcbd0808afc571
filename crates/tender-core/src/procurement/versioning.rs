//! Versioned entity store, written once and used for both tenders and bids.
//!
//! An entity is a stable owning identity pointing at its latest version row.
//! Edits never touch an existing row: they insert a new one with the merged
//! fields, repoint the owning link and append to the history log. Rollback is
//! an edit whose patch is the full snapshot of an older version. Status
//! transitions are the only in-place write and only ever touch the status of
//! the current row.
//!
//! The functions here run against one open transaction; committing it is the
//! caller's job.

use std::fmt;
use std::hash::Hash;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::domain::{Entity, EntityKind, OrganizationId, RowId, StatusView};
use super::error::ProcurementError;
use super::identity::{resolve_principal, PrincipalDirectory};
use super::repository::VersionStore;
use super::status::{Status, Transition};

pub const FIRST_VERSION: u32 = 1;

/// Stable external id of a versioned entity.
pub trait EntityId:
    Copy + Eq + Ord + Hash + fmt::Debug + fmt::Display + Serialize + DeserializeOwned + Send + Sync + 'static
{
    fn from_raw(raw: i64) -> Self;
    fn raw(self) -> i64;
}

/// Field record stored in every version row of one entity type.
pub trait EntityFields:
    Clone + fmt::Debug + PartialEq + Serialize + DeserializeOwned + Send + Sync + 'static
{
    type Id: EntityId;
    type Patch: Clone + fmt::Debug + Default + Send;

    const KIND: EntityKind;

    fn organization_id(&self) -> OrganizationId;
    fn creator_username(&self) -> &str;

    /// Overwrite the fields present in `patch`, keep the rest.
    fn apply(&mut self, patch: Self::Patch);

    /// Patch carrying every editable field of this record.
    fn to_patch(&self) -> Self::Patch;
}

/// Immutable snapshot of an entity at one version number.
#[derive(Debug, Clone, PartialEq)]
pub struct VersionRow<F> {
    pub row_id: RowId,
    pub fields: F,
    pub status: Status,
    pub version: u32,
    pub created_at: DateTime<Utc>,
}

/// Row contents handed to the store; the store assigns the id and timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct NewVersionRow<F> {
    pub fields: F,
    pub status: Status,
    pub version: u32,
}

/// One append-only entry of an entity's version log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry<I> {
    pub owner: I,
    pub row_id: RowId,
    pub version: u32,
    pub recorded_at: DateTime<Utc>,
}

fn materialize<F: EntityFields>(id: F::Id, row: VersionRow<F>) -> Entity<F> {
    Entity {
        id,
        fields: row.fields,
        status: row.status,
        version: row.version,
    }
}

/// Load the current version row or fail with the entity's not-found error.
pub fn current<F, S>(store: &mut S, id: F::Id) -> Result<VersionRow<F>, ProcurementError>
where
    F: EntityFields,
    S: VersionStore<F> + ?Sized,
{
    store
        .current_row(id)?
        .ok_or_else(|| ProcurementError::not_found::<F>(id))
}

/// Insert version 1 in CREATED after checking the creator may act for the organization.
pub fn create<F, S>(store: &mut S, fields: F) -> Result<Entity<F>, ProcurementError>
where
    F: EntityFields,
    S: VersionStore<F> + PrincipalDirectory + ?Sized,
{
    let principal = resolve_principal(
        store,
        fields.organization_id(),
        fields.creator_username(),
    )?;

    let row_id = store.insert_row(NewVersionRow {
        fields: fields.clone(),
        status: Status::Created,
        version: FIRST_VERSION,
    })?;
    let id = store.insert_owner(principal, row_id)?;
    store.append_history(id, row_id, FIRST_VERSION)?;

    Ok(Entity {
        id,
        fields,
        status: Status::Created,
        version: FIRST_VERSION,
    })
}

/// Merge `patch` into the current fields and store the result as a new version.
pub fn edit<F, S>(store: &mut S, id: F::Id, patch: F::Patch) -> Result<Entity<F>, ProcurementError>
where
    F: EntityFields,
    S: VersionStore<F> + ?Sized,
{
    let current = current::<F, S>(store, id)?;

    // The log and the row are read independently and must agree.
    let latest = store.max_version(id)?;
    if latest != Some(current.version) {
        return Err(ProcurementError::VersionConflict {
            kind: F::KIND,
            id: id.raw(),
            row_version: current.version,
            history_version: latest,
        });
    }
    let version = current
        .version
        .checked_add(1)
        .ok_or(ProcurementError::VersionConflict {
            kind: F::KIND,
            id: id.raw(),
            row_version: current.version,
            history_version: latest,
        })?;

    let mut fields = current.fields;
    fields.apply(patch);

    let row_id = store.insert_row(NewVersionRow {
        fields: fields.clone(),
        status: current.status,
        version,
    })?;
    store.repoint_owner(id, row_id)?;
    store.append_history(id, row_id, version)?;

    Ok(Entity {
        id,
        fields,
        status: current.status,
        version,
    })
}

/// Re-apply the snapshot stored at `version` as a new edit. History is never truncated.
pub fn rollback<F, S>(store: &mut S, id: F::Id, version: u32) -> Result<Entity<F>, ProcurementError>
where
    F: EntityFields,
    S: VersionStore<F> + ?Sized,
{
    let snapshot = store
        .row_at_version(id, version)?
        .ok_or(ProcurementError::VersionNotFound {
            kind: F::KIND,
            id: id.raw(),
            version,
        })?;

    edit::<F, S>(store, id, snapshot.fields.to_patch())
}

/// Move the current row to the status reached by `transition`, in place.
///
/// `actor` must be a responsible principal of the entity's organization.
pub fn transition<F, S>(
    store: &mut S,
    id: F::Id,
    transition: Transition,
    actor: &str,
) -> Result<Entity<F>, ProcurementError>
where
    F: EntityFields,
    S: VersionStore<F> + PrincipalDirectory + ?Sized,
{
    let current = current::<F, S>(store, id)?;
    resolve_principal(store, current.fields.organization_id(), actor)?;

    let status = current
        .status
        .apply(transition)
        .map_err(|source| ProcurementError::IllegalTransition {
            kind: F::KIND,
            id: id.raw(),
            source,
        })?;
    store.set_current_status(id, status)?;

    Ok(Entity {
        status,
        ..materialize(id, current)
    })
}

/// Current entities matching `filter`, ordered by id.
pub fn list<F, S, P>(store: &mut S, filter: P) -> Result<Vec<Entity<F>>, ProcurementError>
where
    F: EntityFields,
    S: VersionStore<F> + ?Sized,
    P: Fn(&F) -> bool,
{
    let mut entities: Vec<Entity<F>> = store
        .current_rows()?
        .into_iter()
        .filter(|(_, row)| filter(&row.fields))
        .map(|(id, row)| materialize(id, row))
        .collect();
    entities.sort_by_key(|entity| entity.id);
    Ok(entities)
}

pub fn statuses<F, S>(store: &mut S) -> Result<Vec<StatusView<F::Id>>, ProcurementError>
where
    F: EntityFields,
    S: VersionStore<F> + ?Sized,
{
    Ok(list::<F, S, _>(store, |_| true)?
        .into_iter()
        .map(|entity| StatusView {
            id: entity.id,
            status: entity.status,
        })
        .collect())
}

/// Full version log of an entity, oldest first.
pub fn history<F, S>(store: &mut S, id: F::Id) -> Result<Vec<HistoryEntry<F::Id>>, ProcurementError>
where
    F: EntityFields,
    S: VersionStore<F> + ?Sized,
{
    current::<F, S>(store, id)?;
    let mut entries = store.history(id)?;
    entries.sort_by_key(|entry| entry.version);
    Ok(entries)
}
