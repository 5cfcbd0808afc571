use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;

use super::domain::{BidFields, BidId, OrganizationId, PrincipalId, RowId, TenderFields, TenderId};
use super::identity::PrincipalDirectory;
use super::repository::{ProcurementRepository, RepositoryError, Transaction, VersionStore};
use super::status::Status;
use super::versioning::{EntityFields, EntityId, HistoryEntry, NewVersionRow, VersionRow};

/// In-process repository used by the API service, the demo, and tests.
///
/// A transaction holds the store lock until it is committed or dropped, so
/// transactions run one at a time. Writes land in the shared state directly
/// and record an undo step; dropping an uncommitted transaction replays the
/// steps in reverse.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    /// Register `username` as responsible for `organization`, returning the
    /// existing principal when the pair is already known.
    pub fn register_responsible(
        &self,
        organization: OrganizationId,
        username: impl Into<String>,
    ) -> Result<PrincipalId, RepositoryError> {
        let mut state = self.lock()?;
        let next = PrincipalId(state.principals.len() as i64 + 1);
        Ok(*state
            .principals
            .entry((organization, username.into()))
            .or_insert(next))
    }

    /// Responsible principal recorded on a tender's owning link.
    pub fn tender_owner(&self, id: TenderId) -> Result<Option<PrincipalId>, RepositoryError> {
        Ok(self.lock()?.tenders.links.get(&id).map(|link| link.principal))
    }

    /// Responsible principal recorded on a bid's owning link.
    pub fn bid_owner(&self, id: BidId) -> Result<Option<PrincipalId>, RepositoryError> {
        Ok(self.lock()?.bids.links.get(&id).map(|link| link.principal))
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryState>, RepositoryError> {
        self.state
            .lock()
            .map_err(|_| RepositoryError::Unavailable("memory store lock poisoned".to_string()))
    }
}

impl ProcurementRepository for MemoryStore {
    type Tx<'a> = MemoryTransaction<'a>;

    fn begin(&self) -> Result<MemoryTransaction<'_>, RepositoryError> {
        Ok(MemoryTransaction {
            state: self.lock()?,
            undo: Vec::new(),
        })
    }
}

pub struct MemoryTransaction<'a> {
    state: MutexGuard<'a, MemoryState>,
    undo: Vec<Undo>,
}

impl Transaction for MemoryTransaction<'_> {
    fn commit(mut self) -> Result<(), RepositoryError> {
        self.undo.clear();
        Ok(())
    }
}

impl PrincipalDirectory for MemoryTransaction<'_> {
    fn find_principal(
        &mut self,
        organization: OrganizationId,
        username: &str,
    ) -> Result<Option<PrincipalId>, RepositoryError> {
        Ok(self
            .state
            .principals
            .get(&(organization, username.to_string()))
            .copied())
    }
}

impl Drop for MemoryTransaction<'_> {
    fn drop(&mut self) {
        while let Some(step) = self.undo.pop() {
            match step {
                Undo::Tender(step) => self.state.tenders.revert(step),
                Undo::Bid(step) => self.state.bids.revert(step),
            }
        }
    }
}

/// Inverse of one write made inside a transaction.
#[derive(Debug)]
enum TableUndo<I> {
    Row(RowId),
    Owner(I),
    Repoint { id: I, row: RowId },
    History,
    Status { row: RowId, status: Status },
}

#[derive(Debug)]
enum Undo {
    Tender(TableUndo<TenderId>),
    Bid(TableUndo<BidId>),
}

#[derive(Debug, Default)]
struct MemoryState {
    principals: BTreeMap<(OrganizationId, String), PrincipalId>,
    tenders: EntityTable<TenderFields>,
    bids: EntityTable<BidFields>,
}

#[derive(Debug, Clone, Copy)]
struct OwnerLink {
    principal: PrincipalId,
    row: RowId,
}

/// Version rows, owning links, and history of one entity type.
#[derive(Debug)]
struct EntityTable<F: EntityFields> {
    rows: BTreeMap<RowId, VersionRow<F>>,
    links: BTreeMap<F::Id, OwnerLink>,
    history: Vec<HistoryEntry<F::Id>>,
    next_row: i64,
    next_link: i64,
}

impl<F: EntityFields> Default for EntityTable<F> {
    fn default() -> Self {
        Self {
            rows: BTreeMap::new(),
            links: BTreeMap::new(),
            history: Vec::new(),
            next_row: 1,
            next_link: 1,
        }
    }
}

impl<F: EntityFields> EntityTable<F> {
    fn insert_row(&mut self, row: NewVersionRow<F>) -> RowId {
        let row_id = RowId(self.next_row);
        self.next_row += 1;
        self.rows.insert(
            row_id,
            VersionRow {
                row_id,
                fields: row.fields,
                status: row.status,
                version: row.version,
                created_at: Utc::now(),
            },
        );
        row_id
    }

    fn insert_owner(&mut self, principal: PrincipalId, row: RowId) -> Result<F::Id, RepositoryError> {
        if !self.rows.contains_key(&row) {
            return Err(RepositoryError::NotFound);
        }
        let id = F::Id::from_raw(self.next_link);
        self.next_link += 1;
        self.links.insert(id, OwnerLink { principal, row });
        Ok(id)
    }

    /// Point the owning link at `row`, returning the row it pointed at before.
    fn repoint_owner(&mut self, id: F::Id, row: RowId) -> Result<RowId, RepositoryError> {
        if !self.rows.contains_key(&row) {
            return Err(RepositoryError::NotFound);
        }
        let link = self.links.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        Ok(std::mem::replace(&mut link.row, row))
    }

    fn append_history(&mut self, id: F::Id, row: RowId, version: u32) -> Result<(), RepositoryError> {
        if !self.links.contains_key(&id) {
            return Err(RepositoryError::NotFound);
        }
        if self
            .history
            .iter()
            .any(|entry| entry.owner == id && entry.version == version)
        {
            return Err(RepositoryError::Conflict);
        }
        self.history.push(HistoryEntry {
            owner: id,
            row_id: row,
            version,
            recorded_at: Utc::now(),
        });
        Ok(())
    }

    fn current_row(&self, id: F::Id) -> Option<VersionRow<F>> {
        self.links
            .get(&id)
            .and_then(|link| self.rows.get(&link.row))
            .cloned()
    }

    fn row_at_version(&self, id: F::Id, version: u32) -> Option<VersionRow<F>> {
        self.history
            .iter()
            .find(|entry| entry.owner == id && entry.version == version)
            .and_then(|entry| self.rows.get(&entry.row_id))
            .cloned()
    }

    fn max_version(&self, id: F::Id) -> Option<u32> {
        self.history
            .iter()
            .filter(|entry| entry.owner == id)
            .map(|entry| entry.version)
            .max()
    }

    fn history(&self, id: F::Id) -> Vec<HistoryEntry<F::Id>> {
        self.history
            .iter()
            .filter(|entry| entry.owner == id)
            .copied()
            .collect()
    }

    /// Overwrite the current row's status, returning the row and its previous status.
    fn set_current_status(
        &mut self,
        id: F::Id,
        status: Status,
    ) -> Result<(RowId, Status), RepositoryError> {
        let link = self.links.get(&id).ok_or(RepositoryError::NotFound)?;
        let row = self.rows.get_mut(&link.row).ok_or(RepositoryError::NotFound)?;
        Ok((row.row_id, std::mem::replace(&mut row.status, status)))
    }

    fn current_rows(&self) -> Vec<(F::Id, VersionRow<F>)> {
        self.links
            .iter()
            .filter_map(|(id, link)| self.rows.get(&link.row).map(|row| (*id, row.clone())))
            .collect()
    }

    fn revert(&mut self, step: TableUndo<F::Id>) {
        match step {
            TableUndo::Row(row) => {
                self.rows.remove(&row);
                self.next_row -= 1;
            }
            TableUndo::Owner(id) => {
                self.links.remove(&id);
                self.next_link -= 1;
            }
            TableUndo::Repoint { id, row } => {
                if let Some(link) = self.links.get_mut(&id) {
                    link.row = row;
                }
            }
            TableUndo::History => {
                self.history.pop();
            }
            TableUndo::Status { row, status } => {
                if let Some(current) = self.rows.get_mut(&row) {
                    current.status = status;
                }
            }
        }
    }
}

macro_rules! memory_version_store {
    ($fields:ty, $table:ident, $undo:ident) => {
        impl VersionStore<$fields> for MemoryTransaction<'_> {
            fn insert_row(&mut self, row: NewVersionRow<$fields>) -> Result<RowId, RepositoryError> {
                let row_id = self.state.$table.insert_row(row);
                self.undo.push(Undo::$undo(TableUndo::Row(row_id)));
                Ok(row_id)
            }

            fn insert_owner(
                &mut self,
                principal: PrincipalId,
                row: RowId,
            ) -> Result<<$fields as EntityFields>::Id, RepositoryError> {
                let id = self.state.$table.insert_owner(principal, row)?;
                self.undo.push(Undo::$undo(TableUndo::Owner(id)));
                Ok(id)
            }

            fn repoint_owner(
                &mut self,
                id: <$fields as EntityFields>::Id,
                row: RowId,
            ) -> Result<(), RepositoryError> {
                let previous = self.state.$table.repoint_owner(id, row)?;
                self.undo
                    .push(Undo::$undo(TableUndo::Repoint { id, row: previous }));
                Ok(())
            }

            fn append_history(
                &mut self,
                id: <$fields as EntityFields>::Id,
                row: RowId,
                version: u32,
            ) -> Result<(), RepositoryError> {
                self.state.$table.append_history(id, row, version)?;
                self.undo.push(Undo::$undo(TableUndo::History));
                Ok(())
            }

            fn current_row(
                &mut self,
                id: <$fields as EntityFields>::Id,
            ) -> Result<Option<VersionRow<$fields>>, RepositoryError> {
                Ok(self.state.$table.current_row(id))
            }

            fn row_at_version(
                &mut self,
                id: <$fields as EntityFields>::Id,
                version: u32,
            ) -> Result<Option<VersionRow<$fields>>, RepositoryError> {
                Ok(self.state.$table.row_at_version(id, version))
            }

            fn max_version(
                &mut self,
                id: <$fields as EntityFields>::Id,
            ) -> Result<Option<u32>, RepositoryError> {
                Ok(self.state.$table.max_version(id))
            }

            fn history(
                &mut self,
                id: <$fields as EntityFields>::Id,
            ) -> Result<Vec<HistoryEntry<<$fields as EntityFields>::Id>>, RepositoryError> {
                Ok(self.state.$table.history(id))
            }

            fn set_current_status(
                &mut self,
                id: <$fields as EntityFields>::Id,
                status: Status,
            ) -> Result<(), RepositoryError> {
                let (row, previous) = self.state.$table.set_current_status(id, status)?;
                self.undo.push(Undo::$undo(TableUndo::Status {
                    row,
                    status: previous,
                }));
                Ok(())
            }

            fn current_rows(
                &mut self,
            ) -> Result<Vec<(<$fields as EntityFields>::Id, VersionRow<$fields>)>, RepositoryError>
            {
                Ok(self.state.$table.current_rows())
            }
        }
    };
}

memory_version_store!(TenderFields, tenders, Tender);
memory_version_store!(BidFields, bids, Bid);
