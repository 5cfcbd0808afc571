use std::sync::Arc;

use tracing::{error, info, warn};

use super::domain::{
    Bid, BidFields, BidId, BidPatch, DecisionOutcome, OrganizationId, PrincipalId, StatusView,
    Tender, TenderFields, TenderId, TenderPatch,
};
use super::error::ProcurementError;
use super::identity::resolve_principal;
use super::repository::{ProcurementRepository, Transaction};
use super::status::Transition;
use super::versioning::{self, HistoryEntry};
use super::workflow;

/// Public procurement operations, each run inside exactly one repository transaction.
pub struct ProcurementService<R> {
    repository: Arc<R>,
}

impl<R> ProcurementService<R>
where
    R: ProcurementRepository + 'static,
{
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }

    /// Open a transaction, run `body` against it and commit. Any error drops
    /// the transaction, discarding every write `body` made.
    fn run<'s, T>(
        &'s self,
        operation: &'static str,
        body: impl FnOnce(&mut R::Tx<'s>) -> Result<T, ProcurementError>,
    ) -> Result<T, ProcurementError> {
        let result = self
            .repository
            .begin()
            .map_err(|source| ProcurementError::Storage { operation, source })
            .and_then(|mut tx| {
                let value = body(&mut tx)?;
                tx.commit()
                    .map_err(|source| ProcurementError::Storage { operation, source })?;
                Ok(value)
            })
            .map_err(|err| err.during(operation));

        if let Err(err) = &result {
            match err {
                ProcurementError::Storage { .. } | ProcurementError::VersionConflict { .. } => {
                    error!(operation, error = %err, "procurement operation failed")
                }
                _ => warn!(
                    operation,
                    entity = err.entity_kind().map(|kind| kind.label()),
                    error = %err,
                    "procurement operation rejected"
                ),
            }
        }
        result
    }

    pub fn resolve_principal(
        &self,
        organization: OrganizationId,
        username: &str,
    ) -> Result<PrincipalId, ProcurementError> {
        self.run("resolve_principal", |tx| {
            resolve_principal(tx, organization, username)
        })
    }

    pub fn create_tender(&self, draft: TenderFields) -> Result<Tender, ProcurementError> {
        let tender = self.run("create_tender", |tx| versioning::create(tx, draft))?;
        info!(
            tender_id = %tender.id,
            organization_id = %tender.fields.organization_id,
            creator = %tender.fields.creator_username,
            "tender created"
        );
        Ok(tender)
    }

    pub fn edit_tender(
        &self,
        id: TenderId,
        patch: TenderPatch,
    ) -> Result<Tender, ProcurementError> {
        let tender = self.run("edit_tender", |tx| {
            versioning::edit::<TenderFields, _>(tx, id, patch)
        })?;
        info!(tender_id = %id, version = tender.version, "tender edited");
        Ok(tender)
    }

    pub fn rollback_tender(&self, id: TenderId, version: u32) -> Result<Tender, ProcurementError> {
        let tender = self.run("rollback_tender", |tx| {
            versioning::rollback::<TenderFields, _>(tx, id, version)
        })?;
        info!(
            tender_id = %id,
            restored = version,
            version = tender.version,
            "tender rolled back"
        );
        Ok(tender)
    }

    pub fn transition_tender(
        &self,
        id: TenderId,
        transition: Transition,
        username: &str,
    ) -> Result<Tender, ProcurementError> {
        let tender = self.run("transition_tender", |tx| {
            versioning::transition::<TenderFields, _>(tx, id, transition, username)
        })?;
        info!(tender_id = %id, %transition, status = %tender.status, "tender status changed");
        Ok(tender)
    }

    pub fn publish_tender(&self, id: TenderId, username: &str) -> Result<Tender, ProcurementError> {
        self.transition_tender(id, Transition::Publish, username)
    }

    pub fn close_tender(&self, id: TenderId, username: &str) -> Result<Tender, ProcurementError> {
        self.transition_tender(id, Transition::Close, username)
    }

    pub fn cancel_tender(&self, id: TenderId, username: &str) -> Result<Tender, ProcurementError> {
        self.transition_tender(id, Transition::Cancel, username)
    }

    pub fn list_tenders(&self) -> Result<Vec<Tender>, ProcurementError> {
        self.run("list_tenders", |tx| {
            versioning::list::<TenderFields, _, _>(tx, |_| true)
        })
    }

    /// Tenders whose latest version was created by `username`.
    pub fn list_user_tenders(&self, username: &str) -> Result<Vec<Tender>, ProcurementError> {
        self.run("list_user_tenders", |tx| {
            versioning::list::<TenderFields, _, _>(tx, |fields| fields.creator_username == username)
        })
    }

    pub fn tender_statuses(&self) -> Result<Vec<StatusView<TenderId>>, ProcurementError> {
        self.run("tender_statuses", |tx| {
            versioning::statuses::<TenderFields, _>(tx)
        })
    }

    pub fn tender_history(
        &self,
        id: TenderId,
    ) -> Result<Vec<HistoryEntry<TenderId>>, ProcurementError> {
        self.run("tender_history", |tx| {
            versioning::history::<TenderFields, _>(tx, id)
        })
    }

    /// Create a bid. The creator must be responsible for the bid's
    /// organization and the referenced tender must exist.
    pub fn create_bid(&self, draft: BidFields) -> Result<Bid, ProcurementError> {
        let bid = self.run("create_bid", |tx| {
            resolve_principal(tx, draft.organization_id, &draft.creator_username)?;
            versioning::current::<TenderFields, _>(tx, draft.tender_id)?;
            versioning::create(tx, draft)
        })?;
        info!(
            bid_id = %bid.id,
            tender_id = %bid.fields.tender_id,
            organization_id = %bid.fields.organization_id,
            creator = %bid.fields.creator_username,
            "bid created"
        );
        Ok(bid)
    }

    pub fn edit_bid(&self, id: BidId, patch: BidPatch) -> Result<Bid, ProcurementError> {
        let bid = self.run("edit_bid", |tx| versioning::edit::<BidFields, _>(tx, id, patch))?;
        info!(bid_id = %id, version = bid.version, "bid edited");
        Ok(bid)
    }

    pub fn rollback_bid(&self, id: BidId, version: u32) -> Result<Bid, ProcurementError> {
        let bid = self.run("rollback_bid", |tx| {
            versioning::rollback::<BidFields, _>(tx, id, version)
        })?;
        info!(bid_id = %id, restored = version, version = bid.version, "bid rolled back");
        Ok(bid)
    }

    pub fn transition_bid(
        &self,
        id: BidId,
        transition: Transition,
        username: &str,
    ) -> Result<Bid, ProcurementError> {
        let bid = self.run("transition_bid", |tx| {
            versioning::transition::<BidFields, _>(tx, id, transition, username)
        })?;
        info!(bid_id = %id, %transition, status = %bid.status, "bid status changed");
        Ok(bid)
    }

    pub fn publish_bid(&self, id: BidId, username: &str) -> Result<Bid, ProcurementError> {
        self.transition_bid(id, Transition::Publish, username)
    }

    pub fn close_bid(&self, id: BidId, username: &str) -> Result<Bid, ProcurementError> {
        self.transition_bid(id, Transition::Close, username)
    }

    pub fn cancel_bid(&self, id: BidId, username: &str) -> Result<Bid, ProcurementError> {
        self.transition_bid(id, Transition::Cancel, username)
    }

    pub fn list_bids(&self) -> Result<Vec<Bid>, ProcurementError> {
        self.run("list_bids", |tx| versioning::list::<BidFields, _, _>(tx, |_| true))
    }

    pub fn list_user_bids(&self, username: &str) -> Result<Vec<Bid>, ProcurementError> {
        self.run("list_user_bids", |tx| {
            versioning::list::<BidFields, _, _>(tx, |fields| fields.creator_username == username)
        })
    }

    pub fn bid_statuses(&self) -> Result<Vec<StatusView<BidId>>, ProcurementError> {
        self.run("bid_statuses", |tx| versioning::statuses::<BidFields, _>(tx))
    }

    /// Bids placed on `tender_id`; fails when the tender does not exist.
    pub fn list_tender_bids(&self, tender_id: TenderId) -> Result<Vec<Bid>, ProcurementError> {
        self.run("list_tender_bids", |tx| {
            versioning::current::<TenderFields, _>(tx, tender_id)?;
            versioning::list::<BidFields, _, _>(tx, |fields| fields.tender_id == tender_id)
        })
    }

    pub fn bid_history(&self, id: BidId) -> Result<Vec<HistoryEntry<BidId>>, ProcurementError> {
        self.run("bid_history", |tx| versioning::history::<BidFields, _>(tx, id))
    }

    /// Submit the decision on a bid: the bid is canceled and its tender closed, atomically.
    pub fn submit_decision(
        &self,
        bid_id: BidId,
        deciding_username: &str,
    ) -> Result<DecisionOutcome, ProcurementError> {
        let outcome = self.run("submit_decision", |tx| {
            workflow::decide(tx, bid_id, deciding_username)
        })?;
        info!(
            bid_id = %bid_id,
            tender_id = %outcome.tender.id,
            deciding_username,
            "decision submitted"
        );
        Ok(outcome)
    }
}
