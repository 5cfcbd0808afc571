use super::domain::{BidFields, BidId, DecisionOutcome, StatusView, TenderFields};
use super::error::ProcurementError;
use super::identity::{resolve_principal, PrincipalDirectory};
use super::repository::VersionStore;
use super::status::{Status, Transition};
use super::versioning::{current, EntityFields};

/// Close the bid's tender and cancel the bid.
///
/// Checks run in a fixed order: the bid exists, the bid is published, the
/// tender is published, and `deciding_username` is responsible for the
/// tender's organization. Both status writes go through the same transaction,
/// so a failure between them leaves neither applied once the transaction is
/// dropped. There is a single outcome; accept and reject are not told apart.
pub fn decide<S>(
    store: &mut S,
    bid_id: BidId,
    deciding_username: &str,
) -> Result<DecisionOutcome, ProcurementError>
where
    S: VersionStore<TenderFields> + VersionStore<BidFields> + PrincipalDirectory + ?Sized,
{
    let bid = current::<BidFields, S>(store, bid_id)?;
    if bid.status != Status::Published {
        return Err(ProcurementError::not_published::<BidFields>(bid_id));
    }

    let tender_id = bid.fields.tender_id;
    let tender = current::<TenderFields, S>(store, tender_id)?;
    if tender.status != Status::Published {
        return Err(ProcurementError::not_published::<TenderFields>(tender_id));
    }

    resolve_principal(store, tender.fields.organization_id, deciding_username)?;

    let bid_status = bid.status.apply(Transition::Cancel).map_err(|source| {
        ProcurementError::IllegalTransition {
            kind: BidFields::KIND,
            id: bid_id.0,
            source,
        }
    })?;
    let tender_status = tender.status.apply(Transition::Close).map_err(|source| {
        ProcurementError::IllegalTransition {
            kind: TenderFields::KIND,
            id: tender_id.0,
            source,
        }
    })?;

    VersionStore::<BidFields>::set_current_status(store, bid_id, bid_status)?;
    VersionStore::<TenderFields>::set_current_status(store, tender_id, tender_status)?;

    Ok(DecisionOutcome {
        bid: StatusView {
            id: bid_id,
            status: bid_status,
        },
        tender: StatusView {
            id: tender_id,
            status: tender_status,
        },
    })
}
