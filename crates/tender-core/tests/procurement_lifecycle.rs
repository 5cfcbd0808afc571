//! Integration scenarios for the tender and bid lifecycle.
//!
//! Scenarios drive the public service facade against the in-memory store, so
//! versioning, the status lifecycle, and the decision workflow are checked
//! together without reaching into private modules.

use std::sync::Arc;
use std::thread;

use tender_core::procurement::{
    BidFields, BidPatch, MemoryStore, OrganizationId, ProcurementError, ProcurementService,
    Status, TenderFields, TenderId, TenderPatch,
};

mod common {
    use super::*;

    pub(super) fn service() -> ProcurementService<MemoryStore> {
        let store = MemoryStore::default();
        store
            .register_responsible(OrganizationId(7), "alice")
            .expect("alice registers");
        store
            .register_responsible(OrganizationId(9), "carol")
            .expect("carol registers");
        ProcurementService::new(Arc::new(store))
    }

    pub(super) fn tender() -> TenderFields {
        TenderFields {
            name: "Snow removal".to_string(),
            description: "Winter season, city center".to_string(),
            service_type: "Delivery".to_string(),
            organization_id: OrganizationId(7),
            creator_username: "alice".to_string(),
        }
    }

    pub(super) fn bid(tender_id: TenderId) -> BidFields {
        BidFields {
            name: "Plough fleet".to_string(),
            description: "Six trucks on call".to_string(),
            tender_id,
            organization_id: OrganizationId(9),
            creator_username: "carol".to_string(),
        }
    }
}

#[test]
fn tender_and_bid_travel_the_whole_lifecycle() {
    let service = common::service();

    let tender = service.create_tender(common::tender()).expect("tender created");
    service
        .edit_tender(
            tender.id,
            TenderPatch {
                name: Some("Snow and ice removal".to_string()),
                ..TenderPatch::default()
            },
        )
        .expect("tender edited");
    let tender = service
        .publish_tender(tender.id, "alice")
        .expect("tender published");
    assert_eq!(tender.version, 2);
    assert_eq!(tender.fields.name, "Snow and ice removal");

    let bid = service
        .create_bid(common::bid(tender.id))
        .expect("bid created");
    service
        .edit_bid(
            bid.id,
            BidPatch {
                description: Some("Eight trucks on call".to_string()),
                ..BidPatch::default()
            },
        )
        .expect("bid edited");
    let bid = service.rollback_bid(bid.id, 1).expect("bid rolled back");
    assert_eq!(bid.version, 3);
    assert_eq!(bid.fields.description, "Six trucks on call");
    service.publish_bid(bid.id, "carol").expect("bid published");

    let outcome = service
        .submit_decision(bid.id, "alice")
        .expect("decision submitted");
    assert_eq!(outcome.bid.status, Status::Canceled);
    assert_eq!(outcome.tender.status, Status::Closed);

    let bids = service.list_tender_bids(tender.id).expect("bids listed");
    assert_eq!(bids.len(), 1);
    assert_eq!(bids[0].status, Status::Canceled);
    assert_eq!(bids[0].version, 3);
    assert_eq!(service.bid_history(bid.id).expect("history").len(), 3);
}

#[test]
fn closed_tender_cannot_be_reopened_or_decided_again() {
    let service = common::service();
    let tender = service.create_tender(common::tender()).expect("tender created");
    service
        .publish_tender(tender.id, "alice")
        .expect("tender published");
    let bid = service
        .create_bid(common::bid(tender.id))
        .expect("bid created");
    service.publish_bid(bid.id, "carol").expect("bid published");
    service.close_tender(tender.id, "alice").expect("tender closed");

    assert!(matches!(
        service.publish_tender(tender.id, "alice"),
        Err(ProcurementError::IllegalTransition { .. })
    ));
    assert!(matches!(
        service.submit_decision(bid.id, "alice"),
        Err(ProcurementError::NotPublished { .. })
    ));
    assert_eq!(
        service.bid_statuses().expect("statuses")[0].status,
        Status::Published
    );
}

#[test]
fn concurrent_edits_receive_distinct_consecutive_versions() {
    let service = Arc::new(common::service());
    let tender = service.create_tender(common::tender()).expect("tender created");

    let workers: Vec<_> = (0..8)
        .map(|worker| {
            let service = Arc::clone(&service);
            thread::spawn(move || {
                service
                    .edit_tender(
                        tender.id,
                        TenderPatch {
                            description: Some(format!("edited by worker {worker}")),
                            ..TenderPatch::default()
                        },
                    )
                    .expect("edit succeeds")
                    .version
            })
        })
        .collect();

    let mut versions: Vec<u32> = workers
        .into_iter()
        .map(|worker| worker.join().expect("worker finished"))
        .collect();
    versions.sort_unstable();
    assert_eq!(versions, (2..=9).collect::<Vec<u32>>());

    let history = service.tender_history(tender.id).expect("history");
    assert_eq!(
        history.iter().map(|entry| entry.version).collect::<Vec<_>>(),
        (1..=9).collect::<Vec<u32>>()
    );
}
