use clap::Args;
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tender_core::config::{DirectoryConfig, ResponsibleEmployee};
use tender_core::error::AppError;
use tender_core::procurement::{
    BidFields, BidPatch, MemoryStore, OrganizationId, ProcurementService, TenderFields, TenderPatch,
};

use crate::infra::seeded_store;

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Organization publishing the tender
    #[arg(long, default_value_t = 7)]
    pub(crate) organization: i64,
    /// Responsible employee creating and deciding on the tender
    #[arg(long, default_value = "alice")]
    pub(crate) owner: String,
    /// Organization placing the bid
    #[arg(long, default_value_t = 9)]
    pub(crate) bidder_organization: i64,
    /// Responsible employee of the bidding organization
    #[arg(long, default_value = "carol")]
    pub(crate) bidder: String,
    /// Print the final tender, bid, and version logs as JSON
    #[arg(long)]
    pub(crate) json: bool,
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        organization,
        owner,
        bidder_organization,
        bidder,
        json,
    } = args;
    let organization = OrganizationId(organization);
    let bidder_organization = OrganizationId(bidder_organization);

    let directory = DirectoryConfig {
        responsible: vec![
            ResponsibleEmployee {
                organization_id: organization,
                username: owner.clone(),
            },
            ResponsibleEmployee {
                organization_id: bidder_organization,
                username: bidder.clone(),
            },
        ],
    };
    let store: MemoryStore = seeded_store(&directory)?;
    let service = ProcurementService::new(Arc::new(store));

    println!("Tender procurement demo");

    let tender = service.create_tender(TenderFields {
        name: "Road repair".to_string(),
        description: "Resurface Main St".to_string(),
        service_type: "Construction".to_string(),
        organization_id: organization,
        creator_username: owner.clone(),
    })?;
    println!(
        "- tender {} created by {} (v{}, {})",
        tender.id, owner, tender.version, tender.status
    );

    let edited = service.edit_tender(
        tender.id,
        TenderPatch {
            description: Some("Resurface Main St and Oak Ave".to_string()),
            ..TenderPatch::default()
        },
    )?;
    println!("- tender {} edited (v{})", edited.id, edited.version);

    let restored = service.rollback_tender(tender.id, 1)?;
    println!(
        "- tender {} rolled back to v1 content as v{}: {}",
        restored.id, restored.version, restored.fields.description
    );

    let published = service.publish_tender(tender.id, &owner)?;
    println!("- tender {} is {}", published.id, published.status);

    let bid = service.create_bid(BidFields {
        name: "Asphalt crew".to_string(),
        description: "Two weeks of night shifts".to_string(),
        tender_id: tender.id,
        organization_id: bidder_organization,
        creator_username: bidder.clone(),
    })?;
    let bid = service.edit_bid(
        bid.id,
        BidPatch {
            description: Some("Ten days of night shifts".to_string()),
            ..BidPatch::default()
        },
    )?;
    let bid = service.publish_bid(bid.id, &bidder)?;
    println!(
        "- bid {} by {} on tender {} is {} (v{})",
        bid.id, bidder, bid.fields.tender_id, bid.status, bid.version
    );

    let outcome = service.submit_decision(bid.id, &owner)?;
    println!(
        "- decision by {}: bid {} -> {}, tender {} -> {}",
        owner, outcome.bid.id, outcome.bid.status, outcome.tender.id, outcome.tender.status
    );

    if json {
        let snapshot = json!({
            "tenders": service.list_tenders()?,
            "bids": service.list_bids()?,
            "tenderVersions": service.tender_history(tender.id)?,
            "bidVersions": service.bid_history(bid.id)?,
            "decision": outcome,
        });
        println!("{}", pretty(&snapshot)?);
    }

    Ok(())
}

fn pretty<T: Serialize>(value: &T) -> Result<String, AppError> {
    serde_json::to_string_pretty(value).map_err(|err| AppError::Io(err.into()))
}
