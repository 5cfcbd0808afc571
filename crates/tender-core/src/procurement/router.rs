use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    routing::{get, patch, post, put},
    Json, Router,
};
use serde::Deserialize;

use super::domain::{
    Bid, BidFields, BidId, BidPatch, DecisionOutcome, OrganizationId, StatusView, Tender,
    TenderFields, TenderId, TenderPatch,
};
use super::repository::ProcurementRepository;
use super::service::ProcurementService;
use super::status::Transition;
use super::versioning::HistoryEntry;
use crate::error::AppError;

type ServiceState<R> = State<Arc<ProcurementService<R>>>;

/// Router builder exposing the tender and bid endpoints.
pub fn procurement_router<R>(service: Arc<ProcurementService<R>>) -> Router
where
    R: ProcurementRepository + 'static,
{
    Router::new()
        .route("/api/ping", get(ping))
        .route("/api/tenders", get(list_tenders::<R>))
        .route("/api/tenders/new", post(create_tender::<R>))
        .route("/api/tenders/my", get(list_user_tenders::<R>))
        .route("/api/tenders/status", get(tender_statuses::<R>))
        .route("/api/tenders/:id/edit", patch(edit_tender::<R>))
        .route("/api/tenders/:id/rollback/:version", put(rollback_tender::<R>))
        .route(
            "/api/tenders/:id/status/:transition",
            put(transition_tender::<R>),
        )
        .route("/api/tenders/:id/versions", get(tender_history::<R>))
        .route("/api/bids", get(list_bids::<R>))
        .route("/api/bids/new", post(create_bid::<R>))
        .route("/api/bids/my", get(list_user_bids::<R>))
        .route("/api/bids/status", get(bid_statuses::<R>))
        .route("/api/bids/:id/list", get(list_tender_bids::<R>))
        .route("/api/bids/:id/edit", patch(edit_bid::<R>))
        .route("/api/bids/:id/rollback/:version", put(rollback_bid::<R>))
        .route("/api/bids/:id/status/:transition", put(transition_bid::<R>))
        .route("/api/bids/:id/versions", get(bid_history::<R>))
        .route("/api/bids/:id/submit_decision", put(submit_decision::<R>))
        .with_state(service)
}

#[derive(Debug, Deserialize)]
pub(crate) struct UsernameQuery {
    #[serde(default)]
    pub(crate) username: String,
}

impl UsernameQuery {
    fn required(self) -> Result<String, AppError> {
        let username = self.username.trim();
        if username.is_empty() {
            return Err(AppError::BadRequest("username is required".to_string()));
        }
        Ok(username.to_string())
    }
}

fn require_creator(
    organization_id: OrganizationId,
    creator_username: &str,
) -> Result<(), AppError> {
    if organization_id.0 == 0 {
        return Err(AppError::BadRequest("organizationId is required".to_string()));
    }
    if creator_username.trim().is_empty() {
        return Err(AppError::BadRequest("creatorUsername is required".to_string()));
    }
    Ok(())
}

fn parse_transition(raw: &str) -> Result<Transition, AppError> {
    raw.parse::<Transition>()
        .map_err(|err| AppError::BadRequest(err.to_string()))
}

pub(crate) async fn ping() -> &'static str {
    "ok"
}

pub(crate) async fn list_tenders<R>(
    State(service): ServiceState<R>,
) -> Result<Json<Vec<Tender>>, AppError>
where
    R: ProcurementRepository + 'static,
{
    Ok(Json(service.list_tenders()?))
}

pub(crate) async fn create_tender<R>(
    State(service): ServiceState<R>,
    payload: Result<Json<TenderFields>, JsonRejection>,
) -> Result<Json<Tender>, AppError>
where
    R: ProcurementRepository + 'static,
{
    let Json(draft) = payload?;
    require_creator(draft.organization_id, &draft.creator_username)?;
    Ok(Json(service.create_tender(draft)?))
}

pub(crate) async fn list_user_tenders<R>(
    State(service): ServiceState<R>,
    query: Result<Query<UsernameQuery>, QueryRejection>,
) -> Result<Json<Vec<Tender>>, AppError>
where
    R: ProcurementRepository + 'static,
{
    let username = query?.0.required()?;
    Ok(Json(service.list_user_tenders(&username)?))
}

pub(crate) async fn tender_statuses<R>(
    State(service): ServiceState<R>,
) -> Result<Json<Vec<StatusView<TenderId>>>, AppError>
where
    R: ProcurementRepository + 'static,
{
    Ok(Json(service.tender_statuses()?))
}

pub(crate) async fn edit_tender<R>(
    State(service): ServiceState<R>,
    path: Result<Path<i64>, PathRejection>,
    payload: Result<Json<TenderPatch>, JsonRejection>,
) -> Result<Json<Tender>, AppError>
where
    R: ProcurementRepository + 'static,
{
    let Path(id) = path?;
    let Json(patch) = payload?;
    Ok(Json(service.edit_tender(TenderId(id), patch)?))
}

pub(crate) async fn rollback_tender<R>(
    State(service): ServiceState<R>,
    path: Result<Path<(i64, u32)>, PathRejection>,
) -> Result<Json<Tender>, AppError>
where
    R: ProcurementRepository + 'static,
{
    let Path((id, version)) = path?;
    Ok(Json(service.rollback_tender(TenderId(id), version)?))
}

pub(crate) async fn transition_tender<R>(
    State(service): ServiceState<R>,
    path: Result<Path<(i64, String)>, PathRejection>,
    query: Result<Query<UsernameQuery>, QueryRejection>,
) -> Result<Json<Tender>, AppError>
where
    R: ProcurementRepository + 'static,
{
    let Path((id, transition)) = path?;
    let transition = parse_transition(&transition)?;
    let username = query?.0.required()?;
    Ok(Json(service.transition_tender(
        TenderId(id),
        transition,
        &username,
    )?))
}

pub(crate) async fn tender_history<R>(
    State(service): ServiceState<R>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Json<Vec<HistoryEntry<TenderId>>>, AppError>
where
    R: ProcurementRepository + 'static,
{
    let Path(id) = path?;
    Ok(Json(service.tender_history(TenderId(id))?))
}

pub(crate) async fn list_bids<R>(
    State(service): ServiceState<R>,
) -> Result<Json<Vec<Bid>>, AppError>
where
    R: ProcurementRepository + 'static,
{
    Ok(Json(service.list_bids()?))
}

pub(crate) async fn create_bid<R>(
    State(service): ServiceState<R>,
    payload: Result<Json<BidFields>, JsonRejection>,
) -> Result<Json<Bid>, AppError>
where
    R: ProcurementRepository + 'static,
{
    let Json(draft) = payload?;
    if draft.tender_id.0 == 0 {
        return Err(AppError::BadRequest("tenderId is required".to_string()));
    }
    require_creator(draft.organization_id, &draft.creator_username)?;
    Ok(Json(service.create_bid(draft)?))
}

pub(crate) async fn list_user_bids<R>(
    State(service): ServiceState<R>,
    query: Result<Query<UsernameQuery>, QueryRejection>,
) -> Result<Json<Vec<Bid>>, AppError>
where
    R: ProcurementRepository + 'static,
{
    let username = query?.0.required()?;
    Ok(Json(service.list_user_bids(&username)?))
}

pub(crate) async fn bid_statuses<R>(
    State(service): ServiceState<R>,
) -> Result<Json<Vec<StatusView<BidId>>>, AppError>
where
    R: ProcurementRepository + 'static,
{
    Ok(Json(service.bid_statuses()?))
}

pub(crate) async fn list_tender_bids<R>(
    State(service): ServiceState<R>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Json<Vec<Bid>>, AppError>
where
    R: ProcurementRepository + 'static,
{
    let Path(tender_id) = path?;
    Ok(Json(service.list_tender_bids(TenderId(tender_id))?))
}

pub(crate) async fn edit_bid<R>(
    State(service): ServiceState<R>,
    path: Result<Path<i64>, PathRejection>,
    payload: Result<Json<BidPatch>, JsonRejection>,
) -> Result<Json<Bid>, AppError>
where
    R: ProcurementRepository + 'static,
{
    let Path(id) = path?;
    let Json(patch) = payload?;
    Ok(Json(service.edit_bid(BidId(id), patch)?))
}

pub(crate) async fn rollback_bid<R>(
    State(service): ServiceState<R>,
    path: Result<Path<(i64, u32)>, PathRejection>,
) -> Result<Json<Bid>, AppError>
where
    R: ProcurementRepository + 'static,
{
    let Path((id, version)) = path?;
    Ok(Json(service.rollback_bid(BidId(id), version)?))
}

pub(crate) async fn transition_bid<R>(
    State(service): ServiceState<R>,
    path: Result<Path<(i64, String)>, PathRejection>,
    query: Result<Query<UsernameQuery>, QueryRejection>,
) -> Result<Json<Bid>, AppError>
where
    R: ProcurementRepository + 'static,
{
    let Path((id, transition)) = path?;
    let transition = parse_transition(&transition)?;
    let username = query?.0.required()?;
    Ok(Json(service.transition_bid(BidId(id), transition, &username)?))
}

pub(crate) async fn bid_history<R>(
    State(service): ServiceState<R>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Json<Vec<HistoryEntry<BidId>>>, AppError>
where
    R: ProcurementRepository + 'static,
{
    let Path(id) = path?;
    Ok(Json(service.bid_history(BidId(id))?))
}

pub(crate) async fn submit_decision<R>(
    State(service): ServiceState<R>,
    path: Result<Path<i64>, PathRejection>,
    query: Result<Query<UsernameQuery>, QueryRejection>,
) -> Result<Json<DecisionOutcome>, AppError>
where
    R: ProcurementRepository + 'static,
{
    let Path(id) = path?;
    let username = query?.0.required()?;
    Ok(Json(service.submit_decision(BidId(id), &username)?))
}
