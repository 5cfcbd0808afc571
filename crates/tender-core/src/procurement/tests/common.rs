use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Method, Request};
use axum::response::Response;
use axum::Router;
use serde_json::Value;
use tower::ServiceExt;

use crate::procurement::domain::{
    Bid, BidFields, OrganizationId, PrincipalId, RowId, Tender, TenderFields, TenderId,
};
use crate::procurement::identity::PrincipalDirectory;
use crate::procurement::memory::{MemoryStore, MemoryTransaction};
use crate::procurement::repository::{
    ProcurementRepository, RepositoryError, Transaction, VersionStore,
};
use crate::procurement::status::Status;
use crate::procurement::versioning::{EntityFields, HistoryEntry, NewVersionRow, VersionRow};
use crate::procurement::{procurement_router, ProcurementService};

pub(super) const ORG: OrganizationId = OrganizationId(7);
pub(super) const OTHER_ORG: OrganizationId = OrganizationId(9);

/// alice and bob are responsible for org 7, carol for org 9.
pub(super) fn seeded_store() -> MemoryStore {
    let store = MemoryStore::default();
    for (organization, username) in [(ORG, "alice"), (ORG, "bob"), (OTHER_ORG, "carol")] {
        store
            .register_responsible(organization, username)
            .expect("principal registers");
    }
    store
}

pub(super) fn build_service() -> (ProcurementService<MemoryStore>, MemoryStore) {
    let store = seeded_store();
    let service = ProcurementService::new(Arc::new(store.clone()));
    (service, store)
}

pub(super) fn tender_draft() -> TenderFields {
    TenderFields {
        name: "Road repair".to_string(),
        description: "Resurface Main St".to_string(),
        service_type: "Construction".to_string(),
        organization_id: ORG,
        creator_username: "alice".to_string(),
    }
}

pub(super) fn bid_draft(tender_id: TenderId) -> BidFields {
    BidFields {
        name: "Asphalt crew".to_string(),
        description: "Two weeks, night shifts".to_string(),
        tender_id,
        organization_id: OTHER_ORG,
        creator_username: "carol".to_string(),
    }
}

pub(super) fn published_tender(service: &ProcurementService<MemoryStore>) -> Tender {
    let tender = service.create_tender(tender_draft()).expect("tender created");
    service
        .publish_tender(tender.id, "alice")
        .expect("tender published")
}

/// A published tender owned by org 7 carrying a published bid from org 9.
pub(super) fn published_pair(service: &ProcurementService<MemoryStore>) -> (Tender, Bid) {
    let tender = published_tender(service);
    let bid = service
        .create_bid(bid_draft(tender.id))
        .expect("bid created");
    let bid = service.publish_bid(bid.id, "carol").expect("bid published");
    (tender, bid)
}

pub(super) fn history_versions<I: Copy>(entries: &[HistoryEntry<I>]) -> Vec<u32> {
    entries.iter().map(|entry| entry.version).collect()
}

/// Repository whose every transaction fails to open.
pub(super) struct UnavailableRepository;

impl ProcurementRepository for UnavailableRepository {
    type Tx<'a> = MemoryTransaction<'a>;

    fn begin(&self) -> Result<MemoryTransaction<'_>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

/// Wraps a [`MemoryStore`] and fails every tender status write, after the
/// bid status write of the same transaction already went through.
#[derive(Clone)]
pub(super) struct TenderStatusFaultRepository {
    pub(super) inner: MemoryStore,
}

impl ProcurementRepository for TenderStatusFaultRepository {
    type Tx<'a> = FaultyTransaction<'a>;

    fn begin(&self) -> Result<FaultyTransaction<'_>, RepositoryError> {
        Ok(FaultyTransaction {
            inner: self.inner.begin()?,
        })
    }
}

pub(super) struct FaultyTransaction<'a> {
    inner: MemoryTransaction<'a>,
}

impl Transaction for FaultyTransaction<'_> {
    fn commit(self) -> Result<(), RepositoryError> {
        self.inner.commit()
    }
}

impl PrincipalDirectory for FaultyTransaction<'_> {
    fn find_principal(
        &mut self,
        organization: OrganizationId,
        username: &str,
    ) -> Result<Option<PrincipalId>, RepositoryError> {
        self.inner.find_principal(organization, username)
    }
}

macro_rules! delegate_version_store {
    ($fields:ty, |$this:ident, $id:ident, $status:ident| $set_status:expr) => {
        impl VersionStore<$fields> for FaultyTransaction<'_> {
            fn insert_row(&mut self, row: NewVersionRow<$fields>) -> Result<RowId, RepositoryError> {
                VersionStore::<$fields>::insert_row(&mut self.inner, row)
            }

            fn insert_owner(
                &mut self,
                principal: PrincipalId,
                row: RowId,
            ) -> Result<<$fields as EntityFields>::Id, RepositoryError> {
                VersionStore::<$fields>::insert_owner(&mut self.inner, principal, row)
            }

            fn repoint_owner(
                &mut self,
                id: <$fields as EntityFields>::Id,
                row: RowId,
            ) -> Result<(), RepositoryError> {
                VersionStore::<$fields>::repoint_owner(&mut self.inner, id, row)
            }

            fn append_history(
                &mut self,
                id: <$fields as EntityFields>::Id,
                row: RowId,
                version: u32,
            ) -> Result<(), RepositoryError> {
                VersionStore::<$fields>::append_history(&mut self.inner, id, row, version)
            }

            fn current_row(
                &mut self,
                id: <$fields as EntityFields>::Id,
            ) -> Result<Option<VersionRow<$fields>>, RepositoryError> {
                VersionStore::<$fields>::current_row(&mut self.inner, id)
            }

            fn row_at_version(
                &mut self,
                id: <$fields as EntityFields>::Id,
                version: u32,
            ) -> Result<Option<VersionRow<$fields>>, RepositoryError> {
                VersionStore::<$fields>::row_at_version(&mut self.inner, id, version)
            }

            fn max_version(
                &mut self,
                id: <$fields as EntityFields>::Id,
            ) -> Result<Option<u32>, RepositoryError> {
                VersionStore::<$fields>::max_version(&mut self.inner, id)
            }

            fn history(
                &mut self,
                id: <$fields as EntityFields>::Id,
            ) -> Result<Vec<HistoryEntry<<$fields as EntityFields>::Id>>, RepositoryError> {
                VersionStore::<$fields>::history(&mut self.inner, id)
            }

            fn set_current_status(
                &mut self,
                id: <$fields as EntityFields>::Id,
                status: Status,
            ) -> Result<(), RepositoryError> {
                let $this = self;
                let $id = id;
                let $status = status;
                $set_status
            }

            fn current_rows(
                &mut self,
            ) -> Result<Vec<(<$fields as EntityFields>::Id, VersionRow<$fields>)>, RepositoryError>
            {
                VersionStore::<$fields>::current_rows(&mut self.inner)
            }
        }
    };
}

delegate_version_store!(BidFields, |this, id, status| {
    VersionStore::<BidFields>::set_current_status(&mut this.inner, id, status)
});
delegate_version_store!(TenderFields, |_this, _id, _status| {
    Err(RepositoryError::Unavailable("tender status write lost".to_string()))
});

pub(super) fn router_with_service(service: ProcurementService<MemoryStore>) -> Router {
    procurement_router(Arc::new(service))
}

pub(super) async fn send(
    router: &Router,
    method: Method,
    uri: &str,
    body: Option<Value>,
) -> Response {
    let mut request = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(payload) => {
            request = request.header(header::CONTENT_TYPE, "application/json");
            Body::from(serde_json::to_vec(&payload).expect("serialize payload"))
        }
        None => Body::empty(),
    };

    router
        .clone()
        .oneshot(request.body(body).expect("request builds"))
        .await
        .expect("route executes")
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
