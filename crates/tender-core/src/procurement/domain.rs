use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

use super::status::Status;
use super::versioning::{EntityFields, EntityId};

/// Stable external identity of a tender (its owning-identity link id).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenderId(pub i64);

/// Stable external identity of a bid (its owning-identity link id).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BidId(pub i64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrganizationId(pub i64);

/// Identifier of an employee registered as responsible for an organization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrincipalId(pub i64);

/// Internal identifier of one immutable version row. Changes on every edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RowId(pub i64);

macro_rules! display_inner {
    ($($ty:ty),+) => {
        $(impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        })+
    };
}

display_inner!(TenderId, BidId, OrganizationId, PrincipalId, RowId);

impl EntityId for TenderId {
    fn from_raw(raw: i64) -> Self {
        TenderId(raw)
    }

    fn raw(self) -> i64 {
        self.0
    }
}

impl EntityId for BidId {
    fn from_raw(raw: i64) -> Self {
        BidId(raw)
    }

    fn raw(self) -> i64 {
        self.0
    }
}

/// Which versioned entity an error or log line refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Tender,
    Bid,
}

impl EntityKind {
    pub fn label(self) -> &'static str {
        match self {
            EntityKind::Tender => "tender",
            EntityKind::Bid => "bid",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Field record of a tender version. Doubles as the creation draft.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TenderFields {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub service_type: String,
    pub organization_id: OrganizationId,
    pub creator_username: String,
}

/// Partial tender update; `None` leaves the current value in place.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TenderPatch {
    #[serde(default, deserialize_with = "non_empty")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "non_empty")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "non_empty")]
    pub service_type: Option<String>,
}

impl EntityFields for TenderFields {
    type Id = TenderId;
    type Patch = TenderPatch;

    const KIND: EntityKind = EntityKind::Tender;

    fn organization_id(&self) -> OrganizationId {
        self.organization_id
    }

    fn creator_username(&self) -> &str {
        &self.creator_username
    }

    fn apply(&mut self, patch: TenderPatch) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(service_type) = patch.service_type {
            self.service_type = service_type;
        }
    }

    fn to_patch(&self) -> TenderPatch {
        TenderPatch {
            name: Some(self.name.clone()),
            description: Some(self.description.clone()),
            service_type: Some(self.service_type.clone()),
        }
    }
}

/// Field record of a bid version. `tender_id` is the parent tender's stable id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BidFields {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub tender_id: TenderId,
    pub organization_id: OrganizationId,
    pub creator_username: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BidPatch {
    #[serde(default, deserialize_with = "non_empty")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "non_empty")]
    pub description: Option<String>,
}

impl EntityFields for BidFields {
    type Id = BidId;
    type Patch = BidPatch;

    const KIND: EntityKind = EntityKind::Bid;

    fn organization_id(&self) -> OrganizationId {
        self.organization_id
    }

    fn creator_username(&self) -> &str {
        &self.creator_username
    }

    fn apply(&mut self, patch: BidPatch) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
    }

    fn to_patch(&self) -> BidPatch {
        BidPatch {
            name: Some(self.name.clone()),
            description: Some(self.description.clone()),
        }
    }
}

/// Externally visible entity: stable id, latest version's fields, current status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct Entity<F: EntityFields> {
    pub id: F::Id,
    #[serde(flatten)]
    pub fields: F,
    pub status: Status,
    pub version: u32,
}

pub type Tender = Entity<TenderFields>;
pub type Bid = Entity<BidFields>;

/// Reduced `(id, status)` projection for status polling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusView<I> {
    pub id: I,
    pub status: Status,
}

/// Result of a submitted decision: the statuses both entities ended in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionOutcome {
    pub bid: StatusView<BidId>,
    pub tender: StatusView<TenderId>,
}

fn non_empty<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|raw| !raw.trim().is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tender_fields() -> TenderFields {
        TenderFields {
            name: "Road repair".to_string(),
            description: "Resurface Main St".to_string(),
            service_type: "Construction".to_string(),
            organization_id: OrganizationId(7),
            creator_username: "alice".to_string(),
        }
    }

    #[test]
    fn patch_only_overwrites_provided_fields() {
        let mut fields = tender_fields();
        fields.apply(TenderPatch {
            description: Some("X".to_string()),
            ..TenderPatch::default()
        });

        assert_eq!(fields.description, "X");
        assert_eq!(fields.name, "Road repair");
        assert_eq!(fields.service_type, "Construction");
    }

    #[test]
    fn snapshot_patch_restores_every_editable_field() {
        let original = tender_fields();
        let mut edited = original.clone();
        edited.name = "Bridge".to_string();
        edited.description = String::new();

        edited.apply(original.to_patch());
        assert_eq!(edited, original);
    }

    #[test]
    fn empty_strings_in_patch_payload_count_as_absent() {
        let patch: BidPatch =
            serde_json::from_value(json!({ "name": "", "description": "  " })).expect("parses");
        assert_eq!(patch, BidPatch::default());

        let patch: TenderPatch =
            serde_json::from_value(json!({ "serviceType": "Delivery" })).expect("parses");
        assert_eq!(patch.service_type.as_deref(), Some("Delivery"));
        assert!(patch.name.is_none());
    }

    #[test]
    fn entity_serializes_flat_camel_case() {
        let tender = Tender {
            id: TenderId(3),
            fields: tender_fields(),
            status: Status::Created,
            version: 1,
        };

        let value = serde_json::to_value(&tender).expect("serializes");
        assert_eq!(
            value,
            json!({
                "id": 3,
                "name": "Road repair",
                "description": "Resurface Main St",
                "serviceType": "Construction",
                "organizationId": 7,
                "creatorUsername": "alice",
                "status": "CREATED",
                "version": 1,
            })
        );

        let decoded: Tender = serde_json::from_value(value).expect("deserializes");
        assert_eq!(decoded, tender);
    }
}
