//! Domain models for the marketplace store.
//!
//! Two shapes exist for a marketplace entry:
//!
//! - [`ServerDoc`]: the stored document. Every field is optional because
//!   documents written by older clients may lack any of them.
//! - [`MarketplaceServer`]: the wire form returned by the API, with the
//!   server-side defaults (`isPublic = true`, `installCount = 0`) applied.
//!
//! [`ServerPayload`] carries the caller-editable subset for create and update.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

/// 32-character lowercase hex ID used for entries and reviews.
pub type Id = String;

/// Developer contact details shown on an entry's detail page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeveloperInfo {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
}

/// Aggregate star rating.
///
/// `count` and `distribution` are not required to agree; documents imported
/// from elsewhere may carry any combination.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Rating {
    /// Average in `0.0..=5.0`
    #[serde(default)]
    pub average: f64,
    #[serde(default)]
    pub count: i64,
    /// Star value (1..=5) to number of ratings
    #[schema(value_type = Object)]
    #[serde(default)]
    pub distribution: BTreeMap<u8, i64>,
}

impl Rating {
    /// Build an aggregate from `(stars, count)` pairs.
    pub fn from_counts(counts: &[(i64, i64)]) -> Self {
        let mut distribution: BTreeMap<u8, i64> = (1..=5).map(|star| (star, 0)).collect();
        let mut total = 0;
        let mut sum = 0;
        for &(stars, count) in counts {
            if let Ok(star) = u8::try_from(stars)
                && (1..=5).contains(&star)
            {
                *distribution.entry(star).or_insert(0) += count;
                total += count;
                sum += stars * count;
            }
        }
        let average = if total == 0 {
            0.0
        } else {
            sum as f64 / total as f64
        };
        Self {
            average,
            count: total,
            distribution,
        }
    }
}

/// Caller-editable fields of an entry.
///
/// Absent fields are skipped when serialized, so a payload doubles as a
/// partial-update patch: only the keys present are written.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ServerPayload {
    #[schema(example = "fs-server")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    /// Opaque server configuration, interpreted only by installers
    #[schema(value_type = Object, example = json!({"command": "node", "args": ["index.js"]}))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_public: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub support_email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub developer_info: Option<DeveloperInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub readme: Option<String>,
}

/// Stored form of an entry (the `doc` column).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerDoc {
    #[serde(flatten)]
    pub fields: ServerPayload,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<Rating>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub install_count: Option<i64>,
}

impl ServerDoc {
    /// The single authorization rule: an entry with an owner may only be
    /// changed by that owner; an ownerless entry may be changed by anyone.
    pub fn is_editable_by(&self, caller_id: &str) -> bool {
        is_editable_by(self.owner_id.as_deref(), caller_id)
    }
}

pub(crate) fn is_editable_by(owner_id: Option<&str>, caller_id: &str) -> bool {
    match owner_id {
        Some(owner) if !owner.is_empty() => owner == caller_id,
        _ => true,
    }
}

fn default_true() -> bool {
    true
}

/// Wire form of an entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MarketplaceServer {
    #[schema(example = "5f0c8a3e9b2d4c1a8e7f6d5c4b3a2910")]
    pub id: Id,
    #[schema(example = "fs-server")]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[schema(value_type = Object)]
    #[serde(default)]
    pub config: Value,
    #[schema(example = "2025-01-01T00:00:00.000Z")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_name: Option<String>,
    #[serde(default = "default_true")]
    pub is_public: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub support_email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub developer_info: Option<DeveloperInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<Rating>,
    #[serde(default)]
    pub install_count: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub readme: Option<String>,
    /// Set by the API when the request carried a caller identity
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_owner: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub can_edit: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub can_delete: Option<bool>,
}

impl MarketplaceServer {
    /// Translate a stored document into the wire form.
    pub fn from_doc(id: Id, doc: ServerDoc) -> Self {
        let f = doc.fields;
        Self {
            id,
            name: f.name.unwrap_or_default(),
            description: f.description,
            version: f.version,
            author: f.author,
            config: f.config.unwrap_or(Value::Null),
            created_at: doc.created_at,
            updated_at: doc.updated_at,
            owner_id: doc.owner_id,
            owner_email: doc.owner_email,
            owner_name: doc.owner_name,
            is_public: f.is_public.unwrap_or(true),
            video_url: f.video_url,
            instructions: f.instructions,
            category: f.category,
            website: f.website,
            support_email: f.support_email,
            developer_info: f.developer_info,
            rating: doc.rating,
            install_count: doc.install_count.unwrap_or(0),
            repository: f.repository,
            tags: f.tags,
            readme: f.readme,
            is_owner: None,
            can_edit: None,
            can_delete: None,
        }
    }

    pub fn is_editable_by(&self, caller_id: &str) -> bool {
        is_editable_by(self.owner_id.as_deref(), caller_id)
    }

    /// Attach trusted ownership flags for the given caller.
    pub fn with_ownership(mut self, caller_id: &str) -> Self {
        let editable = self.is_editable_by(caller_id);
        self.is_owner = Some(self.owner_id.as_deref() == Some(caller_id));
        self.can_edit = Some(editable);
        self.can_delete = Some(editable);
        self
    }
}

/// Authenticated caller as reported by the external identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    pub id: String,
    pub email: Option<String>,
    pub name: Option<String>,
}

impl UserIdentity {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: None,
            name: None,
        }
    }
}

/// One user's rating of an entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReviewEntry {
    pub id: Id,
    pub server_id: Id,
    pub user_id: String,
    pub user_name: String,
    pub user_email: String,
    /// 1..=5 stars
    #[schema(example = 5)]
    pub rating: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub review: Option<String>,
    pub created_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

/// Collection-wide counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MarketplaceStats {
    pub total_servers: i64,
    pub public_servers: i64,
    /// Distinct owners across all entries
    pub total_owners: i64,
    /// Entries owned by the caller (0 when anonymous)
    pub user_servers: i64,
}
