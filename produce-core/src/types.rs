//! Domain types for the Produce extension.
//!
//! Content documents serialize with the platform's field names (`_status`,
//! `_createdAt`, `__typename`) so records can be handed to the model store
//! as-is.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// Externally assigned identity of a content record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecordId(pub String);

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for RecordId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for RecordId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Identifier of the organizational account (team) a request is scoped to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TeamId(pub String);

impl fmt::Display for TeamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for TeamId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for TeamId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Identifier of a deployed site.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SiteId(pub String);

impl fmt::Display for SiteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for SiteId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for SiteId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Publication state of a content record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PublishStatus {
    #[default]
    Draft,
    Published,
}

impl fmt::Display for PublishStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PublishStatus::Draft => write!(f, "draft"),
            PublishStatus::Published => write!(f, "published"),
        }
    }
}

// ---------------------------------------------------------------------------
// Content documents
// ---------------------------------------------------------------------------

/// A record type the model store keeps under a model name, keyed by id.
pub trait Document: Serialize {
    /// Model name, without the connector's type prefix.
    const MODEL: &'static str;

    fn id(&self) -> &RecordId;
}

/// Weak reference from a `User` to a `Post`. The target may not exist yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostRef {
    pub id: RecordId,
    #[serde(rename = "__typename")]
    pub typename: String,
}

impl PostRef {
    pub fn new(id: impl Into<RecordId>) -> Self {
        Self {
            id: id.into(),
            typename: Post::MODEL.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: RecordId,
    pub name: String,
    #[serde(default)]
    pub posts: Vec<PostRef>,
    #[serde(rename = "_status")]
    pub status: PublishStatus,
    #[serde(rename = "_createdAt")]
    pub created_at: DateTime<Utc>,
}

impl Document for User {
    const MODEL: &'static str = "User";

    fn id(&self) -> &RecordId {
        &self.id
    }
}

/// Embedded section of a `Post`. No identity of its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Block {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: RecordId,
    pub title: String,
    pub blocks: Vec<Block>,
    #[serde(rename = "_status")]
    pub status: PublishStatus,
    #[serde(rename = "_createdAt")]
    pub created_at: DateTime<Utc>,
}

impl Document for Post {
    const MODEL: &'static str = "Post";

    fn id(&self) -> &RecordId {
        &self.id
    }
}

// ---------------------------------------------------------------------------
// Platform records
// ---------------------------------------------------------------------------

/// Raw team configuration as persisted by the platform. `config` is opaque
/// here; [`crate::settings::TeamSettings`] gives it a shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamConfiguration {
    pub team_id: TeamId,
    pub config: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Scope marker for a variable value that applies to every deploy context.
pub const CONTEXT_ALL: &str = "all";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvVarValue {
    pub context: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentVariable {
    pub key: String,
    #[serde(default)]
    pub values: Vec<EnvVarValue>,
}

impl EnvironmentVariable {
    /// The value entry for `context`, if one is set.
    pub fn value_for(&self, context: &str) -> Option<&EnvVarValue> {
        self.values.iter().find(|v| v.context == context)
    }
}

// ---------------------------------------------------------------------------
// Request context
// ---------------------------------------------------------------------------

/// Caller-supplied team/site scope of a request. Empty strings count as absent.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_id: Option<TeamId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site_id: Option<SiteId>,
}

impl RequestContext {
    pub fn new(team_id: Option<TeamId>, site_id: Option<SiteId>) -> Self {
        Self { team_id, site_id }
    }

    pub fn team(&self) -> Option<&TeamId> {
        self.team_id.as_ref().filter(|t| !t.0.is_empty())
    }

    pub fn site(&self) -> Option<&SiteId> {
        self.site_id.as_ref().filter(|s| !s.0.is_empty())
    }

    /// Both identifiers, or `None` when either is missing.
    pub fn team_and_site(&self) -> Option<(&TeamId, &SiteId)> {
        Some((self.team()?, self.site()?))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn newtype_display() {
        assert_eq!(RecordId::from("1").to_string(), "1");
        assert_eq!(TeamId::from("team-a").to_string(), "team-a");
        assert_eq!(SiteId::from("site-a").to_string(), "site-a");
    }

    #[test]
    fn user_serializes_with_platform_field_names() {
        let user = User {
            id: RecordId::from("1"),
            name: "Annie".into(),
            posts: vec![PostRef::new("1")],
            status: PublishStatus::Published,
            created_at: Utc::now(),
        };
        let value = serde_json::to_value(&user).expect("serialize");
        assert_eq!(value["_status"], "published");
        assert!(value.get("_createdAt").is_some());
        assert_eq!(value["posts"][0]["__typename"], "Post");
        assert_eq!(value["posts"][0]["id"], "1");
    }

    #[test]
    fn block_omits_absent_fields() {
        let value = serde_json::to_value(Block {
            title: Some("t".into()),
            content: None,
        })
        .expect("serialize");
        assert_eq!(value, serde_json::json!({ "title": "t" }));
    }

    #[test]
    fn empty_identifiers_count_as_missing() {
        let ctx = RequestContext::new(Some(TeamId::from("")), Some(SiteId::from("s")));
        assert!(ctx.team().is_none());
        assert!(ctx.team_and_site().is_none());

        let ctx = RequestContext::new(Some(TeamId::from("t")), Some(SiteId::from("s")));
        let (team, site) = ctx.team_and_site().expect("both present");
        assert_eq!(team.0, "t");
        assert_eq!(site.0, "s");
    }

    #[test]
    fn value_for_matches_context_exactly() {
        let var = EnvironmentVariable {
            key: "K".into(),
            values: vec![EnvVarValue {
                context: "production".into(),
                value: "true".into(),
            }],
        };
        assert!(var.value_for(CONTEXT_ALL).is_none());
        assert!(var.value_for("production").is_some());
    }
}
