//! Sync routine.
//!
//! The host calls [`run`] once per sync cycle and may retry it. Every write is
//! an upsert by id, so repeating a run with the same mode converges on the
//! same records. The first failing upsert aborts the run; records written
//! before it stay written.

use chrono::{DateTime, Utc};
use serde::Serialize;

use produce_core::types::{Block, Document, Post, PostRef, PublishStatus, RecordId, User};
use produce_core::ModelStore;

use crate::error::ConnectorError;
use crate::model::check_document;

/// Whether the host is populating an empty store or refreshing an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncMode {
    Initial,
    Incremental,
}

impl From<bool> for SyncMode {
    fn from(is_initial_sync: bool) -> Self {
        if is_initial_sync {
            SyncMode::Initial
        } else {
            SyncMode::Incremental
        }
    }
}

/// One record written by a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Upserted {
    pub model: String,
    pub id: RecordId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub mode: SyncMode,
    /// In write order.
    pub upserted: Vec<Upserted>,
}

/// Run one sync cycle against `store`. `now` becomes `_createdAt` on every
/// record written.
pub fn run(
    store: &dyn ModelStore,
    mode: SyncMode,
    now: DateTime<Utc>,
) -> Result<SyncReport, ConnectorError> {
    let mut report = SyncReport {
        mode,
        upserted: Vec::new(),
    };

    // Both modes re-affirm the same user; only the post differs.
    upsert(store, &annie(now), &mut report)?;
    match mode {
        SyncMode::Initial => upsert(store, &hello_world(now), &mut report)?,
        SyncMode::Incremental => upsert(store, &lots_of_posts(now), &mut report)?,
    }

    tracing::info!(
        "sync ({:?}) upserted {} record(s)",
        mode,
        report.upserted.len()
    );
    Ok(report)
}

fn upsert<D: Document>(
    store: &dyn ModelStore,
    doc: &D,
    report: &mut SyncReport,
) -> Result<(), ConnectorError> {
    let id = doc.id();
    let record = serde_json::to_value(doc)?;
    check_document(D::MODEL, &id.0, &record)?;
    store.insert(D::MODEL, id, record)?;
    tracing::debug!("upserted {} {}", D::MODEL, id);
    report.upserted.push(Upserted {
        model: D::MODEL.to_string(),
        id: id.clone(),
    });
    Ok(())
}

// ---------------------------------------------------------------------------
// Source records
// ---------------------------------------------------------------------------

fn annie(now: DateTime<Utc>) -> User {
    User {
        id: RecordId::from("1"),
        name: "Annie".to_string(),
        posts: vec![PostRef::new("1")],
        status: PublishStatus::Published,
        created_at: now,
    }
}

fn hello_world(now: DateTime<Utc>) -> Post {
    Post {
        id: RecordId::from("1"),
        title: "Hello World".to_string(),
        blocks: vec![Block {
            title: Some("Example block title".to_string()),
            content: Some("You can create complex content models".to_string()),
        }],
        status: PublishStatus::Published,
        created_at: now,
    }
}

fn lots_of_posts(now: DateTime<Utc>) -> Post {
    Post {
        id: RecordId::from("2"),
        title: "Writing lots of posts these days".to_string(),
        blocks: vec![Block {
            title: Some("Page section".to_string()),
            content: Some("what up".to_string()),
        }],
        status: PublishStatus::Published,
        created_at: now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use produce_core::{MemoryPlatform, StoreError};

    fn ids(report: &SyncReport) -> Vec<(String, String)> {
        report
            .upserted
            .iter()
            .map(|u| (u.model.clone(), u.id.0.clone()))
            .collect()
    }

    #[test]
    fn mode_from_flag() {
        assert_eq!(SyncMode::from(true), SyncMode::Initial);
        assert_eq!(SyncMode::from(false), SyncMode::Incremental);
    }

    #[test]
    fn initial_sync_writes_user_then_post_1() {
        let store = MemoryPlatform::new();
        let report = run(&store, SyncMode::Initial, Utc::now()).expect("sync");
        assert_eq!(
            ids(&report),
            vec![("User".into(), "1".into()), ("Post".into(), "1".into())]
        );
    }

    #[test]
    fn incremental_sync_writes_user_then_post_2() {
        let store = MemoryPlatform::new();
        let report = run(&store, SyncMode::Incremental, Utc::now()).expect("sync");
        assert_eq!(
            ids(&report),
            vec![("User".into(), "1".into()), ("Post".into(), "2".into())]
        );
    }

    #[test]
    fn store_failure_aborts_run() {
        let store = MemoryPlatform::new();
        store.set_fail_writes(true);
        let err = run(&store, SyncMode::Initial, Utc::now()).unwrap_err();
        assert!(matches!(err, ConnectorError::Store(StoreError::Unavailable(_))));
    }
}
