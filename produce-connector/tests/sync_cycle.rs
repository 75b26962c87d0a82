//! Initial + incremental sync cycles against the file-backed store.

use chrono::{Duration, Utc};
use produce_connector::{sync, SyncMode};
use produce_core::{
    types::{Post, RecordId, User},
    LocalPlatform, ModelStore,
};
use tempfile::TempDir;

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[test]
fn initial_then_incremental_keeps_one_user_and_both_posts() {
    init_logger();
    let home = TempDir::new().expect("home");
    let store = LocalPlatform::at(home.path());

    let first = Utc::now();
    sync::run(&store, SyncMode::Initial, first).expect("initial sync");
    let second = first + Duration::seconds(60);
    sync::run(&store, SyncMode::Incremental, second).expect("incremental sync");

    let users = store.list("User").expect("list users");
    assert_eq!(users.len(), 1, "user 1 must be present exactly once");
    let user: User = serde_json::from_value(users[0].clone()).expect("decode user");
    assert_eq!(user.created_at, second, "latest write wins");
    assert_eq!(user.posts.len(), 1);
    assert_eq!(user.posts[0].id, RecordId::from("1"));

    let posts: Vec<Post> = store
        .list("Post")
        .expect("list posts")
        .into_iter()
        .map(|v| serde_json::from_value(v).expect("decode post"))
        .collect();
    let post_ids: Vec<&str> = posts.iter().map(|p| p.id.0.as_str()).collect();
    assert_eq!(post_ids, vec!["1", "2"], "incremental sync must not delete");
    assert_eq!(posts[0].title, "Hello World");
    assert_eq!(posts[1].blocks[0].content.as_deref(), Some("what up"));
}

#[test]
fn repeated_initial_sync_is_idempotent() {
    init_logger();
    let home = TempDir::new().expect("home");
    let store = LocalPlatform::at(home.path());
    let now = Utc::now();

    sync::run(&store, SyncMode::Initial, now).expect("first run");
    let snapshot = (store.list("User").unwrap(), store.list("Post").unwrap());
    sync::run(&store, SyncMode::Initial, now).expect("retry");

    assert_eq!(snapshot.0, store.list("User").unwrap());
    assert_eq!(snapshot.1, store.list("Post").unwrap());
}
