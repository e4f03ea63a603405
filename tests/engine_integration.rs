//! Engine integration tests against a live MongoDB
//!
//! Covers the behavior that only shows up with a real storage backend:
//! - toggle parity, sequential and under concurrent contention
//! - read-time counts matching the stored edges
//! - private-web visibility across viewers
//! - cascade completeness after content and account deletion
//! - facet pagination bounds
//! - anonymous viewer flag short-circuit
//!
//! Every test opens its own uniquely-named database and drops it at the
//! end, so runs never interfere. Run with:
//!
//!   MONGODB_URI=mongodb://localhost:27017 cargo test -- --ignored

use std::sync::Arc;

use bson::{doc, oid::ObjectId};

use weavery::config::EnginePolicy;
use weavery::content::{NewCollection, NewProfile, NewWeb};
use weavery::db::schemas::TargetRef;
use weavery::db::{Collections, MongoClient};
use weavery::engagement::ToggleOutcome;
use weavery::feed::{PageRequest, WebScope};
use weavery::services::{InMemoryMediaStore, RecordingMailer};
use weavery::Engine;

const VERIFY_URL: &str = "https://example.test/verify";

/// Helper to build an engine against a throwaway database
async fn test_engine(suffix: &str) -> (Engine, MongoClient, String) {
    let uri = std::env::var("MONGODB_URI")
        .unwrap_or_else(|_| "mongodb://localhost:27017".to_string());
    let db_name = format!("weavery_test_{}_{}", suffix, ObjectId::new().to_hex());

    let client = MongoClient::new(&uri, &db_name).await.unwrap();
    let collections = Collections::open(&client).await.unwrap();
    let engine = Engine::new(
        collections,
        Arc::new(InMemoryMediaStore::new()),
        Arc::new(RecordingMailer::new()),
        EnginePolicy::default(),
    );
    (engine, client, db_name)
}

async fn drop_db(client: &MongoClient, db_name: &str) {
    client.inner().database(db_name).drop().await.ok();
}

/// Register a profile and return its id
async fn register(engine: &Engine, username: &str) -> ObjectId {
    let profile = engine
        .profiles
        .register(
            NewProfile {
                username: username.to_string(),
                email: format!("{}@example.test", username),
                password: "correct-horse-battery".to_string(),
                full_name: "Test Maker".to_string(),
            },
            VERIFY_URL,
        )
        .await
        .unwrap();
    profile._id.unwrap()
}

/// Publish a web owned by `owner`
async fn publish_web(engine: &Engine, owner: ObjectId, title: &str, public: bool) -> ObjectId {
    let web = engine
        .webs
        .create(
            owner,
            NewWeb {
                title: title.to_string(),
                description: "integration fixture".to_string(),
                html: "<h1>hi</h1>".to_string(),
                css: "h1 { color: teal; }".to_string(),
                js: String::new(),
                is_public: public,
                css_links: Vec::new(),
                js_links: Vec::new(),
            },
            "previews/fixture.png",
        )
        .await
        .unwrap();
    web._id.unwrap()
}

// =============================================================================
// Toggle Parity
// =============================================================================

#[tokio::test]
#[ignore] // Requires a running MongoDB (MONGODB_URI)
async fn test_toggle_reaction_parity_sequential() {
    let (engine, client, db) = test_engine("parity").await;

    let owner = register(&engine, "maker-owner").await;
    let liker = register(&engine, "maker-liker").await;
    let web = publish_web(&engine, owner, "Parity", true).await;
    let target = TargetRef::web(web);

    // Odd number of toggles leaves the edge in place
    assert_eq!(
        engine.toggles.toggle_reaction(liker, target).await.unwrap(),
        ToggleOutcome::Added
    );
    assert_eq!(
        engine.toggles.toggle_reaction(liker, target).await.unwrap(),
        ToggleOutcome::Removed
    );
    assert_eq!(
        engine.toggles.toggle_reaction(liker, target).await.unwrap(),
        ToggleOutcome::Added
    );

    let edges = engine
        .db
        .reactions
        .count(doc! { "target.id": web, "reacted_by": liker })
        .await
        .unwrap();
    assert_eq!(edges, 1);

    // Fourth toggle drains it again
    engine.toggles.toggle_reaction(liker, target).await.unwrap();
    let edges = engine
        .db
        .reactions
        .count(doc! { "target.id": web, "reacted_by": liker })
        .await
        .unwrap();
    assert_eq!(edges, 0);

    drop_db(&client, &db).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore] // Requires a running MongoDB (MONGODB_URI)
async fn test_toggle_reaction_concurrent_settles_to_single_edge() {
    let (engine, client, db) = test_engine("contention").await;

    let owner = register(&engine, "maker-owner").await;
    let liker = register(&engine, "maker-liker").await;
    let web = publish_web(&engine, owner, "Contention", true).await;
    let target = TargetRef::web(web);

    // Same (actor, target) pair hammered from eight tasks. Every call must
    // settle to a definite outcome; the unique edge index keeps the final
    // state at zero or one edge no matter how the races interleave.
    let engine = Arc::new(engine);
    let mut handles = Vec::new();
    for _ in 0..8 {
        let engine = Arc::clone(&engine);
        handles.push(tokio::spawn(async move {
            engine.toggles.toggle_reaction(liker, target).await
        }));
    }

    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let edges = engine
        .db
        .reactions
        .count(doc! { "target.id": web, "reacted_by": liker })
        .await
        .unwrap();
    assert!(edges <= 1, "unique index must cap the edge count, got {}", edges);

    drop_db(&client, &db).await;
}

#[tokio::test]
#[ignore] // Requires a running MongoDB (MONGODB_URI)
async fn test_toggle_follow_rejects_self() {
    let (engine, client, db) = test_engine("selffollow").await;

    let maker = register(&engine, "maker-solo").await;
    let err = engine.toggles.toggle_follow(maker, maker).await.unwrap_err();
    assert!(err.to_string().contains("own profile"));

    drop_db(&client, &db).await;
}

// =============================================================================
// Count Correctness
// =============================================================================

#[tokio::test]
#[ignore] // Requires a running MongoDB (MONGODB_URI)
async fn test_feed_counts_match_stored_edges() {
    let (engine, client, db) = test_engine("counts").await;

    let owner = register(&engine, "maker-owner").await;
    let web = publish_web(&engine, owner, "Counted", true).await;

    let mut likers = Vec::new();
    for i in 0..3 {
        likers.push(register(&engine, &format!("maker-fan-{}", i)).await);
    }
    for liker in &likers {
        engine
            .toggles
            .toggle_reaction(*liker, TargetRef::web(web))
            .await
            .unwrap();
    }

    let first = engine
        .comments
        .create_comment(likers[0], web, "nice gradient")
        .await
        .unwrap();
    engine
        .comments
        .create_comment(likers[1], web, "how did you do the blur?")
        .await
        .unwrap();
    engine
        .comments
        .create_reply(owner, first._id.unwrap(), "backdrop-filter")
        .await
        .unwrap();

    let item = engine.feeds.webs.by_id(web, Some(likers[0])).await.unwrap();
    assert_eq!(item.likes_count, 3);
    assert_eq!(item.comments_count, 2);
    assert!(item.is_liked_by_me);

    // A non-liker sees the same counts with the flag down
    let item = engine.feeds.webs.by_id(web, Some(owner)).await.unwrap();
    assert_eq!(item.likes_count, 3);
    assert!(!item.is_liked_by_me);

    drop_db(&client, &db).await;
}

// =============================================================================
// Visibility
// =============================================================================

#[tokio::test]
#[ignore] // Requires a running MongoDB (MONGODB_URI)
async fn test_private_webs_hidden_from_other_viewers() {
    let (engine, client, db) = test_engine("visibility").await;

    let owner = register(&engine, "maker-owner").await;
    let stranger = register(&engine, "maker-stranger").await;
    publish_web(&engine, owner, "Public piece", true).await;
    publish_web(&engine, owner, "Private draft", false).await;

    let request = PageRequest::first(10);

    // Owner sees the private scope
    let own = engine
        .feeds
        .webs
        .by_owner(owner, WebScope::Private, Some(owner), None, request)
        .await
        .unwrap();
    assert_eq!(own.total_items, 1);
    assert_eq!(own.items[0].title, "Private draft");

    // Anyone else asking for it gets an empty page, not an error
    let spied = engine
        .feeds
        .webs
        .by_owner(owner, WebScope::Private, Some(stranger), None, request)
        .await
        .unwrap();
    assert!(spied.is_empty());

    let anon = engine
        .feeds
        .webs
        .by_owner(owner, WebScope::Private, None, None, request)
        .await
        .unwrap();
    assert!(anon.is_empty());

    // The public scope never leaks the draft
    let public = engine
        .feeds
        .webs
        .by_owner(owner, WebScope::Public, Some(stranger), None, request)
        .await
        .unwrap();
    assert_eq!(public.total_items, 1);
    assert_eq!(public.items[0].title, "Public piece");

    drop_db(&client, &db).await;
}

// =============================================================================
// Cascade Completeness
// =============================================================================

#[tokio::test]
#[ignore] // Requires a running MongoDB (MONGODB_URI)
async fn test_delete_web_removes_every_dependent() {
    let (engine, client, db) = test_engine("cascade").await;

    let owner = register(&engine, "maker-owner").await;
    let fan = register(&engine, "maker-fan").await;
    let web = publish_web(&engine, owner, "Doomed", true).await;

    // Hang the full dependent tree off the web
    let comment = engine
        .comments
        .create_comment(fan, web, "saving this before it goes")
        .await
        .unwrap();
    let reply = engine
        .comments
        .create_reply(owner, comment._id.unwrap(), "too late")
        .await
        .unwrap();
    engine
        .toggles
        .toggle_reaction(fan, TargetRef::web(web))
        .await
        .unwrap();
    engine
        .toggles
        .toggle_reaction(owner, TargetRef::comment(comment._id.unwrap()))
        .await
        .unwrap();
    engine
        .toggles
        .toggle_reaction(fan, TargetRef::reply(reply._id.unwrap()))
        .await
        .unwrap();

    let shelf = engine
        .collections
        .create(
            fan,
            NewCollection {
                name: "favorites".to_string(),
                description: String::new(),
                is_public: true,
            },
        )
        .await
        .unwrap();
    engine
        .collections
        .add_web(fan, shelf._id.unwrap(), web)
        .await
        .unwrap();
    engine.profiles.pin_web(owner, web).await.unwrap();

    engine.delete_web(owner, web).await.unwrap();

    // Document and every dependent are gone
    assert_eq!(engine.db.webs.count(doc! { "_id": web }).await.unwrap(), 0);
    assert_eq!(engine.db.comments.count(doc! { "web": web }).await.unwrap(), 0);
    assert_eq!(
        engine
            .db
            .replies
            .count(doc! { "_id": reply._id.unwrap() })
            .await
            .unwrap(),
        0
    );
    assert_eq!(
        engine.db.reactions.count(doc! {}).await.unwrap(),
        0,
        "reactions on the web, its comments, and its replies must all go"
    );

    // Membership and pin references are pulled, their parents survive
    let shelf_after = engine
        .db
        .collections
        .find_one(doc! { "_id": shelf._id.unwrap() })
        .await
        .unwrap()
        .unwrap();
    assert!(shelf_after.webs.is_empty());

    let owner_after = engine
        .db
        .profiles
        .find_one(doc! { "_id": owner })
        .await
        .unwrap()
        .unwrap();
    assert!(owner_after.pinned.is_empty());

    drop_db(&client, &db).await;
}

#[tokio::test]
#[ignore] // Requires a running MongoDB (MONGODB_URI)
async fn test_delete_account_cascades_to_engagement() {
    let (engine, client, db) = test_engine("account").await;

    let leaver = register(&engine, "maker-leaver").await;
    let stayer = register(&engine, "maker-stayer").await;

    let gone_web = publish_web(&engine, leaver, "Leaving", true).await;
    let kept_web = publish_web(&engine, stayer, "Staying", true).await;

    // Edges in both directions
    engine.toggles.toggle_follow(stayer, leaver).await.unwrap();
    engine.toggles.toggle_follow(leaver, stayer).await.unwrap();
    engine
        .toggles
        .toggle_reaction(stayer, TargetRef::web(gone_web))
        .await
        .unwrap();
    engine
        .toggles
        .toggle_reaction(leaver, TargetRef::web(kept_web))
        .await
        .unwrap();
    engine
        .comments
        .create_comment(leaver, kept_web, "goodbye all")
        .await
        .unwrap();

    engine
        .delete_account(leaver, "correct-horse-battery")
        .await
        .unwrap();

    assert_eq!(
        engine.db.profiles.count(doc! { "_id": leaver }).await.unwrap(),
        0
    );
    assert_eq!(engine.db.webs.count(doc! { "owner": leaver }).await.unwrap(), 0);
    assert_eq!(engine.db.follows.count(doc! {}).await.unwrap(), 0);
    assert_eq!(
        engine.db.reactions.count(doc! {}).await.unwrap(),
        0,
        "likes by and on the departed profile must both go"
    );
    assert_eq!(
        engine
            .db
            .comments
            .count(doc! { "owner": leaver })
            .await
            .unwrap(),
        0,
        "comments left on other people's webs die with the author"
    );

    // The other profile and its content are untouched
    assert_eq!(
        engine.db.profiles.count(doc! { "_id": stayer }).await.unwrap(),
        1
    );
    assert_eq!(
        engine.db.webs.count(doc! { "_id": kept_web }).await.unwrap(),
        1
    );

    drop_db(&client, &db).await;
}

#[tokio::test]
#[ignore] // Requires a running MongoDB (MONGODB_URI)
async fn test_delete_account_requires_matching_password() {
    let (engine, client, db) = test_engine("badpass").await;

    let maker = register(&engine, "maker-careful").await;
    let err = engine
        .delete_account(maker, "not-the-password")
        .await
        .unwrap_err();
    assert!(err.to_string().contains("invalid credentials"));
    assert_eq!(
        engine.db.profiles.count(doc! { "_id": maker }).await.unwrap(),
        1
    );

    drop_db(&client, &db).await;
}

// =============================================================================
// Pagination Bounds
// =============================================================================

#[tokio::test]
#[ignore] // Requires a running MongoDB (MONGODB_URI)
async fn test_pagination_counts_and_past_end_pages() {
    let (engine, client, db) = test_engine("pages").await;

    let owner = register(&engine, "maker-prolific").await;
    for i in 0..5 {
        publish_web(&engine, owner, &format!("Piece {}", i), true).await;
    }

    let first = engine
        .feeds
        .webs
        .by_owner(
            owner,
            WebScope::Public,
            None,
            None,
            PageRequest::new(1, 3).unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(first.items.len(), 3);
    assert_eq!(first.total_items, 5);
    assert_eq!(first.total_pages, 2);

    let last = engine
        .feeds
        .webs
        .by_owner(
            owner,
            WebScope::Public,
            None,
            None,
            PageRequest::new(2, 3).unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(last.items.len(), 2);

    // Past the end is an empty page with the totals intact, not an error
    let past = engine
        .feeds
        .webs
        .by_owner(
            owner,
            WebScope::Public,
            None,
            None,
            PageRequest::new(42, 3).unwrap(),
        )
        .await
        .unwrap();
    assert!(past.items.is_empty());
    assert_eq!(past.total_items, 5);

    drop_db(&client, &db).await;
}

// =============================================================================
// Anonymous Viewer Short-Circuit
// =============================================================================

#[tokio::test]
#[ignore] // Requires a running MongoDB (MONGODB_URI)
async fn test_anonymous_viewer_gets_counts_without_flags() {
    let (engine, client, db) = test_engine("anon").await;

    let owner = register(&engine, "maker-owner").await;
    let fan = register(&engine, "maker-fan").await;
    let web = publish_web(&engine, owner, "Admired", true).await;
    engine
        .toggles
        .toggle_reaction(fan, TargetRef::web(web))
        .await
        .unwrap();

    let item = engine.feeds.webs.by_id(web, None).await.unwrap();
    assert_eq!(item.likes_count, 1);
    assert!(
        !item.is_liked_by_me,
        "no viewer means the flag is literally false, never a membership probe"
    );

    drop_db(&client, &db).await;
}

// =============================================================================
// Orphan Sweep
// =============================================================================

#[tokio::test]
#[ignore] // Requires a running MongoDB (MONGODB_URI)
async fn test_sweep_orphans_drops_dangling_edges() {
    let (engine, client, db) = test_engine("sweep").await;

    let owner = register(&engine, "maker-owner").await;
    let fan = register(&engine, "maker-fan").await;
    let web = publish_web(&engine, owner, "Orphaned", true).await;
    engine
        .toggles
        .toggle_reaction(fan, TargetRef::web(web))
        .await
        .unwrap();
    assert_eq!(engine.db.reactions.count(doc! {}).await.unwrap(), 1);

    // Rip the web out underneath the edge, bypassing the cascade
    engine.db.webs.delete_one(doc! { "_id": web }).await.unwrap();

    let removed = engine.sweep_orphans().await.unwrap();
    assert!(removed >= 1, "the dangling reaction must be swept, got {}", removed);
    assert_eq!(engine.db.reactions.count(doc! {}).await.unwrap(), 0);

    // A healthy edge survives the sweep
    let other = publish_web(&engine, owner, "Healthy", true).await;
    engine
        .toggles
        .toggle_reaction(fan, TargetRef::web(other))
        .await
        .unwrap();
    let removed = engine.sweep_orphans().await.unwrap();
    assert_eq!(removed, 0);
    assert_eq!(engine.db.reactions.count(doc! {}).await.unwrap(), 1);

    drop_db(&client, &db).await;
}
