//! Integration tests for the crawler
//!
//! These tests use wiremock to stand in for the XRPC service and run
//! the full login → crawl → Parquet cycle end-to-end.

use follower_tracker::config::Config;
use follower_tracker::crawler::run_crawl;
use follower_tracker::storage::{ParquetStore, TableStore};
use follower_tracker::BlueskyClient;
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ROOT: &str = "root.bsky.social";

/// Creates a test configuration pointing at the mock server and a scratch directory
fn create_test_config(service_url: &str, dir: &TempDir) -> Config {
    let mut config = Config::default();
    config.account.root_handle = ROOT.to_string();
    config.account.service_url = service_url.to_string();
    config.crawler.page_size = 2;
    config.crawler.rate_limit_delay = 0;
    config.crawler.exemptions = ["ap.brid.gy".to_string()].into_iter().collect();
    config.output.master_path = dir.path().join("master.parquet").display().to_string();
    config.output.log_path = dir.path().join("followers_log.parquet").display().to_string();
    config
}

async fn mount_session(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/xrpc/com.atproto.server.createSession"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "accessJwt": "jwt-1",
            "refreshJwt": "jwt-r",
            "handle": ROOT,
            "did": "did:plc:root"
        })))
        .mount(server)
        .await;
}

async fn mount_profile(server: &MockServer, handle: &str, followers: u64) {
    Mock::given(method("GET"))
        .and(path("/xrpc/app.bsky.actor.getProfile"))
        .and(query_param("actor", handle))
        .and(header("authorization", "Bearer jwt-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "did": format!("did:plc:{}", handle.split('.').next().unwrap()),
            "handle": handle,
            "displayName": handle.to_uppercase(),
            "description": "hello",
            "followersCount": followers,
            "createdAt": "2023-07-01T10:00:00.000Z"
        })))
        .mount(server)
        .await;
}

/// Mounts the follower list: two pages, the second without a cursor
async fn mount_followers(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/xrpc/app.bsky.graph.getFollowers"))
        .and(query_param("actor", ROOT))
        .and(query_param("cursor", "next"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "subject": {"did": "did:plc:root", "handle": ROOT},
            "followers": [
                {"did": "did:plc:bridge", "handle": "ap.brid.gy"},
                {"did": "did:plc:gone", "handle": "gone.bsky.social"}
            ]
        })))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/xrpc/app.bsky.graph.getFollowers"))
        .and(query_param("actor", ROOT))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "subject": {"did": "did:plc:root", "handle": ROOT},
            "followers": [
                {"did": "did:plc:alice", "handle": "alice.bsky.social"},
                {"did": "did:plc:bob", "handle": "bob.bsky.social"}
            ],
            "cursor": "next"
        })))
        .mount(server)
        .await;
}

async fn setup_server() -> MockServer {
    let server = MockServer::start().await;
    mount_session(&server).await;
    mount_profile(&server, ROOT, 300).await;
    mount_profile(&server, "alice.bsky.social", 40).await;
    mount_profile(&server, "bob.bsky.social", 7).await;

    // The bridge account must never be fetched
    Mock::given(method("GET"))
        .and(path("/xrpc/app.bsky.actor.getProfile"))
        .and(query_param("actor", "ap.brid.gy"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/xrpc/app.bsky.actor.getProfile"))
        .and(query_param("actor", "gone.bsky.social"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "InvalidRequest",
            "message": "Profile not found"
        })))
        .mount(&server)
        .await;

    mount_followers(&server).await;
    server
}

async fn logged_in_client(server: &MockServer) -> BlueskyClient {
    let client = BlueskyClient::new(&server.uri()).expect("Failed to build client");
    client.login(ROOT, "app-password").await.expect("Login failed");
    client
}

#[tokio::test]
async fn test_full_crawl_writes_both_tables() {
    let server = setup_server().await;
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server.uri(), &dir);

    let client = logged_in_client(&server).await;
    let report = run_crawl(config.clone(), client)
        .await
        .expect("Crawl failed");

    assert!(report.root_merged);
    assert_eq!(report.followers_listed, 4);
    assert_eq!(report.exempted, 1);
    assert_eq!(report.fetch_failures, 1);
    assert_eq!(report.merged, 2);

    let store = ParquetStore::from_config(&config.output);
    let master = store.load_master().unwrap();
    assert_eq!(master.len(), 3);

    let alice = master.get("alice.bsky.social").expect("alice missing");
    assert_eq!(alice.display_name, "ALICE.BSKY.SOCIAL");
    assert_eq!(alice.description, "hello");
    assert_eq!(alice.followers_count, 40);
    assert_eq!(alice.created_at.as_deref(), Some("2023-07-01T10:00:00.000Z"));

    let log = store.load_log().unwrap();
    let handles: Vec<&str> = log.entries().iter().map(|e| e.handle.as_str()).collect();
    assert_eq!(handles, vec![ROOT, "alice.bsky.social", "bob.bsky.social"]);
}

#[tokio::test]
async fn test_second_run_appends_to_log() {
    let server = setup_server().await;
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server.uri(), &dir);

    run_crawl(config.clone(), logged_in_client(&server).await)
        .await
        .expect("First crawl failed");
    let report = run_crawl(config.clone(), logged_in_client(&server).await)
        .await
        .expect("Second crawl failed");

    assert_eq!(report.master_rows, 3);
    assert_eq!(report.log_rows, 6);

    let store = ParquetStore::from_config(&config.output);
    let log = store.load_log().unwrap();
    let root_counts: Vec<u64> = log
        .entries()
        .iter()
        .filter(|e| e.handle == ROOT)
        .map(|e| e.followers_count)
        .collect();
    assert_eq!(root_counts, vec![300, 300]);
}

#[tokio::test]
async fn test_existing_master_rows_are_kept() {
    let server = setup_server().await;
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server.uri(), &dir);

    // A handle that no longer follows the root stays in the master table
    let store = ParquetStore::from_config(&config.output);
    let mut master = follower_tracker::MasterTable::new();
    master.upsert(follower_tracker::ProfileRecord {
        handle: "former.bsky.social".to_string(),
        display_name: "Former".to_string(),
        description: String::new(),
        followers_count: 1,
        created_at: None,
        observed_at: chrono::Utc::now(),
    });
    store.save_master(&master).unwrap();

    let report = run_crawl(config, logged_in_client(&server).await)
        .await
        .expect("Crawl failed");

    assert_eq!(report.master_rows, 4);
    assert_eq!(report.log_rows, 3);
    assert!(store.load_master().unwrap().contains("former.bsky.social"));
}

#[tokio::test]
async fn test_crawl_survives_access_token_expiry() {
    let server = MockServer::start().await;
    mount_session(&server).await;

    // the token from login is already expired for every query
    Mock::given(method("GET"))
        .and(header("authorization", "Bearer jwt-1"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "ExpiredToken",
            "message": "Token has expired"
        })))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/xrpc/com.atproto.server.refreshSession"))
        .and(header("authorization", "Bearer jwt-r"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "accessJwt": "jwt-2",
            "refreshJwt": "jwt-r2",
            "handle": ROOT,
            "did": "did:plc:root"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let followers: Vec<String> = (1..=5).map(|i| format!("f{}.bsky.social", i)).collect();
    for (i, handle) in std::iter::once(ROOT.to_string())
        .chain(followers.iter().cloned())
        .enumerate()
    {
        Mock::given(method("GET"))
            .and(path("/xrpc/app.bsky.actor.getProfile"))
            .and(query_param("actor", handle.as_str()))
            .and(header("authorization", "Bearer jwt-2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "did": format!("did:plc:{}", i),
                "handle": handle,
                "followersCount": i
            })))
            .mount(&server)
            .await;
    }

    Mock::given(method("GET"))
        .and(path("/xrpc/app.bsky.graph.getFollowers"))
        .and(header("authorization", "Bearer jwt-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "subject": {"did": "did:plc:root", "handle": ROOT},
            "followers": followers
                .iter()
                .map(|h| json!({"did": format!("did:plc:{}", h), "handle": h}))
                .collect::<Vec<_>>()
        })))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(&server.uri(), &dir);
    config.crawler.page_size = 50;

    let report = run_crawl(config, logged_in_client(&server).await)
        .await
        .expect("Crawl failed");

    assert!(report.root_merged);
    assert_eq!(report.followers_listed, 5);
    assert_eq!(report.fetch_failures, 0);
    assert_eq!(report.merged, 5);
    assert_eq!(report.log_rows, 6);
}
