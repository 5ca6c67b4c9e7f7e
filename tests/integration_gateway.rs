#![allow(clippy::unwrap_used, clippy::panic, clippy::missing_panics_doc, unreachable_pub)]
mod common;

use common::{ADMIN, FREELANCER, OTHER_FREELANCER, RECRUITER, TestApp};
use serde_json::json;
use std::time::Duration;

const WAIT: Duration = Duration::from_secs(5);
const POLICY_VIOLATION: u16 = 1008;

#[tokio::test]
async fn test_new_message_reaches_both_participants() {
    let app = TestApp::spawn().await;
    let mut finn = app.connect_ws(FREELANCER).await;
    let mut rita = app.connect_ws(RECRUITER).await;

    app.start_conversation(FREELANCER, RECRUITER, "Ping").await;

    assert!(finn.receive_event("new_message", WAIT).await.is_some());
    assert!(rita.receive_event("new_message", WAIT).await.is_some());
}

#[tokio::test]
async fn test_badge_counts_reach_every_tab_after_read() {
    let app = TestApp::spawn().await;
    let conversation_id = app.start_conversation(FREELANCER, RECRUITER, "Unread for Rita").await;

    let mut first_tab = app.connect_ws(RECRUITER).await;
    let mut second_tab = app.connect_ws(RECRUITER).await;
    app.wait_for_connections(RECRUITER, 2).await;

    let resp = app.get(RECRUITER, &format!("/conversations/{conversation_id}/messages")).await;
    assert!(resp.status().is_success());

    for tab in [&mut first_tab, &mut second_tab] {
        let frame = tab.wait_for_badge("messages", 0, WAIT).await.expect("badge frame");
        assert!(frame["counts"].get("ratings").is_none());
    }
}

#[tokio::test]
async fn test_notification_push_then_counts() {
    let app = TestApp::spawn().await;
    let mut finn = app.connect_ws(FREELANCER).await;

    let resp = app
        .post(
            ADMIN,
            "/notifications",
            &json!({ "userId": FREELANCER, "type": "system", "title": "Heads up", "message": "x" }),
        )
        .await;
    assert!(resp.status().is_success());

    assert!(finn.receive_event("new_notification", WAIT).await.is_some());
    let frame = finn.receive_event("badge_counts_update", WAIT).await.expect("badge frame");
    assert_eq!(frame["counts"]["notifications"], 1);
}

#[tokio::test]
async fn test_mark_all_read_refreshes_every_tab() {
    let app = TestApp::spawn().await;
    for title in ["First", "Second"] {
        let resp = app
            .post(ADMIN, "/notifications", &json!({ "userId": FREELANCER, "type": "system", "title": title, "message": "x" }))
            .await;
        assert!(resp.status().is_success());
    }

    let mut first_tab = app.connect_ws(FREELANCER).await;
    let mut second_tab = app.connect_ws(FREELANCER).await;
    app.wait_for_connections(FREELANCER, 2).await;

    let resp = app.patch(FREELANCER, "/notifications/mark-all-read").await;
    assert!(resp.status().is_success());

    for tab in [&mut first_tab, &mut second_tab] {
        assert!(tab.wait_for_badge("notifications", 0, WAIT).await.is_some());
    }
}

#[tokio::test]
async fn test_closed_tab_is_unregistered() {
    let app = TestApp::spawn().await;
    let finn = app.connect_ws(FREELANCER).await;
    let _other = app.connect_ws(FREELANCER).await;
    app.wait_for_connections(FREELANCER, 2).await;

    finn.close().await;
    app.wait_for_connections(FREELANCER, 1).await;
}

#[tokio::test]
async fn test_malformed_first_frame_is_policy_violation() {
    let app = TestApp::spawn().await;
    let mut client = app.connect_ws_raw(FREELANCER).await;
    client.send_text("hello").await;

    assert_eq!(client.expect_close(WAIT).await, Some(POLICY_VIOLATION));
}

#[tokio::test]
async fn test_unknown_user_is_policy_violation() {
    let app = TestApp::spawn().await;
    let mut client = app.connect_ws_raw(4242).await;
    client.send_json(&json!({ "type": "authenticate", "userId": 4242 })).await;

    assert_eq!(client.expect_close(WAIT).await, Some(POLICY_VIOLATION));
    assert_eq!(app.registry.connection_count(4242), 0);
}

#[tokio::test]
async fn test_deleted_user_cannot_authenticate() {
    let app = TestApp::spawn().await;
    app.store.soft_delete_user(FREELANCER).await;

    let mut client = app.connect_ws_raw(FREELANCER).await;
    client.send_json(&json!({ "type": "authenticate", "userId": FREELANCER })).await;

    assert_eq!(client.expect_close(WAIT).await, Some(POLICY_VIOLATION));
}

#[tokio::test]
async fn test_silent_client_times_out() {
    let mut config = common::get_test_config();
    config.websocket.auth_timeout_secs = 1;
    let app = TestApp::spawn_with_config(config).await;

    let mut client = app.connect_ws_raw(FREELANCER).await;
    assert_eq!(client.expect_close(WAIT).await, Some(POLICY_VIOLATION));
}

#[tokio::test]
async fn test_missing_or_invalid_token_is_policy_violation() {
    let app = TestApp::spawn().await;

    for token in [None, Some("not-a-jwt")] {
        let mut client = app.connect_ws_with_token(token).await;
        assert_eq!(client.expect_close(WAIT).await, Some(POLICY_VIOLATION), "{token:?}");
    }
    assert_eq!(app.registry.connection_count(FREELANCER), 0);
}

#[tokio::test]
async fn test_cannot_subscribe_to_another_users_stream() {
    let app = TestApp::spawn().await;

    let mut intruder = app.connect_ws_raw(OTHER_FREELANCER).await;
    intruder.send_json(&json!({ "type": "authenticate", "userId": RECRUITER })).await;
    assert_eq!(intruder.expect_close(WAIT).await, Some(POLICY_VIOLATION));
    assert_eq!(app.registry.connection_count(RECRUITER), 0);

    let resp = app
        .post(ADMIN, "/notifications", &json!({ "userId": RECRUITER, "type": "system", "title": "Private", "message": "x" }))
        .await;
    assert!(resp.status().is_success());
    assert!(intruder.receive_event("new_notification", Duration::from_millis(300)).await.is_none());
}

#[tokio::test]
async fn test_unknown_frames_after_auth_are_ignored() {
    let app = TestApp::spawn().await;
    let mut finn = app.connect_ws(FREELANCER).await;

    finn.send_json(&json!({ "type": "subscribe", "topic": "everything" })).await;
    app.start_conversation(RECRUITER, FREELANCER, "Still here?").await;

    assert!(finn.receive_event("new_message", WAIT).await.is_some());
    assert_eq!(app.registry.connection_count(FREELANCER), 1);
}
