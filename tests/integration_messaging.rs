#![allow(clippy::unwrap_used, clippy::panic, clippy::missing_panics_doc, unreachable_pub)]
mod common;

use common::{ADMIN, FREELANCER, OTHER_FREELANCER, RECRUITER, TestApp};
use reqwest::StatusCode;
use serde_json::{Value, json};

#[tokio::test]
async fn test_start_conversation_then_reuse_it() {
    let app = TestApp::spawn().await;

    let resp = app
        .post(FREELANCER, "/conversations", &json!({ "otherUserId": RECRUITER, "initialMessage": "Hi Rita" }))
        .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let first: Value = resp.json().await.unwrap();
    assert_eq!(first["created"], true);
    assert_eq!(first["message"]["content"], "Hi Rita");
    assert_eq!(first["message"]["senderId"], FREELANCER);

    // Reversed pair resolves to the same conversation and stores nothing new.
    let resp = app
        .post(RECRUITER, "/conversations", &json!({ "otherUserId": FREELANCER, "initialMessage": "Hello back" }))
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let second: Value = resp.json().await.unwrap();
    assert_eq!(second["created"], false);
    assert!(second.get("message").is_none());
    assert_eq!(second["conversation"]["id"], first["conversation"]["id"]);

    let conversation_id = first["conversation"]["id"].as_i64().unwrap();
    assert_eq!(app.store.message_count(conversation_id).await, 1);
}

#[tokio::test]
async fn test_unread_counts_follow_sends_and_reads() {
    let app = TestApp::spawn().await;
    let conversation_id = app.start_conversation(FREELANCER, RECRUITER, "First").await;

    for text in ["Second", "Third"] {
        assert_eq!(app.send_message(conversation_id, FREELANCER, text).await.status(), StatusCode::CREATED);
    }

    assert_eq!(app.count(RECRUITER, "/messages/unread-count").await, 3);
    assert_eq!(app.count(FREELANCER, "/messages/unread-count").await, 0);

    // Fetching the thread is what marks it read.
    let resp = app.get(RECRUITER, &format!("/conversations/{conversation_id}/messages")).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let messages: Vec<Value> = resp.json().await.unwrap();
    let contents: Vec<_> = messages.iter().map(|m| m["content"].as_str().unwrap()).collect();
    assert_eq!(contents, ["First", "Second", "Third"]);

    assert_eq!(app.count(RECRUITER, "/messages/unread-count").await, 0);
    let counts = app.category_counts(RECRUITER).await;
    assert_eq!(counts["messages"], 0);
}

#[tokio::test]
async fn test_conversation_list_has_preview_and_unread() {
    let app = TestApp::spawn().await;
    let with_rita = app.start_conversation(FREELANCER, RECRUITER, "Older thread").await;
    let with_fay = app.start_conversation(OTHER_FREELANCER, FREELANCER, "Newer thread").await;

    let resp = app.get(FREELANCER, "/conversations").await;
    assert_eq!(resp.status(), StatusCode::OK);
    let summaries: Vec<Value> = resp.json().await.unwrap();
    assert_eq!(summaries.len(), 2);

    assert_eq!(summaries[0]["id"], with_fay);
    assert_eq!(summaries[0]["otherUserId"], OTHER_FREELANCER);
    assert_eq!(summaries[0]["unreadCount"], 1);
    assert_eq!(summaries[0]["lastMessagePreview"], "Newer thread");

    assert_eq!(summaries[1]["id"], with_rita);
    assert_eq!(summaries[1]["unreadCount"], 0);
}

#[tokio::test]
async fn test_outsiders_cannot_read_or_write() {
    let app = TestApp::spawn().await;
    let conversation_id = app.start_conversation(FREELANCER, RECRUITER, "Private").await;

    let resp = app.get(OTHER_FREELANCER, &format!("/conversations/{conversation_id}/messages")).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let resp = app.send_message(conversation_id, OTHER_FREELANCER, "Let me in").await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    // Unknown conversations look the same as foreign ones.
    let resp = app.get(OTHER_FREELANCER, "/conversations/99999/messages").await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_sender_must_match_caller() {
    let app = TestApp::spawn().await;
    let conversation_id = app.start_conversation(FREELANCER, RECRUITER, "Hi").await;

    let resp = app
        .post(
            FREELANCER,
            "/messages",
            &json!({ "conversationId": conversation_id, "senderId": RECRUITER, "content": "Spoofed" }),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    assert_eq!(app.store.message_count(conversation_id).await, 1);
}

#[tokio::test]
async fn test_invalid_targets_and_content() {
    let app = TestApp::spawn().await;

    let resp =
        app.post(FREELANCER, "/conversations", &json!({ "otherUserId": FREELANCER, "initialMessage": "Me" })).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = app.post(FREELANCER, "/conversations", &json!({ "otherUserId": 4242, "initialMessage": "Hi" })).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp =
        app.post(FREELANCER, "/conversations", &json!({ "otherUserId": RECRUITER, "initialMessage": "   " })).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let too_long = "x".repeat(app.config.messaging.max_content_length + 1);
    let resp =
        app.post(FREELANCER, "/conversations", &json!({ "otherUserId": RECRUITER, "initialMessage": too_long })).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(app.store.conversation_count().await, 0);
}

#[tokio::test]
async fn test_deleted_recipient_is_gone() {
    let app = TestApp::spawn().await;
    let conversation_id = app.start_conversation(FREELANCER, RECRUITER, "Before").await;
    app.store.soft_delete_user(RECRUITER).await;

    let resp = app.send_message(conversation_id, FREELANCER, "After").await;
    assert_eq!(resp.status(), StatusCode::GONE);
    assert_eq!(app.store.message_count(conversation_id).await, 1);

    let resp = app
        .post(OTHER_FREELANCER, "/conversations", &json!({ "otherUserId": RECRUITER, "initialMessage": "Hello?" }))
        .await;
    assert_eq!(resp.status(), StatusCode::GONE);

    // History stays readable with the other side flagged.
    let summaries: Vec<Value> = app.get(FREELANCER, "/conversations").await.json().await.unwrap();
    assert_eq!(summaries[0]["otherDeleted"], true);
}

#[tokio::test]
async fn test_concurrent_starts_yield_one_conversation() {
    let app = TestApp::spawn().await;

    let attempts = (0..10).map(|i| {
        let (from, to) = if i % 2 == 0 { (FREELANCER, RECRUITER) } else { (RECRUITER, FREELANCER) };
        let app = &app;
        async move {
            let resp = app
                .post(from, "/conversations", &json!({ "otherUserId": to, "initialMessage": format!("attempt {i}") }))
                .await;
            assert!(resp.status().is_success());
            resp.json::<Value>().await.unwrap()
        }
    });
    let results = futures::future::join_all(attempts).await;

    let created = results.iter().filter(|r| r["created"] == true).count();
    assert_eq!(created, 1);

    let id = &results[0]["conversation"]["id"];
    assert!(results.iter().all(|r| &r["conversation"]["id"] == id));
    assert_eq!(app.store.conversation_count().await, 1);
    assert_eq!(app.store.message_count(id.as_i64().unwrap()).await, 1);
}

#[tokio::test]
async fn test_delete_message_is_sender_only() {
    let app = TestApp::spawn().await;
    let resp = app
        .post(FREELANCER, "/conversations", &json!({ "otherUserId": RECRUITER, "initialMessage": "Oops" }))
        .await;
    let body: Value = resp.json().await.unwrap();
    let message_id = body["message"]["id"].as_i64().unwrap();
    let conversation_id = body["conversation"]["id"].as_i64().unwrap();

    assert_eq!(app.delete(RECRUITER, &format!("/messages/{message_id}")).await.status(), StatusCode::FORBIDDEN);
    assert_eq!(app.delete(FREELANCER, &format!("/messages/{message_id}")).await.status(), StatusCode::NO_CONTENT);
    assert_eq!(app.store.message_count(conversation_id).await, 0);
    assert_eq!(app.count(RECRUITER, "/messages/unread-count").await, 0);
}

#[tokio::test]
async fn test_system_messages_are_admin_only_and_unread_for_nobody() {
    let app = TestApp::spawn().await;
    let conversation_id = app.start_conversation(FREELANCER, RECRUITER, "Hi").await;
    let path = format!("/conversations/{conversation_id}/system-messages");

    let resp = app.post(FREELANCER, &path, &json!({ "content": "I am the system" })).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let resp = app.post(ADMIN, &path, &json!({ "content": "This job was closed" })).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let message: Value = resp.json().await.unwrap();
    assert_eq!(message["isSystemMessage"], true);
    assert!(message["senderId"].is_null());

    assert_eq!(app.count(RECRUITER, "/messages/unread-count").await, 1);
    assert_eq!(app.count(FREELANCER, "/messages/unread-count").await, 0);

    let resp = app.post(ADMIN, "/conversations/99999/system-messages", &json!({ "content": "x" })).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_requests_without_valid_token_are_rejected() {
    let app = TestApp::spawn().await;

    let resp = app.client.get(app.url("/conversations")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = app.client.get(app.url("/conversations")).bearer_auth("not-a-jwt").send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = app.get(FREELANCER, "/conversations").await;
    assert!(resp.headers().contains_key("x-request-id"));
}
