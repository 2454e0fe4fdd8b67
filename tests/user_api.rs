//! End-to-end user API tests over a real listener.

use std::sync::Arc;

use reqwest::StatusCode;
use serde_json::Value;
use user_service::config::ServiceConfig;
use user_service::users::InMemoryUserRepository;
use user_service_sdk::UserClient;

mod common;

#[tokio::test]
async fn test_user_lifecycle_scenario() {
    let app = common::spawn_app(ServiceConfig::default(), Arc::new(InMemoryUserRepository::new())).await;
    let client = UserClient::with_client(common::http_client(), &app.url());

    let created = client.create_user("a@x.com").await.unwrap();
    assert_eq!(created.email, "a@x.com");
    assert_eq!(created.links["delete-user"].href, format!("/users/{}", created.id));

    let duplicate = client.create_user("a@x.com").await.unwrap_err();
    assert_eq!(duplicate.status(), Some(StatusCode::CONFLICT));

    let fetched = client.get_user_by_email("a@x.com").await.unwrap().unwrap();
    assert_eq!(fetched.id, created.id);
    assert!(fetched.links.contains_key("update-email"));

    let updated = client.update_user_email(created.id, "b@x.com").await.unwrap();
    assert_eq!(updated.email, "b@x.com");
    assert_eq!(updated.links["get-user"].href, "/users?email=b%40x.com");

    assert!(client.get_user_by_email("a@x.com").await.unwrap().is_none());

    client.delete_user(created.id).await.unwrap();
    client.delete_user(created.id).await.unwrap();
    assert!(client.get_user_by_email("b@x.com").await.unwrap().is_none());

    app.stop().await;
}

#[tokio::test]
async fn test_error_bodies() {
    let app = common::spawn_app(ServiceConfig::default(), Arc::new(InMemoryUserRepository::new())).await;
    let http = common::http_client();

    let res = http
        .put(format!("{}/users/42/email", app.url()))
        .json(&serde_json::json!({ "email": "c@x.com" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "not_found");
    assert_eq!(body["message"], "User not found with id: 42");

    let res = http
        .post(format!("{}/users", app.url()))
        .json(&serde_json::json!({ "email": "   " }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = http.get(format!("{}/health", app.url())).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert!(res.headers().contains_key("x-request-id"));

    app.stop().await;
}

#[tokio::test]
async fn test_update_to_taken_email_conflicts() {
    let app = common::spawn_app(ServiceConfig::default(), Arc::new(InMemoryUserRepository::new())).await;
    let client = UserClient::with_client(common::http_client(), &app.url());

    let a = client.create_user("a@x.com").await.unwrap();
    client.create_user("b@x.com").await.unwrap();

    let err = client.update_user_email(a.id, "b@x.com").await.unwrap_err();
    assert_eq!(err.status(), Some(StatusCode::CONFLICT));
    assert_eq!(client.update_user_email(a.id, "a@x.com").await.unwrap().id, a.id);

    app.stop().await;
}
