//! End-to-end tests for the personal-task service against an in-memory store.

use actix_http::Request;
use actix_web::body::BoxBody;
use actix_web::dev::{Service, ServiceResponse};
use actix_web::{test, web, App, Error};
use serde_json::{json, Value};

use planit_be::taskd::database::TaskDb;
use planit_be::taskd::handlers;

async fn task_service() -> impl Service<Request, Response = ServiceResponse<BoxBody>, Error = Error>
{
    let db = TaskDb::in_memory().await.expect("in-memory task db");
    test::init_service(
        App::new()
            .app_data(web::Data::new(db))
            .configure(handlers::task_config),
    )
    .await
}

async fn create_task(
    app: &impl Service<Request, Response = ServiceResponse<BoxBody>, Error = Error>,
    body: Value,
) -> (u16, Value) {
    let req = test::TestRequest::post()
        .uri("/tasks")
        .set_json(body)
        .to_request();
    let resp = test::call_service(app, req).await;
    let status = resp.status().as_u16();
    let json: Value = test::read_body_json(resp).await;
    (status, json)
}

#[actix_web::test]
async fn create_accepts_both_date_formats() {
    let app = task_service().await;

    let (status, iso) = create_task(
        &app,
        json!({"title": "Dentist", "date": "2024-03-05", "username": "alice"}),
    )
    .await;
    assert_eq!(status, 201);
    assert_eq!(iso["msg"], "Task added successfully");
    assert_eq!(iso["task"]["date"], "2024-03-05");

    let (status, us) = create_task(
        &app,
        json!({"title": "Dentist again", "date": "03/05/2024", "username": "alice"}),
    )
    .await;
    assert_eq!(status, 201);
    assert_eq!(us["task"]["date"], "2024-03-05");
}

#[actix_web::test]
async fn create_rejects_unparseable_date() {
    let app = task_service().await;

    let (status, body) = create_task(
        &app,
        json!({"title": "Dentist", "date": "5th of March", "username": "alice"}),
    )
    .await;
    assert_eq!(status, 400);
    assert_eq!(body["msg"], "Invalid date format. Use YYYY-MM-DD or MM/DD/YYYY");
}

#[actix_web::test]
async fn create_requires_a_title() {
    let app = task_service().await;

    let (status, body) = create_task(&app, json!({"date": "2024-03-05"})).await;
    assert_eq!(status, 400);
    assert_eq!(body["msg"], "Title is required");
}

#[actix_web::test]
async fn create_applies_placeholder_defaults() {
    let app = task_service().await;

    let (status, body) = create_task(&app, json!({"title": "Bare minimum"})).await;
    assert_eq!(status, 201);
    assert_eq!(body["task"]["task"], "No description provided");
    assert_eq!(body["task"]["priority"], false);
    assert_eq!(body["task"]["completed"], false);
    assert_eq!(body["task"]["username"], "default_user");
}

#[actix_web::test]
async fn list_filters_by_owner() {
    let app = task_service().await;

    create_task(&app, json!({"title": "Alice's", "username": "alice"})).await;
    create_task(&app, json!({"title": "Bob's", "username": "bob"})).await;

    let req = test::TestRequest::get()
        .uri("/tasks?username=alice")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 200);
    let tasks: Value = test::read_body_json(resp).await;
    let tasks = tasks.as_array().expect("list response");
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0]["title"], "Alice's");

    let req = test::TestRequest::get().uri("/tasks").to_request();
    let resp = test::call_service(&app, req).await;
    let all: Value = test::read_body_json(resp).await;
    assert_eq!(all.as_array().expect("list response").len(), 2);
}

#[actix_web::test]
async fn fetch_with_mismatched_owner_is_forbidden() {
    let app = task_service().await;

    let (_, created) = create_task(&app, json!({"title": "Private", "username": "alice"})).await;
    let id = created["task"]["id"].as_i64().unwrap();

    let req = test::TestRequest::get()
        .uri(&format!("/tasks/{}?username=bob", id))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 403);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["msg"], "Access denied");

    // The rightful owner still gets through.
    let req = test::TestRequest::get()
        .uri(&format!("/tasks/{}?username=alice", id))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 200);
}

#[actix_web::test]
async fn update_with_mismatched_owner_is_forbidden() {
    let app = task_service().await;

    let (_, created) = create_task(&app, json!({"title": "Private", "username": "alice"})).await;
    let id = created["task"]["id"].as_i64().unwrap();

    let req = test::TestRequest::put()
        .uri(&format!("/tasks/{}", id))
        .set_json(json!({"username": "bob", "completed": true}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 403);
}

#[actix_web::test]
async fn update_changes_only_supplied_fields() {
    let app = task_service().await;

    let (_, created) = create_task(
        &app,
        json!({"title": "Original", "task": "desc", "date": "2024-03-05", "username": "alice"}),
    )
    .await;
    let id = created["task"]["id"].as_i64().unwrap();

    let req = test::TestRequest::put()
        .uri(&format!("/tasks/{}", id))
        .set_json(json!({"username": "alice", "completed": true}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 200);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["msg"], "Task updated");
    assert_eq!(body["task"]["completed"], true);
    assert_eq!(body["task"]["title"], "Original");
    assert_eq!(body["task"]["date"], "2024-03-05");
}

#[actix_web::test]
async fn update_rejects_bad_date() {
    let app = task_service().await;

    let (_, created) = create_task(&app, json!({"title": "Dated", "username": "alice"})).await;
    let id = created["task"]["id"].as_i64().unwrap();

    let req = test::TestRequest::put()
        .uri(&format!("/tasks/{}", id))
        .set_json(json!({"username": "alice", "date": "not a date"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 400);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["msg"], "Invalid date format");
}

#[actix_web::test]
async fn delete_with_mismatched_owner_is_forbidden() {
    let app = task_service().await;

    let (_, created) = create_task(&app, json!({"title": "Private", "username": "alice"})).await;
    let id = created["task"]["id"].as_i64().unwrap();

    let req = test::TestRequest::delete()
        .uri(&format!("/tasks/{}?username=bob", id))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 403);
}

#[actix_web::test]
async fn delete_removes_the_task() {
    let app = task_service().await;

    let (_, created) = create_task(&app, json!({"title": "Doomed", "username": "alice"})).await;
    let id = created["task"]["id"].as_i64().unwrap();

    let req = test::TestRequest::delete()
        .uri(&format!("/tasks/{}?username=alice", id))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 200);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["msg"], "Task deleted");

    let req = test::TestRequest::get()
        .uri(&format!("/tasks/{}", id))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 404);
}

#[actix_web::test]
async fn missing_task_is_not_found() {
    let app = task_service().await;

    let req = test::TestRequest::get().uri("/tasks/999").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 404);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["msg"], "Task not found");
}
