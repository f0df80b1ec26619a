mod common;

use axum::http::StatusCode;
use common::{seed_words, send, setup_test_app, setup_test_db};
use crudscope::Principal;
use serde_json::json;

#[tokio::test]
async fn test_create_get_update_delete() {
    let db = setup_test_db().await.unwrap();
    let app = setup_test_app(db, Some(Principal::new("1")));

    let (status, created) = send(
        &app,
        "POST",
        "/api/v1/words",
        Some(json!({"word": "neko", "level": "N5", "created_at": "2024-01-01T00:00:00Z"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["user_id"], 1);
    let id = created["id"].as_i64().unwrap();

    let (status, row) = send(&app, "GET", &format!("/api/v1/words/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(row["word"], "neko");

    let (status, row) = send(
        &app,
        "PATCH",
        &format!("/api/v1/words/{id}"),
        Some(json!({"count": 2})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(row["count"], 2);

    let (status, body) = send(&app, "DELETE", &format!("/api/v1/words/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"ok": true, "deleted": 1}));

    let (status, body) = send(&app, "GET", &format!("/api/v1/words/{id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], format!("word with ID '{id}' not found"));
}

#[tokio::test]
async fn test_list_by_filter_shapes() {
    let db = setup_test_db().await.unwrap();
    seed_words(&db, 1, &[("neko", "N5"), ("inu", "N5"), ("uma", "N4")]).await;
    seed_words(&db, 2, &[("tori", "N5")]).await;
    let app = setup_test_app(db, Some(Principal::new("1")));

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/words/list/by_filter",
        Some(json!({"filter_values": {"level": "N5"}, "sort": "-word", "page": 1, "page_size": 10})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["meta"], json!({"page": 1, "page_size": 10, "total": 2, "pages": 1}));
    assert_eq!(body["items"][0]["word"], "neko");
    assert_eq!(body["items"][1]["word"], "inu");

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/words/list/by_filter",
        Some(json!({"search_dict": {"level__in": ["N4", "N5"]}, "sort_column": "word", "sort_order": "asc", "start": 0, "limit": 2})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["meta"]["total"], 3);
    assert_eq!(body["items"].as_array().unwrap().len(), 2);
    assert_eq!(body["items"][0]["word"], "inu");
}

#[tokio::test]
async fn test_error_status_codes() {
    let db = setup_test_db().await.unwrap();
    let app = setup_test_app(db, None);

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/words/list/by_filter",
        Some(json!({"filter_values": {"secret__eq": "x"}})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Unknown column: secret");

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/users",
        Some(json!({"email": "a@x.com", "nickname": "A"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Unknown column: nickname");

    let (status, _) = send(
        &app,
        "POST",
        "/api/v1/words",
        Some(json!({"word": "neko", "count": "many"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = send(&app, "POST", "/api/v1/users", Some(json!({"email": "a@x.com"}))).await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, body) = send(&app, "POST", "/api/v1/users", Some(json!({"email": "a@x.com"}))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().starts_with("Conflict"));

    let (status, _) = send(&app, "DELETE", "/api/v1/users/42", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_bulk_endpoints() {
    let db = setup_test_db().await.unwrap();
    let mine = seed_words(&db, 1, &[("neko", "N5"), ("inu", "N5")]).await;
    let theirs = seed_words(&db, 2, &[("tori", "N5")]).await;
    let app = setup_test_app(db, Some(Principal::new("1")));
    let ids = json!([mine[0].id, mine[1].id, theirs[0].id]);

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/words/bulk/update",
        Some(json!({"ids": ids, "patch": {"level": "N3"}})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"updated": 2}));

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/words/bulk/upsert",
        Some(json!({
            "rows": [
                {"word": "neko", "level": "N2"},
                {"word": "neko", "level": "N1"},
                {"word": "uma", "level": "N4", "created_at": "2024-05-01T00:00:00Z"}
            ],
            "unique_field": "word"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["updated"][mine[0].id.to_string()]["level"], "N2");
    assert_eq!(body["duplicates"], json!([{"word": "neko", "level": "N1"}]));
    assert_eq!(body["inserted"].as_object().unwrap().len(), 1);

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/words/bulk/upsert",
        Some(json!({"rows": [{"id": mine[1].id, "count": 5}]})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"created": 0, "updated": 1}));

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/words/bulk/delete",
        Some(json!({"ids": ids})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"deleted": 2}));
}

#[tokio::test]
async fn test_utc_timestamp_resource() {
    let db = setup_test_db().await.unwrap();
    let app = setup_test_app(db, None);

    let (status, created) = send(
        &app,
        "POST",
        "/api/v1/events",
        Some(json!({"label": "launch", "at": "2024-06-01T14:00:00+02:00"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["at"], "2024-06-01T12:00:00Z");
    let id = created["id"].as_i64().unwrap();

    let (status, row) = send(
        &app,
        "PATCH",
        &format!("/api/v1/events/{id}"),
        Some(json!({"at": "2024-06-02T00:00:00Z"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(row["at"], "2024-06-02T00:00:00Z");

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/events/bulk/upsert",
        Some(json!({
            "rows": [{"label": "launch", "at": "2024-06-03T09:30:00+09:00"}],
            "unique_field": "label"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["updated"][id.to_string()]["at"], "2024-06-03T00:30:00Z");
}
