//! Integration tests for the site table HTTP API.

mod common;

use axum::http::StatusCode;
use common::TestServer;
use common::fixtures::{column, create_record, create_site, create_table, json_request};
use serde_json::{Value, json};
use tabula_core::TABLE_ID_LEN;
use tabula_server::ChangeEvent;

fn fields(body: &Value) -> Vec<String> {
    body["columns"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["field"].as_str().unwrap().to_string())
        .collect()
}

async fn describe(server: &TestServer, site_id: i64, table_ref: &str) -> (StatusCode, Value) {
    json_request(
        &server.router,
        "GET",
        &format!("/v1/sites/{site_id}/tables/{table_ref}/schema"),
        None,
    )
    .await
}

async fn update_schema(
    server: &TestServer,
    site_id: i64,
    table_ref: &str,
    body: Value,
) -> (StatusCode, Value) {
    json_request(
        &server.router,
        "PATCH",
        &format!("/v1/sites/{site_id}/tables/{table_ref}/schema"),
        Some(body),
    )
    .await
}

// =============================================================================
// Sites
// =============================================================================

#[tokio::test]
async fn test_site_crud_and_shared_seed() {
    let server = TestServer::new().await;

    let (status, body) = json_request(&server.router, "GET", "/v1/sites", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["sites"][0]["id"], 1);
    assert_eq!(body["sites"][0]["name"], "shared");

    let site_id = create_site(&server.router, "Acme").await;
    let (status, body) =
        json_request(&server.router, "GET", &format!("/v1/sites/{site_id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Acme");
    assert_eq!(body["active"], true);

    let (status, body) = json_request(&server.router, "GET", "/v1/sites/999", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "not_found");

    let (status, body) =
        json_request(&server.router, "POST", "/v1/sites", Some(json!({ "name": "  " }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "validation_error");
}

// =============================================================================
// Provisioning and introspection
// =============================================================================

#[tokio::test]
async fn test_create_then_describe_round_trip() {
    let server = TestServer::new().await;
    let table_id = create_table(&server.router, 1, "Foo", vec![column("Age", "INT", false)]).await;

    assert_eq!(table_id.len(), TABLE_ID_LEN);
    assert_ne!(table_id, "Foo");

    let (status, body) = describe(&server, 1, &table_id).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(fields(&body), vec!["id", "age"]);
    assert_eq!(body["columns"][0]["primary_key"], true);
    assert_eq!(body["columns"][1]["sql_type"], "INTEGER");
    assert_eq!(body["columns"][1]["nullable"], true);

    let (status, body) =
        json_request(&server.router, "GET", &format!("/v1/tables/{table_id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["table_name"], "Foo");
}

#[tokio::test]
async fn test_same_display_name_gets_distinct_tables() {
    let server = TestServer::new().await;
    let first = create_table(&server.router, 1, "Orders", vec![]).await;
    let second = create_table(&server.router, 1, "Orders", vec![]).await;
    assert_ne!(first, second);

    let (_, body) = json_request(&server.router, "GET", "/v1/sites/1/tables", None).await;
    let ids: Vec<&str> = body["tables"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["table_id"].as_str().unwrap())
        .collect();
    assert!(ids.contains(&first.as_str()));
    assert!(ids.contains(&second.as_str()));
}

#[tokio::test]
async fn test_image_columns_collapse_to_one() {
    let server = TestServer::new().await;
    let table_id = create_table(
        &server.router,
        1,
        "Gallery",
        vec![
            column("Photo", "IMAGE", true),
            column("Title", "VARCHAR(80)", true),
            column("Thumb", "image", false),
        ],
    )
    .await;

    let (_, body) = describe(&server, 1, &table_id).await;
    assert_eq!(fields(&body), vec!["id", "image_id", "title"]);
    let image = &body["columns"][1];
    assert_eq!(image["sql_type"], "VARCHAR(255)");
    assert_eq!(image["nullable"], true);
}

#[tokio::test]
async fn test_invalid_columns_are_rejected() {
    let server = TestServer::new().await;

    let (status, body) = json_request(
        &server.router,
        "POST",
        "/v1/sites/1/tables",
        Some(json!({
            "table_name": "Bad",
            "columns": [column("x", "TEXT); DROP TABLE sites; --", false)]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "validation_error");

    let (status, _) = json_request(
        &server.router,
        "POST",
        "/v1/sites/1/tables",
        Some(json!({
            "table_name": "Dup",
            "columns": [column("Name", "TEXT", false), column("name", "INT", false)]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = json_request(
        &server.router,
        "POST",
        "/v1/sites/1/tables",
        Some(json!({ "table_name": " ", "columns": [column("a", "TEXT", false)] })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "validation_error");

    let (status, _) = json_request(
        &server.router,
        "POST",
        "/v1/sites/42/tables",
        Some(json!({ "table_name": "Orphan", "columns": [] })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, body) = json_request(&server.router, "GET", "/v1/sites/1/tables", None).await;
    assert!(body["tables"].as_array().unwrap().is_empty());
}

// =============================================================================
// Schema updates
// =============================================================================

#[tokio::test]
async fn test_update_schema_is_idempotent() {
    let server = TestServer::new().await;
    let table_id = create_table(
        &server.router,
        1,
        "People",
        vec![column("name", "TEXT", false)],
    )
    .await;

    let desired = json!({
        "columns": [
            column("Name", "VARCHAR(100)", true),
            column("E-mail", "VARCHAR(200)", false),
        ]
    });

    let (status, body) = update_schema(&server, 1, &table_id, desired.clone()).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let kinds: Vec<&str> = body["applied"]
        .as_array()
        .unwrap()
        .iter()
        .map(|op| op["op"].as_str().unwrap())
        .collect();
    assert_eq!(kinds, vec!["modify", "add"]);

    let (status, body) = update_schema(&server, 1, &table_id, desired).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["applied"].as_array().unwrap().is_empty());
    assert_eq!(body["renamed"], false);

    let (_, body) = describe(&server, 1, &table_id).await;
    assert_eq!(fields(&body), vec!["id", "name", "e-mail"]);
    assert_eq!(body["columns"][1]["nullable"], false);
}

#[tokio::test]
async fn test_update_schema_preserves_rows_and_drops_last() {
    let server = TestServer::new().await;
    let table_id = create_table(
        &server.router,
        1,
        "Stock",
        vec![column("sku", "TEXT", false), column("legacy", "TEXT", false)],
    )
    .await;
    create_record(&server.router, 1, &table_id, json!({ "sku": "A-1", "legacy": "x" })).await;

    let (status, body) = update_schema(
        &server,
        1,
        &table_id,
        json!({ "columns": [column("sku", "TEXT", false), column("qty", "INTEGER", false)] }),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["applied"][0]["op"], "add");
    assert_eq!(body["applied"][1]["op"], "drop");
    assert_eq!(body["applied"][1]["field"], "legacy");

    let (_, body) = json_request(
        &server.router,
        "GET",
        &format!("/v1/sites/1/tables/{table_id}/records"),
        None,
    )
    .await;
    assert_eq!(body["records"][0]["sku"], "A-1");
    assert_eq!(body["records"][0]["qty"], Value::Null);
    assert!(body["records"][0].get("legacy").is_none());
}

#[tokio::test]
async fn test_records_readable_across_schema_changes() {
    let server = TestServer::new().await;
    let table_id = create_table(&server.router, 1, "Log", vec![column("a", "TEXT", false)]).await;
    let records = format!("/v1/sites/1/tables/{table_id}/records");
    create_record(&server.router, 1, &table_id, json!({ "a": "x" })).await;

    let (status, body) = json_request(&server.router, "GET", &records, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["records"], json!([{ "id": 1, "a": "x" }]));

    let (status, body) = update_schema(
        &server,
        1,
        &table_id,
        json!({ "columns": [column("a", "TEXT", false), column("b", "TEXT", false)] }),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    create_record(&server.router, 1, &table_id, json!({ "a": "y", "b": "z" })).await;

    let (status, body) = json_request(&server.router, "GET", &records, None).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(
        body["records"],
        json!([{ "id": 1, "a": "x", "b": null }, { "id": 2, "a": "y", "b": "z" }])
    );

    // A dropped column disappears from later reads.
    let (status, body) = update_schema(
        &server,
        1,
        &table_id,
        json!({ "columns": [column("b", "TEXT", false)] }),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");

    let (status, body) = json_request(&server.router, "GET", &records, None).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["records"][1], json!({ "id": 2, "b": "z" }));

    let (status, body) = json_request(&server.router, "GET", "/v1/sites/1/dashboard", None).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body[&table_id]["rows"][0], json!({ "id": 2, "b": "z" }));
}

#[tokio::test]
async fn test_id_column_is_never_targeted() {
    let server = TestServer::new().await;
    let table_id = create_table(
        &server.router,
        1,
        "Keys",
        vec![column("label", "TEXT", false)],
    )
    .await;

    let (status, body) = update_schema(
        &server,
        1,
        &table_id,
        json!({ "columns": [column("ID", "TEXT", true), column("label", "TEXT", false)] }),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert!(body["applied"].as_array().unwrap().is_empty());

    let (_, body) = describe(&server, 1, &table_id).await;
    assert_eq!(fields(&body), vec!["id", "label"]);
    assert_eq!(body["columns"][0]["primary_key"], true);
}

#[tokio::test]
async fn test_rename_only_changes_display_name() {
    let server = TestServer::new().await;
    let table_id = create_table(&server.router, 1, "Draft", vec![column("a", "TEXT", false)]).await;

    let (status, body) = update_schema(
        &server,
        1,
        &table_id,
        json!({ "table_name": "Final", "columns": [column("a", "TEXT", false)] }),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["renamed"], true);
    assert_eq!(body["table"]["table_name"], "Final");
    assert_eq!(body["table"]["table_id"], table_id.as_str());

    let (_, body) =
        json_request(&server.router, "GET", &format!("/v1/tables/{table_id}"), None).await;
    assert_eq!(body["table_name"], "Final");
}

#[tokio::test]
async fn test_partial_failure_reports_applied_ops() {
    let server = TestServer::new().await;
    let table_id = create_table(
        &server.router,
        1,
        "Half",
        vec![column("name", "TEXT", false)],
    )
    .await;
    create_record(&server.router, 1, &table_id, json!({ "name": null })).await;

    // Tightening `name` to NOT NULL fails on the existing NULL row.
    let (status, body) = update_schema(
        &server,
        1,
        &table_id,
        json!({
            "table_name": "Renamed",
            "columns": [column("extra", "TEXT", false), column("name", "TEXT", true)]
        }),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR, "{body}");
    assert_eq!(body["code"], "partial_failure");
    assert_eq!(body["details"]["applied"][0]["op"], "add");
    assert_eq!(body["details"]["applied"][0]["column"]["name"], "extra");
    assert_eq!(body["details"]["failed"]["op"], "modify");
    assert_eq!(body["details"]["failed"]["column"]["name"], "name");

    let (_, body) = describe(&server, 1, &table_id).await;
    assert_eq!(fields(&body), vec!["id", "name", "extra"]);

    let (_, body) =
        json_request(&server.router, "GET", &format!("/v1/tables/{table_id}"), None).await;
    assert_eq!(body["table_name"], "Half");
}

#[tokio::test]
async fn test_failed_rename_reports_applied_ops() {
    let server = TestServer::new().await;
    let table_id = create_table(
        &server.router,
        1,
        "Before",
        vec![column("a", "TEXT", false)],
    )
    .await;
    let (_, mut events) = server.state.notifier.register(None);
    server
        .execute_raw(
            "CREATE TRIGGER block_rename BEFORE UPDATE ON site_tables \
             BEGIN SELECT RAISE(ABORT, 'registry is read-only'); END",
        )
        .await;

    let (status, body) = update_schema(
        &server,
        1,
        &table_id,
        json!({
            "table_name": "After",
            "columns": [column("a", "TEXT", false), column("b", "TEXT", false)]
        }),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR, "{body}");
    assert_eq!(body["code"], "partial_failure");
    assert_eq!(body["details"]["applied"][0]["op"], "add");
    assert_eq!(body["details"]["applied"][0]["column"]["name"], "b");
    assert_eq!(body["details"]["failed"]["op"], "rename");
    assert_eq!(body["details"]["failed"]["table_name"], "After");
    assert_eq!(
        events.try_recv().unwrap(),
        ChangeEvent::TableAltered {
            table_id: table_id.clone(),
            site_id: 1
        }
    );

    let (_, body) = describe(&server, 1, &table_id).await;
    assert_eq!(fields(&body), vec!["id", "a", "b"]);
    let (_, body) =
        json_request(&server.router, "GET", &format!("/v1/tables/{table_id}"), None).await;
    assert_eq!(body["table_name"], "Before");

    // With nothing applied first, the rename error is returned as is.
    let (status, body) = update_schema(
        &server,
        1,
        &table_id,
        json!({
            "table_name": "After",
            "columns": [column("a", "TEXT", false), column("b", "TEXT", false)]
        }),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR, "{body}");
    assert_eq!(body["code"], "backend_error");
    assert!(body.get("details").is_none());
}

// =============================================================================
// Scoping and registry
// =============================================================================

#[tokio::test]
async fn test_scope_isolation() {
    let server = TestServer::new().await;
    let site_a = create_site(&server.router, "A").await;
    let site_b = create_site(&server.router, "B").await;
    let table_id = create_table(&server.router, site_a, "Private", vec![]).await;

    let (status, _) = describe(&server, site_a, &table_id).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = describe(&server, site_b, &table_id).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // The shared site resolves by physical name alone, case-insensitively.
    let (status, body) = describe(&server, 1, &table_id.to_lowercase()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["table_id"], table_id.as_str());
}

#[tokio::test]
async fn test_reserved_tables_cannot_be_deleted() {
    let server = TestServer::new().await;

    for name in ["sites", "site_tables", "site_users", "user_main", "SITES"] {
        let (status, body) =
            json_request(&server.router, "DELETE", &format!("/v1/tables/{name}"), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN, "{name}: {body}");
        assert_eq!(body["code"], "forbidden");
    }

    let (status, body) = json_request(&server.router, "GET", "/v1/sites", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["sites"][0]["name"], "shared");
}

#[tokio::test]
async fn test_delete_table_drops_physical_table() {
    let server = TestServer::new().await;
    let table_id = create_table(&server.router, 1, "Temp", vec![column("a", "TEXT", false)]).await;

    let (status, _) =
        json_request(&server.router, "DELETE", &format!("/v1/tables/{table_id}"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) =
        json_request(&server.router, "GET", &format!("/v1/tables/{table_id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) =
        json_request(&server.router, "DELETE", &format!("/v1/tables/{table_id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, body) = json_request(&server.router, "GET", "/v1/sites/1/unassociated", None).await;
    assert!(body["tables"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_association_lifecycle() {
    let server = TestServer::new().await;
    let site_id = create_site(&server.router, "Legacy").await;
    server
        .execute_raw("CREATE TABLE legacy_orders (id INTEGER PRIMARY KEY, label TEXT)")
        .await;

    let uri = format!("/v1/sites/{site_id}/unassociated");
    let (_, body) = json_request(&server.router, "GET", &uri, None).await;
    assert_eq!(body["tables"], json!(["legacy_orders"]));

    let assoc = format!("/v1/sites/{site_id}/associations/legacy_orders");
    let (status, body) = json_request(&server.router, "POST", &assoc, None).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["table_id"], "legacy_orders");
    assert_eq!(body["table_name"], "legacy_orders");

    let (status, body) = json_request(&server.router, "POST", &assoc, None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "conflict");

    let (_, body) =
        json_request(&server.router, "GET", &format!("/v1/sites/{site_id}/tables"), None).await;
    assert_eq!(body["tables"].as_array().unwrap().len(), 1);

    let (_, body) = json_request(&server.router, "GET", &uri, None).await;
    assert!(body["tables"].as_array().unwrap().is_empty());

    let (status, _) = json_request(
        &server.router,
        "POST",
        &format!("/v1/sites/{site_id}/associations/sites"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = json_request(
        &server.router,
        "POST",
        &format!("/v1/sites/{site_id}/associations/missing_table"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// =============================================================================
// Records
// =============================================================================

#[tokio::test]
async fn test_record_crud() {
    let server = TestServer::new().await;
    let table_id = create_table(
        &server.router,
        1,
        "Contacts",
        vec![column("name", "TEXT", false), column("age", "INTEGER", false)],
    )
    .await;
    let records = format!("/v1/sites/1/tables/{table_id}/records");

    let id = create_record(
        &server.router,
        1,
        &table_id,
        json!({ "id": 99, "name": "Ann", "age": 30 }),
    )
    .await;
    assert_eq!(id, 1);

    let (status, _) = json_request(
        &server.router,
        "PATCH",
        &format!("{records}/{id}"),
        Some(json!({ "age": 31, "name": "" })),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, body) = json_request(&server.router, "GET", &records, None).await;
    assert_eq!(body["records"], json!([{ "id": 1, "name": null, "age": 31 }]));

    let (status, _) = json_request(
        &server.router,
        "PATCH",
        &format!("{records}/999"),
        Some(json!({ "age": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = json_request(
        &server.router,
        "POST",
        &records,
        Some(json!({ "nickname": "x" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");

    let (status, _) = json_request(&server.router, "POST", &records, Some(json!([1, 2]))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let delete = format!("/v1/tables/{table_id}/records/{id}");
    let (status, _) = json_request(&server.router, "DELETE", &delete, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = json_request(&server.router, "DELETE", &delete, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_dashboard_degrades_per_table() {
    let server = TestServer::new().await;
    let site_id = create_site(&server.router, "Dash").await;
    let healthy = create_table(
        &server.router,
        site_id,
        "Healthy",
        vec![column("n", "INTEGER", false)],
    )
    .await;
    let broken = create_table(
        &server.router,
        site_id,
        "Broken",
        vec![column("n", "INTEGER", false)],
    )
    .await;

    for n in 1..=7 {
        create_record(&server.router, site_id, &healthy, json!({ "n": n })).await;
    }
    create_record(&server.router, site_id, &broken, json!({ "n": 1 })).await;
    server
        .execute_raw(&format!("DROP TABLE \"{broken}\""))
        .await;

    let (status, body) = json_request(
        &server.router,
        "GET",
        &format!("/v1/sites/{site_id}/dashboard"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");

    let rows = body[&healthy]["rows"].as_array().unwrap();
    assert_eq!(body[&healthy]["tableName"], "Healthy");
    assert_eq!(rows.len(), 5);
    assert_eq!(rows[0]["n"], 7);

    assert_eq!(body[&broken]["tableName"], "Broken");
    assert!(body[&broken]["rows"].as_array().unwrap().is_empty());
}

// =============================================================================
// Notifications, health, metrics
// =============================================================================

#[tokio::test]
async fn test_mutations_publish_change_events() {
    let server = TestServer::new().await;
    let (_, mut events) = server.state.notifier.register(Some("watcher".to_string()));

    let table_id = create_table(&server.router, 1, "Live", vec![column("v", "TEXT", false)]).await;
    assert_eq!(
        events.try_recv().unwrap(),
        ChangeEvent::SiteAltered { site_id: 1 }
    );

    let id = create_record(&server.router, 1, &table_id, json!({ "v": "a" })).await;
    assert_eq!(
        events.try_recv().unwrap(),
        ChangeEvent::TableAltered {
            table_id: table_id.clone(),
            site_id: 1
        }
    );

    // A no-op schema update publishes nothing.
    update_schema(&server, 1, &table_id, json!({ "columns": [column("v", "TEXT", false)] })).await;
    assert!(events.try_recv().is_err());

    json_request(
        &server.router,
        "DELETE",
        &format!("/v1/tables/{table_id}/records/{id}"),
        None,
    )
    .await;
    assert!(matches!(
        events.try_recv().unwrap(),
        ChangeEvent::TableAltered { .. }
    ));

    json_request(&server.router, "DELETE", &format!("/v1/tables/{table_id}"), None).await;
    assert_eq!(
        events.try_recv().unwrap(),
        ChangeEvent::SiteAltered { site_id: 1 }
    );
}

#[tokio::test]
async fn test_health_check() {
    let server = TestServer::new().await;
    let (status, body) = json_request(&server.router, "GET", "/v1/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn test_metrics_endpoint_follows_config() {
    let server = TestServer::new().await;
    let (status, _) = json_request(&server.router, "GET", "/metrics", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let server = TestServer::with_config(|config| config.server.metrics_enabled = true).await;
    tabula_server::metrics::register_metrics();
    create_table(&server.router, 1, "Counted", vec![]).await;

    let request = axum::http::Request::builder()
        .uri("/metrics")
        .body(axum::body::Body::empty())
        .unwrap();
    let (status, _, body) = common::fixtures::send(&server.router, request).await;
    assert_eq!(status, StatusCode::OK);
    let text = String::from_utf8(body).unwrap();
    assert!(text.contains("tabula_tables_created_total"));
}
