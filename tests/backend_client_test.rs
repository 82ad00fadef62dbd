use httpmock::prelude::*;
use httpmock::Method::PATCH;
use hsse_etl::core::{RecordStore, SelectQuery, SessionProvider, Table};
use hsse_etl::domain::model::Filter;
use hsse_etl::utils::error::HsseError;
use hsse_etl::{BackendClient, TomlConfig};
use serde_json::json;

fn client(server: &MockServer, access_token: Option<&str>) -> BackendClient {
    let token_line = access_token
        .map(|t| format!("access_token = \"{}\"\n", t))
        .unwrap_or_default();
    let toml = format!(
        "[backend]\nurl = \"{}\"\nanon_key = \"anon-key\"\n{}timeout_seconds = 5\n",
        server.base_url(),
        token_line
    );
    let config = TomlConfig::from_toml_str(&toml).unwrap();
    BackendClient::from_config(&config).unwrap()
}

#[tokio::test]
async fn test_insert_posts_single_row_array_with_auth_headers() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/rest/v1/incidents")
            .header("apikey", "anon-key")
            .header("Authorization", "Bearer user-jwt")
            .header("Prefer", "return=minimal")
            .json_body(json!([{"title": "Slip", "user_id": "op-1"}]));
        then.status(201);
    });

    let backend = client(&server, Some("user-jwt"));
    backend
        .insert(Table::Incidents, json!({"title": "Slip", "user_id": "op-1"}))
        .await
        .unwrap();

    mock.assert();
}

#[tokio::test]
async fn test_anon_key_is_the_bearer_without_a_session_token() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET)
            .path("/rest/v1/training_records")
            .header("Authorization", "Bearer anon-key");
        then.status(200).json_body(json!([]));
    });

    let records = client(&server, None)
        .select(Table::TrainingRecords, &SelectQuery::all())
        .await
        .unwrap();

    assert!(records.is_empty());
    mock.assert();
}

#[tokio::test]
async fn test_select_encodes_filters_and_order() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET)
            .path("/rest/v1/inspections")
            .query_param("select", "id,title,status")
            .query_param("reporting_type", "ilike.nearmiss")
            .query_param("status", "in.(open,in_progress)")
            .query_param("created_at", "gte.2024-06-01")
            .query_param("order", "created_at.desc");
        then.status(200).json_body(json!([
            {"id": "a1", "title": "Loose rail", "status": "open"},
            {"id": "a2", "title": "Oil on floor", "status": "in_progress"}
        ]));
    });

    let query = SelectQuery::all()
        .columns("id, title, status")
        .filter(Filter::ILike("reporting_type".to_string(), "nearmiss".to_string()))
        .filter(Filter::In(
            "status".to_string(),
            vec!["open".to_string(), "in_progress".to_string()],
        ))
        .filter(Filter::Gte("created_at".to_string(), "2024-06-01".to_string()))
        .order_by("created_at", false);

    let records = client(&server, Some("jwt"))
        .select(Table::Inspections, &query)
        .await
        .unwrap();

    mock.assert();
    assert_eq!(records.len(), 2);
    assert_eq!(records[1].str_field("title"), Some("Oil on floor"));
    assert_eq!(records[0].id().as_deref(), Some("a1"));
}

#[tokio::test]
async fn test_store_error_uses_body_message() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/rest/v1/risk_assessments");
        then.status(400).json_body(json!({
            "code": "23502",
            "message": "null value in column \"title\" violates not-null constraint"
        }));
    });

    let err = client(&server, Some("jwt"))
        .insert(Table::RiskAssessments, json!({}))
        .await
        .unwrap_err();

    match err {
        HsseError::StoreError { table, status, message } => {
            assert_eq!(table, "risk_assessments");
            assert_eq!(status, 400);
            assert!(message.starts_with("null value in column"));
        }
        other => panic!("unexpected error {:?}", other),
    }
}

#[tokio::test]
async fn test_update_and_delete_filter_by_id() {
    let server = MockServer::start();
    let update = server.mock(|when, then| {
        when.method(PATCH)
            .path("/rest/v1/incidents")
            .query_param("id", "eq.abc")
            .json_body(json!({"status": "closed"}));
        then.status(204);
    });
    let delete_one = server.mock(|when, then| {
        when.method(DELETE).path("/rest/v1/incidents").query_param("id", "eq.abc");
        then.status(204);
    });
    let delete_many = server.mock(|when, then| {
        when.method(DELETE)
            .path("/rest/v1/inspections")
            .query_param("id", "in.(a,b,c)");
        then.status(204);
    });

    let backend = client(&server, Some("jwt"));
    backend
        .update(Table::Incidents, "abc", json!({"status": "closed"}))
        .await
        .unwrap();
    backend.delete(Table::Incidents, &["abc".to_string()]).await.unwrap();
    backend
        .delete(
            Table::Inspections,
            &["a".to_string(), "b".to_string(), "c".to_string()],
        )
        .await
        .unwrap();
    backend.delete(Table::Inspections, &[]).await.unwrap();

    update.assert();
    delete_one.assert();
    delete_many.assert_hits(1);
}

#[tokio::test]
async fn test_current_operator_from_auth_endpoint() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET)
            .path("/auth/v1/user")
            .header("Authorization", "Bearer user-jwt");
        then.status(200).json_body(json!({
            "id": "7d1c",
            "email": "officer@example.com",
            "aud": "authenticated"
        }));
    });

    let operator = client(&server, Some("user-jwt")).current_operator().await.unwrap();

    mock.assert();
    assert_eq!(operator.id, "7d1c");
    assert_eq!(operator.email.as_deref(), Some("officer@example.com"));
}

#[tokio::test]
async fn test_rejected_or_missing_session() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET).path("/auth/v1/user");
        then.status(401).json_body(json!({"message": "invalid JWT"}));
    });

    let expired = client(&server, Some("expired")).current_operator().await;
    assert!(matches!(expired, Err(HsseError::SessionError { .. })));

    let anonymous = client(&server, None).current_operator().await;
    assert!(matches!(anonymous, Err(HsseError::SessionError { .. })));

    mock.assert_hits(1);
}
