//! Exporter runs over HTTP against a mocked REST API.

use serde_json::{json, Value};
use tableau_client::{ClientConfig, Session};
use tableau_export::{read_report, ExportRequest, ExportWarning, Exporter, RootSelection};
use tableau_rbac::ContentKind;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const API: &str = "/api/3.23";
const SITE: &str = "/api/3.23/sites/site-1";

fn page(collection: &str, element: &str, items: Value) -> ResponseTemplate {
    let total = items.as_array().map_or(0, Vec::len);
    ResponseTemplate::new(200).set_body_json(json!({
        "pagination": {"pageNumber": "1", "pageSize": "100", "totalAvailable": total.to_string()},
        collection: {element: items}
    }))
}

async fn mount_get(server: &MockServer, route: &str, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path(format!("{}/{}", SITE, route)))
        .and(header("X-Tableau-Auth", "token-1"))
        .respond_with(response)
        .mount(server)
        .await;
}

/// Mock site: `Sales` holding `Q1 Report` and a workbook deleted after listing.
async fn sales_server() -> MockServer {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(format!("{}/auth/signin", API)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "credentials": {
                "site": {"id": "site-1", "contentUrl": "sales"},
                "user": {"id": "me"},
                "token": "token-1"
            }
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("{}/auth/signout", API)))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    mount_get(
        &server,
        "projects",
        page(
            "projects",
            "project",
            json!([{"id": "p1", "name": "Sales", "contentPermissions": "LockedToProject"}]),
        ),
    )
    .await;
    mount_get(
        &server,
        "workbooks",
        page(
            "workbooks",
            "workbook",
            json!([
                {"id": "w1", "name": "Q1 Report", "project": {"id": "p1", "name": "Sales"}},
                {"id": "w2", "name": "Old", "project": {"id": "p1", "name": "Sales"}}
            ]),
        ),
    )
    .await;
    mount_get(
        &server,
        "workbooks/w1/permissions",
        ResponseTemplate::new(200).set_body_json(json!({
            "permissions": {
                "workbook": {"id": "w1"},
                "granteeCapabilities": [{
                    "group": {"id": "g1"},
                    "capabilities": {"capability": [
                        {"name": "Read", "mode": "Allow"},
                        {"name": "ExportData", "mode": "Deny"}
                    ]}
                }]
            }
        })),
    )
    .await;
    mount_get(
        &server,
        "workbooks/w2/permissions",
        ResponseTemplate::new(404).set_body_json(json!({
            "error": {"summary": "Resource Not Found", "detail": "Workbook 'w2' could not be found.", "code": "404006"}
        })),
    )
    .await;
    mount_get(
        &server,
        "users",
        page(
            "users",
            "user",
            json!([{"id": "u1", "name": "alice", "email": "alice@example.com"}]),
        ),
    )
    .await;
    mount_get(
        &server,
        "groups",
        page("groups", "group", json!([{"id": "g1", "name": "Analysts"}])),
    )
    .await;
    mount_get(
        &server,
        "groups/g1/users",
        page("users", "user", json!([{"id": "u1", "name": "alice"}])),
    )
    .await;

    server
}

async fn sign_in(server: &MockServer) -> Session {
    let config = ClientConfig {
        max_retries: 1,
        retry_initial_delay_ms: 1,
        retry_max_delay_ms: 5,
        ..ClientConfig::new(&server.uri())
    };
    Session::sign_in(config, "exporter", "s3cret", "sales")
        .await
        .expect("sign in")
}

#[tokio::test]
async fn test_export_over_http() {
    let server = sales_server().await;
    let session = sign_in(&server).await;
    let dir = tempfile::tempdir().unwrap();

    let request = ExportRequest::new(
        RootSelection::Projects(vec!["p1".into()]),
        dir.path().join("sales.csv"),
    )
    .with_kinds(vec![ContentKind::Workbook])
    .with_group_members(true);

    let summary = Exporter::new(&session).run(&request).await.unwrap();
    session.sign_out().await;

    assert_eq!(summary.items_processed, 2);
    assert_eq!(
        summary.warnings,
        vec![ExportWarning::DeletedContent {
            content_id: "w2".into(),
            content_type: ContentKind::Workbook,
            path: "Sales/Old".into(),
        }]
    );

    let rows = read_report(&request.output).unwrap();
    let summary_rows: Vec<(&str, &str, &str, &str)> = rows
        .iter()
        .map(|r| {
            (
                r.capability.as_str(),
                r.effect.as_str(),
                r.principal_name.as_str(),
                r.member_name.as_str(),
            )
        })
        .collect();
    assert_eq!(
        summary_rows,
        vec![
            ("ExportData", "Deny", "Analysts", "alice"),
            ("Read", "Allow", "Analysts", "alice"),
        ]
    );
    assert!(rows.iter().all(|r| r.content_path == "Sales/Q1 Report"));
    assert!(rows.iter().all(|r| r.asset_permissions == "LockedToProject"));
    assert!(dir.path().join("sales_group_members.csv").exists());
}

#[tokio::test]
async fn test_expired_session_aborts_over_http() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("{}/auth/signin", API)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "credentials": {"site": {"id": "site-1", "contentUrl": "sales"}, "token": "token-1"}
        })))
        .mount(&server)
        .await;
    mount_get(&server, "projects", ResponseTemplate::new(401)).await;

    let session = sign_in(&server).await;
    let dir = tempfile::tempdir().unwrap();
    let request = ExportRequest::new(RootSelection::All, dir.path().join("out.csv"));

    let err = Exporter::new(&session).run(&request).await.unwrap_err();
    assert!(err.is_auth());
    assert!(!request.output.exists());
}
