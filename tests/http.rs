#![cfg(feature = "web")]

use std::sync::Arc;

use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use brz_report::app::{AppState, DENIED_MESSAGE, router};
use brz_report::error::Result as ReportResult;
use brz_report::record::RawRecord;
use brz_report::{Config, SheetSource, compute_token};
use tower::ServiceExt;

const SECRET: &[u8] = b"s3cr3t";

/// Sheets held in memory, keyed by "spreadsheet/sheet"
struct MemorySource {
    delivery: Vec<RawRecord>,
    campaigns: Vec<RawRecord>,
}

impl SheetSource for MemorySource {
    fn get_page(&self, spreadsheet: &str, _sheet: &str) -> ReportResult<Vec<RawRecord>> {
        Ok(match spreadsheet {
            "Delivery" => self.delivery.clone(),
            _ => self.campaigns.clone(),
        })
    }
}

fn record(pairs: &[(&str, &str)]) -> RawRecord {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn delivery(site: &str, zone: &str, date: &str, impressions: &str) -> RawRecord {
    record(&[
        ("Site", site),
        ("Zone", zone),
        ("Date", date),
        ("Impressions", impressions),
        ("Clicks", "10"),
        ("Conversions", "500"),
        ("Placement Size", "300x250"),
    ])
}

fn app() -> axum::Router {
    let config = Config::from_toml_str(
        r#"
secret_key = "s3cr3t"
agency_value = "AGENCIA"
spreadsheet_name = "Delivery"
sheet_name = "Daily"
spreadsheet_campaigns = "Campaigns"
sheet_campaigns = "Active"
"#,
    )
    .unwrap();

    let source = MemorySource {
        delivery: vec![
            delivery("123 Portal Norte", "Home [Radio Sul]", "01/03/2024", "1000"),
            delivery("123 Portal Norte", "Home [Radio Sul]", "02/03/2024", "1000"),
            delivery("456 Portal Sul", "Capa [TV Leste]", "03/03/2024", "1000"),
        ],
        campaigns: vec![record(&[
            ("ID", "123"),
            ("Campanha", "Verão"),
            ("Cliente", "ACME"),
            ("Agência", "BRZ"),
            ("Início", "01/03/2024"),
            ("Término", "31/03/2024"),
        ])],
    };

    router(Arc::new(AppState::new(config, Box::new(source))))
}

async fn get(uri: &str) -> (StatusCode, Vec<u8>) {
    let response = app()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, body.to_vec())
}

async fn get_json(uri: &str) -> (StatusCode, serde_json::Value) {
    let (status, body) = get(uri).await;
    (status, serde_json::from_slice(&body).unwrap())
}

fn scoped_query() -> String {
    format!(
        "site={}&veiculo={}",
        compute_token("123 Portal Norte", SECRET),
        compute_token("Radio Sul", SECRET)
    )
}

#[tokio::test]
async fn health() {
    let (status, body) = get("/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"ok");
}

#[tokio::test]
async fn missing_tokens_are_denied() {
    let (status, json) = get_json("/api/report").await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(json["status"], "error");
    assert_eq!(json["message"], DENIED_MESSAGE);
}

#[tokio::test]
async fn site_without_channel_is_denied() {
    let uri = format!("/api/report?site={}", compute_token("123 Portal Norte", SECRET));
    let (status, json) = get_json(&uri).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    // nothing about the data leaks into a denial
    assert!(json.get("metrics").is_none());
}

#[tokio::test]
async fn scoped_report() {
    let (status, json) = get_json(&format!("/api/report?{}", scoped_query())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["title"], "Relatório: 123 Portal Norte - Radio Sul");
    assert_eq!(json["decision"]["access"], "scoped");
    assert_eq!(json["campaign"]["name"], "Verão");
    assert_eq!(json["metrics"]["total_impressions"], 2000.0);
    assert_eq!(json["daily"].as_array().unwrap().len(), 2);
    assert_eq!(json["summary"]["total"]["date"], "Total");
}

#[tokio::test]
async fn agency_report_with_dates() {
    let uri = format!(
        "/api/report?site={}&start=2024-03-02&end=2024-03-03",
        compute_token("AGENCIA", SECRET)
    );
    let (status, json) = get_json(&uri).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["decision"]["access"], "agency");
    assert_eq!(json["metrics"]["total_impressions"], 2000.0);
    assert_eq!(json["range"]["start"], "2024-03-02");
}

#[tokio::test]
async fn malformed_dates_are_rejected() {
    let uri = format!("/api/report?{}&start=02/03/2024", scoped_query());
    let (status, json) = get_json(&uri).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["status"], "error");
}

#[tokio::test]
async fn csv_export() {
    let response = app()
        .oneshot(
            Request::builder()
                .uri(format!("/api/report.csv?{}", scoped_query()))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/csv; charset=utf-8"
    );

    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let csv = String::from_utf8(body.to_vec()).unwrap();
    assert_eq!(csv.lines().count(), 4);
    assert!(csv.lines().last().unwrap().starts_with("Total,-,-,2000,20,1000,"));
}

#[tokio::test]
async fn export_with_no_rows_is_not_found() {
    let uri = format!("/api/report.csv?{}&start=2024-03-03", scoped_query());
    let (status, _) = get(&uri).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn denied_export() {
    let (status, _) = get("/api/report.xlsx?site=000000000000&veiculo=000000000000").await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn xlsx_export() {
    let (status, body) = get(&format!("/api/report.xlsx?{}", scoped_query())).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.starts_with(b"PK"));
}
