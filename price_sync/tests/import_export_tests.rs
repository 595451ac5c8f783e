use std::io::{Cursor, Read, Write};
use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use price_sync::web::{create_router, PRICES_PATH, SKIPPED_HEADER};
use price_sync::{IdStrategy, PriceStore, SqliteStore};
use tempfile::TempDir;
use tower::ServiceExt;
use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

// Test fixtures - archives and requests

const BOUNDARY: &str = "import-export-boundary";

fn make_archive(entry: &str, csv: &str) -> Vec<u8> {
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut zip = ZipWriter::new(&mut cursor);
        zip.start_file(entry, SimpleFileOptions::default()).unwrap();
        zip.write_all(csv.as_bytes()).unwrap();
        zip.finish().unwrap();
    }
    cursor.into_inner()
}

fn read_entry(archive: &[u8], entry: &str) -> String {
    let mut zip = ZipArchive::new(Cursor::new(archive)).unwrap();
    let mut file = zip.by_name(entry).unwrap();
    let mut content = String::new();
    file.read_to_string(&mut content).unwrap();
    content
}

fn upload(archive: &[u8]) -> Request<Body> {
    let mut body = format!(
        "--{BOUNDARY}\r\n\
         Content-Disposition: form-data; name=\"file\"; filename=\"data.zip\"\r\n\
         Content-Type: application/zip\r\n\r\n"
    )
    .into_bytes();
    body.extend_from_slice(archive);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri(PRICES_PATH)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

fn download() -> Request<Body> {
    Request::builder()
        .uri(PRICES_PATH)
        .body(Body::empty())
        .unwrap()
}

struct TestService {
    router: Router,
    store: Arc<SqliteStore>,
    _dir: TempDir,
}

impl TestService {
    fn start(id_strategy: IdStrategy) -> Self {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(SqliteStore::new(dir.path().join("prices.db"), id_strategy));
        store.create_schema_if_absent().unwrap();
        let router = create_router(store.clone(), 10 << 20);
        Self {
            router,
            store,
            _dir: dir,
        }
    }

    async fn import(&self, archive: &[u8]) -> (StatusCode, String, Option<String>) {
        let response = self.router.clone().oneshot(upload(archive)).await.unwrap();
        let status = response.status();
        let skipped = response
            .headers()
            .get(SKIPPED_HEADER)
            .map(|v| v.to_str().unwrap().to_string());
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap(), skipped)
    }

    async fn export(&self) -> Vec<u8> {
        let response = self.router.clone().oneshot(download()).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap()
            .to_vec()
    }
}

const SAMPLE_CSV: &str = "id,name,category,price,create_date\n\
                          1,Widget,Tools,9.99,2024-01-15\n\
                          2,Gadget,Tools,19.99,2024-01-16\n";

// End-to-end scenarios

#[tokio::test]
async fn test_import_then_export_sample() {
    let service = TestService::start(IdStrategy::Generated);

    let (status, body, skipped) = service.import(&make_archive("data.csv", SAMPLE_CSV)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        r#"{"total_items":2,"total_categories":1,"total_price":29.98}"#
    );
    assert_eq!(skipped.as_deref(), Some("1"));

    let exported = service.export().await;
    assert_eq!(
        read_entry(&exported, "data.csv"),
        "1,Widget,Tools,9.99,2024-01-15\n2,Gadget,Tools,19.99,2024-01-16\n"
    );
}

#[tokio::test]
async fn test_import_from_sample_data_directory() {
    let service = TestService::start(IdStrategy::Natural);

    let (status, _, _) = service
        .import(&make_archive("sample_data/data.csv", SAMPLE_CSV))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(service.store.aggregate_stats().unwrap().total_items, 2);
}

#[tokio::test]
async fn test_reimport_with_natural_ids_is_idempotent() {
    let service = TestService::start(IdStrategy::Natural);
    let (_, first, _) = service.import(&make_archive("data.csv", SAMPLE_CSV)).await;

    let exported = service.export().await;
    let (status, second, skipped) = service.import(&exported).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(first, second);
    assert_eq!(skipped.as_deref(), Some("2"));
}

#[tokio::test]
async fn test_reimport_with_generated_ids_doubles_rows() {
    let service = TestService::start(IdStrategy::Generated);
    service.import(&make_archive("data.csv", SAMPLE_CSV)).await;

    let exported = service.export().await;
    let (_, body, _) = service.import(&exported).await;

    assert_eq!(
        body,
        r#"{"total_items":4,"total_categories":1,"total_price":59.96}"#
    );
    let csv = read_entry(&service.export().await, "data.csv");
    assert_eq!(csv.lines().count(), 4);
    assert!(csv.starts_with("1,Widget"));
    assert!(csv.ends_with("4,Gadget,Tools,19.99,2024-01-16\n"));
}

#[tokio::test]
async fn test_invalid_rows_are_skipped_not_fatal() {
    let service = TestService::start(IdStrategy::Generated);
    let csv = "1,Widget,Tools,9.99,2024-01-15\n\
               2,Short,Row\n\
               3,Gadget,Tools,free,2024-01-16\n\
               id,Looks,Like,1.00,2024-01-17\n\
               4,Bolt,Hardware,0.25,2024-01-18\n";

    let (status, body, skipped) = service.import(&make_archive("data.csv", csv)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        r#"{"total_items":2,"total_categories":2,"total_price":10.24}"#
    );
    assert_eq!(skipped.as_deref(), Some("3"));
}

#[tokio::test]
async fn test_archive_without_csv_leaves_table_unchanged() {
    let service = TestService::start(IdStrategy::Generated);
    service.import(&make_archive("data.csv", SAMPLE_CSV)).await;

    let (status, body, _) = service
        .import(&make_archive("prices/data.csv", SAMPLE_CSV))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("data.csv"));
    assert_eq!(service.store.aggregate_stats().unwrap().total_items, 2);
}

#[tokio::test]
async fn test_export_of_empty_table() {
    let service = TestService::start(IdStrategy::Generated);
    let exported = service.export().await;
    assert_eq!(read_entry(&exported, "data.csv"), "");
}
