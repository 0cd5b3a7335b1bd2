#![allow(dead_code)]

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tower::ServiceExt;

use neuroscan::app::classifier::{Classifier, Prediction, StubClassifier};
use neuroscan::app::ids::{IdGenerator, RandomIds};
use neuroscan::config::AppConfig;
use neuroscan::infra::{db::Db, storage::MediaStore};
use neuroscan::AppState;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

const BOUNDARY: &str = "neuroscan-test-boundary";
const DEFAULT_UPLOAD_MAX_BYTES: usize = 10 * 1024 * 1024;

// ---------------------------------------------------------------------------
// Deterministic collaborators
// ---------------------------------------------------------------------------

/// Hands out `000000001`, `000000002`, ...
#[derive(Default)]
pub struct SequentialIds {
    next: AtomicUsize,
}

impl IdGenerator for SequentialIds {
    fn next_id(&self) -> String {
        let n = self.next.fetch_add(1, Ordering::SeqCst) + 1;
        format!("{:09x}", n)
    }
}

/// Replays the given labels in order, wrapping around.
pub struct ScriptedClassifier {
    labels: Vec<&'static str>,
    confidence: f64,
    calls: Mutex<usize>,
}

impl ScriptedClassifier {
    pub fn new(labels: Vec<&'static str>, confidence: f64) -> Self {
        Self {
            labels,
            confidence,
            calls: Mutex::new(0),
        }
    }
}

impl Classifier for ScriptedClassifier {
    fn predict(&self, _image_path: &std::path::Path) -> Prediction {
        let mut calls = self.calls.lock().unwrap();
        let label = self.labels[*calls % self.labels.len()];
        *calls += 1;
        Prediction {
            label: label.to_string(),
            confidence: self.confidence,
        }
    }
}

// ---------------------------------------------------------------------------
// TestApp: one isolated database and media dir per test
// ---------------------------------------------------------------------------

pub struct TestApp {
    router: Router,
    pub state: AppState,
    pub media_dir: PathBuf,
    _dir: TempDir,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: axum::http::HeaderMap,
    body_bytes: bytes::Bytes,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body_bytes).unwrap_or(Value::Null)
    }

    pub fn bytes(&self) -> &[u8] {
        &self.body_bytes
    }

    pub fn error_message(&self) -> String {
        self.json()["error"].as_str().unwrap_or("").to_string()
    }
}

pub struct TestAppBuilder {
    classifier: Arc<dyn Classifier>,
    ids: Arc<dyn IdGenerator>,
    cors_origins: Vec<String>,
    upload_max_bytes: usize,
}

impl TestAppBuilder {
    pub fn classifier(mut self, classifier: impl Classifier + 'static) -> Self {
        self.classifier = Arc::new(classifier);
        self
    }

    pub fn ids(mut self, ids: impl IdGenerator + 'static) -> Self {
        self.ids = Arc::new(ids);
        self
    }

    pub fn cors_origins(mut self, origins: &[&str]) -> Self {
        self.cors_origins = origins.iter().map(|o| o.to_string()).collect();
        self
    }

    pub fn upload_max_bytes(mut self, limit: usize) -> Self {
        self.upload_max_bytes = limit;
        self
    }

    pub async fn build(self) -> TestApp {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let media_dir = dir.path().join("media");

        let config = AppConfig {
            http_addr: "127.0.0.1:0".to_string(),
            database_url: format!("sqlite://{}", dir.path().join("scans.db").display()),
            media_dir: media_dir.clone(),
            cors_origins: self.cors_origins,
            model_path: None,
            db_max_connections: 5,
            db_connect_timeout_seconds: 5,
            upload_max_bytes: self.upload_max_bytes,
        };

        let db = Db::connect(&config).await.expect("Db::connect failed");
        let media = MediaStore::new(config.media_dir.clone())
            .await
            .expect("MediaStore::new failed");

        let state = AppState {
            db,
            media,
            classifier: self.classifier,
            ids: self.ids,
            cors_origins: config.cors_origins.clone(),
            upload_max_bytes: config.upload_max_bytes,
        };

        let router = neuroscan::http::router(state.clone());

        TestApp {
            router,
            state,
            media_dir,
            _dir: dir,
        }
    }
}

/// Fresh app with the stub classifier and random ids.
pub async fn app() -> TestApp {
    TestApp::builder().build().await
}

impl TestApp {
    pub fn builder() -> TestAppBuilder {
        TestAppBuilder {
            classifier: Arc::new(StubClassifier::new(None)),
            ids: Arc::new(RandomIds),
            cors_origins: vec!["*".to_string()],
            upload_max_bytes: DEFAULT_UPLOAD_MAX_BYTES,
        }
    }

    // ------------------------------------------------------------------
    // Low-level request helper
    // ------------------------------------------------------------------
    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("oneshot failed");

        let status = response.status();
        let headers = response.headers().clone();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("failed to collect body")
            .to_bytes();

        TestResponse {
            status,
            headers,
            body_bytes,
        }
    }

    // ------------------------------------------------------------------
    // Convenience HTTP helpers
    // ------------------------------------------------------------------
    pub async fn get(&self, path: &str) -> TestResponse {
        self.get_with_headers(path, &[]).await
    }

    pub async fn get_with_headers(&self, path: &str, headers: &[(&str, &str)]) -> TestResponse {
        let mut builder = Request::builder()
            .method(Method::GET)
            .uri(path)
            .header("host", "localhost");
        for &(key, value) in headers {
            builder = builder.header(key, value);
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    /// POSTs a single multipart part to `/api/upload`.
    pub async fn upload_field(
        &self,
        field: &str,
        filename: &str,
        content_type: Option<&str>,
        data: &[u8],
    ) -> TestResponse {
        let body = multipart_body(field, filename, content_type, data);
        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/upload")
            .header("host", "localhost")
            .header(
                "content-type",
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(body))
            .unwrap();
        self.send(request).await
    }

    pub async fn upload(&self, filename: &str, content_type: &str, data: &[u8]) -> TestResponse {
        self.upload_field("file", filename, Some(content_type), data)
            .await
    }

    /// Uploads a small valid PNG and returns the response body.
    pub async fn upload_png(&self, filename: &str) -> Value {
        let resp = self.upload(filename, "image/png", &png_bytes(8, 4)).await;
        assert_eq!(resp.status, StatusCode::OK, "upload failed: {:?}", resp.json());
        resp.json()
    }

    pub fn media_files(&self) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(&self.media_dir)
            .expect("cannot read media dir")
            .filter_map(Result::ok)
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }
}

// ---------------------------------------------------------------------------
// Payload helpers
// ---------------------------------------------------------------------------

pub fn multipart_body(
    field: &str,
    filename: &str,
    content_type: Option<&str>,
    data: &[u8],
) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
            BOUNDARY, field, filename
        )
        .as_bytes(),
    );
    if let Some(content_type) = content_type {
        body.extend_from_slice(format!("Content-Type: {}\r\n", content_type).as_bytes());
    }
    body.extend_from_slice(b"\r\n");
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
    body
}

pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbImage::from_pixel(width, height, image::Rgb([40, 80, 120]));
    let mut buf = std::io::Cursor::new(Vec::new());
    img.write_to(&mut buf, image::ImageFormat::Png)
        .expect("failed to encode png");
    buf.into_inner()
}
