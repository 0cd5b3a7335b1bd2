use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;

use crate::app::scans::{ScanService, UploadedFile};
use crate::domain::scan::{Analytics, ScanResponse};
use crate::http::AppError;
use crate::AppState;

const FILE_FIELD: &str = "file";

#[derive(Serialize)]
pub(crate) struct HealthResponse {
    status: &'static str,
}

fn scan_service(state: &AppState) -> ScanService {
    ScanService::new(
        state.db.clone(),
        state.media.clone(),
        state.classifier.clone(),
        state.ids.clone(),
    )
}

pub(crate) async fn healthz() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

pub(crate) async fn readyz(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    match state.db.ping().await {
        Ok(()) => (StatusCode::OK, Json(HealthResponse { status: "ok" })),
        Err(err) => {
            tracing::warn!(error = ?err, "database ping failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse { status: "degraded" }),
            )
        }
    }
}

pub async fn upload_scan(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<ScanResponse>, AppError> {
    let mut upload = None;

    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let filename = field.file_name().unwrap_or_default().to_string();
        let content_type = field.content_type().map(str::to_string);
        let data = field.bytes().await?;

        upload = Some(UploadedFile {
            filename,
            content_type,
            data,
        });
        break;
    }

    let upload = upload.ok_or_else(|| AppError::bad_request("file is required"))?;
    let scan = scan_service(&state).upload(upload).await?;

    Ok(Json(scan.into()))
}

pub async fn list_scans(
    State(state): State<AppState>,
) -> Result<Json<Vec<ScanResponse>>, AppError> {
    let scans = scan_service(&state).list().await?;
    Ok(Json(scans.into_iter().map(ScanResponse::from).collect()))
}

pub async fn get_scan(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<ScanResponse>, AppError> {
    let scan = scan_service(&state).get(&id).await?;
    Ok(Json(scan.into()))
}

pub async fn analytics(State(state): State<AppState>) -> Result<Json<Analytics>, AppError> {
    let analytics = scan_service(&state).analytics().await?;
    Ok(Json(analytics))
}
