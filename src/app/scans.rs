use anyhow::anyhow;
use bytes::Bytes;
use image::ImageFormat;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use time::OffsetDateTime;
use tracing::{info, warn};

use crate::app::classifier::Classifier;
use crate::app::ids::IdGenerator;
use crate::domain::scan::{Analytics, Scan, LABEL_TUMOR};
use crate::infra::{db::Db, storage::MediaStore};

const SCAN_COLUMNS: &str = "scan_id, filename, file_size, upload_date_ns, image_url, \
                            prediction, confidence, format, dimensions";

#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error("{0}")]
    InvalidInput(String),
    #[error("scan not found")]
    NotFound,
    #[error("storage failure: {0:#}")]
    Storage(#[from] anyhow::Error),
}

impl From<sqlx::Error> for ScanError {
    fn from(err: sqlx::Error) -> Self {
        Self::Storage(err.into())
    }
}

/// A file received from the client, fully buffered.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub filename: String,
    pub content_type: Option<String>,
    pub data: Bytes,
}

#[derive(Clone)]
pub struct ScanService {
    db: Db,
    media: MediaStore,
    classifier: Arc<dyn Classifier>,
    ids: Arc<dyn IdGenerator>,
}

impl ScanService {
    pub fn new(
        db: Db,
        media: MediaStore,
        classifier: Arc<dyn Classifier>,
        ids: Arc<dyn IdGenerator>,
    ) -> Self {
        Self {
            db,
            media,
            classifier,
            ids,
        }
    }

    /// Stores the file, classifies it and records the scan. Nothing is
    /// written when the content type is not `image/*`.
    pub async fn upload(&self, file: UploadedFile) -> Result<Scan, ScanError> {
        let content_type = match file.content_type.as_deref() {
            Some(content_type) if content_type.starts_with("image/") => content_type.to_string(),
            _ => {
                return Err(ScanError::InvalidInput(
                    "Invalid file type. Please upload an image.".to_string(),
                ))
            }
        };

        let scan_id = self.ids.next_id();
        let stored_name = format!("{}{}", scan_id, lowercase_extension(&file.filename));
        let path = self.media.write(&stored_name, &file.data).await?;

        let (format, dimensions) = match probe_image_blocking(path.clone()).await {
            Ok(probed) => probed,
            Err(err) => {
                warn!(error = %err, scan_id = %scan_id, "could not read image metadata");
                (content_type, String::new())
            }
        };

        let prediction = self.classifier.predict(&path);

        let scan = Scan {
            id: scan_id,
            filename: file.filename,
            file_size: file.data.len() as i64,
            upload_date: OffsetDateTime::now_utc(),
            image_url: self.media.public_url(&stored_name),
            prediction: prediction.label,
            confidence: prediction.confidence,
            format,
            dimensions,
        };

        if let Err(err) = self.insert(&scan).await {
            if let Err(cleanup_err) = self.media.remove(&stored_name).await {
                warn!(error = ?cleanup_err, scan_id = %scan.id, "failed to remove orphaned media file");
            }
            return Err(err);
        }

        info!(
            scan_id = %scan.id,
            bytes = scan.file_size,
            prediction = %scan.prediction,
            "scan uploaded"
        );
        Ok(scan)
    }

    /// Every scan, most recent first.
    pub async fn list(&self) -> Result<Vec<Scan>, ScanError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM scans ORDER BY upload_date_ns DESC, id DESC",
            SCAN_COLUMNS
        ))
        .fetch_all(self.db.pool())
        .await?;

        rows.iter().map(scan_from_row).collect()
    }

    pub async fn get(&self, scan_id: &str) -> Result<Scan, ScanError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM scans WHERE scan_id = ?",
            SCAN_COLUMNS
        ))
        .bind(scan_id)
        .fetch_optional(self.db.pool())
        .await?;

        match row {
            Some(row) => scan_from_row(&row),
            None => Err(ScanError::NotFound),
        }
    }

    pub async fn analytics(&self) -> Result<Analytics, ScanError> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM scans")
            .fetch_one(self.db.pool())
            .await?;
        let tumor: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM scans WHERE prediction = ?")
            .bind(LABEL_TUMOR)
            .fetch_one(self.db.pool())
            .await?;

        Ok(Analytics::from_counts(total, tumor))
    }

    async fn insert(&self, scan: &Scan) -> Result<(), ScanError> {
        sqlx::query(
            "INSERT INTO scans (scan_id, filename, file_size, upload_date_ns, image_url, \
             prediction, confidence, format, dimensions) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&scan.id)
        .bind(&scan.filename)
        .bind(scan.file_size)
        .bind(to_unix_nanos(scan.upload_date)?)
        .bind(&scan.image_url)
        .bind(&scan.prediction)
        .bind(scan.confidence)
        .bind(&scan.format)
        .bind(&scan.dimensions)
        .execute(self.db.pool())
        .await?;
        Ok(())
    }
}

fn scan_from_row(row: &SqliteRow) -> Result<Scan, ScanError> {
    Ok(Scan {
        id: row.try_get("scan_id")?,
        filename: row.try_get("filename")?,
        file_size: row.try_get("file_size")?,
        upload_date: from_unix_nanos(row.try_get("upload_date_ns")?)?,
        image_url: row.try_get("image_url")?,
        prediction: row.try_get("prediction")?,
        confidence: row.try_get("confidence")?,
        format: row.try_get("format")?,
        dimensions: row.try_get("dimensions")?,
    })
}

/// Upload times are stored as integer nanoseconds so SQL ordering is
/// chronological.
fn to_unix_nanos(timestamp: OffsetDateTime) -> anyhow::Result<i64> {
    i64::try_from(timestamp.unix_timestamp_nanos())
        .map_err(|_| anyhow!("upload date out of range: {}", timestamp))
}

fn from_unix_nanos(nanos: i64) -> anyhow::Result<OffsetDateTime> {
    Ok(OffsetDateTime::from_unix_timestamp_nanos(i128::from(nanos))?)
}

/// `".png"` for `"Brain.PNG"`, empty when there is no extension.
fn lowercase_extension(filename: &str) -> String {
    Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| format!(".{}", ext.to_lowercase()))
        .unwrap_or_default()
}

async fn probe_image_blocking(path: PathBuf) -> anyhow::Result<(String, String)> {
    tokio::task::spawn_blocking(move || probe_image(&path)).await?
}

/// Reads the header of a stored image and returns `(format, "WIDTHxHEIGHT")`.
fn probe_image(path: &Path) -> anyhow::Result<(String, String)> {
    let reader = image::ImageReader::open(path)?.with_guessed_format()?;
    let format = reader
        .format()
        .ok_or_else(|| anyhow!("unrecognized image format"))?;
    let (width, height) = reader.into_dimensions()?;
    Ok((format_name(format), format!("{}x{}", width, height)))
}

fn format_name(format: ImageFormat) -> String {
    match format {
        ImageFormat::Png => "PNG".to_string(),
        ImageFormat::Jpeg => "JPEG".to_string(),
        ImageFormat::Gif => "GIF".to_string(),
        ImageFormat::WebP => "WEBP".to_string(),
        ImageFormat::Bmp => "BMP".to_string(),
        ImageFormat::Tiff => "TIFF".to_string(),
        ImageFormat::Ico => "ICO".to_string(),
        ImageFormat::Tga => "TGA".to_string(),
        ImageFormat::Pnm => "PPM".to_string(),
        other => format!("{:?}", other).to_uppercase(),
    }
}
