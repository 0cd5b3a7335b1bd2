use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Label the classifier uses for a positive finding.
pub const LABEL_TUMOR: &str = "Tumor";
pub const LABEL_NORMAL: &str = "Normal";

pub const LABELS: [&str; 2] = [LABEL_TUMOR, LABEL_NORMAL];

/// Length of the hex scan identifier exposed in URLs.
pub const SCAN_ID_LEN: usize = 9;

/// One uploaded scan and its derived fields, as stored.
#[derive(Debug, Clone)]
pub struct Scan {
    pub id: String,
    pub filename: String,
    pub file_size: i64,
    pub upload_date: OffsetDateTime,
    pub image_url: String,
    pub prediction: String,
    pub confidence: f64,
    pub format: String,
    pub dimensions: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanResponse {
    pub id: String,
    pub filename: String,
    pub file_size: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub upload_date: OffsetDateTime,
    pub image_url: String,
    pub prediction: String,
    pub confidence: f64,
    pub processed: bool,
    pub metadata: ScanMetadata,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanMetadata {
    pub dimensions: String,
    pub format: String,
    pub size: String,
}

impl From<Scan> for ScanResponse {
    fn from(scan: Scan) -> Self {
        let size = format_size_kb(scan.file_size);
        Self {
            id: scan.id,
            filename: scan.filename,
            file_size: scan.file_size,
            upload_date: scan.upload_date,
            image_url: scan.image_url,
            prediction: scan.prediction,
            confidence: scan.confidence,
            processed: true,
            metadata: ScanMetadata {
                dimensions: scan.dimensions,
                format: scan.format,
                size,
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Analytics {
    pub total_scans: i64,
    pub tumor_detected: i64,
    pub normal_scans: i64,
    pub accuracy: f64,
}

impl Analytics {
    /// Builds the aggregate from the two counts. `accuracy` is
    /// `(normal + tumor) / total * 100` rounded to one decimal, which is
    /// 100.0 for any non-empty table and 0 otherwise.
    pub fn from_counts(total_scans: i64, tumor_detected: i64) -> Self {
        let normal_scans = total_scans - tumor_detected;
        let accuracy = if total_scans > 0 {
            let ratio = (normal_scans + tumor_detected) as f64 / total_scans as f64 * 100.0;
            (ratio * 10.0).round() / 10.0
        } else {
            0.0
        };

        Self {
            total_scans,
            tumor_detected,
            normal_scans,
            accuracy,
        }
    }
}

/// Human readable size in kilobytes with one decimal, e.g. `"12.3 KB"`.
pub fn format_size_kb(bytes: i64) -> String {
    format!("{:.1} KB", bytes as f64 / 1024.0)
}
