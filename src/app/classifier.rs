use rand::seq::SliceRandom;
use rand::{thread_rng, Rng};
use std::path::{Path, PathBuf};

use crate::domain::scan::{LABELS, LABEL_NORMAL};

#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub label: String,
    pub confidence: f64,
}

/// Predict-by-path contract shared by the stub and any real model.
pub trait Classifier: Send + Sync {
    fn predict(&self, image_path: &Path) -> Prediction;
}

/// Placeholder model: picks a label at random and a confidence in `[0.7, 1.0)`.
/// It never reads the image.
#[derive(Debug, Clone, Default)]
pub struct StubClassifier {
    model_path: Option<PathBuf>,
}

impl StubClassifier {
    pub fn new(model_path: Option<PathBuf>) -> Self {
        if let Some(path) = &model_path {
            tracing::info!(model_path = %path.display(), "model path configured, stub classifier ignores it");
        }
        Self { model_path }
    }

    pub fn model_path(&self) -> Option<&Path> {
        self.model_path.as_deref()
    }
}

impl Classifier for StubClassifier {
    fn predict(&self, _image_path: &Path) -> Prediction {
        let mut rng = thread_rng();
        let label = LABELS.choose(&mut rng).copied().unwrap_or(LABEL_NORMAL);
        let raw: f64 = rng.gen_range(0.7..1.0);
        // Truncate rather than round so three decimals never reach 1.0.
        let confidence = (raw * 1000.0).floor() / 1000.0;

        Prediction {
            label: label.to_string(),
            confidence,
        }
    }
}
