pub mod app;
pub mod config;
pub mod domain;
pub mod http;
pub mod infra;

use std::sync::Arc;

use crate::app::{classifier::Classifier, ids::IdGenerator};
use crate::infra::{db::Db, storage::MediaStore};

#[derive(Clone)]
pub struct AppState {
    pub db: Db,
    pub media: MediaStore,
    pub classifier: Arc<dyn Classifier>,
    pub ids: Arc<dyn IdGenerator>,
    pub cors_origins: Vec<String>,
    pub upload_max_bytes: usize,
}
