use rand::{thread_rng, Rng};

use crate::domain::scan::SCAN_ID_LEN;

/// Source of scan identifiers.
pub trait IdGenerator: Send + Sync {
    fn next_id(&self) -> String;
}

/// Random lowercase hex identifiers. Collisions are not checked.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomIds;

impl IdGenerator for RandomIds {
    fn next_id(&self) -> String {
        let mut bytes = [0u8; (SCAN_ID_LEN + 1) / 2];
        thread_rng().fill(&mut bytes[..]);
        let mut id = hex::encode(bytes);
        id.truncate(SCAN_ID_LEN);
        id
    }
}
