pub mod classifier;
pub mod ids;
pub mod scans;
