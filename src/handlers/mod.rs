pub mod scan;

pub use scan::{ScanOptions, ScanReport, Source, handle_scan, handle_snapshot, sanitize_cluster};
