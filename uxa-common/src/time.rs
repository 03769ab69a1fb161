//! Timestamp and run identifier utilities

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Compact sortable stamp used in run directory names (`20250101_120000`)
pub fn run_stamp(at: DateTime<Utc>) -> String {
    at.format("%Y%m%d_%H%M%S").to_string()
}

/// Unique run identifier: timestamp plus a random suffix
///
/// Two runs started in the same second still get distinct identifiers.
pub fn new_run_id(at: DateTime<Utc>) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("run_{}_{}", run_stamp(at), &suffix[..8])
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_run_stamp_format() {
        let at = Utc.with_ymd_and_hms(2025, 3, 7, 9, 5, 1).unwrap();
        assert_eq!(run_stamp(at), "20250307_090501");
    }

    #[test]
    fn test_run_ids_are_unique_within_same_second() {
        let at = Utc::now();
        let a = new_run_id(at);
        let b = new_run_id(at);
        assert_ne!(a, b);
        assert!(a.starts_with("run_"));
        assert_eq!(a.len(), "run_".len() + 15 + 1 + 8);
    }
}
