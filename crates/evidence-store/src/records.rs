//! Best-effort record counting for canonical JSON files
//!
//! The count is a statistic. Nothing here can fail a manifest build:
//! unreadable or malformed files count as zero.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::de::IgnoredAny;

/// Extension of files whose records are counted.
pub const RECORD_FILE_EXTENSION: &str = ".json";

/// Whether a relative path names a countable record file.
pub fn is_record_file(relative: &str) -> bool {
    relative.ends_with(RECORD_FILE_EXTENSION)
}

/// Number of elements in the top-level JSON array in `path`.
///
/// Anything else (object, scalar, bad JSON, I/O error) counts as 0.
pub fn count_records(path: &Path) -> u64 {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) => {
            log::debug!("record count: {}: {e}", path.display());
            return 0;
        }
    };
    // IgnoredAny skips element contents without building them
    match serde_json::from_reader::<_, Vec<IgnoredAny>>(BufReader::new(file)) {
        Ok(items) => items.len() as u64,
        Err(e) => {
            log::debug!("record count: {} is not a JSON array: {e}", path.display());
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &Path, name: &str, body: &str) -> std::path::PathBuf {
        let p = dir.join(name);
        std::fs::write(&p, body).unwrap();
        p
    }

    #[test]
    fn counts_array_elements() {
        let dir = tempfile::tempdir().unwrap();
        let p = write(dir.path(), "a.json", r#"[{"ts":"2026-02-01T00:00Z","eur_mwh":41.2},{"ts":"x"},3]"#);
        assert_eq!(count_records(&p), 3);
    }

    #[test]
    fn empty_array_is_zero() {
        let dir = tempfile::tempdir().unwrap();
        let p = write(dir.path(), "a.json", "[]");
        assert_eq!(count_records(&p), 0);
    }

    #[test]
    fn object_is_zero() {
        let dir = tempfile::tempdir().unwrap();
        let p = write(dir.path(), "a.json", r#"{"records":[1,2,3]}"#);
        assert_eq!(count_records(&p), 0);
    }

    #[test]
    fn malformed_is_zero() {
        let dir = tempfile::tempdir().unwrap();
        let p = write(dir.path(), "a.json", "[1, 2,");
        assert_eq!(count_records(&p), 0);
    }

    #[test]
    fn missing_is_zero() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(count_records(&dir.path().join("gone.json")), 0);
    }

    #[test]
    fn record_file_extension() {
        assert!(is_record_file("2026-02/se3.json"));
        assert!(!is_record_file("2026-02/se3.jsonl"));
        assert!(!is_record_file("2026-02/se3.JSON"));
    }
}
