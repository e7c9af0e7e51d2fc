//! File I/O for the `read_file` and `write_file` builtins
//!
//! Host failures come back as message strings; the builtin layer wraps
//! them into language `Error` values so programs recover with `or { ... }`
//! instead of crashing the VM.

use std::fs;

/// Read an entire file as UTF-8.
pub fn read_file(path: &str) -> Result<String, String> {
    fs::read_to_string(path).map_err(|e| format!("read_file: '{}': {}", path, e))
}

/// Write (create or truncate) a file.
pub fn write_file(path: &str, contents: &str) -> Result<(), String> {
    fs::write(path, contents).map_err(|e| format!("write_file: '{}': {}", path, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.txt");
        let path = path.to_string_lossy();

        write_file(&path, "hello").unwrap();
        assert_eq!(read_file(&path).unwrap(), "hello");
    }

    #[test]
    fn test_missing_file_is_an_error_message() {
        let err = read_file("/no/such/file/anywhere").unwrap_err();
        assert!(err.contains("read_file"));
    }
}
