//! Filesystem operations
//!
//! Thin wrappers over `std::fs` that attach the offending path to errors.

use std::path::Path;

use crate::error::FilesystemError;

/// Create a directory and all parent directories
pub fn create_dir_all(path: &Path) -> Result<(), FilesystemError> {
    std::fs::create_dir_all(path).map_err(|e| FilesystemError::CreateDir {
        path: path.to_path_buf(),
        error: e.to_string(),
    })
}

/// Remove a directory and all its contents, if it exists
pub fn remove_dir_all(path: &Path) -> Result<bool, FilesystemError> {
    if !path.exists() {
        return Ok(false);
    }
    std::fs::remove_dir_all(path).map_err(|e| FilesystemError::RemoveDir {
        path: path.to_path_buf(),
        error: e.to_string(),
    })?;
    Ok(true)
}

/// Write content to a file, creating parent directories
pub fn write_file(path: &Path, content: &str) -> Result<(), FilesystemError> {
    if let Some(parent) = path.parent() {
        create_dir_all(parent)?;
    }
    std::fs::write(path, content).map_err(|e| FilesystemError::WriteFile {
        path: path.to_path_buf(),
        error: e.to_string(),
    })
}

/// Copy a file, creating the destination's parent directories
pub fn copy_file(from: &Path, to: &Path) -> Result<(), FilesystemError> {
    if let Some(parent) = to.parent() {
        create_dir_all(parent)?;
    }
    std::fs::copy(from, to)
        .map(|_| ())
        .map_err(|e| FilesystemError::Copy {
            from: from.to_path_buf(),
            to: to.to_path_buf(),
            error: e.to_string(),
        })
}

/// Move a file, creating the destination's parent directories
///
/// Falls back to copy-then-remove when a rename is not possible
/// (for example across filesystems).
pub fn move_file(from: &Path, to: &Path) -> Result<(), FilesystemError> {
    if let Some(parent) = to.parent() {
        create_dir_all(parent)?;
    }
    if std::fs::rename(from, to).is_ok() {
        return Ok(());
    }

    let move_error = |e: std::io::Error| FilesystemError::Move {
        from: from.to_path_buf(),
        to: to.to_path_buf(),
        error: e.to_string(),
    };
    std::fs::copy(from, to).map_err(move_error)?;
    std::fs::remove_file(from).map_err(move_error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_file_creates_parents() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("a/b/c.txt");

        write_file(&path, "hello").unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "hello");
    }

    #[test]
    fn test_remove_missing_directory_is_noop() {
        let temp = TempDir::new().unwrap();
        assert!(!remove_dir_all(&temp.path().join("missing")).unwrap());
    }

    #[test]
    fn test_move_file_removes_source() {
        let temp = TempDir::new().unwrap();
        let from = temp.path().join("staging/lib/x.mpy");
        let to = temp.path().join("live/lib/x.mpy");
        write_file(&from, "bytes").unwrap();

        move_file(&from, &to).unwrap();

        assert!(!from.exists());
        assert_eq!(std::fs::read_to_string(&to).unwrap(), "bytes");
    }

    #[test]
    fn test_copy_file_reports_missing_source() {
        let temp = TempDir::new().unwrap();
        let result = copy_file(&temp.path().join("nope"), &temp.path().join("out"));
        assert!(matches!(result, Err(FilesystemError::Copy { .. })));
    }
}
