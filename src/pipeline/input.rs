//! Input resolution: validate a caller-supplied path and load the document.
//!
//! DOCX is a zip container, so the cheapest meaningful validation before
//! handing bytes to the decomposer is the `PK\x03\x04` local-file-header
//! magic. Checking it here gives callers a targeted error instead of a
//! generic "not a readable zip" from deeper in the pipeline.

use crate::error::ImproveError;
use std::path::Path;
use tracing::debug;

/// Zip local file header magic; every DOCX starts with it.
const DOCX_MAGIC: [u8; 4] = [b'P', b'K', 0x03, 0x04];

/// Read and validate a DOCX file from a local path.
pub fn read_docx(path: impl AsRef<Path>) -> Result<Vec<u8>, ImproveError> {
    let path = path.as_ref();

    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(ImproveError::PermissionDenied {
                path: path.to_path_buf(),
            });
        }
        Err(_) => {
            return Err(ImproveError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
    };

    validate_magic(&bytes).map_err(|magic| ImproveError::NotADocx {
        path: path.to_path_buf(),
        magic,
    })?;

    debug!(path = %path.display(), size = bytes.len(), "Resolved input document");
    Ok(bytes)
}

/// Check the container magic on an in-memory payload.
///
/// Returns the offending leading bytes on failure so the error can show them.
pub fn validate_magic(bytes: &[u8]) -> Result<(), [u8; 4]> {
    let mut magic = [0u8; 4];
    let head = bytes.get(..4).unwrap_or(bytes);
    magic[..head.len()].copy_from_slice(head);
    if magic == DOCX_MAGIC {
        Ok(())
    } else {
        Err(magic)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn magic_accepts_zip_header() {
        assert!(validate_magic(b"PK\x03\x04rest-of-container").is_ok());
    }

    #[test]
    fn magic_rejects_other_content() {
        assert_eq!(validate_magic(b"%PDF-1.7"), Err([b'%', b'P', b'D', b'F']));
        assert_eq!(validate_magic(b""), Err([0, 0, 0, 0]));
        assert_eq!(validate_magic(b"PK"), Err([b'P', b'K', 0, 0]));
    }

    #[test]
    fn missing_file_is_reported() {
        let err = read_docx("/definitely/not/here.docx").unwrap_err();
        assert!(matches!(err, ImproveError::FileNotFound { .. }));
    }
}
