//! Cheap checks before a file is decoded.

use std::io::Read;
use std::path::Path;

use crate::config::LimitsConfig;
use crate::error::PipelineError;

const MIB: u64 = 1024 * 1024;

/// Rejects oversized or unrecognizable files before decoding.
pub struct Validator {
    limits: LimitsConfig,
}

impl Validator {
    pub fn new(limits: LimitsConfig) -> Self {
        Self { limits }
    }

    /// Check the file size limit and the format signature.
    ///
    /// Returns the sniffed format name.
    pub fn validate(&self, path: &Path) -> Result<&'static str, PipelineError> {
        let decode_error = |message: String| PipelineError::Decode {
            path: path.to_path_buf(),
            message,
        };

        let metadata = std::fs::metadata(path)
            .map_err(|e| decode_error(format!("Cannot read metadata: {e}")))?;
        if metadata.len() > self.limits.max_file_size_mb * MIB {
            return Err(PipelineError::FileTooLarge {
                path: path.to_path_buf(),
                size_mb: metadata.len() / MIB,
                max_mb: self.limits.max_file_size_mb,
            });
        }

        let mut header = Vec::with_capacity(12);
        std::fs::File::open(path)
            .and_then(|file| file.take(12).read_to_end(&mut header))
            .map_err(|e| decode_error(format!("Cannot open file: {e}")))?;

        sniff_format(&header).ok_or_else(|| {
            decode_error("Unrecognized image format (invalid magic bytes)".to_string())
        })
    }

    /// Reject decoded dimensions above the configured maximum.
    pub fn check_dimensions(
        &self,
        path: &Path,
        width: u32,
        height: u32,
    ) -> Result<(), PipelineError> {
        let max_dim = self.limits.max_image_dimension;
        if width > max_dim || height > max_dim {
            return Err(PipelineError::ImageTooLarge {
                path: path.to_path_buf(),
                width,
                height,
                max_dim,
            });
        }
        Ok(())
    }
}

/// Name of the image format whose signature starts `header`.
pub fn sniff_format(header: &[u8]) -> Option<&'static str> {
    match header {
        [0xFF, 0xD8, 0xFF, ..] => Some("jpeg"),
        [0x89, b'P', b'N', b'G', ..] => Some("png"),
        [b'G', b'I', b'F', b'8', ..] => Some("gif"),
        [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => Some("webp"),
        [b'B', b'M', _, _, ..] => Some("bmp"),
        [b'I', b'I', 0x2A, 0x00, ..] | [b'M', b'M', 0x00, 0x2A, ..] => Some("tiff"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sniff_known_signatures() {
        assert_eq!(sniff_format(&[0xFF, 0xD8, 0xFF, 0xE0]), Some("jpeg"));
        assert_eq!(
            sniff_format(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]),
            Some("png")
        );
        assert_eq!(
            sniff_format(&[b'R', b'I', b'F', b'F', 0, 0, 0, 0, b'W', b'E', b'B', b'P']),
            Some("webp")
        );
        assert_eq!(sniff_format(&[b'I', b'I', 0x2A, 0x00]), Some("tiff"));
        assert_eq!(sniff_format(&[b'M', b'M', 0x00, 0x2A]), Some("tiff"));
    }

    #[test]
    fn test_sniff_rejects_unknown_and_truncated() {
        assert_eq!(sniff_format(&[0; 12]), None);
        assert_eq!(sniff_format(&[b'I', b'I', 0x00, 0x00]), None);
        assert_eq!(sniff_format(&[b'R', b'I', b'F', b'F', 0, 0]), None);
        assert_eq!(sniff_format(b"BM"), None);
        assert_eq!(sniff_format(&[]), None);
    }

    #[test]
    fn test_corrupt_file_is_a_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.png");
        std::fs::write(&path, b"definitely not a png").unwrap();

        let err = Validator::new(LimitsConfig::default())
            .validate(&path)
            .unwrap_err();
        assert!(matches!(err, PipelineError::Decode { .. }));
    }

    #[test]
    fn test_oversized_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.png");
        std::fs::write(&path, vec![0u8; (MIB + 1) as usize]).unwrap();

        let limits = LimitsConfig {
            max_file_size_mb: 1,
            ..LimitsConfig::default()
        };
        let err = Validator::new(limits).validate(&path).unwrap_err();
        assert!(matches!(err, PipelineError::FileTooLarge { max_mb: 1, .. }));
    }

    #[test]
    fn test_dimension_limit() {
        let limits = LimitsConfig {
            max_image_dimension: 100,
            ..LimitsConfig::default()
        };
        let validator = Validator::new(limits);
        assert!(validator.check_dimensions(Path::new("a.png"), 100, 40).is_ok());
        assert!(matches!(
            validator.check_dimensions(Path::new("a.png"), 101, 40),
            Err(PipelineError::ImageTooLarge { width: 101, .. })
        ));
    }
}
