//! Input screenshot and run hints

use crate::error::PipelineError;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::io::Cursor;
use std::path::{Path, PathBuf};

/// Value used for hints the caller did not supply
pub const NOT_SPECIFIED: &str = "Not specified";

/// Optional context supplied alongside the screenshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextHints {
    pub interface_type: String,
    pub user_scenario: String,
}

impl ContextHints {
    /// Blank or missing hints become [`NOT_SPECIFIED`]
    pub fn new(interface_type: Option<String>, user_scenario: Option<String>) -> Self {
        let normalize = |hint: Option<String>| {
            hint.map(|h| h.trim().to_string())
                .filter(|h| !h.is_empty())
                .unwrap_or_else(|| NOT_SPECIFIED.to_string())
        };
        Self {
            interface_type: normalize(interface_type),
            user_scenario: normalize(user_scenario),
        }
    }
}

impl Default for ContextHints {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// Input fingerprint recorded in the manifest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputRecord {
    pub path: PathBuf,
    pub format: String,
    pub width: u32,
    pub height: u32,
    pub byte_len: u64,
    /// Lowercase hex SHA-256 of the file bytes
    pub sha256: String,
}

/// Screenshot loaded into memory
#[derive(Debug, Clone)]
pub struct ScreenImage {
    pub path: PathBuf,
    pub bytes: Vec<u8>,
    pub format: image::ImageFormat,
    pub width: u32,
    pub height: u32,
}

impl ScreenImage {
    /// Read and probe an image file
    ///
    /// Missing, unreadable, unrecognized or zero-sized images are
    /// [`PipelineError::FatalInput`].
    pub async fn load(path: &Path) -> Result<Self, PipelineError> {
        let bytes = tokio::fs::read(path).await.map_err(|e| {
            PipelineError::FatalInput(format!("Cannot read {}: {}", path.display(), e))
        })?;
        Self::from_bytes(path.to_path_buf(), bytes)
    }

    /// Probe in-memory image bytes
    pub fn from_bytes(path: PathBuf, bytes: Vec<u8>) -> Result<Self, PipelineError> {
        let reader = image::ImageReader::new(Cursor::new(&bytes))
            .with_guessed_format()
            .map_err(|e| PipelineError::FatalInput(format!("{}: {}", path.display(), e)))?;

        let format = reader.format().ok_or_else(|| {
            PipelineError::FatalInput(format!("{}: unrecognized image format", path.display()))
        })?;

        let (width, height) = reader
            .into_dimensions()
            .map_err(|e| PipelineError::FatalInput(format!("{}: {}", path.display(), e)))?;

        if width == 0 || height == 0 {
            return Err(PipelineError::FatalInput(format!(
                "{}: image has zero size ({}x{})",
                path.display(),
                width,
                height
            )));
        }

        Ok(Self {
            path,
            bytes,
            format,
            width,
            height,
        })
    }

    /// MIME type sent to inference services
    pub fn mime_type(&self) -> &'static str {
        self.format.to_mime_type()
    }

    /// Lowercase hex SHA-256 of the file bytes
    pub fn sha256(&self) -> String {
        format!("{:x}", Sha256::digest(&self.bytes))
    }

    /// Decode pixels
    pub fn decode(&self) -> image::ImageResult<image::DynamicImage> {
        image::load_from_memory_with_format(&self.bytes, self.format)
    }

    pub fn record(&self) -> InputRecord {
        InputRecord {
            path: self.path.clone(),
            format: self
                .format
                .extensions_str()
                .first()
                .copied()
                .unwrap_or("unknown")
                .to_string(),
            width: self.width,
            height: self.height,
            byte_len: self.bytes.len() as u64,
            sha256: self.sha256(),
        }
    }
}
