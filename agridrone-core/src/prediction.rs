//! Crop disease detection: pick an image, preview it, submit it, show the verdict.

use base64::{Engine as _, engine::general_purpose::STANDARD};
use std::{fs, io, path::Path, sync::Arc};
use thiserror::Error;
use tracing::{info, warn};

use crate::{
    api::AgriApi,
    client::FilePart,
    error::ValidationError,
    model::PredictionResult,
};

pub const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

pub const FALLBACK_ERROR: &str = "Failed to process image. Please try again.";

pub const BLIGHT_RECOMMENDATIONS: [&str; 6] = [
    "Isolate affected plants immediately",
    "Apply appropriate fungicide treatment",
    "Improve air circulation around crops",
    "Monitor weather conditions (high humidity favors blight)",
    "Consider crop rotation for next season",
    "Remove and dispose of severely affected plant parts",
];

pub const HEALTHY_NOTE: &str =
    "Your crop appears healthy! Continue monitoring regularly for early detection of any issues.";

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("failed to read image {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

/// An image loaded into memory, ready to upload.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageFile {
    file_name: String,
    mime: &'static str,
    bytes: Vec<u8>,
}

impl ImageFile {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Result<Self, ValidationError> {
        let file_name = file_name.into();
        let mime = mime_for(&file_name)
            .ok_or_else(|| ValidationError::UnsupportedImage(file_name.clone()))?;

        if bytes.len() > MAX_IMAGE_BYTES {
            return Err(ValidationError::ImageTooLarge {
                size: bytes.len(),
                max: MAX_IMAGE_BYTES,
            });
        }

        Ok(Self { file_name, mime, bytes })
    }

    /// Read an image from disk. Oversized files are rejected from their metadata, before reading.
    pub fn from_path(path: &Path) -> Result<Self, ImageError> {
        let io_err = |source| ImageError::Io {
            path: path.display().to_string(),
            source,
        };

        let size = fs::metadata(path).map_err(io_err)?.len();
        let size = usize::try_from(size).unwrap_or(usize::MAX);
        if size > MAX_IMAGE_BYTES {
            return Err(ValidationError::ImageTooLarge { size, max: MAX_IMAGE_BYTES }.into());
        }

        let bytes = fs::read(path).map_err(io_err)?;

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".to_string());

        Ok(Self::new(file_name, bytes)?)
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn mime(&self) -> &'static str {
        self.mime
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Inline `data:` URL for local preview.
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime, STANDARD.encode(&self.bytes))
    }

    pub fn to_part(&self, field: &str) -> FilePart {
        FilePart {
            field: field.to_string(),
            file_name: self.file_name.clone(),
            mime: self.mime.to_string(),
            bytes: self.bytes.clone(),
        }
    }
}

fn mime_for(file_name: &str) -> Option<&'static str> {
    let ext = Path::new(file_name).extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "webp" => Some("image/webp"),
        "gif" => Some("image/gif"),
        "bmp" => Some("image/bmp"),
        _ => None,
    }
}

/// Display fields for a prediction, optional ones only when present.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionView {
    pub headline: String,
    pub is_blight: bool,
    pub method: String,
    pub confidence: Option<String>,
    pub score: Option<String>,
}

impl PredictionView {
    pub fn recommendations(&self) -> &'static [&'static str] {
        if self.is_blight { &BLIGHT_RECOMMENDATIONS[..] } else { &[] }
    }

    pub fn status_note(&self) -> Option<&'static str> {
        (!self.is_blight).then_some(HEALTHY_NOTE)
    }
}

impl From<&PredictionResult> for PredictionView {
    fn from(r: &PredictionResult) -> Self {
        let headline = match &r.label {
            Some(label) if !label.is_empty() => label.clone(),
            _ if r.is_blight => "Blight Detected".to_string(),
            _ => "No Blight".to_string(),
        };

        Self {
            headline,
            is_blight: r.is_blight,
            method: r.method.clone().filter(|m| !m.is_empty()).unwrap_or_else(|| "model".to_string()),
            confidence: r.prob.map(percent),
            score: r.score.map(percent),
        }
    }
}

fn percent(fraction: f64) -> String {
    format!("{:.1}%", fraction * 100.0)
}

#[derive(Debug)]
pub struct PredictionSession {
    api: Arc<dyn AgriApi>,
    file: Option<ImageFile>,
    preview: Option<String>,
    result: Option<PredictionResult>,
    error: Option<String>,
    loading: bool,
}

impl PredictionSession {
    pub fn new(api: Arc<dyn AgriApi>) -> Self {
        Self {
            api,
            file: None,
            preview: None,
            result: None,
            error: None,
            loading: false,
        }
    }

    pub fn file(&self) -> Option<&ImageFile> {
        self.file.as_ref()
    }

    pub fn preview(&self) -> Option<&str> {
        self.preview.as_deref()
    }

    pub fn result(&self) -> Option<&PredictionResult> {
        self.result.as_ref()
    }

    pub fn view(&self) -> Option<PredictionView> {
        self.result.as_ref().map(PredictionView::from)
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn can_submit(&self) -> bool {
        self.file.is_some() && !self.loading
    }

    pub fn select_image(&mut self, file: ImageFile) {
        self.preview = Some(file.data_url());
        self.file = Some(file);
        self.result = None;
        self.error = None;
    }

    /// Load from disk and select. A rejected file leaves the current selection and shows why.
    pub fn select_path(&mut self, path: &Path) -> Result<(), ImageError> {
        match ImageFile::from_path(path) {
            Ok(file) => {
                self.select_image(file);
                Ok(())
            }
            Err(err) => {
                self.error = Some(err.to_string());
                Err(err)
            }
        }
    }

    pub fn clear(&mut self) {
        self.file = None;
        self.preview = None;
        self.result = None;
        self.error = None;
    }

    pub async fn submit(&mut self) -> Result<(), ValidationError> {
        if self.loading {
            return Err(ValidationError::RequestPending);
        }

        let Some(file) = self.file.clone() else {
            self.error = Some(ValidationError::NoImageSelected.to_string());
            return Err(ValidationError::NoImageSelected);
        };

        self.loading = true;
        self.error = None;

        match self.api.predict(&file).await {
            Ok(result) => {
                info!(file = file.file_name(), is_blight = result.is_blight, "prediction received");
                self.result = Some(result);
            }
            Err(err) => {
                warn!(file = file.file_name(), error = %err, "prediction error");
                self.error = Some(err.user_message(FALLBACK_ERROR));
            }
        }

        self.loading = false;
        Ok(())
    }
}
