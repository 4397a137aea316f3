use std::fmt;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::annotate::{draw_detections, encode_jpeg_base64};
use super::keypoint::{flatten, normalize_detections, PersonKeypoints};
use super::model::{PoseModel, PoseModelLoader};
use super::onnx::OnnxPoseModel;
use super::PoseError;
use crate::config::app::PoseConfig;

/// Response body of a detection call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PoseResult {
    /// `[x_norm, y_norm, confidence]` for every kept landmark, person by person
    pub keypoints: Vec<[f32; 3]>,
    pub image_width: u32,
    pub image_height: u32,
    pub num_persons: usize,
    pub annotated_image_base64: String,
    pub persons: Vec<PersonKeypoints>,
}

impl PoseResult {
    /// Result for input that could not be decoded as an image.
    pub fn empty() -> Self {
        Self {
            keypoints: Vec::new(),
            image_width: 0,
            image_height: 0,
            num_persons: 0,
            annotated_image_base64: String::new(),
            persons: Vec::new(),
        }
    }
}

/// Owns the pose model. Loads it on first use and serializes inference.
///
/// A failed load is not cached; the next call tries again.
pub struct PoseService {
    loader: Arc<dyn PoseModelLoader>,
    model: OnceCell<Mutex<Box<dyn PoseModel>>>,
}

impl fmt::Debug for PoseService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoseService")
            .field("loaded", &self.is_loaded())
            .finish()
    }
}

impl PoseService {
    pub fn new(loader: Arc<dyn PoseModelLoader>) -> Self {
        Self {
            loader,
            model: OnceCell::new(),
        }
    }

    /// Service backed by the ONNX model at `config.model_path`.
    pub fn onnx(config: &PoseConfig) -> Self {
        let path = config.model_path.clone();
        Self::new(Arc::new(move || {
            OnnxPoseModel::load(&path).map(|m| Box::new(m) as Box<dyn PoseModel>)
        }))
    }

    pub fn is_loaded(&self) -> bool {
        self.model.get().is_some()
    }

    fn model(&self) -> Result<&Mutex<Box<dyn PoseModel>>, PoseError> {
        self.model.get_or_try_init(|| {
            let model = self.loader.load().map_err(|e| {
                warn!(error = %e, "pose model load failed");
                e
            })?;
            info!("pose model ready");
            Ok(Mutex::new(model))
        })
    }

    pub fn preload(&self) -> Result<(), PoseError> {
        self.model().map(|_| ())
    }

    /// Blocking. Run on a worker thread (`web::block`).
    pub fn detect(&self, image_bytes: &[u8]) -> Result<PoseResult, PoseError> {
        let image = match image::load_from_memory(image_bytes) {
            Ok(img) => img.to_rgb8(),
            Err(e) => {
                debug!(error = %e, bytes = image_bytes.len(), "image decode failed");
                return Ok(PoseResult::empty());
            }
        };
        let (width, height) = image.dimensions();

        let detections = self.model()?.lock().infer(&image)?;

        let persons = normalize_detections(&detections, width, height);
        for person in &persons {
            for l in &person.landmarks {
                debug!(
                    person = person.person_index,
                    name = l.name,
                    x = l.x,
                    y = l.y,
                    confidence = l.confidence,
                    "keypoint"
                );
            }
        }

        let annotated = draw_detections(&image, &detections);
        let annotated_image_base64 = encode_jpeg_base64(&annotated)?;

        Ok(PoseResult {
            keypoints: flatten(&persons),
            image_width: width,
            image_height: height,
            num_persons: detections.len(),
            annotated_image_base64,
            persons,
        })
    }
}
