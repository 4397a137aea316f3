#![allow(dead_code)]

use std::sync::Arc;

use image::RgbImage;
use walls_backend::pose::{Detection, PoseError, PoseModel, PoseService, RawKeypoint};

/// Confidence given to the two ankle keypoints; below the keep threshold.
pub const LOW_CONFIDENCE: f32 = 0.2;
pub const HIGH_CONFIDENCE: f32 = 0.9;
/// Keypoints the single-person stub reports above the threshold.
pub const KEPT_KEYPOINTS: usize = 15;

/// Model with scripted output, sized to whatever frame it is given.
pub enum StubPoseModel {
    /// One person. The nose sits left of the frame so clamping is visible;
    /// the ankles are low confidence.
    SinglePerson,
    /// Nobody in frame.
    Nobody,
    /// Inference always fails.
    Broken,
}

impl StubPoseModel {
    fn person(width: f32, height: f32) -> Detection {
        let keypoints = (0..17)
            .map(|i| {
                let confidence = if i >= 15 { LOW_CONFIDENCE } else { HIGH_CONFIDENCE };
                let x = if i == 0 {
                    -5.0
                } else {
                    width * (i as f32 + 1.0) / 18.0
                };
                RawKeypoint {
                    x,
                    y: height / 2.0,
                    confidence,
                }
            })
            .collect();
        Detection {
            bbox: [0.0, 0.0, width, height],
            score: 0.95,
            keypoints,
        }
    }
}

impl PoseModel for StubPoseModel {
    fn infer(&mut self, image: &RgbImage) -> Result<Vec<Detection>, PoseError> {
        let (w, h) = image.dimensions();
        match self {
            StubPoseModel::SinglePerson => Ok(vec![Self::person(w as f32, h as f32)]),
            StubPoseModel::Nobody => Ok(Vec::new()),
            StubPoseModel::Broken => Err(PoseError::Inference("stub exploded".into())),
        }
    }
}

fn service_for(kind: fn() -> StubPoseModel) -> Arc<PoseService> {
    Arc::new(PoseService::new(Arc::new(
        move || -> Result<Box<dyn PoseModel>, PoseError> { Ok(Box::new(kind())) },
    )))
}

pub fn single_person_service() -> Arc<PoseService> {
    service_for(|| StubPoseModel::SinglePerson)
}

pub fn empty_scene_service() -> Arc<PoseService> {
    service_for(|| StubPoseModel::Nobody)
}

pub fn broken_inference_service() -> Arc<PoseService> {
    service_for(|| StubPoseModel::Broken)
}

/// Loader that never finds its model file.
pub fn missing_model_service() -> Arc<PoseService> {
    Arc::new(PoseService::new(Arc::new(
        || -> Result<Box<dyn PoseModel>, PoseError> {
            Err(PoseError::ModelLoad(
                "model file not found: /nonexistent/pose.onnx".into(),
            ))
        },
    )))
}
