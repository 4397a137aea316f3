//! Human pose detection: image in, normalized COCO keypoints and an
//! annotated preview out.

pub mod annotate;
pub mod keypoint;
pub mod model;
pub mod onnx;
pub mod service;

use thiserror::Error;

pub use keypoint::{Detection, KeypointName, Landmark, PersonKeypoints, RawKeypoint};
pub use model::{PoseModel, PoseModelLoader};
pub use onnx::OnnxPoseModel;
pub use service::{PoseResult, PoseService};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PoseError {
    #[error("model load failed: {0}")]
    ModelLoad(String),
    #[error("inference failed: {0}")]
    Inference(String),
    #[error("image encoding failed: {0}")]
    Encode(String),
    #[error("worker failed: {0}")]
    Worker(String),
}
