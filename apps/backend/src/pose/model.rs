use image::RgbImage;

use super::keypoint::Detection;
use super::PoseError;

/// A loaded pose network. Implementations may keep mutable session state,
/// so calls are serialized by the owner.
pub trait PoseModel: Send {
    /// Detect people in `image`; coordinates are in `image` pixel space.
    fn infer(&mut self, image: &RgbImage) -> Result<Vec<Detection>, PoseError>;
}

/// Produces a model on first use.
pub trait PoseModelLoader: Send + Sync {
    fn load(&self) -> Result<Box<dyn PoseModel>, PoseError>;
}

impl<F> PoseModelLoader for F
where
    F: Fn() -> Result<Box<dyn PoseModel>, PoseError> + Send + Sync,
{
    fn load(&self) -> Result<Box<dyn PoseModel>, PoseError> {
        self()
    }
}
