//! YOLO pose network exported to ONNX, run through ONNX Runtime.

use std::cmp::Ordering;
use std::path::Path;

use image::imageops::{self, FilterType};
use image::{Rgb, RgbImage};
use ndarray::{Array4, ArrayViewD};
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Tensor;
use tracing::{debug, info};

use super::keypoint::{Detection, KeypointName, RawKeypoint};
use super::model::PoseModel;
use super::PoseError;

pub const INPUT_SIZE: u32 = 640;
const PAD_VALUE: u8 = 114;
/// Minimum person score for a detection to be kept.
pub const DETECTION_CONFIDENCE: f32 = 0.25;
pub const NMS_IOU_THRESHOLD: f32 = 0.7;

/// `[1, 4 + 1 + 17 * 3, N]`: cx, cy, w, h, score, keypoints
const RAW_ROWS: usize = 4 + 1 + KeypointName::COUNT * 3;
/// `[1, N, 4 + 1 + 1 + 17 * 3]`: x1, y1, x2, y2, score, class, keypoints
const END2END_COLS: usize = 4 + 1 + 1 + KeypointName::COUNT * 3;

/// How an image was fitted into the square model input.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Letterbox {
    pub ratio: f32,
    pub pad_x: f32,
    pub pad_y: f32,
}

impl Letterbox {
    fn unmap(&self, x: f32, y: f32) -> (f32, f32) {
        ((x - self.pad_x) / self.ratio, (y - self.pad_y) / self.ratio)
    }
}

/// Resize keeping aspect ratio and pad to `size`x`size` with grey.
pub fn letterbox(image: &RgbImage, size: u32) -> (RgbImage, Letterbox) {
    let (w, h) = image.dimensions();
    let ratio = (size as f32 / w as f32).min(size as f32 / h as f32);
    let new_w = ((w as f32 * ratio).round() as u32).clamp(1, size);
    let new_h = ((h as f32 * ratio).round() as u32).clamp(1, size);

    let resized = imageops::resize(image, new_w, new_h, FilterType::Triangle);
    let pad_x = (size - new_w) / 2;
    let pad_y = (size - new_h) / 2;

    let mut canvas = RgbImage::from_pixel(size, size, Rgb([PAD_VALUE; 3]));
    imageops::overlay(&mut canvas, &resized, i64::from(pad_x), i64::from(pad_y));

    (
        canvas,
        Letterbox {
            ratio,
            pad_x: pad_x as f32,
            pad_y: pad_y as f32,
        },
    )
}

/// HWC u8 -> NCHW f32 in `[0, 1]`.
pub fn to_nchw(image: &RgbImage) -> Array4<f32> {
    let (w, h) = image.dimensions();
    let mut tensor = Array4::<f32>::zeros((1, 3, h as usize, w as usize));
    for (x, y, pixel) in image.enumerate_pixels() {
        for c in 0..3 {
            tensor[[0, c, y as usize, x as usize]] = f32::from(pixel[c]) / 255.0;
        }
    }
    tensor
}

fn iou(a: &[f32; 4], b: &[f32; 4]) -> f32 {
    let ix1 = a[0].max(b[0]);
    let iy1 = a[1].max(b[1]);
    let ix2 = a[2].min(b[2]);
    let iy2 = a[3].min(b[3]);
    let inter = (ix2 - ix1).max(0.0) * (iy2 - iy1).max(0.0);
    let area_a = (a[2] - a[0]).max(0.0) * (a[3] - a[1]).max(0.0);
    let area_b = (b[2] - b[0]).max(0.0) * (b[3] - b[1]).max(0.0);
    let union = area_a + area_b - inter;
    if union <= 0.0 {
        0.0
    } else {
        inter / union
    }
}

/// Greedy non-maximum suppression, highest score first.
pub fn nms(mut detections: Vec<Detection>, iou_threshold: f32) -> Vec<Detection> {
    detections.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
    let mut kept: Vec<Detection> = Vec::with_capacity(detections.len());
    for det in detections {
        if kept.iter().all(|k| iou(&k.bbox, &det.bbox) <= iou_threshold) {
            kept.push(det);
        }
    }
    kept
}

/// Decode a raw `[1, 56, N]` head. Boxes stay in model-input space.
pub fn decode_raw(output: &ArrayViewD<f32>, conf_threshold: f32) -> Vec<Detection> {
    let n = output.shape()[2];
    let mut detections = Vec::new();
    for i in 0..n {
        let score = output[[0, 4, i]];
        if score <= conf_threshold {
            continue;
        }
        let (cx, cy) = (output[[0, 0, i]], output[[0, 1, i]]);
        let (w, h) = (output[[0, 2, i]], output[[0, 3, i]]);
        let keypoints = (0..KeypointName::COUNT)
            .map(|k| {
                let base = 5 + k * 3;
                RawKeypoint::new(
                    output[[0, base, i]],
                    output[[0, base + 1, i]],
                    output[[0, base + 2, i]],
                )
            })
            .collect();
        detections.push(Detection {
            bbox: [cx - w / 2.0, cy - h / 2.0, cx + w / 2.0, cy + h / 2.0],
            score,
            keypoints,
        });
    }
    detections
}

/// Decode an NMS-free `[1, N, 57]` head. Boxes stay in model-input space.
pub fn decode_end2end(output: &ArrayViewD<f32>, conf_threshold: f32) -> Vec<Detection> {
    let n = output.shape()[1];
    let mut detections = Vec::new();
    for i in 0..n {
        let score = output[[0, i, 4]];
        if score <= conf_threshold {
            continue;
        }
        let keypoints = (0..KeypointName::COUNT)
            .map(|k| {
                let base = 6 + k * 3;
                RawKeypoint::new(
                    output[[0, i, base]],
                    output[[0, i, base + 1]],
                    output[[0, i, base + 2]],
                )
            })
            .collect();
        detections.push(Detection {
            bbox: [
                output[[0, i, 0]],
                output[[0, i, 1]],
                output[[0, i, 2]],
                output[[0, i, 3]],
            ],
            score,
            keypoints,
        });
    }
    detections
}

/// Decode either head layout and map results back to original pixels.
pub fn decode_output(
    output: &ArrayViewD<f32>,
    letterbox: &Letterbox,
    image_size: (u32, u32),
) -> Result<Vec<Detection>, PoseError> {
    let shape = output.shape();
    let detections = match shape {
        [1, RAW_ROWS, _] => nms(decode_raw(output, DETECTION_CONFIDENCE), NMS_IOU_THRESHOLD),
        [1, _, END2END_COLS] => decode_end2end(output, DETECTION_CONFIDENCE),
        other => {
            return Err(PoseError::Inference(format!(
                "unexpected output shape {other:?}"
            )))
        }
    };

    let (w, h) = (image_size.0 as f32, image_size.1 as f32);
    Ok(detections
        .into_iter()
        .map(|mut det| {
            let (x1, y1) = letterbox.unmap(det.bbox[0], det.bbox[1]);
            let (x2, y2) = letterbox.unmap(det.bbox[2], det.bbox[3]);
            det.bbox = [x1.clamp(0.0, w), y1.clamp(0.0, h), x2.clamp(0.0, w), y2.clamp(0.0, h)];
            for kp in &mut det.keypoints {
                let (x, y) = letterbox.unmap(kp.x, kp.y);
                kp.x = x;
                kp.y = y;
            }
            det
        })
        .collect())
}

pub struct OnnxPoseModel {
    session: Session,
}

impl OnnxPoseModel {
    pub fn load(model_path: &Path) -> Result<Self, PoseError> {
        if !model_path.is_file() {
            return Err(PoseError::ModelLoad(format!(
                "model file not found: {}",
                model_path.display()
            )));
        }

        let session = Session::builder()
            .map_err(|e| PoseError::ModelLoad(e.to_string()))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| PoseError::ModelLoad(e.to_string()))?
            .commit_from_file(model_path)
            .map_err(|e| PoseError::ModelLoad(format!("{}: {e}", model_path.display())))?;

        info!(model_path = %model_path.display(), "pose model loaded");
        Ok(Self { session })
    }
}

impl PoseModel for OnnxPoseModel {
    fn infer(&mut self, image: &RgbImage) -> Result<Vec<Detection>, PoseError> {
        let (canvas, lb) = letterbox(image, INPUT_SIZE);
        let input_tensor =
            Tensor::from_array(to_nchw(&canvas)).map_err(|e| PoseError::Inference(e.to_string()))?;

        let outputs = self
            .session
            .run(ort::inputs!["images" => input_tensor])
            .map_err(|e| PoseError::Inference(e.to_string()))?;

        let output: ArrayViewD<f32> = outputs["output0"]
            .try_extract_array()
            .map_err(|e| PoseError::Inference(e.to_string()))?;

        let detections = decode_output(&output, &lb, image.dimensions())?;
        debug!(
            shape = ?output.shape(),
            detections = detections.len(),
            "pose inference complete"
        );
        Ok(detections)
    }
}
