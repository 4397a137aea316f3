//! Skeleton overlay and JPEG/base64 encoding of the preview image.

use base64::Engine as _;
use image::codecs::jpeg::JpegEncoder;
use image::{Rgb, RgbImage};

use super::keypoint::{Detection, KeypointName};
use super::PoseError;

/// Keypoints below this confidence are not drawn.
pub const DRAW_CONFIDENCE: f32 = 0.5;
pub const JPEG_QUALITY: u8 = 95;
const JOINT_RADIUS: i32 = 4;
const BOX_COLOR: Rgb<u8> = Rgb([255, 56, 56]);

/// COCO limb pairs (keypoint indices).
pub const SKELETON: [[usize; 2]; 19] = [
    [15, 13],
    [13, 11],
    [16, 14],
    [14, 12],
    [11, 12],
    [5, 11],
    [6, 12],
    [5, 6],
    [5, 7],
    [6, 8],
    [7, 9],
    [8, 10],
    [1, 2],
    [0, 1],
    [0, 2],
    [1, 3],
    [2, 4],
    [3, 5],
    [4, 6],
];

const POSE_PALETTE: [[u8; 3]; 20] = [
    [255, 128, 0],
    [255, 153, 51],
    [255, 178, 102],
    [230, 230, 0],
    [255, 153, 255],
    [153, 204, 255],
    [255, 102, 255],
    [255, 51, 255],
    [102, 178, 255],
    [51, 153, 255],
    [255, 153, 153],
    [255, 102, 102],
    [255, 51, 51],
    [153, 255, 153],
    [102, 255, 102],
    [51, 255, 51],
    [0, 255, 0],
    [0, 0, 255],
    [255, 0, 0],
    [255, 255, 255],
];

// legs orange, arms blue, face green
const LIMB_COLOR_INDICES: [usize; 19] = [0, 0, 0, 0, 7, 7, 7, 9, 9, 9, 9, 9, 16, 16, 16, 16, 16, 16, 16];
const KPT_COLOR_INDICES: [usize; KeypointName::COUNT] =
    [16, 16, 16, 16, 16, 9, 9, 9, 9, 9, 9, 0, 0, 0, 0, 0, 0];

fn palette(index: usize) -> Rgb<u8> {
    Rgb(POSE_PALETTE[index])
}

fn line_width(image: &RgbImage) -> i32 {
    let (w, h) = image.dimensions();
    (((w + h) as f32 / 2.0 * 0.003).round() as i32).max(2)
}

fn put_pixel(image: &mut RgbImage, x: i32, y: i32, color: Rgb<u8>) {
    if x >= 0 && y >= 0 && (x as u32) < image.width() && (y as u32) < image.height() {
        image.put_pixel(x as u32, y as u32, color);
    }
}

fn fill_disc(image: &mut RgbImage, cx: i32, cy: i32, radius: i32, color: Rgb<u8>) {
    let r2 = radius * radius;
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            if dx * dx + dy * dy <= r2 {
                put_pixel(image, cx + dx, cy + dy, color);
            }
        }
    }
}

/// Bresenham line stamped with a disc for thickness.
fn draw_line(image: &mut RgbImage, from: (i32, i32), to: (i32, i32), width: i32, color: Rgb<u8>) {
    let radius = (width / 2).max(0);
    let (mut x, mut y) = from;
    let dx = (to.0 - x).abs();
    let dy = -(to.1 - y).abs();
    let sx = if x < to.0 { 1 } else { -1 };
    let sy = if y < to.1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        fill_disc(image, x, y, radius, color);
        if (x, y) == to {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x += sx;
        }
        if e2 <= dx {
            err += dx;
            y += sy;
        }
    }
}

fn in_bounds(image: &RgbImage, x: f32, y: f32) -> bool {
    x >= 0.0 && y >= 0.0 && x < image.width() as f32 && y < image.height() as f32
}

/// Draw box, limbs and joints for every detection onto a copy of `image`.
pub fn draw_detections(image: &RgbImage, detections: &[Detection]) -> RgbImage {
    let mut canvas = image.clone();
    let lw = line_width(image);

    for det in detections {
        let [x1, y1, x2, y2] = det.bbox.map(|v| v.round() as i32);
        for (a, b) in [
            ((x1, y1), (x2, y1)),
            ((x2, y1), (x2, y2)),
            ((x2, y2), (x1, y2)),
            ((x1, y2), (x1, y1)),
        ] {
            draw_line(&mut canvas, a, b, lw, BOX_COLOR);
        }

        let visible = |idx: usize| {
            det.keypoints
                .get(idx)
                .filter(|kp| kp.confidence >= DRAW_CONFIDENCE && in_bounds(image, kp.x, kp.y))
        };

        for (limb, &[a, b]) in SKELETON.iter().enumerate() {
            if let (Some(p), Some(q)) = (visible(a), visible(b)) {
                draw_line(
                    &mut canvas,
                    (p.x.round() as i32, p.y.round() as i32),
                    (q.x.round() as i32, q.y.round() as i32),
                    lw,
                    palette(LIMB_COLOR_INDICES[limb]),
                );
            }
        }

        for idx in 0..KeypointName::COUNT {
            if let Some(kp) = visible(idx) {
                fill_disc(
                    &mut canvas,
                    kp.x.round() as i32,
                    kp.y.round() as i32,
                    JOINT_RADIUS,
                    palette(KPT_COLOR_INDICES[idx]),
                );
            }
        }
    }

    canvas
}

pub fn encode_jpeg_base64(image: &RgbImage) -> Result<String, PoseError> {
    let mut buf = Vec::new();
    JpegEncoder::new_with_quality(&mut buf, JPEG_QUALITY)
        .encode_image(image)
        .map_err(|e| PoseError::Encode(e.to_string()))?;
    Ok(base64::engine::general_purpose::STANDARD.encode(&buf))
}
