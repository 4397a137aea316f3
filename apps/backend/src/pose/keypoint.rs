use serde::Serialize;

/// Landmarks at or below this confidence are left out of the response.
pub const KEYPOINT_CONFIDENCE_THRESHOLD: f32 = 0.25;

/// The 17 COCO keypoints, in model output order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum KeypointName {
    Nose = 0,
    LeftEye = 1,
    RightEye = 2,
    LeftEar = 3,
    RightEar = 4,
    LeftShoulder = 5,
    RightShoulder = 6,
    LeftElbow = 7,
    RightElbow = 8,
    LeftWrist = 9,
    RightWrist = 10,
    LeftHip = 11,
    RightHip = 12,
    LeftKnee = 13,
    RightKnee = 14,
    LeftAnkle = 15,
    RightAnkle = 16,
}

impl KeypointName {
    pub const COUNT: usize = 17;

    pub const ALL: [KeypointName; Self::COUNT] = [
        Self::Nose,
        Self::LeftEye,
        Self::RightEye,
        Self::LeftEar,
        Self::RightEar,
        Self::LeftShoulder,
        Self::RightShoulder,
        Self::LeftElbow,
        Self::RightElbow,
        Self::LeftWrist,
        Self::RightWrist,
        Self::LeftHip,
        Self::RightHip,
        Self::LeftKnee,
        Self::RightKnee,
        Self::LeftAnkle,
        Self::RightAnkle,
    ];

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Nose => "nose",
            Self::LeftEye => "left_eye",
            Self::RightEye => "right_eye",
            Self::LeftEar => "left_ear",
            Self::RightEar => "right_ear",
            Self::LeftShoulder => "left_shoulder",
            Self::RightShoulder => "right_shoulder",
            Self::LeftElbow => "left_elbow",
            Self::RightElbow => "right_elbow",
            Self::LeftWrist => "left_wrist",
            Self::RightWrist => "right_wrist",
            Self::LeftHip => "left_hip",
            Self::RightHip => "right_hip",
            Self::LeftKnee => "left_knee",
            Self::RightKnee => "right_knee",
            Self::LeftAnkle => "left_ankle",
            Self::RightAnkle => "right_ankle",
        }
    }
}

/// A keypoint in original-image pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RawKeypoint {
    pub x: f32,
    pub y: f32,
    pub confidence: f32,
}

impl RawKeypoint {
    pub fn new(x: f32, y: f32, confidence: f32) -> Self {
        Self { x, y, confidence }
    }
}

/// One detected person as returned by a [`PoseModel`](super::PoseModel).
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    /// `[x1, y1, x2, y2]` in pixels
    pub bbox: [f32; 4],
    pub score: f32,
    /// Up to 17 keypoints, indexed like [`KeypointName`]
    pub keypoints: Vec<RawKeypoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Landmark {
    pub name: &'static str,
    pub x: f32,
    pub y: f32,
    pub confidence: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PersonKeypoints {
    pub person_index: usize,
    pub landmarks: Vec<Landmark>,
}

fn normalize_axis(value: f32, extent: u32) -> f32 {
    if extent == 0 {
        return 0.0;
    }
    let v = value / extent as f32;
    if v.is_nan() {
        0.0
    } else {
        v.clamp(0.0, 1.0)
    }
}

/// Keep confident keypoints and map them into `[0, 1]` image space.
///
/// Returns one entry per detection, even when none of its keypoints pass.
pub fn normalize_detections(
    detections: &[Detection],
    width: u32,
    height: u32,
) -> Vec<PersonKeypoints> {
    detections
        .iter()
        .enumerate()
        .map(|(person_index, det)| {
            let landmarks = det
                .keypoints
                .iter()
                .take(KeypointName::COUNT)
                .enumerate()
                .filter(|(_, kp)| kp.confidence > KEYPOINT_CONFIDENCE_THRESHOLD)
                .filter_map(|(idx, kp)| {
                    let name = KeypointName::from_index(idx)?;
                    Some(Landmark {
                        name: name.as_str(),
                        x: normalize_axis(kp.x, width),
                        y: normalize_axis(kp.y, height),
                        confidence: kp.confidence.min(1.0),
                    })
                })
                .collect();
            PersonKeypoints {
                person_index,
                landmarks,
            }
        })
        .collect()
}

/// Flatten persons into `[x, y, confidence]` triples, person by person.
pub fn flatten(persons: &[PersonKeypoints]) -> Vec<[f32; 3]> {
    persons
        .iter()
        .flat_map(|p| p.landmarks.iter().map(|l| [l.x, l.y, l.confidence]))
        .collect()
}
