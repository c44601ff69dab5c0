pub const YOLO_MODEL_NAME: &str = "yolo11n-pose_widerface.onnx";
pub const EMBEDDING_MODEL_NAME: &str = "w600k_r50.onnx";
pub const GENDER_AGE_MODEL_NAME: &str = "genderage.onnx";
pub const EMOTION_MODEL_NAME: &str = "emotion-ferplus-8.onnx";

/// Every file `load_resources` resolves from the model location.
pub const REQUIRED_MODELS: [&str; 4] = [
    YOLO_MODEL_NAME,
    EMBEDDING_MODEL_NAME,
    GENDER_AGE_MODEL_NAME,
    EMOTION_MODEL_NAME,
];

/// Local directory models are read from unless another location is given.
pub const DEFAULT_MODEL_DIR: &str = "models";

/// Minimum detector score for a face to be reported.
pub const DEFAULT_MIN_CONFIDENCE: f64 = 0.5;

/// Maximum descriptor distance for a recognition match.
pub const DEFAULT_MATCH_THRESHOLD: f64 = 0.6;

pub const DEFAULT_CAPTURE_WIDTH: u32 = 640;
pub const DEFAULT_CAPTURE_HEIGHT: u32 = 480;
pub const DEFAULT_CONTAINER_WIDTH: u32 = 640;

/// Target repaint rate the detection loop is paced at.
pub const DEFAULT_PAINT_RATE_HZ: f64 = 60.0;

/// Label reported when no enrolled identity is close enough.
pub const UNKNOWN_LABEL: &str = "Unknown";

/// Enrollment images are looked up at `{base}/{label}/{label}.{ext}`.
pub const ENROLLMENT_IMAGE_EXTENSION: &str = "jpg";
