pub mod arcface_embedder;
pub mod execution_provider;
pub mod ferplus_classifier;
pub mod genderage_estimator;
pub mod math;
pub mod model_resolver;
pub mod onnx_face_engine;
pub mod preprocess;
pub mod yolo_face_detector;
