//! Detector backends

#[cfg(feature = "backend-ort")]
pub mod onnx;

#[cfg(feature = "backend-ort")]
pub use onnx::OnnxYoloDetector;
