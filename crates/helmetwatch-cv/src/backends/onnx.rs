//! Ultralytics YOLO exports run through ONNX Runtime

use crate::Result;
use crate::detection::detector::{LocalDetection, ObjectDetector};
use crate::utils::nms::greedy_nms;
use anyhow::{Context, anyhow, bail};
use helmetwatch_core::BoundingBox;
use image::{Rgb, RgbImage, imageops::FilterType};
use ort::session::{Session, builder::GraphOptimizationLevel};
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, info};

const MODEL_NMS_IOU: f32 = 0.45;
const LETTERBOX_FILL: u8 = 114;

/// YOLO detector with a `[1, 4 + classes, anchors]` output head
pub struct OnnxYoloDetector {
    name: String,
    session: Mutex<Session>,
    labels: Vec<String>,
}

impl OnnxYoloDetector {
    pub fn load<P: AsRef<Path>>(model_path: P, labels: Vec<String>) -> Result<Self> {
        let path = model_path.as_ref();
        info!("Loading YOLO model: {:?}", path);

        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(4)?
            .commit_from_file(path)
            .with_context(|| format!("Failed to load ONNX model: {:?}", path))?;

        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "onnx".to_string());

        Ok(Self {
            name,
            session: Mutex::new(session),
            labels,
        })
    }

    fn label(&self, class_id: usize) -> String {
        self.labels
            .get(class_id)
            .cloned()
            .unwrap_or_else(|| format!("class_{class_id}"))
    }

    fn infer(&self, input: Vec<f32>, input_size: u32) -> Result<(Vec<i64>, Vec<f32>)> {
        let size = input_size as usize;
        let shape = [1, 3, size, size];
        let input_value =
            ort::value::Value::from_array((shape.as_slice(), input.into_boxed_slice()))?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| anyhow!("ONNX session lock poisoned"))?;
        let outputs = session.run(ort::inputs!["images" => input_value])?;
        let (dims, data) = outputs[0].try_extract_tensor::<f32>()?;

        Ok((dims.iter().copied().collect(), data.to_vec()))
    }
}

impl ObjectDetector for OnnxYoloDetector {
    fn name(&self) -> &str {
        &self.name
    }

    fn detect(
        &self,
        region: &RgbImage,
        confidence_floor: f32,
        input_size: u32,
    ) -> Result<Vec<LocalDetection>> {
        let letterbox = Letterbox::fit(region, input_size);
        let (dims, output) = self.infer(letterbox.tensor(region), input_size)?;

        if dims.len() != 3 || dims[1] <= 4 {
            bail!("Unexpected YOLO output shape {:?}", dims);
        }
        let classes = dims[1] as usize - 4;
        let anchors = dims[2] as usize;
        if output.len() < (4 + classes) * anchors {
            bail!("YOLO output shorter than its shape {:?}", dims);
        }

        let (width, height) = region.dimensions();
        let mut detections = Vec::new();

        for i in 0..anchors {
            let (best_class, confidence) = (0..classes)
                .map(|c| (c, output[anchors * (4 + c) + i]))
                .fold((0, f32::MIN), |best, cur| if cur.1 > best.1 { cur } else { best });

            if confidence < confidence_floor {
                continue;
            }

            let cx = output[i];
            let cy = output[anchors + i];
            let w = output[anchors * 2 + i];
            let h = output[anchors * 3 + i];

            let Some(bbox) = letterbox.unmap(cx - w / 2.0, cy - h / 2.0, cx + w / 2.0, cy + h / 2.0, width, height)
            else {
                continue;
            };

            detections.push(LocalDetection::new(
                bbox,
                confidence,
                best_class as u32,
                self.label(best_class),
            ));
        }

        detections.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
        let mut kept = Vec::new();
        let mut class_ids: Vec<u32> = detections.iter().map(|d| d.class_id).collect();
        class_ids.sort_unstable();
        class_ids.dedup();
        for class_id in class_ids {
            let same_class: Vec<LocalDetection> = detections
                .iter()
                .filter(|d| d.class_id == class_id)
                .cloned()
                .collect();
            kept.extend(greedy_nms(same_class, |d| d.bbox, MODEL_NMS_IOU));
        }
        kept.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

        debug!("{}: {} detections in {}x{} region", self.name, kept.len(), width, height);
        Ok(kept)
    }
}

/// Aspect-preserving resize onto a square, gray-padded canvas
struct Letterbox {
    size: u32,
    scale: f32,
    scaled_w: u32,
    scaled_h: u32,
    pad_x: u32,
    pad_y: u32,
}

impl Letterbox {
    fn fit(region: &RgbImage, size: u32) -> Self {
        let (w, h) = region.dimensions();
        let scale = (size as f32 / w as f32).min(size as f32 / h as f32);
        let scaled_w = ((w as f32 * scale) as u32).clamp(1, size);
        let scaled_h = ((h as f32 * scale) as u32).clamp(1, size);

        Self {
            size,
            scale,
            scaled_w,
            scaled_h,
            pad_x: (size - scaled_w) / 2,
            pad_y: (size - scaled_h) / 2,
        }
    }

    /// Normalized CHW tensor data
    fn tensor(&self, region: &RgbImage) -> Vec<f32> {
        let resized = image::imageops::resize(region, self.scaled_w, self.scaled_h, FilterType::Triangle);
        let mut canvas = RgbImage::from_pixel(self.size, self.size, Rgb([LETTERBOX_FILL; 3]));
        image::imageops::replace(&mut canvas, &resized, self.pad_x as i64, self.pad_y as i64);

        let plane = (self.size * self.size) as usize;
        let mut input = vec![0.0f32; 3 * plane];
        for (x, y, pixel) in canvas.enumerate_pixels() {
            let idx = (y * self.size + x) as usize;
            for c in 0..3 {
                input[c * plane + idx] = pixel[c] as f32 / 255.0;
            }
        }
        input
    }

    /// Map a model-space box back into the region, clipped to its bounds
    fn unmap(&self, x1: f32, y1: f32, x2: f32, y2: f32, width: u32, height: u32) -> Option<BoundingBox> {
        let px = self.pad_x as f32;
        let py = self.pad_y as f32;
        let (w, h) = (width as f32, height as f32);

        BoundingBox::checked(
            ((x1 - px) / self.scale).clamp(0.0, w),
            ((y1 - py) / self.scale).clamp(0.0, h),
            ((x2 - px) / self.scale).clamp(0.0, w),
            ((y2 - py) / self.scale).clamp(0.0, h),
        )
    }
}
