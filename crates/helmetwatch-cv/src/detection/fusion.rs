//! Candidate detection and multi-scale head fusion
//!
//! Stage 1 finds persons and motorcycles on the full frame. Stage 2 runs the
//! head model on the full frame and again on zoomed crops around every
//! motorcycle and every person not already covered by a motorcycle crop, so
//! small rider heads get detector resolution they would not get at full
//! scale. All head boxes come back in original-image coordinates.

use super::config::{HeadFusionConfig, ObjectPassConfig};
use super::detector::ObjectDetector;
use crate::bbox::{DetectionSource, RawDetection};
use crate::error::PipelineError;
use crate::utils::ImageUtils;
use helmetwatch_core::entities::{Motorcycles, Persons};
use helmetwatch_core::geometry::{clip_to_pixels, expand, point_in_box};
use helmetwatch_core::{BoundingBox, Candidates};
use image::RgbImage;
use tracing::debug;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Run the general-object model and keep persons and motorcycles
pub fn detect_candidates(
    image: &RgbImage,
    detector: &dyn ObjectDetector,
    config: &ObjectPassConfig,
) -> Result<Candidates, PipelineError> {
    let detections = detector
        .detect(image, config.confidence_floor, config.input_size)
        .map_err(|e| PipelineError::detector(detector.name(), e))?;

    let mut candidates = Candidates::default();
    for detection in detections {
        if detection.confidence < config.confidence_floor || !detection.bbox.is_valid() {
            continue;
        }
        if detection.class_id == config.person_class_id {
            candidates.add_person(detection.bbox, detection.confidence);
        } else if detection.class_id == config.motorcycle_class_id {
            candidates.add_motorcycle(detection.bbox, detection.confidence);
        }
    }

    debug!(
        "Stage 1: {} persons, {} motorcycles",
        candidates.persons.len(),
        candidates.motorcycles.len()
    );
    Ok(candidates)
}

/// A crop to run the head model on
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeadRoi {
    pub source: DetectionSource,
    pub region: BoundingBox,
}

/// Multi-scale head detector over one image
pub struct HeadFusion<'a> {
    detector: &'a dyn ObjectDetector,
    config: &'a HeadFusionConfig,
}

impl<'a> HeadFusion<'a> {
    pub fn new(detector: &'a dyn ObjectDetector, config: &'a HeadFusionConfig) -> Self {
        Self { detector, config }
    }

    /// Full-image pass, then motorcycle crops, then uncovered person crops,
    /// concatenated in that order.
    pub fn run(
        &self,
        image: &RgbImage,
        candidates: &Candidates,
    ) -> Result<Vec<RawDetection>, PipelineError> {
        let mut detections = Vec::new();

        if self.config.full_image_pass {
            let full = self.detect_region(
                image,
                0,
                0,
                self.config.full_image_input_size,
                DetectionSource::FullImage,
            )?;
            debug!("Head pass full_image: {} raw detections", full.len());
            detections.extend(full);
        }

        let moto_rois = if self.config.motorcycle_rois {
            self.motorcycle_rois(image, &candidates.motorcycles)
        } else {
            Vec::new()
        };
        let person_rois = if self.config.person_rois {
            self.person_rois(image, &candidates.persons, &moto_rois)
        } else {
            Vec::new()
        };

        let from_motos = self.run_rois(image, &moto_rois)?;
        debug!(
            "Head pass motorcycle ROIs: {} crops, {} raw detections",
            moto_rois.len(),
            from_motos.len()
        );
        detections.extend(from_motos);

        let from_persons = self.run_rois(image, &person_rois)?;
        debug!(
            "Head pass person ROIs: {} crops, {} raw detections",
            person_rois.len(),
            from_persons.len()
        );
        detections.extend(from_persons);

        Ok(detections)
    }

    /// Each motorcycle grown sideways and down, and further upward where the
    /// riders' heads are
    pub fn motorcycle_rois(&self, image: &RgbImage, motorcycles: &Motorcycles) -> Vec<HeadRoi> {
        let (width, height) = image.dimensions();
        motorcycles
            .values()
            .map(|moto| HeadRoi {
                source: DetectionSource::MotorcycleRoi(moto.id),
                region: expand(
                    &moto.bbox,
                    width,
                    height,
                    self.config.motorcycle_side_ratio,
                    Some(self.config.motorcycle_top_ratio),
                ),
            })
            .collect()
    }

    /// Padded top slice of every person whose center lies outside all
    /// motorcycle crops
    pub fn person_rois(
        &self,
        image: &RgbImage,
        persons: &Persons,
        moto_rois: &[HeadRoi],
    ) -> Vec<HeadRoi> {
        let (width, height) = image.dimensions();
        let pad = self.config.person_padding;
        let fraction = self.config.person_head_fraction;

        persons
            .values()
            .filter(|person| {
                let center = person.bbox.center();
                !moto_rois
                    .iter()
                    .any(|roi| point_in_box(&center, &roi.region, 0.0))
            })
            .map(|person| {
                let b = &person.bbox;
                let (w, h) = (b.width(), b.height());
                HeadRoi {
                    source: DetectionSource::PersonRoi(person.id),
                    region: clip_to_pixels(
                        &BoundingBox::new(
                            b.x1 - w * pad,
                            b.y1 - h * pad,
                            b.x2 + w * pad,
                            b.y1 + h * (fraction + pad),
                        ),
                        width,
                        height,
                    ),
                }
            })
            .collect()
    }

    /// Detect on every crop. Results are reassembled in crop order whether or
    /// not the crops run in parallel.
    fn run_rois(&self, image: &RgbImage, rois: &[HeadRoi]) -> Result<Vec<RawDetection>, PipelineError> {
        #[cfg(feature = "parallel")]
        let per_roi: Result<Vec<Vec<RawDetection>>, PipelineError> =
            rois.par_iter().map(|roi| self.detect_roi(image, roi)).collect();

        #[cfg(not(feature = "parallel"))]
        let per_roi: Result<Vec<Vec<RawDetection>>, PipelineError> =
            rois.iter().map(|roi| self.detect_roi(image, roi)).collect();

        Ok(per_roi?.into_iter().flatten().collect())
    }

    fn detect_roi(&self, image: &RgbImage, roi: &HeadRoi) -> Result<Vec<RawDetection>, PipelineError> {
        match ImageUtils::crop(image, &roi.region) {
            Some((crop, x, y)) => {
                self.detect_region(&crop, x, y, self.config.roi_input_size, roi.source)
            }
            None => {
                debug!("Skipping empty crop for {}", roi.source);
                Ok(Vec::new())
            }
        }
    }

    fn detect_region(
        &self,
        region: &RgbImage,
        offset_x: u32,
        offset_y: u32,
        input_size: u32,
        source: DetectionSource,
    ) -> Result<Vec<RawDetection>, PipelineError> {
        let local = self
            .detector
            .detect(region, self.config.raw_confidence_floor, input_size)
            .map_err(|e| PipelineError::detector(self.detector.name(), e))?;

        Ok(local
            .into_iter()
            .filter_map(|d| RawDetection::from_local(d, offset_x as f32, offset_y as f32, source))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::detector::LocalDetection;
    use helmetwatch_core::{MotorcycleId, PersonId};
    use std::sync::Mutex;

    /// Returns one fixed local box per call and records what it was given
    struct Recorder {
        calls: Mutex<Vec<(u32, u32, u32)>>,
        output: Vec<LocalDetection>,
        fail: bool,
    }

    impl Recorder {
        fn new(output: Vec<LocalDetection>) -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                output,
                fail: false,
            }
        }
    }

    impl ObjectDetector for Recorder {
        fn name(&self) -> &str {
            "recorder"
        }

        fn detect(&self, region: &RgbImage, _floor: f32, input_size: u32) -> crate::Result<Vec<LocalDetection>> {
            if self.fail {
                anyhow::bail!("inference exploded");
            }
            let (w, h) = region.dimensions();
            self.calls.lock().unwrap().push((w, h, input_size));
            Ok(self.output.clone())
        }
    }

    fn local(x1: f32, y1: f32, x2: f32, y2: f32, class_id: u32, confidence: f32) -> LocalDetection {
        LocalDetection::new(BoundingBox::new(x1, y1, x2, y2), confidence, class_id, "x")
    }

    #[test]
    fn test_candidates_keep_person_and_motorcycle_classes() {
        let detector = Recorder::new(vec![
            local(0.0, 0.0, 10.0, 20.0, 0, 0.9),
            local(0.0, 0.0, 30.0, 20.0, 3, 0.5),
            local(0.0, 0.0, 30.0, 20.0, 2, 0.9),
            local(0.0, 0.0, 10.0, 20.0, 0, 0.2),
            local(5.0, 5.0, 5.0, 20.0, 0, 0.9),
        ]);
        let image = RgbImage::new(100, 100);
        let candidates = detect_candidates(&image, &detector, &ObjectPassConfig::default()).unwrap();

        assert_eq!(candidates.persons.len(), 1);
        assert_eq!(candidates.motorcycles.len(), 1);
        assert_eq!(detector.calls.lock().unwrap()[0], (100, 100, 640));
    }

    #[test]
    fn test_motorcycle_roi_grows_upward() {
        let detector = Recorder::new(Vec::new());
        let config = HeadFusionConfig::default();
        let fusion = HeadFusion::new(&detector, &config);

        let mut candidates = Candidates::default();
        candidates.add_motorcycle(BoundingBox::new(100.0, 300.0, 200.0, 400.0), 0.9);
        let image = RgbImage::new(1000, 1000);

        let rois = fusion.motorcycle_rois(&image, &candidates.motorcycles);
        assert_eq!(rois.len(), 1);
        assert_eq!(rois[0].source, DetectionSource::MotorcycleRoi(MotorcycleId(0)));
        assert_eq!(rois[0].region, BoundingBox::new(40.0, 200.0, 260.0, 460.0));
    }

    #[test]
    fn test_person_inside_motorcycle_roi_is_skipped() {
        let detector = Recorder::new(Vec::new());
        let config = HeadFusionConfig::default();
        let fusion = HeadFusion::new(&detector, &config);

        let mut candidates = Candidates::default();
        candidates.add_motorcycle(BoundingBox::new(100.0, 300.0, 200.0, 400.0), 0.9);
        candidates.add_person(BoundingBox::new(120.0, 220.0, 180.0, 380.0), 0.9);
        candidates.add_person(BoundingBox::new(600.0, 100.0, 700.0, 300.0), 0.9);
        let image = RgbImage::new(1000, 1000);

        let moto_rois = fusion.motorcycle_rois(&image, &candidates.motorcycles);
        let person_rois = fusion.person_rois(&image, &candidates.persons, &moto_rois);

        assert_eq!(person_rois.len(), 1);
        assert_eq!(person_rois[0].source, DetectionSource::PersonRoi(PersonId(1)));
        // top 45% plus 10% padding on every side
        assert_eq!(person_rois[0].region, BoundingBox::new(590.0, 80.0, 710.0, 210.0));
    }

    #[test]
    fn test_run_remaps_crops_into_image_frame() {
        let detector = Recorder::new(vec![local(1.0, 2.0, 11.0, 12.0, 1, 0.5)]);
        let config = HeadFusionConfig::default();
        let fusion = HeadFusion::new(&detector, &config);

        let mut candidates = Candidates::default();
        candidates.add_motorcycle(BoundingBox::new(100.0, 300.0, 200.0, 400.0), 0.9);
        candidates.add_person(BoundingBox::new(600.0, 100.0, 700.0, 300.0), 0.9);
        let image = RgbImage::new(1000, 1000);

        let raw = fusion.run(&image, &candidates).unwrap();
        let placed: Vec<_> = raw.iter().map(|d| (d.source, d.bbox.x1, d.bbox.y1)).collect();
        assert_eq!(
            placed,
            vec![
                (DetectionSource::FullImage, 1.0, 2.0),
                (DetectionSource::MotorcycleRoi(MotorcycleId(0)), 41.0, 202.0),
                (DetectionSource::PersonRoi(PersonId(0)), 591.0, 82.0),
            ]
        );

        let calls = detector.calls.lock().unwrap();
        assert_eq!(calls[0], (1000, 1000, 640));
        assert_eq!(calls[1], (220, 260, 320));
        assert_eq!(calls[2], (120, 130, 320));
    }

    #[test]
    fn test_disabled_passes_do_not_run() {
        let detector = Recorder::new(vec![local(1.0, 2.0, 11.0, 12.0, 1, 0.5)]);
        let config = HeadFusionConfig {
            full_image_pass: false,
            motorcycle_rois: false,
            ..Default::default()
        };
        let fusion = HeadFusion::new(&detector, &config);

        let mut candidates = Candidates::default();
        candidates.add_motorcycle(BoundingBox::new(100.0, 300.0, 200.0, 400.0), 0.9);
        candidates.add_person(BoundingBox::new(120.0, 220.0, 180.0, 380.0), 0.9);
        let image = RgbImage::new(1000, 1000);

        // without motorcycle crops the rider is no longer covered
        let raw = fusion.run(&image, &candidates).unwrap();
        assert_eq!(raw.len(), 1);
        assert_eq!(raw[0].source, DetectionSource::PersonRoi(PersonId(0)));
    }

    #[test]
    fn test_detector_failure_aborts() {
        let mut detector = Recorder::new(Vec::new());
        detector.fail = true;
        let config = HeadFusionConfig::default();
        let fusion = HeadFusion::new(&detector, &config);

        let err = fusion.run(&RgbImage::new(10, 10), &Candidates::default()).unwrap_err();
        assert!(matches!(err, PipelineError::DetectorInvocation { .. }));
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn test_parallel_crops_keep_candidate_order() {
        let detector = Recorder::new(vec![local(1.0, 2.0, 11.0, 12.0, 1, 0.5)]);
        let config = HeadFusionConfig::default();
        let fusion = HeadFusion::new(&detector, &config);

        let mut candidates = Candidates::default();
        for i in 0..8 {
            let x = 20.0 + 110.0 * i as f32;
            candidates.add_motorcycle(BoundingBox::new(x, 500.0, x + 60.0, 560.0), 0.9);
        }
        let image = RgbImage::new(1000, 1000);
        let rois = fusion.motorcycle_rois(&image, &candidates.motorcycles);

        let sequential: Vec<RawDetection> = rois
            .iter()
            .flat_map(|roi| fusion.detect_roi(&image, roi).unwrap())
            .collect();
        let fused = fusion.run_rois(&image, &rois).unwrap();

        assert_eq!(fused.len(), 8);
        assert_eq!(fused, sequential);
        let sources: Vec<_> = fused.iter().map(|d| d.source).collect();
        let expected: Vec<_> = (0..8)
            .map(|i| DetectionSource::MotorcycleRoi(MotorcycleId(i)))
            .collect();
        assert_eq!(sources, expected);
    }
}
