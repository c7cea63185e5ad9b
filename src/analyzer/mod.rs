//! Face/emotion analysis engine
//!
//! The engine decodes a grayscale frame, finds face regions through the
//! pluggable `FaceDetector` seam, and labels the largest region with the
//! brightness/variance heuristic. Detection itself (cascade classifiers,
//! vendor models) is an external collaborator; the built-in
//! `FullFrameDetector` keeps the pipeline running without one.

mod frame;
mod heuristic;

use serde::Serialize;

use crate::cache::EstimateSize;
use crate::core::AnalyzerResult;

pub use frame::LumaFrame;
pub use heuristic::{classify, FullFrameDetector};

/// Emotion labels produced by the heuristic classifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Emotion {
    Happy,
    Sad,
    Angry,
    Neutral,
    Surprise,
    Unknown,
}

impl Emotion {
    pub fn as_str(&self) -> &'static str {
        match self {
            Emotion::Happy => "happy",
            Emotion::Sad => "sad",
            Emotion::Angry => "angry",
            Emotion::Neutral => "neutral",
            Emotion::Surprise => "surprise",
            Emotion::Unknown => "unknown",
        }
    }
}

/// A detected face region, normalized to the 0..1 range
#[derive(Debug, Clone, Copy, Serialize)]
pub struct FaceRegion {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl FaceRegion {
    pub fn full_frame() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: 1.0,
            height: 1.0,
        }
    }

    pub fn area(&self) -> f64 {
        self.width * self.height
    }
}

/// Complete result of analyzing one frame
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisResult {
    pub faces: Vec<FaceRegion>,
    pub primary_emotion: Emotion,
    pub confidence: f64,
}

// Estimated footprint for the result cache: four coordinates per face
// plus the fixed label/confidence fields.
impl EstimateSize for AnalysisResult {
    fn estimate_size(&self) -> u64 {
        self.faces.len() as u64 * 32 + 16
    }
}

/// Face detection seam
///
/// Implementations report normalized face regions for a frame. The
/// engine never assumes which backend produced them.
pub trait FaceDetector: Send + Sync {
    fn detect(&self, frame: &LumaFrame) -> AnalyzerResult<Vec<FaceRegion>>;
}

/// Analysis engine combining a detector with the emotion heuristic
pub struct FaceAnalyzer {
    detector: Box<dyn FaceDetector>,
    max_dimension: Option<u32>,
}

impl FaceAnalyzer {
    pub fn new(detector: Box<dyn FaceDetector>) -> Self {
        Self {
            detector,
            max_dimension: None,
        }
    }

    /// Reject frames wider or taller than `max_dimension` pixels
    pub fn with_max_dimension(mut self, max_dimension: u32) -> Self {
        self.max_dimension = Some(max_dimension);
        self
    }

    /// Analyze a binary PGM payload
    ///
    /// Returns every detected face plus the emotion of the largest one.
    /// No faces is not an error: the result carries an empty region list
    /// and zero confidence.
    pub fn analyze(&self, data: &[u8]) -> AnalyzerResult<AnalysisResult> {
        let frame = LumaFrame::from_pgm(data)?;
        if let Some(max) = self.max_dimension {
            if frame.width() > max || frame.height() > max {
                return Err(crate::core::AnalyzerError::InvalidImage(format!(
                    "frame {}x{} exceeds maximum dimension {}",
                    frame.width(),
                    frame.height(),
                    max
                )));
            }
        }
        let faces = self.detector.detect(&frame)?;

        if faces.is_empty() {
            return Ok(AnalysisResult {
                faces,
                primary_emotion: Emotion::Neutral,
                confidence: 0.0,
            });
        }

        // Classify the largest detected face
        let primary = faces
            .iter()
            .copied()
            .max_by(|a, b| a.area().total_cmp(&b.area()))
            .unwrap_or_else(FaceRegion::full_frame);

        let (brightness, variation) = frame.region_stats(&primary);
        let (primary_emotion, confidence) = classify(brightness, variation);

        Ok(AnalysisResult {
            faces,
            primary_emotion,
            confidence,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pgm(width: u32, height: u32, pixels: &[u8]) -> Vec<u8> {
        let mut data = format!("P5\n{} {}\n255\n", width, height).into_bytes();
        data.extend_from_slice(pixels);
        data
    }

    struct NoFaceDetector;

    impl FaceDetector for NoFaceDetector {
        fn detect(&self, _frame: &LumaFrame) -> AnalyzerResult<Vec<FaceRegion>> {
            Ok(vec![])
        }
    }

    #[test]
    fn uniform_frame_reads_neutral() {
        let analyzer = FaceAnalyzer::new(Box::new(FullFrameDetector));
        let result = analyzer.analyze(&pgm(8, 8, &[100; 64])).unwrap();

        assert_eq!(result.faces.len(), 1);
        assert_eq!(result.primary_emotion, Emotion::Neutral);
        assert!((result.confidence - 0.8).abs() < 1e-9);
    }

    #[test]
    fn high_contrast_frame_reads_surprise() {
        let mut pixels = vec![0u8; 32];
        pixels.extend_from_slice(&[255; 32]);

        let analyzer = FaceAnalyzer::new(Box::new(FullFrameDetector));
        let result = analyzer.analyze(&pgm(8, 8, &pixels)).unwrap();

        assert_eq!(result.primary_emotion, Emotion::Surprise);
    }

    #[test]
    fn no_faces_is_neutral_with_zero_confidence() {
        let analyzer = FaceAnalyzer::new(Box::new(NoFaceDetector));
        let result = analyzer.analyze(&pgm(8, 8, &[100; 64])).unwrap();

        assert!(result.faces.is_empty());
        assert_eq!(result.primary_emotion, Emotion::Neutral);
        assert_eq!(result.confidence, 0.0);
    }

    #[test]
    fn oversized_frame_is_rejected() {
        let analyzer = FaceAnalyzer::new(Box::new(FullFrameDetector)).with_max_dimension(4);
        let err = analyzer.analyze(&pgm(8, 8, &[100; 64])).unwrap_err();
        assert!(matches!(err, crate::core::AnalyzerError::InvalidImage(_)));
    }

    #[test]
    fn invalid_payload_is_rejected() {
        let analyzer = FaceAnalyzer::new(Box::new(FullFrameDetector));
        let err = analyzer.analyze(b"not a pgm").unwrap_err();
        assert!(matches!(err, crate::core::AnalyzerError::InvalidImage(_)));
    }

    #[test]
    fn result_size_estimate_tracks_faces() {
        let result = AnalysisResult {
            faces: vec![FaceRegion::full_frame(); 3],
            primary_emotion: Emotion::Happy,
            confidence: 0.7,
        };
        assert_eq!(result.estimate_size(), 3 * 32 + 16);
    }
}
