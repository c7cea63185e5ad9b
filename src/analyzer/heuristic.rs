/// Brightness/variance emotion heuristic
///
/// Classifies the dominant face region from two luminance statistics.
/// High variation reads as an expressive face, brightness splits the
/// ambiguous middle bands. Crude, but cheap and deterministic.
use super::frame::LumaFrame;
use super::{Emotion, FaceDetector, FaceRegion};
use crate::core::AnalyzerResult;

/// Classify an emotion from mean brightness and standard deviation,
/// returning the label and a confidence estimate.
pub fn classify(brightness: f64, variation: f64) -> (Emotion, f64) {
    if variation > 80.0 {
        (Emotion::Surprise, 0.8)
    } else if variation > 65.0 {
        (Emotion::Happy, 0.7)
    } else if variation > 50.0 {
        if brightness > 140.0 {
            (Emotion::Happy, 0.6)
        } else {
            (Emotion::Sad, 0.6)
        }
    } else if variation > 35.0 {
        if brightness > 140.0 {
            (Emotion::Neutral, 0.7)
        } else {
            (Emotion::Angry, 0.6)
        }
    } else {
        (Emotion::Neutral, 0.8)
    }
}

/// Demo detector that reports the whole frame as a single face region.
///
/// A production deployment plugs a real cascade/vendor detector into
/// the `FaceDetector` seam; this keeps the analysis pipeline exercisable
/// without one.
#[derive(Debug, Default)]
pub struct FullFrameDetector;

impl FaceDetector for FullFrameDetector {
    fn detect(&self, _frame: &LumaFrame) -> AnalyzerResult<Vec<FaceRegion>> {
        Ok(vec![FaceRegion::full_frame()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_face_is_neutral() {
        let (emotion, confidence) = classify(100.0, 10.0);
        assert_eq!(emotion, Emotion::Neutral);
        assert!((confidence - 0.8).abs() < 1e-9);
    }

    #[test]
    fn high_variation_is_surprise() {
        let (emotion, confidence) = classify(127.0, 127.0);
        assert_eq!(emotion, Emotion::Surprise);
        assert!((confidence - 0.8).abs() < 1e-9);
    }

    #[test]
    fn middle_band_splits_on_brightness() {
        let (bright, _) = classify(150.0, 55.0);
        assert_eq!(bright, Emotion::Happy);

        let (dark, _) = classify(90.0, 55.0);
        assert_eq!(dark, Emotion::Sad);
    }

    #[test]
    fn low_band_splits_on_brightness() {
        let (bright, confidence) = classify(150.0, 40.0);
        assert_eq!(bright, Emotion::Neutral);
        assert!((confidence - 0.7).abs() < 1e-9);

        let (dark, _) = classify(90.0, 40.0);
        assert_eq!(dark, Emotion::Angry);
    }

    #[test]
    fn band_edges_fall_through() {
        // Exactly 80 is not "greater than 80"
        let (emotion, _) = classify(150.0, 80.0);
        assert_eq!(emotion, Emotion::Happy);

        let (emotion, _) = classify(100.0, 35.0);
        assert_eq!(emotion, Emotion::Neutral);
    }
}
