use cubeclear_common::{CubeFace, Rgba8};
use serde::{Deserialize, Serialize};

/// Channel thresholds for "opaque red".
///
/// The band absorbs format-conversion rounding only; it is not a blending
/// tolerance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tolerance {
    /// Red and alpha must be strictly above this.
    pub min_high: u8,
    /// Green and blue must be strictly below this.
    pub max_low: u8,
}

impl Default for Tolerance {
    fn default() -> Self {
        Self {
            min_high: 250,
            max_low: 5,
        }
    }
}

impl Tolerance {
    pub fn is_opaque_red(&self, pixel: Rgba8) -> bool {
        pixel.r() > self.min_high
            && pixel.g() < self.max_low
            && pixel.b() < self.max_low
            && pixel.a() > self.min_high
    }
}

/// Whether a face's center pixel shows the layered clear.
pub fn verify_clear(pixel: Rgba8) -> bool {
    Tolerance::default().is_opaque_red(pixel)
}

/// Verdict for one face of one variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaceSample {
    pub face: CubeFace,
    pub pixel: Rgba8,
    pub pass: bool,
}

impl FaceSample {
    pub fn new(face: CubeFace, pixel: Rgba8) -> Self {
        Self {
            face,
            pixel,
            pass: verify_clear(pixel),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_red_passes() {
        assert!(verify_clear(Rgba8::RED));
    }

    #[test]
    fn rounding_within_band_passes() {
        assert!(verify_clear(Rgba8([251, 4, 4, 251])));
    }

    #[test]
    fn band_edges_fail() {
        assert!(!verify_clear(Rgba8([250, 0, 0, 255])));
        assert!(!verify_clear(Rgba8([255, 5, 0, 255])));
        assert!(!verify_clear(Rgba8([255, 0, 5, 255])));
        assert!(!verify_clear(Rgba8([255, 0, 0, 250])));
    }

    #[test]
    fn seed_and_garbage_fail() {
        assert!(!verify_clear(Rgba8::WHITE));
        assert!(!verify_clear(Rgba8([0xCD; 4])));
        assert!(!verify_clear(Rgba8::default()));
    }

    #[test]
    fn verdict_is_deterministic() {
        for pixel in [Rgba8::RED, Rgba8::WHITE, Rgba8([252, 3, 1, 254])] {
            assert_eq!(verify_clear(pixel), verify_clear(pixel));
            assert_eq!(FaceSample::new(CubeFace::NegativeY, pixel).pass, verify_clear(pixel));
        }
    }

    #[test]
    fn custom_tolerance() {
        let strict = Tolerance {
            min_high: 254,
            max_low: 1,
        };
        assert!(strict.is_opaque_red(Rgba8::RED));
        assert!(!strict.is_opaque_red(Rgba8([254, 0, 0, 255])));
    }
}
