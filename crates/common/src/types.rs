use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

/// Number of faces in a cube map.
pub const FACE_COUNT: usize = 6;

/// One RGBA8 texel, channels in R, G, B, A order.
#[repr(transparent)]
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Pod, Zeroable, Serialize, Deserialize,
)]
pub struct Rgba8(pub [u8; 4]);

impl Rgba8 {
    /// Opaque red, the color the layered clear is expected to produce.
    pub const RED: Self = Self([0xFF, 0x00, 0x00, 0xFF]);
    /// Opaque white, used to seed texture contents.
    pub const WHITE: Self = Self([0xFF, 0xFF, 0xFF, 0xFF]);

    pub fn r(self) -> u8 {
        self.0[0]
    }

    pub fn g(self) -> u8 {
        self.0[1]
    }

    pub fn b(self) -> u8 {
        self.0[2]
    }

    pub fn a(self) -> u8 {
        self.0[3]
    }

    /// Channels normalized to `0.0..=1.0`, as clear-color APIs expect them.
    pub fn to_unit(self) -> [f64; 4] {
        self.0.map(|c| f64::from(c) / 255.0)
    }
}

impl std::fmt::Display for Rgba8 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:#04x} {:#04x} {:#04x} {:#04x}",
            self.r(),
            self.g(),
            self.b(),
            self.a()
        )
    }
}

/// A cube-map face, in the fixed layer order used by every backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CubeFace {
    PositiveX,
    NegativeX,
    PositiveY,
    NegativeY,
    PositiveZ,
    NegativeZ,
}

impl CubeFace {
    /// All faces in layer order.
    pub const ALL: [CubeFace; FACE_COUNT] = [
        CubeFace::PositiveX,
        CubeFace::NegativeX,
        CubeFace::PositiveY,
        CubeFace::NegativeY,
        CubeFace::PositiveZ,
        CubeFace::NegativeZ,
    ];

    /// Layer index of this face (0..6).
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Short direction label, e.g. `+X`.
    pub fn label(self) -> &'static str {
        match self {
            CubeFace::PositiveX => "+X",
            CubeFace::NegativeX => "-X",
            CubeFace::PositiveY => "+Y",
            CubeFace::NegativeY => "-Y",
            CubeFace::PositiveZ => "+Z",
            CubeFace::NegativeZ => "-Z",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn face_order_is_fixed() {
        let labels: Vec<_> = CubeFace::ALL.iter().map(|f| f.label()).collect();
        assert_eq!(labels, ["+X", "-X", "+Y", "-Y", "+Z", "-Z"]);
        for (i, face) in CubeFace::ALL.iter().enumerate() {
            assert_eq!(face.index(), i);
            assert_eq!(CubeFace::from_index(i), Some(*face));
        }
        assert_eq!(CubeFace::from_index(FACE_COUNT), None);
    }

    #[test]
    fn rgba_display_is_hex_per_channel() {
        assert_eq!(Rgba8::RED.to_string(), "0xff 0x00 0x00 0xff");
        assert_eq!(Rgba8([0x0a, 0xcd, 0x01, 0x80]).to_string(), "0x0a 0xcd 0x01 0x80");
    }

    #[test]
    fn rgba_unit_conversion() {
        assert_eq!(Rgba8::RED.to_unit(), [1.0, 0.0, 0.0, 1.0]);
        assert_eq!(Rgba8::WHITE.to_unit(), [1.0; 4]);
    }

    #[test]
    fn rgba_casts_from_bytes() {
        let bytes = [0xFFu8, 0, 0, 0xFF, 1, 2, 3, 4];
        let pixels: &[Rgba8] = bytemuck::cast_slice(&bytes);
        assert_eq!(pixels, &[Rgba8::RED, Rgba8([1, 2, 3, 4])]);
    }
}
