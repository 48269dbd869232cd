//! Output image shape: aspect ratio and resolution.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Label that is not in the supported set.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Unsupported {kind} '{label}'")]
pub struct UnsupportedLabel {
    pub kind: &'static str,
    pub label: String,
}

/// Aspect ratios the image model accepts.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum AspectRatio {
    #[default]
    #[serde(rename = "1:1")]
    Square,
    #[serde(rename = "3:4")]
    Portrait3x4,
    #[serde(rename = "4:3")]
    Landscape4x3,
    #[serde(rename = "9:16")]
    Portrait9x16,
    #[serde(rename = "16:9")]
    Landscape16x9,
}

impl AspectRatio {
    /// Candidates in match order. Earlier entries win ties.
    pub const ALL: [AspectRatio; 5] = [
        Self::Square,
        Self::Portrait3x4,
        Self::Landscape4x3,
        Self::Portrait9x16,
        Self::Landscape16x9,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::Square => "1:1",
            Self::Portrait3x4 => "3:4",
            Self::Landscape4x3 => "4:3",
            Self::Portrait9x16 => "9:16",
            Self::Landscape16x9 => "16:9",
        }
    }

    /// Nominal width/height value used for nearest matching.
    pub fn ratio(self) -> f64 {
        match self {
            Self::Square => 1.0,
            Self::Portrait3x4 => 0.75,
            Self::Landscape4x3 => 1.33,
            Self::Portrait9x16 => 0.5625,
            Self::Landscape16x9 => 1.77,
        }
    }

    /// Supported ratio nearest to `width / height`.
    ///
    /// Zero-sized input maps to `1:1`.
    pub fn closest(width: u32, height: u32) -> Self {
        if width == 0 || height == 0 {
            return Self::Square;
        }
        let target = f64::from(width) / f64::from(height);
        let mut best = Self::ALL[0];
        for candidate in &Self::ALL[1..] {
            if (candidate.ratio() - target).abs() < (best.ratio() - target).abs() {
                best = *candidate;
            }
        }
        best
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for AspectRatio {
    type Err = UnsupportedLabel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|r| r.label() == s.trim())
            .ok_or_else(|| UnsupportedLabel { kind: "aspect ratio", label: s.to_string() })
    }
}

/// Requested output resolution.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum ImageSize {
    #[serde(rename = "2K")]
    TwoK,
    #[default]
    #[serde(rename = "4K")]
    FourK,
}

impl ImageSize {
    pub fn label(self) -> &'static str {
        match self {
            Self::TwoK => "2K",
            Self::FourK => "4K",
        }
    }
}

impl fmt::Display for ImageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ImageSize {
    type Err = UnsupportedLabel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "2K" => Ok(Self::TwoK),
            "4K" => Ok(Self::FourK),
            _ => Err(UnsupportedLabel { kind: "image size", label: s.to_string() }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closest_exact_shapes() {
        assert_eq!(AspectRatio::closest(1000, 1000), AspectRatio::Square);
        assert_eq!(AspectRatio::closest(1920, 1080), AspectRatio::Landscape16x9);
        assert_eq!(AspectRatio::closest(1080, 1920), AspectRatio::Portrait9x16);
        assert_eq!(AspectRatio::closest(1600, 1200), AspectRatio::Landscape4x3);
        assert_eq!(AspectRatio::closest(1200, 1600), AspectRatio::Portrait3x4);
    }

    #[test]
    fn test_closest_a4_portrait_page() {
        // 210 x 297 mm = 0.707, nearer to 0.75 than 0.5625
        assert_eq!(AspectRatio::closest(2480, 3508), AspectRatio::Portrait3x4);
    }

    #[test]
    fn test_closest_is_deterministic_and_supported() {
        for (w, h) in [(1, 1), (7, 3), (3, 7), (640, 481), (10_000, 1), (1, 10_000)] {
            let first = AspectRatio::closest(w, h);
            assert_eq!(first, AspectRatio::closest(w, h));
            assert!(AspectRatio::ALL.contains(&first));
        }
    }

    #[test]
    fn test_closest_tie_prefers_earlier_candidate() {
        // 0.875 sits exactly between 0.75 and 1.0; 1:1 is listed first
        assert_eq!(AspectRatio::closest(7, 8), AspectRatio::Square);
    }

    #[test]
    fn test_closest_zero_dimension() {
        assert_eq!(AspectRatio::closest(0, 100), AspectRatio::Square);
        assert_eq!(AspectRatio::closest(100, 0), AspectRatio::Square);
    }

    #[test]
    fn test_labels_parse_and_serialize() {
        for ratio in AspectRatio::ALL {
            assert_eq!(ratio.label().parse::<AspectRatio>().unwrap(), ratio);
            let json = serde_json::to_string(&ratio).unwrap();
            assert_eq!(json, format!("\"{}\"", ratio.label()));
        }
        assert!("2:1".parse::<AspectRatio>().is_err());
    }

    #[test]
    fn test_image_size_parse() {
        assert_eq!("2K".parse::<ImageSize>().unwrap(), ImageSize::TwoK);
        assert_eq!("4k".parse::<ImageSize>().unwrap(), ImageSize::FourK);
        let err = "8K".parse::<ImageSize>().unwrap_err();
        assert!(err.to_string().contains("image size"));
    }
}
