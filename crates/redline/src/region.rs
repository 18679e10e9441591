use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Part of the page to scan, given as fractions of the page size.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegionOfInterest {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
}

/// Pixel bounds of a region on a concrete page, half-open on right and bottom.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelBounds {
    pub left: u32,
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
}

impl PixelBounds {
    pub fn width(&self) -> u32 {
        self.right - self.left
    }

    pub fn height(&self) -> u32 {
        self.bottom - self.top
    }

    pub fn area(&self) -> u64 {
        self.width() as u64 * self.height() as u64
    }
}

impl Default for RegionOfInterest {
    fn default() -> Self {
        Self::FULL
    }
}

impl RegionOfInterest {
    pub const FULL: RegionOfInterest = RegionOfInterest {
        left: 0.0,
        top: 0.0,
        right: 1.0,
        bottom: 1.0,
    };

    pub fn new(left: f64, top: f64, right: f64, bottom: f64) -> Result<Self, ConfigError> {
        let roi = Self {
            left,
            top,
            right,
            bottom,
        };
        roi.validate()?;
        Ok(roi)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let fractions = [self.left, self.top, self.right, self.bottom];
        if fractions
            .iter()
            .any(|f| !f.is_finite() || !(0.0..=1.0).contains(f))
        {
            return Err(ConfigError::Region(format!(
                "{} has a bound outside [0, 1]",
                self
            )));
        }
        if self.left >= self.right || self.top >= self.bottom {
            return Err(ConfigError::Region(format!(
                "{} is empty: left must be below right and top below bottom",
                self
            )));
        }
        Ok(())
    }

    /// Bounds are truncated toward zero, so a region can collapse to zero pixels on a
    /// small page.
    pub fn bounds(&self, width: u32, height: u32) -> PixelBounds {
        let scale = |fraction: f64, size: u32| -> u32 {
            ((size as f64 * fraction).floor() as u32).min(size)
        };
        let left = scale(self.left, width);
        let top = scale(self.top, height);
        PixelBounds {
            left,
            top,
            right: scale(self.right, width).max(left),
            bottom: scale(self.bottom, height).max(top),
        }
    }
}

impl fmt::Display for RegionOfInterest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{},{},{},{}",
            self.left, self.top, self.right, self.bottom
        )
    }
}

impl FromStr for RegionOfInterest {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let values: Vec<f64> = s
            .split(',')
            .map(|v| v.trim().parse::<f64>())
            .collect::<Result<_, _>>()
            .map_err(|e| format!("Invalid region '{}': {}", s, e))?;
        if values.len() != 4 {
            return Err(format!(
                "Invalid region '{}': expected LEFT,TOP,RIGHT,BOTTOM fractions",
                s
            ));
        }
        RegionOfInterest::new(values[0], values[1], values[2], values[3])
            .map_err(|e| e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_region_covers_page() {
        let b = RegionOfInterest::FULL.bounds(640, 480);
        assert_eq!(
            b,
            PixelBounds {
                left: 0,
                top: 0,
                right: 640,
                bottom: 480
            }
        );
        assert_eq!(b.area(), 640 * 480);
    }

    #[test]
    fn bounds_truncate_like_integer_cast() {
        let roi: RegionOfInterest = "0.05,0,0.95,0.25".parse().unwrap();
        let b = roi.bounds(1275, 1650);
        assert_eq!(b.left, 63);
        assert_eq!(b.right, 1211);
        assert_eq!(b.top, 0);
        assert_eq!(b.bottom, 412);
    }

    #[test]
    fn tiny_page_collapses_to_zero_area() {
        let roi = RegionOfInterest::new(0.5, 0.5, 0.6, 0.6).unwrap();
        assert_eq!(roi.bounds(3, 3).area(), 0);
        assert_eq!(roi.bounds(0, 0).area(), 0);
    }

    #[test]
    fn invalid_regions_are_rejected() {
        assert!(RegionOfInterest::new(0.5, 0.0, 0.5, 1.0).is_err());
        assert!(RegionOfInterest::new(0.0, 0.0, 1.2, 1.0).is_err());
        assert!(RegionOfInterest::new(f64::NAN, 0.0, 1.0, 1.0).is_err());
        assert!("0,0,1".parse::<RegionOfInterest>().is_err());
        assert!("a,0,1,1".parse::<RegionOfInterest>().is_err());
    }
}
