use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

const CHANNEL_MAX: f64 = 255.0;

/// An 8-bit RGB triple.
///
/// Parses from `#RRGGBB`, `RRGGBB` or `R,G,B` and serializes as `#RRGGBB`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Rgb(pub [u8; 3]);

impl Rgb {
    pub const RED: Rgb = Rgb([255, 0, 0]);

    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Rgb([r, g, b])
    }

    /// Index of the strongest channel; ties resolve to the lowest index.
    pub fn dominant_channel(&self) -> usize {
        let mut best = 0;
        for c in 1..3 {
            if self.0[c] > self.0[best] {
                best = c;
            }
        }
        best
    }
}

impl FromStr for Rgb {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.contains(',') {
            let channels: Vec<&str> = s.split(',').map(str::trim).collect();
            if channels.len() != 3 {
                return Err(format!(
                    "Invalid color '{}': expected three comma-separated channels",
                    s
                ));
            }
            let mut rgb = [0u8; 3];
            for (slot, value) in rgb.iter_mut().zip(&channels) {
                *slot = value.parse().map_err(|_| {
                    format!("Invalid color '{}': channel '{}' is not in 0-255", s, value)
                })?;
            }
            return Ok(Rgb(rgb));
        }

        let hex = s.strip_prefix('#').unwrap_or(s);
        if hex.len() != 6 || !hex.is_ascii() {
            return Err(format!(
                "Invalid color '{}': expected #RRGGBB or R,G,B",
                s
            ));
        }
        let mut rgb = [0u8; 3];
        for (i, slot) in rgb.iter_mut().enumerate() {
            *slot = u8::from_str_radix(&hex[2 * i..2 * i + 2], 16)
                .map_err(|_| format!("Invalid color '{}': not a hex triplet", s))?;
        }
        Ok(Rgb(rgb))
    }
}

impl TryFrom<String> for Rgb {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Rgb> for String {
    fn from(value: Rgb) -> Self {
        value.to_string()
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [r, g, b] = self.0;
        write!(f, "#{:02X}{:02X}{:02X}", r, g, b)
    }
}

/// How far a pixel is from the marker color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ColorMetric {
    /// Straight-line distance in RGB space.
    Euclidean,
    /// Largest per-channel difference.
    Chebyshev,
    /// How weakly the marker's dominant channel stands out over the other two:
    /// `255 - max(0, p[d] - max(p[others]))`. Ignores the marker's exact shade,
    /// which makes it robust against anti-aliased strokes.
    Dominance,
}

impl ColorMetric {
    pub fn max_distance(self) -> f64 {
        match self {
            ColorMetric::Euclidean => (3.0 * CHANNEL_MAX * CHANNEL_MAX).sqrt(),
            ColorMetric::Chebyshev | ColorMetric::Dominance => CHANNEL_MAX,
        }
    }

    pub fn distance(self, marker: Rgb, pixel: [u8; 3]) -> f64 {
        match self {
            ColorMetric::Euclidean => {
                let sum: i32 = marker
                    .0
                    .iter()
                    .zip(pixel.iter())
                    .map(|(&m, &p)| {
                        let d = m as i32 - p as i32;
                        d * d
                    })
                    .sum();
                (sum as f64).sqrt()
            }
            ColorMetric::Chebyshev => marker
                .0
                .iter()
                .zip(pixel.iter())
                .map(|(&m, &p)| m.abs_diff(p))
                .max()
                .unwrap_or(0) as f64,
            ColorMetric::Dominance => {
                let d = marker.dominant_channel();
                let others = (0..3)
                    .filter(|&c| c != d)
                    .map(|c| pixel[c])
                    .max()
                    .unwrap_or(0);
                let excess = pixel[d].saturating_sub(others);
                CHANNEL_MAX - excess as f64
            }
        }
    }
}

impl fmt::Display for ColorMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ColorMetric::Euclidean => "euclidean",
            ColorMetric::Chebyshev => "chebyshev",
            ColorMetric::Dominance => "dominance",
        };
        f.write_str(name)
    }
}

impl FromStr for ColorMetric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "euclidean" => Ok(ColorMetric::Euclidean),
            "chebyshev" | "channel" => Ok(ColorMetric::Chebyshev),
            "dominance" => Ok(ColorMetric::Dominance),
            _ => Err(format!(
                "Invalid color metric '{}': expected euclidean, chebyshev or dominance",
                s
            )),
        }
    }
}
