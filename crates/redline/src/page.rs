use crate::error::FormatError;
use image::DynamicImage;
use std::{fmt, path::Path};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelLayout {
    Rgb8,
    Rgba8,
}

impl PixelLayout {
    pub fn channels(self) -> usize {
        match self {
            PixelLayout::Rgb8 => 3,
            PixelLayout::Rgba8 => 4,
        }
    }
}

impl fmt::Display for PixelLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PixelLayout::Rgb8 => f.write_str("RGB8"),
            PixelLayout::Rgba8 => f.write_str("RGBA8"),
        }
    }
}

/// One rasterized PDF page held as a row-major 8-bit pixel grid.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedPage {
    width: u32,
    height: u32,
    layout: PixelLayout,
    pixels: Vec<u8>,
}

impl RenderedPage {
    pub fn from_raw(
        width: u32,
        height: u32,
        layout: PixelLayout,
        pixels: Vec<u8>,
    ) -> Result<Self, FormatError> {
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|n| n.checked_mul(layout.channels()));
        match expected {
            Some(expected) if expected == pixels.len() => Ok(Self {
                width,
                height,
                layout,
                pixels,
            }),
            _ => Err(FormatError::BufferSize {
                width,
                height,
                layout,
                expected: expected.unwrap_or(usize::MAX),
                actual: pixels.len(),
            }),
        }
    }

    /// Wider channel depths are narrowed to 8 bits; grayscale has no color to match
    /// against and is rejected.
    pub fn from_image(image: DynamicImage) -> Result<Self, FormatError> {
        let (width, height) = (image.width(), image.height());
        match image {
            DynamicImage::ImageRgb8(buf) => {
                Self::from_raw(width, height, PixelLayout::Rgb8, buf.into_raw())
            }
            DynamicImage::ImageRgba8(buf) => {
                Self::from_raw(width, height, PixelLayout::Rgba8, buf.into_raw())
            }
            img @ (DynamicImage::ImageRgb16(_) | DynamicImage::ImageRgb32F(_)) => {
                Self::from_raw(width, height, PixelLayout::Rgb8, img.to_rgb8().into_raw())
            }
            img @ (DynamicImage::ImageRgba16(_) | DynamicImage::ImageRgba32F(_)) => {
                Self::from_raw(width, height, PixelLayout::Rgba8, img.to_rgba8().into_raw())
            }
            other => Err(FormatError::UnsupportedEncoding(format!(
                "{:?}",
                other.color()
            ))),
        }
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, FormatError> {
        let image =
            image::load_from_memory(bytes).map_err(|e| FormatError::Decode(e.to_string()))?;
        Self::from_image(image)
    }

    pub fn open(path: &Path) -> Result<Self, FormatError> {
        let image = image::open(path)
            .map_err(|e| FormatError::Decode(format!("{}: {}", path.display(), e)))?;
        Self::from_image(image)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn layout(&self) -> PixelLayout {
        self.layout
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// RGB of the pixel at `(x, y)`; alpha, if any, is dropped.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let channels = self.layout.channels();
        let offset = (y as usize * self.width as usize + x as usize) * channels;
        let px = &self.pixels[offset..offset + 3];
        Some([px[0], px[1], px[2]])
    }

    /// Raw bytes of row `y`, `width * channels` long.
    pub(crate) fn row(&self, y: u32) -> &[u8] {
        let stride = self.width as usize * self.layout.channels();
        let start = y as usize * stride;
        &self.pixels[start..start + stride]
    }
}
