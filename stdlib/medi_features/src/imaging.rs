//! Image assembly for the chest X-ray tool.
//!
//! Decodes an uploaded PNG or JPEG, resizes it to the fixed resolution the
//! network was trained at and lays the pixels out as a height × width ×
//! channels tensor. Values stay on the 0–255 pixel scale; rescaling is the
//! preprocessor's job.

use ::image::imageops::FilterType;
use ::image::DynamicImage;
use log::debug;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

pub const DEFAULT_SIDE: usize = 150;
pub const DEFAULT_CHANNELS: usize = 3;

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("could not decode image: {0}")]
    Decode(#[from] ::image::ImageError),
    #[error("could not read image: {0}")]
    Io(#[from] std::io::Error),
    #[error("image tensor shape {found:?} does not match expected {expected:?}")]
    Shape {
        expected: [usize; 3],
        found: Vec<usize>,
    },
    #[error("pixel {index} = {value} is outside [0, 255]")]
    PixelRange { index: usize, value: f32 },
    #[error("unsupported channel count {0} (expected 1 or 3)")]
    UnsupportedChannels(usize),
}

/// Height × width × channels pixel tensor, row-major.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageTensor {
    pub height: usize,
    pub width: usize,
    pub channels: usize,
    pub data: Vec<f32>,
}

impl ImageTensor {
    pub fn shape(&self) -> [usize; 3] {
        [self.height, self.width, self.channels]
    }

    /// Value at row `y`, column `x`, channel `c`, if inside the tensor.
    pub fn pixel(&self, y: usize, x: usize, c: usize) -> Option<f32> {
        if y >= self.height || x >= self.width || c >= self.channels {
            return None;
        }
        self.data.get((y * self.width + x) * self.channels + c).copied()
    }
}

/// Turns uploads into tensors of one fixed shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageAssembler {
    pub height: usize,
    pub width: usize,
    pub channels: usize,
}

impl Default for ImageAssembler {
    fn default() -> Self {
        Self {
            height: DEFAULT_SIDE,
            width: DEFAULT_SIDE,
            channels: DEFAULT_CHANNELS,
        }
    }
}

impl ImageAssembler {
    pub fn new(height: usize, width: usize, channels: usize) -> Result<Self, ImageError> {
        if channels != 1 && channels != 3 {
            return Err(ImageError::UnsupportedChannels(channels));
        }
        Ok(Self {
            height,
            width,
            channels,
        })
    }

    pub fn shape(&self) -> [usize; 3] {
        [self.height, self.width, self.channels]
    }

    /// Decode encoded image bytes and resize with nearest-neighbour sampling.
    pub fn assemble(&self, bytes: &[u8]) -> Result<ImageTensor, ImageError> {
        let img = ::image::load_from_memory(bytes)?;
        debug!(
            "decoded {}x{} image, resizing to {}x{}",
            img.width(),
            img.height(),
            self.width,
            self.height
        );
        self.from_decoded(&img)
    }

    pub fn open(&self, path: impl AsRef<Path>) -> Result<ImageTensor, ImageError> {
        let bytes = std::fs::read(path)?;
        self.assemble(&bytes)
    }

    pub fn from_decoded(&self, img: &DynamicImage) -> Result<ImageTensor, ImageError> {
        let resized = img.resize_exact(self.width as u32, self.height as u32, FilterType::Nearest);
        let raw = match self.channels {
            1 => resized.to_luma8().into_raw(),
            3 => resized.to_rgb8().into_raw(),
            n => return Err(ImageError::UnsupportedChannels(n)),
        };
        Ok(ImageTensor {
            height: self.height,
            width: self.width,
            channels: self.channels,
            data: raw.into_iter().map(f32::from).collect(),
        })
    }

    /// Accept an already-decoded pixel array, checking shape and range.
    pub fn from_pixels(&self, shape: &[usize], data: Vec<f32>) -> Result<ImageTensor, ImageError> {
        let expected = self.shape();
        let len: usize = expected.iter().product();
        if shape != expected || data.len() != len {
            let mut found = shape.to_vec();
            if shape == expected {
                found = vec![data.len()];
            }
            return Err(ImageError::Shape { expected, found });
        }
        if let Some((index, &value)) = data
            .iter()
            .enumerate()
            .find(|(_, v)| !(0.0..=255.0).contains(*v))
        {
            return Err(ImageError::PixelRange { index, value });
        }
        Ok(ImageTensor {
            height: self.height,
            width: self.width,
            channels: self.channels,
            data,
        })
    }
}
