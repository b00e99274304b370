//! Raster buffers and crop geometry.
//!
//! `RasterBuffer` is the owned image representation every pipeline stage
//! consumes and produces. Construction validates the shape, so a buffer that
//! exists is always non-empty and exactly sized; stages hand each other new
//! buffers rather than mutating in place.

use crate::util::{RidgekitError, RidgekitResult};

pub mod filter;

/// Owned raster image with interleaved channels.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RasterBuffer {
    data: Vec<u8>,
    width: u32,
    height: u32,
    channels: u8,
}

impl RasterBuffer {
    /// Creates a buffer from interleaved pixel data.
    ///
    /// `channels` must be 1 (grayscale), 3 (RGB) or 4 (RGBA), and `data`
    /// must hold exactly `width * height * channels` bytes.
    pub fn new(data: Vec<u8>, width: u32, height: u32, channels: u8) -> RidgekitResult<Self> {
        if width == 0 || height == 0 {
            return Err(RidgekitError::InvalidDimensions { width, height });
        }
        if !matches!(channels, 1 | 3 | 4) {
            return Err(RidgekitError::UnsupportedChannels { channels });
        }
        let needed = (width as usize)
            .checked_mul(height as usize)
            .and_then(|v| v.checked_mul(channels as usize))
            .ok_or(RidgekitError::InvalidDimensions { width, height })?;
        if data.len() < needed {
            return Err(RidgekitError::BufferTooSmall {
                needed,
                got: data.len(),
            });
        }
        if data.len() > needed {
            return Err(RidgekitError::InvalidDimensions { width, height });
        }
        Ok(Self {
            data,
            width,
            height,
            channels,
        })
    }

    /// Creates a single-channel buffer.
    pub fn gray(data: Vec<u8>, width: u32, height: u32) -> RidgekitResult<Self> {
        Self::new(data, width, height, 1)
    }

    /// Creates a single-channel buffer filled with a constant intensity.
    pub fn gray_filled(width: u32, height: u32, value: u8) -> RidgekitResult<Self> {
        if width == 0 || height == 0 {
            return Err(RidgekitError::InvalidDimensions { width, height });
        }
        let len = width as usize * height as usize;
        Self::gray(vec![value; len], width, height)
    }

    /// Returns the image width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Returns the image height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Returns the number of interleaved channels.
    pub fn channels(&self) -> u8 {
        self.channels
    }

    /// Returns true for single-channel buffers.
    pub fn is_gray(&self) -> bool {
        self.channels == 1
    }

    /// Returns the raw interleaved pixel data.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Consumes the buffer and returns the raw pixel data.
    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    /// Returns the grayscale intensity at `(x, y)` for single-channel buffers.
    pub fn gray_at(&self, x: u32, y: u32) -> Option<u8> {
        if self.channels != 1 || x >= self.width || y >= self.height {
            return None;
        }
        let idx = y as usize * self.width as usize + x as usize;
        self.data.get(idx).copied()
    }

    /// Returns a contiguous grayscale row for single-channel buffers.
    pub fn row(&self, y: u32) -> Option<&[u8]> {
        if self.channels != 1 || y >= self.height {
            return None;
        }
        let start = y as usize * self.width as usize;
        self.data.get(start..start + self.width as usize)
    }

    /// Converts to a single-channel buffer using Rec. 601 luma weights.
    ///
    /// Grayscale input is cloned unchanged; the alpha channel of RGBA input
    /// is ignored.
    pub fn to_gray(&self) -> RasterBuffer {
        if self.channels == 1 {
            return self.clone();
        }
        let step = self.channels as usize;
        let mut out = Vec::with_capacity(self.width as usize * self.height as usize);
        for px in self.data.chunks_exact(step) {
            let r = u32::from(px[0]);
            let g = u32::from(px[1]);
            let b = u32::from(px[2]);
            let luma = (299 * r + 587 * g + 114 * b + 500) / 1000;
            out.push(luma as u8);
        }
        RasterBuffer {
            data: out,
            width: self.width,
            height: self.height,
            channels: 1,
        }
    }

    /// Returns a new buffer holding the pixels inside `rect`.
    pub fn crop(&self, rect: Rect) -> RidgekitResult<RasterBuffer> {
        let (x1, y1) = (
            rect.x.checked_add(rect.width),
            rect.y.checked_add(rect.height),
        );
        let in_bounds = matches!((x1, y1), (Some(x1), Some(y1)) if x1 <= self.width && y1 <= self.height);
        if rect.width == 0 || rect.height == 0 || !in_bounds {
            return Err(RidgekitError::RegionOutOfBounds {
                x: rect.x,
                y: rect.y,
                width: rect.width,
                height: rect.height,
                img_width: self.width,
                img_height: self.height,
            });
        }

        let step = self.channels as usize;
        let row_len = rect.width as usize * step;
        let mut out = Vec::with_capacity(rect.height as usize * row_len);
        for y in rect.y..rect.y + rect.height {
            let start = (y as usize * self.width as usize + rect.x as usize) * step;
            out.extend_from_slice(&self.data[start..start + row_len]);
        }
        RasterBuffer::new(out, rect.width, rect.height, self.channels)
    }
}

/// Axis-aligned pixel rectangle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rect {
    /// Left edge (column) of the rectangle.
    pub x: u32,
    /// Top edge (row) of the rectangle.
    pub y: u32,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Rect {
    /// Creates a rectangle.
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Rectangle spanning a whole image of the given size.
    pub fn full(width: u32, height: u32) -> Self {
        Self::new(0, 0, width, height)
    }

    /// Centered rectangle taking `width_fraction` of the image width, with
    /// the given width/height aspect ratio. Clamped to fit the image.
    pub fn centered_fraction(
        img_width: u32,
        img_height: u32,
        width_fraction: f32,
        aspect: f32,
    ) -> Self {
        let frac = width_fraction.clamp(0.05, 1.0);
        let aspect = if aspect > 0.0 { aspect } else { 1.0 };
        let mut w = ((img_width as f32 * frac).round() as u32).max(1).min(img_width);
        let mut h = ((w as f32 / aspect).round() as u32).max(1);
        if h > img_height {
            h = img_height;
            w = ((h as f32 * aspect).round() as u32).max(1).min(img_width);
        }
        let x = (img_width - w) / 2;
        let y = (img_height - h) / 2;
        Self::new(x, y, w, h)
    }

    /// Clamps the rectangle so it fits inside an image of the given size.
    pub fn clamped_to(self, img_width: u32, img_height: u32) -> Self {
        let x = self.x.min(img_width.saturating_sub(1));
        let y = self.y.min(img_height.saturating_sub(1));
        let width = self.width.min(img_width - x).max(1);
        let height = self.height.min(img_height - y).max(1);
        Self::new(x, y, width, height)
    }
}

/// Expected finger region expressed in preview coordinates.
///
/// The capture collaborator shows the user a guide rectangle over a preview
/// of one resolution and captures at another; `scaled_to` maps the rectangle
/// into the captured image's coordinate space.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CropGuide {
    /// Guide rectangle in preview coordinates.
    pub rect: Rect,
    /// Preview width in pixels.
    pub preview_width: u32,
    /// Preview height in pixels.
    pub preview_height: u32,
}

impl CropGuide {
    /// Creates a guide for a preview of the given size.
    pub fn new(rect: Rect, preview_width: u32, preview_height: u32) -> Self {
        Self {
            rect,
            preview_width,
            preview_height,
        }
    }

    /// Width/height aspect ratio of the guide rectangle.
    pub fn aspect(&self) -> f32 {
        if self.rect.height == 0 {
            return 1.0;
        }
        self.rect.width as f32 / self.rect.height as f32
    }

    /// Scales the guide rectangle into the coordinate space of an image of
    /// the given size, clamped to its bounds.
    pub fn scaled_to(&self, img_width: u32, img_height: u32) -> Rect {
        if self.preview_width == 0 || self.preview_height == 0 {
            return Rect::full(img_width, img_height);
        }
        let sx = img_width as f32 / self.preview_width as f32;
        let sy = img_height as f32 / self.preview_height as f32;
        let rect = Rect::new(
            (self.rect.x as f32 * sx).round() as u32,
            (self.rect.y as f32 * sy).round() as u32,
            ((self.rect.width as f32 * sx).round() as u32).max(1),
            ((self.rect.height as f32 * sy).round() as u32).max(1),
        );
        rect.clamped_to(img_width, img_height)
    }
}
