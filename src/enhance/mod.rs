//! Ridge enhancement pipeline.
//!
//! Five deterministic stages run in order: crop to the finger region,
//! grayscale conversion, tile-based adaptive contrast, edge-preserving
//! bilateral denoise and unsharp ridge emphasis. Enhancement is best-effort
//! and total: a stage that cannot run falls back to its input and the
//! result carries a `degraded` flag instead of an error.

use crate::raster::filter::{bilateral_filter, gaussian_blur, resize_bilinear};
use crate::raster::{CropGuide, RasterBuffer, Rect};
use crate::trace::{trace_event, trace_span};
use crate::util::{RidgekitError, RidgekitResult};

pub mod contrast;

/// Tunables for the enhancement stages.
#[derive(Clone, Copy, Debug)]
pub struct EnhanceConfig {
    /// Fallback crop width as a fraction of the image width when no guide
    /// rectangle is available.
    pub crop_width_fraction: f32,
    /// Width/height aspect ratio of the fallback crop.
    pub fallback_aspect: f32,
    /// Tile grid for adaptive local contrast.
    pub contrast_grid: u32,
    /// Histogram clip limit for adaptive local contrast.
    pub clip_limit: f32,
    /// Bilateral filter window radius in pixels.
    pub bilateral_radius: u32,
    /// Bilateral spatial sigma.
    pub bilateral_sigma_spatial: f32,
    /// Bilateral range (intensity) sigma.
    pub bilateral_sigma_range: f32,
    /// Gaussian sigma of the unsharp mask blur.
    pub unsharp_sigma: f32,
    /// Unsharp gain; the blurred image is weighted `1 - gain` so the
    /// combination weights always sum to 1.
    pub unsharp_gain: f32,
    /// Long-side target for fixed-format export.
    pub export_long_side: u32,
}

impl Default for EnhanceConfig {
    fn default() -> Self {
        Self {
            crop_width_fraction: 0.45,
            fallback_aspect: 0.6,
            contrast_grid: 8,
            clip_limit: 3.0,
            bilateral_radius: 2,
            bilateral_sigma_spatial: 1.4,
            bilateral_sigma_range: 24.0,
            unsharp_sigma: 0.6,
            unsharp_gain: 1.6,
            export_long_side: 500,
        }
    }
}

/// Output of the enhancement pipeline.
#[derive(Clone, Debug)]
pub struct EnhancementResult {
    /// The enhanced single-channel image.
    pub image: RasterBuffer,
    /// Crop rectangle applied to the input, in input coordinates.
    pub crop: Rect,
    /// True when any stage fell back to its unmodified input.
    pub degraded: bool,
}

/// Stateless enhancement pipeline.
#[derive(Clone, Copy, Debug, Default)]
pub struct EnhancementPipeline {
    config: EnhanceConfig,
}

impl EnhancementPipeline {
    /// Creates a pipeline with the given configuration.
    pub fn new(config: EnhanceConfig) -> Self {
        Self { config }
    }

    /// Returns the active configuration.
    pub fn config(&self) -> &EnhanceConfig {
        &self.config
    }

    /// Enhances one captured image.
    ///
    /// `guide` is the on-screen guide rectangle in preview coordinates, if
    /// the capture collaborator knows it; otherwise a centered fractional
    /// crop with the fallback aspect ratio is used. Deterministic and
    /// total; stage failures degrade to pass-through.
    pub fn enhance(&self, image: &RasterBuffer, guide: Option<&CropGuide>) -> EnhancementResult {
        let _span = trace_span!(
            "enhance",
            width = image.width(),
            height = image.height(),
            guided = guide.is_some()
        )
        .entered();
        let cfg = &self.config;
        let mut degraded = false;

        let fallback_rect = Rect::centered_fraction(
            image.width(),
            image.height(),
            cfg.crop_width_fraction,
            cfg.fallback_aspect,
        );
        let crop_rect = match guide {
            Some(g)
                if g.rect.width > 0
                    && g.rect.height > 0
                    && g.preview_width > 0
                    && g.preview_height > 0 =>
            {
                g.scaled_to(image.width(), image.height())
            }
            Some(_) => {
                // Malformed guide: fall back to the centered crop and flag it.
                degraded = true;
                fallback_rect
            }
            None => fallback_rect,
        };

        let (cropped, crop) = match image.crop(crop_rect) {
            Ok(buf) => (buf, crop_rect),
            Err(_) => {
                degraded = true;
                (image.clone(), Rect::full(image.width(), image.height()))
            }
        };

        let gray = cropped.to_gray();

        let contrasted =
            match contrast::adaptive_local_contrast(&gray, cfg.contrast_grid, cfg.clip_limit) {
                Ok(buf) => buf,
                Err(_) => {
                    degraded = true;
                    gray.clone()
                }
            };

        let denoised = match bilateral_filter(
            &contrasted,
            cfg.bilateral_radius,
            cfg.bilateral_sigma_spatial,
            cfg.bilateral_sigma_range,
        ) {
            Ok(buf) => buf,
            Err(_) => {
                degraded = true;
                contrasted.clone()
            }
        };

        let sharpened = match self.unsharp_mask(&denoised) {
            Ok(buf) => buf,
            Err(_) => {
                degraded = true;
                denoised.clone()
            }
        };

        trace_event!(
            "enhance_done",
            crop_width = crop.width,
            crop_height = crop.height,
            degraded = degraded
        );

        EnhancementResult {
            image: sharpened,
            crop,
            degraded,
        }
    }

    /// Ridge emphasis: lightly blur, then recombine with weights summing
    /// to 1 (`gain * original - (gain - 1) * blurred`). The bounded gain
    /// keeps the result free of double-edge ghosting.
    fn unsharp_mask(&self, image: &RasterBuffer) -> RidgekitResult<RasterBuffer> {
        let cfg = &self.config;
        let blurred = gaussian_blur(image, cfg.unsharp_sigma)?;
        let gain = cfg.unsharp_gain;
        let mut out = Vec::with_capacity(image.data().len());
        for (&orig, &blur) in image.data().iter().zip(blurred.data().iter()) {
            let value = gain * f32::from(orig) - (gain - 1.0) * f32::from(blur);
            out.push(value.round().clamp(0.0, 255.0) as u8);
        }
        RasterBuffer::gray(out, image.width(), image.height())
    }

    /// Resizes an enhanced image so its longer side equals the configured
    /// target, preserving aspect ratio. A pure resize, no re-enhancement.
    pub fn export_fixed(&self, image: &RasterBuffer) -> RidgekitResult<RasterBuffer> {
        self.export_with_target(image, self.config.export_long_side)
    }

    /// As [`export_fixed`](Self::export_fixed) with an explicit target.
    pub fn export_with_target(
        &self,
        image: &RasterBuffer,
        target_long_side: u32,
    ) -> RidgekitResult<RasterBuffer> {
        if target_long_side == 0 {
            return Err(RidgekitError::InvalidDimensions {
                width: target_long_side,
                height: target_long_side,
            });
        }
        let gray = image.to_gray();
        let (w, h) = (gray.width(), gray.height());
        let (new_w, new_h) = if w >= h {
            let scaled = ((h as f32 * target_long_side as f32 / w as f32).round() as u32).max(1);
            (target_long_side, scaled)
        } else {
            let scaled = ((w as f32 * target_long_side as f32 / h as f32).round() as u32).max(1);
            (scaled, target_long_side)
        };
        resize_bilinear(&gray, new_w, new_h)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ridge_image(width: u32, height: u32) -> RasterBuffer {
        let mut data = Vec::with_capacity((width * height) as usize);
        for y in 0..height {
            for x in 0..width {
                let base = if (x / 3) % 2 == 0 { 90 } else { 170 };
                data.push((base + (y % 5)) as u8);
            }
        }
        RasterBuffer::gray(data, width, height).unwrap()
    }

    #[test]
    fn enhancement_is_deterministic() {
        let pipeline = EnhancementPipeline::default();
        let image = ridge_image(120, 160);
        let a = pipeline.enhance(&image, None);
        let b = pipeline.enhance(&image, None);
        assert_eq!(a.image, b.image);
        assert_eq!(a.crop, b.crop);
    }

    #[test]
    fn fallback_crop_is_centered_fraction() {
        let pipeline = EnhancementPipeline::default();
        let image = ridge_image(200, 300);
        let result = pipeline.enhance(&image, None);
        assert!(!result.degraded);
        // 45% of 200 = 90 wide, aspect 0.6 -> 150 tall, centered.
        assert_eq!(result.crop, Rect::new(55, 75, 90, 150));
        assert_eq!(result.image.width(), 90);
        assert_eq!(result.image.height(), 150);
    }

    #[test]
    fn guide_rect_is_scaled_from_preview() {
        let pipeline = EnhancementPipeline::default();
        let image = ridge_image(400, 600);
        let guide = CropGuide::new(Rect::new(25, 30, 50, 60), 100, 150);
        let result = pipeline.enhance(&image, Some(&guide));
        assert!(!result.degraded);
        assert_eq!(result.crop, Rect::new(100, 120, 200, 240));
    }

    #[test]
    fn malformed_guide_degrades_to_fallback() {
        let pipeline = EnhancementPipeline::default();
        let image = ridge_image(200, 300);
        let guide = CropGuide::new(Rect::new(10, 10, 0, 0), 100, 150);
        let result = pipeline.enhance(&image, Some(&guide));
        assert!(result.degraded);
        assert_eq!(result.image.width(), 90);
    }

    #[test]
    fn zero_preview_height_guide_degrades_to_fallback() {
        let pipeline = EnhancementPipeline::default();
        let image = ridge_image(200, 300);
        let guide = CropGuide::new(Rect::new(10, 10, 50, 60), 100, 0);
        let result = pipeline.enhance(&image, Some(&guide));
        assert!(result.degraded);
        assert_eq!(result.crop, Rect::new(55, 75, 90, 150));
    }

    #[test]
    fn odd_crop_widths_enhance_without_degrading() {
        let pipeline = EnhancementPipeline::default();
        // 45% of 60 is 27 px, which does not divide the contrast tile grid.
        let result = pipeline.enhance(&ridge_image(60, 90), None);
        assert!(!result.degraded);
        assert_eq!(result.image.width(), 27);
        assert_eq!(result.image.height(), 45);
    }

    #[test]
    fn export_scales_long_side() {
        let pipeline = EnhancementPipeline::default();
        let image = ridge_image(800, 600);
        let exported = pipeline.export_fixed(&image).unwrap();
        assert_eq!(exported.width(), 500);
        assert_eq!(exported.height(), 375);

        let portrait = ridge_image(600, 800);
        let exported = pipeline.export_fixed(&portrait).unwrap();
        assert_eq!(exported.width(), 375);
        assert_eq!(exported.height(), 500);
    }

    #[test]
    fn output_is_single_channel() {
        let pipeline = EnhancementPipeline::default();
        let rgb = RasterBuffer::new(vec![100u8; 60 * 90 * 3], 60, 90, 3).unwrap();
        let result = pipeline.enhance(&rgb, None);
        assert!(result.image.is_gray());
    }
}
