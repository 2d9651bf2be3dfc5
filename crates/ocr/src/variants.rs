//! Preprocessed variants of one packaging photo.
//!
//! Printed expiry dates come embossed, inkjet-dotted, light-on-dark or shot
//! under glare. No single binarization reads all of them, so every photo is
//! turned into a handful of variants and each one is sent through OCR.

use image::imageops::{self, FilterType};
use image::{DynamicImage, GrayImage, ImageBuffer, Luma};
use imageproc::contrast::otsu_level;
use imageproc::distance_transform::Norm;
use imageproc::filter::{gaussian_blur_f32, median_filter};
use imageproc::integral_image::{integral_image, sum_image_pixels};
use imageproc::morphology::{close, open};
use std::fmt;

use crate::config::PreprocessConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VariantKind {
    /// Local equalization, light blur, adaptive threshold.
    Adaptive,
    /// Median denoise, global Otsu threshold.
    Otsu,
    /// `Adaptive` with speckle removed by close/open.
    Morphology,
    /// `Adaptive` inverted, for light print on dark packaging.
    Inverted,
    /// Plain grayscale; only produced for degenerate inputs.
    Grayscale,
}

impl fmt::Display for VariantKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VariantKind::Adaptive => write!(f, "adaptive"),
            VariantKind::Otsu => write!(f, "otsu"),
            VariantKind::Morphology => write!(f, "morphology"),
            VariantKind::Inverted => write!(f, "inverted"),
            VariantKind::Grayscale => write!(f, "grayscale"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ImageVariant {
    pub kind: VariantKind,
    pub image: GrayImage,
}

pub struct VariantGenerator {
    config: PreprocessConfig,
}

impl VariantGenerator {
    pub fn new(config: PreprocessConfig) -> Self {
        Self { config }
    }

    /// Produce the ordered variant set `[adaptive, otsu, morphology, inverted]`.
    /// Never fails and never returns an empty list.
    pub fn generate(&self, image: &DynamicImage) -> Vec<ImageVariant> {
        let start = std::time::Instant::now();
        let gray = image.to_luma8();

        if gray.width() == 0 || gray.height() == 0 {
            return vec![ImageVariant { kind: VariantKind::Grayscale, image: gray }];
        }

        let cfg = &self.config;
        let equalized = equalize_local_contrast(&gray, cfg.clahe_clip_limit, cfg.clahe_grid);
        let blurred = if cfg.blur_sigma > 0.0 {
            gaussian_blur_f32(&equalized, cfg.blur_sigma)
        } else {
            equalized
        };
        let adaptive = adaptive_threshold(&blurred, cfg.adaptive_block_radius, cfg.adaptive_offset);

        let denoised = median_filter(&gray, 1, 1);
        let otsu = binarize(&denoised, otsu_level(&denoised));

        let morphology = remove_speckle(&adaptive);

        let mut inverted = adaptive.clone();
        imageops::invert(&mut inverted);

        let variants: Vec<ImageVariant> = [
            (VariantKind::Adaptive, adaptive),
            (VariantKind::Otsu, otsu),
            (VariantKind::Morphology, morphology),
            (VariantKind::Inverted, inverted),
        ]
        .into_iter()
        .map(|(kind, image)| ImageVariant { kind, image: self.upscale_if_small(image) })
        .collect();

        tracing::debug!(
            "Generated {} variants from {}x{} in {}ms",
            variants.len(),
            gray.width(),
            gray.height(),
            start.elapsed().as_millis()
        );
        variants
    }

    fn upscale_if_small(&self, image: GrayImage) -> GrayImage {
        let (w, h) = image.dimensions();
        match self.upscaled_dimensions(w, h) {
            Some((new_w, new_h)) => imageops::resize(&image, new_w, new_h, FilterType::CatmullRom),
            None => image,
        }
    }

    /// Target size for a variant with a side under `min_side`, or `None` when
    /// it stays as is. The area never exceeds `max_pixels`.
    fn upscaled_dimensions(&self, w: u32, h: u32) -> Option<(u32, u32)> {
        let cfg = &self.config;
        if (w >= cfg.min_side && h >= cfg.min_side) || w == 0 || h == 0 {
            return None;
        }
        let area = w as u64 * h as u64;
        let wanted = (cfg.min_side as f64 / h as f64)
            .max(cfg.min_side as f64 / w as f64)
            .max(cfg.min_upscale as f64);
        let ceiling = (cfg.max_pixels as f64 / area as f64).sqrt();
        let scale = wanted.min(ceiling);
        if scale <= 1.0 {
            return None;
        }

        let size = |round: fn(f64) -> f64| {
            let new_w = (round(w as f64 * scale) as u64).max(1);
            let new_h = (round(h as f64 * scale) as u64).max(1);
            (new_w, new_h)
        };
        let (mut new_w, mut new_h) = size(f64::round);
        if new_w * new_h > cfg.max_pixels {
            (new_w, new_h) = size(f64::floor);
        }
        if scale < wanted {
            tracing::debug!("Upscale of {w}x{h} capped at {new_w}x{new_h}");
        }
        Some((u32::try_from(new_w).ok()?, u32::try_from(new_h).ok()?))
    }
}

impl Default for VariantGenerator {
    fn default() -> Self {
        Self::new(PreprocessConfig::default())
    }
}

// ── Local contrast equalization (CLAHE) ───────────────────────────────────────

/// Tiled histogram equalization with a clip limit. Each tile gets its own
/// lookup table; pixels blend the four nearest tables bilinearly so tile
/// borders do not show.
fn equalize_local_contrast(gray: &GrayImage, clip_limit: f32, grid: u32) -> GrayImage {
    let (w, h) = gray.dimensions();
    let grid = grid.max(1);
    let tile_w = w.div_ceil(grid).max(1);
    let tile_h = h.div_ceil(grid).max(1);
    let tiles_x = w.div_ceil(tile_w);
    let tiles_y = h.div_ceil(tile_h);

    let mut luts = Vec::with_capacity((tiles_x * tiles_y) as usize);
    for ty in 0..tiles_y {
        for tx in 0..tiles_x {
            let (x0, y0) = (tx * tile_w, ty * tile_h);
            let (x1, y1) = ((x0 + tile_w).min(w), (y0 + tile_h).min(h));
            let mut hist = [0u32; 256];
            for y in y0..y1 {
                for x in x0..x1 {
                    hist[gray.get_pixel(x, y)[0] as usize] += 1;
                }
            }
            luts.push(clipped_equalization(&mut hist, (x1 - x0) * (y1 - y0), clip_limit));
        }
    }

    ImageBuffer::from_fn(w, h, |x, y| {
        let (tx0, tx1, ax) = neighbour_tiles((x as f32 + 0.5) / tile_w as f32 - 0.5, tiles_x);
        let (ty0, ty1, ay) = neighbour_tiles((y as f32 + 0.5) / tile_h as f32 - 0.5, tiles_y);
        let v = gray.get_pixel(x, y)[0] as usize;
        let at = |tx: u32, ty: u32| luts[(ty * tiles_x + tx) as usize][v] as f32;
        let top = at(tx0, ty0) * (1.0 - ax) + at(tx1, ty0) * ax;
        let bottom = at(tx0, ty1) * (1.0 - ax) + at(tx1, ty1) * ax;
        Luma([(top * (1.0 - ay) + bottom * ay).round().clamp(0.0, 255.0) as u8])
    })
}

fn neighbour_tiles(pos: f32, count: u32) -> (u32, u32, f32) {
    if pos <= 0.0 {
        return (0, 0, 0.0);
    }
    let i0 = (pos.floor() as u32).min(count - 1);
    let i1 = (i0 + 1).min(count - 1);
    (i0, i1, (pos - i0 as f32).clamp(0.0, 1.0))
}

fn clipped_equalization(hist: &mut [u32; 256], area: u32, clip_limit: f32) -> [u8; 256] {
    if clip_limit > 0.0 {
        let limit = ((clip_limit * area as f32 / 256.0) as u32).max(1);
        let mut excess = 0u32;
        for bin in hist.iter_mut() {
            if *bin > limit {
                excess += *bin - limit;
                *bin = limit;
            }
        }
        let bonus = excess / 256;
        let mut remainder = excess % 256;
        for bin in hist.iter_mut() {
            *bin += bonus;
            if remainder > 0 {
                *bin += 1;
                remainder -= 1;
            }
        }
    }

    let mut lut = [0u8; 256];
    let scale = 255.0 / area.max(1) as f32;
    let mut cdf = 0u32;
    for (v, &count) in hist.iter().enumerate() {
        cdf += count;
        lut[v] = (cdf as f32 * scale).round().min(255.0) as u8;
    }
    lut
}

// ── Thresholding ──────────────────────────────────────────────────────────────

/// Local-mean threshold over a `(2r+1)²` window: a pixel is white when it is
/// brighter than the window mean minus `offset`.
fn adaptive_threshold(gray: &GrayImage, radius: u32, offset: i32) -> GrayImage {
    let (w, h) = gray.dimensions();
    let integral = integral_image::<_, u64>(gray);

    ImageBuffer::from_fn(w, h, |x, y| {
        let (x0, y0) = (x.saturating_sub(radius), y.saturating_sub(radius));
        let (x1, y1) = ((x + radius).min(w - 1), (y + radius).min(h - 1));
        let sum = sum_image_pixels(&integral, x0, y0, x1, y1)[0];
        let count = ((x1 - x0 + 1) * (y1 - y0 + 1)) as f64;
        let threshold = sum as f64 / count - offset as f64;
        if gray.get_pixel(x, y)[0] as f64 > threshold {
            Luma([255u8])
        } else {
            Luma([0u8])
        }
    })
}

fn binarize(gray: &GrayImage, level: u8) -> GrayImage {
    ImageBuffer::from_fn(gray.width(), gray.height(), |x, y| {
        if gray.get_pixel(x, y)[0] > level {
            Luma([255u8])
        } else {
            Luma([0u8])
        }
    })
}

/// Close then open with the smallest structuring element: fills pinholes in
/// strokes, then drops isolated dots.
fn remove_speckle(binary: &GrayImage) -> GrayImage {
    let closed = close(binary, Norm::L1, 1);
    open(&closed, Norm::L1, 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;

    fn solid(width: u32, height: u32, value: u8) -> GrayImage {
        ImageBuffer::from_fn(width, height, |_, _| Luma([value]))
    }

    fn split_halves(width: u32, height: u32) -> GrayImage {
        ImageBuffer::from_fn(width, height, |x, _| {
            if x < width / 2 { Luma([30u8]) } else { Luma([220u8]) }
        })
    }

    fn is_binary(img: &GrayImage) -> bool {
        img.pixels().all(|p| p[0] == 0 || p[0] == 255)
    }

    #[test]
    fn produces_four_variants_in_order() {
        let variants = VariantGenerator::default().generate(&DynamicImage::ImageLuma8(solid(50, 40, 128)));
        let kinds: Vec<_> = variants.iter().map(|v| v.kind).collect();
        assert_eq!(
            kinds,
            vec![VariantKind::Adaptive, VariantKind::Otsu, VariantKind::Morphology, VariantKind::Inverted]
        );
    }

    #[test]
    fn small_inputs_are_upscaled_to_min_side() {
        let variants = VariantGenerator::default().generate(&DynamicImage::ImageLuma8(solid(100, 50, 90)));
        for v in &variants {
            // max(800/50, 800/100, 2) = 16
            assert_eq!(v.image.dimensions(), (1600, 800), "{}", v.kind);
        }
    }

    #[test]
    fn upscale_is_at_least_twofold() {
        let variants = VariantGenerator::default().generate(&DynamicImage::ImageLuma8(solid(900, 700, 90)));
        assert_eq!(variants[0].image.dimensions(), (1800, 1400));
    }

    #[test]
    fn thin_strip_upscale_is_capped() {
        let generator = VariantGenerator::default();
        let (w, h) = generator.upscaled_dimensions(2, 40_000).unwrap();
        assert!((w as u64) * (h as u64) <= 40_000_000, "{w}x{h}");
        assert!(w > 2 && h > 40_000);
    }

    #[test]
    fn capped_strip_still_yields_variants() {
        let generator = VariantGenerator::new(PreprocessConfig {
            max_pixels: 200_000,
            ..PreprocessConfig::default()
        });
        let strip = DynamicImage::ImageLuma8(solid(2, 40_000, 200));
        let variants = generator.generate(&strip);
        assert_eq!(variants.len(), 4);
        for v in &variants {
            let (w, h) = v.image.dimensions();
            assert!((w as u64) * (h as u64) <= 200_000, "{w}x{h}");
        }
    }

    #[test]
    fn oversized_input_is_never_shrunk() {
        let generator = VariantGenerator::new(PreprocessConfig {
            max_pixels: 1_000,
            ..PreprocessConfig::default()
        });
        assert_eq!(generator.upscaled_dimensions(10, 500), None);
    }

    #[test]
    fn large_inputs_keep_their_size() {
        let variants = VariantGenerator::default().generate(&DynamicImage::ImageLuma8(split_halves(820, 810)));
        for v in &variants {
            assert_eq!(v.image.dimensions(), (820, 810));
            assert!(is_binary(&v.image), "{} not binary", v.kind);
        }
    }

    #[test]
    fn inverted_is_complement_of_adaptive() {
        let variants = VariantGenerator::default().generate(&DynamicImage::ImageLuma8(split_halves(800, 800)));
        let adaptive = &variants[0].image;
        let inverted = &variants[3].image;
        assert!(adaptive
            .pixels()
            .zip(inverted.pixels())
            .all(|(a, i)| a[0] == 255 - i[0]));
    }

    #[test]
    fn otsu_separates_dark_and_light_halves() {
        let variants = VariantGenerator::default().generate(&DynamicImage::ImageLuma8(split_halves(800, 800)));
        let otsu = &variants[1].image;
        assert_eq!(otsu.get_pixel(10, 10)[0], 0);
        assert_eq!(otsu.get_pixel(790, 10)[0], 255);
    }

    #[test]
    fn color_input_is_accepted() {
        let rgb: RgbImage = ImageBuffer::from_fn(30, 30, |x, y| image::Rgb([(x * 8) as u8, (y * 8) as u8, 100]));
        let variants = VariantGenerator::default().generate(&DynamicImage::ImageRgb8(rgb));
        assert_eq!(variants.len(), 4);
    }

    #[test]
    fn degenerate_input_still_yields_a_variant() {
        let variants = VariantGenerator::default().generate(&DynamicImage::ImageLuma8(GrayImage::new(0, 0)));
        assert_eq!(variants.len(), 1);
        assert_eq!(variants[0].kind, VariantKind::Grayscale);
    }

    #[test]
    fn local_equalization_keeps_uniform_images_uniform() {
        let out = equalize_local_contrast(&solid(64, 48, 77), 2.0, 8);
        let first = out.get_pixel(0, 0)[0];
        assert!(out.pixels().all(|p| p[0] == first));
    }

    #[test]
    fn local_equalization_preserves_brightness_order() {
        let faint: GrayImage = ImageBuffer::from_fn(64, 64, |x, _| Luma([if x % 2 == 0 { 120u8 } else { 130 }]));
        let out = equalize_local_contrast(&faint, 2.0, 8);
        for y in 0..64 {
            for x in (0..64).step_by(2) {
                assert!(out.get_pixel(x + 1, y)[0] > out.get_pixel(x, y)[0], "at ({x},{y})");
            }
        }
    }

    #[test]
    fn adaptive_threshold_on_uniform_image_is_white() {
        let out = adaptive_threshold(&solid(20, 20, 100), 5, 2);
        assert!(out.pixels().all(|p| p[0] == 255));
    }

    #[test]
    fn adaptive_threshold_marks_dark_stroke() {
        let mut img = solid(21, 21, 200);
        for y in 0..21 {
            img.put_pixel(10, y, Luma([20]));
        }
        let out = adaptive_threshold(&img, 5, 2);
        assert_eq!(out.get_pixel(10, 10)[0], 0);
        assert_eq!(out.get_pixel(3, 10)[0], 255);
    }

    #[test]
    fn speckle_is_removed() {
        let mut img = solid(20, 20, 255);
        img.put_pixel(10, 10, Luma([0]));
        let out = remove_speckle(&img);
        assert!(out.pixels().all(|p| p[0] == 255));
    }

    #[test]
    fn adaptive_window_is_clipped_at_borders() {
        let ramp: GrayImage = ImageBuffer::from_fn(3, 1, |x, _| Luma([(x * 100) as u8]));
        let out = adaptive_threshold(&ramp, 1, 0);
        // means: 50, 100, 150
        let row: Vec<u8> = out.pixels().map(|p| p[0]).collect();
        assert_eq!(row, vec![0, 0, 255]);
    }
}
