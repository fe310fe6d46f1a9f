//! 纯 Rust 视觉后端，基于 `image` crate

use super::{contour, Contour, HsvImage, HsvRange, Mask, VisionOps};
use crate::core::error::VisionError;
use image::imageops::{self, FilterType};
use image::{GrayImage, RgbImage};
use rayon::prelude::*;

/// In-process implementation of [`VisionOps`].
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeVision;

impl NativeVision {
    pub fn new() -> Self {
        Self
    }

    /// OpenCV 8-bit convention: H = degrees / 2, S and V scaled to 0..255.
    #[inline]
    pub fn rgb_to_hsv(r: u8, g: u8, b: u8) -> [u8; 3] {
        let (rf, gf, bf) = (r as f32, g as f32, b as f32);
        let max = rf.max(gf).max(bf);
        let min = rf.min(gf).min(bf);
        let delta = max - min;

        let s = if max > 0.0 { delta * 255.0 / max } else { 0.0 };

        let mut h = if delta == 0.0 {
            0.0
        } else if max == rf {
            60.0 * (gf - bf) / delta
        } else if max == gf {
            120.0 + 60.0 * (bf - rf) / delta
        } else {
            240.0 + 60.0 * (rf - gf) / delta
        };
        if h < 0.0 {
            h += 360.0;
        }

        // 360 degrees wraps to hue 0
        let h = ((h / 2.0).round() as u32 % 180) as u8;
        [h, s.round() as u8, max as u8]
    }

    /// Square min (erode) or max (dilate) filter. Out-of-bounds pixels are
    /// ignored, so borders neither grow nor shrink shapes.
    fn rank_filter(mask: &Mask, kernel_size: u32, take_max: bool) -> Mask {
        let (w, h) = mask.dimensions();
        let r = (kernel_size / 2) as i64;
        if r == 0 || w == 0 || h == 0 {
            return mask.clone();
        }
        let pick = |a: u8, b: u8| if take_max { a.max(b) } else { a.min(b) };
        let (wi, hi) = (w as i64, h as i64);

        // Separable: rows first, then columns.
        let src = mask.as_raw();
        let mut rows = vec![0u8; src.len()];
        for y in 0..hi {
            for x in 0..wi {
                let mut acc = src[(y * wi + x) as usize];
                for nx in (x - r).max(0)..=(x + r).min(wi - 1) {
                    acc = pick(acc, src[(y * wi + nx) as usize]);
                }
                rows[(y * wi + x) as usize] = acc;
            }
        }

        let mut out = vec![0u8; src.len()];
        for y in 0..hi {
            for x in 0..wi {
                let mut acc = rows[(y * wi + x) as usize];
                for ny in (y - r).max(0)..=(y + r).min(hi - 1) {
                    acc = pick(acc, rows[(ny * wi + x) as usize]);
                }
                out[(y * wi + x) as usize] = acc;
            }
        }

        GrayImage::from_raw(w, h, out).unwrap_or_else(|| mask.clone())
    }

    pub fn erode(mask: &Mask, kernel_size: u32) -> Mask {
        Self::rank_filter(mask, kernel_size, false)
    }

    pub fn dilate(mask: &Mask, kernel_size: u32) -> Mask {
        Self::rank_filter(mask, kernel_size, true)
    }
}

impl VisionOps for NativeVision {
    fn name(&self) -> &str {
        "native"
    }

    fn resize_area(&self, image: &RgbImage, width: u32, height: u32) -> RgbImage {
        if image.dimensions() == (width, height) {
            return image.clone();
        }
        // Triangle support widens with the reduction ratio, so every source
        // pixel contributes to its output cell.
        imageops::resize(image, width.max(1), height.max(1), FilterType::Triangle)
    }

    fn blur(&self, image: &RgbImage, sigma: f32) -> RgbImage {
        imageops::blur(image, sigma)
    }

    fn to_hsv(&self, image: &RgbImage) -> HsvImage {
        let (w, h) = image.dimensions();
        let mut hsv = vec![0u8; image.as_raw().len()];
        hsv.par_chunks_mut(3)
            .zip(image.as_raw().par_chunks(3))
            .for_each(|(dst, src)| {
                dst.copy_from_slice(&Self::rgb_to_hsv(src[0], src[1], src[2]));
            });
        RgbImage::from_raw(w, h, hsv).unwrap_or_else(|| RgbImage::new(w, h))
    }

    fn in_range(&self, hsv: &HsvImage, range: &HsvRange) -> Mask {
        let (w, h) = hsv.dimensions();
        let data: Vec<u8> = hsv
            .as_raw()
            .chunks_exact(3)
            .map(|px| {
                if range.contains([px[0], px[1], px[2]]) {
                    255
                } else {
                    0
                }
            })
            .collect();
        GrayImage::from_raw(w, h, data).unwrap_or_else(|| GrayImage::new(w, h))
    }

    fn bitwise_or(&self, a: &Mask, b: &Mask) -> Result<Mask, VisionError> {
        if a.dimensions() != b.dimensions() {
            return Err(VisionError::BufferMismatch {
                expected: a.as_raw().len(),
                actual: b.as_raw().len(),
            });
        }
        let data: Vec<u8> = a
            .as_raw()
            .iter()
            .zip(b.as_raw())
            .map(|(&x, &y)| x | y)
            .collect();
        let (w, h) = a.dimensions();
        GrayImage::from_raw(w, h, data).ok_or(VisionError::BufferMismatch {
            expected: (w * h) as usize,
            actual: 0,
        })
    }

    fn morph_open(&self, mask: &Mask, kernel_size: u32) -> Mask {
        Self::dilate(&Self::erode(mask, kernel_size), kernel_size)
    }

    fn morph_close(&self, mask: &Mask, kernel_size: u32) -> Mask {
        Self::erode(&Self::dilate(mask, kernel_size), kernel_size)
    }

    fn find_external_contours(&self, mask: &Mask) -> Vec<Contour> {
        contour::find_external_contours(mask)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Luma, Rgb};

    #[test]
    fn test_rgb_to_hsv_primaries() {
        assert_eq!(NativeVision::rgb_to_hsv(255, 0, 0), [0, 255, 255]);
        assert_eq!(NativeVision::rgb_to_hsv(0, 255, 0), [60, 255, 255]);
        assert_eq!(NativeVision::rgb_to_hsv(0, 0, 255), [120, 255, 255]);
        assert_eq!(NativeVision::rgb_to_hsv(128, 128, 128), [0, 0, 128]);
        assert_eq!(NativeVision::rgb_to_hsv(0, 0, 0), [0, 0, 0]);
    }

    #[test]
    fn test_red_wraps_to_high_hue() {
        // Slightly blue-ish red lands at the top of the hue circle.
        let [h, s, v] = NativeVision::rgb_to_hsv(220, 20, 60);
        assert!(h >= 170, "hue {}", h);
        assert!(s > 200);
        assert_eq!(v, 220);
    }

    #[test]
    fn test_to_hsv_matches_per_pixel() {
        let img = RgbImage::from_fn(7, 5, |x, y| Rgb([(x * 30) as u8, (y * 40) as u8, 90]));
        let hsv = NativeVision.to_hsv(&img);
        for (x, y, px) in img.enumerate_pixels() {
            let expected = NativeVision::rgb_to_hsv(px[0], px[1], px[2]);
            assert_eq!(hsv.get_pixel(x, y).0, expected);
        }
    }

    #[test]
    fn test_open_removes_speckle_keeps_blob() {
        let mut mask = GrayImage::new(20, 20);
        mask.put_pixel(2, 2, Luma([255]));
        for y in 8..14 {
            for x in 8..14 {
                mask.put_pixel(x, y, Luma([255]));
            }
        }
        let opened = NativeVision.morph_open(&mask, 3);
        assert_eq!(opened.get_pixel(2, 2)[0], 0);
        // 6x6 square survives erode+dilate unchanged.
        assert_eq!(opened, {
            let mut expected = GrayImage::new(20, 20);
            for y in 8..14 {
                for x in 8..14 {
                    expected.put_pixel(x, y, Luma([255]));
                }
            }
            expected
        });
    }

    #[test]
    fn test_close_fills_pinhole() {
        let mut mask = GrayImage::from_pixel(12, 12, Luma([255]));
        mask.put_pixel(6, 6, Luma([0]));
        let closed = NativeVision.morph_close(&mask, 3);
        assert!(closed.pixels().all(|p| p[0] == 255));
    }

    #[test]
    fn test_union_of_bands() {
        let hsv = RgbImage::from_fn(3, 1, |x, _| match x {
            0 => Rgb([5, 200, 200]),
            1 => Rgb([175, 200, 200]),
            _ => Rgb([90, 200, 200]),
        });
        let low = NativeVision.in_range(&hsv, &HsvRange::new([0, 120, 70], [10, 255, 255]));
        let high = NativeVision.in_range(&hsv, &HsvRange::new([170, 120, 70], [180, 255, 255]));
        let both = NativeVision.bitwise_or(&low, &high).unwrap();
        assert_eq!(both.as_raw(), &vec![255, 255, 0]);

        let other = GrayImage::new(2, 2);
        assert!(NativeVision.bitwise_or(&low, &other).is_err());
    }

    #[test]
    fn test_resize_area_preserves_mean() {
        let img = RgbImage::from_fn(64, 64, |x, _| {
            if x % 2 == 0 {
                Rgb([200, 200, 200])
            } else {
                Rgb([100, 100, 100])
            }
        });
        let small = NativeVision.resize_area(&img, 16, 16);
        assert_eq!(small.dimensions(), (16, 16));
        // Alternating columns average out instead of aliasing to one value.
        let centre = small.get_pixel(8, 8)[0] as i32;
        assert!((centre - 150).abs() <= 10, "centre {}", centre);
    }
}
