use image::imageops::FilterType;
use image::{DynamicImage, GrayImage};
use imageproc::filter::separable_filter_equal;

/// Default Gaussian kernel size applied before edge detection.
pub const DEFAULT_BLUR_KERNEL: u32 = 3;

/// Convert image to grayscale
pub fn to_grayscale(img: &DynamicImage) -> GrayImage {
    img.to_luma8()
}

/// Shrink a frame to `scale_percent` of its size before analysis.
pub fn resize(img: &DynamicImage, scale_percent: u32) -> DynamicImage {
    if scale_percent >= 100 {
        return img.clone();
    }
    let width = (img.width() * scale_percent / 100).max(1);
    let height = (img.height() * scale_percent / 100).max(1);
    img.resize_exact(width, height, FilterType::Triangle)
}

/// 1-D Gaussian taps for an odd kernel size.
///
/// Sizes up to 7 use the binomial taps, larger sizes sample a Gaussian whose
/// sigma is derived from the size.
pub fn gaussian_kernel(ksize: u32) -> Vec<f32> {
    let ksize = ksize | 1;
    match ksize {
        1 => vec![1.0],
        3 => vec![0.25, 0.5, 0.25],
        5 => vec![0.0625, 0.25, 0.375, 0.25, 0.0625],
        7 => vec![
            0.03125, 0.109375, 0.21875, 0.28125, 0.21875, 0.109375, 0.03125,
        ],
        _ => {
            let sigma = 0.3 * ((ksize as f32 - 1.0) * 0.5 - 1.0) + 0.8;
            let radius = (ksize / 2) as i32;
            let mut taps: Vec<f32> = (-radius..=radius)
                .map(|x| (-((x * x) as f32) / (2.0 * sigma * sigma)).exp())
                .collect();
            let sum: f32 = taps.iter().sum();
            for t in &mut taps {
                *t /= sum;
            }
            taps
        }
    }
}

/// Apply a separable Gaussian blur with an odd `ksize`x`ksize` kernel.
///
/// Borders are clamped; each pass rounds down to `u8`.
pub fn apply_blur(img: &GrayImage, ksize: u32) -> GrayImage {
    if img.width() == 0 || img.height() == 0 {
        return img.clone();
    }
    separable_filter_equal(img, &gaussian_kernel(ksize))
}

/// Grayscale conversion followed by Gaussian smoothing.
pub fn normalize(img: &DynamicImage, ksize: u32) -> GrayImage {
    apply_blur(&to_grayscale(img), ksize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    #[test]
    fn kernels_are_normalized() {
        for k in [1, 3, 5, 7, 9, 11] {
            let taps = gaussian_kernel(k);
            assert_eq!(taps.len(), k as usize);
            let sum: f32 = taps.iter().sum();
            assert!((sum - 1.0).abs() < 1e-5, "ksize {k} sums to {sum}");
        }
        assert_eq!(gaussian_kernel(4).len(), 5);
    }

    #[test]
    fn blur_keeps_flat_images_flat() {
        let img = GrayImage::from_pixel(9, 7, Luma([77]));
        let blurred = apply_blur(&img, 5);
        assert_eq!(blurred.dimensions(), (9, 7));
        assert!(blurred.pixels().all(|p| p[0] == 77));
    }

    #[test]
    fn blur_spreads_a_step() {
        let img = GrayImage::from_fn(6, 3, |x, _| if x >= 3 { Luma([255]) } else { Luma([0]) });
        let blurred = apply_blur(&img, 3);
        let row: Vec<u8> = (0..6).map(|x| blurred.get_pixel(x, 1)[0]).collect();
        assert_eq!(row, vec![0, 0, 63, 191, 255, 255]);
    }

    #[test]
    fn blur_clamps_at_borders() {
        let img = GrayImage::from_fn(5, 3, |x, _| if x == 0 { Luma([255]) } else { Luma([0]) });
        let blurred = apply_blur(&img, 3);
        let row: Vec<u8> = (0..5).map(|x| blurred.get_pixel(x, 1)[0]).collect();
        assert_eq!(row, vec![191, 63, 0, 0, 0]);
    }
}
