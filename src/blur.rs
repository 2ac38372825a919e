// blur.rs — CPU reference Gaussian blur.
//
// This is the authoritative implementation the GPU kernel in
// src/shaders/blur.wgsl is validated against. Each output pixel is computed
// independently from the full input image — the same flat per-pixel
// decomposition a compute dispatch uses, run here as two sequential loops.
//
// BORDER HANDLING: Skip (not clamp, not wrap).
// When the window extends beyond the image boundary, out-of-bounds offsets
// contribute neither to the sum nor to the total weight. Border pixels are
// averaged over a smaller effective neighborhood; they are not darkened and
// not edge-replicated. Clamp-to-edge would produce visibly different border
// pixels — the two policies are not interchangeable.

use std::fmt;

use crate::gpu::device::GpuError;
use crate::image::{Image, Rgba};
use crate::params::BlurParams;

/// The Gaussian weight for a window offset `(dx, dy)`:
/// `exp(-(dx² + dy²) / (2σ²))`.
///
/// The `1/(2πσ²)` normalization constant is deliberately omitted — the
/// engine divides by the summed weight afterwards, so the constant cancels
/// and only the relative shape of the Gaussian matters.
#[inline]
pub fn gaussian_weight(dx: i64, dy: i64, sigma: f32) -> f32 {
    let dist_sq = (dx * dx + dy * dy) as f32;
    (-dist_sq / (2.0 * sigma * sigma)).exp()
}

/// Blur `src` with a Gaussian kernel of the given radius and sigma.
///
/// Pure function: the input is untouched and a fresh same-dimension output
/// is returned. Parameters are validated before any pixel work; the call
/// either produces the complete output or fails with no partial result.
///
/// # Errors
/// [`BlurError::InvalidSigma`] if `params.sigma` is not positive and finite.
pub fn blur(src: &Image, params: &BlurParams) -> Result<Image, BlurError> {
    params.validate()?;

    let width = src.width();
    let height = src.height();
    let r = params.radius as i64;
    let sigma = params.sigma;

    let mut dst = Image::new(width, height);

    for y in 0..height {
        for x in 0..width {
            dst.set(x, y, blur_pixel(src, x, y, r, sigma));
        }
    }

    Ok(dst)
}

/// One work-item: the weighted average of the square window around (x, y).
///
/// The accumulator lives on the stack of this call alone — no state is
/// shared between pixels, which is what makes the pixel grid trivially
/// parallel on a GPU.
#[inline]
fn blur_pixel(src: &Image, x: usize, y: usize, r: i64, sigma: f32) -> Rgba {
    let width = src.width() as i64;
    let height = src.height() as i64;

    let mut sum = [0.0f32; 4];
    let mut total_weight = 0.0f32;

    // Full square window, row by row. No circular cutoff.
    for j in -r..=r {
        let ny = y as i64 + j;
        if ny < 0 || ny >= height {
            continue;
        }
        for i in -r..=r {
            let nx = x as i64 + i;
            if nx < 0 || nx >= width {
                continue;
            }

            let weight = gaussian_weight(i, j, sigma);
            // SAFETY: nx/ny passed the bounds checks above.
            let p = unsafe { src.get_unchecked(nx as usize, ny as usize) }.to_f32x4();
            for c in 0..4 {
                sum[c] += weight * p[c];
            }
            total_weight += weight;
        }
    }

    // The center offset (0,0) is always in bounds, so total_weight > 0
    // for every valid (x, y).
    Rgba::from_f32x4([
        sum[0] / total_weight,
        sum[1] / total_weight,
        sum[2] / total_weight,
        sum[3] / total_weight,
    ])
}

// ============================================================
// Error type
// ============================================================

/// Errors from a blur invocation, CPU or GPU.
///
/// All variants are detected synchronously around the single blur call;
/// there is no partial-completion state. A retry would reproduce the same
/// error — the computation is deterministic.
#[derive(Debug)]
pub enum BlurError {
    /// Sigma is zero, negative, or non-finite. The weight formula divides
    /// by 2σ², so these inputs are rejected before dispatch.
    InvalidSigma { sigma: f32 },
    /// A raw pixel buffer disagrees with the declared width * height * 4.
    BufferSizeMismatch { expected: usize, actual: usize },
    /// The compute device could not be acquired or the dispatch failed.
    Gpu(GpuError),
}

impl fmt::Display for BlurError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlurError::InvalidSigma { sigma } => {
                write!(f, "sigma must be positive and finite (got {sigma})")
            }
            BlurError::BufferSizeMismatch { expected, actual } => write!(
                f,
                "RGBA buffer length {actual} does not match width * height * 4 = {expected}"
            ),
            BlurError::Gpu(e) => write!(f, "GPU blur failed: {e}"),
        }
    }
}

impl std::error::Error for BlurError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BlurError::Gpu(e) => Some(e),
            _ => None,
        }
    }
}

impl From<GpuError> for BlurError {
    fn from(e: GpuError) -> Self {
        BlurError::Gpu(e)
    }
}

// ============================================================
// Tests
// ============================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::{Image, Rgba};

    fn uniform_image(w: usize, h: usize, p: Rgba) -> Image {
        Image::from_vec(w, h, vec![p; w * h])
    }

    #[test]
    fn test_weight_decreases_with_distance() {
        // For fixed sigma, moving further from the center strictly lowers
        // the weight.
        let sigma = 2.0;
        let w0 = gaussian_weight(0, 0, sigma);
        let w1 = gaussian_weight(1, 0, sigma);
        let w2 = gaussian_weight(1, 1, sigma);
        let w3 = gaussian_weight(2, 2, sigma);
        assert!(w0 > w1);
        assert!(w1 > w2);
        assert!(w2 > w3);
    }

    #[test]
    fn test_weight_increases_with_sigma() {
        // For a fixed nonzero offset, a larger sigma flattens the kernel
        // and raises the weight.
        let w_narrow = gaussian_weight(2, 1, 0.8);
        let w_mid = gaussian_weight(2, 1, 1.5);
        let w_wide = gaussian_weight(2, 1, 4.0);
        assert!(w_narrow < w_mid);
        assert!(w_mid < w_wide);
    }

    #[test]
    fn test_weight_center_is_one() {
        assert!((gaussian_weight(0, 0, 1.0) - 1.0).abs() < 1e-7);
        assert!((gaussian_weight(0, 0, 123.4) - 1.0).abs() < 1e-7);
    }

    #[test]
    fn test_radius_zero_is_identity() {
        let mut src = Image::new(5, 4);
        for (i, (x, y)) in (0..5).flat_map(|x| (0..4).map(move |y| (x, y))).enumerate() {
            src.set(x, y, Rgba::new(i as u8, (i * 3) as u8, (i * 7) as u8, 200));
        }
        let out = blur(&src, &BlurParams::new(0, 1.7)).unwrap();
        for (x, y, p) in src.pixels() {
            assert_eq!(out.get(x, y), p, "radius-0 blur changed pixel ({x},{y})");
        }
    }

    #[test]
    fn test_uniform_image_unchanged() {
        // All in-window weights average the same constant, so the
        // normalization returns it exactly for any radius/sigma.
        let color = Rgba::new(37, 140, 201, 88);
        let src = uniform_image(7, 7, color);
        for (radius, sigma) in [(1, 0.5), (3, 1.0), (6, 2.5), (10, 3.5)] {
            let out = blur(&src, &BlurParams::new(radius, sigma)).unwrap();
            for (x, y, p) in out.pixels() {
                assert_eq!(p, color, "uniform image changed at ({x},{y}), r={radius}");
            }
        }
    }

    #[test]
    fn test_corner_neighborhood_shrinks() {
        // At corner (0,0) with radius r only (r+1)² neighbors are in
        // bounds. Verify through the arithmetic: a white image with black
        // only at (0,0), blurred, gives a corner value determined by
        // exactly (r+1)² contributions.
        let r = 2i64;
        let sigma = 1.0f32;
        let mut src = uniform_image(9, 9, Rgba::new(255, 255, 255, 255));
        src.set(0, 0, Rgba::new(0, 0, 0, 255));

        let out = blur(&src, &BlurParams::new(r as u32, sigma)).unwrap();

        // Closed form over the (r+1)² in-bounds window offsets.
        let mut sum = 0.0f32;
        let mut total = 0.0f32;
        let mut count = 0;
        for j in 0..=r {
            for i in 0..=r {
                let w = gaussian_weight(i, j, sigma);
                let v = if i == 0 && j == 0 { 0.0 } else { 255.0 };
                sum += w * v;
                total += w;
                count += 1;
            }
        }
        assert_eq!(count, (r + 1) * (r + 1));

        let expected = (sum / total).round() as i32;
        let got = out.get(0, 0).r as i32;
        assert!(
            (expected - got).abs() <= 1,
            "corner: expected ~{expected}, got {got}"
        );
    }

    #[test]
    fn test_point_symmetric_image_stays_symmetric() {
        // Point symmetry about the center: pixel (x, y) equals pixel
        // (w-1-x, h-1-y). The square window and isotropic weights preserve
        // the symmetry exactly.
        let (w, h) = (7, 5);
        let mut src = Image::new(w, h);
        for y in 0..h {
            for x in 0..w {
                let v = ((x * 13 + y * 31) % 251) as u8;
                src.set(x, y, Rgba::new(v, v, v, 255));
                src.set(w - 1 - x, h - 1 - y, Rgba::new(v, v, v, 255));
            }
        }
        let out = blur(&src, &BlurParams::new(2, 1.2)).unwrap();
        for y in 0..h {
            for x in 0..w {
                assert_eq!(
                    out.get(x, y),
                    out.get(w - 1 - x, h - 1 - y),
                    "symmetry broken at ({x},{y})"
                );
            }
        }
    }

    #[test]
    fn test_channels_blur_independently() {
        // Two images differing only in alpha must blur to outputs
        // differing only in alpha. No channel is special-cased.
        let (w, h) = (6, 6);
        let mut a = Image::new(w, h);
        let mut b = Image::new(w, h);
        for y in 0..h {
            for x in 0..w {
                let v = ((x * 40 + y * 17) % 256) as u8;
                a.set(x, y, Rgba::new(v, 255 - v, v / 2, 255));
                // Same color channels, different alpha pattern.
                b.set(x, y, Rgba::new(v, 255 - v, v / 2, v));
            }
        }
        let params = BlurParams::new(2, 1.0);
        let out_a = blur(&a, &params).unwrap();
        let out_b = blur(&b, &params).unwrap();
        for y in 0..h {
            for x in 0..w {
                let pa = out_a.get(x, y);
                let pb = out_b.get(x, y);
                assert_eq!((pa.r, pa.g, pa.b), (pb.r, pb.g, pb.b));
            }
        }
    }

    #[test]
    fn test_alpha_bleeds_like_color() {
        // A transparent hole blurs its transparency into neighbors.
        let mut src = uniform_image(5, 5, Rgba::new(100, 100, 100, 255));
        src.set(2, 2, Rgba::new(100, 100, 100, 0));
        let out = blur(&src, &BlurParams::new(1, 1.0)).unwrap();
        assert!(out.get(1, 2).a < 255, "alpha did not bleed into neighbor");
        // Color channels were uniform and must remain so.
        assert_eq!(out.get(1, 2).r, 100);
    }

    #[test]
    fn test_white_center_3x3_closed_form() {
        // 3×3 all black, white center, radius 1, sigma 1.
        //
        // Corner (0,0) sees the 2×2 in-bounds window {(0,0),(1,0),(0,1),(1,1)};
        // the white center sits at offset (1,1) with weight e^-1, the three
        // black pixels carry weights 1, e^-0.5, e^-0.5.
        let mut src = uniform_image(3, 3, Rgba::new(0, 0, 0, 255));
        src.set(1, 1, Rgba::new(255, 255, 255, 255));
        let out = blur(&src, &BlurParams::new(1, 1.0)).unwrap();

        let w_center = 1.0f32;
        let w_edge = (-0.5f32).exp();
        let w_diag = (-1.0f32).exp();

        let corner_expected =
            255.0 * w_diag / (w_center + 2.0 * w_edge + w_diag);
        let got = out.get(0, 0).r as f32;
        assert!(
            (got - corner_expected.round()).abs() <= 1.0,
            "corner: expected ~{corner_expected:.2}, got {got}"
        );

        // Center pixel: full 3×3 window, white contributes weight 1.
        let center_expected =
            255.0 * w_center / (w_center + 4.0 * w_edge + 4.0 * w_diag);
        let got_c = out.get(1, 1).r as f32;
        assert!(
            (got_c - center_expected.round()).abs() <= 1.0,
            "center: expected ~{center_expected:.2}, got {got_c}"
        );

        // Alpha was uniform 255 everywhere and must stay 255.
        for (_, _, p) in out.pixels() {
            assert_eq!(p.a, 255);
        }
    }

    #[test]
    fn test_invalid_sigma_rejected_before_work() {
        let src = uniform_image(4, 4, Rgba::new(1, 2, 3, 4));
        assert!(matches!(
            blur(&src, &BlurParams::new(1, 0.0)),
            Err(BlurError::InvalidSigma { .. })
        ));
        assert!(matches!(
            blur(&src, &BlurParams::new(1, -2.0)),
            Err(BlurError::InvalidSigma { .. })
        ));
    }

    #[test]
    fn test_radius_larger_than_image() {
        // Window bigger than the whole image: every pixel averages over
        // the full (in-bounds) image. No special casing, no panic.
        let mut src = uniform_image(3, 2, Rgba::new(0, 0, 0, 255));
        src.set(0, 0, Rgba::new(255, 0, 0, 255));
        let out = blur(&src, &BlurParams::new(10, 5.0)).unwrap();
        // Red must have spread to every pixel.
        for (x, y, p) in out.pixels() {
            assert!(p.r > 0, "no red at ({x},{y})");
            assert!(p.r < 255);
        }
    }

    #[test]
    fn test_input_is_untouched() {
        let src = uniform_image(4, 4, Rgba::new(9, 9, 9, 9));
        let before: Vec<u8> = src.as_bytes().to_vec();
        let _ = blur(&src, &BlurParams::new(2, 1.0)).unwrap();
        assert_eq!(src.as_bytes(), &before[..]);
    }
}
