// image.rs — RGBA raster container.
//
// Row-major, contiguous, no row padding: buffer length is exactly
// width * height pixels (width * height * 4 bytes). The GPU upload path
// handles wgpu's 256-byte row alignment itself (see gpu/image.rs), so the
// CPU container stays packed.

use std::fmt;

use crate::blur::BlurError;

/// One RGBA pixel, 8 bits per channel.
///
/// `#[repr(C)]` + Pod/Zeroable let a `&[Rgba]` be reinterpreted as `&[u8]`
/// for GPU staging-buffer writes without copying per channel.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Rgba { r, g, b, a }
    }

    /// All four channels as raw f32 values (0.0–255.0, not normalized).
    /// This is what the accumulation loop operates on.
    #[inline]
    pub fn to_f32x4(self) -> [f32; 4] {
        [self.r as f32, self.g as f32, self.b as f32, self.a as f32]
    }

    /// Round each channel to the nearest integer and saturate to [0, 255].
    #[inline]
    pub fn from_f32x4(v: [f32; 4]) -> Self {
        // .round() first, then clamp: `as u8` alone would truncate and
        // wrap out-of-range values.
        Rgba {
            r: v[0].round().clamp(0.0, 255.0) as u8,
            g: v[1].round().clamp(0.0, 255.0) as u8,
            b: v[2].round().clamp(0.0, 255.0) as u8,
            a: v[3].round().clamp(0.0, 255.0) as u8,
        }
    }
}

/// A 2D RGBA image with runtime dimensions.
pub struct Image {
    /// Pixel data in row-major order. Length = width * height.
    data: Vec<Rgba>,
    width: usize,
    height: usize,
}

// Explicit Clone rather than derive: this is a deep copy of heap data.
impl Clone for Image {
    fn clone(&self) -> Self {
        Image {
            data: self.data.clone(),
            width: self.width,
            height: self.height,
        }
    }
}

impl Image {
    /// Create a zero-initialized (transparent black) image.
    pub fn new(width: usize, height: usize) -> Self {
        Image {
            data: vec![Rgba::default(); width * height],
            width,
            height,
        }
    }

    /// Create an image from an existing pixel vector.
    ///
    /// # Panics
    /// Panics if `data.len() != width * height`.
    pub fn from_vec(width: usize, height: usize, data: Vec<Rgba>) -> Self {
        assert_eq!(
            data.len(),
            width * height,
            "pixel count ({}) must equal width * height ({})",
            data.len(),
            width * height,
        );
        Image { data, width, height }
    }

    /// Create an image from a flat byte buffer in RGBA order, as produced
    /// by image decoders. This is the checked entry point for callers
    /// handing us untyped bytes; a length disagreement is reported rather
    /// than panicking.
    pub fn from_raw_bytes(
        width: usize,
        height: usize,
        bytes: Vec<u8>,
    ) -> Result<Self, BlurError> {
        let expected = width * height * 4;
        if bytes.len() != expected {
            return Err(BlurError::BufferSizeMismatch {
                expected,
                actual: bytes.len(),
            });
        }
        let data: Vec<Rgba> = bytes
            .chunks_exact(4)
            .map(|c| Rgba::new(c[0], c[1], c[2], c[3]))
            .collect();
        Ok(Image { data, width, height })
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Get the pixel at (x, y). x is column, y is row.
    ///
    /// # Panics
    /// Panics if (x, y) is out of bounds.
    #[inline]
    pub fn get(&self, x: usize, y: usize) -> Rgba {
        self.bounds_check(x, y);
        self.data[y * self.width + x]
    }

    /// Get pixel value without bounds checking.
    ///
    /// # Safety
    /// Caller must guarantee x < width and y < height. Used in the blur
    /// inner loop where the window scan has already rejected out-of-bounds
    /// coordinates.
    #[inline(always)]
    pub unsafe fn get_unchecked(&self, x: usize, y: usize) -> Rgba {
        debug_assert!(
            x < self.width && y < self.height,
            "get_unchecked({x},{y}) out of bounds for {}x{}",
            self.width,
            self.height
        );
        *self.data.get_unchecked(y * self.width + x)
    }

    /// Set the pixel at (x, y).
    ///
    /// # Panics
    /// Panics if (x, y) is out of bounds.
    #[inline]
    pub fn set(&mut self, x: usize, y: usize, value: Rgba) {
        self.bounds_check(x, y);
        let idx = y * self.width + x;
        self.data[idx] = value;
    }

    /// Iterate over all pixels as `(x, y, value)` tuples.
    pub fn pixels(&self) -> impl Iterator<Item = (usize, usize, Rgba)> + '_ {
        (0..self.height).flat_map(move |y| {
            (0..self.width).map(move |x| (x, y, self.data[y * self.width + x]))
        })
    }

    /// The pixel buffer as a flat slice.
    pub fn as_slice(&self) -> &[Rgba] {
        &self.data
    }

    /// The pixel buffer as raw RGBA bytes (length = width * height * 4).
    /// Zero-copy reinterpretation; used for GPU staging and PNG encoding.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.data)
    }

    #[inline]
    fn bounds_check(&self, x: usize, y: usize) {
        assert!(
            x < self.width && y < self.height,
            "pixel ({x},{y}) out of bounds for image {}×{}",
            self.width,
            self.height,
        );
    }
}

impl fmt::Debug for Image {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Image {{ {}×{} RGBA }}", self.width, self.height)?;
        for y in 0..self.height.min(8) {
            write!(f, "  row {y}: [")?;
            for x in 0..self.width.min(8) {
                if x > 0 {
                    write!(f, ", ")?;
                }
                let p = self.get(x, y);
                write!(f, "({},{},{},{})", p.r, p.g, p.b, p.a)?;
            }
            if self.width > 8 {
                write!(f, ", ...")?;
            }
            writeln!(f, "]")?;
        }
        if self.height > 8 {
            writeln!(f, "  ...")?;
        }
        Ok(())
    }
}

impl std::ops::Index<(usize, usize)> for Image {
    type Output = Rgba;

    #[inline]
    fn index(&self, (x, y): (usize, usize)) -> &Rgba {
        self.bounds_check(x, y);
        &self.data[y * self.width + x]
    }
}

impl std::ops::IndexMut<(usize, usize)> for Image {
    #[inline]
    fn index_mut(&mut self, (x, y): (usize, usize)) -> &mut Rgba {
        self.bounds_check(x, y);
        let idx = y * self.width + x;
        &mut self.data[idx]
    }
}
