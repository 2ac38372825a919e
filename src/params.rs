// params.rs — Blur kernel parameters.
//
// The original design baked radius and sigma into the kernel source as
// module-level constants. Here they are an explicit struct handed to the
// engine per call: no process-wide state, and the GPU path uploads them
// as a uniform buffer instead of string-templating the shader.

use crate::blur::BlurError;

/// Gaussian kernel parameters for one blur invocation.
///
/// `radius` is the neighborhood half-width in pixels; the scanned window is
/// square with side `2 * radius + 1` (square, not disk-shaped — every offset
/// in the window contributes regardless of Euclidean distance).
///
/// `radius` being unsigned makes a negative radius unrepresentable; `sigma`
/// is range-checked by [`BlurParams::validate`] before any dispatch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlurParams {
    /// Neighborhood half-width in pixels. Radius 0 degenerates to the
    /// identity (the window is the center pixel alone).
    pub radius: u32,
    /// Gaussian standard deviation. Must be positive and finite: sigma = 0
    /// would divide by zero in the weight exponent.
    pub sigma: f32,
}

impl BlurParams {
    pub const fn new(radius: u32, sigma: f32) -> Self {
        BlurParams { radius, sigma }
    }

    /// Window side length, `2 * radius + 1`.
    #[inline]
    pub fn window_side(&self) -> u32 {
        2 * self.radius + 1
    }

    /// Reject parameters the weight formula cannot handle. Called by both
    /// the CPU engine and the GPU pipeline before touching any pixel.
    pub fn validate(&self) -> Result<(), BlurError> {
        if !(self.sigma > 0.0) || !self.sigma.is_finite() {
            return Err(BlurError::InvalidSigma { sigma: self.sigma });
        }
        Ok(())
    }
}
