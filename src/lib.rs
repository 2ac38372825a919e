// gridblur: GPU-dispatched Gaussian blur for RGBA rasters.
//
// One algorithm, one data path: every output pixel is the Gaussian-weighted
// average of its square neighborhood, computed by an independent work-item.
// The CPU implementation in blur.rs is the authoritative reference; the wgpu
// compute path in gpu/ is validated against it pixel-for-pixel.

pub mod image;
pub mod params;
pub mod blur;

pub mod gpu;
