// gpu/mod.rs — wgpu compute backend.
//
// The blur runs as a flat 2D grid of work-items, one per output pixel.
// Every work-item reads the shared, read-only input texture and writes its
// own disjoint output texel, so no synchronization exists anywhere in the
// dispatch and the result is independent of execution order.
//
// The CPU implementation in blur.rs remains the authoritative reference —
// the GPU kernel is validated against it per channel in gpu/blur.rs tests.

pub mod device;
pub mod image;
pub mod blur;
