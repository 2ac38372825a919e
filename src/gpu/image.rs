// gpu/image.rs — GPU image representation and CPU↔GPU transfer.
//
// `GpuImage` is an RGBA frame resident on the GPU as an Rgba8Unorm texture.
// `textureLoad` hands the shader a `vec4<f32>` with channels in [0, 1]; the
// weighted average is linear, so normalizing does not change the result —
// the final unorm store rounds back to the nearest 8-bit value, matching
// the CPU path's round-and-saturate.
//
// wgpu requires `bytes_per_row` in buffer↔texture copies to be a multiple
// of 256, so both upload and readback go through row-aligned staging
// buffers. The CPU `Image` is packed (width * 4 bytes per row), which for
// most widths is not 256-aligned; each row is copied into the staging
// buffer at its aligned offset.

use wgpu::util::DeviceExt;

use crate::gpu::device::GpuDevice;
use crate::image::Image;

/// wgpu's required alignment for `bytes_per_row` in copy operations.
const COPY_ALIGNMENT: u32 = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;

/// Bytes per RGBA pixel.
const BYTES_PER_PIXEL: u32 = 4;

/// An RGBA `u8` image resident on the GPU as a 2D texture.
///
/// Created via [`GpuImage::upload`]. Owns its wgpu resources; dropping it
/// releases the GPU texture memory.
pub struct GpuImage {
    pub texture: wgpu::Texture,
    /// Default view: full texture. Bound as `texture_2d<f32>` input.
    pub view: wgpu::TextureView,
    pub width: u32,
    pub height: u32,
}

impl GpuImage {
    /// Upload a CPU `Image` to the GPU.
    ///
    /// Allocates an Rgba8Unorm texture, writes the pixels through a
    /// row-aligned staging buffer, and submits the copy. The copy runs on
    /// the GPU timeline; any subsequent dispatch submitted to the same
    /// queue sees the completed upload.
    pub fn upload(gpu: &GpuDevice, src: &Image) -> Self {
        let width = src.width() as u32;
        let height = src.height() as u32;

        let texture = gpu.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("GpuImage"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8Unorm,
            usage: wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_DST
                | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        let row_bytes = width * BYTES_PER_PIXEL;
        let aligned_bytes_per_row = align_to(row_bytes, COPY_ALIGNMENT);
        let mut staging = vec![0u8; (aligned_bytes_per_row * height) as usize];

        let src_bytes = src.as_bytes();
        for y in 0..height as usize {
            let src_start = y * row_bytes as usize;
            let dst_start = y * aligned_bytes_per_row as usize;
            staging[dst_start..dst_start + row_bytes as usize]
                .copy_from_slice(&src_bytes[src_start..src_start + row_bytes as usize]);
        }

        let staging_buf = gpu.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("GpuImage::staging"),
            contents: &staging,
            usage: wgpu::BufferUsages::COPY_SRC,
        });

        let mut encoder = gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("GpuImage::upload"),
            });

        encoder.copy_buffer_to_texture(
            wgpu::ImageCopyBuffer {
                buffer: &staging_buf,
                layout: wgpu::ImageDataLayout {
                    offset: 0,
                    bytes_per_row: Some(aligned_bytes_per_row),
                    rows_per_image: Some(height),
                },
            },
            wgpu::ImageCopyTexture {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );

        gpu.queue.submit(std::iter::once(encoder.finish()));

        GpuImage { texture, view, width, height }
    }

    /// Read the texture back to CPU memory.
    ///
    /// **Expensive and synchronous** — stalls the GPU pipeline until the
    /// copy completes. Returns packed RGBA bytes, length
    /// `width * height * 4`, alignment padding stripped.
    pub fn readback(&self, gpu: &GpuDevice) -> Vec<u8> {
        readback_rgba8_texture(gpu, &self.texture, self.width, self.height)
    }
}

/// Copy an Rgba8Unorm texture into a CPU byte vector.
///
/// Shared by `GpuImage::readback` and the blur pipeline's output readback.
pub(crate) fn readback_rgba8_texture(
    gpu: &GpuDevice,
    texture: &wgpu::Texture,
    width: u32,
    height: u32,
) -> Vec<u8> {
    let row_bytes = width * BYTES_PER_PIXEL;
    let aligned_bytes_per_row = align_to(row_bytes, COPY_ALIGNMENT);
    let readback_size = (aligned_bytes_per_row * height) as u64;

    let readback_buf = gpu.device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("gridblur readback"),
        size: readback_size,
        usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });

    let mut encoder = gpu
        .device
        .create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("gridblur readback"),
        });

    encoder.copy_texture_to_buffer(
        wgpu::ImageCopyTexture {
            texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        wgpu::ImageCopyBuffer {
            buffer: &readback_buf,
            layout: wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(aligned_bytes_per_row),
                rows_per_image: Some(height),
            },
        },
        wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
    );

    gpu.queue.submit(std::iter::once(encoder.finish()));

    // Map the buffer — async in wgpu's API, blocked on here via
    // device.poll(Wait).
    let buf_slice = readback_buf.slice(..);
    let (tx, rx) = std::sync::mpsc::channel();
    buf_slice.map_async(wgpu::MapMode::Read, move |result| {
        tx.send(result).expect("readback channel closed");
    });
    gpu.device.poll(wgpu::Maintain::Wait);
    rx.recv()
        .expect("readback map callback never fired")
        .expect("readback map failed");

    let mapped = buf_slice.get_mapped_range();
    let mut out = vec![0u8; (row_bytes * height) as usize];
    for y in 0..height as usize {
        let src_start = y * aligned_bytes_per_row as usize;
        let dst_start = y * row_bytes as usize;
        out[dst_start..dst_start + row_bytes as usize]
            .copy_from_slice(&mapped[src_start..src_start + row_bytes as usize]);
    }
    drop(mapped);
    readback_buf.unmap();

    out
}

/// Round `value` up to the next multiple of `alignment`.
#[inline]
pub(crate) fn align_to(value: u32, alignment: u32) -> u32 {
    (value + alignment - 1) / alignment * alignment
}
