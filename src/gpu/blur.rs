// gpu/blur.rs — Gaussian blur compute pipeline.
//
// Mirrors the CPU `blur::blur()` exactly: square window, skip-on-OOB
// border policy, shared-exponent weight, round-and-saturate output. The
// only divergences are float associativity and the unorm conversion, which
// stay within one 8-bit step of the CPU result.
//
// PIPELINE LIFETIME
// `GpuBlurPipeline` is expensive to create (shader compilation). Create it
// once and reuse it for every blur call:
//
//   let gpu = GpuDevice::new()?;
//   let pipeline = GpuBlurPipeline::new(&gpu);
//   let out = pipeline.run(&gpu, &img, &BlurParams::new(20, 3.5))?;

use wgpu::util::DeviceExt;

use crate::blur::BlurError;
use crate::gpu::device::GpuDevice;
use crate::gpu::image::{readback_rgba8_texture, GpuImage};
use crate::image::Image;
use crate::params::BlurParams;

// ---------------------------------------------------------------------------
// Uniform params (must match WGSL struct BlurParams exactly)
// ---------------------------------------------------------------------------

/// Kernel parameters uploaded as a uniform buffer.
///
/// Layout must match `BlurParams` in `blur.wgsl`:
///   offset  0: width  (u32)
///   offset  4: height (u32)
///   offset  8: radius (i32)
///   offset 12: sigma  (f32)
///   total:  16 bytes
#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct BlurUniform {
    width: u32,
    height: u32,
    radius: i32,
    sigma: f32,
}

// ---------------------------------------------------------------------------
// GpuBlurPipeline
// ---------------------------------------------------------------------------

/// Compiled compute pipeline for the Gaussian blur kernel.
pub struct GpuBlurPipeline {
    pipeline: wgpu::ComputePipeline,
    bgl: wgpu::BindGroupLayout,
}

impl GpuBlurPipeline {
    /// Compile `blur.wgsl` and create the compute pipeline.
    ///
    /// The workgroup size comes from the `GpuDevice` and is baked into the
    /// shader source via the {{WG_X}}/{{WG_Y}} placeholder tokens.
    pub fn new(gpu: &GpuDevice) -> Self {
        let shader_template = include_str!("../shaders/blur.wgsl");
        let shader_src = shader_template
            .replace("{{WG_X}}", &gpu.workgroup_size.x.to_string())
            .replace("{{WG_Y}}", &gpu.workgroup_size.y.to_string());

        let shader = gpu.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("blur.wgsl"),
            source: wgpu::ShaderSource::Wgsl(shader_src.into()),
        });

        // Bind group layout: mirrors the @group(0) bindings in blur.wgsl.
        let bgl = gpu.device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("GpuBlur BGL"),
            entries: &[
                // Binding 0 — input texture (read as texture_2d<f32>)
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Texture {
                        multisampled: false,
                        view_dimension: wgpu::TextureViewDimension::D2,
                        sample_type: wgpu::TextureSampleType::Float { filterable: false },
                    },
                    count: None,
                },
                // Binding 1 — output texture (storage write)
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::StorageTexture {
                        access: wgpu::StorageTextureAccess::WriteOnly,
                        format: wgpu::TextureFormat::Rgba8Unorm,
                        view_dimension: wgpu::TextureViewDimension::D2,
                    },
                    count: None,
                },
                // Binding 2 — blur params uniform buffer
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
        });

        let pipeline_layout =
            gpu.device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("GpuBlur pipeline layout"),
                bind_group_layouts: &[&bgl],
                push_constant_ranges: &[],
            });

        let pipeline =
            gpu.device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: Some("gaussian_blur"),
                layout: Some(&pipeline_layout),
                module: &shader,
                entry_point: "gaussian_blur",
                compilation_options: wgpu::PipelineCompilationOptions::default(),
                cache: None,
            });

        GpuBlurPipeline { pipeline, bgl }
    }

    /// Blur a CPU image on the GPU.
    ///
    /// Validates parameters, uploads the image, dispatches one work-item
    /// per pixel, and reads the result back. Atomic from the caller's
    /// perspective: either a complete output image is returned or the call
    /// fails with no partial result.
    ///
    /// # Errors
    /// [`BlurError::InvalidSigma`] if `params.sigma` is not positive and
    /// finite. Validation happens before any GPU resource is touched.
    pub fn run(
        &self,
        gpu: &GpuDevice,
        src: &Image,
        params: &BlurParams,
    ) -> Result<Image, BlurError> {
        params.validate()?;

        let width = src.width() as u32;
        let height = src.height() as u32;

        let input = GpuImage::upload(gpu, src);

        // Output texture: storage-writable, copyable for readback.
        let output = gpu.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("GpuBlur output"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8Unorm,
            usage: wgpu::TextureUsages::STORAGE_BINDING
                | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let output_view = output.create_view(&wgpu::TextureViewDescriptor::default());

        let uniform = BlurUniform {
            width,
            height,
            radius: params.radius as i32,
            sigma: params.sigma,
        };
        let params_buf = gpu.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("BlurUniform"),
            contents: bytemuck::bytes_of(&uniform),
            usage: wgpu::BufferUsages::UNIFORM,
        });

        let bind_group = gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("GpuBlur bind group"),
            layout: &self.bgl,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&input.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&output_view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: params_buf.as_entire_binding(),
                },
            ],
        });

        let mut encoder = gpu.device.create_command_encoder(
            &wgpu::CommandEncoderDescriptor { label: Some("GpuBlur::run") },
        );
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("gaussian_blur"),
                timestamp_writes: None,
            });
            pass.set_pipeline(&self.pipeline);
            pass.set_bind_group(0, &bind_group, &[]);

            let (dx, dy) = gpu.dispatch_size(width, height);
            pass.dispatch_workgroups(dx, dy, 1);
        }
        gpu.queue.submit(std::iter::once(encoder.finish()));

        let bytes = readback_rgba8_texture(gpu, &output, width, height);
        Image::from_raw_bytes(src.width(), src.height(), bytes)
    }
}

/// One-shot blur: acquire a device, compile the pipeline, run once.
///
/// For repeated blurs hold a `GpuDevice` + `GpuBlurPipeline` instead —
/// device init and shader compilation dominate a single small dispatch.
pub fn blur_once(src: &Image, params: &BlurParams) -> Result<Image, BlurError> {
    params.validate()?;
    let gpu = GpuDevice::new()?;
    let pipeline = GpuBlurPipeline::new(&gpu);
    pipeline.run(&gpu, src, params)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
