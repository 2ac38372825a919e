// gpu/device.rs — wgpu device abstraction.
//
// Responsibilities:
//   - Enumerate Vulkan adapters and select the first non-CPU one.
//   - Provide `WorkgroupSize` — a validated workgroup configuration used
//     when creating the blur compute pipeline.
//   - Compute dispatch dimensions covering an arbitrary pixel grid.
//
// ADAPTER SELECTION:
// wgpu's default `request_adapter` uses power preference heuristics that
// may grab llvmpipe/softpipe on WSL2 (where the software renderer appears
// as a valid Vulkan device). We enumerate explicitly and prefer real
// hardware, falling back to whatever exists so headless CI still runs.

use std::fmt;

/// A workgroup size configuration for 2D compute dispatches.
///
/// The product of the two dimensions must not exceed the device's
/// `max_compute_invocations_per_workgroup`; `GpuDevice::set_workgroup_size`
/// enforces this.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkgroupSize {
    pub x: u32,
    pub y: u32,
}

impl WorkgroupSize {
    /// Total invocations per workgroup (x * y).
    pub fn total(&self) -> u32 {
        self.x * self.y
    }

    /// Default 16×8 = 128 invocations: four 32-wide NVIDIA warps or two
    /// 64-wide AMD wavefronts, with the 16-wide x dimension matching
    /// row-major texel locality.
    fn default_2d() -> Self {
        WorkgroupSize { x: 16, y: 8 }
    }
}

impl fmt::Display for WorkgroupSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}×{} ({} invocations)", self.x, self.y, self.total())
    }
}

/// Cached adapter information for logging and capability queries.
/// Informational only — it does not affect the kernel's contract.
#[derive(Debug, Clone)]
pub struct AdapterInfo {
    pub name: String,
    pub vendor: u32,
    pub device: u32,
    pub device_type: wgpu::DeviceType,
    pub backend: wgpu::Backend,
}

impl fmt::Display for AdapterInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:?}, {:?})", self.name, self.backend, self.device_type)
    }
}

/// The core GPU context: adapter, device, queue.
///
/// Create via `GpuDevice::new()`. Hold one `GpuDevice` for the lifetime of
/// the application — it is expensive to create (Vulkan instance + device
/// initialization).
///
/// # Field drop order
/// Rust drops struct fields in declaration order (top → bottom).
/// `_instance` is declared last so the `wgpu::Instance` (and its internal
/// Vulkan instance handle) outlives `device` and `queue`. This prevents a
/// crash in dzn (the D3D12-to-Vulkan layer on WSL2) that occurs when the
/// Vulkan instance is destroyed while device-level objects still hold
/// back-references to it.
pub struct GpuDevice {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub adapter_info: AdapterInfo,
    pub workgroup_size: WorkgroupSize,
    /// Keeps the `wgpu::Instance` alive until `device` and `queue` are
    /// dropped. Never accessed directly.
    _instance: wgpu::Instance,
}

impl GpuDevice {
    /// Create a `GpuDevice` using the best available Vulkan adapter.
    ///
    /// # Errors
    /// Returns `Err` if no adapter is found or the device request fails.
    pub fn new() -> Result<Self, GpuError> {
        pollster::block_on(Self::init_async())
    }

    async fn init_async() -> Result<Self, GpuError> {
        // Validation layer in debug builds for shader error feedback.
        // ALLOW_UNDERLYING_NONCOMPLIANT_ADAPTER lets wgpu enumerate dzn on
        // WSL2, which declares itself non-conformant but runs compute-only
        // workloads fine.
        let flags = if cfg!(debug_assertions) {
            wgpu::InstanceFlags::VALIDATION
                | wgpu::InstanceFlags::ALLOW_UNDERLYING_NONCOMPLIANT_ADAPTER
        } else {
            wgpu::InstanceFlags::ALLOW_UNDERLYING_NONCOMPLIANT_ADAPTER
        };

        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::VULKAN,
            flags,
            ..Default::default()
        });

        let all_adapters: Vec<wgpu::Adapter> = instance
            .enumerate_adapters(wgpu::Backends::VULKAN)
            .into_iter()
            .collect();

        if all_adapters.is_empty() {
            return Err(GpuError::NoSuitableAdapter);
        }

        for a in &all_adapters {
            let info = a.get_info();
            eprintln!(
                "[gridblur] Vulkan adapter: {} ({:?}, {:?})",
                info.name, info.backend, info.device_type
            );
        }

        // Prefer real hardware; as a last resort take anything, even a
        // software rasterizer — the adapter name is logged so you know.
        let adapter = all_adapters
            .into_iter()
            .find(|a| {
                matches!(
                    a.get_info().device_type,
                    wgpu::DeviceType::DiscreteGpu
                        | wgpu::DeviceType::IntegratedGpu
                        | wgpu::DeviceType::VirtualGpu
                        | wgpu::DeviceType::Other
                )
            })
            .or_else(|| {
                instance
                    .enumerate_adapters(wgpu::Backends::VULKAN)
                    .into_iter()
                    .next()
            })
            .ok_or(GpuError::NoSuitableAdapter)?;

        let raw_info = adapter.get_info();
        let adapter_info = AdapterInfo {
            name: raw_info.name.clone(),
            vendor: raw_info.vendor,
            device: raw_info.device,
            device_type: raw_info.device_type,
            backend: raw_info.backend,
        };

        // wgpu 22: request_device returns (Device, Queue) directly.
        let (device, queue): (wgpu::Device, wgpu::Queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("gridblur"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    memory_hints: wgpu::MemoryHints::default(),
                },
                None,
            )
            .await
            .map_err(GpuError::DeviceRequest)?;

        Ok(GpuDevice {
            device,
            queue,
            adapter_info,
            workgroup_size: WorkgroupSize::default_2d(),
            _instance: instance,
        })
    }

    /// Override the default workgroup size.
    ///
    /// Returns `Err` if the total invocation count (x * y) exceeds the
    /// device's `max_compute_invocations_per_workgroup`.
    pub fn set_workgroup_size(&mut self, x: u32, y: u32) -> Result<(), GpuError> {
        let total = x * y;
        let max = self.device.limits().max_compute_invocations_per_workgroup;
        if x == 0 || y == 0 || total > max {
            return Err(GpuError::WorkgroupTooLarge { total, max });
        }
        self.workgroup_size = WorkgroupSize { x, y };
        Ok(())
    }

    /// Compute the dispatch dimensions needed to cover a `img_w × img_h`
    /// pixel grid with the active workgroup size.
    ///
    /// Uses ceiling division so every pixel is covered even when the image
    /// dimensions are not multiples of the workgroup size. The shader must
    /// guard against out-of-bounds global IDs:
    /// ```wgsl
    /// if gid.x >= params.width || gid.y >= params.height { return; }
    /// ```
    pub fn dispatch_size(&self, img_w: u32, img_h: u32) -> (u32, u32) {
        let dx = (img_w + self.workgroup_size.x - 1) / self.workgroup_size.x;
        let dy = (img_h + self.workgroup_size.y - 1) / self.workgroup_size.y;
        (dx, dy)
    }
}

impl fmt::Display for GpuDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "GpuDevice {{ adapter: {}, workgroup: {} }}",
            self.adapter_info, self.workgroup_size
        )
    }
}

// ============================================================
// Error type
// ============================================================

/// Errors from GPU device initialization and configuration.
#[derive(Debug)]
pub enum GpuError {
    /// No Vulkan adapter found at all. On WSL2: check that Vulkan is
    /// installed and `vulkaninfo` shows a device.
    NoSuitableAdapter,
    /// wgpu device request failed (driver issue, unsupported limits, etc.).
    DeviceRequest(wgpu::RequestDeviceError),
    /// Requested workgroup size exceeds the device's invocation limit.
    WorkgroupTooLarge { total: u32, max: u32 },
}

impl fmt::Display for GpuError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GpuError::NoSuitableAdapter => write!(
                f,
                "no Vulkan adapter found. On WSL2: ensure Vulkan is installed \
                 and `vulkaninfo` lists a device."
            ),
            GpuError::DeviceRequest(e) => write!(f, "device request failed: {e}"),
            GpuError::WorkgroupTooLarge { total, max } => write!(
                f,
                "workgroup size {total} exceeds device limit of {max} invocations"
            ),
        }
    }
}

impl std::error::Error for GpuError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GpuError::DeviceRequest(e) => Some(e),
            _ => None,
        }
    }
}

// ============================================================
// Tests
// ============================================================
