use std::sync::Arc;

use wgpu::Device;

use crate::error::GpuError;

/// GPU context - unified for both WASM and native
pub struct GpuContext {
    pub device: Arc<Device>,
    pub queue: Arc<wgpu::Queue>,
    pub surface: wgpu::Surface<'static>,
    pub format: wgpu::TextureFormat,
    pub config: wgpu::SurfaceConfiguration,
}

fn create_instance() -> wgpu::Instance {
    wgpu::Instance::new(&wgpu::InstanceDescriptor {
        backends: wgpu::Backends::all(),
        ..Default::default()
    })
}

async fn request_adapter(
    instance: &wgpu::Instance,
    surface: &wgpu::Surface<'static>,
) -> Result<wgpu::Adapter, GpuError> {
    let adapter = instance
        .request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            force_fallback_adapter: false,
            compatible_surface: Some(surface),
        })
        .await?;
    Ok(adapter)
}

/// Shared device request for both platforms
async fn init_device_and_queue(adapter: &wgpu::Adapter) -> Result<(Arc<Device>, Arc<wgpu::Queue>), GpuError> {
    let adapter_limits = adapter.limits();
    let limits = wgpu::Limits::downlevel_webgl2_defaults().using_resolution(adapter_limits);

    let (device, queue) = adapter
        .request_device(&wgpu::DeviceDescriptor {
            label: Some("device"),
            required_features: wgpu::Features::empty(),
            required_limits: limits,
            memory_hints: wgpu::MemoryHints::default(),
            experimental_features: wgpu::ExperimentalFeatures::default(),
            trace: wgpu::Trace::default(),
        })
        .await?;

    Ok((Arc::new(device), Arc::new(queue)))
}

/// Shared surface configuration helper
fn configure_surface(
    device: &Device,
    adapter: &wgpu::Adapter,
    surface: &wgpu::Surface,
    width: u32,
    height: u32,
) -> (wgpu::TextureFormat, wgpu::SurfaceConfiguration) {
    let caps = surface.get_capabilities(adapter);
    let format = caps
        .formats
        .iter()
        .copied()
        .find(|f| f.is_srgb())
        .or_else(|| caps.formats.first().copied())
        .unwrap_or(wgpu::TextureFormat::Bgra8UnormSrgb);

    let config = wgpu::SurfaceConfiguration {
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        format,
        width: width.max(1),
        height: height.max(1),
        present_mode: wgpu::PresentMode::Fifo,
        alpha_mode: caps.alpha_modes.first().copied().unwrap_or(wgpu::CompositeAlphaMode::Auto),
        view_formats: vec![],
        desired_maximum_frame_latency: 2,
    };
    surface.configure(device, &config);

    (format, config)
}

impl GpuContext {
    async fn from_surface(
        instance: &wgpu::Instance,
        surface: wgpu::Surface<'static>,
        width: u32,
        height: u32,
    ) -> Result<Self, GpuError> {
        let adapter = request_adapter(instance, &surface).await?;
        let info = adapter.get_info();
        tracing::info!(backend = ?info.backend, adapter = %info.name, "GPU adapter selected");

        let (device, queue) = init_device_and_queue(&adapter).await?;
        let (format, config) = configure_surface(&device, &adapter, &surface, width, height);

        Ok(GpuContext {
            device,
            queue,
            surface,
            format,
            config,
        })
    }

    /// Reconfigure the surface for a new size; zero sizes are ignored
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.config.width = width;
        self.config.height = height;
        self.surface.configure(&self.device, &self.config);
    }
}

#[cfg(target_arch = "wasm32")]
impl GpuContext {
    /// Initialize GPU for a given canvas surface (WASM)
    pub async fn new(canvas: &web_sys::HtmlCanvasElement, width: u32, height: u32) -> Result<Self, GpuError> {
        let instance = create_instance();
        let surface = instance.create_surface(wgpu::SurfaceTarget::Canvas(canvas.clone()))?;
        Self::from_surface(&instance, surface, width, height).await
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl GpuContext {
    /// Initialize GPU for a given window (Native)
    pub async fn new_native(window: Arc<winit::window::Window>) -> Result<Self, GpuError> {
        let size = window.inner_size();
        let instance = create_instance();
        let surface = instance.create_surface(window)?;
        Self::from_surface(&instance, surface, size.width, size.height).await
    }
}
