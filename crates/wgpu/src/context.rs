use cubeclear_common::FACE_COUNT;

/// Features the layered clear needs: a render pass whose color attachment
/// spans all six layers.
pub const REQUIRED_FEATURES: wgpu::Features = wgpu::Features::MULTIVIEW;

/// Fatal errors acquiring a device for the probe.
#[derive(Debug, thiserror::Error)]
pub enum ContextError {
    #[error("no GPU adapter found")]
    AdapterNotFound,
    #[error("adapter {adapter:?} lacks required features: {missing:?}")]
    MissingFeatures {
        adapter: String,
        missing: wgpu::Features,
    },
    #[error("adapter limit {name} is {actual}, need at least {required}")]
    LimitTooLow {
        name: &'static str,
        actual: u32,
        required: u32,
    },
    #[error("device request failed: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),
}

/// Check adapter features and limits against what the probe needs.
pub fn check_capabilities(
    adapter: &str,
    features: wgpu::Features,
    limits: &wgpu::Limits,
    face_size: u32,
) -> Result<(), ContextError> {
    let missing = REQUIRED_FEATURES - features;
    if !missing.is_empty() {
        return Err(ContextError::MissingFeatures {
            adapter: adapter.to_string(),
            missing,
        });
    }
    if limits.max_texture_array_layers < FACE_COUNT as u32 {
        return Err(ContextError::LimitTooLow {
            name: "max_texture_array_layers",
            actual: limits.max_texture_array_layers,
            required: FACE_COUNT as u32,
        });
    }
    if limits.max_texture_dimension_2d < face_size {
        return Err(ContextError::LimitTooLow {
            name: "max_texture_dimension_2d",
            actual: limits.max_texture_dimension_2d,
            required: face_size,
        });
    }
    Ok(())
}

/// A headless device that passed the capability check.
pub struct GpuContext {
    pub adapter_info: wgpu::AdapterInfo,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
}

impl GpuContext {
    /// Blocking wrapper around [`GpuContext::acquire_async`].
    pub fn acquire(backends: wgpu::Backends, face_size: u32) -> Result<Self, ContextError> {
        pollster::block_on(Self::acquire_async(backends, face_size))
    }

    pub async fn acquire_async(
        backends: wgpu::Backends,
        face_size: u32,
    ) -> Result<Self, ContextError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends,
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .ok_or(ContextError::AdapterNotFound)?;

        let adapter_info = adapter.get_info();
        tracing::info!(
            name = %adapter_info.name,
            backend = ?adapter_info.backend,
            driver = %adapter_info.driver,
            driver_info = %adapter_info.driver_info,
            "adapter selected"
        );

        let limits = adapter.limits();
        check_capabilities(&adapter_info.name, adapter.features(), &limits, face_size)?;

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("cubeclear_device"),
                    required_features: REQUIRED_FEATURES,
                    required_limits: limits,
                    memory_hints: Default::default(),
                },
                None,
            )
            .await?;

        device.on_uncaptured_error(Box::new(|err: wgpu::Error| {
            tracing::error!("uncaptured wgpu error: {err}");
        }));

        Ok(Self {
            adapter_info,
            device,
            queue,
        })
    }
}
