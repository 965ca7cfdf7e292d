use crate::runtime::RenderPolicy;

/// Configuration passed from the CLI layer into the renderer.
#[derive(Debug, Clone)]
pub struct RendererConfig {
    /// Window size in physical pixels.
    pub surface_size: (u32, u32),
    /// Seed for the line set; `None` draws from OS entropy.
    pub line_seed: Option<u64>,
    /// High-level render behaviour requested by the caller.
    pub policy: RenderPolicy,
    /// Title of the preview window.
    pub title: String,
    /// Prefer a low-power adapter when several are available.
    pub low_power: bool,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            surface_size: (1080, 1920),
            line_seed: None,
            policy: RenderPolicy::default(),
            title: "Lines Wallpaper".to_string(),
            low_power: true,
        }
    }
}

/// Identifies the adapter that ended up backing the device.
#[derive(Debug, Clone)]
pub struct AdapterProfile {
    pub name: String,
    pub backend: wgpu::Backend,
    pub device_type: wgpu::DeviceType,
    pub max_texture_dimension: u32,
}

impl AdapterProfile {
    pub fn from_wgpu(info: &wgpu::AdapterInfo, limits: &wgpu::Limits) -> Self {
        Self {
            name: info.name.clone(),
            backend: info.backend,
            device_type: info.device_type,
            max_texture_dimension: limits.max_texture_dimension_2d,
        }
    }

    pub fn is_software(&self) -> bool {
        matches!(self.device_type, wgpu::DeviceType::Cpu)
    }
}
