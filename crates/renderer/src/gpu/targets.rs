use crate::error::CompositorError;
use crate::params::CompatibilityFlags;

use super::scope;

/// Colour format of the offscreen feedback buffers.
pub(crate) const OFFSCREEN_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

/// Picks the feedback buffer size for a `surface_width x surface_height`
/// surface.
///
/// Each axis is rounded down to a power of two strictly smaller than the
/// surface (unless non-power-of-two textures are allowed), then both axes
/// take the smaller value (unless non-square textures are allowed). Smaller
/// textures halve the result. Dimensions never drop below 1 or exceed
/// `max_dimension`.
pub fn framebuffer_size(
    surface_width: u32,
    surface_height: u32,
    flags: CompatibilityFlags,
    max_dimension: u32,
) -> (u32, u32) {
    let (mut width, mut height) = if flags.non_power_of_two {
        (surface_width.max(1), surface_height.max(1))
    } else {
        (
            power_of_two_below(surface_width),
            power_of_two_below(surface_height),
        )
    };

    if !flags.non_square {
        let side = width.min(height);
        width = side;
        height = side;
    }

    if flags.smaller_textures {
        width = (width / 2).max(1);
        height = (height / 2).max(1);
    }

    let max_dimension = max_dimension.max(1);
    (width.min(max_dimension), height.min(max_dimension))
}

fn power_of_two_below(value: u32) -> u32 {
    if value <= 1 {
        return 1;
    }
    let floor = 1u32 << (u32::BITS - 1 - value.leading_zeros());
    if floor == value {
        floor / 2
    } else {
        floor
    }
}

/// What has to be cleared before the next frame is composited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingClear {
    /// Clear the given slot once; it becomes the blur source this frame.
    Slot(usize),
    /// The single buffer holds undefined contents and must be cleared
    /// instead of faded.
    Current,
}

/// Ping-pong bookkeeping for the feedback buffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PingPong {
    current: usize,
    single: bool,
    clear_pending: bool,
}

impl PingPong {
    /// Fresh state after an allocation: index 0 and a pending clear.
    pub fn new(single_framebuffer: bool) -> Self {
        Self {
            current: 0,
            single: single_framebuffer,
            clear_pending: true,
        }
    }

    pub fn slot_count(&self) -> usize {
        if self.single {
            1
        } else {
            2
        }
    }

    pub fn is_single(&self) -> bool {
        self.single
    }

    /// Render target of this frame.
    pub fn current(&self) -> usize {
        self.current
    }

    /// Texture blended into the target: the previous frame's output.
    pub fn source(&self) -> usize {
        if self.single {
            self.current
        } else {
            1 - self.current
        }
    }

    pub fn clear_pending(&self) -> bool {
        self.clear_pending
    }

    /// Consumes the one-time clear scheduled by the last allocation.
    pub fn take_clear(&mut self) -> Option<PendingClear> {
        if !std::mem::take(&mut self.clear_pending) {
            return None;
        }
        Some(if self.single {
            PendingClear::Current
        } else {
            PendingClear::Slot(self.source())
        })
    }

    /// Swaps current and source; a no-op in single-framebuffer mode.
    pub fn advance(&mut self) {
        if !self.single {
            self.current = 1 - self.current;
        }
    }
}

pub(crate) struct RenderSlot {
    texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    /// Binds this slot's texture for sampling.
    pub bind_group: wgpu::BindGroup,
}

impl Drop for RenderSlot {
    fn drop(&mut self) {
        self.texture.destroy();
    }
}

/// Offscreen feedback buffers; textures are destroyed when dropped.
pub(crate) struct FramebufferPair {
    slots: Vec<RenderSlot>,
    size: (u32, u32),
}

impl FramebufferPair {
    pub fn new(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        sampler: &wgpu::Sampler,
        size: (u32, u32),
        count: usize,
    ) -> Result<Self, CompositorError> {
        let (width, height) = size;
        let slots = scope::capture(device, || {
            (0..count)
                .map(|index| create_slot(device, layout, sampler, size, index))
                .collect::<Vec<_>>()
        })
        .map_err(|err| {
            tracing::error!(width, height, error = %err, "framebuffer allocation failed");
            CompositorError::FramebufferRejected {
                width,
                height,
                message: err.to_string(),
            }
        })?;

        tracing::debug!(width, height, count, "allocated feedback framebuffers");
        Ok(Self { slots, size })
    }

    pub fn slot(&self, index: usize) -> &RenderSlot {
        debug_assert!(
            index < self.slots.len(),
            "feedback slot {index} out of range ({} allocated)",
            self.slots.len()
        );
        &self.slots[index]
    }

    pub fn size(&self) -> (u32, u32) {
        self.size
    }
}

fn create_slot(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    sampler: &wgpu::Sampler,
    (width, height): (u32, u32),
    index: usize,
) -> RenderSlot {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(if index == 0 {
            "feedback texture 0"
        } else {
            "feedback texture 1"
        }),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: OFFSCREEN_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
        view_formats: &[],
    });
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("feedback texture bind group"),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(&view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(sampler),
            },
        ],
    });
    RenderSlot {
        texture,
        view,
        bind_group,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAX: u32 = 8192;

    fn flags() -> CompatibilityFlags {
        CompatibilityFlags::default()
    }

    #[test]
    fn portrait_phone_gets_square_power_of_two() {
        assert_eq!(framebuffer_size(1080, 1920, flags(), MAX), (1024, 1024));
        assert_eq!(framebuffer_size(1920, 1080, flags(), MAX), (1024, 1024));
    }

    #[test]
    fn exact_power_of_two_is_halved() {
        assert_eq!(framebuffer_size(1024, 1024, flags(), MAX), (512, 512));
        assert_eq!(power_of_two_below(2), 1);
        assert_eq!(power_of_two_below(1), 1);
        assert_eq!(power_of_two_below(0), 1);
        assert_eq!(power_of_two_below(1025), 1024);
    }

    #[test]
    fn square_takes_the_smaller_axis() {
        assert_eq!(framebuffer_size(800, 3000, flags(), MAX), (512, 512));
        assert_eq!(framebuffer_size(3000, 800, flags(), MAX), (512, 512));
        for (w, h) in [(720, 1280), (1440, 2560), (601, 4000), (2, 2)] {
            let (fw, fh) = framebuffer_size(w, h, flags(), MAX);
            assert_eq!(fw, fh);
            assert!(fw.is_power_of_two());
            assert!(fw < w.min(h) || w.min(h) <= 1, "{w}x{h} -> {fw}");
        }
    }

    #[test]
    fn compatibility_flags_change_the_policy() {
        let non_square = CompatibilityFlags {
            non_square: true,
            ..flags()
        };
        assert_eq!(framebuffer_size(1080, 1920, non_square, MAX), (1024, 1024));
        assert_eq!(framebuffer_size(800, 600, non_square, MAX), (512, 512));
        assert_eq!(framebuffer_size(800, 3000, non_square, MAX), (512, 2048));

        let npot = CompatibilityFlags {
            non_power_of_two: true,
            non_square: true,
            ..flags()
        };
        assert_eq!(framebuffer_size(1080, 1920, npot, MAX), (1080, 1920));

        let npot_square = CompatibilityFlags {
            non_power_of_two: true,
            ..flags()
        };
        assert_eq!(framebuffer_size(1080, 1920, npot_square, MAX), (1080, 1080));

        let smaller = CompatibilityFlags {
            smaller_textures: true,
            ..flags()
        };
        assert_eq!(framebuffer_size(1080, 1920, smaller, MAX), (512, 512));
        assert_eq!(framebuffer_size(1, 1, smaller, MAX), (1, 1));
    }

    #[test]
    fn size_is_clamped_to_device_limit() {
        let npot = CompatibilityFlags {
            non_power_of_two: true,
            ..flags()
        };
        assert_eq!(framebuffer_size(5000, 9000, npot, 4096), (4096, 4096));
        let npot_free = CompatibilityFlags {
            non_square: true,
            ..npot
        };
        assert_eq!(framebuffer_size(3000, 9000, npot_free, 4096), (3000, 4096));
    }

    #[test]
    fn ping_pong_alternates_and_clears_once() {
        let mut state = PingPong::new(false);
        assert_eq!(state.slot_count(), 2);
        assert_eq!(state.current(), 0);
        assert_eq!(state.source(), 1);
        assert_eq!(state.take_clear(), Some(PendingClear::Slot(1)));
        assert_eq!(state.take_clear(), None);

        state.advance();
        assert_eq!(state.current(), 1);
        assert_eq!(state.source(), 0);
        state.advance();
        assert_eq!(state.current(), 0);
        assert!(!state.clear_pending());
    }

    #[test]
    fn indices_stay_within_allocated_slots() {
        for single in [false, true] {
            let mut state = PingPong::new(single);
            let slots = state.slot_count();
            if let Some(PendingClear::Slot(index)) = state.take_clear() {
                assert!(index < slots);
            }
            for _ in 0..5 {
                assert!(state.current() < slots);
                assert!(state.source() < slots);
                state.advance();
            }
        }
    }

    #[test]
    fn single_framebuffer_never_swaps() {
        let mut state = PingPong::new(true);
        assert_eq!(state.slot_count(), 1);
        assert_eq!(state.take_clear(), Some(PendingClear::Current));
        for _ in 0..3 {
            state.advance();
            assert_eq!(state.current(), 0);
            assert_eq!(state.source(), 0);
        }
    }

    #[test]
    fn reallocation_resets_index_and_clear() {
        let mut state = PingPong::new(false);
        state.take_clear();
        state.advance();
        assert_eq!(state.current(), 1);
        let state = PingPong::new(false);
        assert_eq!(state.current(), 0);
        assert!(state.clear_pending());
    }
}
