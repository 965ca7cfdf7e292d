use bytemuck::{Pod, Zeroable};
use glam::Mat4;

use crate::params::ParameterSnapshot;

/// Mirrors `QuadParams` in the textured quad fragment shader.
#[repr(C, align(16))]
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct QuadUniforms {
    pub tint: [f32; 4],
}

unsafe impl Zeroable for QuadUniforms {}
unsafe impl Pod for QuadUniforms {}

impl QuadUniforms {
    /// Multiplies the sampled texel alpha by `alpha`.
    pub fn with_alpha(alpha: f32) -> Self {
        Self {
            tint: [1.0, 1.0, 1.0, alpha],
        }
    }
}

/// Mirrors `FadeParams` in the fade fragment shader.
#[repr(C, align(16))]
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct FadeUniforms {
    pub background: [f32; 4],
}

unsafe impl Zeroable for FadeUniforms {}
unsafe impl Pod for FadeUniforms {}

impl FadeUniforms {
    pub fn new(background: [f32; 3]) -> Self {
        Self {
            background: [background[0], background[1], background[2], 1.0],
        }
    }
}

/// Mirrors the std140 `LineParams` block shared by both line stages.
#[repr(C, align(16))]
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct LineUniforms {
    pub mvp: [[f32; 4]; 4],
    pub color: [f32; 4],
    pub viewport: [f32; 2],
    pub delta: f32,
    pub brightness: f32,
    pub line_width: f32,
    pub _padding: [f32; 3],
}

unsafe impl Zeroable for LineUniforms {}
unsafe impl Pod for LineUniforms {}

impl LineUniforms {
    pub fn new(
        mvp: Mat4,
        snapshot: &ParameterSnapshot,
        framebuffer_size: (u32, u32),
        delta: f32,
    ) -> Self {
        let [r, g, b] = snapshot.lines;
        Self {
            mvp: mvp.to_cols_array_2d(),
            color: [r, g, b, 1.0],
            viewport: [
                framebuffer_size.0.max(1) as f32,
                framebuffer_size.1.max(1) as f32,
            ],
            delta,
            brightness: snapshot.brightness(),
            line_width: snapshot.line_width(),
            _padding: [0.0; 3],
        }
    }
}
