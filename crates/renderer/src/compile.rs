use std::borrow::Cow;
use std::collections::HashSet;

use wgpu::naga::front::glsl::{Frontend, Options};
use wgpu::naga::{Module, ShaderStage, TypeInner};

use crate::error::CompositorError;
use crate::gpu::scope;

/// A GLSL stage together with the names the compositor binds against.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ShaderSpec {
    pub label: &'static str,
    pub stage: ShaderStage,
    pub source: &'static str,
    /// Uniform members or resource globals that must be declared.
    pub required: &'static [&'static str],
}

pub(crate) const QUAD_VERTEX: ShaderSpec = ShaderSpec {
    label: "fullscreen quad vertex",
    stage: ShaderStage::Vertex,
    source: QUAD_VERTEX_GLSL,
    required: &[],
};

pub(crate) const TEXTURE_FRAGMENT: ShaderSpec = ShaderSpec {
    label: "textured quad fragment",
    stage: ShaderStage::Fragment,
    source: TEXTURE_FRAGMENT_GLSL,
    required: &["u_tint", "u_source", "u_source_sampler"],
};

pub(crate) const FADE_FRAGMENT: ShaderSpec = ShaderSpec {
    label: "fade fragment",
    stage: ShaderStage::Fragment,
    source: FADE_FRAGMENT_GLSL,
    required: &["u_background"],
};

pub(crate) const LINE_VERTEX: ShaderSpec = ShaderSpec {
    label: "line vertex",
    stage: ShaderStage::Vertex,
    source: LINE_VERTEX_GLSL,
    required: &["u_mvp", "u_viewport", "u_delta", "u_brightness", "u_line_width"],
};

pub(crate) const LINE_FRAGMENT: ShaderSpec = ShaderSpec {
    label: "line fragment",
    stage: ShaderStage::Fragment,
    source: LINE_FRAGMENT_GLSL,
    required: &["u_color"],
};

/// Parses the GLSL through naga and verifies every required name resolves.
pub(crate) fn reflect_shader(spec: &ShaderSpec) -> Result<Module, CompositorError> {
    let module = Frontend::default()
        .parse(&Options::from(spec.stage), spec.source)
        .map_err(|err| CompositorError::ShaderCompile {
            label: spec.label,
            message: err.to_string(),
        })?;

    let declared = declared_names(&module);
    if let Some(name) = spec
        .required
        .iter()
        .copied()
        .find(|name| !declared.contains(*name))
    {
        return Err(CompositorError::MissingShaderVariable {
            label: spec.label,
            name,
        });
    }
    Ok(module)
}

/// Validates and compiles one stage on the device.
pub(crate) fn compile_shader(
    device: &wgpu::Device,
    spec: &ShaderSpec,
) -> Result<wgpu::ShaderModule, CompositorError> {
    reflect_shader(spec)?;

    let module = scope::capture(device, || {
        device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(spec.label),
            source: wgpu::ShaderSource::Glsl {
                shader: Cow::Borrowed(spec.source),
                stage: spec.stage,
                defines: &[],
            },
        })
    })
    .map_err(|err| {
        tracing::error!(label = spec.label, error = %err, "shader module rejected");
        CompositorError::ShaderCompile {
            label: spec.label,
            message: err.to_string(),
        }
    })?;

    tracing::debug!(label = spec.label, "compiled shader");
    Ok(module)
}

fn declared_names(module: &Module) -> HashSet<&str> {
    let mut names = HashSet::new();
    for (_, global) in module.global_variables.iter() {
        if let Some(name) = global.name.as_deref() {
            names.insert(name);
        }
        if let TypeInner::Struct { members, .. } = &module.types[global.ty].inner {
            names.extend(members.iter().filter_map(|member| member.name.as_deref()));
        }
    }
    names
}

/// Full-screen triangle. `v_uv` has its origin at the top-left so a texture
/// rendered by the same pipeline is sampled without a vertical flip.
const QUAD_VERTEX_GLSL: &str = r"#version 450
layout(location = 0) out vec2 v_uv;

const vec2 positions[3] = vec2[3](
    vec2(-1.0, -3.0),
    vec2(3.0, 1.0),
    vec2(-1.0, 1.0)
);

void main() {
    uint vertex_index = uint(gl_VertexIndex);
    vec2 pos = positions[vertex_index];
    v_uv = vec2(pos.x * 0.5 + 0.5, 0.5 - pos.y * 0.5);
    gl_Position = vec4(pos, 0.0, 1.0);
}
";

const TEXTURE_FRAGMENT_GLSL: &str = r"#version 450
layout(location = 0) in vec2 v_uv;
layout(location = 0) out vec4 out_color;

layout(std140, set = 0, binding = 0) uniform QuadParams {
    vec4 u_tint;
} params;

layout(set = 1, binding = 0) uniform texture2D u_source;
layout(set = 1, binding = 1) uniform sampler u_source_sampler;

void main() {
    out_color = texture(sampler2D(u_source, u_source_sampler), v_uv) * params.u_tint;
}
";

const FADE_FRAGMENT_GLSL: &str = r"#version 450
layout(location = 0) out vec4 out_color;

layout(std140, set = 0, binding = 0) uniform FadeParams {
    vec4 u_background;
} params;

void main() {
    out_color = vec4(params.u_background.rgb, 1.0);
}
";

/// Each instance is one segment; six vertices expand it into a quad whose
/// half-width is `u_line_width / 2` framebuffer pixels.
const LINE_VERTEX_GLSL: &str = r"#version 450
layout(location = 0) in vec3 a_start;
layout(location = 1) in vec3 a_end;
layout(location = 0) out float v_shade;

layout(std140, set = 0, binding = 0) uniform LineParams {
    mat4 u_mvp;
    vec4 u_color;
    vec2 u_viewport;
    float u_delta;
    float u_brightness;
    float u_line_width;
} params;

const vec2 corners[6] = vec2[6](
    vec2(0.0, -1.0),
    vec2(1.0, -1.0),
    vec2(1.0, 1.0),
    vec2(0.0, -1.0),
    vec2(1.0, 1.0),
    vec2(0.0, 1.0)
);

vec3 scrolled(vec3 point) {
    float z = point.z + params.u_delta;
    if (z > 1.0) {
        z = z - 1.0;
    }
    return vec3(point.xy, z);
}

void main() {
    vec2 corner = corners[uint(gl_VertexIndex)];
    vec3 start = scrolled(a_start);
    vec3 end = scrolled(a_end);
    vec4 clip_start = params.u_mvp * vec4(start, 1.0);
    vec4 clip_end = params.u_mvp * vec4(end, 1.0);

    vec2 ndc_start = clip_start.xy / max(abs(clip_start.w), 0.0001);
    vec2 ndc_end = clip_end.xy / max(abs(clip_end.w), 0.0001);
    vec2 screen = (ndc_end - ndc_start) * params.u_viewport;
    vec2 dir = vec2(1.0, 0.0);
    if (length(screen) > 0.00001) {
        dir = normalize(screen);
    }
    vec2 offset = vec2(-dir.y, dir.x) * params.u_line_width / params.u_viewport;

    vec4 clip = clip_start;
    float depth = start.z;
    if (corner.x > 0.5) {
        clip = clip_end;
        depth = end.z;
    }
    clip = vec4(clip.xy + offset * corner.y * clip.w, clip.zw);

    v_shade = params.u_brightness * depth;
    gl_Position = clip;
}
";

const LINE_FRAGMENT_GLSL: &str = r"#version 450
layout(location = 0) in float v_shade;
layout(location = 0) out vec4 out_color;

layout(std140, set = 0, binding = 0) uniform LineParams {
    mat4 u_mvp;
    vec4 u_color;
    vec2 u_viewport;
    float u_delta;
    float u_brightness;
    float u_line_width;
} params;

void main() {
    out_color = vec4(vec3(v_shade) * params.u_color.rgb, 1.0);
}
";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_shaders_parse_and_declare_their_variables() {
        for spec in [
            QUAD_VERTEX,
            TEXTURE_FRAGMENT,
            FADE_FRAGMENT,
            LINE_VERTEX,
            LINE_FRAGMENT,
        ] {
            if let Err(err) = reflect_shader(&spec) {
                panic!("{} failed reflection: {err}", spec.label);
            }
        }
    }

    #[test]
    fn missing_uniform_is_reported_by_name() {
        let spec = ShaderSpec {
            required: &["u_tint", "u_missing"],
            ..TEXTURE_FRAGMENT
        };
        match reflect_shader(&spec) {
            Err(CompositorError::MissingShaderVariable { name, .. }) => {
                assert_eq!(name, "u_missing")
            }
            other => panic!("unexpected reflection result: {other:?}"),
        }
    }

    #[test]
    fn malformed_source_is_a_compile_error() {
        let spec = ShaderSpec {
            source: "#version 450\nvoid main() { this is not glsl }\n",
            ..FADE_FRAGMENT
        };
        assert!(matches!(
            reflect_shader(&spec),
            Err(CompositorError::ShaderCompile { .. })
        ));
    }
}
