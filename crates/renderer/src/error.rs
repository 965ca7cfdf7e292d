use thiserror::Error;

/// Fatal failures raised by the compositor.
///
/// None of these are retried: the render session is torn down and the error
/// surfaces to the host.
#[derive(Debug, Error)]
pub enum CompositorError {
    #[error("failed to compile {label} shader: {message}")]
    ShaderCompile { label: &'static str, message: String },
    #[error("{label} shader does not declare required variable `{name}`")]
    MissingShaderVariable {
        label: &'static str,
        name: &'static str,
    },
    #[error("GPU error during {op}: {message}")]
    Driver { op: &'static str, message: String },
    #[error("driver rejected {width}x{height} framebuffer: {message}")]
    FramebufferRejected {
        width: u32,
        height: u32,
        message: String,
    },
    #[error("compositor cannot render while {0}")]
    NotReady(&'static str),
    #[error("surface {width}x{height} exceeds the GPU texture limit of {max_dimension}")]
    SurfaceTooLarge {
        width: u32,
        height: u32,
        max_dimension: u32,
    },
}
