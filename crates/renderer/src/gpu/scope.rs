//! Error scopes around GPU calls.
//!
//! wgpu reports validation and allocation failures asynchronously through the
//! device. Wrapping each operation in a pair of scopes turns those reports
//! into ordinary `Result`s at the call site.

use crate::error::CompositorError;

/// Runs `f` inside validation and out-of-memory scopes, returning the first
/// captured error.
pub(crate) fn capture<T>(device: &wgpu::Device, f: impl FnOnce() -> T) -> Result<T, wgpu::Error> {
    device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let value = f();
    let validation = pollster::block_on(device.pop_error_scope());
    let out_of_memory = pollster::block_on(device.pop_error_scope());
    match validation.or(out_of_memory) {
        Some(err) => Err(err),
        None => Ok(value),
    }
}

/// Like [`capture`], logging failures under `op` and mapping them to
/// [`CompositorError::Driver`].
pub(crate) fn checked<T>(
    device: &wgpu::Device,
    op: &'static str,
    f: impl FnOnce() -> T,
) -> Result<T, CompositorError> {
    capture(device, f).map_err(|err| {
        tracing::error!(op, error = %err, "GPU operation failed");
        CompositorError::Driver {
            op,
            message: err.to_string(),
        }
    })
}
