use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("asset load failed: {0}")]
    Asset(String),

    #[error("GPU out of memory while allocating {resource}")]
    OutOfMemory { resource: &'static str },

    #[error("surface error: {0}")]
    Surface(String),

    #[error("no suitable GPU adapter found")]
    NoAdapter,

    #[error("device request failed: {0}")]
    Device(String),
}
