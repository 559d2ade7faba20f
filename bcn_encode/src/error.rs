use thiserror::Error;

#[derive(Debug, Error)]
pub enum SurfaceError {
    #[error("surface dimensions {width} x {height} contain no pixels")]
    ZeroSizedSurface { width: u32, height: u32 },

    #[error("surface pixel count {width} x {height} would overflow")]
    PixelCountWouldOverflow { width: u32, height: u32 },

    #[error("row pitch {pitch} is smaller than the surface width {width}")]
    InvalidPitch { width: u32, pitch: u32 },

    #[error("expected at least {expected} bytes but found {actual}")]
    NotEnoughData { expected: usize, actual: usize },

    #[error("failed to allocate {size} bytes for compressed blocks")]
    AllocationFailed { size: usize },

    #[error("failed to start the compression worker pool")]
    WorkerSpawn(#[source] rayon::ThreadPoolBuildError),

    #[error("a compression worker panicked")]
    WorkerPanicked,
}
