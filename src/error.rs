use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid bbox [{0}, {1}, {2}, {3}]")]
    InvalidBBox(f32, f32, f32, f32),

    #[error("invalid frame dims {0}x{1}")]
    InvalidDims(u32, u32),
}
