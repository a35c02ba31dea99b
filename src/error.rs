use thiserror::Error;

use crate::geometry::BufferKind;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CanvasError {
    /// Accumulated geometry no longer fits a shared buffer. The canvas stops
    /// drawing until [`Canvas::grow`](crate::Canvas::grow) makes room.
    #[error("{buffer} buffer capacity exceeded: {required} required, {capacity} available")]
    CapacityExceeded {
        buffer: BufferKind,
        required: usize,
        capacity: usize,
    },
}

pub type Result<T> = std::result::Result<T, CanvasError>;
