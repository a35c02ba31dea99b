//! Shared geometry buffers and the region allocator that addresses them.
//!
//! Every node in the canvas owns one [`GeometryRegion`]: a contiguous slice of
//! the shared vertex buffer and a contiguous slice of the shared index buffer.
//! Regions are handed out by a monotonic cursor per buffer and re-accumulated
//! from zero in draw order after every structural change.

mod allocator;
mod buffers;
mod vertex;

pub use allocator::{BufferKind, GeometryRegion, GeometrySize, RegionAllocator};
pub use buffers::SharedBuffers;
pub use vertex::Vertex;
