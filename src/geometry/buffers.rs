use super::allocator::{GeometryRegion, GeometrySize};
use super::vertex::Vertex;

/// CPU copies of the two shared buffers, allocated once at fixed capacity.
///
/// Only the draw pass writes here, one region at a time, right before the
/// draw call for the node owning that region.
#[derive(Debug, Clone)]
pub struct SharedBuffers {
    vertices: Vec<Vertex>,
    indices: Vec<u32>,
}

impl SharedBuffers {
    pub fn new(capacity: GeometrySize) -> Self {
        Self {
            vertices: vec![Vertex::default(); capacity.vertices],
            indices: vec![0; capacity.indices],
        }
    }

    pub fn capacity(&self) -> GeometrySize {
        GeometrySize::new(self.vertices.len(), self.indices.len())
    }

    /// Reallocate to a larger capacity, keeping existing contents.
    pub fn grow(&mut self, capacity: GeometrySize) {
        if capacity.vertices > self.vertices.len() {
            self.vertices.resize(capacity.vertices, Vertex::default());
        }
        if capacity.indices > self.indices.len() {
            self.indices.resize(capacity.indices, 0);
        }
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    /// Copy `data` into the vertex part of `region`.
    ///
    /// Data longer than the region is clamped; that means the widget changed
    /// size without a content-changed notification.
    pub fn write_vertices(&mut self, region: &GeometryRegion, data: &[Vertex]) -> usize {
        let range = region.vertex_range();
        debug_assert!(
            range.end <= self.vertices.len(),
            "vertex region {range:?} outside buffer of {}",
            self.vertices.len()
        );
        debug_assert!(
            data.len() <= region.vertex_size,
            "{} vertices do not fit region of {}",
            data.len(),
            region.vertex_size
        );
        if data.len() > region.vertex_size {
            log::warn!(
                "clamping {} vertices to region of {}",
                data.len(),
                region.vertex_size
            );
        }

        let count = data.len().min(region.vertex_size);
        let target = &mut self.vertices[range];
        target[..count].copy_from_slice(&data[..count]);
        target[count..].fill(Vertex::default());
        count
    }

    /// Copy `data` into the index part of `region`; the unused tail becomes
    /// zeros, i.e. degenerate triangles.
    pub fn write_indices(&mut self, region: &GeometryRegion, data: &[u32]) -> usize {
        let range = region.index_range();
        debug_assert!(
            range.end <= self.indices.len(),
            "index region {range:?} outside buffer of {}",
            self.indices.len()
        );
        debug_assert!(
            data.len() <= region.index_size,
            "{} indices do not fit region of {}",
            data.len(),
            region.index_size
        );
        if data.len() > region.index_size {
            log::warn!(
                "clamping {} indices to region of {}",
                data.len(),
                region.index_size
            );
        }

        let count = data.len().min(region.index_size);
        let target = &mut self.indices[range];
        target[..count].copy_from_slice(&data[..count]);
        target[count..].fill(0);
        count
    }
}
