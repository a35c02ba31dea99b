use std::fmt;
use std::ops::Range;

use crate::dirty::DirtyFlags;
use crate::error::{CanvasError, Result};
use crate::tree::{NodeId, WidgetNode, WidgetTree};

/// Number of vertices and indices a node needs in the shared buffers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct GeometrySize {
    pub vertices: usize,
    pub indices: usize,
}

impl GeometrySize {
    /// Reserved for non-drawable layout containers so debug and line overlays
    /// always have a stable slot.
    pub const PLACEHOLDER: GeometrySize = GeometrySize::new(4, 8);

    pub const fn new(vertices: usize, indices: usize) -> Self {
        Self { vertices, indices }
    }

    /// Geometry of `count` axis-aligned quads (4 vertices, 6 indices each).
    pub const fn quads(count: usize) -> Self {
        Self::new(count * 4, count * 6)
    }
}

/// A node's slice of the shared vertex and index buffers, in elements.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct GeometryRegion {
    pub vertex_offset: usize,
    pub vertex_size: usize,
    pub index_offset: usize,
    pub index_size: usize,
}

impl GeometryRegion {
    pub fn vertex_range(&self) -> Range<usize> {
        self.vertex_offset..self.vertex_offset + self.vertex_size
    }

    pub fn index_range(&self) -> Range<usize> {
        self.index_offset..self.index_offset + self.index_size
    }

    pub fn size(&self) -> GeometrySize {
        GeometrySize::new(self.vertex_size, self.index_size)
    }

    /// True if the two regions share any vertex or any index slot.
    pub fn overlaps(&self, other: &GeometryRegion) -> bool {
        fn ranges_overlap(a: Range<usize>, b: Range<usize>) -> bool {
            !a.is_empty() && !b.is_empty() && a.start < b.end && b.start < a.end
        }
        ranges_overlap(self.vertex_range(), other.vertex_range())
            || ranges_overlap(self.index_range(), other.index_range())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BufferKind {
    Vertex,
    Index,
}

impl fmt::Display for BufferKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BufferKind::Vertex => f.write_str("vertex"),
            BufferKind::Index => f.write_str("index"),
        }
    }
}

/// Hands out non-overlapping buffer regions with one monotonic cursor per buffer.
///
/// Regions are never shifted incrementally: after any structural change the
/// whole tree is re-accumulated from zero in draw order with
/// [`RegionAllocator::recompute_all`]. This is O(total nodes) per mutation,
/// which keeps the addressing trivially correct.
#[derive(Debug, Clone)]
pub struct RegionAllocator {
    vertex_cursor: usize,
    index_cursor: usize,
    vertex_capacity: usize,
    index_capacity: usize,
    placeholder: GeometrySize,
}

impl RegionAllocator {
    pub fn new(vertex_capacity: usize, index_capacity: usize, placeholder: GeometrySize) -> Self {
        Self {
            vertex_cursor: 0,
            index_cursor: 0,
            vertex_capacity,
            index_capacity,
            placeholder,
        }
    }

    /// Footprint of a node given its drawable requirement.
    pub fn footprint(&self, geometry: Option<GeometrySize>) -> GeometrySize {
        geometry.unwrap_or(self.placeholder)
    }

    /// Current cursor positions, i.e. the total space handed out.
    pub fn cursor(&self) -> GeometrySize {
        GeometrySize::new(self.vertex_cursor, self.index_cursor)
    }

    pub fn capacity(&self) -> GeometrySize {
        GeometrySize::new(self.vertex_capacity, self.index_capacity)
    }

    pub fn set_capacity(&mut self, capacity: GeometrySize) {
        self.vertex_capacity = capacity.vertices;
        self.index_capacity = capacity.indices;
    }

    pub fn reset(&mut self) {
        self.vertex_cursor = 0;
        self.index_cursor = 0;
    }

    fn take(&mut self, size: GeometrySize) -> GeometryRegion {
        let region = GeometryRegion {
            vertex_offset: self.vertex_cursor,
            vertex_size: size.vertices,
            index_offset: self.index_cursor,
            index_size: size.indices,
        };
        self.vertex_cursor += size.vertices;
        self.index_cursor += size.indices;
        region
    }

    fn check_capacity(&self) -> Result<()> {
        if self.vertex_cursor > self.vertex_capacity {
            return Err(CanvasError::CapacityExceeded {
                buffer: BufferKind::Vertex,
                required: self.vertex_cursor,
                capacity: self.vertex_capacity,
            });
        }
        if self.index_cursor > self.index_capacity {
            return Err(CanvasError::CapacityExceeded {
                buffer: BufferKind::Index,
                required: self.index_cursor,
                capacity: self.index_capacity,
            });
        }
        Ok(())
    }

    /// Append a region for a freshly created node after the current cursor.
    pub fn assign_initial(&mut self, node: &mut WidgetNode) -> Result<GeometryRegion> {
        let region = self.take(self.footprint(node.geometry()));
        node.set_region(region);
        node.mark_dirty(DirtyFlags::all());
        self.check_capacity()?;
        Ok(region)
    }

    /// Re-accumulate every region from zero, walking `order` (the draw order).
    ///
    /// Nodes whose region moved or resized are marked fully dirty. Returns the
    /// number of such nodes. Calling this twice without an intervening
    /// mutation moves nothing the second time.
    pub fn recompute_all(&mut self, tree: &mut WidgetTree, order: &[NodeId]) -> Result<usize> {
        self.reset();
        let mut moved = 0;

        for &id in order {
            let Some(node) = tree.get_mut(id) else {
                continue;
            };
            let region = self.take(self.footprint(node.geometry()));
            if node.region() != region {
                node.set_region(region);
                node.mark_dirty(DirtyFlags::all());
                moved += 1;
            }
        }

        log::trace!(
            "recomputed {} regions ({} moved), cursor {:?}",
            order.len(),
            moved,
            self.cursor()
        );

        self.check_capacity()?;
        Ok(moved)
    }
}
