//! Per-node dirty flags for the shared geometry buffers.
//!
//! A node is marked fully dirty when it is created, whenever
//! [`RegionAllocator::recompute_all`](crate::geometry::RegionAllocator::recompute_all)
//! moves its region, and on a content-changed notification. The draw pass
//! consumes the flags one buffer at a time, so a node whose indices are stale
//! but whose vertices are not only re-uploads the index part.

use bitflags::bitflags;

use crate::tree::{NodeId, WidgetNode, WidgetTree};

bitflags! {
    /// Which parts of a node's buffer region are stale
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct DirtyFlags: u8 {
        /// Vertex data must be re-uploaded
        const VERTEX = 0b01;
        /// Index data must be re-uploaded
        const INDEX  = 0b10;
    }
}

impl Default for DirtyFlags {
    fn default() -> Self {
        Self::empty()
    }
}

impl WidgetNode {
    pub fn mark_dirty(&mut self, flags: DirtyFlags) {
        self.dirty |= flags;
    }

    pub fn is_dirty(&self) -> bool {
        !self.dirty.is_empty()
    }

    /// Return the stale flags and clear them.
    pub fn take_dirty(&mut self) -> DirtyFlags {
        std::mem::take(&mut self.dirty)
    }
}

impl WidgetTree {
    /// Mark one node dirty. Unknown ids are ignored.
    pub fn mark_dirty(&mut self, id: NodeId, flags: DirtyFlags) {
        if let Some(node) = self.get_mut(id) {
            node.mark_dirty(flags);
        }
    }

    /// Mark a node and all its descendants dirty.
    pub fn mark_subtree_dirty(&mut self, id: NodeId, flags: DirtyFlags) {
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if let Some(node) = self.get_mut(current) {
                node.mark_dirty(flags);
                stack.extend(node.children().iter().copied());
            }
        }
    }

    pub fn mark_all_dirty(&mut self) {
        for node in self.iter_mut() {
            node.mark_dirty(DirtyFlags::all());
        }
    }

    /// Return the stale flags of `id` and clear them.
    pub fn consume_dirty(&mut self, id: NodeId) -> DirtyFlags {
        self.get_mut(id)
            .map(WidgetNode::take_dirty)
            .unwrap_or_default()
    }

    pub fn dirty_count(&self) -> usize {
        self.iter().filter(|node| node.is_dirty()).count()
    }
}
