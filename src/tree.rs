//! Arena-based node storage mirroring the live widget graph.
//!
//! The tree keeps one [`WidgetNode`] per widget, slot or content object that
//! is attached to the canvas. It uses a sparse-set architecture with
//! generational indices:
//!
//! - **Generational Indices**: [`NodeId`] contains index + generation, so a
//!   handle to a removed node (e.g. a stale focus handle) never aliases the
//!   node that later reuses its slot.
//!
//! - **Dense Storage**: Nodes are stored contiguously for cache-friendly
//!   iteration during the recompute and draw passes.
//!
//! - **Identity Index**: O(1) lookup from [`WidgetKey`] to [`NodeId`]. It is
//!   updated in the same code paths that store and free nodes, so it always
//!   holds exactly the keys present in the arena.
//!
//! - **Swap-Remove**: O(1) removal without creating holes in dense storage.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use crate::dirty::DirtyFlags;
use crate::geometry::{GeometryRegion, GeometrySize};
use crate::widgets::{MaterialTag, Widget, WidgetKey, WidgetRef};
use crate::zorder::ZOrder;

/// Handle to a node in the [`WidgetTree`].
///
/// Uses a generational index design:
/// - `index`: Position in the sparse array (reusable after removal)
/// - `generation`: Version counter that increments when a slot is reused
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct NodeId {
    index: u32,
    generation: u32,
}

impl NodeId {
    fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    /// Combines generation (high bits) with index (low bits).
    pub fn as_u64(self) -> u64 {
        ((self.generation as u64) << 32) | (self.index as u64)
    }
}

/// Entry in the sparse array. The generation survives removal so that a
/// reused slot always gets a fresh one.
struct SparseSlot {
    generation: u32,
    dense_index: Option<usize>,
}

/// One mirrored widget, slot or content object.
pub struct WidgetNode {
    id: NodeId,
    key: WidgetKey,
    /// Non-owning; the widget layer owns the widget
    widget: Weak<RefCell<dyn Widget>>,
    parent: Option<NodeId>,
    /// Kept sorted in local draw order
    children: Vec<NodeId>,
    z_order: ZOrder,
    pub(crate) dirty: DirtyFlags,
    material: Option<MaterialTag>,
    /// Drawable requirement; `None` for layout containers
    geometry: Option<GeometrySize>,
    region: GeometryRegion,
}

impl WidgetNode {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn key(&self) -> WidgetKey {
        self.key
    }

    /// The live widget, or `None` if the widget layer already dropped it.
    pub fn widget(&self) -> Option<WidgetRef> {
        self.widget.upgrade()
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn z_order(&self) -> ZOrder {
        self.z_order
    }

    pub fn dirty(&self) -> DirtyFlags {
        self.dirty
    }

    pub fn material(&self) -> Option<MaterialTag> {
        self.material
    }

    pub fn geometry(&self) -> Option<GeometrySize> {
        self.geometry
    }

    pub fn is_drawable(&self) -> bool {
        self.geometry.is_some()
    }

    pub fn region(&self) -> GeometryRegion {
        self.region
    }

    pub(crate) fn set_region(&mut self, region: GeometryRegion) {
        self.region = region;
    }

    pub(crate) fn set_z_order(&mut self, z_order: ZOrder) {
        self.z_order = z_order;
    }

    pub(crate) fn set_geometry(&mut self, geometry: Option<GeometrySize>) {
        self.geometry = geometry;
    }

    pub(crate) fn set_material(&mut self, material: Option<MaterialTag>) {
        self.material = material;
    }
}

/// Result of a structural insert.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Insertion {
    /// New nodes, subtree root first, in depth-first creation order
    pub created: Vec<NodeId>,
    /// Nodes removed because the inserted key already lived elsewhere
    pub displaced: Vec<NodeId>,
}

impl Insertion {
    pub fn root(&self) -> Option<NodeId> {
        self.created.first().copied()
    }
}

/// Owned n-ary tree of [`WidgetNode`]s with an identity index.
///
/// Supports any number of independent roots.
pub struct WidgetTree {
    /// Dense array of nodes
    dense: Vec<WidgetNode>,
    /// Sparse map from index to dense position + generation
    sparse: Vec<SparseSlot>,
    /// Free list of reusable sparse indices
    free_indices: Vec<u32>,
    roots: Vec<NodeId>,
    index: HashMap<WidgetKey, NodeId>,
}

impl WidgetTree {
    pub fn new() -> Self {
        Self {
            dense: Vec::new(),
            sparse: Vec::new(),
            free_indices: Vec::new(),
            roots: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Mirror `widget` and all of its current children as a new subtree.
    ///
    /// With `parent == None` the subtree becomes a new root. `position` is the
    /// index in the parent's child list (or root list); `None` appends. If the
    /// widget's key is already in the tree, the old subtree is removed first,
    /// which turns the insert into a re-parent.
    pub fn insert(
        &mut self,
        parent: Option<NodeId>,
        position: Option<usize>,
        widget: &WidgetRef,
    ) -> Insertion {
        let key = widget.borrow().key();
        let mut insertion = Insertion::default();

        if let Some(existing) = self.lookup(key) {
            log::debug!("re-parenting widget {:?}", key);
            insertion.displaced = self.remove(existing);
        }

        if let Some(parent) = parent {
            if !self.contains(parent) {
                log::debug!("parent of widget {:?} is gone, not inserting", key);
                return insertion;
            }
        }

        let Some(id) = self.build(widget, parent, &mut insertion.created) else {
            return insertion;
        };

        let siblings = match parent {
            Some(parent) => match self.get_mut(parent) {
                Some(node) => &mut node.children,
                None => return insertion,
            },
            None => &mut self.roots,
        };
        let position = position.unwrap_or(siblings.len()).min(siblings.len());
        siblings.insert(position, id);

        insertion
    }

    fn build(
        &mut self,
        widget: &WidgetRef,
        parent: Option<NodeId>,
        created: &mut Vec<NodeId>,
    ) -> Option<NodeId> {
        let (key, z_order, material, geometry, children) = {
            let w = widget.borrow();
            (w.key(), w.z_order(), w.material(), w.geometry(), w.children())
        };

        if self.index.contains_key(&key) {
            log::warn!("widget {:?} appears twice in one subtree, skipping", key);
            return None;
        }

        let id = self.next_id();

        self.store(WidgetNode {
            id,
            key,
            widget: Rc::downgrade(widget),
            parent,
            children: Vec::with_capacity(children.len()),
            z_order,
            dirty: DirtyFlags::all(),
            material,
            geometry,
            region: GeometryRegion::default(),
        });
        created.push(id);

        for child in &children {
            if let Some(child_id) = self.build(child, Some(id), created) {
                if let Some(node) = self.get_mut(id) {
                    node.children.push(child_id);
                }
            }
        }

        Some(id)
    }

    fn next_id(&mut self) -> NodeId {
        if let Some(index) = self.free_indices.pop() {
            let slot = &mut self.sparse[index as usize];
            slot.generation = slot.generation.wrapping_add(1);
            NodeId::new(index, slot.generation)
        } else {
            let index = self.sparse.len() as u32;
            self.sparse.push(SparseSlot {
                generation: 0,
                dense_index: None,
            });
            NodeId::new(index, 0)
        }
    }

    fn store(&mut self, node: WidgetNode) {
        let dense_index = self.dense.len();
        self.sparse[node.id.index as usize].dense_index = Some(dense_index);
        self.index.insert(node.key, node.id);
        self.dense.push(node);
    }

    /// Remove a node and its whole subtree.
    ///
    /// Returns every removed id, subtree root first. Unknown or stale ids
    /// remove nothing.
    pub fn remove(&mut self, id: NodeId) -> Vec<NodeId> {
        let Some(parent) = self.get(id).map(|node| node.parent) else {
            return Vec::new();
        };

        match parent {
            Some(parent) => {
                if let Some(node) = self.get_mut(parent) {
                    node.children.retain(|&child| child != id);
                }
            }
            None => self.roots.retain(|&root| root != id),
        }

        let mut closure = vec![id];
        let mut i = 0;
        while i < closure.len() {
            let current = closure[i];
            if let Some(node) = self.get(current) {
                closure.extend(node.children.iter().copied());
            }
            i += 1;
        }

        for &removed in &closure {
            self.free(removed);
        }

        closure
    }

    fn free(&mut self, id: NodeId) {
        let Some(dense_index) = self.dense_index(id) else {
            return;
        };

        let last_dense_index = self.dense.len() - 1;
        let removed = self.dense.swap_remove(dense_index);

        // Fix up the moved node's sparse entry
        if dense_index != last_dense_index {
            let moved = self.dense[dense_index].id.index;
            self.sparse[moved as usize].dense_index = Some(dense_index);
        }

        self.sparse[id.index as usize].dense_index = None;
        self.free_indices.push(id.index);

        if self.index.get(&removed.key) == Some(&id) {
            self.index.remove(&removed.key);
        }
    }

    /// Get the dense array index for a NodeId, validating generation.
    fn dense_index(&self, id: NodeId) -> Option<usize> {
        self.sparse
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.dense_index)
    }

    pub fn lookup(&self, key: WidgetKey) -> Option<NodeId> {
        self.index.get(&key).copied()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.dense_index(id).is_some()
    }

    pub fn get(&self, id: NodeId) -> Option<&WidgetNode> {
        self.dense_index(id).map(|idx| &self.dense[idx])
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut WidgetNode> {
        match self.dense_index(id) {
            Some(idx) => Some(&mut self.dense[idx]),
            None => None,
        }
    }

    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    /// Children of `parent`, or the root list for `None`.
    pub fn scope(&self, parent: Option<NodeId>) -> &[NodeId] {
        match parent {
            Some(parent) => self.get(parent).map(|node| node.children()).unwrap_or(&[]),
            None => &self.roots,
        }
    }

    /// Position of `id` inside its parent's child list (or the root list).
    pub fn position_in_scope(&self, id: NodeId) -> Option<usize> {
        let parent = self.get(id)?.parent;
        self.scope(parent).iter().position(|&sibling| sibling == id)
    }

    /// Stable re-sort of one scope by `sort_key`. Siblings with equal keys
    /// keep their list order.
    pub(crate) fn sort_scope_by<K: Ord>(
        &mut self,
        parent: Option<NodeId>,
        mut sort_key: impl FnMut(&WidgetNode) -> K,
    ) {
        let mut list = match parent {
            Some(parent) => match self.get_mut(parent) {
                Some(node) => std::mem::take(&mut node.children),
                None => return,
            },
            None => std::mem::take(&mut self.roots),
        };

        list.sort_by_key(|&id| self.get(id).map(&mut sort_key));

        match parent {
            Some(parent) => {
                if let Some(node) = self.get_mut(parent) {
                    node.children = list;
                }
            }
            None => self.roots = list,
        }
    }

    /// A node is culled when it or any ancestor is invisible, or when its
    /// widget (or an ancestor's) no longer exists.
    pub fn is_culled(&self, id: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(cur) = current {
            let Some(node) = self.get(cur) else {
                return true;
            };
            let visible = match node.widget() {
                // A widget mid-callback is mutably borrowed; treat it as visible
                Some(widget) => widget.try_borrow().map(|w| w.is_visible()).unwrap_or(true),
                None => false,
            };
            if !visible {
                return true;
            }
            current = node.parent;
        }
        false
    }

    /// Nodes whose widget has been dropped by the widget layer.
    pub fn orphans(&self) -> Vec<NodeId> {
        self.dense
            .iter()
            .filter(|node| node.widget.strong_count() == 0)
            .map(|node| node.id)
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &WidgetNode> {
        self.dense.iter()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut WidgetNode> {
        self.dense.iter_mut()
    }

    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.dense.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dense.is_empty()
    }

    pub fn clear(&mut self) {
        self.dense.clear();
        self.sparse.clear();
        self.free_indices.clear();
        self.roots.clear();
        self.index.clear();
    }
}

impl Default for WidgetTree {
    fn default() -> Self {
        Self::new()
    }
}
