//! Draw ordering across the three z-order bands.
//!
//! Within one scope (the children of a node, or the root list) nodes are
//! drawn in three bands:
//!
//! - **In order**: sorted by numeric key, ties broken by insertion order.
//! - **Latest**: drawn after every in-order sibling of the same scope, once
//!   that scope's in-order subtrees are done.
//! - **Last in hierarchy**: deferred to the very end of the whole draw pass,
//!   regardless of depth, in the order they were encountered.
//!
//! This lets tooltips, popups and dragged items float above their siblings
//! (or above everything) without being re-parented, so events and ownership
//! still follow their structural parent.

use crate::tree::{NodeId, WidgetNode, WidgetTree};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ZMode {
    #[default]
    InOrder,
    Latest,
    LastInHierarchy,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct ZOrder {
    /// Only orders nodes within the same band
    pub key: i32,
    pub mode: ZMode,
}

impl ZOrder {
    pub const fn in_order(key: i32) -> Self {
        Self {
            key,
            mode: ZMode::InOrder,
        }
    }

    pub const fn latest() -> Self {
        Self {
            key: 0,
            mode: ZMode::Latest,
        }
    }

    pub const fn last_in_hierarchy() -> Self {
        Self {
            key: 0,
            mode: ZMode::LastInHierarchy,
        }
    }

    pub const fn with_key(mut self, key: i32) -> Self {
        self.key = key;
        self
    }
}

/// Sort key keeping a scope's child list in local draw order.
fn scope_order(node: &WidgetNode) -> (ZMode, i32) {
    let z = node.z_order();
    (z.mode, z.key)
}

/// Re-sort the direct children of `parent`.
pub fn local_sort(tree: &mut WidgetTree, parent: NodeId) {
    tree.sort_scope_by(Some(parent), scope_order);
}

/// Re-sort the root list.
pub fn global_sort(tree: &mut WidgetTree) {
    tree.sort_scope_by(None, scope_order);
}

/// Re-sort the scope that contains `ids`' parents, plus each id's own children.
///
/// Used after inserting a subtree: every new node gets its children sorted and
/// the scope the subtree landed in is re-sorted once.
pub fn sort_inserted(tree: &mut WidgetTree, ids: &[NodeId]) {
    let Some(&root) = ids.first() else {
        return;
    };
    for &id in ids {
        local_sort(tree, id);
    }
    match tree.get(root).and_then(WidgetNode::parent) {
        Some(parent) => local_sort(tree, parent),
        None => global_sort(tree),
    }
}

/// Depth-first draw sequence over every live node.
///
/// Each node appears exactly once. Every node's region is assigned in this
/// order, so the result doubles as the allocation order.
pub fn build_draw_sequence(tree: &WidgetTree) -> Vec<NodeId> {
    let mut sequence = Vec::with_capacity(tree.len());
    let mut deferred = Vec::new();

    visit_scope(tree, tree.roots(), &mut sequence, &mut deferred);

    // Deferred nodes may defer more of their own descendants; those land
    // behind them in the same list.
    let mut i = 0;
    while i < deferred.len() {
        let id = deferred[i];
        visit(tree, id, &mut sequence, &mut deferred);
        i += 1;
    }

    sequence
}

fn visit(tree: &WidgetTree, id: NodeId, sequence: &mut Vec<NodeId>, deferred: &mut Vec<NodeId>) {
    let Some(node) = tree.get(id) else {
        return;
    };
    sequence.push(id);
    visit_scope(tree, node.children(), sequence, deferred);
}

fn visit_scope(
    tree: &WidgetTree,
    scope: &[NodeId],
    sequence: &mut Vec<NodeId>,
    deferred: &mut Vec<NodeId>,
) {
    let mut latest = Vec::new();

    for &id in scope {
        match tree.get(id).map(|node| node.z_order().mode) {
            Some(ZMode::InOrder) => visit(tree, id, sequence, deferred),
            Some(ZMode::Latest) => latest.push(id),
            Some(ZMode::LastInHierarchy) => deferred.push(id),
            None => {}
        }
    }

    for id in latest {
        visit(tree, id, sequence, deferred);
    }
}
