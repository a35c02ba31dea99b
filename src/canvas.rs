//! The per-surface canvas.
//!
//! [`Canvas`] owns the mirrored [`WidgetTree`], the shared geometry buffers and
//! the input router, and is the only place the widget layer talks to. Every
//! structural change arrives as a [`Notification`]; the canvas keeps the
//! identity index, region assignment, draw sequence and focus consistent
//! before the call returns.

use std::ops::Range;

use crate::dirty::DirtyFlags;
use crate::error::{CanvasError, Result};
use crate::geometry::{GeometryRegion, GeometrySize, RegionAllocator, SharedBuffers, Vertex};
use crate::input::{FocusState, InputEvent, InputRouter};
use crate::notification::{EventCtx, Notification};
use crate::render_stats::FrameStats;
use crate::tree::{NodeId, WidgetNode, WidgetTree};
use crate::widgets::{EventResponse, MaterialTag, WidgetKey, WidgetRef};
use crate::zorder::{self, ZOrder};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanvasConfig {
    /// Vertex slots in the shared vertex buffer
    pub vertex_capacity: usize,
    /// Index slots in the shared index buffer
    pub index_capacity: usize,
    /// Footprint reserved for nodes without drawable geometry
    pub placeholder: GeometrySize,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            vertex_capacity: 65_536,
            index_capacity: 196_608,
            placeholder: GeometrySize::PLACEHOLDER,
        }
    }
}

impl CanvasConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn vertex_capacity(mut self, capacity: usize) -> Self {
        self.vertex_capacity = capacity;
        self
    }

    pub fn index_capacity(mut self, capacity: usize) -> Self {
        self.index_capacity = capacity;
        self
    }

    pub fn placeholder(mut self, placeholder: GeometrySize) -> Self {
        self.placeholder = placeholder;
        self
    }

    fn capacity(&self) -> GeometrySize {
        GeometrySize::new(self.vertex_capacity, self.index_capacity)
    }
}

/// One entry of the draw sequence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawItem {
    pub node: NodeId,
    pub key: WidgetKey,
    pub region: GeometryRegion,
    /// Flags that were pending when the item was produced
    pub dirty: DirtyFlags,
    pub material: Option<MaterialTag>,
    pub drawable: bool,
}

impl DrawItem {
    fn from_node(node: &WidgetNode, dirty: DirtyFlags) -> Self {
        Self {
            node: node.id(),
            key: node.key(),
            region: node.region(),
            dirty,
            material: node.material(),
            drawable: node.is_drawable(),
        }
    }
}

/// Receives the output of [`Canvas::draw`].
///
/// Index data is local to each widget: a draw of `item` should use
/// `item.region.vertex_offset` as the base vertex and
/// `item.region.index_range()` as the index range.
pub trait DrawDispatcher {
    /// `range` of the shared vertex buffer was rewritten.
    fn upload_vertices(&mut self, range: Range<usize>, data: &[Vertex]) {
        let _ = (range, data);
    }

    /// `range` of the shared index buffer was rewritten.
    fn upload_indices(&mut self, range: Range<usize>, data: &[u32]) {
        let _ = (range, data);
    }

    fn draw(&mut self, item: &DrawItem);
}

pub struct Canvas {
    config: CanvasConfig,
    tree: WidgetTree,
    allocator: RegionAllocator,
    buffers: SharedBuffers,
    sequence: Vec<NodeId>,
    router: InputRouter,
    overflow: Option<CanvasError>,
    totals: FrameStats,
}

impl Canvas {
    pub fn new(config: CanvasConfig) -> Self {
        log::debug!(
            "creating canvas with {} vertices / {} indices",
            config.vertex_capacity,
            config.index_capacity
        );
        Self {
            config,
            tree: WidgetTree::new(),
            allocator: RegionAllocator::new(
                config.vertex_capacity,
                config.index_capacity,
                config.placeholder,
            ),
            buffers: SharedBuffers::new(config.capacity()),
            sequence: Vec::new(),
            router: InputRouter::new(),
            overflow: None,
            totals: FrameStats::default(),
        }
    }

    // ------------------------------------------------------------------------
    // Notifications
    // ------------------------------------------------------------------------

    /// Apply one structural notification.
    ///
    /// Unknown keys are ignored. The only error is
    /// [`CanvasError::CapacityExceeded`] when the change no longer fits the
    /// shared buffers; the tree is still updated and the canvas refuses to
    /// draw until [`Canvas::grow`] succeeds.
    pub fn notify(&mut self, notification: Notification) -> Result<()> {
        log::trace!("{} notification", notification.name());
        match notification {
            Notification::Attach(widget) => self.insert(None, None, &widget),
            Notification::Detach(key) => match self.tree.lookup(key) {
                Some(id) => self.remove(id),
                None => ignore("detach", key),
            },
            Notification::SlotAdded { parent, slot } => match self.tree.lookup(parent) {
                Some(parent) => self.insert(Some(parent), None, &slot),
                None => ignore("slot-added", parent),
            },
            Notification::SlotRemoved { parent, slot } => self.remove_child(parent, slot),
            Notification::SlotContentAdded { slot, content } => match self.tree.lookup(slot) {
                Some(slot) => self.insert(Some(slot), None, &content),
                None => ignore("slot-content-added", slot),
            },
            Notification::SlotContentReplaced { slot, old, new } => self.replace(slot, old, new),
            Notification::ContentChanged(key) => self.refresh_content(key),
            Notification::ContentChangedPartial(key, flags) => {
                match self.tree.lookup(key) {
                    Some(id) => self.tree.mark_dirty(id, flags),
                    None => return ignore("content-changed-partial", key),
                }
                Ok(())
            }
            Notification::ZOrderChanged(key, z_order) => self.reorder(key, z_order),
            Notification::VisibilityChanged(key) => {
                log::debug!("visibility of {:?} changed", key);
                Ok(())
            }
        }
    }

    pub fn attach(&mut self, widget: &WidgetRef) -> Result<()> {
        self.notify(Notification::Attach(widget.clone()))
    }

    pub fn detach(&mut self, key: WidgetKey) -> Result<()> {
        self.notify(Notification::Detach(key))
    }

    pub fn slot_added(&mut self, parent: WidgetKey, slot: &WidgetRef) -> Result<()> {
        self.notify(Notification::SlotAdded {
            parent,
            slot: slot.clone(),
        })
    }

    pub fn slot_removed(&mut self, parent: WidgetKey, slot: WidgetKey) -> Result<()> {
        self.notify(Notification::SlotRemoved { parent, slot })
    }

    pub fn slot_content_added(&mut self, slot: WidgetKey, content: &WidgetRef) -> Result<()> {
        self.notify(Notification::SlotContentAdded {
            slot,
            content: content.clone(),
        })
    }

    pub fn slot_content_replaced(
        &mut self,
        slot: WidgetKey,
        old: WidgetKey,
        new: Option<&WidgetRef>,
    ) -> Result<()> {
        self.notify(Notification::SlotContentReplaced {
            slot,
            old,
            new: new.cloned(),
        })
    }

    pub fn content_changed(&mut self, key: WidgetKey) -> Result<()> {
        self.notify(Notification::ContentChanged(key))
    }

    pub fn content_changed_partial(&mut self, key: WidgetKey, flags: DirtyFlags) -> Result<()> {
        self.notify(Notification::ContentChangedPartial(key, flags))
    }

    pub fn z_order_changed(&mut self, key: WidgetKey, z_order: ZOrder) -> Result<()> {
        self.notify(Notification::ZOrderChanged(key, z_order))
    }

    pub fn visibility_changed(&mut self, key: WidgetKey) -> Result<()> {
        self.notify(Notification::VisibilityChanged(key))
    }

    fn insert(
        &mut self,
        parent: Option<NodeId>,
        position: Option<usize>,
        widget: &WidgetRef,
    ) -> Result<()> {
        let insertion = self.tree.insert(parent, position, widget);
        self.router.forget(&insertion.displaced);

        if insertion.created.is_empty() {
            if insertion.displaced.is_empty() {
                return Ok(());
            }
            return self.rebuild();
        }

        log::debug!(
            "mirrored {} nodes under {:?}",
            insertion.created.len(),
            parent
        );

        // Provisional append after the cursor. The recompute in `rebuild` is
        // authoritative: it reassigns these regions in draw order and reports
        // any overflow.
        for &id in &insertion.created {
            let Some(node) = self.tree.get_mut(id) else {
                continue;
            };
            if let Err(err) = self.allocator.assign_initial(node) {
                log::debug!("provisional append stopped: {}", err);
                break;
            }
        }

        zorder::sort_inserted(&mut self.tree, &insertion.created);
        self.rebuild()
    }

    fn remove(&mut self, id: NodeId) -> Result<()> {
        let removed = self.tree.remove(id);
        log::debug!("removed {} nodes", removed.len());
        self.router.forget(&removed);
        self.rebuild()
    }

    fn remove_child(&mut self, parent: WidgetKey, slot: WidgetKey) -> Result<()> {
        let (Some(parent_id), Some(slot_id)) = (self.tree.lookup(parent), self.tree.lookup(slot))
        else {
            return ignore("slot-removed", slot);
        };
        if self.tree.get(slot_id).and_then(WidgetNode::parent) != Some(parent_id) {
            log::debug!("{:?} is not a child of {:?}, ignoring", slot, parent);
            return Ok(());
        }
        self.remove(slot_id)
    }

    fn replace(&mut self, slot: WidgetKey, old: WidgetKey, new: Option<WidgetRef>) -> Result<()> {
        let Some(slot_id) = self.tree.lookup(slot) else {
            return ignore("slot-content-replaced", slot);
        };
        let Some(old_id) = self.tree.lookup(old) else {
            return ignore("slot-content-replaced", old);
        };
        if self.tree.get(old_id).and_then(WidgetNode::parent) != Some(slot_id) {
            log::debug!("{:?} is not content of slot {:?}, ignoring", old, slot);
            return Ok(());
        }

        // Content that is already mirrored (possibly as a sibling in this
        // slot) leaves its old place before the position of `old` is read.
        let existing = new
            .as_ref()
            .and_then(|content| self.tree.lookup(content.borrow().key()))
            .filter(|&id| id != old_id);
        if let Some(existing) = existing {
            let displaced = self.tree.remove(existing);
            self.router.forget(&displaced);
        }

        // `old` went away with the displaced subtree
        let Some(position) = self.tree.position_in_scope(old_id) else {
            return self.rebuild();
        };
        let removed = self.tree.remove(old_id);
        self.router.forget(&removed);

        match new {
            Some(content) => self.insert(Some(slot_id), Some(position), &content),
            None => self.rebuild(),
        }
    }

    fn refresh_content(&mut self, key: WidgetKey) -> Result<()> {
        let Some(id) = self.tree.lookup(key) else {
            return ignore("content-changed", key);
        };
        let Some(widget) = self.tree.get(id).and_then(WidgetNode::widget) else {
            return Ok(());
        };
        let queried = match widget.try_borrow() {
            Ok(w) => Some((w.geometry(), w.material())),
            Err(_) => None,
        };
        let Some(node) = self.tree.get_mut(id) else {
            return Ok(());
        };
        node.mark_dirty(DirtyFlags::all());

        let Some((geometry, material)) = queried else {
            log::warn!("{:?} is borrowed, geometry not re-queried", key);
            return Ok(());
        };
        node.set_material(material);
        if node.geometry() == geometry {
            return Ok(());
        }

        log::debug!(
            "geometry of {:?} changed from {:?} to {:?}",
            key,
            node.geometry(),
            geometry
        );
        node.set_geometry(geometry);
        self.recompute()
    }

    fn reorder(&mut self, key: WidgetKey, z_order: ZOrder) -> Result<()> {
        let Some(id) = self.tree.lookup(key) else {
            return ignore("z-order-changed", key);
        };
        let Some(node) = self.tree.get_mut(id) else {
            return Ok(());
        };
        if node.z_order() == z_order {
            return Ok(());
        }
        node.set_z_order(z_order);

        match node.parent() {
            Some(parent) => zorder::local_sort(&mut self.tree, parent),
            None => zorder::global_sort(&mut self.tree),
        }
        self.rebuild()
    }

    /// Rebuild the cached draw sequence and reassign every region.
    fn rebuild(&mut self) -> Result<()> {
        self.sequence = zorder::build_draw_sequence(&self.tree);
        self.recompute()
    }

    /// Reassign every region from zero in draw order.
    ///
    /// Runs automatically after each structural change. Succeeding clears a
    /// previous overflow.
    pub fn recompute(&mut self) -> Result<()> {
        match self.allocator.recompute_all(&mut self.tree, &self.sequence) {
            Ok(_) => {
                if self.overflow.take().is_some() {
                    log::info!("canvas geometry fits its buffers again");
                }
                Ok(())
            }
            Err(err) => {
                log::error!("{}", err);
                self.overflow = Some(err.clone());
                Err(err)
            }
        }
    }

    /// Enlarge the shared buffers. Capacities never shrink.
    ///
    /// Every node is marked dirty so a dispatcher that reallocates its GPU
    /// buffers receives the full contents again on the next draw.
    pub fn grow(&mut self, capacity: GeometrySize) -> Result<()> {
        let current = self.allocator.capacity();
        let capacity = GeometrySize::new(
            capacity.vertices.max(current.vertices),
            capacity.indices.max(current.indices),
        );
        log::info!(
            "growing canvas buffers to {} vertices / {} indices",
            capacity.vertices,
            capacity.indices
        );

        self.config.vertex_capacity = capacity.vertices;
        self.config.index_capacity = capacity.indices;
        self.buffers.grow(capacity);
        self.allocator.set_capacity(capacity);
        self.tree.mark_all_dirty();
        self.recompute()
    }

    /// Drop nodes whose widgets the widget layer no longer holds.
    fn prune_orphans(&mut self) -> Result<()> {
        let orphans = self.tree.orphans();
        if orphans.is_empty() {
            return Ok(());
        }
        log::debug!("pruning {} nodes with dropped widgets", orphans.len());
        for id in orphans {
            let removed = self.tree.remove(id);
            self.router.forget(&removed);
        }
        self.rebuild()
    }

    /// Apply everything callbacks posted to `ctx`, in order.
    ///
    /// All notifications are applied even if one overflows; the first error
    /// is returned.
    fn apply(&mut self, ctx: &mut EventCtx) -> Result<()> {
        let mut result = Ok(());
        for notification in ctx.take_pending() {
            if let Err(err) = self.notify(notification) {
                if result.is_ok() {
                    result = Err(err);
                }
            }
        }
        self.router.validate(&self.tree);
        result
    }

    // ------------------------------------------------------------------------
    // Frame
    // ------------------------------------------------------------------------

    /// Advance animations. Returns true if another frame is wanted.
    pub fn tick(&mut self, dt: f32) -> Result<bool> {
        self.prune_orphans()?;

        let mut ctx = EventCtx::new();
        let mut animating = false;
        for &id in &self.sequence {
            let Some(widget) = self.tree.get(id).and_then(WidgetNode::widget) else {
                continue;
            };
            let active = match widget.try_borrow_mut() {
                Ok(mut w) => w.tick(dt, &mut ctx),
                Err(_) => false,
            };
            animating |= active;
        }

        let wants_frame = animating || ctx.frame_requested();
        self.apply(&mut ctx)?;
        Ok(wants_frame)
    }

    /// Walk the draw sequence once.
    ///
    /// Dirty nodes get their data rewritten into the shared buffers and
    /// reported to `dispatcher`, then their flags are cleared. Visible nodes
    /// with drawable geometry get a draw call. Fails without touching anything
    /// while the canvas is over capacity.
    pub fn draw<D: DrawDispatcher + ?Sized>(&mut self, dispatcher: &mut D) -> Result<FrameStats> {
        self.prune_orphans()?;
        if let Some(err) = &self.overflow {
            return Err(err.clone());
        }

        let mut stats = FrameStats {
            frames: 1,
            ..FrameStats::default()
        };

        for &id in &self.sequence {
            let Some(node) = self.tree.get_mut(id) else {
                continue;
            };
            let Some(widget) = node.widget() else {
                continue;
            };
            let flags = node.take_dirty();
            let item = DrawItem::from_node(node, flags);

            let w = match widget.try_borrow() {
                Ok(w) => w,
                Err(_) => {
                    log::warn!("{:?} is borrowed during draw, retrying next frame", item.key);
                    self.tree.mark_dirty(id, flags);
                    continue;
                }
            };
            stats.nodes_visited += 1;

            if flags.is_empty() {
                stats.clean_skips += 1;
            }
            if item.drawable && flags.contains(DirtyFlags::VERTEX) {
                let range = item.region.vertex_range();
                self.buffers.write_vertices(&item.region, &w.vertex_data());
                dispatcher.upload_vertices(range.clone(), &self.buffers.vertices()[range]);
                stats.vertex_uploads += 1;
            }
            if item.drawable && flags.contains(DirtyFlags::INDEX) {
                let range = item.region.index_range();
                self.buffers.write_indices(&item.region, &w.index_data());
                dispatcher.upload_indices(range.clone(), &self.buffers.indices()[range]);
                stats.index_uploads += 1;
            }

            if item.drawable && w.is_visible() && !self.tree.is_culled(id) {
                dispatcher.draw(&item);
                stats.nodes_drawn += 1;
            }
        }

        self.totals.accumulate(&stats);
        log::trace!("{:?}", stats);
        Ok(stats)
    }

    /// Deliver one input event. Notifications posted by the receiving
    /// callbacks are applied before this returns.
    pub fn process_input(&mut self, event: InputEvent) -> Result<EventResponse> {
        let mut ctx = EventCtx::new();
        let response = self
            .router
            .process(&self.tree, &self.sequence, &event, &mut ctx);
        self.apply(&mut ctx)?;
        Ok(response)
    }

    // ------------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------------

    /// Current draw order with each node's region and pending flags.
    pub fn draw_sequence(&self) -> Vec<DrawItem> {
        self.sequence
            .iter()
            .filter_map(|&id| self.tree.get(id))
            .map(|node| DrawItem::from_node(node, node.dirty()))
            .collect()
    }

    pub fn draw_order(&self) -> &[NodeId] {
        &self.sequence
    }

    pub fn tree(&self) -> &WidgetTree {
        &self.tree
    }

    pub fn lookup(&self, key: WidgetKey) -> Option<&WidgetNode> {
        self.tree.lookup(key).and_then(|id| self.tree.get(id))
    }

    pub fn region(&self, key: WidgetKey) -> Option<GeometryRegion> {
        self.lookup(key).map(WidgetNode::region)
    }

    pub fn focus(&self) -> FocusState {
        self.router.focus()
    }

    pub fn focused_key(&self) -> Option<WidgetKey> {
        self.router
            .focused()
            .and_then(|id| self.tree.get(id))
            .map(WidgetNode::key)
    }

    pub fn buffers(&self) -> &SharedBuffers {
        &self.buffers
    }

    pub fn vertex_buffer(&self) -> &[Vertex] {
        self.buffers.vertices()
    }

    pub fn index_buffer(&self) -> &[u32] {
        self.buffers.indices()
    }

    /// Vertex and index slots currently in use.
    pub fn used(&self) -> GeometrySize {
        self.allocator.cursor()
    }

    pub fn capacity(&self) -> GeometrySize {
        self.allocator.capacity()
    }

    pub fn overflow(&self) -> Option<&CanvasError> {
        self.overflow.as_ref()
    }

    pub fn config(&self) -> &CanvasConfig {
        &self.config
    }

    /// Totals over every frame drawn so far.
    pub fn stats(&self) -> FrameStats {
        self.totals
    }

    /// Forget every node. Buffer capacity is kept.
    pub fn clear(&mut self) {
        log::debug!("clearing canvas with {} nodes", self.tree.len());
        self.tree.clear();
        self.router.clear();
        self.sequence.clear();
        self.allocator.reset();
        self.overflow = None;
    }
}

impl Default for Canvas {
    fn default() -> Self {
        Self::new(CanvasConfig::default())
    }
}

fn ignore(what: &str, key: WidgetKey) -> Result<()> {
    log::debug!("{} for unknown widget {:?} ignored", what, key);
    Ok(())
}
