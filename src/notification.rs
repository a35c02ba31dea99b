// ============================================================================
// Structural notifications from the widget layer
// ============================================================================

use crate::dirty::DirtyFlags;
use crate::widgets::{WidgetKey, WidgetRef};
use crate::zorder::ZOrder;

/// A change the widget layer reports to the canvas.
///
/// Every variant is fire-and-forget: referencing a widget the canvas does not
/// track is a silent no-op.
pub enum Notification {
    /// Mirror a widget and its current children as a new root
    Attach(WidgetRef),
    /// Remove a widget and its subtree, wherever it lives
    Detach(WidgetKey),
    SlotAdded { parent: WidgetKey, slot: WidgetRef },
    SlotRemoved { parent: WidgetKey, slot: WidgetKey },
    SlotContentAdded { slot: WidgetKey, content: WidgetRef },
    /// Swap a slot's content in place; `new: None` just removes `old`
    SlotContentReplaced {
        slot: WidgetKey,
        old: WidgetKey,
        new: Option<WidgetRef>,
    },
    /// Geometry is stale; the requirement is re-queried and may grow or shrink
    ContentChanged(WidgetKey),
    /// Only part of the geometry is stale, the requirement is unchanged
    ContentChangedPartial(WidgetKey, DirtyFlags),
    ZOrderChanged(WidgetKey, ZOrder),
    /// Informational only
    VisibilityChanged(WidgetKey),
}

impl Notification {
    pub fn name(&self) -> &'static str {
        match self {
            Notification::Attach(_) => "attach",
            Notification::Detach(_) => "detach",
            Notification::SlotAdded { .. } => "slot-added",
            Notification::SlotRemoved { .. } => "slot-removed",
            Notification::SlotContentAdded { .. } => "slot-content-added",
            Notification::SlotContentReplaced { .. } => "slot-content-replaced",
            Notification::ContentChanged(_) => "content-changed",
            Notification::ContentChangedPartial(..) => "content-changed-partial",
            Notification::ZOrderChanged(..) => "z-order-changed",
            Notification::VisibilityChanged(_) => "visibility-changed",
        }
    }
}

/// Handed to widget callbacks so they can request changes without touching
/// canvas state.
///
/// Posted notifications are applied in order by the canvas right after the
/// callback returns, before the canvas entry point that ran the callback
/// returns.
#[derive(Default)]
pub struct EventCtx {
    pending: Vec<Notification>,
    frame_requested: bool,
}

impl EventCtx {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notify(&mut self, notification: Notification) {
        self.pending.push(notification);
    }

    pub fn detach(&mut self, key: WidgetKey) {
        self.notify(Notification::Detach(key));
    }

    pub fn content_changed(&mut self, key: WidgetKey) {
        self.notify(Notification::ContentChanged(key));
    }

    pub fn z_order_changed(&mut self, key: WidgetKey, z_order: ZOrder) {
        self.notify(Notification::ZOrderChanged(key, z_order));
    }

    /// Ask for another frame even if nothing is animating.
    pub fn request_frame(&mut self) {
        self.frame_requested = true;
    }

    pub fn frame_requested(&self) -> bool {
        self.frame_requested
    }

    pub fn pending(&self) -> &[Notification] {
        &self.pending
    }

    pub(crate) fn take_pending(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ctx_collects_in_order() {
        let key = WidgetKey::next();
        let mut ctx = EventCtx::new();
        ctx.content_changed(key);
        ctx.detach(key);

        let names: Vec<_> = ctx.pending().iter().map(Notification::name).collect();
        assert_eq!(names, vec!["content-changed", "detach"]);

        assert_eq!(ctx.take_pending().len(), 2);
        assert!(ctx.pending().is_empty());
        assert!(!ctx.frame_requested());
    }
}
