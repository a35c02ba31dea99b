//! Pointer and keyboard routing.
//!
//! The router owns the canvas' only focus state. A node becomes focused
//! exclusively through a pointer move that lands on it; button and wheel
//! input then goes to that node alone, so a click always lands on the widget
//! that was last hovered. Key input is broadcast to every enabled widget that
//! asks for it, independent of focus.

use crate::notification::EventCtx;
use crate::tree::{NodeId, WidgetNode, WidgetTree};
use crate::widgets::{Event, EventResponse, Key, Modifiers, MouseButton};

/// Raw input, one value per platform message.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    MouseMove { x: f32, y: f32 },
    MouseDown { x: f32, y: f32, button: MouseButton },
    MouseUp { x: f32, y: f32, button: MouseButton },
    MouseWheel {
        x: f32,
        y: f32,
        delta_x: f32,
        delta_y: f32,
    },
    KeyDown { key: Key, modifiers: Modifiers },
    KeyUp { key: Key, modifiers: Modifiers },
    /// Pointer left the surface
    PointerLeft,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FocusState {
    #[default]
    Unfocused,
    Focused(NodeId),
}

impl FocusState {
    pub fn node(self) -> Option<NodeId> {
        match self {
            FocusState::Unfocused => None,
            FocusState::Focused(id) => Some(id),
        }
    }
}

#[derive(Debug, Default)]
pub struct InputRouter {
    focus: FocusState,
    pointer: Option<(f32, f32)>,
}

impl InputRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn focus(&self) -> FocusState {
        self.focus
    }

    pub fn focused(&self) -> Option<NodeId> {
        self.focus.node()
    }

    /// Last pointer position on the surface, if the pointer is over it.
    pub fn pointer(&self) -> Option<(f32, f32)> {
        self.pointer
    }

    /// Focusable, enabled and not culled.
    pub fn is_eligible(tree: &WidgetTree, id: NodeId) -> bool {
        let Some(widget) = tree.get(id).and_then(WidgetNode::widget) else {
            return false;
        };
        let interactive = match widget.try_borrow() {
            Ok(w) => w.is_focusable() && w.is_enabled(),
            Err(_) => false,
        };
        interactive && !tree.is_culled(id)
    }

    fn contains(tree: &WidgetTree, id: NodeId, x: f32, y: f32) -> bool {
        let Some(widget) = tree.get(id).and_then(WidgetNode::widget) else {
            return false;
        };
        let hit = match widget.try_borrow() {
            Ok(w) => w.bounds().contains(x, y),
            Err(_) => false,
        };
        hit
    }

    /// Topmost eligible node under the pointer: `sequence` is walked back to
    /// front, so a node drawn later wins over any node it overlaps.
    pub fn hit_test(tree: &WidgetTree, sequence: &[NodeId], x: f32, y: f32) -> Option<NodeId> {
        sequence
            .iter()
            .rev()
            .copied()
            .find(|&id| Self::contains(tree, id, x, y) && Self::is_eligible(tree, id))
    }

    pub fn process(
        &mut self,
        tree: &WidgetTree,
        sequence: &[NodeId],
        event: &InputEvent,
        ctx: &mut EventCtx,
    ) -> EventResponse {
        match *event {
            InputEvent::MouseMove { x, y } => self.pointer_moved(tree, sequence, x, y, ctx),
            InputEvent::PointerLeft => self.pointer_left(tree, ctx),
            InputEvent::MouseDown { x, y, button } => {
                self.deliver_to_focus(tree, &Event::MouseDown { x, y, button }, ctx)
            }
            InputEvent::MouseUp { x, y, button } => {
                self.deliver_to_focus(tree, &Event::MouseUp { x, y, button }, ctx)
            }
            InputEvent::MouseWheel {
                x,
                y,
                delta_x,
                delta_y,
            } => self.deliver_to_focus(
                tree,
                &Event::Wheel {
                    x,
                    y,
                    delta_x,
                    delta_y,
                },
                ctx,
            ),
            InputEvent::KeyDown { key, modifiers } => {
                Self::broadcast_key(tree, sequence, &Event::KeyDown { key, modifiers }, ctx)
            }
            InputEvent::KeyUp { key, modifiers } => {
                Self::broadcast_key(tree, sequence, &Event::KeyUp { key, modifiers }, ctx)
            }
        }
    }

    fn pointer_moved(
        &mut self,
        tree: &WidgetTree,
        sequence: &[NodeId],
        x: f32,
        y: f32,
        ctx: &mut EventCtx,
    ) -> EventResponse {
        self.pointer = Some((x, y));
        let hit = Self::hit_test(tree, sequence, x, y);

        if let FocusState::Focused(id) = self.focus {
            if !tree.contains(id) {
                log::debug!("focused node {:?} is gone, clearing focus", id);
                self.set_focus(FocusState::Unfocused);
            } else if hit == Some(id) {
                return Self::deliver(tree, id, &Event::Move { x, y }, ctx);
            } else {
                // Pointer left the node, or a nearer node now covers it
                let response = Self::deliver(tree, id, &Event::Leave { x, y }, ctx);
                if response == EventResponse::KeepFocus && Self::is_eligible(tree, id) {
                    return Self::deliver(tree, id, &Event::Move { x, y }, ctx);
                }
                self.set_focus(FocusState::Unfocused);
            }
        }

        match hit {
            Some(id) => {
                self.set_focus(FocusState::Focused(id));
                Self::deliver(tree, id, &Event::Enter { x, y }, ctx)
            }
            None => EventResponse::Ignored,
        }
    }

    fn pointer_left(&mut self, tree: &WidgetTree, ctx: &mut EventCtx) -> EventResponse {
        // Already reported, e.g. a second leave after the node kept focus
        let Some((x, y)) = self.pointer.take() else {
            return EventResponse::Ignored;
        };
        let FocusState::Focused(id) = self.focus else {
            return EventResponse::Ignored;
        };
        if !tree.contains(id) {
            self.set_focus(FocusState::Unfocused);
            return EventResponse::Ignored;
        }

        let response = Self::deliver(tree, id, &Event::Leave { x, y }, ctx);
        if response != EventResponse::KeepFocus || !Self::is_eligible(tree, id) {
            self.set_focus(FocusState::Unfocused);
        }
        response
    }

    fn deliver_to_focus(
        &mut self,
        tree: &WidgetTree,
        event: &Event,
        ctx: &mut EventCtx,
    ) -> EventResponse {
        match self.focus {
            FocusState::Focused(id) if Self::is_eligible(tree, id) => {
                Self::deliver(tree, id, event, ctx)
            }
            FocusState::Focused(id) => {
                log::debug!("focused node {:?} is no longer eligible, dropping focus", id);
                self.set_focus(FocusState::Unfocused);
                EventResponse::Ignored
            }
            FocusState::Unfocused => EventResponse::Ignored,
        }
    }

    /// Topmost first. Not gated by focus, so global accelerators work.
    fn broadcast_key(
        tree: &WidgetTree,
        sequence: &[NodeId],
        event: &Event,
        ctx: &mut EventCtx,
    ) -> EventResponse {
        let targets: Vec<NodeId> = sequence
            .iter()
            .rev()
            .copied()
            .filter(|&id| {
                tree.get(id)
                    .and_then(WidgetNode::widget)
                    .is_some_and(|widget| {
                        widget
                            .try_borrow()
                            .is_ok_and(|w| w.is_enabled() && w.wants_keys())
                    })
            })
            .collect();

        let mut response = EventResponse::Ignored;
        for id in targets {
            if Self::deliver(tree, id, event, ctx) != EventResponse::Ignored {
                response = EventResponse::Handled;
            }
        }
        response
    }

    fn deliver(tree: &WidgetTree, id: NodeId, event: &Event, ctx: &mut EventCtx) -> EventResponse {
        let Some(node) = tree.get(id) else {
            return EventResponse::Ignored;
        };
        let Some(widget) = node.widget() else {
            return EventResponse::Ignored;
        };
        let response = match widget.try_borrow_mut() {
            Ok(mut w) => w.event(event, ctx),
            Err(_) => {
                log::warn!("widget {:?} is busy, dropping {:?}", node.key(), event);
                EventResponse::Ignored
            }
        };
        response
    }

    fn set_focus(&mut self, focus: FocusState) {
        if self.focus != focus {
            log::trace!("focus {:?} -> {:?}", self.focus, focus);
            self.focus = focus;
        }
    }

    /// Drop focus if the focused node is among `removed`.
    pub fn forget(&mut self, removed: &[NodeId]) {
        if let FocusState::Focused(id) = self.focus {
            if removed.contains(&id) {
                log::debug!("focused node {:?} removed, clearing focus", id);
                self.set_focus(FocusState::Unfocused);
            }
        }
    }

    /// Drop focus if the focused node no longer exists.
    pub fn validate(&mut self, tree: &WidgetTree) {
        if let FocusState::Focused(id) = self.focus {
            if !tree.contains(id) {
                self.set_focus(FocusState::Unfocused);
            }
        }
    }

    pub fn clear(&mut self) {
        self.focus = FocusState::Unfocused;
        self.pointer = None;
    }
}
