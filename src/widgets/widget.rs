use std::cell::RefCell;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::geometry::{GeometrySize, Vertex};
use crate::notification::EventCtx;
use crate::zorder::ZOrder;

/// Shared handle to a live widget.
///
/// The widget layer owns widgets through these handles; the canvas only ever
/// keeps a `Weak` to them.
pub type WidgetRef = Rc<RefCell<dyn Widget>>;

/// Stable identity of a widget, slot or content object.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, PartialOrd, Ord)]
pub struct WidgetKey(u64);

static NEXT_KEY: AtomicU64 = AtomicU64::new(1);

impl WidgetKey {
    /// Hand out a process-unique key.
    pub fn next() -> Self {
        Self(NEXT_KEY.fetch_add(1, Ordering::Relaxed))
    }

    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

/// Material or style tag forwarded untouched to the draw dispatcher.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct MaterialTag(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn contains(&self, x: f32, y: f32) -> bool {
        x >= self.x && x < self.x + self.width && y >= self.y && y < self.y + self.height
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

/// Keyboard modifier state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modifiers {
    pub ctrl: bool,
    pub alt: bool,
    pub shift: bool,
    pub logo: bool,
}

/// Named keys for special keyboard keys
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Backspace,
    Delete,
    Enter,
    Tab,
    Escape,
    Left,
    Right,
    Up,
    Down,
    Home,
    End,
    /// Character input (includes A-Z for Ctrl+A shortcuts)
    Char(char),
}

/// Event delivered to a widget by the input router.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// Pointer moved onto the widget and the widget became focused
    Enter { x: f32, y: f32 },
    /// Pointer left the widget (or was covered by a nearer widget).
    /// Answer with [`EventResponse::KeepFocus`] to stay focused, e.g. during a drag.
    Leave { x: f32, y: f32 },
    /// Pointer moved while the widget is focused
    Move { x: f32, y: f32 },
    MouseDown { x: f32, y: f32, button: MouseButton },
    MouseUp { x: f32, y: f32, button: MouseButton },
    Wheel {
        x: f32,
        y: f32,
        /// Horizontal delta in pixels (positive = right)
        delta_x: f32,
        /// Vertical delta in pixels (positive = down)
        delta_y: f32,
    },
    KeyDown { key: Key, modifiers: Modifiers },
    KeyUp { key: Key, modifiers: Modifiers },
}

impl Event {
    /// Get the coordinates from this event, if any
    pub fn coords(&self) -> Option<(f32, f32)> {
        match self {
            Event::Enter { x, y }
            | Event::Leave { x, y }
            | Event::Move { x, y }
            | Event::MouseDown { x, y, .. }
            | Event::MouseUp { x, y, .. }
            | Event::Wheel { x, y, .. } => Some((*x, *y)),
            Event::KeyDown { .. } | Event::KeyUp { .. } => None,
        }
    }
}

/// Signal returned from widget callbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventResponse {
    /// The widget declined the event
    Ignored,
    Handled,
    /// Only meaningful for [`Event::Leave`]: keep focus although the pointer left
    KeepFocus,
}

/// The widget-layer object mirrored by one canvas node.
///
/// Layout has already happened by the time the canvas asks for bounds or
/// geometry; the canvas never sizes or positions anything.
pub trait Widget {
    fn key(&self) -> WidgetKey;

    /// Slots and content currently owned by this widget, in insertion order.
    /// Used only when a subtree is first mirrored into the canvas.
    fn children(&self) -> Vec<WidgetRef> {
        Vec::new()
    }

    fn z_order(&self) -> ZOrder {
        ZOrder::default()
    }

    fn material(&self) -> Option<MaterialTag> {
        None
    }

    /// Laid-out bounds in surface coordinates, used for hit-testing.
    fn bounds(&self) -> Rect;

    fn is_visible(&self) -> bool {
        true
    }

    fn is_enabled(&self) -> bool {
        true
    }

    fn is_focusable(&self) -> bool {
        false
    }

    /// Whether the widget wants key events regardless of pointer focus.
    fn wants_keys(&self) -> bool {
        false
    }

    /// Buffer space this widget draws into. `None` for pure layout containers,
    /// which still get a placeholder region.
    fn geometry(&self) -> Option<GeometrySize> {
        None
    }

    fn has_drawable_geometry(&self) -> bool {
        self.geometry().is_some()
    }

    /// Vertex data for the widget's region. Only queried while vertex-dirty.
    fn vertex_data(&self) -> Vec<Vertex> {
        Vec::new()
    }

    /// Index data, local to the widget's own vertices. Only queried while index-dirty.
    fn index_data(&self) -> Vec<u32> {
        Vec::new()
    }

    /// Advance animations. Returns true if another frame is needed.
    fn tick(&mut self, dt: f32, ctx: &mut EventCtx) -> bool {
        let _ = (dt, ctx);
        false
    }

    fn event(&mut self, event: &Event, ctx: &mut EventCtx) -> EventResponse {
        let _ = (event, ctx);
        EventResponse::Ignored
    }
}
