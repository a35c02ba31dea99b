//! Retained-mode scene graph for on-screen canvases.
//!
//! A [`Canvas`] mirrors the widget tree of one surface, packs every widget's
//! geometry into a pair of shared vertex/index buffers, tracks what needs
//! re-uploading, orders nodes for drawing by z-order band and routes pointer
//! and keyboard input to the focused node.
//!
//! Widgets stay owned by the widget layer. They implement [`Widget`] and
//! report structural changes through [`Notification`]s, either directly on
//! the canvas or from inside a callback via [`EventCtx`].

pub mod canvas;
pub mod dirty;
pub mod error;
pub mod geometry;
pub mod input;
pub mod notification;
pub mod render_stats;
pub mod tree;
pub mod widgets;
pub mod zorder;

#[cfg(feature = "gpu")]
pub mod gpu;

#[cfg(test)]
mod test_support;

pub use canvas::{Canvas, CanvasConfig, DrawDispatcher, DrawItem};
pub use dirty::DirtyFlags;
pub use error::{CanvasError, Result};
pub use geometry::{GeometryRegion, GeometrySize, Vertex};
pub use input::{FocusState, InputEvent};
pub use notification::{EventCtx, Notification};
pub use render_stats::FrameStats;
pub use tree::{NodeId, WidgetNode, WidgetTree};
pub use widgets::{Widget, WidgetKey, WidgetRef};
pub use zorder::{ZMode, ZOrder};

pub mod prelude {
    pub use crate::canvas::{Canvas, CanvasConfig, DrawDispatcher, DrawItem};
    pub use crate::dirty::DirtyFlags;
    pub use crate::error::{CanvasError, Result};
    pub use crate::geometry::{GeometryRegion, GeometrySize, Vertex};
    pub use crate::input::{FocusState, InputEvent};
    pub use crate::notification::{EventCtx, Notification};
    pub use crate::widgets::{
        Event, EventResponse, Key, MaterialTag, Modifiers, MouseButton, Rect, Widget, WidgetKey,
        WidgetRef,
    };
    pub use crate::zorder::{ZMode, ZOrder};
}
