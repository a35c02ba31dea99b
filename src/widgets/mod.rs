pub mod widget;

pub use widget::{
    Event, EventResponse, Key, MaterialTag, Modifiers, MouseButton, Rect, Widget, WidgetKey,
    WidgetRef,
};
