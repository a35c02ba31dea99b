//! Mock widget shared by the unit tests.

use std::cell::RefCell;
use std::rc::Rc;

use crate::geometry::{GeometrySize, Vertex};
use crate::notification::EventCtx;
use crate::widgets::{Event, EventResponse, MaterialTag, Rect, Widget, WidgetKey, WidgetRef};
use crate::zorder::ZOrder;

pub(crate) struct MockWidget {
    pub key: WidgetKey,
    pub children: Vec<WidgetRef>,
    pub z: ZOrder,
    pub geometry: Option<GeometrySize>,
    pub material: Option<MaterialTag>,
    pub bounds: Rect,
    pub focusable: bool,
    pub enabled: bool,
    pub visible: bool,
    pub wants_keys: bool,
    pub leave_response: EventResponse,
    pub detach_on_click: bool,
    pub animating: bool,
    pub events: Vec<Event>,
    pub ticks: u32,
}

impl MockWidget {
    fn new(geometry: Option<GeometrySize>) -> Self {
        Self {
            key: WidgetKey::next(),
            children: Vec::new(),
            z: ZOrder::default(),
            geometry,
            material: None,
            bounds: Rect::default(),
            focusable: false,
            enabled: true,
            visible: true,
            wants_keys: false,
            leave_response: EventResponse::Handled,
            detach_on_click: false,
            animating: false,
            events: Vec::new(),
            ticks: 0,
        }
    }

    /// Non-drawable layout container
    pub fn container() -> Self {
        Self::new(None)
    }

    pub fn quads(count: usize) -> Self {
        Self::new(Some(GeometrySize::quads(count)))
    }

    pub fn with_child(mut self, child: WidgetRef) -> Self {
        self.children.push(child);
        self
    }

    pub fn z(mut self, z: ZOrder) -> Self {
        self.z = z;
        self
    }

    pub fn bounds(mut self, bounds: Rect) -> Self {
        self.bounds = bounds;
        self
    }

    pub fn focusable(mut self) -> Self {
        self.focusable = true;
        self
    }

    pub fn wants_keys(mut self) -> Self {
        self.wants_keys = true;
        self
    }

    pub fn into_shared(self) -> Rc<RefCell<MockWidget>> {
        Rc::new(RefCell::new(self))
    }

    pub fn into_ref(self) -> WidgetRef {
        self.into_shared()
    }
}

impl Widget for MockWidget {
    fn key(&self) -> WidgetKey {
        self.key
    }

    fn children(&self) -> Vec<WidgetRef> {
        self.children.clone()
    }

    fn z_order(&self) -> ZOrder {
        self.z
    }

    fn material(&self) -> Option<MaterialTag> {
        self.material
    }

    fn bounds(&self) -> Rect {
        self.bounds
    }

    fn is_visible(&self) -> bool {
        self.visible
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn is_focusable(&self) -> bool {
        self.focusable
    }

    fn wants_keys(&self) -> bool {
        self.wants_keys
    }

    fn geometry(&self) -> Option<GeometrySize> {
        self.geometry
    }

    fn vertex_data(&self) -> Vec<Vertex> {
        let count = self.geometry.map(|g| g.vertices).unwrap_or(0);
        let shade = (self.key.as_u64() % 255) as f32 / 255.0;
        (0..count)
            .map(|i| Vertex::new([i as f32, shade], [shade, shade, shade, 1.0]))
            .collect()
    }

    fn index_data(&self) -> Vec<u32> {
        const QUAD: [u32; 6] = [0, 1, 2, 2, 3, 0];
        let count = self.geometry.map(|g| g.indices).unwrap_or(0);
        (0..count)
            .map(|i| (i / 6) as u32 * 4 + QUAD[i % 6])
            .collect()
    }

    fn tick(&mut self, _dt: f32, _ctx: &mut EventCtx) -> bool {
        self.ticks += 1;
        self.animating
    }

    fn event(&mut self, event: &Event, ctx: &mut EventCtx) -> EventResponse {
        self.events.push(event.clone());
        match event {
            Event::Leave { .. } => self.leave_response,
            Event::MouseDown { .. } if self.detach_on_click => {
                ctx.detach(self.key);
                EventResponse::Handled
            }
            _ => EventResponse::Handled,
        }
    }
}
