#![allow(dead_code)]

use std::cell::RefCell;
use std::ops::Range;
use std::rc::Rc;

use canvas_scene::prelude::*;

pub type Shared = Rc<RefCell<Quad>>;

/// Minimal widget drawing `count` quads inside `bounds`.
pub struct Quad {
    pub key: WidgetKey,
    pub count: usize,
    pub bounds: Rect,
    pub z: ZOrder,
    pub children: Vec<WidgetRef>,
    pub focusable: bool,
    pub detach_on_click: bool,
    pub events: Vec<Event>,
}

impl Quad {
    pub fn new(count: usize) -> Self {
        Self {
            key: WidgetKey::next(),
            count,
            bounds: Rect::default(),
            z: ZOrder::default(),
            children: Vec::new(),
            focusable: false,
            detach_on_click: false,
            events: Vec::new(),
        }
    }

    pub fn at(mut self, bounds: Rect) -> Self {
        self.bounds = bounds;
        self.focusable = true;
        self
    }

    pub fn z(mut self, z: ZOrder) -> Self {
        self.z = z;
        self
    }

    pub fn shared(self) -> Shared {
        Rc::new(RefCell::new(self))
    }
}

impl Widget for Quad {
    fn key(&self) -> WidgetKey {
        self.key
    }

    fn bounds(&self) -> Rect {
        self.bounds
    }

    fn children(&self) -> Vec<WidgetRef> {
        self.children.clone()
    }

    fn z_order(&self) -> ZOrder {
        self.z
    }

    fn is_focusable(&self) -> bool {
        self.focusable
    }

    fn geometry(&self) -> Option<GeometrySize> {
        (self.count > 0).then(|| GeometrySize::quads(self.count))
    }

    fn vertex_data(&self) -> Vec<Vertex> {
        let Rect {
            x,
            y,
            width,
            height,
        } = self.bounds;
        let color = [1.0, 1.0, 1.0, 1.0];
        (0..self.count)
            .flat_map(|_| {
                [
                    Vertex::new([x, y], color),
                    Vertex::new([x + width, y], color),
                    Vertex::new([x + width, y + height], color),
                    Vertex::new([x, y + height], color),
                ]
            })
            .collect()
    }

    fn index_data(&self) -> Vec<u32> {
        (0..self.count as u32)
            .flat_map(|quad| {
                let base = quad * 4;
                [base, base + 1, base + 2, base + 2, base + 3, base]
            })
            .collect()
    }

    fn event(&mut self, event: &Event, ctx: &mut EventCtx) -> EventResponse {
        self.events.push(event.clone());
        if self.detach_on_click && matches!(event, Event::MouseDown { .. }) {
            ctx.detach(self.key);
        }
        EventResponse::Handled
    }
}

pub fn widget_ref(widget: &Shared) -> WidgetRef {
    widget.clone()
}

pub fn key(widget: &Shared) -> WidgetKey {
    widget.borrow().key
}

/// Dispatcher that only records what it was asked to do.
#[derive(Default)]
pub struct Recorder {
    pub drawn: Vec<DrawItem>,
    pub vertex_uploads: Vec<Range<usize>>,
    pub index_uploads: Vec<Range<usize>>,
}

impl DrawDispatcher for Recorder {
    fn upload_vertices(&mut self, range: Range<usize>, _data: &[Vertex]) {
        self.vertex_uploads.push(range);
    }

    fn upload_indices(&mut self, range: Range<usize>, _data: &[u32]) {
        self.index_uploads.push(range);
    }

    fn draw(&mut self, item: &DrawItem) {
        self.drawn.push(*item);
    }
}

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
