mod common;

use canvas_scene::prelude::*;
use common::{key, widget_ref, Quad, Recorder, Shared};
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    Attach(usize),
    AddChild { parent: usize, quads: usize },
    Detach(usize),
    RemoveFromParent(usize),
    Resize { target: usize, quads: usize },
    Reorder { target: usize, z: i32 },
    Draw,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0usize..4).prop_map(Op::Attach),
        (any::<usize>(), 0usize..4).prop_map(|(parent, quads)| Op::AddChild { parent, quads }),
        any::<usize>().prop_map(Op::Detach),
        any::<usize>().prop_map(Op::RemoveFromParent),
        (any::<usize>(), 0usize..4).prop_map(|(target, quads)| Op::Resize { target, quads }),
        (any::<usize>(), -3i32..3).prop_map(|(target, z)| Op::Reorder { target, z }),
        Just(Op::Draw),
    ]
}

/// Widgets ever created; keeping them alive keeps their nodes from being pruned.
struct Scene {
    canvas: Canvas,
    pool: Vec<Shared>,
}

impl Scene {
    fn new() -> Self {
        Self {
            canvas: Canvas::default(),
            pool: Vec::new(),
        }
    }

    fn pick(&self, index: usize) -> Option<&Shared> {
        if self.pool.is_empty() {
            None
        } else {
            self.pool.get(index % self.pool.len())
        }
    }

    fn apply(&mut self, op: &Op) {
        match *op {
            Op::Attach(quads) => {
                let widget = Quad::new(quads).shared();
                self.canvas.attach(&widget_ref(&widget)).unwrap();
                self.pool.push(widget);
            }
            Op::AddChild { parent, quads } => {
                let Some(parent) = self.pick(parent).map(key) else {
                    return;
                };
                let widget = Quad::new(quads).shared();
                self.canvas.slot_added(parent, &widget_ref(&widget)).unwrap();
                self.pool.push(widget);
            }
            Op::Detach(target) => {
                if let Some(target) = self.pick(target).map(key) {
                    self.canvas.detach(target).unwrap();
                }
            }
            Op::RemoveFromParent(target) => {
                let Some(target) = self.pick(target).map(key) else {
                    return;
                };
                let parent = self
                    .canvas
                    .lookup(target)
                    .and_then(|node| node.parent())
                    .and_then(|id| self.canvas.tree().get(id))
                    .map(|node| node.key());
                if let Some(parent) = parent {
                    self.canvas.slot_removed(parent, target).unwrap();
                }
            }
            Op::Resize { target, quads } => {
                let Some(widget) = self.pick(target).cloned() else {
                    return;
                };
                widget.borrow_mut().count = quads;
                self.canvas.content_changed(key(&widget)).unwrap();
            }
            Op::Reorder { target, z } => {
                let Some(widget) = self.pick(target).cloned() else {
                    return;
                };
                widget.borrow_mut().z = ZOrder::in_order(z);
                self.canvas
                    .z_order_changed(key(&widget), ZOrder::in_order(z))
                    .unwrap();
            }
            Op::Draw => {
                self.canvas.draw(&mut Recorder::default()).unwrap();
            }
        }
    }
}

fn regions(canvas: &Canvas) -> Vec<(WidgetKey, GeometryRegion)> {
    canvas
        .draw_sequence()
        .iter()
        .map(|item| (item.key, item.region))
        .collect()
}

proptest! {
    #[test]
    fn cursor_matches_live_footprint(ops in prop::collection::vec(op(), 1..40)) {
        let mut scene = Scene::new();
        for op in &ops {
            scene.apply(op);

            let expected = scene.canvas.tree().iter().fold(GeometrySize::default(), |acc, node| {
                let size = node.geometry().unwrap_or(GeometrySize::PLACEHOLDER);
                GeometrySize::new(acc.vertices + size.vertices, acc.indices + size.indices)
            });
            prop_assert_eq!(scene.canvas.used(), expected);
        }
    }

    #[test]
    fn regions_never_overlap(ops in prop::collection::vec(op(), 1..40)) {
        let mut scene = Scene::new();
        for op in &ops {
            scene.apply(op);
        }

        let all = regions(&scene.canvas);
        for (i, (_, a)) in all.iter().enumerate() {
            for (_, b) in &all[i + 1..] {
                prop_assert!(!a.overlaps(b), "{:?} overlaps {:?}", a, b);
            }
        }
        // Draw order is allocation order
        for pair in all.windows(2) {
            prop_assert!(pair[0].1.vertex_offset < pair[1].1.vertex_offset);
        }
    }

    #[test]
    fn identity_index_matches_tree(ops in prop::collection::vec(op(), 1..40)) {
        let mut scene = Scene::new();
        for op in &ops {
            scene.apply(op);
        }

        let tree = scene.canvas.tree();
        for node in tree.iter() {
            prop_assert_eq!(tree.lookup(node.key()), Some(node.id()));
            if let Some(parent) = node.parent() {
                let siblings = tree.get(parent).map(|p| p.children().to_vec()).unwrap_or_default();
                prop_assert!(siblings.contains(&node.id()));
            }
        }
        prop_assert_eq!(scene.canvas.draw_order().len(), tree.len());
    }

    #[test]
    fn recompute_is_idempotent(ops in prop::collection::vec(op(), 1..40)) {
        let mut scene = Scene::new();
        for op in &ops {
            scene.apply(op);
        }
        scene.canvas.draw(&mut Recorder::default()).unwrap();

        let before = regions(&scene.canvas);
        scene.canvas.recompute().unwrap();
        prop_assert_eq!(regions(&scene.canvas), before);
        prop_assert!(scene.canvas.draw_sequence().iter().all(|item| item.dirty.is_empty()));
    }

    #[test]
    fn in_order_keys_sort_siblings(keys in prop::collection::vec(-50i32..50, 1..12)) {
        let parent = Quad::new(0).shared();
        let children: Vec<Shared> = keys
            .iter()
            .map(|&z| Quad::new(1).z(ZOrder::in_order(z)).shared())
            .collect();
        parent.borrow_mut().children = children.iter().map(widget_ref).collect();

        let mut canvas = Canvas::default();
        canvas.attach(&widget_ref(&parent)).unwrap();

        let drawn: Vec<i32> = canvas
            .draw_sequence()
            .iter()
            .skip(1)
            .map(|item| {
                let index = children.iter().position(|c| key(c) == item.key).unwrap();
                keys[index]
            })
            .collect();
        let mut sorted = keys.clone();
        sorted.sort();
        prop_assert_eq!(drawn, sorted);
    }

    #[test]
    fn focus_follows_topmost_hit(
        rects in prop::collection::vec((0.0f32..80.0, 0.0f32..80.0, 5.0f32..40.0, 5.0f32..40.0), 1..8),
        moves in prop::collection::vec((0.0f32..120.0, 0.0f32..120.0, any::<bool>()), 1..20),
    ) {
        let widgets: Vec<Shared> = rects
            .iter()
            .map(|&(x, y, w, h)| Quad::new(1).at(Rect::new(x, y, w, h)).shared())
            .collect();
        let mut canvas = Canvas::default();
        for widget in &widgets {
            canvas.attach(&widget_ref(widget)).unwrap();
        }

        for &(x, y, click) in &moves {
            canvas.process_input(InputEvent::MouseMove { x, y }).unwrap();
            if click {
                canvas
                    .process_input(InputEvent::MouseDown { x, y, button: MouseButton::Left })
                    .unwrap();
            }

            // Later attachments draw on top
            let topmost = widgets
                .iter()
                .rev()
                .find(|w| w.borrow().bounds.contains(x, y))
                .map(key);
            prop_assert_eq!(canvas.focused_key(), topmost);
        }
    }
}
