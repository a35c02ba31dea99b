//! wgpu mirror of the canvas geometry.
//!
//! [`GpuGeometry`] owns one vertex and one index buffer sized like the
//! canvas' shared buffers. Used as the [`DrawDispatcher`] of
//! [`Canvas::draw`](crate::Canvas::draw) it writes only the dirty ranges to
//! the GPU and collects the frame's draw items, which [`GpuGeometry::record`]
//! then replays into a render pass.

use std::sync::Arc;

use wgpu::{Buffer, BufferUsages, Device, Queue, RenderPass};

use crate::canvas::{DrawDispatcher, DrawItem};
use crate::geometry::{GeometrySize, Vertex};
use crate::widgets::MaterialTag;

pub struct GpuGeometry {
    device: Arc<Device>,
    queue: Arc<Queue>,
    vertex_buffer: Buffer,
    index_buffer: Buffer,
    capacity: GeometrySize,
    draws: Vec<DrawItem>,
}

impl GpuGeometry {
    pub fn new(device: Arc<Device>, queue: Arc<Queue>, capacity: GeometrySize) -> Self {
        let (vertex_buffer, index_buffer) = create_buffers(&device, capacity);
        Self {
            device,
            queue,
            vertex_buffer,
            index_buffer,
            capacity,
            draws: Vec::new(),
        }
    }

    /// Recreate both buffers if `capacity` exceeds the current size.
    ///
    /// Returns true when the buffers were replaced; their contents are lost,
    /// so call [`Canvas::grow`](crate::Canvas::grow) with the same capacity to
    /// have every node re-uploaded.
    pub fn ensure_capacity(&mut self, capacity: GeometrySize) -> bool {
        if capacity.vertices <= self.capacity.vertices && capacity.indices <= self.capacity.indices
        {
            return false;
        }
        let capacity = GeometrySize::new(
            capacity.vertices.max(self.capacity.vertices),
            capacity.indices.max(self.capacity.indices),
        );
        log::info!(
            "reallocating GPU geometry for {} vertices / {} indices",
            capacity.vertices,
            capacity.indices
        );
        let (vertex_buffer, index_buffer) = create_buffers(&self.device, capacity);
        self.vertex_buffer = vertex_buffer;
        self.index_buffer = index_buffer;
        self.capacity = capacity;
        true
    }

    pub fn vertex_buffer(&self) -> &Buffer {
        &self.vertex_buffer
    }

    pub fn index_buffer(&self) -> &Buffer {
        &self.index_buffer
    }

    /// Draw items collected by the last [`Canvas::draw`](crate::Canvas::draw).
    pub fn draws(&self) -> &[DrawItem] {
        &self.draws
    }

    /// Replay the collected draws into `pass` and forget them.
    ///
    /// `bind_material` runs whenever the material changes between consecutive
    /// draws so the caller can switch pipelines or bind groups.
    pub fn record(
        &mut self,
        pass: &mut RenderPass<'_>,
        mut bind_material: impl FnMut(&mut RenderPass<'_>, Option<MaterialTag>),
    ) {
        if self.draws.is_empty() {
            return;
        }

        pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        pass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint32);

        let mut bound = None;
        for item in self.draws.drain(..) {
            if bound != Some(item.material) {
                bind_material(pass, item.material);
                bound = Some(item.material);
            }
            let range = item.region.index_range();
            pass.draw_indexed(
                range.start as u32..range.end as u32,
                item.region.vertex_offset as i32,
                0..1,
            );
        }
    }
}

impl DrawDispatcher for GpuGeometry {
    fn upload_vertices(&mut self, range: std::ops::Range<usize>, data: &[Vertex]) {
        if data.is_empty() {
            return;
        }
        let offset = (range.start * std::mem::size_of::<Vertex>()) as wgpu::BufferAddress;
        self.queue
            .write_buffer(&self.vertex_buffer, offset, bytemuck::cast_slice(data));
    }

    fn upload_indices(&mut self, range: std::ops::Range<usize>, data: &[u32]) {
        if data.is_empty() {
            return;
        }
        let offset = (range.start * std::mem::size_of::<u32>()) as wgpu::BufferAddress;
        self.queue
            .write_buffer(&self.index_buffer, offset, bytemuck::cast_slice(data));
    }

    fn draw(&mut self, item: &DrawItem) {
        self.draws.push(*item);
    }
}

fn create_buffers(device: &Device, capacity: GeometrySize) -> (Buffer, Buffer) {
    let vertex_buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Canvas Vertex Buffer"),
        size: (capacity.vertices * std::mem::size_of::<Vertex>()) as u64,
        usage: BufferUsages::VERTEX | BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });
    let index_buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Canvas Index Buffer"),
        size: (capacity.indices * std::mem::size_of::<u32>()) as u64,
        usage: BufferUsages::INDEX | BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });
    (vertex_buffer, index_buffer)
}
