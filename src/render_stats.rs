//! Per-frame draw statistics.
//!
//! [`Canvas::draw`](crate::Canvas::draw) returns one [`FrameStats`] per frame
//! and accumulates the totals on the canvas, which makes it easy to check
//! that clean frames really skip every upload.

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FrameStats {
    pub frames: u64,
    /// Live nodes walked in draw order
    pub nodes_visited: u64,
    /// Draw calls issued
    pub nodes_drawn: u64,
    pub vertex_uploads: u64,
    pub index_uploads: u64,
    /// Nodes that were already clean
    pub clean_skips: u64,
}

impl FrameStats {
    pub fn accumulate(&mut self, frame: &FrameStats) {
        self.frames += frame.frames;
        self.nodes_visited += frame.nodes_visited;
        self.nodes_drawn += frame.nodes_drawn;
        self.vertex_uploads += frame.vertex_uploads;
        self.index_uploads += frame.index_uploads;
        self.clean_skips += frame.clean_skips;
    }

    /// Share of visited nodes that needed no upload, in percent.
    pub fn clean_rate(&self) -> f64 {
        if self.nodes_visited == 0 {
            return 0.0;
        }
        (self.clean_skips as f64 / self.nodes_visited as f64) * 100.0
    }
}
