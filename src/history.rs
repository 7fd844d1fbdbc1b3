// ============================================================================
// HISTORY — records the undo layer needs from selection transforms
// ============================================================================
//
// This crate does not implement undo; it produces the data for it.
// `HistoryLog` is a bounded in-memory sink for hosts and tests.

use std::collections::VecDeque;

use image::RgbaImage;

use crate::document::LayerStore;
use crate::geometry::PixelRect;
use crate::selection::TransformSnapshot;

// ----------------------------------------------------------------------------
//  Pixel patch
// ----------------------------------------------------------------------------

/// A rectangular copy of layer pixels.
#[derive(Clone, Debug, PartialEq)]
pub struct PixelPatch {
    /// Layer-space rect, already clipped to the layer.
    pub rect: PixelRect,
    pub pixels: RgbaImage,
}

impl PixelPatch {
    /// Copy `rect` (clipped to the layer) out of `layer`.
    pub fn capture(layer: &dyn LayerStore, rect: PixelRect) -> Self {
        match rect.clamp_to_surface(layer.width(), layer.height()) {
            Some(r) => Self { rect: r, pixels: layer.read_region(r) },
            None => Self { rect: PixelRect::new(rect.x, rect.y, 0, 0), pixels: RgbaImage::new(0, 0) },
        }
    }

    pub fn apply(&self, layer: &mut dyn LayerStore) {
        if self.is_empty() {
            return;
        }
        layer.write_region(self.rect.x, self.rect.y, &self.pixels);
    }

    pub fn is_empty(&self) -> bool {
        self.pixels.width() == 0 || self.pixels.height() == 0
    }

    pub fn memory_size(&self) -> usize {
        self.pixels.as_raw().len()
    }
}

// ----------------------------------------------------------------------------
//  Records
// ----------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq)]
pub enum HistoryRecord {
    /// A completed transform gesture on the floating buffer.
    Transform {
        description: String,
        before: TransformSnapshot,
        after: TransformSnapshot,
    },
    /// Layer pixels changed by lift, commit or cancel.
    Pixels {
        description: String,
        before: PixelPatch,
        after: PixelPatch,
    },
}

impl HistoryRecord {
    pub fn description(&self) -> &str {
        match self {
            HistoryRecord::Transform { description, .. } | HistoryRecord::Pixels { description, .. } => {
                description
            }
        }
    }

    pub fn memory_size(&self) -> usize {
        match self {
            HistoryRecord::Transform { before, after, .. } => before.memory_size() + after.memory_size(),
            HistoryRecord::Pixels { before, after, .. } => before.memory_size() + after.memory_size(),
        }
    }
}

/// Where finished records go.
pub trait HistorySink {
    fn record(&mut self, record: HistoryRecord);
}

/// Discards everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullHistory;

impl HistorySink for NullHistory {
    fn record(&mut self, _record: HistoryRecord) {}
}

// ----------------------------------------------------------------------------
//  Bounded log
// ----------------------------------------------------------------------------

/// Keeps the most recent records within a count and a byte budget.
#[derive(Debug)]
pub struct HistoryLog {
    records: VecDeque<HistoryRecord>,
    max_records: usize,
    max_memory_bytes: Option<usize>,
    total_memory: usize,
}

impl Default for HistoryLog {
    fn default() -> Self {
        Self::new(50)
    }
}

impl HistoryLog {
    pub fn new(max_records: usize) -> Self {
        Self {
            records: VecDeque::new(),
            max_records: max_records.max(1),
            max_memory_bytes: Some(100 * 1024 * 1024),
            total_memory: 0,
        }
    }

    pub fn with_memory_limit(mut self, bytes: Option<usize>) -> Self {
        self.max_memory_bytes = bytes;
        self.prune();
        self
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn last(&self) -> Option<&HistoryRecord> {
        self.records.back()
    }

    pub fn iter(&self) -> impl Iterator<Item = &HistoryRecord> {
        self.records.iter()
    }

    /// Descriptions, most recent first.
    pub fn descriptions(&self) -> Vec<&str> {
        self.records.iter().rev().map(|r| r.description()).collect()
    }

    pub fn memory_usage(&self) -> usize {
        self.total_memory
    }

    pub fn pop(&mut self) -> Option<HistoryRecord> {
        let r = self.records.pop_back()?;
        self.total_memory = self.total_memory.saturating_sub(r.memory_size());
        Some(r)
    }

    pub fn clear(&mut self) {
        self.records.clear();
        self.total_memory = 0;
    }

    fn prune(&mut self) {
        while self.records.len() > self.max_records {
            if let Some(r) = self.records.pop_front() {
                self.total_memory = self.total_memory.saturating_sub(r.memory_size());
            }
        }
        if let Some(max) = self.max_memory_bytes {
            // The newest record always survives, however large.
            while self.total_memory > max && self.records.len() > 1 {
                if let Some(r) = self.records.pop_front() {
                    self.total_memory = self.total_memory.saturating_sub(r.memory_size());
                }
            }
        }
    }
}

impl HistorySink for HistoryLog {
    fn record(&mut self, record: HistoryRecord) {
        self.total_memory += record.memory_size();
        self.records.push_back(record);
        self.prune();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::RasterLayer;
    use image::Rgba;
    use pretty_assertions::assert_eq;

    fn patch_record(n: u32) -> HistoryRecord {
        let p = PixelPatch { rect: PixelRect::new(0, 0, n as i32, 1), pixels: RgbaImage::new(n, 1) };
        HistoryRecord::Pixels { description: format!("patch {n}"), before: p.clone(), after: p }
    }

    #[test]
    fn patch_capture_clips_and_restores() {
        let mut layer = RasterLayer::from_image(RgbaImage::from_pixel(4, 4, Rgba([1, 2, 3, 255])));
        let patch = PixelPatch::capture(&layer, PixelRect::new(-2, 2, 4, 4));
        assert_eq!(patch.rect, PixelRect::new(0, 2, 2, 2));

        layer.write_region(0, 0, &RgbaImage::new(4, 4));
        patch.apply(&mut layer);
        assert_eq!(*layer.pixels.get_pixel(1, 3), Rgba([1, 2, 3, 255]));
        assert_eq!(*layer.pixels.get_pixel(2, 3), Rgba([0, 0, 0, 0]));

        let outside = PixelPatch::capture(&layer, PixelRect::new(9, 9, 2, 2));
        assert!(outside.is_empty());
    }

    #[test]
    fn log_is_bounded_by_count() {
        let mut log = HistoryLog::new(2);
        for n in 1..=3 {
            log.record(patch_record(n));
        }
        assert_eq!(log.descriptions(), vec!["patch 3", "patch 2"]);
        assert_eq!(log.memory_usage(), (3 + 2) * 4 * 2);
    }

    #[test]
    fn log_is_bounded_by_memory_but_keeps_newest() {
        let mut log = HistoryLog::new(10).with_memory_limit(Some(40));
        log.record(patch_record(2));
        log.record(patch_record(2));
        assert_eq!(log.len(), 2);
        log.record(patch_record(100));
        assert_eq!(log.len(), 1);
        assert_eq!(log.last().map(|r| r.description()), Some("patch 100"));
        assert!(log.pop().is_some());
        assert_eq!(log.memory_usage(), 0);
    }
}
