//! Pin/unpin buffer pool with a pluggable page-replacement strategy
//! (spec §4.2 Buffer Manager).

#[cfg(test)]
mod tests;

pub mod strategy;

pub use strategy::{ClockStrategy, LfuStrategy, LruKStrategy, LruStrategy, ReplacementStrategy};

use std::path::Path;

use common::{BeeDbError, BeeDbResult, PageId, ReplacementStrategyKind};
use storage::{PagedFile, PAGE_SIZE};

/// A resident page: its id (`None` for a never-used frame), bytes, pin
/// count, and dirty flag.
#[derive(Debug)]
pub struct Frame {
    pub page_id: Option<PageId>,
    pub data: Box<[u8; PAGE_SIZE]>,
    pub pin_count: u32,
    pub dirty: bool,
}

impl Frame {
    fn empty() -> Self {
        Self {
            page_id: None,
            data: Box::new([0u8; PAGE_SIZE]),
            pin_count: 0,
            dirty: false,
        }
    }

    pub fn is_pinned(&self) -> bool {
        self.pin_count > 0
    }
}

/// Caches up to `N` pages of a single paged file in memory, delegating
/// victim selection to a [`ReplacementStrategy`].
pub struct BufferPool {
    file: PagedFile,
    frames: Vec<Frame>,
    strategy: Box<dyn ReplacementStrategy>,
    pin_sequence: u64,
    evicted_frames: u64,
}

impl BufferPool {
    pub fn open(path: &Path, num_frames: usize, kind: ReplacementStrategyKind) -> BeeDbResult<Self> {
        Self::with_strategy(path, num_frames, make_strategy(kind, num_frames))
    }

    pub fn with_strategy(
        path: &Path,
        num_frames: usize,
        strategy: Box<dyn ReplacementStrategy>,
    ) -> BeeDbResult<Self> {
        if num_frames == 0 {
            return Err(BeeDbError::InvariantViolation(
                "buffer pool requires at least one frame".into(),
            ));
        }
        let file = PagedFile::open(path)?;
        let frames = (0..num_frames).map(|_| Frame::empty()).collect();
        Ok(Self {
            file,
            frames,
            strategy,
            pin_sequence: 0,
            evicted_frames: 0,
        })
    }

    pub fn allocate_page(&mut self) -> BeeDbResult<PageId> {
        self.file.allocate_page()
    }

    /// Pin `page_id`, returning the frame index it now occupies.
    pub fn pin(&mut self, page_id: PageId) -> BeeDbResult<usize> {
        if let Some(idx) = self.frames.iter().position(|f| f.page_id == Some(page_id)) {
            self.frames[idx].pin_count += 1;
            self.pin_sequence += 1;
            self.strategy.on_pin(idx, self.pin_sequence);
            return Ok(idx);
        }

        let frame_idx = match self.frames.iter().position(|f| f.page_id.is_none()) {
            Some(idx) => idx,
            None => self.evict_one()?,
        };

        let mut buf = [0u8; PAGE_SIZE];
        self.file.read(page_id, &mut buf)?;
        let frame = &mut self.frames[frame_idx];
        *frame.data = buf;
        frame.page_id = Some(page_id);
        frame.pin_count = 1;
        frame.dirty = false;

        self.pin_sequence += 1;
        self.strategy.on_pin(frame_idx, self.pin_sequence);
        self.evicted_frames += 1;
        Ok(frame_idx)
    }

    fn evict_one(&mut self) -> BeeDbResult<usize> {
        // Clock inspects one candidate per call; give the strategy enough
        // attempts to sweep the whole pool before declaring failure.
        for _ in 0..=self.frames.len() {
            if let Some(idx) = self.strategy.find_victim(&self.frames) {
                let frame = &mut self.frames[idx];
                if frame.is_pinned() {
                    continue;
                }
                if frame.dirty {
                    if let Some(victim_id) = frame.page_id {
                        self.file.write(victim_id, &frame.data)?;
                    }
                }
                frame.page_id = None;
                frame.dirty = false;
                return Ok(idx);
            }
        }
        Err(BeeDbError::NoFreeFrame)
    }

    pub fn unpin(&mut self, page_id: PageId, dirty: bool) -> BeeDbResult<()> {
        let frame = self
            .frames
            .iter_mut()
            .find(|f| f.page_id == Some(page_id))
            .ok_or_else(|| {
                BeeDbError::InvariantViolation(format!("unpin of non-resident page {page_id:?}"))
            })?;
        if frame.pin_count == 0 {
            return Err(BeeDbError::InvariantViolation(format!(
                "unpin of already-unpinned page {page_id:?}"
            )));
        }
        frame.pin_count -= 1;
        frame.dirty |= dirty;
        Ok(())
    }

    pub fn frame(&self, frame_idx: usize) -> &Frame {
        &self.frames[frame_idx]
    }

    pub fn frame_mut(&mut self, frame_idx: usize) -> &mut Frame {
        &mut self.frames[frame_idx]
    }

    pub fn flush(&mut self) -> BeeDbResult<()> {
        for frame in &mut self.frames {
            if frame.dirty {
                if let Some(id) = frame.page_id {
                    self.file.write(id, &frame.data)?;
                }
                frame.dirty = false;
            }
        }
        Ok(())
    }

    pub fn evicted_frames(&self) -> u64 {
        self.evicted_frames
    }

    pub fn page_count(&self) -> u32 {
        self.file.page_count()
    }
}

fn make_strategy(kind: ReplacementStrategyKind, num_frames: usize) -> Box<dyn ReplacementStrategy> {
    match kind {
        ReplacementStrategyKind::Clock => Box::new(ClockStrategy::new(num_frames)),
        ReplacementStrategyKind::Lru => Box::new(LruStrategy::new(num_frames)),
        ReplacementStrategyKind::LruK => Box::new(LruKStrategy::new(num_frames, 2)),
        ReplacementStrategyKind::Lfu => Box::new(LfuStrategy::new(num_frames)),
    }
}
