use super::*;
use common::ReplacementStrategyKind;
use tempfile::tempdir;

fn pool(dir: &std::path::Path, frames: usize) -> BufferPool {
    BufferPool::open(&dir.join("t.db"), frames, ReplacementStrategyKind::Lru).unwrap()
}

#[test]
fn allocate_and_pin_persist_pages() {
    let dir = tempdir().unwrap();
    let mut pool = pool(dir.path(), 2);

    let pid = pool.allocate_page().unwrap();
    let idx = pool.pin(pid).unwrap();
    pool.frame_mut(idx).data[0..4].copy_from_slice(&[1, 2, 3, 4]);
    pool.unpin(pid, true).unwrap();
    pool.flush().unwrap();

    let mut pool2 = pool_reopen(dir.path(), 2);
    let idx2 = pool2.pin(pid).unwrap();
    assert_eq!(&pool2.frame(idx2).data[0..4], &[1, 2, 3, 4]);
}

fn pool_reopen(dir: &std::path::Path, frames: usize) -> BufferPool {
    BufferPool::open(&dir.join("t.db"), frames, ReplacementStrategyKind::Lru).unwrap()
}

#[test]
fn sequential_page_ids() {
    let dir = tempdir().unwrap();
    let mut pool = pool(dir.path(), 10);
    assert_eq!(pool.allocate_page().unwrap(), PageId(0));
    assert_eq!(pool.allocate_page().unwrap(), PageId(1));
    assert_eq!(pool.allocate_page().unwrap(), PageId(2));
}

#[test]
fn eviction_flushes_dirty_victim() {
    let dir = tempdir().unwrap();
    let mut pool = pool(dir.path(), 1);

    let pid0 = pool.allocate_page().unwrap();
    let idx0 = pool.pin(pid0).unwrap();
    pool.frame_mut(idx0).data[0] = 99;
    pool.unpin(pid0, true).unwrap();

    // pinning a second page forces eviction of pid0's frame
    let pid1 = pool.allocate_page().unwrap();
    let idx1 = pool.pin(pid1).unwrap();
    pool.unpin(pid1, false).unwrap();
    assert_eq!(idx1, 0);

    let mut pool2 = pool_reopen(dir.path(), 2);
    let idx = pool2.pin(pid0).unwrap();
    assert_eq!(pool2.frame(idx).data[0], 99);
}

#[test]
fn pin_of_resident_page_increments_pin_count_without_io() {
    let dir = tempdir().unwrap();
    let mut pool = pool(dir.path(), 2);
    let pid = pool.allocate_page().unwrap();

    let idx_a = pool.pin(pid).unwrap();
    let idx_b = pool.pin(pid).unwrap();
    assert_eq!(idx_a, idx_b);
    assert_eq!(pool.frame(idx_a).pin_count, 2);
}

#[test]
fn unpin_below_zero_is_an_error() {
    let dir = tempdir().unwrap();
    let mut pool = pool(dir.path(), 2);
    let pid = pool.allocate_page().unwrap();
    pool.pin(pid).unwrap();
    pool.unpin(pid, false).unwrap();
    assert!(pool.unpin(pid, false).is_err());
}

#[test]
fn all_frames_pinned_fails_to_pin_a_new_page() {
    let dir = tempdir().unwrap();
    let mut pool = pool(dir.path(), 1);
    let pid0 = pool.allocate_page().unwrap();
    let pid1 = pool.allocate_page().unwrap();
    pool.pin(pid0).unwrap();

    let err = pool.pin(pid1).unwrap_err();
    assert!(matches!(err, BeeDbError::NoFreeFrame));
}

#[test]
fn evicted_frames_counts_initial_loads_and_evictions() {
    let dir = tempdir().unwrap();
    let mut pool = pool(dir.path(), 1);
    let pid0 = pool.allocate_page().unwrap();
    let pid1 = pool.allocate_page().unwrap();

    pool.pin(pid0).unwrap();
    pool.unpin(pid0, false).unwrap();
    assert_eq!(pool.evicted_frames(), 1);

    pool.pin(pid1).unwrap();
    assert_eq!(pool.evicted_frames(), 2);
}

#[test]
fn flush_is_idempotent_on_clean_pages() {
    let dir = tempdir().unwrap();
    let mut pool = pool(dir.path(), 2);
    let pid = pool.allocate_page().unwrap();
    pool.pin(pid).unwrap();
    pool.unpin(pid, false).unwrap();
    pool.flush().unwrap();
    pool.flush().unwrap();
}
