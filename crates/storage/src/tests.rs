use super::*;
use tempfile::tempdir;

#[test]
fn new_file_has_zero_pages() {
    let dir = tempdir().unwrap();
    let pf = PagedFile::open(&dir.path().join("t.db")).unwrap();
    assert_eq!(pf.page_count(), 0);
}

#[test]
fn allocate_pages_are_dense_and_never_reused() {
    let dir = tempdir().unwrap();
    let mut pf = PagedFile::open(&dir.path().join("t.db")).unwrap();

    let a = pf.allocate_page().unwrap();
    let b = pf.allocate_page().unwrap();
    let c = pf.allocate_page().unwrap();

    assert_eq!(a, PageId(0));
    assert_eq!(b, PageId(1));
    assert_eq!(c, PageId(2));
    assert_eq!(pf.page_count(), 3);
}

#[test]
fn write_then_read_round_trips_bytes() {
    let dir = tempdir().unwrap();
    let mut pf = PagedFile::open(&dir.path().join("t.db")).unwrap();
    let id = pf.allocate_page().unwrap();

    let mut payload = [0u8; PAGE_SIZE];
    payload[0] = 0xAB;
    payload[PAGE_SIZE - 1] = 0xCD;
    pf.write(id, &payload).unwrap();

    let mut buf = [0u8; PAGE_SIZE];
    pf.read(id, &mut buf).unwrap();
    assert_eq!(buf, payload);
}

#[test]
fn fresh_page_reads_as_zeroed() {
    let dir = tempdir().unwrap();
    let mut pf = PagedFile::open(&dir.path().join("t.db")).unwrap();
    let id = pf.allocate_page().unwrap();

    let mut buf = [0xFFu8; PAGE_SIZE];
    pf.read(id, &mut buf).unwrap();
    assert_eq!(buf, [0u8; PAGE_SIZE]);
}

#[test]
fn reading_unallocated_page_fails() {
    let dir = tempdir().unwrap();
    let mut pf = PagedFile::open(&dir.path().join("t.db")).unwrap();
    let mut buf = [0u8; PAGE_SIZE];
    let err = pf.read(PageId(0), &mut buf).unwrap_err();
    assert!(matches!(err, BeeDbError::InvariantViolation(_)));
}

#[test]
fn reopening_existing_file_preserves_page_count() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("t.db");
    {
        let mut pf = PagedFile::open(&path).unwrap();
        pf.allocate_page().unwrap();
        pf.allocate_page().unwrap();
    }
    let pf = PagedFile::open(&path).unwrap();
    assert_eq!(pf.page_count(), 2);
}

#[test]
fn truncated_file_is_rejected() {
    use std::io::Write as _;
    let dir = tempdir().unwrap();
    let path = dir.path().join("t.db");
    {
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(&[0u8; 10]).unwrap();
    }
    let err = PagedFile::open(&path).unwrap_err();
    assert!(matches!(err, BeeDbError::InvariantViolation(_)));
}
