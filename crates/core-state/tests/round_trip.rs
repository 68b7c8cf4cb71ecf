//! Buffers against real files: write, read back, compare.

use core_io::StdFiles;
use core_state::{BufferRing, Tuning};
use core_text::alloc::system;
use pretty_assertions::assert_eq;
use proptest::prelude::*;

#[test]
fn nonexistent_path_is_created_and_written() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("fresh.txt");
    let mut files = StdFiles::new();
    let mut ring = BufferRing::new(&system(), Tuning::default());
    let id = ring.new_buf(&mut files, Some(&path)).unwrap();
    let buf = ring.get_mut(id).unwrap();
    assert_eq!(buf.size(), 0);
    assert_eq!(buf.table().span_count(), 0);
    buf.insert_at(0, b"hi").unwrap();
    buf.write(&mut files, None).unwrap();
    ring.clear(&mut files);
    assert_eq!(std::fs::read(&path).unwrap(), b"hi");
}

#[test]
fn mapped_buffer_saves_over_itself() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("doc.txt");
    std::fs::write(&path, b"first line\nsecond line\n").unwrap();
    let mut files = StdFiles::new();
    let mut ring = BufferRing::new(&system(), Tuning::default());
    let id = ring.new_buf(&mut files, Some(&path)).unwrap();
    let buf = ring.get_mut(id).unwrap();
    assert!(buf.is_mapped());
    buf.insert_at(11, b"inserted\n").unwrap();
    buf.delete_range(0..6).unwrap();
    buf.write(&mut files, None).unwrap();
    assert_eq!(buf.text_lossy(), "line\ninserted\nsecond line\n");
    ring.clear(&mut files);
    assert_eq!(
        std::fs::read_to_string(&path).unwrap(),
        "line\ninserted\nsecond line\n"
    );
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn read_after_write_reproduces_content(
        original in prop::collection::vec(any::<u8>(), 0..512),
        insert_at in any::<usize>(),
        inserted in prop::collection::vec(any::<u8>(), 0..64),
        staging_size in 1usize..64,
        use_mmap in any::<bool>(),
    ) {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src");
        let dst = dir.path().join("dst");
        std::fs::write(&src, &original).unwrap();

        let tuning = Tuning { staging_size, use_mmap, ..Tuning::default() };
        let mut files = StdFiles::new();
        let mut ring = BufferRing::new(&system(), tuning);
        let a = ring.new_buf(&mut files, Some(&src)).unwrap();
        let at = insert_at % (original.len() + 1);
        let expected = {
            let buf = ring.get_mut(a).unwrap();
            buf.insert_at(at, &inserted).unwrap();
            buf.write(&mut files, Some(&dst)).unwrap();
            buf.to_vec()
        };

        let b = ring.new_buf(&mut files, Some(&dst)).unwrap();
        prop_assert_eq!(ring.get(b).unwrap().to_vec(), expected);
        ring.clear(&mut files);
    }
}
