//! An editor over real files: open, edit through sessions and motions, save.

use core_actions::{InsertAnchor, Motion, MotionKind};
use core_io::StdFiles;
use core_model::Editor;
use core_state::Tuning;
use core_terminal::CaptureTerminal;
use core_text::alloc::system;
use pretty_assertions::assert_eq;
use std::io::Write;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::subscriber::with_default;
use tracing_subscriber::fmt::MakeWriter;

#[derive(Clone, Default)]
struct LogBuffer(Arc<Mutex<Vec<u8>>>);

struct LogGuard<'a>(MutexGuard<'a, Vec<u8>>);

impl Write for LogGuard<'_> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogBuffer {
    type Writer = LogGuard<'a>;

    fn make_writer(&'a self) -> Self::Writer {
        LogGuard(self.0.lock().expect("log buffer poisoned"))
    }
}

impl LogBuffer {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

#[test]
fn edit_two_files_and_save_both() {
    let dir = tempfile::tempdir().unwrap();
    let a = dir.path().join("a.txt");
    let b = dir.path().join("b.txt");
    std::fs::write(&a, "alpha beta\n").unwrap();
    std::fs::write(&b, "one\ntwo\n").unwrap();

    let mut ed = Editor::new(system(), Box::new(StdFiles::new()));
    ed.new_buf(Some(&a)).unwrap();
    ed.new_buf(Some(&b)).unwrap();

    ed.move_cursor(Motion::new(MotionKind::WordForward)).unwrap();
    ed.delete(Motion::new(MotionKind::LineEnd)).unwrap();
    // The cursor backed off the newline onto the blank.
    ed.ins_begin(InsertAnchor::AfterCursor).unwrap();
    ed.insert(b"gamma").unwrap();
    ed.ins_end().unwrap();
    assert_eq!(ed.write(None).unwrap(), 12);

    ed.next_buf().unwrap();
    ed.delete(Motion::with_count(MotionKind::Lines, 1)).unwrap();
    assert_eq!(ed.write(None).unwrap(), 4);
    drop(ed);

    assert_eq!(std::fs::read_to_string(&a).unwrap(), "alpha gamma\n");
    assert_eq!(std::fs::read_to_string(&b).unwrap(), "two\n");
}

#[test]
fn heap_copy_when_mapping_is_off() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("doc");
    std::fs::write(&path, "abc").unwrap();
    let tuning = Tuning {
        use_mmap: false,
        staging_size: 1,
        ..Tuning::default()
    };
    let mut ed = Editor::with_tuning(system(), Box::new(StdFiles::new()), tuning);
    ed.new_buf(Some(&path)).unwrap();
    assert!(!ed.current_buffer().unwrap().is_mapped());
    ed.insert_at(3, b"def").unwrap();
    ed.write(None).unwrap();
    drop(ed);
    assert_eq!(std::fs::read(&path).unwrap(), b"abcdef");
}

#[test]
fn missing_directory_is_reported_and_logged() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("no-such-dir").join("file");
    let term = CaptureTerminal::new(80, 3);
    let log = LogBuffer::default();
    let subscriber = tracing_subscriber::fmt()
        .with_ansi(false)
        .without_time()
        .with_writer(log.clone())
        .finish();

    with_default(subscriber, || {
        let mut ed = Editor::new(system(), Box::new(StdFiles::new()));
        ed.set_terminal(Box::new(term.clone()));
        assert!(ed.new_buf(Some(&path)).is_err());
        assert_eq!(ed.buf_count(), 0);
    });

    assert!(term.status().starts_with(&path.display().to_string()));
    let log = log.contents();
    assert!(log.contains("editor"), "{log}");
    assert!(log.contains("report"), "{log}");
}
