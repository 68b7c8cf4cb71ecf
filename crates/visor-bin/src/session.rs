//! Applies translated commands to the editor.

use crate::keys::{Command, Operator};
use core_actions::{InsertAnchor, Motion, MotionKind};
use core_model::{Editor, EditorError};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Editor plus the unnamed register yanks and deletes fill.
pub struct Session {
    pub editor: Editor,
    register: Vec<u8>,
}

impl Session {
    pub fn new(editor: Editor) -> Self {
        Self {
            editor,
            register: Vec::new(),
        }
    }

    pub fn register(&self) -> &[u8] {
        &self.register
    }

    /// Run one command. Errors are shown on the status line, never fatal.
    pub fn apply(&mut self, command: Command) -> Flow {
        debug!(target: "editor", ?command, "apply");
        if command == Command::Quit {
            return Flow::Quit;
        }
        if let Err(e) = self.run(command) {
            self.editor.report(e);
        }
        Flow::Continue
    }

    fn run(&mut self, command: Command) -> Result<(), EditorError> {
        let ed = &mut self.editor;
        match command {
            Command::Move(motion) => {
                ed.move_cursor(motion)?;
            }
            Command::Apply(op, motion) => self.operate(op, motion)?,
            Command::Insert(anchor) => {
                ed.ins_begin(anchor)?;
            }
            Command::OpenBelow => {
                ed.ins_begin(InsertAnchor::Motion(Motion::new(MotionKind::LineEnd)))?;
                ed.insert(b"\n")?;
            }
            Command::Type(bytes) => ed.insert(&bytes)?,
            Command::Backspace => {
                ed.backspace()?;
            }
            Command::EndInsert => ed.ins_end()?,
            Command::Save => {
                if ed.in_insert() {
                    ed.ins_end()?;
                }
                ed.write(None)?;
            }
            Command::NextBuffer => {
                ed.next_buf()?;
            }
            Command::PrevBuffer => {
                ed.prev_buf()?;
            }
            Command::Quit => {}
        }
        Ok(())
    }

    fn operate(&mut self, op: Operator, motion: Motion) -> Result<(), EditorError> {
        if let Some(yank) = self.editor.yank(motion)? {
            self.register = yank.to_vec();
        }
        match op {
            Operator::Yank => {
                let n = self.register.len();
                self.editor.report(format_args!("{n} bytes yanked"));
            }
            Operator::Delete => {
                self.editor.delete(motion)?;
            }
            Operator::Change => {
                let removed = self.editor.delete(motion)?;
                // Changing whole lines leaves one empty line to type into.
                if let Some(range) = removed.filter(|_| motion.kind.is_linewise()) {
                    // An unterminated last line takes the newline before it,
                    // so the empty line starts after the one put back.
                    let at = range.start;
                    let joined = at > 0
                        && self
                            .editor
                            .current_buffer()
                            .and_then(|b| b.table().byte(at - 1))
                            != Some(b'\n');
                    self.editor.insert_at(at, b"\n")?;
                    self.editor.set_cursor(if joined { at + 1 } else { at })?;
                }
                self.editor.ins_begin(InsertAnchor::Cursor)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::KeyTranslator;
    use core_io::MemFiles;
    use core_terminal::CaptureTerminal;
    use core_text::alloc::system;
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use pretty_assertions::assert_eq;
    use std::path::Path;

    fn session(text: &str) -> (Session, CaptureTerminal) {
        let mut files = MemFiles::new();
        files.insert("doc", text.as_bytes().to_vec());
        let mut editor = Editor::new(system(), Box::new(files));
        let term = CaptureTerminal::new(40, 6);
        editor.set_terminal(Box::new(term.clone()));
        editor.new_buf(Some(Path::new("doc"))).unwrap();
        (Session::new(editor), term)
    }

    /// Feed `keys` as typed; `<` stands for Escape.
    fn typed(s: &mut Session, keys: &str) -> Flow {
        let mut kt = KeyTranslator::new();
        let mut flow = Flow::Continue;
        for c in keys.chars() {
            let code = if c == '<' { KeyCode::Esc } else { KeyCode::Char(c) };
            if let Some(command) = kt.translate(&KeyEvent::new(code, KeyModifiers::NONE)) {
                flow = s.apply(command);
            }
            kt.sync_insert(s.editor.in_insert());
        }
        flow
    }

    fn text(s: &Session) -> String {
        s.editor.current_buffer().unwrap().text_lossy()
    }

    #[test]
    fn delete_fills_the_register() {
        let (mut s, _) = session("one two three\n");
        typed(&mut s, "wdw");
        assert_eq!(text(&s), "one three\n");
        assert_eq!(s.register(), b"two ");
    }

    #[test]
    fn yank_reports_its_size() {
        let (mut s, term) = session("a\nb\nc\n");
        typed(&mut s, "2yy");
        assert_eq!(s.register(), b"a\nb\n");
        assert_eq!(term.status(), "4 bytes yanked");
        assert_eq!(text(&s), "a\nb\nc\n");
    }

    #[test]
    fn change_word_then_type() {
        let (mut s, _) = session("one two\n");
        typed(&mut s, "cwONE<");
        assert_eq!(text(&s), "ONE two\n");
        assert!(!s.editor.in_insert());
    }

    #[test]
    fn change_line_keeps_an_empty_line() {
        let (mut s, _) = session("a\nb\nc\n");
        typed(&mut s, "jccX<");
        assert_eq!(text(&s), "a\nX\nc\n");
    }

    #[test]
    fn change_unterminated_last_line() {
        let (mut s, _) = session("a\nb");
        typed(&mut s, "jccX<");
        assert_eq!(text(&s), "a\nX");
    }

    #[test]
    fn open_below_and_append() {
        let (mut s, _) = session("ab\ncd\n");
        typed(&mut s, "oxy<");
        assert_eq!(text(&s), "ab\nxy\ncd\n");
        typed(&mut s, "A!<");
        assert_eq!(text(&s), "ab\nxy!\ncd\n");
    }

    #[test]
    fn saves_and_failures_report_on_the_status_line() {
        let (mut s, term) = session("x\n");
        let save = KeyEvent::new(KeyCode::Char('s'), KeyModifiers::CONTROL);
        let command = KeyTranslator::new().translate(&save).unwrap();
        assert_eq!(s.apply(command), Flow::Continue);
        assert_eq!(term.status(), "\"doc\" 2 bytes written");
        s.editor.delete_buf(s.editor.current().unwrap()).unwrap();
        typed(&mut s, "x");
        assert_eq!(term.status(), "no buffer");
    }

    #[test]
    fn quit_stops_the_loop() {
        let (mut s, _) = session("");
        assert_eq!(typed(&mut s, "q"), Flow::Quit);
    }
}
