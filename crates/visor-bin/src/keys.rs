//! KeyTranslator: stateful key -> [`Command`] translation.
//!
//! Normal mode state machine:
//! * Idle: optional `pending_count` accumulating prefix digits.
//! * OperatorPending(op): `d`, `y` or `c` captured; digits 1-9 start a
//!   post-operator count. A leading `0` is the `LineStart` motion, never a
//!   count.
//! * A motion completes the command with `count = prefix * post` (either
//!   defaulting to 1, or 0 when neither was typed). A doubled operator
//!   (`dd`, `yy`, `cc`) takes whole lines.
//! * `f`/`F`/`t`/`T` wait for the target byte; `i`/`a` after an operator
//!   wait for a text object; `[` and `]` wait for their double.
//! * <Esc> cancels anything pending.
//!
//! Insert mode passes typed bytes through until <Esc>.

use core_actions::{InsertAnchor, Motion, MotionKind, TextObject};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

const MAX_COUNT: usize = 999_999;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Delete,
    Yank,
    Change,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Move(Motion),
    Apply(Operator, Motion),
    /// Open an insert session.
    Insert(InsertAnchor),
    /// `o`: open a line below the cursor's line.
    OpenBelow,
    Type(Vec<u8>),
    Backspace,
    /// <Esc> in insert mode.
    EndInsert,
    Save,
    NextBuffer,
    PrevBuffer,
    Quit,
}

#[derive(Debug, Clone, Copy)]
enum Awaiting {
    Nothing,
    Find(fn(u8) -> MotionKind),
    Object { inner: bool },
    Section(char),
}

#[derive(Debug)]
pub struct KeyTranslator {
    insert: bool,
    pending_count: Option<usize>,
    pending_operator: Option<Operator>,
    post_op_count: Option<usize>,
    awaiting: Awaiting,
}

impl Default for KeyTranslator {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyTranslator {
    pub fn new() -> Self {
        Self {
            insert: false,
            pending_count: None,
            pending_operator: None,
            post_op_count: None,
            awaiting: Awaiting::Nothing,
        }
    }

    pub fn in_insert(&self) -> bool {
        self.insert
    }

    /// Follow the editor when a session opened or closed without a key
    /// asking for it (a failed `i`, a buffer switch).
    pub fn sync_insert(&mut self, active: bool) {
        if self.insert != active {
            self.insert = active;
            self.reset();
        }
    }

    pub fn reset(&mut self) {
        self.pending_count = None;
        self.pending_operator = None;
        self.post_op_count = None;
        self.awaiting = Awaiting::Nothing;
    }

    pub fn translate(&mut self, key: &KeyEvent) -> Option<Command> {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        if ctrl {
            let command = match key.code {
                KeyCode::Char('s') => Command::Save,
                KeyCode::Char('n') => Command::NextBuffer,
                KeyCode::Char('p') => Command::PrevBuffer,
                KeyCode::Char('q') => Command::Quit,
                _ => return None,
            };
            self.reset();
            return Some(command);
        }
        if self.insert {
            return self.translate_insert(key);
        }
        match key.code {
            KeyCode::Esc => {
                self.reset();
                None
            }
            KeyCode::Left | KeyCode::Backspace => self.motion(MotionKind::Left),
            KeyCode::Right => self.motion(MotionKind::Right),
            KeyCode::Up => self.motion(MotionKind::Up),
            KeyCode::Down => self.motion(MotionKind::Down),
            KeyCode::Home => self.motion(MotionKind::LineStart),
            KeyCode::End => self.motion(MotionKind::LineEnd),
            KeyCode::Char(c) => self.translate_char(c),
            _ => None,
        }
    }

    fn translate_insert(&mut self, key: &KeyEvent) -> Option<Command> {
        match key.code {
            KeyCode::Esc => {
                self.insert = false;
                Some(Command::EndInsert)
            }
            KeyCode::Backspace => Some(Command::Backspace),
            KeyCode::Enter => Some(Command::Type(b"\n".to_vec())),
            KeyCode::Tab => Some(Command::Type(b"\t".to_vec())),
            KeyCode::Char(c) => {
                let mut utf8 = [0; 4];
                Some(Command::Type(c.encode_utf8(&mut utf8).as_bytes().to_vec()))
            }
            _ => None,
        }
    }

    fn translate_char(&mut self, c: char) -> Option<Command> {
        match std::mem::replace(&mut self.awaiting, Awaiting::Nothing) {
            Awaiting::Nothing => {}
            Awaiting::Find(kind) => {
                return match u8::try_from(c) {
                    Ok(b) if b.is_ascii() => self.motion(kind(b)),
                    _ => {
                        self.reset();
                        None
                    }
                };
            }
            Awaiting::Object { inner } => {
                let object = u8::try_from(c).ok().and_then(TextObject::from_key);
                return match object {
                    Some(o) if inner => self.motion(MotionKind::Inner(o)),
                    Some(o) => self.motion(MotionKind::Outer(o)),
                    None => {
                        self.reset();
                        None
                    }
                };
            }
            Awaiting::Section(first) => {
                return match (first, c) {
                    ('[', '[') => self.motion(MotionKind::SectionBackward),
                    (']', ']') => self.motion(MotionKind::SectionForward),
                    _ => {
                        self.reset();
                        None
                    }
                };
            }
        }

        if let Some(d) = c.to_digit(10) {
            let d = d as usize;
            let slot = if self.pending_operator.is_some() {
                &mut self.post_op_count
            } else {
                &mut self.pending_count
            };
            // `0` with no count so far is a motion.
            if d == 0 && slot.is_none() {
                return self.motion(MotionKind::LineStart);
            }
            *slot = Some((slot.unwrap_or(0) * 10 + d).min(MAX_COUNT));
            return None;
        }

        let operator = match c {
            'd' => Some(Operator::Delete),
            'y' => Some(Operator::Yank),
            'c' => Some(Operator::Change),
            _ => None,
        };
        if let Some(op) = operator {
            if self.pending_operator == Some(op) {
                return self.motion(MotionKind::Lines);
            }
            if self.pending_operator.is_some() {
                self.reset();
                return None;
            }
            self.pending_operator = Some(op);
            return None;
        }

        if self.pending_operator.is_some() && matches!(c, 'i' | 'a') {
            self.awaiting = Awaiting::Object { inner: c == 'i' };
            return None;
        }

        let find: Option<fn(u8) -> MotionKind> = match c {
            'f' => Some(MotionKind::FindForward),
            'F' => Some(MotionKind::FindBackward),
            't' => Some(MotionKind::TillForward),
            'T' => Some(MotionKind::TillBackward),
            _ => None,
        };
        if let Some(kind) = find {
            self.awaiting = Awaiting::Find(kind);
            return None;
        }
        if matches!(c, '[' | ']') {
            self.awaiting = Awaiting::Section(c);
            return None;
        }

        if let Some(kind) = motion_for(c) {
            return self.motion(kind);
        }

        if self.pending_operator.is_some() {
            self.reset();
            return None;
        }
        let count = self.pending_count.take().unwrap_or(0);
        let command = match c {
            'i' => Command::Insert(InsertAnchor::Cursor),
            'a' => Command::Insert(InsertAnchor::AfterCursor),
            'A' => Command::Insert(InsertAnchor::Motion(Motion::new(MotionKind::LineEnd))),
            'I' => Command::Insert(InsertAnchor::Motion(Motion::new(MotionKind::FirstNonBlank))),
            'o' => Command::OpenBelow,
            'x' => Command::Apply(Operator::Delete, Motion::with_count(MotionKind::Right, count)),
            'q' => Command::Quit,
            _ => {
                self.reset();
                return None;
            }
        };
        if matches!(command, Command::Insert(_) | Command::OpenBelow) {
            self.insert = true;
        }
        self.reset();
        Some(command)
    }

    /// Complete the pending command with `kind`.
    fn motion(&mut self, kind: MotionKind) -> Option<Command> {
        let count = match (self.pending_count, self.post_op_count) {
            (None, None) => 0,
            (pre, post) => (pre.unwrap_or(1) * post.unwrap_or(1)).min(MAX_COUNT),
        };
        let command = match self.pending_operator {
            // `cw` changes to the end of the word, like `ce`.
            Some(Operator::Change) => {
                let kind = match kind {
                    MotionKind::WordForward => MotionKind::WordEnd,
                    MotionKind::BigWordForward => MotionKind::BigWordEnd,
                    other => other,
                };
                self.insert = true;
                Command::Apply(Operator::Change, Motion::with_count(kind, count))
            }
            Some(op) => Command::Apply(op, Motion::with_count(kind, count)),
            None => Command::Move(Motion::with_count(kind, count)),
        };
        self.reset();
        Some(command)
    }
}

fn motion_for(c: char) -> Option<MotionKind> {
    let kind = match c {
        'h' => MotionKind::Left,
        'l' | ' ' => MotionKind::Right,
        'k' => MotionKind::Up,
        'j' => MotionKind::Down,
        'w' => MotionKind::WordForward,
        'e' => MotionKind::WordEnd,
        'b' => MotionKind::WordBackward,
        'W' => MotionKind::BigWordForward,
        'E' => MotionKind::BigWordEnd,
        'B' => MotionKind::BigWordBackward,
        '^' => MotionKind::FirstNonBlank,
        '$' => MotionKind::LineEnd,
        '(' => MotionKind::SentenceBackward,
        ')' => MotionKind::SentenceForward,
        '{' => MotionKind::ParagraphBackward,
        '}' => MotionKind::ParagraphForward,
        'G' => MotionKind::GotoLine,
        '_' => MotionKind::Lines,
        'H' => MotionKind::ViewTop,
        'M' => MotionKind::ViewMiddle,
        'L' => MotionKind::ViewBottom,
        _ => return None,
    };
    Some(kind)
}
