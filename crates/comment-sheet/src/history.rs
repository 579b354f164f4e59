//! Undo/redo log with macro recording

use std::collections::VecDeque;

use crate::command::{Command, Macro};
use crate::error::{Error, Result};
use comment_sheet_core::CellStore;

/// The undo and redo stacks of one sheet
///
/// While a macro is open, pushed commands are collected into it instead of
/// landing on the undo stack. Macros nest by reference counting: only the
/// outermost [`end_macro`](Self::end_macro) closes the recording.
#[derive(Debug, Default)]
pub struct CommandLog {
    undo: VecDeque<Command>,
    redo: Vec<Command>,
    recording: Option<Macro>,
    macro_depth: usize,
    limit: Option<usize>,
}

impl CommandLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// A log keeping at most `limit` undo steps
    pub fn with_limit(limit: Option<usize>) -> Self {
        Self {
            limit,
            ..Self::default()
        }
    }

    /// Apply `command` and record it; the redo stack is cleared
    ///
    /// On error nothing is recorded and the store is unchanged.
    pub fn push(&mut self, mut command: Command, store: &mut CellStore) -> Result<()> {
        command.apply(store)?;
        log::trace!("applied {}", command.label());
        self.redo.clear();

        match self.recording.as_mut() {
            Some(recording) => recording.commands.push(command),
            None => self.record(command),
        }
        Ok(())
    }

    fn record(&mut self, command: Command) {
        self.undo.push_back(command);
        if let Some(limit) = self.limit {
            while self.undo.len() > limit {
                self.undo.pop_front();
            }
        }
    }

    /// Revert the most recent command; `false` when there is nothing to undo
    pub fn undo(&mut self, store: &mut CellStore) -> Result<bool> {
        self.check_closed("undo")?;
        let Some(mut command) = self.undo.pop_back() else {
            return Ok(false);
        };
        if let Err(e) = command.revert(store) {
            self.undo.push_back(command);
            return Err(e);
        }
        log::trace!("undid {}", command.label());
        self.redo.push(command);
        Ok(true)
    }

    /// Re-apply the most recently undone command; `false` when there is none
    pub fn redo(&mut self, store: &mut CellStore) -> Result<bool> {
        self.check_closed("redo")?;
        let Some(mut command) = self.redo.pop() else {
            return Ok(false);
        };
        if let Err(e) = command.apply(store) {
            self.redo.push(command);
            return Err(e);
        }
        log::trace!("redid {}", command.label());
        self.undo.push_back(command);
        Ok(true)
    }

    fn check_closed(&self, action: &str) -> Result<()> {
        match &self.recording {
            Some(recording) => Err(Error::MacroOpen(format!(
                "cannot {} during \"{}\"",
                action, recording.label
            ))),
            None => Ok(()),
        }
    }

    /// Start recording a macro, or join the one already open
    pub fn begin_macro<S: Into<String>>(&mut self, label: S) {
        if self.macro_depth == 0 {
            self.recording = Some(Macro::new(label));
        }
        self.macro_depth += 1;
    }

    /// Close one level of macro recording
    ///
    /// Returns true when the outermost level closed. Empty macros are
    /// dropped.
    pub fn end_macro(&mut self) -> bool {
        if self.macro_depth == 0 {
            return false;
        }
        self.macro_depth -= 1;
        if self.macro_depth > 0 {
            return false;
        }
        if let Some(recording) = self.recording.take() {
            if !recording.is_empty() {
                log::trace!(
                    "recorded macro \"{}\" with {} commands",
                    recording.label,
                    recording.commands.len()
                );
                self.record(Command::Macro(recording));
            }
        }
        true
    }

    /// Revert and discard everything recorded by the open macro
    pub fn abort_macro(&mut self, store: &mut CellStore) -> Result<()> {
        self.macro_depth = 0;
        if let Some(mut recording) = self.recording.take() {
            log::debug!(
                "aborting macro \"{}\" ({} commands)",
                recording.label,
                recording.commands.len()
            );
            recording.revert(store)?;
        }
        Ok(())
    }

    /// Whether a macro is being recorded
    pub fn is_recording(&self) -> bool {
        self.recording.is_some()
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    pub fn undo_len(&self) -> usize {
        self.undo.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redo.len()
    }

    /// Label of the command [`undo`](Self::undo) would revert
    pub fn undo_label(&self) -> Option<String> {
        self.undo.back().map(Command::label)
    }

    /// Label of the command [`redo`](Self::redo) would re-apply
    pub fn redo_label(&self) -> Option<String> {
        self.redo.last().map(Command::label)
    }

    /// Forget all history, including an open macro (without reverting it)
    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
        self.recording = None;
        self.macro_depth = 0;
    }
}
