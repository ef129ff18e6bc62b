//! Snapshot undo/redo shared by the roster and the dice log.

/// Outcome of an undo or redo request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryStep {
    Applied,
    /// Nothing to undo (or redo).
    Empty,
}

#[derive(Debug, Clone)]
pub struct UndoStack<S> {
    undo: Vec<S>,
    redo: Vec<S>,
}

impl<S> Default for UndoStack<S> {
    fn default() -> Self {
        Self { undo: Vec::new(), redo: Vec::new() }
    }
}

impl<S: Clone> UndoStack<S> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the state before a mutation. Clears the redo history.
    pub fn push(&mut self, before: S) {
        self.undo.push(before);
        self.redo.clear();
    }

    /// Swap `current` for the most recent snapshot.
    pub fn undo(&mut self, current: &mut S) -> HistoryStep {
        match self.undo.pop() {
            Some(prev) => {
                self.redo.push(std::mem::replace(current, prev));
                HistoryStep::Applied
            }
            None => HistoryStep::Empty,
        }
    }

    pub fn redo(&mut self, current: &mut S) -> HistoryStep {
        match self.redo.pop() {
            Some(next) => {
                self.undo.push(std::mem::replace(current, next));
                HistoryStep::Applied
            }
            None => HistoryStep::Empty,
        }
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
    }
}
