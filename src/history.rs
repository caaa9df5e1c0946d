// src/history.rs

// Undo/redo over whole-state snapshots. The wrapper knows nothing about the
// state it holds: mutations go through `mutate`, queries go through `Deref`.

use std::ops::Deref;

use crate::error::{Result, UserError};

#[derive(Debug, Clone, PartialEq)]
pub struct Undoable<S> {
    inner: S,
    /// Pre-mutation snapshots, most recent last.
    history: Vec<S>,
    /// Snapshots popped by `undo`, valid until the next mutation.
    undone: Vec<S>,
}

impl<S: Clone> Undoable<S> {
    pub fn new(inner: S) -> Self {
        Undoable { inner, history: Vec::new(), undone: Vec::new() }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn history(&self) -> &[S] {
        &self.history
    }

    pub fn undone(&self) -> &[S] {
        &self.undone
    }

    /// Applies a mutation to the wrapped state. On success the previous state
    /// becomes an undo snapshot and the redo stack is dropped. On failure the
    /// wrapper is left exactly as it was.
    pub fn mutate<E>(
        &self,
        f: impl FnOnce(&S) -> std::result::Result<S, E>,
    ) -> std::result::Result<Self, E> {
        let next = f(&self.inner)?;
        let mut history = self.history.clone();
        history.push(self.inner.clone());
        Ok(Undoable { inner: next, history, undone: Vec::new() })
    }

    pub fn undo(&self) -> Result<Self> {
        let mut next = self.clone();
        let previous = next.history.pop().ok_or(UserError::NothingToUndo)?;
        let current = std::mem::replace(&mut next.inner, previous);
        next.undone.push(current);
        Ok(next)
    }

    pub fn redo(&self) -> Result<Self> {
        let mut next = self.clone();
        let restored = next.undone.pop().ok_or(UserError::NothingToRedo)?;
        let current = std::mem::replace(&mut next.inner, restored);
        next.history.push(current);
        Ok(next)
    }
}

impl<S> Deref for Undoable<S> {
    type Target = S;

    fn deref(&self) -> &S {
        &self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Counter(i32);

    impl Counter {
        fn bump(&self) -> std::result::Result<Counter, UserError> {
            Ok(Counter(self.0 + 1))
        }

        fn fail(&self) -> std::result::Result<Counter, UserError> {
            Err(UserError::Underflow)
        }
    }

    #[test]
    fn test_undo_restores_prior_state() {
        let start = Undoable::new(Counter(0));
        let bumped = start.mutate(Counter::bump).unwrap();
        assert_eq!(bumped.0, 1);

        let undone = bumped.undo().unwrap();
        assert_eq!(undone.inner(), start.inner());
        assert_eq!(undone.undone(), &[Counter(1)]);

        let redone = undone.redo().unwrap();
        assert_eq!(redone, bumped);
    }

    #[test]
    fn test_empty_history_raises() {
        let start = Undoable::new(Counter(0));
        assert_eq!(start.undo(), Err(UserError::NothingToUndo));
        assert_eq!(start.redo(), Err(UserError::NothingToRedo));
    }

    #[test]
    fn test_mutation_clears_redo() {
        let state = Undoable::new(Counter(0))
            .mutate(Counter::bump)
            .and_then(|s| s.mutate(Counter::bump))
            .unwrap();
        let state = state.undo().unwrap();
        assert_eq!(state.undone().len(), 1);

        let state = state.mutate(Counter::bump).unwrap();
        assert!(state.undone().is_empty());
        assert_eq!(state.redo(), Err(UserError::NothingToRedo));
        assert_eq!(state.history(), &[Counter(0), Counter(1)]);
    }

    #[test]
    fn test_failed_mutation_records_nothing() {
        let state = Undoable::new(Counter(0)).mutate(Counter::bump).unwrap().undo().unwrap();
        assert_eq!(state.mutate(Counter::fail), Err(UserError::Underflow));
        // The redo stack survives a rejected action.
        assert_eq!(state.undone().len(), 1);
    }

    #[test]
    fn test_redo_does_not_clear_remaining_redo() {
        let state = Undoable::new(Counter(0))
            .mutate(Counter::bump)
            .and_then(|s| s.mutate(Counter::bump))
            .unwrap();
        let state = state.undo().and_then(|s| s.undo()).unwrap();
        let state = state.redo().unwrap();
        assert_eq!(state.0, 1);
        assert_eq!(state.undone(), &[Counter(2)]);
    }
}
