// src/session.rs

// The action boundary a front end drives. A `Session` threads one
// `Undoable<Calculator>` through every action, persists the calculator after
// each successful mutation and hands the new snapshot to a `Render` hook.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::calc::Calculator;
use crate::error::{PersistError, Result, UserError};
use crate::history::Undoable;
use crate::value::Mode;

/// Every mutating action a front end can send.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Digit(u8),
    Decimal,
    Letter(char),
    Num,
    Denom,
    Clear,
    Enter,
    Operator(String),
    Exch(isize, isize),
    Store,
    Show(Mode),
    Reset,
    Undo,
    Redo,
}

impl Action {
    /// Runs the action against a snapshot. Undo and redo move through the
    /// history; everything else is a recorded mutation of the calculator.
    pub fn apply(&self, state: &Undoable<Calculator>) -> Result<Undoable<Calculator>> {
        match self {
            Action::Undo => state.undo(),
            Action::Redo => state.redo(),
            Action::Digit(d) => state.mutate(|c| c.digit(*d)),
            Action::Decimal => state.mutate(Calculator::decimal),
            Action::Letter(l) => state.mutate(|c| c.letter(*l)),
            Action::Num => state.mutate(Calculator::num),
            Action::Denom => state.mutate(Calculator::denom),
            Action::Clear => state.mutate(|c| Ok(c.clear())),
            Action::Enter => state.mutate(Calculator::enter),
            Action::Operator(name) => state.mutate(|c| c.operator(name)),
            Action::Exch(a, b) => state.mutate(|c| c.exch(*a, *b)),
            Action::Store => state.mutate(Calculator::store),
            Action::Show(mode) => state.mutate(|c| Ok(c.show(*mode))),
            Action::Reset => state.mutate(|c| Ok(c.reset())),
        }
    }
}

/// Called after every dispatched action with the full snapshot and the
/// error the action raised, if any.
pub trait Render {
    fn render(&mut self, state: &Undoable<Calculator>, error: Option<&UserError>);
}

/// A renderer that draws nothing.
#[derive(Debug, Default)]
pub struct Headless;

impl Render for Headless {
    fn render(&mut self, _state: &Undoable<Calculator>, _error: Option<&UserError>) {}
}

// --- Persistence ---

pub fn save_state(path: &Path, calc: &Calculator) -> std::result::Result<(), PersistError> {
    let json = serde_json::to_string(calc)?;
    fs::write(path, json)?;
    Ok(())
}

pub fn load_state(path: &Path) -> std::result::Result<Calculator, PersistError> {
    let json = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&json)?)
}

// --- Session ---

pub struct Session<R: Render> {
    state: Undoable<Calculator>,
    path: Option<PathBuf>,
    renderer: R,
    last_error: Option<UserError>,
}

impl<R: Render> Session<R> {
    /// A session that never touches the filesystem.
    pub fn new(renderer: R) -> Self {
        Session { state: Undoable::new(Calculator::new()), path: None, renderer, last_error: None }
    }

    /// Restores the calculator saved at `path`. A missing or unreadable blob
    /// starts a fresh calculator; history always starts empty.
    pub fn load(path: impl Into<PathBuf>, renderer: R) -> Self {
        let path = path.into();
        let calc = match load_state(&path) {
            Ok(calc) => {
                info!(path = %path.display(), depth = calc.stack().len(), "restored saved state");
                calc
            }
            Err(PersistError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %path.display(), "no saved state, starting fresh");
                Calculator::new()
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "discarding unreadable saved state");
                Calculator::new()
            }
        };
        Session { state: Undoable::new(calc), path: Some(path), renderer, last_error: None }
    }

    /// Persists to `path` without reading it first.
    pub fn fresh(path: impl Into<PathBuf>, renderer: R) -> Self {
        Session { path: Some(path.into()), ..Session::new(renderer) }
    }

    /// Sets the display mode of the starting calculator. Not recorded in
    /// history, so the first undo cannot revert it.
    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.state = Undoable::new(self.state.inner().show(mode));
        self
    }

    pub fn state(&self) -> &Undoable<Calculator> {
        &self.state
    }

    pub fn calc(&self) -> &Calculator {
        self.state.inner()
    }

    pub fn last_error(&self) -> Option<&UserError> {
        self.last_error.as_ref()
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Applies one action. A rejected action leaves the state and history
    /// untouched; the error is kept in `last_error` and returned.
    pub fn dispatch(&mut self, action: Action) -> Result<()> {
        debug!(?action, "dispatch");
        let outcome = action.apply(&self.state);
        let result = match outcome {
            Ok(next) => {
                if action == Action::Reset {
                    info!(depth = self.state.stack().len(), "calculator reset");
                }
                self.state = next;
                self.last_error = None;
                self.persist();
                Ok(())
            }
            Err(e) => {
                warn!(?action, error = %e, "action rejected");
                self.last_error = Some(e.clone());
                Err(e)
            }
        };
        self.renderer.render(&self.state, self.last_error.as_ref());
        result
    }

    /// Dispatches actions in order, stopping at the first rejection.
    pub fn dispatch_all(&mut self, actions: impl IntoIterator<Item = Action>) -> Result<()> {
        actions.into_iter().try_for_each(|action| self.dispatch(action))
    }

    fn persist(&self) {
        let Some(path) = &self.path else { return };
        if let Err(e) = save_state(path, self.state.inner()) {
            warn!(path = %path.display(), error = %e, "failed to save state");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::value::Value;

    #[derive(Clone, Default)]
    struct LogBuffer(Arc<Mutex<Vec<u8>>>);

    impl io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl LogBuffer {
        fn lines(&self) -> Vec<String> {
            let bytes = self.0.lock().unwrap();
            String::from_utf8_lossy(&bytes).lines().map(str::to_string).collect()
        }
    }

    #[derive(Default)]
    struct Recorder {
        frames: Vec<(usize, Option<UserError>)>,
    }

    impl Render for Recorder {
        fn render(&mut self, state: &Undoable<Calculator>, error: Option<&UserError>) {
            self.frames.push((state.history().len(), error.cloned()));
        }
    }

    #[test]
    fn test_dispatch_renders_every_action() {
        let mut session = Session::new(Recorder::default());
        session.dispatch(Action::Digit(7)).unwrap();
        session.dispatch(Action::Enter).unwrap();
        assert_eq!(session.dispatch(Action::Operator("neg".into())), Ok(()));
        assert_eq!(session.dispatch(Action::Operator("add".into())), Err(UserError::Underflow));

        let frames = &session.renderer().frames;
        assert_eq!(frames.len(), 4);
        assert_eq!(frames[2], (3, None));
        assert_eq!(frames[3], (3, Some(UserError::Underflow)));
        assert_eq!(session.calc().stack(), &[Value::Float(-7.0)]);
    }

    #[test]
    fn test_error_clears_on_next_success() {
        let mut session = Session::new(Headless);
        assert!(session.dispatch(Action::Undo).is_err());
        assert_eq!(session.last_error(), Some(&UserError::NothingToUndo));
        session.dispatch(Action::Digit(1)).unwrap();
        assert_eq!(session.last_error(), None);
    }

    #[test]
    fn test_undo_through_session() {
        let mut session = Session::new(Headless);
        session
            .dispatch_all([
                Action::Digit(2),
                Action::Enter,
                Action::Digit(3),
                Action::Operator("mul".into()),
            ])
            .unwrap();
        assert_eq!(session.calc().stack(), &[Value::Float(6.0)]);

        session.dispatch(Action::Undo).unwrap();
        assert_eq!(session.calc().stack(), &[Value::Float(2.0)]);
        assert_eq!(session.calc().display(), "3");

        session.dispatch(Action::Redo).unwrap();
        assert_eq!(session.calc().stack(), &[Value::Float(6.0)]);
    }

    #[test]
    fn test_show_and_reset_are_undoable() {
        let mut session = Session::new(Headless);
        session.dispatch_all([Action::Show(Mode::Frac), Action::Reset]).unwrap();
        assert_eq!(session.calc().showing(), Mode::Decimal);
        session.dispatch(Action::Undo).unwrap();
        assert_eq!(session.calc().showing(), Mode::Frac);
    }

    #[test]
    fn test_rejections_warn_and_resets_inform() {
        let logs = LogBuffer::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::DEBUG)
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            let mut session = Session::new(Headless);
            assert!(session.dispatch(Action::Operator("add".into())).is_err());
            session.dispatch_all([Action::Digit(4), Action::Enter, Action::Reset]).unwrap();
        });

        let lines = logs.lines();
        let rejected: Vec<_> = lines.iter().filter(|l| l.contains("action rejected")).collect();
        assert_eq!(rejected.len(), 1);
        assert!(rejected[0].contains("WARN"), "{}", rejected[0]);
        assert!(rejected[0].contains("stack underflow"), "{}", rejected[0]);

        let reset: Vec<_> = lines.iter().filter(|l| l.contains("calculator reset")).collect();
        assert_eq!(reset.len(), 1);
        assert!(reset[0].contains("INFO"), "{}", reset[0]);
        assert!(reset[0].contains("depth=1"), "{}", reset[0]);
    }

    #[test]
    fn test_starting_mode_is_not_undoable() {
        let mut session = Session::new(Headless).with_mode(Mode::Frac);
        assert_eq!(session.calc().showing(), Mode::Frac);
        assert!(session.state().history().is_empty());
        assert_eq!(session.dispatch(Action::Undo), Err(UserError::NothingToUndo));
        assert_eq!(session.calc().showing(), Mode::Frac);
    }
}
