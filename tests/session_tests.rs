// tests/session_tests.rs

mod test_utils;
use test_utils::*;

use std::fs;

use rat_calc::session::{load_state, save_state};
use rat_calc::{Action, Calculator, Headless, Mode, PersistError, Session, UserError, Value};
use tempfile::tempdir;

#[test]
fn test_missing_state_file_starts_fresh() {
    let dir = tempdir().unwrap();
    let session = Session::load(dir.path().join("state.json"), Headless);
    assert_eq!(session.calc(), &Calculator::new());
    assert!(session.state().history().is_empty());
}

#[test]
fn test_state_survives_restart() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("state.json");

    let mut first = Session::load(&path, Headless);
    first.dispatch(Action::Show(Mode::Frac)).unwrap();
    first.dispatch_all(actions("3_1/4 'len = 'len 2 mul 0.1 7")).unwrap();
    // Leave a token half typed.
    first.dispatch_all([Action::Digit(4), Action::Denom]).unwrap();

    let second = Session::load(&path, Headless);
    assert_eq!(second.calc(), first.calc());
    assert_eq!(second.calc().display(), "4/");
    assert_eq!(second.calc().showing(), Mode::Frac);
    assert_eq!(second.calc().defs().get("len"), Some(&Value::rat(13, 4)));
    // History is not persisted.
    assert!(second.state().history().is_empty());
}

#[test]
fn test_blob_encodes_rationals_as_strings() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("state.json");
    let mut session = Session::load(&path, Headless);
    session.dispatch_all(actions("22/7")).unwrap();

    let text = fs::read_to_string(&path).unwrap();
    let blob: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(blob["stack"][0]["tag"], "rat");
    assert_eq!(blob["stack"][0]["value"]["num"], "22");
    assert_eq!(blob["stack"][0]["value"]["denom"], "7");
    assert_eq!(blob["showing"], "decimal");
}

#[test]
fn test_huge_rationals_round_trip() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("state.json");
    let calc = calc_ok("1/3 99999999999999999999 f2 mul");
    save_state(&path, &calc).unwrap();
    assert_eq!(load_state(&path).unwrap(), calc);
}

#[test]
fn test_unreadable_state_falls_back_to_fresh() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("state.json");
    fs::write(&path, "{ not json").unwrap();

    assert!(matches!(load_state(&path), Err(PersistError::Json(_))));
    let session = Session::load(&path, Headless);
    assert_eq!(session.calc(), &Calculator::new());
}

#[test]
fn test_failed_save_is_swallowed() {
    let dir = tempdir().unwrap();
    // A directory cannot be written as a file.
    let mut session = Session::fresh(dir.path(), Headless);
    session.dispatch_all(actions("5 5 add")).unwrap();
    assert_eq!(session.calc().stack(), &[Value::Float(10.0)]);
    assert_eq!(session.last_error(), None);
}

#[test]
fn test_fresh_ignores_saved_state() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("state.json");
    let mut first = Session::load(&path, Headless);
    first.dispatch_all(actions("8 9")).unwrap();

    let mut second = Session::fresh(&path, Headless);
    assert!(second.calc().stack().is_empty());
    second.dispatch_all(actions("1")).unwrap();
    // The next save replaces the old blob.
    assert_eq!(load_state(&path).unwrap().stack(), &[Value::Float(1.0)]);
}

#[test]
fn test_rejected_action_does_not_persist() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("state.json");
    let mut session = Session::load(&path, Headless);
    session.dispatch_all(actions("2")).unwrap();
    let saved = fs::read_to_string(&path).unwrap();

    assert_eq!(session.dispatch(Action::Operator("sub".to_string())), Err(UserError::Underflow));
    assert_eq!(fs::read_to_string(&path).unwrap(), saved);
}

#[test]
fn test_undo_is_persisted() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("state.json");
    let mut session = Session::load(&path, Headless);
    session.dispatch_all(actions("6 7 mul")).unwrap();
    session.dispatch(Action::Undo).unwrap();

    let restored = Session::load(&path, Headless);
    assert_eq!(restored.calc().stack(), &[Value::Float(6.0), Value::Float(7.0)]);
}
