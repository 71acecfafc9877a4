mod common;

use common::Harness;
use once_core::{DoneFilter, Scope};

#[test]
fn to_do_then_done_then_to_do_again() {
    let h = Harness::new();
    let tag = "todo task";
    assert!(!h.engine.need_to_do(tag).expect("need_to_do should succeed"));
    assert!(!h
        .engine
        .been_done(tag, &DoneFilter::new())
        .expect("been_done should succeed"));

    assert!(h.engine.to_do(tag, None).expect("to_do should succeed"));
    assert!(h.engine.need_to_do(tag).expect("need_to_do should succeed"));
    assert!(!h
        .engine
        .been_done(tag, &DoneFilter::new())
        .expect("been_done should succeed"));

    h.engine.mark_done(tag).expect("mark_done should succeed");
    assert!(!h.engine.need_to_do(tag).expect("need_to_do should succeed"));
    assert!(h
        .engine
        .been_done(tag, &DoneFilter::new())
        .expect("been_done should succeed"));

    h.engine.to_do(tag, None).expect("to_do should succeed");
    assert!(h.engine.need_to_do(tag).expect("need_to_do should succeed"));
    assert!(h
        .engine
        .been_done(tag, &DoneFilter::new())
        .expect("been_done should succeed"));
}

#[test]
fn requests_and_marks_in_one_millisecond_resolve_in_call_order() {
    let h = Harness::new();
    let tag = "same-ms";

    h.engine.mark_done(tag).expect("mark_done should succeed");
    h.engine.to_do(tag, None).expect("to_do should succeed");
    assert!(h.engine.need_to_do(tag).expect("need_to_do should succeed"));

    h.engine.mark_done(tag).expect("mark_done should succeed");
    assert!(!h.engine.need_to_do(tag).expect("need_to_do should succeed"));

    for _ in 0..5 {
        h.engine.to_do(tag, None).expect("to_do should succeed");
        assert!(h.engine.need_to_do(tag).expect("need_to_do should succeed"));
        h.engine.mark_done(tag).expect("mark_done should succeed");
        assert!(!h.engine.need_to_do(tag).expect("need_to_do should succeed"));
    }
}

#[test]
fn done_after_a_rolled_back_clock_still_satisfies_the_request() {
    let h = Harness::new();
    h.engine.to_do("rollback", None).expect("to_do should succeed");
    h.clock.advance(-60_000);
    h.engine.mark_done("rollback").expect("mark_done should succeed");
    assert!(!h
        .engine
        .need_to_do("rollback")
        .expect("need_to_do should succeed"));
}

#[test]
fn to_do_alone_creates_a_record_without_occurrences() {
    let h = Harness::new();
    h.engine.to_do("pending", None).expect("to_do should succeed");

    assert_eq!(h.engine.tags().expect("tags should load"), vec!["pending"]);
    assert_eq!(
        h.engine
            .last_done("pending")
            .expect("last_done should succeed"),
        None
    );
}

#[test]
fn install_scoped_to_do_is_skipped_once_done() {
    let h = Harness::new();
    let tag = "to do this install task";

    assert!(h
        .engine
        .to_do(tag, Some(Scope::Install))
        .expect("to_do should succeed"));
    assert!(h.engine.need_to_do(tag).expect("need_to_do should succeed"));
    assert!(!h
        .engine
        .been_done(tag, &DoneFilter::new())
        .expect("been_done should succeed"));

    h.engine.mark_done(tag).expect("mark_done should succeed");
    assert!(!h.engine.need_to_do(tag).expect("need_to_do should succeed"));

    assert!(!h
        .engine
        .to_do(tag, Some(Scope::Install))
        .expect("to_do should succeed"));
    assert!(!h.engine.need_to_do(tag).expect("need_to_do should succeed"));

    assert!(h.engine.to_do(tag, None).expect("to_do should succeed"));
    assert!(h.engine.need_to_do(tag).expect("need_to_do should succeed"));
}

#[test]
fn version_scoped_to_do_rearms_after_app_update() {
    let h = Harness::new();
    let tag = "todo this app version task";

    h.engine
        .to_do(tag, Some(Scope::Version))
        .expect("to_do should succeed");
    assert!(h.engine.need_to_do(tag).expect("need_to_do should succeed"));

    h.engine.mark_done(tag).expect("mark_done should succeed");
    assert!(!h.engine.need_to_do(tag).expect("need_to_do should succeed"));

    h.engine
        .to_do(tag, Some(Scope::Version))
        .expect("to_do should succeed");
    assert!(!h.engine.need_to_do(tag).expect("need_to_do should succeed"));

    h.clock.advance(1_000);
    h.simulate_app_update("1.1.0");

    assert!(h
        .engine
        .to_do(tag, Some(Scope::Version))
        .expect("to_do should succeed"));
    assert!(h.engine.need_to_do(tag).expect("need_to_do should succeed"));

    h.engine.to_do(tag, None).expect("to_do should succeed");
    assert!(h.engine.need_to_do(tag).expect("need_to_do should succeed"));
}

#[test]
fn clear_done_drops_the_marker_too() {
    let h = Harness::new();
    h.engine.to_do("t", None).expect("to_do should succeed");
    h.engine.clear_done("t").expect("clear_done should succeed");
    assert!(!h.engine.need_to_do("t").expect("need_to_do should succeed"));
    assert!(h.engine.tags().expect("tags should load").is_empty());
}

#[test]
fn clear_all_drops_markers() {
    let h = Harness::new();
    h.engine.to_do("a", None).expect("to_do should succeed");
    h.engine
        .to_do("b", Some(Scope::Session))
        .expect("to_do should succeed");
    h.engine.clear_all().expect("clear_all should succeed");
    assert!(!h.engine.need_to_do("a").expect("need_to_do should succeed"));
    assert!(!h.engine.need_to_do("b").expect("need_to_do should succeed"));
}
