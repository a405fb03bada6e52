//! Dispatcher behaviour under self-mutation, re-entry and failure
//!
//! Listeners here add, remove and fire on the dispatcher that is invoking them.

use std::cell::RefCell;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;

use j2_core::*;

type Log = Rc<RefCell<Vec<&'static str>>>;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn recorder(log: &Log, name: &'static str) -> Listener<()> {
    let log = Rc::clone(log);
    Listener::new(move |_, _| log.borrow_mut().push(name))
}

fn take(log: &Log) -> Vec<&'static str> {
    std::mem::take(&mut *log.borrow_mut())
}

// ============================================================================
// ORDERING
// ============================================================================

#[test]
fn test_distinct_priorities_strictly_descending() {
    let d = Dispatcher::new();
    let log = Log::default();
    let names = ["p3", "p-999", "p999", "p0", "p42"];
    let priorities = [3, -999, 999, 0, 42];
    for (name, priority) in names.into_iter().zip(priorities) {
        d.listen_at(recorder(&log, name), Priority(priority));
    }

    d.fire(&mut ()).unwrap();
    assert_eq!(take(&log), vec!["p999", "p42", "p3", "p0", "p-999"]);
}

#[test]
fn test_equal_priorities_precede_lower() {
    let d = Dispatcher::new();
    let log = Log::default();
    d.listen_at(recorder(&log, "A"), Priority(10));
    d.listen_at(recorder(&log, "B"), Priority(-5));
    d.listen_at(recorder(&log, "C"), Priority(10));

    d.fire(&mut ()).unwrap();
    let order = take(&log);
    assert_eq!(order.len(), 3);
    assert_eq!(order[2], "B");
}

#[test]
fn test_first_and_last_bracket_everything() {
    let d = Dispatcher::new();
    let log = Log::default();
    d.listen_at(recorder(&log, "last"), Priority::LAST);
    d.listen_at(recorder(&log, "max"), Priority(999));
    d.listen_at(recorder(&log, "first"), Priority::FIRST);
    d.listen_at(recorder(&log, "min"), Priority(-999));

    d.fire(&mut ()).unwrap();
    assert_eq!(take(&log), vec!["first", "max", "min", "last"]);
}

// ============================================================================
// RETURN VALUE
// ============================================================================

#[test]
fn test_only_prevent_default_flips_result() {
    let d: Dispatcher<()> = Dispatcher::new();
    d.listen(Listener::new(|_, _| ()));
    d.listen(Listener::new(|_, _| true));
    d.listen(Listener::new(|_, _| Verdict::Continue));
    assert!(d.fire(&mut ()).unwrap());

    d.listen_at(Listener::new(|_, _| false), Priority(500));
    assert!(!d.fire(&mut ()).unwrap());
}

#[test]
fn test_false_does_not_stop_later_listeners() {
    let d = Dispatcher::new();
    let log = Log::default();
    d.listen_at(Listener::new(|_, _| false), Priority(10));
    d.listen_at(recorder(&log, "after"), Priority(0));

    assert!(!d.fire(&mut ()).unwrap());
    assert_eq!(take(&log), vec!["after"]);
}

// ============================================================================
// MUTATION DURING DISPATCH
// ============================================================================

#[test]
fn test_listen_between_fires() {
    let d = Dispatcher::new();
    let log = Log::default();
    d.listen(recorder(&log, "f1"));
    d.fire(&mut ()).unwrap();
    d.listen(recorder(&log, "f2"));
    d.fire(&mut ()).unwrap();

    assert_eq!(take(&log), vec!["f1", "f1", "f2"]);
}

#[test]
fn test_listen_during_fire_is_deferred() {
    init_tracing();
    let d: Dispatcher<()> = Dispatcher::new();
    let log = Log::default();
    let late = recorder(&log, "late");

    let handle = d.clone();
    let added = Rc::new(RefCell::new(false));
    let flag = Rc::clone(&added);
    d.listen(Listener::new(move |_, _| {
        if !flag.replace(true) {
            handle.listen_at(late.clone(), Priority::FIRST);
            assert_eq!(handle.pending_len(), 1);
        }
    }));

    d.fire(&mut ()).unwrap();
    assert!(take(&log).is_empty());
    assert_eq!(d.pending_len(), 0);
    assert_eq!(d.len(), 2);

    d.fire(&mut ()).unwrap();
    assert_eq!(take(&log), vec!["late"]);
}

#[test]
fn test_self_removal_runs_once_more() {
    init_tracing();
    let d: Dispatcher<()> = Dispatcher::new();
    let log = Log::default();

    let handle = d.clone();
    let me: Rc<RefCell<Option<Listener<()>>>> = Rc::default();
    let me_inner = Rc::clone(&me);
    let log_inner = Rc::clone(&log);
    let f1 = d.listen(Listener::new(move |_, _| {
        log_inner.borrow_mut().push("f1");
        if let Some(me) = me_inner.borrow().as_ref() {
            handle.remove_listener(me);
        }
    }));
    *me.borrow_mut() = Some(f1.clone());

    d.fire(&mut ()).unwrap();
    assert_eq!(take(&log), vec!["f1"]);
    assert!(!d.contains(&f1));

    d.fire(&mut ()).unwrap();
    assert!(take(&log).is_empty());
    assert!(d.is_empty());
}

#[test]
fn test_removed_later_listener_still_runs_in_same_cycle() {
    let d: Dispatcher<()> = Dispatcher::new();
    let log = Log::default();
    let victim = recorder(&log, "victim");

    let handle = d.clone();
    let target = victim.clone();
    d.listen_at(Listener::new(move |_, _| handle.remove_listener(&target)), Priority(10));
    d.listen_at(victim.clone(), Priority(0));

    d.fire(&mut ()).unwrap();
    assert_eq!(take(&log), vec!["victim"]);

    d.fire(&mut ()).unwrap();
    assert!(take(&log).is_empty());
}

#[test]
fn test_listen_then_remove_during_fire_drops_pending() {
    let d: Dispatcher<()> = Dispatcher::new();
    let log = Log::default();
    let transient = recorder(&log, "transient");

    let handle = d.clone();
    d.listen(Listener::new(move |_, _| {
        handle.listen(transient.clone());
        handle.remove_listener(&transient);
    }));

    d.fire(&mut ()).unwrap();
    d.fire(&mut ()).unwrap();
    assert!(take(&log).is_empty());
    assert_eq!(d.len(), 1);
}

#[test]
fn test_remove_all_during_fire() {
    let d: Dispatcher<()> = Dispatcher::new();
    let log = Log::default();

    let handle = d.clone();
    d.listen_at(Listener::new(move |_, _| handle.remove_all_listeners()), Priority(10));
    d.listen_at(recorder(&log, "b"), Priority(0));

    d.fire(&mut ()).unwrap();
    assert_eq!(take(&log), vec!["b"]);
    assert!(d.is_empty());
}

#[test]
fn test_same_listener_twice_removed_together() {
    let d = Dispatcher::new();
    let log = Log::default();
    let f = recorder(&log, "f");
    d.listen_at(f.clone(), Priority(10));
    d.listen_at(f.clone(), Priority(-10));

    d.fire(&mut ()).unwrap();
    assert_eq!(take(&log), vec!["f", "f"]);

    d.remove_listener(&f);
    d.fire(&mut ()).unwrap();
    assert!(take(&log).is_empty());
}

// ============================================================================
// RE-ENTRY
// ============================================================================

#[test]
fn test_reentrant_fire_runs_nested_pass() {
    let d: Dispatcher<u32> = Dispatcher::new();
    let log = Log::default();
    let late = recorder_u32(&log, "late");

    let handle = d.clone();
    let log_outer = Rc::clone(&log);
    d.listen(Listener::fallible(move |_, depth: &mut u32| {
        log_outer.borrow_mut().push("outer");
        if *depth == 0 {
            handle.listen(late.clone());
            let mut nested = 1;
            handle.fire(&mut nested)?;
        }
        Ok::<_, DispatchError>(())
    }));

    d.fire(&mut 0).unwrap();
    // The nested pass does not see the outer cycle's pending addition.
    assert_eq!(take(&log), vec!["outer", "outer"]);
    assert!(!d.is_firing());
    assert_eq!(d.len(), 2);
}

fn recorder_u32(log: &Log, name: &'static str) -> Listener<u32> {
    let log = Rc::clone(log);
    Listener::new(move |_, _: &mut u32| log.borrow_mut().push(name))
}

#[test]
fn test_nested_fire_skips_removed_listener() {
    let d: Dispatcher<u32> = Dispatcher::new();
    let log = Log::default();
    let victim = d.listen_at(recorder_u32(&log, "victim"), Priority(0));

    let handle = d.clone();
    let log_outer = Rc::clone(&log);
    d.listen_at(
        Listener::fallible(move |_, depth: &mut u32| {
            if *depth == 0 {
                log_outer.borrow_mut().push("outer");
                handle.remove_listener(&victim);
                handle.fire(&mut 1)?;
            } else {
                log_outer.borrow_mut().push("nested");
            }
            Ok::<_, DispatchError>(())
        }),
        Priority(10),
    );

    d.fire(&mut 0).unwrap();
    // Removed before the nested pass: absent there, still in the outer snapshot.
    assert_eq!(take(&log), vec!["outer", "nested", "victim"]);
    assert_eq!(d.len(), 1);

    d.fire(&mut 1).unwrap();
    assert_eq!(take(&log), vec!["nested"]);
}

#[test]
fn test_reentrant_fire_rejected() {
    let d: Dispatcher<()> = Dispatcher::with_config(DispatcherConfig {
        reentrancy: Reentrancy::Reject,
        ..Default::default()
    });
    let seen = Rc::new(RefCell::new(None));

    let handle = d.clone();
    let seen_inner = Rc::clone(&seen);
    d.listen(Listener::new(move |_, _| {
        let nested = handle.fire(&mut ());
        *seen_inner.borrow_mut() = Some(matches!(nested, Err(DispatchError::Reentrant)));
    }));

    assert!(d.fire(&mut ()).unwrap());
    assert_eq!(*seen.borrow(), Some(true));
    assert_eq!(d.state(), DispatchState::Idle);
}

// ============================================================================
// FAILURE
// ============================================================================

#[test]
fn test_listener_error_aborts_and_reconciles() {
    init_tracing();
    let d: Dispatcher<()> = Dispatcher::new();
    let log = Log::default();
    let late = recorder(&log, "late");

    let handle = d.clone();
    d.listen_at(
        Listener::fallible(move |_, _| {
            handle.listen(late.clone());
            Err::<(), _>(anyhow::anyhow!("listener exploded"))
        }),
        Priority(10),
    );
    d.listen_at(recorder(&log, "skipped"), Priority(0));

    let err = d.fire(&mut ()).unwrap_err();
    assert!(err.is_listener_failure());
    assert!(err.to_string().contains("listener exploded"));
    assert!(matches!(err, DispatchError::Listener { priority: Priority(10), .. }));
    assert!(take(&log).is_empty());

    // The buffered addition survived and the dispatcher is usable again.
    assert!(!d.is_firing());
    assert_eq!(d.len(), 3);
}

#[test]
fn test_listener_panic_reconciles() {
    let d: Dispatcher<()> = Dispatcher::new();
    let log = Log::default();
    let late = recorder(&log, "late");

    let handle = d.clone();
    let boom = d.listen(Listener::new(move |_, _: &mut ()| -> () {
        handle.listen(late.clone());
        panic!("listener panicked");
    }));

    let result = panic::catch_unwind(AssertUnwindSafe(|| d.fire(&mut ())));
    assert!(result.is_err());
    assert!(!d.is_firing());
    assert_eq!(d.pending_len(), 0);

    d.remove_listener(&boom);
    d.fire(&mut ()).unwrap();
    assert_eq!(take(&log), vec!["late"]);
}

// ============================================================================
// LIFECYCLE
// ============================================================================

#[test]
fn test_load_listener_cannot_register_for_load() {
    let page = Rc::new(PageLifecycle::default());
    let seen = Rc::new(RefCell::new(None));

    let weak = Rc::downgrade(&page);
    let seen_inner = Rc::clone(&seen);
    page.on_load(
        Listener::new(move |_, _: &mut PageEvent| {
            if let Some(page) = weak.upgrade() {
                let late = page.on_load(Listener::new(|_, _: &mut PageEvent| ()), None);
                *seen_inner.borrow_mut() = Some(matches!(late, Err(DispatchError::PhaseComplete(Phase::Load))));
            }
        }),
        None,
    )
    .unwrap();

    assert!(page.handle_load().unwrap());
    assert_eq!(*seen.borrow(), Some(true));
    assert!(page.is_loaded());
}
