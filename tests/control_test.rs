/*!
 * Control Surface Tests
 * Priority changes, listings and rendering
 */

mod common;

use common::{kernel, park, spin, steps};
use pretty_assertions::assert_eq;
use proc_sched::{render_table, Policy, ProcError, ProcState};
use std::sync::mpsc;

#[test]
fn test_set_priority_rejects_out_of_range() {
    let kernel = kernel(Policy::Priority);
    kernel.boot(|init| park(init)).unwrap();

    assert_eq!(kernel.set_priority(150, 1), Err(ProcError::InvalidPriority(150)));
    assert_eq!(kernel.set_priority(-1, 1), Err(ProcError::InvalidPriority(-1)));
    assert_eq!(kernel.process(1).unwrap().priority, 60);

    assert_eq!(kernel.set_priority(5, 7), Err(ProcError::NoSuchProcess(7)));
    assert_eq!(kernel.set_priority(0, 1), Ok(60));
    assert_eq!(kernel.set_priority(100, 1), Ok(0));
    assert_eq!(kernel.process(1).unwrap().priority, 100);
    kernel.shutdown();
}

#[test]
fn test_raising_priority_yields_to_scheduler() {
    let kernel = kernel(Policy::Priority);
    let (tx, rx) = mpsc::channel();

    kernel
        .boot(move |init| {
            let child = init.fork(|p| spin(p)).unwrap();
            // no yield: the value went up, not down
            tx.send(init.set_priority(80, child)).unwrap();
            // lowering the child's value hands the processor straight over
            tx.send(init.set_priority(20, child)).unwrap();
            park(init);
        })
        .unwrap();

    assert_eq!(kernel.step(0), Some(1));
    assert_eq!(rx.try_iter().collect::<Vec<_>>(), vec![Ok(60)]);
    assert_eq!(kernel.stats().voluntary_yields, 1);

    // the child now outranks init, which waits RUNNABLE
    assert_eq!(steps(&kernel, 2), vec![2, 2]);
    assert_eq!(kernel.process(1).unwrap().state, ProcState::Runnable);

    kernel.set_priority(0, 1).unwrap();
    assert_eq!(kernel.step(0), Some(1));
    assert_eq!(rx.try_iter().collect::<Vec<_>>(), vec![Ok(80)]);
    kernel.shutdown();
}

#[test]
fn test_list_processes_in_slot_order() {
    let kernel = kernel(Policy::RoundRobin);
    kernel
        .boot(|init| {
            init.fork(|p| park(p)).unwrap();
            init.fork(|p| spin(p)).unwrap();
            park(init);
        })
        .unwrap();
    steps(&kernel, 3);

    let listing: Vec<_> = kernel
        .list_processes()
        .into_iter()
        .map(|r| (r.pid, r.state, r.run_count))
        .collect();
    assert_eq!(
        listing,
        vec![
            (1, ProcState::Sleeping, 1),
            (2, ProcState::Sleeping, 1),
            (3, ProcState::Runnable, 1),
        ]
    );
    assert!(kernel.list_processes().iter().all(|r| r.feedback.is_none()));
    kernel.shutdown();
}

#[test]
fn test_listing_under_feedback_shows_queues() {
    let kernel = kernel(Policy::Feedback);
    kernel
        .boot(|init| {
            init.fork(|p| spin(p)).unwrap();
            park(init);
        })
        .unwrap();
    steps(&kernel, 3);

    let text = kernel.render();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].starts_with("PID"));
    assert!(lines[0].ends_with("cur_q  q0    q1    q2    q3    q4"));
    assert!(lines[1].starts_with("1     60        SLEEPING"));
    assert!(lines[2].starts_with("2     60        RUNNABLE"));

    let records = kernel.list_processes();
    assert_eq!(render_table(&records), text);
    let child = records[1].feedback.unwrap();
    assert_eq!(child.queue, 2);
    assert_eq!(child.queue_ticks, [1, 2, 0, 0, 0]);
    kernel.shutdown();
}

#[test]
fn test_records_serialize_with_state_names() {
    let kernel = kernel(Policy::RoundRobin);
    kernel.boot(|init| park(init)).unwrap();

    let json = serde_json::to_value(kernel.list_processes()).unwrap();
    assert_eq!(json[0]["pid"], 1);
    assert_eq!(json[0]["state"], "RUNNABLE");
    assert_eq!(json[0]["name"], "initcode");
    assert!(json[0].get("feedback").is_none());
    kernel.shutdown();
}
