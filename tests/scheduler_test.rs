/*!
 * Scheduler Tests
 * Dispatch order under each policy, driven one selection round at a time
 */

mod common;

use common::{kernel, park, spin, steps};
use pretty_assertions::assert_eq;
use proc_sched::{Kernel, Policy, ProcError, ProcState, SchedConfig, WaitStatus};
use std::sync::mpsc;
use std::time::Duration;

#[test]
fn test_round_robin_rotates_through_runnable() {
    let kernel = kernel(Policy::RoundRobin);
    kernel
        .boot(|init| {
            for _ in 0..3 {
                init.fork(|p| spin(p)).unwrap();
            }
            park(init);
        })
        .unwrap();

    assert_eq!(kernel.step(0), Some(1));
    assert_eq!(steps(&kernel, 9), vec![2, 3, 4, 2, 3, 4, 2, 3, 4]);

    let stats = kernel.stats();
    assert_eq!(stats.dispatches, 10);
    assert_eq!(stats.timer_preemptions, 9);
    assert_eq!(stats.forks, 3);
    kernel.shutdown();
}

#[test]
fn test_fcfs_runs_to_completion_in_arrival_order() {
    let kernel = kernel(Policy::Fcfs);
    let (tx, rx) = mpsc::channel();

    kernel
        .boot(move |init| {
            for _ in 0..3 {
                init.fork(|p| p.run_for(3)).unwrap();
            }
            for _ in 0..4 {
                tx.send(init.wait_with_timing()).unwrap();
            }
            park(init);
        })
        .unwrap();

    assert_eq!(steps(&kernel, 5), vec![1, 2, 3, 4, 1]);
    assert_eq!(kernel.step(0), None);
    assert_eq!(kernel.now(), 9);

    let results: Vec<_> = rx.try_iter().collect();
    assert_eq!(
        results,
        vec![
            Ok(WaitStatus {
                pid: 2,
                wait_ticks: 0,
                run_ticks: 3
            }),
            Ok(WaitStatus {
                pid: 3,
                wait_ticks: 3,
                run_ticks: 3
            }),
            Ok(WaitStatus {
                pid: 4,
                wait_ticks: 6,
                run_ticks: 3
            }),
            Err(ProcError::NoChildren),
        ]
    );
    kernel.shutdown();
}

#[test]
fn test_fcfs_ignores_timer() {
    let kernel = kernel(Policy::Fcfs);
    kernel
        .boot(|init| {
            init.fork(|p| spin(p)).unwrap();
            init.fork(|p| spin(p)).unwrap();
            park(init);
        })
        .unwrap();

    assert_eq!(kernel.step(0), Some(1));

    // the first child never gives the processor back; run it on a thread
    let runner = kernel.clone();
    let handle = std::thread::spawn(move || runner.step(0));
    std::thread::sleep(Duration::from_millis(50));
    assert!(kernel.now() > 0);
    assert_eq!(kernel.stats().timer_preemptions, 0);
    assert_eq!(kernel.process(3).unwrap().run_count, 0);

    // killing it is the only way off the processor
    kernel.kill(2).unwrap();
    assert_eq!(handle.join().unwrap(), Some(2));
    assert_eq!(kernel.process(2).unwrap().state, ProcState::Zombie);
    kernel.shutdown();
}

#[test]
fn test_priority_prefers_lowest_value() {
    let kernel = kernel(Policy::Priority);
    kernel
        .boot(|init| {
            for _ in 0..3 {
                init.fork(|p| spin(p)).unwrap();
            }
            park(init);
        })
        .unwrap();
    assert_eq!(kernel.step(0), Some(1));

    assert_eq!(kernel.set_priority(10, 4), Ok(60));
    assert_eq!(steps(&kernel, 3), vec![4, 4, 4]);

    assert_eq!(kernel.set_priority(10, 2), Ok(60));
    assert_eq!(steps(&kernel, 4), vec![2, 4, 2, 4]);

    // pid 3 is never chosen while better work exists
    assert_eq!(kernel.process(3).unwrap().run_count, 0);
    kernel.shutdown();
}

#[test]
fn test_feedback_demotes_cpu_bound_process() {
    let kernel = kernel(Policy::Feedback);
    kernel
        .boot(|init| {
            init.fork(|p| spin(p)).unwrap();
            park(init);
        })
        .unwrap();
    assert_eq!(kernel.step(0), Some(1));

    let mut seen = Vec::new();
    for _ in 0..6 {
        assert_eq!(kernel.step(0), Some(2));
        let fb = kernel.process(2).unwrap().feedback.unwrap();
        seen.push((kernel.now(), fb.queue));
    }
    assert_eq!(
        seen,
        vec![(1, 1), (3, 2), (7, 3), (15, 4), (31, 4), (47, 4)]
    );

    let fb = kernel.process(2).unwrap().feedback.unwrap();
    assert_eq!(fb.queue_ticks, [1, 2, 4, 8, 32]);
    assert_eq!(fb.queued, Some(4));
    assert_eq!(kernel.stats().demotions, 4);
    kernel.shutdown();
}

#[test]
fn test_feedback_aging_promotes_waiting_process() {
    let mut config = SchedConfig::default().with_policy(Policy::Feedback);
    config.aging_thresholds = [10, 20, 30, 40, 5];
    let kernel = Kernel::new(config).unwrap();

    kernel
        .boot(|init| {
            init.fork(|p| spin(p)).unwrap();
            init.fork(|p| spin(p)).unwrap();
            park(init);
        })
        .unwrap();

    // both children sink to the bottom queue, taking turns
    assert_eq!(steps(&kernel, 9), vec![1, 2, 3, 2, 3, 2, 3, 2, 3]);
    assert_eq!(kernel.now(), 30);
    assert_eq!(kernel.stats().promotions, 0);
    let starved = kernel.process(2).unwrap().feedback.unwrap();
    assert_eq!(starved.queued, Some(4));
    assert_eq!(starved.queue_ticks, [1, 2, 4, 8, 0]);

    // pid 2 waited 8 ticks in queue 4: it rises to queue 3 only, runs a
    // full queue 3 allotment, and sinks back
    assert_eq!(kernel.step(0), Some(2));
    assert_eq!(kernel.stats().promotions, 1);
    assert_eq!(kernel.now(), 38);
    let promoted = kernel.process(2).unwrap().feedback.unwrap();
    assert_eq!(promoted.queue_ticks, [1, 2, 4, 16, 0]);
    assert_eq!(promoted.queue, 4);
    assert_eq!(kernel.process(3).unwrap().feedback.unwrap().queue, 4);
    kernel.shutdown();
}

#[test]
fn test_idle_step_reports_none() {
    let kernel = kernel(Policy::RoundRobin);
    kernel.boot(|init| park(init)).unwrap();

    assert_eq!(kernel.step(0), Some(1));
    assert_eq!(kernel.step(0), None);
    assert_eq!(kernel.step_or_idle(0), None);
    assert_eq!(kernel.now(), 1);
    assert_eq!(kernel.stats().idle_polls, 2);
    kernel.shutdown();
}

#[test]
fn test_threaded_cpus_make_progress() {
    let kernel = Kernel::builder()
        .with_policy(Policy::RoundRobin)
        .with_cpus(2)
        .build()
        .unwrap();
    let (tx, rx) = mpsc::channel();

    kernel
        .boot(move |init| {
            for _ in 0..4 {
                init.fork(|p| p.run_for(5)).unwrap();
            }
            let mut reaped = Vec::new();
            while let Ok(pid) = init.wait() {
                reaped.push(pid);
            }
            reaped.sort_unstable();
            tx.send(reaped).unwrap();
            park(init);
        })
        .unwrap();

    let handle = kernel.start().unwrap();
    let reaped = rx.recv_timeout(Duration::from_secs(10)).unwrap();
    handle.shutdown();

    assert_eq!(reaped, vec![2, 3, 4, 5]);
    assert_eq!(kernel.stats().exits, 4);
    assert_eq!(kernel.list_processes().len(), 1);
}

#[test]
fn test_idle_cpu_does_not_charge_running_process() {
    let kernel = Kernel::builder()
        .with_policy(Policy::Fcfs)
        .with_cpus(2)
        .build()
        .unwrap();
    let (tx, rx) = mpsc::channel();

    kernel
        .boot(move |init| {
            init.fork(|p| {
                for _ in 0..50 {
                    p.run_for(1);
                    // the other cpu sits idle meanwhile
                    std::thread::sleep(Duration::from_micros(200));
                }
            })
            .unwrap();
            tx.send(init.wait_with_timing()).unwrap();
            park(init);
        })
        .unwrap();

    let handle = kernel.start().unwrap();
    let status = rx.recv_timeout(Duration::from_secs(10)).unwrap().unwrap();
    handle.shutdown();

    assert_eq!(status.pid, 2);
    assert_eq!(status.run_ticks, 50);
    assert!(status.wait_ticks >= 0);
}
