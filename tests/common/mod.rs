/*!
 * Shared helpers for the integration tests
 */

#![allow(dead_code)]

use proc_sched::{Channel, Kernel, Pid, Policy, Proc};

pub fn kernel(policy: Policy) -> Kernel {
    Kernel::builder()
        .with_policy(policy)
        .with_nproc(16)
        .build()
        .unwrap()
}

/// Keep the root process alive without ever running again
pub fn park(p: &Proc) -> ! {
    loop {
        let _ = p.block_on(Channel::io(u32::MAX));
    }
}

/// Compute forever, taking a timer trap every tick
pub fn spin(p: &Proc) -> ! {
    loop {
        p.run_for(1);
    }
}

/// Step cpu 0 `n` times, collecting the pids that ran
pub fn steps(kernel: &Kernel, n: usize) -> Vec<Pid> {
    (0..n).filter_map(|_| kernel.step(0)).collect()
}
