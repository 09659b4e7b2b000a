/*!
 * Lock-Free Scheduler Statistics
 * Atomic counters bumped on the dispatch and trap paths
 */

use super::types::{Policy, SchedStats};
use std::sync::atomic::{AtomicU64, Ordering};

/// Atomic scheduler statistics for lock-free updates
///
/// # Performance
/// - Cache-line aligned to prevent false sharing
/// - Relaxed ordering throughout; counters are monitoring data only
#[repr(C, align(64))]
pub struct AtomicSchedStats {
    policy: Policy,
    dispatches: AtomicU64,
    idle_polls: AtomicU64,
    timer_preemptions: AtomicU64,
    voluntary_yields: AtomicU64,
    promotions: AtomicU64,
    demotions: AtomicU64,
    forks: AtomicU64,
    exits: AtomicU64,
    reaped: AtomicU64,
}

macro_rules! counter {
    ($($name:ident => $field:ident),* $(,)?) => {
        $(
            #[inline(always)]
            pub fn $name(&self) {
                self.$field.fetch_add(1, Ordering::Relaxed);
            }
        )*
    };
}

impl AtomicSchedStats {
    #[inline]
    pub fn new(policy: Policy) -> Self {
        Self {
            policy,
            dispatches: AtomicU64::new(0),
            idle_polls: AtomicU64::new(0),
            timer_preemptions: AtomicU64::new(0),
            voluntary_yields: AtomicU64::new(0),
            promotions: AtomicU64::new(0),
            demotions: AtomicU64::new(0),
            forks: AtomicU64::new(0),
            exits: AtomicU64::new(0),
            reaped: AtomicU64::new(0),
        }
    }

    counter! {
        inc_dispatches => dispatches,
        inc_idle_polls => idle_polls,
        inc_timer_preemptions => timer_preemptions,
        inc_voluntary_yields => voluntary_yields,
        inc_demotions => demotions,
        inc_forks => forks,
        inc_exits => exits,
        inc_reaped => reaped,
    }

    #[inline]
    pub fn add_promotions(&self, count: u64) {
        if count > 0 {
            self.promotions.fetch_add(count, Ordering::Relaxed);
        }
    }

    /// Snapshot of the current counters
    ///
    /// # Note
    /// Values may be mutually inconsistent under concurrent updates, but each
    /// one is accurate on its own.
    pub fn snapshot(&self) -> SchedStats {
        SchedStats {
            policy: self.policy,
            dispatches: self.dispatches.load(Ordering::Relaxed),
            idle_polls: self.idle_polls.load(Ordering::Relaxed),
            timer_preemptions: self.timer_preemptions.load(Ordering::Relaxed),
            voluntary_yields: self.voluntary_yields.load(Ordering::Relaxed),
            promotions: self.promotions.load(Ordering::Relaxed),
            demotions: self.demotions.load(Ordering::Relaxed),
            forks: self.forks.load(Ordering::Relaxed),
            exits: self.exits.load(Ordering::Relaxed),
            reaped: self.reaped.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_reflects_counters() {
        let stats = AtomicSchedStats::new(Policy::Feedback);
        stats.inc_dispatches();
        stats.inc_dispatches();
        stats.inc_demotions();
        stats.add_promotions(3);
        stats.add_promotions(0);

        let snap = stats.snapshot();
        assert_eq!(snap.policy, Policy::Feedback);
        assert_eq!(snap.dispatches, 2);
        assert_eq!(snap.demotions, 1);
        assert_eq!(snap.promotions, 3);
        assert_eq!(snap.exits, 0);
    }
}
