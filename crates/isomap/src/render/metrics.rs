use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use tracing::warn;

static METRICS_LOCK_POISON_WARNED: AtomicBool = AtomicBool::new(false);

fn warn_metrics_lock_poison_once(operation: &'static str) {
    if METRICS_LOCK_POISON_WARNED
        .compare_exchange(false, true, Ordering::Relaxed, Ordering::Relaxed)
        .is_ok()
    {
        warn!(operation, "redraw_metrics_lock_poisoned_recovered_inner_value");
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RedrawMetricsSnapshot {
    pub full_redraws: u64,
    pub incremental_redraws: u64,
    pub last_blit_count: usize,
    pub last_pass_ms: f32,
    pub over_budget_passes: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassKind {
    Full,
    Incremental,
}

#[derive(Clone, Debug, Default)]
pub struct RedrawMetrics {
    snapshot: Arc<RwLock<RedrawMetricsSnapshot>>,
}

impl RedrawMetrics {
    pub fn snapshot(&self) -> RedrawMetricsSnapshot {
        match self.snapshot.read() {
            Ok(guard) => *guard,
            Err(poisoned) => {
                warn_metrics_lock_poison_once("read");
                *poisoned.into_inner()
            }
        }
    }

    pub(crate) fn record_pass(&self, kind: PassKind, blits: usize, elapsed: Duration, over_budget: bool) {
        let update = |snapshot: &mut RedrawMetricsSnapshot| {
            match kind {
                PassKind::Full => snapshot.full_redraws += 1,
                PassKind::Incremental => snapshot.incremental_redraws += 1,
            }
            snapshot.last_blit_count = blits;
            snapshot.last_pass_ms = elapsed.as_secs_f32() * 1000.0;
            if over_budget {
                snapshot.over_budget_passes += 1;
            }
        };
        match self.snapshot.write() {
            Ok(mut guard) => update(&mut guard),
            Err(poisoned) => {
                warn_metrics_lock_poison_once("write");
                let mut guard = poisoned.into_inner();
                update(&mut guard);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;

    fn poison_lock(lock: &RwLock<RedrawMetricsSnapshot>) {
        thread::scope(|scope| {
            let _ = scope
                .spawn(|| {
                    let _guard = lock.write().expect("write guard");
                    panic!("poison metrics lock");
                })
                .join();
        });
    }

    #[test]
    fn passes_are_counted_by_kind() {
        let metrics = RedrawMetrics::default();
        metrics.record_pass(PassKind::Full, 40, Duration::from_millis(3), false);
        metrics.record_pass(PassKind::Incremental, 6, Duration::from_millis(20), true);
        metrics.record_pass(PassKind::Incremental, 2, Duration::from_millis(1), false);

        let snapshot = metrics.clone().snapshot();
        assert_eq!(snapshot.full_redraws, 1);
        assert_eq!(snapshot.incremental_redraws, 2);
        assert_eq!(snapshot.last_blit_count, 2);
        assert_eq!(snapshot.over_budget_passes, 1);
        assert!((snapshot.last_pass_ms - 1.0).abs() < 0.001);
    }

    #[test]
    fn snapshot_recovers_after_poison_without_panic() {
        let metrics = RedrawMetrics::default();
        poison_lock(metrics.snapshot.as_ref());
        assert_eq!(metrics.snapshot(), RedrawMetricsSnapshot::default());
    }

    #[test]
    fn record_recovers_after_poison_without_panic() {
        let metrics = RedrawMetrics::default();
        poison_lock(metrics.snapshot.as_ref());
        metrics.record_pass(PassKind::Full, 9, Duration::ZERO, false);
        assert_eq!(metrics.snapshot().full_redraws, 1);
    }
}
