//! Active-region selection with failover and failback.
//!
//! The coordinator owns the only piece of process-wide mutable routing state:
//! which region is active. Operations run concurrently against a snapshot of
//! that state; a transition only applies if no other transition happened
//! since the snapshot was taken, so a burst of failing operations produces a
//! single failover.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use edge_core::Region;
use serde::Serialize;

use crate::error::{FailoverError, StoreError};
use crate::health::{HealthProbe, HealthRegistry, RegionHealth};
use crate::record::CounterRecord;
use crate::regional::SharedStore;

/// Maximum number of transitions kept in history.
const HISTORY_LIMIT: usize = 32;

/// Which region operations are routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailoverState {
    /// Operations go to the primary region.
    UsingPrimary,
    /// Operations go to the DR region.
    UsingDr,
}

impl FailoverState {
    /// Active region for this state.
    pub fn region(self) -> Region {
        match self {
            Self::UsingPrimary => Region::Primary,
            Self::UsingDr => Region::Dr,
        }
    }

    /// State that routes to `region`.
    pub fn for_region(region: Region) -> Self {
        match region {
            Region::Primary => Self::UsingPrimary,
            Region::Dr => Self::UsingDr,
        }
    }
}

/// Kind of transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TransitionKind {
    /// Moved away from a failing region.
    Failover,
    /// Returned to the primary after it recovered.
    Failback,
}

/// A recorded state transition.
#[derive(Debug, Clone, Serialize)]
pub struct FailoverEvent {
    /// Region that was active.
    pub from: Region,
    /// Region that became active.
    pub to: Region,
    /// Failover or failback.
    pub kind: TransitionKind,
    /// Human-readable cause.
    pub reason: String,
    /// When the transition happened.
    pub at: DateTime<Utc>,
}

#[derive(Clone, Copy)]
enum Operation {
    Increment,
    Read,
}

impl Operation {
    fn name(self) -> &'static str {
        match self {
            Self::Increment => "increment",
            Self::Read => "read",
        }
    }
}

struct CoordinatorState {
    current: FailoverState,
    /// Bumped on every transition.
    generation: u64,
    history: VecDeque<FailoverEvent>,
}

/// Active state as seen at the start of an operation.
#[derive(Clone, Copy)]
struct Snapshot {
    current: FailoverState,
    generation: u64,
}

/// Routes counter operations to the active region and fails over between
/// the primary and DR stores.
pub struct FailoverCoordinator {
    primary: SharedStore,
    dr: SharedStore,
    registry: Arc<HealthRegistry>,
    failback_threshold: u32,
    state: Mutex<CoordinatorState>,
    /// Checks the primary on demand while running on DR.
    health_checker: Option<Arc<HealthProbe>>,
    checking_primary: AtomicBool,
}

impl FailoverCoordinator {
    /// Create a coordinator starting in [`FailoverState::UsingPrimary`].
    pub fn new(primary: SharedStore, dr: SharedStore, registry: Arc<HealthRegistry>) -> Self {
        Self {
            primary,
            dr,
            registry,
            failback_threshold: 3,
            state: Mutex::new(CoordinatorState {
                current: FailoverState::UsingPrimary,
                generation: 0,
                history: VecDeque::new(),
            }),
            health_checker: None,
            checking_primary: AtomicBool::new(false),
        }
    }

    /// Set how many consecutive successful primary checks trigger failback.
    pub fn with_failback_threshold(mut self, threshold: u32) -> Self {
        self.failback_threshold = threshold.max(1);
        self
    }

    /// Check the primary through `checker` when an operation on DR finds its
    /// last check older than the checker's interval.
    pub fn with_health_checker(mut self, checker: Arc<HealthProbe>) -> Self {
        self.health_checker = Some(checker);
        self
    }

    /// Atomically increment `key` in the active region.
    pub async fn increment(&self, key: &str) -> Result<CounterRecord, FailoverError> {
        self.execute(Operation::Increment, key).await
    }

    /// Read `key` from the active region.
    pub async fn read(&self, key: &str) -> Result<CounterRecord, FailoverError> {
        self.execute(Operation::Read, key).await
    }

    /// Current state.
    pub fn state(&self) -> FailoverState {
        self.lock().current
    }

    /// Active region.
    pub fn active_region(&self) -> Region {
        self.state().region()
    }

    /// Recorded transitions, oldest first.
    pub fn history(&self) -> Vec<FailoverEvent> {
        self.lock().history.iter().cloned().collect()
    }

    /// The health registry consulted for failback.
    pub fn registry(&self) -> &Arc<HealthRegistry> {
        &self.registry
    }

    /// Configured failback threshold.
    pub fn failback_threshold(&self) -> u32 {
        self.failback_threshold
    }

    // The state lock is never held across an await: store calls run on a
    // snapshot and transitions re-check the generation they started from.
    fn lock(&self) -> MutexGuard<'_, CoordinatorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn snapshot(&self) -> Snapshot {
        let state = self.lock();
        Snapshot {
            current: state.current,
            generation: state.generation,
        }
    }

    async fn execute(&self, op: Operation, key: &str) -> Result<CounterRecord, FailoverError> {
        let mut snapshot = self.snapshot();

        if snapshot.current == FailoverState::UsingDr {
            snapshot = self.try_failback(snapshot).await;
        }

        let active = snapshot.current.region();
        let active_err = match self.attempt(active, op, key).await {
            Ok(record) => return Ok(record),
            Err(e) => e,
        };

        let fallback = active.other();
        tracing::warn!(
            op = op.name(),
            region = %active,
            fallback = %fallback,
            error = %active_err,
            "Store operation failed; retrying in other region"
        );
        self.registry.mark_unreachable(active).await;

        match self.attempt(fallback, op, key).await {
            Ok(record) => {
                self.transition_from(
                    snapshot,
                    fallback,
                    TransitionKind::Failover,
                    active_err.to_string(),
                );
                Ok(record)
            }
            Err(fallback_err) => {
                self.registry.mark_unreachable(fallback).await;
                tracing::error!(
                    op = op.name(),
                    active_error = %active_err,
                    fallback_error = %fallback_err,
                    "All regions exhausted"
                );
                Err(FailoverError::RegionsExhausted {
                    active: active_err,
                    fallback: fallback_err,
                })
            }
        }
    }

    async fn try_failback(&self, snapshot: Snapshot) -> Snapshot {
        let mut primary = self.registry.get(Region::Primary).await;

        if primary.consecutive_successes < self.failback_threshold {
            if let Some(checker) = self.due_checker(&primary) {
                // One on-demand check at a time; others use the registry as is.
                if !self.checking_primary.swap(true, Ordering::AcqRel) {
                    primary = checker.check_region(Region::Primary).await;
                    self.checking_primary.store(false, Ordering::Release);
                }
            }
        }

        if primary.reachable && primary.consecutive_successes >= self.failback_threshold {
            let reason = format!(
                "primary passed {} consecutive health checks",
                primary.consecutive_successes
            );
            return self.transition_from(snapshot, Region::Primary, TransitionKind::Failback, reason);
        }
        snapshot
    }

    fn due_checker(&self, primary: &RegionHealth) -> Option<&Arc<HealthProbe>> {
        let checker = self.health_checker.as_ref()?;
        let due = match primary.last_checked_at {
            None => true,
            Some(at) => (Utc::now() - at)
                .to_std()
                .map(|elapsed| elapsed >= checker.interval())
                .unwrap_or(false),
        };
        due.then_some(checker)
    }

    async fn attempt(&self, region: Region, op: Operation, key: &str) -> Result<CounterRecord, StoreError> {
        let store = match region {
            Region::Primary => &self.primary,
            Region::Dr => &self.dr,
        };

        match op {
            Operation::Increment => store.increment(key).await,
            Operation::Read => store.read(key).await,
        }
    }

    /// Move to `to` unless another operation transitioned since `seen`.
    fn transition_from(&self, seen: Snapshot, to: Region, kind: TransitionKind, reason: String) -> Snapshot {
        let mut state = self.lock();
        if state.generation != seen.generation {
            return Snapshot {
                current: state.current,
                generation: state.generation,
            };
        }

        let from = state.current.region();
        state.current = FailoverState::for_region(to);
        state.generation += 1;

        match kind {
            TransitionKind::Failover => {
                tracing::warn!(from = %from, to = %to, reason = %reason, "Failed over")
            }
            TransitionKind::Failback => {
                tracing::info!(from = %from, to = %to, reason = %reason, "Failed back")
            }
        }

        if state.history.len() == HISTORY_LIMIT {
            state.history.pop_front();
        }
        state.history.push_back(FailoverEvent {
            from,
            to,
            kind,
            reason,
            at: Utc::now(),
        });

        Snapshot {
            current: state.current,
            generation: state.generation,
        }
    }
}
