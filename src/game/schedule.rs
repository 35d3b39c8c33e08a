//! Deferred Actions
//!
//! Multi-stage ultimates (volleys, the rocket slam) queue follow-up actions
//! against the simulation's virtual clock. The tick loop drains whatever is
//! due once per tick, so deferred effects land in a fixed order relative to
//! everything else the tick does.

/// What a deferred action does once it comes due.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum DeferredKind {
    /// Release one pigeon from the flock
    FlockBird,
    /// Fire one round of the sandwich volley
    SubVolleyRound,
    /// Slam down after a rocket launch
    RocketSlam,
}

/// A queued action.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScheduledAction {
    /// Virtual time at which the action fires
    pub due: f64,
    /// Insertion order, breaks ties between equal due times
    pub seq: u64,
    /// Slot that queued the action
    pub owner: u8,
    /// Round the action belongs to
    pub round: u32,
    /// Action payload
    pub kind: DeferredKind,
}

/// Queue of deferred actions ordered by (due, seq).
#[derive(Clone, Debug, Default)]
pub struct Schedule {
    actions: Vec<ScheduledAction>,
    next_seq: u64,
}

impl Schedule {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an action.
    pub fn push(&mut self, due: f64, owner: u8, round: u32, kind: DeferredKind) {
        let action = ScheduledAction {
            due,
            seq: self.next_seq,
            owner,
            round,
            kind,
        };
        self.next_seq += 1;

        let idx = self.actions.partition_point(|a| {
            a.due.total_cmp(&action.due).then(a.seq.cmp(&action.seq)).is_le()
        });
        self.actions.insert(idx, action);
    }

    /// Remove and return every action due at or before `now`, in order.
    pub fn drain_due(&mut self, now: f64) -> Vec<ScheduledAction> {
        let split = self.actions.partition_point(|a| a.due <= now);
        self.actions.drain(..split).collect()
    }

    /// Number of pending actions.
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    /// Check if nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Drop everything.
    pub fn clear(&mut self) {
        self.actions.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drain_in_due_order() {
        let mut schedule = Schedule::new();
        schedule.push(0.3, 1, 1, DeferredKind::FlockBird);
        schedule.push(0.1, 2, 1, DeferredKind::RocketSlam);
        schedule.push(0.2, 1, 1, DeferredKind::SubVolleyRound);

        let due = schedule.drain_due(0.25);
        assert_eq!(due.len(), 2);
        assert_eq!(due[0].kind, DeferredKind::RocketSlam);
        assert_eq!(due[1].kind, DeferredKind::SubVolleyRound);
        assert_eq!(schedule.len(), 1);
    }

    #[test]
    fn test_ties_keep_insertion_order() {
        let mut schedule = Schedule::new();
        schedule.push(1.0, 1, 1, DeferredKind::FlockBird);
        schedule.push(1.0, 2, 1, DeferredKind::FlockBird);
        schedule.push(1.0, 3, 1, DeferredKind::FlockBird);

        let owners: Vec<u8> = schedule.drain_due(1.0).iter().map(|a| a.owner).collect();
        assert_eq!(owners, vec![1, 2, 3]);
        assert!(schedule.is_empty());
    }

    #[test]
    fn test_nothing_due_yet() {
        let mut schedule = Schedule::new();
        schedule.push(5.0, 1, 1, DeferredKind::RocketSlam);
        assert!(schedule.drain_due(4.99).is_empty());
        schedule.clear();
        assert!(schedule.is_empty());
    }
}
