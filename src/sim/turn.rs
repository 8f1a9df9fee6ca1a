/// Turn notifier: deferred callbacks keyed on simulated turns.
///
/// A turn is one simulation step (`turn_length_ms` of game time). Targets
/// register for a future turn; `advance()` moves the clock forward one turn
/// and hands back every target that became due, in registration order.
/// Dispatching the callback is the caller's job (see `World::step`), so no
/// borrow of the notifier is held while a listener runs.
///
/// The notifier is shared through `TurnNotifierHandle`, an explicitly
/// injected single-threaded handle (no process-wide state).

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use crate::domain::entity::EntityId;

/// Who to call back: an entity inside a named zone.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct TurnTarget {
    pub zone: String,
    pub entity: EntityId,
}

impl TurnTarget {
    pub fn new(zone: &str, entity: EntityId) -> Self {
        TurnTarget { zone: zone.to_string(), entity }
    }
}

#[derive(Debug)]
pub struct TurnNotifier {
    current_turn: u64,
    turn_length_ms: u64,
    pending: BTreeMap<u64, Vec<TurnTarget>>,
}

impl TurnNotifier {
    pub fn new(turn_length_ms: u64) -> Self {
        TurnNotifier {
            current_turn: 0,
            turn_length_ms: turn_length_ms.max(1),
            pending: BTreeMap::new(),
        }
    }

    pub fn current_turn(&self) -> u64 {
        self.current_turn
    }

    pub fn turn_length_ms(&self) -> u64 {
        self.turn_length_ms
    }

    /// Whole turns covering `seconds` of game time (at least one).
    pub fn turns_for_seconds(&self, seconds: u32) -> u64 {
        (seconds as u64 * 1000 / self.turn_length_ms).max(1)
    }

    /// Register `target` to be called back `turns` turns from now.
    /// Zero is treated as "next turn". Returns the turn it will fire on.
    pub fn notify_in_turns(&mut self, turns: u64, target: TurnTarget) -> u64 {
        let due = self.current_turn + turns.max(1);
        tracing::trace!("turn notifier: {:?} due on turn {}", target, due);
        self.pending.entry(due).or_default().push(target);
        due
    }

    pub fn notify_in_seconds(&mut self, seconds: u32, target: TurnTarget) -> u64 {
        let turns = self.turns_for_seconds(seconds);
        self.notify_in_turns(turns, target)
    }

    /// Drop every pending registration of `target`. Returns true if any existed.
    pub fn dont_notify(&mut self, target: &TurnTarget) -> bool {
        let mut removed = false;
        self.pending.retain(|_, targets| {
            let before = targets.len();
            targets.retain(|t| t != target);
            removed |= targets.len() != before;
            !targets.is_empty()
        });
        if removed {
            tracing::trace!("turn notifier: cancelled {:?}", target);
        }
        removed
    }

    pub fn is_pending(&self, target: &TurnTarget) -> bool {
        self.pending_turn(target).is_some()
    }

    /// Earliest turn `target` is registered for.
    pub fn pending_turn(&self, target: &TurnTarget) -> Option<u64> {
        self.pending
            .iter()
            .find(|(_, targets)| targets.contains(target))
            .map(|(&turn, _)| turn)
    }

    /// Number of registrations of `target`.
    pub fn registrations(&self, target: &TurnTarget) -> usize {
        self.pending.values().flatten().filter(|t| *t == target).count()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.values().map(Vec::len).sum()
    }

    /// Advance one turn. Returns the new turn and the targets now due.
    pub fn advance(&mut self) -> (u64, Vec<TurnTarget>) {
        self.current_turn += 1;
        let due = self.pending.remove(&self.current_turn).unwrap_or_default();
        (self.current_turn, due)
    }
}

/// Shared, cloneable access to one `TurnNotifier`.
///
/// Each method borrows the notifier only for its own duration.
#[derive(Clone, Debug)]
pub struct TurnNotifierHandle(Rc<RefCell<TurnNotifier>>);

impl TurnNotifierHandle {
    pub fn new(notifier: TurnNotifier) -> Self {
        TurnNotifierHandle(Rc::new(RefCell::new(notifier)))
    }

    pub fn current_turn(&self) -> u64 {
        self.0.borrow().current_turn()
    }

    pub fn notify_in_turns(&self, turns: u64, target: TurnTarget) -> u64 {
        self.0.borrow_mut().notify_in_turns(turns, target)
    }

    pub fn notify_in_seconds(&self, seconds: u32, target: TurnTarget) -> u64 {
        self.0.borrow_mut().notify_in_seconds(seconds, target)
    }

    pub fn dont_notify(&self, target: &TurnTarget) -> bool {
        self.0.borrow_mut().dont_notify(target)
    }

    pub fn is_pending(&self, target: &TurnTarget) -> bool {
        self.0.borrow().is_pending(target)
    }

    pub fn pending_turn(&self, target: &TurnTarget) -> Option<u64> {
        self.0.borrow().pending_turn(target)
    }

    pub fn registrations(&self, target: &TurnTarget) -> usize {
        self.0.borrow().registrations(target)
    }

    pub fn pending_len(&self) -> usize {
        self.0.borrow().pending_len()
    }

    pub fn turns_for_seconds(&self, seconds: u32) -> u64 {
        self.0.borrow().turns_for_seconds(seconds)
    }

    pub fn advance(&self) -> (u64, Vec<TurnTarget>) {
        self.0.borrow_mut().advance()
    }
}
