#![forbid(unsafe_code)]

//! Bounded, branching action history.
//!
//! [`History`] keeps a single chronological log of actions and a cursor
//! splitting it into an applied *past* prefix and an undone *future*
//! suffix:
//!
//! - **Capacity**: oldest actions are evicted once the log is full
//! - **Branching**: recording a new action retires the whole future
//! - **Rejection**: a recoverable apply/reverse failure leaves the log as is
//!
//! # Invariants
//!
//! 1. `past_count() + future_count() == len() <= capacity()`
//! 2. Past entries precede future entries; eviction removes from the head
//! 3. Every action that leaves the log is retired exactly once
//! 4. `future_count() == 0` right after any successful execute
//!
//! # Memory Model
//!
//! Actions live in a `VecDeque` so eviction from the head is O(1). The
//! cursor is an index: `[0, cursor)` is past, `[cursor, len)` is future.
//!
//! ```text
//! execute(A..D), capacity 3        A retired
//! ┌───────────────────────────────┐
//! │ [B, C, D]          cursor = 3 │
//! └───────────────────────────────┘
//!
//! undo()
//! ┌───────────────────────────────┐
//! │ [B, C | D]         cursor = 2 │
//! └───────────────────────────────┘
//!
//! execute(E)  <-- new branch, D retired
//! ┌───────────────────────────────┐
//! │ [B, C, E]          cursor = 3 │
//! └───────────────────────────────┘
//! ```

use std::collections::VecDeque;
use std::fmt;

use tracing::{debug, debug_span, warn};

use crate::action::{Action, ActionError};
use crate::config::HistoryConfig;
use crate::notify::{HistoryEvent, HistoryEventKind, Observers, Subscription};

/// What happened to a history operation.
///
/// The history's own state never depends on callers inspecting this; it is
/// reported so hosts can surface a message for rejected operations, and so
/// a rejected execute can hand its action back.
#[derive(Debug)]
#[must_use = "a rejected execute returns its action, and rejections are otherwise silent"]
pub enum Outcome {
    /// The operation ran and the history changed.
    Applied,
    /// Nothing to do (no action given, nothing to undo or redo).
    Empty,
    /// The action signalled a recoverable failure; nothing changed.
    Rejected {
        /// Failure reported by the action.
        error: ActionError,
        /// The offered action, when an execute was rejected. It never
        /// entered the log, so ownership stays with the caller. `None` for
        /// undo/redo, whose action remains in the log.
        action: Option<Box<dyn Action>>,
    },
}

impl Outcome {
    /// Whether the history changed.
    #[must_use]
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied)
    }

    /// Whether there was nothing to do.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// Whether an action refused the operation.
    #[must_use]
    pub fn is_rejected(&self) -> bool {
        matches!(self, Self::Rejected { .. })
    }

    /// The recoverable failure, if the operation was rejected.
    #[must_use]
    pub fn error(&self) -> Option<&ActionError> {
        match self {
            Self::Rejected { error, .. } => Some(error),
            _ => None,
        }
    }

    /// Take back the action of a rejected execute.
    #[must_use]
    pub fn into_action(self) -> Option<Box<dyn Action>> {
        match self {
            Self::Rejected { action, .. } => action,
            _ => None,
        }
    }

    fn rejected(error: ActionError) -> Self {
        Self::Rejected {
            error,
            action: None,
        }
    }
}

/// Bounded log of reversible actions with undo/redo.
///
/// Not internally synchronized; hosts sharing a history across threads
/// must serialize every call behind one lock.
pub struct History {
    /// Chronological log, oldest at front.
    actions: VecDeque<Box<dyn Action>>,
    /// Number of applied actions; index of the first future action.
    cursor: usize,
    config: HistoryConfig,
    observers: Observers,
    /// Bumped once per fired notification.
    revision: u64,
}

impl fmt::Debug for History {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("History")
            .field("past_count", &self.past_count())
            .field("future_count", &self.future_count())
            .field("capacity", &self.config.capacity)
            .field("revision", &self.revision)
            .field("observers", &self.observers)
            .finish()
    }
}

impl Default for History {
    fn default() -> Self {
        Self::with_config(HistoryConfig::default())
    }
}

impl Drop for History {
    fn drop(&mut self) {
        for action in self.actions.drain(..) {
            action.retire();
        }
    }
}

impl History {
    /// Create a history holding at most `capacity` actions (minimum 1).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self::with_config(HistoryConfig::new(capacity))
    }

    /// Create a history from a configuration.
    #[must_use]
    pub fn with_config(config: HistoryConfig) -> Self {
        let config = config.validated();
        Self {
            actions: VecDeque::with_capacity(config.capacity.min(1024) + 1),
            cursor: 0,
            config,
            observers: Observers::default(),
            revision: 0,
        }
    }

    // ========================================================================
    // Core Operations
    // ========================================================================

    /// Apply `action` and record it, if present.
    ///
    /// `None` is a no-op. See [`execute_action`](Self::execute_action).
    pub fn execute(&mut self, action: Option<Box<dyn Action>>) -> Outcome {
        match action {
            Some(action) => self.execute_action(action),
            None => Outcome::Empty,
        }
    }

    /// Apply `action` and record it as the newest past entry.
    ///
    /// On a recoverable failure the history is left untouched and the action
    /// is returned in [`Outcome::Rejected`]; it is not retired, since it
    /// never entered the log. On success the future
    /// segment is retired and, if the log overflows, the oldest entry is
    /// evicted and retired.
    pub fn execute_action(&mut self, mut action: Box<dyn Action>) -> Outcome {
        let _span = debug_span!("undolog.execute", action = action.name()).entered();

        if let Err(err) = action.apply() {
            warn!(
                operation = "execute",
                action = action.name(),
                error = %err,
                "action rejected"
            );
            return Outcome::Rejected {
                error: err,
                action: Some(action),
            };
        }

        self.invalidate_future();
        self.actions.push_back(action);
        self.cursor = self.actions.len();

        while self.actions.len() > self.config.capacity {
            if let Some(oldest) = self.actions.pop_front() {
                debug!(action = oldest.name(), "evicting oldest action");
                self.cursor -= 1;
                oldest.retire();
            }
        }

        self.changed(HistoryEventKind::Executed);
        Outcome::Applied
    }

    /// Reverse the most recently applied action.
    ///
    /// The reversed action stays in the log as the next redo candidate.
    pub fn undo(&mut self) -> Outcome {
        if self.cursor == 0 {
            return Outcome::Empty;
        }
        let action = &mut self.actions[self.cursor - 1];
        if let Err(err) = action.reverse() {
            warn!(
                operation = "undo",
                action = action.name(),
                error = %err,
                "action rejected"
            );
            return Outcome::rejected(err);
        }
        debug!(action = action.name(), "undone");
        self.cursor -= 1;
        self.changed(HistoryEventKind::Undone);
        Outcome::Applied
    }

    /// Re-apply the next undone action.
    pub fn redo(&mut self) -> Outcome {
        if self.cursor == self.actions.len() {
            return Outcome::Empty;
        }
        let action = &mut self.actions[self.cursor];
        if let Err(err) = action.apply() {
            warn!(
                operation = "redo",
                action = action.name(),
                error = %err,
                "action rejected"
            );
            return Outcome::rejected(err);
        }
        debug!(action = action.name(), "redone");
        self.cursor += 1;
        self.changed(HistoryEventKind::Redone);
        Outcome::Applied
    }

    /// Retire every action (oldest first) and clear the log.
    ///
    /// Always notifies, even when the log was already empty.
    pub fn flush(&mut self) {
        let retired = self.actions.len();
        for action in self.actions.drain(..) {
            action.retire();
        }
        self.cursor = 0;
        debug!(retired, "history flushed");
        self.changed(HistoryEventKind::Flushed);
    }

    /// Check if undo is available.
    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.past_count() > 0
    }

    /// Check if redo is available.
    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.future_count() > 0
    }

    // ========================================================================
    // Notification
    // ========================================================================

    /// Register a callback fired after every successful execute, undo,
    /// redo, and flush. Dropping the returned guard unsubscribes.
    pub fn subscribe(&mut self, callback: impl Fn(&HistoryEvent) + 'static) -> Subscription {
        self.observers.subscribe(callback)
    }

    /// Number of registered subscribers, including dropped ones not yet
    /// pruned by a notification.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.observers.len()
    }

    /// Counter bumped once per notification. Useful for dirty-checking.
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.revision
    }

    // ========================================================================
    // Info
    // ========================================================================

    /// Number of applied (undoable) actions.
    #[must_use]
    pub fn past_count(&self) -> usize {
        self.cursor
    }

    /// Number of undone (redoable) actions.
    #[must_use]
    pub fn future_count(&self) -> usize {
        self.actions.len() - self.cursor
    }

    /// Total actions retained.
    #[must_use]
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    /// Whether the log holds no actions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Maximum number of actions retained.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.config.capacity
    }

    /// Get the current configuration.
    #[must_use]
    pub fn config(&self) -> &HistoryConfig {
        &self.config
    }

    /// Up to `count` past actions, most recently applied first.
    pub fn past_actions(&self, count: usize) -> Vec<&dyn Action> {
        self.actions
            .range(..self.cursor)
            .rev()
            .take(count)
            .map(|a| a.as_ref())
            .collect()
    }

    /// Up to `count` future actions, next to redo first.
    pub fn future_actions(&self, count: usize) -> Vec<&dyn Action> {
        self.actions
            .range(self.cursor..)
            .take(count)
            .map(|a| a.as_ref())
            .collect()
    }

    /// Names of up to `limit` past actions, most recent first.
    pub fn past_names(&self, limit: usize) -> Vec<&str> {
        self.past_actions(limit)
            .into_iter()
            .map(|a| a.name())
            .collect()
    }

    /// Names of up to `limit` future actions, next to redo first.
    pub fn future_names(&self, limit: usize) -> Vec<&str> {
        self.future_actions(limit)
            .into_iter()
            .map(|a| a.name())
            .collect()
    }

    /// Name of the action the next undo would reverse.
    #[must_use]
    pub fn next_undo_name(&self) -> Option<&str> {
        self.cursor
            .checked_sub(1)
            .and_then(|i| self.actions.get(i))
            .map(|a| a.name())
    }

    /// Name of the action the next redo would apply.
    #[must_use]
    pub fn next_redo_name(&self) -> Option<&str> {
        self.actions.get(self.cursor).map(|a| a.name())
    }

    // ========================================================================
    // Maintenance
    // ========================================================================

    /// Retire and drop every future action (oldest first).
    fn invalidate_future(&mut self) {
        if self.cursor == self.actions.len() {
            return;
        }
        let dropped = self.actions.len() - self.cursor;
        for action in self.actions.drain(self.cursor..) {
            action.retire();
        }
        debug!(dropped, "redo branch invalidated");
    }

    fn changed(&mut self, kind: HistoryEventKind) {
        self.revision += 1;
        let event = HistoryEvent {
            kind,
            past_count: self.past_count(),
            future_count: self.future_count(),
            revision: self.revision,
        };
        self.observers.notify(&event);
    }
}

// ============================================================================
// Tests
// ============================================================================
