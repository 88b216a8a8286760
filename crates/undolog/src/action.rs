#![forbid(unsafe_code)]

//! Reversible actions recorded by a [`History`](crate::History).
//!
//! An [`Action`] is a named, self-describing operation that owns whatever
//! private state it needs to reverse itself (prior field values, removed
//! nodes, buffers). The history decides *when* `apply`/`reverse` run; the
//! action decides *how*.
//!
//! # Invariants
//!
//! - `apply()` followed by `reverse()` restores the prior host state
//! - `reverse()` followed by `apply()` restores the applied host state
//! - `retire()` runs at most once; it consumes the action
//!
//! # Failure Modes
//!
//! - **Recoverable**: a precondition no longer holds (target removed, state
//!   drifted). Return an [`ActionError`]; the history logs it and leaves the
//!   log untouched.
//! - **Unexpected**: anything else is a bug in the action. Panic; the
//!   history does not catch it.

use std::fmt;

/// Result of applying or reversing an action.
pub type ActionResult = Result<(), ActionError>;

/// Recoverable failure signalled by [`Action::apply`] or [`Action::reverse`].
///
/// Returning one of these rejects the operation without disturbing history
/// state. Programming errors should panic instead.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ActionError {
    /// The action could not be applied.
    #[error("could not apply: {0}")]
    ApplyFailed(String),
    /// The action could not be reversed.
    #[error("could not reverse: {0}")]
    ReverseFailed(String),
    /// A precondition for the operation does not hold in the current state.
    #[error("precondition failed: {0}")]
    PreconditionFailed(String),
    /// The object the action targets no longer exists.
    #[error("stale target: {0}")]
    StaleTarget(String),
}

impl ActionError {
    /// Shorthand for [`ActionError::ApplyFailed`].
    #[must_use]
    pub fn apply(reason: impl Into<String>) -> Self {
        Self::ApplyFailed(reason.into())
    }

    /// Shorthand for [`ActionError::ReverseFailed`].
    #[must_use]
    pub fn reverse(reason: impl Into<String>) -> Self {
        Self::ReverseFailed(reason.into())
    }
}

/// A reversible unit of change.
///
/// Implementors capture all state needed to apply and reverse themselves.
/// Ownership moves into the history on a successful execute and ends when
/// the history calls [`retire`](Action::retire).
pub trait Action {
    /// Short display name (e.g. "Rename layer").
    fn name(&self) -> &str;

    /// Longer human-readable description for UI display.
    fn description(&self) -> &str {
        self.name()
    }

    /// Apply the action's effect to host state.
    fn apply(&mut self) -> ActionResult;

    /// Reverse a previously applied effect.
    fn reverse(&mut self) -> ActionResult;

    /// Release resources held to support reversal.
    ///
    /// Called exactly once, when the action permanently leaves the history
    /// (eviction, branch invalidation, flush, or history drop). Must not
    /// fail in the normal case.
    fn retire(self: Box<Self>) {}
}

impl fmt::Debug for dyn Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Action")
            .field("name", &self.name())
            .field("description", &self.description())
            .finish()
    }
}

// ============================================================================
// Closure-backed action
// ============================================================================

/// Callback type for apply/reverse steps.
pub type StepFn = Box<dyn FnMut() -> ActionResult>;
/// Callback type for the retire step.
pub type RetireFn = Box<dyn FnOnce()>;

/// An action whose behavior is supplied as closures.
///
/// Useful when the call site already holds handles to the state it edits
/// and does not want to declare a dedicated type.
///
/// ```
/// use std::cell::Cell;
/// use std::rc::Rc;
/// use undolog::{FnAction, History};
///
/// let value = Rc::new(Cell::new(1));
/// let (a, r) = (Rc::clone(&value), Rc::clone(&value));
/// let action = FnAction::new("Set value")
///     .with_apply(move || { a.set(2); Ok(()) })
///     .with_reverse(move || { r.set(1); Ok(()) });
///
/// let mut history = History::new(10);
/// let _ = history.execute_action(Box::new(action));
/// assert_eq!(value.get(), 2);
/// let _ = history.undo();
/// assert_eq!(value.get(), 1);
/// ```
pub struct FnAction {
    name: String,
    description: Option<String>,
    apply: Option<StepFn>,
    reverse: Option<StepFn>,
    retire: Option<RetireFn>,
}

impl fmt::Debug for FnAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnAction")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("has_apply", &self.apply.is_some())
            .field("has_reverse", &self.reverse.is_some())
            .field("has_retire", &self.retire.is_some())
            .finish()
    }
}

impl FnAction {
    /// Create an action with no callbacks.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            apply: None,
            reverse: None,
            retire: None,
        }
    }

    /// Set the description shown in UI (defaults to the name).
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the apply callback.
    #[must_use]
    pub fn with_apply<F>(mut self, f: F) -> Self
    where
        F: FnMut() -> ActionResult + 'static,
    {
        self.apply = Some(Box::new(f));
        self
    }

    /// Set the reverse callback.
    #[must_use]
    pub fn with_reverse<F>(mut self, f: F) -> Self
    where
        F: FnMut() -> ActionResult + 'static,
    {
        self.reverse = Some(Box::new(f));
        self
    }

    /// Set the retire callback.
    #[must_use]
    pub fn with_retire<F>(mut self, f: F) -> Self
    where
        F: FnOnce() + 'static,
    {
        self.retire = Some(Box::new(f));
        self
    }
}

impl Action for FnAction {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        self.description.as_deref().unwrap_or(&self.name)
    }

    fn apply(&mut self) -> ActionResult {
        match self.apply.as_mut() {
            Some(apply) => apply(),
            None => Err(ActionError::PreconditionFailed(
                "no apply callback set".to_string(),
            )),
        }
    }

    fn reverse(&mut self) -> ActionResult {
        match self.reverse.as_mut() {
            Some(reverse) => reverse(),
            None => Err(ActionError::PreconditionFailed(
                "no reverse callback set".to_string(),
            )),
        }
    }

    fn retire(self: Box<Self>) {
        if let Some(retire) = self.retire {
            retire();
        }
    }
}

// ============================================================================
// Batch
// ============================================================================

/// A group of actions that apply and reverse as a single history entry.
///
/// Application is all-or-nothing: if a child fails, the children already
/// applied are reversed (newest first) before the error is returned.
/// Reversal mirrors this by re-applying the children already reversed.
///
/// # Panics
///
/// If a rollback step itself fails, the batch can no longer restore host
/// state to either end, so `apply`/`reverse` panic instead of reporting a
/// recoverable error.
pub struct ActionBatch {
    name: String,
    /// Children in application order.
    actions: Vec<Box<dyn Action>>,
}

impl fmt::Debug for ActionBatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionBatch")
            .field("name", &self.name)
            .field("actions_count", &self.actions.len())
            .finish()
    }
}

impl ActionBatch {
    /// Create an empty batch.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            actions: Vec::new(),
        }
    }

    /// Append a child action. Children apply in insertion order.
    pub fn push(&mut self, action: Box<dyn Action>) {
        self.actions.push(action);
    }

    /// Builder form of [`push`](Self::push).
    #[must_use]
    pub fn with(mut self, action: Box<dyn Action>) -> Self {
        self.push(action);
        self
    }

    /// Number of child actions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    /// Whether the batch has no children.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

impl Action for ActionBatch {
    fn name(&self) -> &str {
        &self.name
    }

    fn apply(&mut self) -> ActionResult {
        for i in 0..self.actions.len() {
            if let Err(err) = self.actions[i].apply() {
                for done in self.actions[..i].iter_mut().rev() {
                    if let Err(rollback) = done.reverse() {
                        rollback_failed(&self.name, done.name(), &err, &rollback);
                    }
                }
                return Err(err);
            }
        }
        Ok(())
    }

    fn reverse(&mut self) -> ActionResult {
        let len = self.actions.len();
        for i in (0..len).rev() {
            if let Err(err) = self.actions[i].reverse() {
                for done in self.actions[i + 1..].iter_mut() {
                    if let Err(rollback) = done.apply() {
                        rollback_failed(&self.name, done.name(), &err, &rollback);
                    }
                }
                return Err(err);
            }
        }
        Ok(())
    }

    fn retire(self: Box<Self>) {
        for action in self.actions {
            action.retire();
        }
    }
}

/// A batch left partially applied cannot be reported as a clean rejection.
fn rollback_failed(batch: &str, action: &str, cause: &ActionError, rollback: &ActionError) -> ! {
    tracing::error!(
        batch,
        action,
        cause = %cause,
        error = %rollback,
        "batch rollback step failed"
    );
    panic!("batch {batch:?} rollback failed at {action:?} ({rollback}) after: {cause}");
}

// ============================================================================
// Tests
// ============================================================================
