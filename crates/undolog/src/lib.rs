#![forbid(unsafe_code)]

//! Bounded, branching undo/redo history.
//!
//! `undolog` records reversible [`Action`]s in a capacity-bounded
//! [`History`]. The history applies and reverses actions on demand, evicts
//! the oldest entry once full, and discards the redo branch when a new
//! action is recorded after an undo.
//!
//! # Key Components
//!
//! - [`Action`] - Trait for reversible, named operations
//! - [`History`] - Ordered log with a past/future cursor
//! - [`HistoryConfig`] - Construction-time capacity
//! - [`Subscription`] - RAII guard for change notifications
//!
//! # Quick Start
//!
//! ```
//! use std::cell::RefCell;
//! use std::rc::Rc;
//! use undolog::{FnAction, History};
//!
//! let doc = Rc::new(RefCell::new(String::from("hello")));
//! let (a, r) = (Rc::clone(&doc), Rc::clone(&doc));
//! let append = FnAction::new("Append")
//!     .with_apply(move || { a.borrow_mut().push_str(" world"); Ok(()) })
//!     .with_reverse(move || { r.borrow_mut().truncate(5); Ok(()) });
//!
//! let mut history = History::new(50);
//! let _ = history.execute_action(Box::new(append));
//! assert_eq!(*doc.borrow(), "hello world");
//!
//! let _ = history.undo();
//! assert_eq!(*doc.borrow(), "hello");
//! assert_eq!(history.future_count(), 1);
//! ```
//!
//! # Failure Model
//!
//! `apply`/`reverse` return [`ActionResult`]. An [`ActionError`] is a
//! recoverable rejection: the history logs it via `tracing`, changes
//! nothing, and fires no notification. Panics propagate untouched.

pub mod action;
pub mod config;
pub mod history;
pub mod notify;

pub use action::{Action, ActionBatch, ActionError, ActionResult, FnAction};
pub use config::{ConfigError, HistoryConfig};
pub use history::{History, Outcome};
pub use notify::{HistoryEvent, HistoryEventKind, Subscription};
