#![forbid(unsafe_code)]

//! End-to-end history scenarios against a small document model.
//!
//! Validates:
//! - Field edits capture prior/next values and restore them exactly
//! - Branching after undo discards the redo branch and its resources
//! - Batches appear as one entry and roll back atomically
//! - Stale targets are rejected without disturbing the log
//! - Subscribers track undo/redo availability from the event payload

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use undolog::{
    Action, ActionBatch, ActionError, ActionResult, History, HistoryConfig, HistoryEventKind,
};

// ============================================================================
// Document model
// ============================================================================

#[derive(Debug, Default, Clone, PartialEq, Eq)]
struct Document {
    fields: BTreeMap<String, String>,
}

type SharedDoc = Rc<RefCell<Document>>;

/// Count of live snapshot buffers held by actions, released on retire.
type Buffers = Rc<RefCell<usize>>;

/// Sets one field, remembering the previous value.
struct SetField {
    doc: SharedDoc,
    key: String,
    next: String,
    prior: Option<String>,
    buffers: Buffers,
    label: String,
}

impl SetField {
    fn new(doc: &SharedDoc, buffers: &Buffers, key: &str, value: &str) -> Box<Self> {
        *buffers.borrow_mut() += 1;
        Box::new(Self {
            doc: Rc::clone(doc),
            key: key.to_string(),
            next: value.to_string(),
            prior: None,
            buffers: Rc::clone(buffers),
            label: format!("Set {key} to {value}"),
        })
    }
}

impl Action for SetField {
    fn name(&self) -> &str {
        "Set field"
    }

    fn description(&self) -> &str {
        &self.label
    }

    fn apply(&mut self) -> ActionResult {
        let mut doc = self.doc.borrow_mut();
        self.prior = doc.fields.insert(self.key.clone(), self.next.clone());
        Ok(())
    }

    fn reverse(&mut self) -> ActionResult {
        let mut doc = self.doc.borrow_mut();
        if doc.fields.get(&self.key) != Some(&self.next) {
            return Err(ActionError::PreconditionFailed(format!(
                "field {} changed outside history",
                self.key
            )));
        }
        match self.prior.take() {
            Some(prior) => {
                doc.fields.insert(self.key.clone(), prior);
            }
            None => {
                doc.fields.remove(&self.key);
            }
        }
        Ok(())
    }

    fn retire(self: Box<Self>) {
        *self.buffers.borrow_mut() -= 1;
    }
}

/// Removes a field that must exist.
struct RemoveField {
    doc: SharedDoc,
    key: String,
    removed: Option<String>,
}

impl Action for RemoveField {
    fn name(&self) -> &str {
        "Remove field"
    }

    fn apply(&mut self) -> ActionResult {
        match self.doc.borrow_mut().fields.remove(&self.key) {
            Some(value) => {
                self.removed = Some(value);
                Ok(())
            }
            None => Err(ActionError::StaleTarget(self.key.clone())),
        }
    }

    fn reverse(&mut self) -> ActionResult {
        let value = self
            .removed
            .take()
            .ok_or_else(|| ActionError::reverse("nothing removed"))?;
        self.doc.borrow_mut().fields.insert(self.key.clone(), value);
        Ok(())
    }
}

fn snapshot(doc: &SharedDoc) -> Document {
    doc.borrow().clone()
}

// ============================================================================
// Scenarios
// ============================================================================

#[test]
fn edits_undo_and_redo_exactly() {
    let doc = SharedDoc::default();
    let buffers = Buffers::default();
    let mut history = History::new(16);

    let _ = history.execute_action(SetField::new(&doc, &buffers, "title", "Draft"));
    let after_first = snapshot(&doc);
    let _ = history.execute_action(SetField::new(&doc, &buffers, "title", "Final"));
    let _ = history.execute_action(SetField::new(&doc, &buffers, "author", "Ada"));
    let after_all = snapshot(&doc);

    let _ = history.undo();
    let _ = history.undo();
    assert_eq!(snapshot(&doc), after_first);

    let _ = history.undo();
    assert_eq!(snapshot(&doc), Document::default());

    while history.redo().is_applied() {}
    assert_eq!(snapshot(&doc), after_all);
    assert_eq!(*buffers.borrow(), 3);
}

#[test]
fn branching_releases_discarded_buffers() {
    let doc = SharedDoc::default();
    let buffers = Buffers::default();
    let mut history = History::new(16);

    for value in ["a", "b", "c"] {
        let _ = history.execute_action(SetField::new(&doc, &buffers, "k", value));
    }
    let _ = history.undo();
    let _ = history.undo();
    assert_eq!(*buffers.borrow(), 3, "undone actions keep their buffers");

    let _ = history.execute_action(SetField::new(&doc, &buffers, "k", "z"));
    assert_eq!(*buffers.borrow(), 2);
    assert!(history.redo().is_empty());
    assert_eq!(doc.borrow().fields["k"], "z");

    let _ = history.undo();
    assert_eq!(doc.borrow().fields["k"], "a");
}

#[test]
fn eviction_releases_buffers_and_bounds_undo_depth() {
    let doc = SharedDoc::default();
    let buffers = Buffers::default();
    let mut history = History::with_config(HistoryConfig::new(3));

    for i in 0..10 {
        let _ = history.execute_action(SetField::new(&doc, &buffers, "n", &i.to_string()));
    }
    assert_eq!(*buffers.borrow(), 3);
    assert_eq!(history.len(), 3);

    while history.undo().is_applied() {}
    // The oldest retained edit set "7"; undoing it restores "6".
    assert_eq!(doc.borrow().fields["n"], "6");

    history.flush();
    assert_eq!(*buffers.borrow(), 0);
}

#[test]
fn stale_target_is_rejected_silently() {
    let doc = SharedDoc::default();
    let buffers = Buffers::default();
    let mut history = History::new(8);
    let _ = history.execute_action(SetField::new(&doc, &buffers, "title", "Draft"));
    let before = snapshot(&doc);

    let outcome = history.execute_action(Box::new(RemoveField {
        doc: Rc::clone(&doc),
        key: "missing".to_string(),
        removed: None,
    }));

    assert_eq!(
        outcome.error(),
        Some(&ActionError::StaleTarget("missing".to_string()))
    );
    assert_eq!(snapshot(&doc), before);
    assert_eq!((history.past_count(), history.future_count()), (1, 0));

    // Once the target exists the same action can be offered again.
    let action = outcome.into_action().expect("rejected action handed back");
    doc.borrow_mut()
        .fields
        .insert("missing".to_string(), "now here".to_string());
    assert!(history.execute_action(action).is_applied());
    assert!(!doc.borrow().fields.contains_key("missing"));
}

#[test]
fn external_drift_blocks_undo() {
    let doc = SharedDoc::default();
    let buffers = Buffers::default();
    let mut history = History::new(8);
    let _ = history.execute_action(SetField::new(&doc, &buffers, "title", "Draft"));

    doc.borrow_mut()
        .fields
        .insert("title".to_string(), "Edited elsewhere".to_string());

    assert!(history.undo().is_rejected());
    assert_eq!(history.past_count(), 1);
    assert_eq!(doc.borrow().fields["title"], "Edited elsewhere");
}

#[test]
fn batch_is_one_entry_and_atomic() {
    let doc = SharedDoc::default();
    let buffers = Buffers::default();
    let mut history = History::new(8);

    let batch = ActionBatch::new("Fill form")
        .with(SetField::new(&doc, &buffers, "name", "Ada"))
        .with(SetField::new(&doc, &buffers, "role", "Engineer"));
    let _ = history.execute_action(Box::new(batch));
    assert_eq!(history.past_count(), 1);
    assert_eq!(history.past_names(1), vec!["Fill form"]);
    assert_eq!(doc.borrow().fields.len(), 2);

    let _ = history.undo();
    assert_eq!(snapshot(&doc), Document::default());

    let broken = ActionBatch::new("Broken")
        .with(SetField::new(&doc, &buffers, "name", "Grace"))
        .with(Box::new(RemoveField {
            doc: Rc::clone(&doc),
            key: "absent".to_string(),
            removed: None,
        }));
    let outcome = history.execute_action(Box::new(broken));
    assert!(outcome.is_rejected());
    assert_eq!(snapshot(&doc), Document::default(), "partial batch rolled back");
    assert_eq!(history.future_count(), 1, "rejected batch keeps the redo branch");
    assert_eq!(*buffers.borrow(), 3, "rejected batch is not retired by the history");

    // The caller owns the rejected batch and releases it.
    outcome
        .into_action()
        .expect("rejected action handed back")
        .retire();
    assert_eq!(*buffers.borrow(), 2);

    history.flush();
    assert_eq!(*buffers.borrow(), 0);
}

#[test]
fn subscribers_track_availability() {
    let doc = SharedDoc::default();
    let buffers = Buffers::default();
    let mut history = History::new(8);

    let controls = Rc::new(RefCell::new((false, false)));
    let kinds = Rc::new(RefCell::new(Vec::new()));
    let (c, k) = (Rc::clone(&controls), Rc::clone(&kinds));
    let _sub = history.subscribe(move |event| {
        *c.borrow_mut() = (event.can_undo(), event.can_redo());
        k.borrow_mut().push(event.kind);
    });

    let _ = history.execute_action(SetField::new(&doc, &buffers, "a", "1"));
    assert_eq!(*controls.borrow(), (true, false));

    let _ = history.undo();
    assert_eq!(*controls.borrow(), (false, true));

    let _ = history.redo();
    history.flush();
    assert_eq!(*controls.borrow(), (false, false));
    assert_eq!(
        *kinds.borrow(),
        vec![
            HistoryEventKind::Executed,
            HistoryEventKind::Undone,
            HistoryEventKind::Redone,
            HistoryEventKind::Flushed,
        ]
    );
}

#[test]
fn descriptions_are_exposed_for_menus() {
    let doc = SharedDoc::default();
    let buffers = Buffers::default();
    let mut history = History::new(8);
    let _ = history.execute_action(SetField::new(&doc, &buffers, "title", "Draft"));
    let _ = history.execute_action(SetField::new(&doc, &buffers, "title", "Final"));
    let _ = history.undo();

    let past: Vec<&str> = history
        .past_actions(5)
        .into_iter()
        .map(|a| a.description())
        .collect();
    let future: Vec<&str> = history
        .future_actions(5)
        .into_iter()
        .map(|a| a.description())
        .collect();
    assert_eq!(past, vec!["Set title to Draft"]);
    assert_eq!(future, vec!["Set title to Final"]);
}
