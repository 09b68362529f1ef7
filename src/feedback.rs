//! The feedback modal state machine: Closed -> Open -> (submit) -> Closed.
//!
//! Both triggers carry a click counter; a counter of zero or less is a
//! spurious callback firing (e.g. re-entry on an unrelated state change) and
//! is a strict no-op in every state.

use std::fmt;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::document::{Node, NodeKind, Region, UiStateStore};
use crate::error::{StateError, ValidationError};
use crate::mailer::NotificationGateway;
use crate::session::Session;

pub const WWID_LEN: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackReason {
    #[default]
    Bug,
    Enhancement,
}

impl fmt::Display for FeedbackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeedbackReason::Bug => write!(f, "bug"),
            FeedbackReason::Enhancement => write!(f, "enhancement"),
        }
    }
}

/// The transient draft a user types into the modal. Exists only between
/// modal-open and modal-close; discarded after submission or cancellation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackDraft {
    pub wwid: String,
    pub reason: FeedbackReason,
    pub comment: String,
}

impl FeedbackDraft {
    /// The WWID check is length-only: the charset is deliberately not
    /// constrained, matching the dashboard's long-standing behavior.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let len = self.wwid.chars().count();
        if len != WWID_LEN {
            return Err(ValidationError::WwidLength {
                expected: WWID_LEN,
                actual: len,
            });
        }
        if self.comment.is_empty() {
            return Err(ValidationError::EmptyComment);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedbackOutcome {
    Opened,
    Closed,
    NoOp,
}

/// Open the modal: clear the draft fields and the spinner slot, mark the
/// modal visible and re-arm the open button.
pub fn on_open_clicked(
    store: &mut UiStateStore,
    n_clicks: i64,
) -> Result<FeedbackOutcome, StateError> {
    if n_clicks <= 0 {
        return Ok(FeedbackOutcome::NoOp);
    }

    // Child regions first: the modal rewrite below carries them.
    store.write(Region::FeedbackFields, empty_fields())?;
    store.write(
        Region::Spinner,
        Node::new(Region::Spinner.node_id(), NodeKind::Spinner),
    )?;

    let mut modal = store.read(Region::Modal)?.clone();
    modal.set_prop("visible", json!(true));
    modal.set_prop("open_clicks", json!(0));
    store.write(Region::Modal, modal)?;

    Ok(FeedbackOutcome::Opened)
}

/// Close (submit) the modal. An invalid draft keeps the modal open with the
/// fields retained and sends nothing; no user-visible message is shown.
///
/// A valid draft is dispatched synchronously before the transition, with the
/// session lock released so a slow transport cannot block the session's other
/// handlers. A transport failure is logged but the transition still
/// completes.
pub fn on_close_clicked(
    session: &Mutex<Session>,
    notifier: &dyn NotificationGateway,
    n_clicks: i64,
    draft: &FeedbackDraft,
) -> Result<FeedbackOutcome, StateError> {
    if n_clicks <= 0 {
        return Ok(FeedbackOutcome::NoOp);
    }
    if let Err(err) = draft.validate() {
        log::debug!("feedback draft rejected: {err}");
        return Ok(FeedbackOutcome::NoOp);
    }

    if let Err(err) = notifier.send(draft) {
        log::error!("feedback notification failed: {err}");
    }

    let mut session = session.lock().unwrap();
    let store = &mut session.store;
    store.write(Region::FeedbackFields, empty_fields())?;
    store.write(
        Region::Spinner,
        Node::new(Region::Spinner.node_id(), NodeKind::Spinner),
    )?;
    let mut modal = store.read(Region::Modal)?.clone();
    modal.set_prop("visible", json!(false));
    modal.set_prop("close_clicks", json!(0));
    store.write(Region::Modal, modal)?;

    Ok(FeedbackOutcome::Closed)
}

fn empty_fields() -> Node {
    Node::new(Region::FeedbackFields.node_id(), NodeKind::Container).with_children(vec![
        Node::new("wwid", NodeKind::Input)
            .with_prop("placeholder", json!("WWID"))
            .with_prop("value", json!("")),
        Node::new("reason", NodeKind::Input)
            .with_prop("options", json!(["bug", "enhancement"]))
            .with_prop("value", json!(FeedbackReason::default().to_string())),
        Node::new("comments", NodeKind::Input)
            .with_prop("placeholder", json!("Comments"))
            .with_prop("value", json!("")),
    ])
}
