//! The server-held document tree and its addressed accessors.
//!
//! One `UiStateStore` exists per session and is the single source of truth
//! for what that user currently sees. Flows never index into the tree by
//! position; they read and write named [`Region`]s, so a malformed write from
//! one flow can never silently corrupt another flow's part of the tree.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::StateError;

/// Kind tag for a document node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Container,
    Button,
    Input,
    Modal,
    Spinner,
    Table,
    Text,
    Upload,
}

/// One node of the document tree: an identifier, a kind tag, a property
/// bag and ordered children.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    pub kind: NodeKind,
    #[serde(default)]
    pub props: BTreeMap<String, Value>,
    #[serde(default)]
    pub children: Vec<Node>,
}

impl Node {
    pub fn new(id: impl Into<String>, kind: NodeKind) -> Self {
        Node {
            id: id.into(),
            kind,
            props: BTreeMap::new(),
            children: Vec::new(),
        }
    }

    pub fn with_prop(mut self, key: &str, value: Value) -> Self {
        self.props.insert(key.to_string(), value);
        self
    }

    pub fn with_children(mut self, children: Vec<Node>) -> Self {
        self.children = children;
        self
    }

    pub fn prop(&self, key: &str) -> Option<&Value> {
        self.props.get(key)
    }

    pub fn set_prop(&mut self, key: &str, value: Value) {
        self.props.insert(key.to_string(), value);
    }

    pub fn prop_str(&self, key: &str) -> Option<&str> {
        self.prop(key).and_then(Value::as_str)
    }

    pub fn prop_u64(&self, key: &str) -> Option<u64> {
        self.prop(key).and_then(Value::as_u64)
    }

    pub fn prop_bool(&self, key: &str) -> Option<bool> {
        self.prop(key).and_then(Value::as_bool)
    }

    /// Depth-first search for a node by identifier.
    pub fn find(&self, id: &str) -> Option<&Node> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(id))
    }

    pub fn find_mut(&mut self, id: &str) -> Option<&mut Node> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter_mut().find_map(|c| c.find_mut(id))
    }
}

/// Named regions of the document tree. Each maps to a stable node id in the
/// session skeleton; flows address the tree only through these.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Region {
    Upload,
    ComputeButton,
    RootIdInput,
    Modal,
    FeedbackFields,
    Spinner,
}

impl Region {
    pub const fn node_id(self) -> &'static str {
        match self {
            Region::Upload => "output-data-upload",
            Region::ComputeButton => "button-compute-and-download",
            Region::RootIdInput => "root-ip",
            Region::Modal => "feedback-modal",
            Region::FeedbackFields => "feedback-fields",
            Region::Spinner => "spinner-submit",
        }
    }
}

/// Result of a region write: whether the tree actually changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Applied,
    Unchanged,
}

/// The per-session document tree plus a dirty flag consumed by the render
/// layer. Created once at session start from a fixed skeleton and mutated in
/// place by the flows until the session ends.
#[derive(Debug)]
pub struct UiStateStore {
    root: Node,
    dirty: bool,
}

impl UiStateStore {
    /// Build the fixed session skeleton: hidden upload area, compute button
    /// with root-id input, and the feedback modal with its fields and
    /// spinner slot.
    pub fn with_skeleton() -> Self {
        let upload_area = Node::new(Region::Upload.node_id(), NodeKind::Container)
            .with_prop("visible", json!(false));

        let compute_span = Node::new("press-compute-span", NodeKind::Container).with_children(vec![
            Node::new(Region::ComputeButton.node_id(), NodeKind::Button)
                .with_prop("n_clicks", json!(0)),
            Node::new(Region::RootIdInput.node_id(), NodeKind::Input)
                .with_prop("placeholder", json!("Root IP"))
                .with_prop("value", json!("")),
        ]);

        let modal = Node::new(Region::Modal.node_id(), NodeKind::Modal)
            .with_prop("title", json!("Feedback"))
            .with_prop("visible", json!(false))
            .with_prop("open_clicks", json!(0))
            .with_prop("close_clicks", json!(0))
            .with_children(vec![
                Node::new(Region::FeedbackFields.node_id(), NodeKind::Container).with_children(
                    vec![
                        Node::new("wwid", NodeKind::Input)
                            .with_prop("placeholder", json!("WWID"))
                            .with_prop("value", json!("")),
                        Node::new("reason", NodeKind::Input)
                            .with_prop("options", json!(["bug", "enhancement"]))
                            .with_prop("value", json!("bug")),
                        Node::new("comments", NodeKind::Input)
                            .with_prop("placeholder", json!("Comments"))
                            .with_prop("value", json!("")),
                    ],
                ),
                Node::new(Region::Spinner.node_id(), NodeKind::Spinner),
            ]);

        let upload_bar = Node::new("upload-data", NodeKind::Upload).with_prop(
            "label",
            json!("Drag and Drop / Select locally - SoC Skeleton Architecture File"),
        );

        let root = Node::new("app", NodeKind::Container)
            .with_prop("title", json!("SoC Connectivity Analyzer"))
            .with_children(vec![upload_area, compute_span, modal, upload_bar]);

        UiStateStore { root, dirty: false }
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    /// Read the subtree a region addresses.
    pub fn read(&self, region: Region) -> Result<&Node, StateError> {
        self.root
            .find(region.node_id())
            .ok_or(StateError::MissingRegion(region.node_id()))
    }

    /// Replace exactly the addressed subtree. The region's node id is pinned
    /// onto the new subtree so a flow write can never break addressing.
    /// Sibling nodes are untouched. Writing an identical subtree reports
    /// [`WriteOutcome::Unchanged`] and does not mark the tree dirty.
    pub fn write(&mut self, region: Region, mut subtree: Node) -> Result<WriteOutcome, StateError> {
        subtree.id = region.node_id().to_string();
        let slot = self
            .root
            .find_mut(region.node_id())
            .ok_or(StateError::MissingRegion(region.node_id()))?;
        if *slot == subtree {
            return Ok(WriteOutcome::Unchanged);
        }
        *slot = subtree;
        self.dirty = true;
        Ok(WriteOutcome::Applied)
    }

    /// Consume the dirty flag; the render layer re-renders when it was set.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skeleton_exposes_every_region() {
        let store = UiStateStore::with_skeleton();
        for region in [
            Region::Upload,
            Region::ComputeButton,
            Region::RootIdInput,
            Region::Modal,
            Region::FeedbackFields,
            Region::Spinner,
        ] {
            assert!(store.read(region).is_ok(), "{} missing", region.node_id());
        }
    }

    #[test]
    fn write_replaces_only_the_addressed_subtree() {
        let mut store = UiStateStore::with_skeleton();
        let before_modal = store.read(Region::Modal).unwrap().clone();

        let replacement = Node::new("anything", NodeKind::Container)
            .with_prop("visible", json!(true))
            .with_children(vec![Node::new("uploaded-table", NodeKind::Table)]);
        let outcome = store.write(Region::Upload, replacement).unwrap();

        assert_eq!(outcome, WriteOutcome::Applied);
        // Id is pinned regardless of what the caller put on the subtree.
        let upload = store.read(Region::Upload).unwrap();
        assert_eq!(upload.id, Region::Upload.node_id());
        assert_eq!(upload.prop_bool("visible"), Some(true));
        // Siblings untouched.
        assert_eq!(*store.read(Region::Modal).unwrap(), before_modal);
    }

    #[test]
    fn identical_write_is_unchanged_and_not_dirty() {
        let mut store = UiStateStore::with_skeleton();
        store.take_dirty();

        let same = store.read(Region::RootIdInput).unwrap().clone();
        let outcome = store.write(Region::RootIdInput, same).unwrap();

        assert_eq!(outcome, WriteOutcome::Unchanged);
        assert!(!store.take_dirty());
    }

    #[test]
    fn applied_write_marks_dirty_once() {
        let mut store = UiStateStore::with_skeleton();
        let mut input = store.read(Region::RootIdInput).unwrap().clone();
        input.set_prop("value", json!("10.1.2.3"));
        store.write(Region::RootIdInput, input).unwrap();

        assert!(store.take_dirty());
        assert!(!store.take_dirty());
    }
}
