//! Upload flow: decode the uploaded file and present it in the upload
//! region. At most one table is retained; a second upload replaces the
//! first.

use serde_json::json;

use crate::document::{Node, NodeKind, Region, UiStateStore, WriteOutcome};
use crate::error::{ParseError, StateError};
use crate::table::parse_upload;

/// Handle an uploaded file. On success the region shows the table (title =
/// filename, rendered grid) and is made visible. On parse failure an inline
/// error message replaces the region content; visibility is only forced on
/// success, so a failed first upload stays hidden.
///
/// Identical re-uploads produce identical region content, reported as
/// [`WriteOutcome::Unchanged`].
pub fn on_upload(
    store: &mut UiStateStore,
    bytes: &[u8],
    filename: &str,
) -> Result<WriteOutcome, StateError> {
    let mut region = store.read(Region::Upload)?.clone();

    match parse_upload(bytes, filename) {
        Ok(table) => {
            region.children = vec![table.to_node(filename)];
            region.set_prop("visible", json!(true));
        }
        Err(err) => {
            log::warn!("upload rejected: {err}");
            region.children = vec![error_node(&err)];
        }
    }

    store.write(Region::Upload, region)
}

fn error_node(err: &ParseError) -> Node {
    Node::new("upload-error", NodeKind::Text).with_prop("message", json!(err.to_string()))
}
