//! Compute flow: read the uploaded table, invoke the analysis backend and
//! hand the rendered artifact back as a download.

use std::sync::Mutex;

use serde_json::json;

use crate::document::{NodeKind, Region, UiStateStore};
use crate::error::StateError;
use crate::gateway::{ComputeGateway, ComputeRequest, ComputeResult, DownloadPayload};
use crate::session::Session;
use crate::table::UploadedTable;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComputeOutcome {
    Download(DownloadPayload),
    NoOp,
}

/// Handle a compute-button click.
///
/// A click counter of zero is a spurious trigger and a strict no-op. With no
/// uploaded table the flow aborts before mutating anything, silently. Once a
/// genuine click gets past the table read, the compute button counter and the
/// root-id input are reset regardless of the backend's answer, re-arming the
/// control for the next interaction.
///
/// The backend call runs with the session lock released; it may be slow and
/// must not block the session's other handlers.
pub fn on_compute_clicked(
    session: &Mutex<Session>,
    gateway: &dyn ComputeGateway,
    n_clicks: i64,
    root_id: &str,
) -> Result<ComputeOutcome, StateError> {
    if n_clicks <= 0 {
        return Ok(ComputeOutcome::NoOp);
    }

    let (table, display_name) = {
        let session = session.lock().unwrap();
        match read_uploaded_table(&session.store) {
            Ok(found) => found,
            Err(err) => {
                log::debug!("compute click ignored: {err}");
                return Ok(ComputeOutcome::NoOp);
            }
        }
    };

    let result = match ComputeRequest::new(table, root_id.to_string(), display_name.clone()) {
        Ok(request) => match gateway.compute(&request) {
            Ok(result) => result,
            Err(err) => {
                log::error!("compute backend failed: {err}");
                ComputeResult::InvalidRoot
            }
        },
        // Empty root identifier: no download, but the click was genuine.
        Err(_) => ComputeResult::InvalidRoot,
    };

    let payload = match result {
        ComputeResult::Artifact(bytes) => Some(DownloadPayload {
            content: String::from_utf8_lossy(&bytes).into_owned(),
            filename: format!("{root_id}-{}.svg", stem(&display_name)),
        }),
        ComputeResult::InvalidRoot => None,
    };

    let mut session = session.lock().unwrap();
    reset_affordances(&mut session.store)?;

    Ok(match payload {
        Some(payload) => ComputeOutcome::Download(payload),
        None => ComputeOutcome::NoOp,
    })
}

/// Read the currently uploaded table and its display filename back out of
/// the upload region.
pub fn read_uploaded_table(store: &UiStateStore) -> Result<(UploadedTable, String), StateError> {
    let region = store.read(Region::Upload)?;
    let node = region
        .children
        .iter()
        .find(|c| c.kind == NodeKind::Table)
        .ok_or(StateError::NoUploadedTable)?;
    UploadedTable::from_node(node)
}

fn reset_affordances(store: &mut UiStateStore) -> Result<(), StateError> {
    let mut button = store.read(Region::ComputeButton)?.clone();
    button.set_prop("n_clicks", json!(0));
    store.write(Region::ComputeButton, button)?;

    let mut input = store.read(Region::RootIdInput)?.clone();
    input.set_prop("value", json!(""));
    store.write(Region::RootIdInput, input)?;

    Ok(())
}

// Strip the filename extension, as in "topo.csv" -> "topo".
fn stem(name: &str) -> &str {
    std::path::Path::new(name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ComputeError;
    use crate::upload::on_upload;

    struct StubGateway {
        answer: Result<ComputeResult, &'static str>,
        calls: Mutex<u32>,
    }

    impl StubGateway {
        fn artifact(bytes: &[u8]) -> Self {
            StubGateway {
                answer: Ok(ComputeResult::Artifact(bytes.to_vec())),
                calls: Mutex::new(0),
            }
        }

        fn invalid_root() -> Self {
            StubGateway {
                answer: Ok(ComputeResult::InvalidRoot),
                calls: Mutex::new(0),
            }
        }

        fn failing() -> Self {
            StubGateway {
                answer: Err("backend unreachable"),
                calls: Mutex::new(0),
            }
        }

        fn call_count(&self) -> u32 {
            *self.calls.lock().unwrap()
        }
    }

    impl ComputeGateway for StubGateway {
        fn compute(&self, _: &ComputeRequest) -> Result<ComputeResult, ComputeError> {
            *self.calls.lock().unwrap() += 1;
            self.answer
                .clone()
                .map_err(|e| ComputeError::Backend(e.to_string()))
        }
    }

    fn session_with_table() -> Mutex<Session> {
        let session = Mutex::new(Session::new());
        {
            let store = &mut session.lock().unwrap().store;
            on_upload(store, b"H1,H2\na,1\n", "topo.csv").unwrap();
            // Simulate the user having typed a root identifier.
            let mut input = store.read(Region::RootIdInput).unwrap().clone();
            input.set_prop("value", json!("10.0.0.1"));
            store.write(Region::RootIdInput, input).unwrap();
        }
        session
    }

    #[test]
    fn success_emits_download_and_resets_affordances() {
        let session = session_with_table();
        let gateway = StubGateway::artifact(b"<svg/>");

        let outcome = on_compute_clicked(&session, &gateway, 1, "10.0.0.1").unwrap();
        assert_eq!(
            outcome,
            ComputeOutcome::Download(DownloadPayload {
                content: "<svg/>".to_string(),
                filename: "10.0.0.1-topo.svg".to_string(),
            })
        );

        let session = session.lock().unwrap();
        let button = session.store.read(Region::ComputeButton).unwrap();
        assert_eq!(button.prop_u64("n_clicks"), Some(0));
        let input = session.store.read(Region::RootIdInput).unwrap();
        assert_eq!(input.prop_str("value"), Some(""));
    }

    #[test]
    fn zero_clicks_is_a_strict_no_op() {
        let session = session_with_table();
        let before = session.lock().unwrap().store.root().clone();
        let gateway = StubGateway::artifact(b"<svg/>");

        let outcome = on_compute_clicked(&session, &gateway, 0, "10.0.0.1").unwrap();

        assert_eq!(outcome, ComputeOutcome::NoOp);
        assert_eq!(gateway.call_count(), 0);
        assert_eq!(*session.lock().unwrap().store.root(), before);
    }

    #[test]
    fn missing_table_aborts_before_mutating() {
        let session = Mutex::new(Session::new());
        let before = session.lock().unwrap().store.root().clone();
        let gateway = StubGateway::artifact(b"<svg/>");

        let outcome = on_compute_clicked(&session, &gateway, 1, "10.0.0.1").unwrap();

        assert_eq!(outcome, ComputeOutcome::NoOp);
        assert_eq!(gateway.call_count(), 0);
        assert_eq!(*session.lock().unwrap().store.root(), before);
    }

    #[test]
    fn invalid_root_produces_no_download_but_still_resets() {
        let session = session_with_table();
        let gateway = StubGateway::invalid_root();

        let outcome = on_compute_clicked(&session, &gateway, 1, "203.0.113.9").unwrap();

        assert_eq!(outcome, ComputeOutcome::NoOp);
        assert_eq!(gateway.call_count(), 1);
        let session = session.lock().unwrap();
        let input = session.store.read(Region::RootIdInput).unwrap();
        assert_eq!(input.prop_str("value"), Some(""));
    }

    #[test]
    fn empty_root_id_skips_the_backend() {
        let session = session_with_table();
        let gateway = StubGateway::artifact(b"<svg/>");

        let outcome = on_compute_clicked(&session, &gateway, 1, "").unwrap();

        assert_eq!(outcome, ComputeOutcome::NoOp);
        assert_eq!(gateway.call_count(), 0);
    }

    #[test]
    fn backend_failure_is_swallowed_at_the_boundary() {
        let session = session_with_table();
        let gateway = StubGateway::failing();

        let outcome = on_compute_clicked(&session, &gateway, 1, "10.0.0.1").unwrap();

        assert_eq!(outcome, ComputeOutcome::NoOp);
        let session = session.lock().unwrap();
        let button = session.store.read(Region::ComputeButton).unwrap();
        assert_eq!(button.prop_u64("n_clicks"), Some(0));
    }

    #[test]
    fn stem_strips_the_extension() {
        assert_eq!(stem("topo.csv"), "topo");
        assert_eq!(stem("archive.tar.gz"), "archive.tar");
        assert_eq!(stem("noext"), "noext");
    }
}
