/*!
# SoC Connectivity Analyzer Dashboard

A browser-based dashboard for exploring hardware connectivity topologies,
built in Rust.

## Overview

A user uploads a tabular description of a connectivity topology (CSV or
XLSX), triggers a computation against it for a chosen root identifier, and
downloads the rendered SVG artifact. A feedback modal lets users mail a
report to the maintainers.

## Architecture

The server holds one document tree per session — the single source of truth
for what that user currently sees. Three independent flows (upload, compute,
feedback) rewrite named regions of the tree through `UiStateStore`; flows
never call each other and never address the tree by position, so one flow's
write cannot corrupt another flow's region.

External collaborators sit behind gateway traits:

- `ComputeGateway` — the connectivity-analysis backend, consumed as an
  opaque process that turns a table plus root identifier into SVG content
  (or rejects the identifier).
- `NotificationGateway` — feedback mail dispatch over SMTP.

Both are blocking and possibly slow; flows release the session lock around
these calls and the production implementations run under a deadline.

## Modules

- **document**: the document tree, named region addressing, session skeleton
- **table**: upload decoding into an `UploadedTable`
- **upload** / **compute** / **feedback**: the three user-triggered flows
- **gateway**: compute backend boundary
- **mailer**: feedback notification dispatch
- **session**: per-session state registry
- **error**: the non-fatal error taxonomy
- **app**: routing and handlers
*/

pub mod app;
pub mod compute;
pub mod document;
pub mod error;
pub mod feedback;
pub mod gateway;
pub mod mailer;
pub mod session;
pub mod table;
pub mod upload;

pub use compute::{on_compute_clicked, ComputeOutcome};
pub use document::{Node, NodeKind, Region, UiStateStore, WriteOutcome};
pub use feedback::{on_close_clicked, on_open_clicked, FeedbackDraft, FeedbackReason};
pub use gateway::{ComputeGateway, ComputeRequest, ComputeResult, DownloadPayload};
pub use mailer::NotificationGateway;
pub use session::{Session, SessionRegistry};
pub use table::{parse_upload, UploadedTable};
pub use upload::on_upload;
