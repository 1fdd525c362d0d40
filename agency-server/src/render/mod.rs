//! Document rendering
//!
//! The workflow engine treats the renderer as an unreliable collaborator:
//! a transition commits whether or not its artifact renders, and failures
//! land on a persistent deferred queue that the render worker drains.
//!
//! - [`DocumentRenderer`]: the rendering seam; production wires an HTML
//!   file renderer, tests plug in failing stubs
//! - [`worker`]: background retry loop over the deferred queue
//! - [`sweep`]: periodic artifact-cache cleanup

pub mod sweep;
pub mod worker;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Which document an artifact is rendered from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    Quote,
    Invoice,
    Voucher,
}

impl DocumentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::Quote => "quote",
            DocumentKind::Invoice => "invoice",
            DocumentKind::Voucher => "voucher",
        }
    }
}

impl std::fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request to produce an artifact, emitted by a workflow action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderRequest {
    pub booking_id: i64,
    pub kind: DocumentKind,
    /// Quote or invoice id; the booking itself for vouchers.
    pub document_id: i64,
    /// Display number on the artifact (quote/invoice number or booking
    /// reference).
    pub number: String,
}

/// Everything a renderer needs, snapshotted at render time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentSnapshot {
    pub request: RenderRequest,
    /// Serialized document body (quote, invoice or booking JSON).
    pub body: serde_json::Value,
}

/// A rendered artifact on disk.
#[derive(Debug, Clone, PartialEq)]
pub struct ArtifactHandle {
    pub path: PathBuf,
    /// Unix millis.
    pub rendered_at: i64,
}

/// Entry on the deferred-render queue. Keyed by booking, so a newer
/// request for the same booking supersedes an older one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingRender {
    pub booking_id: i64,
    pub request: RenderRequest,
    /// Unix millis when the request was first deferred.
    pub queued_at: i64,
    pub attempts: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Renderer unavailable: {0}")]
    Unavailable(String),

    #[error("Render failed: {0}")]
    Failed(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Rendering seam. Implementations must be cheap to call repeatedly; the
/// retry worker re-renders from a fresh snapshot on every attempt.
pub trait DocumentRenderer: Send + Sync {
    fn render(&self, snapshot: &DocumentSnapshot) -> Result<ArtifactHandle, RenderError>;
}

/// Artifact file name for a request: `{kind}-{booking_id}.html`.
///
/// The sweep relies on this shape to map an artifact back to its booking.
pub fn artifact_file_name(request: &RenderRequest) -> String {
    format!("{}-{}.html", request.kind, request.booking_id)
}

/// Booking id encoded in an artifact file name, if it matches the
/// `{kind}-{booking_id}.html` shape.
pub fn booking_id_from_file_name(name: &str) -> Option<i64> {
    let stem = name.strip_suffix(".html")?;
    let (_, id) = stem.rsplit_once('-')?;
    id.parse().ok()
}

/// Writes self-contained HTML artifacts into a cache directory.
///
/// Deliberately minimal markup; the artifact exists so public share pages
/// and email attachments have something stable to serve.
pub struct HtmlFileRenderer {
    artifact_dir: PathBuf,
}

impl HtmlFileRenderer {
    pub fn new(artifact_dir: impl Into<PathBuf>) -> Self {
        Self {
            artifact_dir: artifact_dir.into(),
        }
    }
}

impl DocumentRenderer for HtmlFileRenderer {
    fn render(&self, snapshot: &DocumentSnapshot) -> Result<ArtifactHandle, RenderError> {
        std::fs::create_dir_all(&self.artifact_dir)?;
        let path = self.artifact_dir.join(artifact_file_name(&snapshot.request));
        let body = serde_json::to_string_pretty(&snapshot.body)
            .map_err(|e| RenderError::Failed(e.to_string()))?;
        let html = format!(
            "<!DOCTYPE html>\n<html><head><meta charset=\"utf-8\">\
             <title>{kind} {number}</title></head>\n\
             <body><h1>{kind} {number}</h1>\n<pre>{body}</pre></body></html>\n",
            kind = snapshot.request.kind,
            number = snapshot.request.number,
        );
        std::fs::write(&path, html)?;
        Ok(ArtifactHandle {
            path,
            rendered_at: shared::util::now_millis(),
        })
    }
}
