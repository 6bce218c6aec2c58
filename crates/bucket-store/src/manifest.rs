use serde::Serialize;

/// Structured result of one upload: every blob created or linked, every
/// degraded unit, and how each replication target fared. Accumulated in
/// container order so identical input yields an identical manifest.
#[derive(Clone, Debug, Serialize)]
pub struct Manifest {
    /// Checksum algorithm the digests below were computed with.
    pub algorithm: String,
    /// Digest of the upload stream exactly as received.
    pub upload_checksum: String,
    /// Root of the primary hardlink tree, relative to the storage root.
    /// Absent when the upload was a single unit with no directory structure.
    pub tree_root: Option<String>,
    pub entries: Vec<ManifestEntry>,
    pub errors: Vec<UnitError>,
    pub replicas: Vec<ReplicaReport>,
}

impl Manifest {
    pub fn ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// One persisted blob and the logical path(s) it was materialized under.
#[derive(Clone, Debug, Serialize)]
pub struct ManifestEntry {
    pub checksum: String,
    pub size: u64,
    pub content_type: String,
    pub relative_path: String,
    pub replica_paths: Vec<ReplicaOutcome>,
}

/// A unit that degraded to an error instead of aborting the upload.
#[derive(Clone, Debug, Serialize)]
pub struct UnitError {
    pub relative_path: String,
    pub error: String,
}

/// Per-target, per-entry link attempt.
#[derive(Clone, Debug, Serialize)]
pub struct ReplicaOutcome {
    /// Link destination relative to the storage root.
    pub path: String,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// How one configured replication target resolved for this upload.
#[derive(Clone, Debug, Serialize)]
pub struct ReplicaReport {
    pub template: String,
    /// Resolved prefix relative to the storage root; `None` when the
    /// client's tags did not satisfy the template.
    pub resolved: Option<String>,
}
