use std::path::{Path, PathBuf};

use bucket_archive::ExtractLimits;
use bucket_fs::LinkOptions;
use bucket_verify::HashAlgorithm;

use crate::replicate::ReplicaTemplate;

/// Everything the pipeline needs, passed in explicitly so tests can vary it
/// per case. The core never reads the environment; the binary translates
/// env vars into this struct.
#[derive(Clone, Debug)]
pub struct StoreConfig {
    /// Storage root. Staging, blobs, trees, and replicas all live under it
    /// (hardlinking requires a single filesystem).
    pub root: PathBuf,
    pub algorithm: HashAlgorithm,
    pub max_content_length: u64,
    pub limits: ExtractLimits,
    pub replicas: Vec<ReplicaTemplate>,
    pub link_options: LinkOptions,
}

pub const DEFAULT_MAX_CONTENT_LENGTH: u64 = 32 << 20;

/// Staging filename used when the client supplies none.
pub const DEFAULT_FILENAME: &str = "blob";

impl StoreConfig {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            algorithm: HashAlgorithm::default(),
            max_content_length: DEFAULT_MAX_CONTENT_LENGTH,
            limits: ExtractLimits::default(),
            replicas: Vec::new(),
            link_options: LinkOptions::new(),
        }
    }

    pub fn algorithm(mut self, algorithm: HashAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    pub fn max_content_length(mut self, bytes: u64) -> Self {
        self.max_content_length = bytes;
        self
    }

    pub fn limits(mut self, limits: ExtractLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn replicas(mut self, replicas: Vec<ReplicaTemplate>) -> Self {
        self.replicas = replicas;
        self
    }

    pub fn link_options(mut self, options: LinkOptions) -> Self {
        self.link_options = options;
        self
    }

    pub fn staging_dir(&self) -> PathBuf {
        self.root.join("staging")
    }

    pub fn blob_dir(&self) -> PathBuf {
        self.root.join("blob")
    }

    pub fn tree_dir(&self) -> PathBuf {
        self.root.join("tree")
    }

    pub fn replica_dir(&self) -> PathBuf {
        self.root.join("replica")
    }

    /// Path rendered relative to the storage root for manifests; falls back
    /// to the absolute form if the path lives elsewhere.
    pub fn display_path(&self, path: &Path) -> String {
        path.strip_prefix(&self.root)
            .unwrap_or(path)
            .to_string_lossy()
            .into_owned()
    }
}
