//! Upload orchestration.
//!
//! One `ingest` call drives the whole lifecycle: stage the stream, checksum
//! it as received, then recursively reduce it to terminal units. A unit is
//! classified by signature and either stored as a blob, decompressed and
//! reprocessed, or walked as a container whose entries become child units.
//! Unit failures degrade to manifest error records; siblings keep going.
//! Only after every unit settles are the primary tree and the replica trees
//! materialized from the surviving entries.

use std::collections::HashMap;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use bucket_archive::{
    ArchiveFormat, Budget, Codec, ContentKind, Error as ArchiveError, LimitKind, LimitedReader,
    SIGNATURE_WINDOW, sanitize_entry_path,
};
use bucket_verify::HashingReader;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::blob::BlobStore;
use crate::config::{DEFAULT_FILENAME, StoreConfig};
use crate::error::{Error, Result};
use crate::manifest::{Manifest, ManifestEntry, ReplicaOutcome, ReplicaReport, UnitError};
use crate::materialize::Materializer;

pub struct Pipeline {
    config: StoreConfig,
    store: BlobStore,
}

/// Accumulated state of one upload while its units are reduced.
#[derive(Default)]
struct IngestCtx {
    entries: Vec<ManifestEntry>,
    errors: Vec<UnitError>,
    io_failures: u32,
    extracted: bool,
}

impl Pipeline {
    /// Open (or initialize) a store rooted at `config.root`.
    pub fn new(config: StoreConfig) -> Result<Self> {
        for dir in [
            config.staging_dir(),
            config.blob_dir(),
            config.tree_dir(),
            config.replica_dir(),
        ] {
            bucket_fs::ensure_dir(&dir)?;
        }
        let store = BlobStore::new(config.blob_dir(), config.link_options);
        Ok(Self { config, store })
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn exists(&self, checksum: &str) -> bool {
        self.store.has(checksum)
    }

    pub fn open(&self, checksum: &str) -> Result<File> {
        self.store.open(checksum)
    }

    /// Ingest one upload stream and return its manifest.
    ///
    /// `filename` seeds the root unit's logical path (sanitized, basename
    /// only); `tags` drive replica template resolution. Fatal errors
    /// (oversize stream, staging I/O, nothing persisted at all) return `Err`;
    /// everything unit-scoped lands in the manifest's error list instead.
    pub fn ingest<R: Read>(
        &self,
        upload: R,
        filename: Option<&str>,
        tags: &HashMap<String, String>,
    ) -> Result<Manifest> {
        let limit = self.config.max_content_length;
        let mut staged = NamedTempFile::new_in(self.config.staging_dir())?;
        let mut reader = HashingReader::new(
            upload.take(limit.saturating_add(1)),
            self.config.algorithm.hasher(),
        );
        io::copy(&mut reader, staged.as_file_mut())?;
        let upload_size = reader.bytes_read();
        if upload_size > limit {
            return Err(Error::ContentTooLarge { limit });
        }
        let upload_checksum = reader.finalize_hex();

        let root_rel = unit_name(filename);
        info!(
            checksum = %upload_checksum,
            size = upload_size,
            unit = %root_rel.display(),
            "ingesting upload"
        );

        let mut ctx = IngestCtx::default();
        let mut budget = Budget::new(self.config.limits);
        self.run_unit(staged.path(), &root_rel, 0, &mut budget, &mut ctx)?;

        if ctx.entries.is_empty() && ctx.io_failures > 0 {
            return Err(Error::UploadFailed(format!(
                "no unit could be persisted ({} I/O failures)",
                ctx.io_failures
            )));
        }

        let materializer = Materializer::new(&self.store);

        let mut tree_root = None;
        if ctx.extracted && !ctx.entries.is_empty() {
            let prefix = self.config.tree_dir().join(fan_out(&upload_checksum));
            for report in materializer.link_entries(&prefix, &ctx.entries) {
                match report.result {
                    Ok(_) => {}
                    // Every entry was stored before any tree is built; a
                    // missing blob here violates that ordering.
                    Err(e @ Error::NotFound(_)) => return Err(e),
                    Err(e) => ctx.errors.push(UnitError {
                        relative_path: report.relative_path,
                        error: e.to_string(),
                    }),
                }
            }
            tree_root = Some(self.config.display_path(&prefix));
        }

        let mut replicas = Vec::new();
        for template in &self.config.replicas {
            let resolved = template.resolve(tags);
            match &resolved {
                Some(suffix) => {
                    let prefix = self.config.replica_dir().join(suffix);
                    let reports = materializer.link_entries(&prefix, &ctx.entries);
                    for (entry, report) in ctx.entries.iter_mut().zip(reports) {
                        if let Err(Error::NotFound(checksum)) = &report.result {
                            return Err(Error::NotFound(checksum.clone()));
                        }
                        entry.replica_paths.push(ReplicaOutcome {
                            path: self.config.display_path(&report.dest),
                            ok: report.ok(),
                            detail: report.detail(),
                        });
                    }
                }
                None => debug!(template = template.raw(), "replica template unmatched"),
            }
            replicas.push(ReplicaReport {
                template: template.raw().to_string(),
                resolved: resolved
                    .map(|suffix| self.config.display_path(&self.config.replica_dir().join(suffix))),
            });
        }

        info!(
            checksum = %upload_checksum,
            entries = ctx.entries.len(),
            errors = ctx.errors.len(),
            "upload complete"
        );
        Ok(Manifest {
            algorithm: self.config.algorithm.as_str().to_string(),
            upload_checksum,
            tree_root,
            entries: ctx.entries,
            errors: ctx.errors,
            replicas,
        })
    }

    /// Process one unit, downgrading recoverable failures to manifest errors
    /// so siblings (and the upload as a whole) continue.
    fn run_unit(
        &self,
        staged: &Path,
        rel: &Path,
        depth: usize,
        budget: &mut Budget,
        ctx: &mut IngestCtx,
    ) -> Result<()> {
        match self.process_unit(staged, rel, depth, budget, ctx) {
            Ok(()) => Ok(()),
            Err(e) if e.is_unit_recoverable() => {
                if e.is_io() {
                    ctx.io_failures += 1;
                }
                warn!(unit = %rel.display(), error = %e, "unit degraded");
                ctx.errors.push(UnitError {
                    relative_path: rel.display().to_string(),
                    error: e.to_string(),
                });
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    fn process_unit(
        &self,
        staged: &Path,
        rel: &Path,
        depth: usize,
        budget: &mut Budget,
        ctx: &mut IngestCtx,
    ) -> Result<()> {
        // Checked here rather than in the walk so an over-deep branch
        // degrades on its own while shallower siblings proceed.
        if depth > self.config.limits.max_depth {
            return Err(ArchiveError::LimitExceeded(LimitKind::Depth {
                limit: self.config.limits.max_depth,
            })
            .into());
        }

        match bucket_archive::classify_file(staged)? {
            ContentKind::Plain => self.store_unit(staged, rel, ctx),
            ContentKind::Compressed(codec) => {
                let inner = self.decompress(staged, codec, budget)?;
                // Drop the codec extension; the decompressed unit may itself
                // be a container or another compressed layer.
                let inner_rel = rel.with_extension("");
                self.run_unit(inner.path(), &inner_rel, depth + 1, budget, ctx)
            }
            ContentKind::Archive(format) => {
                self.extract_container(staged, format, None, rel, depth, budget, ctx)
            }
            ContentKind::CompressedArchive(codec, ArchiveFormat::Zip) => {
                // Zip walks its central directory and needs a seekable
                // source; strip the codec layer to staging first.
                let inner = self.decompress(staged, codec, budget)?;
                self.extract_container(inner.path(), ArchiveFormat::Zip, None, rel, depth, budget, ctx)
            }
            ContentKind::CompressedArchive(codec, format) => {
                self.extract_container(staged, format, Some(codec), rel, depth, budget, ctx)
            }
        }
    }

    /// Fully decompress a single-stream codec layer into staging, charging
    /// every produced byte against the budget.
    fn decompress(
        &self,
        staged: &Path,
        codec: Codec,
        budget: &mut Budget,
    ) -> Result<NamedTempFile> {
        let file = File::open(staged)?;
        let decoder = bucket_archive::decoder(Box::new(file), codec)?;
        let mut limited = LimitedReader::new(decoder, budget);

        let mut out = NamedTempFile::new_in(self.config.staging_dir())?;
        if let Err(e) = io::copy(&mut limited, out.as_file_mut()) {
            if let Some(kind) = budget.exhausted() {
                return Err(ArchiveError::LimitExceeded(kind).into());
            }
            return match e.kind() {
                io::ErrorKind::InvalidData | io::ErrorKind::UnexpectedEof | io::ErrorKind::Other => {
                    Err(ArchiveError::CorruptStream.into())
                }
                _ => Err(Error::Io(e)),
            };
        }
        Ok(out)
    }

    /// Walk a container, staging each entry to a temp file, then reduce the
    /// staged entries as child units. The container itself never becomes a
    /// manifest entry.
    fn extract_container(
        &self,
        staged: &Path,
        format: ArchiveFormat,
        codec: Option<Codec>,
        rel: &Path,
        depth: usize,
        budget: &mut Budget,
        ctx: &mut IngestCtx,
    ) -> Result<()> {
        let parent = rel.parent().map(Path::to_path_buf).unwrap_or_default();
        let staging = self.config.staging_dir();
        let file = File::open(staged)?;

        let mut children: Vec<(PathBuf, NamedTempFile)> = Vec::new();
        let mut rejected: Vec<UnitError> = Vec::new();
        let summary = bucket_archive::walk(
            format,
            codec,
            file,
            budget,
            |meta, reader| {
                let mut temp = NamedTempFile::new_in(&staging)?;
                io::copy(reader, temp.as_file_mut())?;
                children.push((parent.join(&meta.path), temp));
                Ok(())
            },
            |raw_path, error| {
                rejected.push(UnitError {
                    relative_path: parent.join(&raw_path).display().to_string(),
                    error: error.to_string(),
                });
            },
        )?;

        ctx.extracted = true;
        ctx.errors.append(&mut rejected);
        debug!(
            container = %rel.display(),
            files = summary.files,
            rejected = summary.rejected,
            "container walked"
        );

        for (child_rel, temp) in children {
            self.run_unit(temp.path(), &child_rel, depth + 1, budget, ctx)?;
        }
        Ok(())
    }

    /// Persist a terminal unit as a blob and record its manifest entry.
    fn store_unit(&self, staged: &Path, rel: &Path, ctx: &mut IngestCtx) -> Result<()> {
        let mut window = Vec::with_capacity(SIGNATURE_WINDOW);
        File::open(staged)?
            .take(SIGNATURE_WINDOW as u64)
            .read_to_end(&mut window)?;
        let content_type = bucket_archive::guess_content_type(&window).to_string();

        let mut reader =
            HashingReader::new(File::open(staged)?, self.config.algorithm.hasher());
        io::copy(&mut reader, &mut io::sink())?;
        let size = reader.bytes_read();
        let checksum = reader.finalize_hex();

        let created = self.store.put(&checksum, staged)?;
        debug!(checksum = %checksum, size, created, unit = %rel.display(), "unit persisted");

        ctx.entries.push(ManifestEntry {
            checksum,
            size,
            content_type,
            relative_path: rel.display().to_string(),
            replica_paths: Vec::new(),
        });
        Ok(())
    }
}

/// Two-level fan-out under which an upload's primary tree is rooted; the
/// same shape the blob store uses.
fn fan_out(checksum: &str) -> PathBuf {
    PathBuf::from(&checksum[0..2])
        .join(&checksum[2..4])
        .join(checksum)
}

/// Logical name for the root unit: sanitized basename of the client's
/// filename, or a fixed placeholder when absent or unusable.
fn unit_name(filename: Option<&str>) -> PathBuf {
    filename
        .map(Path::new)
        .and_then(|f| sanitize_entry_path(f).ok())
        .and_then(|p| p.file_name().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_FILENAME))
}
