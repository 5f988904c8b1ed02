use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use super::classifier::{classify, FileRole};

/// Subdirectory of a Juno assembly run holding trimmed reads.
pub const JUNO_READS_DIR: &str = "clean_fastq";
/// Subdirectory of a Juno assembly run holding filtered assemblies.
pub const JUNO_ASSEMBLY_DIR: &str = "de_novo_assembly_filtered";

/// Which role combinations a sample needs to be kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputMode {
    /// Complete read pairs only.
    ReadsOnly,
    /// Assemblies only.
    #[default]
    AssemblyOnly,
    /// Either a complete read pair or an assembly.
    Both,
}

impl InputMode {
    fn accepts(&self, role: FileRole) -> bool {
        match self {
            InputMode::ReadsOnly => role.is_read(),
            InputMode::AssemblyOnly => role == FileRole::Assembly,
            InputMode::Both => true,
        }
    }
}

impl FromStr for InputMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "reads" | "reads-only" | "fastq" => Ok(InputMode::ReadsOnly),
            "assembly" | "assembly-only" | "fasta" => Ok(InputMode::AssemblyOnly),
            "both" => Ok(InputMode::Both),
            other => Err(format!(
                "unknown input mode '{other}' (expected reads, assembly or both)"
            )),
        }
    }
}

/// Errors raised while discovering samples.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// The input path is missing or is not a directory.
    #[error("invalid input directory {}: {reason}", .path.display())]
    InvalidInput {
        /// Offending path.
        path: PathBuf,
        /// What is wrong with it.
        reason: &'static str,
    },

    /// Nothing usable was found.
    #[error("no samples matching {mode:?} were found in {}", .path.display())]
    EmptyManifest {
        /// Scanned directory.
        path: PathBuf,
        /// Mode that filtered the records.
        mode: InputMode,
    },

    /// The directory listing itself failed.
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        /// Directory being listed.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
}

/// Files belonging to one sample, keyed by role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SampleRecord {
    #[serde(skip)]
    sample_id: String,
    roles: BTreeMap<FileRole, PathBuf>,
}

impl SampleRecord {
    fn new(sample_id: String) -> Self {
        Self {
            sample_id,
            roles: BTreeMap::new(),
        }
    }

    /// Sample identifier, always kept as text.
    pub fn sample_id(&self) -> &str {
        &self.sample_id
    }

    /// Path registered for `role`, if any.
    pub fn path(&self, role: FileRole) -> Option<&Path> {
        self.roles.get(&role).map(PathBuf::as_path)
    }

    /// All registered roles in sheet order.
    pub fn roles(&self) -> impl Iterator<Item = (FileRole, &Path)> {
        self.roles.iter().map(|(role, path)| (*role, path.as_path()))
    }

    /// Assembly path, if the sample has one.
    pub fn assembly(&self) -> Option<&Path> {
        self.path(FileRole::Assembly)
    }

    /// Returns `true` when both read mates are present.
    pub fn has_read_pair(&self) -> bool {
        self.roles.contains_key(&FileRole::Read1) && self.roles.contains_key(&FileRole::Read2)
    }

    /// Applies the mode requirements. Returns `None` when the record must be dropped.
    fn validate(mut self, mode: InputMode) -> Option<Self> {
        self.roles.retain(|role, _| mode.accepts(*role));
        if !self.has_read_pair() {
            self.roles.remove(&FileRole::Read1);
            self.roles.remove(&FileRole::Read2);
        }
        (!self.roles.is_empty()).then_some(self)
    }
}

/// Validated, non-empty collection of samples. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Manifest {
    samples: BTreeMap<String, SampleRecord>,
}

impl Manifest {
    /// Number of samples.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Always `false` for a manifest obtained from a builder.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Lookup by identifier.
    pub fn get(&self, sample_id: &str) -> Option<&SampleRecord> {
        self.samples.get(sample_id)
    }

    /// Records ordered by identifier.
    pub fn iter(&self) -> impl Iterator<Item = &SampleRecord> {
        self.samples.values()
    }

    /// Sample identifiers ordered lexically.
    pub fn sample_ids(&self) -> impl Iterator<Item = &str> {
        self.samples.keys().map(String::as_str)
    }
}

impl<'a> IntoIterator for &'a Manifest {
    type Item = &'a SampleRecord;
    type IntoIter = std::collections::btree_map::Values<'a, String, SampleRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.samples.values()
    }
}

/// Capability to turn an input directory into a manifest.
///
/// The driver depends on this trait rather than on [`SampleManifestBuilder`]
/// so alternative discovery strategies can be plugged in.
pub trait BuildManifest {
    /// Scan `directory` and return the samples that satisfy `mode`.
    fn build_manifest(&self, directory: &Path, mode: InputMode) -> Result<Manifest, DiscoveryError>;
}

/// Directory scanner producing a [`Manifest`].
///
/// Only immediate entries are inspected. The one exception is a Juno
/// assembly output directory, where `clean_fastq/` and
/// `de_novo_assembly_filtered/` are scanned (again non-recursively)
/// instead of the root.
#[derive(Debug, Clone, Copy, Default)]
pub struct SampleManifestBuilder;

impl SampleManifestBuilder {
    /// Create a builder.
    pub fn new() -> Self {
        Self
    }

    /// Scan `directory` and group recognized files per sample.
    pub fn build(&self, directory: &Path, mode: InputMode) -> Result<Manifest, DiscoveryError> {
        if !directory.exists() {
            return Err(DiscoveryError::InvalidInput {
                path: directory.to_path_buf(),
                reason: "path does not exist",
            });
        }
        if !directory.is_dir() {
            return Err(DiscoveryError::InvalidInput {
                path: directory.to_path_buf(),
                reason: "path is not a directory",
            });
        }
        let root = directory
            .canonicalize()
            .map_err(|source| DiscoveryError::Io {
                path: directory.to_path_buf(),
                source,
            })?;

        let mut records: BTreeMap<String, SampleRecord> = BTreeMap::new();
        for (dir, allowed) in scan_targets(&root) {
            for (path, file_name) in list_files(&dir)? {
                let Some(found) = classify(&file_name) else {
                    debug!(file = %file_name, "skipping unrecognized file");
                    continue;
                };
                if !allowed.contains(&found.role) {
                    debug!(file = %file_name, "skipping file outside its Juno subdirectory");
                    continue;
                }
                records
                    .entry(found.sample_id.clone())
                    .or_insert_with(|| SampleRecord::new(found.sample_id))
                    .roles
                    .insert(found.role, path);
            }
        }

        let samples: BTreeMap<String, SampleRecord> = records
            .into_iter()
            .filter_map(|(id, record)| record.validate(mode).map(|record| (id, record)))
            .collect();

        if samples.is_empty() {
            return Err(DiscoveryError::EmptyManifest {
                path: directory.to_path_buf(),
                mode,
            });
        }

        info!(
            directory = %root.display(),
            samples = samples.len(),
            "sample manifest built"
        );
        Ok(Manifest { samples })
    }
}

impl BuildManifest for SampleManifestBuilder {
    fn build_manifest(&self, directory: &Path, mode: InputMode) -> Result<Manifest, DiscoveryError> {
        self.build(directory, mode)
    }
}

/// Directories to scan, each with the roles it may contribute.
fn scan_targets(root: &Path) -> Vec<(PathBuf, &'static [FileRole])> {
    const ALL: &[FileRole] = &[FileRole::Read1, FileRole::Read2, FileRole::Assembly];
    const READS: &[FileRole] = &[FileRole::Read1, FileRole::Read2];
    const ASSEMBLY: &[FileRole] = &[FileRole::Assembly];

    let reads_dir = root.join(JUNO_READS_DIR);
    let assembly_dir = root.join(JUNO_ASSEMBLY_DIR);
    let mut targets = Vec::new();
    if reads_dir.is_dir() {
        targets.push((reads_dir, READS));
    }
    if assembly_dir.is_dir() {
        targets.push((assembly_dir, ASSEMBLY));
    }
    if targets.is_empty() {
        targets.push((root.to_path_buf(), ALL));
    } else {
        debug!(directory = %root.display(), "detected Juno output layout");
    }
    targets
}

/// Regular files directly inside `dir`, as `(absolute path, file name)`.
fn list_files(dir: &Path) -> Result<Vec<(PathBuf, String)>, DiscoveryError> {
    let io_err = |source| DiscoveryError::Io {
        path: dir.to_path_buf(),
        source,
    };
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).map_err(io_err)? {
        let entry = entry.map_err(io_err)?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        // Non UTF-8 names can never match a rule.
        if let Some(name) = entry.file_name().to_str() {
            files.push((path, name.to_string()));
        }
    }
    files.sort();
    Ok(files)
}
