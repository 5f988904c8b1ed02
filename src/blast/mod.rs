//! BLAST invocation building.
//!
//! Turns a sample's assembly into a fully formed `blastn` command line
//! against a local nucleotide database. Nothing here runs BLAST; the
//! command is handed to a scheduler by the pipeline.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// File whose presence marks a complete `nt` database download.
pub const DATABASE_MARKER: &str = "nt.00.nhi";

/// Name of the database inside its directory.
pub const DATABASE_NAME: &str = "nt";

/// BLAST archive format (ASN.1), convertible later with `blast_formatter`.
pub const OUTPUT_FORMAT: u8 = 11;

/// Pre-flight failures for a BLAST job.
#[derive(Debug, Error)]
pub enum BlastError {
    /// Query file does not exist.
    #[error("query file {} does not exist", .0.display())]
    MissingQuery(PathBuf),

    /// Database directory does not exist.
    #[error("BLAST database directory {} does not exist", .0.display())]
    MissingDatabase(PathBuf),

    /// Database directory lacks the marker file.
    #[error(
        "BLAST database at {} is incomplete (missing {}); download it again",
        .0.display(),
        DATABASE_MARKER
    )]
    IncompleteDatabase(PathBuf),

    /// None of the discovered samples has an assembly to search with.
    #[error("none of the {samples} discovered samples has an assembly to use as BLAST query")]
    NoQueries {
        /// Samples in the manifest.
        samples: usize,
    },
}

/// Thresholds forwarded to `blastn`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BlastParameters {
    /// Expectation value cut-off.
    pub evalue: f64,
    /// Maximum HSPs kept per query/subject pair.
    pub max_hsps: u32,
    /// Drop hits enveloped by at least this many higher scoring hits.
    pub culling_limit: u32,
}

impl Default for BlastParameters {
    fn default() -> Self {
        Self {
            evalue: 1e-10,
            max_hsps: 10,
            culling_limit: 10,
        }
    }
}

/// A verified local `nt` database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlastDatabase {
    dir: PathBuf,
}

impl BlastDatabase {
    /// Check that `dir` holds a complete database.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, BlastError> {
        let dir = dir.into();
        if !dir.is_dir() {
            return Err(BlastError::MissingDatabase(dir));
        }
        if !dir.join(DATABASE_MARKER).is_file() {
            return Err(BlastError::IncompleteDatabase(dir));
        }
        Ok(Self { dir })
    }

    /// Database directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Value passed to `-db`.
    pub fn prefix(&self) -> PathBuf {
        self.dir.join(DATABASE_NAME)
    }
}

/// One `blastn` run for one sample.
#[derive(Debug, Clone)]
pub struct BlastJob {
    sample_id: String,
    query: PathBuf,
    database: BlastDatabase,
    params: BlastParameters,
    threads: u32,
    output: PathBuf,
}

impl BlastJob {
    /// Prepare a run; `query` must exist.
    pub fn new(
        sample_id: impl Into<String>,
        query: impl Into<PathBuf>,
        database: BlastDatabase,
        params: BlastParameters,
        threads: u32,
        output_dir: &Path,
    ) -> Result<Self, BlastError> {
        let sample_id = sample_id.into();
        let query = query.into();
        if !query.is_file() {
            return Err(BlastError::MissingQuery(query));
        }
        let output = output_dir.join(format!("{sample_id}_blastresults.asn"));
        Ok(Self {
            sample_id,
            query,
            database,
            params,
            threads: threads.max(1),
            output,
        })
    }

    /// Sample this run belongs to.
    pub fn sample_id(&self) -> &str {
        &self.sample_id
    }

    /// Archive written by `blastn`.
    pub fn output(&self) -> &Path {
        &self.output
    }

    /// Threads requested from `blastn` and the scheduler.
    pub fn threads(&self) -> u32 {
        self.threads
    }

    /// Full command line.
    pub fn command_line(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for BlastJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "blastn -query {} -db {} -outfmt {} -out {} -num_threads {} -evalue {:e} -max_hsps {} -culling_limit {}",
            shell_quote(&self.query),
            shell_quote(&self.database.prefix()),
            OUTPUT_FORMAT,
            shell_quote(&self.output),
            self.threads,
            self.params.evalue,
            self.params.max_hsps,
            self.params.culling_limit,
        )
    }
}

/// Render `path` as a single shell word. LSF hands job commands to a shell.
fn shell_quote(path: &Path) -> String {
    let raw = path.to_string_lossy();
    let plain = !raw.is_empty()
        && raw
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "_-./+:=,@%".contains(c));
    if plain {
        raw.into_owned()
    } else {
        format!("'{}'", raw.replace('\'', r"'\''"))
    }
}
