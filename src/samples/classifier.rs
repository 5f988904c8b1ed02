//! Filename classification.
//!
//! Maps a bare file name onto the role it plays for a sample. Rules are
//! evaluated in order and the first match wins:
//!
//! 1. `<sample>_R1[_tag].{fastq,fastq.gz,fq,fq.gz}` → [`FileRole::Read1`]
//! 2. `<sample>_R2[_tag].{fastq,fastq.gz,fq,fq.gz}` → [`FileRole::Read2`]
//! 3. `<sample>[.ext...].{fasta,fa,fna}` → [`FileRole::Assembly`]
//!
//! Extension matching is case-sensitive.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Extensions accepted for paired-end read files, longest first so that
/// `.fastq.gz` is tried before `.fastq`.
pub const READ_EXTENSIONS: [&str; 4] = [".fastq.gz", ".fq.gz", ".fastq", ".fq"];

/// Extensions accepted for assembly files.
pub const ASSEMBLY_EXTENSIONS: [&str; 3] = [".fasta", ".fna", ".fa"];

/// Semantic role of a file within a sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileRole {
    /// First mate of a paired-end run.
    Read1,
    /// Second mate of a paired-end run.
    Read2,
    /// Assembled contigs.
    Assembly,
}

impl FileRole {
    /// Tag used in the sample sheet.
    pub fn as_str(&self) -> &'static str {
        match self {
            FileRole::Read1 => "read1",
            FileRole::Read2 => "read2",
            FileRole::Assembly => "assembly",
        }
    }

    /// Returns `true` for either read mate.
    pub fn is_read(&self) -> bool {
        matches!(self, FileRole::Read1 | FileRole::Read2)
    }
}

impl fmt::Display for FileRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A recognized file: its role plus the sample identifier derived from the name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    /// Role inferred from the suffix.
    pub role: FileRole,
    /// Name with the role marker and every extension removed.
    pub sample_id: String,
}

/// Classify a file name. Returns `None` for names that match no rule.
///
/// Only the final path component is inspected; callers pass
/// `entry.file_name()`, never a full path.
pub fn classify(file_name: &str) -> Option<Classification> {
    if let Some(stem) = strip_any_suffix(file_name, &READ_EXTENSIONS) {
        for (marker, role) in [("_R1", FileRole::Read1), ("_R2", FileRole::Read2)] {
            if let Some(sample_id) = strip_mate_marker(stem, marker) {
                return Some(Classification {
                    role,
                    sample_id: sample_id.to_string(),
                });
            }
        }
        return None;
    }

    let stem = strip_any_suffix(file_name, &ASSEMBLY_EXTENSIONS)?;
    let sample_id = strip_extensions(stem);
    if sample_id.is_empty() {
        return None;
    }
    Some(Classification {
        role: FileRole::Assembly,
        sample_id: sample_id.to_string(),
    })
}

fn strip_any_suffix<'a>(name: &'a str, suffixes: &[&str]) -> Option<&'a str> {
    suffixes.iter().find_map(|suffix| name.strip_suffix(suffix))
}

/// Removes `marker` and anything tagged after it (`_filt`, `_trimmed`, ...).
/// The marker must either end the stem or be followed by `_`.
fn strip_mate_marker<'a>(stem: &'a str, marker: &str) -> Option<&'a str> {
    let idx = stem.rfind(marker)?;
    let tail = &stem[idx + marker.len()..];
    if !(tail.is_empty() || tail.starts_with('_')) {
        return None;
    }
    let sample_id = strip_extensions(&stem[..idx]);
    (!sample_id.is_empty()).then_some(sample_id)
}

fn strip_extensions(stem: &str) -> &str {
    stem.split('.').next().unwrap_or(stem)
}
