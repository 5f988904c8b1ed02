//! Sample discovery.
//!
//! Scans an input directory, classifies every file by name and groups the
//! recognized ones into per-sample records. The resulting [`Manifest`] is
//! the only thing the rest of the pipeline sees of the input layout.

mod classifier;
mod manifest;

pub use classifier::{classify, Classification, FileRole, ASSEMBLY_EXTENSIONS, READ_EXTENSIONS};
pub use manifest::{
    BuildManifest, DiscoveryError, InputMode, Manifest, SampleManifestBuilder, SampleRecord,
    JUNO_ASSEMBLY_DIR, JUNO_READS_DIR,
};
