use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

/// Failures while writing configuration files.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Value could not be rendered as YAML.
    #[error("failed to serialize YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// File or directory could not be written.
    #[error("failed to write {}: {source}", .path.display())]
    Io {
        /// Target path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
}

/// Serialize `value` as block-style YAML into `writer`.
pub fn write_yaml<W: Write, T: Serialize + ?Sized>(writer: W, value: &T) -> Result<(), ConfigError> {
    serde_yaml::to_writer(writer, value)?;
    Ok(())
}

/// Render `value` to a YAML string (handy for tests and `--print`).
pub fn render_yaml<T: Serialize + ?Sized>(value: &T) -> Result<String, ConfigError> {
    Ok(serde_yaml::to_string(value)?)
}

/// Write `value` to `path`, creating parent directories.
pub fn write_yaml_file<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), ConfigError> {
    let io_err = |source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_err)?;
    }
    let mut writer = BufWriter::new(File::create(path).map_err(io_err)?);
    write_yaml(&mut writer, value)?;
    writer.flush().map_err(io_err)?;
    Ok(())
}
