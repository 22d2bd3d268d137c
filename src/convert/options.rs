//! Conversion options and the output-format registry.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Target formats a tracking table can be converted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OutputFormat {
    /// Comma-separated values, readable with MATLAB's `readtable`.
    #[default]
    Csv,
    /// A JSON document, readable with MATLAB's `jsondecode`.
    Json,
}

impl OutputFormat {
    /// File extension used for converted files.
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Csv => "csv",
            OutputFormat::Json => "json",
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Csv => write!(f, "csv"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

/// Options for a conversion run.
#[derive(Debug, Clone, Default)]
pub struct ConvertOptions {
    /// Format to convert matching files to.
    pub format: OutputFormat,
    /// Directory to write converted files to. When unset, each converted
    /// file lands next to its source.
    pub output_dir: Option<PathBuf>,
    /// Overwrite existing converted files instead of skipping them.
    pub overwrite: bool,
}

impl ConvertOptions {
    /// Create new options for the given output format.
    pub fn new(format: OutputFormat) -> Self {
        Self {
            format,
            ..Self::default()
        }
    }

    /// Redirect converted files into `dir`.
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    /// Set whether existing converted files are overwritten.
    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }
}
