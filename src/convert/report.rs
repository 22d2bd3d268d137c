//! Per-file outcomes and the batch summary report.

use std::path::Path;

use serde::Serialize;

use super::options::OutputFormat;

/// What happened to one candidate file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversionStatus {
    Converted,
    Skipped,
    Failed,
}

impl std::fmt::Display for ConversionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConversionStatus::Converted => write!(f, "converted"),
            ConversionStatus::Skipped => write!(f, "skipped"),
            ConversionStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Outcome of converting one file.
#[derive(Debug, Clone, Serialize)]
pub struct FileOutcome {
    /// Source file path.
    pub source: String,
    /// Destination file path (whether or not it was written).
    pub dest: String,
    pub status: ConversionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub duration_ms: u64,
}

impl FileOutcome {
    pub fn converted(source: &Path, dest: &Path, duration_ms: u64) -> Self {
        Self {
            source: source.display().to_string(),
            dest: dest.display().to_string(),
            status: ConversionStatus::Converted,
            message: None,
            duration_ms,
        }
    }

    pub fn skipped(source: &Path, dest: &Path, message: impl Into<String>) -> Self {
        Self {
            source: source.display().to_string(),
            dest: dest.display().to_string(),
            status: ConversionStatus::Skipped,
            message: Some(message.into()),
            duration_ms: 0,
        }
    }

    pub fn failed(source: &Path, dest: &Path, message: impl Into<String>) -> Self {
        Self {
            source: source.display().to_string(),
            dest: dest.display().to_string(),
            status: ConversionStatus::Failed,
            message: Some(message.into()),
            duration_ms: 0,
        }
    }

    pub fn is_converted(&self) -> bool {
        self.status == ConversionStatus::Converted
    }

    pub fn is_skipped(&self) -> bool {
        self.status == ConversionStatus::Skipped
    }

    pub fn is_failed(&self) -> bool {
        self.status == ConversionStatus::Failed
    }
}

/// Summary of a whole conversion run.
#[derive(Debug, Clone, Serialize)]
pub struct BatchSummary {
    /// Directory that was scanned.
    pub directory: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<String>,
    pub format: OutputFormat,
    /// Timestamp of the run, RFC 3339.
    pub timestamp: String,
    pub duration_ms: u64,
    pub converted: usize,
    pub skipped: usize,
    pub failed: usize,
    pub files: Vec<FileOutcome>,
}

impl BatchSummary {
    /// Create an empty summary for a run over `directory`.
    pub fn new(directory: &Path, output_dir: Option<&Path>, format: OutputFormat) -> Self {
        Self {
            directory: directory.display().to_string(),
            output_dir: output_dir.map(|dir| dir.display().to_string()),
            format,
            timestamp: chrono::Utc::now().to_rfc3339(),
            duration_ms: 0,
            converted: 0,
            skipped: 0,
            failed: 0,
            files: Vec::new(),
        }
    }

    /// Record one outcome, updating the counters.
    pub fn push(&mut self, outcome: FileOutcome) {
        match outcome.status {
            ConversionStatus::Converted => self.converted += 1,
            ConversionStatus::Skipped => self.skipped += 1,
            ConversionStatus::Failed => self.failed += 1,
        }
        self.files.push(outcome);
    }

    /// Total number of candidate files seen.
    pub fn total(&self) -> usize {
        self.files.len()
    }

    /// Convert to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Convert to human-readable text format.
    pub fn to_text(&self) -> String {
        let mut output = String::new();

        output.push_str("Conversion Summary\n");
        output.push_str("==================\n");
        output.push_str(&format!("Directory: {}\n", self.directory));
        if let Some(output_dir) = &self.output_dir {
            output.push_str(&format!("Output:    {}\n", output_dir));
        }
        output.push_str(&format!("Format:    {}\n", self.format));
        output.push_str(&format!("Date:      {}\n", self.timestamp));
        output.push_str(&format!("Time:      {}ms\n\n", self.duration_ms));

        output.push_str(&format!("Files found: {}\n", self.total()));
        output.push_str(&format!("Converted:   {}\n", self.converted));
        output.push_str(&format!("Skipped:     {}\n", self.skipped));
        output.push_str(&format!("Failed:      {}\n", self.failed));

        if !self.files.is_empty() {
            output.push('\n');
            for file in &self.files {
                match file.status {
                    ConversionStatus::Converted => {
                        output.push_str(&format!(
                            "✓ {} -> {} ({}ms)\n",
                            file.source, file.dest, file.duration_ms
                        ));
                    }
                    ConversionStatus::Skipped => {
                        output.push_str(&format!(
                            "⚠ {} ({})\n",
                            file.source,
                            file.message.as_deref().unwrap_or("skipped")
                        ));
                    }
                    ConversionStatus::Failed => {
                        output.push_str(&format!(
                            "✗ {} ({})\n",
                            file.source,
                            file.message.as_deref().unwrap_or("failed")
                        ));
                    }
                }
            }
        }

        output
    }
}
