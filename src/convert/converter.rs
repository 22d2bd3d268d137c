//! Single-file conversion: destination naming, overwrite handling, and
//! per-file error containment.

use std::path::{Path, PathBuf};
use std::time::Instant;

use super::options::{ConvertOptions, OutputFormat};
use super::report::FileOutcome;
use super::writer;
use crate::hdf;

/// Converts DeepLabCut output files according to a fixed set of options.
pub struct Converter {
    options: ConvertOptions,
}

impl Converter {
    /// Create a converter with the given options.
    pub fn new(options: ConvertOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ConvertOptions {
        &self.options
    }

    /// Destination path for a source file: the source path with the
    /// format's extension, relocated into the output directory when one is
    /// set.
    pub fn dest_path(&self, src: &Path) -> PathBuf {
        let dest = src.with_extension(self.options.format.extension());
        match (&self.options.output_dir, dest.file_name()) {
            (Some(dir), Some(name)) => dir.join(name),
            _ => dest,
        }
    }

    /// Converts a single file. All failures are captured in the returned
    /// outcome, so converting one bad file never takes down a batch.
    pub fn convert_file(&self, src: &Path) -> FileOutcome {
        let dest = self.dest_path(src);
        let start = Instant::now();

        if let Err(e) = writer::ensure_parent_dirs(&dest) {
            return FileOutcome::failed(
                src,
                &dest,
                format!("failed to create output directory: {}", e),
            );
        }
        if dest.exists() && !self.options.overwrite {
            return FileOutcome::skipped(src, &dest, "the converted file already exists");
        }

        let table = match hdf::read_pose_file(src) {
            Ok(table) => table,
            Err(e) => return FileOutcome::failed(src, &dest, format!("failed to convert: {}", e)),
        };
        log::debug!(
            "{}: {} frame(s), {} bodypart(s)",
            src.display(),
            table.num_frames(),
            table.bodyparts().len()
        );

        let written = match self.options.format {
            OutputFormat::Csv => writer::write_csv(&dest, &table),
            OutputFormat::Json => writer::write_json(&dest, &table),
        };
        match written {
            Ok(()) => FileOutcome::converted(src, &dest, start.elapsed().as_millis() as u64),
            Err(e) => FileOutcome::failed(src, &dest, format!("failed to convert: {}", e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_dest_path_next_to_source() {
        let converter = Converter::new(ConvertOptions::default());
        assert_eq!(
            converter.dest_path(Path::new("/data/videos/aDLC_shuffle1.h5")),
            PathBuf::from("/data/videos/aDLC_shuffle1.csv")
        );
    }

    #[test]
    fn test_dest_path_into_output_dir() {
        let converter = Converter::new(
            ConvertOptions::new(OutputFormat::Json).with_output_dir("/converted"),
        );
        assert_eq!(
            converter.dest_path(Path::new("/data/videos/aDLC_shuffle1.h5")),
            PathBuf::from("/converted/aDLC_shuffle1.json")
        );
    }

    #[test]
    fn test_skips_existing_destination() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("aDLC_resnet50_demoshuffle1_100.h5");
        let dest = dir.path().join("aDLC_resnet50_demoshuffle1_100.csv");
        fs::write(&src, b"x").unwrap();
        fs::write(&dest, b"existing").unwrap();

        let converter = Converter::new(ConvertOptions::default());
        let outcome = converter.convert_file(&src);
        assert!(outcome.is_skipped());
        // the existing file is untouched
        assert_eq!(fs::read(&dest).unwrap(), b"existing");
    }

    #[test]
    fn test_failure_is_contained() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("aDLC_resnet50_demoshuffle1_100.h5");
        fs::write(&src, b"not an HDF5 container").unwrap();

        let converter = Converter::new(ConvertOptions::default());
        let outcome = converter.convert_file(&src);
        assert!(outcome.is_failed());
        assert!(outcome.message.unwrap().contains("failed to convert"));
        // nothing was written
        assert!(!dir
            .path()
            .join("aDLC_resnet50_demoshuffle1_100.csv")
            .exists());
    }
}
