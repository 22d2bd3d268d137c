//! End-to-end tests: build a directory tree holding DeepLabCut-style HDF5
//! files and decoys, scan it, convert it, and check the results.

use std::fs;
use std::path::Path;

use hdf5::types::VarLenUnicode;
use ndarray::Array2;
use tempfile::tempdir;

use dlc_convert::convert::{ConvertOptions, Converter, OutputFormat};
use dlc_convert::scan::find_candidates;

const SCORER: &str = "DLC_resnet50_reachingFeb11shuffle1_500000";

fn varlen(values: &[&str]) -> Vec<VarLenUnicode> {
    values.iter().map(|value| value.parse().unwrap()).collect()
}

fn write_str(group: &hdf5::Group, name: &str, values: &[&str]) {
    group
        .new_dataset_builder()
        .with_data(&varlen(values))
        .create(name)
        .unwrap();
}

fn write_int(group: &hdf5::Group, name: &str, values: &[i64]) {
    group
        .new_dataset_builder()
        .with_data(values)
        .create(name)
        .unwrap();
}

/// Writes an HDF5 file shaped like a DeepLabCut prediction table: the
/// `df_with_missing` group with the column index stored as level/code
/// dataset pairs, integer `axis1`, and a frames-major `block0_values`.
fn write_pose_fixture(
    path: &Path,
    bodyparts: &[&str],
    individuals: Option<&[&str]>,
    nframes: usize,
) {
    let coords = ["x", "y", "likelihood"];
    let file = hdf5::File::create(path).unwrap();
    let group = file.create_group("df_with_missing").unwrap();

    let mut levels: Vec<Vec<&str>> = vec![vec![SCORER]];
    if let Some(individuals) = individuals {
        levels.push(individuals.to_vec());
    }
    levels.push(bodyparts.to_vec());
    levels.push(coords.to_vec());

    let mut codes: Vec<Vec<i64>> = vec![Vec::new(); levels.len()];
    for individual in 0..individuals.map_or(1, |names| names.len()) {
        for bodypart in 0..bodyparts.len() {
            for coord in 0..coords.len() {
                let mut level = 0;
                codes[level].push(0);
                level += 1;
                if individuals.is_some() {
                    codes[level].push(individual as i64);
                    level += 1;
                }
                codes[level].push(bodypart as i64);
                codes[level + 1].push(coord as i64);
            }
        }
    }

    for (k, level) in levels.iter().enumerate() {
        write_str(&group, &format!("axis0_level{}", k), level);
        write_str(&group, &format!("block0_items_level{}", k), level);
    }
    for (k, code) in codes.iter().enumerate() {
        write_int(&group, &format!("axis0_label{}", k), code);
        write_int(&group, &format!("block0_items_label{}", k), code);
    }

    let frame_numbers: Vec<i64> = (0..nframes as i64).collect();
    write_int(&group, "axis1", &frame_numbers);

    let ncols = codes[0].len();
    let mut values = Array2::<f64>::zeros((nframes, ncols));
    for ((row, col), cell) in values.indexed_iter_mut() {
        *cell = (row * ncols + col) as f64 * 0.5;
    }
    values[[0, 2]] = f64::NAN;
    let ds = group
        .new_dataset_builder()
        .with_data(&values)
        .create("block0_values")
        .unwrap();
    ds.new_attr::<bool>()
        .create("transposed")
        .unwrap()
        .write_scalar(&true)
        .unwrap();
}

#[test]
fn scan_and_convert_preserves_fields_and_records() {
    let dir = tempdir().unwrap();
    let videos = dir.path().join("videos");
    fs::create_dir_all(&videos).unwrap();

    let source = videos.join(format!("m01-trial3{}.h5", SCORER));
    write_pose_fixture(&source, &["nose", "tailbase"], None, 5);

    // decoys the scan must pass over
    let decoy_h5 = dir.path().join("calibration.h5");
    fs::write(&decoy_h5, b"raw").unwrap();
    fs::write(dir.path().join("notesDLC_shuffle1.csv"), b"notes").unwrap();
    fs::write(videos.join("m01DLC_resnet50_reaching.h5"), b"raw").unwrap();

    let candidates = find_candidates(dir.path(), None);
    assert_eq!(candidates, vec![source.clone()]);

    let converter = Converter::new(ConvertOptions::default());
    let outcome = converter.convert_file(&source);
    assert!(outcome.is_converted(), "{:?}", outcome.message);

    let dest = videos.join(format!("m01-trial3{}.csv", SCORER));
    let content = fs::read_to_string(&dest).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 3 + 5);
    assert!(lines[0].split(',').all(|field| field == SCORER));
    assert_eq!(lines[1], "nose,nose,nose,tailbase,tailbase,tailbase");
    assert_eq!(lines[2], "x,y,likelihood,x,y,likelihood");
    for line in &lines[3..] {
        assert_eq!(line.split(',').count(), 6);
    }
    // the NaN cell comes out empty
    assert_eq!(lines[3].split(',').nth(2).unwrap(), "");

    // non-matching files are untouched
    assert_eq!(fs::read(&decoy_h5).unwrap(), b"raw");
    assert_eq!(
        fs::read(dir.path().join("notesDLC_shuffle1.csv")).unwrap(),
        b"notes"
    );
}

#[test]
fn existing_output_is_skipped_unless_overwriting() {
    let dir = tempdir().unwrap();
    let source = dir.path().join(format!("a{}.h5", SCORER));
    write_pose_fixture(&source, &["nose"], None, 2);

    let converter = Converter::new(ConvertOptions::default());
    assert!(converter.convert_file(&source).is_converted());

    let outcome = converter.convert_file(&source);
    assert!(outcome.is_skipped());
    assert_eq!(
        outcome.message.as_deref(),
        Some("the converted file already exists")
    );

    let overwriting = Converter::new(ConvertOptions::default().with_overwrite(true));
    assert!(overwriting.convert_file(&source).is_converted());
}

#[test]
fn conversion_is_idempotent() {
    let dir = tempdir().unwrap();
    let source = dir.path().join(format!("b{}.h5", SCORER));
    write_pose_fixture(&source, &["nose", "earL", "earR"], None, 7);

    let converter = Converter::new(ConvertOptions::default().with_overwrite(true));
    let dest = converter.dest_path(&source);

    assert!(converter.convert_file(&source).is_converted());
    let first = fs::read(&dest).unwrap();
    assert!(converter.convert_file(&source).is_converted());
    let second = fs::read(&dest).unwrap();
    assert_eq!(first, second);
}

#[test]
fn corrupt_input_does_not_abort_the_batch() {
    let dir = tempdir().unwrap();
    let bad = dir.path().join(format!("bad{}.h5", SCORER));
    fs::write(&bad, b"definitely not an HDF5 container").unwrap();
    let good = dir.path().join(format!("good{}.h5", SCORER));
    write_pose_fixture(&good, &["nose"], None, 3);

    let candidates = find_candidates(dir.path(), None);
    assert_eq!(candidates.len(), 2);

    let converter = Converter::new(ConvertOptions::default());
    let outcomes: Vec<_> = candidates
        .iter()
        .map(|src| converter.convert_file(src))
        .collect();

    assert_eq!(outcomes.iter().filter(|o| o.is_failed()).count(), 1);
    assert_eq!(outcomes.iter().filter(|o| o.is_converted()).count(), 1);
    assert!(converter.dest_path(&good).exists());
    assert!(!converter.dest_path(&bad).exists());
}

#[test]
fn json_output_round_trips_through_serde() {
    let dir = tempdir().unwrap();
    let source = dir.path().join(format!("c{}.h5", SCORER));
    write_pose_fixture(&source, &["nose", "tailbase"], None, 4);

    let converter = Converter::new(ConvertOptions::new(OutputFormat::Json));
    assert!(converter.convert_file(&source).is_converted());

    let dest = converter.dest_path(&source);
    let doc: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&dest).unwrap()).unwrap();
    assert_eq!(doc["columns"].as_array().unwrap().len(), 6);
    assert_eq!(doc["columns"][0]["scorer"], SCORER);
    assert_eq!(doc["frames"], serde_json::json!([0, 1, 2, 3]));
    assert_eq!(doc["values"].as_array().unwrap().len(), 4);
    assert!(doc["values"][0][2].is_null());
}

#[test]
fn output_dir_collects_converted_files() {
    let dir = tempdir().unwrap();
    let videos = dir.path().join("videos");
    fs::create_dir_all(&videos).unwrap();
    let source = videos.join(format!("d{}.h5", SCORER));
    write_pose_fixture(&source, &["nose"], None, 2);

    let out_dir = dir.path().join("converted");
    let converter =
        Converter::new(ConvertOptions::default().with_output_dir(&out_dir));
    assert!(converter.convert_file(&source).is_converted());

    assert!(out_dir.join(format!("d{}.csv", SCORER)).exists());
    assert!(!videos.join(format!("d{}.csv", SCORER)).exists());
}

#[test]
fn multi_animal_tables_carry_an_individuals_row() {
    let dir = tempdir().unwrap();
    let source = dir.path().join(format!("e{}.h5", SCORER));
    write_pose_fixture(&source, &["nose"], Some(&["mouse1", "mouse2"]), 2);

    let converter = Converter::new(ConvertOptions::default());
    assert!(converter.convert_file(&source).is_converted());

    let content = fs::read_to_string(converter.dest_path(&source)).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 4 + 2);
    assert_eq!(lines[1], "mouse1,mouse1,mouse1,mouse2,mouse2,mouse2");
    assert_eq!(lines[2], "nose,nose,nose,nose,nose,nose");
    assert_eq!(lines[3], "x,y,likelihood,x,y,likelihood");
}
