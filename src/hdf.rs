//! Reading of DeepLabCut HDF5 output files.
//!
//! DeepLabCut serializes its predictions as a pandas DataFrame in the
//! "fixed" layout: one group holding the column index as level/code dataset
//! pairs, the row index as `axis1`, and the value matrix as `block0_values`.
//! This module decodes that layout into a [`PoseTable`]. Layouts this reader
//! does not understand come back as typed errors so a batch run can report
//! the file and move on.

use std::path::{Path, PathBuf};

use hdf5::types::{
    FixedAscii, FixedUnicode, FloatSize, IntSize, TypeDescriptor, VarLenAscii, VarLenUnicode,
};
use hdf5::{Dataset, Group};
use ndarray::Array2;
use thiserror::Error;

use crate::table::{FrameIndex, PoseColumn, PoseTable};

/// Group key DeepLabCut uses when saving predictions.
const DEFAULT_KEY: &str = "df_with_missing";

/// Longest fixed-size string this reader decodes.
const MAX_FIXED_STR: usize = 256;

/// Errors that can occur while decoding an output file.
#[derive(Error, Debug)]
pub enum ReadError {
    #[error("HDF5 error: {0}")]
    Hdf5(#[from] hdf5::Error),

    #[error("no table group in '{0}'")]
    NoTableGroup(PathBuf),

    #[error("unsupported layout: {0}")]
    UnsupportedLayout(String),

    #[error("unexpected shape: {0}")]
    UnexpectedShape(String),
}

/// Result type for read operations.
pub type Result<T> = std::result::Result<T, ReadError>;

/// Reads a DeepLabCut output file into a [`PoseTable`].
pub fn read_pose_file(path: &Path) -> Result<PoseTable> {
    let file = hdf5::File::open(path)?;
    let group = frame_group(&file, path)?;

    if group.link_exists("table") {
        return Err(ReadError::UnsupportedLayout(
            "PyTables 'table' format; re-save the frame in fixed format".to_string(),
        ));
    }
    if group.link_exists("block1_values") {
        return Err(ReadError::UnsupportedLayout(
            "more than one value block".to_string(),
        ));
    }

    let tuples = column_tuples(&group)?;
    let columns = tuples
        .iter()
        .map(|levels| {
            PoseColumn::from_levels(levels).ok_or_else(|| {
                ReadError::UnsupportedLayout(format!(
                    "expected scorer/bodyparts/coords column levels, got {} level(s)",
                    levels.len()
                ))
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let values = block_values(&group, columns.len())?;
    if values.ncols() != columns.len() {
        return Err(ReadError::UnexpectedShape(format!(
            "{} columns indexed, {} columns of data",
            columns.len(),
            values.ncols()
        )));
    }

    let frames = frame_index(&group, values.nrows())?;
    if frames.len() != values.nrows() {
        return Err(ReadError::UnexpectedShape(format!(
            "{} frames indexed, {} rows of data",
            frames.len(),
            values.nrows()
        )));
    }

    Ok(PoseTable {
        columns,
        frames,
        values,
    })
}

/// Locates the group holding the serialized frame: the `df_with_missing`
/// key if present, otherwise the first top-level group.
fn frame_group(file: &hdf5::File, path: &Path) -> Result<Group> {
    if let Ok(group) = file.group(DEFAULT_KEY) {
        return Ok(group);
    }
    for name in file.member_names()? {
        if let Ok(group) = file.group(&name) {
            return Ok(group);
        }
    }
    Err(ReadError::NoTableGroup(path.to_path_buf()))
}

/// Decodes the column index into one string tuple per column.
///
/// `block0_items` is what the value matrix is aligned to; `axis0` is the
/// fallback for files that do not carry block items.
fn column_tuples(group: &Group) -> Result<Vec<Vec<String>>> {
    for base in ["block0_items", "axis0"] {
        if group.link_exists(&format!("{}_level0", base)) {
            return multi_index(group, base);
        }
        if group.link_exists(base) {
            let names = string_array(&group.dataset(base)?)?;
            return Ok(names.into_iter().map(|name| vec![name]).collect());
        }
    }
    Err(ReadError::UnsupportedLayout(
        "no column index datasets".to_string(),
    ))
}

/// Reassembles a MultiIndex stored as `{base}_level{k}` / `{base}_label{k}`
/// dataset pairs.
fn multi_index(group: &Group, base: &str) -> Result<Vec<Vec<String>>> {
    let mut levels: Vec<Vec<String>> = Vec::new();
    let mut codes: Vec<Vec<i64>> = Vec::new();
    for k in 0.. {
        let level_name = format!("{}_level{}", base, k);
        if !group.link_exists(&level_name) {
            break;
        }
        levels.push(string_array(&group.dataset(&level_name)?)?);
        codes.push(int_array(
            &group.dataset(&format!("{}_label{}", base, k))?,
        )?);
    }

    let num_columns = codes.first().map_or(0, |code| code.len());
    if codes.iter().any(|code| code.len() != num_columns) {
        return Err(ReadError::UnexpectedShape(
            "column code arrays differ in length".to_string(),
        ));
    }

    let mut tuples = Vec::with_capacity(num_columns);
    for i in 0..num_columns {
        let mut tuple = Vec::with_capacity(levels.len());
        for (level, code) in levels.iter().zip(&codes) {
            let idx = usize::try_from(code[i])
                .ok()
                .filter(|&idx| idx < level.len())
                .ok_or_else(|| {
                    ReadError::UnexpectedShape(format!("column code {} out of range", code[i]))
                })?;
            tuple.push(level[idx].clone());
        }
        tuples.push(tuple);
    }
    Ok(tuples)
}

/// Reads the value matrix, normalized to frames × columns.
///
/// pandas stores the matrix either frames-major (flagged with a
/// `transposed` attribute) or columns-major; when the attribute is missing
/// the orientation is inferred from the column count.
fn block_values(group: &Group, num_columns: usize) -> Result<Array2<f64>> {
    let ds = group.dataset("block0_values")?;
    if ds.ndim() != 2 {
        return Err(ReadError::UnexpectedShape(format!(
            "value block has {} dimension(s)",
            ds.ndim()
        )));
    }
    let raw: Array2<f64> = match ds.dtype()?.to_descriptor()? {
        TypeDescriptor::Float(FloatSize::U8) => ds.read_2d::<f64>()?,
        TypeDescriptor::Float(FloatSize::U4) => ds.read_2d::<f32>()?.mapv(f64::from),
        other => {
            return Err(ReadError::UnsupportedLayout(format!(
                "value block stored as {:?}",
                other
            )))
        }
    };
    let frames_major = match bool_attr(&ds, "transposed") {
        Some(transposed) => transposed,
        None => raw.ncols() == num_columns,
    };
    Ok(if frames_major {
        raw
    } else {
        raw.reversed_axes()
    })
}

/// Reads the row index, falling back to `0..n` when `axis1` is absent or
/// stored in a type this tool does not interpret.
fn frame_index(group: &Group, num_rows: usize) -> Result<FrameIndex> {
    if !group.link_exists("axis1") {
        return Ok(FrameIndex::Numbers((0..num_rows as i64).collect()));
    }
    let ds = group.dataset("axis1")?;
    match ds.dtype()?.to_descriptor()? {
        TypeDescriptor::Integer(_) | TypeDescriptor::Unsigned(_) => {
            Ok(FrameIndex::Numbers(int_array(&ds)?))
        }
        TypeDescriptor::VarLenUnicode
        | TypeDescriptor::VarLenAscii
        | TypeDescriptor::FixedAscii(_)
        | TypeDescriptor::FixedUnicode(_) => Ok(FrameIndex::Labels(string_array(&ds)?)),
        other => {
            log::debug!("ignoring axis1 stored as {:?}; numbering frames from 0", other);
            Ok(FrameIndex::Numbers((0..num_rows as i64).collect()))
        }
    }
}

/// Reads a 1-D integer dataset of any width into `i64` values.
fn int_array(ds: &Dataset) -> Result<Vec<i64>> {
    let values = match ds.dtype()?.to_descriptor()? {
        TypeDescriptor::Integer(IntSize::U1) => {
            ds.read_raw::<i8>()?.into_iter().map(i64::from).collect()
        }
        TypeDescriptor::Integer(IntSize::U2) => {
            ds.read_raw::<i16>()?.into_iter().map(i64::from).collect()
        }
        TypeDescriptor::Integer(IntSize::U4) => {
            ds.read_raw::<i32>()?.into_iter().map(i64::from).collect()
        }
        TypeDescriptor::Integer(IntSize::U8) => ds.read_raw::<i64>()?,
        TypeDescriptor::Unsigned(IntSize::U1) => {
            ds.read_raw::<u8>()?.into_iter().map(i64::from).collect()
        }
        TypeDescriptor::Unsigned(IntSize::U2) => {
            ds.read_raw::<u16>()?.into_iter().map(i64::from).collect()
        }
        TypeDescriptor::Unsigned(IntSize::U4) => {
            ds.read_raw::<u32>()?.into_iter().map(i64::from).collect()
        }
        TypeDescriptor::Unsigned(IntSize::U8) => ds
            .read_raw::<u64>()?
            .into_iter()
            .map(|value| value as i64)
            .collect(),
        other => {
            return Err(ReadError::UnsupportedLayout(format!(
                "integer dataset stored as {:?}",
                other
            )))
        }
    };
    Ok(values)
}

/// Reads a 1-D string dataset, whichever of the HDF5 string flavors it
/// uses.
fn string_array(ds: &Dataset) -> Result<Vec<String>> {
    match ds.dtype()?.to_descriptor()? {
        TypeDescriptor::VarLenUnicode => Ok(ds
            .read_raw::<VarLenUnicode>()?
            .iter()
            .map(|s| s.as_str().to_owned())
            .collect()),
        TypeDescriptor::VarLenAscii => Ok(ds
            .read_raw::<VarLenAscii>()?
            .iter()
            .map(|s| s.as_str().to_owned())
            .collect()),
        TypeDescriptor::FixedAscii(n) if n <= MAX_FIXED_STR => Ok(ds
            .read_raw::<FixedAscii<MAX_FIXED_STR>>()?
            .iter()
            .map(|s| s.as_str().to_owned())
            .collect()),
        TypeDescriptor::FixedUnicode(n) if n <= MAX_FIXED_STR => Ok(ds
            .read_raw::<FixedUnicode<MAX_FIXED_STR>>()?
            .iter()
            .map(|s| s.as_str().to_owned())
            .collect()),
        other => Err(ReadError::UnsupportedLayout(format!(
            "string dataset stored as {:?}",
            other
        ))),
    }
}

fn bool_attr(ds: &Dataset, name: &str) -> Option<bool> {
    ds.attr(name).ok()?.read_scalar::<bool>().ok()
}
