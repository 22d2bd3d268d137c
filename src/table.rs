//! In-memory model of a DeepLabCut tracking table.
//!
//! A table is a frames × columns matrix of `f64` values. Each column is
//! keyed by the (scorer, bodypart, coordinate) tuple DeepLabCut writes, with
//! an extra individual level for multi-animal projects.

use ndarray::Array2;
use serde::Serialize;

/// Key of one column of a tracking table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PoseColumn {
    /// Network identifier, e.g. `DLC_resnet50_reachingFeb11shuffle1_500000`.
    pub scorer: String,
    /// Animal identifier, present in multi-animal outputs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub individual: Option<String>,
    /// Tracked body part, e.g. `snout`.
    pub bodypart: String,
    /// Coordinate label (`x`, `y`, `likelihood`, `z`). Kept opaque: the
    /// upstream tool owns this vocabulary.
    pub coord: String,
}

impl PoseColumn {
    /// Builds a column key from the levels of a serialized column tuple.
    /// Three levels are (scorer, bodypart, coord), four levels insert the
    /// individual after the scorer. Anything else is not a tracking column.
    pub fn from_levels(levels: &[String]) -> Option<Self> {
        match levels {
            [scorer, bodypart, coord] => Some(Self {
                scorer: scorer.clone(),
                individual: None,
                bodypart: bodypart.clone(),
                coord: coord.clone(),
            }),
            [scorer, individual, bodypart, coord] => Some(Self {
                scorer: scorer.clone(),
                individual: Some(individual.clone()),
                bodypart: bodypart.clone(),
                coord: coord.clone(),
            }),
            _ => None,
        }
    }
}

impl std::fmt::Display for PoseColumn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.individual {
            Some(individual) => write!(
                f,
                "{}/{}/{}/{}",
                self.scorer, individual, self.bodypart, self.coord
            ),
            None => write!(f, "{}/{}/{}", self.scorer, self.bodypart, self.coord),
        }
    }
}

/// Row index of a tracking table.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FrameIndex {
    /// Frame numbers, as produced by video analysis.
    Numbers(Vec<i64>),
    /// Frame labels (e.g. image paths from labeled-data analysis).
    Labels(Vec<String>),
}

impl FrameIndex {
    #[inline]
    pub fn len(&self) -> usize {
        match self {
            FrameIndex::Numbers(numbers) => numbers.len(),
            FrameIndex::Labels(labels) => labels.len(),
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A fully decoded tracking table.
#[derive(Debug, Clone)]
pub struct PoseTable {
    /// Column keys, in storage order.
    pub columns: Vec<PoseColumn>,
    /// Row index; same length as the number of value rows.
    pub frames: FrameIndex,
    /// Shape: (num_frames, num_columns). Cells may be NaN where the network
    /// produced no estimate.
    pub values: Array2<f64>,
}

impl PoseTable {
    /// Returns the number of frames (rows) in the table.
    #[inline]
    pub fn num_frames(&self) -> usize {
        self.values.nrows()
    }

    /// Returns the number of columns in the table.
    #[inline]
    pub fn num_columns(&self) -> usize {
        self.values.ncols()
    }

    /// The scorer identifier, taken from the first column.
    pub fn scorer(&self) -> Option<&str> {
        self.columns.first().map(|column| column.scorer.as_str())
    }

    /// Returns true if any column carries an individual level.
    pub fn has_individuals(&self) -> bool {
        self.columns.iter().any(|column| column.individual.is_some())
    }

    /// Unique body parts, in column order.
    pub fn bodyparts(&self) -> Vec<&str> {
        let mut seen: Vec<&str> = Vec::new();
        for column in &self.columns {
            if !seen.contains(&column.bodypart.as_str()) {
                seen.push(column.bodypart.as_str());
            }
        }
        seen
    }
}
