use super::error::ResultsError;
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Per-model confidence scores written by `colabfold_batch`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ScoreFile {
    #[serde(default)]
    pub pae: Vec<Vec<f64>>,
    #[serde(default)]
    pub plddt: Vec<f64>,
    #[serde(default)]
    pub max_pae: Option<f64>,
    #[serde(default)]
    pub ptm: Option<f64>,
    #[serde(default)]
    pub iptm: Option<f64>,
}

impl ScoreFile {
    pub fn load(path: &Path) -> Result<Self, ResultsError> {
        let text = fs::read_to_string(path).map_err(ResultsError::io(path))?;
        serde_json::from_str(&text).map_err(|source| ResultsError::Json {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn mean_plddt(&self) -> Option<f64> {
        if self.plddt.is_empty() {
            None
        } else {
            Some(self.plddt.iter().sum::<f64>() / self.plddt.len() as f64)
        }
    }

    /// Builds the PAE matrix; `path` is only used in the error.
    pub fn pae_matrix(&self, path: &Path) -> Result<PaeMatrix, ResultsError> {
        PaeMatrix::from_rows(&self.pae).map_err(|reason| ResultsError::InvalidPae {
            path: path.to_path_buf(),
            reason,
        })
    }
}

/// Maps a model name to its score file. Relaxation keeps the scores of the unrelaxed
/// model, so relaxed names point at the unrelaxed file.
pub fn scores_file_name(model: &str) -> String {
    format!("{}_scores.json", model.replace("_relaxed_", "_unrelaxed_"))
}

/// Square matrix of predicted aligned errors, in Å, stored row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct PaeMatrix {
    size: usize,
    values: Vec<f64>,
}

impl PaeMatrix {
    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self, String> {
        let size = rows.len();
        if size == 0 {
            return Err("the matrix is empty".to_string());
        }
        let mut values = Vec::with_capacity(size * size);
        for (index, row) in rows.iter().enumerate() {
            if row.len() != size {
                return Err(format!(
                    "row {} has {} values, expected {}",
                    index,
                    row.len(),
                    size
                ));
            }
            values.extend_from_slice(row);
        }
        Ok(Self { size, values })
    }

    /// Number of residues.
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.values[row * self.size + col]
    }

    pub fn max(&self) -> f64 {
        self.values.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    }

    pub fn mean(&self) -> f64 {
        self.values.iter().sum::<f64>() / self.values.len() as f64
    }

    /// Mean over the block `rows x cols`.
    pub(crate) fn block_mean(
        &self,
        rows: std::ops::Range<usize>,
        cols: std::ops::Range<usize>,
    ) -> f64 {
        let mut sum = 0.0;
        let mut count = 0usize;
        for r in rows {
            for c in cols.clone() {
                sum += self.get(r, c);
                count += 1;
            }
        }
        if count == 0 { 0.0 } else { sum / count as f64 }
    }
}
