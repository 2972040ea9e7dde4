//! Score providers: where a sweep's weight snapshot comes from.
//!
//! A provider is queried exactly once per sweep. The resulting
//! [`ScoreSnapshot`] is then passed by reference to every unit, so nothing
//! inside the parallel region ever reloads scores.
//!
//! Every way a snapshot can be missing or malformed surfaces as
//! [`EngineError::DataUnavailable`]. [`ScoreError`] only carries the
//! file-level cause until it is folded into that message.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use ticketlab_core::domain::{Draw, Pool, ScoreSnapshot, ScoreVector};
use ticketlab_core::error::EngineError;

/// File-level causes of a failed score load.
#[derive(Debug, Error)]
pub enum ScoreError {
    #[error("failed to read score file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed score file {path}: {reason}")]
    Format { path: PathBuf, reason: String },

    #[error("unsupported score file extension: {0} (expected .csv or .json)")]
    UnsupportedFormat(PathBuf),

    #[error(transparent)]
    Engine(#[from] EngineError),
}

impl From<ScoreError> for EngineError {
    fn from(err: ScoreError) -> Self {
        match err {
            ScoreError::Engine(e) => e,
            other => EngineError::DataUnavailable(other.to_string()),
        }
    }
}

/// Source of one immutable score snapshot.
pub trait ScoreProvider: Send + Sync {
    /// Short label recorded in logs and reports.
    fn name(&self) -> &str;

    /// Build the snapshot. Fails with `DataUnavailable` when the data is
    /// missing or malformed, and with `Configuration` for bad provider
    /// parameters.
    fn snapshot(&self) -> Result<ScoreSnapshot, EngineError>;
}

// ─── In-memory providers ────────────────────────────────────────────

/// A snapshot supplied by the caller.
#[derive(Debug, Clone)]
pub struct StaticScores(pub ScoreSnapshot);

impl ScoreProvider for StaticScores {
    fn name(&self) -> &str {
        "static"
    }

    fn snapshot(&self) -> Result<ScoreSnapshot, EngineError> {
        Ok(self.0.clone())
    }
}

/// Equal weight for every id.
#[derive(Debug, Clone, Copy, Default)]
pub struct UniformScores;

impl ScoreProvider for UniformScores {
    fn name(&self) -> &str {
        "uniform"
    }

    fn snapshot(&self) -> Result<ScoreSnapshot, EngineError> {
        Ok(ScoreSnapshot::uniform())
    }
}

// ─── Frequency provider ─────────────────────────────────────────────

/// Appearance counts over the most recent `lookback` well-formed draws,
/// plus `smoothing` for every id.
#[derive(Debug, Clone)]
pub struct FrequencyScores<'a> {
    history: &'a [Draw],
    lookback: usize,
    smoothing: f64,
}

impl<'a> FrequencyScores<'a> {
    pub fn new(history: &'a [Draw], lookback: usize, smoothing: f64) -> Self {
        Self {
            history,
            lookback,
            smoothing,
        }
    }

    fn counts(&self, pool: Pool) -> Vec<f64> {
        let mut weights = vec![self.smoothing; pool.size()];
        for draw in self.recent() {
            for &id in draw.ids(pool) {
                weights[usize::from(id) - 1] += 1.0;
            }
        }
        weights
    }

    fn recent(&self) -> impl Iterator<Item = &'a Draw> {
        self.history
            .iter()
            .rev()
            .filter(|d| d.is_well_formed())
            .take(self.lookback)
    }
}

impl ScoreProvider for FrequencyScores<'_> {
    fn name(&self) -> &str {
        "frequency"
    }

    fn snapshot(&self) -> Result<ScoreSnapshot, EngineError> {
        if self.lookback == 0 {
            return Err(EngineError::Configuration(
                "frequency lookback must be at least 1".into(),
            ));
        }
        if !self.smoothing.is_finite() || self.smoothing < 0.0 {
            return Err(EngineError::Configuration(format!(
                "frequency smoothing must be finite and non-negative, got {}",
                self.smoothing
            )));
        }
        if self.recent().next().is_none() {
            return Err(EngineError::DataUnavailable(
                "no well-formed draws for frequency scores".into(),
            ));
        }
        ScoreSnapshot::from_weights(self.counts(Pool::Main), self.counts(Pool::Star))
    }
}

// ─── File provider ──────────────────────────────────────────────────

/// Weights read from disk.
///
/// - `.csv`: header `pool,id,weight`, one row per id, every id of both pools.
/// - `.json`: `{ "main": [50 weights], "stars": [12 weights] }`, index 0 = id 1.
#[derive(Debug, Clone)]
pub struct ScoreFile {
    path: PathBuf,
}

#[derive(Debug, Deserialize)]
struct JsonScores {
    main: Vec<f64>,
    stars: Vec<f64>,
}

#[derive(Debug, Deserialize)]
struct CsvScoreRow {
    pool: String,
    id: u8,
    weight: f64,
}

impl ScoreFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn format_err(&self, reason: impl Into<String>) -> ScoreError {
        ScoreError::Format {
            path: self.path.clone(),
            reason: reason.into(),
        }
    }

    fn read(&self) -> Result<String, ScoreError> {
        std::fs::read_to_string(&self.path).map_err(|source| ScoreError::Io {
            path: self.path.clone(),
            source,
        })
    }

    fn parse_json(&self, content: &str) -> Result<ScoreSnapshot, ScoreError> {
        let raw: JsonScores =
            serde_json::from_str(content).map_err(|e| self.format_err(e.to_string()))?;
        Ok(ScoreSnapshot::from_weights(raw.main, raw.stars)?)
    }

    fn load(&self) -> Result<ScoreSnapshot, ScoreError> {
        let ext = self
            .path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        match ext.as_deref() {
            Some("json") => self.parse_json(&self.read()?),
            Some("csv") => self.parse_csv(&self.read()?),
            _ => Err(ScoreError::UnsupportedFormat(self.path.clone())),
        }
    }

    fn parse_csv(&self, content: &str) -> Result<ScoreSnapshot, ScoreError> {
        let mut main = BTreeMap::new();
        let mut stars = BTreeMap::new();
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(content.as_bytes());
        for (line, row) in reader.deserialize::<CsvScoreRow>().enumerate() {
            let row = row.map_err(|e| self.format_err(format!("row {}: {e}", line + 1)))?;
            let pool = Pool::parse(&row.pool).ok_or_else(|| {
                self.format_err(format!("row {}: unknown pool {:?}", line + 1, row.pool))
            })?;
            let target = match pool {
                Pool::Main => &mut main,
                Pool::Star => &mut stars,
            };
            if target.insert(row.id, row.weight).is_some() {
                return Err(self.format_err(format!("duplicate {pool} id {}", row.id)));
            }
        }
        Ok(ScoreSnapshot::new(
            ScoreVector::from_map(Pool::Main, &main)?,
            ScoreVector::from_map(Pool::Star, &stars)?,
        )?)
    }
}

impl ScoreProvider for ScoreFile {
    fn name(&self) -> &str {
        "file"
    }

    fn snapshot(&self) -> Result<ScoreSnapshot, EngineError> {
        self.load().map_err(EngineError::from)
    }
}
