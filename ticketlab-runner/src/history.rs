//! Draw history loading.
//!
//! Two CSV layouts are accepted, detected from the header row:
//!
//! - `date,m1,m2,m3,m4,m5,s1,s2` (comma separated, ISO dates, `date` optional)
//! - the lottery operator export: `date_de_tirage;boule_1..boule_5;etoile_1;etoile_2`
//!   (semicolon separated, `DD/MM/YYYY` dates, extra columns ignored)
//!
//! Rows are returned oldest first. When every row carries a date the rows are
//! sorted by date; otherwise file order is kept. Indices are assigned after
//! ordering, so `Draw::index` is the chronological position.
//!
//! Rows whose numbers parse but do not form a valid draw (wrong count,
//! duplicates, out of range) are kept and logged: they surface later as
//! excluded units instead of vanishing. Rows that do not parse are errors.

use std::io::Read;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use thiserror::Error;
use tracing::{debug, warn};

use ticketlab_core::domain::Draw;
use ticketlab_core::error::EngineError;

/// Errors from loading a draw history.
#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("failed to read history {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("history CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("history header is missing column {0:?}")]
    MissingColumn(String),

    #[error("history row {row}, column {column}: {value:?} is not an integer")]
    BadNumber {
        row: usize,
        column: String,
        value: String,
    },

    #[error("history row {row}: unrecognised date {value:?}")]
    BadDate { row: usize, value: String },

    #[error("history contains no draws")]
    Empty,
}

/// Column names for one CSV layout.
struct Layout {
    delimiter: u8,
    date: &'static str,
    main: [&'static str; 5],
    stars: [&'static str; 2],
}

const PLAIN: Layout = Layout {
    delimiter: b',',
    date: "date",
    main: ["m1", "m2", "m3", "m4", "m5"],
    stars: ["s1", "s2"],
};

const OPERATOR: Layout = Layout {
    delimiter: b';',
    date: "date_de_tirage",
    main: ["boule_1", "boule_2", "boule_3", "boule_4", "boule_5"],
    stars: ["etoile_1", "etoile_2"],
};

/// Chronologically ordered draws, immutable once loaded.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawHistory {
    draws: Vec<Draw>,
}

impl DrawHistory {
    /// Wrap draws that are already oldest first. Indices are reassigned.
    pub fn from_draws(draws: Vec<Draw>) -> Self {
        let draws = draws
            .into_iter()
            .enumerate()
            .map(|(i, d)| Draw { index: i, ..d })
            .collect();
        Self { draws }
    }

    pub fn load(path: &Path) -> Result<Self, HistoryError> {
        let file = std::fs::File::open(path).map_err(|source| HistoryError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let history = Self::from_reader(file)?;
        debug!(
            path = %path.display(),
            draws = history.len(),
            malformed = history.malformed_count(),
            "loaded draw history"
        );
        Ok(history)
    }

    pub fn from_reader<R: Read>(mut reader: R) -> Result<Self, HistoryError> {
        let mut content = String::new();
        reader
            .read_to_string(&mut content)
            .map_err(|source| HistoryError::Io {
                path: PathBuf::from("<reader>"),
                source,
            })?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, HistoryError> {
        let first_line = content.lines().next().unwrap_or_default();
        let layout = if first_line.contains(';') {
            &OPERATOR
        } else {
            &PLAIN
        };

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(layout.delimiter)
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(content.as_bytes());
        let headers = reader.headers()?.clone();
        let column = |name: &str| {
            headers
                .iter()
                .position(|h| h.eq_ignore_ascii_case(name))
                .ok_or_else(|| HistoryError::MissingColumn(name.to_string()))
        };
        let date_col = headers
            .iter()
            .position(|h| h.eq_ignore_ascii_case(layout.date));
        let main_cols = layout
            .main
            .iter()
            .map(|c| column(c))
            .collect::<Result<Vec<_>, _>>()?;
        let star_cols = layout
            .stars
            .iter()
            .map(|c| column(c))
            .collect::<Result<Vec<_>, _>>()?;

        let mut rows: Vec<(Option<NaiveDate>, Vec<u8>, Vec<u8>)> = Vec::new();
        for (i, record) in reader.records().enumerate() {
            let record = record?;
            let row = i + 1;
            let numbers = |cols: &[usize], names: &[&str]| -> Result<Vec<u8>, HistoryError> {
                cols.iter()
                    .zip(names)
                    .map(|(&c, name)| parse_number(record.get(c).unwrap_or(""), row, name))
                    .collect()
            };
            let date = match date_col.and_then(|c| record.get(c)) {
                Some(raw) if !raw.is_empty() => Some(parse_date(raw, row)?),
                _ => None,
            };
            let main = numbers(&main_cols, &layout.main)?;
            let stars = numbers(&star_cols, &layout.stars)?;
            rows.push((date, main, stars));
        }

        if rows.is_empty() {
            return Err(HistoryError::Empty);
        }
        if rows.iter().all(|(d, _, _)| d.is_some()) {
            rows.sort_by_key(|(d, _, _)| *d);
        }

        let draws: Vec<Draw> = rows
            .into_iter()
            .enumerate()
            .map(|(index, (date, main, stars))| Draw::new(index, date, main, stars))
            .collect();
        for draw in &draws {
            if let Err(reason) = draw.validate() {
                warn!(
                    index = draw.index,
                    date = ?draw.date,
                    %reason,
                    "malformed draw kept in history"
                );
            }
        }
        Ok(Self { draws })
    }

    pub fn draws(&self) -> &[Draw] {
        &self.draws
    }

    pub fn len(&self) -> usize {
        self.draws.len()
    }

    pub fn is_empty(&self) -> bool {
        self.draws.is_empty()
    }

    pub fn malformed_count(&self) -> usize {
        self.draws.iter().filter(|d| !d.is_well_formed()).count()
    }

    /// The most recent `window` draws, oldest first.
    pub fn recent(&self, window: usize) -> Result<&[Draw], EngineError> {
        recent_window(&self.draws, window)
    }

    /// Index the next, not yet drawn, draw would receive.
    pub fn next_index(&self) -> usize {
        self.draws.last().map_or(0, |d| d.index + 1)
    }

    /// BLAKE3 digest over every draw, recorded in reports.
    pub fn digest(&self) -> String {
        digest_draws(&self.draws)
    }
}

/// The last `window` entries of `draws`, or `InsufficientHistory`.
pub fn recent_window(draws: &[Draw], window: usize) -> Result<&[Draw], EngineError> {
    if window > draws.len() {
        return Err(EngineError::InsufficientHistory {
            requested: window,
            available: draws.len(),
        });
    }
    Ok(&draws[draws.len() - window..])
}

/// BLAKE3 digest over index, date and ids of each draw.
pub fn digest_draws(draws: &[Draw]) -> String {
    let mut hasher = blake3::Hasher::new();
    for d in draws {
        hasher.update(&(d.index as u64).to_le_bytes());
        if let Some(date) = d.date {
            hasher.update(date.to_string().as_bytes());
        }
        hasher.update(&[0xff]);
        hasher.update(&d.main);
        hasher.update(&[0xfe]);
        hasher.update(&d.stars);
        hasher.update(&[0xfd]);
    }
    hasher.finalize().to_hex().to_string()
}

fn parse_number(raw: &str, row: usize, column: &str) -> Result<u8, HistoryError> {
    let value: u32 = raw.parse().map_err(|_| HistoryError::BadNumber {
        row,
        column: column.to_string(),
        value: raw.to_string(),
    })?;
    // Values too large for u8 are kept as 255, which no pool contains.
    Ok(u8::try_from(value).unwrap_or(u8::MAX))
}

fn parse_date(raw: &str, row: usize) -> Result<NaiveDate, HistoryError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(raw, "%d/%m/%Y"))
        .map_err(|_| HistoryError::BadDate {
            row,
            value: raw.to_string(),
        })
}
