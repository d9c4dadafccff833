use std::fs::File;
use std::io::{BufRead, BufReader, ErrorKind};
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::error::{ReportError, Result};
use crate::record::{Campaign, DeliveryRow, RawRecord};

/// Where sheet pages come from
///
/// Implementations return every record of one worksheet, in sheet order, as
/// header name to cell text. This is the only thing the report needs from a
/// spreadsheet backend.
pub trait SheetSource: Send + Sync {
    fn get_page(&self, spreadsheet: &str, sheet: &str) -> Result<Vec<RawRecord>>;
}

/// Sheet source backed by CSV exports on disk
///
/// A worksheet `sheet` of spreadsheet `spreadsheet` is read from
/// `<root>/<spreadsheet>/<sheet>.csv`. The first line holds the headers.
#[derive(Debug, Clone)]
pub struct CsvDirSource {
    root: PathBuf,
}

impl CsvDirSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        CsvDirSource { root: root.into() }
    }

    pub fn sheet_path(&self, spreadsheet: &str, sheet: &str) -> PathBuf {
        self.root.join(spreadsheet).join(format!("{}.csv", sheet))
    }
}

impl SheetSource for CsvDirSource {
    fn get_page(&self, spreadsheet: &str, sheet: &str) -> Result<Vec<RawRecord>> {
        let path = self.sheet_path(spreadsheet, sheet);
        log::debug!("Reading sheet {}", path.display());

        read_records(&path).map_err(|e| match e {
            ReportError::Io(io) if io.kind() == ErrorKind::NotFound => ReportError::SheetNotFound {
                spreadsheet: spreadsheet.to_string(),
                sheet: sheet.to_string(),
            },
            other => other,
        })
    }
}

/// Read a CSV file into records keyed by its header line
///
/// # Arguments
/// * `filepath` - Path to the CSV file
///
/// # Returns
/// * `Result<Vec<RawRecord>>` - One record per non-blank data line
///
/// # Notes
/// * Short lines are padded with empty cells; cells beyond the header are ignored
/// * Quoted cells may contain line breaks
/// * An empty file yields no records
pub fn read_records(filepath: impl AsRef<Path>) -> Result<Vec<RawRecord>> {
    let file = File::open(filepath)?;
    let reader = BufReader::new(file);
    let mut lines = reader.lines();

    let headers = match lines.next() {
        Some(line) => parse_csv_row(line?.trim_start_matches('\u{feff}')),
        None => return Ok(Vec::new()),
    };

    let mut records = Vec::new();
    let mut pending = String::new();
    for line in lines {
        let line = line?;
        if pending.is_empty() {
            if line.trim().is_empty() {
                continue;
            }
            pending = line;
        } else {
            // a quoted cell spans this line break
            pending.push('\n');
            pending.push_str(&line);
        }
        if has_open_quote(&pending) {
            continue;
        }

        let row = std::mem::take(&mut pending);
        let mut cells = parse_csv_row(&row).into_iter();
        let record: RawRecord = headers
            .iter()
            .map(|header| (header.trim().to_string(), cells.next().unwrap_or_default()))
            .collect();
        records.push(record);
    }

    if !pending.is_empty() {
        return Err(ReportError::InvalidRow {
            row: records.len() + 2,
            reason: "unterminated quoted cell".to_string(),
        });
    }

    Ok(records)
}

// Escaped quotes come in pairs, so an odd count leaves a cell open
fn has_open_quote(text: &str) -> bool {
    text.chars().filter(|&c| c == '"').count() % 2 == 1
}

// Parse a CSV row into a vector of strings
fn parse_csv_row(line: &str) -> Vec<String> {
    let mut result = Vec::new();
    let mut current_field = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' => {
                if in_quotes && chars.peek() == Some(&'"') {
                    // Escaped quote inside a quoted field
                    current_field.push('"');
                    chars.next();
                } else {
                    in_quotes = !in_quotes;
                }
            }
            ',' if !in_quotes => {
                result.push(std::mem::take(&mut current_field));
            }
            '\r' if !in_quotes && chars.peek().is_none() => {}
            _ => current_field.push(c),
        }
    }

    result.push(current_field);
    result
}

/// Snapshot of both report sheets, converted to typed records
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub rows: Vec<DeliveryRow>,
    pub campaigns: Vec<Campaign>,
}

impl Dataset {
    /// Load the delivery and campaign sheets named in `config`
    ///
    /// Rows without delivery are dropped. A malformed row fails the whole load
    /// so a broken sheet never produces a partial report.
    pub fn load(source: &dyn SheetSource, config: &Config) -> Result<Self> {
        let raw_rows = source.get_page(&config.spreadsheet_name, &config.sheet_name)?;
        let raw_campaigns = source.get_page(&config.spreadsheet_campaigns, &config.sheet_campaigns)?;
        let dataset = Self::from_records(&raw_rows, &raw_campaigns)?;

        log::debug!(
            "Loaded {} delivery rows ({} raw) and {} campaigns",
            dataset.rows.len(),
            raw_rows.len(),
            dataset.campaigns.len()
        );
        Ok(dataset)
    }

    pub fn from_records(rows: &[RawRecord], campaigns: &[RawRecord]) -> Result<Self> {
        // sheet row numbers start at 2, below the header
        let mut delivery = Vec::with_capacity(rows.len());
        for (i, record) in rows.iter().enumerate() {
            if let Some(row) = DeliveryRow::from_record(record, i + 2)? {
                delivery.push(row);
            }
        }

        let campaigns = campaigns
            .iter()
            .enumerate()
            .map(|(i, record)| Campaign::from_record(record, i + 2))
            .collect::<Result<Vec<_>>>()?;

        Ok(Dataset {
            rows: delivery,
            campaigns,
        })
    }

    /// First campaign whose ID matches.
    pub fn campaign(&self, id: &str) -> Option<&Campaign> {
        self.campaigns.iter().find(|c| c.id == id)
    }
}
