//! Typed records read from the report spreadsheets.
//!
//! Sheet pages arrive as loosely typed [`RawRecord`]s (header name to cell
//! text). They are converted here, once, into [`DeliveryRow`] and
//! [`Campaign`] so the rest of the crate never looks columns up by name.

use chrono::NaiveDate;
use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::error::{ReportError, Result};

lazy_static! {
    static ref CHANNEL_REGEX: Regex = Regex::new(r"\[(.*?)\]").unwrap();
}

/// One record of a sheet page, keyed by header name
pub type RawRecord = BTreeMap<String, String>;

/// Date format used by the delivery sheet
pub const SHEET_DATE_FORMAT: &str = "%d/%m/%Y";

pub const COL_SITE: &str = "Site";
pub const COL_ZONE: &str = "Zone";
pub const COL_DATE: &str = "Date";
pub const COL_IMPRESSIONS: &str = "Impressions";
pub const COL_CLICKS: &str = "Clicks";
pub const COL_CONVERSIONS: &str = "Conversions";
pub const COL_PLACEMENT_SIZE: &str = "Placement Size";

/// A day of delivery for one site, zone and placement
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeliveryRow {
    pub site: String,
    pub zone: String,
    pub date: NaiveDate,
    pub impressions: f64,
    pub clicks: f64,
    /// Viewable impressions, stored in the sheet's "Conversions" column
    pub conversions: f64,
    pub placement_size: String,
}

impl DeliveryRow {
    /// Convert a raw record into a delivery row
    ///
    /// # Arguments
    /// * `record` - The raw record
    /// * `row` - Sheet row number, used in error messages
    ///
    /// # Returns
    /// * `Ok(Some(row))` - A valid row with positive impressions
    /// * `Ok(None)` - A row without delivery (impressions missing, non-numeric or not positive)
    ///
    /// # Errors
    /// * `ReportError::MissingColumn` if a required column is absent
    /// * `ReportError::InvalidRow` if the date is not `dd/mm/yyyy`, even on a row
    ///   without delivery, or if a row with delivery has no date
    ///
    /// # Notes
    /// * A blank date is allowed on a row without delivery
    /// * Non-numeric clicks or conversions count as 0
    /// * The site name is trimmed
    pub fn from_record(record: &RawRecord, row: usize) -> Result<Option<Self>> {
        let raw_date = column(record, COL_DATE, row)?.trim();
        let date = if raw_date.is_empty() {
            None
        } else {
            let parsed = NaiveDate::parse_from_str(raw_date, SHEET_DATE_FORMAT).map_err(|e| {
                ReportError::InvalidRow {
                    row,
                    reason: format!("invalid date '{}': {}", raw_date, e),
                }
            })?;
            Some(parsed)
        };

        let impressions = match parse_number(column(record, COL_IMPRESSIONS, row)?) {
            Some(n) if n > 0.0 => n,
            _ => return Ok(None),
        };
        let date = date.ok_or_else(|| ReportError::InvalidRow {
            row,
            reason: "delivery without a date".to_string(),
        })?;

        Ok(Some(DeliveryRow {
            site: column(record, COL_SITE, row)?.trim().to_string(),
            zone: column(record, COL_ZONE, row)?.to_string(),
            date,
            impressions,
            clicks: parse_number(column(record, COL_CLICKS, row)?).unwrap_or(0.0),
            conversions: parse_number(column(record, COL_CONVERSIONS, row)?).unwrap_or(0.0),
            placement_size: record
                .get(COL_PLACEMENT_SIZE)
                .cloned()
                .unwrap_or_default(),
        }))
    }

    /// Channel label of this row's zone, or an empty string.
    pub fn channel_label(&self) -> &str {
        bracketed(&self.zone).unwrap_or("")
    }
}

/// Campaign metadata, looked up by the numeric prefix of a site name
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Campaign {
    pub id: String,
    pub name: String,
    pub client: String,
    pub agency: String,
    pub start: String,
    pub end: String,
}

impl Campaign {
    pub fn from_record(record: &RawRecord, row: usize) -> Result<Self> {
        let text = |name: &'static str| column(record, name, row).map(|v| v.trim().to_string());

        Ok(Campaign {
            id: text("ID")?,
            name: text("Campanha")?,
            client: text("Cliente")?,
            agency: text("Agência")?,
            start: text("Início")?,
            end: text("Término")?,
        })
    }
}

fn column<'r>(record: &'r RawRecord, name: &'static str, row: usize) -> Result<&'r str> {
    record
        .get(name)
        .map(String::as_str)
        .ok_or(ReportError::MissingColumn { row, column: name })
}

fn parse_number(value: &str) -> Option<f64> {
    value.trim().parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Text between the first `[` of a zone and the following `]`, untrimmed.
pub fn bracketed(zone: &str) -> Option<&str> {
    CHANNEL_REGEX
        .captures(zone)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Channel (veículo) identity of a zone string
///
/// # Examples
/// ```
/// use brz_report::record::extract_channel;
///
/// assert_eq!(extract_channel("Home [ Radio Sul ] 300x250"), Some("Radio Sul".to_string()));
/// assert_eq!(extract_channel("Home 300x250"), None);
/// ```
pub fn extract_channel(zone: &str) -> Option<String> {
    bracketed(zone).map(|channel| channel.trim().to_string())
}

/// Whether a zone carries `[channel]` verbatim.
pub fn zone_has_channel(zone: &str, channel: &str) -> bool {
    zone.contains(&format!("[{}]", channel))
}

/// Campaign ID of a site: everything before the first space.
pub fn campaign_id(site: &str) -> &str {
    site.split(' ').next().unwrap_or(site)
}
