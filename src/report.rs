use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::access::AccessDecision;
use crate::record::{Campaign, DeliveryRow, campaign_id};
use crate::source::Dataset;

/// Date format used in the summary table
pub const SUMMARY_DATE_FORMAT: &str = "%d/%m/%Y";

pub const AGENCY_TITLE: &str = "Relatório Completo - Agência";

/// Inclusive range of report dates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// Range spanning the earliest and latest row dates, if any rows exist.
    pub fn of_rows(rows: &[DeliveryRow]) -> Option<Self> {
        let start = rows.iter().map(|r| r.date).min()?;
        let end = rows.iter().map(|r| r.date).max()?;
        Some(DateRange { start, end })
    }

    /// Narrow this range to the requested bounds
    ///
    /// Each bound is clamped into `self`; a missing bound keeps the full
    /// extent. A start after the end is kept as is and matches nothing.
    pub fn narrow(&self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        let clamp = |d: NaiveDate| d.clamp(self.start, self.end);
        DateRange {
            start: start.map(clamp).unwrap_or(self.start),
            end: end.map(clamp).unwrap_or(self.end),
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// Headline numbers of a report
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metrics {
    pub total_impressions: f64,
    pub total_conversions: f64,
    /// Viewable impressions as a percentage of impressions
    pub va_percent: f64,
    pub total_clicks: f64,
    /// Click-through rate in percent
    pub ctr: f64,
}

impl Metrics {
    pub fn from_rows<'a>(rows: impl IntoIterator<Item = &'a DeliveryRow>) -> Self {
        let (mut impressions, mut conversions, mut clicks) = (0.0, 0.0, 0.0);
        for row in rows {
            impressions += row.impressions;
            conversions += row.conversions;
            clicks += row.clicks;
        }

        Metrics {
            total_impressions: impressions,
            total_conversions: conversions,
            va_percent: percent(conversions, impressions),
            total_clicks: clicks,
            ctr: percent(clicks, impressions),
        }
    }
}

/// Impressions delivered on one day
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyPoint {
    pub date: NaiveDate,
    pub impressions: f64,
}

/// One line of the summary table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryRow {
    /// `dd/mm/yyyy`, or `Total` for the totals line
    pub date: String,
    pub channel: String,
    pub placement_size: String,
    pub impressions: f64,
    pub clicks: f64,
    pub viewable_impressions: f64,
    pub va_percent: f64,
    pub ctr: f64,
}

/// Delivery grouped by day, channel and placement size, plus a totals line
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryTable {
    pub rows: Vec<SummaryRow>,
    pub total: SummaryRow,
}

impl SummaryTable {
    /// Group rows by (date, channel, placement size)
    ///
    /// # Returns
    /// * `Option<SummaryTable>` - `None` when there are no rows
    ///
    /// # Notes
    /// * Groups are ordered by date, then channel, then placement size
    /// * VA% and CTR are rounded to 2 decimals per group
    /// * The totals line sums the counts and averages the per-group percentages
    pub fn from_rows<'a>(rows: impl IntoIterator<Item = &'a DeliveryRow>) -> Option<Self> {
        let mut groups: BTreeMap<(NaiveDate, &str, &str), (f64, f64, f64)> = BTreeMap::new();
        for row in rows {
            let key = (row.date, row.channel_label(), row.placement_size.as_str());
            let sums = groups.entry(key).or_insert((0.0, 0.0, 0.0));
            sums.0 += row.impressions;
            sums.1 += row.clicks;
            sums.2 += row.conversions;
        }

        if groups.is_empty() {
            return None;
        }

        let rows: Vec<SummaryRow> = groups
            .into_iter()
            .map(|((date, channel, size), (impressions, clicks, viewable))| SummaryRow {
                date: date.format(SUMMARY_DATE_FORMAT).to_string(),
                channel: channel.to_string(),
                placement_size: size.to_string(),
                impressions,
                clicks,
                viewable_impressions: viewable,
                va_percent: round2(percent(viewable, impressions)),
                ctr: round2(percent(clicks, impressions)),
            })
            .collect();

        let count = rows.len() as f64;
        let total = SummaryRow {
            date: "Total".to_string(),
            channel: "-".to_string(),
            placement_size: "-".to_string(),
            impressions: rows.iter().map(|r| r.impressions).sum(),
            clicks: rows.iter().map(|r| r.clicks).sum(),
            viewable_impressions: rows.iter().map(|r| r.viewable_impressions).sum(),
            va_percent: round2(rows.iter().map(|r| r.va_percent).sum::<f64>() / count),
            ctr: round2(rows.iter().map(|r| r.ctr).sum::<f64>() / count),
        };

        Some(SummaryTable { rows, total })
    }
}

/// Everything a report page shows
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub title: String,
    pub decision: AccessDecision,
    pub campaign: Option<Campaign>,
    /// Dates the report covers; `None` when the sheet has no rows
    pub range: Option<DateRange>,
    /// `None` when no rows match the scope and dates
    pub metrics: Option<Metrics>,
    pub daily: Vec<DailyPoint>,
    pub summary: Option<SummaryTable>,
}

/// Build the report an access decision allows
///
/// # Arguments
/// * `dataset` - Current snapshot of the sheets
/// * `decision` - Result of [`authorize`](crate::access::authorize)
/// * `start` - Requested first date, clamped to the data
/// * `end` - Requested last date, clamped to the data
///
/// # Returns
/// * `Option<Report>` - `None` for a denied decision, which must reveal nothing
pub fn build_report(
    dataset: &Dataset,
    decision: &AccessDecision,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> Option<Report> {
    let title = match decision {
        AccessDecision::Agency => AGENCY_TITLE.to_string(),
        AccessDecision::Scoped { site, channel } => format!("Relatório: {} - {}", site, channel),
        AccessDecision::Denied => return None,
    };

    let campaign = decision.site().and_then(|site| {
        let id = campaign_id(site);
        let found = dataset.campaign(id).cloned();
        if found.is_none() {
            log::warn!("No campaign found for ID '{}'", id);
        }
        found
    });

    // the date bounds come from the whole sheet, not the scoped rows
    let range = DateRange::of_rows(&dataset.rows).map(|full| full.narrow(start, end));

    let visible: Vec<&DeliveryRow> = dataset
        .rows
        .iter()
        .filter(|row| decision.permits(row))
        .filter(|row| range.is_some_and(|r| r.contains(row.date)))
        .collect();

    if visible.is_empty() {
        log::info!("No rows for '{}' in the selected dates", title);
    }

    let metrics = (!visible.is_empty()).then(|| Metrics::from_rows(visible.iter().copied()));
    let daily = daily_impressions(visible.iter().copied());
    let summary = SummaryTable::from_rows(visible.iter().copied());

    Some(Report {
        title,
        decision: decision.clone(),
        campaign,
        range,
        metrics,
        daily,
        summary,
    })
}

/// Impressions summed per date, ascending.
pub fn daily_impressions<'a>(rows: impl IntoIterator<Item = &'a DeliveryRow>) -> Vec<DailyPoint> {
    let mut by_date: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for row in rows {
        *by_date.entry(row.date).or_insert(0.0) += row.impressions;
    }
    by_date
        .into_iter()
        .map(|(date, impressions)| DailyPoint { date, impressions })
        .collect()
}

fn percent(part: f64, whole: f64) -> f64 {
    if whole > 0.0 { part / whole * 100.0 } else { 0.0 }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round_ties_even() / 100.0
}
