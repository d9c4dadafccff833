use crate::report::{SummaryRow, SummaryTable};

/// Column headers of an exported summary table
pub const SUMMARY_HEADERS: [&str; 8] = [
    "Date",
    "Veículo",
    "Placement Size",
    "Impressions",
    "Clicks",
    "Viewable Impression",
    "VA%",
    "CTR",
];

/// Convert a summary table to CSV format
///
/// Writes the header line, one line per group and the totals line last.
/// Counts are written without decimals and percentages with two.
///
/// # Arguments
/// * `table` - The summary table to export
///
/// # Returns
/// * `String` - CSV content, `\n` line endings
///
/// # Examples
/// ```
/// use brz_report::downloader::to_csv;
/// use brz_report::report::{SummaryRow, SummaryTable};
///
/// let row = SummaryRow {
///     date: "01/03/2024".to_string(),
///     channel: "Radio Sul".to_string(),
///     placement_size: "300x250".to_string(),
///     impressions: 1000.0,
///     clicks: 10.0,
///     viewable_impressions: 500.0,
///     va_percent: 50.0,
///     ctr: 1.0,
/// };
/// let table = SummaryTable { rows: vec![row.clone()], total: row };
/// let csv = to_csv(&table);
/// assert!(csv.starts_with("Date,Veículo,"));
/// assert_eq!(csv.lines().count(), 3);
/// ```
pub fn to_csv(table: &SummaryTable) -> String {
    let mut csv_content = SUMMARY_HEADERS.join(",");
    csv_content.push('\n');

    for row in table.rows.iter().chain(std::iter::once(&table.total)) {
        let fields = csv_fields(row);
        for (i, value) in fields.iter().enumerate() {
            if i > 0 {
                csv_content.push(',');
            }
            // Handle value - escape commas, quotes, newlines as needed
            if value.contains(',') || value.contains('"') || value.contains('\n') {
                let escaped = value.replace('"', "\"\"");
                csv_content.push_str(&format!("\"{}\"", escaped));
            } else {
                csv_content.push_str(value);
            }
        }
        csv_content.push('\n');
    }

    csv_content
}

fn csv_fields(row: &SummaryRow) -> [String; 8] {
    [
        row.date.clone(),
        row.channel.clone(),
        row.placement_size.clone(),
        format!("{:.0}", row.impressions),
        format!("{:.0}", row.clicks),
        format!("{:.0}", row.viewable_impressions),
        format!("{:.2}", row.va_percent),
        format!("{:.2}", row.ctr),
    ]
}

/// Convert a summary table to XLSX format
///
/// Counts and percentages are written as numbers so the workbook can be
/// recalculated; percentages keep their 0-100 scale.
///
/// # Arguments
/// * `table` - The summary table to export
///
/// # Returns
/// * `Result<Vec<u8>, ReportError>` - XLSX file content as bytes or an error
#[cfg(feature = "web")]
pub fn to_xlsx(table: &SummaryTable) -> crate::error::Result<Vec<u8>> {
    use rust_xlsxwriter::{Format, Workbook};

    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    let bold = Format::new().set_bold();
    let counts = Format::new().set_num_format("#,##0");
    let percent = Format::new().set_num_format("0.00");

    for (col, header) in SUMMARY_HEADERS.iter().enumerate() {
        worksheet.write_string_with_format(0, col as u16, *header, &bold)?;
    }

    for (i, row) in table.rows.iter().chain(std::iter::once(&table.total)).enumerate() {
        let r = (i + 1) as u32;
        worksheet.write_string(r, 0, &row.date)?;
        worksheet.write_string(r, 1, &row.channel)?;
        worksheet.write_string(r, 2, &row.placement_size)?;
        worksheet.write_number_with_format(r, 3, row.impressions, &counts)?;
        worksheet.write_number_with_format(r, 4, row.clicks, &counts)?;
        worksheet.write_number_with_format(r, 5, row.viewable_impressions, &counts)?;
        worksheet.write_number_with_format(r, 6, row.va_percent, &percent)?;
        worksheet.write_number_with_format(r, 7, row.ctr, &percent)?;
    }

    let buffer = workbook.save_to_buffer()?;
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(date: &str, channel: &str, va: f64) -> SummaryRow {
        SummaryRow {
            date: date.to_string(),
            channel: channel.to_string(),
            placement_size: "300x250".to_string(),
            impressions: 1234.0,
            clicks: 12.0,
            viewable_impressions: 617.0,
            va_percent: va,
            ctr: 0.97,
        }
    }

    fn table() -> SummaryTable {
        SummaryTable {
            rows: vec![row("01/03/2024", "Radio Sul", 50.0), row("02/03/2024", "Rádio \"Sul\", FM", 33.333)],
            total: SummaryRow {
                date: "Total".to_string(),
                channel: "-".to_string(),
                placement_size: "-".to_string(),
                ..row("", "", 41.67)
            },
        }
    }

    #[test]
    fn csv_layout() {
        let csv = to_csv(&table());
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(
            lines[0],
            "Date,Veículo,Placement Size,Impressions,Clicks,Viewable Impression,VA%,CTR"
        );
        assert_eq!(lines[1], "01/03/2024,Radio Sul,300x250,1234,12,617,50.00,0.97");
        assert_eq!(lines[3], "Total,-,-,1234,12,617,41.67,0.97");
    }

    #[test]
    fn csv_escapes_special_characters() {
        let csv = to_csv(&table());
        let line = csv.lines().nth(2).unwrap();
        assert!(line.starts_with("02/03/2024,\"Rádio \"\"Sul\"\", FM\",300x250"));
        assert!(line.ends_with(",33.33,0.97"));
    }

    #[cfg(feature = "web")]
    #[test]
    fn xlsx_is_a_zip_container() {
        let bytes = to_xlsx(&table()).unwrap();
        assert!(bytes.starts_with(b"PK"));
    }
}
