use rust_xlsxwriter::{Format, Workbook, Worksheet, XlsxError};

use super::ReportData;

/// Write a number, or `N/A` when the value is absent.
fn write_optional(sheet: &mut Worksheet, row: u32, col: u16, value: Option<f64>) -> Result<(), XlsxError> {
    match value {
        Some(v) if v.is_finite() => sheet.write_number(row, col, v)?,
        _ => sheet.write_string(row, col, "N/A")?,
    };
    Ok(())
}

fn write_header(sheet: &mut Worksheet, headers: &[&str], bold: &Format) -> Result<(), XlsxError> {
    for (col, header) in headers.iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, *header, bold)?;
    }
    Ok(())
}

fn summary_sheet(data: &ReportData<'_>, bold: &Format) -> Result<Worksheet, XlsxError> {
    let summary = &data.analytics.summary;
    let health = data.analytics.health.as_ref();
    let mut sheet = Worksheet::new();
    sheet.set_name("Summary")?;

    sheet.write_string_with_format(0, 0, "Dataset Information", bold)?;
    sheet.write_string(1, 0, "Filename")?;
    sheet.write_string(1, 1, summary.filename.as_deref().unwrap_or(data.filename))?;
    sheet.write_string(2, 0, "Total Rows")?;
    sheet.write_number(2, 1, summary.total_rows as f64)?;
    sheet.write_string(3, 0, "Total Columns")?;
    sheet.write_number(3, 1, summary.total_columns as f64)?;
    sheet.write_string(4, 0, "Analysis Date")?;
    let analyzed = summary
        .analysis_timestamp
        .as_deref()
        .map(crate::utils::format_date)
        .unwrap_or_else(|| "N/A".to_string());
    sheet.write_string(4, 1, analyzed)?;

    sheet.write_string_with_format(6, 0, "Data Quality", bold)?;
    sheet.write_string(7, 0, "Health Score")?;
    write_optional(&mut sheet, 7, 1, health.and_then(|h| h.score))?;
    sheet.write_string(8, 0, "Missing Data %")?;
    write_optional(&mut sheet, 8, 1, health.and_then(|h| h.missing_percentage))?;
    sheet.write_string(9, 0, "Duplicates")?;
    write_optional(&mut sheet, 9, 1, health.and_then(|h| h.duplicates).map(|d| d as f64))?;

    sheet.set_column_width(0, 22)?;
    sheet.set_column_width(1, 30)?;
    Ok(sheet)
}

fn statistics_sheet(data: &ReportData<'_>, bold: &Format) -> Result<Worksheet, XlsxError> {
    let mut sheet = Worksheet::new();
    sheet.set_name("Statistics")?;
    write_header(&mut sheet, &["Column", "Mean", "Median", "Min", "Max", "Std Dev"], bold)?;

    for (i, (column, stats)) in data.analytics.statistics.iter().enumerate() {
        let row = i as u32 + 1;
        sheet.write_string(row, 0, column)?;
        write_optional(&mut sheet, row, 1, stats.mean)?;
        write_optional(&mut sheet, row, 2, stats.median)?;
        write_optional(&mut sheet, row, 3, stats.min)?;
        write_optional(&mut sheet, row, 4, stats.max)?;
        write_optional(&mut sheet, row, 5, stats.std)?;
    }
    Ok(sheet)
}

fn categorical_sheet(data: &ReportData<'_>, bold: &Format) -> Result<Worksheet, XlsxError> {
    let mut sheet = Worksheet::new();
    sheet.set_name("Categorical Analysis")?;
    write_header(&mut sheet, &["Column", "Unique Values", "Top Value", "Count", "Percentage"], bold)?;

    for (i, (column, stats)) in data.analytics.categorical.iter().enumerate() {
        let row = i as u32 + 1;
        let top = stats.top_values_detailed.first();
        sheet.write_string(row, 0, column)?;
        write_optional(&mut sheet, row, 1, stats.unique_values.map(|u| u as f64))?;
        sheet.write_string(row, 2, top.map(|t| t.value.as_str()).unwrap_or("N/A"))?;
        write_optional(&mut sheet, row, 3, top.map(|t| t.count as f64))?;
        let pct = top
            .and_then(|t| t.percentage)
            .map(|p| format!("{}%", crate::utils::format_metric(Some(p))))
            .unwrap_or_else(|| "N/A".to_string());
        sheet.write_string(row, 4, pct)?;
    }
    Ok(sheet)
}

/// Workbook with `Summary`, `Statistics` and `Categorical Analysis` sheets.
pub fn render_xlsx(data: &ReportData<'_>) -> Result<Vec<u8>, XlsxError> {
    let bold = Format::new().set_bold();
    let mut workbook = Workbook::new();

    workbook.push_worksheet(summary_sheet(data, &bold)?);
    if !data.analytics.statistics.is_empty() {
        workbook.push_worksheet(statistics_sheet(data, &bold)?);
    }
    if !data.analytics.categorical.is_empty() {
        workbook.push_worksheet(categorical_sheet(data, &bold)?);
    }

    workbook.save_to_buffer()
}
