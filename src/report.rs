//! Report sinks for the segment summary

use std::fmt::Write as _;
use std::fs;
use std::path::PathBuf;

use tracing::info;

use crate::summary::SegmentSummary;

/// Default heading for rendered reports.
pub const DEFAULT_TITLE: &str = "RFM Report - Customer Analysis";

const COLUMNS: [&str; 6] = [
    "Segment",
    "Customers",
    "Avg Recency",
    "Avg Frequency",
    "Avg Monetary",
    "Percentage",
];

/// Destination for a finished segment summary.
pub trait ReportSink {
    fn deliver(&self, title: &str, summary: &[SegmentSummary]) -> crate::Result<()>;
}

/// Prints an aligned table to stdout.
#[derive(Debug, Default)]
pub struct ConsoleSink;

impl ReportSink for ConsoleSink {
    fn deliver(&self, title: &str, summary: &[SegmentSummary]) -> crate::Result<()> {
        print!("{}", render_table(title, summary));
        Ok(())
    }
}

/// Writes a standalone HTML page.
#[derive(Debug, Clone)]
pub struct HtmlFileSink {
    pub path: PathBuf,
}

impl HtmlFileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ReportSink for HtmlFileSink {
    fn deliver(&self, title: &str, summary: &[SegmentSummary]) -> crate::Result<()> {
        fs::write(&self.path, render_html(title, summary))?;
        info!(path = %self.path.display(), "HTML report saved");
        Ok(())
    }
}

fn cells(row: &SegmentSummary) -> [String; 6] {
    [
        row.segment.to_string(),
        row.customer_count.to_string(),
        format!("{:.2}", row.avg_recency),
        format!("{:.2}", row.avg_frequency),
        format!("{:.2}", row.avg_monetary_value),
        format!("{:.1}%", row.percentage),
    ]
}

/// Render the summary as a plain-text table.
pub fn render_table(title: &str, summary: &[SegmentSummary]) -> String {
    let rows: Vec<[String; 6]> = summary.iter().map(cells).collect();

    let mut widths = COLUMNS.map(str::len);
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.len());
        }
    }

    let mut out = String::new();
    let _ = writeln!(out, "\n=== {} ===", title);

    let header: Vec<String> = COLUMNS
        .iter()
        .zip(widths)
        .enumerate()
        .map(|(i, (name, width))| pad(name, width, i == 0))
        .collect();
    let _ = writeln!(out, "  {}", header.join(" | "));
    let rule: Vec<String> = widths.iter().map(|&w| "-".repeat(w)).collect();
    let _ = writeln!(out, "  {}", rule.join("-|-"));

    for row in &rows {
        let line: Vec<String> = row
            .iter()
            .zip(widths)
            .enumerate()
            .map(|(i, (cell, width))| pad(cell, width, i == 0))
            .collect();
        let _ = writeln!(out, "  {}", line.join(" | "));
    }

    let total: usize = summary.iter().map(|s| s.customer_count).sum();
    let _ = writeln!(out, "\nTotal customers: {}", total);
    out
}

fn pad(text: &str, width: usize, left: bool) -> String {
    if left {
        format!("{:<width$}", text)
    } else {
        format!("{:>width$}", text)
    }
}

/// Render the summary as a styled HTML page.
pub fn render_html(title: &str, summary: &[SegmentSummary]) -> String {
    let mut table = String::from("<table>\n<thead><tr>");
    for name in COLUMNS {
        let _ = write!(table, "<th>{}</th>", name);
    }
    table.push_str("</tr></thead>\n<tbody>\n");
    for row in summary {
        table.push_str("<tr>");
        for cell in cells(row) {
            let _ = write!(table, "<td>{}</td>", escape_html(&cell));
        }
        table.push_str("</tr>\n");
    }
    table.push_str("</tbody>\n</table>");

    format!(
        r#"<html>
<head>
<meta charset="utf-8">
<title>{title}</title>
<style>
body {{ font-family: Arial, sans-serif; background-color: #f4f4f4; padding: 20px; }}
table {{ border-collapse: collapse; width: 100%; background-color: white; box-shadow: 0 2px 4px rgba(0,0,0,0.1); }}
th {{ background-color: #4CAF50; color: white; padding: 12px; text-align: left; font-weight: bold; }}
td {{ padding: 10px; border-bottom: 1px solid #ddd; }}
tr:hover {{ background-color: #f5f5f5; }}
tr:nth-child(even) {{ background-color: #f9f9f9; }}
</style>
</head>
<body>
<h2 style="color: #333;">{title}</h2>
{table}
</body>
</html>
"#,
        title = escape_html(title),
        table = table,
    )
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segment::Segment;
    use std::path::Path;
    use tempfile::tempdir;

    fn create_test_summary() -> Vec<SegmentSummary> {
        vec![
            SegmentSummary {
                segment: Segment::Champions,
                customer_count: 2,
                avg_recency: 1.5,
                avg_frequency: 4.0,
                avg_monetary_value: 250.0,
                percentage: 40.0,
            },
            SegmentSummary {
                segment: Segment::AtRisk,
                customer_count: 3,
                avg_recency: 20.33,
                avg_frequency: 3.0,
                avg_monetary_value: 180.75,
                percentage: 60.0,
            },
        ]
    }

    #[test]
    fn test_render_table() {
        let table = render_table(DEFAULT_TITLE, &create_test_summary());

        assert!(table.contains(DEFAULT_TITLE));
        assert!(table.contains("Champions"));
        assert!(table.contains("At Risk"));
        assert!(table.contains("180.75"));
        assert!(table.contains("60.0%"));
        assert!(table.contains("Total customers: 5"));
    }

    #[test]
    fn test_render_html_escapes_title() {
        let html = render_html("Q1 <draft> & notes", &create_test_summary());

        assert!(html.contains("Q1 &lt;draft&gt; &amp; notes"));
        assert!(html.contains("<th>Avg Monetary</th>"));
        assert!(html.contains("<td>Champions</td>"));
        assert_eq!(html.matches("<tr>").count(), 3);
    }

    #[test]
    fn test_html_file_sink() {
        let temp_dir = tempdir().unwrap();
        let output_path = temp_dir.path().join("report.html");

        let sink = HtmlFileSink::new(&output_path);
        let result = sink.deliver(DEFAULT_TITLE, &create_test_summary());

        assert!(result.is_ok());
        assert!(Path::new(&output_path).exists());
        let contents = fs::read_to_string(&output_path).unwrap();
        assert!(contents.contains("<td>At Risk</td>"));
    }

    #[test]
    fn test_console_sink() {
        assert!(ConsoleSink.deliver(DEFAULT_TITLE, &create_test_summary()).is_ok());
    }
}
