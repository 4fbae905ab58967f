use std::io::{self, Write};

use chrono::Duration;

use super::UsageReport;

const HEADER: &str = "identifier,total_seconds,category";

/// Writes one row per application. Seconds are raw numbers so other tools can convert them.
pub fn write_csv(report: &UsageReport, mut writer: impl Write) -> io::Result<()> {
    writeln!(writer, "{HEADER}")?;
    for row in &report.apps {
        writeln!(
            writer,
            "{},{},{}",
            escape_csv_field(&row.app),
            raw_seconds(row.duration),
            escape_csv_field(&row.category)
        )?;
    }
    writer.flush()
}

pub fn to_csv_string(report: &UsageReport) -> String {
    let mut buffer = Vec::new();
    // Writing into a Vec can't fail.
    let _ = write_csv(report, &mut buffer);
    String::from_utf8_lossy(&buffer).into_owned()
}

fn raw_seconds(duration: Duration) -> f64 {
    duration.num_milliseconds() as f64 / 1000.
}

/// Quotes a field when it contains a separator, a quote or a line break (RFC 4180).
fn escape_csv_field(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
