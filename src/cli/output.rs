use std::io::{self, IsTerminal, Write};

use ansi_term::Style;
use chrono::Duration;

use crate::{
    report::{CategoryOverview, UsageReport},
    tracking::state::UsageState,
    utils::time::{date_key, format_hms},
};

/// Bold headers, but only when writing to a terminal.
pub struct Printer {
    header: Style,
}

impl Printer {
    pub fn for_stdout() -> Self {
        Self::new(io::stdout().is_terminal())
    }

    pub fn new(styled: bool) -> Self {
        Self {
            header: if styled {
                Style::new().bold()
            } else {
                Style::new()
            },
        }
    }

    fn header(&self, out: &mut impl Write, text: &str, total: Duration) -> io::Result<()> {
        writeln!(
            out,
            "{}",
            self.header
                .paint(format!("{text}\t{}", format_hms(total)))
        )
    }

    pub fn print_report(&self, out: &mut impl Write, report: &UsageReport) -> io::Result<()> {
        let title = if report.start == report.end {
            date_key(report.start)
        } else {
            format!("{} - {}", date_key(report.start), date_key(report.end))
        };
        self.header(out, &title, report.total())?;
        if report.is_empty() {
            writeln!(out, "No activity recorded")?;
            return Ok(());
        }

        writeln!(out)?;
        for row in &report.categories {
            writeln!(out, "{}\t{}", format_hms(row.duration), row.category)?;
        }
        writeln!(out)?;
        for row in &report.apps {
            writeln!(
                out,
                "{}\t{}\t{}",
                format_hms(row.duration),
                row.app,
                row.category
            )?;
        }
        Ok(())
    }

    pub fn print_overview(
        &self,
        out: &mut impl Write,
        overview: &[CategoryOverview],
    ) -> io::Result<()> {
        for group in overview {
            self.header(out, &group.category, group.duration)?;
            for (app, duration) in &group.apps {
                writeln!(out, "  {}\t{app}", format_hms(*duration))?;
            }
        }
        Ok(())
    }

    pub fn print_categories(&self, out: &mut impl Write, state: &UsageState) -> io::Result<()> {
        for (name, total) in state.categories() {
            let apps = state
                .apps()
                .values()
                .filter(|v| &v.category == name)
                .count();
            writeln!(out, "{}\t{apps} apps\t{name}", format_hms(*total))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, NaiveDate};
    use pretty_assertions::assert_eq;

    use crate::{
        report::{daily, overview},
        tracking::state::{AppId, HourOfDay, UsageState},
    };

    use super::Printer;

    fn state() -> UsageState {
        let mut state = UsageState::new();
        let date = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
        for (app, hour, seconds) in [("code.exe", 9, 5400), ("chrome.exe", 10, 65)] {
            let app: AppId = app.into();
            state.record_duration(
                &app,
                date,
                HourOfDay::new(hour).unwrap(),
                Duration::seconds(seconds),
            );
        }
        state.create_category("Work").unwrap();
        state.set_category(&"code.exe".into(), "Work").unwrap();
        state
    }

    fn render(print: impl FnOnce(&mut Vec<u8>)) -> String {
        let mut out = Vec::new();
        print(&mut out);
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_print_daily_report() {
        let state = state();
        let report = daily(&state, NaiveDate::from_ymd_opt(2024, 3, 4).unwrap());

        let text = render(|out| Printer::new(false).print_report(out, &report).unwrap());

        assert_eq!(
            text,
            "2024-03-04\t01:31:05\n\
             \n\
             01:30:00\tWork\n\
             00:01:05\tUncategorized\n\
             \n\
             01:30:00\tcode.exe\tWork\n\
             00:01:05\tchrome.exe\tUncategorized\n"
        );
    }

    #[test]
    fn test_print_empty_report() {
        let report = daily(&state(), NaiveDate::from_ymd_opt(2024, 3, 5).unwrap());

        let text = render(|out| Printer::new(false).print_report(out, &report).unwrap());

        assert_eq!(text, "2024-03-05\t00:00:00\nNo activity recorded\n");
    }

    #[test]
    fn test_print_overview_and_categories() {
        let state = state();
        let printer = Printer::new(false);

        let text = render(|out| printer.print_overview(out, &overview(&state)).unwrap());
        assert_eq!(
            text,
            "Work\t01:30:00\n  01:30:00\tcode.exe\nUncategorized\t00:01:05\n  00:01:05\tchrome.exe\n"
        );

        let text = render(|out| printer.print_categories(out, &state).unwrap());
        assert_eq!(
            text,
            "00:01:05\t1 apps\tUncategorized\n01:30:00\t1 apps\tWork\n"
        );
    }
}
