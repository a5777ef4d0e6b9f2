//! Terminal rendering: progress bar wiring and the completion summary.

use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;

use citecount_core::{BatchOutcome, ItemStatus, ProgressEvent};

/// Whether colored output is enabled.
#[derive(Clone, Copy)]
pub struct ColorMode(pub bool);

impl ColorMode {
    pub fn enabled(&self) -> bool {
        self.0
    }
}

pub fn progress_bar(total: u64) -> ProgressBar {
    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::with_template("{pos}/{len} [{bar:30}] {msg}")
            .expect("static template")
            .progress_chars("=> "),
    );
    pb
}

/// Feed one orchestrator event into the progress bar.
pub fn render_event(pb: &ProgressBar, event: &ProgressEvent) {
    match event {
        ProgressEvent::Checking { title, .. } => {
            pb.set_message(title.clone());
        }
        ProgressEvent::Result { status, .. } => {
            pb.inc(1);
            if let ItemStatus::Updated(count) = status {
                pb.println(format!("{} citations: {}", pb.message(), count));
            }
        }
        ProgressEvent::RetryPass { count } => {
            pb.println(format!("retrying {count} rate-limited item(s)"));
        }
        ProgressEvent::RetryWait { wait, .. } => {
            pb.set_message(format!("waiting {:.1}s after 429", wait.as_secs_f64()));
        }
    }
}

/// The four-counter completion summary, one counter per line.
pub fn summary_lines(outcome: &BatchOutcome) -> Vec<String> {
    vec![
        format!("Updated:   {} items", outcome.updated),
        format!("Not found: {} items", outcome.not_found),
        format!("Failed:    {} items", outcome.failed),
        format!("Skipped:   {} items", outcome.skipped),
    ]
}

pub fn print_summary(outcome: &BatchOutcome, color: ColorMode) {
    let header = "Update complete";
    if color.enabled() {
        println!("{}", header.bold());
    } else {
        println!("{header}");
    }
    for (i, line) in summary_lines(outcome).iter().enumerate() {
        if color.enabled() {
            match i {
                0 => println!("{}", line.green()),
                2 => println!("{}", line.red()),
                _ => println!("{line}"),
            }
        } else {
            println!("{line}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_reports_all_four_counters() {
        let outcome = BatchOutcome {
            updated: 3,
            not_found: 2,
            failed: 1,
            skipped: 4,
        };
        let lines = summary_lines(&outcome);
        assert_eq!(lines.len(), 4);
        assert!(lines[0].contains("3 items"));
        assert!(lines[1].contains("2 items"));
        assert!(lines[2].contains("1 items"));
        assert!(lines[3].contains("4 items"));
    }
}
