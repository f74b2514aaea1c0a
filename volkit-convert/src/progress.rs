//! Frame-loop progress reporting with ETA estimation.

use std::time::Instant;

/// Sequential progress reporter. Prints a status line every
/// `report_interval` frames and on completion.
pub struct Progress {
    total: u64,
    done: u64,
    start_time: Instant,
    label: &'static str,
}

impl Progress {
    pub fn new(total: u64, label: &'static str) -> Self {
        Self {
            total,
            done: 0,
            start_time: Instant::now(),
            label,
        }
    }

    /// Marks one more unit done and reports when due.
    pub fn step(&mut self, report_interval: u64) {
        self.done += 1;
        if self.done % report_interval == 0 || self.done == self.total {
            self.print(self.done);
        }
    }

    fn print(&self, current: u64) {
        let elapsed_secs = self.start_time.elapsed().as_secs_f64();
        let percent = if self.total > 0 {
            (current as f64 / self.total as f64) * 100.0
        } else {
            0.0
        };

        if current < self.total {
            let rate = current as f64 / elapsed_secs.max(1e-6);
            let remaining = (self.total - current) as f64 / rate;
            println!(
                "  {} {}/{} ({:.1}%) - elapsed: {} - ETA: {}",
                self.label,
                current,
                self.total,
                percent,
                format_duration(elapsed_secs),
                format_duration(remaining),
            );
        } else {
            println!(
                "  {} {}/{} (100.0%) - completed in {}",
                self.label,
                current,
                self.total,
                format_duration(elapsed_secs),
            );
        }
    }
}

/// Formats seconds into a human-readable duration string
fn format_duration(secs: f64) -> String {
    if secs < 60.0 {
        format!("{:.1}s", secs)
    } else if secs < 3600.0 {
        let mins = (secs / 60.0).floor() as u64;
        format!("{}m {:.0}s", mins, secs - (mins as f64 * 60.0))
    } else {
        let hours = (secs / 3600.0).floor() as u64;
        let remaining = secs - (hours as f64 * 3600.0);
        let mins = (remaining / 60.0).floor() as u64;
        format!("{}h {}m {:.0}s", hours, mins, remaining - (mins as f64 * 60.0))
    }
}
