//! Console output.
//!
//! Progress and status lines go to stderr so stdout stays clean for results
//! (paths, tables, JSON reports).

pub mod table;

use alkit_core::Reporter;
use crossterm::style::Stylize;
use std::io::{IsTerminal, Write};

/// Styled console reporter. Silent when `quiet` is set (JSON mode).
#[derive(Debug, Clone, Copy)]
pub struct Output {
    quiet: bool,
    color: bool,
}

impl Output {
    pub fn new(quiet: bool) -> Self {
        Self {
            quiet,
            color: std::io::stderr().is_terminal(),
        }
    }

    fn line(&self, text: &str) {
        if self.quiet {
            return;
        }
        let mut err = std::io::stderr().lock();
        let _ = writeln!(err, "{text}");
    }

    fn styled(&self, icon: &str, text: &str, paint: fn(String) -> String) -> String {
        if self.color {
            format!("{} {text}", paint(icon.to_string()))
        } else {
            format!("{icon} {text}")
        }
    }

    pub fn success(&self, msg: &str) {
        self.line(&self.styled("✓", msg, |s| s.green().to_string()));
    }

    pub fn error(&self, msg: &str) {
        // Errors are shown even in quiet mode, outside of JSON.
        let mut err = std::io::stderr().lock();
        let _ = writeln!(err, "{}", self.styled("✗", msg, |s| s.red().to_string()));
    }
}

impl Reporter for Output {
    fn section(&self, title: &str) {
        if self.color {
            self.line(&title.bold().to_string());
        } else {
            self.line(title);
        }
    }

    fn downloading(&self, subject: &str, detail: &str, current: u64, total: Option<u64>) {
        // Only the start and the end of a transfer are worth a line.
        let text = match total {
            Some(total) if current >= total && total > 0 => {
                format!("{subject}: {detail} ({})", format_size(total))
            }
            Some(_) | None if current == 0 => format!("{subject}: fetching {detail}"),
            _ => return,
        };
        self.line(&self.styled("↓", &text, |s| s.cyan().to_string()));
    }

    fn extracting(&self, subject: &str, detail: &str) {
        self.line(&self.styled("⋯", &format!("{subject}: unpacking {detail}"), |s| {
            s.dark_grey().to_string()
        }));
    }

    fn done(&self, subject: &str, detail: &str, size: Option<u64>) {
        let text = match size {
            Some(size) => format!("{subject} {detail} ({})", format_size(size)),
            None => format!("{subject} {detail}"),
        };
        self.success(&text);
    }

    fn failed(&self, subject: &str, reason: &str) {
        if !self.quiet {
            self.error(&format!("{subject}: {reason}"));
        }
    }

    fn info(&self, msg: &str) {
        self.line(&self.styled("•", msg, |s| s.blue().to_string()));
    }

    fn warning(&self, msg: &str) {
        self.line(&self.styled("!", msg, |s| s.yellow().to_string()));
    }
}

/// Human-readable byte count.
pub fn format_size(bytes: u64) -> String {
    let kb = bytes as f64 / 1024.0;
    let mb = kb / 1024.0;
    if mb >= 1024.0 {
        format!("{:.1} GB", mb / 1024.0)
    } else if kb >= 1024.0 {
        format!("{mb:.1} MB")
    } else if kb >= 1.0 {
        format!("{kb:.1} KB")
    } else {
        format!("{bytes} B")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(2048), "2.0 KB");
        assert_eq!(format_size(5 * 1024 * 1024), "5.0 MB");
        assert_eq!(format_size(3 * 1024 * 1024 * 1024), "3.0 GB");
    }
}
