//! Application log abstraction.
//!
//! User-facing run output goes through `ApplicationLog` so the dry-run
//! sandbox can substitute a no-op sink; diagnostics go through `tracing`.

use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Mutex;
use std::time::Duration;

/// The log sink threaded through the context.
pub trait ApplicationLog: Send + Sync {
    fn info(&self, msg: &str);
    fn debug(&self, msg: &str);
    fn warn(&self, msg: &str);
    fn error(&self, msg: &str);
    fn banner(&self, msg: &str);

    fn indent(&self);
    fn dedent(&self);

    /// Show a transient status line below the scrolling output.
    fn set_status(&self, msg: &str);
    fn clear_status(&self);
}

/// Console implementation with indentation and an indicatif status line.
pub struct ConsoleLog {
    indent: Mutex<usize>,
    status: Mutex<Option<ProgressBar>>,
}

impl ConsoleLog {
    pub fn new() -> Self {
        Self {
            indent: Mutex::new(0),
            status: Mutex::new(None),
        }
    }

    fn pad(&self) -> String {
        "  ".repeat(*self.indent.lock().unwrap())
    }

    fn line(&self, msg: &str) {
        let line = format!("{}{}", self.pad(), msg);
        let status = self.status.lock().unwrap();
        match status.as_ref() {
            // Print above the live status line so it doesn't get clobbered.
            Some(bar) => bar.println(line),
            None => println!("{line}"),
        }
    }
}

impl Default for ConsoleLog {
    fn default() -> Self {
        Self::new()
    }
}

impl ApplicationLog for ConsoleLog {
    fn info(&self, msg: &str) {
        self.line(msg);
    }

    fn debug(&self, msg: &str) {
        tracing::debug!("{msg}");
    }

    fn warn(&self, msg: &str) {
        self.line(&format!("{}", style(msg).yellow()));
    }

    fn error(&self, msg: &str) {
        let line = format!("{}{}", self.pad(), style(msg).red().bold());
        eprintln!("{line}");
    }

    fn banner(&self, msg: &str) {
        println!();
        println!("{}", style(msg).cyan().bold());
        println!("{}", style("─".repeat(msg.chars().count())).dim());
    }

    fn indent(&self) {
        *self.indent.lock().unwrap() += 1;
    }

    fn dedent(&self) {
        let mut indent = self.indent.lock().unwrap();
        *indent = indent.saturating_sub(1);
    }

    fn set_status(&self, msg: &str) {
        let mut status = self.status.lock().unwrap();
        let bar = status.get_or_insert_with(|| {
            let bar = ProgressBar::new_spinner();
            bar.set_style(
                ProgressStyle::with_template("{spinner} {msg}")
                    .expect("static template is valid"),
            );
            bar.enable_steady_tick(Duration::from_millis(120));
            bar
        });
        bar.set_message(msg.to_string());
    }

    fn clear_status(&self) {
        if let Some(bar) = self.status.lock().unwrap().take() {
            bar.finish_and_clear();
        }
    }
}

/// Silenced sink used by the dry-run sandbox.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullLog;

impl ApplicationLog for NullLog {
    fn info(&self, _msg: &str) {}
    fn debug(&self, _msg: &str) {}
    fn warn(&self, _msg: &str) {}
    fn error(&self, _msg: &str) {}
    fn banner(&self, _msg: &str) {}
    fn indent(&self) {}
    fn dedent(&self) {}
    fn set_status(&self, _msg: &str) {}
    fn clear_status(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_log_accepts_everything() {
        let log = NullLog;
        log.info("x");
        log.banner("y");
        log.indent();
        log.dedent();
        log.set_status("z");
        log.clear_status();
    }

    #[test]
    fn console_log_dedent_saturates_at_zero() {
        let log = ConsoleLog::new();
        log.dedent();
        log.indent();
        assert_eq!(log.pad(), "  ");
        log.dedent();
        assert_eq!(log.pad(), "");
    }
}
