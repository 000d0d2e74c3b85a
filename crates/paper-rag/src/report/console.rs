//! Styled terminal output for the CLI

use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use parking_lot::Mutex;

use super::Reporter;

/// Colored stage output with a progress bar for long steps
#[derive(Default)]
pub struct ConsoleReporter {
    bar: Mutex<Option<ProgressBar>>,
}

impl ConsoleReporter {
    pub fn new() -> Self {
        Self::default()
    }

    fn finish_bar(&self) {
        if let Some(bar) = self.bar.lock().take() {
            bar.finish_and_clear();
        }
    }

    fn line(&self, text: String) {
        match self.bar.lock().as_ref() {
            Some(bar) => bar.println(text),
            None => println!("{}", text),
        }
    }
}

impl Reporter for ConsoleReporter {
    fn stage(&self, title: &str) {
        self.finish_bar();
        println!("\n{}", style(title).bold());
    }

    fn info(&self, message: &str) {
        self.line(format!("{} {}", style("[RAG]").cyan(), message));
    }

    fn warn(&self, message: &str) {
        self.line(format!("{} {}", style("[WARN]").yellow(), message));
    }

    fn success(&self, message: &str) {
        self.line(format!("{}  {}", style("[OK]").green(), message));
    }

    fn progress(&self, done: usize, total: usize) {
        let mut guard = self.bar.lock();
        let bar = guard.get_or_insert_with(|| {
            let bar = ProgressBar::new(total as u64);
            bar.set_style(
                ProgressStyle::with_template("{bar:40.cyan/blue} {pos}/{len} ({eta})")
                    .unwrap_or_else(|_| ProgressStyle::default_bar()),
            );
            bar
        });
        bar.set_length(total as u64);
        bar.set_position(done as u64);
        if done >= total {
            bar.finish_and_clear();
            *guard = None;
        }
    }
}
