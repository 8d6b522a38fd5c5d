use console::style;

use crate::types::FileOutcome;

pub struct Output;

impl Output {
    pub fn new() -> Self {
        Self
    }

    pub fn success(&self, message: &str) {
        println!("{} {}", style("✓").green(), message);
    }

    pub fn error(&self, message: &str) {
        eprintln!("{} {}", style("✗").red(), message);
    }

    pub fn info(&self, message: &str) {
        println!("{} {}", style("ℹ").blue(), message);
    }

    pub fn section(&self, message: &str) {
        println!("\n{}", style(message).bold());
        println!("{}", "─".repeat(40));
    }

    /// Per-file results plus a one-line batch summary
    pub fn batch_summary(&self, outcomes: &[FileOutcome]) {
        self.section("Results");
        for outcome in outcomes {
            let name = outcome.source.display();
            if outcome.success {
                match &outcome.published_url {
                    Some(url) => self.success(&format!("{} → {}", name, url)),
                    None => self.success(&format!("{}", name)),
                }
            } else {
                let reason = outcome.error.as_deref().unwrap_or("unknown error");
                self.error(&format!("{}: {}", name, reason));
            }
        }

        let ok = outcomes.iter().filter(|o| o.success).count();
        println!();
        if ok == outcomes.len() {
            self.success(&format!("{}/{} files processed", ok, outcomes.len()));
        } else {
            self.error(&format!("{}/{} files processed", ok, outcomes.len()));
        }
    }
}

impl Default for Output {
    fn default() -> Self {
        Self::new()
    }
}
