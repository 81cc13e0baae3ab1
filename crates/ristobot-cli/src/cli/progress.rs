//! Step-by-step progress output for the pipelines.
//!
//! Each stage prints a numbered `STEP` line when it starts. Stages that talk
//! to the database print their wall-clock time when they finish. Timings are
//! always recorded, so `--json` output can include them even though nothing
//! is printed.

use std::time::Duration;

use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::{Map, Value};

use ristobot_core::pipeline::{PipelineEvent, Stage};

/// Stages whose duration is shown as `Succeed in N seconds!`.
fn is_timed(stage: Stage) -> bool {
    matches!(
        stage,
        Stage::Insert | Stage::Flush | Stage::BuildIndex | Stage::LoadCollection | Stage::Search
    )
}

/// Prints pipeline events and records stage timings.
pub struct StepPrinter {
    /// Section number in `STEP  #<section>.<n>`.
    section: u32,
    step: u32,
    silent: bool,
    timings: Vec<(Stage, Duration)>,
}

impl StepPrinter {
    pub fn new(silent: bool) -> Self {
        Self {
            section: 1,
            step: 0,
            silent,
            timings: Vec::new(),
        }
    }

    /// Print a numbered step that is not a pipeline stage (connect, model load).
    pub fn step(&mut self, label: &str) {
        self.step += 1;
        if !self.silent {
            println!(
                "{}  {}",
                style(format!("STEP  #{}.{}", self.section, self.step)).cyan().bold(),
                label
            );
        }
    }

    /// Print a plain status line.
    pub fn note(&self, message: impl std::fmt::Display) {
        if !self.silent {
            println!("{message}");
        }
    }

    pub fn observe(&mut self, event: PipelineEvent) {
        match event {
            PipelineEvent::Started(stage) => self.step(&stage.to_string()),
            PipelineEvent::Finished { stage, elapsed } => {
                self.timings.push((stage, elapsed));
                if is_timed(stage) && !self.silent {
                    println!(
                        "{}",
                        style(format!("Succeed in {} seconds!", seconds(elapsed))).green()
                    );
                }
            }
        }
    }

    pub fn timings(&self) -> &[(Stage, Duration)] {
        &self.timings
    }

    /// Stage timings as a JSON object keyed by stage label.
    ///
    /// Repeated stages (one query per hit) are summed.
    pub fn timings_json(&self) -> Value {
        let mut map = Map::new();
        for (stage, elapsed) in &self.timings {
            let key = stage.to_string();
            let total = map.get(&key).and_then(Value::as_f64).unwrap_or(0.0) + elapsed.as_secs_f64();
            map.insert(key, Value::from(total));
        }
        Value::Object(map)
    }

    /// A spinner for slow non-pipeline work, hidden when silent.
    pub fn spinner(&self, message: &str) -> ProgressBar {
        if self.silent {
            return ProgressBar::hidden();
        }
        let spinner = ProgressBar::new_spinner();
        if let Ok(spinner_style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
            spinner.set_style(spinner_style);
        }
        spinner.set_message(message.to_string());
        spinner.enable_steady_tick(Duration::from_millis(80));
        spinner
    }
}

/// Seconds rounded to four decimals.
pub fn seconds(elapsed: Duration) -> f64 {
    (elapsed.as_secs_f64() * 10_000.0).round() / 10_000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seconds_rounds_to_four_places() {
        assert_eq!(seconds(Duration::from_micros(1_234_567)), 1.2346);
        assert_eq!(seconds(Duration::ZERO), 0.0);
    }

    #[test]
    fn records_every_finished_stage() {
        let mut printer = StepPrinter::new(true);
        printer.observe(PipelineEvent::Started(Stage::Insert));
        printer.observe(PipelineEvent::Finished {
            stage: Stage::Insert,
            elapsed: Duration::from_millis(10),
        });
        printer.observe(PipelineEvent::Started(Stage::Query));
        printer.observe(PipelineEvent::Finished {
            stage: Stage::Query,
            elapsed: Duration::from_millis(5),
        });
        printer.observe(PipelineEvent::Finished {
            stage: Stage::Query,
            elapsed: Duration::from_millis(5),
        });

        assert_eq!(printer.timings().len(), 3);
        assert_eq!(printer.step, 2);
        let json = printer.timings_json();
        assert!((json["Query"].as_f64().unwrap() - 0.01).abs() < 1e-9);
        assert!((json["Insert"].as_f64().unwrap() - 0.01).abs() < 1e-9);
    }

    #[test]
    fn only_database_stages_are_timed() {
        assert!(is_timed(Stage::Flush));
        assert!(is_timed(Stage::Search));
        assert!(!is_timed(Stage::DefineSchema));
        assert!(!is_timed(Stage::Embed));
    }
}
