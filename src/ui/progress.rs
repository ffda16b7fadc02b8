use crate::gates::DecisionRequest;
use crate::stage::{Stage, StageReport};
use crate::ui::icons::{CHECK, CLOCK, CROSS, DECISION, FILE_NEW, RERUN, RUNNING, SPARKLE};
use console::style;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::time::Duration;

/// Terminal UI for a pipeline run, rendered via `indicatif`.
///
/// Two bars are stacked vertically:
/// - Pipeline bar - how many stages have completed
/// - Stage bar - spinner for the stage currently generating
///
/// Both bars hide themselves when stderr is not a terminal.
pub struct PipelineUI {
    multi: MultiProgress,
    pipeline_bar: ProgressBar,
    stage_bar: ProgressBar,
    verbose: bool,
}

impl PipelineUI {
    /// Create the UI for a run of `total_stages` stages.
    pub fn new(total_stages: u64, verbose: bool) -> Self {
        let multi = MultiProgress::new();

        let pipeline_style = ProgressStyle::default_bar()
            .template("{prefix:.bold.dim} [{bar:30.cyan/blue}] {pos}/{len} {msg}")
            .expect("progress bar template is a valid static string")
            .progress_chars("█▓▒░");

        let pipeline_bar = multi.add(ProgressBar::new(total_stages));
        pipeline_bar.set_style(pipeline_style);
        pipeline_bar.set_prefix("Stages");

        let stage_style = ProgressStyle::default_spinner()
            .template("{prefix:.bold.dim} {spinner} {msg}")
            .expect("progress bar template is a valid static string");

        let stage_bar = multi.add(ProgressBar::new_spinner());
        stage_bar.set_style(stage_style);
        stage_bar.set_prefix(" Stage");

        Self {
            multi,
            pipeline_bar,
            stage_bar,
            verbose,
        }
    }

    /// Print a line above the bars, falling back to `eprintln!`.
    fn print_line(&self, msg: impl AsRef<str>) {
        if self.multi.println(msg.as_ref()).is_err() {
            eprintln!("{}", msg.as_ref());
        }
    }

    pub fn print_header(&self, project_dir: &str, model: &str) {
        self.print_line("");
        self.print_line(format!("{}", style("═".repeat(70)).cyan()));
        self.print_line(format!(
            "{} {}",
            style("stagegate").green().bold(),
            style(project_dir).yellow()
        ));
        self.print_line(format!("{}  {}", style("Model:").dim(), model));
        self.print_line(format!("{}", style("═".repeat(70)).cyan()));
        self.print_line("");
    }

    /// Point the bars at `stage` and start the spinner.
    pub fn start_stage(&self, stage: Stage) {
        self.pipeline_bar
            .set_message(format!("{}", style(stage.name()).yellow()));
        self.stage_bar.set_message(format!(
            "{}{} {}",
            RUNNING,
            style(stage.name()).cyan(),
            style("(generating...)").dim()
        ));
        self.stage_bar
            .enable_steady_tick(Duration::from_millis(100));
    }

    /// Refresh the spinner with wall-clock time spent in the current stage.
    pub fn update_elapsed(&self, stage: Stage, elapsed: Duration) {
        self.stage_bar.set_message(format!(
            "{}{} {}",
            RUNNING,
            style(stage.name()).cyan(),
            style(format!("({})", format_elapsed(elapsed))).dim()
        ));
    }

    pub fn stage_complete(&self, report: &StageReport, elapsed: Duration) {
        self.pipeline_bar.inc(1);
        self.stage_bar.disable_steady_tick();
        self.stage_bar.set_message("");
        self.print_line(format!(
            "{}Stage {} complete {}",
            CHECK,
            style(report.stage.name()).green().bold(),
            style(format!("{}{}", CLOCK, format_elapsed(elapsed))).dim()
        ));
        if self.verbose {
            for output in &report.outputs {
                self.print_line(format!("    {}{}", FILE_NEW, style(output).dim()));
            }
            if let Some(fp) = &report.prompt_fingerprint {
                self.print_line(format!("    {} {}", style("prompt").dim(), style(fp).dim()));
            }
        }
    }

    pub fn stage_failed(&self, stage: Stage, reason: &str) {
        self.stage_bar.disable_steady_tick();
        self.stage_bar
            .abandon_with_message(format!("{}{} failed", CROSS, stage.name()));
        self.print_line(format!(
            "{}Stage {} failed: {}",
            CROSS,
            style(stage.name()).red().bold(),
            reason
        ));
    }

    /// Stop the spinner so an interactive prompt can take the terminal.
    pub fn decision_required(&self, request: &DecisionRequest) {
        self.stage_bar.disable_steady_tick();
        self.stage_bar.set_message(format!(
            "{}{}",
            DECISION,
            style("waiting for decision").yellow()
        ));
        self.print_line(format!(
            "{}{} needs a decision: {}",
            DECISION,
            style(&request.stage).yellow().bold(),
            request.summary
        ));
        for (i, option) in request.options.iter().enumerate() {
            self.print_line(format!("    {}. {}", i + 1, option));
        }
    }

    pub fn decision_recorded(&self, stage: Stage, choice: &str) {
        self.print_line(format!(
            "{}Re-running {} with choice {}",
            RERUN,
            style(stage.name()).cyan(),
            style(choice).green().bold()
        ));
    }

    pub fn finish(&self, stages: usize, decisions: usize, elapsed: Duration) {
        self.stage_bar.finish_and_clear();
        self.pipeline_bar.finish_with_message("done");
        self.print_line(format!(
            "\n{}Pipeline complete: {} stages, {} decision(s) in {}\n",
            SPARKLE,
            style(stages).green().bold(),
            decisions,
            format_elapsed(elapsed)
        ));
    }
}

/// `Xs`, or `Xm Ys` from one minute on.
pub fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    if secs >= 60 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}s", secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_elapsed() {
        assert_eq!(format_elapsed(Duration::from_secs(7)), "7s");
        assert_eq!(format_elapsed(Duration::from_secs(125)), "2m 5s");
    }

    #[test]
    fn test_ui_calls_do_not_panic_without_terminal() {
        let ui = PipelineUI::new(5, true);
        ui.start_stage(Stage::Design);
        ui.update_elapsed(Stage::Design, Duration::from_secs(3));
        ui.decision_required(&DecisionRequest {
            stage: "design".to_string(),
            summary: "Architecture choice needed".to_string(),
            options: vec!["a".to_string(), "b".to_string()],
        });
        ui.decision_recorded(Stage::Design, "a");
        ui.stage_complete(
            &StageReport {
                stage: Stage::Design,
                outputs: vec!["designs/ARCHITECTURE.md".to_string()],
                model: None,
                prompt_fingerprint: Some("0123456789abcdef".to_string()),
            },
            Duration::from_secs(1),
        );
        ui.finish(5, 1, Duration::from_secs(61));
    }
}
