//! Run events and the TAP 13 reporter

use std::io::{Stdout, Write};
use std::path::Path;

use colored::Colorize;
use tracing::warn;

use crate::action::Descriptor;
use crate::config::RunnerConfig;
use crate::error::Failure;
use crate::format::{self, BlockLine, Field, INDENT};

/// Totals of a finished (or halted) run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Summary {
    pub total: usize,
    pub pass: usize,
    /// Set when a fatal error stopped the walk
    pub halted: bool,
}

impl Summary {
    /// Every planned case that did not pass, including ones never reached
    pub fn fail(&self) -> usize {
        self.total.saturating_sub(self.pass)
    }

    /// Pass rate in percent, NaN for an empty plan
    pub fn rate(&self) -> f64 {
        format::rate(self.pass, self.total)
    }

    /// Every case passed and no hook failed
    pub fn success(&self) -> bool {
        self.pass == self.total && !self.halted
    }

    /// Process exit status: 0 on success, 1 otherwise
    pub fn exit_code(&self) -> i32 {
        if self.success() {
            0
        } else {
            1
        }
    }
}

/// Consumer of run events, in emission order
pub trait Reporter {
    /// Announce the number of planned cases
    fn plan(&mut self, total: usize);

    /// A case finished; `failure` is set when it failed
    fn case(&mut self, case: &Descriptor, failure: Option<&Failure>);

    /// A hook (or the build) failed and the run stops
    fn bail_out(&mut self, action: &Descriptor, failure: &Failure);

    fn summary(&mut self, summary: &Summary);
}

/// Recorded run event
#[derive(Debug, Clone)]
pub enum Event {
    Plan(usize),
    Case(Descriptor, Option<Failure>),
    BailOut(Descriptor, Failure),
    Summary(Summary),
}

/// Collects events in memory
impl Reporter for Vec<Event> {
    fn plan(&mut self, total: usize) {
        self.push(Event::Plan(total));
    }

    fn case(&mut self, case: &Descriptor, failure: Option<&Failure>) {
        self.push(Event::Case(case.clone(), failure.cloned()));
    }

    fn bail_out(&mut self, action: &Descriptor, failure: &Failure) {
        self.push(Event::BailOut(action.clone(), failure.clone()));
    }

    fn summary(&mut self, summary: &Summary) {
        self.push(Event::Summary(*summary));
    }
}

/// Streams TAP version 13 to a writer
pub struct TapReporter<W: Write> {
    out: W,
    width: usize,
    color: bool,
    project_dir: String,
    write_failed: bool,
}

impl TapReporter<Stdout> {
    /// Reporter on stdout, configured from `config`
    pub fn stdout(config: &RunnerConfig) -> Self {
        TapReporter::new(std::io::stdout(), config.resolved_width())
            .with_color(config.color.enabled())
            .with_project_dir(&config.project_dir)
    }
}

impl<W: Write> TapReporter<W> {
    pub fn new(out: W, width: usize) -> Self {
        Self {
            out,
            width,
            color: false,
            project_dir: "tests".to_string(),
            write_failed: false,
        }
    }

    pub fn with_color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }

    /// Locations outside this directory are dimmed
    pub fn with_project_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.project_dir = dir.as_ref().to_string_lossy().trim_end_matches('/').to_string();
        self
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn emit(&mut self, line: &str) {
        if self.write_failed {
            return;
        }
        if let Err(e) = writeln!(self.out, "{}", line) {
            warn!("Failed to write report: {}", e);
            self.write_failed = true;
        }
    }

    fn flush(&mut self) {
        if let Err(e) = self.out.flush() {
            warn!("Failed to flush report: {}", e);
        }
    }

    fn in_project(&self, location: &str) -> bool {
        location.starts_with(&format!("{}/", self.project_dir))
    }

    fn emit_breadcrumb(&mut self, path: &[String]) {
        let text = format!("# {}", path.join(" :: "));
        for line in format::wordwrap(&text, self.width, INDENT, 1) {
            let line = if self.color { line.dimmed().to_string() } else { line };
            self.emit(&line);
        }
    }

    fn emit_status(&mut self, case: &Descriptor, passed: bool) {
        let status = if passed { "ok" } else { "not ok" };
        let number = case.number.unwrap_or_default();
        let text = format!("{} {} - {}", status, number, case.label());

        for (index, line) in format::wordwrap(&text, self.width, INDENT, 1)
            .into_iter()
            .enumerate()
        {
            // narrow widths can split the status itself
            let line = match line.strip_prefix(status) {
                Some(rest) if self.color && index == 0 => {
                    let styled = if passed {
                        status.green().bold()
                    } else {
                        status.red().bold()
                    };
                    format!("{}{}", styled, rest)
                }
                _ => line,
            };
            self.emit(&line);
        }
    }

    fn emit_diagnostic(&mut self, failure: &Failure) {
        let mut fields = vec![Field::Scalar("message", failure.message().to_string())];
        if let Some(assertion) = failure.assertion() {
            fields.push(Field::Scalar("operator", assertion.operator.clone()));
            fields.push(Field::Scalar("actual", assertion.actual.clone()));
            fields.push(Field::Scalar("expected", assertion.expected.clone()));
        }
        fields.push(Field::List("location", failure.location().to_vec()));

        let outside: Vec<bool> = failure
            .location()
            .iter()
            .map(|location| !self.in_project(location))
            .collect();
        let mut items = outside.into_iter();

        for block_line in format::diagnostic_block(&fields) {
            let dim_item = matches!(block_line, BlockLine::Item(_)) && items.next().unwrap_or(false);
            let wrapped = format::wordwrap(&block_line.plain(), self.width, INDENT, 0);

            for (index, line) in wrapped.into_iter().enumerate() {
                let line = match &block_line {
                    _ if !self.color => line,
                    BlockLine::Key(key, _) if index == 0 && line.len() > INDENT.len() + key.len() => {
                        let split = INDENT.len() + key.len() + 1;
                        format!("{}{}{}", INDENT, line[INDENT.len()..split].dimmed(), &line[split..])
                    }
                    BlockLine::Item(_) if dim_item => line.dimmed().to_string(),
                    _ => line,
                };
                self.emit(&line);
            }
        }
    }
}

impl<W: Write> Reporter for TapReporter<W> {
    fn plan(&mut self, total: usize) {
        self.emit("TAP version 13");
        self.emit(&format!("1..{}", total));
        self.emit("");
        self.flush();
    }

    fn case(&mut self, case: &Descriptor, failure: Option<&Failure>) {
        self.emit_breadcrumb(&case.path);
        self.emit_status(case, failure.is_none());
        if let Some(failure) = failure {
            self.emit_diagnostic(failure);
        }
        self.flush();
    }

    fn bail_out(&mut self, action: &Descriptor, failure: &Failure) {
        let mut header = format!("Bail out! {}", action.label());
        if !action.path.is_empty() {
            header.push_str(&format!(" at {}", action.path.join(" / ")));
        }
        let header = if self.color {
            header.red().bold().to_string()
        } else {
            header
        };

        self.emit("");
        self.emit(&header);
        self.emit(failure.message());
        for location in failure.location() {
            self.emit(&format!("{}at {}", INDENT, location));
        }
        self.flush();
    }

    fn summary(&mut self, summary: &Summary) {
        let rate = format::format_rate(summary.pass, summary.total);
        let values = [
            ("tests", summary.total.to_string()),
            ("pass", summary.pass.to_string()),
            ("fail", summary.fail().to_string()),
        ];

        self.emit("");
        for (key, value) in values {
            let value = if self.color { value.bold().to_string() } else { value };
            self.emit(&format!("# {}: {}", key, value));
        }
        let rate = if self.color { rate.bold().to_string() } else { rate };
        self.emit(&format!("# rate: {} %", rate));
        self.flush();
    }
}
