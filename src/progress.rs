//! Progress reporting and display
//!
//! Reporters consume [`WorkflowEvent`]s, which keeps the workflow itself free
//! of any terminal handling.

use std::sync::{Arc, RwLock};

use futures::StreamExt as _;

use crate::workflow::{Mode, WorkflowEvent};

/// Progress reporter trait - implement this for different display backends.
pub trait ProgressReporter: Send + Sync {
    /// Show a workflow transition.
    fn on_event(&self, event: &WorkflowEvent);

    /// Log an informational message.
    fn log_info(&self, message: &str);

    /// Log a warning message.
    fn log_warn(&self, message: &str);

    /// Finish and clean up the display.
    fn finish(&self);
}

/// Feed every event of `events` to `reporter` until the workflow is dropped.
pub async fn drive(reporter: Arc<dyn ProgressReporter>, events: async_channel::Receiver<WorkflowEvent>) {
    let mut events = std::pin::pin!(events);
    while let Some(event) = events.next().await {
        reporter.on_event(&event);
    }
}

/// A no-op reporter for when progress display is disabled.
pub struct NullReporter;

impl ProgressReporter for NullReporter {
    fn on_event(&self, _event: &WorkflowEvent) {}
    fn log_info(&self, _message: &str) {}
    fn log_warn(&self, _message: &str) {}
    fn finish(&self) {}
}

#[derive(Debug, Default)]
struct Stats {
    files: usize,
    records: usize,
    artifacts: usize,
    archives: usize,
    failures: usize,
    start_time: Option<std::time::Instant>,
}

impl Stats {
    fn started() -> Self {
        Self {
            start_time: Some(std::time::Instant::now()),
            ..Default::default()
        }
    }

    fn record(&mut self, event: &WorkflowEvent) {
        match event {
            WorkflowEvent::IngestionStarted { .. } => self.files += 1,
            WorkflowEvent::RecordsReady { records } => self.records += records,
            WorkflowEvent::Completed { artifacts, archive } => {
                self.artifacts += artifacts;
                self.archives += usize::from(archive.is_some());
            }
            WorkflowEvent::Failed { .. } => self.failures += 1,
            _ => {}
        }
    }

    fn print_summary(&self) {
        let duration = self.start_time.map(|t| t.elapsed()).unwrap_or_default();

        eprintln!();
        eprintln!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
        eprintln!("📊 Summary");
        eprintln!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
        eprintln!("   📄 Files:      {}", self.files);
        if self.records > 0 {
            eprintln!("   🧾 Records:    {}", self.records);
        }
        eprintln!("   🏷️  Labels:     {}", self.artifacts);
        if self.archives > 0 {
            eprintln!("   📚 PDF sheets: {}", self.archives);
        }
        if self.failures > 0 {
            eprintln!("   ❌ Failed:     {}", self.failures);
        }
        eprintln!("   ⏱️  Duration:   {:.2}s", duration.as_secs_f64());
        eprintln!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    }
}

fn describe(event: &WorkflowEvent) -> (&'static str, String) {
    match event {
        WorkflowEvent::IngestionStarted { file, size, mode } => {
            let mode = match mode {
                Mode::Preview => "reading",
                Mode::Direct => "uploading",
            };
            ("📄", format!("{mode} {file} ({size} bytes)..."))
        }
        WorkflowEvent::RecordsReady { records } => ("🧾", format!("{records} records ready")),
        WorkflowEvent::SelectionChanged { selected, total } => {
            ("☑️ ", format!("{selected}/{total} records selected"))
        }
        WorkflowEvent::GenerationStarted { records: Some(n) } => {
            ("🏷️ ", format!("Generating {n} labels..."))
        }
        WorkflowEvent::GenerationStarted { records: None } => {
            ("🏷️ ", "Generating labels...".to_owned())
        }
        WorkflowEvent::Completed { artifacts, archive } => {
            let archive = archive
                .as_ref()
                .map(|name| format!(", PDF {name}"))
                .unwrap_or_default();
            ("✅", format!("Generated {artifacts} labels{archive}"))
        }
        WorkflowEvent::Failed { reason } => ("❌", format!("Failed: {reason}")),
        WorkflowEvent::Reset => ("↩️ ", "Ready".to_owned()),
    }
}

/// A simple reporter that just prints to stderr (for non-TTY).
pub struct SimpleReporter {
    stats: RwLock<Stats>,
}

impl SimpleReporter {
    pub fn new() -> Self {
        Self {
            stats: RwLock::new(Stats::started()),
        }
    }
}

impl Default for SimpleReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressReporter for SimpleReporter {
    fn on_event(&self, event: &WorkflowEvent) {
        if let Ok(mut stats) = self.stats.write() {
            stats.record(event);
        }
        let (emoji, msg) = describe(event);
        eprintln!("{emoji} {msg}");
    }

    fn log_info(&self, message: &str) {
        eprintln!("ℹ️  {message}");
    }

    fn log_warn(&self, message: &str) {
        eprintln!("⚠️  {message}");
    }

    fn finish(&self) {
        if let Ok(stats) = self.stats.read() {
            stats.print_summary();
        }
    }
}

/// Fancy interactive reporter with a spinner (for TTY).
pub struct FancyReporter {
    multi: indicatif::MultiProgress,
    phase_bar: indicatif::ProgressBar,
    stats: RwLock<Stats>,
}

impl FancyReporter {
    pub fn new() -> Self {
        let multi = indicatif::MultiProgress::new();
        let phase_bar = multi.add(indicatif::ProgressBar::new_spinner());
        if let Ok(style) = indicatif::ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}")
        {
            phase_bar.set_style(style);
        }
        phase_bar.enable_steady_tick(std::time::Duration::from_millis(100));

        Self {
            multi,
            phase_bar,
            stats: RwLock::new(Stats::started()),
        }
    }
}

impl Default for FancyReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressReporter for FancyReporter {
    fn on_event(&self, event: &WorkflowEvent) {
        if let Ok(mut stats) = self.stats.write() {
            stats.record(event);
        }
        let (emoji, msg) = describe(event);
        let line = format!("{emoji} {msg}");
        match event {
            // Terminal transitions stay on screen; the spinner moves on.
            WorkflowEvent::Completed { .. }
            | WorkflowEvent::Failed { .. }
            | WorkflowEvent::RecordsReady { .. } => {
                self.multi.println(&line).ok();
                self.phase_bar.set_message("");
            }
            _ => self.phase_bar.set_message(line),
        }
    }

    fn log_info(&self, message: &str) {
        self.multi.println(format!("ℹ️  {message}")).ok();
    }

    fn log_warn(&self, message: &str) {
        self.multi.println(format!("⚠️  {message}")).ok();
    }

    fn finish(&self) {
        self.phase_bar.finish_and_clear();
        if let Ok(stats) = self.stats.read() {
            stats.print_summary();
        }
    }
}

/// Create an appropriate reporter based on terminal capabilities.
pub fn create_reporter() -> Arc<dyn ProgressReporter> {
    if console::Term::stderr().is_term() {
        Arc::new(FancyReporter::new())
    } else {
        Arc::new(SimpleReporter::new())
    }
}
