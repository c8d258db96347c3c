//! Runs a workflow against the desktop: session launch, login, then the step
//! list once per input row, collecting emitted report rows.

use crate::config::workflow_config::{RowFailurePolicy, Step, WorkflowConfig};
use crate::core::interpolate::{interpolate, Variables};
use crate::core::locator::ElementLocator;
use crate::core::report::Report;
use crate::core::session::{self, SessionSettings};
use crate::domain::model::{Point, Record, Rgb};
use crate::domain::ports::Desktop;
use crate::utils::error::{AutomationError, Result};
use crate::utils::monitor::SystemMonitor;
use image::RgbaImage;
use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::time::{Duration, Instant};

/// Pause between the copy shortcut and reading the clipboard.
const CLIPBOARD_SETTLE: Duration = Duration::from_millis(100);

#[cfg(target_os = "macos")]
const SELECT_MODIFIER: &str = "meta";
#[cfg(not(target_os = "macos"))]
const SELECT_MODIFIER: &str = "ctrl";

#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub rows_total: usize,
    pub rows_succeeded: usize,
    pub rows_failed: usize,
    pub rows_emitted: usize,
    pub duration: Duration,
}

#[derive(Debug)]
pub struct RunOutcome {
    pub summary: RunSummary,
    /// Every row collected before the run ended, including on abort.
    pub report: Option<Report>,
    /// The error that stopped the run early, if any.
    pub aborted: Option<AutomationError>,
}

pub struct WorkflowRunner {
    config: WorkflowConfig,
    desktop: Desktop,
    locator: ElementLocator,
    report: Option<Report>,
    step_delay: Duration,
    failsafe: bool,
    skip_session: bool,
    monitor: SystemMonitor,
}

type StepFuture<'a> = Pin<Box<dyn Future<Output = Result<()>> + 'a>>;

impl WorkflowRunner {
    pub fn new(config: WorkflowConfig, desktop: Desktop) -> Self {
        let locator = ElementLocator::new(config.element_specs()).with_timing(
            Duration::from_millis(config.poll_interval_ms()),
            Duration::from_millis(config.locate_timeout_ms()),
        );
        let report = config.report.as_ref().map(|r| Report::new(r.columns.clone()));

        Self {
            step_delay: Duration::from_millis(config.step_delay_ms()),
            failsafe: config.failsafe_enabled(),
            monitor: SystemMonitor::new(config.monitoring_enabled()),
            skip_session: false,
            config,
            desktop,
            locator,
            report,
        }
    }

    pub fn with_monitoring(mut self, enabled: bool) -> Self {
        self.monitor = SystemMonitor::new(enabled);
        self
    }

    /// Skips opening the browser and the login steps, for a session that is
    /// already open.
    pub fn with_existing_session(mut self, existing: bool) -> Self {
        self.skip_session = existing;
        self
    }

    /// Opens the session, logs in, then runs the steps once per row. `None`
    /// means the workflow has no input and gets a single pass; an empty list
    /// runs nothing.
    ///
    /// Session and login failures are returned as `Err`. A row failure that
    /// ends the run is carried in [`RunOutcome::aborted`] so the rows already
    /// collected can still be saved.
    pub async fn run(mut self, rows: Option<Vec<Record>>) -> Result<RunOutcome> {
        let started = Instant::now();
        let session_vars = session::session_variables(&self.config.session);

        if !self.skip_session {
            let settings = SessionSettings::from(&self.config.session);
            session::open(&settings, self.desktop.browser.as_ref()).await?;

            let login = self.config.session.login.clone();
            if !login.is_empty() {
                tracing::info!("🔐 Logging in ({} steps)", login.len());
                let mut vars = session_vars.clone();
                let mut discarded = Vec::new();
                self.execute_steps(&login, &mut vars, &mut discarded).await?;
            }
            self.monitor.log_stats("Login completed");
        }

        let rows = rows.unwrap_or_else(|| vec![Record::new()]);
        if rows.is_empty() {
            tracing::warn!("⚠️ The input has no data rows; nothing to run");
        }
        let mut summary = RunSummary {
            rows_total: rows.len(),
            ..RunSummary::default()
        };

        let steps = self.config.steps.clone();
        let policy = self.config.row_failure_policy();
        let retries = self.config.retry_attempts();

        let mut aborted = None;
        for (index, row) in rows.iter().enumerate() {
            let row_number = index + 1;
            let mut base_vars = session_vars.clone();
            for (key, _) in row.data.iter() {
                base_vars.insert(key.clone(), row.cell(key));
            }
            base_vars.insert("row_number".to_string(), row_number.to_string());

            tracing::info!("▶️ Row {}/{}", row_number, summary.rows_total);
            match self.run_row(&steps, &base_vars, retries).await {
                Ok(emitted) => {
                    summary.rows_succeeded += 1;
                    summary.rows_emitted += emitted.len();
                    if let Some(report) = self.report.as_mut() {
                        emitted.into_iter().for_each(|r| report.push(r));
                    }
                }
                Err(e) if e.is_fatal() => {
                    summary.rows_failed += 1;
                    tracing::error!("⛔ Aborting at row {}: {}", row_number, e);
                    aborted = Some(e);
                    break;
                }
                Err(e) => {
                    summary.rows_failed += 1;
                    tracing::error!("❌ Row {} failed: {}", row_number, e);
                    self.capture_failure(row_number).await;

                    if let Some(report) = self.report.as_mut() {
                        report.ensure_column("error");
                        let mut record = row_record(&report.columns, &base_vars);
                        record.data.insert("error".to_string(), e.to_string().into());
                        report.push(record);
                        summary.rows_emitted += 1;
                    }
                    if policy == RowFailurePolicy::Stop {
                        tracing::error!("⛔ Stopping after row {} (on_row_failure = stop)", row_number);
                        aborted = Some(e);
                        break;
                    }
                }
            }
        }

        summary.duration = started.elapsed();
        self.monitor.log_final_stats();
        let status = if aborted.is_some() { "aborted" } else { "finished" };
        tracing::info!(
            "🏁 Workflow '{}' {}: {} ok, {} failed, {} report rows in {:?}",
            self.config.workflow.name,
            status,
            summary.rows_succeeded,
            summary.rows_failed,
            summary.rows_emitted,
            summary.duration
        );

        Ok(RunOutcome {
            summary,
            report: self.report,
            aborted,
        })
    }

    async fn run_row(&mut self, steps: &[Step], base_vars: &Variables, retries: u32) -> Result<Vec<Record>> {
        let mut attempt = 0;
        loop {
            let mut vars = base_vars.clone();
            let mut emitted = Vec::new();
            match self.execute_steps(steps, &mut vars, &mut emitted).await {
                Ok(()) => return Ok(emitted),
                Err(e) if e.is_fatal() || attempt >= retries => return Err(e),
                Err(e) => {
                    attempt += 1;
                    tracing::warn!("🔁 Retrying row (attempt {}/{}): {}", attempt, retries, e);
                }
            }
        }
    }

    fn execute_steps<'a>(
        &'a mut self,
        steps: &'a [Step],
        vars: &'a mut Variables,
        emitted: &'a mut Vec<Record>,
    ) -> StepFuture<'a> {
        Box::pin(async move {
            for (index, step) in steps.iter().enumerate() {
                self.check_failsafe()?;
                tracing::debug!("Step {} ({})", index + 1, step.action());
                if let Err(e) = self.execute_step(step, vars, emitted).await {
                    tracing::debug!("Step {} ({}) failed: {}", index + 1, step.action(), e);
                    return Err(e);
                }
                if !self.step_delay.is_zero() {
                    tokio::time::sleep(self.step_delay).await;
                }
            }
            Ok(())
        })
    }

    async fn execute_step(&mut self, step: &Step, vars: &mut Variables, emitted: &mut Vec<Record>) -> Result<()> {
        match step {
            Step::Click { target, button, clicks } => {
                let point = self.locate(target, None).await?;
                self.desktop.input.move_to(point)?;
                self.desktop.input.click(*button, *clicks)?;
            }
            Step::MoveTo { target } => {
                let point = self.locate(target, None).await?;
                self.desktop.input.move_to(point)?;
            }
            Step::TypeText { text, target, clear } => {
                if let Some(target) = target {
                    let point = self.locate(target, None).await?;
                    self.desktop.input.move_to(point)?;
                    self.desktop.input.click(Default::default(), 1)?;
                }
                if *clear {
                    self.select_all()?;
                    self.desktop.input.press_key("delete")?;
                }
                let text = interpolate(text, vars)?;
                self.desktop.input.type_text(&text)?;
            }
            Step::Press { key, presses } => {
                for _ in 0..*presses {
                    self.desktop.input.press_key(key)?;
                }
            }
            Step::Hotkey { keys } => self.desktop.input.hotkey(keys)?,
            Step::Wait { ms } => tokio::time::sleep(Duration::from_millis(*ms)).await,
            Step::WaitFor { target, timeout_ms } => {
                self.locate(target, timeout_ms.map(Duration::from_millis)).await?;
            }
            Step::WaitPixel {
                x,
                y,
                color,
                tolerance,
                timeout_ms,
            } => {
                let expected = Rgb::parse(color).ok_or_else(|| AutomationError::InvalidConfigValueError {
                    field: "wait_pixel.color".to_string(),
                    value: color.clone(),
                    reason: "Colour must be written as #rrggbb".to_string(),
                })?;
                let timeout = timeout_ms
                    .map(Duration::from_millis)
                    .unwrap_or(self.locator.default_timeout());
                self.wait_pixel(Point::new(*x, *y), expected, *tolerance, timeout).await?;
            }
            Step::ReadField { target, into } => {
                let point = self.locate(target, None).await?;
                self.desktop.input.move_to(point)?;
                self.desktop.input.click(Default::default(), 1)?;
                self.select_all()?;
                // an empty field or a failed copy must not read the previous value
                self.desktop.clipboard.clear()?;
                self.desktop
                    .input
                    .hotkey(&[SELECT_MODIFIER.to_string(), "c".to_string()])?;
                tokio::time::sleep(CLIPBOARD_SETTLE).await;
                let text = self.desktop.clipboard.get_text()?;
                tracing::debug!("Read {} = {:?}", into, text.trim());
                vars.insert(into.clone(), text.trim().to_string());
            }
            Step::ReadPixel { x, y, into } => {
                let capture = self.desktop.screen.capture()?;
                let rgb = pixel_at(&capture, Point::new(*x, *y))?;
                vars.insert(into.clone(), rgb.to_string());
            }
            Step::Screenshot { path } => {
                let path = self.config.resolve_path(&interpolate(path, vars)?);
                let capture = self.desktop.screen.capture()?;
                if let Some(parent) = path.parent() {
                    tokio::fs::create_dir_all(parent).await?;
                }
                capture.save(&path)?;
                tracing::info!("📸 Screenshot saved to {}", path.display());
            }
            Step::Set { var, value } => {
                let value = interpolate(value, vars)?;
                vars.insert(var.clone(), value);
            }
            Step::IfVisible {
                target,
                then,
                otherwise,
            } => {
                let visible = self
                    .locator
                    .locate_once(target, self.desktop.screen.as_ref())?
                    .is_some();
                tracing::debug!("'{}' visible: {}", target, visible);
                let branch = if visible { then } else { otherwise };
                self.execute_steps(branch, vars, emitted).await?;
            }
            Step::Emit => {
                let columns = self
                    .report
                    .as_ref()
                    .map(|r| r.columns.clone())
                    .unwrap_or_default();
                emitted.push(row_record(&columns, vars));
            }
        }
        Ok(())
    }

    async fn locate(&mut self, target: &str, timeout: Option<Duration>) -> Result<Point> {
        self.locator
            .wait_for(target, self.desktop.screen.as_ref(), timeout)
            .await
    }

    fn select_all(&mut self) -> Result<()> {
        self.desktop
            .input
            .hotkey(&[SELECT_MODIFIER.to_string(), "a".to_string()])
    }

    fn check_failsafe(&self) -> Result<()> {
        if self.failsafe && self.desktop.input.cursor_position()? == Point::new(0, 0) {
            return Err(AutomationError::FailSafeTriggered);
        }
        Ok(())
    }

    async fn wait_pixel(&mut self, point: Point, expected: Rgb, tolerance: u8, timeout: Duration) -> Result<()> {
        let started = Instant::now();
        loop {
            let capture = self.desktop.screen.capture()?;
            let actual = pixel_at(&capture, point)?;
            if actual.matches(&expected, tolerance) {
                return Ok(());
            }
            if started.elapsed() >= timeout {
                return Err(AutomationError::ElementNotFound {
                    element: format!("pixel {} at {} (last seen {})", expected, point, actual),
                    timeout_ms: timeout.as_millis() as u64,
                });
            }
            tokio::time::sleep(Duration::from_millis(self.config.poll_interval_ms())).await;
        }
    }

    async fn capture_failure(&self, row_number: usize) {
        let Some(dir) = self
            .config
            .error_handling
            .as_ref()
            .and_then(|e| e.screenshot_dir.as_ref())
        else {
            return;
        };

        let dir = self.config.resolve_path(dir);
        let file = dir.join(format!(
            "falha_linha{}_{}.png",
            row_number,
            chrono::Local::now().format("%Y%m%d_%H%M%S")
        ));
        let saved = async {
            tokio::fs::create_dir_all(&dir).await?;
            self.desktop.screen.capture()?.save(&file)?;
            Ok::<_, AutomationError>(())
        };
        match saved.await {
            Ok(()) => tracing::info!("📸 Failure screenshot saved to {}", file.display()),
            Err(e) => tracing::warn!("Could not save failure screenshot: {}", e),
        }
    }
}

/// Input rows from a CSV file (header row required, BOM tolerated).
pub fn load_rows(path: &Path) -> Result<Vec<Record>> {
    let bytes = std::fs::read(path)?;
    let report = Report::from_csv_bytes(&bytes)?;
    tracing::info!("📥 Loaded {} input row(s) from {}", report.len(), path.display());
    Ok(report.rows)
}

fn row_record(columns: &[String], vars: &Variables) -> Record {
    let mut record = Record::new();
    for column in columns {
        let value = vars.get(column).cloned().unwrap_or_default();
        record.data.insert(column.clone(), value.into());
    }
    record
}

pub fn pixel_at(image: &RgbaImage, point: Point) -> Result<Rgb> {
    if point.x < 0 || point.y < 0 || point.x as u32 >= image.width() || point.y as u32 >= image.height() {
        return Err(AutomationError::ScreenError(format!(
            "Point {} is outside the {}x{} screen",
            point,
            image.width(),
            image.height()
        )));
    }
    let [r, g, b, _] = image.get_pixel(point.x as u32, point.y as u32).0;
    Ok(Rgb(r, g, b))
}
