use clap::Parser;
use sigajus_automation::adapters::PdfTextExtractor;
use sigajus_automation::config::workflow_config::InputConfig;
use sigajus_automation::config::{Cli, Command, ExtractArgs, LocateArgs, RunArgs};
use sigajus_automation::core::report::{Report, ReportFormat};
use sigajus_automation::core::workflow::load_rows;
use sigajus_automation::domain::ports::Storage;
use sigajus_automation::utils::error::{AutomationError, Result};
use sigajus_automation::utils::{logger, validation::Validate};
use sigajus_automation::{
    EtlEngine, LocalStorage, PdfReportOptions, PdfReportPipeline, WorkflowConfig, WorkflowRunner,
};
use std::path::{Path, PathBuf};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.json_logs {
        logger::init_json_logger(cli.verbose);
    } else {
        logger::init_cli_logger(cli.verbose);
    }
    tracing::debug!("CLI arguments: {:?}", cli);

    let result = match cli.command {
        Command::Extract(args) => extract(args).await,
        Command::Run(args) => run(args).await,
        Command::Locate(args) => locate(args),
        Command::Position => position(),
    };

    if let Err(e) = result {
        tracing::error!(
            "❌ Failed: {} (Category: {:?}, Severity: {:?})",
            e,
            e.category(),
            e.severity()
        );
        tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 Suggestion: {}", e.recovery_suggestion());

        let exit_code = e.exit_code();
        if exit_code > 0 {
            std::process::exit(exit_code);
        }
    }

    Ok(())
}

fn validate_or_exit(args: &dyn Validate) {
    if let Err(e) = args.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }
}

/// Splits an output file path into the storage directory and the file name.
fn split_output(path: &str) -> (String, String) {
    let path = Path::new(path);
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| ".".to_string());
    let file = path
        .file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_default();
    (dir, file)
}

async fn extract(args: ExtractArgs) -> Result<()> {
    validate_or_exit(&args);
    if args.monitor {
        tracing::info!("🔍 System monitoring enabled");
    }

    let (output_dir, output_file) = split_output(&args.output);
    let pipeline = PdfReportPipeline::new(
        LocalStorage::new(args.input.clone()),
        LocalStorage::new(output_dir),
        output_file,
        PdfTextExtractor,
    )
    .with_options(PdfReportOptions {
        with_source_file: args.with_source_file,
        normalize_dates: args.normalize_dates,
    });

    let engine = EtlEngine::new_with_monitoring(pipeline, args.monitor);
    let output_path = engine.run().await?;

    println!("✅ Extraction completed successfully!");
    println!("📁 Report saved to: {}", output_path);
    Ok(())
}

fn absolute(path: &str) -> Result<String> {
    let p = PathBuf::from(path);
    let p = if p.is_absolute() { p } else { std::env::current_dir()?.join(p) };
    Ok(p.display().to_string())
}

async fn run(args: RunArgs) -> Result<()> {
    validate_or_exit(&args);

    let mut config = WorkflowConfig::from_file(&args.config)?;
    if let Some(input) = &args.input {
        config.input = Some(InputConfig { path: absolute(input)? });
    }
    if let Some(output) = &args.output {
        let output = absolute(output)?;
        match config.report.as_mut() {
            Some(report) => report.output = output,
            None => tracing::warn!("⚠️ --output ignored: the workflow has no [report] section"),
        }
    }
    config.validate()?;

    if args.dry_run {
        print_plan(&config);
        return Ok(());
    }

    let rows = config
        .input
        .as_ref()
        .map(|input| load_rows(&config.resolve_path(&input.path)))
        .transpose()?;
    let output = config.report.as_ref().map(|r| config.resolve_path(&r.output));
    let monitor = args.monitor || config.monitoring_enabled();

    let desktop = system_desktop()?;
    tracing::info!("🤖 Running workflow '{}'", config.workflow.name);
    let outcome = WorkflowRunner::new(config, desktop)
        .with_monitoring(monitor)
        .run(rows)
        .await?;

    // rows collected before an abort are saved too
    if let (Some(report), Some(path)) = (&outcome.report, output) {
        save_report(report, &path).await?;
        println!("📁 Report saved to: {}", path.display());
    }

    let summary = &outcome.summary;
    let status = if outcome.aborted.is_some() { "⛔ Workflow aborted" } else { "✅ Workflow finished" };
    println!(
        "{}: {}/{} row(s) ok, {} failed, {} report row(s) in {:.1}s",
        status,
        summary.rows_succeeded,
        summary.rows_total,
        summary.rows_failed,
        summary.rows_emitted,
        summary.duration.as_secs_f64()
    );

    match outcome.aborted {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

fn print_plan(config: &WorkflowConfig) {
    println!("📋 Workflow: {}", config.workflow.name);
    if let Some(description) = &config.workflow.description {
        println!("   {}", description);
    }
    println!("🌐 Session: {}", config.session.url);
    println!("🔐 Login steps: {}", config.session.login.len());
    println!("🎯 Elements: {}", config.elements.len());
    println!("▶️  Steps per row: {}", config.steps.len());
    for (index, step) in config.steps.iter().enumerate() {
        println!("   {:>2}. {}", index + 1, step.action());
    }
    match &config.input {
        Some(input) => println!("📥 Input: {}", config.resolve_path(&input.path).display()),
        None => println!("📥 Input: none (single pass)"),
    }
    if let Some(report) = &config.report {
        println!(
            "📄 Report: {} [{}]",
            config.resolve_path(&report.output).display(),
            report.columns.join(", ")
        );
    }
    println!("✅ Workflow is valid (dry run, nothing executed)");
}

async fn save_report(report: &Report, path: &Path) -> Result<()> {
    let path_str = path.display().to_string();
    let (dir, file) = split_output(&path_str);
    let bytes = report.to_bytes(ReportFormat::from_path(&file))?;
    LocalStorage::new(dir).write_file(&file, &bytes).await
}

#[cfg(feature = "desktop")]
fn system_desktop() -> Result<sigajus_automation::Desktop> {
    sigajus_automation::adapters::system_desktop()
}

#[cfg(not(feature = "desktop"))]
fn system_desktop() -> Result<sigajus_automation::Desktop> {
    Err(desktop_unavailable())
}

#[cfg(not(feature = "desktop"))]
fn desktop_unavailable() -> AutomationError {
    AutomationError::ConfigValidationError {
        field: "features".to_string(),
        message: "built without desktop support; rebuild with --features desktop".to_string(),
    }
}

#[cfg(feature = "desktop")]
fn locate(args: LocateArgs) -> Result<()> {
    use sigajus_automation::adapters::PrimaryScreen;
    use sigajus_automation::core::locator::{find_template, to_gray};
    use sigajus_automation::domain::ports::ScreenSource;

    validate_or_exit(&args);
    let needle = image::open(&args.template)?.to_luma8();
    let screen = to_gray(&PrimaryScreen.capture()?);

    match find_template(&screen, &needle, None, args.confidence) {
        Some(found) => {
            println!(
                "🎯 Found at ({}, {}) size {}x{}, centre {}, confidence {:.3}",
                found.x,
                found.y,
                found.width,
                found.height,
                found.center(),
                found.confidence
            );
            Ok(())
        }
        None => Err(AutomationError::ElementNotFound {
            element: args.template,
            timeout_ms: 0,
        }),
    }
}

#[cfg(not(feature = "desktop"))]
fn locate(args: LocateArgs) -> Result<()> {
    validate_or_exit(&args);
    Err(desktop_unavailable())
}

#[cfg(feature = "desktop")]
fn position() -> Result<()> {
    use sigajus_automation::adapters::{EnigoInput, PrimaryScreen};
    use sigajus_automation::core::workflow::pixel_at;
    use sigajus_automation::domain::ports::{InputDriver, ScreenSource};

    let point = EnigoInput::new()?.cursor_position()?;
    let colour = pixel_at(&PrimaryScreen.capture()?, point)?;
    println!("🖱️  Cursor at {} colour {}", point, colour);
    Ok(())
}

#[cfg(not(feature = "desktop"))]
fn position() -> Result<()> {
    Err(desktop_unavailable())
}
