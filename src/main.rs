mod cli;
mod console;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands, Mode};
use tokio_util::sync::CancellationToken;

use tk_av::{FfprobeProber, ToolRegistry};
use tk_core::config::Config;
use tk_pipeline::{Pipeline, Task, TaskStatusRegistry};
use tk_probe::Prober;
use tk_probe::FormatInfo;
use tk_select::{
    configured_preferences, resolve_stream, InteractiveSelectionController, StreamSelector,
};

const PROGRESS_INTERVAL: Duration = Duration::from_secs(2);

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG if set, otherwise pick defaults from the verbose flag.
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "trackkeep=debug,tk_pipeline=debug,tk_select=debug,tk_av=debug,tk_probe=debug,tk_core=debug"
                .to_string()
        } else {
            "trackkeep=info,tk_pipeline=info,tk_av=warn,tk_select=warn".to_string()
        }
    });

    // stdout is reserved for command output (e.g. `probe --json`).
    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Run { input, mode } => {
            let rt = tokio::runtime::Runtime::new()?;
            let result = rt.block_on(run_file(&input, cli.config.as_deref(), mode));
            // A pending console read must not hold the process open.
            rt.shutdown_background();
            result
        }
        Commands::Probe { file, json } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(probe_file(&file, cli.config.as_deref(), json))
        }
        Commands::CheckTools => check_tools(cli.config.as_deref()),
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
    }
}

fn load_config(config_path: Option<&Path>) -> Config {
    let mut config = Config::load_or_default(config_path);
    config.apply_env();
    for warning in config.validate() {
        tracing::warn!("config: {warning}");
    }
    config
}

async fn run_file(input: &Path, config_path: Option<&Path>, mode: Mode) -> Result<()> {
    let config = load_config(config_path);

    if !input.exists() {
        anyhow::bail!("Input file does not exist: {:?}", input);
    }

    let tools = ToolRegistry::discover(&config.tools);
    let status = Arc::new(TaskStatusRegistry::new());
    let mut pipeline = Pipeline::from_config(
        &config,
        &tools,
        status.clone(),
        Arc::new(console::ConsoleNotifier),
    )?;
    if mode == Mode::Manual {
        let controller = InteractiveSelectionController::new(
            Arc::new(console::ConsoleListener::stdin()),
            config.selection.interactive_timeout(),
        );
        pipeline = pipeline.with_controller(Arc::new(controller));
    }

    let task = Task::new(mode.strategy());
    let cancel = task.cancellation.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupt received, stopping");
            cancel.cancel();
        }
    });

    let stop_progress = CancellationToken::new();
    let printer = tokio::spawn(console::print_progress(
        status,
        PROGRESS_INTERVAL,
        stop_progress.clone(),
    ));

    let result = pipeline.process(&task, input).await;
    stop_progress.cancel();
    let _ = printer.await;

    match result {
        Ok(outcome) => {
            println!("{}", outcome.summary);
            println!("\nOutput: {}", outcome.output.display());
            Ok(())
        }
        // The notifier has already printed the failure line.
        Err(e) => anyhow::bail!("task {} failed ({e})", task.id),
    }
}

async fn probe_file(file: &Path, config_path: Option<&Path>, json: bool) -> Result<()> {
    let config = load_config(config_path);
    let target = file.to_string_lossy();
    let remote = is_remote(&target);

    if !remote && !file.exists() {
        anyhow::bail!("File does not exist: {:?}", file);
    }

    let tools = ToolRegistry::discover(&config.tools);
    let prober = FfprobeProber::from_registry(&tools)?;

    // Remote sources only get the container summary.
    if remote {
        let format = prober.probe_format(&target).await?;
        if json {
            println!("{}", serde_json::to_string_pretty(&format)?);
        } else {
            println!("URL: {target}");
            print_format(&format);
        }
        return Ok(());
    }

    let media = prober.probe(&target).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&media)?);
        return Ok(());
    }

    println!("File: {}", file.display());
    print_format(&media.format);

    println!("\nStreams: {}", media.streams.len());
    for stream in &media.streams {
        print!(
            "  [{}] {} {} ({})",
            stream.index,
            stream.codec_type,
            stream.codec_name,
            resolve_stream(stream)
        );
        if stream.is_attached_picture {
            print!(" [art]");
        }
        if stream.disposition.default {
            print!(" [default]");
        }
        if stream.disposition.forced {
            print!(" [forced]");
        }
        if let Some(title) = stream.title() {
            print!(" \"{title}\"");
        }
        println!();
    }

    let preferred = configured_preferences(&config.selection);
    let decision = StreamSelector::select(&media, &preferred);
    println!("\nAutomatic selection:");
    println!("  Keep:   {:?}", decision.kept());
    println!("  Remove: {:?}", decision.removed());
    if !decision.art().is_empty() {
        println!("  Art:    {:?}", decision.art());
    }

    Ok(())
}

fn is_remote(target: &str) -> bool {
    target.starts_with("http://") || target.starts_with("https://")
}

fn print_format(format: &FormatInfo) {
    match format.duration_secs {
        Some(secs) => {
            let secs = secs as u64;
            println!("Duration: {:02}:{:02}:{:02}", secs / 3600, (secs / 60) % 60, secs % 60);
        }
        None => println!("Duration: unknown"),
    }
    if let Some(size) = format.size_bytes {
        println!("Size: {size} bytes");
    }
}

fn check_tools(config_path: Option<&Path>) -> Result<()> {
    println!("Checking external tools...\n");

    let config = Config::load_or_default(config_path);
    let tools = ToolRegistry::discover(&config.tools).check_all();
    let mut all_ok = true;

    for tool in &tools {
        let status = if tool.available {
            "✓"
        } else {
            all_ok = false;
            "✗"
        };

        print!("{} {}", status, tool.name);

        if let Some(ref version) = tool.version {
            print!(" ({})", version.lines().next().unwrap_or(""));
        }

        if let Some(ref path) = tool.path {
            print!(" - {}", path.display());
        }

        println!();
    }

    println!();
    if all_ok {
        println!("All required tools are available!");
    } else {
        println!("Some tools are missing. Install ffmpeg to process files.");
    }

    Ok(())
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    let config = match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let contents = std::fs::read_to_string(p)?;
            let config = Config::from_json(&contents)?;
            println!("✓ Configuration is valid");
            config
        }
        None => {
            println!("No config file specified, using defaults");
            Config::default()
        }
    };

    println!(
        "  Preferred languages: {}",
        config.selection.preferred_languages.join(", ")
    );
    println!(
        "  Selection timeout: {}s",
        config.selection.interactive_timeout_secs
    );
    println!("  Remux timeout: {}s", config.transcode.timeout_secs);
    println!("  Output suffix: {}", config.transcode.output_suffix);

    let warnings = config.validate();
    if !warnings.is_empty() {
        println!("\nWarnings:");
        for warning in &warnings {
            println!("  - {warning}");
        }
    }

    Ok(())
}
