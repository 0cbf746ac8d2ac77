//! Command handlers

use std::io::Read;
use std::path::PathBuf;

use tokio::sync::broadcast::{self, error::RecvError};
use tracing::warn;

use crate::cli::{Cli, Commands, ConfigArgs};
use crate::console;
use crate::output::{output_event, output_frame, output_materials, output_report, FrameReport};
use weighbridge_app::{Config, Session, SessionEvent};
use weighbridge_domain::SentinelPolicy;
use weighbridge_infra::{CommandIdentifier, MaterialCatalogLoader};
use weighbridge_telemetry::{TelemetryFramer, TelemetrySource};
use weighbridge_types::{ConfigError, Error, OutputFormat, Result};

pub fn execute(cli: Cli) -> Result<()> {
    // Load config
    let config = Config::load()?;
    let output_format = cli.format.unwrap_or(config.output_format);

    match cli.command {
        Commands::Run {
            source,
            material,
            policy,
            no_console,
        } => cmd_run(&config, source, material, policy, no_console, output_format),
        Commands::Frame { input, chunk_size } => cmd_frame(&input, chunk_size, output_format),
        Commands::Materials { file } => cmd_materials(&config, file, output_format),
        Commands::Config(args) => cmd_config(args),
    }
}

fn cmd_run(
    config: &Config,
    source: Option<String>,
    material: Option<String>,
    policy: Option<SentinelPolicy>,
    no_console: bool,
    output_format: OutputFormat,
) -> Result<()> {
    let source = source.or_else(|| config.source.clone()).ok_or_else(|| {
        ConfigError::Invalid(
            "no telemetry source; pass --source or set one with: weighbridge config --set-source"
                .to_string(),
        )
    })?;
    let source = TelemetrySource::parse(&source);

    let mut settings = config.session_settings()?;
    if let Some(policy) = policy {
        settings.sentinel_policy = policy;
    }
    let catalog = MaterialCatalogLoader::load_or_builtin(config.materials_file.as_deref())?;
    let material = material.unwrap_or_else(|| config.default_material.clone());

    let identifier = CommandIdentifier::from_commands(
        config.capture_command.as_deref(),
        config.recognizer_command.as_deref(),
    )?;
    if !identifier.is_configured() {
        warn!("Capture or recognizer command not set; every visit will be booked for manual check");
    }

    let session = Session::new(settings, catalog, Some(&material), identifier)?;
    let console_enabled = !no_console && !source.is_stdin();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    let result = runtime.block_on(async {
        let reader = source.open(&config.serial).await?;

        let handle = session.handle();
        let printer = tokio::spawn(print_events(handle.subscribe(), output_format));
        let console = console_enabled.then(|| tokio::spawn(console::run(handle.clone(), output_format)));
        drop(handle);

        let report = session.run(reader).await;

        // The event channel closes once the console drops its handle
        if let Some(console) = console {
            console.abort();
            let _ = console.await;
        }
        let _ = printer.await;

        Ok::<_, Error>(report)
    });

    // A pending stdin read must not keep the process alive
    runtime.shutdown_background();

    output_report(output_format, &result?)
}

async fn print_events(mut events: broadcast::Receiver<SessionEvent>, output_format: OutputFormat) {
    loop {
        match events.recv().await {
            Ok(event) => {
                if let Err(e) = output_event(output_format, &event) {
                    warn!(error = %e, "Failed to print event");
                }
            }
            Err(RecvError::Lagged(skipped)) => warn!(skipped, "Event output fell behind"),
            Err(RecvError::Closed) => break,
        }
    }
}

fn cmd_frame(input: &str, chunk_size: usize, output_format: OutputFormat) -> Result<()> {
    if chunk_size == 0 {
        return Err(Error::Config(ConfigError::Invalid(
            "chunk size must be positive".to_string(),
        )));
    }

    let data = if input == "-" {
        let mut buf = Vec::new();
        std::io::stdin().read_to_end(&mut buf)?;
        buf
    } else {
        std::fs::read(input)?
    };

    let mut framer = TelemetryFramer::new();
    let samples: Vec<_> = data
        .chunks(chunk_size)
        .flat_map(|chunk| framer.push(chunk))
        .collect();
    let discarded_tail = framer.finish();

    output_frame(
        output_format,
        &FrameReport {
            samples,
            stats: framer.stats(),
            discarded_tail,
        },
    )
}

fn cmd_materials(config: &Config, file: Option<PathBuf>, output_format: OutputFormat) -> Result<()> {
    let path = file.or_else(|| config.materials_file.clone());
    let catalog = MaterialCatalogLoader::load_or_builtin(path.as_deref())?;
    output_materials(output_format, &catalog)
}

fn cmd_config(args: ConfigArgs) -> Result<()> {
    if args.reset {
        let config = Config::default();
        config.save()?;
        println!("Configuration reset to defaults");
        println!("\n{}", config);
        return Ok(());
    }

    let mut config = Config::load()?;
    let mut modified = false;

    if let Some(source) = args.set_source {
        config.source = Some(source);
        modified = true;
    }

    if let Some(baud_rate) = args.set_baud_rate {
        config.serial.baud_rate = baud_rate;
        modified = true;
    }

    if let Some(apply) = args.set_apply_line_settings {
        config.serial.apply_line_settings = apply;
        modified = true;
    }

    if let Some(ms) = args.set_poll_interval {
        config.poll_interval_ms = ms;
        modified = true;
    }

    if let Some(kg) = args.set_entry_threshold {
        config.entry_threshold = kg;
        modified = true;
    }

    if let Some(kg) = args.set_departure_threshold {
        config.departure_threshold = kg;
        modified = true;
    }

    if let Some(ticks) = args.set_stability_ticks {
        config.stability_ticks = ticks;
        modified = true;
    }

    if let Some(ms) = args.set_settle_delay {
        config.settle_delay_ms = ms;
        modified = true;
    }

    if let Some(ms) = args.set_identification_timeout {
        config.identification_timeout_ms = ms;
        modified = true;
    }

    if let Some(cmd) = args.set_capture_command {
        config.capture_command = Some(cmd);
        modified = true;
    }

    if let Some(cmd) = args.set_recognizer_command {
        config.recognizer_command = Some(cmd);
        modified = true;
    }

    if let Some(material) = args.set_default_material {
        config.default_material = material;
        modified = true;
    }

    if let Some(path) = args.set_materials_file {
        config.materials_file = Some(path);
        modified = true;
    }

    if let Some(policy) = args.set_sentinel_policy {
        config.sentinel_policy = policy;
        modified = true;
    }

    if let Some(output_format) = args.set_output {
        config.output_format = output_format;
        modified = true;
    }

    if modified {
        // Refuse to persist settings the session would reject
        config.session_settings()?;
        config.save()?;
        println!("Configuration updated");
    }

    if args.show || !modified {
        println!("{}", config);
    }

    Ok(())
}
