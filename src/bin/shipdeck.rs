use clap::{App, Arg};
use colored::*;
use shipdeck::config::PanelConfig;
use shipdeck::log::{LogEntry, LogLevel};
use shipdeck::panel::ControlPanel;
use shipdeck::persistence::{self, JsonFileStore};
use shipdeck::ports::{RandomSource, SeededRandom, SystemClock, TracingNotifier};
use shipdeck::protocol::{self, ConsoleCommand, HELP};
use shipdeck::runtime::{PanelHandle, PanelRuntime};
use std::path::Path;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::Level;

const DEFAULT_STATE_FILE: &str = "shipdeck-state.json";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let matches = App::new("shipdeck")
        .version("0.1.0")
        .author("Space Systems Engineering Team")
        .about("🚀 Spacecraft control panel - switches, interlocks, ignition and fuel on a text console")
        .arg(
            Arg::with_name("state-file")
                .short("s")
                .long("state-file")
                .value_name("FILE")
                .help("Where the panel snapshot is saved")
                .takes_value(true)
                .default_value(DEFAULT_STATE_FILE),
        )
        .arg(
            Arg::with_name("config")
                .short("c")
                .long("config")
                .value_name("FILE")
                .help("JSON file with panel tunables")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("seed")
                .long("seed")
                .value_name("SEED")
                .help("Seed for the ignition failure draw")
                .takes_value(true)
                .validator(|v| match v.parse::<u64>() {
                    Ok(_) => Ok(()),
                    Err(_) => Err("Seed must be a non-negative integer".into()),
                }),
        )
        .arg(
            Arg::with_name("starter-damage")
                .long("starter-damage")
                .value_name("PERCENT")
                .help("Ignition failure probability in percent (0-100)")
                .takes_value(true)
                .validator(|v| match v.parse::<f64>() {
                    Ok(p) if (0.0..=100.0).contains(&p) => Ok(()),
                    _ => Err("Starter damage must be a number between 0 and 100".into()),
                }),
        )
        .arg(
            Arg::with_name("no-autosave")
                .long("no-autosave")
                .help("Only save on request and at shutdown"),
        )
        .arg(
            Arg::with_name("verbose")
                .short("v")
                .long("verbose")
                .help("Enable debug tracing on stderr"),
        )
        .get_matches();

    let verbose = matches.is_present("verbose");
    tracing_subscriber::fmt()
        .with_max_level(if verbose { Level::DEBUG } else { Level::WARN })
        .with_writer(std::io::stderr)
        .init();

    let mut config = match matches.value_of("config") {
        Some(path) => PanelConfig::from_file(Path::new(path))?,
        None => PanelConfig::default(),
    };
    if let Some(damage) = matches.value_of("starter-damage") {
        config.starter_damage = damage.parse()?;
    }
    if matches.is_present("no-autosave") {
        config.autosave_enabled = false;
    }
    config.validate()?;

    let rng: Box<dyn RandomSource> = match matches.value_of("seed") {
        Some(seed) => Box::new(SeededRandom::new(seed.parse()?)),
        None => Box::new(SeededRandom::from_entropy()),
    };

    let state_file = matches.value_of("state-file").unwrap_or(DEFAULT_STATE_FILE);
    let store = JsonFileStore::new(state_file);

    let mut panel = ControlPanel::new(config.clone(), Box::new(SystemClock::new()), rng, Box::new(TracingNotifier));
    let saved = persistence::load_or_initial(&store, &config, panel.now());
    panel.restore(saved);

    println!("{}", "🚀 SHIPDECK CONTROL PANEL".bright_blue().bold());
    println!("{} {}", "State file:".dimmed(), state_file);
    println!("{} {}", "Ship status:".bright_white(), status_label(&panel));
    println!("{}", "Type 'help' for commands.".dimmed());

    let (handle, mut entries, task) = PanelRuntime::spawn(panel, Arc::new(store));

    let printer = tokio::spawn(async move {
        while let Some(entry) = entries.recv().await {
            print_entry(&entry);
        }
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        match protocol::parse_command(&line) {
            Ok(ConsoleCommand::Quit) => break,
            Ok(command) => {
                if let Err(e) = run_command(&handle, command).await {
                    println!("{} {}", "❌".red(), e.to_string().bright_red());
                    break;
                }
            }
            Err(e) => println!("{} {}", "⚠".yellow(), e.to_string().yellow()),
        }
    }

    handle.shutdown().await?;
    let panel = task.await?;
    printer.await?;

    println!(
        "{} {}",
        "🛑 Panel saved and stopped. Ship status:".dimmed(),
        status_label(&panel)
    );
    Ok(())
}

async fn run_command(handle: &PanelHandle, command: ConsoleCommand) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        ConsoleCommand::Dispatch(action) => handle.dispatch(action).await?,
        ConsoleCommand::Status => {
            let status = handle.status().await?;
            println!("{}", status.to_json()?);
            println!("{}", "Calibration grid:".bright_white());
            println!("{}", status.calibration.render_grid());
        }
        ConsoleCommand::Logs => {
            let state = handle.snapshot().await?;
            let visible: Vec<&LogEntry> = state.visible_logs().collect();
            if visible.is_empty() {
                println!("{}", "No visible log entries.".dimmed());
            }
            for entry in visible {
                print_entry(entry);
            }
        }
        ConsoleCommand::Help => println!("{}", HELP),
        ConsoleCommand::Quit => {}
    }
    Ok(())
}

fn status_label(panel: &ControlPanel) -> ColoredString {
    let status = panel.state().status();
    match status {
        shipdeck::subsystems::ShipStatus::Online => status.label().bright_green(),
        shipdeck::subsystems::ShipStatus::Standby => status.label().yellow(),
        shipdeck::subsystems::ShipStatus::Offline => status.label().bright_red(),
    }
}

fn print_entry(entry: &LogEntry) {
    let level = match entry.level {
        LogLevel::Info => entry.level.label().bright_cyan(),
        LogLevel::Warning => entry.level.label().yellow(),
        LogLevel::Error => entry.level.label().bright_red(),
        LogLevel::Critical => entry.level.label().red().bold(),
        LogLevel::System => entry.level.label().bright_green(),
    };
    println!(
        "{} [{}] {} {}",
        entry.timestamp.to_string().dimmed(),
        level,
        format!("{}:", entry.source).bright_white(),
        entry.message
    );
}
