use anyhow::{Context, Result};
use clap::{value_parser, Arg, ArgAction, Command};
use pcmflow_config::{Config, ConfigManager};
use std::path::PathBuf;

mod commands;
mod wav;

fn build_cli() -> Command {
    Command::new("pcmflow")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Convert audio between sample rates, channel layouts and sample formats")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("DIR")
                .help("Directory holding config.toml")
                .value_parser(value_parser!(PathBuf))
                .global(true),
        )
        .subcommand(
            Command::new("convert")
                .about("Resample an audio file into a WAV file")
                .arg(Arg::new("input").required(true).value_name("INPUT").value_parser(value_parser!(PathBuf)).help("Audio file to read"))
                .arg(Arg::new("output").required(true).value_name("OUTPUT").value_parser(value_parser!(PathBuf)).help("WAV file to write"))
                .arg(Arg::new("rate").short('r').long("rate").value_name("HZ").value_parser(value_parser!(u32)).help("Output sample rate"))
                .arg(Arg::new("format").short('f').long("format").value_name("FORMAT").help("Output sample format (u8, s16, s32, flt, dbl, or a planar variant such as fltp)"))
                .arg(Arg::new("layout").short('l').long("layout").value_name("LAYOUT").help("Output channel layout (mono, stereo, 5.1, ... or a hex mask)"))
                .arg(Arg::new("frame-size").long("frame-size").value_name("SAMPLES").value_parser(value_parser!(usize)).help("Samples per output frame, 0 to keep converter batches"))
                .arg(Arg::new("quality").short('q').long("quality").value_name("QUALITY").value_parser(["fast", "balanced", "accurate"]).help("Resampling quality"))
                .arg(Arg::new("compensate").long("compensate").action(ArgAction::SetTrue).help("Fill timestamp gaps with silence")),
        )
        .subcommand(
            Command::new("probe")
                .about("Show stream parameters and decoded length of a file")
                .arg(Arg::new("input").required(true).value_name("INPUT").value_parser(value_parser!(PathBuf)).help("Audio file to inspect")),
        )
        .subcommand(
            Command::new("config")
                .about("Manage the configuration file")
                .subcommand_required(true)
                .subcommand(Command::new("init").about("Write a default config file if none exists"))
                .subcommand(Command::new("show").about("Print the effective configuration"))
                .subcommand(Command::new("path").about("Print the config file location"))
                .subcommand(Command::new("reset").about("Overwrite the config file with defaults")),
        )
}

fn config_manager(dir: Option<&PathBuf>) -> Result<ConfigManager> {
    match dir {
        Some(dir) => ConfigManager::with_directory(dir.clone()),
        None => ConfigManager::new(),
    }
    .context("Failed to locate config directory")
}

/// `RUST_LOG` takes precedence over the configured level
fn init_logging(config: &Config) {
    env_logger::Builder::new()
        .filter_level(config.app.log_level.as_filter())
        .parse_default_env()
        .init();
}

fn main() -> Result<()> {
    let matches = build_cli().get_matches();
    let manager = config_manager(matches.get_one::<PathBuf>("config"))?;

    // a broken file must not stop `config reset` from repairing it
    let config = match matches.subcommand_name() {
        Some("config") => manager.load_or_default(),
        _ => manager
            .load_with_env_overrides()
            .context("Failed to load configuration")?,
    };
    init_logging(&config);

    match matches.subcommand() {
        Some(("convert", sub_matches)) => commands::run_convert(sub_matches, &config),
        Some(("probe", sub_matches)) => commands::run_probe(sub_matches),
        Some(("config", sub_matches)) => commands::run_config(sub_matches, &manager),
        _ => {
            build_cli().print_help()?;
            Ok(())
        }
    }
}
