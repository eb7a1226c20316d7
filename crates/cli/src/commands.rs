use crate::wav::WavWriter;
use anyhow::{bail, Context, Result};
use clap::ArgMatches;
use console::style;
use pcmflow_config::{Config, ConfigManager, ResampleConfig};
use pcmflow_core::{ChannelLayout, ResampleQuality, SampleFormat};
use pcmflow_resampler::{AudioDecoder, PushStatus, Resampler, ResamplerStats};
use std::io::Write;
use std::path::{Path, PathBuf};

/// What a `convert` run should produce
#[derive(Debug, Clone, PartialEq)]
pub struct ConvertOptions {
    pub input: PathBuf,
    pub output: PathBuf,
    pub target: ResampleConfig,
}

impl ConvertOptions {
    /// Starts from the configured defaults and applies command line flags
    pub fn from_matches(matches: &ArgMatches, defaults: &ResampleConfig) -> Result<Self> {
        let input = matches
            .get_one::<PathBuf>("input")
            .context("Input file is required")?;
        let output = matches
            .get_one::<PathBuf>("output")
            .context("Output file is required")?;

        let mut target = defaults.clone();
        if let Some(rate) = matches.get_one::<u32>("rate") {
            target.sample_rate = *rate;
        }
        if let Some(format) = matches.get_one::<String>("format") {
            target.sample_format = format
                .parse::<SampleFormat>()
                .with_context(|| format!("Invalid --format '{}'", format))?;
        }
        if let Some(layout) = matches.get_one::<String>("layout") {
            target.channel_layout = layout
                .parse::<ChannelLayout>()
                .with_context(|| format!("Invalid --layout '{}'", layout))?;
        }
        if let Some(size) = matches.get_one::<usize>("frame-size") {
            target.frame_size = *size;
        }
        if let Some(quality) = matches.get_one::<String>("quality") {
            target.quality = quality
                .parse::<ResampleQuality>()
                .with_context(|| format!("Invalid --quality '{}'", quality))?;
        }
        if matches.get_flag("compensate") {
            target.compensation = true;
        }

        Ok(Self {
            input: input.clone(),
            output: output.clone(),
            target,
        })
    }
}

/// Decodes `input`, resamples it and writes a WAV file
pub fn convert(options: &ConvertOptions) -> Result<ResamplerStats> {
    let mut decoder = AudioDecoder::open(&options.input)
        .with_context(|| format!("Failed to open {}", options.input.display()))?;
    let target = &options.target;

    let mut resampler = Resampler::builder()
        .source_channel_layout(decoder.layout())
        .source_sample_format(decoder.sample_format())
        .source_sample_rate(decoder.sample_rate())
        .target_channel_layout(target.channel_layout)
        .target_sample_format(target.sample_format)
        .target_sample_rate(target.sample_rate)
        .target_frame_samples(target.frame_samples())
        .quality(target.quality)
        .compensation(target.compensation)
        .build()
        .context("Failed to set up the resampler")?;

    log::info!(
        "Converting {} Hz {} to {} Hz {} {}",
        decoder.sample_rate(),
        decoder.layout(),
        target.sample_rate,
        target.channel_layout,
        target.sample_format
    );

    let mut writer = WavWriter::create(
        &options.output,
        target.channel_layout,
        target.sample_format,
        target.sample_rate,
    )?;

    while let Some(frame) = decoder
        .next_frame()
        .with_context(|| format!("Failed to decode {}", options.input.display()))?
    {
        if resampler.push_frame(&frame)? == PushStatus::NotReady {
            bail!("Resampler still holds unread output");
        }
        drain(&mut resampler, &mut writer)?;
    }

    if resampler.flush()? == PushStatus::NotReady {
        bail!("Resampler still holds unread output at end of input");
    }
    drain(&mut resampler, &mut writer)?;

    let written = writer.samples_written();
    writer.finish()?;
    log::info!("Wrote {} samples to {}", written, options.output.display());

    Ok(resampler.stats().clone())
}

fn drain<W: Write + std::io::Seek>(
    resampler: &mut Resampler,
    writer: &mut WavWriter<W>,
) -> Result<()> {
    while let Some(frame) = resampler.pull()? {
        writer.write_frame(&frame)?;
    }
    Ok(())
}

pub fn run_convert(matches: &ArgMatches, config: &Config) -> Result<()> {
    let options = ConvertOptions::from_matches(matches, &config.resample)?;
    let stats = convert(&options)?;

    println!(
        "{} {} -> {}",
        style("✓").green().bold(),
        options.input.display(),
        options.output.display()
    );
    println!(
        "  {} samples in, {} samples out in {} frames",
        stats.samples_in, stats.samples_out, stats.frames_pulled
    );
    if stats.discontinuities > 0 {
        println!(
            "  {}",
            style(format!("{} timestamp discontinuities", stats.discontinuities)).yellow()
        );
    }
    if config.app.debug_mode {
        println!("{}", stats.report());
    }

    Ok(())
}

/// Stream description gathered by `probe`
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeReport {
    pub sample_rate: u32,
    pub layout: ChannelLayout,
    pub time_base: String,
    pub declared_samples: Option<u64>,
    pub decoded_samples: u64,
    pub frames: u64,
}

impl ProbeReport {
    pub fn decoded_secs(&self) -> f64 {
        self.decoded_samples as f64 / self.sample_rate as f64
    }
}

/// Opens `input` and decodes it to the end
pub fn probe(input: &Path) -> Result<ProbeReport> {
    let mut decoder = AudioDecoder::open(input)
        .with_context(|| format!("Failed to open {}", input.display()))?;

    let mut report = ProbeReport {
        sample_rate: decoder.sample_rate(),
        layout: decoder.layout(),
        time_base: decoder.time_base().to_string(),
        declared_samples: decoder.total_samples(),
        decoded_samples: 0,
        frames: 0,
    };

    while let Some(frame) = decoder.next_frame()? {
        report.decoded_samples += frame.samples() as u64;
        report.frames += 1;
    }

    Ok(report)
}

pub fn run_probe(matches: &ArgMatches) -> Result<()> {
    let input = matches
        .get_one::<PathBuf>("input")
        .context("Input file is required")?;
    let report = probe(input)?;

    println!("\n{}", style(input.display()).bold().cyan());
    println!("{}", "=".repeat(60));
    println!("Sample rate: {} Hz", report.sample_rate);
    println!("Layout: {} ({} channels)", report.layout, report.layout.channels());
    println!("Time base: {}", report.time_base);
    if let Some(declared) = report.declared_samples {
        println!("Declared length: {} samples", declared);
    }
    println!(
        "Decoded: {} samples in {} frames ({})",
        report.decoded_samples,
        report.frames,
        format_duration(report.decoded_secs())
    );

    Ok(())
}

pub fn run_config(matches: &ArgMatches, manager: &ConfigManager) -> Result<()> {
    match matches.subcommand() {
        Some(("init", _)) => {
            if manager.initialize().context("Failed to write default config")? {
                println!(
                    "{} Created {}",
                    style("✓").green().bold(),
                    manager.config_path().display()
                );
            } else {
                println!("Config already exists at {}", manager.config_path().display());
            }
        }
        Some(("show", _)) => {
            let config = manager
                .load_with_env_overrides()
                .context("Failed to load config")?;
            let text = toml::to_string_pretty(&config).context("Failed to render config")?;
            print!("{}", text);
        }
        Some(("path", _)) => println!("{}", manager.config_path().display()),
        Some(("reset", _)) => {
            manager.reset().context("Failed to reset config")?;
            println!("{} Config reset to defaults", style("✓").green().bold());
        }
        _ => bail!("Unknown config command"),
    }

    Ok(())
}

fn format_duration(secs: f64) -> String {
    let millis = (secs * 1000.0).round() as u64;
    let minutes = millis / 60_000;
    let seconds = (millis % 60_000) as f64 / 1000.0;
    if minutes > 0 {
        format!("{}m {:06.3}s", minutes, seconds)
    } else {
        format!("{:.3}s", seconds)
    }
}

#[cfg(test)]
mod tests;
