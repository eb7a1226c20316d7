use super::*;
use pcmflow_core::AudioFrame;
use tempfile::TempDir;

fn write_tone(path: &Path, rate: u32, samples: usize, chunk: usize) {
    let mut writer =
        WavWriter::create(path, ChannelLayout::STEREO, SampleFormat::S16, rate).unwrap();

    let mut start = 0;
    while start < samples {
        let len = chunk.min(samples - start);
        let mut frame =
            AudioFrame::alloc(ChannelLayout::STEREO, SampleFormat::S16, rate, len).unwrap();
        let tone: Vec<f32> = (start..start + len)
            .map(|i| 0.25 * (i as f32 * 440.0 * std::f32::consts::TAU / rate as f32).sin())
            .collect();
        frame.write_f32(0, 0, &tone).unwrap();
        frame.write_f32(1, 0, &tone).unwrap();
        writer.write_frame(&frame).unwrap();
        start += len;
    }

    writer.finish().unwrap();
}

fn convert_matches(args: &[&str]) -> ArgMatches {
    let mut argv = vec!["pcmflow", "convert"];
    argv.extend_from_slice(args);
    let matches = crate::build_cli().try_get_matches_from(argv).unwrap();
    matches.subcommand_matches("convert").unwrap().clone()
}

#[test]
fn test_flags_override_config_defaults() {
    let defaults = ResampleConfig::default();
    let matches = convert_matches(&[
        "in.wav", "out.wav", "-r", "22050", "-f", "fltp", "-l", "5.1", "-q", "fast",
        "--compensate",
    ]);

    let options = ConvertOptions::from_matches(&matches, &defaults).unwrap();
    assert_eq!(options.input, PathBuf::from("in.wav"));
    assert_eq!(options.output, PathBuf::from("out.wav"));
    assert_eq!(options.target.sample_rate, 22_050);
    assert_eq!(options.target.sample_format, SampleFormat::F32Planar);
    assert_eq!(options.target.channel_layout, ChannelLayout::LAYOUT_5_1);
    assert_eq!(options.target.quality, ResampleQuality::Fast);
    assert!(options.target.compensation);
    assert_eq!(options.target.frame_size, defaults.frame_size);
}

#[test]
fn test_missing_flags_keep_config_values() {
    let defaults = ResampleConfig {
        sample_rate: 32_000,
        frame_size: 512,
        ..Default::default()
    };
    let matches = convert_matches(&["in.wav", "out.wav"]);

    let options = ConvertOptions::from_matches(&matches, &defaults).unwrap();
    assert_eq!(options.target, defaults);
}

#[test]
fn test_bad_format_reported() {
    let matches = convert_matches(&["in.wav", "out.wav", "--format", "s24"]);
    let err = ConvertOptions::from_matches(&matches, &ResampleConfig::default()).unwrap_err();
    assert!(err.to_string().contains("--format"));
}

#[test]
fn test_convert_resamples_and_remixes() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("tone.wav");
    let output = dir.path().join("out.wav");
    write_tone(&input, 44_100, 4_410, 441);

    let options = ConvertOptions {
        input: input.clone(),
        output: output.clone(),
        target: ResampleConfig {
            sample_rate: 48_000,
            sample_format: SampleFormat::S16,
            channel_layout: ChannelLayout::MONO,
            frame_size: 960,
            ..Default::default()
        },
    };

    let stats = convert(&options).unwrap();
    assert_eq!(stats.samples_in, 4_410);
    assert_eq!(stats.samples_out, 4_800);
    assert_eq!(stats.frames_pulled, 5);
    assert_eq!(stats.discontinuities, 0);

    let report = probe(&output).unwrap();
    assert_eq!(report.sample_rate, 48_000);
    assert_eq!(report.layout, ChannelLayout::MONO);
    assert_eq!(report.decoded_samples, 4_800);
}

#[test]
fn test_convert_missing_input() {
    let dir = TempDir::new().unwrap();
    let options = ConvertOptions {
        input: dir.path().join("missing.wav"),
        output: dir.path().join("out.wav"),
        target: ResampleConfig::default(),
    };

    let err = convert(&options).unwrap_err();
    assert!(err.to_string().contains("missing.wav"));
    assert!(!options.output.exists());
}

#[test]
fn test_probe_reports_stream() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("tone.wav");
    write_tone(&input, 22_050, 11_025, 1_000);

    let report = probe(&input).unwrap();
    assert_eq!(report.sample_rate, 22_050);
    assert_eq!(report.layout, ChannelLayout::STEREO);
    assert_eq!(report.time_base, "1/22050");
    assert_eq!(report.decoded_samples, 11_025);
    assert!((report.decoded_secs() - 0.5).abs() < 1e-9);
}

#[test]
fn test_config_commands() {
    let dir = TempDir::new().unwrap();
    let manager = ConfigManager::with_directory(dir.path().to_path_buf()).unwrap();
    let config_matches = |name: &str| {
        let matches = crate::build_cli()
            .try_get_matches_from(["pcmflow", "config", name])
            .unwrap();
        matches.subcommand_matches("config").unwrap().clone()
    };

    run_config(&config_matches("init"), &manager).unwrap();
    assert!(manager.config_path().exists());

    manager
        .update(|config| config.resample.sample_rate = 96_000)
        .unwrap();
    run_config(&config_matches("path"), &manager).unwrap();
    run_config(&config_matches("reset"), &manager).unwrap();
    assert_eq!(manager.load().unwrap(), Config::default());
}

#[test]
fn test_format_duration() {
    assert_eq!(format_duration(0.5), "0.500s");
    assert_eq!(format_duration(61.25), "1m 01.250s");
    assert_eq!(format_duration(3600.0), "60m 00.000s");
}
