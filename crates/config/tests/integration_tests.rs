//! Integration tests for the configuration system

use pcmflow_config::{
    AppConfig, Config, ConfigManager, ConfigSection, LogLevel, ResampleConfig, CONFIG_VERSION,
};
use pcmflow_core::{ChannelLayout, ResampleQuality, SampleFormat};
use tempfile::TempDir;

fn setup_test_manager() -> Result<(TempDir, ConfigManager), Box<dyn std::error::Error>> {
    let temp_dir = TempDir::new()?;
    let manager = ConfigManager::with_directory(temp_dir.path().to_path_buf())?;
    Ok((temp_dir, manager))
}

#[test]
fn test_full_lifecycle() -> Result<(), Box<dyn std::error::Error>> {
    let (_temp_dir, manager) = setup_test_manager()?;

    assert!(manager.initialize()?);

    let config = manager.load()?;
    assert_eq!(config.version, CONFIG_VERSION);

    let mut modified = config.clone();
    modified.resample.sample_rate = 44_100;
    modified.resample.frame_size = 1024;
    modified.app.log_level = LogLevel::Info;
    manager.save(&modified)?;

    let reloaded = manager.load()?;
    assert_eq!(reloaded.resample.sample_rate, 44_100);
    assert_eq!(reloaded.resample.frame_samples(), Some(1024));
    assert_eq!(reloaded.app.log_level, LogLevel::Info);

    manager.reset()?;
    assert_eq!(manager.load()?, Config::default());

    Ok(())
}

#[test]
fn test_config_validation_integration() -> Result<(), Box<dyn std::error::Error>> {
    let (_temp_dir, manager) = setup_test_manager()?;

    manager.save(&Config::default())?;
    assert!(manager.validate()?.is_empty());

    let mut invalid = Config::default();
    invalid.resample.sample_rate = 100;
    assert!(manager.save(&invalid).is_err());

    // the rejected save left the file alone
    assert_eq!(manager.load()?, Config::default());

    Ok(())
}

#[test]
fn test_save_keeps_backup() -> Result<(), Box<dyn std::error::Error>> {
    let (_temp_dir, manager) = setup_test_manager()?;

    let config = Config::default();
    manager.save(&config)?;
    assert!(manager.config_path().exists());

    manager.save(&config)?;

    let backup_path = manager.config_path().with_extension("toml.backup");
    assert!(backup_path.exists());

    Ok(())
}

#[test]
fn test_merge_functionality() {
    let mut base = Config::default();
    let mut override_config = Config::default();

    override_config.resample.channel_layout = ChannelLayout::LAYOUT_5_1;
    override_config.resample.quality = ResampleQuality::Fast;
    override_config.app.debug_mode = true;

    base.merge(override_config);

    assert_eq!(base.resample.channel_layout, ChannelLayout::LAYOUT_5_1);
    assert_eq!(base.resample.quality, ResampleQuality::Fast);
    assert!(base.app.debug_mode);
}

#[test]
fn test_section_validation() {
    assert!(AppConfig::default().validate().is_ok());
    assert!(ResampleConfig::default().validate().is_ok());

    let resample = ResampleConfig {
        sample_rate: 2_000_000,
        ..Default::default()
    };
    let errors = resample.validate().expect_err("rate too high");
    assert_eq!(errors[0].field, "resample.sample_rate");
}

#[test]
fn test_hand_written_file() -> Result<(), Box<dyn std::error::Error>> {
    let (_temp_dir, manager) = setup_test_manager()?;

    std::fs::write(
        manager.config_path(),
        r#"
version = 1

[app]
log_level = "debug"

[resample]
sample_rate = 22050
sample_format = "s32p"
channel_layout = "mono"
frame_size = 480
quality = "accurate"
compensation = true
"#,
    )?;

    let config = manager.load()?;
    assert_eq!(config.app.log_level, LogLevel::Debug);
    assert_eq!(config.resample.sample_rate, 22_050);
    assert_eq!(config.resample.sample_format, SampleFormat::S32Planar);
    assert_eq!(config.resample.channel_layout, ChannelLayout::MONO);
    assert_eq!(config.resample.frame_samples(), Some(480));
    assert_eq!(config.resample.quality, ResampleQuality::Accurate);
    assert!(config.resample.compensation);

    Ok(())
}

#[test]
fn test_partial_file_fills_defaults() -> Result<(), Box<dyn std::error::Error>> {
    let (_temp_dir, manager) = setup_test_manager()?;

    std::fs::write(manager.config_path(), "[resample]\nframe_size = 960\n")?;

    let config = manager.load()?;
    assert_eq!(config.version, CONFIG_VERSION);
    assert_eq!(config.resample.frame_size, 960);
    assert_eq!(config.resample.sample_rate, 48_000);
    assert_eq!(config.app, AppConfig::default());

    Ok(())
}
