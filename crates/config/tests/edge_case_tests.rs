//! Edge case and error scenario tests

use std::fs;
use pcmflow_config::resample_config::{MAX_FRAME_SIZE, MAX_SAMPLE_RATE, MIN_SAMPLE_RATE};
use pcmflow_config::{Config, ConfigError, ConfigManager};
use pcmflow_core::ChannelLayout;
use tempfile::TempDir;

fn setup_test_manager() -> Result<(TempDir, ConfigManager), Box<dyn std::error::Error>> {
    let temp_dir = TempDir::new()?;
    let manager = ConfigManager::with_directory(temp_dir.path().to_path_buf())?;
    Ok((temp_dir, manager))
}

#[test]
fn test_corrupted_config_uses_defaults() -> Result<(), Box<dyn std::error::Error>> {
    let (_temp_dir, manager) = setup_test_manager()?;

    fs::write(manager.config_path(), "this is not valid TOML {{{")?;

    assert!(manager.load().is_err());
    assert_eq!(manager.load_or_default(), Config::default());

    Ok(())
}

#[test]
fn test_save_creates_parent_directories() -> Result<(), Box<dyn std::error::Error>> {
    let temp_dir = TempDir::new()?;
    let nested_path = temp_dir.path().join("a").join("b").join("c");
    let manager = ConfigManager::with_directory(nested_path)?;

    manager.save(&Config::default())?;
    assert!(manager.config_path().exists());

    Ok(())
}

#[test]
fn test_concurrent_config_loads() -> Result<(), Box<dyn std::error::Error>> {
    let temp_dir = TempDir::new()?;
    let config_dir = temp_dir.path().to_path_buf();
    let manager = ConfigManager::with_directory(config_dir.clone())?;
    manager.initialize()?;

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let dir = config_dir.clone();
            std::thread::spawn(move || {
                let mgr = ConfigManager::with_directory(dir).expect("manager");
                for _ in 0..10 {
                    assert_eq!(mgr.load().expect("load"), Config::default());
                }
            })
        })
        .collect();

    for handle in handles {
        assert!(handle.join().is_ok());
    }

    Ok(())
}

#[test]
fn test_boundary_values_validation() {
    let mut config = Config::default();

    config.resample.sample_rate = MIN_SAMPLE_RATE;
    config.resample.frame_size = MAX_FRAME_SIZE;
    assert!(config.validate().is_ok());

    config.resample.sample_rate = MAX_SAMPLE_RATE;
    config.resample.frame_size = 0;
    assert!(config.validate().is_ok());

    config.resample.sample_rate = MIN_SAMPLE_RATE - 1;
    assert!(config.validate().is_err());

    config.resample.sample_rate = MAX_SAMPLE_RATE + 1;
    assert!(config.validate().is_err());
}

#[test]
fn test_all_validation_errors_collected() {
    let mut config = Config::default();
    config.resample.sample_rate = 0;
    config.resample.frame_size = MAX_FRAME_SIZE * 2;

    let errors = config.validate().expect_err("two bad fields");
    let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
    assert_eq!(fields, ["resample.sample_rate", "resample.frame_size"]);
}

#[test]
fn test_rapid_saves() -> Result<(), Box<dyn std::error::Error>> {
    let (_temp_dir, manager) = setup_test_manager()?;
    let mut config = Config::default();

    for i in 0..100 {
        config.resample.frame_size = i * 10;
        manager.save(&config)?;
    }

    assert_eq!(manager.load()?.resample.frame_size, 990);

    Ok(())
}

#[test]
fn test_merge_with_defaults() {
    let mut base = Config::default();
    base.resample.sample_rate = 96_000;

    base.merge(Config::default());

    assert_eq!(base.resample.sample_rate, 48_000);
}

#[test]
fn test_config_file_deleted_during_operation() -> Result<(), Box<dyn std::error::Error>> {
    let (_temp_dir, manager) = setup_test_manager()?;
    manager.initialize()?;

    fs::remove_file(manager.config_path())?;

    assert_eq!(manager.load()?, Config::default());

    Ok(())
}

#[test]
fn test_empty_config_file() -> Result<(), Box<dyn std::error::Error>> {
    let (_temp_dir, manager) = setup_test_manager()?;

    fs::write(manager.config_path(), "")?;

    assert!(matches!(manager.load(), Err(ConfigError::ReadError { .. })));
    assert_eq!(manager.load_or_default(), Config::default());

    Ok(())
}

#[test]
fn test_unknown_sample_format_rejected() -> Result<(), Box<dyn std::error::Error>> {
    let (_temp_dir, manager) = setup_test_manager()?;

    fs::write(manager.config_path(), "[resample]\nsample_format = \"s24\"\n")?;

    assert!(matches!(manager.load(), Err(ConfigError::ParseError { .. })));

    Ok(())
}

#[test]
fn test_hex_channel_layout() -> Result<(), Box<dyn std::error::Error>> {
    let (_temp_dir, manager) = setup_test_manager()?;

    fs::write(manager.config_path(), "[resample]\nchannel_layout = \"0x60f\"\n")?;

    let config = manager.load()?;
    assert_eq!(config.resample.channel_layout, ChannelLayout::LAYOUT_5_1);

    Ok(())
}

#[test]
fn test_newer_version_still_loads() -> Result<(), Box<dyn std::error::Error>> {
    let (_temp_dir, manager) = setup_test_manager()?;

    fs::write(manager.config_path(), "version = 99\n")?;

    let config = manager.load()?;
    assert_eq!(config.version, 99);
    assert_eq!(config.resample, Config::default().resample);

    Ok(())
}

#[test]
fn test_update_with_invalid_value() -> Result<(), Box<dyn std::error::Error>> {
    let (_temp_dir, manager) = setup_test_manager()?;
    manager.initialize()?;

    let result = manager.update(|config| {
        config.resample.sample_rate = 10;
    });
    assert!(result.is_err());

    assert_eq!(manager.load()?.resample.sample_rate, 48_000);

    Ok(())
}

#[test]
fn test_backup_preserved_on_failed_save() -> Result<(), Box<dyn std::error::Error>> {
    let (_temp_dir, manager) = setup_test_manager()?;

    let mut config = Config::default();
    config.resample.sample_rate = 32_000;
    manager.save(&config)?;
    config.resample.sample_rate = 16_000;
    manager.save(&config)?;

    config.resample.sample_rate = 0;
    assert!(manager.save(&config).is_err());

    let backup_path = manager.config_path().with_extension("toml.backup");
    let backup_config: Config = toml::from_str(&fs::read_to_string(&backup_path)?)?;
    assert_eq!(backup_config.resample.sample_rate, 32_000);
    assert_eq!(manager.load()?.resample.sample_rate, 16_000);

    Ok(())
}
