//! Layered configuration: file, environment, explicit overrides.

use serial_test::serial;
use std::io::Write;
use tempfile::NamedTempFile;
use vadd_common::{ConfigBuilder, ConfigError, DeviceClass, VaddConfig};

const ENV_KEYS: &[&str] = &["VADD_DEVICE", "VADD_LENGTH", "VADD_SEED", "VADD_TOLERANCE", "VADD_LOG_LEVEL"];

fn clear_env() {
    for key in ENV_KEYS {
        std::env::remove_var(key);
    }
}

fn config_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
#[serial]
fn file_values_are_loaded() {
    clear_env();
    let file = config_file(
        r#"
device = "cpu"
length = 64
tolerance = 0.01
build_options = "-cl-fast-relaxed-math"

[logging]
level = "debug"
format = "json"
"#,
    );
    let cfg = ConfigBuilder::from_file(file.path()).unwrap().build().unwrap();
    assert_eq!(cfg.device, DeviceClass::Cpu);
    assert_eq!(cfg.length, 64);
    assert_eq!(cfg.tolerance, 0.01);
    assert_eq!(cfg.build_options, "-cl-fast-relaxed-math");
    assert_eq!(cfg.logging.format, "json");
}

#[test]
#[serial]
fn env_beats_file() {
    clear_env();
    let file = config_file("length = 64\nseed = 5\n");
    std::env::set_var("VADD_LENGTH", "128");
    let cfg = ConfigBuilder::from_file(file.path()).unwrap().build().unwrap();
    clear_env();
    assert_eq!(cfg.length, 128);
    assert_eq!(cfg.seed, 5);
}

#[test]
#[serial]
fn flags_beat_env() {
    clear_env();
    std::env::set_var("VADD_DEVICE", "gpu");
    let cfg = ConfigBuilder::new().device(Some(DeviceClass::Cpu)).build().unwrap();
    clear_env();
    assert_eq!(cfg.device, DeviceClass::Cpu);
}

#[test]
#[serial]
fn bad_env_device_is_reported() {
    clear_env();
    std::env::set_var("VADD_DEVICE", "fpga");
    let err = ConfigBuilder::new().build().unwrap_err();
    clear_env();
    assert!(matches!(err, ConfigError::Invalid { key: "VADD_DEVICE", .. }));
    assert!(err.to_string().contains("fpga"));
}

#[test]
#[serial]
fn without_env_ignores_environment() {
    clear_env();
    std::env::set_var("VADD_LENGTH", "3");
    let cfg = ConfigBuilder::new().without_env().build().unwrap();
    clear_env();
    assert_eq!(cfg.length, VaddConfig::default().length);
}

#[test]
fn missing_file_is_a_read_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = ConfigBuilder::from_file(&dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, ConfigError::Read { .. }));
}

#[test]
fn explicit_path_is_required_to_exist() {
    let dir = tempfile::tempdir().unwrap();
    assert!(ConfigBuilder::discover(Some(&dir.path().join("nope.toml"))).is_err());
}

#[test]
fn unknown_device_in_file_is_a_parse_error() {
    let file = config_file("device = \"fpga\"\n");
    assert!(matches!(VaddConfig::from_file(file.path()), Err(ConfigError::Parse { .. })));
}

#[test]
fn config_serializes_back_to_toml() {
    let cfg = VaddConfig::default();
    let text = toml::to_string(&cfg).unwrap();
    let back = VaddConfig::from_toml_str(&text, std::path::Path::new("roundtrip.toml")).unwrap();
    assert_eq!(cfg, back);
}
