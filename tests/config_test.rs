//! 配置文件策略测试

use std::fs;
use tempfile::TempDir;
use wiring::{
    Bundle, ConfigError, Context, Error, Lifecycle, Module, ModuleRegistrationOptions,
    ResolutionOptions, Strategy, Visibility, WiringConfig,
};

const CONFIG: &str = r#"
[defaults]
lifecycle = "transient"

[registrations.session]
lifecycle = "scoped"

[registrations.secret]
visibility = "private"

[registrations.report]
resolution = "lazy"
"#;

fn write_config(dir: &TempDir, content: &str) -> std::path::PathBuf {
    let path = dir.path().join("wiring.toml");
    fs::write(&path, content).unwrap();
    path
}

#[test]
fn test_load_from_file() {
    let dir = TempDir::new().unwrap();
    let config = WiringConfig::load(write_config(&dir, CONFIG)).unwrap();

    assert_eq!(config.registrations.len(), 3);
    assert_eq!(config.policy_for("session").unwrap().lifecycle, Lifecycle::Scoped);
    assert_eq!(config.policy_for("report").unwrap().strategy, Strategy::Lazy);
    assert_eq!(config.policy_for("secret").unwrap().visibility, Visibility::Private);
    assert_eq!(config.policy_for("other").unwrap().lifecycle, Lifecycle::Transient);
}

#[test]
fn test_missing_file() {
    let dir = TempDir::new().unwrap();
    let err = WiringConfig::load(dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, Error::Config(ConfigError::FileRead(..))));
}

#[test]
fn test_unknown_field_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "[defaults]\nlifetime = \"scoped\"\n");
    let err = WiringConfig::load(path).unwrap_err();
    assert!(matches!(err, Error::Config(ConfigError::TomlParse(_))));
}

#[test]
fn test_module_applies_configured_policies() {
    let dir = TempDir::new().unwrap();
    let config = WiringConfig::load(write_config(&dir, CONFIG)).unwrap();
    let mut module = Module::with_config("configured", config);

    module
        .register_factory("counter", |_: &Bundle| Ok(String::from("counter")))
        .unwrap();
    module
        .register_factory("session", |_: &Bundle| Ok(String::from("session")))
        .unwrap();
    module
        .register_factory("secret", |_: &Bundle| Ok(42_u32))
        .unwrap();
    module
        .register_factory("report", |bundle: &Bundle| {
            Ok(format!("report {}", bundle.resolve::<u32>("secret")?))
        })
        .unwrap();

    let first = module.resolve("counter", ResolutionOptions::default()).unwrap();
    let second = module.resolve("counter", ResolutionOptions::default()).unwrap();
    assert!(!first.ptr_eq(&second));

    let scope = Context::new();
    let a = module
        .resolve("session", ResolutionOptions::in_context(&scope))
        .unwrap();
    let b = module
        .resolve("session", ResolutionOptions::in_context(&scope))
        .unwrap();
    assert!(a.ptr_eq(&b));

    assert!(matches!(
        module.resolve("secret", ResolutionOptions::default()),
        Err(Error::NotExposed(_))
    ));

    let report = module.resolve("report", ResolutionOptions::default()).unwrap();
    assert!(report.is_stand_in());
    assert_eq!(*module.get::<String>("report").unwrap(), "report 42");
}

#[test]
fn test_explicit_options_override_configuration() {
    let config = WiringConfig::from_toml_str(CONFIG).unwrap();
    let mut module = Module::with_config("configured", config);

    module
        .register(
            "secret",
            ModuleRegistrationOptions::new()
                .factory(|_: &Bundle| Ok(1_u8))
                .visibility(Visibility::Public)
                .lifecycle(Lifecycle::Singleton),
        )
        .unwrap();

    let first = module.resolve("secret", ResolutionOptions::default()).unwrap();
    let second = module.resolve("secret", ResolutionOptions::default()).unwrap();
    assert!(first.ptr_eq(&second));
}

#[test]
fn test_invalid_policy_in_file() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "[registrations.db]\nvisibility = \"internal\"\n");
    let err = WiringConfig::load(path).unwrap_err();
    assert!(matches!(err, Error::InvalidVisibility(ref value) if value == "internal"));
}
