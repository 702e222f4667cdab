//! 日志初始化集成测试

use wiring::logging::{init_logging, LogFormat, LoggingConfig};
use wiring::{Bundle, Container, Registration, Resolver};

#[test]
fn test_subscriber_installs_once_and_receives_resolution_events() {
    let config = LoggingConfig {
        format: LogFormat::Compact,
        ..LoggingConfig::testing()
    };
    assert!(init_logging(config).is_ok());

    let container = Container::new();
    container.register(
        "answer",
        &Registration::singleton(Resolver::factory(|_: &Bundle| Ok(42_u32))),
    );
    assert_eq!(*container.get::<u32>("answer").unwrap().unwrap(), 42);

    assert!(init_logging(LoggingConfig::production()).is_err());
}
