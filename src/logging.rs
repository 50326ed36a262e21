use env_logger::{Builder, Target};
use log::LevelFilter;
use std::io::Write;

/// Initialises the global logger.
///
/// `level` comes from the configuration file; `RUST_LOG`, when set, takes
/// precedence. Calling this more than once is harmless, later calls are ignored.
pub fn init_logging(level: &str) {
    let log_level = level.parse::<LevelFilter>().unwrap_or(LevelFilter::Info);

    let result = Builder::new()
        .filter_level(log_level)
        .parse_env("RUST_LOG")
        .target(Target::Stderr)
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {:5} {}] {}",
                buf.timestamp_millis(),
                record.level(),
                record.target(),
                record.args()
            )
        })
        .try_init();

    if result.is_ok() {
        log::debug!("Logging initialised (level: {})", log_level);
    }
}
