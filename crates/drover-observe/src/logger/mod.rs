mod config;
mod error;
mod logger;
mod object;

pub use config::LoggerConfig;
pub use error::LoggerError;
pub use object::LoggerFormat;
pub use object::LoggerLevel;

/// Initializes the global tracing subscriber with the given configuration.
///
/// This function configures and installs a tracing subscriber based on the
/// provided [`LoggerConfig`]. Once initialized, all `tracing` macros
/// (`info!`, `debug!`, etc.) will use this configuration.
///
/// # Examples
/// ```rust
/// use drover_observe::{LoggerConfig, init_logger};
///
/// fn main() {
///     let config = LoggerConfig::default();
///     init_logger(&config).expect("Failed to initialize logger");
///
///     tracing::info!("Logger initialized successfully");
/// }
/// ```
pub fn init_logger(cfg: &LoggerConfig) -> Result<(), LoggerError> {
    match cfg.format {
        LoggerFormat::Text => logger::logger_text(cfg),
        LoggerFormat::Json => logger::logger_json(cfg),
        LoggerFormat::Journald => logger::logger_journald(cfg),
    }
}
