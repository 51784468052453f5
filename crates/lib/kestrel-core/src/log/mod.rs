use std::path::PathBuf;

use fern::colors::{Color, ColoredLevelConfig};

pub use log::LevelFilter as LevelFilter;

/// Log configuration.
#[derive(Clone)]
pub struct LogConfig {
    pub level: LevelFilter,
    /// Mirror everything into this file on top of the console output.
    pub file_path: Option<PathBuf>,
}

impl LogConfig {
    pub fn console_only(level: LevelFilter) -> Self {
        Self {
            level,
            file_path: None,
        }
    }

    pub fn with_file(level: LevelFilter, file_path: impl Into<PathBuf>) -> Self {
        Self {
            level,
            file_path: Some(file_path.into()),
        }
    }
}

/// Initialize the log module. May only be called once per process.
pub fn init_log(config: LogConfig) -> anyhow::Result<()> {
    let colors = ColoredLevelConfig::new()
        .trace(Color::BrightBlack)
        .debug(Color::Blue)
        .info(Color::Green)
        .warn(Color::Yellow)
        .error(Color::Red);

    let console_output = fern::Dispatch::new()
        .format(move |out, message, record| {
            out.finish(format_args!(
                "{} {:>5} [{}] {}",
                chrono::Local::now().format("%H:%M:%S%.3f"),
                colors.color(record.level()),
                record.target(),
                message
            ))
        })
        .chain(std::io::stdout());

    let mut dispatch = fern::Dispatch::new()
        .level(config.level) // base log level from the host
        .chain(console_output);

    if let Some(file_path) = &config.file_path {
        let file_output = fern::Dispatch::new()
            .format(|out, message, record| {
                out.finish(format_args!(
                    "{} {:>5} [{}] {}",
                    chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
                    record.level(),
                    record.target(),
                    message
                ))
            })
            .chain(fern::log_file(file_path)?);

        dispatch = dispatch.chain(file_output);
    }

    dispatch.apply()?;

    debug!("log initialized!");
    Ok(())
}
