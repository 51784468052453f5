use std::path::PathBuf;

use structopt::StructOpt;

/// Command line switches shared by every kestrel host application.
#[derive(Debug, StructOpt)]
#[structopt(name = "kestrel", about = "Kestrel rendering core host.")]
pub struct ConsoleVars {
    /// Log verbosity: off, error, warn, info, debug or trace.
    #[structopt(short, long, default_value = "info", parse(try_from_str = parse_level))]
    pub level: log::LevelFilter,

    /// Settings file to load instead of the one next to the executable.
    #[structopt(long)]
    pub settings: Option<PathBuf>,
}

/// Collect console configuration into a struct.
pub fn from_args() -> ConsoleVars {
    ConsoleVars::from_args()
}

fn parse_level(value: &str) -> Result<log::LevelFilter, String> {
    match value.trim().to_lowercase().as_str() {
        "off" => Ok(log::LevelFilter::Off),
        "error" => Ok(log::LevelFilter::Error),
        "warn" => Ok(log::LevelFilter::Warn),
        "info" => Ok(log::LevelFilter::Info),
        "debug" => Ok(log::LevelFilter::Debug),
        "trace" => Ok(log::LevelFilter::Trace),
        other => Err(format!("unknown log level {:?}", other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_parsing() {
        assert_eq!(parse_level("Info").unwrap(), log::LevelFilter::Info);
        assert_eq!(parse_level(" trace ").unwrap(), log::LevelFilter::Trace);
        assert_eq!(parse_level("off").unwrap(), log::LevelFilter::Off);
        assert!(parse_level("loud").is_err());
    }
}
