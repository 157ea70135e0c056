use corotrace_runtime::{EngineConfig, FramePolicy};
use log::{error, LevelFilter};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("unknown log level '{0}' in agent arguments")]
    UnknownLogLevel(String),
    #[error("unknown frame policy '{0}', expected stack or coalesce")]
    UnknownFramePolicy(String),
    #[error("unknown dump format '{0}', expected none, text or json")]
    UnknownDumpFormat(String),
    #[error("unknown agent argument '{0}'")]
    UnknownKey(String),
    #[error("agent argument '{0}' has no value")]
    MissingValue(String),
}

/// How stacks are written to the log on every change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DumpFormat {
    None,
    Text,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentConfig {
    pub log_level: LevelFilter,
    pub engine: EngineConfig,
    pub dump: DumpFormat,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            log_level: LevelFilter::Info,
            engine: EngineConfig::default(),
            dump: DumpFormat::Text,
        }
    }
}

impl AgentConfig {
    /// Parses `key=value,key=value` agent arguments. Bad entries are reported and skipped,
    /// leaving the default for that setting.
    pub fn parse(args: Option<&str>) -> Self {
        let (config, errors) = Self::parse_checked(args);
        for e in errors {
            error!("{}", e);
        }
        config
    }

    pub fn parse_checked(args: Option<&str>) -> (Self, Vec<ConfigError>) {
        let mut config = Self::default();
        let mut errors = Vec::new();

        let args = match args {
            Some(a) => a,
            None => return (config, errors),
        };

        for arg in args.split(',').map(str::trim).filter(|a| !a.is_empty()) {
            let (key, value) = match arg.split_once('=') {
                Some((k, v)) => (k.trim().to_lowercase(), v.trim()),
                None => {
                    errors.push(ConfigError::MissingValue(arg.to_owned()));
                    continue
                },
            };
            let applied = match key.as_str() {
                "loglevel" => parse_level(value).map(|l| config.log_level = l),
                "frames" => parse_policy(value).map(|p| config.engine.frame_policy = p),
                "dump" => parse_dump(value).map(|d| config.dump = d),
                _ => Err(ConfigError::UnknownKey(key.clone())),
            };
            if let Err(e) = applied {
                errors.push(e);
            }
        }

        (config, errors)
    }
}

fn parse_level(value: &str) -> Result<LevelFilter, ConfigError> {
    value
        .parse()
        .map_err(|_| ConfigError::UnknownLogLevel(value.to_owned()))
}

fn parse_policy(value: &str) -> Result<FramePolicy, ConfigError> {
    match value.to_lowercase().as_str() {
        "stack" => Ok(FramePolicy::Stack),
        "coalesce" => Ok(FramePolicy::Coalesce),
        _ => Err(ConfigError::UnknownFramePolicy(value.to_owned())),
    }
}

fn parse_dump(value: &str) -> Result<DumpFormat, ConfigError> {
    match value.to_lowercase().as_str() {
        "none" => Ok(DumpFormat::None),
        "text" => Ok(DumpFormat::Text),
        "json" => Ok(DumpFormat::Json),
        _ => Err(ConfigError::UnknownDumpFormat(value.to_owned())),
    }
}
