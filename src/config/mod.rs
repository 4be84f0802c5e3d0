//! Configuration layer: typed settings with layered precedence (file → env → CLI).

mod cli;

use std::{
    net::SocketAddr,
    num::{NonZeroU32, NonZeroU64},
    path::PathBuf,
    str::FromStr,
    time::Duration,
};

use clap::Parser;
use config::{Config, Environment, File};
use reqwest::Url;
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;

pub use cli::{ChatModeArg, CliArgs, Command, RenderArgs, ServeArgs, ServeOverrides};

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "deepchat";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_UPLOAD_DIR: &str = "uploads";
const DEFAULT_UPLOAD_REQUEST_LIMIT_BYTES: u64 = 10 * 1024 * 1024;
const DEFAULT_DRIP_INTERVAL_MS: u64 = 5;
const DEFAULT_DRIP_CHUNK_CHARS: u32 = 1;
const DEFAULT_UPSTREAM_URL: &str = "http://127.0.0.1:8000/chat/stream";
const DEFAULT_UPSTREAM_MODEL: &str = "gpt-3.5-turbo";
const DEFAULT_UPSTREAM_TEMPERATURE: f64 = 0.7;
const DEFAULT_UPSTREAM_CONNECT_TIMEOUT_SECS: u64 = 10;
const MAX_UPSTREAM_TEMPERATURE: f64 = 2.0;

/// Fully-resolved deployment settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub uploads: UploadSettings,
    pub chat: ChatSettings,
    pub upstream: UpstreamSettings,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub addr: SocketAddr,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct UploadSettings {
    pub directory: PathBuf,
    pub max_request_bytes: NonZeroU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatMode {
    Dummy,
    Proxy,
}

#[derive(Debug, Clone)]
pub struct ChatSettings {
    pub mode: ChatMode,
    pub drip_interval: Duration,
    pub drip_chunk_chars: NonZeroU32,
}

#[derive(Debug, Clone)]
pub struct UpstreamSettings {
    pub url: Url,
    pub model: String,
    pub temperature: f64,
    pub connect_timeout: Duration,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix("DEEPCHAT").separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    match cli.command.as_ref() {
        Some(Command::Serve(args)) => raw.apply_serve_overrides(&args.overrides),
        Some(Command::Render(_)) => {}
        None => raw.apply_serve_overrides(&ServeOverrides::default()),
    }

    Settings::from_raw(raw)
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    server: RawServerSettings,
    logging: RawLoggingSettings,
    uploads: RawUploadSettings,
    chat: RawChatSettings,
    upstream: RawUpstreamSettings,
}

impl RawSettings {
    fn apply_serve_overrides(&mut self, overrides: &ServeOverrides) {
        if let Some(host) = overrides.server_host.as_ref() {
            self.server.host = Some(host.clone());
        }
        if let Some(port) = overrides.server_port {
            self.server.port = Some(port);
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(directory) = overrides.uploads_directory.as_ref() {
            self.uploads.directory = Some(directory.clone());
        }
        if let Some(limit) = overrides.uploads_max_request_bytes {
            self.uploads.max_request_bytes = Some(limit);
        }
        if let Some(mode) = overrides.chat_mode {
            self.chat.mode = Some(
                match mode {
                    ChatModeArg::Dummy => "dummy",
                    ChatModeArg::Proxy => "proxy",
                }
                .to_string(),
            );
        }
        if let Some(interval) = overrides.chat_drip_interval_ms {
            self.chat.drip_interval_ms = Some(interval);
        }
        if let Some(chars) = overrides.chat_drip_chunk_chars {
            self.chat.drip_chunk_chars = Some(chars);
        }
        if let Some(url) = overrides.upstream_url.as_ref() {
            self.upstream.url = Some(url.clone());
        }
        if let Some(model) = overrides.upstream_model.as_ref() {
            self.upstream.model = Some(model.clone());
        }
        if let Some(temperature) = overrides.upstream_temperature {
            self.upstream.temperature = Some(temperature);
        }
        if let Some(timeout) = overrides.upstream_connect_timeout_seconds {
            self.upstream.connect_timeout_seconds = Some(timeout);
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            server,
            logging,
            uploads,
            chat,
            upstream,
        } = raw;

        Ok(Self {
            server: build_server_settings(server)?,
            logging: build_logging_settings(logging)?,
            uploads: build_upload_settings(uploads)?,
            chat: build_chat_settings(chat)?,
            upstream: build_upstream_settings(upstream)?,
        })
    }
}

fn build_server_settings(server: RawServerSettings) -> Result<ServerSettings, LoadError> {
    let host = server.host.unwrap_or_else(|| DEFAULT_HOST.to_string());

    let port = server.port.unwrap_or(DEFAULT_PORT);
    if port == 0 {
        return Err(LoadError::invalid(
            "server.port",
            "port must be greater than zero",
        ));
    }

    let addr = parse_socket_addr(&host, port)
        .map_err(|reason| LoadError::invalid("server.addr", reason))?;

    Ok(ServerSettings { addr })
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_upload_settings(uploads: RawUploadSettings) -> Result<UploadSettings, LoadError> {
    let directory = uploads
        .directory
        .unwrap_or_else(|| PathBuf::from(DEFAULT_UPLOAD_DIR));
    if directory.as_os_str().is_empty() {
        return Err(LoadError::invalid(
            "uploads.directory",
            "path must not be empty",
        ));
    }

    let max_request_bytes_value = uploads
        .max_request_bytes
        .unwrap_or(DEFAULT_UPLOAD_REQUEST_LIMIT_BYTES);
    let max_request_bytes = NonZeroU64::new(max_request_bytes_value).ok_or_else(|| {
        LoadError::invalid("uploads.max_request_bytes", "must be greater than zero")
    })?;
    usize::try_from(max_request_bytes_value).map_err(|_| {
        LoadError::invalid(
            "uploads.max_request_bytes",
            "value exceeds supported range for usize",
        )
    })?;

    Ok(UploadSettings {
        directory,
        max_request_bytes,
    })
}

fn build_chat_settings(chat: RawChatSettings) -> Result<ChatSettings, LoadError> {
    let mode = match chat.mode.as_deref().map(str::trim) {
        None | Some("dummy") => ChatMode::Dummy,
        Some("proxy") => ChatMode::Proxy,
        Some(other) => {
            return Err(LoadError::invalid(
                "chat.mode",
                format!("expected `dummy` or `proxy`, got `{other}`"),
            ));
        }
    };

    let drip_interval =
        Duration::from_millis(chat.drip_interval_ms.unwrap_or(DEFAULT_DRIP_INTERVAL_MS));
    let drip_chunk_chars = non_zero_u32(
        chat.drip_chunk_chars
            .unwrap_or(DEFAULT_DRIP_CHUNK_CHARS)
            .into(),
        "chat.drip_chunk_chars",
    )?;

    Ok(ChatSettings {
        mode,
        drip_interval,
        drip_chunk_chars,
    })
}

fn build_upstream_settings(upstream: RawUpstreamSettings) -> Result<UpstreamSettings, LoadError> {
    let url_value = upstream
        .url
        .unwrap_or_else(|| DEFAULT_UPSTREAM_URL.to_string());
    let url = Url::parse(url_value.trim())
        .map_err(|err| LoadError::invalid("upstream.url", format!("invalid url: {err}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(LoadError::invalid(
            "upstream.url",
            "scheme must be http or https",
        ));
    }

    let model = upstream
        .model
        .map(|value| value.trim().to_string())
        .unwrap_or_else(|| DEFAULT_UPSTREAM_MODEL.to_string());
    if model.is_empty() {
        return Err(LoadError::invalid("upstream.model", "must not be empty"));
    }

    let temperature = upstream
        .temperature
        .unwrap_or(DEFAULT_UPSTREAM_TEMPERATURE);
    if !(0.0..=MAX_UPSTREAM_TEMPERATURE).contains(&temperature) {
        return Err(LoadError::invalid(
            "upstream.temperature",
            format!("must be between 0 and {MAX_UPSTREAM_TEMPERATURE}"),
        ));
    }

    let connect_timeout_secs = upstream
        .connect_timeout_seconds
        .unwrap_or(DEFAULT_UPSTREAM_CONNECT_TIMEOUT_SECS);
    if connect_timeout_secs == 0 {
        return Err(LoadError::invalid(
            "upstream.connect_timeout_seconds",
            "must be greater than zero",
        ));
    }

    Ok(UpstreamSettings {
        url,
        model,
        temperature,
        connect_timeout: Duration::from_secs(connect_timeout_secs),
    })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawServerSettings {
    host: Option<String>,
    port: Option<u16>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawUploadSettings {
    directory: Option<PathBuf>,
    max_request_bytes: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawChatSettings {
    mode: Option<String>,
    drip_interval_ms: Option<u64>,
    drip_chunk_chars: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawUpstreamSettings {
    url: Option<String>,
    model: Option<String>,
    temperature: Option<f64>,
    connect_timeout_seconds: Option<u64>,
}

fn parse_socket_addr(host: &str, port: u16) -> Result<SocketAddr, String> {
    let candidate = format!("{host}:{port}");
    candidate
        .parse()
        .map_err(|err| format!("invalid address `{candidate}`: {err}"))
}

fn non_zero_u32(value: u64, key: &'static str) -> Result<NonZeroU32, LoadError> {
    if value == 0 {
        return Err(LoadError::invalid(key, "must be greater than zero"));
    }
    let value_u32: u32 = value
        .try_into()
        .map_err(|_| LoadError::invalid(key, "value exceeds supported range for u32"))?;
    NonZeroU32::new(value_u32).ok_or_else(|| LoadError::invalid(key, "must be greater than zero"))
}

#[cfg(test)]
mod tests;
