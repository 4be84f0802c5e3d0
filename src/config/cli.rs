use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum, ValueHint, builder::BoolishValueParser};

/// Command-line arguments for the DeepChat binary.
#[derive(Debug, Parser)]
#[command(name = "deepchat", version, about = "DeepChat demo server")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "DEEPCHAT_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run the DeepChat HTTP server.
    Serve(Box<ServeArgs>),
    /// Render text to HTML and print the result as JSON.
    Render(RenderArgs),
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ChatModeArg {
    Dummy,
    Proxy,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    /// Override the listener host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub server_host: Option<String>,

    /// Override the listener port.
    #[arg(long = "server-port", value_name = "PORT")]
    pub server_port: Option<u16>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,

    /// Override the uploads directory.
    #[arg(long = "uploads-directory", value_name = "PATH")]
    pub uploads_directory: Option<PathBuf>,

    /// Override the maximum request size for uploads in bytes.
    #[arg(long = "uploads-max-request-bytes", value_name = "BYTES")]
    pub uploads_max_request_bytes: Option<u64>,

    /// Where replies come from.
    #[arg(long = "chat-mode", value_name = "MODE", value_enum)]
    pub chat_mode: Option<ChatModeArg>,

    /// Override the delay between streamed reply characters.
    #[arg(long = "chat-drip-interval-ms", value_name = "MILLIS")]
    pub chat_drip_interval_ms: Option<u64>,

    /// Override the number of characters streamed per tick.
    #[arg(long = "chat-drip-chunk-chars", value_name = "COUNT")]
    pub chat_drip_chunk_chars: Option<u32>,

    /// Override the upstream streaming endpoint.
    #[arg(long = "upstream-url", value_name = "URL")]
    pub upstream_url: Option<String>,

    /// Override the model forwarded upstream.
    #[arg(long = "upstream-model", value_name = "MODEL")]
    pub upstream_model: Option<String>,

    /// Override the sampling temperature forwarded upstream.
    #[arg(long = "upstream-temperature", value_name = "FLOAT")]
    pub upstream_temperature: Option<f64>,

    /// Override the upstream connect timeout.
    #[arg(long = "upstream-connect-timeout-seconds", value_name = "SECONDS")]
    pub upstream_connect_timeout_seconds: Option<u64>,
}

#[derive(Debug, Args, Clone)]
pub struct RenderArgs {
    /// Use line-segmented JSON detection instead of whole-document mode.
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub segmented: bool,

    /// File to render; reads standard input when omitted.
    #[arg(value_name = "FILE", value_hint = ValueHint::FilePath)]
    pub file: Option<PathBuf>,
}
