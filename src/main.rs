use std::{path::Path, process, sync::Arc};

use deepchat::{
    application::{
        chat::{CannedPool, ChatService, Pacing, ReplyMode, UpstreamClient, UpstreamDefaults},
        error::AppError,
        render::{RenderMode, RenderService, render_service},
    },
    config,
    infra::{
        error::InfraError,
        http::{self, HttpState},
        telemetry,
        uploads::UploadStorage,
        upstream::HttpUpstreamClient,
    },
};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    signal,
};
use tracing::{Dispatch, Level, dispatcher, error, info};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt()
        .with_max_level(Level::ERROR)
        .with_writer(std::io::stderr)
        .finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::Render(args) => run_render(args).await,
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let state = build_http_state(&settings)?;
    let router = http::build_router(state);

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;

    info!(
        target = "deepchat::serve",
        addr = %settings.server.addr,
        mode = ?settings.chat.mode,
        uploads = %settings.uploads.directory.display(),
        "DeepChat listening"
    );

    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| AppError::unexpected(format!("server error: {err}")))?;

    info!(target = "deepchat::serve", "DeepChat stopped");
    Ok(())
}

fn build_http_state(settings: &config::Settings) -> Result<HttpState, AppError> {
    let uploads = UploadStorage::new(settings.uploads.directory.clone())
        .map_err(|err| AppError::from(InfraError::from(err)))?;

    let upstream = HttpUpstreamClient::new(
        settings.upstream.url.clone(),
        settings.upstream.connect_timeout,
    )?;
    let upstream: Arc<dyn UpstreamClient> = Arc::new(upstream);

    let mode = match settings.chat.mode {
        config::ChatMode::Dummy => ReplyMode::Dummy,
        config::ChatMode::Proxy => ReplyMode::Proxy,
    };
    let pacing = Pacing {
        interval: settings.chat.drip_interval,
        chunk_chars: settings.chat.drip_chunk_chars.get() as usize,
    };
    let defaults = UpstreamDefaults {
        model: settings.upstream.model.clone(),
        temperature: settings.upstream.temperature,
    };

    let chat = ChatService::new(mode, CannedPool::default(), pacing, Some(upstream), defaults);

    Ok(HttpState {
        render: render_service(),
        chat: Arc::new(chat),
        uploads: Arc::new(uploads),
        upload_limit_bytes: settings.uploads.max_request_bytes.get(),
    })
}

async fn run_render(args: config::RenderArgs) -> Result<(), AppError> {
    let text = match args.file.as_deref() {
        Some(path) => read_file(path).await?,
        None => read_stdin().await?,
    };

    let mode = if args.segmented {
        RenderMode::Segmented
    } else {
        RenderMode::Document
    };
    let result = render_service().render(mode, &text);

    let mut payload = serde_json::to_vec_pretty(&result)
        .map_err(|err| AppError::unexpected(format!("failed to encode render result: {err}")))?;
    payload.push(b'\n');

    let mut stdout = tokio::io::stdout();
    stdout
        .write_all(&payload)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    stdout
        .flush()
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;

    Ok(())
}

async fn read_file(path: &Path) -> Result<String, AppError> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|err| AppError::unexpected(format!("failed to read {}: {err}", path.display())))
}

async fn read_stdin() -> Result<String, AppError> {
    let mut buffer = String::new();
    tokio::io::stdin()
        .read_to_string(&mut buffer)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    Ok(buffer)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            error!(target = "deepchat::serve", error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                error!(target = "deepchat::serve", error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!(target = "deepchat::serve", "shutdown signal received");
}
