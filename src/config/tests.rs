use super::*;

#[test]
fn cli_overrides_take_highest_precedence() {
    let mut raw = RawSettings::default();
    raw.server.port = Some(4000);
    raw.logging.level = Some("info".to_string());

    let overrides = ServeOverrides {
        server_port: Some(4321),
        log_level: Some("debug".to_string()),
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(settings.server.addr.port(), 4321);
    assert_eq!(settings.logging.level, LevelFilter::DEBUG);
}

#[test]
fn defaults_match_the_demo_setup() {
    let settings = Settings::from_raw(RawSettings::default()).expect("valid settings");

    assert_eq!(settings.server.addr.port(), DEFAULT_PORT);
    assert_eq!(
        settings.uploads.max_request_bytes.get(),
        DEFAULT_UPLOAD_REQUEST_LIMIT_BYTES
    );
    assert_eq!(settings.chat.mode, ChatMode::Dummy);
    assert_eq!(settings.chat.drip_interval, Duration::from_millis(5));
    assert_eq!(settings.chat.drip_chunk_chars.get(), 1);
    assert_eq!(settings.upstream.url.as_str(), DEFAULT_UPSTREAM_URL);
    assert_eq!(settings.upstream.model, DEFAULT_UPSTREAM_MODEL);
    assert!((settings.upstream.temperature - 0.7).abs() < f64::EPSILON);
}

#[test]
fn uploads_limit_can_be_overridden_via_cli() {
    let mut raw = RawSettings::default();
    let overrides = ServeOverrides {
        uploads_max_request_bytes: Some(1_572_864),
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");
    assert_eq!(settings.uploads.max_request_bytes.get(), 1_572_864);
}

#[test]
fn cli_json_logging_enforces_format() {
    let mut raw = RawSettings::default();
    let overrides = ServeOverrides {
        log_json: Some(true),
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert!(matches!(settings.logging.format, LogFormat::Json));
}

#[test]
fn chat_mode_accepts_proxy_and_rejects_unknown() {
    let mut raw = RawSettings::default();
    raw.chat.mode = Some("proxy".to_string());
    let settings = Settings::from_raw(raw).expect("valid settings");
    assert_eq!(settings.chat.mode, ChatMode::Proxy);

    let mut raw = RawSettings::default();
    raw.chat.mode = Some("echo".to_string());
    let err = Settings::from_raw(raw).expect_err("unknown mode rejected");
    assert!(matches!(err, LoadError::Invalid { key: "chat.mode", .. }));
}

#[test]
fn zero_chunk_size_is_rejected() {
    let mut raw = RawSettings::default();
    raw.chat.drip_chunk_chars = Some(0);
    let err = Settings::from_raw(raw).expect_err("zero chunk rejected");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "chat.drip_chunk_chars",
            ..
        }
    ));
}

#[test]
fn upstream_url_must_be_http() {
    let mut raw = RawSettings::default();
    raw.upstream.url = Some("ftp://example.com/stream".to_string());
    let err = Settings::from_raw(raw).expect_err("ftp rejected");
    assert!(matches!(err, LoadError::Invalid { key: "upstream.url", .. }));
}

#[test]
fn upstream_temperature_is_bounded() {
    let mut raw = RawSettings::default();
    raw.upstream.temperature = Some(3.5);
    let err = Settings::from_raw(raw).expect_err("temperature rejected");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "upstream.temperature",
            ..
        }
    ));
}

#[test]
fn default_to_serve_command() {
    let args = CliArgs::parse_from(["deepchat"]);
    let command = args
        .command
        .unwrap_or(Command::Serve(Box::<ServeArgs>::default()));
    assert!(matches!(command, Command::Serve(_)));
}

#[test]
fn parse_serve_overrides() {
    let args = CliArgs::parse_from([
        "deepchat",
        "serve",
        "--server-host",
        "0.0.0.0",
        "--chat-mode",
        "proxy",
        "--upstream-url",
        "http://llm.internal:8000/chat/stream",
    ]);

    match args.command.expect("serve command") {
        Command::Serve(serve) => {
            assert_eq!(serve.overrides.server_host.as_deref(), Some("0.0.0.0"));
            assert_eq!(serve.overrides.chat_mode, Some(ChatModeArg::Proxy));
            assert_eq!(
                serve.overrides.upstream_url.as_deref(),
                Some("http://llm.internal:8000/chat/stream")
            );
        }
        _ => panic!("wrong command parsed"),
    }
}

#[test]
fn parse_render_arguments() {
    let args = CliArgs::parse_from(["deepchat", "render", "--segmented", "/tmp/reply.md"]);

    match args.command.expect("render command") {
        Command::Render(render) => {
            assert!(render.segmented);
            assert_eq!(
                render.file.as_deref(),
                Some(std::path::Path::new("/tmp/reply.md"))
            );
        }
        _ => panic!("wrong command parsed"),
    }
}
