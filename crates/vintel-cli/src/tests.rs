use super::*;

#[test]
fn no_command_is_none() {
    let cli = Cli::try_parse_from(["vintel"]).expect("expected valid cli args");
    assert!(cli.command.is_none());
    assert!(cli.config.is_none());
}

#[test]
fn aggregate_defaults_to_table_with_cache() {
    let cli = Cli::try_parse_from(["vintel", "aggregate", "--input", "signals.json"]).unwrap();
    match cli.command {
        Some(Commands::Aggregate {
            input,
            video_id,
            format,
            no_cache,
        }) => {
            assert_eq!(input, PathBuf::from("signals.json"));
            assert_eq!(video_id, None);
            assert_eq!(format, OutputFormat::Table);
            assert!(!no_cache);
        }
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn aggregate_accepts_format_video_and_no_cache() {
    let cli = Cli::try_parse_from([
        "vintel",
        "aggregate",
        "--input",
        "s.json",
        "--video-id",
        "dQw4w9WgXcQ",
        "--format",
        "markdown",
        "--no-cache",
    ])
    .unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Aggregate {
            format: OutputFormat::Markdown,
            no_cache: true,
            video_id: Some(ref id),
            ..
        }) if id == "dQw4w9WgXcQ"
    ));
}

#[test]
fn aggregate_rejects_unknown_format() {
    assert!(
        Cli::try_parse_from(["vintel", "aggregate", "--input", "s.json", "--format", "csv"])
            .is_err()
    );
}

#[test]
fn aggregate_requires_input() {
    assert!(Cli::try_parse_from(["vintel", "aggregate"]).is_err());
}

#[test]
fn global_paths_parse_after_subcommand() {
    let cli = Cli::try_parse_from([
        "vintel",
        "validate",
        "--input",
        "s.json",
        "--config",
        "tuning.yaml",
        "--locations",
        "places.yaml",
    ])
    .unwrap();
    assert_eq!(cli.config, Some(PathBuf::from("tuning.yaml")));
    assert_eq!(cli.locations, Some(PathBuf::from("places.yaml")));
    assert!(matches!(cli.command, Some(Commands::Validate { .. })));
}

#[test]
fn resolve_collects_all_texts() {
    let cli = Cli::try_parse_from(["vintel", "resolve", "NYC", "São Paulo, Brazil"]).unwrap();
    match cli.command {
        Some(Commands::Resolve { text }) => assert_eq!(text, vec!["NYC", "São Paulo, Brazil"]),
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn resolve_requires_text() {
    assert!(Cli::try_parse_from(["vintel", "resolve"]).is_err());
}

#[test]
fn parses_languages_command() {
    let cli = Cli::try_parse_from(["vintel", "languages", "--input", "s.json"]).unwrap();
    assert!(matches!(cli.command, Some(Commands::Languages { .. })));
}
