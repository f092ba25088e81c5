//! Tests for CLI subcommand parsing.

use clap::Parser;
use std::path::PathBuf;
use wayback_harvest::cdx::MatchType;
use wayback_harvest::config::{Cli, Command, LogFormat, DEFAULT_CDX_ENDPOINT};

#[test]
fn test_global_flags_after_subcommand() {
    let cli = Cli::try_parse_from([
        "wayback_harvest",
        "search",
        "example.com",
        "--match-type",
        "domain",
        "--endpoint",
        "http://127.0.0.1:8080/cdx",
        "--auth-token",
        "s3cret",
        "--log-format",
        "json",
    ])
    .expect("Should parse search command");

    assert_eq!(cli.endpoint, "http://127.0.0.1:8080/cdx");
    assert_eq!(cli.auth_token.as_deref(), Some("s3cret"));
    assert!(matches!(cli.log_format, LogFormat::Json));
    match cli.command {
        Command::Search(args) => assert_eq!(args.match_type, Some(MatchType::Domain)),
        other => panic!("Expected search command, got {other:?}"),
    }
}

#[test]
fn test_default_endpoint() {
    let cli = Cli::try_parse_from(["wayback_harvest", "metadata", "example.com"])
        .expect("Should parse metadata command");
    assert_eq!(cli.endpoint, DEFAULT_CDX_ENDPOINT);
}

#[test]
fn test_download_reads_stdin_marker() {
    let cli = Cli::try_parse_from(["wayback_harvest", "download", "-", "--raw", "--stream"])
        .expect("Should parse download command");
    match cli.command {
        Command::Download(args) => {
            assert_eq!(args.file, PathBuf::from("-"));
            assert!(args.raw);
            assert!(args.stream);
            assert!(args.out_dir.is_none());
        }
        other => panic!("Expected download command, got {other:?}"),
    }
}

#[test]
fn test_invalid_values_are_rejected() {
    assert!(Cli::try_parse_from(["wayback_harvest", "search", "example.com", "--sort", "sideways"]).is_err());
    assert!(Cli::try_parse_from(["wayback_harvest", "download", "urls.txt", "--jobs", "many"]).is_err());
    assert!(Cli::try_parse_from(["wayback_harvest", "search"]).is_err());
    assert!(Cli::try_parse_from(["wayback_harvest"]).is_err());
}
