//! Tests for installer CLI parsing and default behaviours.

use super::*;
use rstest::rstest;

fn parse_without_env(args: &[&str]) -> Cli {
    temp_env::with_vars_unset([MANIFEST_ENV, BIN_DIR_ENV], || Cli::parse_from(args))
}

#[test]
fn cli_parses_defaults() {
    let cli = parse_without_env(&["kiln-installer"]);
    assert!(cli.command.is_none());
    assert!(cli.install.manifest.is_none());
    assert!(cli.install.bin_dir.is_none());
    assert_eq!(cli.install.timeout_secs, DEFAULT_TIMEOUT_SECS);
    assert!(!cli.install.skip_check);
    assert!(!cli.install.dry_run);
    assert!(!cli.install.quiet);
}

#[test]
fn cli_parses_bin_dir() {
    let cli = Cli::parse_from(["kiln-installer", "-b", "/usr/local/bin"]);
    assert_eq!(
        cli.install.bin_dir,
        Some(Utf8PathBuf::from("/usr/local/bin"))
    );
}

#[test]
fn cli_parses_manifest() {
    let cli = Cli::parse_from(["kiln-installer", "--manifest", "release.json"]);
    assert_eq!(
        cli.install.manifest,
        Some(Utf8PathBuf::from("release.json"))
    );
}

#[test]
fn cli_parses_timeout() {
    let cli = Cli::parse_from(["kiln-installer", "--timeout", "5"]);
    assert_eq!(cli.install.timeout(), Duration::from_secs(5));
}

#[rstest]
#[case::zero(&["kiln-installer", "--timeout", "0"])]
#[case::negative(&["kiln-installer", "--timeout", "-1"])]
#[case::not_a_number(&["kiln-installer", "--timeout", "soon"])]
fn cli_rejects_invalid_timeouts(#[case] args: &[&str]) {
    Cli::try_parse_from(args).expect_err("expected clap to reject the timeout");
}

#[test]
fn cli_parses_platforms_subcommand() {
    let cli = Cli::parse_from(["kiln-installer", "platforms"]);
    assert!(matches!(cli.command, Some(Command::Platforms(_))));
}

#[test]
fn cli_parses_platforms_with_json() {
    let cli = Cli::parse_from(["kiln-installer", "platforms", "--json"]);
    match cli.command {
        Some(Command::Platforms(args)) => assert!(args.json),
        _ => panic!("expected Platforms command"),
    }
}

#[test]
fn cli_parses_install_subcommand_with_args() {
    let cli = Cli::parse_from(["kiln-installer", "install", "--skip-check", "-q"]);
    match cli.command {
        Some(Command::Install(args)) => {
            assert!(args.skip_check);
            assert!(args.quiet);
        }
        _ => panic!("expected Install command"),
    }
}

/// Parameterised tests for boolean CLI flags.
#[rstest]
#[case::dry_run(&["kiln-installer", "--dry-run"], |cli: &Cli| cli.install.dry_run)]
#[case::quiet(&["kiln-installer", "-q"], |cli: &Cli| cli.install.quiet)]
#[case::skip_check(&["kiln-installer", "--skip-check"], |cli: &Cli| cli.install.skip_check)]
fn cli_parses_boolean_flags(#[case] args: &[&str], #[case] check: fn(&Cli) -> bool) {
    let cli = Cli::parse_from(args);
    assert!(check(&cli));
}

#[test]
fn environment_supplies_manifest_and_bin_dir() {
    temp_env::with_vars(
        [
            (MANIFEST_ENV, Some("/etc/kiln/release.toml")),
            (BIN_DIR_ENV, Some("/opt/kiln/bin")),
        ],
        || {
            let cli = Cli::parse_from(["kiln-installer"]);
            assert_eq!(
                cli.install.manifest,
                Some(Utf8PathBuf::from("/etc/kiln/release.toml"))
            );
            assert_eq!(cli.install.bin_dir, Some(Utf8PathBuf::from("/opt/kiln/bin")));
        },
    );
}

#[test]
fn flags_take_precedence_over_environment() {
    temp_env::with_var(BIN_DIR_ENV, Some("/opt/kiln/bin"), || {
        let cli = Cli::parse_from(["kiln-installer", "--bin-dir", "/tmp/bin"]);
        assert_eq!(cli.install.bin_dir, Some(Utf8PathBuf::from("/tmp/bin")));
    });
}

#[test]
fn platforms_reads_manifest_from_environment() {
    temp_env::with_var(MANIFEST_ENV, Some("release.json"), || {
        let cli = Cli::parse_from(["kiln-installer", "platforms"]);
        match cli.command {
            Some(Command::Platforms(args)) => {
                assert_eq!(args.manifest, Some(Utf8PathBuf::from("release.json")));
            }
            _ => panic!("expected Platforms command"),
        }
    });
}

#[test]
fn install_args_default_matches_parsed_defaults() {
    let parsed = parse_without_env(&["kiln-installer"]);
    let defaults = InstallArgs::default();
    assert_eq!(parsed.install.manifest, defaults.manifest);
    assert_eq!(parsed.install.timeout_secs, defaults.timeout_secs);
    assert_eq!(parsed.install.skip_check, defaults.skip_check);
}

#[test]
fn platforms_args_default_is_valid() {
    let args = PlatformsArgs::default();
    assert!(!args.json);
    assert!(args.manifest.is_none());
}

#[test]
fn install_args_returns_flattened_when_no_subcommand() {
    let cli = Cli::parse_from(["kiln-installer", "--skip-check"]);
    assert!(cli.install_args().skip_check);
}

#[test]
fn install_args_returns_subcommand_args_when_present() {
    let cli = Cli::parse_from(["kiln-installer", "install", "--dry-run"]);
    assert!(cli.install_args().dry_run);
}

#[test]
fn cli_definition_is_consistent() {
    use clap::CommandFactory;

    Cli::command().debug_assert();
}
