//! kiln installer CLI entrypoint.
//!
//! This binary downloads, verifies, and installs the prebuilt kiln
//! executable for the host platform, then checks that it runs.

use camino::Utf8PathBuf;
use clap::Parser;
use kiln_installer::artefact::download::HttpFetcher;
use kiln_installer::artefact::manifest_parser::load_or_bundled;
use kiln_installer::cli::{Cli, Command, InstallArgs, PlatformsArgs};
use kiln_installer::dirs::{SystemBaseDirs, default_bin_dir};
use kiln_installer::error::{InstallerError, Result};
use kiln_installer::list_output::{format_human, format_json};
use kiln_installer::output::{DryRunInfo, write_stderr_line};
use kiln_installer::pipeline::{InstallContext, InstallDeps, plan_install, run_install};
use kiln_installer::platform::PlatformKey;
use kiln_installer::scratch::install_interrupt_cleanup;
use kiln_installer::smoke_check::SystemCommandExecutor;
use std::io::Write;

fn main() {
    let cli = Cli::parse();
    let mut stderr = std::io::stderr();
    if let Err(err) = install_interrupt_cleanup() {
        write_stderr_line(
            &mut stderr,
            format!("warning: interrupt cleanup unavailable: {err}"),
        );
    }
    let run_result = run(&cli, &mut std::io::stdout(), &mut stderr);
    let exit_code = exit_code_for_run_result(run_result, &mut stderr);
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
}

fn run(cli: &Cli, stdout: &mut dyn Write, stderr: &mut dyn Write) -> Result<()> {
    match &cli.command {
        Some(Command::Platforms(args)) => run_platforms(args, &PlatformKey::host(), stdout),
        Some(Command::Install(_)) | None => run_install_command(cli.install_args(), stderr),
    }
}

/// Installs kiln, or prints the plan in dry-run mode.
fn run_install_command(args: &InstallArgs, stderr: &mut dyn Write) -> Result<()> {
    let table = load_or_bundled(args.manifest.as_deref())?;
    let bin_dir = determine_bin_dir(args.bin_dir.clone())?;
    let host = PlatformKey::host();
    let context = InstallContext {
        table: &table,
        host: &host,
        bin_dir: &bin_dir,
        skip_check: args.skip_check,
        quiet: args.quiet,
    };

    if args.dry_run {
        let plan = plan_install(&context)?;
        let info = DryRunInfo {
            plan: &plan,
            manifest: args.manifest.as_deref(),
            timeout_secs: args.timeout_secs,
            skip_check: args.skip_check,
        };
        write_stderr_line(stderr, info.display_text());
        return Ok(());
    }

    let fetcher = HttpFetcher::new(args.timeout());
    let executor = SystemCommandExecutor::default();
    run_install(
        &context,
        InstallDeps {
            fetcher: &fetcher,
            executor: &executor,
        },
        stderr,
    )?;
    Ok(())
}

/// Prints the manifest's platform table.
fn run_platforms(args: &PlatformsArgs, host: &PlatformKey, stdout: &mut dyn Write) -> Result<()> {
    let table = load_or_bundled(args.manifest.as_deref())?;
    let output = if args.json {
        format_json(&table, Some(host))
    } else {
        format_human(&table, Some(host))
    };
    writeln!(stdout, "{output}").map_err(|source| InstallerError::WriteFailed { source })
}

/// Determines the bin directory from the CLI or falls back to the default.
fn determine_bin_dir(cli_bin_dir: Option<Utf8PathBuf>) -> Result<Utf8PathBuf> {
    if let Some(dir) = cli_bin_dir {
        return Ok(dir);
    }
    let dirs = SystemBaseDirs::new().ok_or_else(|| InstallerError::BinDirUnavailable {
        reason: "no home directory found".to_owned(),
    })?;
    default_bin_dir(&dirs)
}

fn exit_code_for_run_result(result: Result<()>, stderr: &mut dyn Write) -> i32 {
    match result {
        Ok(()) => 0,
        Err(err) => {
            write_stderr_line(stderr, format!("error: {err}"));
            err.exit_code()
        }
    }
}
