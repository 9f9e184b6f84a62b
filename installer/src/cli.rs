//! CLI argument definitions for the kiln installer.
//!
//! This module defines the command-line interface using clap. It is separated
//! from the main entrypoint to keep the binary small and focused on
//! orchestration.

use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};
use std::time::Duration;

/// Default download timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Environment variable naming the release manifest.
pub const MANIFEST_ENV: &str = "KILN_MANIFEST";

/// Environment variable naming the install directory.
pub const BIN_DIR_ENV: &str = "KILN_BIN_DIR";

/// Install the prebuilt kiln executable.
#[derive(Parser, Debug)]
#[command(name = "kiln-installer")]
#[command(version, about)]
#[command(long_about = concat!(
    "Install the prebuilt kiln executable.\n\n",
    "The installer detects the host operating system and CPU architecture, ",
    "looks the pair up in a release manifest, downloads the matching archive ",
    "over HTTPS, verifies its SHA-256 checksum, and installs the kiln ",
    "executable into a bin directory. Finally it runs `kiln --version` to ",
    "confirm the executable works on this host.\n\n",
    "Without --manifest the release table bundled into the installer is used.",
))]
#[command(after_help = concat!(
    "EXIT CODES:\n",
    "  0    kiln installed and checked\n",
    "  1    invalid manifest, configuration, or output failure\n",
    "  2    no release for this platform\n",
    "  3    download failed\n",
    "  4    checksum mismatch\n",
    "  5    archive could not be extracted or installed\n",
    "  6    installed kiln failed `kiln --version`\n",
    "  130  interrupted\n\n",
    "EXAMPLES:\n",
    "  Install into the default bin directory:\n",
    "    $ kiln-installer\n\n",
    "  Install into a specific directory:\n",
    "    $ kiln-installer --bin-dir /usr/local/bin\n\n",
    "  Preview without downloading:\n",
    "    $ kiln-installer --dry-run\n\n",
    "  List published platforms:\n",
    "    $ kiln-installer platforms\n\n",
    "For more information, see: https://github.com/pivotal-cf/kiln",
))]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Install arguments (used when no subcommand is given).
    #[command(flatten)]
    pub install: InstallArgs,
}

/// Available subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Install kiln (default when no subcommand given).
    Install(InstallArgs),

    /// List the platforms the release manifest covers.
    Platforms(PlatformsArgs),
}

/// Arguments for the install command.
#[derive(Parser, Debug, Clone)]
pub struct InstallArgs {
    /// Release manifest (TOML, or JSON with a .json extension) [default: bundled].
    #[arg(short, long, value_name = "PATH", env = MANIFEST_ENV)]
    pub manifest: Option<Utf8PathBuf>,

    /// Directory that receives the kiln executable [default: platform-specific].
    #[arg(short, long, value_name = "DIR", env = BIN_DIR_ENV)]
    pub bin_dir: Option<Utf8PathBuf>,

    /// Download timeout in seconds.
    #[arg(
        long = "timeout",
        value_name = "SECS",
        default_value_t = DEFAULT_TIMEOUT_SECS,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub timeout_secs: u64,

    /// Install without running `kiln --version` afterwards.
    #[arg(long)]
    pub skip_check: bool,

    /// Show the resolved release and exit without downloading.
    #[arg(long)]
    pub dry_run: bool,

    /// Suppress progress output (errors still shown).
    #[arg(short, long)]
    pub quiet: bool,
}

/// Arguments for the platforms command.
#[derive(Parser, Debug, Clone, Default)]
pub struct PlatformsArgs {
    /// Release manifest [default: bundled].
    #[arg(short, long, value_name = "PATH", env = MANIFEST_ENV)]
    pub manifest: Option<Utf8PathBuf>,

    /// Output in JSON format for scripting.
    #[arg(long)]
    pub json: bool,
}

impl InstallArgs {
    /// The download timeout as a [`Duration`].
    ///
    /// # Examples
    ///
    /// ```
    /// use kiln_installer::cli::InstallArgs;
    /// use std::time::Duration;
    ///
    /// let args = InstallArgs::default();
    /// assert_eq!(args.timeout(), Duration::from_secs(30));
    /// ```
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for InstallArgs {
    /// Creates an `InstallArgs` instance with all flags disabled, the
    /// bundled manifest, and the default timeout.
    ///
    /// # Examples
    ///
    /// ```
    /// use kiln_installer::cli::InstallArgs;
    ///
    /// let args = InstallArgs::default();
    /// assert!(args.manifest.is_none());
    /// assert!(!args.skip_check);
    /// assert_eq!(args.timeout_secs, 30);
    /// ```
    fn default() -> Self {
        Self {
            manifest: None,
            bin_dir: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            skip_check: false,
            dry_run: false,
            quiet: false,
        }
    }
}

impl Cli {
    /// Returns the effective install arguments.
    ///
    /// If an `Install` subcommand was provided, returns those arguments.
    /// Otherwise returns the flattened install arguments.
    ///
    /// # Note
    ///
    /// When `Command::Platforms` is active, this returns the flattened
    /// install arguments. Callers should check `self.command` first.
    #[must_use]
    pub fn install_args(&self) -> &InstallArgs {
        match &self.command {
            Some(Command::Install(args)) => args,
            Some(Command::Platforms(_)) | None => &self.install,
        }
    }
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
