//! Shared test utilities for the installer crate.
//!
//! Available to unit tests and, through the `test-support` feature, to the
//! integration tests under `tests/`.

use crate::artefact::download::{ArtefactFetcher, DownloadError};
use crate::artefact::download_url::DownloadUrl;
use crate::artefact::manifest::DescriptorTable;
use crate::artefact::manifest_parser::bundled_manifest;
use crate::smoke_check::CommandExecutor;
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::io::{self, Write};
use std::process::{ExitStatus, Output};

/// Creates an `ExitStatus` from an exit code (Unix implementation).
#[cfg(unix)]
pub fn exit_status(code: i32) -> ExitStatus {
    use std::os::unix::process::ExitStatusExt;

    ExitStatus::from_raw(code << 8)
}

/// Creates an `ExitStatus` from an exit code (Windows implementation).
#[cfg(windows)]
pub fn exit_status(code: i32) -> ExitStatus {
    use std::os::windows::process::ExitStatusExt;

    ExitStatus::from_raw(code as u32)
}

/// Creates a successful command `Output` with the given stdout.
pub fn success_output(stdout: &str) -> Output {
    Output {
        status: exit_status(0),
        stdout: stdout.as_bytes().to_vec(),
        stderr: Vec::new(),
    }
}

/// Creates a failed command `Output` (exit code 1) with the given stderr.
pub fn failure_output(stderr: &str) -> Output {
    Output {
        status: exit_status(1),
        stdout: Vec::new(),
        stderr: stderr.as_bytes().to_vec(),
    }
}

/// Represents an expected command invocation for testing.
#[derive(Debug)]
pub struct ExpectedCall {
    /// The command to execute (e.g., "/home/user/.local/bin/kiln").
    pub cmd: &'static str,
    /// The arguments to pass to the command.
    pub args: Vec<&'static str>,
    /// The result to return when this command is invoked.
    pub result: io::Result<Output>,
}

/// A stub implementation of `CommandExecutor` for testing.
///
/// Records expected command invocations and returns predefined results,
/// allowing tests to verify command execution without side effects.
#[derive(Debug)]
pub struct StubExecutor {
    expected: RefCell<VecDeque<ExpectedCall>>,
}

impl StubExecutor {
    /// Creates a new `StubExecutor` with the given expected calls.
    pub fn new(expected: Vec<ExpectedCall>) -> Self {
        Self {
            expected: RefCell::new(expected.into()),
        }
    }

    /// Asserts that all expected command invocations have been consumed.
    ///
    /// # Panics
    ///
    /// Panics if there are remaining expected calls that were not invoked.
    pub fn assert_finished(&self) {
        assert!(
            self.expected.borrow().is_empty(),
            "expected no further command invocations"
        );
    }
}

impl CommandExecutor for StubExecutor {
    fn run(&self, cmd: &str, args: &[&str]) -> io::Result<Output> {
        let mut expected = self.expected.borrow_mut();
        let call = expected.pop_front().expect("unexpected command invocation");

        assert_eq!(call.cmd, cmd);
        assert_eq!(call.args.as_slice(), args);

        call.result
    }
}

/// An executor that answers every command with the same exit code.
///
/// Useful when the command path depends on a temporary directory.
#[derive(Debug)]
pub struct FixedExecutor {
    code: i32,
    stdout: String,
    calls: RefCell<Vec<String>>,
}

impl FixedExecutor {
    /// Answer every command with `code` and `stdout`.
    pub fn new(code: i32, stdout: &str) -> Self {
        Self {
            code,
            stdout: stdout.to_owned(),
            calls: RefCell::new(Vec::new()),
        }
    }

    /// Commands run so far, each rendered as `cmd arg...`.
    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }
}

impl CommandExecutor for FixedExecutor {
    fn run(&self, cmd: &str, args: &[&str]) -> io::Result<Output> {
        let mut rendered = cmd.to_owned();
        for arg in args {
            rendered.push(' ');
            rendered.push_str(arg);
        }
        self.calls.borrow_mut().push(rendered);
        Ok(Output {
            status: exit_status(self.code),
            stdout: self.stdout.as_bytes().to_vec(),
            stderr: Vec::new(),
        })
    }
}

/// What a [`StubFetcher`] answers with.
#[derive(Debug, Clone)]
enum FetchResponse {
    Body(Vec<u8>),
    Status(u16),
}

/// A fetcher that serves a fixed response and counts requests.
#[derive(Debug)]
pub struct StubFetcher {
    response: FetchResponse,
    calls: Cell<usize>,
}

impl StubFetcher {
    /// Serve `body` for every request.
    pub fn serving(body: Vec<u8>) -> Self {
        Self {
            response: FetchResponse::Body(body),
            calls: Cell::new(0),
        }
    }

    /// Answer every request with HTTP `status`.
    pub fn failing_with_status(status: u16) -> Self {
        Self {
            response: FetchResponse::Status(status),
            calls: Cell::new(0),
        }
    }

    /// Number of requests made so far.
    pub fn calls(&self) -> usize {
        self.calls.get()
    }
}

impl ArtefactFetcher for StubFetcher {
    fn fetch(&self, url: &DownloadUrl) -> Result<Vec<u8>, DownloadError> {
        self.calls.set(self.calls.get() + 1);
        match &self.response {
            FetchResponse::Body(body) => Ok(body.clone()),
            FetchResponse::Status(status) => Err(DownloadError::Status {
                url: url.to_string(),
                status: *status,
            }),
        }
    }
}

/// One entry of a test archive.
#[derive(Debug, Clone)]
pub struct ArchiveEntry {
    path: String,
    kind: EntryKind,
}

#[derive(Debug, Clone)]
enum EntryKind {
    File { contents: Vec<u8>, mode: u32 },
    Symlink { target: String },
    PaxGlobalHeader { records: Vec<u8> },
}

impl ArchiveEntry {
    /// A regular file with the given contents and mode.
    pub fn file(path: &str, contents: &[u8], mode: u32) -> Self {
        Self {
            path: path.to_owned(),
            kind: EntryKind::File {
                contents: contents.to_vec(),
                mode,
            },
        }
    }

    /// A symbolic link pointing at `target`.
    pub fn symlink(path: &str, target: &str) -> Self {
        Self {
            path: path.to_owned(),
            kind: EntryKind::Symlink {
                target: target.to_owned(),
            },
        }
    }

    /// A pax global extended header carrying a `comment` record, as written
    /// by `git archive`.
    pub fn pax_global_header(comment: &str) -> Self {
        Self {
            path: "pax_global_header".to_owned(),
            kind: EntryKind::PaxGlobalHeader {
                records: pax_record("comment", comment),
            },
        }
    }
}

/// Encode one `<length> <key>=<value>\n` pax record, where the length
/// counts its own digits.
fn pax_record(key: &str, value: &str) -> Vec<u8> {
    let body = format!(" {key}={value}\n");
    let mut len = body.len();
    loop {
        let total = len.to_string().len() + body.len();
        if total == len {
            break;
        }
        len = total;
    }
    format!("{len}{body}").into_bytes()
}

/// Build an uncompressed tar stream from `entries`.
pub fn tar_archive(entries: &[ArchiveEntry]) -> Vec<u8> {
    let mut builder = tar::Builder::new(Vec::new());
    for entry in entries {
        let mut header = tar::Header::new_gnu();
        match &entry.kind {
            EntryKind::File { contents, mode } => {
                header.set_entry_type(tar::EntryType::Regular);
                header.set_size(contents.len() as u64);
                header.set_mode(*mode);
                header.set_cksum();
                builder
                    .append_data(&mut header, &entry.path, contents.as_slice())
                    .expect("append file entry");
            }
            EntryKind::Symlink { target } => {
                header.set_entry_type(tar::EntryType::Symlink);
                header.set_size(0);
                header.set_mode(0o777);
                builder
                    .append_link(&mut header, &entry.path, target)
                    .expect("append symlink entry");
            }
            EntryKind::PaxGlobalHeader { records } => {
                let mut header = tar::Header::new_ustar();
                header.set_entry_type(tar::EntryType::XGlobalHeader);
                header.set_size(records.len() as u64);
                header.set_mode(0o644);
                header.set_cksum();
                builder
                    .append_data(&mut header, &entry.path, records.as_slice())
                    .expect("append pax global header");
            }
        }
    }
    builder.into_inner().expect("finish tar stream")
}

/// Build a `.tar.gz` archive from `entries`.
pub fn tar_gz_archive(entries: &[ArchiveEntry]) -> Vec<u8> {
    let mut encoder =
        flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
    encoder
        .write_all(&tar_archive(entries))
        .expect("gzip tar stream");
    encoder.finish().expect("finish gzip stream")
}

/// Build a `.tar.zst` archive from `entries`.
pub fn tar_zst_archive(entries: &[ArchiveEntry]) -> Vec<u8> {
    zstd::stream::encode_all(tar_archive(entries).as_slice(), 0).expect("zstd tar stream")
}

/// A release archive holding a `kiln` shell script that prints `version`.
pub fn kiln_release_archive(version: &str) -> Vec<u8> {
    let script = format!("#!/bin/sh\necho \"kiln version {version}\"\n");
    tar_gz_archive(&[
        ArchiveEntry::file("kiln", script.as_bytes(), 0o755),
        ArchiveEntry::file("LICENSE", b"Apache License 2.0\n", 0o644),
    ])
}

/// A TOML manifest with a single Linux x86_64 entry.
///
/// The platform entry is the last table in the document, so callers may
/// append per-platform keys such as `version`.
pub fn manifest_toml(version: &str, url: &str, sha256: &str) -> String {
    format!(
        concat!(
            "version = \"{version}\"\n",
            "\n",
            "[[platforms]]\n",
            "os = \"Linux\"\n",
            "arch = \"x86_64\"\n",
            "url = \"{url}\"\n",
            "sha256 = \"{sha256}\"\n",
        ),
        version = version,
        url = url,
        sha256 = sha256,
    )
}

/// The bundled kiln release table.
pub fn sample_table() -> DescriptorTable {
    bundled_manifest().expect("bundled manifest is valid")
}
