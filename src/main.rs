// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! Command-line interface for md2deb.
//!
//! This binary provides the `md2deb` command, which reads a Markdown
//! changelog and prints the equivalent `debian/changelog`.

use lexopt::prelude::*;
use md2deb::{parser, renderer};
use snafu::{ensure, prelude::*};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

/// Where to write the rendered output.
#[derive(Clone)]
enum OutputTarget {
    /// Write to the specified file.
    File(PathBuf),
    /// Write to stdout.
    Stdout,
}

struct Cli {
    input: PathBuf,
    output: OutputTarget,
    json: bool,
    quiet: bool,
    force: bool,
}

#[derive(Debug, Snafu)]
enum Error {
    #[snafu(display(
        "expected exactly one input file\nUsage: {} [OPTIONS] <CHANGELOG.md>",
        env!("CARGO_PKG_NAME")
    ))]
    Usage,

    #[snafu(display("failed to parse arguments: {source}"))]
    ParseArgs { source: lexopt::Error },

    #[snafu(display("file '{}' does not exist", path.display()))]
    MissingInput { path: PathBuf },

    #[snafu(display("'{}' is not a regular file", path.display()))]
    NotAFile { path: PathBuf },

    #[snafu(display("file '{}' is not readable: {source}", path.display()))]
    Unreadable {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("failed to read {}: {source}", path.display()))]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("failed to render {}: {source}", path.display()))]
    Render {
        path: PathBuf,
        source: renderer::RenderError,
    },

    #[snafu(display("failed to serialize entries: {source}"))]
    SerializeJson { source: serde_json::Error },

    #[snafu(display(
        "{} already exists, use --force to overwrite",
        path.display()
    ))]
    OutputExists { path: PathBuf },

    #[snafu(display("failed to write {}: {source}", path.display()))]
    WriteFile {
        path: PathBuf,
        source: std::io::Error,
    },
}

fn print_help() {
    println!(
        "\
{name} {version}
Convert a Markdown changelog to Debian changelog format

Usage: {name} [OPTIONS] <CHANGELOG.md>

Arguments:
  <CHANGELOG.md>         Markdown changelog to convert

Options:
  -o, --output <FILE>    Write to FILE instead of stdout (- for stdout)
      --json             Print the parsed entries as JSON instead
  -q, --quiet            Suppress progress messages and warnings
  -f, --force            Overwrite an existing output file
  -h, --help             Print help
  -V, --version          Print version",
        name = env!("CARGO_PKG_NAME"),
        version = env!("CARGO_PKG_VERSION"),
    );
}

fn parse_args() -> Result<Cli, Error> {
    let mut inputs: Vec<PathBuf> = Vec::new();
    let mut output = OutputTarget::Stdout;
    let mut json = false;
    let mut quiet = false;
    let mut force = false;

    let mut parser = lexopt::Parser::from_env();
    while let Some(arg) = parser.next().context(ParseArgsSnafu)? {
        match arg {
            Short('o') | Long("output") => {
                let val: PathBuf = parser
                    .value()
                    .and_then(|v| v.parse())
                    .context(ParseArgsSnafu)?;
                output = if val == Path::new("-") {
                    OutputTarget::Stdout
                } else {
                    OutputTarget::File(val)
                };
            }
            Long("json") => json = true,
            Short('q') | Long("quiet") => quiet = true,
            Short('f') | Long("force") => force = true,
            Short('h') | Long("help") => {
                print_help();
                std::process::exit(0);
            }
            Short('V') | Long("version") => {
                println!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            Value(val) => inputs.push(val.into()),
            _ => return Err(arg.unexpected()).context(ParseArgsSnafu),
        }
    }

    ensure!(inputs.len() == 1, UsageSnafu);
    let input = inputs.remove(0);

    Ok(Cli {
        input,
        output,
        json,
        quiet,
        force,
    })
}

#[snafu::report]
fn main() -> Result<(), Error> {
    let cli = parse_args()?;

    let markdown = read_input(&cli.input)?;
    let changelog = parser::parse_changelog(&markdown);

    if !cli.quiet {
        for warning in &changelog.warnings {
            eprintln!("warning: {warning}");
        }
    }

    let text = if cli.json {
        serde_json::to_string_pretty(&changelog.entries).context(SerializeJsonSnafu)?
    } else {
        renderer::render_changelog(&changelog.entries, &renderer::DebianOptions::default())
            .context(RenderSnafu { path: &cli.input })?
    };

    write_output(&text, changelog.entries.len(), &cli)
}

/// Checks that `path` is a readable regular file and reads it whole.
fn read_input(path: &Path) -> Result<String, Error> {
    ensure!(path.exists(), MissingInputSnafu { path });
    ensure!(path.is_file(), NotAFileSnafu { path });

    let mut file = File::open(path).context(UnreadableSnafu { path })?;
    let mut markdown = String::new();
    file.read_to_string(&mut markdown)
        .context(ReadFileSnafu { path })?;
    Ok(markdown)
}

/// Writes the converted text, followed by a newline, to the chosen target.
fn write_output(text: &str, entries: usize, cli: &Cli) -> Result<(), Error> {
    match &cli.output {
        OutputTarget::Stdout => println!("{text}"),
        OutputTarget::File(path) => {
            ensure!(!path.exists() || cli.force, OutputExistsSnafu { path });

            if let Some(parent) = path.parent()
                && !parent.as_os_str().is_empty()
            {
                std::fs::create_dir_all(parent).context(WriteFileSnafu { path })?;
            }
            std::fs::write(path, format!("{text}\n")).context(WriteFileSnafu { path })?;

            if !cli.quiet {
                eprintln!("Wrote {} ({entries} entries)", path.display());
            }
        }
    }
    Ok(())
}
