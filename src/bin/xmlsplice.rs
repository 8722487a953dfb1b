//! Command-line front end for the path operations.
//!
//! ```text
//! xmlsplice append doc.xml --path //list --fragment '<item/>'
//! xmlsplice delete doc.xml --path '//item[@stale]'
//! xmlsplice collect doc.xml --path //title
//! ```

use std::fs;
use std::io::{self, Read, Write};
use std::process::ExitCode;

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use log::{Level, LevelFilter, Log, Metadata, Record};

use xmlsplice::encoding::decode_to_utf8;
use xmlsplice::ops::{
    append_children_at_path, collect_nodes_at_path, delete_nodes_at_path, FailureMode,
    OperationOptions, Outcome, Status,
};
use xmlsplice::parser::ParseOptions;
use xmlsplice::serial::DeclarationPolicy;

// ---------------------------------------------------------------------------
// CLI argument definitions
// ---------------------------------------------------------------------------

/// xmlsplice -- select nodes with a path and append, delete or print them.
#[derive(Parser, Debug)]
#[command(name = "xmlsplice", version, about, long_about = None)]
#[allow(clippy::struct_excessive_bools)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// When to write an XML declaration on edited output.
    #[arg(long, value_enum, default_value_t = Declaration::Preserve, global = true)]
    declaration: Declaration,

    /// On failure, print the original document instead of nothing.
    #[arg(long, global = true)]
    soft: bool,

    /// Maximum element nesting depth accepted by the parser.
    #[arg(long, value_name = "N", global = true)]
    max_depth: Option<u32>,

    /// Drop whitespace-only text nodes while parsing.
    #[arg(long, global = true)]
    noblanks: bool,

    /// Exit with status 3 when the path selects nothing.
    #[arg(long, global = true)]
    fail_on_no_match: bool,

    /// Log progress to stderr (-v for debug, -vv for trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log errors.
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Save output to a file instead of stdout.
    #[arg(long, value_name = "FILE", global = true)]
    output: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Append a fragment as the last children of every selected element.
    Append {
        /// XML file to edit (use `-` for stdin).
        file: String,

        /// Path expression selecting the target elements.
        #[arg(long)]
        path: String,

        /// Fragment text to append.
        #[arg(long, conflicts_with = "fragment_file", required_unless_present = "fragment_file")]
        fragment: Option<String>,

        /// Read the fragment from a file.
        #[arg(long, value_name = "FILE")]
        fragment_file: Option<String>,
    },
    /// Delete every selected node.
    Delete {
        /// XML file to edit (use `-` for stdin).
        file: String,

        /// Path expression selecting the nodes to remove.
        #[arg(long)]
        path: String,
    },
    /// Print every selected node.
    Collect {
        /// XML file to read (use `-` for stdin).
        file: String,

        /// Path expression; defaults to every element.
        #[arg(long)]
        path: Option<String>,

        /// Pretty-print element-only content.
        #[arg(long)]
        indent: bool,

        /// Text written after each collected node.
        #[arg(long, default_value = "\n")]
        separator: String,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Declaration {
    Always,
    Preserve,
    Never,
}

impl From<Declaration> for DeclarationPolicy {
    fn from(d: Declaration) -> Self {
        match d {
            Declaration::Always => Self::Always,
            Declaration::Preserve => Self::Preserve,
            Declaration::Never => Self::Never,
        }
    }
}

// ---------------------------------------------------------------------------
// Exit codes
// ---------------------------------------------------------------------------

const EXIT_SUCCESS: u8 = 0;
const EXIT_OPERATION_ERROR: u8 = 1;
const EXIT_IO_ERROR: u8 = 2;
const EXIT_NO_MATCH: u8 = 3;

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

struct StderrLogger;

static LOGGER: StderrLogger = StderrLogger;

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= log::max_level() && metadata.target().starts_with("xmlsplice")
    }

    fn log(&self, record: &Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let level = match record.level() {
            Level::Error => "error",
            Level::Warn => "warning",
            Level::Info => "info",
            Level::Debug => "debug",
            Level::Trace => "trace",
        };
        eprintln!("xmlsplice: {level}: {}", record.args());
    }

    fn flush(&self) {
        let _ = io::stderr().flush();
    }
}

fn init_logging(cli: &Cli) {
    let level = if cli.quiet {
        LevelFilter::Error
    } else {
        match cli.verbose {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    };
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(level);
    }
}

// ---------------------------------------------------------------------------
// Main entry point
// ---------------------------------------------------------------------------

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli);
    ExitCode::from(run(&cli))
}

fn run(cli: &Cli) -> u8 {
    let options = operation_options(cli);
    match &cli.command {
        Command::Append {
            file,
            path,
            fragment,
            fragment_file,
        } => {
            let Some(doc) = read_document(file) else {
                return EXIT_IO_ERROR;
            };
            let fragment = match (fragment, fragment_file) {
                (Some(text), _) => text.clone(),
                (None, Some(name)) => match read_document(name) {
                    Some(text) => text,
                    None => return EXIT_IO_ERROR,
                },
                (None, None) => {
                    eprintln!("append: one of --fragment or --fragment-file is required");
                    return EXIT_IO_ERROR;
                }
            };
            finish_edit(cli, append_children_at_path(&doc, path, &fragment, &options))
        }
        Command::Delete { file, path } => {
            let Some(doc) = read_document(file) else {
                return EXIT_IO_ERROR;
            };
            finish_edit(cli, delete_nodes_at_path(&doc, path, &options))
        }
        Command::Collect {
            file,
            path,
            indent,
            separator,
        } => {
            let Some(doc) = read_document(file) else {
                return EXIT_IO_ERROR;
            };
            let options = options.collect_indent(*indent);
            match collect_nodes_at_path(&doc, path.as_deref(), &options) {
                Ok(items) => {
                    let mut out = String::new();
                    for item in &items {
                        out.push_str(item.as_deref().unwrap_or(""));
                        out.push_str(separator);
                    }
                    if !write_output(cli, &out) {
                        return EXIT_IO_ERROR;
                    }
                    if items.is_empty() && cli.fail_on_no_match {
                        EXIT_NO_MATCH
                    } else {
                        EXIT_SUCCESS
                    }
                }
                Err(e) => {
                    eprintln!("{file}: {e}");
                    EXIT_OPERATION_ERROR
                }
            }
        }
    }
}

fn operation_options(cli: &Cli) -> OperationOptions {
    let mut parse = ParseOptions::default().no_blanks(cli.noblanks);
    if let Some(depth) = cli.max_depth {
        parse = parse.max_depth(depth);
    }
    let mode = if cli.soft {
        FailureMode::ReturnOriginal
    } else {
        FailureMode::Abort
    };
    OperationOptions::default()
        .parse(parse)
        .failure_mode(mode)
        .declaration(cli.declaration.into())
}

/// Writes an append or delete result and maps it to an exit code.
fn finish_edit(cli: &Cli, result: Result<Outcome, xmlsplice::Error>) -> u8 {
    let outcome = match result {
        Ok(outcome) => outcome,
        Err(e) => {
            eprintln!("{e}");
            return EXIT_OPERATION_ERROR;
        }
    };
    if !write_output(cli, &outcome.document) {
        return EXIT_IO_ERROR;
    }
    match outcome.status {
        Status::Applied { .. } => EXIT_SUCCESS,
        Status::NoMatch if cli.fail_on_no_match => EXIT_NO_MATCH,
        Status::NoMatch => EXIT_SUCCESS,
        Status::Recovered(e) => {
            eprintln!("{e}");
            EXIT_OPERATION_ERROR
        }
    }
}

// ---------------------------------------------------------------------------
// Input / output
// ---------------------------------------------------------------------------

fn read_input(filename: &str) -> io::Result<Vec<u8>> {
    if filename == "-" {
        let mut buf = Vec::new();
        io::stdin().read_to_end(&mut buf)?;
        Ok(buf)
    } else {
        fs::read(filename)
    }
}

/// Reads and decodes a file, reporting failures on stderr.
fn read_document(filename: &str) -> Option<String> {
    let bytes = match read_input(filename) {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("{filename}: failed to read: {e}");
            return None;
        }
    };
    match decode_to_utf8(&bytes) {
        Ok(text) => Some(text),
        Err(e) => {
            eprintln!("{filename}: {e}");
            None
        }
    }
}

fn write_output(cli: &Cli, content: &str) -> bool {
    if let Some(ref output_file) = cli.output {
        if let Err(e) = fs::write(output_file, content) {
            eprintln!("{output_file}: failed to write: {e}");
            return false;
        }
    } else {
        let mut stdout = io::stdout().lock();
        if let Err(e) = stdout.write_all(content.as_bytes()).and_then(|()| stdout.flush()) {
            eprintln!("failed to write output: {e}");
            return false;
        }
    }
    true
}
