use serde::Serialize;
use std::io::Write;
use std::path::Path;
use tracing_subscriber::EnvFilter;
use trparity_core::{
    ExtractOptions, compare, extract_embedded_file, extract_source_file, read_canonical_array,
    render_annotated_html,
};

const LOG_ENV: &str = "TRPARITY_LOG";

#[derive(Debug)]
enum CliError {
    Usage(&'static str),
    Io(std::io::Error),
    Core(trparity_core::Error),
    Json(serde_json::Error),
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::Usage(msg) => write!(f, "{msg}"),
            CliError::Io(err) => write!(f, "I/O error: {err}"),
            CliError::Core(err) => write!(f, "{err}"),
            CliError::Json(err) => write!(f, "JSON error: {err}"),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<trparity_core::Error> for CliError {
    fn from(value: trparity_core::Error) -> Self {
        Self::Core(value)
    }
}

impl From<serde_json::Error> for CliError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

impl CliError {
    /// Extractors separate validation (1) from structural (2) failures; the comparator treats
    /// every failure to load its inputs as 2 so that 1 always means "parity does not hold".
    fn exit_code(&self, command: Command) -> i32 {
        match (self, command) {
            (CliError::Usage(_), _) => 2,
            (_, Command::Compare) => 2,
            (CliError::Core(err), _) => err.exit_code(),
            (CliError::Io(_) | CliError::Json(_), _) => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Extract,
    ExtractEmbedded,
    Annotate,
    Compare,
}

#[derive(Debug)]
struct Args {
    command: Command,
    inputs: Vec<String>,
    pretty: bool,
    out: Option<String>,
    title: Option<String>,
    placeholder: Option<String>,
    annotation_prefix: Option<String>,
}

fn usage() -> &'static str {
    "trparity\n\
\n\
USAGE:\n\
  trparity extract [--pretty] [--out <path>] [--placeholder <segment>] <source.xml>\n\
  trparity extract-embedded [--pretty] [--out <path>] [--annotation-prefix <p>] <artifact.html>\n\
  trparity annotate [--out <path>] [--title <text>] [--annotation-prefix <p>] <source.xml>\n\
  trparity compare [--pretty] [--out <diff.json>] <reference.json> <subject.json>\n\
\n\
NOTES:\n\
  - extract and extract-embedded print the canonical record array to stdout (or --out).\n\
  - extract exits 1 for unreadable or malformed input and 2 for structurally empty input.\n\
  - compare prints a summary and exits 0 when parity holds, 1 when it does not, 2 on I/O errors.\n\
  - Set TRPARITY_LOG (e.g. `debug`, `trparity_core=trace`) to adjust stderr logging.\n\
"
}

fn parse_args(argv: &[String]) -> Result<Args, CliError> {
    let mut it = argv.iter().skip(1);
    let command = match it.next().map(String::as_str) {
        Some("extract") => Command::Extract,
        Some("extract-embedded") => Command::ExtractEmbedded,
        Some("annotate") => Command::Annotate,
        Some("compare") => Command::Compare,
        _ => return Err(CliError::Usage(usage())),
    };
    let mut args = Args {
        command,
        inputs: Vec::new(),
        pretty: false,
        out: None,
        title: None,
        placeholder: None,
        annotation_prefix: None,
    };

    while let Some(a) = it.next() {
        match a.as_str() {
            "--help" | "-h" => return Err(CliError::Usage(usage())),
            "--pretty" => args.pretty = true,
            "--out" => {
                let Some(out) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                args.out = Some(out.clone());
            }
            "--title" if command == Command::Annotate => {
                let Some(title) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                args.title = Some(title.clone());
            }
            "--placeholder" if command == Command::Extract => {
                let Some(segment) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                if segment.trim().is_empty() || segment.contains(['/', '|']) {
                    return Err(CliError::Usage(usage()));
                }
                args.placeholder = Some(segment.clone());
            }
            "--annotation-prefix"
                if matches!(command, Command::ExtractEmbedded | Command::Annotate) =>
            {
                let Some(prefix) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                if prefix.trim().is_empty() {
                    return Err(CliError::Usage(usage()));
                }
                args.annotation_prefix = Some(prefix.clone());
            }
            "--" => {
                args.inputs.extend(it.by_ref().cloned());
            }
            other if other.starts_with('-') => return Err(CliError::Usage(usage())),
            path => args.inputs.push(path.to_string()),
        }
    }

    let expected_inputs = if command == Command::Compare { 2 } else { 1 };
    if args.inputs.len() != expected_inputs {
        return Err(CliError::Usage(usage()));
    }
    Ok(args)
}

/// Writes to `out`, or stdout when absent. A closed stdout pipe surfaces as `CliError::Io`.
fn write_text(text: &str, out: Option<&str>) -> Result<(), CliError> {
    match out {
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(text.as_bytes())?;
            stdout.flush()?;
            Ok(())
        }
        Some(path) => {
            std::fs::write(path, text)?;
            Ok(())
        }
    }
}

fn write_json(value: &impl Serialize, pretty: bool, out: Option<&str>) -> Result<(), CliError> {
    let mut text = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    text.push('\n');
    write_text(&text, out)
}

fn extract_options(args: &Args) -> ExtractOptions {
    let mut options = ExtractOptions::new();
    if let Some(segment) = &args.placeholder {
        options = options.with_placeholder_segment(segment.as_str());
    }
    if let Some(prefix) = &args.annotation_prefix {
        options = options.with_annotation_prefix(prefix.as_str());
    }
    options
}

fn default_title(input: &Path) -> String {
    input
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "Test results".to_string())
}

fn run(args: &Args) -> Result<i32, CliError> {
    let options = extract_options(args);
    let input = Path::new(&args.inputs[0]);

    match args.command {
        Command::Extract => {
            let records = extract_source_file(input, &options)?;
            write_json(&records, args.pretty, args.out.as_deref())?;
            Ok(0)
        }
        Command::ExtractEmbedded => {
            let extraction = extract_embedded_file(input, &options)?;
            write_json(&extraction.records, args.pretty, args.out.as_deref())?;
            Ok(0)
        }
        Command::Annotate => {
            let records = extract_source_file(input, &options)?;
            let title = args.title.clone().unwrap_or_else(|| default_title(input));
            let html = render_annotated_html(&records, &title, &options.annotation_prefix);
            write_text(&html, args.out.as_deref())?;
            Ok(0)
        }
        Command::Compare => {
            let reference = read_canonical_array(input)?;
            let subject = read_canonical_array(Path::new(&args.inputs[1]))?;
            let report = compare(&reference, &subject);
            if let Some(out) = args.out.as_deref() {
                write_json(&report, args.pretty, Some(out))?;
            }
            write_text(&format!("{}\n", report.summary), None)?;
            Ok(report.exit_code())
        }
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() {
    let args = match parse_args(&std::env::args().collect::<Vec<_>>()) {
        Ok(v) => v,
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(2);
        }
    };
    init_logging();

    match run(&args) {
        Ok(0) => {}
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(err.exit_code(args.command));
        }
    }
}
