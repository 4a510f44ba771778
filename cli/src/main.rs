mod config;
mod test_runner;

use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use codespan_reporting::diagnostic::Diagnostic;
use codespan_reporting::files::SimpleFiles;
use codespan_reporting::term;
use codespan_reporting::term::termcolor::{ColorChoice, StandardStream};
use tracing::debug;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use posting::{Build, BuildError, BuildOptions, Runtime, ScanError};

use config::ProjectConfig;

const SUBCOMMANDS: &[&str] = &["build", "test", "tag", "help"];

#[derive(Parser)]
#[command(name = "posting", version, about = "Macro-expanding static site builder")]
struct Cli {
    /// Disable colored error output
    #[arg(long, global = true)]
    no_color: bool,

    /// Log build progress (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build an entry document and everything it includes
    Build(BuildArgs),

    /// Run .test.op test files
    Test(TestArgs),

    /// Compile ptag source and print the result
    Tag(TagArgs),
}

#[derive(clap::Args)]
struct BuildArgs {
    /// Entry document
    entry: PathBuf,

    /// Project root (default: the entry's directory)
    #[arg(long)]
    project_path: Option<PathBuf>,

    /// Output directory, relative to the project root (default: "out")
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// Extension of output files (default: ".html")
    #[arg(long)]
    suffix: Option<String>,

    /// Overwrite existing output files
    #[arg(short, long)]
    force: bool,

    /// Extra command directories, searched in order. Repeatable or ';'-separated.
    #[arg(short = 'I', long, value_delimiter = ';')]
    search_path: Vec<PathBuf>,

    /// Expand every document without writing outputs (exit 0 if valid)
    #[arg(long)]
    check: bool,
}

#[derive(clap::Args)]
struct TestArgs {
    /// Path to a .test.op file or directory containing them
    path: String,

    /// Run only tests in these categories (subfolder names). Repeatable.
    #[arg(short, long)]
    category: Vec<String>,

    /// List available categories and exit
    #[arg(long)]
    list_categories: bool,
}

#[derive(clap::Args)]
struct TagArgs {
    /// Statements to compile, one per line or separated by ';'
    source: String,

    /// Compile as patterns instead of building tag values
    #[arg(short, long)]
    pattern: bool,
}

fn main() {
    // `posting file.op` means `posting build file.op`.
    let mut args: Vec<String> = std::env::args().collect();
    if let Some(pos) = args.iter().skip(1).position(|a| !a.starts_with('-')) {
        let pos = pos + 1;
        if !SUBCOMMANDS.contains(&args[pos].as_str()) {
            args.insert(pos, "build".to_string());
        }
    }

    let cli = Cli::parse_from(&args);
    init_tracing(cli.verbose);
    let color = if cli.no_color {
        ColorChoice::Never
    } else {
        ColorChoice::Auto
    };

    let exit_code = match cli.command {
        Command::Build(build_args) => do_build(build_args, color),
        Command::Test(test_args) => {
            let path = Path::new(&test_args.path);
            if test_args.list_categories {
                test_runner::list_categories(path);
                return;
            }
            test_runner::run_tests(path, cli.no_color, &test_args.category)
        }
        Command::Tag(tag_args) => do_tag(tag_args, color),
    };
    process::exit(exit_code);
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .with(filter)
        .init();
}

fn do_build(args: BuildArgs, color: ColorChoice) -> i32 {
    let entry = match args.entry.canonicalize() {
        Ok(entry) => entry,
        Err(e) => {
            eprintln!("error: cannot read '{}': {}", args.entry.display(), e);
            return 1;
        }
    };
    let project_root = args
        .project_path
        .clone()
        .or_else(|| entry.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."));

    let config = match ProjectConfig::load(&project_root) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {}", e);
            return 1;
        }
    };

    let mut runtime = Runtime::new();
    for dir in config::user_commands_dir()
        .into_iter()
        .chain(config.search_path)
        .chain(args.search_path)
    {
        runtime.registry.add_search_dir(dir);
    }

    let defaults = BuildOptions::default();
    let options = BuildOptions {
        out_dir: args.out.or(config.out).unwrap_or(defaults.out_dir),
        suffix: args.suffix.or(config.suffix).unwrap_or(defaults.suffix),
        force: args.force || config.force,
        write: !args.check,
    };
    debug!(
        root = %project_root.display(),
        out = %options.out_dir.display(),
        search_path = ?runtime.registry.search_path(),
        "build options"
    );

    let result = Build::new(&project_root, options, runtime).and_then(|mut build| {
        build.include(&entry)?;
        build.build_all()?;
        Ok(build)
    });

    match result {
        Ok(build) => {
            if args.check {
                eprintln!("ok: {} document(s) expanded", build.documents().len());
            }
            0
        }
        Err(BuildError::Scan(error)) => {
            emit_scan_error(&error, color);
            1
        }
        Err(error) => {
            eprintln!("error: {}", error);
            1
        }
    }
}

fn do_tag(args: TagArgs, color: ColorChoice) -> i32 {
    let result = if args.pattern {
        ptag::compile_patterns(&args.source).map(|patterns| {
            println!("ok: {} pattern(s)", patterns.len());
        })
    } else {
        ptag::build_expressions(&args.source, |tag| println!("{}", tag)).map(|_| ())
    };

    match result {
        Ok(()) => 0,
        Err(error) => {
            let mut files = SimpleFiles::new();
            let file_id = files.add("<tag>".to_string(), args.source.clone());
            emit(color, &files, &error.to_diagnostic(file_id));
            1
        }
    }
}

/// Render a scan error against its document, or as plain text if the
/// document can no longer be read.
fn emit_scan_error(error: &ScanError, color: ColorChoice) {
    let Ok(source) = std::fs::read_to_string(&error.file) else {
        eprintln!("error: {}", error);
        for cause in error.causes() {
            eprintln!("  caused by: {}", cause);
        }
        return;
    };
    let mut files = SimpleFiles::new();
    let file_id = files.add(error.file.clone(), source);
    emit(color, &files, &error.to_diagnostic(file_id));
}

fn emit(color: ColorChoice, files: &SimpleFiles<String, String>, diagnostic: &Diagnostic<usize>) {
    let writer = StandardStream::stderr(color);
    let config = term::Config::default();
    let _ = term::emit_to_write_style(&mut writer.lock(), &config, files, diagnostic);
}
