mod output;
mod settings;
mod test_runner;

use std::path::{Path, PathBuf};
use std::process;

use anyhow::Context;
use clap::{ArgAction, Parser, Subcommand};
use codespan_reporting::files::SimpleFiles;
use codespan_reporting::term;
use codespan_reporting::term::termcolor::{ColorChoice, StandardStream};
use tracing::info;
use tracing_subscriber::EnvFilter;

use cfgviz::Error;
use cfgviz::source::SourceLines;
use cfgviz::template::error::RuleError;
use linker::{CompiledSchema, Extractor};

use crate::output::Format;
use crate::settings::{DEFAULT_SETTINGS_FILE, Settings};

const SUBCOMMANDS: &[&str] = &["run", "check", "test", "help"];

/// Options whose value is the next argument.
const VALUE_OPTIONS: &[&str] = &[
    "-s",
    "--settings",
    "-f",
    "--format",
    "-o",
    "--output",
    "-c",
    "--category",
];

#[derive(Parser)]
#[command(
    name = "cfgviz",
    version,
    about = "Extract an entity graph from an indented configuration dump"
)]
struct Cli {
    /// Disable colored error output
    #[arg(long, global = true)]
    no_color: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Extract the graph from a configuration file
    Run(RunArgs),

    /// Compile the schema in a settings file without scanning anything
    Check(CheckArgs),

    /// Run .test.cfg fixture files
    Test(TestArgs),
}

#[derive(clap::Args)]
struct RunArgs {
    /// Configuration dump to read
    file: PathBuf,

    /// Settings file with the schema
    #[arg(short, long, default_value = DEFAULT_SETTINGS_FILE)]
    settings: PathBuf,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = Format::Json)]
    format: Format,

    /// Write output here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Scan rules and entities on all cores
    #[arg(long)]
    parallel: bool,
}

#[derive(clap::Args)]
struct CheckArgs {
    /// Settings file with the schema
    #[arg(short, long, default_value = DEFAULT_SETTINGS_FILE)]
    settings: PathBuf,
}

#[derive(clap::Args)]
struct TestArgs {
    /// Path to a .test.cfg file or directory containing them
    path: PathBuf,

    /// Run only fixtures in these categories (subfolder names). Repeatable.
    #[arg(short, long)]
    category: Vec<String>,

    /// List available categories and exit
    #[arg(long)]
    list_categories: bool,
}

fn main() {
    let args = with_run_shorthand(std::env::args().collect());
    let cli = Cli::parse_from(&args);
    init_logging(cli.verbose, cli.quiet);

    let color_choice = if cli.no_color {
        ColorChoice::Never
    } else {
        ColorChoice::Auto
    };

    let exit_code = match cli.command {
        Command::Run(run_args) => report(do_run(&run_args), color_choice),
        Command::Check(check_args) => report(do_check(&check_args.settings), color_choice),
        Command::Test(test_args) => {
            if test_args.list_categories {
                test_runner::list_categories(&test_args.path);
                0
            } else {
                test_runner::run_tests(&test_args.path, cli.no_color, &test_args.category)
            }
        }
    };
    process::exit(exit_code);
}

/// `cfgviz router.cfg` is shorthand for `cfgviz run router.cfg`.
///
/// `run` goes in front of the first option when one precedes the file, so
/// `cfgviz -s x.toml r.cfg` becomes `cfgviz run -s x.toml r.cfg`.
fn with_run_shorthand(mut args: Vec<String>) -> Vec<String> {
    let mut first_option = None;
    let mut index = 1;
    while index < args.len() {
        let arg = args[index].as_str();
        if !arg.starts_with('-') {
            if !SUBCOMMANDS.contains(&arg) {
                args.insert(first_option.unwrap_or(index), "run".to_string());
            }
            break;
        }
        if first_option.is_none() && VALUE_OPTIONS.contains(&arg) {
            first_option = Some(index);
        }
        index += if VALUE_OPTIONS.contains(&arg) { 2 } else { 1 };
    }
    args
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, 2) => "debug",
        (false, _) => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn do_run(args: &RunArgs) -> anyhow::Result<()> {
    let settings = Settings::load(&args.settings)?;
    let schema = CompiledSchema::compile(&settings.schema, settings.anchor)?;
    let source = SourceLines::load(&args.file, &settings.filter)?;

    let graph = Extractor::new(&schema)
        .with_limits(settings.limits)
        .parallel(args.parallel)
        .run(&source)?;

    let rendered = output::render(&graph, args.format)?;
    match &args.output {
        Some(path) => {
            std::fs::write(path, rendered)
                .with_context(|| format!("cannot write '{}'", path.display()))?;
            info!("graph saved as \"{}\"", path.display());
        }
        None => print!("{}", rendered),
    }
    Ok(())
}

fn do_check(settings_path: &Path) -> anyhow::Result<()> {
    let settings = Settings::load(settings_path)?;
    let schema = CompiledSchema::compile(&settings.schema, settings.anchor)?;
    let links: usize = schema.rules().iter().map(|r| r.links.len()).sum();
    eprintln!(
        "ok: {} node rule(s), {} link rule(s) in {}",
        schema.rules().len(),
        links,
        settings_path.display()
    );
    Ok(())
}

/// Print a failed command's error and turn the outcome into an exit code.
fn report(result: anyhow::Result<()>, color_choice: ColorChoice) -> i32 {
    let Err(error) = result else {
        return 0;
    };
    match error.downcast_ref::<Error>() {
        Some(Error::SchemaCompile(errors)) => emit_rule_errors(errors, color_choice),
        _ => eprintln!("error: {:#}", error),
    }
    1
}

/// Render template errors against their own template text, one virtual file per rule.
fn emit_rule_errors(errors: &[RuleError], color_choice: ColorChoice) {
    let writer = StandardStream::stderr(color_choice);
    let config = term::Config::default();
    let mut files = SimpleFiles::new();
    for error in errors {
        let file_id = files.add(
            format!("{}.template", error.origin),
            error.template.clone(),
        );
        let diagnostic = error.error.to_diagnostic(file_id);
        let _ = term::emit_to_write_style(&mut writer.lock(), &config, &files, &diagnostic);
    }
    eprintln!("error: schema has {} invalid template(s)", errors.len());
}
