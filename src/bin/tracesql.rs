//! tracesql: rebuild runnable SQL from traced statements
//!
//! # Usage
//!
//! ```bash
//! # DECLARE block (or inline fallback) from SQL + EXEC parameter list
//! tracesql generate --sql "SELECT @0, @1" --exec "@0=7,@1=N'AB'"
//!
//! # Read the SQL from a file, the EXEC text from stdin
//! tracesql generate --sql-file query.sql --exec-file -
//!
//! # How would a literal be typed?
//! tracesql classify "N'AB'" 0xA0FF 12.340
//! ```

use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::*;
use tracing_subscriber::EnvFilter;
use tracesql::prelude::*;

#[derive(Parser)]
#[command(name = "tracesql")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Rebuild runnable SQL from traced sp_executesql calls", long_about = None)]
#[command(after_help = "EXAMPLES:
    tracesql generate --sql 'SELECT @0' --exec '@0=7'
    tracesql generate --sql-file trace.sql --exec-file params.txt --policy strict
    tracesql classify \"N'AB'\" 0xA0FF 2147483648
    tracesql placeholders --sql-file trace.sql")]
struct Cli {
    /// Config file (default: ./tracesql.toml, then the user config dir)
    #[arg(long, global = true, env = "TRACESQL_CONFIG")]
    config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text", global = true)]
    output: OutputFormat,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Clone, Copy, ValueEnum)]
enum CliPolicy {
    VariantFallback,
    Strict,
}

impl From<CliPolicy> for DeclarePolicy {
    fn from(val: CliPolicy) -> Self {
        match val {
            CliPolicy::VariantFallback => DeclarePolicy::VariantFallback,
            CliPolicy::Strict => DeclarePolicy::Strict,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum CliDialect {
    Mssql,
    Generic,
    Postgres,
}

impl From<CliDialect> for Dialect {
    fn from(val: CliDialect) -> Self {
        match val {
            CliDialect::Mssql => Dialect::MsSql,
            CliDialect::Generic => Dialect::Generic,
            CliDialect::Postgres => Dialect::Postgres,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum CliKeywordCase {
    Upper,
    Lower,
}

impl From<CliKeywordCase> for KeywordCase {
    fn from(val: CliKeywordCase) -> Self {
        match val {
            CliKeywordCase::Upper => KeywordCase::Upper,
            CliKeywordCase::Lower => KeywordCase::Lower,
        }
    }
}

#[derive(Args)]
#[group(required = true, multiple = false)]
struct SqlInput {
    /// SQL text with @N placeholders
    #[arg(long)]
    sql: Option<String>,

    /// Read the SQL from a file (`-` for stdin)
    #[arg(long, value_name = "PATH")]
    sql_file: Option<PathBuf>,
}

#[derive(Args)]
#[group(required = false, multiple = false)]
struct ExecInput {
    /// EXEC parameter list, e.g. "@0=7,@1=N'AB'"
    #[arg(long)]
    exec: Option<String>,

    /// Read the EXEC text from a file (`-` for stdin)
    #[arg(long, value_name = "PATH")]
    exec_file: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a DECLARE block or inline the parameter values
    Generate {
        #[command(flatten)]
        sql: SqlInput,

        #[command(flatten)]
        exec: ExecInput,

        /// How to treat parameters with uncertain types
        #[arg(long, value_enum)]
        policy: Option<CliPolicy>,

        /// Skip the SQL formatter
        #[arg(long)]
        no_format: bool,

        /// Dialect used by the formatter
        #[arg(long, value_enum)]
        dialect: Option<CliDialect>,

        /// Keyword casing used by the formatter
        #[arg(long, value_enum)]
        keyword_case: Option<CliKeywordCase>,
    },
    /// Show how literal tokens are typed
    Classify {
        /// Tokens exactly as they appear after `=`
        #[arg(required = true)]
        tokens: Vec<String>,
    },
    /// List the placeholders a SQL statement references
    Placeholders {
        #[command(flatten)]
        sql: SqlInput,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(&cli) {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run(cli: &Cli) -> Result<()> {
    match &cli.command {
        Commands::Generate {
            sql,
            exec,
            policy,
            no_format,
            dialect,
            keyword_case,
        } => {
            let mut config = Config::load(cli.config.as_deref())?;
            if let Some(policy) = policy {
                config.generate.policy = (*policy).into();
            }
            if *no_format {
                config.format.enabled = false;
            }
            if let Some(dialect) = dialect {
                config.format.dialect = (*dialect).into();
            }
            if let Some(case) = keyword_case {
                config.format.keyword_case = (*case).into();
            }

            let sql_text = read_input(sql.sql.as_deref(), sql.sql_file.as_deref())?;
            let exec_text = read_input(exec.exec.as_deref(), exec.exec_file.as_deref())?;
            let result = config.generator().generate(&sql_text, &exec_text);
            print_result(&result, cli)
        }
        Commands::Classify { tokens } => classify_tokens(tokens, cli.output),
        Commands::Placeholders { sql } => {
            let sql_text = read_input(sql.sql.as_deref(), sql.sql_file.as_deref())?;
            list_placeholders(&sql_text, cli.output)
        }
    }
}

/// Inline text wins; otherwise read the file (or stdin for `-`); otherwise empty.
fn read_input(text: Option<&str>, file: Option<&Path>) -> Result<String> {
    if let Some(text) = text {
        return Ok(text.to_string());
    }
    match file {
        Some(path) if path == Path::new("-") => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read stdin")?;
            Ok(buf)
        }
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display())),
        None => Ok(String::new()),
    }
}

fn print_result(result: &GenerationResult, cli: &Cli) -> Result<()> {
    match cli.output {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(result)?);
        }
        OutputFormat::Text => {
            if cli.verbose {
                let mode = match result.mode {
                    Mode::Declare => "declare",
                    Mode::Inline => "inline",
                };
                eprintln!("{} {}", "Mode:".dimmed(), mode.cyan());
            }
            println!("{}", result.output_sql);
            for warning in &result.warnings {
                eprintln!("{} {}", "⚠".yellow(), warning.yellow());
            }
        }
    }
    Ok(())
}

fn classify_tokens(tokens: &[String], format: OutputFormat) -> Result<()> {
    let results: Vec<(&str, Classification)> =
        tokens.iter().map(|t| (t.as_str(), classify(t))).collect();

    match format {
        OutputFormat::Json => {
            let json: Vec<serde_json::Value> = results
                .iter()
                .map(|(token, c)| {
                    serde_json::json!({
                        "token": token,
                        "classification": c,
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        OutputFormat::Text => {
            for (token, c) in &results {
                println!("{}", token.white().bold());
                let ty = c
                    .inferred_type
                    .map(|t| t.to_string())
                    .unwrap_or_else(|| "-".to_string());
                println!("  {} {}", "Type:".dimmed(), ty.cyan());
                println!(
                    "  {} {}",
                    "Literal:".dimmed(),
                    c.normalized_literal.as_deref().unwrap_or("-").yellow()
                );
                let confident = if c.confident { "yes".green() } else { "no".red() };
                println!("  {} {}", "Confident:".dimmed(), confident);
                if let Some(err) = &c.parse_error {
                    println!("  {} {}", "Error:".dimmed(), err.to_string().red());
                }
            }
        }
    }
    Ok(())
}

fn list_placeholders(sql: &str, format: OutputFormat) -> Result<()> {
    let refs = collect_placeholders(sql);
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&refs)?),
        OutputFormat::Text => {
            if refs.is_empty() {
                println!("{}", "(no placeholders)".dimmed());
            }
            for r in &refs {
                println!("{}", r.name.cyan());
            }
        }
    }
    Ok(())
}
