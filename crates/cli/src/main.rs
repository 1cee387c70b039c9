// tila - TILA disclosure reconciliation from the command line

mod cache;
mod exit_codes;
mod extract;
mod notify;
mod reconcile;
mod show;
mod token;
mod util;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use tila_client::{ExtractError, NotifyError};
use tila_config::ConfigError;
use tila_recon::{NotAvailablePolicy, ReconError, RecordKind, UnmatchedPolicy};

use exit_codes::*;

#[derive(Parser)]
#[command(name = "tila")]
#[command(about = "Reconcile TILA disclosures against loan spreadsheets")]
#[command(long_version = long_version())]
#[command(version)]
struct Cli {
    /// Config file (default: ./tila.toml, then the user config directory)
    #[arg(long, short = 'c', global = true, env = "TILA_CONFIG")]
    config: Option<PathBuf>,

    /// Log progress to stderr (RUST_LOG overrides)
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract records from the configured documents and spreadsheets
    #[command(after_help = "\
Unchanged files are served from the extraction cache. Each failed document
is reported on stderr; the rest of the batch still runs.

Examples:
  tila extract
  tila extract --only documents
  tila extract --only sheets --offline
  tila extract --refresh --fail-fast")]
    Extract {
        /// Extract one source only
        #[arg(long, value_enum)]
        only: Option<SourceArg>,

        /// Never call the extraction service; sheets use their header row
        #[arg(long)]
        offline: bool,

        /// Ignore cached entries and extract again
        #[arg(long)]
        refresh: bool,

        /// Cancel the remaining documents after the first failure
        #[arg(long)]
        fail_fast: bool,

        /// Output JSON summary to stdout
        #[arg(long)]
        json: bool,
    },

    /// Reconcile extracted records and print the mismatch report
    #[command(after_help = "\
Exits 0 when every matched account agrees, 3 when any account has incorrect data.

Examples:
  tila reconcile
  tila reconcile --three-way
  tila reconcile --not-available skip --unmatched report
  tila reconcile --json --output result.json
  tila reconcile --notify")]
    Reconcile {
        /// Compare fee fields across TILA, loan document and spreadsheet
        #[arg(long)]
        three_way: bool,

        /// Spreadsheet to reconcile against (name or path; default: first)
        #[arg(long)]
        sheet: Option<String>,

        /// Override policy.not_available
        #[arg(long, value_enum)]
        not_available: Option<NotAvailableArg>,

        /// Override policy.unmatched
        #[arg(long, value_enum)]
        unmatched: Option<UnmatchedArg>,

        /// Output JSON to stdout instead of the text report
        #[arg(long)]
        json: bool,

        /// Write JSON output to file
        #[arg(long)]
        output: Option<PathBuf>,

        /// Send one notification per mismatch (failures are logged only)
        #[arg(long)]
        notify: bool,
    },

    /// Show one extracted TILA document, or its comparison table
    #[command(after_help = "\
DOCUMENT is a configured name, a file name, a path, or an account number.

Examples:
  tila show 'Loan 100'
  tila show 100.pdf --text
  tila show 100.pdf --compare
  tila show 100 --compare --three-way")]
    Show {
        document: String,

        /// Compare against the matching spreadsheet row
        #[arg(long)]
        compare: bool,

        /// Include the loan document in the comparison
        #[arg(long, requires = "compare")]
        three_way: bool,

        /// Print the full text captured at extraction
        #[arg(long, conflicts_with = "compare")]
        text: bool,

        /// Spreadsheet to compare against (name or path; default: first)
        #[arg(long)]
        sheet: Option<String>,

        /// Output JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Send a mismatch notification for one loan
    #[command(after_help = "\
Categories: borrower, apr, finance-charge, amount-financed, total-of-payments,
monthly-payment-amount, number-of-payments, returned-payment-fee,
origination-fee, late-charges

Examples:
  tila notify 1001 late-charges --dry-run
  tila notify 1001 apr")]
    Notify {
        /// Loan identifier
        loan_id: String,

        /// Mismatch category
        category: String,

        /// Print the message instead of sending it
        #[arg(long)]
        dry_run: bool,

        /// Output JSON (with --dry-run)
        #[arg(long)]
        json: bool,
    },

    /// Validate the config file and check that every listed file exists
    #[command(after_help = "\
Examples:
  tila validate
  tila validate --config ./april/tila.toml")]
    Validate,

    /// Inspect or clear the extraction cache
    #[command(subcommand)]
    Cache(cache::CacheCommands),

    /// Manage the extraction service token in the system keychain
    #[command(subcommand)]
    Token(token::TokenCommands),
}

/// Record source selector.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum SourceArg {
    /// TILA documents
    Documents,
    /// Loan documents
    Loan,
    /// Spreadsheets
    Sheets,
}

impl SourceArg {
    pub fn kind(self) -> RecordKind {
        match self {
            SourceArg::Documents => RecordKind::TilaDocument,
            SourceArg::Loan => RecordKind::LoanDocument,
            SourceArg::Sheets => RecordKind::SpreadsheetRow,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum NotAvailableArg {
    Mismatch,
    Skip,
}

impl From<NotAvailableArg> for NotAvailablePolicy {
    fn from(arg: NotAvailableArg) -> Self {
        match arg {
            NotAvailableArg::Mismatch => NotAvailablePolicy::Mismatch,
            NotAvailableArg::Skip => NotAvailablePolicy::Skip,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum UnmatchedArg {
    Exclude,
    Report,
}

impl From<UnmatchedArg> for UnmatchedPolicy {
    fn from(arg: UnmatchedArg) -> Self {
        match arg {
            UnmatchedArg::Exclude => UnmatchedPolicy::Exclude,
            UnmatchedArg::Report => UnmatchedPolicy::Report,
        }
    }
}

fn long_version() -> &'static str {
    if cfg!(debug_assertions) {
        concat!(
            env!("CARGO_PKG_VERSION"),
            " (", env!("GIT_COMMIT_HASH"), ")",
            "\nengine:  tila-recon ", env!("CARGO_PKG_VERSION"),
            "\nbuild:   debug",
            "\ntarget:  ", env!("TARGET"),
        )
    } else {
        concat!(
            env!("CARGO_PKG_VERSION"),
            " (", env!("GIT_COMMIT_HASH"), ")",
            "\nengine:  tila-recon ", env!("CARGO_PKG_VERSION"),
            "\nbuild:   release",
            "\ntarget:  ", env!("TARGET"),
        )
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "info" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default))
        .target(env_logger::Target::Stderr)
        .format_timestamp(None)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = run(cli);

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let config_path = cli.config;
    let config = || util::load_config(config_path.as_deref());

    match cli.command {
        Commands::Extract { only, offline, refresh, fail_fast, json } => {
            extract::cmd_extract(&config()?, only, offline, refresh, fail_fast, json)
        }
        Commands::Reconcile { three_way, sheet, not_available, unmatched, json, output, notify } => {
            reconcile::cmd_reconcile(
                &config()?,
                reconcile::ReconcileArgs {
                    three_way,
                    sheet,
                    not_available,
                    unmatched,
                    json,
                    output,
                    notify,
                },
            )
        }
        Commands::Show { document, compare, three_way, text, sheet, json } => {
            let view = if text {
                show::View::Text
            } else if compare {
                show::View::Compare { three_way }
            } else {
                show::View::Record
            };
            show::cmd_show(&config()?, &document, view, sheet.as_deref(), json)
        }
        Commands::Notify { loan_id, category, dry_run, json } => {
            notify::cmd_notify(&config()?, &loan_id, &category, dry_run, json)
        }
        Commands::Validate => util::cmd_validate(&config()?),
        Commands::Cache(cmd) => cache::cmd_cache(&config()?, cmd),
        // Token management works without a config file.
        Commands::Token(cmd) => token::cmd_token(cmd, config_path.as_deref()),
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn new(code: u8, msg: impl Into<String>) -> Self {
        Self { code, message: msg.into(), hint: None }
    }

    pub fn usage(msg: impl Into<String>) -> Self {
        Self::new(EXIT_USAGE, msg)
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self::new(EXIT_ERROR, msg)
    }

    /// Create error from a config error with proper exit code.
    pub fn config(err: ConfigError) -> Self {
        let code = config_exit_code(&err);
        let hint = match &err {
            ConfigError::MissingToken(env) => Some(format!(
                "set ${} or store a token with `tila token set`",
                env
            )),
            ConfigError::Io(_) => Some("pass --config or create ./tila.toml".to_string()),
            _ => None,
        };
        Self { code, message: err.to_string(), hint }
    }

    pub fn recon(err: ReconError) -> Self {
        let code = recon_exit_code(&err);
        let hint = match &err {
            ReconError::MissingPrerequisite(_) => Some("run `tila extract` first".to_string()),
            ReconError::Busy => Some("wait for the running reconciliation to finish".to_string()),
            _ => None,
        };
        Self { code, message: err.to_string(), hint }
    }

    pub fn extract(err: ExtractError) -> Self {
        let code = extract_exit_code(&err);
        let hint = match &err {
            ExtractError::Timeout(_) => Some("raise service.timeout_secs in the config".to_string()),
            ExtractError::Http(401, _) | ExtractError::Http(403, _) => {
                Some("check the API token (`tila token status`)".to_string())
            }
            _ => None,
        };
        Self { code, message: err.to_string(), hint }
    }

    pub fn notify(err: NotifyError) -> Self {
        Self::new(notify_exit_code(&err), err.to_string())
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}
