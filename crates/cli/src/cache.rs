//! `tila cache` - inspect or clear the extraction cache.

use clap::Subcommand;
use tila_config::AppConfig;

use crate::util::{open_cache, to_json};
use crate::{CliError, SourceArg};

#[derive(Subcommand)]
pub enum CacheCommands {
    /// Count cached entries per section
    #[command(after_help = "\
Examples:
  tila cache stats
  tila cache stats --json")]
    Stats {
        /// Output JSON
        #[arg(long)]
        json: bool,
    },

    /// Drop cached entries so the next extract runs again
    #[command(after_help = "\
Examples:
  tila cache clear
  tila cache clear --only sheets")]
    Clear {
        /// Clear one section only
        #[arg(long, value_enum)]
        only: Option<SourceArg>,
    },

    /// Print the cache file path
    Path,
}

pub fn cmd_cache(config: &AppConfig, cmd: CacheCommands) -> Result<(), CliError> {
    let mut cache = open_cache(config)?;
    match cmd {
        CacheCommands::Stats { json } => {
            let stats = cache.stats();
            if json {
                println!("{}", to_json(&stats)?);
            } else {
                println!("documents:       {}", stats.documents);
                println!("loan documents:  {}", stats.loan_documents);
                println!(
                    "spreadsheets:    {} ({} rows)",
                    stats.spreadsheets, stats.spreadsheet_rows
                );
            }
        }
        CacheCommands::Clear { only } => {
            cache.clear(only.map(SourceArg::kind));
            cache.save().map_err(CliError::config)?;
            eprintln!("cleared {}", cache.path().display());
        }
        CacheCommands::Path => println!("{}", cache.path().display()),
    }
    Ok(())
}
