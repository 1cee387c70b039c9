//! `tila token` - extraction service token in the system keychain.

use std::io::{self, BufRead};
use std::path::Path;

use clap::Subcommand;
use tila_config::settings::DEFAULT_TOKEN_ENV;
use tila_config::token::{delete_token, set_token};
use tila_config::{lookup_token, AppConfig, TokenSource};

use crate::util::to_json;
use crate::CliError;

#[derive(Subcommand)]
pub enum TokenCommands {
    /// Store a token read from stdin
    #[command(after_help = "\
Examples:
  echo \"$TOKEN\" | tila token set")]
    Set,

    /// Remove the stored token
    Delete,

    /// Report where the token would be read from (never prints it)
    #[command(after_help = "\
Examples:
  tila token status
  tila token status --json")]
    Status {
        /// Output JSON
        #[arg(long)]
        json: bool,
    },
}

/// Environment variable to fall back on: from the config when one loads,
/// else the default.
fn token_env(config_path: Option<&Path>) -> String {
    let path = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(AppConfig::default_path);
    match AppConfig::load(&path) {
        Ok(config) => config.service.token_env,
        Err(e) => {
            log::debug!("no usable config ({}), using ${}", e, DEFAULT_TOKEN_ENV);
            DEFAULT_TOKEN_ENV.to_string()
        }
    }
}

pub fn cmd_token(cmd: TokenCommands, config_path: Option<&Path>) -> Result<(), CliError> {
    match cmd {
        TokenCommands::Set => {
            let mut line = String::new();
            io::stdin()
                .lock()
                .read_line(&mut line)
                .map_err(|e| CliError::io(format!("cannot read stdin: {e}")))?;
            let token = line.trim();
            if token.is_empty() {
                return Err(CliError::usage("no token on stdin"));
            }
            set_token(token).map_err(CliError::config)?;
            eprintln!("token stored in keychain");
        }
        TokenCommands::Delete => {
            delete_token().map_err(CliError::config)?;
            eprintln!("token removed from keychain");
        }
        TokenCommands::Status { json } => {
            let env = token_env(config_path);
            let lookup = lookup_token(&env);
            let present = lookup.source != TokenSource::None;
            if json {
                let status = serde_json::json!({
                    "token": if present { "present" } else { "missing" },
                    "source": lookup.source.as_str(),
                    "env": env,
                });
                println!("{}", to_json(&status)?);
            } else {
                println!("token:  {}", if present { "present" } else { "missing" });
                println!("source: {}", lookup.source.as_str());
                println!("env:    ${}", env);
            }
        }
    }
    Ok(())
}
