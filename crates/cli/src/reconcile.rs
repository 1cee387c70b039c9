//! `tila reconcile` - run one reconciliation pass over the cached records.

use std::path::PathBuf;

use tila_client::{compose_message, dispatch, MismatchCategory, RelayNotifier};
use tila_config::token::env_token;
use tila_config::AppConfig;
use tila_recon::report::render_report;
use tila_recon::{FieldMapping, ReconPolicy, ReconResult, THREE_WAY_FEES, TILA_VS_SPREADSHEET};

use crate::exit_codes::{EXIT_NOTIFY_NOT_CONFIGURED, EXIT_RECON_MISMATCH};
use crate::util::{load_state, open_cache, to_json, write_output};
use crate::{CliError, NotAvailableArg, UnmatchedArg};

pub struct ReconcileArgs {
    pub three_way: bool,
    pub sheet: Option<String>,
    pub not_available: Option<NotAvailableArg>,
    pub unmatched: Option<UnmatchedArg>,
    pub json: bool,
    pub output: Option<PathBuf>,
    pub notify: bool,
}

pub fn mapping(three_way: bool) -> &'static FieldMapping {
    if three_way {
        &THREE_WAY_FEES
    } else {
        &TILA_VS_SPREADSHEET
    }
}

pub fn cmd_reconcile(config: &AppConfig, args: ReconcileArgs) -> Result<(), CliError> {
    let policy = ReconPolicy {
        not_available: args
            .not_available
            .map_or(config.policy.not_available, Into::into),
        unmatched: args.unmatched.map_or(config.policy.unmatched, Into::into),
    };

    if args.notify && config.notify.is_none() {
        return Err(CliError::new(EXIT_NOTIFY_NOT_CONFIGURED, "--notify needs a [notify] section")
            .with_hint("add endpoint, recipient and sender under [notify] in the config"));
    }

    let cache = open_cache(config)?;
    let state = load_state(config, &cache, args.sheet.as_deref())?;
    let result = state
        .reconcile(mapping(args.three_way), policy)
        .map_err(CliError::recon)?;

    if let Some(path) = &args.output {
        write_output(path, &to_json(&result)?)?;
    }

    if args.json {
        println!("{}", to_json(&result)?);
    } else {
        print!("{}", render_report(&result));
        eprintln!(
            "{}: {} checked, {} with incorrect data, {} unmatched",
            result.meta.mapping,
            result.summary.total_checked,
            result.summary.total_mismatched,
            result.summary.unmatched,
        );
    }

    if args.notify {
        send_notifications(config, &result)?;
    }

    if result.summary.total_mismatched > 0 {
        return Err(CliError::new(
            EXIT_RECON_MISMATCH,
            format!(
                "{} account(s) with incorrect data",
                result.summary.total_mismatched
            ),
        ));
    }
    Ok(())
}

/// One message per mismatch record. Send failures are logged by `dispatch`
/// and never change the outcome of the run.
fn send_notifications(config: &AppConfig, result: &ReconResult) -> Result<(), CliError> {
    let Some(notify) = &config.notify else {
        return Ok(());
    };
    let token = notify.token_env.as_deref().and_then(env_token);
    let notifier =
        RelayNotifier::new(&notify.endpoint, token, config.service.timeout()).map_err(CliError::notify)?;

    let mut sent = 0;
    for bucket in &result.buckets {
        let Some(category) = MismatchCategory::from_label(&bucket.field) else {
            log::warn!("no notification category for '{}'", bucket.field);
            continue;
        };
        for record in &bucket.records {
            let message =
                compose_message(&record.identifier, category, &notify.recipient, &notify.sender);
            dispatch(&notifier, &message);
            sent += 1;
        }
    }
    if sent > 0 {
        eprintln!("dispatched {} notification(s) to {}", sent, notify.recipient);
    }
    Ok(())
}
