//! `tila notify` - send one mismatch notification.

use tila_client::{compose_message, MismatchCategory, Notifier, RelayNotifier};
use tila_config::token::env_token;
use tila_config::AppConfig;

use crate::exit_codes::EXIT_NOTIFY_NOT_CONFIGURED;
use crate::util::to_json;
use crate::CliError;

pub fn cmd_notify(
    config: &AppConfig,
    loan_id: &str,
    category: &str,
    dry_run: bool,
    json: bool,
) -> Result<(), CliError> {
    let category = MismatchCategory::from_slug(category).ok_or_else(|| {
        let slugs: Vec<String> = MismatchCategory::ALL.iter().map(|c| c.slug()).collect();
        CliError::usage(format!("unknown category: \"{}\"", category))
            .with_hint(format!("categories: {}", slugs.join(", ")))
    })?;
    if loan_id.trim().is_empty() {
        return Err(CliError::usage("loan id must not be empty"));
    }

    let notify = config.notify.as_ref().ok_or_else(|| {
        CliError::new(EXIT_NOTIFY_NOT_CONFIGURED, "no [notify] section in the config")
            .with_hint("add endpoint, recipient and sender under [notify]")
    })?;
    let message = compose_message(loan_id.trim(), category, &notify.recipient, &notify.sender);

    if dry_run {
        if json {
            println!("{}", to_json(&message)?);
        } else {
            println!("To:      {}", message.to);
            println!("From:    {}", message.from);
            println!("Subject: {}", message.subject);
            println!();
            print!("{}", message.body);
        }
        return Ok(());
    }

    let token = notify.token_env.as_deref().and_then(env_token);
    let notifier = RelayNotifier::new(&notify.endpoint, token, config.service.timeout())
        .map_err(CliError::notify)?;
    notifier.send(&message).map_err(CliError::notify)?;
    eprintln!("sent: {}", message.subject);
    Ok(())
}
