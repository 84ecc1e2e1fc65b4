//! Subcommand implementations.

use std::future::Future;
use std::io;

use anyhow::{Context, bail};
use mailgate_core::cache::{self, FileCredentialCache};
use mailgate_core::{
    AppConfig, AuditLog, CredentialCache, Error, Mailer, Paths, Template, TemplateStore,
    TokenProvider,
};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::cli::{Cli, Command, SendArgs};
use crate::prompt::{ConsolePrompt, ask, open_browser};

const APP_REGISTRATIONS_URL: &str =
    "https://portal.azure.com/#blade/Microsoft_AAD_RegisteredApps/ApplicationsListBlade";

const RULE: &str = "============================================================";

/// Runs the parsed command line.
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let paths = Paths::new(cli.home_dir()?);
    paths
        .ensure_dirs()
        .with_context(|| format!("cannot prepare {}", paths.root.display()))?;
    debug!(home = %paths.root.display(), "Using home directory");

    match cli.command {
        Command::Send(args) => send(&paths, &args).await,
        Command::Templates => templates(&paths),
        Command::Log { limit } => log(&paths, limit),
        Command::Inbox { top } => inbox(&paths, top).await,
        Command::Setup => setup(&paths),
        Command::Logout => logout(&paths),
    }
}

/// Cancelled on the first Ctrl-C.
fn interrupt_token() -> CancellationToken {
    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });
    cancel
}

fn mailer(paths: &Paths, cancel: CancellationToken) -> anyhow::Result<Mailer> {
    let config = AppConfig::load(&paths.config_file)?;
    Ok(Mailer::from_config(&config, paths, Box::new(ConsolePrompt))?.with_cancellation(cancel))
}

/// Drives `work` until it completes or `cancel` fires. Dropping an
/// in-flight send leaves its pending audit entry behind.
async fn interruptible<T>(
    cancel: &CancellationToken,
    work: impl Future<Output = mailgate_core::Result<T>>,
) -> anyhow::Result<T> {
    tokio::select! {
        biased;
        () = cancel.cancelled() => {
            bail!("interrupted; an unfinished send is listed by `mailgate log`")
        }
        result = work => Ok(result?),
    }
}

/// Subject and body from the template, with explicit values taking
/// precedence.
pub fn compose(store: &TemplateStore, args: &SendArgs) -> anyhow::Result<Template> {
    let mut message = match &args.template {
        Some(name) => store.load(name)?,
        None => {
            let (Some(subject), Some(body)) = (&args.subject, &args.body) else {
                bail!("--subject and --body are required without --template");
            };
            return Ok(Template {
                subject: subject.clone(),
                body: body.clone(),
            });
        }
    };
    if let Some(subject) = &args.subject {
        message.subject.clone_from(subject);
    }
    if let Some(body) = &args.body {
        message.body.clone_from(body);
    }
    Ok(message)
}

async fn send(paths: &Paths, args: &SendArgs) -> anyhow::Result<()> {
    let message = compose(&TemplateStore::new(&paths.templates_dir), args)?;
    let cancel = interrupt_token();
    let mailer = mailer(paths, cancel.clone())?;

    println!("\nSending to {}...", args.to);
    let receipt = interruptible(
        &cancel,
        mailer.send(&args.to, &message.subject, &message.body),
    )
    .await?;

    println!("{RULE}");
    println!("SENT");
    println!("{RULE}");
    println!("To:      {}", receipt.record.recipient);
    println!("Subject: {}", receipt.record.subject);
    println!("Log:     {}", receipt.path.display());
    if receipt.record.outlook_flag {
        println!("Outlook: check your Sent Items folder");
    }
    for warning in &receipt.warnings {
        println!("Warning ({}): {}", warning.validator_id, warning.result.reason);
    }
    println!("{RULE}");
    Ok(())
}

fn templates(paths: &Paths) -> anyhow::Result<()> {
    let names = TemplateStore::new(&paths.templates_dir).list()?;
    if names.is_empty() {
        println!(
            "No templates found. Add .md files to {}",
            paths.templates_dir.display()
        );
        return Ok(());
    }
    println!("\nAvailable templates:");
    for name in names {
        println!("  - {name}");
    }
    println!();
    Ok(())
}

fn truncate(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

fn log(paths: &Paths, limit: usize) -> anyhow::Result<()> {
    let audit = AuditLog::new(&paths.sent_dir);
    let records = audit.list(limit)?;
    let pending = audit.pending()?;

    if records.is_empty() && pending.is_empty() {
        println!("No emails sent yet.");
        return Ok(());
    }

    if !records.is_empty() {
        println!("\nSent emails:");
        println!("{}", "-".repeat(80));
        for record in &records {
            println!(
                "  {} | {:30} | {} {}",
                truncate(&record.timestamp, 16),
                record.recipient,
                truncate(&record.subject, 30),
                if record.outlook_flag { "(Outlook)" } else { "" }
            );
        }
    }

    if !pending.is_empty() {
        println!("\nUnreconciled sends (outcome unknown, check Sent Items):");
        println!("{}", "-".repeat(80));
        for (path, record) in &pending {
            println!(
                "  {} | {:30} | {} | {}",
                truncate(&record.timestamp, 16),
                record.recipient,
                truncate(&record.subject, 30),
                path.display()
            );
        }
    }
    println!();
    Ok(())
}

async fn inbox(paths: &Paths, top: u32) -> anyhow::Result<()> {
    let cancel = interrupt_token();
    let mailer = mailer(paths, cancel.clone())?;
    let messages = interruptible(&cancel, mailer.recent_messages(top)).await?;
    if messages.is_empty() {
        println!("Inbox is empty.");
        return Ok(());
    }

    println!("\nInbox (newest {top}):");
    println!("{}", "-".repeat(80));
    for message in messages {
        let received = message
            .received
            .map(|at| at.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_default();
        println!(
            "{} {:16} | {:30} | {}",
            if message.is_read { " " } else { "*" },
            received,
            message.from.as_deref().unwrap_or("(unknown)"),
            truncate(&message.subject, 40)
        );
    }
    println!();
    Ok(())
}

fn setup(paths: &Paths) -> anyhow::Result<()> {
    println!("\n{RULE}");
    println!("MAILGATE SETUP");
    println!("{RULE}");
    println!("\nStep 1: Register an app in the Azure Portal");
    println!("{}", "-".repeat(40));
    open_browser(APP_REGISTRATIONS_URL);
    println!(
        "
Open {APP_REGISTRATIONS_URL}
1. Click 'New registration'
2. Supported account types: 'Accounts in this organizational directory only'
3. Redirect URI: 'Public client/native',
   https://login.microsoftonline.com/common/oauth2/nativeclient
4. Under 'Authentication', enable 'Allow public client flows'
5. Under 'API permissions', add Microsoft Graph delegated permissions
   Mail.Send, Mail.ReadWrite and User.Read, then grant consent

Copy the 'Application (client) ID' and the 'Directory (tenant) ID'.
"
    );

    println!("Step 2: Enter your registration");
    println!("{}", "-".repeat(40));
    let mut input = io::stdin().lock();
    let client_id = ask(&mut input, "Application (client) ID")?;
    let tenant_id = ask(&mut input, "Directory (tenant) ID")?;

    if client_id.is_empty() || tenant_id.is_empty() {
        println!("\nSetup cancelled. Run `mailgate setup` again when ready.");
        return Ok(());
    }

    let config = match AppConfig::load(&paths.config_file) {
        Ok(existing) => AppConfig {
            client_id,
            tenant_id,
            ..existing
        },
        Err(Error::ConfigMissing(_)) => AppConfig::new(client_id, tenant_id),
        Err(e) => {
            debug!("Replacing unusable configuration: {e}");
            AppConfig::new(client_id, tenant_id)
        }
    };
    config.save(&paths.config_file)?;

    println!("\nConfig saved to {}", paths.config_file.display());
    println!("Run: mailgate send --to someone@example.com --subject Hello --body Hi");
    Ok(())
}

fn logout(paths: &Paths) -> anyhow::Result<()> {
    match AppConfig::load(&paths.config_file) {
        Ok(config) => {
            let store = cache::open(&config, paths)?;
            TokenProvider::new(&config, store, Box::new(ConsolePrompt))?.logout()?;
        }
        Err(Error::ConfigMissing(_)) => {
            FileCredentialCache::new(&paths.token_cache).clear()?;
        }
        Err(e) => return Err(e.into()),
    }
    println!("Logged out. Token cache cleared.");
    Ok(())
}
