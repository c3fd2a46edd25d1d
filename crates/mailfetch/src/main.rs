//! Fetches one page of a mailbox over IMAP and prints it as JSON.
//!
//! Logs go to stderr so stdout carries only the JSON document.
//!
//! ```text
//! IMAP_HOST=imap.gmail.com IMAP_PORT=993 \
//! IMAP_USER=me@example.com IMAP_ACCESS_TOKEN=ya29... \
//! mailfetch --mailbox inbox --page 2 --size 10
//! ```

use std::io::Write;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use mailfetch_core::{
    Credential, Criteria, GetMailsOptions, ImapConfig, ImapTransport, MailBox, MailClient,
    PageQuery, SearchKey, SortKey, scoped_until,
};
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_LOG_FILTER: &str = "mailfetch=info,mailfetch_core=info,mailfetch_imap=info";

#[derive(Debug, Parser)]
#[command(name = "mailfetch", version, about = "Fetch a page of mail over IMAP as JSON")]
struct Args {
    /// IMAP server hostname.
    #[arg(long, env = "IMAP_HOST")]
    host: String,

    /// 993 for implicit TLS, 143 for STARTTLS.
    #[arg(long, env = "IMAP_PORT", default_value_t = 993)]
    port: u16,

    /// Account the access token was issued for.
    #[arg(long, env = "IMAP_USER")]
    user: String,

    /// OAuth 2.0 access token.
    #[arg(long, env = "IMAP_ACCESS_TOKEN", hide_env_values = true)]
    token: String,

    /// INBOX, Sent, Drafts, Junk (or Spam) or Trash.
    #[arg(long, default_value = "INBOX")]
    mailbox: MailBox,

    /// 1-based page number.
    #[arg(long, default_value_t = 1)]
    page: u32,

    /// Messages per page, 5 to 20.
    #[arg(long, default_value_t = 5)]
    size: u32,

    /// Sort key, e.g. `-ARRIVAL` or `SUBJECT`; repeat for tie-breakers.
    #[arg(long = "sort", value_name = "KEY")]
    sort: Vec<SortKey>,

    /// Only list messages without `\Seen`.
    #[arg(long)]
    unseen: bool,

    /// Set `\Seen` on the fetched messages.
    #[arg(long)]
    mark_seen: bool,

    /// Open the mailbox with EXAMINE.
    #[arg(long)]
    read_only: bool,

    /// Seconds allowed for connect, TLS and authentication.
    #[arg(long, env = "IMAP_CONNECT_TIMEOUT_SECS", default_value_t = 30)]
    connect_timeout: u64,

    /// Seconds allowed per command.
    #[arg(long, env = "IMAP_IO_TIMEOUT_SECS", default_value_t = 60)]
    io_timeout: u64,
}

impl Args {
    fn config(&self) -> anyhow::Result<ImapConfig> {
        Ok(ImapConfig::new(self.host.as_str(), self.port)?
            .with_connect_timeout(Duration::from_secs(self.connect_timeout))
            .with_io_timeout(Duration::from_secs(self.io_timeout)))
    }

    fn options(&self) -> anyhow::Result<GetMailsOptions> {
        let mut criteria = Criteria::default();
        if !self.sort.is_empty() {
            criteria.sort.clone_from(&self.sort);
        }
        if self.unseen {
            criteria.search = vec![SearchKey::Unseen];
        }
        Ok(GetMailsOptions {
            query: PageQuery::new(self.page, self.size)?,
            criteria,
            read_only: self.read_only,
            mark_seen: self.mark_seen.then_some(true),
            auto_close: true,
        })
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();
    let config = args.config().context("invalid server settings")?;
    let options = args.options().context("invalid query")?;
    let credential = Credential::new(args.user.as_str(), args.token.as_str());
    let mailbox = args.mailbox;

    info!(host = %config.host, port = config.port, %mailbox, "fetching mail");
    let client = MailClient::connect(&credential, &config)
        .await
        .with_context(|| format!("failed to connect to {}:{}", config.host, config.port))?;

    let page = scoped_until(client, interrupted(), async move |c: &mut MailClient<ImapTransport>| {
        c.get_mails(mailbox, options).await
    })
    .await
    .with_context(|| format!("failed to list {mailbox}"))?;

    info!(
        count = page.mails.len(),
        total = page.pagination.total,
        "done"
    );
    let mut stdout = std::io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, &page).context("failed to write output")?;
    writeln!(stdout)?;
    Ok(())
}

/// Completes on Ctrl-C; never, if the signal cannot be watched.
async fn interrupted() {
    if tokio::signal::ctrl_c().await.is_err() {
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use mailfetch_core::{NEWEST_FIRST, SortCriterion};

    use super::*;

    fn parse(extra: &[&str]) -> Args {
        let base = [
            "mailfetch",
            "--host",
            "imap.example.com",
            "--user",
            "me@example.com",
            "--token",
            "ya29.token",
        ];
        Args::try_parse_from(base.iter().chain(extra)).unwrap()
    }

    #[test]
    fn test_defaults() {
        let args = parse(&[]);
        assert_eq!(args.port, 993);
        assert_eq!(args.mailbox, MailBox::Inbox);

        let options = args.options().unwrap();
        assert_eq!(options.query, PageQuery::default());
        assert_eq!(options.criteria.sort, vec![NEWEST_FIRST]);
        assert_eq!(options.mark_seen, None);
        assert!(options.auto_close);
    }

    #[test]
    fn test_query_flags() {
        let args = parse(&[
            "--mailbox", "spam", "--page", "3", "--size", "20", "--sort", "subject", "--unseen",
            "--mark-seen", "--read-only",
        ]);
        assert_eq!(args.mailbox, MailBox::Junk);

        let options = args.options().unwrap();
        assert_eq!(options.query, PageQuery::new(3, 20).unwrap());
        assert_eq!(options.criteria.sort, vec![SortKey::asc(SortCriterion::Subject)]);
        assert_eq!(options.criteria.search, vec![SearchKey::Unseen]);
        assert_eq!(options.mark_seen, Some(true));
        assert!(options.read_only);
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(parse(&["--size", "50"]).options().is_err());
        assert!(parse(&["--port", "587"]).config().is_err());
        let base = ["mailfetch", "--host", "h", "--user", "u", "--token", "t"];
        assert!(Args::try_parse_from(base.iter().chain(&["--mailbox", "Archive"])).is_err());
    }

    #[test]
    fn test_timeouts_reach_config() {
        let config = parse(&["--port", "143", "--io-timeout", "7"]).config().unwrap();
        assert_eq!(config.port, 143);
        assert_eq!(config.io_timeout, Duration::from_secs(7));
    }
}
