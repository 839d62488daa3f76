// Shared plumbing for commands: wiki selection, runtime, session bootstrap.

use std::future::Future;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::Args;
use tracing::debug;

use wikiedit_common::types::{PageName, Session, UserIdentity};
use wikiedit_target::config::ClientConfig;
use wikiedit_target::retry::{interpret_refresh, refresh_params, TokenRefresh};
use wikiedit_target::transport::{ApiTransport, HttpTransport};
use wikiedit_target::{HtmlDocument, Target};

/// Which wiki to talk to. Flags override `~/.wikiedit/config.toml`.
#[derive(Debug, Clone, Default, Args)]
pub struct WikiArgs {
    /// Config file to read instead of `~/.wikiedit/config.toml`.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// `api.php` endpoint.
    #[arg(long, value_name = "URL")]
    pub api_url: Option<String>,

    /// `index.php` endpoint for form submission.
    #[arg(long, value_name = "URL")]
    pub index_url: Option<String>,

    /// Request timeout in seconds.
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,
}

impl WikiArgs {
    pub fn client_config(&self) -> anyhow::Result<ClientConfig> {
        let mut config = match &self.config {
            Some(path) => ClientConfig::load_from(path)
                .with_context(|| format!("failed to read config {}", path.display()))?,
            None => ClientConfig::load(),
        };
        if let Some(api_url) = &self.api_url {
            config.wiki.api_url = api_url.clone();
        }
        if let Some(index_url) = &self.index_url {
            config.wiki.index_url = Some(index_url.clone());
        }
        if let Some(timeout) = self.timeout {
            config.http.timeout_secs = timeout;
        }
        Ok(config)
    }
}

/// Drive `fut` to completion on a fresh runtime.
pub fn block_on<F: Future>(fut: F) -> anyhow::Result<F::Output> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start tokio runtime")?;
    Ok(runtime.block_on(fut))
}

/// The current user and an edit token for `page`.
pub async fn whoami(
    transport: &dyn ApiTransport,
    page: &PageName,
) -> anyhow::Result<(UserIdentity, String)> {
    let reply = transport.get(&refresh_params(page)).await.context("user info query failed")?;
    match interpret_refresh(&UserIdentity::anonymous(), reply.body.as_ref()) {
        TokenRefresh::SameUser { token } => Ok((UserIdentity::anonymous(), token)),
        TokenRefresh::NewUser { user, token } => Ok((user, token)),
        TokenRefresh::Unusable => bail!("user info reply carried no edit token"),
    }
}

/// Build a target for `page`, bootstrapped with the current user and token.
pub async fn open_target(
    wiki: &WikiArgs,
    page: &str,
    revision: Option<u64>,
) -> anyhow::Result<Target> {
    let config = wiki.client_config()?;
    let transport = Arc::new(HttpTransport::from_config(&config)?);
    let page = PageName::new(page);
    let (user, token) = whoami(transport.as_ref(), &page).await?;
    debug!(%user, %page, "session bootstrapped");

    let mut session = Session::new(page, token);
    if let Some(revision) = revision {
        session = session.restoring_revision(revision);
    }
    let target = Target::new(session, user, transport);
    Ok(match config.index_url() {
        Ok(index_url) => target.with_index_url(index_url),
        Err(error) => {
            debug!(%error, "no usable index url");
            target
        }
    })
}

/// A page plus an edited version of it, for the commands that send HTML.
#[derive(Debug, Clone, Args)]
pub struct EditedArgs {
    /// Page title.
    pub page: String,

    /// Edited HTML document (`-` for stdin).
    #[arg(long, value_name = "FILE")]
    pub input: PathBuf,

    /// Edit against this revision instead of the latest.
    #[arg(long)]
    pub revision: Option<u64>,

    /// Upload the document ahead of the request and send it by cache key.
    #[arg(long)]
    pub cache_key: bool,

    #[command(flatten)]
    pub wiki: WikiArgs,
}

/// Load the page, read the edited document, and prepare its cache key
/// when asked to.
pub async fn open_edited(args: &EditedArgs) -> anyhow::Result<(Target, HtmlDocument)> {
    let edited = read_document(&args.input)?;
    let target = open_target(&args.wiki, &args.page, args.revision).await?;
    target.load().await?;
    if args.cache_key {
        target.prepare_cache_key(&edited);
    }
    Ok((target, edited))
}

/// Read a file, or stdin for `-`.
pub fn read_input(path: &Path) -> anyhow::Result<String> {
    if path == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf).context("failed to read stdin")?;
        return Ok(buf);
    }
    std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

/// Parse an edited document from `path`.
pub fn read_document(path: &Path) -> anyhow::Result<HtmlDocument> {
    let html = read_input(path)?;
    HtmlDocument::parse(&html).with_context(|| format!("invalid HTML in {}", path.display()))
}
