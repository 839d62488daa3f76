// `wikiedit save`: save an edited HTML document.

use anyhow::Context;
use clap::Args;
use serde::Serialize;

use wikiedit_target::{SaveOptions, SaveOutcome};

use crate::context::{self, EditedArgs};
use crate::output::{self, OutputFormat};

#[derive(Debug, Args)]
pub struct SaveArgs {
    #[command(flatten)]
    pub edited: EditedArgs,

    /// Edit summary.
    #[arg(long, short = 'm')]
    pub summary: Option<String>,

    /// Mark the edit as minor.
    #[arg(long)]
    pub minor: bool,

    /// Add the page to the watchlist.
    #[arg(long)]
    pub watch: bool,

    /// Force JSON output.
    #[arg(long)]
    json: bool,
}

impl SaveArgs {
    fn options(&self) -> SaveOptions {
        SaveOptions {
            summary: self.summary.clone(),
            minor: self.minor,
            watch: self.watch,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SaveResult {
    pub page: String,
    pub new_revision: Option<u64>,
    pub categories_html: Option<String>,
}

impl SaveResult {
    fn new(page: String, outcome: SaveOutcome) -> Self {
        Self { page, new_revision: outcome.new_revid, categories_html: outcome.categories_html }
    }
}

pub fn run(args: SaveArgs) -> anyhow::Result<()> {
    let format = OutputFormat::detect(args.json);
    match context::block_on(call_save(&args)).and_then(|r| r) {
        Ok(result) => {
            output::print_output(format, &result, format_human)?;
            Ok(())
        }
        Err(e) => {
            output::print_anyhow_error(format, &e);
            Err(e)
        }
    }
}

async fn call_save(args: &SaveArgs) -> anyhow::Result<SaveResult> {
    let (target, edited) = context::open_edited(&args.edited).await?;
    let outcome = target
        .save(&edited, &args.options())
        .await
        .with_context(|| format!("saving {}", args.edited.page))?;
    Ok(SaveResult::new(args.edited.page.clone(), outcome))
}

fn format_human(result: &SaveResult) -> String {
    match result.new_revision {
        Some(revision) => format!("Saved {} as revision {revision}.", result.page),
        None => format!("Saved {} (no new revision).", result.page),
    }
}
