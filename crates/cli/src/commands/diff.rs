// `wikiedit diff`: show the wikitext diff of an edited document.

use clap::Args;
use serde::Serialize;

use wikiedit_target::DiffOutcome;

use crate::context::{self, EditedArgs};
use crate::output::{self, OutputFormat};

#[derive(Debug, Args)]
pub struct DiffArgs {
    #[command(flatten)]
    pub edited: EditedArgs,

    /// Force JSON output.
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct DiffResult {
    pub page: String,
    pub changed: bool,
    /// Diff table rows as returned by the wiki.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diff: Option<String>,
}

impl DiffResult {
    fn new(page: String, outcome: DiffOutcome) -> Self {
        match outcome {
            DiffOutcome::Diff(diff) => Self { page, changed: true, diff: Some(diff) },
            DiffOutcome::NoChanges => Self { page, changed: false, diff: None },
        }
    }
}

pub fn run(args: DiffArgs) -> anyhow::Result<()> {
    let format = OutputFormat::detect(args.json);
    match context::block_on(call_diff(&args.edited)).and_then(|r| r) {
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

async fn call_diff(args: &EditedArgs) -> anyhow::Result<DiffResult> {
    let (target, edited) = context::open_edited(args).await?;
    let outcome = target.show_changes(&edited).await?;
    Ok(DiffResult::new(args.page.clone(), outcome))
}

fn format_human(result: &DiffResult) -> String {
    match &result.diff {
        Some(diff) => diff.clone(),
        None => "No changes.".into(),
    }
}
