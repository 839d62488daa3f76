// `wikiedit check`: verify that a page survives an HTML round trip.

use clap::Args;
use serde::Serialize;
use tracing::warn;

use wikiedit_target::HtmlDocument;

use crate::context::{self, WikiArgs};
use crate::output::{self, OutputFormat};

#[derive(Debug, Args)]
pub struct CheckArgs {
    /// Page title.
    pub page: String,

    /// Check this revision instead of the latest.
    #[arg(long)]
    pub revision: Option<u64>,

    /// Force JSON output.
    #[arg(long)]
    json: bool,

    #[command(flatten)]
    pub wiki: WikiArgs,
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckResult {
    pub page: String,
    pub revision: Option<u64>,
    pub verified: bool,
}

pub fn run(args: CheckArgs) -> anyhow::Result<()> {
    let format = OutputFormat::detect(args.json);
    match context::block_on(call_check(&args)).and_then(|r| r) {
        Ok(result) => {
            if !result.verified {
                output::print_warning(
                    format,
                    "ROUND_TRIP_MISMATCH",
                    "the page does not survive re-serialisation unchanged",
                );
            }
            output::print_output(format, &result, |r| {
                if r.verified {
                    format!("{}: round trip verified.", r.page)
                } else {
                    format!("{}: round trip changed the page.", r.page)
                }
            })?;
            Ok(())
        }
        Err(e) => {
            output::print_anyhow_error(format, &e);
            Err(e)
        }
    }
}

async fn call_check(args: &CheckArgs) -> anyhow::Result<CheckResult> {
    let target = context::open_target(&args.wiki, &args.page, args.revision).await?;
    target.load().await?;
    let verified = target.run_sanity_check(round_trip).await?;
    Ok(CheckResult { page: args.page.clone(), revision: target.session().revision_id, verified })
}

/// Serialise and re-parse, the way an editor surface would rebuild it.
fn round_trip(doc: HtmlDocument) -> HtmlDocument {
    match HtmlDocument::parse(&doc.to_html()) {
        Ok(rebuilt) => rebuilt,
        Err(error) => {
            warn!(%error, "rebuilt document did not parse");
            HtmlDocument::new()
        }
    }
}
