// `wikiedit load`: fetch the HTML of a page.

use clap::Args;
use serde::Serialize;

use crate::context::{self, WikiArgs};
use crate::output::{self, OutputFormat};

#[derive(Debug, Args)]
pub struct LoadArgs {
    /// Page title.
    pub page: String,

    /// Load this revision instead of the latest.
    #[arg(long)]
    pub revision: Option<u64>,

    /// Print only the page HTML.
    #[arg(long)]
    html: bool,

    /// Force JSON output.
    #[arg(long)]
    json: bool,

    #[command(flatten)]
    pub wiki: WikiArgs,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoadResult {
    pub page: String,
    pub revision: Option<u64>,
    pub user: String,
    pub base_timestamp: Option<String>,
    pub notices: Vec<String>,
    pub checkboxes: Vec<String>,
    pub html: String,
}

pub fn run(args: LoadArgs) -> anyhow::Result<()> {
    let format = OutputFormat::detect(args.json);
    match context::block_on(call_load(&args)).and_then(|r| r) {
        Ok(result) if args.html => {
            output::print_output(format, &result, |r| r.html.clone())?;
            Ok(())
        }
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

async fn call_load(args: &LoadArgs) -> anyhow::Result<LoadResult> {
    let target = context::open_target(&args.wiki, &args.page, args.revision).await?;
    target.load().await?;
    let session = target.session();
    Ok(LoadResult {
        page: session.page.to_string(),
        revision: session.revision_id,
        user: target.user().to_string(),
        base_timestamp: session.base_timestamp,
        notices: target.edit_notices().unwrap_or_default().into_values().collect(),
        checkboxes: target.checkboxes(),
        html: target.original_html().unwrap_or_default(),
    })
}

fn format_human(result: &LoadResult) -> String {
    let mut lines = vec![format!("Page: {}", result.page)];
    match result.revision {
        Some(revision) => lines.push(format!("Revision: {revision}")),
        None => lines.push("Revision: (new page)".into()),
    }
    lines.push(format!("User: {}", result.user));
    if !result.notices.is_empty() {
        lines.push(format!("Notices: {}", result.notices.len()));
    }
    if !result.checkboxes.is_empty() {
        lines.push(format!("Checkboxes: {}", result.checkboxes.len()));
    }
    lines.push(format!("HTML: {} bytes (use --html to print)", result.html.len()));
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result() -> LoadResult {
        LoadResult {
            page: "Sandbox".into(),
            revision: Some(101),
            user: "Alice".into(),
            base_timestamp: Some("20260101000000".into()),
            notices: vec!["<p>Protected</p>".into()],
            checkboxes: Vec::new(),
            html: "<!doctype html><html></html>".into(),
        }
    }

    #[test]
    fn human_summary_lists_revision_and_notices() {
        let text = format_human(&result());
        assert!(text.contains("Revision: 101"));
        assert!(text.contains("Notices: 1"));
        assert!(!text.contains("Checkboxes"));
    }

    #[test]
    fn new_page_has_no_revision() {
        let text = format_human(&LoadResult { revision: None, ..result() });
        assert!(text.contains("(new page)"));
    }
}
