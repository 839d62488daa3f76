// `wikiedit submit`: post wikitext through the classic edit form.

use std::path::PathBuf;

use clap::Args;
use serde::Serialize;

use wikiedit_common::protocol::params::ApiParams;

use crate::context::{self, WikiArgs};
use crate::output::{self, OutputFormat};

#[derive(Debug, Args)]
pub struct SubmitArgs {
    /// Page title.
    pub page: String,

    /// Wikitext to submit (`-` for stdin).
    #[arg(long, value_name = "FILE")]
    pub input: PathBuf,

    /// Edit summary.
    #[arg(long, short = 'm')]
    pub summary: Option<String>,

    /// Save the edit instead of asking for the diff view.
    #[arg(long)]
    pub save: bool,

    /// Extra form field, as `name=value`. Repeatable.
    #[arg(long = "field", value_name = "NAME=VALUE", value_parser = parse_field)]
    pub fields: Vec<(String, String)>,

    /// Force JSON output.
    #[arg(long)]
    json: bool,

    #[command(flatten)]
    pub wiki: WikiArgs,
}

impl SubmitArgs {
    fn form_fields(&self) -> ApiParams {
        let mut fields = ApiParams::new();
        if self.save {
            fields.set("wpSave", "1");
        } else {
            fields.set("wpDiff", "1");
        }
        if let Some(summary) = &self.summary {
            fields.set("wpSummary", summary.clone());
        }
        for (name, value) in &self.fields {
            fields.set(name, value.clone());
        }
        fields
    }
}

fn parse_field(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((name, value)) if !name.is_empty() => Ok((name.to_string(), value.to_string())),
        _ => Err(format!("expected NAME=VALUE, got `{raw}`")),
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SubmitResult {
    pub page: String,
    pub status: u16,
    pub url: String,
}

pub fn run(args: SubmitArgs) -> anyhow::Result<()> {
    let format = OutputFormat::detect(args.json);
    match context::block_on(call_submit(&args)).and_then(|r| r) {
        Ok(result) => {
            output::print_output(format, &result, |r| {
                format!("Submitted {} (HTTP {}): {}", r.page, r.status, r.url)
            })?;
            Ok(())
        }
        Err(e) => {
            output::print_anyhow_error(format, &e);
            Err(e)
        }
    }
}

async fn call_submit(args: &SubmitArgs) -> anyhow::Result<SubmitResult> {
    let wikitext = context::read_input(&args.input)?;
    let target = context::open_target(&args.wiki, &args.page, None).await?;
    // Timestamps and the base revision come from a load.
    target.load().await?;
    let reply = target.submit(&wikitext, &args.form_fields()).await?;
    Ok(SubmitResult { page: args.page.clone(), status: reply.status, url: reply.final_url })
}
