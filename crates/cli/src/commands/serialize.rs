// `wikiedit serialize`: convert an edited HTML document to wikitext.

use clap::Args;
use serde::Serialize;

use crate::context::{self, EditedArgs};
use crate::output::{self, OutputFormat};

#[derive(Debug, Args)]
pub struct SerializeArgs {
    #[command(flatten)]
    pub edited: EditedArgs,

    /// Force JSON output.
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SerializeResult {
    pub page: String,
    pub wikitext: String,
}

pub fn run(args: SerializeArgs) -> anyhow::Result<()> {
    let format = OutputFormat::detect(args.json);
    match context::block_on(call_serialize(&args.edited)).and_then(|r| r) {
        Ok(result) => {
            output::print_output(format, &result, |r| r.wikitext.clone())?;
            Ok(())
        }
        Err(e) => {
            output::print_anyhow_error(format, &e);
            Err(e)
        }
    }
}

async fn call_serialize(args: &EditedArgs) -> anyhow::Result<SerializeResult> {
    let (target, edited) = context::open_edited(args).await?;
    let wikitext = target.serialize(&edited).await?;
    Ok(SerializeResult { page: args.page.clone(), wikitext })
}
