// `wikiedit whoami`: show the account requests are made as.

use clap::Args;
use serde::Serialize;

use wikiedit_common::types::PageName;
use wikiedit_target::transport::HttpTransport;

use crate::context::{self, WikiArgs};
use crate::output::{self, OutputFormat};

#[derive(Debug, Args)]
pub struct WhoamiArgs {
    /// Page to request an edit token for.
    #[arg(long, default_value = "Main Page")]
    pub page: String,

    /// Force JSON output.
    #[arg(long)]
    json: bool,

    #[command(flatten)]
    pub wiki: WikiArgs,
}

#[derive(Debug, Clone, Serialize)]
pub struct WhoamiResult {
    pub api_url: String,
    pub anonymous: bool,
    pub user_id: Option<u64>,
    pub user_name: Option<String>,
}

pub fn run(args: WhoamiArgs) -> anyhow::Result<()> {
    let format = OutputFormat::detect(args.json);
    match context::block_on(call_whoami(&args)).and_then(|r| r) {
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

async fn call_whoami(args: &WhoamiArgs) -> anyhow::Result<WhoamiResult> {
    let config = args.wiki.client_config()?;
    let transport = HttpTransport::from_config(&config)?;
    let (user, _token) = context::whoami(&transport, &PageName::new(&args.page)).await?;
    Ok(WhoamiResult {
        api_url: transport.api_url().to_string(),
        anonymous: user.is_anonymous(),
        user_id: user.id,
        user_name: user.name,
    })
}

fn format_human(result: &WhoamiResult) -> String {
    let who = match (&result.user_name, result.user_id) {
        (Some(name), Some(id)) => format!("{name} (#{id})"),
        (None, Some(id)) => format!("user #{id}"),
        _ => "anonymous".to_string(),
    };
    format!("{who} on {}", result.api_url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anonymous_user_formats_plainly() {
        let result = WhoamiResult {
            api_url: "https://test.example/w/api.php".into(),
            anonymous: true,
            user_id: None,
            user_name: None,
        };
        assert_eq!(format_human(&result), "anonymous on https://test.example/w/api.php");
    }

    #[test]
    fn named_user_shows_id() {
        let result = WhoamiResult {
            api_url: "https://test.example/w/api.php".into(),
            anonymous: false,
            user_id: Some(7),
            user_name: Some("Alice".into()),
        };
        assert_eq!(format_human(&result), "Alice (#7) on https://test.example/w/api.php");
    }
}
