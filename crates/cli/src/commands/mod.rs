// CLI subcommand dispatch.

use clap::Subcommand;

pub mod check;
pub mod diff;
pub mod load;
pub mod save;
pub mod serialize;
pub mod submit;
pub mod whoami;

#[derive(Subcommand)]
pub enum Command {
    /// Fetch the HTML of a page
    Load(load::LoadArgs),
    /// Convert an edited HTML document to wikitext
    Serialize(serialize::SerializeArgs),
    /// Show the wikitext diff of an edited document
    Diff(diff::DiffArgs),
    /// Save an edited HTML document
    Save(save::SaveArgs),
    /// Post wikitext through the classic edit form
    Submit(submit::SubmitArgs),
    /// Check that a page survives an HTML round trip
    Check(check::CheckArgs),
    /// Show the account requests are made as
    Whoami(whoami::WhoamiArgs),
}

pub fn run(cmd: Command) -> anyhow::Result<()> {
    match cmd {
        Command::Load(args) => load::run(args),
        Command::Serialize(args) => serialize::run(args),
        Command::Diff(args) => diff::run(args),
        Command::Save(args) => save::run(args),
        Command::Submit(args) => submit::run(args),
        Command::Check(args) => check::run(args),
        Command::Whoami(args) => whoami::run(args),
    }
}
