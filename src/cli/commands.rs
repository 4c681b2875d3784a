use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "feedwatch")]
#[command(about = "Poll RSS/Atom feeds and email newly published entries")]
#[command(version)]
pub struct Cli {
    /// Dry run - fetch and diff feeds, but send no email and write no state
    #[arg(long)]
    pub dry_run: bool,

    /// Path of the JSON file holding already-seen entries
    #[arg(long)]
    pub state_file: Option<PathBuf>,
}
