use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Data directory (defaults to $JOBHOUND_HOME, then ~/.jobhound)
    #[clap(long)]
    pub data_dir: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Scrape the job board and persist new postings.
    Scrape {},

    /// Re-evaluate stored postings, generate corpus-backed feedback and
    /// email the digest.
    Evaluate {
        /// Print the digest instead of emailing it
        #[clap(long, default_value = "false")]
        dry_run: bool,
    },

    /// Scrape, then evaluate, in one invocation.
    Run {
        /// Print the digest instead of emailing it
        #[clap(long, default_value = "false")]
        dry_run: bool,
    },
}
