//! CLI argument parsing for bwizard.

use bwizard_catalog::JobKind;
use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "bwizard")]
#[command(about = "Build, check and price LSF bsub commands")]
pub struct Args {
    /// Cluster catalog JSON (defaults to the built-in reference cluster)
    #[arg(long, global = true)]
    pub catalog: Option<Utf8PathBuf>,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Validate a saved job configuration
    Check {
        /// Saved configuration (JSON)
        record: Utf8PathBuf,
    },

    /// Estimate the GPU cost of a saved job configuration
    Cost {
        record: Utf8PathBuf,
    },

    /// Print the bsub command for a saved job configuration
    Generate {
        record: Utf8PathBuf,

        /// Emit a bash submission script instead of a single command
        #[arg(long)]
        script: bool,
    },

    /// List queues, optionally only those accepting a job type
    Queues {
        #[arg(long)]
        kind: Option<JobKind>,

        /// Expected runtime (H:MM or minutes); suggests queues that fit it
        #[arg(long, requires = "kind")]
        runtime: Option<String>,
    },

    /// Print an empty configuration to start from
    Template {
        #[arg(long)]
        kind: JobKind,

        /// Job name to fill in
        #[arg(long)]
        name: Option<String>,
    },
}
