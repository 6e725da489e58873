//! CLI argument definitions using clap
//!
//! Commands:
//! - mnet bake --input <net.json> --output <net.bin>
//! - mnet partition --input <net>
//! - mnet probability --input <net> --data <samples>
//! - mnet predict --input <net> --data <samples>
//! - mnet learn --data <samples> --output <net.json>

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// mnet - exact and approximate inference over discrete Markov networks
#[derive(Parser, Debug)]
#[command(name = "mnet")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Number of worker threads (default: one per core)
    #[arg(long, global = true)]
    pub threads: Option<usize>,

    /// Never display progress bars
    #[arg(long, global = true)]
    pub no_progress: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build the factor graph, compute the partition function and store the network in binary
    /// form
    Bake {
        /// Network file (JSON or binary)
        #[arg(long)]
        input: PathBuf,
        /// Binary output file
        #[arg(long)]
        output: PathBuf,
        /// Do not compute the partition function
        #[arg(long)]
        no_partition: bool,
        #[command(flatten)]
        budget: BudgetArgs,
    },

    /// Print the log partition function of a network
    Partition {
        #[arg(long)]
        input: PathBuf,
        #[command(flatten)]
        budget: BudgetArgs,
    },

    /// Probability of each full assignment of a sample file
    Probability {
        #[arg(long)]
        input: PathBuf,
        /// Comma-separated assignments, one per line
        #[arg(long)]
        data: PathBuf,
        /// Skip the division by the partition function
        #[arg(long)]
        unnormalized: bool,
        /// Print natural log-probabilities
        #[arg(long)]
        log: bool,
        #[command(flatten)]
        budget: BudgetArgs,
    },

    /// Most probable value of the unobserved variables ('?') of each line of a sample file
    Predict {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        data: PathBuf,
        /// Print the marginal distributions as JSON instead of the predicted values
        #[arg(long)]
        proba: bool,
        #[command(flatten)]
        bp: BpArgs,
    },

    /// Learn a tree-structured network from samples (Chow-Liu)
    Learn {
        /// Comma-separated fully observed samples, one per line
        #[arg(long)]
        data: PathBuf,
        /// JSON output file
        #[arg(long)]
        output: PathBuf,
        /// Count added to every table entry
        #[arg(long, default_value_t = 1.0)]
        pseudocount: f64,
        /// Store the result as a directed network
        #[arg(long)]
        directed: bool,
    },
}

#[derive(Args, Debug, Clone, Copy)]
pub struct BudgetArgs {
    /// Largest number of joint assignments enumerated for the partition function
    #[arg(long)]
    pub max_assignments: Option<u64>,
    /// Time budget for the partition function, in milliseconds
    #[arg(long)]
    pub timeout_ms: Option<u64>,
}

#[derive(Args, Debug, Clone, Copy)]
pub struct BpArgs {
    /// Maximum number of belief propagation rounds
    #[arg(long, default_value_t = 100)]
    pub max_iter: u32,
    /// Convergence threshold on message changes
    #[arg(long, default_value_t = 1e-9)]
    pub tolerance: f64,
}
