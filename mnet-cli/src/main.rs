use std::io::Write;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use env_logger::{Builder, Env};
use log::info;
use mnet::{BPConfig, Config, InferenceGraph, Marginal};

mod args;
mod io;

use args::{BpArgs, BudgetArgs, Cli, Command};
use io::Network;

fn init_logger() {
    Builder::from_env(Env::default().default_filter_or("info"))
        .format(|buf, record| {
            let file = record.file().unwrap_or("unknown");
            let line = record.line().unwrap_or(0);
            writeln!(
                buf,
                "{} [{}:{}] {}",
                record.level(),
                file,
                line,
                record.args()
            )
        })
        .init();
}

fn config(budget: &BudgetArgs, no_progress: bool) -> Config {
    let mut config = if no_progress {
        Config::no_progress()
    } else {
        Config::with_default_timing()
    };
    if let Some(max) = budget.max_assignments {
        config = config.with_max_assignments(max);
    }
    if let Some(ms) = budget.timeout_ms {
        config = config.with_partition_timeout(Duration::from_millis(ms));
    }
    config
}

fn bp_config(bp: &BpArgs) -> BPConfig {
    BPConfig {
        max_iter: bp.max_iter,
        tolerance: bp.tolerance,
    }
}

/// Bake the network if needed; computes the partition function only when it is needed and
/// not already known.
fn prepare(network: &mut Network, need_partition: bool, config: &Config) -> Result<()> {
    match network {
        Network::Markov(n) => {
            let has_partition = n.log_partition().is_ok();
            if !n.is_baked() || (need_partition && !has_partition) {
                n.bake(need_partition && !has_partition, config)?;
            }
        }
        Network::Bayesian(n) => {
            if !n.is_baked() {
                n.bake()?;
            }
        }
    }
    Ok(())
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Bake {
            input,
            output,
            no_partition,
            budget,
        } => {
            let mut network = io::read_network(&input)?;
            prepare(
                &mut network,
                !no_partition,
                &config(&budget, cli.no_progress),
            )?;
            let Network::Markov(network) = network else {
                bail!("only undirected networks can be stored in binary form");
            };
            io::write_binary(&output, &network)?;
            info!(
                "Baked network of {} tables written to {}.",
                network.tables().len(),
                output.display()
            );
        }
        Command::Partition { input, budget } => {
            let mut network = io::read_network(&input)?;
            prepare(&mut network, true, &config(&budget, cli.no_progress))?;
            let log_z = network.as_graph().log_partition()?;
            println!("log_partition {log_z}");
            println!("partition {}", log_z.exp());
        }
        Command::Probability {
            input,
            data,
            unnormalized,
            log,
            budget,
        } => {
            let mut network = io::read_network(&input)?;
            prepare(
                &mut network,
                !unnormalized,
                &config(&budget, cli.no_progress),
            )?;
            let samples = io::read_full_samples(&data)?;
            let graph = network.as_graph();
            let res = if log {
                graph.log_probabilities(samples.view(), unnormalized)?
            } else {
                graph.probabilities(samples.view(), unnormalized)?
            };
            for p in res.iter() {
                println!("{p}");
            }
        }
        Command::Predict {
            input,
            data,
            proba,
            bp,
        } => {
            let mut network = io::read_network(&input)?;
            prepare(&mut network, false, &Config::no_progress())?;
            let examples = io::read_samples(&data)?;
            let graph = network.as_graph();
            let config = bp_config(&bp);
            if proba {
                let cards = graph.factor_graph()?.cardinalities();
                let res = graph.predict_proba(&examples, &config)?;
                let json: Vec<Vec<Vec<f64>>> = res
                    .iter()
                    .map(|inference| {
                        inference
                            .marginals
                            .iter()
                            .zip(cards.iter())
                            .map(|(m, nc)| match m {
                                Marginal::Observed(x) => {
                                    (0..*nc).map(|v| f64::from(v == *x as usize)).collect()
                                }
                                Marginal::Distribution(d) => d.to_vec(),
                            })
                            .collect()
                    })
                    .collect();
                println!("{}", serde_json::to_string(&json)?);
            } else {
                for prediction in graph.predict(&examples, &config)? {
                    let line: Vec<String> =
                        prediction.values.iter().map(|x| x.to_string()).collect();
                    println!("{}", line.join(","));
                }
            }
        }
        Command::Learn {
            data,
            output,
            pseudocount,
            directed,
        } => {
            let samples = io::read_full_samples(&data)?;
            let tables = mnet::structure::chow_liu(samples.view(), pseudocount)
                .context("learning the structure")?;
            io::write_json(&output, &io::NetworkFile::from_tables(&tables, directed))?;
            info!(
                "Learned a tree over {} variables from {} samples.",
                samples.ncols(),
                samples.nrows()
            );
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    init_logger();
    let cli = Cli::parse();
    let mut pool = rayon::ThreadPoolBuilder::new();
    if let Some(threads) = cli.threads {
        pool = pool.num_threads(threads);
    }
    let pool = pool.build().context("building the thread pool")?;
    pool.install(|| run(cli))
}
