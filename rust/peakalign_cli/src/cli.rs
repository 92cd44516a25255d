use clap::Parser;
use peakalign::Accumulation;
use std::path::PathBuf;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum AccumulationArg {
    #[default]
    Iterative,
    SingleShot,
}

impl From<AccumulationArg> for Accumulation {
    fn from(value: AccumulationArg) -> Self {
        match value {
            AccumulationArg::Iterative => Accumulation::Iterative,
            AccumulationArg::SingleShot => Accumulation::SingleShot,
        }
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the JSON configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Path to the JSON file with the experiments (will over-write the config file)
    #[arg(short, long)]
    pub experiments: Option<PathBuf>,

    /// Path to a JSON guide tree, built from pairwise alignments when missing
    #[arg(short, long)]
    pub guide_tree: Option<PathBuf>,

    /// Path to the output directory
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Retention time tolerance, in seconds
    #[arg(long)]
    pub rt_tolerance: Option<f64>,

    /// Gap penalty
    #[arg(long)]
    pub gap_penalty: Option<f64>,

    /// Drop aligned positions seen in fewer experiments (replicates only)
    #[arg(long)]
    pub min_peaks: Option<usize>,

    /// How position scores are normalized
    #[arg(long, value_enum)]
    pub accumulation: Option<AccumulationArg>,
}
