use peakalign::Accumulation;
use serde::{
    Deserialize,
    Serialize,
};
use std::path::{
    Path,
    PathBuf,
};

use crate::cli::Cli;
use crate::errors::CliError;

#[derive(Debug, Default, Serialize, Deserialize, Clone)]
pub struct Config {
    pub input: Option<InputConfig>,
    #[serde(default)]
    pub analysis: AnalysisConfig,
    pub output: Option<OutputConfig>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct InputConfig {
    /// JSON list of experiments, each `{"expr_code": .., "peaks": [..]}`.
    pub experiments: PathBuf,
    /// Optional pre-computed guide tree.
    #[serde(default)]
    pub guide_tree: Option<PathBuf>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct AnalysisConfig {
    pub rt_tolerance: f64,
    pub gap_penalty: f64,
    pub min_peaks: usize,
    pub accumulation: Accumulation,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            rt_tolerance: 2.5,
            gap_penalty: 0.30,
            min_peaks: 1,
            accumulation: Accumulation::Iterative,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct OutputConfig {
    pub directory: PathBuf,
}

impl Config {
    pub fn from_file(path: &Path) -> Result<Self, CliError> {
        let file = std::fs::File::open(path).map_err(|e| CliError::io(e, path))?;
        serde_json::from_reader(std::io::BufReader::new(file)).map_err(|e| CliError::Json {
            source: e,
            path: path.to_path_buf(),
        })
    }

    /// Command line flags take precedence over the config file.
    pub fn apply_cli_overrides(&mut self, args: &Cli) -> Result<(), CliError> {
        if let Some(experiments) = &args.experiments {
            let guide_tree = self.input.as_ref().and_then(|x| x.guide_tree.clone());
            self.input = Some(InputConfig {
                experiments: experiments.clone(),
                guide_tree,
            });
        }
        if let Some(guide_tree) = &args.guide_tree {
            match self.input.as_mut() {
                Some(input) => input.guide_tree = Some(guide_tree.clone()),
                None => {
                    return Err(CliError::Config(
                        "A guide tree was given without any experiments".to_string(),
                    ));
                }
            }
        }
        if let Some(output_dir) = &args.output_dir {
            self.output = Some(OutputConfig {
                directory: output_dir.clone(),
            });
        }
        if let Some(rt_tolerance) = args.rt_tolerance {
            self.analysis.rt_tolerance = rt_tolerance;
        }
        if let Some(gap_penalty) = args.gap_penalty {
            self.analysis.gap_penalty = gap_penalty;
        }
        if let Some(min_peaks) = args.min_peaks {
            self.analysis.min_peaks = min_peaks;
        }
        if let Some(accumulation) = args.accumulation {
            self.analysis.accumulation = accumulation.into();
        }

        if self.input.is_none() {
            return Err(CliError::Config(
                "No input provided, please provide one in either the config file or with the --experiments flag".to_string(),
            ));
        }
        if self.output.is_none() {
            return Err(CliError::Config(
                "No output directory provided, please provide one in either the config file or with the --output-dir flag".to_string(),
            ));
        }
        Ok(())
    }
}
