use indicatif::{
    ProgressBar,
    ProgressStyle,
};
use peakalign::{
    Alignment,
    DpAligner,
    Experiment,
    GuideTree,
    PairwiseAlignment,
    TreeAligner,
    TreeProgress,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::io::{
    BufWriter,
    Write,
};
use std::path::Path;
use std::time::Instant;
use tracing::{
    debug,
    info,
    warn,
};

use crate::config::{
    AnalysisConfig,
    InputConfig,
    OutputConfig,
};
use crate::errors::CliError;

pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, CliError> {
    let file = std::fs::File::open(path).map_err(|e| CliError::io(e, path))?;
    serde_json::from_reader(std::io::BufReader::new(file)).map_err(|e| CliError::Json {
        source: e,
        path: path.to_path_buf(),
    })
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), CliError> {
    let file = std::fs::File::create(path).map_err(|e| CliError::io(e, path))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, value).map_err(|e| CliError::Json {
        source: e,
        path: path.to_path_buf(),
    })?;
    writer.flush().map_err(|e| CliError::io(e, path))
}

/// Uses the tree from `input` when there is one, otherwise clusters the
/// pairwise alignments of `leaves` and saves the resulting tree.
fn resolve_guide_tree(
    input: &InputConfig,
    analysis: &AnalysisConfig,
    leaves: &[Alignment],
    output: &OutputConfig,
) -> Result<GuideTree, CliError> {
    if let Some(path) = &input.guide_tree {
        info!("Reading guide tree from {:?}", path);
        let tree: GuideTree = read_json(path)?;
        if tree.rt_tolerance != analysis.rt_tolerance || tree.gap_penalty != analysis.gap_penalty {
            warn!(
                "Guide tree parameters (rt_tolerance={}, gap_penalty={}) differ from the configured ones, using the tree's",
                tree.rt_tolerance, tree.gap_penalty
            );
        }
        return Ok(tree);
    }

    let aligner = DpAligner::new(analysis.rt_tolerance, analysis.gap_penalty)?
        .with_accumulation(analysis.accumulation);
    let pairwise = PairwiseAlignment::new(leaves.to_vec(), aligner)?;
    let tree = pairwise.guide_tree();
    let tree_path = output.directory.join("guide_tree.json");
    write_json(&tree_path, &tree)?;
    info!("Wrote guide tree to {:?}", tree_path);
    Ok(tree)
}

pub fn run(
    input: &InputConfig,
    analysis: &AnalysisConfig,
    output: &OutputConfig,
) -> Result<(), CliError> {
    let start = Instant::now();
    info!("Reading experiments from {:?}", input.experiments);
    let experiments: Vec<Experiment> = read_json(&input.experiments)?;
    let num_peaks: usize = experiments.iter().map(|x| x.len()).sum();
    info!(
        "Loaded {} experiments with {} peaks",
        experiments.len(),
        num_peaks
    );

    let leaves = Alignment::build(&experiments)?;
    let tree = resolve_guide_tree(input, analysis, &leaves, output)?;

    let style = ProgressStyle::with_template(
        "{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} ({eta}) {msg}",
    )
    .unwrap_or_else(|_| ProgressStyle::default_bar());
    let pb = ProgressBar::new(tree.nodes.len() as u64).with_style(style);
    let mut observer = |event: TreeProgress| match event {
        TreeProgress::Started {
            items,
            rt_tolerance,
            gap_penalty,
        } => {
            debug!(
                "Aligning {} items with rt_tolerance={} gap_penalty={}",
                items, rt_tolerance, gap_penalty
            );
        }
        TreeProgress::NodeStarted { node, left, right } => {
            debug!("Merging {} and {} into node {}", left, right, node);
        }
        TreeProgress::NodeMerged { remaining, .. } => {
            pb.inc(1);
            pb.set_message(format!("{} remaining", remaining));
        }
        TreeProgress::Finished { .. } => pb.finish_and_clear(),
    };

    let alignment = TreeAligner::new()
        .with_accumulation(analysis.accumulation)
        .align_observed(&leaves, &tree, analysis.min_peaks, &mut observer)?;

    let out_path = output.directory.join("alignment.json");
    write_json(&out_path, &alignment)?;
    info!(
        "Wrote alignment to {:?}, finished in {:?}",
        out_path,
        start.elapsed()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use peakalign::{
        Peak,
        TreeNode,
    };
    use std::path::PathBuf;

    fn fresh_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(name);
        if dir.exists() {
            std::fs::remove_dir_all(&dir).unwrap();
        }
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn write_experiments(dir: &Path) -> PathBuf {
        let experiments: Vec<Experiment> = ["a", "b", "c"]
            .iter()
            .enumerate()
            .map(|(i, code)| {
                let shift = i as f64 * 0.5;
                Experiment::new(
                    *code,
                    vec![
                        Peak::new(120.0 + shift, vec![10.0, 1.0, 0.0]),
                        Peak::new(300.0 + shift, vec![0.0, 5.0, 5.0]),
                    ],
                )
            })
            .collect();
        let path = dir.join("runs.json");
        write_json(&path, &experiments).unwrap();
        path
    }

    fn read_value(path: &Path) -> serde_json::Value {
        read_json(path).unwrap()
    }

    #[test]
    fn test_run_builds_and_saves_guide_tree() {
        let dir = fresh_dir("peakalign_cli_test_built_tree");
        let input = InputConfig {
            experiments: write_experiments(&dir),
            guide_tree: None,
        };
        let output = OutputConfig {
            directory: dir.join("out"),
        };
        std::fs::create_dir_all(&output.directory).unwrap();

        run(&input, &AnalysisConfig::default(), &output).unwrap();

        let tree: GuideTree = read_json(&output.directory.join("guide_tree.json")).unwrap();
        assert_eq!(tree.nodes.len(), 2);
        assert_eq!(tree.rt_tolerance, 2.5);
        assert_eq!(tree.gap_penalty, 0.30);

        let alignment = read_value(&output.directory.join("alignment.json"));
        assert_eq!(alignment["expr_code"].as_array().unwrap().len(), 3);
        let rows = alignment["peakpos"].as_array().unwrap();
        assert_eq!(rows.len(), 3);
        assert!(rows.iter().all(|r| r.as_array().unwrap().len() == 2));
        assert!(alignment["similarity"].is_number());
    }

    #[test]
    fn test_run_with_given_guide_tree() {
        let dir = fresh_dir("peakalign_cli_test_given_tree");
        let tree_path = dir.join("tree.json");
        let tree = GuideTree::new(vec![TreeNode::new(2, 0), TreeNode::new(-1, 1)], 2.5, 0.3);
        write_json(&tree_path, &tree).unwrap();
        let input = InputConfig {
            experiments: write_experiments(&dir),
            guide_tree: Some(tree_path),
        };
        let output = OutputConfig {
            directory: dir.clone(),
        };

        run(&input, &AnalysisConfig::default(), &output).unwrap();

        assert!(!dir.join("guide_tree.json").exists());
        let alignment = read_value(&dir.join("alignment.json"));
        let codes: Vec<&str> = alignment["expr_code"]
            .as_array()
            .unwrap()
            .iter()
            .map(|c| c.as_str().unwrap())
            .collect();
        assert_eq!(codes, vec!["c", "a", "b"]);
    }

    #[test]
    fn test_run_rejects_tree_dropping_an_experiment() {
        let dir = fresh_dir("peakalign_cli_test_bad_tree");
        let tree_path = dir.join("tree.json");
        let tree = GuideTree::new(vec![TreeNode::new(0, 0), TreeNode::new(-1, 1)], 2.5, 0.3);
        write_json(&tree_path, &tree).unwrap();
        let input = InputConfig {
            experiments: write_experiments(&dir),
            guide_tree: Some(tree_path),
        };
        let output = OutputConfig {
            directory: dir.clone(),
        };

        let res = run(&input, &AnalysisConfig::default(), &output);
        assert!(matches!(res, Err(CliError::Alignment(_))));
        assert!(!dir.join("alignment.json").exists());
    }

    #[test]
    fn test_missing_experiments_file() {
        let dir = fresh_dir("peakalign_cli_test_missing_input");
        let input = InputConfig {
            experiments: dir.join("nope.json"),
            guide_tree: None,
        };
        let output = OutputConfig {
            directory: dir.clone(),
        };
        let res = run(&input, &AnalysisConfig::default(), &output);
        assert!(matches!(res, Err(CliError::Io { .. })));
    }
}
