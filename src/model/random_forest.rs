//! Random Forest wrapper: JSON-configured hyperparameters, grid-search
//! tuning scored by cross-validated macro recall, and train/dev evaluation.

use std::fs::File;
use std::path::Path;

use anyhow::{anyhow, bail, ensure, Context, Result};
use serde::Deserialize;
use smartcore::ensemble::random_forest_classifier::{
    RandomForestClassifier, RandomForestClassifierParameters,
};
use smartcore::linalg::basic::matrix::DenseMatrix;
use smartcore::tree::decision_tree_classifier::SplitCriterion;
use tracing::{debug, info};

/// Printed name of this model family.
pub const MODEL_NAME: &str = "RF";

const CV_FOLDS: usize = 5;
const SEED: u64 = 42;

type Forest = RandomForestClassifier<f64, u32, DenseMatrix<f64>, Vec<u32>>;

/// Hyperparameters mirroring the `parameters` object of the config JSON.
/// All fields are optional; an entirely absent set means "not tuned yet".
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct HyperParams {
    #[serde(default)]
    pub n_estimators: Option<u16>,
    #[serde(default)]
    pub max_features: Option<String>,
    #[serde(default)]
    pub max_depth: Option<u16>,
    #[serde(default)]
    pub criterion: Option<String>,
}

impl HyperParams {
    pub fn is_empty(&self) -> bool {
        *self == HyperParams::default()
    }

    /// Translate into smartcore forest parameters for a dataset with
    /// `n_features` columns.
    fn to_forest_parameters(
        &self,
        n_features: usize,
        seed: u64,
    ) -> Result<RandomForestClassifierParameters> {
        let mut params = RandomForestClassifierParameters::default().with_seed(seed);
        if let Some(n_trees) = self.n_estimators {
            params = params.with_n_trees(n_trees);
        }
        if let Some(depth) = self.max_depth {
            params = params.with_max_depth(depth);
        }
        if let Some(criterion) = &self.criterion {
            params = params.with_criterion(parse_criterion(criterion)?);
        }
        if let Some(max_features) = &self.max_features {
            params = params.with_m(resolve_max_features(max_features, n_features)?);
        }
        Ok(params)
    }
}

fn parse_criterion(name: &str) -> Result<SplitCriterion> {
    match name {
        "gini" => Ok(SplitCriterion::Gini),
        "entropy" => Ok(SplitCriterion::Entropy),
        other => bail!("unsupported split criterion {:?}", other),
    }
}

/// "auto" and "sqrt" both resolve to the square root of the feature count,
/// matching what the original hyperparameter space meant by either value.
fn resolve_max_features(name: &str, n_features: usize) -> Result<usize> {
    match name {
        "auto" | "sqrt" => Ok(((n_features as f64).sqrt().round() as usize).max(1)),
        other => bail!("unsupported max_features value {:?}", other),
    }
}

/// Model config JSON shape: `{"parameters": {...}}`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModelConfig {
    #[serde(default)]
    pub parameters: HyperParams,
}

/// One side of the train/dev split: feature rows plus class targets.
#[derive(Debug, Clone, Default)]
pub struct SplitData {
    pub features: Vec<Vec<f64>>,
    pub targets: Vec<u32>,
}

impl SplitData {
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    fn n_features(&self) -> usize {
        self.features.first().map_or(0, Vec::len)
    }

    fn matrix(&self) -> Result<DenseMatrix<f64>> {
        ensure!(!self.is_empty(), "cannot build a matrix from an empty split");
        ensure!(
            self.features.len() == self.targets.len(),
            "split has {} feature rows but {} targets",
            self.features.len(),
            self.targets.len()
        );
        Ok(DenseMatrix::from_2d_vec(&self.features))
    }
}

/// Random Forest classifier over assembled feature splits.
///
/// Tuning merges the best grid parameters into the in-memory config only;
/// the JSON file on disk is never rewritten.
#[derive(Debug)]
pub struct RandomForestModel {
    config: ModelConfig,
    data_paths: serde_json::Value,
    feature_name: String,
    train_split: SplitData,
    dev_split: SplitData,
    forest: Option<Forest>,
}

impl RandomForestModel {
    pub fn new(
        config_path: &Path,
        data_paths_path: &Path,
        feature_name: impl Into<String>,
        train_split: SplitData,
        dev_split: SplitData,
    ) -> Result<Self> {
        let config_file = File::open(config_path).with_context(|| {
            format!("failed to open model config {}", config_path.display())
        })?;
        let config: ModelConfig = serde_json::from_reader(config_file).with_context(|| {
            format!("malformed model config {}", config_path.display())
        })?;

        let manifest_file = File::open(data_paths_path).with_context(|| {
            format!("failed to open data-path manifest {}", data_paths_path.display())
        })?;
        let data_paths: serde_json::Value =
            serde_json::from_reader(manifest_file).with_context(|| {
                format!("malformed data-path manifest {}", data_paths_path.display())
            })?;
        info!(
            "loaded data-path manifest with {} top-level entries",
            data_paths.as_object().map_or(0, |map| map.len())
        );

        Ok(Self {
            config,
            data_paths,
            feature_name: feature_name.into(),
            train_split,
            dev_split,
            forest: None,
        })
    }

    pub fn parameters(&self) -> &HyperParams {
        &self.config.parameters
    }

    pub fn data_paths(&self) -> &serde_json::Value {
        &self.data_paths
    }

    /// Ensure hyperparameters exist (tuning first when the config is
    /// empty), then train.
    pub fn run(&mut self) -> Result<()> {
        if self.config.parameters.is_empty() {
            println!("\nHyperparameters are not tuned yet.");
            self.tune()?;
        }
        self.train()
    }

    /// Fit the forest on the stored training split.
    pub fn train(&mut self) -> Result<()> {
        println!("\nTraining a Random Forest classifier ({})...", MODEL_NAME);
        let x = self.train_split.matrix()?;
        let params = self
            .config
            .parameters
            .to_forest_parameters(self.train_split.n_features(), SEED)?;
        let forest = RandomForestClassifier::fit(&x, &self.train_split.targets, params)
            .map_err(|err| anyhow!("failed to fit random forest: {err}"))?;
        self.forest = Some(forest);
        Ok(())
    }

    /// Predict on both splits and print accuracy; nothing is returned or
    /// persisted.
    pub fn evaluate(&self) -> Result<()> {
        println!(
            "\nEvaluating the Random Forest classifier on {} features...",
            self.feature_name
        );
        let forest = self
            .forest
            .as_ref()
            .context("model has not been trained yet")?;

        let train_pred = forest
            .predict(&self.train_split.matrix()?)
            .map_err(|err| anyhow!("failed to predict on training set: {err}"))?;
        let dev_pred = forest
            .predict(&self.dev_split.matrix()?)
            .map_err(|err| anyhow!("failed to predict on development set: {err}"))?;

        println!(
            "Accuracy on training set: {:.3}",
            accuracy(&self.train_split.targets, &train_pred)
        );
        println!(
            "Accuracy on development set: {:.3}",
            accuracy(&self.dev_split.targets, &dev_pred)
        );
        Ok(())
    }

    /// Grid search over the fixed hyperparameter space, scored by 5-fold
    /// cross-validated macro recall on the training split. The winning
    /// parameters replace the in-memory config.
    pub fn tune(&mut self) -> Result<()> {
        println!("\nRunning grid search for the Random Forest classifier...");
        let mut best: Option<(f64, HyperParams)> = None;
        for candidate in parameter_grid() {
            let score = cross_validated_macro_recall(&self.train_split, &candidate, CV_FOLDS)?;
            debug!(?candidate, score, "grid search candidate scored");
            if best
                .as_ref()
                .is_none_or(|(best_score, _)| score > *best_score)
            {
                best = Some((score, candidate));
            }
        }

        let (score, parameters) = best.context("hyperparameter grid is empty")?;
        println!(
            "Best hyperparameters (macro recall {:.3}): {:?}",
            score, parameters
        );
        self.config.parameters = parameters;
        Ok(())
    }
}

/// The fixed tuning space: 3 tree counts x 2 feature subsets x 3 depths x
/// 2 split criteria.
fn parameter_grid() -> Vec<HyperParams> {
    let mut grid = Vec::new();
    for &n_estimators in &[100u16, 200, 300] {
        for max_features in ["auto", "sqrt"] {
            for &max_depth in &[10u16, 20, 30] {
                for criterion in ["gini", "entropy"] {
                    grid.push(HyperParams {
                        n_estimators: Some(n_estimators),
                        max_features: Some(max_features.to_string()),
                        max_depth: Some(max_depth),
                        criterion: Some(criterion.to_string()),
                    });
                }
            }
        }
    }
    grid
}

/// Fraction of predictions matching the truth; 0.0 for empty input.
pub fn accuracy(truth: &[u32], predicted: &[u32]) -> f64 {
    if truth.is_empty() || truth.len() != predicted.len() {
        return 0.0;
    }
    let correct = truth
        .iter()
        .zip(predicted.iter())
        .filter(|(t, p)| t == p)
        .count();
    correct as f64 / truth.len() as f64
}

/// Unweighted mean of per-class recall over the classes present in the
/// truth labels.
pub fn macro_recall(truth: &[u32], predicted: &[u32]) -> f64 {
    if truth.is_empty() || truth.len() != predicted.len() {
        return 0.0;
    }
    let mut classes: Vec<u32> = truth.to_vec();
    classes.sort_unstable();
    classes.dedup();

    let mut total = 0.0;
    for class in &classes {
        let relevant = truth.iter().filter(|&&t| t == *class).count();
        let hits = truth
            .iter()
            .zip(predicted.iter())
            .filter(|(&t, &p)| t == *class && p == *class)
            .count();
        total += hits as f64 / relevant as f64;
    }
    total / classes.len() as f64
}

/// K-fold cross-validated macro recall for one hyperparameter candidate.
///
/// Folds are assigned round-robin so both cohorts appear in every fold
/// regardless of row order. Folds left without training or validation rows
/// are skipped.
fn cross_validated_macro_recall(
    data: &SplitData,
    candidate: &HyperParams,
    folds: usize,
) -> Result<f64> {
    ensure!(folds > 1, "cross-validation needs at least two folds");
    let mut scores = Vec::with_capacity(folds);

    for fold in 0..folds {
        let mut fit = SplitData::default();
        let mut holdout = SplitData::default();
        for (index, (row, target)) in data
            .features
            .iter()
            .zip(data.targets.iter())
            .enumerate()
        {
            let side = if index % folds == fold {
                &mut holdout
            } else {
                &mut fit
            };
            side.features.push(row.clone());
            side.targets.push(*target);
        }
        if fit.is_empty() || holdout.is_empty() {
            continue;
        }

        let params = candidate.to_forest_parameters(fit.n_features(), SEED + fold as u64)?;
        let forest = RandomForestClassifier::fit(&fit.matrix()?, &fit.targets, params)
            .map_err(|err| anyhow!("failed to fit cross-validation fold {fold}: {err}"))?;
        let predicted = forest
            .predict(&holdout.matrix()?)
            .map_err(|err| anyhow!("failed to predict cross-validation fold {fold}: {err}"))?;
        scores.push(macro_recall(&holdout.targets, &predicted));
    }

    ensure!(!scores.is_empty(), "no usable cross-validation folds");
    Ok(scores.iter().sum::<f64>() / scores.len() as f64)
}
