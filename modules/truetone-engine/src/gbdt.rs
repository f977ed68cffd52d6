//! Loader and evaluator for the trained gradient-boosted model, stored as a
//! LightGBM text dump. Only the subset of the format the artifact uses is
//! supported: numerical splits, binary objective, single output class.

use std::collections::HashMap;
use std::path::Path;
use std::time::Instant;

use anyhow::{bail, Context, Result};
use tracing::info;

use crate::features::{FEATURE_NAMES, NUM_FEATURES};

/// Scoring seam over the trained artifact so tests can stub scores.
pub trait ScoreModel: Send + Sync {
    /// Continuous score in [0, 1] for one tabular row.
    fn score(&self, row: &[f64; NUM_FEATURES]) -> f64;
}

/// Decision-type flag marking the branch NaN values take.
const MASK_DEFAULT_LEFT: u32 = 2;
/// Decision-type flag marking a categorical split, which this artifact never
/// contains.
const MASK_CATEGORICAL: u32 = 1;

#[derive(Debug)]
struct Tree {
    split_feature: Vec<usize>,
    threshold: Vec<f64>,
    decision_type: Vec<u32>,
    left_child: Vec<i32>,
    right_child: Vec<i32>,
    leaf_value: Vec<f64>,
}

impl Tree {
    fn evaluate(&self, row: &[f64; NUM_FEATURES]) -> f64 {
        // A stump holds a single leaf and no split arrays.
        if self.split_feature.is_empty() {
            return self.leaf_value.first().copied().unwrap_or(0.0);
        }

        let mut node = 0usize;
        loop {
            let value = row[self.split_feature[node]];
            let go_left = if value.is_nan() {
                self.decision_type[node] & MASK_DEFAULT_LEFT != 0
            } else {
                value <= self.threshold[node]
            };

            let child = if go_left {
                self.left_child[node]
            } else {
                self.right_child[node]
            };

            if child < 0 {
                // Negative child index encodes leaf ~index.
                return self.leaf_value[(-child - 1) as usize];
            }
            node = child as usize;
        }
    }
}

#[derive(Debug)]
pub struct GbdtModel {
    trees: Vec<Tree>,
    sigmoid: bool,
}

impl GbdtModel {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!(path = %path.display(), "Loading video classification model");
        let start = Instant::now();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read model file {}", path.display()))?;
        let model = Self::parse(&text)?;
        info!(
            trees = model.trees.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Model loaded"
        );
        Ok(model)
    }

    /// Parse the text dump. The model's feature list must match
    /// [`FEATURE_NAMES`] exactly; a drifted artifact fails here, at load
    /// time, not at prediction time.
    pub fn parse(text: &str) -> Result<Self> {
        let mut feature_names: Option<Vec<String>> = None;
        let mut objective: Option<String> = None;
        let mut trees = Vec::new();

        let mut lines = text.lines().peekable();
        while let Some(line) = lines.next() {
            let line = line.trim();
            if let Some(names) = line.strip_prefix("feature_names=") {
                feature_names = Some(names.split_whitespace().map(str::to_string).collect());
            } else if let Some(obj) = line.strip_prefix("objective=") {
                objective = Some(obj.to_string());
            } else if line.starts_with("Tree=") {
                let mut fields: HashMap<&str, &str> = HashMap::new();
                while let Some(&next) = lines.peek() {
                    let next = next.trim();
                    if next.is_empty() || next.starts_with("Tree=") || next == "end of trees" {
                        break;
                    }
                    lines.next();
                    if let Some((key, value)) = next.split_once('=') {
                        fields.insert(key, value);
                    }
                }
                trees.push(parse_tree(&fields)?);
            }
        }

        let names = feature_names.context("model file has no feature_names line")?;
        if names != FEATURE_NAMES {
            bail!(
                "model feature list does not match the extractor: expected {:?}, got {:?}",
                FEATURE_NAMES,
                names
            );
        }

        if trees.is_empty() {
            bail!("model file contains no trees");
        }

        let objective = objective.context("model file has no objective line")?;
        let sigmoid = objective.starts_with("binary");

        Ok(Self { trees, sigmoid })
    }
}

fn parse_tree(fields: &HashMap<&str, &str>) -> Result<Tree> {
    fn vec_of<T: std::str::FromStr>(fields: &HashMap<&str, &str>, key: &str) -> Result<Vec<T>>
    where
        T::Err: std::error::Error + Send + Sync + 'static,
    {
        match fields.get(key) {
            None => Ok(Vec::new()),
            Some(raw) => raw
                .split_whitespace()
                .map(|token| {
                    token
                        .parse()
                        .with_context(|| format!("bad value in {key}: {token}"))
                })
                .collect(),
        }
    }

    let tree = Tree {
        split_feature: vec_of(fields, "split_feature")?,
        threshold: vec_of(fields, "threshold")?,
        decision_type: vec_of(fields, "decision_type")?,
        left_child: vec_of(fields, "left_child")?,
        right_child: vec_of(fields, "right_child")?,
        leaf_value: vec_of(fields, "leaf_value")?,
    };

    let splits = tree.split_feature.len();
    if tree.threshold.len() != splits
        || tree.decision_type.len() != splits
        || tree.left_child.len() != splits
        || tree.right_child.len() != splits
    {
        bail!("tree split arrays have inconsistent lengths");
    }
    if tree.leaf_value.is_empty() {
        bail!("tree has no leaf values");
    }
    for feature in &tree.split_feature {
        if *feature >= NUM_FEATURES {
            bail!("tree references feature index {feature} out of range");
        }
    }
    for decision in &tree.decision_type {
        if decision & MASK_CATEGORICAL != 0 {
            bail!("categorical splits are not supported");
        }
    }

    Ok(tree)
}

impl ScoreModel for GbdtModel {
    fn score(&self, row: &[f64; NUM_FEATURES]) -> f64 {
        let raw: f64 = self.trees.iter().map(|tree| tree.evaluate(row)).sum();
        if self.sigmoid {
            1.0 / (1.0 + (-raw).exp())
        } else {
            raw
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names_line() -> String {
        format!("feature_names={}\n", FEATURE_NAMES.join(" "))
    }

    /// One split on feature 0 at threshold 0.5, left leaf 2.0, right leaf -2.0.
    fn single_split_model() -> String {
        format!(
            "tree\nversion=v4\nobjective=binary sigmoid:1\n{}\n\
             Tree=0\nnum_leaves=2\nsplit_feature=0\nthreshold=0.5\ndecision_type=2\n\
             left_child=-1\nright_child=-2\nleaf_value=2.0 -2.0\n\nend of trees\n",
            names_line()
        )
    }

    fn row_with(feature: usize, value: f64) -> [f64; NUM_FEATURES] {
        let mut row = [0.0; NUM_FEATURES];
        row[feature] = value;
        row
    }

    #[test]
    fn routes_by_threshold_and_applies_sigmoid() {
        let model = GbdtModel::parse(&single_split_model()).unwrap();

        let low = model.score(&row_with(0, 0.25));
        let high = model.score(&row_with(0, 0.75));

        let sigmoid = |x: f64| 1.0 / (1.0 + (-x).exp());
        assert!((low - sigmoid(2.0)).abs() < 1e-12);
        assert!((high - sigmoid(-2.0)).abs() < 1e-12);
    }

    #[test]
    fn boundary_value_goes_left() {
        let model = GbdtModel::parse(&single_split_model()).unwrap();
        // value <= threshold routes left
        assert!(model.score(&row_with(0, 0.5)) > 0.5);
    }

    #[test]
    fn nan_routes_by_default_left_bit() {
        let model = GbdtModel::parse(&single_split_model()).unwrap();
        // decision_type=2 sets default-left, so NaN lands on the left leaf.
        assert!(model.score(&row_with(0, f64::NAN)) > 0.5);
    }

    #[test]
    fn multiple_trees_sum_before_sigmoid() {
        let two_trees = format!(
            "tree\nobjective=binary sigmoid:1\n{}\n\
             Tree=0\nsplit_feature=0\nthreshold=0.5\ndecision_type=2\n\
             left_child=-1\nright_child=-2\nleaf_value=1.0 -1.0\n\n\
             Tree=1\nsplit_feature=1\nthreshold=10\ndecision_type=2\n\
             left_child=-1\nright_child=-2\nleaf_value=0.5 -0.5\n\nend of trees\n",
            names_line()
        );
        let model = GbdtModel::parse(&two_trees).unwrap();

        let mut row = [0.0; NUM_FEATURES];
        row[0] = 0.0; // left: +1.0
        row[1] = 20.0; // right: -0.5
        let expected = 1.0 / (1.0 + (-0.5f64).exp());
        assert!((model.score(&row) - expected).abs() < 1e-12);
    }

    #[test]
    fn mismatched_feature_names_fail_at_load() {
        let bad = single_split_model().replace("readability_score", "readability");
        let err = GbdtModel::parse(&bad).unwrap_err();
        assert!(err.to_string().contains("feature list"));
    }

    #[test]
    fn missing_trees_fail_at_load() {
        let empty = format!("tree\nobjective=binary sigmoid:1\n{}\nend of trees\n", names_line());
        assert!(GbdtModel::parse(&empty).is_err());
    }
}
