//! Random-forest classifier loaded from the flat node arrays of its fitted trees.

use std::fs;
use std::path::Path;

use log::{debug, info};
use serde::Deserialize;

use crate::error::{PredictorError, Result};
use crate::records::{check_feature_order, FEATURE_COUNT};

const TREE_LEAF: i64 = -1;

/// Class value the classifier uses for "disease present".
pub const PRESENT_CLASS: i64 = 1;

const PROBABILITY_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassifierOutput {
    pub label: i64,
    pub probability_present: f64,
    pub probability_absent: f64,
}

/// Read-only model shared by every request.
pub trait Classifier: Send + Sync {
    fn n_features(&self) -> usize;

    fn predict(&self, features: &[f64]) -> Result<ClassifierOutput>;
}

#[derive(Debug, Clone, Deserialize)]
struct TreeArrays {
    children_left: Vec<i64>,
    children_right: Vec<i64>,
    feature: Vec<i64>,
    threshold: Vec<f64>,
    value: Vec<Vec<f64>>,
}

#[derive(Debug, Clone, Deserialize)]
struct ForestArtifact {
    feature_names: Vec<String>,
    classes: Vec<i64>,
    trees: Vec<TreeArrays>,
}

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        distribution: Vec<f64>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct DecisionTree {
    nodes: Vec<Node>,
}

impl DecisionTree {
    fn from_arrays(arrays: TreeArrays, n_classes: usize) -> std::result::Result<Self, String> {
        let n = arrays.children_left.len();
        if n == 0 {
            return Err("tree has no nodes".to_string());
        }
        if arrays.children_right.len() != n
            || arrays.feature.len() != n
            || arrays.threshold.len() != n
            || arrays.value.len() != n
        {
            return Err(format!("node arrays disagree on length {}", n));
        }

        let mut nodes = Vec::with_capacity(n);
        for idx in 0..n {
            let left = arrays.children_left[idx];
            let right = arrays.children_right[idx];
            if left == TREE_LEAF {
                if right != TREE_LEAF {
                    return Err(format!("node {} has only one child", idx));
                }
                let counts = &arrays.value[idx];
                if counts.len() != n_classes {
                    return Err(format!(
                        "leaf {} has {} class counts, expected {}",
                        idx,
                        counts.len(),
                        n_classes
                    ));
                }
                if counts.iter().any(|c| !c.is_finite() || *c < 0.0) {
                    return Err(format!("leaf {} has invalid class counts", idx));
                }
                let total: f64 = counts.iter().sum();
                if total <= 0.0 {
                    return Err(format!("leaf {} is empty", idx));
                }
                nodes.push(Node::Leaf {
                    distribution: counts.iter().map(|c| c / total).collect(),
                });
                continue;
            }

            // children always follow their parent, so traversal cannot loop
            let in_range = |child: i64| child > idx as i64 && (child as usize) < n;
            if !in_range(left) || !in_range(right) {
                return Err(format!("node {} has out-of-range children", idx));
            }
            let feature = arrays.feature[idx];
            if feature < 0 || feature as usize >= FEATURE_COUNT {
                return Err(format!("node {} splits on feature {}", idx, feature));
            }
            let threshold = arrays.threshold[idx];
            if !threshold.is_finite() {
                return Err(format!("node {} has a non-finite threshold", idx));
            }
            nodes.push(Node::Split {
                feature: feature as usize,
                threshold,
                left: left as usize,
                right: right as usize,
            });
        }
        Ok(Self { nodes })
    }

    fn leaf_distribution(&self, features: &[f64]) -> &[f64] {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if features[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
                Node::Leaf { distribution } => return distribution,
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RandomForest {
    classes: Vec<i64>,
    present_idx: usize,
    absent_idx: usize,
    trees: Vec<DecisionTree>,
}

impl RandomForest {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| PredictorError::artifact(path, e))?;
        let artifact: ForestArtifact =
            serde_json::from_str(&text).map_err(|e| PredictorError::artifact(path, e))?;
        let forest = Self::from_artifact(artifact).map_err(|e| match e {
            PredictorError::ArtifactLoad { reason, .. } => PredictorError::artifact(path, reason),
            other => other,
        })?;
        info!(
            "loaded classifier with {} trees from {:?}",
            forest.trees.len(),
            path
        );
        Ok(forest)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let artifact: ForestArtifact = serde_json::from_str(json)?;
        Self::from_artifact(artifact)
    }

    fn from_artifact(artifact: ForestArtifact) -> Result<Self> {
        check_feature_order(&artifact.feature_names)?;

        let classes = artifact.classes;
        if classes.len() != 2 || classes[0] == classes[1] {
            return Err(PredictorError::artifact(
                "<classifier>",
                format!("expected two distinct classes, found {:?}", classes),
            ));
        }
        let present_idx = classes
            .iter()
            .position(|c| *c == PRESENT_CLASS)
            .ok_or_else(|| {
                PredictorError::artifact(
                    "<classifier>",
                    format!("no class {} in {:?}", PRESENT_CLASS, classes),
                )
            })?;
        let absent_idx = 1 - present_idx;

        if artifact.trees.is_empty() {
            return Err(PredictorError::artifact("<classifier>", "forest has no trees"));
        }
        let trees = artifact
            .trees
            .into_iter()
            .enumerate()
            .map(|(i, arrays)| {
                DecisionTree::from_arrays(arrays, classes.len())
                    .map_err(|reason| PredictorError::artifact("<classifier>", format!("tree {}: {}", i, reason)))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            classes,
            present_idx,
            absent_idx,
            trees,
        })
    }

    pub fn classes(&self) -> &[i64] {
        &self.classes
    }

    /// Mean of the per-tree leaf class distributions, indexed like `classes()`.
    pub fn predict_proba(&self, features: &[f64]) -> Result<Vec<f64>> {
        if features.len() != FEATURE_COUNT {
            return Err(PredictorError::shape(FEATURE_COUNT, features.len()));
        }
        let mut proba = vec![0.0; self.classes.len()];
        for tree in self.trees.iter() {
            for (acc, p) in proba.iter_mut().zip(tree.leaf_distribution(features)) {
                *acc += p;
            }
        }
        let n_trees = self.trees.len() as f64;
        proba.iter_mut().for_each(|p| *p /= n_trees);
        Ok(proba)
    }
}

impl Classifier for RandomForest {
    fn n_features(&self) -> usize {
        FEATURE_COUNT
    }

    fn predict(&self, features: &[f64]) -> Result<ClassifierOutput> {
        let proba = self.predict_proba(features)?;

        // ties go to the first class listed
        let mut best = 0;
        for (idx, p) in proba.iter().enumerate() {
            if *p > proba[best] {
                best = idx;
            }
        }

        let output = ClassifierOutput {
            label: self.classes[best],
            probability_present: proba[self.present_idx],
            probability_absent: proba[self.absent_idx],
        };
        let sum = output.probability_present + output.probability_absent;
        if (sum - 1.0).abs() > PROBABILITY_TOLERANCE {
            return Err(PredictorError::InvalidProbabilities { sum });
        }
        debug!("classifier output {:?}", output);
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::FEATURE_ORDER;

    fn forest_json(classes: &str, trees: &str) -> String {
        format!(
            r#"{{"feature_names": {}, "classes": {}, "trees": {}}}"#,
            serde_json::to_string(&FEATURE_ORDER).unwrap(),
            classes,
            trees
        )
    }

    // one split on oldpeak (index 9) at 1.0
    const STUMP: &str = r#"[{
        "children_left": [1, -1, -1],
        "children_right": [2, -1, -1],
        "feature": [9, -2, -2],
        "threshold": [1.0, -2.0, -2.0],
        "value": [[50.0, 50.0], [30.0, 10.0], [5.0, 15.0]]
    }]"#;

    fn row_with_oldpeak(oldpeak: f64) -> Vec<f64> {
        let mut row = vec![0.0; FEATURE_COUNT];
        row[9] = oldpeak;
        row
    }

    #[test]
    fn stump_routes_by_threshold() {
        let forest = RandomForest::from_json(&forest_json("[0, 1]", STUMP)).unwrap();

        let low = forest.predict(&row_with_oldpeak(1.0)).unwrap();
        assert_eq!(low.label, 0);
        assert!((low.probability_present - 0.25).abs() < 1e-12);
        assert!((low.probability_absent - 0.75).abs() < 1e-12);

        let high = forest.predict(&row_with_oldpeak(1.5)).unwrap();
        assert_eq!(high.label, 1);
        assert!((high.probability_present - 0.75).abs() < 1e-12);
    }

    #[test]
    fn present_probability_follows_class_list() {
        let forest = RandomForest::from_json(&forest_json("[1, 0]", STUMP)).unwrap();
        let low = forest.predict(&row_with_oldpeak(0.0)).unwrap();
        // first column now counts class 1
        assert_eq!(low.label, 1);
        assert!((low.probability_present - 0.75).abs() < 1e-12);
        assert!((low.probability_absent - 0.25).abs() < 1e-12);
    }

    #[test]
    fn forest_averages_trees() {
        let trees = format!(
            "[{}, {}]",
            &STUMP[1..STUMP.len() - 1],
            r#"{"children_left": [-1], "children_right": [-1], "feature": [-2],
                "threshold": [-2.0], "value": [[1.0, 3.0]]}"#
        );
        let forest = RandomForest::from_json(&forest_json("[0, 1]", &trees)).unwrap();
        let proba = forest.predict_proba(&row_with_oldpeak(0.0)).unwrap();
        assert!((proba[1] - 0.5).abs() < 1e-12);
        assert!((proba[0] + proba[1] - 1.0).abs() < 1e-12);
        // 0.5 / 0.5 tie resolves to the first class
        assert_eq!(forest.predict(&row_with_oldpeak(0.0)).unwrap().label, 0);
    }

    #[test]
    fn malformed_artifacts_are_rejected() {
        let cyclic = r#"[{"children_left": [0], "children_right": [0], "feature": [0],
            "threshold": [0.0], "value": [[1.0, 1.0]]}]"#;
        assert!(matches!(
            RandomForest::from_json(&forest_json("[0, 1]", cyclic)),
            Err(PredictorError::ArtifactLoad { .. })
        ));

        let bad_feature = STUMP.replace("[9, -2, -2]", "[13, -2, -2]");
        assert!(RandomForest::from_json(&forest_json("[0, 1]", &bad_feature)).is_err());

        let empty_leaf = STUMP.replace("[5.0, 15.0]", "[0.0, 0.0]");
        assert!(RandomForest::from_json(&forest_json("[0, 1]", &empty_leaf)).is_err());

        assert!(RandomForest::from_json(&forest_json("[0, 2]", STUMP)).is_err());
        assert!(RandomForest::from_json(&forest_json("[0, 1]", "[]")).is_err());
    }

    #[test]
    fn wrong_width_is_a_shape_mismatch() {
        let forest = RandomForest::from_json(&forest_json("[0, 1]", STUMP)).unwrap();
        assert!(matches!(
            forest.predict(&[0.0; 5]),
            Err(PredictorError::FeatureShapeMismatch { .. })
        ));
    }
}
