use crate::model::{FeatureRow, FeatureValue};
use crate::services::model_loader::LoadError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Artifact versions this build knows how to evaluate.
const SUPPORTED_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum PredictionError {
    #[error("Missing required feature column: {0}")]
    MissingField(String),
    #[error("Unexpected feature column: {0}")]
    UnexpectedField(String),
    #[error("Feature column {position} should be {expected}, found {found}")]
    FieldOrder {
        position: usize,
        expected: String,
        found: String,
    },
    #[error("Feature column {column} expects a {expected} value, got a {found} value")]
    TypeMismatch {
        column: String,
        expected: ColumnKind,
        found: &'static str,
    },
    #[error("Found unknown category '{category}' in column {column} during transform")]
    UnknownCategory { column: String, category: String },
    #[error("Model produced a non-finite output: {0}")]
    NonFiniteOutput(f64),
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    Categorical,
    Float,
    Integer,
}

impl std::fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let str = match self {
            ColumnKind::Categorical => "categorical",
            ColumnKind::Float => "float",
            ColumnKind::Integer => "integer",
        };
        write!(f, "{}", str)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub kind: ColumnKind,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum HandleUnknown {
    #[default]
    Ignore,
    Error,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct EncodedColumn {
    pub name: String,
    pub categories: Vec<String>,
}

/// One-hot encoder over the categorical columns of the schema.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct OneHotEncoder {
    pub columns: Vec<EncodedColumn>,
    #[serde(default)]
    pub handle_unknown: HandleUnknown,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct SplitNode {
    pub feature_idx: usize,
    pub threshold: f64,
    pub left: Box<TreeNode>,
    pub right: Box<TreeNode>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct LeafNode {
    pub value: f64,
    #[serde(default)]
    pub n_samples: usize,
}

/// A regression tree node. Samples with `feature <= threshold` go left.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub enum TreeNode {
    Node(SplitNode),
    Leaf(LeafNode),
}

impl TreeNode {
    fn evaluate(&self, features: &[f64]) -> f64 {
        let mut node = self;
        loop {
            match node {
                TreeNode::Leaf(leaf) => return leaf.value,
                TreeNode::Node(split) => {
                    node = if features[split.feature_idx] <= split.threshold {
                        &split.left
                    } else {
                        &split.right
                    };
                }
            }
        }
    }

    fn validate(&self, n_features: usize) -> Result<(), String> {
        match self {
            TreeNode::Leaf(leaf) if !leaf.value.is_finite() => {
                Err(format!("leaf value {} is not finite", leaf.value))
            }
            TreeNode::Leaf(_) => Ok(()),
            TreeNode::Node(split) => {
                if split.feature_idx >= n_features {
                    return Err(format!(
                        "split on feature {} but the encoded input has {} features",
                        split.feature_idx, n_features
                    ));
                }
                if !split.threshold.is_finite() {
                    return Err(format!("split threshold {} is not finite", split.threshold));
                }
                split.left.validate(n_features)?;
                split.right.validate(n_features)
            }
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ForestRegressor {
    pub trees: Vec<TreeNode>,
}

impl ForestRegressor {
    fn predict(&self, features: &[f64]) -> f64 {
        let sum: f64 = self.trees.iter().map(|tree| tree.evaluate(features)).sum();
        sum / self.trees.len() as f64
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
struct Artifact {
    format_version: u32,
    target: String,
    schema: Vec<Column>,
    encoder: OneHotEncoder,
    regressor: ForestRegressor,
}

/// Summary of a loaded model, as reported by `GET /v1/model`.
#[derive(Serialize, Debug, Clone)]
pub struct ModelInfo {
    pub format_version: u32,
    pub target: String,
    pub schema: Vec<Column>,
    pub categories: Vec<EncodedColumn>,
    pub n_features: usize,
    pub n_trees: usize,
}

/// A fitted encoding + forest pipeline. Immutable once built.
#[derive(Debug)]
pub struct ModelHandle {
    artifact: Artifact,
    n_features: usize,
}

impl ModelHandle {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&contents).map_err(|err| match err {
            LoadError::Parse { source, .. } => LoadError::Parse {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })
    }

    pub fn from_json(json: &str) -> Result<Self, LoadError> {
        let artifact: Artifact = serde_json::from_str(json).map_err(|source| LoadError::Parse {
            path: "<inline>".into(),
            source,
        })?;
        Self::from_artifact(artifact)
    }

    fn from_artifact(artifact: Artifact) -> Result<Self, LoadError> {
        let n_features = validate(&artifact).map_err(LoadError::Incompatible)?;
        Ok(Self {
            artifact,
            n_features,
        })
    }

    pub fn info(&self) -> ModelInfo {
        ModelInfo {
            format_version: self.artifact.format_version,
            target: self.artifact.target.clone(),
            schema: self.artifact.schema.clone(),
            categories: self.artifact.encoder.columns.clone(),
            n_features: self.n_features,
            n_trees: self.artifact.regressor.trees.len(),
        }
    }

    pub fn predict(&self, row: &FeatureRow) -> Result<f64, PredictionError> {
        self.check_schema(row)?;
        let features = self.encode(row)?;
        let prediction = self.artifact.regressor.predict(&features);
        if !prediction.is_finite() {
            return Err(PredictionError::NonFiniteOutput(prediction));
        }
        Ok(prediction)
    }

    fn check_schema(&self, row: &FeatureRow) -> Result<(), PredictionError> {
        let schema = &self.artifact.schema;
        for column in schema {
            if !row.iter().any(|(name, _)| name == &column.name) {
                return Err(PredictionError::MissingField(column.name.clone()));
            }
        }
        for (name, _) in row {
            if !schema.iter().any(|column| &column.name == name) {
                return Err(PredictionError::UnexpectedField(name.clone()));
            }
        }
        for (position, (column, (name, value))) in schema.iter().zip(row).enumerate() {
            if &column.name != name {
                return Err(PredictionError::FieldOrder {
                    position,
                    expected: column.name.clone(),
                    found: name.clone(),
                });
            }
            let matches = matches!(
                (column.kind, value),
                (ColumnKind::Categorical, FeatureValue::Text(_))
                    | (ColumnKind::Float, FeatureValue::Float(_))
                    | (ColumnKind::Float, FeatureValue::Integer(_))
                    | (ColumnKind::Integer, FeatureValue::Integer(_))
            );
            if !matches {
                return Err(PredictionError::TypeMismatch {
                    column: column.name.clone(),
                    expected: column.kind,
                    found: value.kind_name(),
                });
            }
        }
        // A repeated column passes the checks above but leaves the row too long.
        if let Some((name, _)) = row.get(schema.len()) {
            return Err(PredictionError::UnexpectedField(name.clone()));
        }
        Ok(())
    }

    /// Lays the row out as one-hot blocks followed by the passthrough columns.
    /// The row must already match the schema.
    fn encode(&self, row: &FeatureRow) -> Result<Vec<f64>, PredictionError> {
        let encoder = &self.artifact.encoder;
        let mut features = Vec::with_capacity(self.n_features);

        for encoded in &encoder.columns {
            let category = row.iter().find_map(|(name, value)| match value {
                FeatureValue::Text(text) if name == &encoded.name => Some(text),
                _ => None,
            });
            let position = category.and_then(|category| {
                encoded
                    .categories
                    .iter()
                    .position(|known| known == category)
            });
            if position.is_none() && encoder.handle_unknown == HandleUnknown::Error {
                return Err(PredictionError::UnknownCategory {
                    column: encoded.name.clone(),
                    category: category.cloned().unwrap_or_default(),
                });
            }
            features.extend((0..encoded.categories.len()).map(|i| {
                if Some(i) == position { 1.0 } else { 0.0 }
            }));
        }

        // Text only appears in categorical columns once the schema check passed.
        for (_, value) in row {
            match value {
                FeatureValue::Float(v) => features.push(*v),
                FeatureValue::Integer(v) => features.push(*v as f64),
                FeatureValue::Text(_) => {}
            }
        }

        Ok(features)
    }
}

/// Checks the artifact's internal consistency and returns the encoded width.
fn validate(artifact: &Artifact) -> Result<usize, String> {
    if artifact.format_version != SUPPORTED_FORMAT_VERSION {
        return Err(format!(
            "unsupported format version {} (expected {})",
            artifact.format_version, SUPPORTED_FORMAT_VERSION
        ));
    }
    if artifact.schema.is_empty() {
        return Err("schema has no columns".to_string());
    }

    let mut seen = HashSet::new();
    for column in &artifact.schema {
        if !seen.insert(column.name.as_str()) {
            return Err(format!("duplicate schema column {}", column.name));
        }
    }

    for encoded in &artifact.encoder.columns {
        let Some(column) = artifact.schema.iter().find(|c| c.name == encoded.name) else {
            return Err(format!("encoder column {} is not in the schema", encoded.name));
        };
        if column.kind != ColumnKind::Categorical {
            return Err(format!(
                "encoder column {} is {}, not categorical",
                encoded.name, column.kind
            ));
        }
        if encoded.categories.is_empty() {
            return Err(format!("encoder column {} has no categories", encoded.name));
        }
    }
    for column in &artifact.schema {
        let encoded = artifact
            .encoder
            .columns
            .iter()
            .any(|encoded| encoded.name == column.name);
        if column.kind == ColumnKind::Categorical && !encoded {
            return Err(format!("categorical column {} has no encoder", column.name));
        }
    }

    let one_hot_width: usize = artifact
        .encoder
        .columns
        .iter()
        .map(|encoded| encoded.categories.len())
        .sum();
    let passthrough = artifact
        .schema
        .iter()
        .filter(|column| column.kind != ColumnKind::Categorical)
        .count();
    let n_features = one_hot_width + passthrough;

    if artifact.regressor.trees.is_empty() {
        return Err("regressor has no trees".to_string());
    }
    for (i, tree) in artifact.regressor.trees.iter().enumerate() {
        tree.validate(n_features)
            .map_err(|message| format!("tree {}: {}", i, message))?;
    }

    Ok(n_features)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::model::{ChipsetBrand, FeatureRecord, OsFamily};

    pub(crate) fn artifact_path() -> std::path::PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("models/phone_battery_model.json")
    }

    pub(crate) fn shipped_model() -> ModelHandle {
        ModelHandle::from_path(artifact_path()).unwrap()
    }

    /// Two columns, one tree splitting on the numeric feature.
    fn tiny_artifact(handle_unknown: &str) -> String {
        format!(
            r#"{{
                "format_version": 1,
                "target": "battery_mah",
                "schema": [
                    {{"name": "os_family", "kind": "categorical"}},
                    {{"name": "ram_gb", "kind": "float"}}
                ],
                "encoder": {{
                    "columns": [{{"name": "os_family", "categories": ["android", "ios"]}}],
                    "handle_unknown": "{handle_unknown}"
                }},
                "regressor": {{"trees": [
                    {{"Node": {{"feature_idx": 2, "threshold": 4.0,
                        "left": {{"Leaf": {{"value": 3000.0}}}},
                        "right": {{"Node": {{"feature_idx": 1, "threshold": 0.5,
                            "left": {{"Leaf": {{"value": 5000.0}}}},
                            "right": {{"Leaf": {{"value": 3500.0}}}}}}}}}}}}
                ]}}
            }}"#
        )
    }

    fn tiny_row(os: &str, ram: f64) -> FeatureRow {
        vec![
            ("os_family".to_string(), FeatureValue::Text(os.to_string())),
            ("ram_gb".to_string(), FeatureValue::Float(ram)),
        ]
    }

    #[test]
    fn walks_the_tree_on_encoded_features() {
        let model = ModelHandle::from_json(&tiny_artifact("ignore")).unwrap();
        assert_eq!(model.predict(&tiny_row("android", 2.0)), Ok(3000.0));
        assert_eq!(model.predict(&tiny_row("android", 8.0)), Ok(5000.0));
        assert_eq!(model.predict(&tiny_row("ios", 8.0)), Ok(3500.0));
    }

    #[test]
    fn threshold_is_inclusive_on_the_left() {
        let model = ModelHandle::from_json(&tiny_artifact("ignore")).unwrap();
        assert_eq!(model.predict(&tiny_row("android", 4.0)), Ok(3000.0));
    }

    #[test]
    fn unknown_category_is_ignored_or_rejected() {
        let lenient = ModelHandle::from_json(&tiny_artifact("ignore")).unwrap();
        // All-zero block: the ios indicator is 0, so this follows android's path.
        assert_eq!(lenient.predict(&tiny_row("symbian", 8.0)), Ok(5000.0));

        let strict = ModelHandle::from_json(&tiny_artifact("error")).unwrap();
        assert_eq!(
            strict.predict(&tiny_row("symbian", 8.0)),
            Err(PredictionError::UnknownCategory {
                column: "os_family".to_string(),
                category: "symbian".to_string(),
            })
        );
    }

    #[test]
    fn integer_values_pass_through_float_columns() {
        let model = ModelHandle::from_json(&tiny_artifact("ignore")).unwrap();
        let row = vec![
            ("os_family".to_string(), FeatureValue::Text("android".to_string())),
            ("ram_gb".to_string(), FeatureValue::Integer(8)),
        ];
        assert_eq!(model.predict(&row), Ok(5000.0));
    }

    #[test]
    fn shipped_model_predicts_the_reference_phone() {
        let model = shipped_model();
        let prediction = model.predict(&FeatureRecord::default().to_row()).unwrap();
        assert_eq!(prediction, 4787.5);
    }

    #[test]
    fn every_category_combination_yields_a_finite_non_negative_capacity() {
        let model = shipped_model();
        let corners = [1.0, 24.0]
            .into_iter()
            .flat_map(|ram_gb| [8.0, 1024.0].map(|storage_gb| (ram_gb, storage_gb)))
            .flat_map(|(ram_gb, storage_gb)| {
                [3.5, 8.5].map(|screen_in| (ram_gb, storage_gb, screen_in))
            })
            .flat_map(|(ram_gb, storage_gb, screen_in)| {
                [30.0, 240.0].map(|refresh_hz| (ram_gb, storage_gb, screen_in, refresh_hz))
            });
        for (ram_gb, storage_gb, screen_in, refresh_hz) in corners {
            for os_family in OsFamily::ALL {
                for chipset_brand in ChipsetBrand::ALL {
                    for supports_5g in [0, 1] {
                        let record = FeatureRecord {
                            os_family,
                            chipset_brand,
                            ram_gb,
                            storage_gb,
                            screen_in,
                            refresh_hz,
                            supports_5g,
                        };
                        let prediction = model.predict(&record.to_row()).unwrap();
                        assert!(prediction.is_finite() && prediction >= 0.0);
                    }
                }
            }
        }
    }

    #[test]
    fn storage_and_screen_bounds_reach_both_sides_of_their_splits() {
        let model = shipped_model();
        let predict = |storage_gb, screen_in| {
            let record = FeatureRecord {
                storage_gb,
                screen_in,
                ..Default::default()
            };
            model.predict(&record.to_row()).unwrap()
        };
        // Larger storage and a larger screen each take the right-hand branch.
        assert!(predict(1024.0, 6.5) > predict(8.0, 6.5));
        assert_ne!(predict(128.0, 8.5), predict(128.0, 3.5));
    }

    #[test]
    fn repeated_predictions_are_identical() {
        let model = shipped_model();
        let row = FeatureRecord {
            os_family: OsFamily::Ios,
            chipset_brand: ChipsetBrand::Apple,
            screen_in: 6.1,
            ..Default::default()
        }
        .to_row();
        let first = model.predict(&row).unwrap();
        for _ in 0..10 {
            assert_eq!(model.predict(&row).unwrap().to_bits(), first.to_bits());
        }
    }

    #[test]
    fn missing_column_is_a_prediction_error() {
        let model = shipped_model();
        let mut row = FeatureRecord::default().to_row();
        row.retain(|(name, _)| name != "refresh_hz");
        assert_eq!(
            model.predict(&row),
            Err(PredictionError::MissingField("refresh_hz".to_string()))
        );
    }

    #[test]
    fn extra_column_is_a_prediction_error() {
        let model = shipped_model();
        let mut row = FeatureRecord::default().to_row();
        row.push(("weight_g".to_string(), FeatureValue::Float(190.0)));
        assert_eq!(
            model.predict(&row),
            Err(PredictionError::UnexpectedField("weight_g".to_string()))
        );
    }

    #[test]
    fn repeated_column_is_a_prediction_error() {
        let model = shipped_model();
        let mut row = FeatureRecord::default().to_row();
        row.push(("ram_gb".to_string(), FeatureValue::Float(12.0)));
        assert_eq!(
            model.predict(&row),
            Err(PredictionError::UnexpectedField("ram_gb".to_string()))
        );
    }

    #[test]
    fn reordered_columns_are_a_prediction_error() {
        let model = shipped_model();
        let mut row = FeatureRecord::default().to_row();
        row.swap(2, 3);
        assert_eq!(
            model.predict(&row),
            Err(PredictionError::FieldOrder {
                position: 2,
                expected: "ram_gb".to_string(),
                found: "storage_gb".to_string(),
            })
        );
    }

    #[test]
    fn wrong_value_kind_is_a_prediction_error() {
        let model = shipped_model();
        let mut row = FeatureRecord::default().to_row();
        row[6].1 = FeatureValue::Float(1.0);
        let err = model.predict(&row).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Feature column supports_5g expects a integer value, got a float value"
        );
    }

    #[test]
    fn info_reports_the_encoded_layout() {
        let info = shipped_model().info();
        assert_eq!(info.format_version, 1);
        assert_eq!(info.target, "battery_mah");
        assert_eq!(info.schema.len(), 7);
        assert_eq!(info.n_features, 15);
        assert_eq!(info.n_trees, 4);
    }

    fn incompatible_reason(json: &str) -> String {
        match ModelHandle::from_json(json) {
            Err(LoadError::Incompatible(reason)) => reason,
            other => panic!("expected an incompatible artifact, got {:?}", other),
        }
    }

    #[test]
    fn rejects_unsupported_format_version() {
        let json = tiny_artifact("ignore").replace("\"format_version\": 1", "\"format_version\": 7");
        assert!(incompatible_reason(&json).contains("unsupported format version 7"));
    }

    #[test]
    fn rejects_split_beyond_the_encoded_width() {
        let json = tiny_artifact("ignore").replace("\"feature_idx\": 2", "\"feature_idx\": 3");
        assert!(incompatible_reason(&json).contains("split on feature 3"));
    }

    #[test]
    fn rejects_encoder_for_numeric_column() {
        let json = tiny_artifact("ignore").replace(
            "\"categories\": [\"android\", \"ios\"]}",
            "\"categories\": [\"android\", \"ios\"]}, {\"name\": \"ram_gb\", \"categories\": [\"8\"]}",
        );
        assert_eq!(
            incompatible_reason(&json),
            "encoder column ram_gb is float, not categorical"
        );
    }

    #[test]
    fn rejects_categorical_column_without_encoder() {
        let json = tiny_artifact("ignore").replace(
            "{\"name\": \"ram_gb\", \"kind\": \"float\"}",
            "{\"name\": \"ram_gb\", \"kind\": \"float\"}, {\"name\": \"chipset_brand\", \"kind\": \"categorical\"}",
        );
        assert!(incompatible_reason(&json).contains("chipset_brand has no encoder"));
    }

    #[test]
    fn rejects_empty_forest() {
        let json = r#"{
            "format_version": 1,
            "target": "battery_mah",
            "schema": [{"name": "ram_gb", "kind": "float"}],
            "encoder": {"columns": []},
            "regressor": {"trees": []}
        }"#;
        assert_eq!(incompatible_reason(json), "regressor has no trees");
    }
}
