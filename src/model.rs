use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::metrics::{Feature, StudentMetrics, FEATURE_ORDER_FALLBACK};

pub type Result<T> = std::result::Result<T, ModelError>;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("failed to read model artifact: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid model artifact: {0}")]
    Json(#[from] serde_json::Error),
    #[error("model shape mismatch: {0}")]
    Shape(String),
}

/// Anything that can turn one prepared input row into an outcome label.
pub trait Classifier: Send + Sync {
    fn predict(&self, row: &Array1<f64>) -> String;
}

#[derive(Debug, Clone, Deserialize)]
struct LinearClassifierFields {
    classes: Vec<String>,
    coefficients: Vec<Vec<f64>>,
    intercepts: Vec<f64>,
}

/// Linear decision function over the input row.
///
/// With two classes and a single coefficient row the sign of the decision
/// value picks the class; otherwise there is one row per class and the
/// highest decision value wins.
#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "LinearClassifierFields")]
pub struct LinearClassifier {
    classes: Vec<String>,
    coefficients: Array2<f64>,
    intercepts: Array1<f64>,
}

impl TryFrom<LinearClassifierFields> for LinearClassifier {
    type Error = String;

    fn try_from(fields: LinearClassifierFields) -> std::result::Result<Self, Self::Error> {
        LinearClassifier::new(fields.classes, fields.coefficients, fields.intercepts)
    }
}

impl LinearClassifier {
    pub fn new(
        classes: Vec<String>,
        coefficients: Vec<Vec<f64>>,
        intercepts: Vec<f64>,
    ) -> std::result::Result<Self, String> {
        if classes.len() < 2 {
            return Err(format!("need at least two classes, got {}", classes.len()));
        }
        let rows = coefficients.len();
        let expected_rows = if classes.len() == 2 { [1, 2] } else { [classes.len(); 2] };
        if !expected_rows.contains(&rows) {
            return Err(format!(
                "{} coefficient rows do not fit {} classes",
                rows,
                classes.len()
            ));
        }
        if intercepts.len() != rows {
            return Err(format!("{} intercepts for {} coefficient rows", intercepts.len(), rows));
        }
        let width = coefficients[0].len();
        if coefficients.iter().any(|row| row.len() != width) {
            return Err("coefficient rows have different lengths".to_string());
        }

        let flat: Vec<f64> = coefficients.into_iter().flatten().collect();
        let coefficients =
            Array2::from_shape_vec((rows, width), flat).map_err(|e| e.to_string())?;

        Ok(Self {
            classes,
            coefficients,
            intercepts: Array1::from_vec(intercepts),
        })
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn n_features(&self) -> usize {
        self.coefficients.ncols()
    }

    pub fn decision_function(&self, row: &Array1<f64>) -> Array1<f64> {
        self.coefficients.dot(row) + &self.intercepts
    }
}

impl Classifier for LinearClassifier {
    fn predict(&self, row: &Array1<f64>) -> String {
        let scores = self.decision_function(row);
        let index = if scores.len() == 1 {
            usize::from(scores[0] > 0.0)
        } else {
            let mut best = 0;
            for (i, &score) in scores.iter().enumerate() {
                if score > scores[best] {
                    best = i;
                }
            }
            best
        };
        self.classes[index].clone()
    }
}

/// Standardises each feature as `(x - mean) / scale`.
#[derive(Debug, Clone, Deserialize)]
pub struct StandardScaler {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

impl StandardScaler {
    pub(crate) fn transform(&self, row: &Array1<f64>) -> Array1<f64> {
        let mean = Array1::from_vec(self.mean.clone());
        // Constant columns are fitted with a zero scale; leave them unscaled.
        let scale = Array1::from_iter(self.scale.iter().map(|&s| if s == 0.0 { 1.0 } else { s }));
        (row - &mean) / &scale
    }
}

/// A serialized artifact: either a bare classifier or a bundle that also
/// carries a scaler and the feature order it was fitted with.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelArtifact {
    Raw(LinearClassifier),
    Bundled {
        #[serde(alias = "clf", alias = "classifier")]
        model: LinearClassifier,
        #[serde(default)]
        scaler: Option<StandardScaler>,
        #[serde(default)]
        features: Option<Vec<String>>,
    },
}

impl ModelArtifact {
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = tokio::fs::read_to_string(path).await?;
        Self::from_json(&text)
    }

    fn kind(&self) -> &'static str {
        match self {
            ModelArtifact::Raw(_) => "raw",
            ModelArtifact::Bundled { .. } => "bundled",
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ModelInfo {
    pub kind: String,
    pub features: Vec<String>,
    pub classes: Vec<String>,
    pub scaled: bool,
}

/// Everything needed to classify a student, built once at startup.
pub struct InferenceContext {
    classifier: Box<dyn Classifier>,
    scaler: Option<StandardScaler>,
    features: Vec<String>,
    info: ModelInfo,
}

impl InferenceContext {
    pub fn from_artifact(artifact: ModelArtifact) -> Result<Self> {
        let kind = artifact.kind().to_string();
        let (model, scaler, features) = match artifact {
            ModelArtifact::Raw(model) => (model, None, None),
            ModelArtifact::Bundled { model, scaler, features } => (model, scaler, features),
        };
        // An empty list means "not provided", same as a missing key.
        let features = features.filter(|names| !names.is_empty()).unwrap_or_else(|| {
            FEATURE_ORDER_FALLBACK
                .iter()
                .map(|f| f.model_key().to_string())
                .collect()
        });

        if model.n_features() != features.len() {
            return Err(ModelError::Shape(format!(
                "classifier expects {} features but {} are listed",
                model.n_features(),
                features.len()
            )));
        }
        if let Some(scaler) = &scaler {
            if scaler.mean.len() != features.len() || scaler.scale.len() != features.len() {
                return Err(ModelError::Shape(format!(
                    "scaler has {} means and {} scales for {} features",
                    scaler.mean.len(),
                    scaler.scale.len(),
                    features.len()
                )));
            }
        }
        for name in &features {
            if Feature::from_model_key(name).is_none() {
                log::warn!("Model feature {:?} is not collected by the form; it will always be 0", name);
            }
        }

        let info = ModelInfo {
            kind,
            features: features.clone(),
            classes: model.classes().to_vec(),
            scaled: scaler.is_some(),
        };

        Ok(Self {
            classifier: Box::new(model),
            scaler,
            features,
            info,
        })
    }

    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let artifact = ModelArtifact::load(path).await?;
        let context = Self::from_artifact(artifact)?;
        log::info!(
            "Loaded {} model from {} ({} features, scaler: {})",
            context.info.kind,
            path.display(),
            context.features.len(),
            context.info.scaled
        );
        Ok(context)
    }

    /// Single input row in the artifact's feature order, before scaling.
    pub fn build_row(&self, metrics: &StudentMetrics) -> Array1<f64> {
        self.features
            .iter()
            .map(|name| Feature::from_model_key(name).map_or(0.0, |f| metrics.get(f)))
            .collect()
    }

    pub fn predict(&self, metrics: &StudentMetrics) -> String {
        let row = self.build_row(metrics);
        let input = match &self.scaler {
            Some(scaler) => scaler.transform(&row),
            None => row,
        };
        self.classifier.predict(&input)
    }

    pub fn info(&self) -> &ModelInfo {
        &self.info
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RAW: &str = r#"{
        "kind": "raw",
        "classes": ["Fail", "Pass"],
        "coefficients": [[0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0]],
        "intercepts": [-10.0]
    }"#;

    fn metrics_with_g3(g3: f64) -> StudentMetrics {
        StudentMetrics { g3, ..StudentMetrics::default() }
    }

    #[test]
    fn raw_artifact_uses_fallback_order_and_sign() {
        let context = InferenceContext::from_artifact(ModelArtifact::from_json(RAW).unwrap()).unwrap();
        assert_eq!(context.info().kind, "raw");
        assert_eq!(context.info().features[0], "G1");
        assert!(!context.info().scaled);

        assert_eq!(context.predict(&metrics_with_g3(12.0)), "Pass");
        assert_eq!(context.predict(&metrics_with_g3(10.0)), "Fail");
        assert_eq!(context.predict(&metrics_with_g3(3.0)), "Fail");
    }

    #[test]
    fn bundled_artifact_applies_scaler_and_feature_order() {
        let json = r#"{
            "kind": "bundled",
            "clf": {
                "classes": ["Low", "Medium", "High"],
                "coefficients": [[-1.0, 0.0], [0.0, 0.0], [1.0, 0.0]],
                "intercepts": [0.0, 0.5, 0.0]
            },
            "scaler": {"mean": [10.0, 3.0], "scale": [2.0, 0.0]},
            "features": ["G3", "absences"]
        }"#;
        let context = InferenceContext::from_artifact(ModelArtifact::from_json(json).unwrap()).unwrap();
        assert!(context.info().scaled);

        let m = StudentMetrics { g3: 14.0, absences: 7.0, ..StudentMetrics::default() };
        assert_eq!(context.build_row(&m).to_vec(), vec![14.0, 7.0]);
        // (14 - 10) / 2 = 2 -> High scores 2, Medium 0.5, Low -2.
        assert_eq!(context.predict(&m), "High");
        assert_eq!(context.predict(&metrics_with_g3(10.0)), "Medium");
        assert_eq!(context.predict(&metrics_with_g3(4.0)), "Low");
    }

    #[test]
    fn empty_feature_list_falls_back_to_default_order() {
        let json = r#"{
            "kind": "bundled",
            "model": {
                "classes": ["Fail", "Pass"],
                "coefficients": [[0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0]],
                "intercepts": [-10.0]
            },
            "features": []
        }"#;
        let context = InferenceContext::from_artifact(ModelArtifact::from_json(json).unwrap()).unwrap();
        assert_eq!(context.info().features.len(), 8);
        assert_eq!(context.info().features[2], "G3");
        assert_eq!(context.predict(&metrics_with_g3(12.0)), "Pass");
    }

    #[test]
    fn unknown_features_are_zero() {
        let json = r#"{
            "kind": "bundled",
            "model": {"classes": ["0", "1"], "coefficients": [[1.0, 1.0]], "intercepts": [0.0]},
            "features": ["age", "G1"]
        }"#;
        let context = InferenceContext::from_artifact(ModelArtifact::from_json(json).unwrap()).unwrap();
        let m = StudentMetrics { g1: 5.0, ..StudentMetrics::default() };
        assert_eq!(context.build_row(&m).to_vec(), vec![0.0, 5.0]);
        assert_eq!(context.predict(&m), "1");
    }

    #[test]
    fn rejects_bad_shapes() {
        let too_few_classes = r#"{"kind": "raw", "classes": ["Pass"], "coefficients": [[1.0]], "intercepts": [0.0]}"#;
        assert!(matches!(ModelArtifact::from_json(too_few_classes), Err(ModelError::Json(_))));

        let ragged = r#"{"kind": "raw", "classes": ["a", "b", "c"], "coefficients": [[1.0], [1.0, 2.0], [0.0]], "intercepts": [0.0, 0.0, 0.0]}"#;
        assert!(ModelArtifact::from_json(ragged).is_err());

        let wrong_width = ModelArtifact::from_json(
            r#"{"kind": "raw", "classes": ["a", "b"], "coefficients": [[1.0, 2.0]], "intercepts": [0.0]}"#,
        )
        .unwrap();
        assert!(matches!(
            InferenceContext::from_artifact(wrong_width),
            Err(ModelError::Shape(_))
        ));

        let bad_scaler = ModelArtifact::from_json(
            r#"{"kind": "bundled",
                "model": {"classes": ["a", "b"], "coefficients": [[1.0]], "intercepts": [0.0]},
                "scaler": {"mean": [1.0, 2.0], "scale": [1.0]},
                "features": ["G1"]}"#,
        )
        .unwrap();
        assert!(matches!(
            InferenceContext::from_artifact(bad_scaler),
            Err(ModelError::Shape(_))
        ));
    }

    #[test]
    fn unknown_kind_is_rejected() {
        assert!(ModelArtifact::from_json(r#"{"kind": "pickle"}"#).is_err());
    }

    #[tokio::test]
    async fn loads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        std::fs::write(&path, RAW).unwrap();

        let context = InferenceContext::load(&path).await.unwrap();
        assert_eq!(context.info().classes, vec!["Fail", "Pass"]);

        let missing = InferenceContext::load(dir.path().join("absent.json")).await;
        assert!(matches!(missing, Err(ModelError::Io(_))));
    }
}
