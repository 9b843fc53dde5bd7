use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Feature order used when an artifact does not carry its own list.
pub const FEATURE_ORDER_FALLBACK: [Feature; 8] = [
    Feature::G1,
    Feature::G2,
    Feature::G3,
    Feature::Studytime,
    Feature::Failures,
    Feature::Absences,
    Feature::Traveltime,
    Feature::Freetime,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Feature {
    G1,
    G2,
    G3,
    Studytime,
    Failures,
    Absences,
    Traveltime,
    Freetime,
}

impl Feature {
    /// Column name the classifier was fitted with.
    pub fn model_key(self) -> &'static str {
        match self {
            Feature::G1 => "G1",
            Feature::G2 => "G2",
            Feature::G3 => "G3",
            Feature::Studytime => "studytime",
            Feature::Failures => "failures",
            Feature::Absences => "absences",
            Feature::Traveltime => "traveltime",
            Feature::Freetime => "freetime",
        }
    }

    /// Field name posted by the HTML form.
    pub fn form_label(self) -> &'static str {
        match self {
            Feature::G1 => "MID-I Marks(0-15)",
            Feature::G2 => "MID-II Marks(0-15)",
            Feature::G3 => "Semister Marks(0-15)",
            Feature::Studytime => "Studytime(1-5)",
            Feature::Failures => "Failed(out of 3 exams)",
            Feature::Absences => "Absents(0-40)",
            Feature::Traveltime => "Traveltime(1-5)",
            Feature::Freetime => "Freetime(1-5)",
        }
    }

    pub fn from_model_key(key: &str) -> Option<Feature> {
        FEATURE_ORDER_FALLBACK
            .iter()
            .copied()
            .find(|feature| feature.model_key() == key)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct StudentMetrics {
    pub g1: f64,
    pub g2: f64,
    pub g3: f64,
    pub studytime: f64,
    pub failures: f64,
    pub absences: f64,
    pub traveltime: f64,
    pub freetime: f64,
}

impl StudentMetrics {
    pub fn get(&self, feature: Feature) -> f64 {
        match feature {
            Feature::G1 => self.g1,
            Feature::G2 => self.g2,
            Feature::G3 => self.g3,
            Feature::Studytime => self.studytime,
            Feature::Failures => self.failures,
            Feature::Absences => self.absences,
            Feature::Traveltime => self.traveltime,
            Feature::Freetime => self.freetime,
        }
    }

    fn set(&mut self, feature: Feature, value: f64) {
        let slot = match feature {
            Feature::G1 => &mut self.g1,
            Feature::G2 => &mut self.g2,
            Feature::G3 => &mut self.g3,
            Feature::Studytime => &mut self.studytime,
            Feature::Failures => &mut self.failures,
            Feature::Absences => &mut self.absences,
            Feature::Traveltime => &mut self.traveltime,
            Feature::Freetime => &mut self.freetime,
        };
        *slot = value;
    }

    /// Decodes the eight features from raw text fields.
    ///
    /// A field is looked up by form label, then model key, then lower-case
    /// model key. Missing or blank fields take `policy.default_value`; fields
    /// that do not parse as a finite number either take the default too or
    /// fail, depending on `policy.strict`.
    pub fn from_fields(
        fields: &HashMap<String, String>,
        policy: &DecodePolicy,
    ) -> Result<Self, DecodeError> {
        let mut metrics = StudentMetrics::default();

        for feature in FEATURE_ORDER_FALLBACK {
            let raw = lookup(fields, feature).map(str::trim).unwrap_or("");
            let value = if raw.is_empty() {
                policy.default_value
            } else {
                match raw.parse::<f64>() {
                    Ok(v) if v.is_finite() => v,
                    _ if policy.strict => {
                        return Err(DecodeError::Malformed {
                            field: feature.model_key().to_string(),
                            value: raw.to_string(),
                        })
                    }
                    _ => {
                        log::warn!(
                            "Malformed value {:?} for {}, using {}",
                            raw,
                            feature.model_key(),
                            policy.default_value
                        );
                        policy.default_value
                    }
                }
            };
            metrics.set(feature, value);
        }

        Ok(metrics)
    }

    /// Decodes a JSON object by flattening it to text fields first.
    pub fn from_json(value: &serde_json::Value, policy: &DecodePolicy) -> Result<Self, DecodeError> {
        let object = value.as_object().ok_or(DecodeError::NotAnObject)?;
        let fields = object
            .iter()
            .filter_map(|(key, value)| {
                let text = match value {
                    serde_json::Value::Null => return None,
                    serde_json::Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                Some((key.clone(), text))
            })
            .collect();
        Self::from_fields(&fields, policy)
    }
}

fn lookup<'a>(fields: &'a HashMap<String, String>, feature: Feature) -> Option<&'a str> {
    let key = feature.model_key();
    fields
        .get(feature.form_label())
        .or_else(|| fields.get(key))
        .or_else(|| fields.get(&key.to_lowercase()))
        .map(String::as_str)
}

/// What to do with missing or unparseable numeric input.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecodePolicy {
    pub default_value: f64,
    pub strict: bool,
}

impl Default for DecodePolicy {
    fn default() -> Self {
        Self {
            default_value: 0.0,
            strict: false,
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum DecodeError {
    #[error("malformed numeric field `{field}`: {value:?}")]
    Malformed { field: String, value: String },
    #[error("expected a JSON object of student metrics")]
    NotAnObject,
}
