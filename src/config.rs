use clap::Parser;
use std::path::PathBuf;

use crate::metrics::DecodePolicy;
use crate::report::ResponseFormat;

#[derive(Debug, Clone, Parser)]
#[command(name = "student_insight")]
#[command(about = "Student performance predictor with rule-based feedback", long_about = None)]
pub struct Config {
    /// Address to bind
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    #[arg(long, env = "PORT", default_value_t = 5000)]
    pub port: u16,

    /// JSON model artifact to serve predictions from
    #[arg(long, env = "MODEL_PATH", default_value = "student_performance_classifier.json")]
    pub model_path: PathBuf,

    /// Default shape of `/predict` responses
    #[arg(long, env = "RESPONSE_FORMAT", value_enum, default_value_t = ResponseFormat::Json)]
    pub format: ResponseFormat,

    /// Value used for missing or blank fields
    #[arg(long, env = "MISSING_VALUE", default_value_t = 0.0)]
    pub missing_value: f64,

    /// Reject non-numeric fields instead of substituting the missing value
    #[arg(long, env = "STRICT_NUMBERS")]
    pub strict_numbers: bool,
}

impl Config {
    pub fn decode_policy(&self) -> DecodePolicy {
        DecodePolicy {
            default_value: self.missing_value,
            strict: self.strict_numbers,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lenient_decoding_by_default() {
        let config = Config::try_parse_from(["student_insight"]).unwrap();
        assert_eq!(config.decode_policy(), DecodePolicy::default());
    }

    #[test]
    fn flags_override_defaults() {
        let config = Config::try_parse_from([
            "student_insight",
            "--format",
            "html",
            "--missing-value",
            "1",
            "--strict-numbers",
        ])
        .unwrap();
        assert_eq!(config.format, ResponseFormat::Html);
        assert_eq!(config.decode_policy(), DecodePolicy { default_value: 1.0, strict: true });
    }
}
