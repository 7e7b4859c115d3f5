use crate::detector::DetectorConfig;
use crate::preprocessing::PreprocessConfig;
use std::path::PathBuf;

/// Runtime configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub max_file_size: usize,
    /// Where `preprocessed_*` artifacts go; `None` disables them
    pub debug_dir: Option<PathBuf>,
    pub detector: DetectorConfig,
    pub preprocess: PreprocessConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 9292,
            max_file_size: 52_428_800,
            debug_dir: Some(PathBuf::from(".")),
            detector: DetectorConfig::default(),
            preprocess: PreprocessConfig::default(),
        }
    }
}

/// Split a comma-separated language list such as `"en,de"`
pub fn parse_languages(raw: &str) -> Vec<String> {
    let languages: Vec<String> = raw
        .split(',')
        .map(|l| l.trim().to_lowercase())
        .filter(|l| !l.is_empty())
        .collect();
    if languages.is_empty() {
        DetectorConfig::default().languages
    } else {
        languages
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_languages() {
        assert_eq!(parse_languages("en, DE ,"), vec!["en", "de"]);
        assert_eq!(parse_languages(""), vec!["en"]);
    }

    #[test]
    fn test_default_config_matches_detector_tuning() {
        let config = Config::default();
        assert_eq!(config.port, 9292);
        assert_eq!(config.detector.batch_size, 1);
        assert_eq!(config.detector.workers, 0);
        assert!(!config.detector.group_into_paragraphs);
        assert_eq!(config.preprocess.max_dimension, 1920);
    }
}
