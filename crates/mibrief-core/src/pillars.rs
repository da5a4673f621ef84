use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::card::{CardType, Pillar};
use crate::ConfigError;

/// Search plan for one pillar: what to ask for, where to look, and which card
/// types to produce in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PillarConfig {
    pub pillar: Pillar,
    pub query: String,
    #[serde(default)]
    pub domains: Vec<String>,
    pub slots: Vec<CardType>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PillarsFile {
    pub pillars: Vec<PillarConfig>,
}

impl PillarsFile {
    /// Keep only the given pillar, for single-pillar runs.
    #[must_use]
    pub fn only(mut self, pillar: Pillar) -> Self {
        self.pillars.retain(|p| p.pillar == pillar);
        self
    }

    /// Total number of slots across all pillars.
    #[must_use]
    pub fn slot_count(&self) -> usize {
        self.pillars.iter().map(|p| p.slots.len()).sum()
    }
}

/// Load and validate the pillar plan from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_pillars(path: &Path) -> Result<PillarsFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::PillarsFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    parse_pillars(&content)
}

/// Parse and validate a pillar plan already in memory.
///
/// # Errors
///
/// Returns `ConfigError` if the YAML is malformed or fails validation.
pub fn parse_pillars(content: &str) -> Result<PillarsFile, ConfigError> {
    let pillars_file: PillarsFile =
        serde_yaml::from_str(content).map_err(ConfigError::PillarsFileParse)?;

    validate_pillars(&pillars_file)?;

    Ok(pillars_file)
}

fn validate_pillars(pillars_file: &PillarsFile) -> Result<(), ConfigError> {
    if pillars_file.pillars.is_empty() {
        return Err(ConfigError::Validation(
            "pillar plan must list at least one pillar".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    for entry in &pillars_file.pillars {
        if !seen.insert(entry.pillar) {
            return Err(ConfigError::Validation(format!(
                "duplicate pillar: '{}'",
                entry.pillar
            )));
        }

        if entry.query.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "pillar '{}' has an empty query",
                entry.pillar
            )));
        }

        if entry.slots.is_empty() {
            return Err(ConfigError::Validation(format!(
                "pillar '{}' has no slots",
                entry.pillar
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(pillar: Pillar, query: &str, slots: Vec<CardType>) -> PillarConfig {
        PillarConfig {
            pillar,
            query: query.to_string(),
            domains: Vec::new(),
            slots,
        }
    }

    #[test]
    fn parses_minimal_plan() {
        let yaml = r"
pillars:
  - pillar: ai_strategy
    query: generative AI in marketing
    domains: [adage.com, digiday.com]
    slots: [brief, hot_take]
  - pillar: media_trends
    query: ad market shifts
    slots: [datapulse]
";
        let plan = parse_pillars(yaml).unwrap();
        assert_eq!(plan.pillars.len(), 2);
        assert_eq!(plan.pillars[0].pillar, Pillar::AiStrategy);
        assert_eq!(plan.pillars[0].domains, vec!["adage.com", "digiday.com"]);
        assert_eq!(
            plan.pillars[0].slots,
            vec![CardType::Brief, CardType::HotTake]
        );
        assert!(plan.pillars[1].domains.is_empty());
        assert_eq!(plan.slot_count(), 3);
    }

    #[test]
    fn unknown_pillar_fails_to_parse() {
        let yaml = "pillars:\n  - pillar: sports\n    query: x\n    slots: [brief]\n";
        let err = parse_pillars(yaml).unwrap_err();
        assert!(matches!(err, ConfigError::PillarsFileParse(_)));
    }

    #[test]
    fn validate_rejects_empty_plan() {
        let err = validate_pillars(&PillarsFile { pillars: vec![] }).unwrap_err();
        assert!(err.to_string().contains("at least one pillar"));
    }

    #[test]
    fn validate_rejects_duplicate_pillar() {
        let plan = PillarsFile {
            pillars: vec![
                entry(Pillar::MediaTrends, "one", vec![CardType::Brief]),
                entry(Pillar::MediaTrends, "two", vec![CardType::Brief]),
            ],
        };
        let err = validate_pillars(&plan).unwrap_err();
        assert!(err.to_string().contains("duplicate pillar: 'media_trends'"));
    }

    #[test]
    fn validate_rejects_blank_query() {
        let plan = PillarsFile {
            pillars: vec![entry(Pillar::AiStrategy, "  ", vec![CardType::Brief])],
        };
        let err = validate_pillars(&plan).unwrap_err();
        assert!(err.to_string().contains("empty query"));
    }

    #[test]
    fn validate_rejects_pillar_without_slots() {
        let plan = PillarsFile {
            pillars: vec![entry(Pillar::AiStrategy, "ai", vec![])],
        };
        let err = validate_pillars(&plan).unwrap_err();
        assert!(err.to_string().contains("no slots"));
    }

    #[test]
    fn only_keeps_requested_pillar() {
        let plan = PillarsFile {
            pillars: vec![
                entry(Pillar::AiStrategy, "ai", vec![CardType::Brief]),
                entry(Pillar::MediaTrends, "media", vec![CardType::Brief]),
            ],
        }
        .only(Pillar::MediaTrends);
        assert_eq!(plan.pillars.len(), 1);
        assert_eq!(plan.pillars[0].pillar, Pillar::MediaTrends);
    }

    #[test]
    fn repository_plan_is_valid() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../config/pillars.yaml");
        let plan = load_pillars(&path).unwrap();
        assert_eq!(plan.pillars.len(), Pillar::ALL.len());
    }

    #[test]
    fn missing_file_reports_path() {
        let err = load_pillars(Path::new("/nonexistent/pillars.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::PillarsFileIo { ref path, .. } if path.contains("nonexistent")));
    }
}
