use regex::Regex;
use std::collections::BTreeMap;
use std::env;
use thiserror::Error;

/// Per-run format settings, the counterpart of the export preset the
/// platform hands to a format plugin.
#[derive(Debug, Clone)]
pub struct ExportSettings {
    pub lang: String,
    pub barcode_type: String,
    pub name_slot: u8,
    pub description_type: DescriptionKind,
    /// Marketplace referrer for sku/image/price selection; `None` falls back
    /// to the configured marketplace id.
    pub referrer_id: Option<f64>,
    pub name_max_length: usize,
    pub description_max_length: usize,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            lang: "de".into(),
            barcode_type: "EAN_13".into(),
            name_slot: 1,
            description_type: DescriptionKind::ItemDescription,
            referrer_id: None,
            name_max_length: 150,
            description_max_length: 5000,
        }
    }
}

impl ExportSettings {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            lang: env::var("FEED_LANG").unwrap_or(defaults.lang),
            barcode_type: env::var("FEED_BARCODE_TYPE").unwrap_or(defaults.barcode_type),
            name_slot: env::var("FEED_NAME_SLOT")
                .ok()
                .and_then(|value| value.parse::<u8>().ok())
                .filter(|slot| (1..=3).contains(slot))
                .unwrap_or(defaults.name_slot),
            description_type: env::var("FEED_DESCRIPTION_TYPE")
                .ok()
                .map(|value| DescriptionKind::parse(&value))
                .unwrap_or(defaults.description_type),
            referrer_id: env::var("FEED_REFERRER_ID")
                .ok()
                .and_then(|value| value.parse::<f64>().ok()),
            name_max_length: env::var("FEED_NAME_MAX_LENGTH")
                .ok()
                .and_then(|value| value.parse::<usize>().ok())
                .filter(|length| *length > 0)
                .unwrap_or(defaults.name_max_length),
            description_max_length: env::var("FEED_DESCRIPTION_MAX_LENGTH")
                .ok()
                .and_then(|value| value.parse::<usize>().ok())
                .filter(|length| *length > 0)
                .unwrap_or(defaults.description_max_length),
        }
    }

    pub fn effective_referrer(&self, marketplace_id: f64) -> f64 {
        self.referrer_id.unwrap_or(marketplace_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DescriptionKind {
    ItemShortDescription,
    ItemDescription,
    ItemDescriptionAndTechnicalData,
    TechnicalData,
}

impl DescriptionKind {
    pub fn parse(value: &str) -> Self {
        match value.trim() {
            "itemShortDescription" => Self::ItemShortDescription,
            "technicalData" => Self::TechnicalData,
            "itemDescriptionAndTechnicalData" => Self::ItemDescriptionAndTechnicalData,
            _ => Self::ItemDescription,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueSource {
    Attribute,
    Property,
}

/// How a facet value is looked up for a variation. Candidate ids are tried
/// in configured order; the name pattern variant matches the attribute name
/// itself instead of a numeric id.
#[derive(Debug, Clone)]
pub enum FacetStrategy {
    ById {
        source: ValueSource,
        candidate_ids: Vec<u32>,
    },
    ByNamePattern {
        pattern: Regex,
    },
}

#[derive(Debug, Clone)]
pub struct FacetConfig {
    pub active: bool,
    pub strategy: FacetStrategy,
}

#[derive(Debug, Clone)]
pub struct ExportConfig {
    pub marketplace_id: f64,
    pub barcode_only: bool,
    pub gender_default: String,
    pub gender: FacetConfig,
    pub driving_style: FacetConfig,
    pub color: FacetConfig,
    pub size: FacetConfig,
    pub material: FacetConfig,
    /// Raw label slots for availability ids 1..=10; the sentinel "0" means
    /// "no label configured".
    pub availability: [String; 10],
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("facet `{facet}`: invalid name pattern `{pattern}`: {message}")]
    InvalidPattern {
        facet: &'static str,
        pattern: String,
        message: String,
    },
}

const FACET_KEYS: [&str; 5] = ["gender", "drivingstyle", "color", "size", "material"];

const SCALAR_KEYS: [&str; 3] = ["set_marketid", "barcode_only", "gender_standard"];

impl ExportConfig {
    /// Reads the dotted plugin configuration from the environment
    /// (`FEED_GENDER_IDS` for `gender_ids`, `FEED_AVAILABILITY_3` for
    /// `availability.3`, and so on).
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut entries = BTreeMap::new();
        for facet in FACET_KEYS {
            for suffix in ["active", "aom", "ids", "pattern"] {
                collect_env(&mut entries, &format!("{facet}_{suffix}"));
            }
        }
        for key in SCALAR_KEYS {
            collect_env(&mut entries, key);
        }
        for slot in 1..=10 {
            collect_env(&mut entries, &format!("availability.{slot}"));
        }
        Self::from_entries(&entries)
    }

    /// Builds the configuration from dotted-key entries.
    pub fn from_entries(entries: &BTreeMap<String, String>) -> Result<Self, ConfigError> {
        let mut availability: [String; 10] = Default::default();
        for (slot, label) in availability.iter_mut().enumerate() {
            if let Some(value) = entries.get(&format!("availability.{}", slot + 1)) {
                *label = value.clone();
            }
        }

        Ok(Self {
            marketplace_id: entries
                .get("set_marketid")
                .and_then(|value| value.trim().parse::<f64>().ok())
                .unwrap_or(-1.0),
            barcode_only: flag(entries, "barcode_only"),
            gender_default: entries.get("gender_standard").cloned().unwrap_or_default(),
            gender: parse_facet(entries, "gender")?,
            driving_style: parse_facet(entries, "drivingstyle")?,
            color: parse_facet(entries, "color")?,
            size: parse_facet(entries, "size")?,
            material: parse_facet(entries, "material")?,
            availability,
        })
    }
}

fn collect_env(entries: &mut BTreeMap<String, String>, key: &str) {
    let env_key = format!("FEED_{}", key.replace('.', "_").to_uppercase());
    if let Ok(value) = env::var(env_key) {
        entries.insert(key.to_string(), value);
    }
}

fn flag(entries: &BTreeMap<String, String>, key: &str) -> bool {
    entries
        .get(key)
        .map(|value| {
            matches!(
                value.trim().to_lowercase().as_str(),
                "1" | "true" | "yes" | "on"
            )
        })
        .unwrap_or(false)
}

fn parse_facet(
    entries: &BTreeMap<String, String>,
    facet: &'static str,
) -> Result<FacetConfig, ConfigError> {
    let active = flag(entries, &format!("{facet}_active"));
    let mode = entries
        .get(&format!("{facet}_aom"))
        .map(String::as_str)
        .unwrap_or("0");
    let candidate_ids = parse_id_list(
        entries
            .get(&format!("{facet}_ids"))
            .map(String::as_str)
            .unwrap_or(""),
    );

    let strategy = match mode.trim() {
        "1" | "property" => FacetStrategy::ById {
            source: ValueSource::Property,
            candidate_ids,
        },
        "2" | "name" => {
            let raw = entries
                .get(&format!("{facet}_pattern"))
                .map(String::as_str)
                .unwrap_or("")
                .trim()
                .to_string();
            FacetStrategy::ByNamePattern {
                pattern: word_boundary_pattern(facet, &raw)?,
            }
        }
        _ => FacetStrategy::ById {
            source: ValueSource::Attribute,
            candidate_ids,
        },
    };

    Ok(FacetConfig { active, strategy })
}

/// Pipe-delimited candidate id list; malformed segments are dropped.
fn parse_id_list(raw: &str) -> Vec<u32> {
    raw.split('|')
        .filter_map(|segment| segment.trim().parse::<u32>().ok())
        .collect()
}

fn word_boundary_pattern(facet: &'static str, raw: &str) -> Result<Regex, ConfigError> {
    Regex::new(&format!(r"(?i)\b{}\b", regex::escape(raw))).map_err(|err| {
        ConfigError::InvalidPattern {
            facet,
            pattern: raw.to_string(),
            message: err.to_string(),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect()
    }

    #[test]
    fn facet_ids_come_back_in_configured_order() {
        let config = ExportConfig::from_entries(&entries(&[
            ("color_active", "true"),
            ("color_aom", "0"),
            ("color_ids", "12|7| 44 |x"),
        ]))
        .expect("config");
        assert!(config.color.active);
        match &config.color.strategy {
            FacetStrategy::ById {
                source,
                candidate_ids,
            } => {
                assert_eq!(*source, ValueSource::Attribute);
                assert_eq!(candidate_ids, &vec![12, 7, 44]);
            }
            FacetStrategy::ByNamePattern { .. } => panic!("expected id strategy"),
        }
    }

    #[test]
    fn property_mode_selects_property_source() {
        let config = ExportConfig::from_entries(&entries(&[
            ("material_aom", "1"),
            ("material_ids", "5288"),
        ]))
        .expect("config");
        match &config.material.strategy {
            FacetStrategy::ById { source, .. } => assert_eq!(*source, ValueSource::Property),
            FacetStrategy::ByNamePattern { .. } => panic!("expected id strategy"),
        }
    }

    #[test]
    fn name_mode_builds_word_boundary_pattern() {
        let config = ExportConfig::from_entries(&entries(&[
            ("color_aom", "name"),
            ("color_pattern", "Farbe"),
        ]))
        .expect("config");
        match &config.color.strategy {
            FacetStrategy::ByNamePattern { pattern } => {
                assert!(pattern.is_match("Farbe"));
                assert!(pattern.is_match("farbe des Helms"));
                assert!(!pattern.is_match("Lieblingsfarbe"));
            }
            FacetStrategy::ById { .. } => panic!("expected name pattern strategy"),
        }
    }

    #[test]
    fn availability_slots_keep_raw_values() {
        let config = ExportConfig::from_entries(&entries(&[
            ("availability.1", "Sofort lieferbar"),
            ("availability.4", "0"),
        ]))
        .expect("config");
        assert_eq!(config.availability[0], "Sofort lieferbar");
        assert_eq!(config.availability[3], "0");
        assert_eq!(config.availability[9], "");
    }

    #[test]
    fn marketplace_id_accepts_fractional_referrers() {
        let config =
            ExportConfig::from_entries(&entries(&[("set_marketid", "143.02")])).expect("config");
        assert!((config.marketplace_id - 143.02).abs() < f64::EPSILON);
    }
}
