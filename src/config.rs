//! Configuration types and validation for the verification pipeline
//!
//! Everything tunable lives here: stage budgets, routing overrides,
//! per-analyzer thresholds and the verdict policy. Config files are
//! accepted as JSON or YAML and validated before a run starts; a bad
//! configuration never reaches the first stage.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::{Layer, Severity};

/// Top-level pipeline configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VerifierConfig {
    /// Wall-clock budget per analyzer stage.
    pub stage_timeout_ms: u64,
    /// Forces the raster route regardless of the text-density heuristic.
    pub assume_raster: bool,
    /// Mean text-layer characters per page below which a document is
    /// treated as raster-origin.
    pub raster_text_chars_threshold: f64,
    pub structure: StructureConfig,
    pub visual: VisualConfig,
    pub text: TextConfig,
    pub lexicon: LexiconConfig,
    pub policy: VerdictPolicy,
}

/// Structure-analysis thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StructureConfig {
    /// Incremental updates above this count produce a finding.
    pub incremental_update_threshold: usize,
}

/// Visual-analysis tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VisualConfig {
    /// Sensor-noise correlation is costly and needs several pages to be
    /// meaningful, so it is opt-in.
    pub enable_prnu: bool,
    /// Pages correlating below this against the document reference
    /// pattern are flagged.
    pub prnu_correlation_threshold: f64,
    /// Minimum pixel distance between two blocks before a hash collision
    /// counts as a clone candidate.
    pub copy_move_match_distance: u32,
    /// Clone candidates below this cluster size are discarded as noise.
    pub copy_move_min_cluster: usize,
}

/// Text-analysis thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TextConfig {
    /// Pages with fewer characters are excluded from stylometry.
    pub min_page_chars: usize,
    /// Readability z-score beyond which a page is a stylometric outlier.
    pub style_z_threshold: f64,
}

/// Suspicious-term lexicon and matching mode.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LexiconConfig {
    pub terms: Vec<String>,
    pub matching: MatchMode,
    /// Maximum edit distance per token in fuzzy mode.
    pub max_edit_distance: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    Exact,
    Fuzzy,
}

/// Declarative verdict policy.
///
/// The reduction itself is fixed; these knobs decide how severities,
/// unavailable layers and ambiguous signature states are weighed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VerdictPolicy {
    /// Minimum severity for a visual finding to flip `visual_ok`.
    pub visual_threshold: Severity,
    /// Minimum severity for a text finding to flip `text_ok`.
    pub text_threshold: Severity,
    /// An unsigned document is acceptable by default; intake flows that
    /// require signatures set this to false.
    pub treat_absent_signature_as_ok: bool,
    /// Hybrid-reference files cannot always be cryptographically
    /// verified; by default they are not held against the document.
    pub treat_unverified_hybrid_as_ok: bool,
    /// How a skipped or failed stage counts for each layer.
    pub unavailable_signature_is_ok: bool,
    pub unavailable_structure_is_ok: bool,
    pub unavailable_visual_is_ok: bool,
    pub unavailable_text_is_ok: bool,
    /// Layers whose per-layer booleans gate the overall verdict.
    pub blocking_layers: Vec<Layer>,
}

// Defaults

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            stage_timeout_ms: 30_000,
            assume_raster: false,
            raster_text_chars_threshold: 100.0,
            structure: StructureConfig::default(),
            visual: VisualConfig::default(),
            text: TextConfig::default(),
            lexicon: LexiconConfig::default(),
            policy: VerdictPolicy::default(),
        }
    }
}

impl Default for StructureConfig {
    fn default() -> Self {
        Self {
            incremental_update_threshold: 2,
        }
    }
}

impl Default for VisualConfig {
    fn default() -> Self {
        Self {
            enable_prnu: false,
            prnu_correlation_threshold: 0.7,
            copy_move_match_distance: 30,
            copy_move_min_cluster: 10,
        }
    }
}

impl Default for TextConfig {
    fn default() -> Self {
        Self {
            min_page_chars: 300,
            style_z_threshold: 1.2,
        }
    }
}

impl Default for LexiconConfig {
    fn default() -> Self {
        Self {
            terms: default_suspect_terms(),
            matching: MatchMode::Exact,
            max_edit_distance: 1,
        }
    }
}

impl Default for VerdictPolicy {
    fn default() -> Self {
        Self {
            visual_threshold: Severity::Suspect,
            text_threshold: Severity::Suspect,
            treat_absent_signature_as_ok: true,
            treat_unverified_hybrid_as_ok: true,
            unavailable_signature_is_ok: false,
            unavailable_structure_is_ok: true,
            unavailable_visual_is_ok: true,
            unavailable_text_is_ok: true,
            blocking_layers: Layer::ALL.to_vec(),
        }
    }
}

/// Terms that flag document tampering or editing-software traces when
/// they appear in extracted text. Portuguese-heavy because the intake
/// documents predominantly are.
pub fn default_suspect_terms() -> Vec<String> {
    [
        "rasura",
        "alterado",
        "alteração",
        "em branco",
        "cópia",
        "copiar",
        "recortar",
        "colar",
        "fotomontagem",
        "adobe",
        "photoshop",
        "gimp",
        "paint",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

impl VerifierConfig {
    /// Loads a configuration file, trying JSON first and YAML second,
    /// then validates it.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            Error::ConfigError(format!("cannot read config `{}`: {}", path.display(), e))
        })?;

        let config: Self = serde_json::from_str(&content)
            .or_else(|_| serde_yaml::from_str(&content))
            .map_err(|e| Error::ConfigError(format!("config parsing error: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.stage_timeout_ms == 0 {
            return Err(Error::ConfigError(
                "stage_timeout_ms must be at least 1".into(),
            ));
        }
        if self.raster_text_chars_threshold < 0.0 {
            return Err(Error::ConfigError(
                "raster_text_chars_threshold must not be negative".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.visual.prnu_correlation_threshold) {
            return Err(Error::ConfigError(
                "prnu_correlation_threshold must be within [0, 1]".into(),
            ));
        }
        if self.visual.copy_move_min_cluster == 0 {
            return Err(Error::ConfigError(
                "copy_move_min_cluster must be at least 1".into(),
            ));
        }
        if self.text.style_z_threshold <= 0.0 {
            return Err(Error::ConfigError(
                "style_z_threshold must be positive".into(),
            ));
        }
        if self.lexicon.max_edit_distance > 3 {
            return Err(Error::ConfigError(
                "max_edit_distance above 3 matches nearly everything".into(),
            ));
        }
        if self.policy.blocking_layers.is_empty() {
            return Err(Error::ConfigError(
                "blocking_layers must name at least one layer".into(),
            ));
        }
        Ok(())
    }

    pub fn stage_timeout(&self) -> Duration {
        Duration::from_millis(self.stage_timeout_ms)
    }
}
