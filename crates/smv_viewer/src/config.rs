use serde::Deserialize;
use smv_core::atlas::StyleFilter;
use smv_core::churn::ChurnConfig;
use std::fs;
use std::path::Path;
use std::time::Duration;

pub const SESSION_PATH: &str = "assets/session.json";
const SUPPORTED_VERSION: &str = "0.1";

/// Viewer session: which atlas to load, how many entities to scatter where,
/// the initial view, and the churn cadence.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct SessionConfig {
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default = "default_atlas_image")]
    pub atlas_image: String,
    #[serde(default = "default_atlas_metadata")]
    pub atlas_metadata: String,
    #[serde(default = "default_entity_count")]
    pub entity_count: usize,
    #[serde(default)]
    pub bounds: GeoBounds,
    #[serde(default)]
    pub view: InitialView,
    #[serde(default)]
    pub churn: ChurnSettings,
    /// Eligibility for style churn; `null` makes every atlas style eligible.
    #[serde(default = "default_style_filter")]
    pub style_filter: Option<StyleFilter>,
}

/// Longitude/latitude box in degrees.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
pub struct GeoBounds {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
pub struct InitialView {
    #[serde(default = "default_center_lon")]
    pub center_lon: f64,
    #[serde(default = "default_center_lat")]
    pub center_lat: f64,
    #[serde(default = "default_zoom")]
    pub zoom: f64,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
pub struct ChurnSettings {
    #[serde(default = "default_position_period_ms")]
    pub position_period_ms: u64,
    #[serde(default = "default_style_period_ms")]
    pub style_period_ms: u64,
    #[serde(default = "default_move_factor")]
    pub move_factor: f64,
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            atlas_image: default_atlas_image(),
            atlas_metadata: default_atlas_metadata(),
            entity_count: default_entity_count(),
            bounds: GeoBounds::default(),
            view: InitialView::default(),
            churn: ChurnSettings::default(),
            style_filter: default_style_filter(),
        }
    }
}

impl Default for GeoBounds {
    fn default() -> Self {
        Self {
            min_lon: -125.0,
            min_lat: 25.0,
            max_lon: -70.0,
            max_lat: 50.0,
        }
    }
}

impl Default for InitialView {
    fn default() -> Self {
        Self {
            center_lon: default_center_lon(),
            center_lat: default_center_lat(),
            zoom: default_zoom(),
        }
    }
}

impl Default for ChurnSettings {
    fn default() -> Self {
        Self {
            position_period_ms: default_position_period_ms(),
            style_period_ms: default_style_period_ms(),
            move_factor: default_move_factor(),
            seed: None,
            enabled: default_enabled(),
        }
    }
}

impl SessionConfig {
    pub fn churn_config(&self) -> ChurnConfig {
        ChurnConfig {
            position_period: Duration::from_millis(self.churn.position_period_ms),
            style_period: Duration::from_millis(self.churn.style_period_ms),
            move_factor: self.churn.move_factor,
            seed: self.churn.seed,
        }
    }
}

/// Loads the session file, or returns defaults when it does not exist.
pub fn load_session_config(path: &Path) -> Result<SessionConfig, String> {
    if !path.exists() {
        log::info!(
            "Session file {} not found, using defaults",
            path.display()
        );
        return Ok(SessionConfig::default());
    }
    let raw = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read session file {}: {e}", path.display()))?;
    let config: SessionConfig = serde_json::from_str(&raw)
        .map_err(|e| format!("Failed to parse session JSON {}: {e}", path.display()))?;
    validate_session(&config)
        .map_err(|e| format!("Session {} is invalid: {e}", path.display()))?;
    Ok(config)
}

fn validate_session(config: &SessionConfig) -> Result<(), String> {
    if config.version != SUPPORTED_VERSION {
        return Err(format!(
            "unsupported version '{}' (expected '{SUPPORTED_VERSION}')",
            config.version
        ));
    }
    if config.entity_count == 0 {
        return Err("entity_count must be positive".to_string());
    }
    let b = &config.bounds;
    if !(b.min_lon < b.max_lon && b.min_lat < b.max_lat) {
        return Err(format!(
            "bounds are empty: lon {}..{}, lat {}..{}",
            b.min_lon, b.max_lon, b.min_lat, b.max_lat
        ));
    }
    if !(-180.0..=180.0).contains(&b.min_lon) || !(-180.0..=180.0).contains(&b.max_lon) {
        return Err("bounds longitude must lie within -180..180".to_string());
    }
    if !(-85.0..=85.0).contains(&b.min_lat) || !(-85.0..=85.0).contains(&b.max_lat) {
        return Err("bounds latitude must lie within -85..85".to_string());
    }
    if !(0.0..=24.0).contains(&config.view.zoom) {
        return Err(format!("view zoom {} outside 0..24", config.view.zoom));
    }
    if config.churn.position_period_ms == 0 || config.churn.style_period_ms == 0 {
        return Err("churn periods must be positive".to_string());
    }
    if !(config.churn.move_factor >= 0.0) {
        return Err(format!(
            "churn move_factor {} must be non-negative",
            config.churn.move_factor
        ));
    }
    Ok(())
}

fn default_version() -> String {
    SUPPORTED_VERSION.to_string()
}

fn default_atlas_image() -> String {
    "assets/atlas/symbols.png".to_string()
}

fn default_atlas_metadata() -> String {
    "assets/atlas/symbols.json".to_string()
}

fn default_style_filter() -> Option<StyleFilter> {
    Some(StyleFilter {
        position: 4,
        value: '3',
    })
}

const fn default_entity_count() -> usize {
    50_000
}

const fn default_center_lon() -> f64 {
    -98.0
}

const fn default_center_lat() -> f64 {
    39.0
}

const fn default_zoom() -> f64 {
    4.0
}

const fn default_position_period_ms() -> u64 {
    1000
}

const fn default_style_period_ms() -> u64 {
    10_000
}

const fn default_move_factor() -> f64 {
    5000.0
}

const fn default_enabled() -> bool {
    true
}
