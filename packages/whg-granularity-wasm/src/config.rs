use serde::{Deserialize, Serialize};

/// Edge length in pixels of every synthesised pattern tile.
pub const PATTERN_SIZE: u32 = 64;
/// Buffer applied to bare lines so they have a visible width on the map.
pub const DEFAULT_LINE_BUFFER_KM: f64 = 0.25;
/// Circle area drawn per tile, as a multiple of the tile area.
const PATTERN_COVERAGE: f64 = 3.0;
/// The largest circle radius is the tile size divided by this.
const MAX_RADIUS_DIVISOR: f64 = 3.0;

/// Tunables for one buffering/pattern pass. The worker always runs with
/// the defaults; the direct exports accept overrides as camelCase JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GranularityConfig {
    pub pattern_size: u32,
    pub default_line_buffer_km: f64,
    pub pattern_coverage: f64,
    pub max_radius_divisor: f64,
}

impl Default for GranularityConfig {
    fn default() -> Self {
        Self {
            pattern_size: PATTERN_SIZE,
            default_line_buffer_km: DEFAULT_LINE_BUFFER_KM,
            pattern_coverage: PATTERN_COVERAGE,
            max_radius_divisor: MAX_RADIUS_DIVISOR,
        }
    }
}

impl GranularityConfig {
    /// Parse overrides; missing fields keep their defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        if json.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_overrides_keep_defaults() {
        let config = GranularityConfig::from_json(r#"{"patternSize": 32}"#).unwrap();
        assert_eq!(config.pattern_size, 32);
        assert_eq!(config.default_line_buffer_km, DEFAULT_LINE_BUFFER_KM);
        assert_eq!(config.max_radius_divisor, 3.0);
    }

    #[test]
    fn blank_input_is_default() {
        assert_eq!(GranularityConfig::from_json("  ").unwrap(), GranularityConfig::default());
    }
}
