use std::path::Path;

use crate::field::generator::SdfGeneratorOpts;
use crate::field::resolve::ResolveParams;
use crate::foundation::error::{TilefieldError, TilefieldResult};
use crate::render::rasterizer::TileRasterizerOpts;

/// Tunables loaded from a JSON file. Missing sections take their defaults.
///
/// ```json
/// {
///   "sdf": { "strategy": "cpu-parallel", "threads": 4 },
///   "tiles": { "use_transfer_buffer": true, "max_pending": 64 },
///   "resolve": { "span": 1000.0, "lo": 0.0, "hi": 250.0 }
/// }
/// ```
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub sdf: SdfGeneratorOpts,
    pub tiles: TileRasterizerOpts,
    pub resolve: ResolveParams,
}

impl Config {
    pub fn from_json_str(s: &str) -> TilefieldResult<Self> {
        let cfg: Self = serde_json::from_str(s)
            .map_err(|e| TilefieldError::serde(format!("config parse failed: {e}")))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_path(path: impl AsRef<Path>) -> TilefieldResult<Self> {
        let path = path.as_ref();
        let s = std::fs::read_to_string(path).map_err(|e| {
            TilefieldError::serde(format!("failed to read config '{}': {e}", path.display()))
        })?;
        Self::from_json_str(&s)
    }

    pub fn validate(&self) -> TilefieldResult<()> {
        if self.sdf.threads == Some(0) {
            return Err(TilefieldError::invalid_argument(
                "sdf.threads must be >= 1 when set",
            ));
        }
        if self.tiles.max_pending == Some(0) {
            return Err(TilefieldError::invalid_argument(
                "tiles.max_pending must be >= 1 when set",
            ));
        }
        self.resolve.validate()
    }
}

#[cfg(test)]
#[path = "../tests/unit/config.rs"]
mod tests;
