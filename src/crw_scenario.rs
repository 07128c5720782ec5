// Scenario descriptor parsing
//
// Descriptors look like `RN.20x20x2`, optionally followed by `+<anything>`
// which carries batch-variation info the models do not use.

use std::fmt;
use std::str::FromStr;

use crate::crw_error::{ModelError, ModelResult};
use crate::crw_interface::{ArenaExtent, Vector3D};

/// Block distribution geometry tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockDistribution {
    SingleSource,
    DualSource,
    QuadSource,
    PowerLaw,
    Random,
}

impl BlockDistribution {
    pub fn tag(&self) -> &'static str {
        match self {
            BlockDistribution::SingleSource => "SS",
            BlockDistribution::DualSource => "DS",
            BlockDistribution::QuadSource => "QS",
            BlockDistribution::PowerLaw => "PL",
            BlockDistribution::Random => "RN",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "SS" => Some(BlockDistribution::SingleSource),
            "DS" => Some(BlockDistribution::DualSource),
            "QS" => Some(BlockDistribution::QuadSource),
            "PL" => Some(BlockDistribution::PowerLaw),
            "RN" => Some(BlockDistribution::Random),
            _ => None,
        }
    }
}

impl fmt::Display for BlockDistribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Parsed scenario descriptor
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScenarioSpec {
    pub dist: BlockDistribution,
    pub arena_x: f64,
    pub arena_y: f64,
    pub arena_z: f64,
}

impl ScenarioSpec {
    pub fn new(dist: BlockDistribution, arena_x: f64, arena_y: f64, arena_z: f64) -> Self {
        Self {
            dist,
            arena_x,
            arena_y,
            arena_z,
        }
    }

    pub fn parse(input: &str) -> ModelResult<Self> {
        let malformed = |reason: &str| ModelError::MalformedScenario {
            input: input.to_string(),
            reason: reason.to_string(),
        };

        let core = input.split('+').next().unwrap_or_default().trim();
        let (tag, dims) = core
            .split_once('.')
            .ok_or_else(|| malformed("expected '<TAG>.<X>x<Y>x<Z>'"))?;

        let dist = BlockDistribution::from_tag(tag)
            .ok_or_else(|| malformed("unknown block distribution (expected SS, DS, QS, PL or RN)"))?;

        let parts: Vec<&str> = dims.split('x').collect();
        if parts.len() != 3 {
            return Err(malformed("expected 3 arena dimensions separated by 'x'"));
        }

        let mut values = [0.0f64; 3];
        for (slot, part) in values.iter_mut().zip(parts.iter()) {
            let v: f64 = part
                .parse()
                .map_err(|_| malformed("arena dimension is not a number"))?;
            if !v.is_finite() || v <= 0.0 {
                return Err(malformed("arena dimensions must be positive"));
            }
            *slot = v;
        }

        Ok(Self::new(dist, values[0], values[1], values[2]))
    }

    /// The whole arena as an extent anchored at the origin
    pub fn arena(&self) -> ArenaExtent {
        ArenaExtent::new(
            Vector3D::new(self.arena_x, self.arena_y, self.arena_z),
            Vector3D::default(),
        )
    }
}

impl FromStr for ScenarioSpec {
    type Err = ModelError;

    fn from_str(s: &str) -> ModelResult<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for ScenarioSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}x{}x{}",
            self.dist, self.arena_x, self.arena_y, self.arena_z
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_basic() {
        let spec = ScenarioSpec::parse("RN.20x20x2").unwrap();
        assert_eq!(spec.dist, BlockDistribution::Random);
        assert_eq!(spec.arena_x, 20.0);
        assert_eq!(spec.arena_y, 20.0);
        assert_eq!(spec.arena_z, 2.0);
        assert_eq!(spec.to_string(), "RN.20x20x2");
    }

    #[test]
    fn test_parse_ignores_suffix() {
        let spec: ScenarioSpec = "DS.32x16x2+Z16".parse().unwrap();
        assert_eq!(spec.dist, BlockDistribution::DualSource);
        assert_eq!(spec.arena_x, 32.0);
        assert_eq!(spec.arena_y, 16.0);
    }

    #[test]
    fn test_every_tag_round_trips() {
        for tag in ["SS", "DS", "QS", "PL", "RN"] {
            let dist = BlockDistribution::from_tag(tag).unwrap();
            assert_eq!(dist.tag(), tag);
        }
    }

    #[test]
    fn test_malformed_inputs_are_rejected() {
        for bad in ["XX.10x10x2", "RN", "RN.10x10", "RN.10xAx2", "RN.0x10x2", "", "RN.10x10x2x4"] {
            match ScenarioSpec::parse(bad) {
                Err(ModelError::MalformedScenario { input, .. }) => assert_eq!(input, bad),
                other => panic!("expected MalformedScenario for {:?}, got {:?}", bad, other),
            }
        }
    }

    #[test]
    fn test_arena_extent() {
        let arena = ScenarioSpec::parse("SS.32x16x2").unwrap().arena();
        assert_eq!(arena.xsize(), 32.0);
        assert_eq!(arena.ysize(), 16.0);
        assert_eq!(arena.center(), Vector3D::new(16.0, 8.0, 1.0));
    }
}
