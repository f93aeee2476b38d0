//! Animation curve extraction and unit conversion

use std::collections::BTreeMap;

use chsmodel_core::{Error, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::source::DrivenCurve;

/// Transform and visibility channels a mesh node may carry.
///
/// Declaration order is the catalog order, which is also the order curves are
/// written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AnimationChannel {
    Visibility,
    ScaleX,
    ScaleY,
    ScaleZ,
    RotationX,
    RotationY,
    RotationZ,
    TranslationX,
    TranslationY,
    TranslationZ,
}

pub static ANIMATION_CHANNELS: [AnimationChannel; 10] = [
    AnimationChannel::Visibility,
    AnimationChannel::ScaleX,
    AnimationChannel::ScaleY,
    AnimationChannel::ScaleZ,
    AnimationChannel::RotationX,
    AnimationChannel::RotationY,
    AnimationChannel::RotationZ,
    AnimationChannel::TranslationX,
    AnimationChannel::TranslationY,
    AnimationChannel::TranslationZ,
];

impl AnimationChannel {
    /// Name written to the metadata document
    pub fn name(self) -> &'static str {
        match self {
            AnimationChannel::Visibility => "visibility",
            AnimationChannel::ScaleX => "scaleX",
            AnimationChannel::ScaleY => "scaleY",
            AnimationChannel::ScaleZ => "scaleZ",
            AnimationChannel::RotationX => "rotationX",
            AnimationChannel::RotationY => "rotationY",
            AnimationChannel::RotationZ => "rotationZ",
            AnimationChannel::TranslationX => "translationX",
            AnimationChannel::TranslationY => "translationY",
            AnimationChannel::TranslationZ => "translationZ",
        }
    }

    /// Match a bare attribute name, accepting host short forms (`rotateX`, `translateX`)
    pub fn from_name(name: &str) -> Option<Self> {
        let canonical = match name {
            "rotateX" => "rotationX",
            "rotateY" => "rotationY",
            "rotateZ" => "rotationZ",
            "translateX" => "translationX",
            "translateY" => "translationY",
            "translateZ" => "translationZ",
            other => other,
        };
        ANIMATION_CHANNELS.iter().copied().find(|c| c.name() == canonical)
    }

    /// Match a curve object name such as `pCube1_translateX`
    pub fn from_curve_name(curve_name: &str) -> Result<Self> {
        Self::from_name(channel_suffix(curve_name)).ok_or_else(|| Error::UnknownAnimationChannel {
            name: curve_name.to_string(),
        })
    }
}

/// Strip the node-name prefix up to the last `_` or `.`
pub fn channel_suffix(curve_name: &str) -> &str {
    curve_name.rsplit(['_', '.']).next().unwrap_or(curve_name)
}

/// Semantic kind of a curve's output values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CurveKind {
    Angular,
    Linear,
    Time,
    Unitless,
    Other,
}

impl CurveKind {
    /// Integer written as the `type` of each keyframe triplet
    pub fn code(self) -> u32 {
        match self {
            CurveKind::Angular => 0,
            CurveKind::Linear => 1,
            CurveKind::Time => 2,
            CurveKind::Unitless => 3,
            CurveKind::Other => 4,
        }
    }

    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            0 => Some(CurveKind::Angular),
            1 => Some(CurveKind::Linear),
            2 => Some(CurveKind::Time),
            3 => Some(CurveKind::Unitless),
            4 => Some(CurveKind::Other),
            _ => None,
        }
    }
}

/// Host unit conversion factors
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UnitFactors {
    /// Host angular units per radian
    pub angular: f32,
    /// Host linear units per internal unit
    pub linear: f32,
}

impl UnitFactors {
    /// Degrees, internal linear units
    pub fn degrees() -> Self {
        Self {
            angular: 180.0 / std::f32::consts::PI,
            linear: 1.0,
        }
    }

    pub fn factor_for(&self, kind: CurveKind) -> f32 {
        match kind {
            CurveKind::Angular => self.angular,
            CurveKind::Linear => self.linear,
            _ => 1.0,
        }
    }
}

impl Default for UnitFactors {
    fn default() -> Self {
        Self {
            angular: 1.0,
            linear: 1.0,
        }
    }
}

/// One converted key
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Keyframe {
    /// Seconds
    pub time: f32,
    pub value: f32,
}

/// Converted keys of one channel
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationCurve {
    pub kind: CurveKind,
    pub keys: Vec<Keyframe>,
}

/// Non-empty curves of a mesh node, keyed by channel
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnimationCurveSet {
    curves: BTreeMap<AnimationChannel, AnimationCurve>,
}

impl AnimationCurveSet {
    pub fn get(&self, channel: AnimationChannel) -> Option<&AnimationCurve> {
        self.curves.get(&channel)
    }

    /// Curves in catalog order
    pub fn iter(&self) -> impl Iterator<Item = (AnimationChannel, &AnimationCurve)> {
        self.curves.iter().map(|(c, curve)| (*c, curve))
    }

    pub fn len(&self) -> usize {
        self.curves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.curves.is_empty()
    }
}

/// Extracts the catalog channels from a node's driven curves
#[derive(Debug, Clone, Copy, Default)]
pub struct AnimationEncoder {
    factors: UnitFactors,
}

impl AnimationEncoder {
    pub fn new(factors: UnitFactors) -> Self {
        Self { factors }
    }

    /// Convert matching curves; unknown channels and empty curves are dropped
    pub fn encode(&self, curves: &[DrivenCurve]) -> AnimationCurveSet {
        let mut set = AnimationCurveSet::default();

        for curve in curves {
            let channel = match AnimationChannel::from_curve_name(&curve.name) {
                Ok(channel) => channel,
                Err(e) => {
                    debug!(error = %e, "Skipping curve");
                    continue;
                }
            };
            if curve.keys.is_empty() {
                continue;
            }
            if set.curves.contains_key(&channel) {
                debug!(curve = %curve.name, channel = channel.name(), "Channel already captured");
                continue;
            }

            let factor = self.factors.factor_for(curve.kind);
            let keys = curve
                .keys
                .iter()
                .map(|&(time, raw)| Keyframe {
                    time,
                    value: raw * factor,
                })
                .collect();

            set.curves.insert(
                channel,
                AnimationCurve {
                    kind: curve.kind,
                    keys,
                },
            );
        }

        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn curve(name: &str, kind: CurveKind, keys: &[(f32, f32)]) -> DrivenCurve {
        DrivenCurve {
            name: name.to_string(),
            kind,
            keys: keys.to_vec(),
        }
    }

    #[test]
    fn test_channel_suffix() {
        assert_eq!(channel_suffix("pCube1_translateX"), "translateX");
        assert_eq!(channel_suffix("group_1_pCube1_visibility"), "visibility");
        assert_eq!(channel_suffix("pCube1.rotateZ"), "rotateZ");
        assert_eq!(channel_suffix("scaleY"), "scaleY");
    }

    #[test]
    fn test_channel_matching() {
        assert_eq!(
            AnimationChannel::from_curve_name("pCube1_translateX").unwrap(),
            AnimationChannel::TranslationX
        );
        assert_eq!(
            AnimationChannel::from_curve_name("pCube1_rotationY").unwrap(),
            AnimationChannel::RotationY
        );
        let err = AnimationChannel::from_curve_name("pCube1_shear").unwrap_err();
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_angular_curve_is_scaled() {
        let factors = UnitFactors::degrees();
        let set = AnimationEncoder::new(factors)
            .encode(&[curve("pCube1_rotateX", CurveKind::Angular, &[(0.0, 1.0)])]);

        let rot = set.get(AnimationChannel::RotationX).unwrap();
        assert!((rot.keys[0].value - factors.angular).abs() < 1e-5);
    }

    #[test]
    fn test_linear_curve_uses_linear_factor() {
        let factors = UnitFactors { angular: 1.0, linear: 100.0 };
        let set = AnimationEncoder::new(factors)
            .encode(&[curve("pCube1_translateY", CurveKind::Linear, &[(0.5, 0.25)])]);
        let keys = &set.get(AnimationChannel::TranslationY).unwrap().keys;
        assert_eq!(keys[0], Keyframe { time: 0.5, value: 25.0 });
    }

    #[test]
    fn test_visibility_passes_through() {
        let set = AnimationEncoder::new(UnitFactors::degrees())
            .encode(&[curve("pCube1_visibility", CurveKind::Unitless, &[(0.0, 1.0), (1.0, 0.0)])]);
        let vis = set.get(AnimationChannel::Visibility).unwrap();
        assert_eq!(vis.keys[0].value, 1.0);
        assert_eq!(vis.keys[1].value, 0.0);
    }

    #[test]
    fn test_unknown_and_empty_curves_are_absent() {
        let set = AnimationEncoder::default().encode(&[
            curve("pCube1_shearXY", CurveKind::Unitless, &[(0.0, 1.0)]),
            curve("pCube1_scaleZ", CurveKind::Unitless, &[]),
        ]);
        assert!(set.is_empty());
        assert!(set.get(AnimationChannel::ScaleZ).is_none());
    }

    #[test]
    fn test_catalog_order_and_source_key_order() {
        let set = AnimationEncoder::default().encode(&[
            curve("n_translateX", CurveKind::Linear, &[(2.0, 3.0), (1.0, 4.0)]),
            curve("n_visibility", CurveKind::Unitless, &[(0.0, 1.0)]),
        ]);
        let order: Vec<_> = set.iter().map(|(c, _)| c).collect();
        assert_eq!(order, vec![AnimationChannel::Visibility, AnimationChannel::TranslationX]);

        let times: Vec<f32> = set
            .get(AnimationChannel::TranslationX)
            .unwrap()
            .keys
            .iter()
            .map(|k| k.time)
            .collect();
        assert_eq!(times, vec![2.0, 1.0]);
    }

    #[test]
    fn test_first_curve_wins_for_duplicate_channel() {
        let set = AnimationEncoder::default().encode(&[
            curve("a_scaleX", CurveKind::Unitless, &[(0.0, 2.0)]),
            curve("b_scaleX", CurveKind::Unitless, &[(0.0, 5.0)]),
        ]);
        assert_eq!(set.len(), 1);
        assert_eq!(set.get(AnimationChannel::ScaleX).unwrap().keys[0].value, 2.0);
    }

    #[test]
    fn test_kind_codes_roundtrip() {
        for kind in [
            CurveKind::Angular,
            CurveKind::Linear,
            CurveKind::Time,
            CurveKind::Unitless,
            CurveKind::Other,
        ] {
            assert_eq!(CurveKind::from_code(kind.code()), Some(kind));
        }
        assert_eq!(CurveKind::from_code(9), None);
    }
}
