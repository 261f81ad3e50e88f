//! Skin part and body part identifiers with their fixed lookup tables.
//!
//! Region codes arrive on the wire as plain integers. Anything outside the
//! known range resolves to [`SkinPart::Unknown`].

use serde::{Deserialize, Serialize};

/// A contiguous sensing area of the robot skin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkinPart {
    /// Unrecognized region.
    Unknown,
    /// Left hand palm and fingertips.
    LeftHand,
    /// Left forearm.
    LeftForearm,
    /// Left upper arm.
    LeftUpperArm,
    /// Right hand palm and fingertips.
    RightHand,
    /// Right forearm.
    RightForearm,
    /// Right upper arm.
    RightUpperArm,
    /// Front of the torso.
    FrontTorso,
    /// Left thigh.
    LeftLegUpper,
    /// Left shank.
    LeftLegLower,
    /// Left foot sole.
    LeftFoot,
    /// Right thigh.
    RightLegUpper,
    /// Right shank.
    RightLegLower,
    /// Right foot sole.
    RightFoot,
    /// Aggregate of all parts.
    All,
}

/// Coarse anatomical grouping of skin parts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BodyPart {
    /// Unrecognized body part.
    Unknown,
    /// Head.
    Head,
    /// Torso.
    Torso,
    /// Left arm.
    LeftArm,
    /// Right arm.
    RightArm,
    /// Left leg.
    LeftLeg,
    /// Right leg.
    RightLeg,
    /// Aggregate of all body parts.
    All,
}

// Indexed by the skin part's wire code.
const SKIN_PARTS: [SkinPart; 15] = [
    SkinPart::Unknown,
    SkinPart::LeftHand,
    SkinPart::LeftForearm,
    SkinPart::LeftUpperArm,
    SkinPart::RightHand,
    SkinPart::RightForearm,
    SkinPart::RightUpperArm,
    SkinPart::FrontTorso,
    SkinPart::LeftLegUpper,
    SkinPart::LeftLegLower,
    SkinPart::LeftFoot,
    SkinPart::RightLegUpper,
    SkinPart::RightLegLower,
    SkinPart::RightFoot,
    SkinPart::All,
];

const SKIN_PART_TO_BODY_PART: [BodyPart; 15] = [
    BodyPart::Unknown,
    BodyPart::LeftArm,
    BodyPart::LeftArm,
    BodyPart::LeftArm,
    BodyPart::RightArm,
    BodyPart::RightArm,
    BodyPart::RightArm,
    BodyPart::Torso,
    BodyPart::LeftLeg,
    BodyPart::LeftLeg,
    BodyPart::LeftLeg,
    BodyPart::RightLeg,
    BodyPart::RightLeg,
    BodyPart::RightLeg,
    BodyPart::All,
];

const SKIN_PART_TO_LINK_NUM: [i32; 15] = [-1, 6, 4, 2, 6, 4, 2, 2, 2, 3, 5, 2, 3, 5, -1];

impl SkinPart {
    /// Resolve a wire code. Codes outside the table map to [`SkinPart::Unknown`].
    pub fn from_code(code: i64) -> Self {
        usize::try_from(code)
            .ok()
            .and_then(|idx| SKIN_PARTS.get(idx).copied())
            .unwrap_or(SkinPart::Unknown)
    }

    /// Body part this skin part belongs to.
    pub fn body_part(self) -> BodyPart {
        SKIN_PART_TO_BODY_PART[self as usize]
    }

    /// Kinematic link index the part is mounted on, `-1` when undefined.
    pub fn link_num(self) -> i32 {
        SKIN_PART_TO_LINK_NUM[self as usize]
    }
}
