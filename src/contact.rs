//! Contact reports published for visualization.

use serde::{Deserialize, Serialize};

use crate::skin::{BodyPart, SkinPart};

/// A 3-component vector in the link frame of reference.
pub type Vec3 = [f64; 3];

/// One contact as understood by the force visualizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkinContact {
    /// Body part the contact lies on.
    pub body_part: BodyPart,
    /// Skin part the contact was sensed on.
    pub skin_part: SkinPart,
    /// Kinematic link index, `-1` when undefined.
    pub link_num: i32,
    /// Geometric center of the activated area.
    pub geo_center: Vec3,
    /// Center of pressure.
    pub cop: Vec3,
    /// Indices of the activated taxels.
    pub taxels: Vec<u32>,
    /// Scalar pressure magnitude.
    pub pressure: f64,
    /// Outward surface normal.
    pub normal: Vec3,
    /// Contact force.
    pub force: Vec3,
    /// Contact moment.
    pub moment: Vec3,
}

/// Ordered list of contacts published in one message.
pub type SkinContactList = Vec<SkinContact>;

/// Envelope attached to every published message.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Stamp {
    /// Sequence number, incremented on every update.
    pub count: u32,
    /// Seconds since the Unix epoch at the last update.
    pub time: f64,
}

impl Stamp {
    /// Advance the sequence number and refresh the time.
    ///
    /// Time never goes backwards even if the wall clock does.
    #[allow(clippy::cast_precision_loss)]
    pub fn update(&mut self) {
        self.count = self.count.wrapping_add(1);
        let now = chrono::Utc::now();
        let secs = now.timestamp() as f64 + f64::from(now.timestamp_subsec_nanos()) * 1e-9;
        self.time = self.time.max(secs);
    }
}
