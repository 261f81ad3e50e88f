//! Aggregated event records to [`SkinContact`]s.
//!
//! Record layout, link frame of reference throughout:
//! `(skin_part x y z nx ny nz ... activation)` with the normalized
//! activation at index [`ACTIVATION_FIELD`]. Fields in between are ignored.

use tracing::trace;

use crate::bottle::Bottle;
use crate::contact::{SkinContact, SkinContactList, Vec3};
use crate::net::InputPort;
use crate::skin::SkinPart;

/// Index of the skin part code.
pub const SKIN_PART_FIELD: usize = 0;
/// Index of the first position component.
pub const POSITION_FIELD: usize = 1;
/// Index of the first normal component.
pub const NORMAL_FIELD: usize = 4;
/// Index of the normalized activation.
pub const ACTIVATION_FIELD: usize = 13;

fn vec3_at(record: &Bottle, first: usize) -> Vec3 {
    let field = |offset: usize| {
        first
            .checked_add(offset)
            .map_or(0.0, |idx| record.get(idx).as_double())
    };
    [field(0), field(1), field(2)]
}

/// Convert one record. Missing or non-numeric fields read as zero.
pub fn decode_record(record: &Bottle, gain: f64) -> SkinContact {
    let skin_part = SkinPart::from_code(record.get(SKIN_PART_FIELD).as_int());
    let geo_center = vec3_at(record, POSITION_FIELD);
    let normal = vec3_at(record, NORMAL_FIELD);
    let activation = record.get(ACTIVATION_FIELD).as_double();

    let pressure = gain * activation;
    // Points into the surface, against the outward normal.
    let force = normal.map(|n| -pressure * n);

    SkinContact {
        body_part: skin_part.body_part(),
        skin_part,
        link_num: skin_part.link_num(),
        geo_center,
        cop: geo_center,
        taxels: Vec::new(),
        pressure,
        normal,
        force,
        moment: [0.0; 3],
    }
}

/// Convert every record of one message, in order, appending to `batch`.
///
/// Entries that are not lists are treated as empty records.
pub fn decode_message(message: &Bottle, gain: f64, batch: &mut SkinContactList) {
    let empty = Bottle::new();
    batch.extend(
        message
            .iter()
            .map(|entry| decode_record(entry.as_list().unwrap_or(&empty), gain)),
    );
}

/// Poll `port` once and append the contacts of the pending message, if any.
///
/// Returns whether a message was pending.
pub fn fill_from_port(port: &mut dyn InputPort, gain: f64, batch: &mut SkinContactList) -> bool {
    let Some(message) = port.read() else {
        trace!(port = port.name(), "no events pending");
        return false;
    };
    trace!(port = port.name(), records = message.len(), "events received");
    decode_message(&message, gain, batch);
    true
}
