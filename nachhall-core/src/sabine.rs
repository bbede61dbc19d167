use crate::{Dimensions, Error};

/// Sabine's constant, 24 ln(10).
const SABINE_COEFFICIENT: f64 = 24.0 * std::f64::consts::LN_10;

/// Inverts Sabine's formula for a box room.
///
/// Returns the energy absorption coefficient every wall needs for the room to
/// reach `rt60` seconds of reverberation, together with the image source order
/// required to cover that time span.
pub fn inverse_sabine(
    rt60: f64,
    room_dim: &[f64],
    speed_of_sound: f64,
) -> Result<(f64, u32), Error> {
    let dimensions = Dimensions::from_slice(room_dim)?;

    if !(rt60.is_finite() && rt60 > 0.0) {
        return Err(Error::InvalidRt60(rt60));
    }

    let absorption = SABINE_COEFFICIENT * dimensions.volume()
        / (speed_of_sound * dimensions.surface() * rt60);

    if absorption > 1.0 {
        return Err(Error::RoomTooLarge(absorption));
    }

    let max_order = (speed_of_sound * rt60 / dimensions.min_side() - 1.0)
        .ceil()
        .max(0.0) as u32;

    Ok((absorption, max_order))
}
