use crate::Error;

/// Headroom below the direct sound before the decay fit starts, in dB.
const HEADROOM_DB: f64 = 5.0;

/// Schroeder backward integrated energy decay curve in dB, 0 dB at the start.
///
/// Trailing silence is dropped so every value is finite.
fn schroeder_decay(rir: &[f32]) -> Vec<f64> {
    let end = rir
        .iter()
        .rposition(|s| *s != 0.0)
        .map_or(0, |last| last + 1);

    let mut energy: Vec<f64> = rir[..end]
        .iter()
        .rev()
        .scan(0.0, |sum, s| {
            *sum += (*s as f64).powi(2);
            Some(*sum)
        })
        .collect();
    energy.reverse();

    let Some(&total) = energy.first() else {
        return Vec::new();
    };

    energy
        .into_iter()
        .map(|e| 10.0 * (e / total).log10())
        .collect()
}

/// Reverberation time of an impulse response, in seconds.
///
/// The decay is measured from -5 dB down to `-5 - decay_db` and scaled to
/// 60 dB. Responses that do not decay that far are extrapolated from the range
/// they do cover.
pub fn rt60(rir: &[f32], sample_rate: u32, decay_db: f64) -> Result<f64, Error> {
    let decay = schroeder_decay(rir);
    let Some(&floor) = decay.last() else {
        return Err(Error::InsufficientDecay);
    };

    let available = -floor - HEADROOM_DB;
    let decay_db = decay_db.min(available);
    if !(decay_db > 0.0) {
        return Err(Error::InsufficientDecay);
    }

    let start = decay
        .iter()
        .position(|db| *db < -HEADROOM_DB)
        .ok_or(Error::InsufficientDecay)?;
    // an extrapolated decay ends on the last sample
    let end = decay
        .iter()
        .position(|db| *db < -HEADROOM_DB - decay_db)
        .unwrap_or(decay.len() - 1);

    let span = end.saturating_sub(start) as f64 / sample_rate as f64;
    if span <= 0.0 {
        return Err(Error::InsufficientDecay);
    }

    Ok(60.0 / decay_db * span)
}

/// Early decay time, the 0 to -10 dB slope scaled to 60 dB, in seconds.
pub fn edt(rir: &[f32], sample_rate: u32) -> Result<f64, Error> {
    let decay = schroeder_decay(rir);

    let end = decay
        .iter()
        .position(|db| *db < -10.0)
        .ok_or(Error::InsufficientDecay)?;
    if end == 0 {
        return Err(Error::InsufficientDecay);
    }

    Ok(6.0 * end as f64 / sample_rate as f64)
}
