use crate::Error;

/// Angle between two vectors, in radians.
///
/// With `sign_invariant` the vectors are treated as undirected lines, so
/// opposite vectors are 0 apart and the result never exceeds pi/2.
pub fn angular_distance(a: &[f64], b: &[f64], sign_invariant: bool) -> Result<f64, Error> {
    if a.len() != b.len() {
        return Err(Error::LengthMismatch(a.len(), b.len()));
    }

    let norm = |v: &[f64]| v.iter().map(|x| x * x).sum::<f64>().sqrt();
    let norms = norm(a) * norm(b);
    if norms == 0.0 {
        return Err(Error::ZeroVector);
    }

    let dot: f64 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let dot = if sign_invariant { dot.abs() } else { dot };

    Ok((dot / norms).clamp(-1.0, 1.0).acos())
}
