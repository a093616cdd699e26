//! Percentiles of trial deviations.

/// The `p`-th quantile of `data`, interpolating linearly between order
/// statistics (Hyndman and Fan type 7).
///
/// Sorts `data` in place. Returns `None` for an empty slice or `p` outside
/// `[0, 1]`.
pub fn percentile(data: &mut [f64], p: f64) -> Option<f64> {
    if data.is_empty() || !(0.0..=1.0).contains(&p) {
        return None;
    }
    data.sort_unstable_by(f64::total_cmp);

    let position = p * (data.len() - 1) as f64;
    let below = position.floor() as usize;
    let weight = position - below as f64;
    let lower = data[below];
    Some(match data.get(below + 1) {
        Some(&upper) if weight > 0.0 => lower + weight * (upper - lower),
        _ => lower,
    })
}
