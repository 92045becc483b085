//! Rate smoothing across consecutive segments.

pub const DEFAULT_MAX_RATE_CHANGE: i32 = 15;

/// Limit the step between consecutive rates.
///
/// The first rate is kept; each following rate is clamped to within
/// `max_step` of the previous smoothed rate.
pub fn smooth_rates(raw_rates: &[i32], max_step: i32) -> Vec<i32> {
    smooth_rates_with(raw_rates, |_| max_step)
}

/// Like [`smooth_rates`], with the allowed step into rate `i` given by
/// `max_step(i)`.
pub fn smooth_rates_with(raw_rates: &[i32], max_step: impl Fn(usize) -> i32) -> Vec<i32> {
    let mut smoothed: Vec<i32> = Vec::with_capacity(raw_rates.len());
    for (i, &rate) in raw_rates.iter().enumerate() {
        let next = match smoothed.last() {
            Some(&prev) => {
                let step = max_step(i).max(0);
                rate.clamp(prev - step, prev + step)
            }
            None => rate,
        };
        smoothed.push(next);
    }
    smoothed
}
