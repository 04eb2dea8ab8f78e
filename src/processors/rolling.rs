//! Sliding-window aggregates over hourly slots.
//!
//! A window only produces a value when every hour in it is valid; partial
//! windows yield `None` rather than a mean of whatever happens to be there.
//! Output index `i` is the window covering hours `i..i + width`.

fn windows(hours: &[Option<f64>], width: usize) -> impl Iterator<Item = &[Option<f64>]> {
    // `slice::windows` panics on zero
    let width = width.max(1);
    hours.windows(width)
}

fn complete(window: &[Option<f64>]) -> Option<impl Iterator<Item = f64> + '_> {
    if window.iter().all(Option::is_some) {
        Some(window.iter().flatten().copied())
    } else {
        None
    }
}

/// Moving average of every complete window of `width` consecutive hours
pub fn moving_averages(hours: &[Option<f64>], width: usize) -> Vec<Option<f64>> {
    windows(hours, width)
        .map(|w| complete(w).map(|values| values.sum::<f64>() / w.len() as f64))
        .collect()
}

/// Smallest value of every complete window. A window is sustained above a
/// limit exactly when its minimum is.
pub fn window_minimums(hours: &[Option<f64>], width: usize) -> Vec<Option<f64>> {
    windows(hours, width)
        .map(|w| complete(w).map(|values| values.fold(f64::INFINITY, f64::min)))
        .collect()
}

/// Length of the longest run of consecutive valid hours
pub fn longest_valid_run(hours: &[Option<f64>]) -> usize {
    let mut longest = 0;
    let mut current = 0;
    for slot in hours {
        if slot.is_some() {
            current += 1;
            longest = longest.max(current);
        } else {
            current = 0;
        }
    }
    longest
}

/// Counts complete windows and those strictly above `limit`.
/// Returns `(windows, exceedances)`.
pub fn count_above(window_values: &[Option<f64>], limit: f64) -> (u32, u32) {
    window_values
        .iter()
        .flatten()
        .fold((0, 0), |(windows, above), v| {
            (windows + 1, above + u32::from(*v > limit))
        })
}

pub fn max_defined(values: &[Option<f64>]) -> Option<f64> {
    values.iter().flatten().copied().reduce(f64::max)
}
