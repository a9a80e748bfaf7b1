//! Sparkline summaries of markup history

const LEVELS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

pub const DEFAULT_WINDOW: usize = 20;

/// Renders the last `window` values as a sparkline.
///
/// Each value is binned linearly between the minimum and maximum of the
/// window. A flat window renders every value at the lowest level.
pub fn summarize(values: &[f64], window: usize) -> String {
    let start = values.len().saturating_sub(window);
    let recent = &values[start..];
    if recent.is_empty() {
        return String::new();
    }

    let finite = recent.iter().copied().filter(|v| v.is_finite());
    let (min, max) = finite.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });

    if !min.is_finite() || min == max {
        return LEVELS[0].to_string().repeat(recent.len());
    }

    let top = LEVELS.len() - 1;
    let step = (max - min) / top as f64;
    recent
        .iter()
        .map(|v| {
            if !v.is_finite() {
                return LEVELS[0];
            }
            let idx = ((v - min) / step) as usize;
            LEVELS[idx.min(top)]
        })
        .collect()
}
