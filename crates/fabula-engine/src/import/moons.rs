//! Moon phase construction.

use crate::model::MoonPhase;

const EIGHT_PHASES: [&str; 8] = [
    "New Moon",
    "Waxing Crescent",
    "First Quarter",
    "Waxing Gibbous",
    "Full Moon",
    "Waning Gibbous",
    "Last Quarter",
    "Waning Crescent",
];

const FOUR_PHASES: [&str; 4] = ["New Moon", "First Quarter", "Full Moon", "Last Quarter"];

/// `count` evenly spaced phases tiling `[0, 1)`.
pub(crate) fn synthesize_phases(count: u32) -> Vec<MoonPhase> {
    let count = count.max(1);
    let n = f64::from(count);
    (0..count)
        .map(|i| {
            let name = match count {
                8 => EIGHT_PHASES[i as usize].to_string(),
                4 => FOUR_PHASES[i as usize].to_string(),
                _ => format!("Phase {}", i + 1),
            };
            MoonPhase {
                name,
                start: f64::from(i) / n,
                end: if i + 1 == count { 1.0 } else { f64::from(i + 1) / n },
            }
        })
        .collect()
}

/// Fractional phases from per-phase day lengths, scaled to tile `[0, 1)`.
///
/// Returns `None` when the lengths do not add up to a positive total.
pub(crate) fn phases_from_lengths(phases: &[(String, f64)]) -> Option<Vec<MoonPhase>> {
    let total: f64 = phases.iter().map(|(_, len)| len.max(0.0)).sum();
    if !total.is_finite() || total <= 0.0 {
        return None;
    }

    let kept: Vec<&(String, f64)> = phases.iter().filter(|(_, len)| *len > 0.0).collect();
    let last = kept.len() - 1;
    let mut cursor = 0.0;
    Some(
        kept.into_iter()
            .enumerate()
            .map(|(i, (name, len))| {
                let start = cursor;
                cursor += len / total;
                MoonPhase {
                    name: name.clone(),
                    start,
                    end: if i == last { 1.0 } else { cursor },
                }
            })
            .collect(),
    )
}
