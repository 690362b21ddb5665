//! Star icon quantization for ratings out of 5.

use serde::Serialize;

/// Counts of full, half, and empty star icons for a rating out of 5.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StarIcons {
    pub full: u8,
    pub half: u8,
    pub empty: u8,
}

impl StarIcons {
    /// Quantize a rating to star icon counts.
    ///
    /// The rating is rounded to the nearest half star. A missing or zero
    /// rating gets no icons at all.
    pub fn from_rating(rating: f64) -> Option<Self> {
        if !(rating > 0.0) {
            return None;
        }
        let stars_out_of_ten = (2.0 * rating).round() as u8;
        let full = stars_out_of_ten / 2;
        let half = stars_out_of_ten % 2;
        let empty = 5u8.saturating_sub(full + half);
        Some(Self { full, half, empty })
    }
}
