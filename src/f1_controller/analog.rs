/// Lowest raw sample the knobs and faders report.
pub const RAW_MIN: u16 = 0x000;
/// Highest raw sample (12-bit).
pub const RAW_MAX: u16 = 0xFFF;
/// Upper bound of the normalized range.
pub const NORMALIZED_MAX: f32 = 127.0;

/// Map a raw sample onto `0.0..=127.0`.
///
/// Samples outside `raw_min..=raw_max` are clamped first, so rail jitter maps
/// onto the end points instead of extrapolating. No smoothing happens here.
pub fn normalize(raw: u16, raw_min: u16, raw_max: u16) -> f32 {
    if raw_max <= raw_min {
        return 0.0;
    }
    let clamped = raw.clamp(raw_min, raw_max);
    (clamped - raw_min) as f32 / (raw_max - raw_min) as f32 * NORMALIZED_MAX
}

/// [`normalize`] over the full 12-bit range.
pub fn normalize_12bit(raw: u16) -> f32 {
    normalize(raw, RAW_MIN, RAW_MAX)
}
