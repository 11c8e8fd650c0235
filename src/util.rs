//! Grid and interpolation helpers.
//!
//! Materialized coordinates are never wrapped, so an entity walking off the
//! east edge keeps increasing its column. Consumers that draw or measure
//! distances use these helpers to fold positions back onto the torus.

/// Folds `value` into `[0, size)`.
pub fn wrap_coordinate(value: f64, size: usize) -> f64 {
    if size == 0 {
        return value;
    }
    value.rem_euclid(size as f64)
}

/// Shortest signed offset from `from` to `to` on a ring of `size` cells.
pub fn wrapped_delta(from: f64, to: f64, size: usize) -> f64 {
    if size == 0 {
        return to - from;
    }
    let size = size as f64;
    let delta = (to - from).rem_euclid(size);
    if delta > size / 2.0 {
        delta - size
    } else {
        delta
    }
}

/// Squared distance between two `(row, col)` points on a `rows x cols` torus.
pub fn wrapped_distance2(a: (f64, f64), b: (f64, f64), rows: usize, cols: usize) -> f64 {
    let dr = wrapped_delta(a.0, b.0, rows);
    let dc = wrapped_delta(a.1, b.1, cols);
    dr * dr + dc * dc
}

/// Fraction of the way `time` lies between `start_time` and `end_time`.
pub fn interpolation_amount(start_time: f64, end_time: f64, time: f64) -> f64 {
    let duration = end_time - start_time;
    if duration == 0.0 {
        return 0.0;
    }
    (time - start_time) / duration
}

/// Scalar counterpart of glam's `lerp`, for attributes that are not vectors.
pub fn lerp(a: f64, b: f64, amount: f64) -> f64 {
    a + (b - a) * amount
}
