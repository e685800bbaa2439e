pub(crate) fn is_positive_power_of_two(x: u32) -> bool {
    x != 0 && (x & (x - 1)) == 0
}

/// Remap `v` from `[lo, hi]` onto `[0, 1]`, clamping outside values to the nearest endpoint.
pub(crate) fn unit_remap(v: f32, lo: f32, hi: f32) -> f32 {
    ((v - lo) / (hi - lo)).clamp(0.0, 1.0)
}

/// Squared 2D distance in `f32`, evaluated the same way as the compute kernel.
pub(crate) fn distance_squared_2d(ax: f32, ay: f32, bx: f32, by: f32) -> f32 {
    let dx = bx - ax;
    let dy = by - ay;
    dx * dx + dy * dy
}

#[cfg_attr(not(feature = "gpu"), allow(dead_code))]
pub(crate) fn align_to(value: u32, alignment: u32) -> u32 {
    let mask = alignment - 1;
    (value + mask) & !mask
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/math.rs"]
mod tests;
