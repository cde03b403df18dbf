//! RFC 6386 §15: in-loop deblocking filter, simple and normal variants.
//! Operates directly on reconstructed `Plane` rows/columns once a whole
//! frame (or at least the macroblock row plus its neighbor above) has been
//! reconstructed, matching RFC 6386's row-major filtering order: each
//! macroblock's left edge and top edge are filtered before its interior.

use crate::frame::Plane;
use crate::header::FilterHeader;
use crate::util::clamp;

#[derive(Clone, Copy, Debug)]
pub struct FilterParams {
    pub level: i32,
    pub sharpness: u8,
    pub simple: bool,
    pub inner_edges: bool,
}

/// Derive this macroblock's effective filter level and whether its
/// internal 4x4 subblock edges should be filtered at all (RFC 6386 §15.2:
/// skipped macroblocks with no B_PRED and no residual never filter their
/// interior edges).
pub fn params_for_macroblock(
    filter: &FilterHeader,
    segment_level: i32,
    is_i4x4: bool,
    has_coeffs: bool,
) -> FilterParams {
    let mut level = segment_level;
    if filter.use_lf_delta {
        level += filter.ref_lf_delta[0];
        if is_i4x4 {
            level += filter.mode_lf_delta[0];
        }
    }
    let level = clamp(level, 0, 63);
    FilterParams {
        level,
        sharpness: filter.sharpness,
        simple: filter.simple,
        inner_edges: is_i4x4 || has_coeffs,
    }
}

fn hev_threshold(level: i32) -> i32 {
    if level >= 40 {
        2
    } else if level >= 15 {
        1
    } else {
        0
    }
}

fn interior_limit(level: i32, sharpness: u8) -> i32 {
    let mut limit = level;
    if sharpness > 0 {
        limit >>= if sharpness > 4 { 2 } else { 1 };
        limit = limit.min(9 - sharpness as i32);
    }
    limit.max(1)
}

fn edge_limit_mb(level: i32, sharpness: u8) -> i32 {
    2 * (level + 2) + interior_limit(level, sharpness)
}

fn edge_limit_sub(level: i32, sharpness: u8) -> i32 {
    2 * level + interior_limit(level, sharpness)
}

fn common_adjust(use_outer_taps: bool, samples: &mut [i32; 4]) -> i32 {
    let p1 = samples[0];
    let p0 = samples[1];
    let q0 = samples[2];
    let q1 = samples[3];

    let mut a = clamp(
        (if use_outer_taps { clamp(p1 - q1, -128, 127) } else { 0 }) + 3 * (q0 - p0),
        -128,
        127,
    );

    let f1 = clamp(a + 4, -128, 127) >> 3;
    let f2 = clamp(a + 3, -128, 127) >> 3;

    samples[2] = clamp(q0 - f1, -128, 127);
    samples[1] = clamp(p0 + f2, -128, 127);

    a = f1;
    (a + 1) >> 1
}

fn simple_filter(p1: &mut i32, p0: &mut i32, q0: &mut i32, q1: &mut i32) {
    let mut s = [*p1, *p0, *q0, *q1];
    common_adjust(true, &mut s);
    *p0 = s[1];
    *q0 = s[2];
}

fn normal_filter(
    edge_limit: i32,
    interior_limit: i32,
    hev_thresh: i32,
    p3: i32,
    p2: i32,
    p1: &mut i32,
    p0: &mut i32,
    q0: &mut i32,
    q1: &mut i32,
    q2: i32,
    q3: i32,
    subblock: bool,
) {
    let mask = (p3 - p2).abs() <= interior_limit
        && (p2 - *p1).abs() <= interior_limit
        && (*p1 - *p0).abs() <= interior_limit
        && (*q1 - *q0).abs() <= interior_limit
        && (q2 - *q1).abs() <= interior_limit
        && (q3 - q2).abs() <= interior_limit
        && (*p0 - *q0).abs() * 2 + (*p1 - *q1).abs() / 2 <= edge_limit;
    if !mask {
        return;
    }

    let hev = (*p1 - *p0).abs() > hev_thresh || (*q1 - *q0).abs() > hev_thresh;

    let mut s = [*p1, *p0, *q0, *q1];
    let a = common_adjust(hev, &mut s);
    *p1 = s[0];
    *p0 = s[1];
    *q0 = s[2];
    *q1 = s[3];

    if subblock && !hev {
        *q0 = clamp(*q0 - a, -128, 127);
        *p0 = clamp(*p0 + a, -128, 127);
    }
}

/// Filter the vertical edge at column `x0` (the boundary between the 4
/// pixels ending at `x0-1` and the 4 starting at `x0`) across `height`
/// rows, simple variant.
pub fn filter_edge_vertical_simple(plane: &mut Plane, x0: usize, y0: usize, height: usize, limit: i32) {
    for r in 0..height {
        let y = y0 + r;
        let mut p1 = plane.get(x0 - 2, y) as i32 - 128;
        let mut p0 = plane.get(x0 - 1, y) as i32 - 128;
        let mut q0 = plane.get(x0, y) as i32 - 128;
        let mut q1 = plane.get(x0 + 1, y) as i32 - 128;
        if (p0 - q0).abs() * 2 + (p1 - q1).abs() / 2 <= limit {
            simple_filter(&mut p1, &mut p0, &mut q0, &mut q1);
            plane.set(x0 - 1, y, (p0 + 128) as u8);
            plane.set(x0, y, (q0 + 128) as u8);
        }
    }
}

pub fn filter_edge_horizontal_simple(plane: &mut Plane, x0: usize, y0: usize, width: usize, limit: i32) {
    for c in 0..width {
        let x = x0 + c;
        let mut p1 = plane.get(x, y0 - 2) as i32 - 128;
        let mut p0 = plane.get(x, y0 - 1) as i32 - 128;
        let mut q0 = plane.get(x, y0) as i32 - 128;
        let mut q1 = plane.get(x, y0 + 1) as i32 - 128;
        if (p0 - q0).abs() * 2 + (p1 - q1).abs() / 2 <= limit {
            simple_filter(&mut p1, &mut p0, &mut q0, &mut q1);
            plane.set(x, y0 - 1, (p0 + 128) as u8);
            plane.set(x, y0, (q0 + 128) as u8);
        }
    }
}

pub fn filter_edge_vertical_normal(
    plane: &mut Plane,
    x0: usize,
    y0: usize,
    height: usize,
    edge_limit: i32,
    interior_limit: i32,
    hev_thresh: i32,
    subblock: bool,
) {
    for r in 0..height {
        let y = y0 + r;
        let p3 = plane.get(x0 - 4, y) as i32 - 128;
        let p2 = plane.get(x0 - 3, y) as i32 - 128;
        let mut p1 = plane.get(x0 - 2, y) as i32 - 128;
        let mut p0 = plane.get(x0 - 1, y) as i32 - 128;
        let mut q0 = plane.get(x0, y) as i32 - 128;
        let mut q1 = plane.get(x0 + 1, y) as i32 - 128;
        let q2 = plane.get(x0 + 2, y) as i32 - 128;
        let q3 = plane.get(x0 + 3, y) as i32 - 128;
        normal_filter(edge_limit, interior_limit, hev_thresh, p3, p2, &mut p1, &mut p0, &mut q0, &mut q1, q2, q3, subblock);
        plane.set(x0 - 2, y, (p1 + 128) as u8);
        plane.set(x0 - 1, y, (p0 + 128) as u8);
        plane.set(x0, y, (q0 + 128) as u8);
        plane.set(x0 + 1, y, (q1 + 128) as u8);
    }
}

pub fn filter_edge_horizontal_normal(
    plane: &mut Plane,
    x0: usize,
    y0: usize,
    width: usize,
    edge_limit: i32,
    interior_limit: i32,
    hev_thresh: i32,
    subblock: bool,
) {
    for c in 0..width {
        let x = x0 + c;
        let p3 = plane.get(x, y0 - 4) as i32 - 128;
        let p2 = plane.get(x, y0 - 3) as i32 - 128;
        let mut p1 = plane.get(x, y0 - 2) as i32 - 128;
        let mut p0 = plane.get(x, y0 - 1) as i32 - 128;
        let mut q0 = plane.get(x, y0) as i32 - 128;
        let mut q1 = plane.get(x, y0 + 1) as i32 - 128;
        let q2 = plane.get(x, y0 + 2) as i32 - 128;
        let q3 = plane.get(x, y0 + 3) as i32 - 128;
        normal_filter(edge_limit, interior_limit, hev_thresh, p3, p2, &mut p1, &mut p0, &mut q0, &mut q1, q2, q3, subblock);
        plane.set(x, y0 - 2, (p1 + 128) as u8);
        plane.set(x, y0 - 1, (p0 + 128) as u8);
        plane.set(x, y0, (q0 + 128) as u8);
        plane.set(x, y0 + 1, (q1 + 128) as u8);
    }
}

pub use self::derived_limits::*;
mod derived_limits {
    use super::{edge_limit_mb, edge_limit_sub, hev_threshold, interior_limit};

    pub fn mb_edge_limit(level: i32, sharpness: u8) -> i32 {
        edge_limit_mb(level, sharpness)
    }
    pub fn sub_edge_limit(level: i32, sharpness: u8) -> i32 {
        edge_limit_sub(level, sharpness)
    }
    pub fn inner_limit(level: i32, sharpness: u8) -> i32 {
        interior_limit(level, sharpness)
    }
    pub fn hev(level: i32) -> i32 {
        hev_threshold(level)
    }
}
