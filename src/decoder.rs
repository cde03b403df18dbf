//! The row pipeline: ties together header parsing, per-macroblock
//! mode/residual decode, intra prediction, inverse transform, and the
//! loop filter, one macroblock row at a time, handing each finished row
//! to the caller's `RowSink`.

use log::{debug, trace, warn};

use crate::bool_reader::BoolDecoder;
use crate::emit::RowSink;
use crate::error::{DecodeError, Result};
use crate::frame::Frame;
use crate::header::{self, FrameTag, LoopFilterKind, PictureDimensions, Profile};
use crate::loopfilter::{self, FilterParams};
use crate::macroblock::{self, MacroblockData, NzContext};
use crate::quant::{self, DequantFactors};
use crate::residual;
use crate::tables::B_DC_PRED;
use crate::transform::{idct4x4, iwht4x4};
use crate::util::clamp255;

/// Caller-configurable decode behavior.
#[derive(Clone, Copy, Debug)]
pub struct DecodeOptions {
    pub apply_loop_filter: bool,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        DecodeOptions {
            apply_loop_filter: true,
        }
    }
}

/// Decode one VP8 keyframe and emit its rows to `emitter`.
///
/// `frame_bytes` begins at the control partition (the container-level
/// frame tag named by `header` has already been stripped). `picture` gives
/// the cropped output dimensions; `header.version` selects the loop-filter
/// variant per `Profile::loop_filter_kind`.
pub fn decode(
    frame_bytes: &[u8],
    header: FrameTag,
    picture: PictureDimensions,
    options: DecodeOptions,
    emitter: &mut dyn RowSink,
) -> Result<()> {
    if !header.key_frame {
        return Err(DecodeError::InvalidHeader(
            "inter frames are out of scope for this decoder",
        ));
    }

    let loop_filter_kind = Profile(header.version).loop_filter_kind()?;
    debug!(
        "decoding {}x{} keyframe, profile {}",
        picture.width, picture.height, header.version
    );

    let (frame_header, mut control_bc, partitions) = header::parse(frame_bytes, header)?;

    if partitions.num_partitions() == 0 {
        return Err(DecodeError::InvalidHeader("zero residual partitions"));
    }

    let mb_width = picture.mb_width();
    let mb_height = picture.mb_height();

    let dequant_factors = DequantFactors::build_all(&frame_header.segment, &frame_header.dequant);
    let filter_params_possible = options.apply_loop_filter && loop_filter_kind != LoopFilterKind::None;

    let mut residual_bc: Vec<BoolDecoder> = partitions
        .spans
        .iter()
        .map(|&(start, end)| BoolDecoder::new(&frame_bytes[start..end]))
        .collect();

    let mut frame = Frame::new(mb_width, mb_height)?;

    let mut above_bmode = Vec::new();
    above_bmode
        .try_reserve_exact(mb_width)
        .map_err(|_| DecodeError::OutOfMemory("above-mode row scratch"))?;
    above_bmode.resize(mb_width, [B_DC_PRED; 4]);

    let mut above_nz = Vec::new();
    above_nz
        .try_reserve_exact(mb_width)
        .map_err(|_| DecodeError::OutOfMemory("above-nonzero-context row scratch"))?;
    above_nz.resize(mb_width, NzContext::default());

    for mb_y in 0..mb_height {
        let partition_idx = mb_y % partitions.num_partitions();

        let mut left_bmode = [B_DC_PRED; 4];
        let mut left_nz = NzContext::default();

        for mb_x in 0..mb_width {
            let (mut mb, new_above, new_left) =
                macroblock::parse_modes(&mut control_bc, &frame_header, &above_bmode[mb_x], &left_bmode);
            above_bmode[mb_x] = new_above;
            left_bmode = new_left;

            residual::decode_macroblock(
                &mut residual_bc[partition_idx],
                &frame_header.coeff_probs,
                &mut mb,
                &mut above_nz[mb_x],
                &mut left_nz,
            );

            let seg = macroblock::effective_segment(&frame_header.segment, mb.segment_id);
            let factors = quant::for_segment(&dequant_factors, seg, frame_header.segment.use_segments);

            dequantize_macroblock(&mut mb, &factors);
            reconstruct_macroblock(&mut frame, mb_x, mb_y, &mb, mb_x > 0, mb_y > 0);

            let base_level = frame_header.filter.level as i32;
            let seg_level = frame_header
                .segment
                .filter_level_for_segment(seg as usize, base_level);
            let params = loopfilter::params_for_macroblock(
                &frame_header.filter,
                seg_level,
                mb.is_i4x4,
                has_any_coeff(&mb),
            );

            if filter_params_possible && params.level > 0 {
                apply_loop_filter(&mut frame, mb_x, mb_y, &params, params.simple);
            }
        }

        emit_row(&frame, mb_y, mb_height, &picture, emitter);
        trace!("finished macroblock row {mb_y}/{mb_height}");
    }

    if partitions
        .spans
        .iter()
        .any(|&(s, e)| e.saturating_sub(s) == 0)
    {
        warn!("one or more residual partitions were empty after truncation tolerance");
    }

    Ok(())
}

fn has_any_coeff(mb: &MacroblockData) -> bool {
    mb.coeffs.iter().any(|block| block.iter().any(|&c| c != 0))
}

fn dequantize_macroblock(mb: &mut MacroblockData, factors: &DequantFactors) {
    if !mb.is_i4x4 {
        let y2 = &mut mb.coeffs[24];
        y2[0] *= factors.y2[0];
        for v in y2.iter_mut().skip(1) {
            *v *= factors.y2[1];
        }
    }
    for idx in 0..16 {
        let block = &mut mb.coeffs[idx];
        block[0] *= factors.y1[0];
        for v in block.iter_mut().skip(1) {
            *v *= factors.y1[1];
        }
    }
    for idx in 16..24 {
        let block = &mut mb.coeffs[idx];
        block[0] *= factors.uv[0];
        for v in block.iter_mut().skip(1) {
            *v *= factors.uv[1];
        }
    }
}

/// Predict, inverse-transform, and add the residual for one macroblock
/// into the frame buffer, clamping the sum to `0..=255` per sample.
fn reconstruct_macroblock(
    frame: &mut Frame,
    mb_x: usize,
    mb_y: usize,
    mb: &MacroblockData,
    have_left: bool,
    have_above: bool,
) {
    if !mb.is_i4x4 {
        let y2 = iwht4x4(&mb.coeffs[24]);
        let x0 = mb_x * 16;
        let y0 = mb_y * 16;
        crate::predict::predict_block(frame.y_mut(), x0, y0, 16, mb.ymode, have_above, have_left);

        for sub in 0..16 {
            let row = sub / 4;
            let col = sub % 4;
            let mut coeffs = mb.coeffs[sub];
            coeffs[0] = y2[sub];
            add_residual_4x4(frame.y_mut(), x0 + col * 4, y0 + row * 4, &idct4x4(&coeffs));
        }
    } else {
        let x0 = mb_x * 16;
        let y0 = mb_y * 16;

        // RFC 6386 §12.3: the rightmost subblock column has no decoded
        // subblock above-and-to-the-right except in row 0 (where it is the
        // macroblock's own above-right neighbor). Every other row in that
        // column reuses the same macroblock-level above-right samples
        // rather than reading the not-yet-reconstructed macroblock to the
        // right, so this is computed once, from the row above the whole
        // macroblock.
        let mb_above_right = if have_above {
            let plane = frame.y();
            let plane_width = plane.width;
            let mut arr = [0i32; 4];
            for i in 0..4 {
                let x = x0 + 16 + i;
                arr[i] = if x < plane_width {
                    plane.get(x, y0 - 1) as i32
                } else {
                    plane.get(plane_width - 1, y0 - 1) as i32
                };
            }
            arr
        } else {
            [127i32; 4]
        };

        for sub in 0..16 {
            let row = sub / 4;
            let col = sub % 4;
            let bx = x0 + col * 4;
            let by = y0 + row * 4;
            let have_a = have_above || row > 0;
            let have_l = have_left || col > 0;
            let above_right_override = if col == 3 { Some(mb_above_right) } else { None };
            predict_and_reconstruct_4x4(
                frame.y_mut(),
                bx,
                by,
                mb.bmodes[sub],
                have_a,
                have_l,
                above_right_override,
                &idct4x4(&mb.coeffs[sub]),
            );
        }
    }

    let cx0 = mb_x * 8;
    let cy0 = mb_y * 8;
    crate::predict::predict_block(frame.u_mut(), cx0, cy0, 8, mb.uv_mode, have_above, have_left);
    crate::predict::predict_block(frame.v_mut(), cx0, cy0, 8, mb.uv_mode, have_above, have_left);
    for sub in 0..4 {
        let row = sub / 2;
        let col = sub % 2;
        add_residual_4x4(frame.u_mut(), cx0 + col * 4, cy0 + row * 4, &idct4x4(&mb.coeffs[16 + sub]));
        add_residual_4x4(frame.v_mut(), cx0 + col * 4, cy0 + row * 4, &idct4x4(&mb.coeffs[20 + sub]));
    }
}

fn predict_and_reconstruct_4x4(
    plane: &mut crate::frame::Plane,
    x0: usize,
    y0: usize,
    mode: u8,
    have_above: bool,
    have_left: bool,
    above_right_override: Option<[i32; 4]>,
    residual: &[i32; 16],
) {
    let above_left = if have_above && have_left {
        plane.get(x0 - 1, y0 - 1) as i32
    } else if have_above {
        129
    } else {
        127
    };

    let mut above = [127i32; 8];
    if have_above {
        for i in 0..4 {
            above[i] = plane.get(x0 + i, y0 - 1) as i32;
        }
        if let Some(over) = above_right_override {
            above[4..8].copy_from_slice(&over);
        } else {
            let plane_width = plane.width;
            for i in 0..4 {
                let x = x0 + 4 + i;
                above[4 + i] = if x < plane_width {
                    plane.get(x, y0 - 1) as i32
                } else {
                    above[3]
                };
            }
        }
    }

    let mut left = [129i32; 4];
    if have_left {
        for i in 0..4 {
            left[i] = plane.get(x0 - 1, y0 + i) as i32;
        }
    }

    let predicted = crate::predict::predict_4x4(mode, &above, &left, above_left);
    for r in 0..4 {
        for c in 0..4 {
            let v = clamp255(predicted[r][c] as i32 + residual[r * 4 + c]);
            plane.set(x0 + c, y0 + r, v);
        }
    }
}

fn add_residual_4x4(plane: &mut crate::frame::Plane, x0: usize, y0: usize, residual: &[i32; 16]) {
    for r in 0..4 {
        for c in 0..4 {
            let v = clamp255(plane.get(x0 + c, y0 + r) as i32 + residual[r * 4 + c]);
            plane.set(x0 + c, y0 + r, v);
        }
    }
}

fn apply_loop_filter(frame: &mut Frame, mb_x: usize, mb_y: usize, params: &FilterParams, simple: bool) {
    let sharpness = params.sharpness;
    let level = params.level;
    let hev = loopfilter::hev(level);

    for (plane_idx, size) in [(0usize, 16usize), (1, 8), (2, 8)] {
        let plane = frame.plane_mut(plane_idx);
        let x0 = mb_x * size;
        let y0 = mb_y * size;

        let interior = loopfilter::inner_limit(level, sharpness);

        if mb_x > 0 {
            let limit = loopfilter::mb_edge_limit(level, sharpness);
            if simple {
                loopfilter::filter_edge_vertical_simple(plane, x0, y0, size, limit);
            } else {
                loopfilter::filter_edge_vertical_normal(plane, x0, y0, size, limit, interior, hev, false);
            }
        }
        if mb_y > 0 {
            let limit = loopfilter::mb_edge_limit(level, sharpness);
            if simple {
                loopfilter::filter_edge_horizontal_simple(plane, x0, y0, size, limit);
            } else {
                loopfilter::filter_edge_horizontal_normal(plane, x0, y0, size, limit, interior, hev, false);
            }
        }

        if params.inner_edges {
            let limit = loopfilter::sub_edge_limit(level, sharpness);
            let step = 4;
            let mut x = x0 + step;
            while x < x0 + size {
                if simple {
                    loopfilter::filter_edge_vertical_simple(plane, x, y0, size, limit);
                } else {
                    loopfilter::filter_edge_vertical_normal(plane, x, y0, size, limit, interior, hev, true);
                }
                x += step;
            }
            let mut y = y0 + step;
            while y < y0 + size {
                if simple {
                    loopfilter::filter_edge_horizontal_simple(plane, x0, y, size, limit);
                } else {
                    loopfilter::filter_edge_horizontal_normal(plane, x0, y, size, limit, interior, hev, true);
                }
                y += step;
            }
        }
    }
}

fn emit_row(frame: &Frame, mb_y: usize, mb_height: usize, picture: &PictureDimensions, emitter: &mut dyn RowSink) {
    let is_last_row = mb_y + 1 == mb_height;
    let y = frame.y();
    let u = frame.u();
    let v = frame.v();

    let y_rows_full = 16;
    let uv_rows_full = 8;

    let y_rows = if is_last_row {
        picture.height as usize - mb_y * 16
    } else {
        y_rows_full
    };
    let uv_rows = if is_last_row {
        (picture.height as usize + 1) / 2 - mb_y * 8
    } else {
        uv_rows_full
    };

    let crop_w = picture.width as usize;
    let crop_uv_w = (picture.width as usize + 1) / 2;

    let y_row_refs: Vec<&[u8]> = (0..y_rows)
        .map(|r| &y.row(mb_y * 16 + r)[..crop_w.min(y.width)])
        .collect();
    let u_row_refs: Vec<&[u8]> = (0..uv_rows)
        .map(|r| &u.row(mb_y * 8 + r)[..crop_uv_w.min(u.width)])
        .collect();
    let v_row_refs: Vec<&[u8]> = (0..uv_rows)
        .map(|r| &v.row(mb_y * 8 + r)[..crop_uv_w.min(v.width)])
        .collect();

    emitter.on_row(&y_row_refs, &u_row_refs, &v_row_refs, mb_y);
}
