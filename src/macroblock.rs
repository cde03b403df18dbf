//! Per-macroblock mode/segment parsing (RFC 6386 §10/§11) and the
//! left/above nonzero-coefficient context the residual decoder consults
//! for context selection.

use crate::bool_reader::BoolDecoder;
use crate::header::{FrameHeader, SegmentHeader};
use crate::probability::read_tree;
use crate::tables::{
    B_PRED, KF_BMODE_PROBS, KF_UVMODE_PROB, KF_YMODE_PROB, KF_YMODE_TREE, SEGMENT_ID_TREE,
    UV_MODE_TREE,
};

/// Decoded mode/segment/skip state for one macroblock, plus its residual
/// coefficients once `residual::decode_macroblock` has run.
///
/// `coeffs` layout: blocks `0..16` are the 16 luma 4x4 subblocks in raster
/// order, `16..20` are U, `20..24` are V, and `24` is the luma Y2 (WHT)
/// block, present only when `is_i4x4` is false.
#[derive(Clone)]
pub struct MacroblockData {
    pub segment_id: u8,
    pub skip: bool,
    pub is_i4x4: bool,
    /// Whole-block luma mode (`DC_PRED..TM_PRED`), or `B_PRED` when
    /// `is_i4x4` is set and `bmodes` carries the real per-subblock modes.
    pub ymode: u8,
    pub bmodes: [u8; 16],
    pub uv_mode: u8,
    pub coeffs: [[i32; 16]; 25],
    pub dither: u8,
}

impl Default for MacroblockData {
    fn default() -> Self {
        MacroblockData {
            segment_id: 0,
            skip: false,
            is_i4x4: false,
            ymode: 0,
            bmodes: [0; 16],
            uv_mode: 0,
            coeffs: [[0; 16]; 25],
            dither: 0,
        }
    }
}

/// Nonzero-coefficient context carried along a macroblock row (the "left"
/// half) and across macroblock columns (the "above" half), consulted by
/// `residual::decode_macroblock` per RFC 6386 §13.3.
#[derive(Clone, Copy, Default)]
pub struct NzContext {
    pub y: [bool; 4],
    pub u: [bool; 2],
    pub v: [bool; 2],
    pub y2: bool,
}

/// Parse one macroblock's segment id, skip flag, and intra modes from the
/// control partition (RFC 6386 §10/§11, keyframe variant only: intra-only
/// decoders never see the inter-frame `mb_skip_coeff`/mode alternatives).
pub fn parse_modes(
    bc: &mut BoolDecoder,
    header: &FrameHeader,
    above_mode: &[u8; 4],
    left_mode: &[u8; 4],
) -> (MacroblockData, [u8; 4], [u8; 4]) {
    let mut mb = MacroblockData::default();

    mb.segment_id = if header.segment.use_segments && header.segment.update_map {
        read_tree(bc, &SEGMENT_ID_TREE, &header.segment.segment_tree_probs)
    } else {
        0
    };

    mb.skip = if header.use_skip_proba {
        bc.get_bit(header.skip_proba) != 0
    } else {
        false
    };

    mb.ymode = read_tree(bc, &KF_YMODE_TREE, &KF_YMODE_PROB);

    let mut above_out = *above_mode;
    let mut left_out = *left_mode;

    if mb.ymode == B_PRED {
        mb.is_i4x4 = true;
        for row in 0..4 {
            for col in 0..4 {
                let idx = row * 4 + col;
                let a = if row == 0 { above_mode[col] } else { mb.bmodes[idx - 4] };
                let l = if col == 0 { left_mode[row] } else { mb.bmodes[idx - 1] };
                let mode = read_tree(
                    bc,
                    &crate::tables::BMODE_TREE,
                    &KF_BMODE_PROBS[a as usize][l as usize],
                );
                mb.bmodes[idx] = mode;
            }
        }
        above_out = [
            mb.bmodes[12],
            mb.bmodes[13],
            mb.bmodes[14],
            mb.bmodes[15],
        ];
        left_out = [mb.bmodes[3], mb.bmodes[7], mb.bmodes[11], mb.bmodes[15]];
    } else {
        // Whole-block modes propagate as the "DC-equivalent" neighbor mode
        // for B_PRED context purposes (RFC 6386 §11.4 note): any non-B_PRED
        // whole-block mode behaves like B_DC_PRED to its B_PRED neighbors.
        above_out = [0; 4];
        left_out = [0; 4];
    }

    mb.uv_mode = read_tree(bc, &UV_MODE_TREE, &KF_UVMODE_PROB);

    (mb, above_out, left_out)
}

/// Effective quantizer-index segment used for dequantization lookups when
/// the header disables segmentation entirely.
pub fn effective_segment(segment: &SegmentHeader, segment_id: u8) -> u8 {
    if segment.use_segments {
        segment_id
    } else {
        0
    }
}
