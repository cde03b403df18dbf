//! RFC 6386 §9.6/§14.1 dequantization factor derivation: per-segment DC/AC
//! quantizer factors, including the Y2 AC floor and the tighter UV DC clamp.

use crate::header::{DequantIndices, SegmentHeader};
use crate::tables::{AC_QUANT, DC_QUANT};
use crate::util::clamp;

/// Per-segment dequantization factors: `[0]` is the DC entry, `[1]` is AC.
#[derive(Clone, Copy, Debug, Default)]
pub struct DequantFactors {
    pub y1: [i32; 2],
    pub y2: [i32; 2],
    pub uv: [i32; 2],
    /// Clamped UV DC quantizer index, kept around only to drive the
    /// dithering heuristic below (it has no further RFC 6386 meaning).
    pub uv_quant_index: i32,
    /// Per-segment dither amplitude applied to flat chroma blocks. This is
    /// a local smoothing heuristic, not an RFC 6386 syntax element; the
    /// exact amplitude curve is an implementation choice (see DESIGN.md).
    pub dither: u8,
}

/// Approximate dither-amplitude curve, coarser than libwebp's but following
/// the same idea: flat (all-quantized-to-zero) chroma blocks get a small
/// amount of noise proportional to how coarse the UV quantizer is, so that
/// gradients don't band.
const DITHER_AMP_TABLE: [u8; 16] = [
    0, 0, 0, 0, 0, 2, 4, 4, 6, 6, 8, 8, 10, 10, 12, 12,
];

fn dither_amplitude(uv_ac_quant: i32) -> u8 {
    let bucket = clamp(uv_ac_quant / 8, 0, 15) as usize;
    DITHER_AMP_TABLE[bucket]
}

fn clamp_index(idx: i32) -> usize {
    clamp(idx, 0, 127) as usize
}

fn clamp_uvdc_index(idx: i32) -> usize {
    // RFC 6386 clamps the UV DC index tighter than the others (its table
    // otherwise produces values the rest of the format never expects).
    clamp(idx, 0, 117) as usize
}

impl DequantFactors {
    fn derive(base_q: i32, d: &DequantIndices) -> Self {
        let y1dc = DC_QUANT[clamp_index(base_q + d.y1dc_delta)];
        let y1ac = AC_QUANT[clamp_index(base_q)];

        let y2dc = DC_QUANT[clamp_index(base_q + d.y2dc_delta)] * 2;
        let y2ac_base = AC_QUANT[clamp_index(base_q + d.y2ac_delta)];
        let y2ac = ((y2ac_base * 155) / 100).max(8);

        let uvdc_idx = clamp_uvdc_index(base_q + d.uvdc_delta);
        let uvdc = DC_QUANT[uvdc_idx];
        let uvac_idx = clamp_index(base_q + d.uvac_delta);
        let uvac = AC_QUANT[uvac_idx];

        DequantFactors {
            y1: [y1dc, y1ac],
            y2: [y2dc, y2ac],
            uv: [uvdc, uvac],
            uv_quant_index: uvdc_idx as i32,
            dither: dither_amplitude(uvac_idx as i32),
        }
    }

    /// Build the four per-segment factor sets. When segmentation is
    /// disabled, segments 1..3 are never populated by the bitstream;
    /// callers must fall back to segment 0 at lookup time — `for_segment`
    /// below does exactly that instead of duplicating segment 0 into the
    /// other three slots here, so it stays obvious at the call site which
    /// segments actually came from the header.
    pub fn build_all(segments: &SegmentHeader, indices: &DequantIndices) -> [DequantFactors; 4] {
        let mut out = [DequantFactors::default(); 4];
        for (seg_id, slot) in out.iter_mut().enumerate() {
            let base_q = if segments.use_segments {
                segments.quantizer_for_segment(seg_id, indices.base_q_index)
            } else {
                indices.base_q_index
            };
            *slot = DequantFactors::derive(base_q, indices);
        }
        out
    }
}

/// Look up the dequant factors for `segment_id`, falling back to segment 0
/// for any id that the header never actually populated.
pub fn for_segment(factors: &[DequantFactors; 4], segment_id: u8, use_segments: bool) -> DequantFactors {
    if use_segments && (segment_id as usize) < 4 {
        factors[segment_id as usize]
    } else {
        factors[0]
    }
}
