//! RFC 6386 §13: per-macroblock residual coefficient decoding. Grounded on
//! the same range-coder primitives as `bool_reader.rs`/`Melirius-lepton_jpeg_rust`'s
//! `VPXBoolReader`, but walking VP8's fixed coefficient token tree (Lepton's
//! equivalent is bit-adaptive and does not apply here).

use crate::bool_reader::BoolDecoder;
use crate::macroblock::{MacroblockData, NzContext};
use crate::tables::{
    CoeffProbs, CAT1_PROB, CAT2_PROB, CAT3_PROB, CAT4_PROB, CAT5_PROB, CAT6_PROB, CAT_BASE,
    COEFF_BANDS, ZIGZAG,
};

fn read_category(bc: &mut BoolDecoder, probs: &[u8], base: i32) -> i32 {
    let mut extra = 0i32;
    for &p in probs {
        extra = (extra << 1) | bc.get_bit(p) as i32;
    }
    base + extra
}

/// Decode one 4x4 block's coefficients (in natural/raster order, already
/// un-zigzagged) starting at `first_coeff` (1 for luma blocks that have a
/// separate Y2 DC block, 0 otherwise). Returns whether any coefficient in
/// the block was nonzero, which becomes the neighbor context for the next
/// block's first token (RFC 6386 §13.3).
fn decode_block(
    bc: &mut BoolDecoder,
    coeff_probs: &CoeffProbs,
    block_type: usize,
    first_coeff: usize,
    ctx0: usize,
    out: &mut [i32; 16],
) -> bool {
    *out = [0; 16];
    let mut ctx = ctx0;
    let mut c = first_coeff;
    let mut check_eob = true;
    let mut has_nonzero = false;

    while c < 16 {
        let band = COEFF_BANDS[c];
        let p = &coeff_probs[block_type][band][ctx];

        if check_eob && bc.get_bit(p[0]) == 0 {
            break;
        }

        if bc.get_bit(p[1]) == 0 {
            ctx = 0;
            check_eob = false;
            c += 1;
            continue;
        }

        let magnitude = if bc.get_bit(p[2]) == 0 {
            1
        } else if bc.get_bit(p[3]) == 0 {
            if bc.get_bit(p[4]) == 0 {
                2
            } else if bc.get_bit(p[5]) == 0 {
                3
            } else {
                4
            }
        } else if bc.get_bit(p[6]) == 0 {
            if bc.get_bit(p[7]) == 0 {
                read_category(bc, &CAT1_PROB, CAT_BASE[0])
            } else {
                read_category(bc, &CAT2_PROB, CAT_BASE[1])
            }
        } else if bc.get_bit(p[8]) == 0 {
            if bc.get_bit(p[9]) == 0 {
                read_category(bc, &CAT3_PROB, CAT_BASE[2])
            } else {
                read_category(bc, &CAT4_PROB, CAT_BASE[3])
            }
        } else if bc.get_bit(p[10]) == 0 {
            read_category(bc, &CAT5_PROB, CAT_BASE[4])
        } else {
            read_category(bc, &CAT6_PROB, CAT_BASE[5])
        };

        let value = if bc.read_bool() { -magnitude } else { magnitude };
        out[ZIGZAG[c]] = value;

        ctx = if magnitude == 1 { 1 } else { 2 };
        check_eob = true;
        has_nonzero = true;
        c += 1;
    }

    has_nonzero
}

/// Decode every coefficient block of one macroblock (RFC 6386 §13.1), using
/// and updating the row's above/left nonzero context in place.
pub fn decode_macroblock(
    bc: &mut BoolDecoder,
    coeff_probs: &CoeffProbs,
    mb: &mut MacroblockData,
    above: &mut NzContext,
    left: &mut NzContext,
) {
    let has_y2 = !mb.is_i4x4;

    if mb.skip {
        above.y = [false; 4];
        left.y = [false; 4];
        above.u = [false; 2];
        left.u = [false; 2];
        above.v = [false; 2];
        left.v = [false; 2];
        // A skipped i4x4 macroblock has no Y2 block at all: its above/left
        // Y2 context must be left untouched for the next macroblock that
        // does have one (RFC 6386 §13.1).
        if has_y2 {
            above.y2 = false;
            left.y2 = false;
        }
        return;
    }

    if has_y2 {
        let ctx = above.y2 as usize + left.y2 as usize;
        let nz = decode_block(bc, coeff_probs, 1, 0, ctx, &mut mb.coeffs[24]);
        above.y2 = nz;
        left.y2 = nz;
    }

    let block_type = if has_y2 { 0 } else { 3 };
    let first_coeff = if has_y2 { 1 } else { 0 };

    for row in 0..4 {
        for col in 0..4 {
            let idx = row * 4 + col;
            let ctx = above.y[col] as usize + left.y[row] as usize;
            let nz = decode_block(bc, coeff_probs, block_type, first_coeff, ctx, &mut mb.coeffs[idx]);
            above.y[col] = nz;
            left.y[row] = nz;
        }
    }

    for (plane, (above_uv, left_uv)) in [(&mut above.u, &mut left.u), (&mut above.v, &mut left.v)]
        .into_iter()
        .enumerate()
    {
        for row in 0..2 {
            for col in 0..2 {
                let idx = 16 + plane * 4 + row * 2 + col;
                let ctx = above_uv[col] as usize + left_uv[row] as usize;
                let nz = decode_block(bc, coeff_probs, 2, 0, ctx, &mut mb.coeffs[idx]);
                above_uv[col] = nz;
                left_uv[row] = nz;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tables::DEFAULT_COEFF_PROBS;

    #[test]
    fn all_zero_partition_decodes_to_eob_immediately() {
        // A single 0xFF byte makes get_bit(p) == 0 for any p < 255 right
        // away when range renormalizes, so every block should decode as a
        // 16-entry EOB (all coefficients zero) without panicking.
        let data = [0x00u8; 8];
        let mut bc = BoolDecoder::new(&data);
        let mut out = [1i32; 16];
        let nz = decode_block(&mut bc, &DEFAULT_COEFF_PROBS, 3, 0, 0, &mut out);
        assert!(!nz);
        assert_eq!(out, [0i32; 16]);
    }

    #[test]
    fn skip_clears_y_and_uv_context_but_not_orphaned_y2() {
        let data = [0u8; 4];
        let mut bc = BoolDecoder::new(&data);
        let mut mb = MacroblockData {
            is_i4x4: true,
            skip: true,
            ..MacroblockData::default()
        };
        let mut above = NzContext {
            y2: true,
            ..NzContext::default()
        };
        let mut left = NzContext {
            y2: true,
            ..NzContext::default()
        };
        decode_macroblock(&mut bc, &DEFAULT_COEFF_PROBS, &mut mb, &mut above, &mut left);
        assert!(above.y2, "i4x4 skip must not touch Y2 context");
        assert!(left.y.iter().all(|&b| !b));
    }
}
