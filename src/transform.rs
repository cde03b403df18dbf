//! RFC 6386 §14: the fixed 4x4 inverse DCT and inverse Walsh-Hadamard
//! transforms, written as a two-stage butterfly using VP8's own small
//! fixed-point multipliers — the 4-point transform is simple enough that
//! RFC 6386 hardcodes the two constants directly rather than a `cospi`
//! table.

const COS_PI8_SQRT2_MINUS1: i32 = 20091;
const SIN_PI8_SQRT2: i32 = 35468;

/// In-place inverse 4x4 DCT (RFC 6386 §14.3), operating on a block in
/// natural (row-major) order. `coeffs[0]` is expected to already hold the
/// dequantized DC value (possibly substituted from the Y2 transform).
pub fn idct4x4(coeffs: &[i32; 16]) -> [i32; 16] {
    let mut stage1 = [0i32; 16];

    for i in 0..4 {
        let ip0 = coeffs[i];
        let ip4 = coeffs[4 + i];
        let ip8 = coeffs[8 + i];
        let ip12 = coeffs[12 + i];

        let a1 = ip0 + ip8;
        let b1 = ip0 - ip8;

        let temp1 = (ip4 * SIN_PI8_SQRT2) >> 16;
        let temp2 = ip12 + ((ip12 * COS_PI8_SQRT2_MINUS1) >> 16);
        let c1 = temp1 - temp2;

        let temp1 = ip4 + ((ip4 * COS_PI8_SQRT2_MINUS1) >> 16);
        let temp2 = (ip12 * SIN_PI8_SQRT2) >> 16;
        let d1 = temp1 + temp2;

        stage1[i] = a1 + d1;
        stage1[4 + i] = b1 + c1;
        stage1[8 + i] = b1 - c1;
        stage1[12 + i] = a1 - d1;
    }

    let mut out = [0i32; 16];
    for i in 0..4 {
        let row = i * 4;
        let ip0 = stage1[row];
        let ip1 = stage1[row + 1];
        let ip2 = stage1[row + 2];
        let ip3 = stage1[row + 3];

        let a1 = ip0 + ip2;
        let b1 = ip0 - ip2;

        let temp1 = (ip1 * SIN_PI8_SQRT2) >> 16;
        let temp2 = ip3 + ((ip3 * COS_PI8_SQRT2_MINUS1) >> 16);
        let c1 = temp1 - temp2;

        let temp1 = ip1 + ((ip1 * COS_PI8_SQRT2_MINUS1) >> 16);
        let temp2 = (ip3 * SIN_PI8_SQRT2) >> 16;
        let d1 = temp1 + temp2;

        out[row] = (a1 + d1 + 4) >> 3;
        out[row + 1] = (b1 + c1 + 4) >> 3;
        out[row + 2] = (b1 - c1 + 4) >> 3;
        out[row + 3] = (a1 - d1 + 4) >> 3;
    }
    out
}

/// In-place inverse Walsh-Hadamard transform (RFC 6386 §14.3), used to
/// recover the 16 luma subblocks' DC values from the Y2 block.
pub fn iwht4x4(coeffs: &[i32; 16]) -> [i32; 16] {
    let mut stage1 = [0i32; 16];

    for i in 0..4 {
        let ip0 = coeffs[i];
        let ip4 = coeffs[4 + i];
        let ip8 = coeffs[8 + i];
        let ip12 = coeffs[12 + i];

        let a1 = ip0 + ip12;
        let b1 = ip4 + ip8;
        let c1 = ip4 - ip8;
        let d1 = ip0 - ip12;

        stage1[i] = a1 + b1;
        stage1[4 + i] = c1 + d1;
        stage1[8 + i] = a1 - b1;
        stage1[12 + i] = d1 - c1;
    }

    let mut out = [0i32; 16];
    for i in 0..4 {
        let row = i * 4;
        let ip0 = stage1[row];
        let ip1 = stage1[row + 1];
        let ip2 = stage1[row + 2];
        let ip3 = stage1[row + 3];

        let a1 = ip0 + ip3;
        let b1 = ip1 + ip2;
        let c1 = ip1 - ip2;
        let d1 = ip0 - ip3;

        let a2 = a1 + b1;
        let b2 = c1 + d1;
        let c2 = a1 - b1;
        let d2 = d1 - c1;

        out[row] = (a2 + 3) >> 3;
        out[row + 1] = (b2 + 3) >> 3;
        out[row + 2] = (c2 + 3) >> 3;
        out[row + 3] = (d2 + 3) >> 3;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dc_only_idct_is_uniform() {
        let mut coeffs = [0i32; 16];
        coeffs[0] = 80;
        let out = idct4x4(&coeffs);
        let expected = (80 + 4) >> 3;
        assert!(out.iter().all(|&v| v == expected));
    }

    #[test]
    fn iwht_of_zero_is_zero() {
        let coeffs = [0i32; 16];
        let out = iwht4x4(&coeffs);
        assert_eq!(out, [0i32; 16]);
    }

    #[test]
    fn iwht_dc_only_spreads_evenly() {
        let mut coeffs = [0i32; 16];
        coeffs[0] = 64;
        let out = iwht4x4(&coeffs);
        let expected = (64 + 3) >> 3;
        assert!(out.iter().all(|&v| v == expected));
    }
}
