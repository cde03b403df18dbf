//! VP8 frame/segment/filter/quantization/probability header parsing
//! (RFC 6386 §9/§10/§11), reading one explicitly-named field at a time
//! rather than through a packed bitfield struct.

use byteorder::{ByteOrder, LittleEndian};

use crate::bool_reader::BoolDecoder;
use crate::error::DecodeError;
use crate::tables::{CoeffProbs, COEFF_UPDATE_PROBS, DEFAULT_COEFF_PROBS};

/// The container-supplied frame tag: the 3/10-byte uncompressed tag is the
/// *container's* job to strip and interpret, so this crate only receives
/// its decoded fields.
#[derive(Clone, Copy, Debug)]
pub struct FrameTag {
    pub key_frame: bool,
    pub show_frame: bool,
    pub version: u8,
    pub partition_length: u32,
}

/// Picture dimensions and scale hints, also supplied by the container.
#[derive(Clone, Copy, Debug)]
pub struct PictureDimensions {
    pub width: u16,
    pub height: u16,
    pub x_scale: u8,
    pub y_scale: u8,
}

impl PictureDimensions {
    pub fn mb_width(&self) -> usize {
        (self.width as usize + 15) / 16
    }
    pub fn mb_height(&self) -> usize {
        (self.height as usize + 15) / 16
    }
}

/// Reconstruction filter / loop filter variant implied by the frame-tag
/// version byte. Since this crate only performs intra reconstruction (no
/// motion compensation, so no interpolation filter is ever invoked),
/// profiles 0-3 differ only in loop-filter selection here: normal for
/// profile 0, simple for profile 1, none for profiles 2-3.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoopFilterKind {
    Normal,
    Simple,
    None,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Profile(pub u8);

impl Profile {
    pub fn loop_filter_kind(self) -> Result<LoopFilterKind, DecodeError> {
        match self.0 {
            0 => Ok(LoopFilterKind::Normal),
            1 => Ok(LoopFilterKind::Simple),
            2 | 3 => Ok(LoopFilterKind::None),
            other => Err(DecodeError::UnsupportedProfile(other)),
        }
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SegmentHeader {
    pub use_segments: bool,
    pub update_map: bool,
    /// `false` = absolute (segment value replaces the frame base quantizer
    /// / filter strength), `true` = delta (segment value is added to it).
    /// Spec §3 calls this `delta_mode` with `0 = absolute, 1 = delta`.
    pub delta_mode: bool,
    pub quantizer: [i32; 4],
    pub filter_strength: [i32; 4],
    pub segment_tree_probs: [u8; 3],
}

impl SegmentHeader {
    pub fn quantizer_for_segment(&self, segment_id: usize, base_q_index: i32) -> i32 {
        if !self.use_segments {
            return base_q_index;
        }
        if self.delta_mode {
            base_q_index + self.quantizer[segment_id]
        } else {
            self.quantizer[segment_id]
        }
    }

    pub fn filter_level_for_segment(&self, segment_id: usize, frame_level: i32) -> i32 {
        if !self.use_segments {
            return frame_level;
        }
        if self.delta_mode {
            frame_level + self.filter_strength[segment_id]
        } else {
            self.filter_strength[segment_id]
        }
    }

    fn parse(bc: &mut BoolDecoder) -> Self {
        let mut h = SegmentHeader::default();
        h.use_segments = bc.read_flag();
        if !h.use_segments {
            return h;
        }

        h.update_map = bc.read_flag();
        let update_feature_data = bc.read_flag();

        if update_feature_data {
            h.delta_mode = bc.read_flag();
            for q in h.quantizer.iter_mut() {
                *q = if bc.read_flag() {
                    bc.read_signed_literal(7)
                } else {
                    0
                };
            }
            for f in h.filter_strength.iter_mut() {
                *f = if bc.read_flag() {
                    bc.read_signed_literal(6)
                } else {
                    0
                };
            }
        }

        if h.update_map {
            for p in h.segment_tree_probs.iter_mut() {
                *p = if bc.read_flag() {
                    bc.read_literal(8) as u8
                } else {
                    255
                };
            }
        }

        h
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct FilterHeader {
    pub simple: bool,
    pub level: u8,
    pub sharpness: u8,
    pub use_lf_delta: bool,
    pub ref_lf_delta: [i32; 4],
    pub mode_lf_delta: [i32; 4],
}

impl FilterHeader {
    fn parse(bc: &mut BoolDecoder) -> Self {
        let mut h = FilterHeader::default();
        h.simple = bc.read_flag();
        h.level = bc.read_literal(6) as u8;
        h.sharpness = bc.read_literal(3) as u8;
        h.use_lf_delta = bc.read_flag();

        if h.use_lf_delta {
            let update = bc.read_flag();
            if update {
                for d in h.ref_lf_delta.iter_mut() {
                    if bc.read_flag() {
                        *d = bc.read_signed_literal(6);
                    }
                }
                for d in h.mode_lf_delta.iter_mut() {
                    if bc.read_flag() {
                        *d = bc.read_signed_literal(6);
                    }
                }
            }
        }

        h
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct DequantIndices {
    pub base_q_index: i32,
    pub y1dc_delta: i32,
    pub y2dc_delta: i32,
    pub y2ac_delta: i32,
    pub uvdc_delta: i32,
    pub uvac_delta: i32,
}

impl DequantIndices {
    fn parse(bc: &mut BoolDecoder) -> Self {
        let base_q_index = bc.read_literal(7) as i32;
        let delta = |bc: &mut BoolDecoder| {
            if bc.read_flag() {
                bc.read_signed_literal(4)
            } else {
                0
            }
        };
        DequantIndices {
            base_q_index,
            y1dc_delta: delta(bc),
            y2dc_delta: delta(bc),
            y2ac_delta: delta(bc),
            uvdc_delta: delta(bc),
            uvac_delta: delta(bc),
        }
    }
}

/// Byte ranges of each residual partition within the blob passed to
/// `decode()`, already clamped to the available data.
#[derive(Clone, Debug)]
pub struct PartitionTable {
    pub spans: Vec<(usize, usize)>,
}

impl PartitionTable {
    pub fn num_partitions(&self) -> usize {
        self.spans.len()
    }
}

#[derive(Clone)]
pub struct FrameHeader {
    pub color_space: u8,
    pub clamp_type: u8,
    pub segment: SegmentHeader,
    pub filter: FilterHeader,
    pub dequant: DequantIndices,
    pub coeff_probs: CoeffProbs,
    pub use_skip_proba: bool,
    pub skip_proba: u8,
}

/// Parse the control partition and locate the residual partitions.
/// `data` begins at the control partition (the 3/10-byte frame tag has
/// already been stripped by the container). The returned
/// `BoolDecoder` is left positioned right after the header fields, at the
/// start of the per-macroblock mode data that immediately follows in the
/// same control partition — the caller (the row pipeline) continues
/// reading from it for every macroblock in the frame.
pub fn parse<'a>(
    data: &'a [u8],
    tag: FrameTag,
) -> Result<(FrameHeader, BoolDecoder<'a>, PartitionTable), DecodeError> {
    let control_len = tag.partition_length as usize;
    if data.len() < control_len {
        return Err(DecodeError::TruncatedBitstream {
            needed: control_len,
            available: data.len(),
        });
    }
    let control = &data[..control_len];
    let mut bc = BoolDecoder::new(control);

    let color_space = bc.read_literal(1) as u8;
    let clamp_type = bc.read_literal(1) as u8;

    let segment = SegmentHeader::parse(&mut bc);
    let filter = FilterHeader::parse(&mut bc);

    let log2_nbr_partitions = bc.read_literal(2);
    let num_partitions = 1usize << log2_nbr_partitions;

    let dequant = DequantIndices::parse(&mut bc);

    // `refresh_entropy_probs`: irrelevant for a single intra frame (there is
    // no following frame to inherit updated probabilities), consumed and
    // discarded.
    let _refresh_entropy_probs = bc.read_flag();

    let mut coeff_probs = DEFAULT_COEFF_PROBS;
    for t in 0..4 {
        for b in 0..8 {
            for c in 0..3 {
                for p in 0..11 {
                    if bc.get_bit(COEFF_UPDATE_PROBS[t][b][c][p]) != 0 {
                        coeff_probs[t][b][c][p] = bc.read_literal(8) as u8;
                    }
                }
            }
        }
    }

    let use_skip_proba = bc.read_flag();
    let skip_proba = if use_skip_proba {
        bc.read_literal(8) as u8
    } else {
        0
    };

    let header = FrameHeader {
        color_space,
        clamp_type,
        segment,
        filter,
        dequant,
        coeff_probs,
        use_skip_proba,
        skip_proba,
    };

    let partitions = parse_partition_table(data, control_len, num_partitions)?;

    Ok((header, bc, partitions))
}

/// Spec §4.2 Failure clause: "if the declared number of partitions plus
/// their length prefixes exceed the partition-blob size, the last
/// partition absorbs the remainder; smaller than declared is tolerated
/// silently."
fn parse_partition_table(
    data: &[u8],
    control_len: usize,
    num_partitions: usize,
) -> Result<PartitionTable, DecodeError> {
    let size_table_len = 3 * (num_partitions.saturating_sub(1));
    let size_table_end = (control_len + size_table_len).min(data.len());
    let size_table = &data[control_len.min(data.len())..size_table_end];

    let mut spans = Vec::with_capacity(num_partitions);
    let mut cursor = size_table_end;

    for i in 0..num_partitions {
        let is_last = i + 1 == num_partitions;
        if is_last {
            spans.push((cursor, data.len().max(cursor)));
            break;
        }

        let off = i * 3;
        let declared_len = if off + 3 <= size_table.len() {
            LittleEndian::read_u24(&size_table[off..off + 3]) as usize
        } else {
            0
        };

        let start = cursor.min(data.len());
        let end = (start + declared_len).min(data.len());
        spans.push((start, end));
        cursor = end;
    }

    Ok(PartitionTable { spans })
}
