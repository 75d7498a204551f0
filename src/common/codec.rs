use std::cmp::Ordering;
use std::mem::swap;

use super::bit_utils::BitStream;
use super::error::{QRError, QRResult};
use super::metadata::{ECLevel, Version};

// Mode
//------------------------------------------------------------------------------

#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum Mode {
    Numeric = 0b0001,
    Alphanumeric = 0b0010,
    Byte = 0b0100,
}

impl PartialOrd for Mode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// Numeric is a subset of alphanumeric, which is a subset of byte
impl Ord for Mode {
    fn cmp(&self, other: &Self) -> Ordering {
        match (*self, *other) {
            (Self::Numeric, Self::Numeric) | (Self::Alphanumeric, Self::Alphanumeric) | (Self::Byte, Self::Byte) => {
                Ordering::Equal
            }
            (Self::Numeric, _) | (_, Self::Byte) => Ordering::Less,
            (_, Self::Numeric) | (Self::Byte, _) => Ordering::Greater,
        }
    }
}

impl Mode {
    #[inline]
    fn numeric_digit(char: u8) -> u16 {
        debug_assert!(Mode::Numeric.contains(char), "Invalid numeric data: {char}");
        (char - b'0') as u16
    }

    #[inline]
    fn alphanumeric_digit(char: u8) -> u16 {
        debug_assert!(Mode::Alphanumeric.contains(char), "Invalid alphanumeric data: {char}");
        match char {
            b'0'..=b'9' => (char - b'0') as u16,
            b'A'..=b'Z' => (char - b'A' + 10) as u16,
            b' ' => 36,
            b'$' => 37,
            b'%' => 38,
            b'*' => 39,
            b'+' => 40,
            b'-' => 41,
            b'.' => 42,
            b'/' => 43,
            b':' => 44,
            _ => unreachable!("Invalid alphanumeric {char}"),
        }
    }

    pub fn contains(&self, byte: u8) -> bool {
        match self {
            Self::Numeric => byte.is_ascii_digit(),
            Self::Alphanumeric => matches!(
                byte,
                b'0'..=b'9' | b'A'..=b'Z' | b' ' | b'$' | b'%' | b'*' | b'+' | b'-' | b'.' | b'/' | b':'
            ),
            Self::Byte => true,
        }
    }

    pub fn encode_chunk(&self, data: &[u8]) -> u16 {
        let len = data.len();
        match self {
            Self::Numeric => {
                debug_assert!(len <= 3, "Data is too long for numeric conversion: {len}");
                data.iter().fold(0_u16, |n, b| n * 10 + Self::numeric_digit(*b))
            }
            Self::Alphanumeric => {
                debug_assert!(len <= 2, "Data is too long for alphanumeric conversion: {len}");
                data.iter().fold(0_u16, |n, b| n * 45 + Self::alphanumeric_digit(*b))
            }
            Self::Byte => {
                debug_assert!(len == 1, "Data is too long for byte conversion: {len}");
                data[0] as u16
            }
        }
    }

    /// Encoded bit length of `len` characters, excluding the segment header.
    pub fn encoded_len(&self, len: usize) -> usize {
        match self {
            Self::Numeric => (len * 10 + 2) / 3,
            Self::Alphanumeric => (len * 11 + 1) / 2,
            Self::Byte => len * 8,
        }
    }

    // Per character cost in sixths of a bit, used by the segmentation search
    fn char_cost(&self) -> usize {
        match self {
            Self::Numeric => 20,
            Self::Alphanumeric => 33,
            Self::Byte => 48,
        }
    }
}


// Segment
//------------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Segment<'a> {
    pub mode: Mode,
    pub len_bits: usize, // Bit len of char count
    pub data: &'a [u8],  // Reference to raw data
}

impl<'a> Segment<'a> {
    pub fn new(mode: Mode, len_bits: usize, data: &'a [u8]) -> Self {
        Self { mode, len_bits, data }
    }

    pub fn bit_len(&self) -> usize {
        4 + self.len_bits + self.mode.encoded_len(self.data.len())
    }
}

// Writer
//------------------------------------------------------------------------------

mod writer {
    use super::{Mode, Segment, PADDING_CODEWORDS};
    use crate::common::bit_utils::BitStream;

    pub fn push_segment(seg: &Segment, out: &mut BitStream) {
        push_header(seg, out);
        match seg.mode {
            Mode::Numeric => push_chunks(seg.data, 3, Mode::Numeric, out),
            Mode::Alphanumeric => push_chunks(seg.data, 2, Mode::Alphanumeric, out),
            Mode::Byte => push_chunks(seg.data, 1, Mode::Byte, out),
        }
    }

    fn push_header(seg: &Segment, out: &mut BitStream) {
        out.push_bits(seg.mode as u8, 4);
        let char_cnt = seg.data.len();
        debug_assert!(
            char_cnt < (1 << seg.len_bits),
            "Char count exceeds bit length: Char count {char_cnt}, Char count bits {}",
            seg.len_bits
        );
        out.push_bits(char_cnt as u16, seg.len_bits);
    }

    fn push_chunks(data: &[u8], chunk_len: usize, mode: Mode, out: &mut BitStream) {
        for chunk in data.chunks(chunk_len) {
            let len = mode.encoded_len(chunk.len());
            out.push_bits(mode.encode_chunk(chunk), len);
        }
    }

    pub fn push_terminator(out: &mut BitStream) {
        let bit_len = out.len();
        let bit_capacity = out.capacity();
        if bit_len < bit_capacity {
            let term_len = std::cmp::min(4, bit_capacity - bit_len);
            out.push_bits(0u8, term_len);
        }
    }

    pub fn pad_remaining_capacity(out: &mut BitStream) {
        let offset = out.len() & 7;
        if offset > 0 {
            out.push_bits(0u8, 8 - offset);
        }

        let remain_byte_capacity = (out.capacity() - out.len()) >> 3;
        PADDING_CODEWORDS.iter().copied().cycle().take(remain_byte_capacity).for_each(|pc| {
            out.push_bits(pc, 8);
        });
    }

    #[cfg(test)]
    mod writer_tests {
        use super::{pad_remaining_capacity, push_segment, push_terminator};
        use crate::common::{
            bit_utils::BitStream,
            codec::{Mode, Segment},
        };

        #[test]
        fn test_push_numeric_segment() {
            let mut bs = BitStream::new(152);
            push_segment(&Segment::new(Mode::Numeric, 10, b"01234567"), &mut bs);
            assert_eq!(bs.len(), 4 + 10 + 27);
            assert_eq!(bs.data(), &[0b0001_0000, 0b0010_0000, 0b0000_1100, 0b0101_0110, 0b0110_0001, 0b1000_0000]);
        }

        #[test]
        fn test_push_alphanumeric_segment() {
            let mut bs = BitStream::new(152);
            push_segment(&Segment::new(Mode::Alphanumeric, 9, b"AC-42"), &mut bs);
            assert_eq!(bs.len(), 4 + 9 + 28);
            assert_eq!(bs.data(), &[0b0010_0000, 0b0010_1001, 0b1100_1110, 0b1110_0111, 0b0010_0001, 0b0000_0000]);
        }

        #[test]
        fn test_terminator_and_padding() {
            let mut bs = BitStream::new(40);
            bs.push_bits(0b101u8, 3);
            push_terminator(&mut bs);
            assert_eq!(bs.len(), 7);
            pad_remaining_capacity(&mut bs);
            assert_eq!(bs.len(), 40);
            assert_eq!(bs.data(), &[0b1010_0000, 0xEC, 0x11, 0xEC, 0x11]);
        }

        #[test]
        fn test_terminator_truncated_at_capacity() {
            let mut bs = BitStream::new(8);
            bs.push_bits(0b111111u8, 6);
            push_terminator(&mut bs);
            assert_eq!(bs.len(), 8);
        }
    }
}

// Encode
//------------------------------------------------------------------------------

/// Encodes data in the smallest version that fits at the given level.
pub fn encode(data: &[u8], ecl: ECLevel) -> QRResult<(BitStream, Version)> {
    let (ver, segments) = find_optimal_ver_and_segments(data, ecl)?;
    Ok((write_segments(&segments, ver, ecl), ver))
}

pub fn encode_with_version(data: &[u8], ecl: ECLevel, ver: Version) -> QRResult<BitStream> {
    if data.is_empty() {
        return Err(QRError::EmptyData);
    }
    let segments = compute_optimal_segments(data, ver);
    let size: usize = segments.iter().map(Segment::bit_len).sum();
    if size > ver.data_bit_capacity(ecl) {
        return Err(QRError::DataTooLong);
    }
    Ok(write_segments(&segments, ver, ecl))
}

fn write_segments(segments: &[Segment], ver: Version, ecl: ECLevel) -> BitStream {
    let mut bs = BitStream::new(ver.data_bit_capacity(ecl));
    for seg in segments {
        writer::push_segment(seg, &mut bs);
    }
    writer::push_terminator(&mut bs);
    writer::pad_remaining_capacity(&mut bs);
    bs
}

fn find_optimal_ver_and_segments(data: &[u8], ecl: ECLevel) -> QRResult<(Version, Vec<Segment>)> {
    if data.is_empty() {
        return Err(QRError::EmptyData);
    }

    let mut segments = vec![];
    let mut size = 0;
    for ver in Version::all() {
        // Char count widths only change at these versions
        if matches!(*ver, 1 | 10 | 27) {
            segments = compute_optimal_segments(data, ver);
            size = segments.iter().map(Segment::bit_len).sum();
        }
        if size <= ver.data_bit_capacity(ecl) {
            return Ok((ver, segments));
        }
    }
    Err(QRError::DataTooLong)
}

// Dynamic programming over characters to compute the cheapest mode segmentation
fn compute_optimal_segments(data: &[u8], ver: Version) -> Vec<Segment> {
    debug_assert!(!data.is_empty(), "Empty data");

    let header_cost = |m: Mode| (4 + ver.char_cnt_bits(m)) * 6;
    let len = data.len();
    let mut prev_cost = MODES.map(|m| header_cost(m));
    let mut cur_cost = [usize::MAX; 3];
    let mut min_path = vec![[usize::MAX; 3]; len];
    for (i, b) in data.iter().enumerate() {
        for (j, to_mode) in MODES.iter().enumerate() {
            if !to_mode.contains(*b) {
                continue;
            }
            for (k, from_mode) in MODES.iter().enumerate() {
                if prev_cost[k] == usize::MAX {
                    continue;
                }
                let mut cost = if to_mode != from_mode {
                    prev_cost[k].div_ceil(6) * 6 + header_cost(*to_mode)
                } else {
                    prev_cost[k]
                };
                cost += to_mode.char_cost();
                if cost < cur_cost[j] {
                    cur_cost[j] = cost;
                    min_path[i][j] = k;
                }
            }
        }
        swap(&mut prev_cost, &mut cur_cost);
        cur_cost.fill(usize::MAX);
    }

    let char_modes = trace_optimal_modes(&min_path, prev_cost);
    build_segments(ver, &char_modes, data)
}

// Backtrack min_path from the cheapest final mode
fn trace_optimal_modes(min_path: &[[usize; 3]], last_cost: [usize; 3]) -> Vec<Mode> {
    let mut mode_index = (0..3).min_by_key(|&i| last_cost[i]).unwrap_or(2);
    let mut modes = Vec::with_capacity(min_path.len());
    for step in min_path.iter().rev() {
        modes.push(MODES[mode_index]);
        mode_index = step[mode_index];
    }
    modes.reverse();
    modes
}

fn build_segments<'a>(ver: Version, char_modes: &[Mode], data: &'a [u8]) -> Vec<Segment<'a>> {
    let mut segs = vec![];
    let mut seg_start = 0;
    let mut seg_mode = char_modes[0];
    for (i, &m) in char_modes.iter().enumerate().skip(1) {
        if seg_mode != m {
            segs.push(Segment::new(seg_mode, ver.char_cnt_bits(seg_mode), &data[seg_start..i]));
            seg_mode = m;
            seg_start = i;
        }
    }
    segs.push(Segment::new(seg_mode, ver.char_cnt_bits(seg_mode), &data[seg_start..]));
    segs
}

#[cfg(test)]
mod encode_tests {
    use test_case::test_case;

    use super::{compute_optimal_segments, encode, encode_with_version, Mode, Segment};
    use crate::common::{ECLevel, QRError, Version};

    fn modes(data: &str) -> Vec<(Mode, String)> {
        compute_optimal_segments(data.as_bytes(), Version::new(1).unwrap())
            .into_iter()
            .map(|s| (s.mode, String::from_utf8_lossy(s.data).into_owned()))
            .collect()
    }

    #[test]
    fn test_single_mode_segments() {
        assert_eq!(modes("0123456789"), vec![(Mode::Numeric, "0123456789".to_string())]);
        assert_eq!(modes("HELLO WORLD"), vec![(Mode::Alphanumeric, "HELLO WORLD".to_string())]);
        assert_eq!(modes("hello"), vec![(Mode::Byte, "hello".to_string())]);
    }

    #[test]
    fn test_mixed_segments() {
        let segs = modes("abc0123456789012345");
        assert_eq!(segs.len(), 2);
        assert_eq!(segs[0], (Mode::Byte, "abc".to_string()));
        assert_eq!(segs[1], (Mode::Numeric, "0123456789012345".to_string()));
    }

    #[test]
    fn test_short_run_stays_in_byte_mode() {
        assert_eq!(modes("a1b"), vec![(Mode::Byte, "a1b".to_string())]);
    }

    #[test]
    fn test_segment_bit_len() {
        let seg = Segment::new(Mode::Byte, 8, b"hello");
        assert_eq!(seg.bit_len(), 4 + 8 + 40);
    }

    #[test]
    fn test_hello_world_version_1_q() {
        let (bs, ver) = encode(b"HELLO WORLD", ECLevel::Q).unwrap();
        assert_eq!(*ver, 1);
        assert_eq!(bs.len(), 13 * 8);
        assert_eq!(
            bs.data(),
            &[32, 91, 11, 120, 209, 114, 220, 77, 67, 64, 236, 17, 236]
        );
    }

    #[test_case("https://example.com", ECLevel::H, 3)]
    #[test_case("LPA:1$SMDP$TEST_CODE", ECLevel::H, 3)]
    #[test_case("1", ECLevel::L, 1)]
    fn test_smallest_version(data: &str, ecl: ECLevel, exp: u8) {
        let (_, ver) = encode(data.as_bytes(), ecl).unwrap();
        assert_eq!(*ver, exp);
    }

    #[test]
    fn test_capacity_overflow() {
        let data = "a".repeat(1274);
        assert_eq!(encode(data.as_bytes(), ECLevel::H).unwrap_err(), QRError::DataTooLong);
        let data = "a".repeat(1273);
        assert_eq!(*encode(data.as_bytes(), ECLevel::H).unwrap().1, 40);
    }

    #[test]
    fn test_empty_data() {
        assert_eq!(encode(b"", ECLevel::M).unwrap_err(), QRError::EmptyData);
    }

    #[test]
    fn test_encode_with_version_overflow() {
        let res = encode_with_version(b"hello world, too long", ECLevel::H, Version::new(1).unwrap());
        assert_eq!(res.unwrap_err(), QRError::DataTooLong);
    }
}

// Global constants
//------------------------------------------------------------------------------

pub static PADDING_CODEWORDS: [u8; 2] = [0b1110_1100, 0b0001_0001];

pub static MODES: [Mode; 3] = [Mode::Numeric, Mode::Alphanumeric, Mode::Byte];
