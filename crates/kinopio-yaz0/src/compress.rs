//! Yaz0 compression.
//!
//! Greedy longest-match search over hash chains of 3-byte prefixes. Every
//! match long enough to be emitted shares its first three bytes with the
//! current position, so walking the chain inside the window finds the same
//! longest match an exhaustive scan would.

use zerocopy::IntoBytes;

use crate::Yaz0Header;

/// Shortest match worth encoding as a back-reference.
pub const MIN_MATCH: usize = 3;

/// Longest match a single back-reference can encode (`0xFF + 0x12`).
pub const MAX_MATCH: usize = 0x111;

/// Largest back-reference distance (12 bits, stored minus one).
pub const MAX_DISTANCE: usize = 0x1000;

const HASH_BITS: u32 = 15;
const NONE: u32 = u32::MAX;

/// Look-back window for a compression level.
///
/// `None` selects the full window. `Some(0)` disables matching entirely,
/// levels above 9 behave like 9.
pub fn search_window(level: Option<u8>) -> usize {
    match level {
        None => MAX_DISTANCE,
        Some(0) => 0,
        Some(level) => {
            let level = level.min(9) as usize;
            0x10E0 * level / 9 - 0xE0
        }
    }
}

/// Compress `data` into a complete Yaz0 stream.
///
/// `level` bounds the search window (see [`search_window`]); higher levels
/// search further back and produce smaller output.
///
/// # Panics
///
/// Panics if `data` is larger than `u32::MAX` bytes, which the header cannot
/// describe.
pub fn compress(data: &[u8], level: Option<u8>) -> Vec<u8> {
    let size = u32::try_from(data.len()).expect("Yaz0 payload larger than 4 GiB");

    let mut output = Vec::with_capacity(Yaz0Header::SIZE + data.len() + data.len() / 8 + 1);
    output.extend_from_slice(Yaz0Header::new(size).as_bytes());

    let mut finder = MatchFinder::new(data, search_window(level));
    let mut pos = 0;

    while pos < data.len() {
        let control_index = output.len();
        output.push(0);
        let mut control = 0u8;

        for bit in (0..8).rev() {
            if pos >= data.len() {
                break;
            }

            match finder.longest_match(pos) {
                Some((distance, length)) => {
                    let d = distance - 1;
                    if length >= 0x12 {
                        output.push((d >> 8) as u8);
                        output.push(d as u8);
                        output.push((length - 0x12) as u8);
                    } else {
                        output.push((((length - 2) << 4) | (d >> 8)) as u8);
                        output.push(d as u8);
                    }
                    for p in pos..pos + length {
                        finder.insert(p);
                    }
                    pos += length;
                }
                None => {
                    control |= 1 << bit;
                    output.push(data[pos]);
                    finder.insert(pos);
                    pos += 1;
                }
            }
        }

        output[control_index] = control;
    }

    output
}

/// Hash-chain index of every position inserted so far.
struct MatchFinder<'a> {
    data: &'a [u8],
    window: usize,
    /// Most recent position for each prefix hash.
    head: Vec<u32>,
    /// Previous position with the same hash, indexed by position.
    prev: Vec<u32>,
}

impl<'a> MatchFinder<'a> {
    fn new(data: &'a [u8], window: usize) -> Self {
        let (head, prev) = if window == 0 {
            (Vec::new(), Vec::new())
        } else {
            (vec![NONE; 1 << HASH_BITS], vec![NONE; data.len()])
        };
        Self {
            data,
            window,
            head,
            prev,
        }
    }

    #[inline]
    fn hash(&self, pos: usize) -> usize {
        let d = self.data;
        let v = (d[pos] as u32) << 16 | (d[pos + 1] as u32) << 8 | d[pos + 2] as u32;
        (v.wrapping_mul(0x9E37_79B1) >> (32 - HASH_BITS)) as usize
    }

    fn insert(&mut self, pos: usize) {
        if self.window == 0 || pos + MIN_MATCH > self.data.len() {
            return;
        }
        let h = self.hash(pos);
        self.prev[pos] = self.head[h];
        self.head[h] = pos as u32;
    }

    /// Longest match for `pos` as `(distance, length)`, nearest on ties.
    fn longest_match(&self, pos: usize) -> Option<(usize, usize)> {
        if self.window == 0 || pos + MIN_MATCH > self.data.len() {
            return None;
        }

        let max_len = MAX_MATCH.min(self.data.len() - pos);
        let target = &self.data[pos..pos + max_len];
        let mut best_len = 0;
        let mut best_distance = 0;
        let mut candidate = self.head[self.hash(pos)];

        while candidate != NONE {
            let c = candidate as usize;
            let distance = pos - c;
            if distance > self.window {
                break;
            }

            if self.data[c + best_len] == target[best_len] {
                let len = self.data[c..]
                    .iter()
                    .zip(target)
                    .take_while(|(a, b)| a == b)
                    .count();
                if len > best_len {
                    best_len = len;
                    best_distance = distance;
                    if len == max_len {
                        break;
                    }
                }
            }

            candidate = self.prev[c];
        }

        (best_len >= MIN_MATCH).then_some((best_distance, best_len))
    }
}
