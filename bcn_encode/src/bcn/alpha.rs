//! Explicit and interpolated single channel blocks.
use crate::block::{Block, A, TEXELS_PER_BLOCK};

/// Pack the alpha of each texel to 4 bits with texel 0 in the lowest bits.
pub fn explicit_alpha(block: &Block) -> u64 {
    let mut bits = 0u64;
    for (i, texel) in block.texels.iter().enumerate() {
        let alpha = (texel[A] * 15.0).round() as u64;
        bits |= alpha << (4 * i);
    }
    bits
}

/// Two 8-bit keys and a 3-bit index into their ramp for each texel.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct AlphaBlock {
    pub key0: u8,
    pub key1: u8,
    /// 48 bits of indices with texel 0 in the lowest bits.
    pub indices: u64,
}

impl AlphaBlock {
    pub fn to_bytes(&self) -> [u8; 8] {
        let mut bytes = [0u8; 8];
        bytes[0] = self.key0;
        bytes[1] = self.key1;
        bytes[2..].copy_from_slice(&self.indices.to_le_bytes()[..6]);
        bytes
    }

    pub fn from_bytes(bytes: [u8; 8]) -> Self {
        Self {
            key0: bytes[0],
            key1: bytes[1],
            indices: u64::from_le_bytes(bytes) >> 16,
        }
    }

    pub fn index(&self, texel: usize) -> usize {
        ((self.indices >> (3 * texel)) & 0x7) as usize
    }
}

/// The eight values selected by each index for a pair of keys.
pub fn ramp(key0: u8, key1: u8) -> [u8; 8] {
    let a0 = key0 as u32;
    let a1 = key1 as u32;
    let mut values = [0u32; 8];
    values[0] = a0;
    values[1] = a1;
    if a0 > a1 {
        for i in 1..7 {
            values[i + 1] = ((7 - i as u32) * a0 + i as u32 * a1 + 1) / 7;
        }
    } else {
        for i in 1..5 {
            values[i + 1] = ((5 - i as u32) * a0 + i as u32 * a1 + 1) / 5;
        }
        values[6] = 0;
        values[7] = 255;
    }
    values.map(|v| v as u8)
}

/// Encode the values of texels in `mask` by searching for keys within
/// `radius` steps of the observed extremes.
pub fn encode_interpolated(values: &[u8; TEXELS_PER_BLOCK], mask: u16, radius: u8) -> AlphaBlock {
    let mut masked = values
        .iter()
        .enumerate()
        .filter(|(i, _)| mask & (1 << i) != 0)
        .map(|(_, v)| *v);

    let Some(first) = masked.next() else {
        return AlphaBlock {
            key0: 0,
            key1: 0,
            indices: 0,
        };
    };
    let (min, max) = masked.fold((first, first), |(min, max), v| (min.min(v), max.max(v)));

    if min == max {
        // Index 0 selects key0 for every texel.
        return AlphaBlock {
            key0: min,
            key1: min,
            indices: 0,
        };
    }

    // Eight interpolated values use key0 > key1.
    let (eight_keys, eight_error) = search_keys(values, mask, (max, min), radius, |k0, k1| k0 > k1);

    // Six interpolated values plus exact 0 and 255 use key0 <= key1.
    let (inner_min, inner_max) = values
        .iter()
        .enumerate()
        .filter(|(i, v)| mask & (1 << i) != 0 && **v != 0 && **v != 255)
        .fold(None, |range, (_, v)| match range {
            Some((min, max)) => Some((v.min(min), v.max(max))),
            None => Some((v, v)),
        })
        .map(|(min, max)| (*min, *max))
        .unwrap_or((0, 0));
    let (six_keys, six_error) = search_keys(
        values,
        mask,
        (inner_min, inner_max),
        radius,
        |k0, k1| k0 <= k1,
    );

    let (key0, key1) = if six_error < eight_error {
        six_keys
    } else {
        eight_keys
    };

    let ramp = ramp(key0, key1);
    let mut indices = 0u64;
    for (i, value) in values.iter().enumerate() {
        indices |= (nearest(&ramp, *value).0 as u64) << (3 * i);
    }

    AlphaBlock {
        key0,
        key1,
        indices,
    }
}

// Ties resolve to the lowest index.
fn nearest(ramp: &[u8; 8], value: u8) -> (usize, u32) {
    let mut best = (0, u32::MAX);
    for (i, level) in ramp.iter().enumerate() {
        let d = level.abs_diff(value) as u32;
        if d * d < best.1 {
            best = (i, d * d);
            if d == 0 {
                break;
            }
        }
    }
    best
}

fn keys_error(values: &[u8; TEXELS_PER_BLOCK], mask: u16, key0: u8, key1: u8) -> u32 {
    let ramp = ramp(key0, key1);
    values
        .iter()
        .enumerate()
        .filter(|(i, _)| mask & (1 << i) != 0)
        .map(|(_, v)| nearest(&ramp, *v).1)
        .sum()
}

/// Coordinate descent over each key while `valid` holds for the pair.
fn search_keys(
    values: &[u8; TEXELS_PER_BLOCK],
    mask: u16,
    start: (u8, u8),
    radius: u8,
    valid: impl Fn(u8, u8) -> bool,
) -> ((u8, u8), u32) {
    let mut best = start;
    let mut best_error = keys_error(values, mask, start.0, start.1);

    let range = |center: u8| {
        center.saturating_sub(radius)..=center.saturating_add(radius)
    };

    // Alternate between keys until neither improves.
    loop {
        let previous = best_error;

        for key0 in range(start.0) {
            if best_error == 0 {
                break;
            }
            if valid(key0, best.1) {
                let error = keys_error(values, mask, key0, best.1);
                if error < best_error {
                    best = (key0, best.1);
                    best_error = error;
                }
            }
        }

        for key1 in range(start.1) {
            if best_error == 0 {
                break;
            }
            if valid(best.0, key1) {
                let error = keys_error(values, mask, best.0, key1);
                if error < best_error {
                    best = (best.0, key1);
                    best_error = error;
                }
            }
        }

        if best_error == 0 || best_error >= previous {
            break;
        }
    }

    (best, best_error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::FULL_MASK;

    fn decode(block: &AlphaBlock) -> [u8; 16] {
        let ramp = ramp(block.key0, block.key1);
        std::array::from_fn(|i| ramp[block.index(i)])
    }

    #[test]
    fn explicit_alpha_nibbles() {
        let mut texels = [[0.0, 0.0, 0.0, 1.0]; 16];
        texels[0][A] = 0.0;
        texels[1][A] = 0.5;
        texels[15][A] = 1.0 / 15.0;
        let bits = explicit_alpha(&Block::new(texels));
        assert_eq!(0x0, bits & 0xF);
        assert_eq!(0x8, (bits >> 4) & 0xF);
        assert_eq!(0xF, (bits >> 8) & 0xF);
        assert_eq!(0x1, bits >> 60);
    }

    #[test]
    fn ramp_eight_values() {
        assert_eq!([255, 0, 218, 182, 145, 109, 73, 36], ramp(255, 0));
    }

    #[test]
    fn ramp_six_values() {
        assert_eq!([0, 255, 51, 102, 153, 204, 0, 255], ramp(0, 255));
    }

    #[test]
    fn alpha_block_bytes() {
        let block = AlphaBlock {
            key0: 200,
            key1: 10,
            indices: 0x0000_FAC6_8800,
        };
        let bytes = block.to_bytes();
        assert_eq!([200, 10, 0x00, 0x88, 0xC6, 0xFA, 0x00, 0x00], bytes);
        assert_eq!(block, AlphaBlock::from_bytes(bytes));
    }

    #[test]
    fn uniform_values() {
        let block = encode_interpolated(&[77; 16], FULL_MASK, 4);
        assert_eq!(77, block.key0);
        assert_eq!(77, block.key1);
        assert_eq!([77; 16], decode(&block));
    }

    #[test]
    fn two_values_exact() {
        let values = std::array::from_fn(|i| if i < 8 { 20 } else { 230 });
        let block = encode_interpolated(&values, FULL_MASK, 4);
        assert_eq!(values, decode(&block));
    }

    #[test]
    fn extremes_prefer_six_value_ramp() {
        // Exact 0 and 255 are free with the six value ramp.
        let mut values = [128; 16];
        values[0] = 0;
        values[1] = 255;
        values[2] = 120;
        values[3] = 136;
        let block = encode_interpolated(&values, FULL_MASK, 8);
        assert!(block.key0 <= block.key1);
        let decoded = decode(&block);
        assert_eq!(0, decoded[0]);
        assert_eq!(255, decoded[1]);
    }

    #[test]
    fn masked_texels_ignored() {
        let mut values = [100; 16];
        values[15] = 0;
        let block = encode_interpolated(&values, 0x7FFF, 4);
        assert_eq!(100, block.key0);
        assert_eq!(100, block.key1);
    }

    #[test]
    fn ramp_error_bounded() {
        let values = std::array::from_fn(|i| (i * 17) as u8);
        let block = encode_interpolated(&values, FULL_MASK, 4);
        for (value, decoded) in values.iter().zip(decode(&block)) {
            // Half the distance between eight evenly spaced levels.
            assert!(value.abs_diff(decoded) <= 19, "{value} {decoded}");
        }
    }
}
