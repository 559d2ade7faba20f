//! Exact endpoint solutions for blocks with a single color.
use std::{
    collections::HashMap,
    sync::{Mutex, OnceLock, PoisonError},
};

use super::color::{expand5, expand6, PaletteMode, Rgb565};
use crate::ChannelWeights;

const FOUR_COLOR_SLOTS: usize = 4;
const THREE_COLOR_SLOTS: usize = 3;

/// The best endpoint pair for a single color.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct UniformMatch {
    pub high: Rgb565,
    pub low: Rgb565,
    /// The palette index that reproduces the color when `high` is the first endpoint.
    pub slot: u8,
}

#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
struct CacheKey {
    color: u32,
    mode: PaletteMode,
    weights: [u32; 3],
}

#[derive(Debug, Default, Clone, Copy)]
struct LevelMatch {
    high: u8,
    low: u8,
    /// The absolute difference between the decoded level and the target.
    error: u8,
}

/// The nearest endpoint codes for every 8-bit target value and palette slot at one bit depth.
#[derive(Debug)]
struct LevelTable {
    four_color: [[LevelMatch; 256]; FOUR_COLOR_SLOTS],
    three_color: [[LevelMatch; 256]; THREE_COLOR_SLOTS],
}

impl LevelTable {
    fn new(bits: u32, expand: fn(u16) -> u8) -> Self {
        let code_count = 1u16 << bits;

        let mut four_color = [[LevelMatch::default(); 256]; FOUR_COLOR_SLOTS];
        let mut three_color = [[LevelMatch::default(); 256]; THREE_COLOR_SLOTS];
        let mut best_four = [[u8::MAX as u32 + 1; 256]; FOUR_COLOR_SLOTS];
        let mut best_three = [[u8::MAX as u32 + 1; 256]; THREE_COLOR_SLOTS];

        // Pairs are visited in ascending order so ties keep the lowest pair.
        for high in 0..code_count {
            for low in 0..code_count {
                let h = expand(high) as u32;
                let l = expand(low) as u32;
                let four_levels = [h, l, (2 * h + l + 1) / 3, (h + 2 * l + 1) / 3];
                let three_levels = [h, l, (h + l + 1) >> 1];

                for target in 0..256u32 {
                    for (slot, level) in four_levels.iter().enumerate() {
                        let error = level.abs_diff(target);
                        if error < best_four[slot][target as usize] {
                            best_four[slot][target as usize] = error;
                            four_color[slot][target as usize] = LevelMatch {
                                high: high as u8,
                                low: low as u8,
                                error: error as u8,
                            };
                        }
                    }
                    for (slot, level) in three_levels.iter().enumerate() {
                        let error = level.abs_diff(target);
                        if error < best_three[slot][target as usize] {
                            best_three[slot][target as usize] = error;
                            three_color[slot][target as usize] = LevelMatch {
                                high: high as u8,
                                low: low as u8,
                                error: error as u8,
                            };
                        }
                    }
                }
            }
        }

        Self {
            four_color,
            three_color,
        }
    }

    fn get(&self, mode: PaletteMode, slot: usize, target: u8) -> LevelMatch {
        match mode {
            PaletteMode::FourColor => self.four_color[slot][target as usize],
            PaletteMode::ThreeColor => self.three_color[slot][target as usize],
        }
    }
}

#[derive(Debug)]
struct SingleColorTables {
    bits5: LevelTable,
    bits6: LevelTable,
}

impl SingleColorTables {
    fn new() -> Self {
        Self {
            bits5: LevelTable::new(5, expand5),
            bits6: LevelTable::new(6, expand6),
        }
    }

    fn search(&self, rgb: [u8; 3], mode: PaletteMode, weights: &ChannelWeights) -> UniformMatch {
        let tables = [&self.bits5, &self.bits6, &self.bits5];

        let mut best = UniformMatch {
            high: Rgb565(0),
            low: Rgb565(0),
            slot: 0,
        };
        let mut best_error = f32::INFINITY;
        for slot in 0..mode.entry_count() {
            let matches = [0, 1, 2].map(|c| tables[c].get(mode, slot, rgb[c]));

            let error: f32 = matches
                .iter()
                .enumerate()
                .map(|(c, m)| {
                    let e = m.error as f32 / 255.0;
                    weights.channel(c) * e * e
                })
                .sum();

            if error < best_error {
                best_error = error;
                best = UniformMatch {
                    high: Rgb565::from_codes(matches.map(|m| m.high as u16)),
                    low: Rgb565::from_codes(matches.map(|m| m.low as u16)),
                    slot: slot as u8,
                };
                if error == 0.0 {
                    break;
                }
            }
        }
        best
    }
}

/// A memo table of endpoint pairs for single color blocks.
///
/// The lookup tables are built on first use and shared by all threads.
/// Solved colors are remembered until [UniformBlockCache::reset].
#[derive(Debug, Default)]
pub struct UniformBlockCache {
    tables: OnceLock<SingleColorTables>,
    memo: Mutex<HashMap<CacheKey, UniformMatch>>,
}

impl UniformBlockCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The endpoint pair with the least weighted error for the 8-bit color `rgb`.
    pub fn best_single_color(
        &self,
        rgb: [u8; 3],
        mode: PaletteMode,
        weights: &ChannelWeights,
    ) -> UniformMatch {
        let key = CacheKey {
            color: u32::from_le_bytes([rgb[0], rgb[1], rgb[2], 0]),
            mode,
            weights: weights.to_bits(),
        };

        let cached = self.lock().get(&key).copied();
        if let Some(found) = cached {
            return found;
        }

        // Searching doesn't hold the lock, so threads may race to insert the same result.
        let found = self
            .tables
            .get_or_init(SingleColorTables::new)
            .search(rgb, mode, weights);
        self.lock().insert(key, found);
        found
    }

    /// Forget all solved colors.
    pub fn reset(&self) {
        self.lock().clear();
    }

    /// The number of solved colors.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // Entries are only ever inserted whole, so a poisoned map is still valid.
    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<CacheKey, UniformMatch>> {
        self.memo.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
