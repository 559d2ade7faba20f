//! Initial endpoint estimates from per channel value statistics.
use crate::block::{masked, Block, TEXELS_PER_BLOCK};

/// The distinct values of one channel sorted in ascending order with their occurrence counts.
#[derive(Debug, PartialEq, Clone, Copy)]
pub struct ChannelValues {
    values: [f32; TEXELS_PER_BLOCK],
    counts: [u32; TEXELS_PER_BLOCK],
    len: usize,
}

impl ChannelValues {
    /// Collect the values of `channel` for texels in `mask`.
    pub fn from_block(block: &Block, mask: u16, channel: usize) -> Self {
        let mut sorted = [0.0f32; TEXELS_PER_BLOCK];
        let mut sample_count = 0;
        for texel in masked(&block.texels, mask) {
            sorted[sample_count] = texel[channel];
            sample_count += 1;
        }
        let sorted = &mut sorted[..sample_count];
        sorted.sort_by(f32::total_cmp);

        let mut values = [0.0; TEXELS_PER_BLOCK];
        let mut counts = [0; TEXELS_PER_BLOCK];
        let mut len = 0;
        for &value in sorted.iter() {
            if len > 0 && values[len - 1] == value {
                counts[len - 1] += 1;
            } else {
                values[len] = value;
                counts[len] = 1;
                len += 1;
            }
        }

        Self {
            values,
            counts,
            len,
        }
    }

    /// The number of distinct values.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Iterate over `(value, count)` pairs in ascending order of value.
    pub fn iter(&self) -> impl Iterator<Item = (f32, u32)> + '_ {
        self.values[..self.len]
            .iter()
            .copied()
            .zip(self.counts[..self.len].iter().copied())
    }

    pub fn min(&self) -> Option<f32> {
        self.values[..self.len].first().copied()
    }

    pub fn max(&self) -> Option<f32> {
        self.values[..self.len].last().copied()
    }

    /// The initial `(low, high)` endpoint values for this channel.
    pub fn endpoints(&self) -> (f32, f32) {
        match self.len {
            0 => (0.0, 0.0),
            1 => (self.values[0], self.values[0]),
            2 => (self.values[0], self.values[1]),
            n => {
                // Least squares line of value against rank.
                let values = &self.values[..n];
                let mean_rank = (n - 1) as f32 / 2.0;
                let mean_value = values.iter().sum::<f32>() / n as f32;

                let mut covariance = 0.0;
                let mut variance = 0.0;
                for (rank, value) in values.iter().enumerate() {
                    let dx = rank as f32 - mean_rank;
                    covariance += dx * (value - mean_value);
                    variance += dx * dx;
                }
                let slope = covariance / variance;

                let min = values[0];
                let max = values[n - 1];
                let low = (mean_value - slope * mean_rank).clamp(min, max);
                let high = (mean_value + slope * mean_rank).clamp(min, max);
                (low, high)
            }
        }
    }
}

/// Initial unquantized endpoints for the color channels of a block.
#[derive(Debug, PartialEq, Clone, Copy)]
pub struct EstimateResult {
    pub high: [f32; 3],
    pub low: [f32; 3],
    /// The number of distinct values in each of the R, G, and B channels.
    pub distinct: [usize; 3],
}

impl EstimateResult {
    /// Returns `true` if every participating texel has the same color.
    pub fn is_uniform(&self) -> bool {
        self.distinct.iter().all(|d| *d == 1)
    }
}

/// Estimate the high and low endpoints of the texels in `mask`.
pub fn estimate_endpoints(block: &Block, mask: u16) -> EstimateResult {
    let mut result = EstimateResult {
        high: [0.0; 3],
        low: [0.0; 3],
        distinct: [0; 3],
    };
    for c in 0..3 {
        let values = ChannelValues::from_block(block, mask, c);
        let (low, high) = values.endpoints();
        result.low[c] = low;
        result.high[c] = high;
        result.distinct[c] = values.len();
    }
    result
}
