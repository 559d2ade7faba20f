//! Iterative refinement of estimated color endpoints.
use super::{
    color::{
        block_error, block_error_bounded, channel_levels, quantize_channel, Palette, PaletteMode,
        Rgb565, CHANNEL_MAX,
    },
    estimate::{ChannelValues, EstimateResult},
};
use crate::{
    block::{masked, unorm8, Block, B, G, R},
    ChannelWeights,
};

/// Tuning parameters for the endpoint search.
///
/// The defaults for each [Quality](crate::Quality) are available using [From].
#[derive(Debug, PartialEq, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RefineSettings {
    /// The maximum number of gradient correction passes.
    pub max_iterations: u32,
    /// The fraction of each correction applied to the endpoints.
    pub damping: f32,
    /// A channel has converged once both corrections are smaller than this value.
    pub epsilon: f32,
    /// The number of quantization steps to search around the R, G, and B endpoint codes.
    pub search_radius: [u8; 3],
    /// The number of steps to search around interpolated alpha keys.
    pub alpha_search_radius: u8,
}

impl Default for RefineSettings {
    fn default() -> Self {
        crate::Quality::Normal.into()
    }
}

/// The quantized endpoints with the lowest error found for a block.
#[derive(Debug, PartialEq, Clone, Copy)]
pub struct RefineResult {
    pub high: Rgb565,
    pub low: Rgb565,
    /// The total weighted error of the decoded palette.
    pub error: f32,
    /// The number of gradient correction passes performed.
    pub iterations: u32,
}

/// The total weighted error of texels in `mask` for the quantized endpoints.
pub fn endpoint_error(
    block: &Block,
    mask: u16,
    high: Rgb565,
    low: Rgb565,
    mode: PaletteMode,
    weights: &ChannelWeights,
) -> f32 {
    block_error(
        block,
        mask,
        &Palette::from_endpoints(high, low, mode),
        weights,
    )
}

/// Improve the estimated endpoints for the texels in `mask`.
///
/// The returned error is never higher than the error of the quantized estimate.
pub fn refine_endpoints(
    block: &Block,
    mask: u16,
    estimate: &EstimateResult,
    mode: PaletteMode,
    weights: &ChannelWeights,
    settings: &RefineSettings,
) -> RefineResult {
    let mut best = RefineResult {
        high: Rgb565::quantize(estimate.high),
        low: Rgb565::quantize(estimate.low),
        error: 0.0,
        iterations: 0,
    };
    best.error = endpoint_error(block, mask, best.high, best.low, mode, weights);

    fit_palette_entries(block, mask, mode, weights, &mut best);
    correct_gradient(block, mask, estimate, mode, weights, settings, &mut best);
    local_search(block, mask, mode, weights, settings, &mut best);
    joint_search(block, mask, mode, weights, &mut best);
    swap_channels(block, mask, mode, weights, &mut best);

    best
}

/// Try every assignment of the distinct colors to palette entries.
///
/// Blocks with more distinct colors than palette entries are skipped.
/// Endpoints are fit to the assigned entries, so they may lie outside the observed colors.
fn fit_palette_entries(
    block: &Block,
    mask: u16,
    mode: PaletteMode,
    weights: &ChannelWeights,
    best: &mut RefineResult,
) {
    if best.error == 0.0 {
        return;
    }

    let entry_count = mode.entry_count();
    let mut colors = [([0u8; 3], 0u32); 4];
    let mut len = 0;
    for texel in masked(&block.texels, mask) {
        let rgb = [texel[R], texel[G], texel[B]].map(unorm8);
        match colors[..len].iter_mut().find(|(color, _)| *color == rgb) {
            Some((_, count)) => *count += 1,
            None if len == entry_count => return,
            None => {
                colors[len] = (rgb, 1);
                len += 1;
            }
        }
    }
    if len < 2 {
        return;
    }
    let colors = &colors[..len];

    let mut entries = [0usize; 4];
    for assignment in 0..entry_count.pow(len as u32) {
        let mut rest = assignment;
        for entry in entries[..len].iter_mut() {
            *entry = rest % entry_count;
            rest /= entry_count;
        }
        let entries = &entries[..len];

        // A single entry doesn't determine both endpoints.
        if entries.iter().all(|e| *e == entries[0]) {
            continue;
        }

        let (high, low) = fit_assignment(colors, entries, mode);
        let error = block_error_bounded(
            block,
            mask,
            &Palette::from_endpoints(high, low, mode),
            weights,
            best.error,
        );
        if error < best.error {
            best.high = high;
            best.low = low;
            best.error = error;
            if error == 0.0 {
                return;
            }
        }
    }
}

// Least squares endpoints for colors assigned to palette entries,
// snapped to the codes that best reproduce the decoded levels.
fn fit_assignment(
    colors: &[([u8; 3], u32)],
    entries: &[usize],
    mode: PaletteMode,
) -> (Rgb565, Rgb565) {
    let positions = mode.weights();

    let mut high = [0u16; 3];
    let mut low = [0u16; 3];
    for c in 0..3 {
        let mut w = 0.0;
        let mut st = 0.0;
        let mut stt = 0.0;
        let mut sx = 0.0;
        let mut stx = 0.0;
        for ((rgb, count), entry) in colors.iter().zip(entries) {
            let n = *count as f32;
            let x = rgb[c] as f32 / 255.0;
            let t = positions[*entry];
            w += n;
            st += n * t;
            stt += n * t * t;
            sx += n * x;
            stx += n * t * x;
        }

        let slope = (w * stx - st * sx) / (w * stt - st * st);
        let intercept = (sx - slope * st) / w;
        (high[c], low[c]) = nearest_codes(
            colors,
            entries,
            c,
            quantize_channel(intercept + slope, c),
            quantize_channel(intercept, c),
            mode,
        );
    }

    (Rgb565::from_codes(high), Rgb565::from_codes(low))
}

// Rounding in the decoder can move the exact codes one step from the fitted values.
fn nearest_codes(
    colors: &[([u8; 3], u32)],
    entries: &[usize],
    channel: usize,
    high: u16,
    low: u16,
    mode: PaletteMode,
) -> (u16, u16) {
    let max = CHANNEL_MAX[channel];

    let mut best = (high, low);
    let mut best_error = u32::MAX;
    for h in high.saturating_sub(1)..=(high + 1).min(max) {
        for l in low.saturating_sub(1)..=(low + 1).min(max) {
            let levels = channel_levels(channel, h, l, mode);
            let error: u32 = colors
                .iter()
                .zip(entries)
                .map(|((rgb, count), entry)| {
                    let d = levels[*entry].abs_diff(rgb[channel]) as u32;
                    count * d * d
                })
                .sum();
            if error < best_error {
                best = (h, l);
                best_error = error;
            }
        }
    }
    best
}

fn correct_gradient(
    block: &Block,
    mask: u16,
    estimate: &EstimateResult,
    mode: PaletteMode,
    weights: &ChannelWeights,
    settings: &RefineSettings,
    best: &mut RefineResult,
) {
    let values = [0, 1, 2].map(|c| ChannelValues::from_block(block, mask, c));
    let positions = mode.weights();

    let mut high = estimate.high;
    let mut low = estimate.low;

    // Two values are already exact endpoints.
    let mut converged = estimate.distinct.map(|d| d <= 2);

    while best.error > 0.0
        && best.iterations < settings.max_iterations
        && converged.contains(&false)
    {
        best.iterations += 1;

        let palette = Palette::from_float(high, low, mode);
        for c in 0..3 {
            if converged[c] {
                continue;
            }

            let mut error_sums = [0.0f32; 4];
            let mut counts = [0u32; 4];
            for (value, count) in values[c].iter() {
                let (index, entry) = nearest_level(&palette, c, value);
                error_sums[index] += count as f32 * (value - entry);
                counts[index] += count;
            }

            let (dl, dh) = fit_correction(positions, &error_sums, &counts);
            let dl = dl * settings.damping;
            let dh = dh * settings.damping;

            low[c] = (low[c] + dl).clamp(0.0, 1.0);
            high[c] = (high[c] + dh).clamp(0.0, 1.0);
            if low[c] > high[c] {
                std::mem::swap(&mut low[c], &mut high[c]);
            }

            if dl.abs() < settings.epsilon && dh.abs() < settings.epsilon {
                converged[c] = true;
            }
        }

        let candidate_high = Rgb565::quantize(high);
        let candidate_low = Rgb565::quantize(low);
        let error = block_error_bounded(
            block,
            mask,
            &Palette::from_endpoints(candidate_high, candidate_low, mode),
            weights,
            best.error,
        );
        if error < best.error {
            best.high = candidate_high;
            best.low = candidate_low;
            best.error = error;
        }
    }
}

// Ties resolve to the lowest index.
fn nearest_level(palette: &Palette, channel: usize, value: f32) -> (usize, f32) {
    let mut best = (0, f32::INFINITY);
    let mut best_distance = f32::INFINITY;
    for (i, color) in palette.entries().iter().enumerate() {
        let distance = (value - color[channel]).abs();
        if distance < best_distance {
            best_distance = distance;
            best = (i, color[channel]);
        }
    }
    best
}

/// Fit a line through the mean error of each palette entry weighted by occupancy.
/// Returns the line evaluated at the low and high endpoints.
fn fit_correction(t: &[f32], error_sums: &[f32; 4], counts: &[u32; 4]) -> (f32, f32) {
    let mut w = 0.0;
    let mut st = 0.0;
    let mut stt = 0.0;
    let mut se = 0.0;
    let mut ste = 0.0;
    for ((t, error_sum), count) in t.iter().zip(error_sums).zip(counts) {
        let n = *count as f32;
        w += n;
        st += n * t;
        stt += n * t * t;
        se += error_sum;
        ste += t * error_sum;
    }

    if w == 0.0 {
        return (0.0, 0.0);
    }

    let denominator = w * stt - st * st;
    if denominator.abs() <= f32::EPSILON {
        // A single occupied entry only constrains the offset.
        let offset = se / w;
        return (offset, offset);
    }

    let slope = (w * ste - st * se) / denominator;
    let intercept = (se - slope * st) / w;
    (intercept, intercept + slope)
}

fn local_search(
    block: &Block,
    mask: u16,
    mode: PaletteMode,
    weights: &ChannelWeights,
    settings: &RefineSettings,
    best: &mut RefineResult,
) {
    'channels: for c in 0..3 {
        if best.error == 0.0 {
            break;
        }

        let radius = settings.search_radius[c] as i32;
        let max = CHANNEL_MAX[c] as i32;
        let start_high = best.high;
        let start_low = best.low;
        let high_code = start_high.codes()[c] as i32;
        let low_code = start_low.codes()[c] as i32;

        for dh in -radius..=radius {
            let h = high_code + dh;
            if !(0..=max).contains(&h) {
                continue;
            }
            for dl in -radius..=radius {
                let l = low_code + dl;
                if !(0..=max).contains(&l) || (dh == 0 && dl == 0) {
                    continue;
                }

                let high = start_high.with_code(c, h as u16);
                let low = start_low.with_code(c, l as u16);
                let error = block_error_bounded(
                    block,
                    mask,
                    &Palette::from_endpoints(high, low, mode),
                    weights,
                    best.error,
                );
                if error < best.error {
                    best.high = high;
                    best.low = low;
                    best.error = error;
                    if error == 0.0 {
                        break 'channels;
                    }
                }
            }
        }
    }
}

/// Move every channel of one endpoint at a time by up to one code.
fn joint_search(
    block: &Block,
    mask: u16,
    mode: PaletteMode,
    weights: &ChannelWeights,
    best: &mut RefineResult,
) {
    for endpoint in 0..2 {
        let start = if endpoint == 0 { best.high } else { best.low };
        let codes = start.codes();

        for offset in 0..27 {
            if best.error == 0.0 {
                return;
            }

            let delta = [offset % 3, offset / 3 % 3, offset / 9].map(|d| d - 1);
            if delta == [0; 3] {
                continue;
            }
            let Some(moved) = offset_codes(codes, delta) else {
                continue;
            };

            let moved = Rgb565::from_codes(moved);
            let (high, low) = if endpoint == 0 {
                (moved, best.low)
            } else {
                (best.high, moved)
            };
            let error = block_error_bounded(
                block,
                mask,
                &Palette::from_endpoints(high, low, mode),
                weights,
                best.error,
            );
            if error < best.error {
                best.high = high;
                best.low = low;
                best.error = error;
            }
        }
    }
}

fn offset_codes(codes: [u16; 3], delta: [i32; 3]) -> Option<[u16; 3]> {
    let mut moved = [0u16; 3];
    for c in 0..3 {
        let code = codes[c] as i32 + delta[c];
        if !(0..=CHANNEL_MAX[c] as i32).contains(&code) {
            return None;
        }
        moved[c] = code as u16;
    }
    Some(moved)
}

fn swap_channels(
    block: &Block,
    mask: u16,
    mode: PaletteMode,
    weights: &ChannelWeights,
    best: &mut RefineResult,
) {
    for c in 0..3 {
        if best.error == 0.0 {
            break;
        }

        let high_codes = best.high.codes();
        let low_codes = best.low.codes();
        if high_codes[c] == low_codes[c] {
            continue;
        }

        let high = best.high.with_code(c, low_codes[c]);
        let low = best.low.with_code(c, high_codes[c]);
        let error = block_error_bounded(
            block,
            mask,
            &Palette::from_endpoints(high, low, mode),
            weights,
            best.error,
        );
        if error < best.error {
            best.high = high;
            best.low = low;
            best.error = error;
        }
    }
}
