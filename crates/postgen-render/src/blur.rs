//! Separable Gaussian blur over a single-channel coverage plane.
//! Used to soften text drop shadows.

/// Blur an 8-bit plane of `width * height` samples with the given sigma.
/// A sigma of zero (or less) returns the input unchanged.
pub fn blur_plane(src: &[u8], width: u32, height: u32, sigma: f32) -> Vec<u8> {
    debug_assert_eq!(src.len(), (width as usize) * (height as usize));
    if !sigma.is_finite() || sigma <= 0.0 || width == 0 || height == 0 {
        return src.to_vec();
    }

    let kernel = gaussian_kernel_q16(sigma);
    let mut tmp = vec![0u8; src.len()];
    let mut out = vec![0u8; src.len()];
    horizontal_pass(src, &mut tmp, width as usize, height as usize, &kernel);
    vertical_pass(&tmp, &mut out, width as usize, height as usize, &kernel);
    out
}

/// Kernel weights in Q16 fixed point, summing to exactly 1 << 16.
fn gaussian_kernel_q16(sigma: f32) -> Vec<u32> {
    let radius = (sigma * 3.0).ceil().max(1.0) as i32;
    let sigma = sigma as f64;
    let denom = 2.0 * sigma * sigma;
    let weights_f: Vec<f64> = (-radius..=radius)
        .map(|i| (-(i as f64) * (i as f64) / denom).exp())
        .collect();
    let sum: f64 = weights_f.iter().sum();

    let mut weights: Vec<u32> = weights_f
        .iter()
        .map(|w| ((w / sum) * 65536.0).round().clamp(0.0, 65536.0) as u32)
        .collect();

    let acc: i64 = weights.iter().map(|&w| i64::from(w)).sum();
    let delta = 65536 - acc;
    if delta != 0 {
        let mid = weights.len() / 2;
        weights[mid] = (i64::from(weights[mid]) + delta).clamp(0, 65536) as u32;
    }
    weights
}

fn horizontal_pass(src: &[u8], dst: &mut [u8], width: usize, height: usize, k: &[u32]) {
    let radius = (k.len() / 2) as isize;
    for y in 0..height {
        let row = &src[y * width..(y + 1) * width];
        for x in 0..width {
            let mut acc: u64 = 0;
            for (i, &w) in k.iter().enumerate() {
                let sx = (x as isize + i as isize - radius).clamp(0, width as isize - 1) as usize;
                acc += u64::from(row[sx]) * u64::from(w);
            }
            dst[y * width + x] = ((acc + (1 << 15)) >> 16).min(255) as u8;
        }
    }
}

fn vertical_pass(src: &[u8], dst: &mut [u8], width: usize, height: usize, k: &[u32]) {
    let radius = (k.len() / 2) as isize;
    for y in 0..height {
        for x in 0..width {
            let mut acc: u64 = 0;
            for (i, &w) in k.iter().enumerate() {
                let sy = (y as isize + i as isize - radius).clamp(0, height as isize - 1) as usize;
                acc += u64::from(src[sy * width + x]) * u64::from(w);
            }
            dst[y * width + x] = ((acc + (1 << 15)) >> 16).min(255) as u8;
        }
    }
}
