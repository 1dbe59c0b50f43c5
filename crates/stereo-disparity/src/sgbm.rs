use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use stereo_image::Image;

use crate::decode::FixedPointDisparity;
use crate::error::DisparityError;
use crate::matcher::StereoMatcher;
use crate::window::{SearchWindow, DISPARITY_SCALE};

/// Largest supported block side, so that a block cost fits in 16 bits.
const MAX_BLOCK_SIZE: usize = 15;

/// Parameters of the semi-global matcher.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SgbmParams {
    /// Side of the square matching block, odd.
    pub block_size: usize,
    /// Penalty for a disparity change of one pixel between neighbours.
    pub p1: u32,
    /// Penalty for larger disparity changes between neighbours.
    pub p2: u32,
    /// Margin in percent by which the best cost must beat every non adjacent disparity.
    pub uniqueness_ratio: u32,
    /// Largest connected region removed as a speckle, `0` disables the filter.
    pub speckle_window_size: usize,
    /// Largest disparity step in pixels inside a connected region.
    pub speckle_range: i32,
    /// Largest disagreement in pixels of the left-right check, negative disables it.
    pub disp12_max_diff: i32,
}

impl Default for SgbmParams {
    fn default() -> Self {
        Self {
            block_size: 3,
            p1: 200,
            p2: 2400,
            uniqueness_ratio: 5,
            speckle_window_size: 200,
            speckle_range: 2,
            disp12_max_diff: 1,
        }
    }
}

/// Semi-global block matching.
///
/// The matching cost is the sum of absolute differences over a square block. Costs are
/// smoothed along the four image axis directions with the `p1` and `p2` penalties, the
/// disparity is picked winner-take-all and refined to 1/16 pixel by fitting a parabola. Matches
/// failing the uniqueness test or the left-right check are dropped, and small disconnected
/// regions are removed.
///
/// # Example
///
/// ```
/// use stereo_disparity::{SearchWindow, SemiGlobalMatcher, SgbmParams, StereoMatcher};
/// use stereo_image::{Image, ImageSize};
///
/// let size = ImageSize { width: 32, height: 8 };
/// let left = Image::<u8, 1>::from_fn(size, |r, c| [((r * 31 + c * 17) % 255) as u8]).unwrap();
///
/// let matcher = SemiGlobalMatcher::new(SgbmParams::default()).unwrap();
/// let window = SearchWindow::new(0, 16).unwrap();
/// let disparity = matcher.compute(&left, &left, &window).unwrap();
/// assert_eq!(disparity.size(), size);
/// ```
#[derive(Clone, Debug)]
pub struct SemiGlobalMatcher {
    params: SgbmParams,
}

impl SemiGlobalMatcher {
    /// Create a matcher, checking the block size.
    pub fn new(params: SgbmParams) -> Result<Self, DisparityError> {
        if params.block_size % 2 == 0 || params.block_size > MAX_BLOCK_SIZE {
            return Err(DisparityError::InvalidBlockSize(params.block_size));
        }
        Ok(Self { params })
    }

    /// The matcher parameters.
    pub fn params(&self) -> &SgbmParams {
        &self.params
    }

    // Block SAD per pixel and candidate, laid out as (row, col, disparity).
    fn cost_volume(
        &self,
        left: &Image<u8, 1>,
        right: &Image<u8, 1>,
        window: &SearchWindow,
    ) -> Vec<u16> {
        let (w, h) = (left.width(), left.height());
        let ndisp = window.num_disparities as usize;
        let r = (self.params.block_size / 2) as i64;
        let max_cost = (self.params.block_size * self.params.block_size * 255) as u16;
        let (lsrc, rsrc) = (left.as_slice(), right.as_slice());

        let clamp = |v: i64, n: usize| v.clamp(0, n as i64 - 1) as usize;

        let mut cost = vec![max_cost; w * h * ndisp];
        cost.par_chunks_mut(w * ndisp)
            .enumerate()
            .for_each(|(y, row)| {
                for (x, costs) in row.chunks_mut(ndisp).enumerate() {
                    for (k, c) in costs.iter_mut().enumerate() {
                        let xr = x as i64 - (window.min_disparity as i64 + k as i64);
                        if xr < 0 || xr >= w as i64 {
                            continue;
                        }
                        let mut sad = 0u32;
                        for dy in -r..=r {
                            let yy = clamp(y as i64 + dy, h) * w;
                            for dx in -r..=r {
                                let lv = lsrc[yy + clamp(x as i64 + dx, w)] as i32;
                                let rv = rsrc[yy + clamp(xr + dx, w)] as i32;
                                sad += (lv - rv).unsigned_abs();
                            }
                        }
                        *c = sad as u16;
                    }
                }
            });
        cost
    }

    // Sum of the four directional path costs.
    fn aggregate(&self, cost: &[u16], w: usize, h: usize, ndisp: usize) -> Vec<u16> {
        let (p1, p2) = (self.params.p1, self.params.p2);
        let mut sum = vec![0u16; w * h * ndisp];

        // rows are independent along the horizontal paths
        sum.par_chunks_mut(w * ndisp)
            .zip(cost.par_chunks(w * ndisp))
            .for_each(|(s_row, c_row)| {
                let mut prev = vec![0u32; ndisp];
                let mut cur = vec![0u32; ndisp];
                for order in [false, true] {
                    prev.iter_mut().for_each(|v| *v = 0);
                    let mut prev_min = 0;
                    for i in 0..w {
                        let x = if order { w - 1 - i } else { i };
                        let range = x * ndisp..(x + 1) * ndisp;
                        prev_min = path_step(&c_row[range.clone()], &prev, prev_min, p1, p2, &mut cur);
                        accumulate(&mut s_row[range], &cur);
                        std::mem::swap(&mut prev, &mut cur);
                    }
                }
            });

        for order in [false, true] {
            let mut prev = vec![0u32; w * ndisp];
            let mut cur = vec![0u32; w * ndisp];
            let mut prev_min = vec![0u32; w];
            for i in 0..h {
                let y = if order { h - 1 - i } else { i };
                let row = y * w * ndisp..(y + 1) * w * ndisp;
                let c_row = &cost[row.clone()];
                let s_row = &mut sum[row];
                for x in 0..w {
                    let range = x * ndisp..(x + 1) * ndisp;
                    prev_min[x] = path_step(
                        &c_row[range.clone()],
                        &prev[range.clone()],
                        prev_min[x],
                        p1,
                        p2,
                        &mut cur[range.clone()],
                    );
                    accumulate(&mut s_row[range.clone()], &cur[range]);
                }
                std::mem::swap(&mut prev, &mut cur);
            }
        }

        sum
    }

    // Winner-take-all, uniqueness, sub-pixel refinement and left-right check of one row.
    fn select_row(
        &self,
        s_row: &[u16],
        out: &mut [i16],
        window: &SearchWindow,
        columns: std::ops::Range<usize>,
    ) {
        let w = out.len();
        let ndisp = window.num_disparities as usize;
        let min_d = window.min_disparity;
        let invalid = window.invalid_value();
        let uniqueness = self.params.uniqueness_ratio.min(100);

        let mut disp2 = vec![min_d - 1; w];
        let mut disp2_cost = vec![u32::MAX; w];

        for x in columns.clone() {
            let s = &s_row[x * ndisp..(x + 1) * ndisp];
            let (mut best, mut min_s) = (0, u32::MAX);
            for (k, &v) in s.iter().enumerate() {
                if (v as u32) < min_s {
                    min_s = v as u32;
                    best = k;
                }
            }

            let ambiguous = s.iter().enumerate().any(|(k, &v)| {
                (v as u32) * (100 - uniqueness) < min_s * 100 && k.abs_diff(best) > 1
            });
            if ambiguous {
                continue;
            }

            let xr = x as i32 - (min_d + best as i32);
            if xr >= 0 && (xr as usize) < w && disp2_cost[xr as usize] > min_s {
                disp2_cost[xr as usize] = min_s;
                disp2[xr as usize] = min_d + best as i32;
            }

            let mut d16 = best as i32 * DISPARITY_SCALE;
            if best > 0 && best + 1 < ndisp {
                let (a, b, c) = (s[best - 1] as i32, s[best] as i32, s[best + 1] as i32);
                let denom2 = (a + c - 2 * b).max(1);
                d16 += ((a - c) * DISPARITY_SCALE + denom2) / (denom2 * 2);
            }
            out[x] = (min_d * DISPARITY_SCALE + d16) as i16;
        }

        let max_diff = self.params.disp12_max_diff;
        if max_diff < 0 {
            return;
        }
        let disagrees = |xx: i32, d: i32| {
            xx >= 0 && (xx as usize) < w && {
                let d2 = disp2[xx as usize];
                d2 >= min_d && (d2 - d).abs() > max_diff
            }
        };
        for x in columns {
            let d = out[x] as i32;
            if d == invalid as i32 {
                continue;
            }
            let d_lo = d.div_euclid(DISPARITY_SCALE);
            let d_hi = (d + DISPARITY_SCALE - 1).div_euclid(DISPARITY_SCALE);
            if disagrees(x as i32 - d_lo, d_lo) && disagrees(x as i32 - d_hi, d_hi) {
                out[x] = invalid;
            }
        }
    }
}

impl StereoMatcher for SemiGlobalMatcher {
    fn compute(
        &self,
        left: &Image<u8, 1>,
        right: &Image<u8, 1>,
        window: &SearchWindow,
    ) -> Result<FixedPointDisparity, DisparityError> {
        if left.size() != right.size() {
            return Err(DisparityError::SizeMismatch(left.size(), right.size()));
        }
        let (w, h) = (left.width(), left.height());
        let ndisp = window.num_disparities as usize;
        let invalid = window.invalid_value();
        let mut disparity = Image::from_size_val(left.size(), invalid)?;

        // columns where every candidate falls inside the right image
        let first = window.max_disparity().max(0) as i64;
        let last = (w as i64 + window.min_disparity.min(0) as i64).min(w as i64);
        if first >= last {
            log::warn!(
                "search window [{}, {}] leaves no column to match in a {} wide image",
                window.min_disparity,
                window.max_disparity(),
                w
            );
            return Ok(disparity);
        }
        let columns = first as usize..last as usize;

        let cost = self.cost_volume(left, right, window);
        let sum = self.aggregate(&cost, w, h, ndisp);
        drop(cost);

        disparity
            .as_slice_mut()
            .par_chunks_mut(w)
            .zip(sum.par_chunks(w * ndisp))
            .for_each(|(row, s_row)| self.select_row(s_row, row, window, columns.clone()));

        if self.params.speckle_window_size > 0 {
            filter_speckles(
                &mut disparity,
                invalid,
                self.params.speckle_window_size,
                self.params.speckle_range * DISPARITY_SCALE,
            );
        }

        log::debug!(
            "matched {} of {} pixels over disparities [{}, {}]",
            disparity.as_slice().iter().filter(|v| **v != invalid).count(),
            w * h,
            window.min_disparity,
            window.max_disparity()
        );

        Ok(disparity)
    }
}

// One step of a path: L(p, d) = C(p, d) + min(L(p-r, d), L(p-r, d+-1) + P1, min L(p-r) + P2) - min L(p-r).
fn path_step(cost: &[u16], prev: &[u32], prev_min: u32, p1: u32, p2: u32, out: &mut [u32]) -> u32 {
    let n = cost.len();
    let jump = prev_min + p2;
    let mut min = u32::MAX;
    for k in 0..n {
        let mut best = prev[k].min(jump);
        if k > 0 {
            best = best.min(prev[k - 1] + p1);
        }
        if k + 1 < n {
            best = best.min(prev[k + 1] + p1);
        }
        let v = cost[k] as u32 + best - prev_min;
        out[k] = v;
        min = min.min(v);
    }
    min
}

fn accumulate(sum: &mut [u16], path: &[u32]) {
    for (s, &l) in sum.iter_mut().zip(path.iter()) {
        *s = s.saturating_add(l.min(u16::MAX as u32) as u16);
    }
}

/// Replace small connected regions of similar disparity with `invalid`.
///
/// Two 4-neighbours belong to the same region when their values differ by at most `max_diff`.
/// Regions of at most `max_size` pixels are removed.
pub fn filter_speckles(image: &mut Image<i16, 1>, invalid: i16, max_size: usize, max_diff: i32) {
    let (w, h) = (image.width(), image.height());
    let data = image.as_slice_mut();
    let mut visited = vec![false; w * h];
    let mut region = Vec::new();
    let mut stack = Vec::new();

    for seed in 0..w * h {
        if visited[seed] || data[seed] == invalid {
            continue;
        }
        visited[seed] = true;
        region.clear();
        stack.push(seed);

        while let Some(p) = stack.pop() {
            region.push(p);
            let (x, y) = (p % w, p / w);
            let value = data[p] as i32;
            let neighbours = [
                (x > 0).then(|| p - 1),
                (x + 1 < w).then(|| p + 1),
                (y > 0).then(|| p - w),
                (y + 1 < h).then(|| p + w),
            ];
            for q in neighbours.into_iter().flatten() {
                if !visited[q] && data[q] != invalid && (data[q] as i32 - value).abs() <= max_diff {
                    visited[q] = true;
                    stack.push(q);
                }
            }
        }

        if region.len() <= max_size {
            for &p in region.iter() {
                data[p] = invalid;
            }
        }
    }
}
