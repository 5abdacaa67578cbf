/// Template matching implementation
///
/// Mean-subtracted normalized cross-correlation (TM_CCOEFF_NORMED) over the
/// packed RGB samples: per-channel means are removed, then the dot product and
/// both variances are summed across channels.
///
/// Small searches score every offset at full resolution. Larger ones scan the
/// coarsest pyramid level exhaustively, keep the best few peaks and refine
/// each one level at a time in a small window around its upscaled position.
use std::cmp::Ordering;

use rayon::prelude::*;

use super::plane::{IntegralPlane, Plane, WindowStats, CHANNELS};
use super::target::{TargetImage, TemplateLevel};
use crate::capture::Frame;
use crate::error::EngineResult;

/// A window whose pixels are (near) constant scores zero instead of dividing
/// by a vanishing denominator.
const MIN_WINDOW_VARIANCE: f64 = 1e-6;

/// Offsets times template samples up to which every offset is scored at full
/// resolution.
const EXHAUSTIVE_BUDGET: u64 = 1 << 24;

/// Candidates carried from one pyramid level to the next
const BEAM_WIDTH: usize = 8;

/// Chebyshev radius (coarse pixels) inside which weaker coarse peaks are dropped
const NMS_RADIUS: usize = 2;

/// Search radius around an upscaled candidate
const REFINE_RADIUS: usize = 2;

/// Best placement of the target inside one frame, in capture pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchResult {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    /// Correlation score in [-1.0, 1.0]
    pub confidence: f64,
}

#[derive(Debug, Clone, Copy)]
struct Peak {
    x: usize,
    y: usize,
    score: f64,
}

/// Highest score first; equal scores resolve top-most, then left-most.
fn peak_cmp_desc(a: &Peak, b: &Peak) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| a.y.cmp(&b.y))
        .then_with(|| a.x.cmp(&b.x))
}

/// Sort, then keep peaks farther than `radius` (Chebyshev) from every peak
/// already kept, up to `keep` of them.
fn suppress(peaks: &mut [Peak], radius: usize, keep: usize) -> Vec<Peak> {
    peaks.sort_by(peak_cmp_desc);

    let mut kept: Vec<Peak> = Vec::with_capacity(keep);
    'outer: for peak in peaks.iter().copied() {
        if kept.len() == keep {
            break;
        }
        for other in &kept {
            let dx = peak.x.abs_diff(other.x);
            let dy = peak.y.abs_diff(other.y);
            if dx.max(dy) <= radius {
                continue 'outer;
            }
        }
        kept.push(peak);
    }
    kept
}

/// Locates the best-correlating position of a target inside a frame.
#[derive(Debug, Default, Clone, Copy)]
pub struct TemplateMatcher;

impl TemplateMatcher {
    pub fn new() -> Self {
        Self
    }

    /// Find the best-scoring placement of `target`.
    ///
    /// Equal maxima resolve to the top-most, then left-most position among
    /// the offsets scored at full resolution. Fails with `InvalidTarget` if
    /// the target does not fit inside the frame.
    pub fn match_template(&self, frame: &Frame, target: &TargetImage) -> EngineResult<MatchResult> {
        target.ensure_fits(frame.width(), frame.height())?;

        let base = Plane::from_rgba(frame.image());
        let levels = target.levels();
        let peak = if levels.len() == 1 || exhaustive_cost(&base, &levels[0]) <= EXHAUSTIVE_BUDGET
        {
            best_of(scan_level(&base, &levels[0], 0, 1))
        } else {
            best_of(coarse_to_fine(base, levels))
        };

        Ok(MatchResult {
            x: peak.x as u32,
            y: peak.y as u32,
            width: target.width(),
            height: target.height(),
            confidence: peak.score,
        })
    }
}

fn exhaustive_cost(plane: &Plane, template: &TemplateLevel) -> u64 {
    let offsets_x = (plane.width() - template.width + 1) as u64;
    let offsets_y = (plane.height() - template.height + 1) as u64;
    offsets_x * offsets_y * template.centered.len() as u64
}

fn best_of(peaks: Vec<Peak>) -> Peak {
    peaks.into_iter().next().unwrap_or(Peak {
        x: 0,
        y: 0,
        score: 0.0,
    })
}

fn coarse_to_fine(base: Plane, levels: &[TemplateLevel]) -> Vec<Peak> {
    let mut planes = vec![base];
    while planes.len() < levels.len() {
        match planes.last().and_then(Plane::downsample) {
            Some(coarser) => planes.push(coarser),
            None => break,
        }
    }

    let coarsest = planes.len() - 1;
    let mut candidates = scan_level(&planes[coarsest], &levels[coarsest], NMS_RADIUS, BEAM_WIDTH);
    for level in (0..coarsest).rev() {
        candidates = refine_level(&planes[level], &levels[level], &candidates);
    }
    candidates
}

/// Score every offset of one level, rows in parallel. Returns up to `keep`
/// peaks, best first.
fn scan_level(plane: &Plane, template: &TemplateLevel, radius: usize, keep: usize) -> Vec<Peak> {
    let integral = IntegralPlane::new(plane);
    let max_y = plane.height() - template.height;

    let mut peaks: Vec<Peak> = (0..=max_y)
        .into_par_iter()
        .flat_map_iter(|y| scan_row(plane, &integral, template, y, radius, keep))
        .collect();

    suppress(&mut peaks, radius, keep)
}

fn scan_row(
    plane: &Plane,
    integral: &IntegralPlane,
    template: &TemplateLevel,
    y: usize,
    radius: usize,
    keep: usize,
) -> Vec<Peak> {
    let max_x = plane.width() - template.width;
    let mut row: Vec<Peak> = (0..=max_x)
        .map(|x| {
            let stats = integral.window(x, y, template.width, template.height);
            Peak {
                x,
                y,
                score: correlation(window_dot(plane, template, x, y), stats, template),
            }
        })
        .collect();

    suppress(&mut row, radius, keep)
}

/// Search a small window around each candidate's upscaled position.
fn refine_level(plane: &Plane, template: &TemplateLevel, coarse: &[Peak]) -> Vec<Peak> {
    let max_x = plane.width() - template.width;
    let max_y = plane.height() - template.height;

    let mut refined: Vec<Peak> = coarse
        .par_iter()
        .map(|candidate| {
            let (cx, cy) = (candidate.x * 2, candidate.y * 2);
            let x0 = cx.saturating_sub(REFINE_RADIUS).min(max_x);
            let y0 = cy.saturating_sub(REFINE_RADIUS).min(max_y);
            let x1 = (cx + REFINE_RADIUS).min(max_x);
            let y1 = (cy + REFINE_RADIUS).min(max_y);

            let mut best = Peak {
                x: x0,
                y: y0,
                score: f64::NEG_INFINITY,
            };
            for y in y0..=y1 {
                for x in x0..=x1 {
                    let stats = direct_stats(plane, x, y, template.width, template.height);
                    let score = correlation(window_dot(plane, template, x, y), stats, template);
                    if score > best.score {
                        best = Peak { x, y, score };
                    }
                }
            }
            best
        })
        .collect();

    // Candidates that converged on the same offset collapse into one
    suppress(&mut refined, 0, BEAM_WIDTH)
}

fn window_dot(plane: &Plane, template: &TemplateLevel, x: usize, y: usize) -> f64 {
    let row_len = template.width * CHANNELS;
    let mut dot = 0.0f64;

    for ty in 0..template.height {
        let img_row = plane.row(x, y + ty, template.width);
        let tpl_row = &template.centered[ty * row_len..(ty + 1) * row_len];
        for (&value, &t) in img_row.iter().zip(tpl_row) {
            dot += t * f64::from(value);
        }
    }
    dot
}

fn direct_stats(plane: &Plane, x: usize, y: usize, width: usize, height: usize) -> WindowStats {
    let mut stats = WindowStats::default();
    for row in y..y + height {
        for (i, &value) in plane.row(x, row, width).iter().enumerate() {
            let v = u64::from(value);
            stats.sums[i % CHANNELS] += v;
            stats.squares += v * v;
        }
    }
    stats
}

/// The template is already zero-mean per channel, so the raw dot product
/// equals the centred one; only the window variance needs its means removed.
fn correlation(dot: f64, stats: WindowStats, template: &TemplateLevel) -> f64 {
    let pixels = (template.width * template.height) as f64;
    let mut var_i = stats.squares as f64;
    for sum in stats.sums {
        let sum = sum as f64;
        var_i -= sum * sum / pixels;
    }
    if var_i <= MIN_WINDOW_VARIANCE {
        return 0.0;
    }

    let score = dot / (template.variance * var_i).sqrt();
    score.clamp(-1.0, 1.0)
}
