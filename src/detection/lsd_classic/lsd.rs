//! Native Line Segment Detector.
//!
//! The algorithm follows the a-contrario LSD design:
//!
//! - Optional Gaussian downscale (`scale`, `sigma_scale`) to suppress aliasing.
//! - 2x2 gradient and level-line field; pixels below `quant / sin(tol)` are
//!   unusable (see [`LevelLineField`]).
//! - Seeds are pseudo-ordered by gradient magnitude in `n_bins` buckets.
//! - Region growing over the 8-neighbourhood using the running mean angle.
//! - Rectangle fit: magnitude-weighted centre and principal axis of the
//!   weighted covariance.
//! - Density test; [`RefineMode::Standard`] and [`RefineMode::Advanced`]
//!   shrink sparse regions around their seed instead of dropping them.
//! - NFA validation; [`RefineMode::Advanced`] also tries finer precision and
//!   narrower rectangles.
//!
//! Output coordinates are full-resolution pixel positions; gradients sit at
//! pixel corners so a half-pixel offset is applied before undoing `scale`.

use super::config::{LsdClassicConfig, RefineMode};
use crate::detection::level_lines::{LevelLineField, NOTDEF, angle_diff, is_aligned};
use crate::detection::nfa::{log_nfa, log_number_of_tests};
use crate::detection::preprocessing;
use crate::detection::raw::RawLines;
use crate::error::Result;
use image::GrayImage;
use log::debug;
use nalgebra::{Matrix2, SymmetricEigen};
use std::f32::consts::PI;

/// Gradient quantization error bound in intensity units.
const QUANT: f32 = 2.0;
/// Detection threshold on `-log10(NFA)`.
const LOG_EPS: f64 = 0.0;

const NEIGH_OFFSETS: [(isize, isize); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

/// Detector output before normalization: `(N, 1, 4)` endpoints plus
/// per-segment width, angular precision and `-log10(NFA)`.
#[derive(Debug, Clone)]
pub struct LsdOutput {
    pub lines: RawLines,
    pub widths: Vec<f32>,
    pub precisions: Vec<f32>,
    pub nfa: Vec<f32>,
}

impl LsdOutput {
    fn empty() -> Self {
        Self {
            lines: RawLines::new(vec![0, 1, 4], Vec::new()),
            widths: Vec::new(),
            precisions: Vec::new(),
            nfa: Vec::new(),
        }
    }
}

/// Run LSD on a grayscale raster.
pub fn detect_segments(gray: &GrayImage, config: &LsdClassicConfig) -> Result<LsdOutput> {
    config.validate()?;
    let (full_w, full_h) = gray.dimensions();
    if full_w == 0 || full_h == 0 {
        return Ok(LsdOutput::empty());
    }

    let scaled = preprocessing::rescale(gray, config.scale, config.sigma_scale);
    let sx = scaled.width() as f32 / full_w as f32;
    let sy = scaled.height() as f32 / full_h as f32;

    let prec = config.angle_tolerance.to_radians();
    let p = config.angle_tolerance / 180.0;
    let field = LevelLineField::compute(&scaled, QUANT / prec.sin());

    let found = Lsd::new(&field, config, prec, p).run(config.n_bins);
    debug!(
        "LSD kept {} segments on {}x{} (scale {:.2})",
        found.len(),
        scaled.width(),
        scaled.height(),
        config.scale
    );

    let mut data = Vec::with_capacity(found.len() * 4);
    let mut widths = Vec::with_capacity(found.len());
    let mut precisions = Vec::with_capacity(found.len());
    let mut nfa = Vec::with_capacity(found.len());
    for seg in &found {
        let r = &seg.rect;
        data.extend_from_slice(&[
            (r.x1 + 0.5) / sx,
            (r.y1 + 0.5) / sy,
            (r.x2 + 0.5) / sx,
            (r.y2 + 0.5) / sy,
        ]);
        widths.push(r.width / sx.min(sy));
        precisions.push(r.p);
        nfa.push(seg.log_nfa as f32);
    }

    Ok(LsdOutput {
        lines: RawLines::new(vec![found.len(), 1, 4], data),
        widths,
        precisions,
        nfa,
    })
}

/// Oriented rectangle approximating a line-support region.
#[derive(Clone, Copy, Debug)]
struct Rect {
    x1: f32,
    y1: f32,
    x2: f32,
    y2: f32,
    width: f32,
    cx: f32,
    cy: f32,
    theta: f32,
    dx: f32,
    dy: f32,
    prec: f32,
    p: f32,
}

impl Rect {
    fn length(&self) -> f32 {
        ((self.x2 - self.x1).powi(2) + (self.y2 - self.y1).powi(2)).sqrt()
    }
}

struct Segment {
    rect: Rect,
    log_nfa: f64,
}

struct Lsd<'a> {
    field: &'a LevelLineField,
    refine_mode: RefineMode,
    density_threshold: f32,
    prec: f32,
    p: f32,
    log_nt: f64,
    min_region: usize,
    used: Vec<bool>,
    region: Vec<usize>,
    region_angle: f32,
}

impl<'a> Lsd<'a> {
    fn new(field: &'a LevelLineField, config: &LsdClassicConfig, prec: f32, p: f32) -> Self {
        let log_nt = log_number_of_tests(field.width, field.height);
        let min_region = (-log_nt / (p as f64).log10()).max(2.0) as usize;
        Self {
            field,
            refine_mode: config.refine_mode,
            density_threshold: config.density_threshold,
            prec,
            p,
            log_nt,
            min_region,
            used: vec![false; field.width * field.height],
            region: Vec::with_capacity(128),
            region_angle: 0.0,
        }
    }

    fn run(mut self, n_bins: usize) -> Vec<Segment> {
        let mut segments = Vec::new();
        for seed in pseudo_order(self.field, n_bins) {
            if self.used[seed] {
                continue;
            }
            if let Some(segment) = self.process_seed(seed) {
                segments.push(segment);
            }
        }
        segments
    }

    fn process_seed(&mut self, seed: usize) -> Option<Segment> {
        self.grow_region(seed);
        if self.region.len() < self.min_region {
            return None;
        }

        let rect = self.region_to_rect()?;
        let rect = self.refine(seed, rect)?;

        let (rect, log_nfa) = if self.refine_mode == RefineMode::Advanced {
            self.improve(rect)
        } else {
            (rect, self.rect_nfa(&rect))
        };
        (log_nfa > LOG_EPS).then_some(Segment { rect, log_nfa })
    }

    fn grow_region(&mut self, seed: usize) {
        let width = self.field.width;
        let height = self.field.height;

        self.region.clear();
        self.region.push(seed);
        self.used[seed] = true;
        self.region_angle = self.field.angles[seed];
        let mut sum_dx = self.region_angle.cos();
        let mut sum_dy = self.region_angle.sin();

        let mut i = 0;
        while i < self.region.len() {
            let idx = self.region[i];
            let x = (idx % width) as isize;
            let y = (idx / width) as isize;
            for (dx, dy) in NEIGH_OFFSETS {
                let xn = x + dx;
                let yn = y + dy;
                if xn < 0 || yn < 0 || xn >= width as isize || yn >= height as isize {
                    continue;
                }
                let n = yn as usize * width + xn as usize;
                if self.used[n] {
                    continue;
                }
                let angle = self.field.angles[n];
                if is_aligned(angle, self.region_angle, self.prec) {
                    self.used[n] = true;
                    self.region.push(n);
                    sum_dx += angle.cos();
                    sum_dy += angle.sin();
                    self.region_angle = sum_dy.atan2(sum_dx);
                }
            }
            i += 1;
        }
    }

    fn region_to_rect(&self) -> Option<Rect> {
        let width = self.field.width;
        let mut sum = 0.0f64;
        let mut cx = 0.0f64;
        let mut cy = 0.0f64;
        for &idx in &self.region {
            let w = self.field.magnitudes[idx] as f64;
            cx += (idx % width) as f64 * w;
            cy += (idx / width) as f64 * w;
            sum += w;
        }
        if sum <= 0.0 {
            return None;
        }
        cx /= sum;
        cy /= sum;

        let (mut sxx, mut syy, mut sxy) = (0.0f64, 0.0f64, 0.0f64);
        for &idx in &self.region {
            let w = self.field.magnitudes[idx] as f64;
            let dx = (idx % width) as f64 - cx;
            let dy = (idx / width) as f64 - cy;
            sxx += w * dx * dx;
            syy += w * dy * dy;
            sxy += w * dx * dy;
        }
        let eig = SymmetricEigen::new(Matrix2::new(sxx, sxy, sxy, syy) / sum);
        let major = if eig.eigenvalues[0] >= eig.eigenvalues[1] { 0 } else { 1 };
        let axis = eig.eigenvectors.column(major);
        let norm = (axis[0] * axis[0] + axis[1] * axis[1]).sqrt();
        if !norm.is_finite() || norm < 1e-9 {
            return None;
        }

        let (cx, cy) = (cx as f32, cy as f32);
        let mut tx = (axis[0] / norm) as f32;
        let mut ty = (axis[1] / norm) as f32;
        // Keep the rectangle oriented like the region's level lines.
        if angle_diff(ty.atan2(tx), self.region_angle) > self.prec {
            tx = -tx;
            ty = -ty;
        }

        let mut l_min = f32::INFINITY;
        let mut l_max = f32::NEG_INFINITY;
        let mut w_min = f32::INFINITY;
        let mut w_max = f32::NEG_INFINITY;
        for &idx in &self.region {
            let rx = (idx % width) as f32 - cx;
            let ry = (idx / width) as f32 - cy;
            let l = rx * tx + ry * ty;
            let w = -rx * ty + ry * tx;
            l_min = l_min.min(l);
            l_max = l_max.max(l);
            w_min = w_min.min(w);
            w_max = w_max.max(w);
        }

        Some(Rect {
            x1: cx + l_min * tx,
            y1: cy + l_min * ty,
            x2: cx + l_max * tx,
            y2: cy + l_max * ty,
            width: (w_max - w_min).max(1.0),
            cx,
            cy,
            theta: ty.atan2(tx),
            dx: tx,
            dy: ty,
            prec: self.prec,
            p: self.p,
        })
    }

    fn density(&self, rect: &Rect) -> f32 {
        let area = rect.length().max(1.0) * rect.width;
        self.region.len() as f32 / area
    }

    /// Apply the density test, shrinking the region around `seed` when allowed.
    fn refine(&mut self, seed: usize, rect: Rect) -> Option<Rect> {
        if self.density(&rect) >= self.density_threshold {
            return Some(rect);
        }
        if self.refine_mode == RefineMode::None {
            return None;
        }

        let width = self.field.width;
        let xs = (seed % width) as f32;
        let ys = (seed / width) as f32;
        let dist = |x: f32, y: f32| ((x - xs).powi(2) + (y - ys).powi(2)).sqrt();
        let mut radius = dist(rect.x1, rect.y1).max(dist(rect.x2, rect.y2));

        loop {
            radius *= 0.75;
            let used = &mut self.used;
            self.region.retain(|&idx| {
                let keep = dist((idx % width) as f32, (idx / width) as f32) <= radius;
                if !keep {
                    used[idx] = false;
                }
                keep
            });
            if self.region.len() < 2 {
                return None;
            }
            let rect = self.region_to_rect()?;
            if self.density(&rect) >= self.density_threshold {
                return Some(rect);
            }
        }
    }

    /// `-log10(NFA)` of the aligned-pixel count inside `rect`.
    fn rect_nfa(&self, rect: &Rect) -> f64 {
        let field = self.field;
        let half = rect.width / 2.0;
        let x_lo = (rect.x1.min(rect.x2) - half).floor().max(0.0) as usize;
        let y_lo = (rect.y1.min(rect.y2) - half).floor().max(0.0) as usize;
        let x_hi = ((rect.x1.max(rect.x2) + half).ceil().max(0.0) as usize).min(field.width - 1);
        let y_hi = ((rect.y1.max(rect.y2) + half).ceil().max(0.0) as usize).min(field.height - 1);

        let l1 = (rect.x1 - rect.cx) * rect.dx + (rect.y1 - rect.cy) * rect.dy;
        let l2 = (rect.x2 - rect.cx) * rect.dx + (rect.y2 - rect.cy) * rect.dy;
        let (l_lo, l_hi) = (l1.min(l2), l1.max(l2));

        let mut n = 0usize;
        let mut k = 0usize;
        for y in y_lo..=y_hi {
            for x in x_lo..=x_hi {
                let rx = x as f32 - rect.cx;
                let ry = y as f32 - rect.cy;
                let l = rx * rect.dx + ry * rect.dy;
                let w = -rx * rect.dy + ry * rect.dx;
                if l < l_lo - 0.5 || l > l_hi + 0.5 || w.abs() > half {
                    continue;
                }
                n += 1;
                if is_aligned(field.angle(x, y), rect.theta, rect.prec) {
                    k += 1;
                }
            }
        }
        log_nfa(n, k, rect.p as f64, self.log_nt)
    }

    /// Try finer precision and narrower rectangles, keeping the best NFA.
    fn improve(&self, rect: Rect) -> (Rect, f64) {
        let mut best = rect;
        let mut best_nfa = self.rect_nfa(&best);

        let mut candidate = best;
        for _ in 0..5 {
            candidate.p /= 2.0;
            candidate.prec = candidate.p * PI;
            let nfa = self.rect_nfa(&candidate);
            if nfa > best_nfa {
                best = candidate;
                best_nfa = nfa;
            }
        }

        let mut candidate = best;
        for _ in 0..5 {
            if candidate.width - 0.5 < 1.0 {
                break;
            }
            candidate.width -= 0.5;
            let nfa = self.rect_nfa(&candidate);
            if nfa > best_nfa {
                best = candidate;
                best_nfa = nfa;
            }
        }
        (best, best_nfa)
    }
}

/// Usable pixel indices, strongest magnitude bucket first.
fn pseudo_order(field: &LevelLineField, n_bins: usize) -> Vec<usize> {
    let n_bins = n_bins.max(1);
    if field.max_magnitude <= 0.0 {
        return Vec::new();
    }
    let mut bins: Vec<Vec<usize>> = vec![Vec::new(); n_bins];
    let scale = n_bins as f32 / field.max_magnitude;
    for (idx, &angle) in field.angles.iter().enumerate() {
        if angle == NOTDEF {
            continue;
        }
        let bin = ((field.magnitudes[idx] * scale) as usize).min(n_bins - 1);
        bins[bin].push(idx);
    }
    bins.into_iter().rev().flatten().collect()
}
