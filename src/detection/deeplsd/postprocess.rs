//! Gradient filtering and collinear merging applied to model output.

use super::config::DeepLsdConfig;
use crate::detection::level_lines::{LevelLineField, angle_diff, is_aligned};
use crate::detection::nfa;
use crate::models::{Line, line_length};
use image::GrayImage;
use std::f32::consts::PI;

/// Angle tolerance used for the alignment statistic.
const ALIGN_TOLERANCE_DEG: f32 = 22.5;
const MERGE_MAX_ANGLE_DEG: f64 = 3.0;
const MERGE_MAX_OFFSET: f64 = 2.0;
const MERGE_MAX_GAP: f64 = 5.0;

/// Apply the configured filters, then merging, to raw model segments.
pub fn apply(lines: Vec<Line>, gray: &GrayImage, config: &DeepLsdConfig) -> Vec<Line> {
    let mut lines = lines;
    if config.filtering || config.grad_nfa {
        let prec = ALIGN_TOLERANCE_DEG.to_radians();
        let field = LevelLineField::compute(gray, 2.0 / prec.sin());
        let log_nt = nfa::log_number_of_tests(field.width, field.height);
        // Direction is tested modulo pi, which doubles the chance level.
        let chance = 2.0 * prec as f64 / PI as f64;
        lines.retain(|line| {
            let stats = sample_segment(&field, line, prec);
            if config.filtering && stats.mean_magnitude < config.grad_thresh {
                return false;
            }
            !config.grad_nfa || nfa::log_nfa(stats.samples, stats.aligned, chance, log_nt) > 0.0
        });
    }
    if config.merge_lines {
        lines = merge_collinear(lines);
    }
    lines
}

#[derive(Debug, Default, Clone, Copy)]
struct SegmentStats {
    samples: usize,
    aligned: usize,
    mean_magnitude: f32,
}

/// Walk the segment at unit steps and collect gradient statistics.
fn sample_segment(field: &LevelLineField, line: &Line, prec: f32) -> SegmentStats {
    if field.width < 2 || field.height < 2 {
        return SegmentStats::default();
    }
    let Some(clipped) = clip_to_raster(line, field.width as f64, field.height as f64) else {
        return SegmentStats::default();
    };
    let [x1, y1, x2, y2] = clipped;
    let theta = (y2 - y1).atan2(x2 - x1) as f32;
    let steps = line_length(&clipped).round().max(1.0) as usize;

    let mut stats = SegmentStats::default();
    let mut total = 0.0f32;
    for i in 0..=steps {
        let t = i as f64 / steps as f64;
        // Field samples sit on pixel corners, half a pixel from the raster grid.
        let px = (x1 + t * (x2 - x1) - 0.5).round();
        let py = (y1 + t * (y2 - y1) - 0.5).round();
        if px < 0.0 || py < 0.0 {
            continue;
        }
        let (px, py) = (px as usize, py as usize);
        if px >= field.width - 1 || py >= field.height - 1 {
            continue;
        }

        stats.samples += 1;
        total += field.magnitude(px, py);
        let angle = field.angle(px, py);
        if is_aligned(angle, theta, prec) || is_aligned(angle, theta + PI, prec) {
            stats.aligned += 1;
        }
    }
    if stats.samples > 0 {
        stats.mean_magnitude = total / stats.samples as f32;
    }
    stats
}

/// Portion of `line` inside `[0, width] x [0, height]` (Liang-Barsky).
fn clip_to_raster(line: &Line, width: f64, height: f64) -> Option<Line> {
    let [x1, y1, x2, y2] = *line;
    let (dx, dy) = (x2 - x1, y2 - y1);
    let (mut t0, mut t1) = (0.0f64, 1.0f64);
    for (p, q) in [(-dx, x1), (dx, width - x1), (-dy, y1), (dy, height - y1)] {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
            continue;
        }
        let r = q / p;
        if p < 0.0 {
            t0 = t0.max(r);
        } else {
            t1 = t1.min(r);
        }
        if t0 > t1 {
            return None;
        }
    }
    Some([x1 + t0 * dx, y1 + t0 * dy, x1 + t1 * dx, y1 + t1 * dy])
}

/// Greedily fuse near-collinear segments that overlap or nearly touch.
pub fn merge_collinear(lines: Vec<Line>) -> Vec<Line> {
    let mut merged: Vec<Line> = Vec::with_capacity(lines.len());
    for line in lines {
        let mut current = line;
        // Absorbing a segment can make the result reach others already kept.
        while let Some(pos) = merged.iter().position(|other| can_merge(&current, other)) {
            let other = merged.swap_remove(pos);
            current = fuse(&other, &current);
        }
        merged.push(current);
    }
    merged
}

fn direction(line: &Line) -> Option<(f64, f64)> {
    let len = line_length(line);
    (len > f64::EPSILON).then(|| ((line[2] - line[0]) / len, (line[3] - line[1]) / len))
}

fn can_merge(a: &Line, b: &Line) -> bool {
    let (Some((ax, ay)), Some((bx, by))) = (direction(a), direction(b)) else {
        return false;
    };
    let angle = angle_diff((ay.atan2(ax) * 2.0) as f32, (by.atan2(bx) * 2.0) as f32) as f64 / 2.0;
    if angle.to_degrees() >= MERGE_MAX_ANGLE_DEG {
        return false;
    }

    // Perpendicular offset of b's endpoints from a's supporting line.
    let offset = |x: f64, y: f64| ((x - a[0]) * -ay + (y - a[1]) * ax).abs();
    if offset(b[0], b[1]).max(offset(b[2], b[3])) >= MERGE_MAX_OFFSET {
        return false;
    }

    let project = |x: f64, y: f64| (x - a[0]) * ax + (y - a[1]) * ay;
    let a_len = line_length(a);
    let (b0, b1) = (project(b[0], b[1]), project(b[2], b[3]));
    let (b_min, b_max) = (b0.min(b1), b0.max(b1));
    let gap = (b_min - a_len).max(-b_max).max(0.0);
    gap < MERGE_MAX_GAP
}

/// Segment spanning the extreme projections of both inputs on `a`'s axis.
fn fuse(a: &Line, b: &Line) -> Line {
    let Some((ax, ay)) = direction(a) else {
        return *b;
    };
    let points = [(a[0], a[1]), (a[2], a[3]), (b[0], b[1]), (b[2], b[3])];
    let project = |&(x, y): &(f64, f64)| (x - a[0]) * ax + (y - a[1]) * ay;
    let (mut lo, mut hi) = (points[0], points[0]);
    for p in &points[1..] {
        if project(p) < project(&lo) {
            lo = *p;
        }
        if project(p) > project(&hi) {
            hi = *p;
        }
    }
    [lo.0, lo.1, hi.0, hi.1]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::deeplsd::config::DEFAULT_CONFIG;
    use image::Luma;

    /// Dark left half, bright right half: a single vertical edge at x = 15.5.
    fn step_image() -> GrayImage {
        GrayImage::from_fn(32, 32, |x, _| if x < 16 { Luma([0]) } else { Luma([255]) })
    }

    #[test]
    fn segments_on_edges_survive_filtering() {
        let lines = vec![[15.5, 2.0, 15.5, 29.0], [5.0, 2.0, 5.0, 29.0]];
        let kept = apply(lines, &step_image(), &DEFAULT_CONFIG);
        assert_eq!(kept, vec![[15.5, 2.0, 15.5, 29.0]]);
    }

    #[test]
    fn filtering_disabled_keeps_everything() {
        let config = DeepLsdConfig {
            filtering: false,
            grad_nfa: false,
            ..DEFAULT_CONFIG
        };
        let lines = vec![[15.5, 2.0, 15.5, 29.0], [5.0, 2.0, 5.0, 29.0]];
        assert_eq!(apply(lines.clone(), &step_image(), &config), lines);
    }

    #[test]
    fn grad_nfa_rejects_misaligned_segments() {
        // Strong gradient but crossing the edge perpendicularly.
        let config = DeepLsdConfig {
            filtering: false,
            grad_nfa: true,
            ..DEFAULT_CONFIG
        };
        let crossing = vec![[14.0, 10.0, 18.0, 10.0]];
        assert!(apply(crossing, &step_image(), &config).is_empty());
    }

    #[test]
    fn far_out_of_range_segments_are_clipped_before_sampling() {
        // Runs along the edge but extends a billion pixels past both borders.
        let along_edge = vec![[15.5, -1.0e9, 15.5, 1.0e9]];
        assert_eq!(apply(along_edge.clone(), &step_image(), &DEFAULT_CONFIG), along_edge);

        let off_edge = vec![[0.0, 0.0, 3.0e9, 0.0]];
        assert!(apply(off_edge, &step_image(), &DEFAULT_CONFIG).is_empty());
    }

    #[test]
    fn clipping_keeps_the_inside_part() {
        assert_eq!(
            clip_to_raster(&[-10.0, 5.0, 50.0, 5.0], 32.0, 32.0),
            Some([0.0, 5.0, 32.0, 5.0])
        );
        assert_eq!(clip_to_raster(&[40.0, 0.0, 50.0, 10.0], 32.0, 32.0), None);
        assert_eq!(
            clip_to_raster(&[1.0, 2.0, 3.0, 4.0], 32.0, 32.0),
            Some([1.0, 2.0, 3.0, 4.0])
        );
    }

    #[test]
    fn touching_collinear_segments_merge() {
        let lines = vec![[0.0, 0.0, 10.0, 0.0], [12.0, 0.5, 20.0, 0.5], [0.0, 5.0, 10.0, 5.0]];
        let merged = merge_collinear(lines);
        assert_eq!(merged.len(), 2);
        assert!(merged.contains(&[0.0, 0.0, 20.0, 0.5]));
        assert!(merged.contains(&[0.0, 5.0, 10.0, 5.0]));
    }

    #[test]
    fn distant_or_oblique_segments_stay_apart() {
        let far = vec![[0.0, 0.0, 10.0, 0.0], [20.0, 0.0, 30.0, 0.0]];
        assert_eq!(merge_collinear(far.clone()), far);
        let oblique = vec![[0.0, 0.0, 10.0, 0.0], [10.0, 0.0, 20.0, 5.0]];
        assert_eq!(merge_collinear(oblique.clone()), oblique);
    }

    #[test]
    fn reversed_segments_merge_too() {
        let merged = merge_collinear(vec![[0.0, 0.0, 10.0, 0.0], [15.0, 0.0, 8.0, 0.0]]);
        assert_eq!(merged, vec![[0.0, 0.0, 15.0, 0.0]]);
    }
}
