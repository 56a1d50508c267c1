//! Drawing operations (§4.7): `draw_line`/`draw_circle`/`draw_rectangle`
//! each compute a set of pixel coordinates into a `UniformBlob` and wrap the
//! parent view in a `SparseView` overlay. Grounded on
//! `compute_line_points[_thin]`/`compute_circle_points`/`drawing_functions.hpp`.

use std::sync::Arc;

use terra_core::rect::Rect2i;

use crate::blob::UniformBlob;
use crate::sparse::SparseView;
use crate::view::View;

/// An integer 2D point, used by the drawing entry points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Point2i {
    pub x: i64,
    pub y: i64,
}

impl Point2i {
    pub fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }
}

fn bbox_of(p1: Point2i, p2: Point2i) -> Rect2i {
    Rect2i::from_corners((p1.x, p1.y), (p2.x, p2.y))
}

fn fill_rect(blob: &mut UniformBlob, rect: Rect2i) {
    for row in rect.min_y..rect.max_y() {
        for col in rect.min_x..rect.max_x() {
            blob.insert(col, row, 0);
        }
    }
}

/// Bresenham-style midpoint line, traced with doubled deltas so the
/// "major-axis advance" step can also insert the auxiliary pixel that keeps
/// the line 8-connected (§8 invariant 14).
fn thin_line(blob: &mut UniformBlob, p1: Point2i, p2: Point2i) {
    if p1.x == p2.x || p1.y == p2.y {
        fill_rect(blob, bbox_of(p1, p2));
        return;
    }

    let mut x = p1.x;
    let mut y = p1.y;
    let mut dx = p2.x - p1.x;
    let mut dy = p2.y - p1.y;
    let step_x = if dx < 0 {
        dx = -dx;
        -1
    } else {
        1
    };
    let step_y = if dy < 0 {
        dy = -dy;
        -1
    } else {
        1
    };
    let dx2 = dx << 1;
    let dy2 = dy << 1;

    blob.insert(x, y, 0);

    if dx > dy {
        let mut error = dy2 - dx;
        while x != p2.x {
            x += step_x;
            if error >= 0 {
                blob.insert(x, y, 0);
                y += step_y;
                blob.insert(x - step_x, y, 0);
                error -= dx2;
            }
            error += dy2;
            blob.insert(x, y, 0);
        }
    } else {
        let mut error = dx2 - dy;
        while y != p2.y {
            y += step_y;
            if error >= 0 {
                blob.insert(x, y, 0);
                x += step_x;
                blob.insert(x, y - step_y, 0);
                error -= dy2;
            }
            error += dx2;
            blob.insert(x, y, 0);
        }
    }
}

/// A thick line: for axis-aligned segments, an expanded filled rectangle;
/// otherwise, a band of thin lines between interpolated points on either
/// side of the unit normal.
fn line_points(blob: &mut UniformBlob, p1: Point2i, p2: Point2i, thickness: i64) {
    if thickness <= 1 {
        thin_line(blob, p1, p2);
        return;
    }
    if p1.x == p2.x || p1.y == p2.y {
        fill_rect(blob, bbox_of(p1, p2).expand(thickness / 2));
        return;
    }

    let (dx, dy) = ((p2.x - p1.x) as f64, (p2.y - p1.y) as f64);
    let len = (dx * dx + dy * dy).sqrt();
    let (nx, ny) = if len == 0.0 { (0.0, 0.0) } else { (dy / len, -dx / len) };
    let half = thickness as f64 / 2.0;

    let p1_min = (p1.x as f64 - half * nx, p1.y as f64 - half * ny);
    let p1_max = (p1.x as f64 + half * nx, p1.y as f64 + half * ny);
    let p2_min = (p2.x as f64 - half * nx, p2.y as f64 - half * ny);
    let p2_max = (p2.x as f64 + half * nx, p2.y as f64 + half * ny);

    let p1_vec = (p1_max.0 - p1_min.0, p1_max.1 - p1_min.1);
    let p2_vec = (p2_max.0 - p2_min.0, p2_max.1 - p2_min.1);

    let edge_len = ((p1_min.0 - p1_max.0).powi(2) + (p1_min.1 - p1_max.1).powi(2)).sqrt();
    let length = edge_len.round().max(1.0) as i64;

    for i in 0..length {
        let t = i as f64 / length as f64;
        let a = Point2i::new((p1_min.0 + p1_vec.0 * t).round() as i64, (p1_min.1 + p1_vec.1 * t).round() as i64);
        let b = Point2i::new((p2_min.0 + p2_vec.0 * t).round() as i64, (p2_min.1 + p2_vec.1 * t).round() as i64);
        thin_line(blob, a, b);
    }
}

/// Draws a line from `p1` to `p2` of `color` and `thickness`, returning a
/// `SparseView` overlay atop `parent`.
pub fn draw_line(parent: Arc<dyn View>, p1: Point2i, p2: Point2i, color: Vec<u8>, thickness: i64) -> SparseView {
    let mut blob = UniformBlob::new(color);
    line_points(&mut blob, p1, p2, thickness);
    SparseView::with_blob(parent, blob)
}

/// Draws a circle of `radius` centered at `center`, by tracing thick line
/// segments around the circumference at an angular step derived from
/// `max_segment_length` (§4.7).
pub fn draw_circle(parent: Arc<dyn View>, center: Point2i, radius: f64, color: Vec<u8>, thickness: i64, max_segment_length: f64) -> SparseView {
    let mut blob = UniformBlob::new(color);
    let angle_step = (max_segment_length / radius).atan() + 0.1;

    let mut angle = 0.0_f64;
    let mut start = Point2i::new((angle.cos() * radius + center.x as f64).round() as i64, (angle.sin() * radius + center.y as f64).round() as i64);

    while angle < std::f64::consts::TAU {
        angle += angle_step;
        let end = Point2i::new((angle.cos() * radius + center.x as f64).round() as i64, (angle.sin() * radius + center.y as f64).round() as i64);
        line_points(&mut blob, start, end, thickness);
        start = end;
    }

    SparseView::with_blob(parent, blob)
}

/// Draws a rectangle. `thickness < 0` fills `bbox.expand(thickness/2)`;
/// otherwise draws the four edges as thick lines TL -> TR -> BR -> BL -> TL.
pub fn draw_rectangle(parent: Arc<dyn View>, bbox: Rect2i, color: Vec<u8>, thickness: i64) -> SparseView {
    let mut blob = UniformBlob::new(color);
    if thickness < 0 {
        fill_rect(&mut blob, bbox.expand(thickness / 2));
    } else {
        let tl = Point2i::new(bbox.min_x, bbox.min_y);
        let tr = Point2i::new(bbox.max_x() - 1, bbox.min_y);
        let br = Point2i::new(bbox.max_x() - 1, bbox.max_y() - 1);
        let bl = Point2i::new(bbox.min_x, bbox.max_y() - 1);
        for (a, b) in [(tl, tr), (tr, br), (br, bl), (bl, tl)] {
            line_points(&mut blob, a, b, thickness.max(1));
        }
    }
    SparseView::with_blob(parent, blob)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryView;
    use terra_core::channel::ChannelKind;
    use terra_core::format::ImageFormat;
    use terra_core::pixel_format::PixelFormat;

    fn blank(cols: i64, rows: i64) -> Arc<MemoryView> {
        let fmt = ImageFormat::new(cols, rows, 1, PixelFormat::Gray, ChannelKind::U8);
        Arc::new(MemoryView::new(fmt).unwrap())
    }

    #[test]
    fn thin_line_contains_both_endpoints() {
        let overlay = draw_line(blank(10, 10), Point2i::new(1, 1), Point2i::new(6, 4), vec![255], 1);
        let mut out = [0u8; 1];
        overlay.sample(1, 1, 0, &mut out).unwrap();
        assert_eq!(out, [255]);
        overlay.sample(6, 4, 0, &mut out).unwrap();
        assert_eq!(out, [255]);
    }

    #[test]
    fn axis_aligned_line_fills_box() {
        let overlay = draw_line(blank(10, 10), Point2i::new(2, 2), Point2i::new(2, 5), vec![1], 1);
        let mut out = [0u8; 1];
        for y in 2..=5 {
            overlay.sample(2, y, 0, &mut out).unwrap();
            assert_eq!(out, [1]);
        }
    }

    #[test]
    fn rectangle_negative_thickness_fills() {
        let overlay = draw_rectangle(blank(10, 10), Rect2i::new(2, 2, 4, 4), vec![7], -2);
        let mut out = [0u8; 1];
        overlay.sample(3, 3, 0, &mut out).unwrap();
        assert_eq!(out, [7]);
    }
}
