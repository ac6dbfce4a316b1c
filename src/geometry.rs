//! Boundary intersection math for entity shapes.
//!
//! Everything here is pure and allocation free. Degenerate input never
//! panics: the functions fall back to the shape center.

use eframe::egui;

/// Where the ray from `line_start` toward `line_end` leaves the ellipse
/// centered at `(center_x, center_y)` with radii `radius_x`/`radius_y`.
///
/// The positive root of the ray/ellipse quadratic is used (the smallest one
/// when the start lies outside). When both roots are behind the start the
/// root closest to it is returned. A zero-length direction, a zero radius or
/// a miss returns the center.
#[allow(clippy::too_many_arguments)]
pub fn circle_edge_intersection(
    center_x: f32,
    center_y: f32,
    radius_x: f32,
    radius_y: f32,
    line_start_x: f32,
    line_start_y: f32,
    line_end_x: f32,
    line_end_y: f32,
) -> egui::Pos2 {
    let center = egui::pos2(center_x, center_y);
    if radius_x <= 0.0 || radius_y <= 0.0 {
        return center;
    }

    let (cx, cy) = (center_x as f64, center_y as f64);
    let (rx2, ry2) = ((radius_x as f64).powi(2), (radius_y as f64).powi(2));
    let (sx, sy) = (line_start_x as f64, line_start_y as f64);
    let mut dx = line_end_x as f64 - sx;
    let mut dy = line_end_y as f64 - sy;
    let len = (dx * dx + dy * dy).sqrt();
    if len > 0.0 {
        dx /= len;
        dy /= len;
    }

    let ox = sx - cx;
    let oy = sy - cy;
    let a = dx * dx / rx2 + dy * dy / ry2;
    let b = 2.0 * (ox * dx / rx2 + oy * dy / ry2);
    let c = ox * ox / rx2 + oy * oy / ry2 - 1.0;
    let discriminant = b * b - 4.0 * a * c;
    if a <= f64::EPSILON || discriminant < 0.0 {
        return center;
    }

    let root = discriminant.sqrt();
    let t1 = (-b - root) / (2.0 * a);
    let t2 = (-b + root) / (2.0 * a);
    let t = if t1 > 0.0 {
        t1
    } else if t2 > 0.0 {
        t2
    } else {
        t1.max(t2)
    };

    egui::pos2((sx + t * dx) as f32, (sy + t * dy) as f32)
}

/// Where the segment `line_start..line_end` crosses the border of the
/// rectangle. Of all crossings the one closest to `line_end` (largest `t`)
/// wins. No crossing returns the rectangle center.
#[allow(clippy::too_many_arguments)]
pub fn rectangle_edge_intersection(
    left: f32,
    top: f32,
    width: f32,
    height: f32,
    line_start_x: f32,
    line_start_y: f32,
    line_end_x: f32,
    line_end_y: f32,
) -> egui::Pos2 {
    let (l, t, w, h) = (left as f64, top as f64, width as f64, height as f64);
    let (r, b) = (l + w, t + h);
    let (sx, sy) = (line_start_x as f64, line_start_y as f64);
    let dx = line_end_x as f64 - sx;
    let dy = line_end_y as f64 - sy;
    const EPS: f64 = 1e-9;

    let mut best: Option<(f64, f64, f64)> = None;
    let mut consider = |param: f64, x: f64, y: f64| {
        if !(-EPS..=1.0 + EPS).contains(&param) {
            return;
        }
        if x < l - EPS || x > r + EPS || y < t - EPS || y > b + EPS {
            return;
        }
        if best.is_none_or(|(bt, _, _)| param > bt) {
            best = Some((param, x, y));
        }
    };

    if dx.abs() > EPS {
        for edge_x in [l, r] {
            let param = (edge_x - sx) / dx;
            consider(param, edge_x, sy + param * dy);
        }
    }
    if dy.abs() > EPS {
        for edge_y in [t, b] {
            let param = (edge_y - sy) / dy;
            consider(param, sx + param * dx, edge_y);
        }
    }

    match best {
        Some((_, x, y)) => egui::pos2(x as f32, y as f32),
        None => egui::pos2((l + w * 0.5) as f32, (t + h * 0.5) as f32),
    }
}

pub fn distance_to_segment(p: egui::Pos2, a: egui::Pos2, b: egui::Pos2) -> f32 {
    let ab = b - a;
    let ap = p - a;
    let ab_len2 = ab.x * ab.x + ab.y * ab.y;
    if ab_len2 <= f32::EPSILON {
        return (p - a).length();
    }
    let t = (ap.x * ab.x + ap.y * ab.y) / ab_len2;
    let t = t.clamp(0.0, 1.0);
    let closest = a + ab * t;
    (p - closest).length()
}

/// Perpendicular distance from `p` to the infinite line through `a` and
/// `b`; plain point distance when the two coincide.
pub fn distance_to_line(p: egui::Pos2, a: egui::Pos2, b: egui::Pos2) -> f32 {
    let ab = b - a;
    let len = ab.length();
    if len <= f32::EPSILON {
        return (p - a).length();
    }
    let ap = p - a;
    (ab.x * ap.y - ab.y * ap.x).abs() / len
}

pub fn midpoint(a: egui::Pos2, b: egui::Pos2) -> egui::Pos2 {
    egui::pos2((a.x + b.x) * 0.5, (a.y + b.y) * 0.5)
}

/// Angle in degrees between two direction vectors, `None` if either is zero.
pub fn angle_between_deg(v1: egui::Vec2, v2: egui::Vec2) -> Option<f32> {
    let mag1 = v1.length();
    let mag2 = v2.length();
    if mag1 == 0.0 || mag2 == 0.0 {
        return None;
    }
    let cos = ((v1.x * v2.x + v1.y * v2.y) / (mag1 * mag2)).clamp(-1.0, 1.0);
    Some(cos.acos().to_degrees())
}

pub fn segments_intersect(a1: egui::Pos2, a2: egui::Pos2, b1: egui::Pos2, b2: egui::Pos2) -> bool {
    fn orientation(a: egui::Pos2, b: egui::Pos2, c: egui::Pos2) -> f32 {
        (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x)
    }
    let d1 = orientation(b1, b2, a1);
    let d2 = orientation(b1, b2, a2);
    let d3 = orientation(a1, a2, b1);
    let d4 = orientation(a1, a2, b2);
    (d1 > 0.0) != (d2 > 0.0) && (d3 > 0.0) != (d4 > 0.0)
}

/// True if the segment touches the rectangle (either end inside or it
/// crosses one of the borders).
pub fn segment_intersects_rect(a: egui::Pos2, b: egui::Pos2, rect: egui::Rect) -> bool {
    if rect.contains(a) || rect.contains(b) {
        return true;
    }
    let corners = [
        rect.left_top(),
        rect.right_top(),
        rect.right_bottom(),
        rect.left_bottom(),
    ];
    (0..4).any(|i| segments_intersect(a, b, corners[i], corners[(i + 1) % 4]))
}
