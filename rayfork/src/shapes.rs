//! 2D shape drawing: primitive decomposition into the device emitter.
//!
//! Every drawer reserves a conservative vertex count through the buffer
//! predicate before emitting, so a primitive never straddles a flush.
//! Rectangle-family fills sample the context's shapes texture; the other
//! primitives emit untextured triangles or lines.

use std::f32::consts::PI;

use glam::Vec2;
use rayfork_assets::{Color, Rect};

use crate::context::Context;
use crate::device::DrawMode;

/// Maximum pixel error of circle tessellation.
pub const CIRCLE_ERROR_RATE: f32 = 0.5;
/// Fixed subdivision count for bezier lines.
pub const BEZIER_LINE_DIVISIONS: u32 = 24;

/// Adaptive segment count for an arc of `sweep` degrees at `radius`.
fn arc_segments(radius: f32, sweep: f32) -> u32 {
    // Angle step that keeps the chord within the error rate
    let th = (2.0 * (1.0 - CIRCLE_ERROR_RATE / radius.max(CIRCLE_ERROR_RATE)).powi(2) - 1.0)
        .clamp(-1.0, 1.0)
        .acos();
    let per_circle = (2.0 * PI / th).ceil();
    ((sweep.abs() * per_circle / 360.0) as u32).max(4)
}

fn cubic_ease_in_out(t: f32) -> f32 {
    if t < 0.5 {
        4.0 * t * t * t
    } else {
        1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
    }
}

impl Context {
    pub fn draw_pixel(&mut self, position: Vec2, color: Color) {
        self.reserve(2);
        self.device.begin(DrawMode::Lines);
        self.vertex_color(color);
        self.device.vertex2f(position.x, position.y);
        self.device.vertex2f(position.x + 1.0, position.y + 1.0);
        self.device.end();
    }

    pub fn draw_line(&mut self, start: Vec2, end: Vec2, color: Color) {
        self.reserve(2);
        self.device.begin(DrawMode::Lines);
        self.vertex_color(color);
        self.device.vertex2f(start.x, start.y);
        self.device.vertex2f(end.x, end.y);
        self.device.end();
    }

    /// Thick line: rotated onto the x axis and drawn as a `length x thick`
    /// quad.
    pub fn draw_line_ex(&mut self, start: Vec2, end: Vec2, thick: f32, color: Color) {
        let delta = end - start;
        let length = delta.length();
        if length == 0.0 {
            return;
        }
        let angle = delta.y.atan2(delta.x).to_degrees();

        self.reserve(4);
        self.device.push_matrix();
        self.device.translatef(start.x, start.y, 0.0);
        self.device.rotatef(angle, 0.0, 0.0, 1.0);
        self.device.translatef(0.0, -thick / 2.0, 0.0);

        self.device.begin(DrawMode::Quads);
        self.vertex_color(color);
        self.device.normal3f(0.0, 0.0, 1.0);
        self.device.vertex2f(0.0, 0.0);
        self.device.vertex2f(0.0, thick);
        self.device.vertex2f(length, thick);
        self.device.vertex2f(length, 0.0);
        self.device.end();
        self.device.pop_matrix();
    }

    pub fn draw_line_strip(&mut self, points: &[Vec2], color: Color) {
        if points.len() < 2 {
            return;
        }
        self.reserve(points.len() * 2);
        self.device.begin(DrawMode::Lines);
        self.vertex_color(color);
        for pair in points.windows(2) {
            self.device.vertex2f(pair[0].x, pair[0].y);
            self.device.vertex2f(pair[1].x, pair[1].y);
        }
        self.device.end();
    }

    /// Cubic-eased bezier approximation: straight interpolation on x, an
    /// ease-in-out on y, drawn as thick segments.
    pub fn draw_line_bezier(&mut self, start: Vec2, end: Vec2, thick: f32, color: Color) {
        let mut previous = start;
        for i in 1..=BEZIER_LINE_DIVISIONS {
            let t = i as f32 / BEZIER_LINE_DIVISIONS as f32;
            let current = Vec2::new(
                start.x + t * (end.x - start.x),
                start.y + cubic_ease_in_out(t) * (end.y - start.y),
            );
            self.draw_line_ex(previous, current, thick, color);
            previous = current;
        }
    }

    pub fn draw_circle(&mut self, center: Vec2, radius: f32, color: Color) {
        self.draw_circle_sector(center, radius, 0.0, 360.0, 0, color);
    }

    /// Triangle fan from the center. `segments == 0` picks the adaptive
    /// count from the error-rate heuristic.
    pub fn draw_circle_sector(
        &mut self,
        center: Vec2,
        radius: f32,
        start_angle: f32,
        end_angle: f32,
        segments: u32,
        color: Color,
    ) {
        if radius <= 0.0 || start_angle == end_angle {
            return;
        }
        let (start_angle, end_angle) = if start_angle > end_angle {
            (end_angle, start_angle)
        } else {
            (start_angle, end_angle)
        };
        let segments = if segments < 4 {
            arc_segments(radius, end_angle - start_angle)
        } else {
            segments
        };
        let step = (end_angle - start_angle) / segments as f32;

        self.reserve(3 * segments as usize);
        self.device.begin(DrawMode::Triangles);
        self.vertex_color(color);
        let mut angle = start_angle;
        for _ in 0..segments {
            self.device.vertex2f(center.x, center.y);
            self.device.vertex2f(
                center.x + angle.to_radians().sin() * radius,
                center.y + angle.to_radians().cos() * radius,
            );
            self.device.vertex2f(
                center.x + (angle + step).to_radians().sin() * radius,
                center.y + (angle + step).to_radians().cos() * radius,
            );
            angle += step;
        }
        self.device.end();
    }

    pub fn draw_circle_sector_lines(
        &mut self,
        center: Vec2,
        radius: f32,
        start_angle: f32,
        end_angle: f32,
        segments: u32,
        color: Color,
    ) {
        if radius <= 0.0 || start_angle == end_angle {
            return;
        }
        let (start_angle, end_angle) = if start_angle > end_angle {
            (end_angle, start_angle)
        } else {
            (start_angle, end_angle)
        };
        let segments = if segments < 4 {
            arc_segments(radius, end_angle - start_angle)
        } else {
            segments
        };
        let step = (end_angle - start_angle) / segments as f32;

        self.reserve((segments as usize + 2) * 2);
        self.device.begin(DrawMode::Lines);
        self.vertex_color(color);

        // Radius edges close the pie slice on partial sweeps
        let full_circle = (end_angle - start_angle).abs() >= 360.0;
        if !full_circle {
            self.device.vertex2f(center.x, center.y);
            self.device.vertex2f(
                center.x + start_angle.to_radians().sin() * radius,
                center.y + start_angle.to_radians().cos() * radius,
            );
        }
        let mut angle = start_angle;
        for _ in 0..segments {
            self.device.vertex2f(
                center.x + angle.to_radians().sin() * radius,
                center.y + angle.to_radians().cos() * radius,
            );
            self.device.vertex2f(
                center.x + (angle + step).to_radians().sin() * radius,
                center.y + (angle + step).to_radians().cos() * radius,
            );
            angle += step;
        }
        if !full_circle {
            self.device.vertex2f(
                center.x + end_angle.to_radians().sin() * radius,
                center.y + end_angle.to_radians().cos() * radius,
            );
            self.device.vertex2f(center.x, center.y);
        }
        self.device.end();
    }

    pub fn draw_circle_lines(&mut self, center: Vec2, radius: f32, color: Color) {
        self.draw_circle_sector_lines(center, radius, 0.0, 360.0, 0, color);
    }

    /// Radial gradient fan: `inner` at the center, `outer` on the rim.
    pub fn draw_circle_gradient(
        &mut self,
        center: Vec2,
        radius: f32,
        inner: Color,
        outer: Color,
    ) {
        let segments = arc_segments(radius, 360.0);
        let step = 360.0 / segments as f32;

        self.reserve(3 * segments as usize);
        self.device.begin(DrawMode::Triangles);
        let mut angle = 0.0f32;
        for _ in 0..segments {
            self.vertex_color(inner);
            self.device.vertex2f(center.x, center.y);
            self.vertex_color(outer);
            self.device.vertex2f(
                center.x + angle.to_radians().sin() * radius,
                center.y + angle.to_radians().cos() * radius,
            );
            self.device.vertex2f(
                center.x + (angle + step).to_radians().sin() * radius,
                center.y + (angle + step).to_radians().cos() * radius,
            );
            angle += step;
        }
        self.device.end();
    }

    /// Two parallel arcs connected by quads.
    pub fn draw_ring(
        &mut self,
        center: Vec2,
        inner_radius: f32,
        outer_radius: f32,
        start_angle: f32,
        end_angle: f32,
        segments: u32,
        color: Color,
    ) {
        let (inner_radius, outer_radius) = if inner_radius > outer_radius {
            (outer_radius, inner_radius)
        } else {
            (inner_radius, outer_radius)
        };
        if outer_radius <= 0.0 || start_angle == end_angle {
            return;
        }
        if inner_radius <= 0.0 {
            return self.draw_circle_sector(
                center,
                outer_radius,
                start_angle,
                end_angle,
                segments,
                color,
            );
        }
        let (start_angle, end_angle) = if start_angle > end_angle {
            (end_angle, start_angle)
        } else {
            (start_angle, end_angle)
        };
        let segments = if segments < 4 {
            arc_segments(outer_radius, end_angle - start_angle)
        } else {
            segments
        };
        let step = (end_angle - start_angle) / segments as f32;

        self.reserve(4 * segments as usize);
        self.device.begin(DrawMode::Quads);
        self.vertex_color(color);
        let mut angle = start_angle;
        for _ in 0..segments {
            let (s0, c0) = angle.to_radians().sin_cos();
            let (s1, c1) = (angle + step).to_radians().sin_cos();
            self.device
                .vertex2f(center.x + s0 * inner_radius, center.y + c0 * inner_radius);
            self.device
                .vertex2f(center.x + s0 * outer_radius, center.y + c0 * outer_radius);
            self.device
                .vertex2f(center.x + s1 * outer_radius, center.y + c1 * outer_radius);
            self.device
                .vertex2f(center.x + s1 * inner_radius, center.y + c1 * inner_radius);
            angle += step;
        }
        self.device.end();
    }

    pub fn draw_ring_lines(
        &mut self,
        center: Vec2,
        inner_radius: f32,
        outer_radius: f32,
        start_angle: f32,
        end_angle: f32,
        segments: u32,
        color: Color,
    ) {
        let (inner_radius, outer_radius) = if inner_radius > outer_radius {
            (outer_radius, inner_radius)
        } else {
            (inner_radius, outer_radius)
        };
        if outer_radius <= 0.0 || start_angle == end_angle {
            return;
        }
        let (start_angle, end_angle) = if start_angle > end_angle {
            (end_angle, start_angle)
        } else {
            (start_angle, end_angle)
        };
        let segments = if segments < 4 {
            arc_segments(outer_radius, end_angle - start_angle)
        } else {
            segments
        };
        let step = (end_angle - start_angle) / segments as f32;
        let full_circle = (end_angle - start_angle).abs() >= 360.0;

        self.reserve((segments as usize * 2 + 2) * 2);
        self.device.begin(DrawMode::Lines);
        self.vertex_color(color);
        if !full_circle {
            // Connect the two arcs at both ends of the sweep
            for a in [start_angle, end_angle] {
                let (s, c) = a.to_radians().sin_cos();
                self.device
                    .vertex2f(center.x + s * inner_radius, center.y + c * inner_radius);
                self.device
                    .vertex2f(center.x + s * outer_radius, center.y + c * outer_radius);
            }
        }
        let mut angle = start_angle;
        for _ in 0..segments {
            for r in [inner_radius, outer_radius] {
                self.device.vertex2f(
                    center.x + angle.to_radians().sin() * r,
                    center.y + angle.to_radians().cos() * r,
                );
                self.device.vertex2f(
                    center.x + (angle + step).to_radians().sin() * r,
                    center.y + (angle + step).to_radians().cos() * r,
                );
            }
            angle += step;
        }
        self.device.end();
    }

    pub fn draw_rectangle(&mut self, rect: Rect, color: Color) {
        self.draw_rectangle_pro(rect, Vec2::ZERO, 0.0, color);
    }

    /// Rotated rectangle around `origin`, filled with the shapes texture.
    pub fn draw_rectangle_pro(&mut self, rect: Rect, origin: Vec2, rotation: f32, color: Color) {
        let tex = self.shapes_texture;
        let src = self.shapes_texture_rect;
        let (tw, th) = (tex.width as f32, tex.height as f32);

        self.reserve(4);
        self.device.push_matrix();
        self.device.translatef(rect.x, rect.y, 0.0);
        self.device.rotatef(rotation, 0.0, 0.0, 1.0);
        self.device.translatef(-origin.x, -origin.y, 0.0);

        self.device.enable_texture(tex.id);
        self.device.begin(DrawMode::Quads);
        self.vertex_color(color);
        self.device.normal3f(0.0, 0.0, 1.0);

        self.device.tex_coord2f(src.x / tw, src.y / th);
        self.device.vertex2f(0.0, 0.0);
        self.device.tex_coord2f(src.x / tw, (src.y + src.height) / th);
        self.device.vertex2f(0.0, rect.height);
        self.device
            .tex_coord2f((src.x + src.width) / tw, (src.y + src.height) / th);
        self.device.vertex2f(rect.width, rect.height);
        self.device.tex_coord2f((src.x + src.width) / tw, src.y / th);
        self.device.vertex2f(rect.width, 0.0);

        self.device.end();
        self.device.disable_texture();
        self.device.pop_matrix();
    }

    /// Four-corner gradient fill, one color per vertex.
    pub fn draw_rectangle_gradient_ex(
        &mut self,
        rect: Rect,
        top_left: Color,
        bottom_left: Color,
        bottom_right: Color,
        top_right: Color,
    ) {
        let tex = self.shapes_texture;
        let src = self.shapes_texture_rect;
        let (tw, th) = (tex.width as f32, tex.height as f32);

        self.reserve(4);
        self.device.enable_texture(tex.id);
        self.device.begin(DrawMode::Quads);
        self.device.normal3f(0.0, 0.0, 1.0);

        self.vertex_color(top_left);
        self.device.tex_coord2f(src.x / tw, src.y / th);
        self.device.vertex2f(rect.x, rect.y);
        self.vertex_color(bottom_left);
        self.device.tex_coord2f(src.x / tw, (src.y + src.height) / th);
        self.device.vertex2f(rect.x, rect.y + rect.height);
        self.vertex_color(bottom_right);
        self.device
            .tex_coord2f((src.x + src.width) / tw, (src.y + src.height) / th);
        self.device.vertex2f(rect.x + rect.width, rect.y + rect.height);
        self.vertex_color(top_right);
        self.device.tex_coord2f((src.x + src.width) / tw, src.y / th);
        self.device.vertex2f(rect.x + rect.width, rect.y);

        self.device.end();
        self.device.disable_texture();
    }

    pub fn draw_rectangle_gradient_v(&mut self, rect: Rect, top: Color, bottom: Color) {
        self.draw_rectangle_gradient_ex(rect, top, bottom, bottom, top);
    }

    pub fn draw_rectangle_gradient_h(&mut self, rect: Rect, left: Color, right: Color) {
        self.draw_rectangle_gradient_ex(rect, left, left, right, right);
    }

    /// Outline as four thin rectangles.
    pub fn draw_rectangle_outline(&mut self, rect: Rect, thickness: f32, color: Color) {
        let t = thickness.max(1.0);
        self.draw_rectangle(Rect::new(rect.x, rect.y, rect.width, t), color);
        self.draw_rectangle(
            Rect::new(rect.x, rect.y + rect.height - t, rect.width, t),
            color,
        );
        self.draw_rectangle(
            Rect::new(rect.x, rect.y + t, t, rect.height - 2.0 * t),
            color,
        );
        self.draw_rectangle(
            Rect::new(rect.x + rect.width - t, rect.y + t, t, rect.height - 2.0 * t),
            color,
        );
    }

    /// Rounded rectangle: four quarter-circle fans plus five interior
    /// rectangles.
    ///
    /// ```text
    ///       P0 ________________ P1
    ///       /|                |\
    ///      /1|       [5]      |2\
    ///  P7 /__|________________|__\ P2
    ///     |  |C0            C1|  |
    ///     |[8]      [9]      [6] |
    ///  P6 \__|C3____________C2|__/ P3
    ///      \7|       [7]      |4/
    ///       \|________________|/
    ///       P5                P4
    /// ```
    /// `C0..C3` are the corner-arc centers; the numbered regions are the
    /// four corner fans and five quads, emitted in that order.
    pub fn draw_rectangle_rounded(
        &mut self,
        rect: Rect,
        roundness: f32,
        segments: u32,
        color: Color,
    ) {
        if roundness <= 0.0 || rect.width < 1.0 || rect.height < 1.0 {
            return self.draw_rectangle(rect, color);
        }
        let roundness = roundness.min(1.0);
        let radius = rect.width.min(rect.height) * roundness / 2.0;
        if radius <= 0.0 {
            return;
        }
        let segments = if segments < 4 {
            arc_segments(radius, 90.0)
        } else {
            segments
        };

        let (x, y, w, h) = (rect.x, rect.y, rect.width, rect.height);
        // Corner-arc centers, clockwise from top-left
        let centers = [
            Vec2::new(x + radius, y + radius),
            Vec2::new(x + w - radius, y + radius),
            Vec2::new(x + w - radius, y + h - radius),
            Vec2::new(x + radius, y + h - radius),
        ];
        // Each corner sweeps 90 degrees starting at its base angle
        let base_angles = [180.0f32, 270.0, 0.0, 90.0];

        // Corner fans
        self.reserve(4 * 3 * segments as usize);
        self.device.begin(DrawMode::Triangles);
        self.vertex_color(color);
        for (center, base) in centers.iter().zip(base_angles) {
            let step = 90.0 / segments as f32;
            let mut angle = base;
            for _ in 0..segments {
                self.device.vertex2f(center.x, center.y);
                self.device.vertex2f(
                    center.x + angle.to_radians().cos() * radius,
                    center.y + angle.to_radians().sin() * radius,
                );
                self.device.vertex2f(
                    center.x + (angle + step).to_radians().cos() * radius,
                    center.y + (angle + step).to_radians().sin() * radius,
                );
                angle += step;
            }
        }
        self.device.end();

        // Interior: top, bottom, left, right and center rectangles
        self.draw_rectangle(
            Rect::new(x + radius, y, w - 2.0 * radius, radius),
            color,
        );
        self.draw_rectangle(
            Rect::new(x + radius, y + h - radius, w - 2.0 * radius, radius),
            color,
        );
        self.draw_rectangle(
            Rect::new(x, y + radius, radius, h - 2.0 * radius),
            color,
        );
        self.draw_rectangle(
            Rect::new(x + w - radius, y + radius, radius, h - 2.0 * radius),
            color,
        );
        self.draw_rectangle(
            Rect::new(x + radius, y + radius, w - 2.0 * radius, h - 2.0 * radius),
            color,
        );
    }

    /// Rounded-rectangle outline: four arcs and four straight edges.
    pub fn draw_rectangle_rounded_lines(
        &mut self,
        rect: Rect,
        roundness: f32,
        segments: u32,
        color: Color,
    ) {
        if roundness <= 0.0 {
            return self.draw_rectangle_outline(rect, 1.0, color);
        }
        let roundness = roundness.min(1.0);
        let radius = rect.width.min(rect.height) * roundness / 2.0;
        let segments = if segments < 4 {
            arc_segments(radius, 90.0)
        } else {
            segments
        };

        let (x, y, w, h) = (rect.x, rect.y, rect.width, rect.height);
        let centers = [
            Vec2::new(x + radius, y + radius),
            Vec2::new(x + w - radius, y + radius),
            Vec2::new(x + w - radius, y + h - radius),
            Vec2::new(x + radius, y + h - radius),
        ];
        let base_angles = [180.0f32, 270.0, 0.0, 90.0];

        self.reserve((4 * segments as usize + 4) * 2);
        self.device.begin(DrawMode::Lines);
        self.vertex_color(color);
        for (center, base) in centers.iter().zip(base_angles) {
            let step = 90.0 / segments as f32;
            let mut angle = base;
            for _ in 0..segments {
                self.device.vertex2f(
                    center.x + angle.to_radians().cos() * radius,
                    center.y + angle.to_radians().sin() * radius,
                );
                self.device.vertex2f(
                    center.x + (angle + step).to_radians().cos() * radius,
                    center.y + (angle + step).to_radians().sin() * radius,
                );
                angle += step;
            }
        }
        // Straight edges between the arcs
        for (a, b) in [
            (Vec2::new(x + radius, y), Vec2::new(x + w - radius, y)),
            (Vec2::new(x + radius, y + h), Vec2::new(x + w - radius, y + h)),
            (Vec2::new(x, y + radius), Vec2::new(x, y + h - radius)),
            (Vec2::new(x + w, y + radius), Vec2::new(x + w, y + h - radius)),
        ] {
            self.device.vertex2f(a.x, a.y);
            self.device.vertex2f(b.x, b.y);
        }
        self.device.end();
    }

    pub fn draw_triangle(&mut self, v1: Vec2, v2: Vec2, v3: Vec2, color: Color) {
        self.reserve(3);
        self.device.begin(DrawMode::Triangles);
        self.vertex_color(color);
        self.device.vertex2f(v1.x, v1.y);
        self.device.vertex2f(v2.x, v2.y);
        self.device.vertex2f(v3.x, v3.y);
        self.device.end();
    }

    pub fn draw_triangle_lines(&mut self, v1: Vec2, v2: Vec2, v3: Vec2, color: Color) {
        self.reserve(6);
        self.device.begin(DrawMode::Lines);
        self.vertex_color(color);
        for (a, b) in [(v1, v2), (v2, v3), (v3, v1)] {
            self.device.vertex2f(a.x, a.y);
            self.device.vertex2f(b.x, b.y);
        }
        self.device.end();
    }

    /// Fan around `points[0]`.
    pub fn draw_triangle_fan(&mut self, points: &[Vec2], color: Color) {
        if points.len() < 3 {
            return;
        }
        self.reserve((points.len() - 2) * 3);
        self.device.begin(DrawMode::Triangles);
        self.vertex_color(color);
        for i in 1..points.len() - 1 {
            self.device.vertex2f(points[0].x, points[0].y);
            self.device.vertex2f(points[i].x, points[i].y);
            self.device.vertex2f(points[i + 1].x, points[i + 1].y);
        }
        self.device.end();
    }

    /// Strip with winding alternated every other triangle.
    pub fn draw_triangle_strip(&mut self, points: &[Vec2], color: Color) {
        if points.len() < 3 {
            return;
        }
        self.reserve((points.len() - 2) * 3);
        self.device.begin(DrawMode::Triangles);
        self.vertex_color(color);
        for i in 2..points.len() {
            if i % 2 == 0 {
                self.device.vertex2f(points[i].x, points[i].y);
                self.device.vertex2f(points[i - 2].x, points[i - 2].y);
                self.device.vertex2f(points[i - 1].x, points[i - 1].y);
            } else {
                self.device.vertex2f(points[i].x, points[i].y);
                self.device.vertex2f(points[i - 1].x, points[i - 1].y);
                self.device.vertex2f(points[i - 2].x, points[i - 2].y);
            }
        }
        self.device.end();
    }

    /// Regular polygon fan around `center`.
    pub fn draw_poly(
        &mut self,
        center: Vec2,
        sides: u32,
        radius: f32,
        rotation: f32,
        color: Color,
    ) {
        let sides = sides.max(3);
        let step = 360.0 / sides as f32;

        self.reserve(3 * sides as usize);
        self.device.push_matrix();
        self.device.translatef(center.x, center.y, 0.0);
        self.device.rotatef(rotation, 0.0, 0.0, 1.0);

        self.device.begin(DrawMode::Triangles);
        self.vertex_color(color);
        let mut angle = 0.0f32;
        for _ in 0..sides {
            self.device.vertex2f(0.0, 0.0);
            self.device.vertex2f(
                angle.to_radians().sin() * radius,
                angle.to_radians().cos() * radius,
            );
            self.device.vertex2f(
                (angle + step).to_radians().sin() * radius,
                (angle + step).to_radians().cos() * radius,
            );
            angle += step;
        }
        self.device.end();
        self.device.pop_matrix();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Context;
    use crate::device::RecordingDevice;

    fn test_context() -> Context {
        Context::new(Box::new(RecordingDevice::new()), 800, 600).unwrap()
    }

    #[test]
    fn test_arc_segments_floor_is_four() {
        assert_eq!(arc_segments(0.5, 10.0), 4);
        assert!(arc_segments(100.0, 360.0) > 4);
        // Larger radii need more segments for the same error rate
        assert!(arc_segments(200.0, 360.0) > arc_segments(20.0, 360.0));
    }

    #[test]
    fn test_cubic_ease_endpoints() {
        assert_eq!(cubic_ease_in_out(0.0), 0.0);
        assert!((cubic_ease_in_out(0.5) - 0.5).abs() < 1e-6);
        assert!((cubic_ease_in_out(1.0) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_circle_sector_vertex_count() {
        let mut context = test_context();
        context.draw_circle_sector(Vec2::new(10.0, 10.0), 5.0, 0.0, 90.0, 8, Color::RED);
        context.end();

        let device = context.into_recording();
        assert_eq!(device.draws.len(), 1);
        assert_eq!(device.draws[0].vertices.len(), 3 * 8);
    }

    #[test]
    fn test_rectangle_emits_one_quad_with_shapes_texture() {
        let mut context = test_context();
        let shapes_id = context.shapes_texture.id;
        context.draw_rectangle(Rect::new(10.0, 20.0, 30.0, 40.0), Color::BLUE);
        context.end();

        let device = context.into_recording();
        assert_eq!(device.draws[0].vertices.len(), 4);
        assert!(device
            .calls
            .iter()
            .any(|c| *c == format!("enable_texture {}", shapes_id)));
        assert_eq!(device.draws[0].vertices[0].color, [0, 121, 241, 255]);
    }

    #[test]
    fn test_gradient_rect_has_per_vertex_colors() {
        let mut context = test_context();
        context.draw_rectangle_gradient_v(
            Rect::new(0.0, 0.0, 10.0, 10.0),
            Color::WHITE,
            Color::BLACK,
        );
        context.end();

        let device = context.into_recording();
        let v = &device.draws[0].vertices;
        assert_eq!(v[0].color, [255, 255, 255, 255]); // top-left
        assert_eq!(v[1].color, [0, 0, 0, 255]); // bottom-left
        assert_eq!(v[3].color, [255, 255, 255, 255]); // top-right
    }

    #[test]
    fn test_ring_vertex_count() {
        let mut context = test_context();
        context.draw_ring(Vec2::ZERO, 4.0, 8.0, 0.0, 180.0, 6, Color::GOLD);
        context.end();

        let device = context.into_recording();
        assert_eq!(device.draws[0].vertices.len(), 4 * 6);
    }

    #[test]
    fn test_line_ex_uses_matrix_stack() {
        let mut context = test_context();
        context.draw_line_ex(Vec2::new(0.0, 0.0), Vec2::new(10.0, 0.0), 2.0, Color::RED);
        context.end();

        let device = context.into_recording();
        assert_eq!(device.draws[0].vertices.len(), 4);
        assert!(device.calls.iter().any(|c| c == "push_matrix"));
        assert!(device.calls.iter().any(|c| c == "pop_matrix"));
    }

    #[test]
    fn test_bezier_divides_into_24_segments() {
        let mut context = test_context();
        context.draw_line_bezier(Vec2::ZERO, Vec2::new(100.0, 50.0), 2.0, Color::RED);
        context.end();

        let device = context.into_recording();
        // 24 thick segments, 4 vertices each
        assert_eq!(device.draws[0].vertices.len(), 24 * 4);
    }

    #[test]
    fn test_triangle_strip_vertex_count() {
        let mut context = test_context();
        let points = [
            Vec2::new(0.0, 0.0),
            Vec2::new(0.0, 1.0),
            Vec2::new(1.0, 0.0),
            Vec2::new(1.0, 1.0),
            Vec2::new(2.0, 0.0),
        ];
        context.draw_triangle_strip(&points, Color::LIME);
        context.end();

        let device = context.into_recording();
        assert_eq!(device.draws[0].vertices.len(), 3 * 3);
    }

    #[test]
    fn test_rounded_rectangle_regions() {
        let mut context = test_context();
        context.draw_rectangle_rounded(
            Rect::new(0.0, 0.0, 100.0, 60.0),
            0.5,
            4,
            Color::MAROON,
        );
        context.end();

        let device = context.into_recording();
        // 4 corners x 4 segments x 3 verts, plus 5 interior quads
        let total: usize = device.draws.iter().map(|d| d.vertices.len()).sum();
        assert_eq!(total, 4 * 4 * 3 + 5 * 4);
    }

    #[test]
    fn test_degenerate_shapes_emit_nothing() {
        let mut context = test_context();
        context.draw_circle_sector(Vec2::ZERO, 0.0, 0.0, 90.0, 0, Color::RED);
        context.draw_line_ex(Vec2::ONE, Vec2::ONE, 3.0, Color::RED);
        context.draw_triangle_fan(&[Vec2::ZERO, Vec2::ONE], Color::RED);
        context.end();

        let device = context.into_recording();
        assert!(device.draws.is_empty());
    }
}
