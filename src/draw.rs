use geo::{Coord, LineString, Polygon};
use image::{GrayImage, Luma};
use imageproc::drawing::{draw_filled_circle_mut, draw_line_segment_mut, draw_polygon_mut};
use imageproc::point::Point;

pub const INK: Luma<u8> = Luma([255]);

/// Marks below half a pixel round to nothing.
const MIN_VISIBLE: f32 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Primitive {
    Dot { center: Coord<f32>, radius: f32 },
    Dash { start: Coord<f32>, end: Coord<f32>, width: f32 },
}

impl Primitive {
    /// Dash of `length` centered on `center`, oriented along `angle` radians.
    pub fn dash(center: Coord<f32>, angle: f32, length: f32, width: f32) -> Self {
        let half = Coord {
            x: angle.cos() * length / 2.0,
            y: angle.sin() * length / 2.0,
        };
        Primitive::Dash {
            start: center - half,
            end: center + half,
            width,
        }
    }

    pub fn center(&self) -> Coord<f32> {
        match *self {
            Primitive::Dot { center, .. } => center,
            Primitive::Dash { start, end, .. } => (start + end) / 2.0,
        }
    }

    /// Same mark with radius, length and width capped at `limit`.
    pub fn clamped(&self, limit: f32) -> Self {
        match *self {
            Primitive::Dot { center, radius } => Primitive::Dot {
                center,
                radius: radius.min(limit),
            },
            Primitive::Dash { start, end, width } => {
                let d = end - start;
                let length = (d.x * d.x + d.y * d.y).sqrt();
                let width = width.min(limit);
                if length <= limit {
                    return Primitive::Dash { start, end, width };
                }
                let half = d * (limit / length / 2.0);
                let center = self.center();
                Primitive::Dash {
                    start: center - half,
                    end: center + half,
                    width,
                }
            }
        }
    }

    pub fn is_visible(&self) -> bool {
        match *self {
            Primitive::Dot { radius, .. } => radius >= MIN_VISIBLE,
            Primitive::Dash { start, end, width } => {
                let d = end - start;
                (d.x * d.x + d.y * d.y).sqrt() >= MIN_VISIBLE && width > 0.0
            }
        }
    }

    /// Outline of a dash as a closed quad, `None` for dots.
    pub fn outline(&self) -> Option<Polygon<f32>> {
        let Primitive::Dash { start, end, width } = *self else {
            return None;
        };
        let d = end - start;
        let length = (d.x * d.x + d.y * d.y).sqrt();
        if length == 0.0 {
            return None;
        }
        let normal = Coord {
            x: -d.y / length * width / 2.0,
            y: d.x / length * width / 2.0,
        };
        let ring = LineString::from(vec![
            start + normal,
            end + normal,
            end - normal,
            start - normal,
        ]);
        Some(Polygon::new(ring, vec![]))
    }
}

pub trait DrawPrimitive {
    fn draw(&self, stencil: &mut GrayImage);
}

/// Convert a geo LineString into Vec<Point<i32>> suitable for imageproc
fn linestring_to_points(linestring: &LineString<f32>) -> Vec<Point<i32>> {
    let mut points: Vec<Point<i32>> = Vec::with_capacity(linestring.0.len());
    for coord in linestring.coords() {
        let point = Point::new(coord.x.round() as i32, coord.y.round() as i32);
        if points.last() != Some(&point) {
            points.push(point);
        }
    }

    // imageproc rejects polygons whose last point repeats the first
    while points.len() >= 2 && points.first() == points.last() {
        points.pop();
    }
    points
}

impl DrawPrimitive for Primitive {
    fn draw(&self, stencil: &mut GrayImage) {
        // Nothing past the canvas diagonal can add pixels.
        let (width, height) = stencil.dimensions();
        let diagonal = (width as f32).hypot(height as f32);
        let mark = self.clamped(diagonal);
        let center = mark.center();
        let reaches_canvas = center.x.is_finite()
            && center.y.is_finite()
            && (-diagonal..=width as f32 + diagonal).contains(&center.x)
            && (-diagonal..=height as f32 + diagonal).contains(&center.y);
        if !reaches_canvas || !mark.is_visible() {
            return;
        }
        match mark {
            Primitive::Dot { center, radius } => {
                let center = (center.x.round() as i32, center.y.round() as i32);
                draw_filled_circle_mut(stencil, center, radius.round() as i32, INK);
            }
            Primitive::Dash { start, end, .. } => {
                let points = mark
                    .outline()
                    .map(|outline| linestring_to_points(outline.exterior()))
                    .unwrap_or_default();
                if points.len() >= 3 {
                    draw_polygon_mut(stencil, &points, INK);
                } else {
                    // Too thin to have an interior once snapped to the grid.
                    draw_line_segment_mut(stencil, (start.x, start.y), (end.x, end.y), INK);
                }
            }
        }
    }
}

impl DrawPrimitive for [Primitive] {
    fn draw(&self, stencil: &mut GrayImage) {
        for primitive in self {
            primitive.draw(stencil);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inked(stencil: &GrayImage) -> usize {
        stencil.pixels().filter(|p| p.0[0] > 0).count()
    }

    #[test]
    fn dot_paints_a_disc() {
        let mut stencil = GrayImage::new(20, 20);
        Primitive::Dot { center: Coord { x: 10.0, y: 10.0 }, radius: 2.0 }.draw(&mut stencil);
        assert_eq!(stencil.get_pixel(10, 10), &INK);
        assert_eq!(stencil.get_pixel(12, 10), &INK);
        assert_eq!(stencil.get_pixel(14, 10).0[0], 0);
    }

    #[test]
    fn zero_sized_marks_paint_nothing() {
        let mut stencil = GrayImage::new(10, 10);
        let center = Coord { x: 5.0, y: 5.0 };
        Primitive::Dot { center, radius: 0.0 }.draw(&mut stencil);
        Primitive::dash(center, 0.7, 0.0, 3.0).draw(&mut stencil);
        assert_eq!(inked(&stencil), 0);
    }

    #[test]
    fn horizontal_dash_covers_its_length() {
        let mut stencil = GrayImage::new(40, 20);
        let dash = Primitive::dash(Coord { x: 20.0, y: 10.0 }, 0.0, 20.0, 4.0);
        dash.draw(&mut stencil);
        assert_eq!(stencil.get_pixel(12, 10), &INK);
        assert_eq!(stencil.get_pixel(28, 10), &INK);
        assert_eq!(stencil.get_pixel(20, 17).0[0], 0);
        assert_eq!(stencil.get_pixel(35, 10).0[0], 0);
    }

    #[test]
    fn hairline_dash_falls_back_to_a_line() {
        let mut stencil = GrayImage::new(30, 30);
        let dash = Primitive::dash(Coord { x: 15.0, y: 15.0 }, 0.0, 10.0, 0.2);
        dash.draw(&mut stencil);
        assert!(inked(&stencil) >= 9);
    }

    #[test]
    fn marks_off_canvas_are_clipped() {
        let mut stencil = GrayImage::new(10, 10);
        Primitive::Dot { center: Coord { x: -3.0, y: 4.0 }, radius: 4.0 }.draw(&mut stencil);
        Primitive::dash(Coord { x: 50.0, y: 50.0 }, 1.0, 8.0, 2.0).draw(&mut stencil);
        assert!(inked(&stencil) > 0);
        assert_eq!(stencil.get_pixel(9, 9).0[0], 0);
    }

    #[test]
    fn outline_drops_duplicate_corners() {
        let ring = LineString::from(vec![(1.0f32, 1.0), (1.2, 1.1), (5.0, 1.0), (1.0, 1.0)]);
        let points = linestring_to_points(&ring);
        assert_eq!(points, vec![Point::new(1, 1), Point::new(5, 1)]);
    }

    #[test]
    fn oversized_marks_are_capped_to_the_canvas() {
        let mut stencil = GrayImage::new(20, 20);
        Primitive::Dot { center: Coord { x: 10.0, y: 10.0 }, radius: 5e9 }.draw(&mut stencil);
        assert_eq!(inked(&stencil), 400);

        let mut stencil = GrayImage::new(20, 20);
        Primitive::dash(Coord { x: 10.0, y: 10.0 }, 0.3, 1e6, 2.0).draw(&mut stencil);
        assert!(inked(&stencil) > 0);
    }

    #[test]
    fn far_away_marks_are_skipped() {
        let mut stencil = GrayImage::new(20, 20);
        Primitive::Dot { center: Coord { x: 1e20, y: -1e20 }, radius: 1e9 }.draw(&mut stencil);
        Primitive::dash(Coord { x: -1e30, y: 5.0 }, 0.0, 1e12, 1e6).draw(&mut stencil);
        assert_eq!(inked(&stencil), 0);
    }

    #[test]
    fn clamping_keeps_the_dash_center() {
        let dash = Primitive::dash(Coord { x: 4.0, y: 6.0 }, 1.2, 500.0, 900.0);
        let capped = dash.clamped(10.0);
        let shift = capped.center() - dash.center();
        assert!(shift.x.abs() < 1e-3 && shift.y.abs() < 1e-3);
        let Primitive::Dash { start, end, width } = capped else {
            panic!("clamping changed the mark kind");
        };
        let d = end - start;
        assert!(((d.x * d.x + d.y * d.y).sqrt() - 10.0).abs() < 1e-3);
        assert_eq!(width, 10.0);
    }
}
