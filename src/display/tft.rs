//! Text and shape primitives for windowed RGB565 panels.
//!
//! Everything is drawn as runs of pixels pushed into a rectangular window,
//! which is what the ST77xx family is fast at. Coordinates are signed;
//! anything outside the panel is clipped.

use embedded_graphics::image::GetPixel;
use embedded_graphics::mono_font::ascii::FONT_6X10;
use embedded_graphics::mono_font::mapping::GlyphMapping;
use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::{OriginDimensions, Point};
use heapless::Vec;

/// Character cell width of [`Tft::print`].
pub const FONT_WIDTH: i32 = 6;
/// Character cell height of [`Tft::print`]; the font's descender rows are cut.
pub const FONT_HEIGHT: i32 = 8;

/// Pixels staged per window write.
pub const LINE_PIXELS: usize = 160;

/// Scanline intersections kept per row of [`Tft::draw_solid_poly`].
pub const MAX_INTERSECTIONS: usize = 20;

/// A panel that accepts pixels into an addressed window.
pub trait PixelWindow {
    type Error;

    /// Visible `(width, height)`.
    fn dimensions(&self) -> (u16, u16);

    /// Opens the inclusive window `(x0, y0)..=(x1, y1)`.
    fn set_window(&mut self, x0: u16, y0: u16, x1: u16, y1: u16) -> Result<(), Self::Error>;

    /// Fills the open window row by row.
    fn write_pixels(&mut self, pixels: &[u16]) -> Result<(), Self::Error>;
}

/// Drawing primitives for every [`PixelWindow`].
pub trait Tft: PixelWindow {
    /// Draws `text` in 6x8 cells starting at `(x, y)`.
    ///
    /// Cells that do not fit on the panel are skipped.
    fn print(&mut self, text: &str, x: i32, y: i32, color: u16, bg_color: u16) -> Result<(), Self::Error> {
        let (width, height) = self.dimensions();
        let mut cell = [0u16; (FONT_WIDTH * FONT_HEIGHT) as usize];
        let mut cx = x;

        for c in text.chars() {
            let visible = cx >= 0 && y >= 0 && cx + FONT_WIDTH <= width as i32 && y + FONT_HEIGHT <= height as i32;
            if visible {
                render_glyph(c, color, bg_color, &mut cell);
                self.set_window(
                    cx as u16,
                    y as u16,
                    (cx + FONT_WIDTH - 1) as u16,
                    (y + FONT_HEIGHT - 1) as u16,
                )?;
                self.write_pixels(&cell)?;
            }
            cx += FONT_WIDTH;
        }

        Ok(())
    }

    fn fill_rect(&mut self, x: i32, y: i32, width: i32, height: i32, color: u16) -> Result<(), Self::Error> {
        let Some((x0, y0, x1, y1)) = clip(self.dimensions(), x, y, x + width - 1, y + height - 1) else {
            return Ok(());
        };
        let count = (x1 - x0 + 1) as usize * (y1 - y0 + 1) as usize;
        self.set_window(x0, y0, x1, y1)?;
        write_repeated(self, color, count)
    }

    fn draw_pixel(&mut self, x: i32, y: i32, color: u16) -> Result<(), Self::Error> {
        let (width, height) = self.dimensions();
        if x < 0 || y < 0 || x >= width as i32 || y >= height as i32 {
            return Ok(());
        }
        self.set_window(x as u16, y as u16, x as u16, y as u16)?;
        self.write_pixels(&[color])
    }

    /// Straight lines go out as one window; diagonals use Bresenham with
    /// `width` pixels laid perpendicular to the major axis.
    fn draw_line(&mut self, x0: i32, y0: i32, x1: i32, y1: i32, color: u16, width: u8) -> Result<(), Self::Error> {
        if x0 == x1 {
            let (top, bottom) = if y0 > y1 { (y1, y0) } else { (y0, y1) };
            return self.fill_rect(x0, top, 1, bottom - top + 1, color);
        }
        if y0 == y1 {
            let (left, right) = if x0 > x1 { (x1, x0) } else { (x0, x1) };
            return self.fill_rect(left, y0, right - left + 1, 1, color);
        }

        let (mut x0, mut y0, mut x1, mut y1) = (x0, y0, x1, y1);
        let steep = (y1 - y0).abs() > (x1 - x0).abs();
        if steep {
            core::mem::swap(&mut x0, &mut y0);
            core::mem::swap(&mut x1, &mut y1);
        }
        if x0 > x1 {
            core::mem::swap(&mut x0, &mut x1);
            core::mem::swap(&mut y0, &mut y1);
        }

        let dx = x1 - x0;
        let dy = (y1 - y0).abs();
        let step = if y0 < y1 { 1 } else { -1 };
        let half = (width / 2) as i32;
        let mut err = dx / 2;

        for x in x0..=x1 {
            for w in -half..=half {
                if steep {
                    self.draw_pixel(y0 + w, x, color)?;
                } else {
                    self.draw_pixel(x, y0 + w, color)?;
                }
            }
            err -= dy;
            if err < 0 {
                err += dx;
                y0 += step;
            }
        }

        Ok(())
    }

    fn draw_rect(&mut self, x: i32, y: i32, width: i32, height: i32, color: u16) -> Result<(), Self::Error> {
        self.fill_rect(x, y, width, 1, color)?;
        self.fill_rect(x, y + height - 1, width, 1, color)?;
        self.fill_rect(x, y, 1, height, color)?;
        self.fill_rect(x + width - 1, y, 1, height, color)
    }

    /// Closed outline through `vertices`. Fewer than three draw nothing.
    fn draw_poly(&mut self, vertices: &[Point], color: u16, width: u8) -> Result<(), Self::Error> {
        if vertices.len() < 3 {
            return Ok(());
        }
        for (i, p0) in vertices.iter().enumerate() {
            let p1 = vertices[(i + 1) % vertices.len()];
            self.draw_line(p0.x, p0.y, p1.x, p1.y, color, width)?;
        }
        Ok(())
    }

    /// Scanline-filled polygon, outlined with `edge_color` when
    /// `edge_width` is not zero.
    fn draw_solid_poly(
        &mut self,
        vertices: &[Point],
        fill_color: u16,
        edge_color: u16,
        edge_width: u8,
    ) -> Result<(), Self::Error> {
        if vertices.len() < 3 {
            return Ok(());
        }

        // only rows on the panel are scanned
        let (width, height) = self.dimensions();
        let min_y = vertices.iter().map(|p| p.y).min().unwrap_or(0).max(0);
        let max_y = vertices.iter().map(|p| p.y).max().unwrap_or(0).min(height as i32 - 1);

        for y in min_y..=max_y {
            let mut crossings: Vec<i32, MAX_INTERSECTIONS> = Vec::new();

            for (i, p0) in vertices.iter().enumerate() {
                let p1 = vertices[(i + 1) % vertices.len()];
                if p0.y == p1.y {
                    continue;
                }
                let (top, bottom) = if p0.y < p1.y { (*p0, p1) } else { (p1, *p0) };
                if y < top.y || y >= bottom.y {
                    continue;
                }
                // 16.16 fixed point in i64, rounded to the nearest column
                let (tx, ty) = (top.x as i64, top.y as i64);
                let step = ((bottom.x as i64 - tx) << 16) / (bottom.y as i64 - ty);
                let x = (tx << 16) + step * (y as i64 - ty);
                let column = ((x + (1 << 15)) >> 16).clamp(-1, width as i64);
                if crossings.push(column as i32).is_err() {
                    break;
                }
            }

            insertion_sort(&mut crossings);

            for pair in crossings.chunks_exact(2) {
                if pair[1] > pair[0] {
                    self.draw_line(pair[0], y, pair[1], y, fill_color, 1)?;
                }
            }
        }

        if edge_width > 0 {
            self.draw_poly(vertices, edge_color, edge_width)?;
        }
        Ok(())
    }

    /// Midpoint circle outline.
    fn draw_circle(&mut self, center: Point, radius: i32, color: u16) -> Result<(), Self::Error> {
        let (cx, cy) = (center.x, center.y);
        let mut x = 0;
        let mut y = radius;
        let mut err = 1 - radius;

        while x <= y {
            for (px, py) in [
                (cx + x, cy + y),
                (cx - x, cy + y),
                (cx + x, cy - y),
                (cx - x, cy - y),
                (cx + y, cy + x),
                (cx - y, cy + x),
                (cx + y, cy - x),
                (cx - y, cy - x),
            ] {
                self.draw_pixel(px, py, color)?;
            }

            if err < 0 {
                err += 2 * x + 3;
            } else {
                err += 2 * (x - y) + 5;
                y -= 1;
            }
            x += 1;
        }

        Ok(())
    }

    fn draw_filled_circle(&mut self, center: Point, radius: i32, color: u16) -> Result<(), Self::Error> {
        let (cx, cy) = (center.x, center.y);

        // small dots as a diamond of rows
        if radius <= 4 {
            self.fill_rect(cx - radius, cy, 2 * radius + 1, 1, color)?;
            for i in 1..=radius {
                let half = radius - i;
                self.fill_rect(cx - half, cy + i, 2 * half + 1, 1, color)?;
                self.fill_rect(cx - half, cy - i, 2 * half + 1, 1, color)?;
            }
            return Ok(());
        }

        let mut x = radius;
        let mut y = 0;
        let mut err = 0;

        while x >= y {
            self.fill_rect(cx - x, cy + y, 2 * x + 1, 1, color)?;
            self.fill_rect(cx - x, cy - y, 2 * x + 1, 1, color)?;
            self.fill_rect(cx - y, cy + x, 2 * y + 1, 1, color)?;
            self.fill_rect(cx - y, cy - x, 2 * y + 1, 1, color)?;

            if err <= 0 {
                y += 1;
                err += 2 * y + 1;
            }
            if err > 0 {
                x -= 1;
                err -= 2 * x + 1;
            }
        }

        Ok(())
    }

    /// Annulus `width` pixels thick inside `radius`. A width reaching the
    /// center gives a filled circle.
    fn draw_ring(&mut self, center: Point, radius: i32, color: u16, width: u8) -> Result<(), Self::Error> {
        let inner = radius - width as i32;
        if inner < 0 || width == 0 {
            return self.draw_filled_circle(center, radius, color);
        }

        for dy in -radius..=radius {
            let outer = isqrt((radius * radius - dy * dy) as u32) as i32;
            let y = center.y + dy;
            if dy.abs() >= inner {
                self.fill_rect(center.x - outer, y, 2 * outer + 1, 1, color)?;
                continue;
            }
            let hole = isqrt((inner * inner - dy * dy) as u32) as i32;
            self.fill_rect(center.x - outer, y, outer - hole, 1, color)?;
            self.fill_rect(center.x + hole + 1, y, outer - hole, 1, color)?;
        }

        Ok(())
    }
}

impl<T: PixelWindow + ?Sized> Tft for T {}

/// Clips an inclusive rectangle to the panel.
fn clip((width, height): (u16, u16), x0: i32, y0: i32, x1: i32, y1: i32) -> Option<(u16, u16, u16, u16)> {
    let x0 = x0.max(0);
    let y0 = y0.max(0);
    let x1 = x1.min(width as i32 - 1);
    let y1 = y1.min(height as i32 - 1);
    if x0 > x1 || y0 > y1 {
        return None;
    }
    Some((x0 as u16, y0 as u16, x1 as u16, y1 as u16))
}

fn write_repeated<T: PixelWindow + ?Sized>(panel: &mut T, color: u16, mut count: usize) -> Result<(), T::Error> {
    let line = [color; LINE_PIXELS];
    while count > 0 {
        let n = count.min(LINE_PIXELS);
        panel.write_pixels(&line[..n])?;
        count -= n;
    }
    Ok(())
}

/// Renders one 6x8 cell, row-major.
fn render_glyph(c: char, color: u16, bg_color: u16, cell: &mut [u16]) {
    let font = &FONT_6X10;
    let size = font.character_size;
    let per_row = (font.image.size().width / size.width).max(1);
    let index = font.glyph_mapping.index(c) as u32;
    let origin = Point::new(
        ((index % per_row) * size.width) as i32,
        ((index / per_row) * size.height) as i32,
    );

    for (i, px) in cell.iter_mut().enumerate() {
        let offset = Point::new(i as i32 % FONT_WIDTH, i as i32 / FONT_WIDTH);
        *px = match font.image.pixel(origin + offset) {
            Some(BinaryColor::On) => color,
            _ => bg_color,
        };
    }
}

fn insertion_sort(values: &mut [i32]) {
    for i in 1..values.len() {
        let key = values[i];
        let mut j = i;
        while j > 0 && values[j - 1] > key {
            values[j] = values[j - 1];
            j -= 1;
        }
        values[j] = key;
    }
}

/// Floor of the square root.
fn isqrt(n: u32) -> u32 {
    if n < 2 {
        return n;
    }
    let mut x = n;
    let mut y = (x + 1) / 2;
    while y < x {
        x = y;
        y = (x + n / x) / 2;
    }
    x
}

#[cfg(test)]
mod tests {
    use std::vec;
    use std::vec::Vec;

    use super::*;

    /// In-memory panel that follows the window semantics of the controller.
    struct Screen {
        pub width: u16,
        pub height: u16,
        pub pixels: Vec<u16>,
        pub windows: usize,
        window: (u16, u16, u16, u16),
        cursor: (u16, u16),
    }

    impl Screen {
        pub fn new(width: u16, height: u16) -> Self {
            Self {
                width,
                height,
                pixels: vec![0; width as usize * height as usize],
                windows: 0,
                window: (0, 0, 0, 0),
                cursor: (0, 0),
            }
        }

        pub fn at(&self, x: i32, y: i32) -> u16 {
            self.pixels[y as usize * self.width as usize + x as usize]
        }

        pub fn count(&self, color: u16) -> usize {
            self.pixels.iter().filter(|&&p| p == color).count()
        }
    }

    impl PixelWindow for Screen {
        type Error = ();

        fn dimensions(&self) -> (u16, u16) {
            (self.width, self.height)
        }

        fn set_window(&mut self, x0: u16, y0: u16, x1: u16, y1: u16) -> Result<(), ()> {
            assert!(x0 <= x1 && y0 <= y1 && x1 < self.width && y1 < self.height);
            self.window = (x0, y0, x1, y1);
            self.cursor = (x0, y0);
            self.windows += 1;
            Ok(())
        }

        fn write_pixels(&mut self, pixels: &[u16]) -> Result<(), ()> {
            let (x0, _, x1, y1) = self.window;
            for &p in pixels {
                let (x, y) = self.cursor;
                assert!(y <= y1, "wrote past the window");
                self.pixels[y as usize * self.width as usize + x as usize] = p;
                self.cursor = if x == x1 { (x0, y + 1) } else { (x + 1, y) };
            }
            Ok(())
        }
    }

    const FG: u16 = 0xFFFF;
    const BG: u16 = 0x0001;

    #[test]
    fn rect_is_clipped_to_panel() {
        let mut screen = Screen::new(20, 10);
        screen.fill_rect(-5, 8, 10, 10, FG).unwrap();
        assert_eq!(screen.count(FG), 5 * 2);
        assert_eq!(screen.windows, 1);

        screen.fill_rect(30, 30, 4, 4, FG).unwrap();
        assert_eq!(screen.windows, 1);
    }

    #[test]
    fn rect_larger_than_line_buffer() {
        let mut screen = Screen::new(160, 80);
        screen.fill_rect(0, 0, 160, 80, FG).unwrap();
        assert_eq!(screen.count(FG), 160 * 80);
    }

    #[test]
    fn outline_rect() {
        let mut screen = Screen::new(20, 10);
        screen.draw_rect(2, 2, 5, 4, FG).unwrap();
        assert_eq!(screen.count(FG), 2 * 5 + 2 * 2);
        assert_eq!(screen.at(2, 2), FG);
        assert_eq!(screen.at(6, 5), FG);
        assert_eq!(screen.at(4, 3), 0);
    }

    #[test]
    fn diagonal_line_hits_both_ends() {
        let mut screen = Screen::new(20, 20);
        screen.draw_line(1, 1, 10, 4, FG, 1).unwrap();
        assert_eq!(screen.at(1, 1), FG);
        assert_eq!(screen.at(10, 4), FG);
        // one pixel per column on a shallow line
        assert_eq!(screen.count(FG), 10);
    }

    #[test]
    fn wide_steep_line() {
        let mut screen = Screen::new(20, 20);
        screen.draw_line(5, 0, 7, 9, FG, 3).unwrap();
        // three pixels on every row
        assert_eq!(screen.count(FG), 10 * 3);
    }

    #[test]
    fn reversed_straight_lines() {
        let mut screen = Screen::new(20, 20);
        screen.draw_line(9, 3, 2, 3, FG, 1).unwrap();
        screen.draw_line(0, 9, 0, 5, FG, 1).unwrap();
        assert_eq!(screen.count(FG), 8 + 5);
    }

    #[test]
    fn print_uses_six_by_eight_cells() {
        let mut screen = Screen::new(40, 10);
        screen.print("A ", 1, 1, FG, BG).unwrap();
        assert_eq!(screen.windows, 2);
        assert_eq!(screen.count(FG) + screen.count(BG), 2 * 48);
        // the space cell is all background
        assert!((7..13).all(|x| (1..9).all(|y| screen.at(x, y) == BG)));
        assert!(screen.count(FG) > 0);
    }

    #[test]
    fn print_skips_cells_off_the_edge() {
        let mut screen = Screen::new(16, 10);
        screen.print("abc", 2, 0, FG, BG).unwrap();
        assert_eq!(screen.windows, 2);
    }

    #[test]
    fn solid_triangle_is_filled_and_outlined() {
        let mut screen = Screen::new(160, 80);
        let triangle = [Point::new(30, 30), Point::new(40, 60), Point::new(80, 70)];
        screen.draw_solid_poly(&triangle, 0x00F0, FG, 2).unwrap();

        assert_eq!(screen.at(45, 55), 0x00F0);
        assert_eq!(screen.at(30, 30), FG);
        assert_eq!(screen.at(80, 70), FG);
        assert_eq!(screen.at(100, 40), 0);
        assert_eq!(screen.at(35, 60), 0);
    }

    #[test]
    fn far_vertices_are_clipped() {
        let mut screen = Screen::new(20, 10);
        let wide = [Point::new(-50_000, -5), Point::new(50_000, -5), Point::new(0, 50_000)];
        screen.draw_solid_poly(&wide, FG, 0, 0).unwrap();
        assert_eq!(screen.count(FG), 20 * 10);

        let mut screen = Screen::new(20, 10);
        let below = [
            Point::new(0, 1_000_000_000),
            Point::new(i32::MAX, 2_000_000_000),
            Point::new(i32::MIN, i32::MAX),
        ];
        screen.draw_solid_poly(&below, FG, 0, 0).unwrap();
        assert_eq!(screen.windows, 0);
    }

    #[test]
    fn degenerate_polygons_draw_nothing() {
        let mut screen = Screen::new(20, 20);
        screen.draw_poly(&[Point::new(1, 1), Point::new(5, 5)], FG, 1).unwrap();
        screen
            .draw_solid_poly(&[Point::new(1, 1), Point::new(5, 5)], FG, FG, 1)
            .unwrap();
        assert_eq!(screen.windows, 0);
    }

    #[test]
    fn circle_is_symmetric() {
        let mut screen = Screen::new(40, 40);
        screen.draw_circle(Point::new(20, 20), 8, FG).unwrap();
        for (x, y) in [(20, 12), (20, 28), (12, 20), (28, 20)] {
            assert_eq!(screen.at(x, y), FG);
        }
        assert_eq!(screen.at(20, 20), 0);
    }

    #[test]
    fn small_filled_circle_is_a_diamond() {
        let mut screen = Screen::new(20, 20);
        screen.draw_filled_circle(Point::new(10, 10), 2, FG).unwrap();
        assert_eq!(screen.count(FG), 5 + 3 + 3 + 1 + 1);
    }

    #[test]
    fn filled_circle_covers_center_and_radius() {
        let mut screen = Screen::new(40, 40);
        screen.draw_filled_circle(Point::new(20, 20), 10, FG).unwrap();
        assert_eq!(screen.at(20, 20), FG);
        assert_eq!(screen.at(30, 20), FG);
        assert_eq!(screen.at(20, 10), FG);
        assert_eq!(screen.at(28, 28), 0);
    }

    #[test]
    fn ring_leaves_a_hole() {
        let mut screen = Screen::new(40, 40);
        screen.draw_ring(Point::new(20, 20), 10, FG, 3).unwrap();
        assert_eq!(screen.at(20, 20), 0);
        assert_eq!(screen.at(30, 20), FG);
        assert_eq!(screen.at(28, 20), FG);
        assert_eq!(screen.at(26, 20), 0);
    }

    #[test]
    fn integer_sqrt() {
        assert_eq!(isqrt(0), 0);
        assert_eq!(isqrt(1), 1);
        assert_eq!(isqrt(99), 9);
        assert_eq!(isqrt(100), 10);
    }
}
