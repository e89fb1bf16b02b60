use embedded_graphics::{draw_target::DrawTarget, geometry::Point, pixelcolor::Rgb888, Pixel};
use heapless::Vec;

/// Upper bound on strip length.
pub const MAX_LEDS: usize = 256;

/// One complete strip update: a color for every LED, in strip order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedFrame {
    pixels: Vec<Rgb888, MAX_LEDS>,
}

impl LedFrame {
    /// A frame of `led_count` LEDs (clamped to [`MAX_LEDS`]) all set to `fill`.
    pub fn filled(led_count: u16, fill: Rgb888) -> Self {
        let mut pixels = Vec::new();
        let _ = pixels.resize((led_count as usize).min(MAX_LEDS), fill);
        Self { pixels }
    }

    pub fn len(&self) -> usize {
        self.pixels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    pub fn color(&self, index: u16) -> Option<Rgb888> {
        self.pixels.get(index as usize).copied()
    }

    /// Out-of-range indices are ignored.
    pub fn set(&mut self, index: u16, color: Rgb888) {
        if let Some(pixel) = self.pixels.get_mut(index as usize) {
            *pixel = color;
        }
    }

    pub fn colors(&self) -> &[Rgb888] {
        &self.pixels
    }

    /// `(index, color)` pairs in strip order.
    pub fn iter(&self) -> impl Iterator<Item = (u16, Rgb888)> + '_ {
        self.pixels
            .iter()
            .enumerate()
            .map(|(index, &color)| (index as u16, color))
    }

    /// Indices whose color differs from `color`.
    pub fn lit(&self, color: Rgb888) -> impl Iterator<Item = u16> + '_ {
        self.iter()
            .filter(move |&(_, c)| c != color)
            .map(|(index, _)| index)
    }

    /// Writes the whole frame to a strip driver in a single `draw_iter` call.
    /// The strip is addressed as a `led_count x 1` display.
    pub fn draw<D>(&self, target: &mut D) -> Result<(), D::Error>
    where
        D: DrawTarget<Color = Rgb888>,
    {
        target.draw_iter(
            self.iter()
                .map(|(index, color)| Pixel(Point::new(index as i32, 0), color)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_graphics::{mock_display::MockDisplay, prelude::*};

    #[test]
    fn test_filled_frame() {
        let frame = LedFrame::filled(60, Rgb888::BLACK);
        assert_eq!(frame.len(), 60);
        assert_eq!(frame.color(59), Some(Rgb888::BLACK));
        assert_eq!(frame.color(60), None);
        assert_eq!(LedFrame::filled(1000, Rgb888::BLACK).len(), MAX_LEDS);
    }

    #[test]
    fn test_set_and_iter() {
        let mut frame = LedFrame::filled(4, Rgb888::BLACK);
        frame.set(2, Rgb888::GREEN);
        frame.set(9, Rgb888::RED);
        let lit: heapless::Vec<u16, 4> = frame.lit(Rgb888::BLACK).collect();
        assert_eq!(lit.as_slice(), &[2]);
        assert_eq!(frame.iter().nth(2), Some((2, Rgb888::GREEN)));
    }

    #[test]
    fn test_draw_writes_one_row() {
        let mut frame = LedFrame::filled(60, Rgb888::BLACK);
        frame.set(0, Rgb888::GREEN);
        frame.set(59, Rgb888::BLUE);

        let mut display: MockDisplay<Rgb888> = MockDisplay::new();
        frame.draw(&mut display).unwrap();

        assert_eq!(display.get_pixel(Point::new(0, 0)), Some(Rgb888::GREEN));
        assert_eq!(display.get_pixel(Point::new(1, 0)), Some(Rgb888::BLACK));
        assert_eq!(display.get_pixel(Point::new(59, 0)), Some(Rgb888::BLUE));
        assert_eq!(display.get_pixel(Point::new(60, 0)), None);
        assert_eq!(display.get_pixel(Point::new(0, 1)), None);
    }
}
