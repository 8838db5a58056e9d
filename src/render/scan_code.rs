use lopdf::content::Operation;
use qrcode::{Color, EcLevel, QrCode};

use super::pdf::{real, Rgb};
use super::RenderError;

/// Light modules kept around the symbol so scanners can find it.
pub const QUIET_ZONE: usize = 4;

/// QR symbol for a ticket. The payload is the ticket number, byte for byte.
#[derive(Debug, Clone)]
pub struct ScanCode {
    width: usize,
    dark: Vec<bool>,
}

impl ScanCode {
    pub fn encode(payload: &str) -> Result<Self, RenderError> {
        let code = QrCode::with_error_correction_level(payload.as_bytes(), EcLevel::Q)
            .map_err(|e| RenderError::ScanCode(e.to_string()))?;

        let dark = code
            .to_colors()
            .into_iter()
            .map(|color| color == Color::Dark)
            .collect();

        Ok(Self {
            width: code.width(),
            dark,
        })
    }

    /// Modules per side, without the quiet zone.
    pub fn width(&self) -> usize {
        self.width
    }

    /// `(0, 0)` is the top-left module.
    pub fn is_dark(&self, x: usize, y: usize) -> bool {
        x < self.width && y < self.width && self.dark[y * self.width + x]
    }

    /// Drawing operations for a `size` x `size` square whose lower-left corner
    /// is at `(x, y)`, on a white backing so it scans on any background.
    pub fn draw(&self, x: f32, y: f32, size: f32, color: Rgb) -> Vec<Operation> {
        let total = (self.width + 2 * QUIET_ZONE) as f32;
        let module = size / total;

        let mut ops = vec![
            Operation::new("q", vec![]),
            Operation::new("rg", vec![real(1.0), real(1.0), real(1.0)]),
            Operation::new("re", vec![real(x), real(y), real(size), real(size)]),
            Operation::new("f", vec![]),
            Operation::new("rg", color.operands()),
        ];

        for row in 0..self.width {
            for column in 0..self.width {
                if !self.is_dark(column, row) {
                    continue;
                }
                let left = x + (column + QUIET_ZONE) as f32 * module;
                let bottom = y + size - (row + QUIET_ZONE + 1) as f32 * module;
                ops.push(Operation::new(
                    "re",
                    vec![real(left), real(bottom), real(module), real(module)],
                ));
            }
        }

        ops.push(Operation::new("f", vec![]));
        ops.push(Operation::new("Q", vec![]));
        ops
    }
}
