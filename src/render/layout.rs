//! Page geometry for sheets of tickets, in PDF points.

pub const TICKETS_PER_SHEET: usize = 4;

/// US Letter, 8.5 x 11 in.
pub const LETTER: PageBox = PageBox::new(0.0, 0.0, 612.0, 792.0);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl PageBox {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    /// `[llx lly urx ury]`, as used by MediaBox and BBox.
    pub fn corners(&self) -> [f32; 4] {
        [self.x, self.y, self.x + self.width, self.y + self.height]
    }
}

/// Uniform scale plus translation placing one page inside a frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub scale: f32,
    pub tx: f32,
    pub ty: f32,
}

pub fn sheet_count(tickets: usize) -> usize {
    tickets.div_ceil(TICKETS_PER_SHEET)
}

/// Frame for a slot on a sheet: 0 top-left, 1 top-right, 2 bottom-left, 3 bottom-right.
pub fn quadrant(sheet: PageBox, slot: usize) -> PageBox {
    let width = sheet.width / 2.0;
    let height = sheet.height / 2.0;
    let column = (slot % 2) as f32;
    let row = ((slot % TICKETS_PER_SHEET) / 2) as f32;

    PageBox::new(
        sheet.x + column * width,
        sheet.y + sheet.height - (row + 1.0) * height,
        width,
        height,
    )
}

/// Scales `page` to fit inside `frame` keeping its aspect ratio, centered.
pub fn fit(page: PageBox, frame: PageBox) -> Placement {
    let scale = (frame.width / page.width).min(frame.height / page.height);
    let offset_x = (frame.width - page.width * scale) / 2.0;
    let offset_y = (frame.height - page.height * scale) / 2.0;

    Placement {
        scale,
        tx: frame.x + offset_x - page.x * scale,
        ty: frame.y + offset_y - page.y * scale,
    }
}
