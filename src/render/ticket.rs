use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use lopdf::{dictionary, Document};
use tempfile::NamedTempFile;
use tracing::{debug, instrument};

use super::layout::{PageBox, Placement};
use super::pdf::{
    finish_single_page, import_first_page, place_form, standard_fonts, text_width, Rgb, TextRun,
    BOLD_FONT, REGULAR_FONT,
};
use super::scan_code::ScanCode;
use super::RenderError;
use crate::models::Ticket;
use crate::services::ticket_number::is_ticket_number;

const BACKGROUND_FORM: &str = "Bg";

const DARK_BLUE: Rgb = Rgb::new(28, 33, 87);
const YELLOW: Rgb = Rgb::new(255, 247, 87);

const DETAILS_X: f32 = 195.0;
const QR_X: f32 = 8.0;
const QR_Y: f32 = 16.0;
const QR_SIZE: f32 = 100.0;

/// A ticket background PDF, read once and reused for every ticket it backs.
#[derive(Clone)]
pub struct TicketTemplate {
    path: PathBuf,
    bytes: Vec<u8>,
}

impl TicketTemplate {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, RenderError> {
        let path = path.as_ref().to_path_buf();
        let bytes = fs::read(&path).map_err(|e| RenderError::Template {
            path: path.clone(),
            reason: e.to_string(),
        })?;
        Self::from_bytes(path, bytes)
    }

    /// `path` only labels errors.
    pub fn from_bytes(path: impl Into<PathBuf>, bytes: Vec<u8>) -> Result<Self, RenderError> {
        let template = Self {
            path: path.into(),
            bytes,
        };
        if template.document()?.get_pages().is_empty() {
            return Err(RenderError::Template {
                path: template.path,
                reason: "template has no pages".to_string(),
            });
        }
        Ok(template)
    }

    fn document(&self) -> Result<Document, RenderError> {
        Document::load_mem(&self.bytes).map_err(|e| RenderError::Template {
            path: self.path.clone(),
            reason: e.to_string(),
        })
    }
}

pub fn ticket_file_name(ticket_number: &str) -> String {
    format!("Ticket-{}.pdf", ticket_number)
}

/// Writes single ticket documents into one directory.
#[derive(Debug, Clone)]
pub struct DocumentRenderer {
    template_path: PathBuf,
    output_dir: PathBuf,
}

impl DocumentRenderer {
    pub fn new(template_path: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            template_path: template_path.into(),
            output_dir: output_dir.into(),
        }
    }

    /// Renders `ticket` to `Ticket-{number}.pdf`, replacing any previous render.
    /// Blocking; call from `spawn_blocking` in async code.
    #[instrument(skip(self, ticket), fields(ticket_number = %ticket.ticket_number))]
    pub fn render(&self, ticket: &Ticket) -> Result<PathBuf, RenderError> {
        // the number becomes part of a file name
        if !is_ticket_number(&ticket.ticket_number) {
            return Err(RenderError::InvalidTicketNumber(ticket.ticket_number.clone()));
        }

        let template = TicketTemplate::load(&self.template_path)?;
        let mut doc = render_document(&template, ticket)?;

        fs::create_dir_all(&self.output_dir)?;
        let path = self.output_dir.join(ticket_file_name(&ticket.ticket_number));
        write_atomically(&mut doc, &path)?;

        debug!("ticket written to {}", path.display());
        Ok(path)
    }
}

/// Builds the one-page document for `ticket`, sized like the template's first page.
pub fn render_document(template: &TicketTemplate, ticket: &Ticket) -> Result<Document, RenderError> {
    let mut doc = Document::with_version("1.5");
    let (background, page) = import_first_page(&mut doc, template.document()?)?;
    let fonts = standard_fonts(&mut doc);
    let code = ScanCode::encode(&ticket.ticket_number)?;

    let mut ops = place_form(
        BACKGROUND_FORM,
        Placement {
            scale: 1.0,
            tx: 0.0,
            ty: 0.0,
        },
    );
    let face = TicketFace::of(ticket);
    for run in face.runs(page) {
        ops.extend(run.operations());
    }
    ops.extend(code.draw(page.x + QR_X, page.y + QR_Y, QR_SIZE, DARK_BLUE));

    let resources = dictionary! {
        "Font" => fonts,
        "XObject" => dictionary! { BACKGROUND_FORM => background },
    };
    finish_single_page(&mut doc, page, resources, ops)?;
    Ok(doc)
}

/// Saves through a temp file in the destination directory, then renames over `path`.
pub(crate) fn write_atomically(doc: &mut Document, path: &Path) -> Result<(), RenderError> {
    let dir = path
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let mut file = NamedTempFile::new_in(dir)?;
    {
        let mut writer = BufWriter::new(file.as_file_mut());
        doc.save_to(&mut writer)?;
        writer.flush()?;
    }
    file.persist(path).map_err(|e| e.error)?;
    Ok(())
}

// Text printed on a ticket, formatted once
struct TicketFace {
    event: String,
    venue: String,
    number: String,
    holder: String,
    seat: String,
    dates: String,
    times: String,
}

impl TicketFace {
    fn of(ticket: &Ticket) -> Self {
        let reservation = &ticket.reservation;
        let (start, end) = (reservation.event.start_at, reservation.event.end_at);

        Self {
            event: reservation.event.name.clone(),
            venue: reservation.venue.name.clone(),
            number: ticket.ticket_number.clone(),
            holder: reservation.user.display_name(),
            seat: format!("Seat {}", reservation.seat.seat_number),
            dates: format!("{} - {}", start.format("%b %d, %Y"), end.format("%b %d, %Y")),
            times: format!("{} - {}", start.format("%I:%M %p"), end.format("%I:%M %p")),
        }
    }

    fn runs(&self, page: PageBox) -> Vec<TextRun<'_>> {
        let (left, bottom) = (page.x, page.y);
        let (width, height) = (page.width, page.height);

        let mut runs = vec![
            TextRun {
                text: &self.event,
                font: BOLD_FONT,
                size: 20.0,
                color: DARK_BLUE,
                x: left + (width / 2.0 - 20.0 - text_width(&self.event, BOLD_FONT, 20.0)).max(QR_X),
                y: bottom + height / 2.0 + 20.0,
                rotated: false,
            },
            TextRun {
                text: &self.venue,
                font: REGULAR_FONT,
                size: 12.0,
                color: YELLOW,
                x: left + width - 110.0 - text_width(&self.venue, REGULAR_FONT, 12.0),
                y: bottom + 20.0,
                rotated: false,
            },
            TextRun {
                text: &self.number,
                font: BOLD_FONT,
                size: 16.0,
                color: YELLOW,
                x: left + width - 110.0 - text_width(&self.number, BOLD_FONT, 16.0),
                y: bottom + height - 44.0,
                rotated: false,
            },
        ];

        let details: [(&str, f32); 4] = [
            (self.holder.as_str(), 84.0),
            (self.seat.as_str(), 67.0),
            (self.dates.as_str(), 50.0),
            (self.times.as_str(), 33.0),
        ];
        runs.extend(details.into_iter().map(|(text, y)| TextRun {
            text,
            font: REGULAR_FONT,
            size: 12.0,
            color: Rgb::WHITE,
            x: left + DETAILS_X,
            y: bottom + y,
            rotated: false,
        }));

        // marshal's stub along the right edge, read bottom to top
        let stub_x = left + width - 52.0;
        let stub: [(&str, f32, f32); 5] = [
            (self.holder.as_str(), 0.0, 50.0),
            (self.number.as_str(), 12.0, 62.0),
            (self.seat.as_str(), 24.0, 56.0),
            (self.event.as_str(), 36.0, 56.0),
            (self.venue.as_str(), 48.0, 56.0),
        ];
        runs.extend(stub.into_iter().map(|(text, dx, y)| TextRun {
            text,
            font: REGULAR_FONT,
            size: 8.0,
            color: DARK_BLUE,
            x: stub_x + dx,
            y: bottom + y,
            rotated: true,
        }));

        runs
    }
}
