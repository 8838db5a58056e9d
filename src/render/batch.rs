use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use lopdf::{dictionary, Dictionary, Document};
use serde::Serialize;
use tempfile::NamedTempFile;
use tracing::{debug, info, instrument};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::layout::{fit, quadrant, sheet_count, LETTER, TICKETS_PER_SHEET};
use super::pdf::{finish_single_page, import_first_page, place_form};
use super::ticket::{render_document, ticket_file_name, TicketTemplate};
use super::RenderError;
use crate::models::Ticket;
use crate::services::ticket_number::is_ticket_number;

/// Where a batch ended up and what went into it.
#[derive(Debug, Clone, Serialize)]
pub struct BatchArchive {
    pub path: PathBuf,
    pub archive_name: String,
    pub sheets: usize,
    pub tickets: usize,
}

/// Lays tickets four to a Letter sheet and zips the sheets per event.
#[derive(Debug, Clone)]
pub struct BatchRenderer {
    template_path: PathBuf,
    batch_dir: PathBuf,
}

impl BatchRenderer {
    pub fn new(template_path: impl Into<PathBuf>, batch_dir: impl Into<PathBuf>) -> Self {
        Self {
            template_path: template_path.into(),
            batch_dir: batch_dir.into(),
        }
    }

    /// Renders `tickets` in order and writes `Tickets - {event}.zip`, replacing an
    /// earlier archive for the same event. Intermediate files live in a scratch
    /// directory that is removed on every exit path. Blocking.
    #[instrument(skip(self, tickets), fields(event = %event_name, count = tickets.len()))]
    pub fn render_event(
        &self,
        event_name: &str,
        tickets: &[Ticket],
    ) -> Result<BatchArchive, RenderError> {
        if tickets.is_empty() {
            return Err(RenderError::NothingToRender);
        }
        if let Some(bad) = tickets.iter().find(|t| !is_ticket_number(&t.ticket_number)) {
            return Err(RenderError::InvalidTicketNumber(bad.ticket_number.clone()));
        }

        let template = TicketTemplate::load(&self.template_path)?;
        fs::create_dir_all(&self.batch_dir)?;
        let scratch = tempfile::Builder::new()
            .prefix(".batch-")
            .tempdir_in(&self.batch_dir)?;

        let mut singles = Vec::with_capacity(tickets.len());
        for (index, ticket) in tickets.iter().enumerate() {
            let mut doc = render_document(&template, ticket)?;
            let path = scratch
                .path()
                .join(format!("{:05}-{}", index, ticket_file_name(&ticket.ticket_number)));
            doc.save(&path)?;
            debug!("rendered single {} for {}", index + 1, ticket.ticket_number);
            singles.push(path);
        }

        let mut sheets = Vec::with_capacity(sheet_count(singles.len()));
        for (index, group) in singles.chunks(TICKETS_PER_SHEET).enumerate() {
            let mut sheet = compose_sheet(group)?;
            let path = scratch.path().join(sheet_file_name(index + 1));
            sheet.save(&path)?;
            debug!("composed sheet {} with {} tickets", index + 1, group.len());
            sheets.push(path);
        }

        let archive_name = archive_name(event_name);
        let path = self.batch_dir.join(&archive_name);
        write_archive(&sheets, &path)?;

        scratch.close()?;
        info!("batch archive {} written with {} sheets", path.display(), sheets.len());

        Ok(BatchArchive {
            path,
            archive_name,
            sheets: sheets.len(),
            tickets: tickets.len(),
        })
    }
}

pub fn sheet_file_name(sheet: usize) -> String {
    format!("Batch-{}.pdf", sheet)
}

pub fn archive_name(event_name: &str) -> String {
    format!("Tickets - {}.zip", file_name_safe(event_name))
}

/// Replaces characters that are not allowed in file names on common platforms.
pub fn file_name_safe(name: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    let trimmed = replaced.trim().trim_end_matches('.');
    if trimmed.is_empty() {
        "Event".to_string()
    } else {
        trimmed.to_string()
    }
}

// Places up to four rendered singles on one Letter page
fn compose_sheet(singles: &[PathBuf]) -> Result<Document, RenderError> {
    let mut doc = Document::with_version("1.5");
    let mut forms = Dictionary::new();
    let mut ops = Vec::new();

    for (slot, path) in singles.iter().enumerate() {
        let single = Document::load(path)?;
        let (form, page) = import_first_page(&mut doc, single)?;
        let form_name = format!("T{}", slot);
        ops.extend(place_form(&form_name, fit(page, quadrant(LETTER, slot))));
        forms.set(form_name, form);
    }

    finish_single_page(&mut doc, LETTER, dictionary! { "XObject" => forms }, ops)?;
    Ok(doc)
}

fn write_archive(sheets: &[PathBuf], path: &Path) -> Result<(), RenderError> {
    let dir = path
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let mut zip = ZipWriter::new(NamedTempFile::new_in(dir)?);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for (index, sheet) in sheets.iter().enumerate() {
        zip.start_file(sheet_file_name(index + 1), options)?;
        io::copy(&mut File::open(sheet)?, &mut zip)?;
    }

    zip.finish()?.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::test_support::{template_bytes, ticket};

    #[test]
    fn archive_name_keeps_readable_event_names() {
        assert_eq!(archive_name("Autumn Recital"), "Tickets - Autumn Recital.zip");
        assert_eq!(archive_name("Café Night"), "Tickets - Café Night.zip");
    }

    #[test]
    fn path_separators_never_reach_the_file_system() {
        assert_eq!(file_name_safe("../etc/passwd"), ".._etc_passwd");
        assert_eq!(file_name_safe("A/B: C?"), "A_B_ C_");
        assert_eq!(file_name_safe("Line\nBreak"), "Line_Break");
    }

    #[test]
    fn blank_names_fall_back_to_a_placeholder() {
        assert_eq!(file_name_safe("   "), "Event");
        assert_eq!(file_name_safe("..."), "Event");
        assert_eq!(file_name_safe(" Gala. "), "Gala");
    }

    #[test]
    fn sheet_holds_one_form_per_ticket() {
        let dir = tempfile::tempdir().unwrap();
        let template = TicketTemplate::from_bytes("template.pdf", template_bytes()).unwrap();

        let singles: Vec<PathBuf> = ["000001", "000002", "000003"]
            .iter()
            .map(|number| {
                let path = dir.path().join(ticket_file_name(number));
                render_document(&template, &ticket(number, "1")).unwrap().save(&path).unwrap();
                path
            })
            .collect();

        let sheet = compose_sheet(&singles).unwrap();
        let page_id = *sheet.get_pages().values().next().unwrap();
        let content = String::from_utf8_lossy(&sheet.get_page_content(page_id).unwrap()).into_owned();

        assert_eq!(sheet.get_pages().len(), 1);
        assert_eq!(content.matches(" Do").count(), 3);
        assert!(content.contains("/T2 Do"));
        assert!(!content.contains("/T3 Do"));
    }

    #[test]
    fn empty_batch_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = BatchRenderer::new(dir.path().join("template.pdf"), dir.path());

        let err = renderer.render_event("Gala", &[]).unwrap_err();
        assert!(matches!(err, RenderError::NothingToRender));
    }
}
