//! Low-level PDF assembly on top of `lopdf`.

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream, StringFormat};

use super::layout::{PageBox, Placement};
use super::RenderError;

pub const REGULAR_FONT: &str = "F1";
pub const BOLD_FONT: &str = "F2";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub const BLACK: Rgb = Rgb(0, 0, 0);
    pub const WHITE: Rgb = Rgb(255, 255, 255);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Rgb(r, g, b)
    }

    pub fn operands(self) -> Vec<Object> {
        vec![
            real(self.0 as f32 / 255.0),
            real(self.1 as f32 / 255.0),
            real(self.2 as f32 / 255.0),
        ]
    }
}

pub fn real(value: f32) -> Object {
    Object::Real(value)
}

pub fn name(value: &str) -> Object {
    Object::Name(value.as_bytes().to_vec())
}

/// Standard Helvetica pair registered under [`REGULAR_FONT`] and [`BOLD_FONT`].
pub fn standard_fonts(doc: &mut Document) -> Dictionary {
    let regular = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let bold = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica-Bold",
        "Encoding" => "WinAnsiEncoding",
    });

    dictionary! {
        REGULAR_FONT => regular,
        BOLD_FONT => bold,
    }
}

/// Text run placed with its baseline origin at `(x, y)`, optionally rotated
/// counter-clockwise by 90 degrees.
#[derive(Debug, Clone)]
pub struct TextRun<'a> {
    pub text: &'a str,
    pub font: &'static str,
    pub size: f32,
    pub color: Rgb,
    pub x: f32,
    pub y: f32,
    pub rotated: bool,
}

impl TextRun<'_> {
    pub fn operations(&self) -> Vec<Operation> {
        let matrix = if self.rotated {
            vec![real(0.0), real(1.0), real(-1.0), real(0.0), real(self.x), real(self.y)]
        } else {
            vec![real(1.0), real(0.0), real(0.0), real(1.0), real(self.x), real(self.y)]
        };

        vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec![name(self.font), real(self.size)]),
            Operation::new("rg", self.color.operands()),
            Operation::new("Tm", matrix),
            Operation::new("Tj", vec![Object::String(win_ansi(self.text), StringFormat::Literal)]),
            Operation::new("ET", vec![]),
        ]
    }
}

// Latin-1 lines up with WinAnsi for printable characters; anything else becomes '?'
fn win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match u32::from(c) {
            code @ 0x20..=0x7E | code @ 0xA0..=0xFF => code as u8,
            _ => b'?',
        })
        .collect()
}

/// Advance width of `text` in points for the standard Helvetica faces.
pub fn text_width(text: &str, font: &str, size: f32) -> f32 {
    let widths = if font == BOLD_FONT {
        &HELVETICA_BOLD_WIDTHS
    } else {
        &HELVETICA_WIDTHS
    };

    let units: u32 = text
        .chars()
        .map(|c| match u32::from(c) {
            code @ 0x20..=0x7E => u32::from(widths[(code - 0x20) as usize]),
            _ => 556,
        })
        .sum();

    units as f32 * size / 1000.0
}

/// Copies the first page of `source` into `target` as a form XObject and
/// returns it with the page's MediaBox.
pub fn import_first_page(
    target: &mut Document,
    mut source: Document,
) -> Result<(ObjectId, PageBox), RenderError> {
    source.renumber_objects_with(target.max_id + 1);

    let page_id = source
        .get_pages()
        .values()
        .next()
        .copied()
        .ok_or(RenderError::EmptyDocument)?;
    let page_box = media_box(&source, page_id)?;
    let content = source.get_page_content(page_id)?;
    let resources = page_resources(&source, page_id)?;

    let source_max = source.objects.keys().map(|(id, _)| *id).max().unwrap_or(0);
    target.max_id = target.max_id.max(source_max);
    target.objects.extend(source.objects);

    let bbox: Vec<Object> = page_box.corners().into_iter().map(real).collect();
    let form = Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Form",
            "BBox" => bbox,
            "Resources" => resources,
        },
        content,
    );

    Ok((target.add_object(form), page_box))
}

/// Draws a form XObject registered as `/{form}` with the given placement.
pub fn place_form(form: &str, placement: Placement) -> Vec<Operation> {
    vec![
        Operation::new("q", vec![]),
        Operation::new(
            "cm",
            vec![
                real(placement.scale),
                real(0.0),
                real(0.0),
                real(placement.scale),
                real(placement.tx),
                real(placement.ty),
            ],
        ),
        Operation::new("Do", vec![name(form)]),
        Operation::new("Q", vec![]),
    ]
}

/// Adds the single page, page tree and catalog, then drops objects that were
/// imported but are no longer reachable.
pub fn finish_single_page(
    doc: &mut Document,
    page_box: PageBox,
    resources: Dictionary,
    operations: Vec<Operation>,
) -> Result<(), RenderError> {
    let pages_id = doc.new_object_id();
    let content = Content { operations }.encode()?;
    let content_id = doc.add_object(Stream::new(dictionary! {}, content));

    let media_box: Vec<Object> = page_box.corners().into_iter().map(real).collect();
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => media_box,
        "Contents" => content_id,
        "Resources" => resources,
    });

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![Object::Reference(page_id)],
            "Count" => 1,
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    doc.prune_objects();
    doc.compress();
    Ok(())
}

fn media_box(doc: &Document, page_id: ObjectId) -> Result<PageBox, RenderError> {
    let Some(object) = inherited(doc, page_id, b"MediaBox")? else {
        return Ok(super::layout::LETTER);
    };

    let values = resolve(doc, object)?
        .as_array()?
        .iter()
        .map(|value| resolve(doc, value).and_then(|v| Ok(v.as_float()?)))
        .collect::<Result<Vec<f32>, RenderError>>()?;

    match values.as_slice() {
        [llx, lly, urx, ury] if urx > llx && ury > lly => {
            Ok(PageBox::new(*llx, *lly, urx - llx, ury - lly))
        }
        _ => Err(RenderError::MalformedPage("MediaBox")),
    }
}

fn page_resources(doc: &Document, page_id: ObjectId) -> Result<Dictionary, RenderError> {
    match inherited(doc, page_id, b"Resources")? {
        Some(object) => Ok(resolve(doc, object)?.as_dict()?.clone()),
        None => Ok(Dictionary::new()),
    }
}

// Looks the key up on the page, then up the page tree
fn inherited<'a>(
    doc: &'a Document,
    page_id: ObjectId,
    key: &[u8],
) -> Result<Option<&'a Object>, RenderError> {
    let mut node = doc.get_dictionary(page_id)?;
    loop {
        if let Ok(value) = node.get(key) {
            return Ok(Some(value));
        }
        match node.get(b"Parent").and_then(Object::as_reference) {
            Ok(parent) => node = doc.get_dictionary(parent)?,
            Err(_) => return Ok(None),
        }
    }
}

fn resolve<'a>(doc: &'a Document, object: &'a Object) -> Result<&'a Object, RenderError> {
    match object {
        Object::Reference(id) => Ok(doc.get_object(*id)?),
        other => Ok(other),
    }
}

// Advance widths (1/1000 em) for ASCII 0x20..=0x7E, from the Adobe core font metrics
#[rustfmt::skip]
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556,
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556,
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556,
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584,
];

#[rustfmt::skip]
const HELVETICA_BOLD_WIDTHS: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611,
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556,
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611,
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn widths_follow_the_font_metrics() {
        // "A" is 667 units in Helvetica, 722 in Helvetica-Bold
        assert!((text_width("A", REGULAR_FONT, 10.0) - 6.67).abs() < 1e-4);
        assert!((text_width("A", BOLD_FONT, 10.0) - 7.22).abs() < 1e-4);
        assert_eq!(text_width("", REGULAR_FONT, 12.0), 0.0);
        assert!(text_width("Concert Hall", BOLD_FONT, 20.0) > text_width("Concert", BOLD_FONT, 20.0));
    }

    #[test]
    fn non_latin_text_is_replaced_rather_than_dropped() {
        assert_eq!(win_ansi("Café"), vec![b'C', b'a', b'f', 0xE9]);
        assert_eq!(win_ansi("Зал 1"), b"??? 1".to_vec());
    }

    #[test]
    fn rotated_text_uses_a_quarter_turn_matrix() {
        let run = TextRun {
            text: "A1B2C3",
            font: REGULAR_FONT,
            size: 8.0,
            color: Rgb::BLACK,
            x: 100.0,
            y: 50.0,
            rotated: true,
        };
        let ops = run.operations();
        let tm = ops.iter().find(|op| op.operator == "Tm").unwrap();
        let matrix: Vec<f32> = tm.operands.iter().map(|o| o.as_float().unwrap()).collect();
        assert_eq!(matrix, vec![0.0, 1.0, -1.0, 0.0, 100.0, 50.0]);
    }

    #[test]
    fn imported_page_keeps_its_media_box() {
        let mut source = Document::with_version("1.5");
        let fonts = standard_fonts(&mut source);
        let run = TextRun {
            text: "background",
            font: REGULAR_FONT,
            size: 12.0,
            color: Rgb::BLACK,
            x: 10.0,
            y: 10.0,
            rotated: false,
        };
        finish_single_page(
            &mut source,
            PageBox::new(0.0, 0.0, 500.0, 200.0),
            dictionary! { "Font" => fonts },
            run.operations(),
        )
        .unwrap();

        let mut target = Document::with_version("1.5");
        let (form_id, page_box) = import_first_page(&mut target, source).unwrap();

        assert_eq!(page_box, PageBox::new(0.0, 0.0, 500.0, 200.0));
        let form = target.get_object(form_id).unwrap().as_stream().unwrap();
        assert_eq!(form.dict.get(b"Subtype").unwrap().as_name().unwrap(), b"Form");
        assert!(target.max_id >= form_id.0);
    }

    #[test]
    fn document_without_pages_cannot_be_imported() {
        let mut target = Document::with_version("1.5");
        let err = import_first_page(&mut target, Document::with_version("1.5")).unwrap_err();
        assert!(matches!(err, RenderError::EmptyDocument));
    }
}
