//! Plain text → paginated A4 PDF.
//!
//! Every non-blank input line becomes one paragraph in Helvetica 10/12 with a fixed
//! gap after it. Paragraphs wrap at the text column and flow onto new pages.
//! CPU-bound: call from `tokio::task::spawn_blocking`.

pub mod metrics;

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream, StringFormat};
use thiserror::Error;
use tracing::debug;

use metrics::HELVETICA;

pub const PAGE_WIDTH_PT: f32 = 595.28;
pub const PAGE_HEIGHT_PT: f32 = 841.89;
const MARGIN_PT: f32 = 72.0;
const FONT_SIZE_PT: f32 = 10.0;
const LEADING_PT: f32 = 12.0;
const PARAGRAPH_SPACING_PT: f32 = 12.0;
const FONT_RESOURCE: &str = "F1";

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("PDF encoding failed: {0}")]
    Pdf(#[from] lopdf::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// One laid-out line of text; `y` is the baseline, measured from the page bottom.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedLine {
    pub x: f32,
    pub y: f32,
    pub text: String,
}

/// Splits text into paragraphs: one per non-blank line, trimmed, in input order.
pub fn paragraphs(text: &str) -> Vec<&str> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect()
}

/// Places paragraphs on pages. Always returns at least one (possibly empty) page.
pub fn layout(paragraphs: &[&str]) -> Vec<Vec<PlacedLine>> {
    let text_width_em = (PAGE_WIDTH_PT - 2.0 * MARGIN_PT) / FONT_SIZE_PT;
    let top = PAGE_HEIGHT_PT - MARGIN_PT;

    let mut pages: Vec<Vec<PlacedLine>> = vec![Vec::new()];
    let mut cursor = top;

    for paragraph in paragraphs {
        for line in HELVETICA.wrap(paragraph, text_width_em) {
            if cursor - LEADING_PT < MARGIN_PT {
                pages.push(Vec::new());
                cursor = top;
            }
            let baseline = cursor - FONT_SIZE_PT;
            cursor -= LEADING_PT;
            if let Some(page) = pages.last_mut() {
                page.push(PlacedLine {
                    x: MARGIN_PT,
                    y: baseline,
                    text: line,
                });
            }
        }
        // Spacing that runs past the bottom margin is absorbed by the page break above.
        cursor -= PARAGRAPH_SPACING_PT;
    }

    pages
}

/// Renders `text` as a PDF and returns the finished file bytes.
pub fn render_document(text: &str) -> Result<Vec<u8>, RenderError> {
    let pages = layout(&paragraphs(text));

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { FONT_RESOURCE => font_id },
    });

    let mut kids: Vec<Object> = Vec::with_capacity(pages.len());
    for page in &pages {
        let page_id = add_page(&mut doc, pages_id, resources_id, page)?;
        kids.push(page_id.into());
    }

    let page_count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => page_count,
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Real(PAGE_WIDTH_PT),
                Object::Real(PAGE_HEIGHT_PT),
            ],
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.compress();

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)?;
    debug!(
        "Rendered document: {} page(s), {} bytes",
        pages.len(),
        buffer.len()
    );
    Ok(buffer)
}

fn add_page(
    doc: &mut Document,
    pages_id: ObjectId,
    resources_id: ObjectId,
    lines: &[PlacedLine],
) -> Result<ObjectId, RenderError> {
    let mut operations = Vec::with_capacity(lines.len() * 5);
    for line in lines {
        operations.push(Operation::new("BT", vec![]));
        operations.push(Operation::new(
            "Tf",
            vec![FONT_RESOURCE.into(), Object::Real(FONT_SIZE_PT)],
        ));
        operations.push(Operation::new(
            "Td",
            vec![Object::Real(line.x), Object::Real(line.y)],
        ));
        operations.push(Operation::new(
            "Tj",
            vec![Object::String(
                encode_win_ansi(&line.text),
                StringFormat::Literal,
            )],
        ));
        operations.push(Operation::new("ET", vec![]));
    }

    let content = Content { operations };
    let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));

    Ok(doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Resources" => resources_id,
        "Contents" => content_id,
    }))
}

/// Encodes text for a standard Type1 font with `WinAnsiEncoding`.
/// Common typographic punctuation is mapped; anything else beyond Latin-1 becomes `?`.
fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            '\u{2018}' => 0x91,
            '\u{2019}' => 0x92,
            '\u{201C}' => 0x93,
            '\u{201D}' => 0x94,
            '\u{2022}' => 0x95,
            '\u{2013}' => 0x96,
            '\u{2014}' => 0x97,
            '\u{2026}' => 0x85,
            '\u{20AC}' => 0x80,
            '\t' => b' ',
            c if (c as u32) < 0x20 => b' ',
            c if (0x80..0xA0).contains(&(c as u32)) => b'?',
            c if (c as u32) <= 0xFF => c as u32 as u8,
            _ => b'?',
        })
        .collect()
}
