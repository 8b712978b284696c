//! Paragraph extraction from OOXML word-processing packages.
//!
//! Only body-level paragraphs are collected. Tables and text boxes are skipped, and all run
//! formatting is discarded: the result is the plain text of each paragraph in document order.

use std::io::{Cursor, Read};

use quick_xml::Reader;
use quick_xml::events::Event;
use zip::ZipArchive;

use super::ConversionError;

const DOCUMENT_PART: &str = "word/document.xml";

/// Ceiling on the decompressed size of the main document part.
const MAX_DOCUMENT_PART_BYTES: u64 = 64 * 1024 * 1024;

/// Read the raw text of every body paragraph, including empty ones.
pub(crate) fn read_paragraphs(content: &[u8]) -> Result<Vec<String>, ConversionError> {
    read_paragraphs_within(content, MAX_DOCUMENT_PART_BYTES)
}

fn read_paragraphs_within(content: &[u8], limit: u64) -> Result<Vec<String>, ConversionError> {
    let mut archive = ZipArchive::new(Cursor::new(content))
        .map_err(|error| ConversionError::Archive(error.to_string()))?;
    let mut part = archive
        .by_name(DOCUMENT_PART)
        .map_err(|_| ConversionError::MissingPart(DOCUMENT_PART))?;
    if part.size() > limit {
        return Err(part_too_large());
    }

    // The declared size is not trusted; the read itself is bounded too.
    let mut raw = Vec::new();
    part.by_ref()
        .take(limit + 1)
        .read_to_end(&mut raw)
        .map_err(|error| ConversionError::Archive(error.to_string()))?;
    if raw.len() as u64 > limit {
        return Err(part_too_large());
    }
    let xml = String::from_utf8(raw)
        .map_err(|error| ConversionError::Xml(format!("document part is not UTF-8: {error}")))?;
    parse_document_xml(&xml)
}

fn part_too_large() -> ConversionError {
    ConversionError::Archive("document part too large".into())
}

fn parse_document_xml(xml: &str) -> Result<Vec<String>, ConversionError> {
    let mut reader = Reader::from_str(xml);
    let mut paragraphs = Vec::new();
    let mut current: Option<String> = None;
    // Depth inside tables and text boxes, whose paragraphs are not part of the body flow.
    let mut skipped = 0usize;
    let mut in_run = false;
    let mut in_text = false;

    loop {
        let event = reader
            .read_event()
            .map_err(|error| ConversionError::Xml(error.to_string()))?;
        match event {
            Event::Start(tag) => match tag.name().as_ref() {
                b"w:tbl" | b"w:txbxContent" => skipped += 1,
                b"w:p" if skipped == 0 && current.is_none() => current = Some(String::new()),
                b"w:r" => in_run = true,
                b"w:t" => in_text = true,
                _ => {}
            },
            Event::Empty(tag) => {
                if skipped > 0 {
                    continue;
                }
                match tag.name().as_ref() {
                    b"w:p" if current.is_none() => paragraphs.push(String::new()),
                    b"w:tab" if in_run => push_char(&mut current, '\t'),
                    b"w:br" | b"w:cr" if in_run => push_char(&mut current, '\n'),
                    _ => {}
                }
            }
            Event::Text(text) if in_text && skipped == 0 => {
                if let Some(paragraph) = current.as_mut() {
                    let unescaped = text
                        .unescape()
                        .map_err(|error| ConversionError::Xml(error.to_string()))?;
                    paragraph.push_str(&unescaped);
                }
            }
            Event::End(tag) => match tag.name().as_ref() {
                b"w:tbl" | b"w:txbxContent" => skipped = skipped.saturating_sub(1),
                b"w:p" if skipped == 0 => {
                    if let Some(paragraph) = current.take() {
                        paragraphs.push(paragraph);
                    }
                }
                b"w:r" => in_run = false,
                b"w:t" => in_text = false,
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(paragraphs)
}

fn push_char(current: &mut Option<String>, ch: char) {
    if let Some(paragraph) = current.as_mut() {
        paragraph.push(ch);
    }
}
