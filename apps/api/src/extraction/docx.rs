use std::io::{Cursor, Read};

use quick_xml::events::Event;
use quick_xml::Reader;

use super::ExtractionError;

/// Concatenates the paragraph text of `word/document.xml`, one paragraph per line.
pub fn extract_docx_text(data: &[u8]) -> Result<String, ExtractionError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(data)).map_err(docx_err)?;

    let mut document_file = archive.by_name("word/document.xml").map_err(docx_err)?;
    let mut xml = String::new();
    document_file.read_to_string(&mut xml).map_err(docx_err)?;

    paragraphs_from_xml(&xml)
}

fn paragraphs_from_xml(xml: &str) -> Result<String, ExtractionError> {
    let mut reader = Reader::from_str(xml);

    let mut current = String::new();
    let mut lines = Vec::new();
    let mut in_paragraph = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                if e.name().as_ref() == b"w:p" {
                    in_paragraph = true;
                    current.clear();
                }
            }
            Ok(Event::Empty(e)) if in_paragraph => match e.name().as_ref() {
                b"w:tab" => current.push('\t'),
                b"w:br" => current.push('\n'),
                _ => {}
            },
            Ok(Event::End(e)) => {
                if e.name().as_ref() == b"w:p" {
                    if !current.trim().is_empty() {
                        lines.push(current.trim().to_string());
                    }
                    current.clear();
                    in_paragraph = false;
                }
            }
            Ok(Event::Text(e)) => {
                if in_paragraph {
                    let value = e.xml_content().map_err(docx_err)?;
                    current.push_str(&value);
                }
            }
            Ok(Event::GeneralRef(e)) => {
                if in_paragraph {
                    if let Some(c) = resolve_entity(&e) {
                        current.push(c);
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(err) => return Err(docx_err(err)),
            _ => {}
        }
    }

    Ok(lines.join("\n"))
}

fn resolve_entity(name: &[u8]) -> Option<char> {
    match name {
        b"amp" => Some('&'),
        b"lt" => Some('<'),
        b"gt" => Some('>'),
        b"quot" => Some('"'),
        b"apos" => Some('\''),
        [b'#', b'x', hex @ ..] => std::str::from_utf8(hex)
            .ok()
            .and_then(|h| u32::from_str_radix(h, 16).ok())
            .and_then(char::from_u32),
        [b'#', dec @ ..] => std::str::from_utf8(dec)
            .ok()
            .and_then(|d| d.parse::<u32>().ok())
            .and_then(char::from_u32),
        _ => None,
    }
}

fn docx_err(err: impl std::fmt::Display) -> ExtractionError {
    ExtractionError::Docx(err.to_string())
}
