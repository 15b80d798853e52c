use std::fs;
use std::io::Read;
use std::path::Path;

use edu_core::error::{codes, AppError};

const DOCUMENT_PART: &str = "word/document.xml";

/// Plain text of a DOCX body: text runs in order, paragraphs separated by a blank line,
/// `<w:tab/>` as a tab and `<w:br/>`/`<w:cr/>` as a newline.
pub fn extract_docx_text(path: &Path) -> Result<String, AppError> {
    let load_err = |msg: &str, err: String| {
        AppError::new(codes::DOCUMENT_LOAD_FAILED, msg.to_string())
            .with_details(format!("path={}; err={}", path.display(), err))
    };

    let file = fs::File::open(path).map_err(|e| load_err("Failed to open DOCX file", e.to_string()))?;
    let mut archive = zip::ZipArchive::new(file)
        .map_err(|e| load_err("Failed to open DOCX as ZIP archive", e.to_string()))?;
    let mut part = archive
        .by_name(DOCUMENT_PART)
        .map_err(|e| load_err("DOCX is missing word/document.xml", e.to_string()))?;
    let mut xml = String::new();
    part.read_to_string(&mut xml)
        .map_err(|e| load_err("Failed to read word/document.xml", e.to_string()))?;

    Ok(document_xml_to_text(&xml))
}

pub(crate) fn document_xml_to_text(xml: &str) -> String {
    let mut out = String::new();
    let mut rest = xml;
    let mut in_text = false;
    // Tab stops declared in paragraph properties are layout, not content.
    let mut in_props = false;

    while let Some(lt) = rest.find('<') {
        if in_text {
            out.push_str(&decode_entities(&rest[..lt]));
        }
        let Some(gt) = rest[lt..].find('>') else {
            break;
        };
        let tag = &rest[lt + 1..lt + gt];
        rest = &rest[lt + gt + 1..];

        let name = tag
            .trim_start_matches('/')
            .split(|c: char| c.is_whitespace() || c == '/')
            .next()
            .unwrap_or("");
        let closing = tag.starts_with('/');
        let self_closing = tag.ends_with('/');

        match name {
            "w:t" if !closing && !self_closing => in_text = true,
            "w:t" if closing => in_text = false,
            "w:pPr" if !self_closing => in_props = !closing,
            "w:tab" if !closing && !in_props => out.push('\t'),
            "w:br" | "w:cr" if !closing => out.push('\n'),
            "w:p" if closing || self_closing => out.push_str("\n\n"),
            _ => {}
        }
    }

    out.trim().to_string()
}

/// Named XML entities plus `&#N;` / `&#xH;` character references, in one pass.
/// Anything unrecognised is kept as written.
fn decode_entities(s: &str) -> String {
    if !s.contains('&') {
        return s.to_string();
    }
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        let decoded = rest
            .find(';')
            .filter(|&semi| semi <= 12)
            .and_then(|semi| decode_entity(&rest[1..semi]).map(|c| (c, semi)));
        match decoded {
            Some((c, semi)) => {
                out.push(c);
                rest = &rest[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_entity(name: &str) -> Option<char> {
    match name {
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "amp" => Some('&'),
        _ => {
            let num = name.strip_prefix('#')?;
            let code = match num.strip_prefix('x').or_else(|| num.strip_prefix('X')) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => num.parse::<u32>().ok()?,
            };
            char::from_u32(code)
        }
    }
}
