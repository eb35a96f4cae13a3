use std::fs::File;
use std::io::Read;
use std::path::Path;

use once_cell::sync::Lazy;
use ragctx_core::error::ExtractError;
use regex::Regex;
use zip::ZipArchive;

const BODY_PART: &str = "word/document.xml";

static PARAGRAPH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<w:p(?:\s+[^>]*[^/>])?\s*>(.*?)</w:p>").expect("valid regex"));
static RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<w:r(?:\s+[^>]*[^/>])?\s*>(.*?)</w:r>").expect("valid regex"));
static RUN_CONTENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)<w:t(?:\s[^>]*)?>([^<]*)</w:t>|<w:(tab|br|cr)(?:\s[^>]*)?/>").expect("valid regex")
});

/// Extract the body paragraphs of an OOXML word-processing document.
/// Empty paragraphs are dropped; the rest are joined with newlines.
pub fn extract_docx(path: &Path) -> Result<String, ExtractError> {
    let parse_err = |reason: String| ExtractError::Parse { path: path.to_path_buf(), reason };

    let file = File::open(path).map_err(|source| ExtractError::Io { path: path.to_path_buf(), source })?;
    let mut archive = ZipArchive::new(file).map_err(|e| parse_err(format!("not a docx archive: {e}")))?;
    let mut xml = String::new();
    archive
        .by_name(BODY_PART)
        .map_err(|e| parse_err(format!("missing {BODY_PART}: {e}")))?
        .read_to_string(&mut xml)
        .map_err(|e| parse_err(format!("unreadable {BODY_PART}: {e}")))?;

    Ok(paragraphs(&xml).join("\n"))
}

fn paragraphs(xml: &str) -> Vec<String> {
    PARAGRAPH
        .captures_iter(xml)
        .map(|p| paragraph_text(&p[1]))
        .filter(|t| !t.trim().is_empty())
        .collect()
}

/// Text of the runs in one paragraph. Paragraph properties (`<w:pPr>`, which
/// holds tab stops) sit outside any run and are never scanned.
fn paragraph_text(body: &str) -> String {
    let mut out = String::new();
    for run in RUN.captures_iter(body) {
        for cap in RUN_CONTENT.captures_iter(&run[1]) {
            match (cap.get(1), cap.get(2).map(|m| m.as_str())) {
                (Some(text), _) => out.push_str(&decode_entities(text.as_str())),
                (None, Some("tab")) => out.push('\t'),
                (None, Some(_)) => out.push('\n'),
                (None, None) => {}
            }
        }
    }
    out
}

fn decode_entities(s: &str) -> String {
    if !s.contains('&') {
        return s.to_string();
    }
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp..];
        let Some(semi) = tail.find(';') else {
            out.push_str(tail);
            return out;
        };
        let entity = &tail[1..semi];
        let decoded = match entity {
            "amp" => Some('&'),
            "lt" => Some('<'),
            "gt" => Some('>'),
            "quot" => Some('"'),
            "apos" => Some('\''),
            _ => entity
                .strip_prefix("#x")
                .or_else(|| entity.strip_prefix("#X"))
                .and_then(|hex| u32::from_str_radix(hex, 16).ok())
                .or_else(|| entity.strip_prefix('#').and_then(|dec| dec.parse().ok()))
                .and_then(char::from_u32),
        };
        match decoded {
            Some(c) => {
                out.push(c);
                rest = &tail[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}
