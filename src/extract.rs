//! Plain-text extraction from passage HTML.
//!
//! The passage API returns a fragment such as:
//!
//! ```html
//! <p class="p"><span data-number="16" class="v">16</span>Porque de tal manera amó Dios al mundo…</p>
//! ```
//!
//! Verse-number markers (`class="v"`) are dropped together with everything
//! inside them; the remaining text is concatenated, whitespace runs collapse
//! to a single space, and the result is trimmed.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

/// CSS class marking inline verse numbers.
pub const VERSE_NUMBER_CLASS: &str = "v";

/// Extraction error. The caller skips the record rather than storing partial text.
#[derive(Debug)]
pub enum ExtractError {
    Markup(String),
}

impl std::fmt::Display for ExtractError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExtractError::Markup(e) => write!(f, "malformed passage markup: {}", e),
        }
    }
}

impl std::error::Error for ExtractError {}

/// Extract readable text from a passage HTML fragment.
pub fn extract_text(html: &str) -> Result<String, ExtractError> {
    let mut reader = Reader::from_str(html);
    reader.config_mut().check_end_names = false;
    reader.config_mut().trim_text(false);

    let mut out = String::new();
    // Open elements inside a verse marker; zero means text is kept.
    let mut skip_depth = 0usize;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) if is_void(e.local_name().as_ref()) => {
                if skip_depth == 0 && is_break(e.local_name().as_ref()) {
                    out.push(' ');
                }
            }
            Ok(Event::Start(e)) => {
                if skip_depth > 0 {
                    skip_depth += 1;
                } else if has_class(&e, VERSE_NUMBER_CLASS) {
                    skip_depth = 1;
                }
            }
            Ok(Event::End(e)) if is_void(e.local_name().as_ref()) => {}
            Ok(Event::End(e)) => {
                if skip_depth > 0 {
                    skip_depth -= 1;
                } else if is_block(e.local_name().as_ref()) {
                    out.push(' ');
                }
            }
            Ok(Event::Empty(e)) => {
                if skip_depth == 0 && is_break(e.local_name().as_ref()) {
                    out.push(' ');
                }
            }
            Ok(Event::Text(t)) => {
                if skip_depth == 0 {
                    match t.unescape_with(resolve_html_entity) {
                        Ok(s) => out.push_str(&s),
                        Err(_) => out.push_str(&decode_entities(&String::from_utf8_lossy(&t))),
                    }
                }
            }
            Ok(Event::CData(t)) => {
                if skip_depth == 0 {
                    out.push_str(&String::from_utf8_lossy(&t));
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(ExtractError::Markup(e.to_string())),
            _ => {}
        }
    }

    Ok(collapse_whitespace(&out))
}

fn has_class(e: &BytesStart<'_>, class: &str) -> bool {
    e.attributes().flatten().any(|attr| {
        attr.key.as_ref() == b"class"
            && String::from_utf8_lossy(&attr.value)
                .split_whitespace()
                .any(|c| c == class)
    })
}

fn is_block(name: &[u8]) -> bool {
    matches!(name, b"p" | b"div" | b"li" | b"h1" | b"h2" | b"h3" | b"h4")
}

fn is_break(name: &[u8]) -> bool {
    matches!(name, b"br" | b"hr")
}

/// HTML elements that never have content, whether or not they self-close.
fn is_void(name: &[u8]) -> bool {
    matches!(
        name,
        b"br" | b"hr"
            | b"img"
            | b"wbr"
            | b"input"
            | b"meta"
            | b"link"
            | b"area"
            | b"col"
            | b"source"
            | b"embed"
            | b"param"
            | b"track"
            | b"base"
    )
}

fn resolve_html_entity(entity: &str) -> Option<&'static str> {
    match entity {
        "nbsp" => Some(" "),
        "aacute" => Some("á"),
        "eacute" => Some("é"),
        "iacute" => Some("í"),
        "oacute" => Some("ó"),
        "uacute" => Some("ú"),
        "Aacute" => Some("Á"),
        "Eacute" => Some("É"),
        "Iacute" => Some("Í"),
        "Oacute" => Some("Ó"),
        "Uacute" => Some("Ú"),
        "ntilde" => Some("ñ"),
        "Ntilde" => Some("Ñ"),
        "uuml" => Some("ü"),
        "Uuml" => Some("Ü"),
        "ccedil" => Some("ç"),
        "atilde" => Some("ã"),
        "otilde" => Some("õ"),
        "acirc" => Some("â"),
        "ecirc" => Some("ê"),
        "ocirc" => Some("ô"),
        "agrave" => Some("à"),
        "iexcl" => Some("¡"),
        "iquest" => Some("¿"),
        "laquo" => Some("«"),
        "raquo" => Some("»"),
        "mdash" => Some("—"),
        "ndash" => Some("–"),
        "lsquo" => Some("‘"),
        "rsquo" => Some("’"),
        "ldquo" => Some("“"),
        "rdquo" => Some("”"),
        "hellip" => Some("…"),
        _ => None,
    }
}

fn resolve_entity(entity: &str) -> Option<String> {
    match entity {
        "amp" => return Some("&".to_string()),
        "lt" => return Some("<".to_string()),
        "gt" => return Some(">".to_string()),
        "quot" => return Some("\"".to_string()),
        "apos" => return Some("'".to_string()),
        _ => {}
    }
    if let Some(num) = entity.strip_prefix('#') {
        let code = match num.strip_prefix(['x', 'X']) {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => num.parse().ok()?,
        };
        return char::from_u32(code).map(String::from);
    }
    resolve_html_entity(entity).map(str::to_string)
}

/// Decode the entities we know and leave any other `&name;` as written.
fn decode_entities(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp..];
        let decoded = tail[1..]
            .find(';')
            .and_then(|semi| resolve_entity(&tail[1..=semi]).map(|s| (s, semi + 2)));
        match decoded {
            Some((text, len)) => {
                out.push_str(&text);
                rest = &tail[len..];
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

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
