//! Well-formedness-checking parse into an [`XmlElement`] tree.

use std::borrow::Cow;

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use super::dom::{TreeBuilder, XmlElement};

/// Parse `text` as XML. Any well-formedness problem is returned as a message:
/// mismatched or unclosed tags, unknown entities, bare `&`, stray text or a
/// second element outside the root.
pub(crate) fn parse(text: &str) -> Result<XmlElement, String> {
    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(false);
    reader.config_mut().check_end_names = true;

    let mut builder = TreeBuilder::default();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let (name, attrs) = element_parts(&e)?;
                ensure_single_root(&builder, &name)?;
                builder.open(name, attrs)?;
            }
            Ok(Event::Empty(e)) => {
                let (name, attrs) = element_parts(&e)?;
                ensure_single_root(&builder, &name)?;
                builder.open(name, attrs)?;
                builder.close();
            }
            Ok(Event::End(_)) => {
                if !builder.close() {
                    return Err("end tag without open element".into());
                }
            }
            Ok(Event::Text(e)) => {
                let raw = String::from_utf8_lossy(e.as_ref());
                if raw.contains('&') {
                    return Err("unescaped '&' in text".into());
                }
                if builder.depth() == 0 {
                    if !raw.trim().is_empty() {
                        return Err("text outside the root element".into());
                    }
                } else {
                    builder.text(&raw);
                }
            }
            Ok(Event::CData(e)) => {
                if builder.depth() > 0 {
                    builder.text(&String::from_utf8_lossy(e.as_ref()));
                }
            }
            Ok(Event::GeneralRef(e)) => {
                let entity = String::from_utf8_lossy(e.as_ref());
                let resolved = resolve_entity(&entity)
                    .ok_or_else(|| format!("unknown entity &{entity};"))?;
                if builder.depth() == 0 {
                    return Err("reference outside the root element".into());
                }
                builder.text(&resolved);
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(e.to_string()),
            // Declarations, comments, processing instructions, doctype
            Ok(_) => {}
        }
    }

    builder.finish_balanced()
}

fn ensure_single_root(builder: &TreeBuilder, name: &str) -> Result<(), String> {
    if builder.depth() == 0 && builder.has_root() {
        return Err(format!("second root element <{name}>"));
    }
    Ok(())
}

fn element_parts(e: &BytesStart<'_>) -> Result<(String, Vec<(String, String)>), String> {
    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
    let mut attrs = Vec::new();
    for attr in e.attributes() {
        let attr = attr.map_err(|err| format!("bad attribute on <{name}>: {err}"))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let raw = String::from_utf8_lossy(&attr.value);
        let value = unescape(&raw).ok_or_else(|| format!("bad reference in attribute {key}"))?;
        attrs.push((key, value.into_owned()));
    }
    Ok((name, attrs))
}

/// Replace `&...;` references. `None` on unknown or unterminated ones.
fn unescape(raw: &str) -> Option<Cow<'_, str>> {
    if !raw.contains('&') {
        return Some(Cow::Borrowed(raw));
    }
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let after = &rest[amp + 1..];
        let semi = after.find(';')?;
        out.push_str(&resolve_entity(&after[..semi])?);
        rest = &after[semi + 1..];
    }
    out.push_str(rest);
    Some(Cow::Owned(out))
}

/// Predefined XML entities and numeric character references.
pub(crate) fn resolve_entity(entity: &str) -> Option<String> {
    match entity {
        "apos" => return Some("'".to_string()),
        "quot" => return Some("\"".to_string()),
        "lt" => return Some("<".to_string()),
        "gt" => return Some(">".to_string()),
        "amp" => return Some("&".to_string()),
        _ => {}
    }

    let code = if let Some(hex) = entity
        .strip_prefix("#x")
        .or_else(|| entity.strip_prefix("#X"))
    {
        u32::from_str_radix(hex, 16).ok()?
    } else {
        entity.strip_prefix('#')?.parse::<u32>().ok()?
    };
    char::from_u32(code).map(|c| c.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_well_formed_document() {
        let root = parse(
            r##"<?xml version="1.0" encoding="utf-8"?>
<FictionBook xmlns="http://www.gribuser.ru/xml/fictionbook/2.0" xmlns:l="http://www.w3.org/1999/xlink">
  <body><section><p>Tom &amp; Jerry &#x41;&#66;</p><image l:href="#pic"/></section></body>
</FictionBook>"##,
        )
        .unwrap();
        assert!(root.is("fictionbook"));
        let section = root.child("body").unwrap().child("section").unwrap();
        assert_eq!(section.child("p").unwrap().text(), "Tom & Jerry AB");
        assert_eq!(section.child("image").unwrap().attr("href"), Some("#pic"));
    }

    #[test]
    fn test_rejects_bare_ampersand() {
        assert!(parse("<a><p>Tom & Jerry</p></a>").is_err());
    }

    #[test]
    fn test_rejects_mismatched_and_unclosed_tags() {
        assert!(parse("<a><b></a></b>").is_err());
        assert!(parse("<a><b></b>").is_err());
        assert!(parse("<a></a><b></b>").is_err());
    }

    #[test]
    fn test_rejects_leading_garbage() {
        assert!(parse("\u{feff}junk<a></a>").is_err());
    }

    #[test]
    fn test_rejects_unknown_entities() {
        assert!(parse("<a>&nbsp;</a>").is_err());
        assert!(parse(r#"<a b="&bogus;"/>"#).is_err());
    }

    #[test]
    fn test_unescapes_attributes() {
        let root = parse(r#"<a title="x &lt; y"/>"#).unwrap();
        assert_eq!(root.attr("title"), Some("x < y"));
    }

    #[test]
    fn test_resolve_entity() {
        assert_eq!(resolve_entity("amp").as_deref(), Some("&"));
        assert_eq!(resolve_entity("#x263A").as_deref(), Some("☺"));
        assert_eq!(resolve_entity("#1044").as_deref(), Some("Д"));
        assert_eq!(resolve_entity("nbsp"), None);
        assert_eq!(resolve_entity("#xD800"), None);
    }
}
