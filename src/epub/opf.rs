//! container.xml and OPF package metadata.

use std::collections::HashMap;

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use crate::error::{Error, Result};
use crate::fb2::resolve_entity;

/// Metadata read from an OPF package document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OpfPackage {
    pub title: Option<String>,
    pub creators: Vec<Creator>,
    pub descriptions: Vec<String>,
    pub subjects: Vec<String>,
    pub language: Option<String>,
    /// `<meta name="..." content="..."/>` pairs, first occurrence wins.
    pub meta: HashMap<String, String>,
    /// Href and media type of the cover image, relative to the OPF.
    pub cover: Option<(String, String)>,
}

/// A `dc:creator` entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Creator {
    pub name: String,
    /// `opf:file-as`, usually `Last, First`.
    pub file_as: Option<String>,
    /// `opf:role`, e.g. `aut`.
    pub role: Option<String>,
}

/// Locate the OPF path in `META-INF/container.xml`.
pub fn parse_container_xml(bytes: &[u8]) -> Result<String> {
    let content = std::str::from_utf8(strip_bom(bytes))
        .map_err(|e| Error::InvalidEpub(format!("container.xml: {e}")))?;

    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(true);

    loop {
        match reader.read_event()? {
            Event::Empty(e) | Event::Start(e) if local_name(e.name().as_ref()) == b"rootfile" => {
                if let Some(path) = attr(&e, b"full-path") {
                    return Ok(path);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Err(Error::InvalidEpub("no rootfile in container.xml".into()))
}

struct ManifestItem {
    href: String,
    media_type: String,
    properties: Option<String>,
}

/// Parse the metadata and manifest sections of an OPF document.
pub fn parse_opf(content: &str) -> Result<OpfPackage> {
    let mut reader = Reader::from_str(content);
    // Entity references split text events, so trimming happens per element.
    reader.config_mut().trim_text(false);

    let mut package = OpfPackage::default();
    let mut manifest: HashMap<String, ManifestItem> = HashMap::new();
    let mut epub2_cover_id: Option<String> = None;

    let mut in_metadata = false;
    let mut current: Option<(Vec<u8>, Option<Creator>)> = None;
    let mut buf_text = String::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let name = e.name();
                let local = local_name(name.as_ref());
                match local {
                    b"metadata" => in_metadata = true,
                    b"title" | b"creator" | b"description" | b"subject" | b"language"
                        if in_metadata =>
                    {
                        let creator = (local == b"creator").then(|| Creator {
                            name: String::new(),
                            file_as: attr(&e, b"file-as"),
                            role: attr(&e, b"role"),
                        });
                        current = Some((local.to_vec(), creator));
                        buf_text.clear();
                    }
                    b"meta" if in_metadata => record_meta(&e, &mut package, &mut epub2_cover_id),
                    _ => {}
                }
            }
            Event::Empty(e) => {
                let name = e.name();
                match local_name(name.as_ref()) {
                    b"item" => {
                        if let Some(id) = attr(&e, b"id") {
                            manifest.insert(
                                id,
                                ManifestItem {
                                    href: attr(&e, b"href").unwrap_or_default(),
                                    media_type: attr(&e, b"media-type").unwrap_or_default(),
                                    properties: attr(&e, b"properties"),
                                },
                            );
                        }
                    }
                    b"meta" if in_metadata => record_meta(&e, &mut package, &mut epub2_cover_id),
                    _ => {}
                }
            }
            Event::Text(e) => {
                if current.is_some() {
                    buf_text.push_str(&String::from_utf8_lossy(e.as_ref()));
                }
            }
            Event::GeneralRef(e) => {
                if current.is_some()
                    && let Some(resolved) = resolve_entity(&String::from_utf8_lossy(e.as_ref()))
                {
                    buf_text.push_str(&resolved);
                }
            }
            Event::End(e) => {
                let name = e.name();
                let local = local_name(name.as_ref());
                if local == b"metadata" {
                    in_metadata = false;
                }
                if let Some((element, creator)) = current.take() {
                    if element != local {
                        current = Some((element, creator));
                        continue;
                    }
                    let text = buf_text.trim().to_string();
                    buf_text.clear();
                    if text.is_empty() {
                        continue;
                    }
                    match element.as_slice() {
                        b"title" if package.title.is_none() => package.title = Some(text),
                        b"creator" => {
                            let mut creator = creator.unwrap_or_default();
                            creator.name = text;
                            package.creators.push(creator);
                        }
                        b"description" => package.descriptions.push(text),
                        b"subject" => package.subjects.push(text),
                        b"language" if package.language.is_none() => package.language = Some(text),
                        _ => {}
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    let epub3_cover = manifest.values().find(|item| {
        item.properties
            .as_ref()
            .is_some_and(|props| props.split_ascii_whitespace().any(|p| p == "cover-image"))
    });
    let cover = epub3_cover.or_else(|| epub2_cover_id.and_then(|id| manifest.get(&id)));
    package.cover = cover.map(|item| (item.href.clone(), item.media_type.clone()));

    Ok(package)
}

fn record_meta(e: &BytesStart<'_>, package: &mut OpfPackage, cover_id: &mut Option<String>) {
    let (Some(name), Some(content)) = (attr(e, b"name"), attr(e, b"content")) else {
        return;
    };
    if name == "cover" {
        *cover_id = Some(content.clone());
    }
    package.meta.entry(name).or_insert(content);
}

fn attr(e: &BytesStart<'_>, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| local_name(a.key.as_ref()) == key)
        .map(|a| unescape_attr(&String::from_utf8_lossy(&a.value)))
}

fn unescape_attr(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let after = &rest[amp + 1..];
        match after.find(';').and_then(|semi| Some((semi, resolve_entity(&after[..semi])?))) {
            Some((semi, resolved)) => {
                out.push_str(&resolved);
                rest = &after[semi + 1..];
            }
            None => {
                out.push('&');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

fn local_name(name: &[u8]) -> &[u8] {
    name.iter()
        .rposition(|&b| b == b':')
        .map(|i| &name[i + 1..])
        .unwrap_or(name)
}

fn strip_bom(data: &[u8]) -> &[u8] {
    data.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_container_xml_with_bom() {
        let mut container = vec![0xEF, 0xBB, 0xBF];
        container.extend_from_slice(
            br#"<?xml version="1.0"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles><rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/></rootfiles>
</container>"#,
        );
        assert_eq!(parse_container_xml(&container).unwrap(), "OEBPS/content.opf");
        assert!(parse_container_xml(b"<container/>").is_err());
    }

    #[test]
    fn test_parse_opf_metadata() {
        let opf = r#"<?xml version="1.0"?>
<package xmlns="http://www.idpf.org/2007/opf" xmlns:opf="http://www.idpf.org/2007/opf" version="2.0">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
    <dc:title>Test &amp; Book</dc:title>
    <dc:creator opf:file-as="Doe, John" opf:role="aut">John Doe</dc:creator>
    <dc:creator opf:role="edt">Ed Itor</dc:creator>
    <dc:description>About it.</dc:description>
    <dc:subject>Fiction</dc:subject>
    <dc:subject>Adventure</dc:subject>
    <dc:language>en</dc:language>
    <meta name="calibre:series" content="Saga"/>
    <meta name="calibre:series_index" content="2.0"/>
    <meta name="cover" content="cover-id"/>
  </metadata>
  <manifest>
    <item id="cover-id" href="images/cover.png" media-type="image/png"/>
  </manifest>
</package>"#;

        let package = parse_opf(opf).unwrap();
        assert_eq!(package.title.as_deref(), Some("Test & Book"));
        assert_eq!(package.creators.len(), 2);
        assert_eq!(package.creators[0].file_as.as_deref(), Some("Doe, John"));
        assert_eq!(package.creators[1].role.as_deref(), Some("edt"));
        assert_eq!(package.descriptions, vec!["About it."]);
        assert_eq!(package.subjects, vec!["Fiction", "Adventure"]);
        assert_eq!(package.language.as_deref(), Some("en"));
        assert_eq!(package.meta.get("calibre:series").map(String::as_str), Some("Saga"));
        assert_eq!(
            package.cover,
            Some(("images/cover.png".to_string(), "image/png".to_string()))
        );
    }

    #[test]
    fn test_epub3_cover_property_wins() {
        let opf = r#"<package><metadata><meta name="cover" content="old"/></metadata>
  <manifest>
    <item id="old" href="old.jpg" media-type="image/jpeg"/>
    <item id="new" href="new.jpg" media-type="image/jpeg" properties="cover-image"/>
  </manifest></package>"#;
        let package = parse_opf(opf).unwrap();
        assert_eq!(package.cover.unwrap().0, "new.jpg");
    }

    #[test]
    fn test_unescape_attr() {
        assert_eq!(unescape_attr("a &amp; b"), "a & b");
        assert_eq!(unescape_attr("a & b"), "a & b");
        assert_eq!(unescape_attr("&#65;&bogus;"), "A&bogus;");
    }
}
