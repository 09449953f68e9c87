//! Tolerant FictionBook (FB2) parsing.
//!
//! FB2 files in the wild are frequently broken: byte order marks or junk
//! before the prolog, bare `&` in text, unclosed tags. [`FictionBook::parse`]
//! therefore tries a chain of stages and keeps the first tree it gets:
//!
//! 1. Sniff the declared encoding from the prolog (UTF-8 if absent).
//! 2. Check that the first non-blank line starts with `<`.
//! 3. Strict XML parse of the decoded document (skipped if step 2 failed).
//! 4. Strict XML parse after discarding everything before the first `<`.
//! 5. Tag-soup parse with XML semantics, which does not fail on syntax.
//!
//! I/O errors from the data supplier abort immediately at any stage.

mod body;
mod dom;
mod handler;
mod model;
mod soup;
mod strict;

pub use body::{
    Annotation, Block, Body, Cite, Epigraph, Flow, Image, Paragraph, Poem, Section, SectionItem,
    Span, Stanza, Table, TableCell, Title,
};
pub use dom::{XmlElement, XmlNode};
pub use handler::Fb2Handler;
pub(crate) use strict::resolve_entity;
pub use model::{
    Binary, CustomInfo, Date, Description, DocumentInfo, Genre, Person, PublishInfo, Sequence,
    TitleInfo, normalize_id,
};

use std::collections::HashMap;
use std::io::Read;

use encoding_rs::Encoding;
use quick_xml::Reader;
use quick_xml::events::Event;
use tracing::{debug, warn};

use crate::book::{Author, Cover};
use crate::error::{Error, Result};
use crate::handler::DataSupplier;
use crate::util::{encoding_for_label, extract_xml_encoding};

/// How much of the stream is read to find the XML declaration.
const PROLOG_PEEK: u64 = 1024;

/// The stage whose tree was used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParseStage {
    /// The document was well-formed as delivered.
    Strict,
    /// Well-formed once leading junk was removed.
    Cleaned,
    /// Only the tag-soup parser accepted it.
    TagSoup,
}

/// A parsed FB2 document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FictionBook {
    /// Namespace declarations on the root, prefix → URI (`""` for default).
    pub namespaces: Vec<(String, String)>,
    pub description: Description,
    pub bodies: Vec<Body>,
    /// Keyed by id without the leading `#`.
    pub binaries: HashMap<String, Binary>,
    stage: ParseStage,
}

impl FictionBook {
    /// Parse the document `name`, opening the supplier as often as needed.
    pub fn parse(name: &str, data: DataSupplier<'_>) -> Result<Self> {
        let encoding = sniff_encoding(data)?;

        let mut bytes = Vec::new();
        data()?.read_to_end(&mut bytes)?;
        let (text, _) = encoding.decode_without_bom_handling(&bytes);

        let clean_start = starts_with_markup(&text);
        if !clean_start {
            debug!(document = name, "leading characters before markup");
        }

        if clean_start {
            match strict::parse(&text) {
                Ok(root) => return Ok(Self::from_root(&root, ParseStage::Strict)),
                Err(e) => debug!(document = name, error = %e, "strict parse failed"),
            }
        }

        let cleaned = text.find('<').map_or(&text[..], |pos| &text[pos..]);
        match strict::parse(cleaned) {
            Ok(root) => return Ok(Self::from_root(&root, ParseStage::Cleaned)),
            Err(e) => debug!(document = name, error = %e, "cleaned parse failed"),
        }

        match soup::parse(cleaned) {
            Some(root) => {
                warn!(document = name, "malformed markup, parsed as tag soup");
                Ok(Self::from_root(&root, ParseStage::TagSoup))
            }
            None => Err(Error::Parse(format!("{name}: no markup found"))),
        }
    }

    /// Parse an in-memory document.
    pub fn parse_bytes(name: &str, bytes: &[u8]) -> Result<Self> {
        let owned = bytes.to_vec();
        let data = move || -> std::io::Result<crate::handler::ByteStream> {
            Ok(Box::new(std::io::Cursor::new(owned.clone())))
        };
        Self::parse(name, &data)
    }

    /// Build from a root element in a single walk over its children.
    fn from_root(root: &XmlElement, stage: ParseStage) -> Self {
        let mut book = Self {
            namespaces: root.namespaces(),
            description: Description::default(),
            bodies: Vec::new(),
            binaries: HashMap::new(),
            stage,
        };

        for child in root.elements() {
            match child.local_name().to_ascii_lowercase().as_str() {
                "description" => book.description = model::build_description(child),
                "body" => book.bodies.push(body::build_body(child)),
                "binary" => match model::build_binary(child) {
                    Ok(binary) => {
                        book.binaries.entry(binary.id.clone()).or_insert(binary);
                    }
                    Err(e) => warn!(error = %e, "dropping undecodable binary"),
                },
                _ => {}
            }
        }
        book
    }

    pub fn stage(&self) -> ParseStage {
        self.stage
    }

    pub fn title_info(&self) -> &TitleInfo {
        &self.description.title_info
    }

    /// Book title. A document without one cannot be cataloged.
    pub fn title(&self) -> Result<&str> {
        self.title_info()
            .book_title
            .as_deref()
            .ok_or_else(|| Error::MissingElement("title-info/book-title".into()))
    }

    /// One author per `<author>` element, in document order, including
    /// authors with no name parts.
    pub fn authors(&self) -> Vec<Author> {
        self.title_info()
            .authors
            .iter()
            .map(Person::to_author)
            .collect()
    }

    pub fn genres(&self) -> Vec<String> {
        self.title_info()
            .genres
            .iter()
            .map(|genre| genre.name.clone())
            .collect()
    }

    pub fn sequence(&self) -> Option<&Sequence> {
        self.title_info().sequences.first()
    }

    pub fn sequence_name(&self) -> Option<&str> {
        self.sequence().map(|s| s.name.as_str())
    }

    pub fn sequence_number(&self) -> Option<i32> {
        self.sequence().and_then(|s| s.number)
    }

    /// Binary referenced by the first cover-page image. A dangling
    /// reference yields `None`.
    pub fn cover(&self) -> Option<Cover> {
        let href = self.title_info().coverpage.first()?.href.as_deref()?;
        let binary = self.binary(href)?;
        Some(Cover {
            data: binary.data.clone(),
            content_type: binary.content_type.clone(),
        })
    }

    /// Look up a binary by id or `#id` reference.
    pub fn binary(&self, reference: &str) -> Option<&Binary> {
        self.binaries.get(normalize_id(reference))
    }

    /// Annotation text: the title-info annotation, else the first section
    /// annotation of the main body.
    pub fn annotation(&self) -> Option<String> {
        self.title_info()
            .annotation
            .as_ref()
            .or_else(|| self.body().and_then(Body::first_annotation))
            .map(Annotation::text)
            .filter(|text| !text.is_empty())
    }

    /// Main body: the first one without a name, else the first body.
    pub fn body(&self) -> Option<&Body> {
        self.bodies
            .iter()
            .find(|body| body.name.is_none())
            .or_else(|| self.bodies.first())
    }

    /// Body with the given name. Falls back to the first body when no body
    /// carries that name.
    pub fn body_named(&self, name: &str) -> Option<&Body> {
        self.bodies
            .iter()
            .find(|body| body.is_named(name))
            .or_else(|| self.bodies.first())
    }

    pub fn notes(&self) -> Option<&Body> {
        self.body_named("notes")
    }

    pub fn comments(&self) -> Option<&Body> {
        self.body_named("comments")
    }

    pub fn lang(&self) -> Option<&str> {
        self.title_info().lang.as_deref()
    }
}

/// Encoding declared in the prolog, read from the head of the stream only.
fn sniff_encoding(data: DataSupplier<'_>) -> Result<&'static Encoding> {
    let mut head = Vec::new();
    data()?.take(PROLOG_PEEK).read_to_end(&mut head)?;

    if let Some((bom_encoding, _)) = Encoding::for_bom(&head)
        && bom_encoding != encoding_rs::UTF_8
    {
        return Ok(bom_encoding);
    }

    let declared = declared_encoding(&head)
        .or_else(|| extract_xml_encoding(&head).map(str::to_string));
    let encoding = declared
        .as_deref()
        .and_then(encoding_for_label)
        .unwrap_or(encoding_rs::UTF_8);
    // UTF-16 labels on a stream without a UTF-16 BOM are bogus.
    if encoding == encoding_rs::UTF_16LE || encoding == encoding_rs::UTF_16BE {
        return Ok(encoding_rs::UTF_8);
    }
    Ok(encoding)
}

/// Walk prolog events until the declaration or the first element.
fn declared_encoding(head: &[u8]) -> Option<String> {
    let mut reader = Reader::from_reader(head);
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Decl(decl)) => {
                let encoding = decl.encoding()?.ok()?;
                return Some(String::from_utf8_lossy(&encoding).into_owned());
            }
            Ok(Event::Start(_)) | Ok(Event::Empty(_)) | Ok(Event::Eof) | Err(_) => return None,
            Ok(_) => {}
        }
        buf.clear();
    }
}

/// First non-blank line starts with `<`. Only characters up to U+0020 count
/// as blank, so a byte order mark is a leading illegal character.
fn starts_with_markup(text: &str) -> bool {
    text.lines()
        .map(|line| line.trim_matches(|c: char| c <= ' '))
        .find(|line| !line.is_empty())
        .is_some_and(|line| line.starts_with('<'))
}
