//! Typed FB2 `<description>` and `<binary>` content.

use base64::Engine;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};

use super::body::{Annotation, Image, build_annotation, build_image};
use super::dom::XmlElement;
use crate::book::Author;
use crate::util::detect_mime_type;

/// Base64 as found in the wild: padding optional, trailing bits tolerated.
const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Description {
    pub title_info: TitleInfo,
    pub src_title_info: Option<TitleInfo>,
    pub document_info: Option<DocumentInfo>,
    pub publish_info: Option<PublishInfo>,
    pub custom_info: Vec<CustomInfo>,
}

/// `<title-info>` / `<src-title-info>`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TitleInfo {
    pub genres: Vec<Genre>,
    pub authors: Vec<Person>,
    pub book_title: Option<String>,
    pub annotation: Option<Annotation>,
    pub keywords: Option<String>,
    pub date: Option<Date>,
    pub coverpage: Vec<Image>,
    pub lang: Option<String>,
    pub src_lang: Option<String>,
    pub translators: Vec<Person>,
    pub sequences: Vec<Sequence>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Genre {
    pub name: String,
    /// The `match` attribute, a percentage.
    pub match_percent: Option<u8>,
}

/// An author, translator or publisher record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Person {
    pub first_name: Option<String>,
    pub middle_name: Option<String>,
    pub last_name: Option<String>,
    pub nickname: Option<String>,
    pub home_pages: Vec<String>,
    pub emails: Vec<String>,
    pub id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sequence {
    pub name: String,
    /// Fractional numbers are truncated toward zero.
    pub number: Option<i32>,
    pub children: Vec<Sequence>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Date {
    pub text: Option<String>,
    /// Machine-readable `value` attribute.
    pub value: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentInfo {
    pub authors: Vec<Person>,
    pub program_used: Option<String>,
    pub date: Option<Date>,
    pub src_urls: Vec<String>,
    pub src_ocr: Option<String>,
    pub id: Option<String>,
    pub version: Option<String>,
    pub history: Option<Annotation>,
    pub publishers: Vec<Person>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublishInfo {
    pub book_name: Option<String>,
    pub publisher: Option<String>,
    pub city: Option<String>,
    pub year: Option<String>,
    pub isbn: Option<String>,
    pub sequences: Vec<Sequence>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CustomInfo {
    pub info_type: Option<String>,
    pub text: String,
}

/// A decoded `<binary>` payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binary {
    /// Id with any leading `#` removed.
    pub id: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

impl Person {
    pub fn to_author(&self) -> Author {
        Author {
            first_name: self.first_name.clone(),
            middle_name: self.middle_name.clone(),
            last_name: self.last_name.clone(),
            nickname: self.nickname.clone(),
        }
    }
}

impl Sequence {
    /// Parse a sequence number, truncating any fractional part.
    pub fn parse_number(raw: &str) -> Option<i32> {
        let value: f64 = raw.trim().parse().ok()?;
        if !value.is_finite() {
            return None;
        }
        let truncated = value.trunc();
        (truncated >= i32::MIN as f64 && truncated <= i32::MAX as f64).then_some(truncated as i32)
    }
}

/// Strip the fragment marker from a binary reference: `#cover.jpg` → `cover.jpg`.
pub fn normalize_id(reference: &str) -> &str {
    reference.trim().trim_start_matches('#')
}

// ----------------------------------------------------------------------------
// Tree walk
// ----------------------------------------------------------------------------

pub(crate) fn build_description(el: &XmlElement) -> Description {
    let mut description = Description::default();
    for child in el.elements() {
        match child.local_name().to_ascii_lowercase().as_str() {
            "title-info" => description.title_info = build_title_info(child),
            "src-title-info" => description.src_title_info = Some(build_title_info(child)),
            "document-info" => description.document_info = Some(build_document_info(child)),
            "publish-info" => description.publish_info = Some(build_publish_info(child)),
            "custom-info" => description.custom_info.push(CustomInfo {
                info_type: child.attr_trimmed("info-type"),
                text: child.text_trimmed().unwrap_or_default(),
            }),
            _ => {}
        }
    }
    description
}

fn build_title_info(el: &XmlElement) -> TitleInfo {
    let mut info = TitleInfo::default();
    for child in el.elements() {
        match child.local_name().to_ascii_lowercase().as_str() {
            "genre" => {
                if let Some(name) = child.text_trimmed() {
                    info.genres.push(Genre {
                        name,
                        match_percent: child.attr("match").and_then(|m| m.trim().parse().ok()),
                    });
                }
            }
            "author" => info.authors.push(build_person(child)),
            "book-title" => info.book_title = child.text_trimmed(),
            "annotation" => info.annotation = Some(build_annotation(child)),
            "keywords" => info.keywords = child.text_trimmed(),
            "date" => info.date = Some(build_date(child)),
            "coverpage" => info
                .coverpage
                .extend(child.children_named("image").map(build_image)),
            "lang" => info.lang = child.text_trimmed(),
            "src-lang" => info.src_lang = child.text_trimmed(),
            "translator" => info.translators.push(build_person(child)),
            "sequence" => info.sequences.extend(build_sequence(child)),
            _ => {}
        }
    }
    info
}

fn build_person(el: &XmlElement) -> Person {
    let mut person = Person::default();
    for child in el.elements() {
        let text = child.text_trimmed();
        match child.local_name().to_ascii_lowercase().as_str() {
            "first-name" => person.first_name = text,
            "middle-name" => person.middle_name = text,
            "last-name" => person.last_name = text,
            "nickname" => person.nickname = text,
            "home-page" => person.home_pages.extend(text),
            "email" => person.emails.extend(text),
            "id" => person.id = text,
            _ => {}
        }
    }
    person
}

fn build_sequence(el: &XmlElement) -> Option<Sequence> {
    let name = el.attr_trimmed("name")?;
    Some(Sequence {
        name,
        number: el.attr("number").and_then(Sequence::parse_number),
        children: el
            .children_named("sequence")
            .filter_map(build_sequence)
            .collect(),
    })
}

fn build_date(el: &XmlElement) -> Date {
    Date {
        text: el.text_trimmed(),
        value: el.attr_trimmed("value"),
    }
}

fn build_document_info(el: &XmlElement) -> DocumentInfo {
    let mut info = DocumentInfo::default();
    for child in el.elements() {
        match child.local_name().to_ascii_lowercase().as_str() {
            "author" => info.authors.push(build_person(child)),
            "program-used" => info.program_used = child.text_trimmed(),
            "date" => info.date = Some(build_date(child)),
            "src-url" => info.src_urls.extend(child.text_trimmed()),
            "src-ocr" => info.src_ocr = child.text_trimmed(),
            "id" => info.id = child.text_trimmed(),
            "version" => info.version = child.text_trimmed(),
            "history" => info.history = Some(build_annotation(child)),
            "publisher" => info.publishers.push(build_person(child)),
            _ => {}
        }
    }
    info
}

fn build_publish_info(el: &XmlElement) -> PublishInfo {
    let mut info = PublishInfo::default();
    for child in el.elements() {
        match child.local_name().to_ascii_lowercase().as_str() {
            "book-name" => info.book_name = child.text_trimmed(),
            "publisher" => info.publisher = child.text_trimmed(),
            "city" => info.city = child.text_trimmed(),
            "year" => info.year = child.text_trimmed(),
            "isbn" => info.isbn = child.text_trimmed(),
            "sequence" => info.sequences.extend(build_sequence(child)),
            _ => {}
        }
    }
    info
}

/// Decode one `<binary>`. Errors describe why the entry was dropped.
pub(crate) fn build_binary(el: &XmlElement) -> Result<Binary, String> {
    let id = el
        .attr("id")
        .map(normalize_id)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| "binary without id".to_string())?
        .to_string();

    let payload: Vec<u8> = el
        .text()
        .bytes()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();
    let data = LENIENT_BASE64
        .decode(&payload)
        .map_err(|e| format!("binary {id}: {e}"))?;

    let content_type = el
        .attr_trimmed("content-type")
        .or_else(|| detect_mime_type(&id, &data).map(str::to_string))
        .unwrap_or_else(|| "application/octet-stream".to_string());

    Ok(Binary {
        id,
        content_type,
        data,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fb2::strict;

    fn element(xml: &str) -> XmlElement {
        strict::parse(xml).unwrap()
    }

    #[test]
    fn test_sequence_number_truncates() {
        assert_eq!(Sequence::parse_number("3"), Some(3));
        assert_eq!(Sequence::parse_number(" 2.9 "), Some(2));
        assert_eq!(Sequence::parse_number("-1.5"), Some(-1));
        assert_eq!(Sequence::parse_number("abc"), None);
        assert_eq!(Sequence::parse_number("NaN"), None);
        assert_eq!(Sequence::parse_number("1e20"), None);
    }

    #[test]
    fn test_title_info() {
        let description = build_description(&element(
            r##"<description xmlns:l="http://www.w3.org/1999/xlink"><title-info>
                <genre match="80">sf_history</genre><genre> </genre>
                <author><first-name>John</first-name><last-name>Doe</last-name><nickname>JD</nickname></author>
                <book-title>  The   Title </book-title>
                <annotation><p>One</p><p>Two</p></annotation>
                <date value="2001-01-01">2001</date>
                <coverpage><image l:href="#cover.jpg"/></coverpage>
                <lang>en</lang>
                <sequence name="Saga" number="2.5"><sequence name="Inner"/></sequence>
                <sequence number="1"/>
            </title-info>
            <publish-info><isbn>978-3-16</isbn><sequence name="Publisher Series" number="7"/></publish-info>
            <custom-info info-type="note">hello</custom-info>
            </description>"##,
        ));
        let info = &description.title_info;
        assert_eq!(info.genres, vec![Genre { name: "sf_history".into(), match_percent: Some(80) }]);
        assert_eq!(info.authors[0].to_author().full_name(), "Doe, John (JD)");
        assert_eq!(info.book_title.as_deref(), Some("The Title"));
        assert_eq!(info.annotation.as_ref().unwrap().text(), "One\nTwo");
        assert_eq!(info.date.as_ref().unwrap().value.as_deref(), Some("2001-01-01"));
        assert_eq!(info.coverpage[0].href.as_deref(), Some("#cover.jpg"));
        assert_eq!(info.lang.as_deref(), Some("en"));
        assert_eq!(info.sequences.len(), 1);
        assert_eq!(info.sequences[0].number, Some(2));
        assert_eq!(info.sequences[0].children[0].name, "Inner");

        let publish = description.publish_info.unwrap();
        assert_eq!(publish.isbn.as_deref(), Some("978-3-16"));
        assert_eq!(publish.sequences[0].number, Some(7));
        assert_eq!(description.custom_info[0].info_type.as_deref(), Some("note"));
    }

    #[test]
    fn test_binary_decoding() {
        let binary = build_binary(&element(
            "<binary id=\"#pic.png\" content-type=\"image/png\">\n  aGVs\n  bG8=\n</binary>",
        ))
        .unwrap();
        assert_eq!(binary.id, "pic.png");
        assert_eq!(binary.content_type, "image/png");
        assert_eq!(binary.data, b"hello");
    }

    #[test]
    fn test_binary_without_padding_or_type() {
        let binary = build_binary(&element("<binary id=\"x\">/9j/4A</binary>")).unwrap();
        assert_eq!(binary.data, vec![0xFF, 0xD8, 0xFF, 0xE0]);
        assert_eq!(binary.content_type, "image/jpeg");
    }

    #[test]
    fn test_bad_binaries_are_errors() {
        assert!(build_binary(&element("<binary id=\"x\">@@@@</binary>")).is_err());
        assert!(build_binary(&element("<binary>aGVsbG8=</binary>")).is_err());
    }

    #[test]
    fn test_normalize_id() {
        assert_eq!(normalize_id("#cover.jpg"), "cover.jpg");
        assert_eq!(normalize_id("cover.jpg"), "cover.jpg");
        assert_eq!(normalize_id(" #c "), "c");
    }
}
