//! Typed FB2 body content: bodies, sections and their inline flow.
//!
//! Built in a single recursive pass over the element tree. Unknown elements
//! are skipped wherever they appear.

use super::dom::{XmlElement, XmlNode, collapse_whitespace};

/// A `<body>`. The unnamed one is the main text; `notes` and `comments`
/// bodies carry footnotes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Body {
    pub name: Option<String>,
    pub lang: Option<String>,
    pub blocks: Vec<Block>,
}

/// Block-level children of a body or section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Section(Section),
    Title(Title),
    Epigraph(Epigraph),
    Image(Image),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Section {
    pub id: Option<String>,
    pub lang: Option<String>,
    pub items: Vec<SectionItem>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SectionItem {
    Block(Block),
    Annotation(Annotation),
    Flow(Flow),
}

/// Paragraph-level content shared by sections, annotations, cites and
/// epigraphs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Flow {
    Paragraph(Paragraph),
    Subtitle(Paragraph),
    Poem(Poem),
    Cite(Cite),
    Table(Table),
    EmptyLine,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Title {
    /// `None` entries are `<empty-line/>`s.
    pub lines: Vec<Option<Paragraph>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Epigraph {
    pub id: Option<String>,
    pub content: Vec<Flow>,
    pub text_authors: Vec<Paragraph>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Annotation {
    pub id: Option<String>,
    pub content: Vec<Flow>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cite {
    pub id: Option<String>,
    pub content: Vec<Flow>,
    pub text_authors: Vec<Paragraph>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Poem {
    pub id: Option<String>,
    pub title: Option<Title>,
    pub epigraphs: Vec<Epigraph>,
    pub stanzas: Vec<Stanza>,
    pub text_authors: Vec<Paragraph>,
    pub date: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Stanza {
    pub title: Option<Title>,
    pub subtitle: Option<Paragraph>,
    pub lines: Vec<Paragraph>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    pub rows: Vec<Vec<TableCell>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableCell {
    pub header: bool,
    pub content: Paragraph,
}

/// Image reference. `href` is kept as written, usually `#binary-id`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Image {
    pub href: Option<String>,
    pub alt: Option<String>,
    pub title: Option<String>,
    pub id: Option<String>,
}

/// A paragraph-like run of styled text (`p`, `v`, `subtitle`, `text-author`,
/// table cells).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Paragraph {
    pub id: Option<String>,
    pub style: Option<String>,
    pub spans: Vec<Span>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Span {
    Text(String),
    Strong(Vec<Span>),
    Emphasis(Vec<Span>),
    Strikethrough(Vec<Span>),
    Sub(Vec<Span>),
    Sup(Vec<Span>),
    Code(Vec<Span>),
    Style { name: Option<String>, spans: Vec<Span> },
    Link { href: Option<String>, kind: Option<String>, spans: Vec<Span> },
    Image(Image),
}

// ----------------------------------------------------------------------------
// Text projections
// ----------------------------------------------------------------------------

fn join_lines<I: IntoIterator<Item = String>>(parts: I) -> String {
    parts
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

impl Body {
    pub fn is_named(&self, name: &str) -> bool {
        self.name.as_deref() == Some(name)
    }

    pub fn sections(&self) -> impl Iterator<Item = &Section> {
        self.blocks.iter().filter_map(|block| match block {
            Block::Section(section) => Some(section),
            _ => None,
        })
    }

    pub fn text(&self) -> String {
        join_lines(self.blocks.iter().map(Block::text))
    }

    /// First annotation found in a depth-first walk of the sections.
    pub fn first_annotation(&self) -> Option<&Annotation> {
        self.sections().find_map(Section::first_annotation)
    }
}

impl Block {
    pub fn text(&self) -> String {
        match self {
            Block::Section(section) => section.text(),
            Block::Title(title) => title.text(),
            Block::Epigraph(epigraph) => epigraph.text(),
            Block::Image(_) => String::new(),
        }
    }
}

impl Section {
    pub fn title(&self) -> Option<&Title> {
        self.items.iter().find_map(|item| match item {
            SectionItem::Block(Block::Title(title)) => Some(title),
            _ => None,
        })
    }

    pub fn subsections(&self) -> impl Iterator<Item = &Section> {
        self.items.iter().filter_map(|item| match item {
            SectionItem::Block(Block::Section(section)) => Some(section),
            _ => None,
        })
    }

    pub fn first_annotation(&self) -> Option<&Annotation> {
        self.items.iter().find_map(|item| match item {
            SectionItem::Annotation(annotation) => Some(annotation),
            SectionItem::Block(Block::Section(section)) => section.first_annotation(),
            _ => None,
        })
    }

    pub fn text(&self) -> String {
        join_lines(self.items.iter().map(|item| match item {
            SectionItem::Block(block) => block.text(),
            SectionItem::Annotation(annotation) => annotation.text(),
            SectionItem::Flow(flow) => flow.text(),
        }))
    }
}

impl Flow {
    pub fn text(&self) -> String {
        match self {
            Flow::Paragraph(p) | Flow::Subtitle(p) => p.text(),
            Flow::Poem(poem) => poem.text(),
            Flow::Cite(cite) => cite.text(),
            Flow::Table(table) => table.text(),
            Flow::EmptyLine => String::new(),
        }
    }
}

impl Title {
    pub fn text(&self) -> String {
        join_lines(self.lines.iter().flatten().map(Paragraph::text))
    }
}

impl Epigraph {
    pub fn text(&self) -> String {
        join_lines(
            self.content
                .iter()
                .map(Flow::text)
                .chain(self.text_authors.iter().map(Paragraph::text)),
        )
    }
}

impl Annotation {
    pub fn text(&self) -> String {
        join_lines(self.content.iter().map(Flow::text))
    }
}

impl Cite {
    pub fn text(&self) -> String {
        join_lines(
            self.content
                .iter()
                .map(Flow::text)
                .chain(self.text_authors.iter().map(Paragraph::text)),
        )
    }
}

impl Poem {
    pub fn text(&self) -> String {
        let title = self.title.iter().map(Title::text);
        let stanzas = self.stanzas.iter().map(Stanza::text);
        let authors = self.text_authors.iter().map(Paragraph::text);
        join_lines(title.chain(stanzas).chain(authors))
    }
}

impl Stanza {
    pub fn text(&self) -> String {
        let title = self.title.iter().map(Title::text);
        let subtitle = self.subtitle.iter().map(Paragraph::text);
        join_lines(title.chain(subtitle).chain(self.lines.iter().map(Paragraph::text)))
    }
}

impl Table {
    pub fn text(&self) -> String {
        join_lines(self.rows.iter().map(|row| {
            row.iter()
                .map(|cell| cell.content.text())
                .collect::<Vec<_>>()
                .join("\t")
        }))
    }
}

impl Paragraph {
    /// Plain text with whitespace collapsed.
    pub fn text(&self) -> String {
        let mut raw = String::new();
        for span in &self.spans {
            span.collect_text(&mut raw);
        }
        collapse_whitespace(&raw)
    }
}

impl Span {
    fn collect_text(&self, out: &mut String) {
        match self {
            Span::Text(text) => out.push_str(text),
            Span::Strong(spans)
            | Span::Emphasis(spans)
            | Span::Strikethrough(spans)
            | Span::Sub(spans)
            | Span::Sup(spans)
            | Span::Code(spans)
            | Span::Style { spans, .. }
            | Span::Link { spans, .. } => {
                for span in spans {
                    span.collect_text(out);
                }
            }
            Span::Image(_) => {}
        }
    }
}

// ----------------------------------------------------------------------------
// Tree walk
// ----------------------------------------------------------------------------

pub(crate) fn build_body(el: &XmlElement) -> Body {
    Body {
        name: el.attr_trimmed("name"),
        lang: el.attr_trimmed("lang"),
        blocks: el.elements().filter_map(build_block).collect(),
    }
}

fn build_block(el: &XmlElement) -> Option<Block> {
    let block = match el.local_name().to_ascii_lowercase().as_str() {
        "section" => Block::Section(build_section(el)),
        "title" => Block::Title(build_title(el)),
        "epigraph" => Block::Epigraph(build_epigraph(el)),
        "image" => Block::Image(build_image(el)),
        _ => return None,
    };
    Some(block)
}

fn build_section(el: &XmlElement) -> Section {
    let items = el
        .elements()
        .filter_map(|child| {
            if child.is("annotation") {
                Some(SectionItem::Annotation(build_annotation(child)))
            } else if let Some(block) = build_block(child) {
                Some(SectionItem::Block(block))
            } else {
                build_flow(child).map(SectionItem::Flow)
            }
        })
        .collect();
    Section {
        id: el.attr_trimmed("id"),
        lang: el.attr_trimmed("lang"),
        items,
    }
}

fn build_flow(el: &XmlElement) -> Option<Flow> {
    let flow = match el.local_name().to_ascii_lowercase().as_str() {
        "p" => Flow::Paragraph(build_paragraph(el)),
        "subtitle" => Flow::Subtitle(build_paragraph(el)),
        "poem" => Flow::Poem(build_poem(el)),
        "cite" => Flow::Cite(build_cite(el)),
        "table" => Flow::Table(build_table(el)),
        "empty-line" => Flow::EmptyLine,
        _ => return None,
    };
    Some(flow)
}

fn build_flows(el: &XmlElement) -> Vec<Flow> {
    el.elements().filter_map(build_flow).collect()
}

pub(crate) fn build_annotation(el: &XmlElement) -> Annotation {
    Annotation {
        id: el.attr_trimmed("id"),
        content: build_flows(el),
    }
}

fn build_title(el: &XmlElement) -> Title {
    let lines = el
        .elements()
        .filter_map(|child| {
            if child.is("p") {
                Some(Some(build_paragraph(child)))
            } else if child.is("empty-line") {
                Some(None)
            } else {
                None
            }
        })
        .collect();
    Title { lines }
}

fn text_authors(el: &XmlElement) -> Vec<Paragraph> {
    el.children_named("text-author").map(build_paragraph).collect()
}

fn build_epigraph(el: &XmlElement) -> Epigraph {
    Epigraph {
        id: el.attr_trimmed("id"),
        content: build_flows(el),
        text_authors: text_authors(el),
    }
}

fn build_cite(el: &XmlElement) -> Cite {
    Cite {
        id: el.attr_trimmed("id"),
        content: build_flows(el),
        text_authors: text_authors(el),
    }
}

fn build_poem(el: &XmlElement) -> Poem {
    Poem {
        id: el.attr_trimmed("id"),
        title: el.child("title").map(build_title),
        epigraphs: el.children_named("epigraph").map(build_epigraph).collect(),
        stanzas: el.children_named("stanza").map(build_stanza).collect(),
        text_authors: text_authors(el),
        date: el.child("date").and_then(XmlElement::text_trimmed),
    }
}

fn build_stanza(el: &XmlElement) -> Stanza {
    Stanza {
        title: el.child("title").map(build_title),
        subtitle: el.child("subtitle").map(build_paragraph),
        lines: el.children_named("v").map(build_paragraph).collect(),
    }
}

fn build_table(el: &XmlElement) -> Table {
    let rows = el
        .children_named("tr")
        .map(|row| {
            row.elements()
                .filter(|cell| cell.is("td") || cell.is("th"))
                .map(|cell| TableCell {
                    header: cell.is("th"),
                    content: build_paragraph(cell),
                })
                .collect()
        })
        .collect();
    Table { rows }
}

pub(crate) fn build_image(el: &XmlElement) -> Image {
    Image {
        href: el.attr_trimmed("href"),
        alt: el.attr_trimmed("alt"),
        title: el.attr_trimmed("title"),
        id: el.attr_trimmed("id"),
    }
}

fn build_paragraph(el: &XmlElement) -> Paragraph {
    Paragraph {
        id: el.attr_trimmed("id"),
        style: el.attr_trimmed("style"),
        spans: build_spans(el),
    }
}

fn build_spans(el: &XmlElement) -> Vec<Span> {
    el.children
        .iter()
        .map(|node| match node {
            XmlNode::Text(text) => Span::Text(text.clone()),
            XmlNode::Element(child) => build_span(child),
        })
        .collect()
}

fn build_span(el: &XmlElement) -> Span {
    match el.local_name().to_ascii_lowercase().as_str() {
        "strong" => Span::Strong(build_spans(el)),
        "emphasis" => Span::Emphasis(build_spans(el)),
        "strikethrough" => Span::Strikethrough(build_spans(el)),
        "sub" => Span::Sub(build_spans(el)),
        "sup" => Span::Sup(build_spans(el)),
        "code" => Span::Code(build_spans(el)),
        "style" => Span::Style {
            name: el.attr_trimmed("name"),
            spans: build_spans(el),
        },
        "a" => Span::Link {
            href: el.attr_trimmed("href"),
            kind: el.attr_trimmed("type"),
            spans: build_spans(el),
        },
        "image" => Span::Image(build_image(el)),
        // Unknown inline markup keeps its text.
        _ => Span::Style {
            name: None,
            spans: build_spans(el),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fb2::strict;

    fn body(xml: &str) -> Body {
        build_body(&strict::parse(xml).unwrap())
    }

    #[test]
    fn test_nested_sections_and_flow() {
        let body = body(
            "<body><title><p>Book</p></title>\
             <section id=\"s1\"><title><p>Chapter <emphasis>One</emphasis></p></title>\
             <p>First  paragraph.</p><empty-line/>\
             <section><p>Nested</p></section></section></body>",
        );
        assert_eq!(body.blocks.len(), 2);
        let section = body.sections().next().unwrap();
        assert_eq!(section.id.as_deref(), Some("s1"));
        assert_eq!(section.title().unwrap().text(), "Chapter One");
        assert_eq!(section.subsections().count(), 1);
        assert_eq!(section.text(), "Chapter One\nFirst paragraph.\nNested");
        assert_eq!(body.text(), "Book\nChapter One\nFirst paragraph.\nNested");
    }

    #[test]
    fn test_poem_and_cite() {
        let body = body(
            "<body><section>\
             <poem><title><p>Ode</p></title><stanza><v>Line one</v><v>Line two</v></stanza>\
             <text-author>Poet</text-author></poem>\
             <cite><p>Quoted</p><text-author>Someone</text-author></cite>\
             </section></body>",
        );
        let section = body.sections().next().unwrap();
        let flows: Vec<&Flow> = section
            .items
            .iter()
            .filter_map(|item| match item {
                SectionItem::Flow(flow) => Some(flow),
                _ => None,
            })
            .collect();
        match flows[0] {
            Flow::Poem(poem) => {
                assert_eq!(poem.stanzas[0].lines.len(), 2);
                assert_eq!(poem.text(), "Ode\nLine one\nLine two\nPoet");
            }
            other => panic!("expected poem, got {other:?}"),
        }
        match flows[1] {
            Flow::Cite(cite) => {
                assert_eq!(cite.text_authors[0].text(), "Someone");
                assert_eq!(cite.text(), "Quoted\nSomeone");
            }
            other => panic!("expected cite, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_elements_are_skipped() {
        let body = body("<body><foo><p>lost</p></foo><section><bar/><p>kept</p></section></body>");
        assert_eq!(body.blocks.len(), 1);
        assert_eq!(body.text(), "kept");
    }

    #[test]
    fn test_inline_spans() {
        let body = body(
            "<body xmlns:l=\"http://www.w3.org/1999/xlink\"><section><p>See <a l:href=\"#n1\" type=\"note\">1</a>\
             <strong>bold</strong><image l:href=\"#i\"/></p></section></body>",
        );
        let section = body.sections().next().unwrap();
        let SectionItem::Flow(Flow::Paragraph(p)) = &section.items[0] else {
            panic!("expected paragraph");
        };
        assert!(matches!(
            &p.spans[1],
            Span::Link { href: Some(h), kind: Some(k), .. } if h == "#n1" && k == "note"
        ));
        assert!(matches!(&p.spans[3], Span::Image(img) if img.href.as_deref() == Some("#i")));
        assert_eq!(p.text(), "See 1bold");
    }

    #[test]
    fn test_section_annotation_and_table() {
        let body = body(
            "<body><section><annotation><p>About</p></annotation>\
             <table><tr><th>A</th><td>B</td></tr></table></section></body>",
        );
        assert_eq!(body.first_annotation().unwrap().text(), "About");
        assert_eq!(body.text(), "About\nA\tB");
    }
}
