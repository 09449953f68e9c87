use crate::book::Book;
use crate::error::Result;
use crate::handler::{DataSupplier, DocumentHandler, has_extension};

use super::FictionBook;

/// Document handler for `.fb2` files.
#[derive(Debug, Default, Clone, Copy)]
pub struct Fb2Handler;

impl Fb2Handler {
    pub fn new() -> Self {
        Self
    }
}

impl DocumentHandler for Fb2Handler {
    fn name(&self) -> &'static str {
        "fb2"
    }

    fn supports_file(&self, name: &str, _data: DataSupplier<'_>) -> bool {
        has_extension(name, "fb2")
    }

    fn book_info(&self, name: &str, data: DataSupplier<'_>) -> Result<Book> {
        let fb2 = FictionBook::parse(name, data)?;
        Ok(Book {
            title: fb2.title()?.to_string(),
            authors: fb2.authors(),
            genres: fb2.genres(),
            annotation: fb2.annotation(),
            sequence: fb2.sequence_name().map(str::to_string),
            sequence_number: fb2.sequence_number(),
            cover: fb2.cover(),
            path: name.to_string(),
        })
    }

    fn read_formats(&self) -> &'static [&'static str] {
        &["fb2"]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::ByteStream;

    #[test]
    fn test_book_info() {
        let xml = r##"<?xml version="1.0" encoding="utf-8"?>
<FictionBook xmlns="http://www.gribuser.ru/xml/fictionbook/2.0" xmlns:l="http://www.w3.org/1999/xlink">
 <description><title-info>
  <genre>sf</genre><genre>adventure</genre>
  <author><first-name>Stanislaw</first-name><last-name>Lem</last-name></author>
  <book-title>Solaris</book-title>
  <annotation><p>A planet.</p></annotation>
  <coverpage><image l:href="#cover.png"/></coverpage>
  <sequence name="Novels" number="4"/>
 </title-info></description>
 <body><section><p>Kelvin arrives.</p></section></body>
 <binary id="cover.png" content-type="image/png">iVBORw==</binary>
</FictionBook>"##;
        let data = move || -> std::io::Result<ByteStream> {
            Ok(Box::new(std::io::Cursor::new(xml.as_bytes())))
        };
        let handler = Fb2Handler::new();
        assert!(handler.supports_file("solaris.FB2", &data));
        assert!(!handler.supports_file("solaris.fb2.zip", &data));

        let book = handler.book_info("solaris.fb2", &data).unwrap();
        assert_eq!(book.title, "Solaris");
        assert_eq!(book.author_names(), vec!["Lem, Stanislaw"]);
        assert_eq!(book.genres, vec!["sf", "adventure"]);
        assert_eq!(book.annotation.as_deref(), Some("A planet."));
        assert_eq!(book.sequence.as_deref(), Some("Novels"));
        assert_eq!(book.sequence_number, Some(4));
        assert_eq!(book.path, "solaris.fb2");
        let cover = book.cover.unwrap();
        assert_eq!(cover.content_type, "image/png");
        assert_eq!(cover.data, vec![0x89, b'P', b'N', b'G']);
    }
}
