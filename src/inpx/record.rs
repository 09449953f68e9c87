//! Catalog listing records (`.inp` lines).

use crate::book::{Author, Book};

use super::path::InpxPath;

/// Field separator inside a listing line.
pub const FIELD_DELIMITER: char = '\u{4}';

/// Minimum number of fields for a line to be considered a record.
pub const MIN_FIELDS: usize = 14;

/// One line of an `.inp` listing, fields kept verbatim.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogRecord {
    pub author: String,
    pub genre: String,
    pub title: String,
    pub series: String,
    pub series_number: String,
    pub file: String,
    pub size: String,
    pub lib_id: String,
    pub deleted: String,
    pub ext: String,
    pub date: String,
    pub lang: String,
    pub rating: String,
    pub keywords: String,
}

impl CatalogRecord {
    /// Split a listing line. Lines with fewer than [`MIN_FIELDS`] fields are
    /// not records; extra trailing fields are ignored.
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.strip_suffix('\r').unwrap_or(line);
        if line.trim().is_empty() {
            return None;
        }

        let mut fields = line.split(FIELD_DELIMITER);
        let mut next = || fields.next().map(str::to_string);
        let record = Self {
            author: next()?,
            genre: next()?,
            title: next()?,
            series: next()?,
            series_number: next()?,
            file: next()?,
            size: next()?,
            lib_id: next()?,
            deleted: next()?,
            ext: next()?,
            date: next()?,
            lang: next()?,
            rating: next()?,
            keywords: next()?,
        };
        Some(record)
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted.trim() == "1"
    }

    /// Whether this record can become a catalog stub at all.
    pub fn is_listable(&self) -> bool {
        !self.title.trim().is_empty() && !self.file.trim().is_empty() && !self.is_deleted()
    }

    pub fn authors(&self) -> Vec<Author> {
        parse_authors(&self.author)
    }

    pub fn genres(&self) -> Vec<String> {
        parse_genres(&self.genre)
    }

    pub fn sequence_number(&self) -> Option<i32> {
        self.series_number.trim().parse().ok()
    }

    /// Size of the book file as recorded in the listing.
    pub fn file_size(&self) -> Option<u64> {
        self.size.trim().parse().ok()
    }

    /// Build the stub book for this record, addressed through the catalog.
    ///
    /// Returns `None` for deleted records and records missing a title or
    /// file name. Cover bytes are never loaded here.
    pub fn to_book(&self, index_path: &str, listing: &str) -> Option<Book> {
        if !self.is_listable() {
            return None;
        }

        let path = InpxPath::new(index_path, listing, self.file.as_str(), self.ext.trim());
        let series = self.series.trim();
        Some(Book {
            title: self.title.clone(),
            authors: self.authors(),
            genres: self.genres(),
            annotation: None,
            sequence: (!series.is_empty()).then(|| series.to_string()),
            sequence_number: self.sequence_number(),
            cover: None,
            path: path.encode(),
        })
    }
}

/// Parse the author field: people separated by `:`, name parts by `,`.
///
/// One part is a last name; two are last and first; three add a middle
/// name; any further parts are joined back into the middle name with `", "`.
/// A trailing `:`, blank people and empty trailing name parts are ignored.
pub fn parse_authors(field: &str) -> Vec<Author> {
    if field.trim().is_empty() {
        return Vec::new();
    }
    let field = field.strip_suffix(':').unwrap_or(field);

    field
        .split(':')
        .map(str::trim)
        .filter(|person| !person.is_empty())
        .map(|person| {
            let parts: Vec<&str> = person.split(',').map(str::trim).collect();
            let mut author = Author::new().with_last_name(parts[0]);
            if let Some(first) = parts.get(1).filter(|s| !s.is_empty()) {
                author = author.with_first_name(*first);
            }
            if parts.len() > 2 {
                let middle = parts[2..].join(", ");
                if !middle.trim_matches([',', ' ']).is_empty() {
                    author = author.with_middle_name(middle);
                }
            }
            author
        })
        .collect()
}

/// Parse the genre field: tags separated by `:`, blanks dropped.
pub fn parse_genres(field: &str) -> Vec<String> {
    field
        .split(':')
        .map(str::trim)
        .filter(|genre| !genre.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(fields: &[&str]) -> String {
        fields.join("\u{4}")
    }

    fn sample() -> String {
        line(&[
            "Doe,John,:", "sf:adventure:", "The Book", "Saga", "2", "12345", "1024", "777", "0",
            "fb2", "2020-01-01", "en", "5", "space",
        ])
    }

    #[test]
    fn test_parse_authors_multiple() {
        let authors = parse_authors("Doe, John:Smith, Jane");
        assert_eq!(
            authors,
            vec![
                Author::new().with_last_name("Doe").with_first_name("John"),
                Author::new().with_last_name("Smith").with_first_name("Jane"),
            ]
        );
    }

    #[test]
    fn test_parse_authors_part_counts() {
        assert_eq!(parse_authors("Doe"), vec![Author::new().with_last_name("Doe")]);

        let trailing = parse_authors("Doe,John,");
        assert_eq!(
            trailing,
            vec![Author::new().with_last_name("Doe").with_first_name("John")]
        );

        let three = parse_authors("Doe, John, Smith");
        assert_eq!(three.len(), 1);
        assert_eq!(three[0].middle_name.as_deref(), Some("Smith"));

        let four = parse_authors("van, Doe, John, Smith");
        assert_eq!(four[0].last_name.as_deref(), Some("van"));
        assert_eq!(four[0].first_name.as_deref(), Some("Doe"));
        assert_eq!(four[0].middle_name.as_deref(), Some("John, Smith"));
    }

    #[test]
    fn test_parse_authors_blank_and_trailing_colon() {
        assert!(parse_authors("").is_empty());
        assert!(parse_authors("   ").is_empty());
        assert_eq!(parse_authors("Doe, John:").len(), 1);
        assert_eq!(parse_authors("Doe: :Smith").len(), 2);
    }

    #[test]
    fn test_parse_genres() {
        assert_eq!(parse_genres("Fiction::Adventure"), vec!["Fiction", "Adventure"]);
        assert_eq!(parse_genres(" sf : fantasy :"), vec!["sf", "fantasy"]);
        assert!(parse_genres("").is_empty());
    }

    #[test]
    fn test_parse_record_fields() {
        let record = CatalogRecord::parse(&sample()).unwrap();
        assert_eq!(record.title, "The Book");
        assert_eq!(record.file, "12345");
        assert_eq!(record.ext, "fb2");
        assert_eq!(record.lang, "en");
        assert_eq!(record.keywords, "space");
        assert_eq!(record.sequence_number(), Some(2));
        assert_eq!(record.file_size(), Some(1024));
        assert!(!record.is_deleted());
    }

    #[test]
    fn test_parse_strips_carriage_return_and_ignores_extra_fields() {
        let record = CatalogRecord::parse(&format!("{}\u{4}extra\r", sample())).unwrap();
        assert_eq!(record.keywords, "space");

        let record = CatalogRecord::parse(&format!("{}\r", sample())).unwrap();
        assert_eq!(record.keywords, "space");
    }

    #[test]
    fn test_short_lines_are_not_records() {
        assert!(CatalogRecord::parse("a\u{4}b\u{4}c").is_none());
        assert!(CatalogRecord::parse("").is_none());
    }

    #[test]
    fn test_to_book() {
        let record = CatalogRecord::parse(&sample()).unwrap();
        let book = record.to_book("/lib/library", "books.inp").unwrap();
        assert_eq!(book.title, "The Book");
        assert_eq!(book.author_names(), vec!["Doe, John"]);
        assert_eq!(book.genres, vec!["sf", "adventure"]);
        assert_eq!(book.sequence.as_deref(), Some("Saga"));
        assert_eq!(book.sequence_number, Some(2));
        assert!(book.cover.is_none());
        assert_eq!(book.path, "inpx::/lib/library.inpx#books.inp*12345.fb2");
    }

    #[test]
    fn test_deleted_and_blank_records_are_dropped() {
        let mut record = CatalogRecord::parse(&sample()).unwrap();
        record.deleted = "1".into();
        assert!(record.to_book("/l", "a.inp").is_none());

        let mut record = CatalogRecord::parse(&sample()).unwrap();
        record.title = "  ".into();
        assert!(record.to_book("/l", "a.inp").is_none());

        let mut record = CatalogRecord::parse(&sample()).unwrap();
        record.file = String::new();
        assert!(record.to_book("/l", "a.inp").is_none());
    }

    #[test]
    fn test_blank_series_and_bad_number() {
        let mut record = CatalogRecord::parse(&sample()).unwrap();
        record.series = " ".into();
        record.series_number = "x".into();
        let book = record.to_book("/l", "a.inp").unwrap();
        assert_eq!(book.sequence, None);
        assert_eq!(book.sequence_number, None);
    }
}
