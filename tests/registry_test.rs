//! Handler dispatch: registration order decides, absence means unsupported.

use std::path::Path;

use fbshelf::{Book, ByteStream, DataSupplier, DocumentHandler, HandlerRegistry, Library};

struct Claims {
    name: &'static str,
    extension: &'static str,
}

impl DocumentHandler for Claims {
    fn name(&self) -> &'static str {
        self.name
    }

    fn supports_file(&self, name: &str, _data: DataSupplier<'_>) -> bool {
        name.ends_with(self.extension)
    }

    fn book_info(&self, name: &str, _data: DataSupplier<'_>) -> fbshelf::Result<Book> {
        Ok(Book::new(self.name).with_path(name))
    }

    fn read_formats(&self) -> &'static [&'static str] {
        &["txt"]
    }
}

fn empty() -> std::io::Result<ByteStream> {
    Ok(Box::new(std::io::empty()))
}

#[test]
fn test_first_registered_wins() {
    let registry = HandlerRegistry::new()
        .with_document(Claims {
            name: "first",
            extension: ".txt",
        })
        .with_document(Claims {
            name: "second",
            extension: ".txt",
        });

    let handler = registry.document_for("a.txt", &empty).unwrap();
    assert_eq!(handler.name(), "first");
    assert_eq!(registry.read_formats(), vec!["txt"]);
}

#[test]
fn test_custom_handler_after_defaults() {
    let mut registry = HandlerRegistry::with_defaults();
    registry.register_document(Claims {
        name: "shadowed",
        extension: ".fb2",
    });
    registry.register_document(Claims {
        name: "plain",
        extension: ".txt",
    });

    assert_eq!(registry.document_for("a.fb2", &empty).unwrap().name(), "fb2");
    assert_eq!(registry.document_for("a.txt", &empty).unwrap().name(), "plain");
}

#[test]
fn test_unsupported_is_not_an_error() {
    let dir = tempfile::TempDir::new().unwrap();
    let file = dir.path().join("paper.pdf");
    std::fs::write(&file, b"%PDF-1.4").unwrap();

    let library = Library::new(HandlerRegistry::with_defaults());
    assert_eq!(library.obtain_book(file.to_str().unwrap()).unwrap(), None);
    assert_eq!(library.obtain_books(&file).unwrap().count(), 0);
    assert!(library.registry().container_for_file(Path::new("a.pdf")).is_none());
}

#[test]
fn test_library_uses_custom_registry() {
    let dir = tempfile::TempDir::new().unwrap();
    let file = dir.path().join("notes.txt");
    std::fs::write(&file, b"hello").unwrap();

    let registry = HandlerRegistry::new().with_document(Claims {
        name: "notes",
        extension: ".txt",
    });
    let library = Library::new(registry);
    let (book, size) = library.obtain_books(&file).unwrap().next().unwrap().unwrap();
    assert_eq!(book.title, "notes");
    assert_eq!(size, 5);
}
