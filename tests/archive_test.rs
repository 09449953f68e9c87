//! ZIP container tests: enumeration through document handlers and
//! resolution of `zip::` virtual paths.

use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use fbshelf::{Archive, ContainerHandler, HandlerRegistry, Library, ZipHandler, ZipPath};
use tempfile::TempDir;
use zip::write::SimpleFileOptions;

const FB2: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<FictionBook xmlns="http://www.gribuser.ru/xml/fictionbook/2.0">
 <description><title-info><book-title>The Cyberiad</book-title>
  <author><first-name>Stanislaw</first-name><last-name>Lem</last-name></author>
 </title-info></description>
 <body><section><p>Trurl and Klapaucius.</p></section></body>
</FictionBook>"#;

fn write_zip(path: &Path, entries: &[(&str, &[u8], zip::CompressionMethod)]) {
    let file = std::fs::File::create(path).unwrap();
    let mut writer = zip::ZipWriter::new(file);
    for (name, data, method) in entries {
        let options = SimpleFileOptions::default().compression_method(*method);
        writer.start_file(*name, options).unwrap();
        writer.write_all(data).unwrap();
    }
    writer.finish().unwrap();
}

fn build_archive() -> (TempDir, PathBuf) {
    let dir = TempDir::new().unwrap();
    let path = std::path::absolute(dir.path().join("lem.zip")).unwrap();
    write_zip(
        &path,
        &[
            ("readme.txt", b"not a book", zip::CompressionMethod::Stored),
            ("lem/cyberiad.fb2", FB2.as_bytes(), zip::CompressionMethod::Deflated),
            ("lem/broken.fb2", b"no markup at all", zip::CompressionMethod::Stored),
            ("lem/stored.fb2", FB2.as_bytes(), zip::CompressionMethod::Stored),
        ],
    );
    (dir, path)
}

#[test]
fn test_archive_index() {
    let (_dir, path) = build_archive();
    let archive = Archive::open(&path).unwrap();
    assert_eq!(archive.len(), 4);
    assert!(archive.contains("lem/cyberiad.fb2"));
    assert_eq!(archive.entry_size("lem/cyberiad.fb2"), Some(FB2.len() as u64));
    assert_eq!(archive.read_entry("lem/stored.fb2").unwrap(), FB2.as_bytes());
    assert!(archive.read_entry("missing.fb2").unwrap_err().is_not_found());
}

#[test]
fn test_enumerate_delegates_and_continues_past_failures() {
    let (_dir, path) = build_archive();
    let registry = HandlerRegistry::with_defaults();
    let items: Vec<_> = ZipHandler::new()
        .enumerate(&path, registry.documents())
        .unwrap()
        .collect();

    // readme.txt has no handler and is skipped; broken.fb2 fails in place.
    assert_eq!(items.len(), 3);
    assert!(items[1].is_err());

    let (book, size) = items[0].as_ref().unwrap();
    assert_eq!(book.title, "The Cyberiad");
    assert_eq!(*size, FB2.len() as u64);
    assert_eq!(book.path, ZipPath::new(&path, "lem/cyberiad.fb2").encode());

    let (stored, _) = items[2].as_ref().unwrap();
    assert_eq!(stored.path, format!("zip::{}#lem/stored.fb2", path.display()));
}

#[test]
fn test_resolve_round_trip() {
    let (_dir, path) = build_archive();
    let library = Library::default();
    let virtual_path = ZipPath::new(&path, "lem/cyberiad.fb2").encode();

    let book = library.obtain_book(&virtual_path).unwrap().unwrap();
    assert_eq!(book.title, "The Cyberiad");
    assert_eq!(book.path, virtual_path);
    assert_eq!(library.real_size(&virtual_path).unwrap(), FB2.len() as u64);

    let mut bytes = String::new();
    library
        .book_data(&virtual_path)
        .unwrap()
        .read_to_string(&mut bytes)
        .unwrap();
    assert_eq!(bytes, FB2);
}

#[test]
fn test_missing_entry() {
    let (_dir, path) = build_archive();
    let handler = ZipHandler::new();
    let virtual_path = ZipPath::new(&path, "lem/solaris.fb2").encode();
    assert!(handler.resolve_book(&virtual_path, &[]).unwrap_err().is_not_found());
    assert_eq!(handler.resolve_size(&virtual_path).unwrap(), 0);
}

#[test]
fn test_scan_directory_with_archive_and_loose_file() {
    let (dir, _path) = build_archive();
    std::fs::write(dir.path().join("loose.fb2"), FB2).unwrap();

    let books: Vec<_> = Library::default().scan([dir.path()]).collect();
    assert_eq!(books.len(), 3);
    assert!(books.iter().all(|b| b.title == "The Cyberiad"));
    assert_eq!(books.iter().filter(|b| b.path.starts_with("zip::")).count(), 2);
}
