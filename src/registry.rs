//! Handler registry.
//!
//! Pure composition: the registry owns the handler lists and answers
//! "who handles this?" in registration order. It never parses anything.

use std::path::Path;

use crate::archive::ZipHandler;
use crate::epub::EpubHandler;
use crate::fb2::Fb2Handler;
use crate::handler::{ContainerHandler, DataSupplier, DocumentHandler, first_document_handler};
use crate::inpx::InpxHandler;

/// Ordered document and container handlers. The first match wins.
#[derive(Default)]
pub struct HandlerRegistry {
    documents: Vec<Box<dyn DocumentHandler>>,
    containers: Vec<Box<dyn ContainerHandler>>,
}

impl HandlerRegistry {
    /// An empty registry. Nothing is supported until handlers are added.
    pub fn new() -> Self {
        Self::default()
    }

    /// FB2 and EPUB documents; INPX catalogs and ZIP archives.
    pub fn with_defaults() -> Self {
        Self::new()
            .with_document(Fb2Handler::new())
            .with_document(EpubHandler::new())
            .with_container(InpxHandler::new())
            .with_container(ZipHandler::new())
    }

    pub fn with_document(mut self, handler: impl DocumentHandler + 'static) -> Self {
        self.register_document(handler);
        self
    }

    pub fn with_container(mut self, handler: impl ContainerHandler + 'static) -> Self {
        self.register_container(handler);
        self
    }

    /// Append a document handler after the existing ones.
    pub fn register_document(&mut self, handler: impl DocumentHandler + 'static) {
        self.documents.push(Box::new(handler));
    }

    /// Append a container handler after the existing ones.
    pub fn register_container(&mut self, handler: impl ContainerHandler + 'static) {
        self.containers.push(Box::new(handler));
    }

    pub fn documents(&self) -> &[Box<dyn DocumentHandler>] {
        &self.documents
    }

    pub fn containers(&self) -> &[Box<dyn ContainerHandler>] {
        &self.containers
    }

    pub fn document_for(&self, name: &str, data: DataSupplier<'_>) -> Option<&dyn DocumentHandler> {
        first_document_handler(&self.documents, name, data)
    }

    pub fn container_for_file(&self, file: &Path) -> Option<&dyn ContainerHandler> {
        self.containers
            .iter()
            .find(|h| h.supports_container(file))
            .map(|h| h.as_ref())
    }

    pub fn container_for_path(&self, path: &str) -> Option<&dyn ContainerHandler> {
        self.containers
            .iter()
            .find(|h| h.supports_path(path))
            .map(|h| h.as_ref())
    }

    /// Extensions readable by the registered document handlers, in order.
    pub fn read_formats(&self) -> Vec<&'static str> {
        let mut formats = Vec::new();
        for handler in &self.documents {
            for format in handler.read_formats() {
                if !formats.contains(format) {
                    formats.push(*format);
                }
            }
        }
        formats
    }
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field(
                "documents",
                &self.documents.iter().map(|h| h.name()).collect::<Vec<_>>(),
            )
            .field(
                "containers",
                &self.containers.iter().map(|h| h.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::ByteStream;

    fn empty() -> std::io::Result<ByteStream> {
        Ok(Box::new(std::io::empty()))
    }

    #[test]
    fn test_defaults() {
        let registry = HandlerRegistry::with_defaults();
        assert_eq!(registry.read_formats(), vec!["fb2", "epub"]);
        assert_eq!(registry.document_for("a.fb2", &empty).unwrap().name(), "fb2");
        assert_eq!(registry.document_for("a.epub", &empty).unwrap().name(), "epub");
        assert!(registry.document_for("a.pdf", &empty).is_none());

        let inpx = registry.container_for_file(Path::new("/lib/flibusta.inpx"));
        assert_eq!(inpx.unwrap().name(), "inpx");
        let zip = registry.container_for_file(Path::new("/lib/fb2-000.zip"));
        assert_eq!(zip.unwrap().name(), "zip");
        assert!(registry.container_for_file(Path::new("/lib/a.fb2")).is_none());

        let path = registry.container_for_path("inpx::/lib/flibusta.inpx#fb2-000.inp*1.fb2");
        assert_eq!(path.unwrap().name(), "inpx");
        let path = registry.container_for_path("zip::/lib/a.zip#b.fb2");
        assert_eq!(path.unwrap().name(), "zip");
        assert!(registry.container_for_path("/lib/a.fb2").is_none());
    }

    #[test]
    fn test_empty_registry_supports_nothing() {
        let registry = HandlerRegistry::new();
        assert!(registry.document_for("a.fb2", &empty).is_none());
        assert!(registry.container_for_file(Path::new("a.zip")).is_none());
        assert!(registry.read_formats().is_empty());
    }

    #[test]
    fn test_debug_lists_handler_names() {
        let debug = format!("{:?}", HandlerRegistry::with_defaults());
        assert!(debug.contains("\"fb2\", \"epub\""));
        assert!(debug.contains("\"inpx\", \"zip\""));
    }
}
