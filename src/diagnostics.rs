//! Non-fatal loading problems and the sink that presents them

use parking_lot::Mutex;
use std::fmt;

/// What went wrong while resolving a texture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    /// An external texture file could not be decoded
    TextureFile,
    /// A compressed embedded texture could not be decoded
    EmbeddedMemory,
    /// A raw embedded texture could not be created
    EmbeddedTexture,
    /// The view over a raw embedded texture could not be created
    EmbeddedView,
    /// An embedded payload is shorter than its header claims
    MalformedEmbedded,
}

/// A texture slot that loaded without a usable handle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    /// Source identifier of the affected texture
    pub identifier: String,
    pub message: String,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, identifier: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            identifier: identifier.into(),
            message: message.into(),
        }
    }

    /// Short title for a dialog box
    pub fn title(&self) -> &'static str {
        match self.kind {
            DiagnosticKind::TextureFile => "Texture couldn't be loaded",
            DiagnosticKind::EmbeddedMemory => "Texture couldn't be created from memory",
            DiagnosticKind::EmbeddedTexture => "Texture creation failed",
            DiagnosticKind::EmbeddedView => "Shader resource view creation failed",
            DiagnosticKind::MalformedEmbedded => "Embedded texture is malformed",
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.title(), self.identifier, self.message)
    }
}

/// Synchronous user-facing notification sink
///
/// The loader calls this after conversion returns, once per diagnostic, in
/// the order they were raised.
pub trait Notifier {
    fn notify(&self, diagnostic: &Diagnostic);
}

/// Reports diagnostics through the `log` facade
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, diagnostic: &Diagnostic) {
        log::error!("{diagnostic}");
    }
}

/// Keeps every diagnostic it receives
#[derive(Debug, Default)]
pub struct CollectingNotifier {
    received: Mutex<Vec<Diagnostic>>,
}

impl CollectingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.received.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.received.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.received.lock().is_empty()
    }
}

impl Notifier for CollectingNotifier {
    fn notify(&self, diagnostic: &Diagnostic) {
        self.received.lock().push(diagnostic.clone());
    }
}
