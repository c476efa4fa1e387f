//! Local previews of the selected video
//!
//! A preview is whatever the host shows for the pending file (an object URL,
//! a decoded thumbnail, a temp copy). The controller keeps at most one handle
//! and drops the old one before opening a replacement, so implementations
//! release their resources in `Drop`.

use super::model::VideoFile;

/// A live preview resource; released when dropped
pub trait PreviewHandle: Send {
    /// Where the host can display the preview from
    fn location(&self) -> String;
}

/// Creates preview handles for newly selected files
pub trait PreviewProvider: Send + Sync {
    /// Returns `None` when no preview can be produced for `file`
    fn open(&self, file: &VideoFile) -> Option<Box<dyn PreviewHandle>>;
}

/// Provider for hosts that show no preview
#[derive(Debug, Default, Clone, Copy)]
pub struct NoPreview;

impl PreviewProvider for NoPreview {
    fn open(&self, _file: &VideoFile) -> Option<Box<dyn PreviewHandle>> {
        None
    }
}

/// Previews a file by pointing at it on disk
#[derive(Debug, Default, Clone, Copy)]
pub struct FilePreview;

struct FilePreviewHandle {
    location: String,
}

impl PreviewHandle for FilePreviewHandle {
    fn location(&self) -> String {
        self.location.clone()
    }
}

impl PreviewProvider for FilePreview {
    fn open(&self, file: &VideoFile) -> Option<Box<dyn PreviewHandle>> {
        let path = file.path.canonicalize().unwrap_or_else(|_| file.path.clone());
        Some(Box::new(FilePreviewHandle {
            location: format!("file://{}", path.display()),
        }))
    }
}
