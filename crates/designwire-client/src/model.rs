use std::borrow::Cow;
use std::path::Path;

use designwire_frame::{AmfWriter, Result as FrameResult};
use serde::{Deserialize, Serialize};

use crate::handle::{DocumentHandle, UnitHandle, WorkspaceHandle};

/// Resolves a file to the locator pair written wherever the wire references
/// a file: canonical URL, then display path.
pub trait FileLocator {
    fn url(&self) -> Cow<'_, str>;

    fn presentable_url(&self) -> Cow<'_, str>;

    fn write_to(&self, out: &mut AmfWriter) -> FrameResult<()> {
        out.write_utf(&self.url())?;
        out.write_utf(&self.presentable_url())
    }
}

/// A file reference as the host already resolved it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRef {
    pub url: String,
    pub presentable_url: String,
}

impl FileRef {
    pub fn new(url: impl Into<String>, presentable_url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            presentable_url: presentable_url.into(),
        }
    }

    pub fn from_path(path: &Path) -> Self {
        Self::new(path.url(), path.presentable_url())
    }
}

impl FileLocator for FileRef {
    fn url(&self) -> Cow<'_, str> {
        Cow::Borrowed(&self.url)
    }

    fn presentable_url(&self) -> Cow<'_, str> {
        Cow::Borrowed(&self.presentable_url)
    }
}

impl FileLocator for Path {
    fn url(&self) -> Cow<'_, str> {
        Cow::Owned(format!("file://{}", self.display()))
    }

    fn presentable_url(&self) -> Cow<'_, str> {
        self.to_string_lossy()
    }
}

/// Last known designer window geometry of a workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowBounds {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl WindowBounds {
    /// Presence byte, then x, y, width and height when present.
    pub fn write_optional(bounds: Option<&WindowBounds>, out: &mut AmfWriter) {
        match bounds {
            None => out.write_bool(false),
            Some(bounds) => {
                out.write_bool(true);
                out.write_int(bounds.x);
                out.write_int(bounds.y);
                out.write_int(bounds.width);
                out.write_int(bounds.height);
            }
        }
    }
}

/// What `open_workspace` needs to know about a workspace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workspace {
    pub handle: WorkspaceHandle,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window_bounds: Option<WindowBounds>,
}

/// A style sheet declared inside a unit and the documents using it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalStyleHolder {
    pub file: FileRef,
    #[serde(default)]
    pub users: Vec<String>,
}

impl LocalStyleHolder {
    pub fn write_to(&self, out: &mut AmfWriter) -> FrameResult<()> {
        self.file.write_to(out)?;
        out.write_string_array(&self.users)
    }
}

/// Per-unit metadata mirrored into the unit registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitInfo {
    pub handle: UnitHandle,
    pub workspace: WorkspaceHandle,
    #[serde(default)]
    pub local_style_holders: Vec<LocalStyleHolder>,
}

impl UnitInfo {
    pub fn new(handle: UnitHandle, workspace: WorkspaceHandle) -> Self {
        Self {
            handle,
            workspace,
            local_style_holders: Vec::new(),
        }
    }
}

/// A document source and the unit that owns it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentSource {
    pub handle: DocumentHandle,
    pub unit: UnitHandle,
    pub file: FileRef,
    /// Fully qualified name of the class the document compiles to.
    pub class_name: String,
}

/// Placeholder asset classes a document needs on the engine side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequiredAssetsInfo {
    pub image_count: usize,
    pub swf_count: usize,
}

impl RequiredAssetsInfo {
    pub fn is_empty(&self) -> bool {
        self.image_count == 0 && self.swf_count == 0
    }

    /// Accumulate another document's requirements.
    pub fn merge(&mut self, other: &RequiredAssetsInfo) {
        self.image_count += other.image_count;
        self.swf_count += other.swf_count;
    }
}

#[cfg(test)]
mod tests {
    use designwire_frame::AmfReader;

    use super::*;

    #[test]
    fn file_locator_writes_url_then_display_path() {
        let mut out = AmfWriter::new();
        Path::new("/work/Main.mxml").write_to(&mut out).unwrap();

        let mut reader = AmfReader::new(out.take());
        assert_eq!(reader.read_utf().unwrap(), "file:///work/Main.mxml");
        assert_eq!(reader.read_utf().unwrap(), "/work/Main.mxml");
    }

    #[test]
    fn window_bounds_record() {
        let mut out = AmfWriter::new();
        WindowBounds::write_optional(None, &mut out);
        WindowBounds::write_optional(
            Some(&WindowBounds {
                x: 1,
                y: -1,
                width: 800,
                height: 600,
            }),
            &mut out,
        );

        let mut reader = AmfReader::new(out.take());
        assert!(!reader.read_bool().unwrap());
        assert!(reader.read_bool().unwrap());
        assert_eq!(reader.read_int().unwrap(), 1);
        assert_eq!(reader.read_int().unwrap(), -1);
        assert_eq!(reader.read_int().unwrap(), 800);
        assert_eq!(reader.read_int().unwrap(), 600);
        assert!(reader.is_empty());
    }

    #[test]
    fn style_holder_carries_users() {
        let holder = LocalStyleHolder {
            file: FileRef::new("file:///s.css", "s.css"),
            users: vec!["Main".into()],
        };
        let mut out = AmfWriter::new();
        holder.write_to(&mut out).unwrap();

        let mut reader = AmfReader::new(out.take());
        assert_eq!(reader.read_utf().unwrap(), "file:///s.css");
        assert_eq!(reader.read_utf().unwrap(), "s.css");
        assert_eq!(reader.read_string_array().unwrap(), vec!["Main"]);
    }

    #[test]
    fn assets_merge() {
        let mut total = RequiredAssetsInfo::default();
        assert!(total.is_empty());
        total.merge(&RequiredAssetsInfo {
            image_count: 2,
            swf_count: 1,
        });
        assert_eq!(total.image_count, 2);
        assert_eq!(total.swf_count, 1);
    }
}
