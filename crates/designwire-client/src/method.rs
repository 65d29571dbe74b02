use std::fmt;

use serde::Serialize;

/// Method class tag written before every opcode.
pub const METHOD_CLASS: u8 = 0;

/// Operations understood by the engine, in opcode order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ClientMethod {
    OpenWorkspace = 0,
    CloseWorkspace = 1,
    RegisterLibrarySet = 2,
    RegisterUnit = 3,
    RegisterDocumentFactory = 4,
    UpdateDocumentFactory = 5,
    OpenDocument = 6,
    UpdateDocuments = 7,
    QualifyExternalInlineStyleSource = 8,
    InitStringRegistry = 9,
    UpdateStringRegistry = 10,
    FillImageClassPool = 11,
    FillSwfClassPool = 12,
}

impl ClientMethod {
    pub fn opcode(self) -> u8 {
        self as u8
    }

    /// The two header bytes that open a message or sub-message.
    pub fn header(self) -> [u8; 2] {
        [METHOD_CLASS, self.opcode()]
    }

    pub fn from_opcode(opcode: u8) -> Option<Self> {
        use ClientMethod::*;
        Some(match opcode {
            0 => OpenWorkspace,
            1 => CloseWorkspace,
            2 => RegisterLibrarySet,
            3 => RegisterUnit,
            4 => RegisterDocumentFactory,
            5 => UpdateDocumentFactory,
            6 => OpenDocument,
            7 => UpdateDocuments,
            8 => QualifyExternalInlineStyleSource,
            9 => InitStringRegistry,
            10 => UpdateStringRegistry,
            11 => FillImageClassPool,
            12 => FillSwfClassPool,
            _ => return None,
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::OpenWorkspace => "openWorkspace",
            Self::CloseWorkspace => "closeWorkspace",
            Self::RegisterLibrarySet => "registerLibrarySet",
            Self::RegisterUnit => "registerUnit",
            Self::RegisterDocumentFactory => "registerDocumentFactory",
            Self::UpdateDocumentFactory => "updateDocumentFactory",
            Self::OpenDocument => "openDocument",
            Self::UpdateDocuments => "updateDocuments",
            Self::QualifyExternalInlineStyleSource => "qualifyExternalInlineStyleSource",
            Self::InitStringRegistry => "initStringRegistry",
            Self::UpdateStringRegistry => "updateStringRegistry",
            Self::FillImageClassPool => "fillImageClassPool",
            Self::FillSwfClassPool => "fillSwfClassPool",
        }
    }
}

impl fmt::Display for ClientMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The two placeholder asset class pools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetPool {
    Image,
    Swf,
}

impl AssetPool {
    pub fn method(self) -> ClientMethod {
        match self {
            Self::Image => ClientMethod::FillImageClassPool,
            Self::Swf => ClientMethod::FillSwfClassPool,
        }
    }
}
