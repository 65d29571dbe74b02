//! AMF-style primitive encoding and transactional message framing.
//!
//! A message ("frame") is opened with [`BlockWriter::begin`], filled through
//! the [`AmfWriter`] primitives and then either committed with
//! [`BlockWriter::end`] or discarded with [`BlockWriter::rollback`]. A rolled
//! back frame leaves the outgoing buffer byte-for-byte as it was before
//! `begin`. There is no length prefix on the wire: the receiver derives
//! message boundaries from each opcode's field layout.

pub mod amf;
pub mod block;
pub mod error;
pub mod reader;

pub use amf::{AmfWriter, AMF_ARRAY_MARKER, AMF_STRING_MARKER, MAX_SHORT, MAX_U29};
pub use block::{BlockWriter, FrameState, SuspendedFrame, DEFAULT_BUFFER_CAPACITY};
pub use error::{FrameError, Result};
pub use reader::AmfReader;
