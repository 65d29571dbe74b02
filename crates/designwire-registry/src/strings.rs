use std::collections::HashMap;

use designwire_frame::AmfWriter;
use tracing::trace;

use crate::config::RegistryConfig;
use crate::error::{RegistryError, Result};

/// Deduplicating table of string constants shared across messages.
///
/// Ids are append-only for the registry's lifetime. A string interned
/// through a [`StringWriter`] stays pending in that writer until the writer's
/// table reaches the wire. If the message carrying it is rolled back, the
/// entries move to another writer instead of being forgotten, so an id is
/// never reassigned.
#[derive(Debug, Default)]
pub struct StringRegistry {
    ids: HashMap<String, u16>,
    table: Vec<String>,
    config: RegistryConfig,
}

impl StringRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: RegistryConfig) -> Self {
        Self {
            config: config.clamped(),
            ..Self::default()
        }
    }

    /// Return the id of `value`, assigning the next id and recording it in
    /// `writer` when the string is new.
    pub fn intern(&mut self, value: &str, writer: &mut StringWriter) -> Result<u16> {
        if let Some(id) = self.ids.get(value) {
            return Ok(*id);
        }
        if self.table.len() >= self.config.max_entries {
            return Err(RegistryError::Full {
                max: self.config.max_entries,
            });
        }

        let id = u16::try_from(self.table.len()).map_err(|_| RegistryError::Full {
            max: self.config.max_entries,
        })?;
        self.table.push(value.to_owned());
        self.ids.insert(value.to_owned(), id);
        writer.pending.push((id, value.to_owned()));
        trace!(id, value, "string interned");
        Ok(id)
    }

    pub fn id_of(&self, value: &str) -> Option<u16> {
        self.ids.get(value).copied()
    }

    pub fn get(&self, id: u16) -> Option<&str> {
        self.table.get(usize::from(id)).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// All strings in id order.
    pub fn as_slice(&self) -> &[String] {
        &self.table
    }

    /// Forget every string; ids restart at zero.
    pub fn clear(&mut self) {
        self.ids.clear();
        self.table.clear();
    }

    /// Write the whole table as a string array.
    pub fn write_to(&self, out: &mut AmfWriter) -> Result<()> {
        out.write_string_array(&self.table)?;
        Ok(())
    }
}

/// Strings interned during one operation that the engine has not seen yet.
#[derive(Debug, Default)]
pub struct StringWriter {
    pending: Vec<(u16, String)>,
}

impl StringWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether any string is waiting to be sent.
    pub fn is_started(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Pending `(id, value)` entries in interning order.
    pub fn pending(&self) -> &[(u16, String)] {
        &self.pending
    }

    /// Write the pending table: count, then id and value per entry.
    pub fn write_to(&self, out: &mut AmfWriter) -> Result<()> {
        out.write_count("string count", self.pending.len())?;
        for (id, value) in &self.pending {
            out.write_short(*id);
            out.write_utf(value)?;
        }
        Ok(())
    }

    /// Write `header` and the pending table, but only if something is
    /// pending. Returns whether anything was written.
    pub fn write_to_if_started(&self, out: &mut AmfWriter, header: &[u8]) -> Result<bool> {
        if !self.is_started() {
            return Ok(false);
        }
        out.write_bytes(header);
        self.write_to(out)?;
        Ok(true)
    }

    /// Take over the pending entries of `other`, leaving it empty.
    pub fn absorb(&mut self, other: &mut StringWriter) {
        self.pending.append(&mut other.pending);
    }

    /// Forget pending entries; call once they reached the wire.
    pub fn reset(&mut self) {
        self.pending.clear();
    }
}
