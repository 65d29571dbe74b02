/// Controls registry capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistryConfig {
    /// Maximum number of live entries. Ids are sent as unsigned shorts, so
    /// this never exceeds 65535.
    pub max_entries: usize,
}

impl RegistryConfig {
    /// Hard ceiling imposed by the 16-bit id fields.
    pub const MAX_ENTRIES: usize = u16::MAX as usize;

    /// A config allowing at most `max_entries` entries, clamped to the ceiling.
    pub fn with_max_entries(max_entries: usize) -> Self {
        Self {
            max_entries: max_entries.min(Self::MAX_ENTRIES),
        }
    }

    /// The same config with `max_entries` brought under the ceiling. Registries
    /// apply this on construction, so struct literals cannot exceed it.
    pub(crate) fn clamped(self) -> Self {
        Self::with_max_entries(self.max_entries)
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            max_entries: Self::MAX_ENTRIES,
        }
    }
}
