/// Revision counter - bumped on every structural change
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChangeTracker {
    version: u64,
}

impl ChangeTracker {
    #[must_use]
    pub fn new() -> Self {
        Self { version: 0 }
    }

    /// Marks as modified, increments version by 1
    pub fn changed(&mut self) {
        self.version = self.version.wrapping_add(1);
    }

    /// Gets the current version number
    #[must_use]
    pub fn version(&self) -> u64 {
        self.version
    }
}
