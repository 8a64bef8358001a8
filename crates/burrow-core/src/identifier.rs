use std::fmt::Display;

/// A storage-assigned identifier for a mapping record.
///
/// Only storage backends hand these out. The shortener never invents one;
/// it only receives them from [`Repository::insert_or_fetch`] or
/// [`Repository::create_record`], or decodes one from a short code for lookup.
///
/// [`Repository::insert_or_fetch`]: crate::Repository::insert_or_fetch
/// [`Repository::create_record`]: crate::Repository::create_record
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Identifier(u64);

impl Identifier {
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    pub const fn get(self) -> u64 {
        self.0
    }
}

impl From<u64> for Identifier {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl From<Identifier> for u64 {
    fn from(value: Identifier) -> Self {
        value.0
    }
}

impl Display for Identifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
