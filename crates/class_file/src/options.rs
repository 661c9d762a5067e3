use std::ops::RangeInclusive;

/// JDK 1.0.2
pub const MIN_MAJOR_VERSION: u16 = 45;
/// JDK 27
pub const MAX_MAJOR_VERSION: u16 = 71;

pub const DEFAULT_MAX_NESTING_DEPTH: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseOptions {
    /// Class files whose major version falls outside this range are rejected.
    pub major_versions: RangeInclusive<u16>,
    /// How deep arrays and nested annotations may go inside an element value.
    pub max_nesting_depth: usize,
}
impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            major_versions: MIN_MAJOR_VERSION..=MAX_MAJOR_VERSION,
            max_nesting_depth: DEFAULT_MAX_NESTING_DEPTH,
        }
    }
}
impl ParseOptions {
    pub fn accepts_major_version(&self, major: u16) -> bool {
        self.major_versions.contains(&major)
    }
}
