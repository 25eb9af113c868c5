use strum::{Display, EnumString};

/// Social platforms the engine tracks. Stored as their display name in the
/// `platform` columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
pub enum Platform {
    #[strum(serialize = "Twitter", ascii_case_insensitive)]
    Twitter,
    #[strum(serialize = "Instagram", ascii_case_insensitive)]
    Instagram,
}

impl Platform {
    /// Exact number of hashtags a proposal must contain.
    pub fn hashtag_target(&self) -> usize {
        match self {
            Platform::Twitter => 3,
            Platform::Instagram => 12,
        }
    }

    /// Hashtag count band that earns the full strategy bonus.
    pub fn ideal_hashtag_range(&self) -> (usize, usize) {
        match self {
            Platform::Twitter => (1, 3),
            Platform::Instagram => (8, 15),
        }
    }

    /// Canonical content length band used when no learned optimum exists.
    pub fn canonical_length_range(&self) -> (usize, usize) {
        match self {
            Platform::Twitter => (100, 280),
            Platform::Instagram => (138, 2200),
        }
    }
}
