use derive_more::{AsRef, Display, From};
use getset::{CopyGetters, Getters};
use typed_builder::TypedBuilder;

/// One row of the leaderboard as stored in the play log.
#[derive(Clone, PartialEq, Debug, TypedBuilder, CopyGetters, Getters)]
pub struct PlayRecord {
    /// Sequential position in the log, starting from 1.
    /// This is not the rank displayed on the site.
    #[getset(get_copy = "pub")]
    rank: u32,
    #[getset(get = "pub")]
    difficulty: DifficultyLabel,
    /// `None` when the site shows a tier code instead of a star count.
    #[getset(get_copy = "pub")]
    star: Option<f64>,
    /// `None` when the row has no accuracy (unranked play).
    #[getset(get_copy = "pub")]
    accuracy: Option<f64>,
    /// `None` when the play is not weighted.
    #[getset(get_copy = "pub")]
    performance: Option<PerformancePoints>,
    #[getset(get = "pub")]
    modifier: Modifier,
    #[getset(get = "pub")]
    song: SongMetadata,
}

/// Performance points of a weighted play.
/// The three values are either all present or all absent, hence a single `Option` in
/// [`PlayRecord`].
#[derive(Clone, Copy, PartialEq, Debug, TypedBuilder, CopyGetters)]
#[getset(get_copy = "pub")]
pub struct PerformancePoints {
    /// pp awarded for the play, before weighting.
    given: f64,
    /// pp after weighting by the position in the top-scores list.
    weighted: f64,
    /// Weight in percent.
    weight: f64,
}

#[derive(Clone, PartialEq, Eq, Debug, TypedBuilder, Getters)]
#[getset(get = "pub")]
pub struct SongMetadata {
    name: SongName,
    artist: ArtistName,
    mapper: MapperName,
}

#[derive(Clone, PartialEq, Eq, Hash, Debug, From, AsRef, Display)]
#[as_ref(forward)]
pub struct DifficultyLabel(String);

#[derive(Clone, PartialEq, Eq, Hash, Debug, From, AsRef, Display)]
#[as_ref(forward)]
pub struct SongName(String);

#[derive(Clone, PartialEq, Eq, Hash, Debug, From, AsRef, Display)]
#[as_ref(forward)]
pub struct ArtistName(String);

#[derive(Clone, PartialEq, Eq, Hash, Debug, From, AsRef, Display)]
#[as_ref(forward)]
pub struct MapperName(String);

/// Gameplay modifier text as shown on the site, e.g. `NF` or `SS`.
/// Rows without a modifier carry the literal `None`.
#[derive(Clone, PartialEq, Eq, Hash, Debug, From, AsRef, Display)]
#[as_ref(forward)]
pub struct Modifier(String);

impl Modifier {
    pub const NONE: &'static str = "None";
    pub const NO_FAIL: &'static str = "NF";
    pub const SLOWER_SONG: &'static str = "SS";

    pub fn none() -> Self {
        Self(Self::NONE.to_owned())
    }
    pub fn is_no_fail(&self) -> bool {
        self.0 == Self::NO_FAIL
    }
    pub fn is_slower_song(&self) -> bool {
        self.0 == Self::SLOWER_SONG
    }
}

impl Default for Modifier {
    fn default() -> Self {
        Self::none()
    }
}
