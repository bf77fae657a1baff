mod ids;
mod track;

pub use ids::TrackId;
pub use track::{ReplayGain, Track, TrackPtr};
