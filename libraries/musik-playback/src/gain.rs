//! Replay gain resolution

use crate::transport::Gain;
use crate::types::ReplayGainMode;
use musik_core::Track;

fn db_to_linear(db: f32) -> f32 {
    10f32.powf(db / 20.0)
}

/// Compute the gain a track should start with
///
/// The preamp applies regardless of mode. Gain and peak are only taken from
/// the track when a mode is selected and the matching gain tag exists; a
/// missing peak counts as full scale.
pub fn resolve_gain(track: Option<&Track>, mode: ReplayGainMode, preamp_db: f32) -> Gain {
    let mut result = Gain {
        preamp: db_to_linear(preamp_db),
        ..Gain::default()
    };

    let Some(track) = track else {
        return result;
    };

    let rg = &track.replay_gain;
    let (gain, peak) = match mode {
        ReplayGainMode::Disabled => return result,
        ReplayGainMode::Track => (rg.track_gain, rg.track_peak),
        ReplayGainMode::Album => (rg.album_gain, rg.album_peak),
    };

    if let Some(gain) = gain {
        let peak = peak.filter(|p| *p > 0.0).unwrap_or(1.0);
        result.gain = db_to_linear(gain);
        result.peak = 1.0 / peak;
        result.peak_valid = true;
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use musik_core::ReplayGain;

    fn tagged() -> Track {
        Track::new(1, "/music/1.flac", "One").with_replay_gain(ReplayGain {
            track_gain: Some(-6.0),
            track_peak: Some(0.5),
            album_gain: Some(-20.0),
            album_peak: None,
        })
    }

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    #[test]
    fn disabled_only_applies_preamp() {
        let gain = resolve_gain(Some(&tagged()), ReplayGainMode::Disabled, 6.0);
        assert!(close(gain.preamp, 1.9953));
        assert_eq!(gain.gain, 1.0);
        assert!(!gain.peak_valid);
    }

    #[test]
    fn track_mode_uses_track_tags() {
        let gain = resolve_gain(Some(&tagged()), ReplayGainMode::Track, 0.0);
        assert!(close(gain.preamp, 1.0));
        assert!(close(gain.gain, 0.50119));
        assert!(close(gain.peak, 2.0));
        assert!(gain.peak_valid);
    }

    #[test]
    fn album_mode_without_peak_uses_full_scale() {
        let gain = resolve_gain(Some(&tagged()), ReplayGainMode::Album, 0.0);
        assert!(close(gain.gain, 0.1));
        assert!(close(gain.peak, 1.0));
        assert!(gain.peak_valid);
    }

    #[test]
    fn missing_tags_or_track_leave_unity() {
        let plain = Track::new(2, "/music/2.mp3", "Two");
        assert_eq!(resolve_gain(Some(&plain), ReplayGainMode::Track, 0.0), Gain::default());
        assert_eq!(resolve_gain(None, ReplayGainMode::Album, 0.0), Gain::default());
    }
}
