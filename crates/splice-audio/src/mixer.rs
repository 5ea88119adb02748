//! Audio mixer: applies clip, track and master gain to the live audio
//! handles and keeps them in step with the playhead.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use splice_core::MediaKind;
use splice_media::DecoderPool;
use splice_timeline::{ClipId, ResolvedClip};
use tracing::debug;

/// Master output state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MasterBus {
    /// Master volume (0.0 to 1.0).
    pub volume: f64,
    pub muted: bool,
}

impl Default for MasterBus {
    fn default() -> Self {
        Self {
            volume: 1.0,
            muted: false,
        }
    }
}

impl MasterBus {
    /// Set the master volume, clamped to [0, 1].
    pub fn set_volume(&mut self, volume: f64) {
        if !volume.is_nan() {
            self.volume = volume.clamp(0.0, 1.0);
        }
    }
}

/// Gain applied to a clip's handle.
pub fn effective_volume(clip_volume: f64, track_muted: bool, master: &MasterBus) -> f64 {
    if master.muted || track_muted {
        return 0.0;
    }
    clip_volume * master.volume
}

/// What one mixer tick did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MixReport {
    /// Clips playing audibly after this tick.
    pub audible: Vec<ClipId>,
    /// Clips paused because they left the active set.
    pub paused: Vec<ClipId>,
}

/// Audio mixer over the decoder pool.
#[derive(Debug, Default)]
pub struct AudioMixer {
    pub master: MasterBus,
    /// Clips that were audible after the previous tick.
    audible: HashSet<ClipId>,
}

impl AudioMixer {
    pub fn new(master: MasterBus) -> Self {
        Self {
            master,
            audible: HashSet::new(),
        }
    }

    /// Run one tick over the active audio clips.
    pub fn tick(&mut self, active: &[ResolvedClip<'_>], pool: &mut DecoderPool, playing: bool) -> MixReport {
        let mut report = MixReport::default();
        let mut active_ids = HashSet::with_capacity(active.len());
        let mut audible = HashSet::new();

        for resolved in active {
            let clip = resolved.clip;
            active_ids.insert(clip.id);
            if !pool.get_or_create_as(clip, MediaKind::Audio) {
                continue;
            }

            let gain = effective_volume(clip.volume, resolved.track_muted, &self.master);
            pool.set_volume(clip.id, gain);

            let should_sound = playing && !self.master.muted && !resolved.track_muted;
            if clip.reversed {
                // Positioned by seek only
                pool.set_playing(clip, false);
                pool.seek_exact(clip.id, resolved.source_offset);
            } else if should_sound {
                pool.seek_to(clip.id, resolved.source_offset);
                pool.set_playing(clip, true);
            } else {
                pool.set_playing(clip, false);
                if playing {
                    pool.seek_to(clip.id, resolved.source_offset);
                } else {
                    pool.seek_exact(clip.id, resolved.source_offset);
                }
            }

            if pool.is_playing(clip.id) {
                audible.insert(clip.id);
                report.audible.push(clip.id);
            }
        }

        for id in self.audible.difference(&active_ids) {
            pool.pause(*id);
            report.paused.push(*id);
        }
        if !report.paused.is_empty() {
            debug!("Paused {} audio clip(s) that left the playhead", report.paused.len());
        }

        self.audible = audible;
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use splice_core::MediaInfo;
    use splice_media::SyntheticProvider;
    use splice_timeline::{resolve, EditCommand, Timeline, TrackKind};
    use std::sync::Arc;

    fn setup(volume: f64) -> (Arc<SyntheticProvider>, DecoderPool, Timeline) {
        let provider = Arc::new(SyntheticProvider::new());
        provider.register("a.wav", MediaInfo::audio(10.0), [0; 4]);
        let pool = DecoderPool::new(provider.clone());

        let timeline = Timeline::with_starter_tracks();
        let track_id = timeline.tracks_of(TrackKind::Audio).next().unwrap().id;
        let timeline = timeline.apply(&EditCommand::add_media(track_id, "a", "a.wav", &MediaInfo::audio(10.0)));
        let clip_id = timeline.track(track_id).unwrap().clips[0].id;
        let timeline = timeline.apply(&EditCommand::SetClipField {
            track_id,
            clip_id,
            field: splice_timeline::ClipField::Volume(volume),
        });
        (provider, pool, timeline)
    }

    #[test]
    fn test_effective_volume() {
        let master = MasterBus {
            volume: 0.8,
            muted: false,
        };
        assert!((effective_volume(0.5, false, &master) - 0.4).abs() < 1e-9);
        assert_eq!(effective_volume(0.5, true, &master), 0.0);
        let muted = MasterBus {
            muted: true,
            ..master
        };
        assert_eq!(effective_volume(0.5, false, &muted), 0.0);
    }

    #[test]
    fn test_tick_applies_gain_and_plays() {
        let (provider, mut pool, timeline) = setup(0.5);
        let mut mixer = AudioMixer::new(MasterBus {
            volume: 0.8,
            muted: false,
        });
        let active = resolve(&timeline, 1.0);
        let report = mixer.tick(&active.audio, &mut pool, true);

        let state = provider.state("a.wav").unwrap();
        assert!((state.volume - 0.4).abs() < 1e-9);
        assert!(state.playing);
        assert!((state.position - 1.0).abs() < 1e-9);
        assert_eq!(report.audible.len(), 1);
    }

    #[test]
    fn test_master_mute_pauses_and_silences() {
        let (provider, mut pool, timeline) = setup(0.5);
        let mut mixer = AudioMixer::new(MasterBus {
            volume: 0.8,
            muted: true,
        });
        let active = resolve(&timeline, 1.0);
        let report = mixer.tick(&active.audio, &mut pool, true);

        let state = provider.state("a.wav").unwrap();
        assert_eq!(state.volume, 0.0);
        assert!(!state.playing);
        assert!(report.audible.is_empty());
    }

    #[test]
    fn test_gain_applied_while_paused() {
        let (provider, mut pool, timeline) = setup(1.0);
        let mut mixer = AudioMixer::default();
        mixer.master.set_volume(0.25);
        let active = resolve(&timeline, 2.0);
        mixer.tick(&active.audio, &mut pool, false);

        let state = provider.state("a.wav").unwrap();
        assert_eq!(state.volume, 0.25);
        assert!(!state.playing);
        assert_eq!(state.position, 2.0);
    }

    #[test]
    fn test_clip_leaving_playhead_is_paused() {
        let (provider, mut pool, timeline) = setup(1.0);
        let mut mixer = AudioMixer::default();
        let active = resolve(&timeline, 1.0);
        mixer.tick(&active.audio, &mut pool, true);
        assert!(provider.state("a.wav").unwrap().playing);

        let past_end = resolve(&timeline, 12.0);
        let report = mixer.tick(&past_end.audio, &mut pool, true);
        assert_eq!(report.paused.len(), 1);
        assert!(!provider.state("a.wav").unwrap().playing);
    }
}
