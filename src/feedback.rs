//! Audible failure cue
//!
//! A short falling tone played when there is nothing to rephrase, when the
//! guard refuses the captured text, or when a request fails. The tone is
//! generated as WAV data at startup so no sound assets are shipped.
//!
//! rodio's output stream is not `Send`, so playback happens on a dedicated
//! thread that owns the stream; the cue itself only holds a channel sender.

use crate::config::FeedbackConfig;
use rodio::{Decoder, OutputStream, Sink, Source};
use std::io::Cursor;
use std::sync::mpsc;
use std::sync::Arc;

/// Trait for failure cues
pub trait FeedbackCue: Send + Sync {
    /// Signal a failure to the user (non-blocking)
    fn error(&self);
}

/// Cue that does nothing (feedback disabled or no audio device)
#[derive(Debug, Default)]
pub struct SilentFeedback;

impl FeedbackCue for SilentFeedback {
    fn error(&self) {}
}

/// Failure tone played through the default audio output
pub struct AudioFeedback {
    player: mpsc::Sender<()>,
}

impl AudioFeedback {
    /// Open the default output device on a playback thread
    pub fn new(config: &FeedbackConfig) -> Result<Self, String> {
        if !config.enabled {
            return Err("Audio feedback is disabled".to_string());
        }

        let volume = config.volume.clamp(0.0, 1.0);
        let tone = generate_two_tone_wav(300.0, 200.0, 200, 30);
        let (player, requests) = mpsc::channel::<()>();
        let (ready_tx, ready_rx) = mpsc::sync_channel::<Result<(), String>>(1);

        std::thread::Builder::new()
            .name("clipai-feedback".into())
            .spawn(move || {
                let (_stream, handle) = match OutputStream::try_default() {
                    Ok(pair) => {
                        let _ = ready_tx.send(Ok(()));
                        pair
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(format!("Failed to open audio output: {}", e)));
                        return;
                    }
                };

                // Exits when the AudioFeedback is dropped
                while requests.recv().is_ok() {
                    let played = Decoder::new(Cursor::new(tone.clone()))
                        .map_err(|e| format!("Failed to decode audio: {}", e))
                        .and_then(|source| {
                            let sink = Sink::try_new(&handle)
                                .map_err(|e| format!("Failed to create audio sink: {}", e))?;
                            sink.append(source.amplify(volume));
                            sink.sleep_until_end();
                            Ok(())
                        });

                    if let Err(e) = played {
                        tracing::warn!("Failed to play feedback sound: {}", e);
                    }
                }
            })
            .map_err(|e| format!("Failed to spawn feedback thread: {}", e))?;

        ready_rx
            .recv()
            .map_err(|_| "Feedback thread exited during startup".to_string())??;

        Ok(Self { player })
    }
}

impl FeedbackCue for AudioFeedback {
    fn error(&self) {
        if self.player.send(()).is_err() {
            tracing::debug!("Feedback thread is gone, skipping cue");
        }
    }
}

/// Create the configured cue, falling back to silence
pub fn create_feedback(config: &FeedbackConfig) -> Arc<dyn FeedbackCue> {
    if !config.enabled {
        return Arc::new(SilentFeedback);
    }

    match AudioFeedback::new(config) {
        Ok(feedback) => Arc::new(feedback),
        Err(e) => {
            tracing::warn!("Audio feedback unavailable: {}", e);
            Arc::new(SilentFeedback)
        }
    }
}

/// Generate a two-tone sound (first half at `freq1`, second at `freq2`)
fn generate_two_tone_wav(freq1: f32, freq2: f32, duration_ms: u32, fade_ms: u32) -> Vec<u8> {
    let sample_rate = 44100u32;
    let num_samples = (sample_rate * duration_ms / 1000) as usize;
    let fade_samples = ((sample_rate * fade_ms / 1000) as usize).max(1);
    let half_samples = num_samples / 2;

    let samples: Vec<i16> = (0..num_samples)
        .map(|i| {
            let t = i as f32 / sample_rate as f32;
            let freq = if i < half_samples { freq1 } else { freq2 };
            let mut amplitude = (2.0 * std::f32::consts::PI * freq * t).sin();

            // Fade in/out to avoid clicks
            if i < fade_samples {
                amplitude *= i as f32 / fade_samples as f32;
            } else if i + fade_samples >= num_samples {
                amplitude *= (num_samples - i) as f32 / fade_samples as f32;
            }

            (amplitude * 16000.0) as i16
        })
        .collect();

    encode_wav(&samples, sample_rate)
}

/// Encode mono 16-bit samples as WAV
fn encode_wav(samples: &[i16], sample_rate: u32) -> Vec<u8> {
    let data_len = (samples.len() * 2) as u32;
    let mut wav = Vec::with_capacity(44 + data_len as usize);

    wav.extend_from_slice(b"RIFF");
    wav.extend_from_slice(&(36 + data_len).to_le_bytes());
    wav.extend_from_slice(b"WAVE");

    wav.extend_from_slice(b"fmt ");
    wav.extend_from_slice(&16u32.to_le_bytes()); // chunk size
    wav.extend_from_slice(&1u16.to_le_bytes()); // PCM
    wav.extend_from_slice(&1u16.to_le_bytes()); // mono
    wav.extend_from_slice(&sample_rate.to_le_bytes());
    wav.extend_from_slice(&(sample_rate * 2).to_le_bytes()); // byte rate
    wav.extend_from_slice(&2u16.to_le_bytes()); // block align
    wav.extend_from_slice(&16u16.to_le_bytes()); // bits per sample

    wav.extend_from_slice(b"data");
    wav.extend_from_slice(&data_len.to_le_bytes());
    for sample in samples {
        wav.extend_from_slice(&sample.to_le_bytes());
    }

    wav
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_tone_is_valid_wav() {
        let wav = generate_two_tone_wav(300.0, 200.0, 200, 30);
        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(&wav[8..12], b"WAVE");
        // 200ms of 44.1kHz mono 16-bit plus the 44-byte header
        assert_eq!(wav.len(), 44 + 8820 * 2);
    }

    #[test]
    fn test_error_tone_decodes() {
        let wav = generate_two_tone_wav(300.0, 200.0, 200, 30);
        let decoder = Decoder::new(Cursor::new(wav)).unwrap();
        assert_eq!(decoder.channels(), 1);
        assert_eq!(decoder.sample_rate(), 44100);
    }

    #[test]
    fn test_disabled_feedback_is_silent() {
        let config = FeedbackConfig {
            enabled: false,
            volume: 0.5,
        };
        assert!(AudioFeedback::new(&config).is_err());
        create_feedback(&config).error();
    }
}
