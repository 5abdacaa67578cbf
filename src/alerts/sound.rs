use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

use rodio::source::{SineWave, Zero};
use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink, Source};

use super::{tone_notes, Alert, Note, Notification};
use crate::config::{AppConfig, CustomSound, SoundKind};
use crate::error::AlertError;

const TONE_VOLUME: f32 = 0.2;
const SAMPLE_RATE: u32 = 44_100;

enum Tone {
    Notes(&'static [Note]),
    /// Preloaded file bytes plus the window to play
    Clip {
        data: Arc<Vec<u8>>,
        start: Duration,
        duration: Duration,
    },
}

/// Plays a short tone on acquisition.
///
/// Owns the output stream, so it must stay on the thread that created it.
pub struct SoundAlert {
    _stream: OutputStream,
    stream_handle: OutputStreamHandle,
    tone: Tone,
}

impl SoundAlert {
    /// `Ok(None)` when the configured kind is [`SoundKind::None`].
    pub fn from_config(config: &AppConfig) -> Result<Option<Self>, AlertError> {
        let tone = match config.sound_type {
            SoundKind::None => return Ok(None),
            SoundKind::Custom => preload_clip(&config.custom_sound)?,
            kind => Tone::Notes(tone_notes(kind)),
        };

        let (stream, stream_handle) =
            OutputStream::try_default().map_err(|err| AlertError::StreamInitFailed(Box::new(err)))?;

        Ok(Some(Self {
            _stream: stream,
            stream_handle,
            tone,
        }))
    }
}

fn preload_clip(custom: &CustomSound) -> Result<Tone, AlertError> {
    let path = custom.path.as_ref().ok_or(AlertError::NoCustomSound)?;

    let data = std::fs::read(path).map_err(|err| AlertError::LoadFailed {
        path: path.display().to_string(),
        source: Box::new(err),
    })?;
    // Reject undecodable files up front instead of on the first match
    Decoder::new(Cursor::new(data.clone())).map_err(|err| AlertError::DecodeFailed(Box::new(err)))?;

    tracing::info!(
        "✓ Preloaded alert sound: {} ({} bytes)",
        path.display(),
        data.len()
    );

    Ok(Tone::Clip {
        data: Arc::new(data),
        start: Duration::from_secs_f32(custom.start.max(0.0)),
        duration: Duration::from_secs_f32(custom.duration.max(0.0)),
    })
}

impl Alert for SoundAlert {
    fn name(&self) -> &'static str {
        "sound"
    }

    fn fire(&mut self, _notification: &Notification) -> Result<(), AlertError> {
        let sink = Sink::try_new(&self.stream_handle)
            .map_err(|err| AlertError::StreamInitFailed(Box::new(err)))?;

        match &self.tone {
            Tone::Notes(notes) => {
                for note in notes.iter() {
                    let length = Duration::from_secs_f32(note.seconds);
                    if note.frequency_hz > 0.0 {
                        sink.append(
                            SineWave::new(note.frequency_hz)
                                .take_duration(length)
                                .amplify(TONE_VOLUME),
                        );
                    } else {
                        sink.append(Zero::<f32>::new(1, SAMPLE_RATE).take_duration(length));
                    }
                }
            }
            Tone::Clip {
                data,
                start,
                duration,
            } => {
                // rodio's Decoder needs owned 'static data
                let decoder = Decoder::new(Cursor::new((**data).clone()))
                    .map_err(|err| AlertError::DecodeFailed(Box::new(err)))?;
                sink.append(decoder.skip_duration(*start).take_duration(*duration));
            }
        }

        // Non-blocking; playback continues while the stream lives
        sink.detach();
        Ok(())
    }
}
