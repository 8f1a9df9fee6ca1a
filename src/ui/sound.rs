/// Block sound effects, synthesized at startup and played through rodio.
///
/// Each known `SoundId` name maps to an in-memory WAV buffer; unknown
/// names get a short blip. Without the "sound" feature `SoundEngine` is an
/// inert stub.

use crate::sim::event::ZoneEvent;

#[cfg(feature = "sound")]
mod inner {
    use std::collections::HashMap;
    use std::f32::consts::TAU;
    use std::io::Cursor;
    use std::sync::Arc;

    use rand::rngs::SmallRng;
    use rand::{Rng, SeedableRng};
    use rodio::{OutputStream, OutputStreamHandle, Sink};

    use crate::sim::event::SoundId;

    const SAMPLE_RATE: u32 = 22_050;

    /// Pre-generated WAV buffers per effect name.
    pub struct SoundEngine {
        _stream: OutputStream,
        handle: OutputStreamHandle,
        named: HashMap<&'static str, Arc<Vec<u8>>>,
        sfx_fallback: Arc<Vec<u8>>,
        sfx_reset: Arc<Vec<u8>>,
    }

    impl SoundEngine {
        pub fn new() -> Option<Self> {
            let (stream, handle) = match OutputStream::try_default() {
                Ok(pair) => pair,
                Err(e) => {
                    tracing::warn!("no audio output, running silent: {e}");
                    return None;
                }
            };

            let mut named = HashMap::new();
            named.insert("scrape", Arc::new(make_wav(&gen_scrape(180.0, 0.22))));
            named.insert("scrape-low", Arc::new(make_wav(&gen_scrape(110.0, 0.30))));
            named.insert("creak", Arc::new(make_wav(&gen_creak())));
            let sfx_fallback = Arc::new(make_wav(&gen_blip(440.0, 0.06, 0.25)));
            let sfx_reset = Arc::new(make_wav(&gen_thud()));

            Some(SoundEngine {
                _stream: stream,
                handle,
                named,
                sfx_fallback,
                sfx_reset,
            })
        }

        /// Fire and forget on a detached sink.
        fn play_buf(&self, buf: &Arc<Vec<u8>>) {
            let Ok(sink) = Sink::try_new(&self.handle) else { return };
            match rodio::Decoder::new(Cursor::new(buf.as_ref().clone())) {
                Ok(source) => {
                    sink.append(source);
                    sink.detach();
                }
                Err(e) => tracing::debug!("sound buffer rejected: {e}"),
            }
        }

        pub fn play(&self, sound: &SoundId) {
            let buf = self.named.get(sound.as_str()).unwrap_or(&self.sfx_fallback);
            self.play_buf(buf);
        }

        pub fn play_reset(&self) { self.play_buf(&self.sfx_reset); }
    }

    // ════════════════════════════════════════════════════════════
    //  Waveforms: mono f32 samples in [-1, 1]
    // ════════════════════════════════════════════════════════════

    /// `seconds` of audio; `f(t, p)` gets time in seconds and progress 0..1.
    fn render(seconds: f32, mut f: impl FnMut(f32, f32) -> f32) -> Vec<f32> {
        let count = (SAMPLE_RATE as f32 * seconds) as usize;
        let rate = SAMPLE_RATE as f32;
        (0..count).map(|i| f(i as f32 / rate, i as f32 / count as f32)).collect()
    }

    fn sine(t: f32, freq: f32) -> f32 {
        (TAU * freq * t).sin()
    }

    /// Fading sine, used for unknown effect names.
    fn gen_blip(freq: f32, seconds: f32, volume: f32) -> Vec<f32> {
        render(seconds, |t, p| sine(t, freq) * (1.0 - p) * volume)
    }

    /// Stone dragged over stone: a falling sawtooth mixed with noise.
    fn gen_scrape(base: f32, seconds: f32) -> Vec<f32> {
        let mut grit = SmallRng::seed_from_u64(0x9E37_79B9);
        render(seconds, |t, p| {
            let noise: f32 = grit.gen_range(-1.0..1.0);
            let saw = 2.0 * (t * base * (1.0 - 0.3 * p)).fract() - 1.0;
            let attack = (p * 12.0).min(1.0);
            (saw + noise) * 0.15 * attack * (1.0 - p)
        })
    }

    /// Wooden cart creak: a square tone with vibrato.
    fn gen_creak() -> Vec<f32> {
        render(0.25, |t, p| {
            let freq = 320.0 + sine(t, 18.0) * 40.0;
            sine(t, freq).signum() * 0.15 * (1.0 - p)
        })
    }

    /// Block back home: two low knocks.
    fn gen_thud() -> Vec<f32> {
        let mut out = render(0.06, |t, p| sine(t, 90.0) * (1.0 - p.sqrt()) * 0.5);
        out.extend(render(0.12, |t, p| sine(t, 60.0) * (1.0 - p.sqrt()) * 0.5));
        out
    }

    /// 16-bit mono PCM WAV around `samples`.
    fn make_wav(samples: &[f32]) -> Vec<u8> {
        const CHANNELS: u16 = 1;
        const BITS: u16 = 16;
        let frame_bytes = CHANNELS * BITS / 8;
        let data_len = samples.len() as u32 * frame_bytes as u32;

        let mut wav = Vec::with_capacity(44 + data_len as usize);
        let header: [&[u8]; 12] = [
            b"RIFF",
            &(36 + data_len).to_le_bytes(),
            b"WAVEfmt ",
            &16u32.to_le_bytes(),
            &1u16.to_le_bytes(),
            &CHANNELS.to_le_bytes(),
            &SAMPLE_RATE.to_le_bytes(),
            &(SAMPLE_RATE * frame_bytes as u32).to_le_bytes(),
            &frame_bytes.to_le_bytes(),
            &BITS.to_le_bytes(),
            b"data",
            &data_len.to_le_bytes(),
        ];
        for part in header {
            wav.extend_from_slice(part);
        }
        wav.extend(samples.iter().flat_map(|s| ((s.clamp(-1.0, 1.0) * 32767.0) as i16).to_le_bytes()));
        wav
    }

}

// ════════════════════════════════════════════════════════════
//  Public API: no-ops when the sound feature is off
// ════════════════════════════════════════════════════════════

#[cfg(feature = "sound")]
pub use inner::SoundEngine;

#[cfg(not(feature = "sound"))]
pub struct SoundEngine;

#[cfg(not(feature = "sound"))]
impl SoundEngine {
    pub fn new() -> Option<Self> { Some(SoundEngine) }
    pub fn play(&self, _sound: &crate::sim::event::SoundId) {}
    pub fn play_reset(&self) {}
}

/// Play whatever the events ask for.
pub fn process_sound_events(sound: Option<&SoundEngine>, events: &[ZoneEvent]) {
    let Some(engine) = sound else { return };
    for event in events {
        if let ZoneEvent::Sound { sound, .. } = event {
            engine.play(sound);
        } else if matches!(event, ZoneEvent::BlockReset { .. }) {
            engine.play_reset();
        }
    }
}
