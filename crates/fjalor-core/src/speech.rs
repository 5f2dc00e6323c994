//! Speech adapter
//!
//! Pronounces entries through whatever speech tooling the host provides.
//! Synthesis shells out to the first available of `espeak-ng`, `espeak`,
//! `spd-say` or `say`; recorded pronunciations (base64 data URLs) are
//! decoded to a temp file and handed to an audio player.
//!
//! Only one utterance plays at a time: starting a new one kills the
//! previous process.

use std::fs;
use std::io;
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::SpeechSettings;
use crate::models::Entry;

/// Words per minute at rate 1.0
const BASE_WPM: f32 = 175.0;

/// Audio players probed for recordings, in preference order
const PLAYERS: &[&str] = &["paplay", "aplay", "afplay", "ffplay"];

/// Errors from the speech adapter
#[derive(Error, Debug)]
pub enum SpeechError {
    #[error("Speech is not supported: no {0} found on PATH")]
    Unsupported(&'static str),

    #[error("Invalid recording: {0}")]
    InvalidRecording(String),

    #[error("Speech command failed: {0}")]
    Io(#[from] io::Error),
}

pub type SpeechResult<T> = Result<T, SpeechError>;

/// Host text-to-speech command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeechBackend {
    EspeakNg,
    Espeak,
    SpdSay,
    Say,
}

impl SpeechBackend {
    const ALL: [SpeechBackend; 4] = [
        SpeechBackend::EspeakNg,
        SpeechBackend::Espeak,
        SpeechBackend::SpdSay,
        SpeechBackend::Say,
    ];

    pub fn program(&self) -> &'static str {
        match self {
            SpeechBackend::EspeakNg => "espeak-ng",
            SpeechBackend::Espeak => "espeak",
            SpeechBackend::SpdSay => "spd-say",
            SpeechBackend::Say => "say",
        }
    }

    /// First backend found on PATH
    pub fn detect() -> Option<Self> {
        Self::ALL.into_iter().find(|b| command_exists(b.program()))
    }

    /// Build the command that speaks `text`
    fn speak_command(&self, text: &str, voice: Option<&str>, rate: f32, pitch: f32) -> Command {
        let mut cmd = Command::new(self.program());
        match self {
            SpeechBackend::EspeakNg | SpeechBackend::Espeak => {
                if let Some(voice) = voice {
                    cmd.args(["-v", voice]);
                }
                cmd.args(["-s", &words_per_minute(rate).to_string()]);
                cmd.args(["-p", &espeak_pitch(pitch).to_string()]);
                cmd.arg("--").arg(text);
            }
            SpeechBackend::SpdSay => {
                if let Some(voice) = voice {
                    cmd.args(["-y", voice]);
                }
                cmd.args(["-r", &percent_offset(rate, 0.1, 10.0).to_string()]);
                cmd.args(["-p", &percent_offset(pitch, 0.0, 2.0).to_string()]);
                cmd.arg("-w").arg(text);
            }
            SpeechBackend::Say => {
                if let Some(voice) = voice {
                    cmd.args(["-v", voice]);
                }
                cmd.args(["-r", &words_per_minute(rate).to_string()]);
                cmd.arg(text);
            }
        }
        cmd
    }

    /// Build the command that lists installed voices
    fn list_command(&self) -> Command {
        let mut cmd = Command::new(self.program());
        match self {
            SpeechBackend::EspeakNg | SpeechBackend::Espeak => cmd.arg("--voices"),
            SpeechBackend::SpdSay => cmd.arg("-L"),
            SpeechBackend::Say => cmd.args(["-v", "?"]),
        };
        cmd
    }

    /// Parse the output of `list_command`
    pub fn parse_voices(&self, output: &str) -> Vec<Voice> {
        match self {
            SpeechBackend::EspeakNg | SpeechBackend::Espeak => parse_espeak_voices(output),
            SpeechBackend::SpdSay => parse_spd_voices(output),
            SpeechBackend::Say => parse_say_voices(output),
        }
    }
}

/// A voice offered by the backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Voice {
    /// Identifier passed back to the backend
    pub id: String,
    /// Display name
    pub name: String,
    /// Language tag, e.g. `sq` or `en_US`
    pub lang: String,
}

impl Voice {
    fn matches(&self, key: &str) -> bool {
        self.id.eq_ignore_ascii_case(key) || self.name.eq_ignore_ascii_case(key)
    }
}

/// Pick the default voice: first Albanian one, else the first available
pub fn default_voice(voices: &[Voice]) -> Option<&Voice> {
    voices
        .iter()
        .find(|v| v.lang.to_lowercase().starts_with("sq"))
        .or_else(|| voices.first())
}

/// Text-to-speech and recording playback
#[derive(Debug)]
pub struct Speech {
    backend: Option<SpeechBackend>,
    player: Option<&'static str>,
    voices: Vec<Voice>,
    voice: Option<String>,
    rate: f32,
    pitch: f32,
    current: Option<Child>,
    scratch: PathBuf,
}

impl Speech {
    /// Probe the host and apply the configured speech settings
    pub fn new(settings: &SpeechSettings) -> Self {
        let backend = SpeechBackend::detect();
        let player = PLAYERS.iter().copied().find(|p| command_exists(p));
        let voices = backend.map(load_voices).unwrap_or_default();
        debug!(
            "Speech backend: {:?}, player: {:?}, {} voices",
            backend,
            player,
            voices.len()
        );

        let mut speech = Self::with_backend(backend, player, voices);
        speech.set_rate(settings.rate);
        speech.set_pitch(settings.pitch);
        if let Some(ref voice) = settings.voice {
            if !speech.select_voice(voice) {
                warn!("Configured voice '{}' is not installed", voice);
            }
        }
        speech
    }

    /// Build an adapter over explicit host capabilities
    pub fn with_backend(
        backend: Option<SpeechBackend>,
        player: Option<&'static str>,
        voices: Vec<Voice>,
    ) -> Self {
        let voice = default_voice(&voices).map(|v| v.id.clone());
        Self {
            backend,
            player,
            voices,
            voice,
            rate: 1.0,
            pitch: 1.0,
            current: None,
            scratch: std::env::temp_dir()
                .join(format!("fjalor-recording-{}", std::process::id())),
        }
    }

    /// Whether text-to-speech is available
    pub fn is_supported(&self) -> bool {
        self.backend.is_some()
    }

    pub fn backend(&self) -> Option<SpeechBackend> {
        self.backend
    }

    pub fn voices(&self) -> &[Voice] {
        &self.voices
    }

    pub fn selected_voice(&self) -> Option<&Voice> {
        let id = self.voice.as_deref()?;
        self.voices.iter().find(|v| v.id == id)
    }

    /// Select a voice by id or name; returns false if none matches
    pub fn select_voice(&mut self, key: &str) -> bool {
        match self.voices.iter().find(|v| v.matches(key)) {
            Some(voice) => {
                self.voice = Some(voice.id.clone());
                true
            }
            None => false,
        }
    }

    pub fn rate(&self) -> f32 {
        self.rate
    }

    pub fn set_rate(&mut self, rate: f32) {
        self.rate = rate.clamp(0.1, 10.0);
    }

    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    pub fn set_pitch(&mut self, pitch: f32) {
        self.pitch = pitch.clamp(0.0, 2.0);
    }

    /// Whether an utterance is still playing
    pub fn is_speaking(&mut self) -> bool {
        match self.current.as_mut() {
            Some(child) => matches!(child.try_wait(), Ok(None)),
            None => false,
        }
    }

    /// Speak `text`, interrupting anything already playing
    pub fn speak(&mut self, text: &str) -> SpeechResult<()> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(());
        }
        let backend = self.backend.ok_or(SpeechError::Unsupported("speech synthesizer"))?;

        self.stop();
        let mut cmd = backend.speak_command(text, self.voice.as_deref(), self.rate, self.pitch);
        self.current = Some(spawn_quiet(&mut cmd)?);
        debug!("Speaking '{}' with {}", text, backend.program());
        Ok(())
    }

    /// Play a recorded pronunciation given as a base64 data URL
    pub fn play_recording(&mut self, data_url: &str) -> SpeechResult<()> {
        let player = self.player.ok_or(SpeechError::Unsupported("audio player"))?;
        let (mime, bytes) = decode_data_url(data_url)?;

        self.stop();
        let path = self.scratch.with_extension(extension_for(&mime));
        fs::write(&path, bytes)?;

        let mut cmd = Command::new(player);
        if player == "ffplay" {
            cmd.args(["-nodisp", "-autoexit", "-loglevel", "quiet"]);
        }
        cmd.arg(&path);
        self.current = Some(spawn_quiet(&mut cmd)?);
        debug!("Playing {} recording with {}", mime, player);
        Ok(())
    }

    /// Pronounce an entry, preferring its recording over synthesis
    pub fn pronounce(&mut self, entry: &Entry) -> SpeechResult<()> {
        if let Some(recording) = entry.recording.as_deref().filter(|r| !r.is_empty()) {
            match self.play_recording(recording) {
                Ok(()) => return Ok(()),
                Err(e) if self.is_supported() => {
                    warn!("Falling back to synthesis for '{}': {}", entry.word, e);
                }
                Err(e) => return Err(e),
            }
        }
        self.speak(&entry.word)
    }

    /// Block until the current utterance finishes
    pub fn wait(&mut self) -> SpeechResult<()> {
        if let Some(mut child) = self.current.take() {
            child.wait()?;
        }
        Ok(())
    }

    /// Stop the current utterance, if any
    pub fn stop(&mut self) {
        if let Some(mut child) = self.current.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

impl Drop for Speech {
    fn drop(&mut self) {
        self.stop();
        for ext in ["webm", "ogg", "wav", "mp3", "m4a", "bin"] {
            let _ = fs::remove_file(self.scratch.with_extension(ext));
        }
    }
}

fn load_voices(backend: SpeechBackend) -> Vec<Voice> {
    match backend.list_command().stderr(Stdio::null()).output() {
        Ok(output) if output.status.success() => {
            backend.parse_voices(&String::from_utf8_lossy(&output.stdout))
        }
        Ok(output) => {
            warn!("{} exited with {} listing voices", backend.program(), output.status);
            Vec::new()
        }
        Err(e) => {
            warn!("Failed to list voices: {}", e);
            Vec::new()
        }
    }
}

fn spawn_quiet(cmd: &mut Command) -> io::Result<Child> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
}

/// Check if a command exists in PATH
fn command_exists(cmd: &str) -> bool {
    Command::new("which")
        .arg(cmd)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

fn words_per_minute(rate: f32) -> u32 {
    (BASE_WPM * rate.clamp(0.1, 10.0)).round() as u32
}

/// espeak pitch is 0..=99 with 50 as neutral
fn espeak_pitch(pitch: f32) -> u32 {
    ((pitch.clamp(0.0, 2.0) * 50.0).round() as u32).min(99)
}

/// spd-say takes -100..=100 with 0 as neutral
fn percent_offset(value: f32, min: f32, max: f32) -> i32 {
    (((value.clamp(min, max) - 1.0) * 100.0).round() as i32).clamp(-100, 100)
}

/// Split a `data:<mime>;base64,<payload>` URL into its mime type and bytes
pub fn decode_data_url(data_url: &str) -> SpeechResult<(String, Vec<u8>)> {
    let rest = data_url
        .trim()
        .strip_prefix("data:")
        .ok_or_else(|| SpeechError::InvalidRecording("not a data URL".to_string()))?;
    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| SpeechError::InvalidRecording("missing payload".to_string()))?;

    let mut parts = header.split(';');
    let mime = parts.next().unwrap_or_default().to_string();
    if !parts.any(|p| p == "base64") {
        return Err(SpeechError::InvalidRecording(
            "only base64 recordings are supported".to_string(),
        ));
    }

    let bytes = STANDARD
        .decode(payload)
        .map_err(|e| SpeechError::InvalidRecording(e.to_string()))?;
    if bytes.is_empty() {
        return Err(SpeechError::InvalidRecording("empty payload".to_string()));
    }
    Ok((mime, bytes))
}

/// Encode audio bytes as a data URL for storing on an entry
pub fn encode_data_url(mime: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime, STANDARD.encode(bytes))
}

/// Guess a mime type from a file extension
pub fn mime_for_extension(ext: &str) -> &'static str {
    match ext.to_ascii_lowercase().as_str() {
        "wav" => "audio/wav",
        "ogg" | "oga" | "opus" => "audio/ogg",
        "mp3" => "audio/mpeg",
        "m4a" | "mp4" | "aac" => "audio/mp4",
        _ => "audio/webm",
    }
}

fn extension_for(mime: &str) -> &'static str {
    match mime {
        "audio/webm" | "video/webm" => "webm",
        "audio/ogg" => "ogg",
        "audio/wav" | "audio/x-wav" | "audio/wave" => "wav",
        "audio/mpeg" | "audio/mp3" => "mp3",
        "audio/mp4" | "audio/x-m4a" | "audio/aac" => "m4a",
        _ => "bin",
    }
}

/// `Pty Language Age/Gender VoiceName File Other`
fn parse_espeak_voices(output: &str) -> Vec<Voice> {
    output
        .lines()
        .skip(1)
        .filter_map(|line| {
            let cols: Vec<&str> = line.split_whitespace().collect();
            if cols.len() < 4 {
                return None;
            }
            Some(Voice {
                id: cols[1].to_string(),
                name: cols[3].replace('_', " "),
                lang: cols[1].to_string(),
            })
        })
        .collect()
}

/// `NAME LANGUAGE VARIANT`
fn parse_spd_voices(output: &str) -> Vec<Voice> {
    output
        .lines()
        .skip(1)
        .filter_map(|line| {
            let cols: Vec<&str> = line.split_whitespace().collect();
            if cols.len() < 2 {
                return None;
            }
            Some(Voice {
                id: cols[0].to_string(),
                name: cols[0].to_string(),
                lang: cols[1].to_string(),
            })
        })
        .collect()
}

/// `Name With Spaces   lang_REGION    # sample sentence`
fn parse_say_voices(output: &str) -> Vec<Voice> {
    output
        .lines()
        .filter_map(|line| {
            let spec = line.split('#').next()?.trim_end();
            let (name, lang) = spec.rsplit_once(char::is_whitespace)?;
            let name = name.trim();
            if name.is_empty() || lang.is_empty() {
                return None;
            }
            Some(Voice {
                id: name.to_string(),
                name: name.to_string(),
                lang: lang.to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EntryDraft;

    fn voices() -> Vec<Voice> {
        parse_espeak_voices(
            "Pty Language       Age/Gender VoiceName          File                 Other Languages\n \
             5  en-gb           --/M      English_(Great_Britain) gmw/en\n \
             5  sq              --/M      Albanian           ine/sq\n",
        )
    }

    #[test]
    fn test_parse_espeak_voices() {
        let voices = voices();
        assert_eq!(voices.len(), 2);
        assert_eq!(voices[1].id, "sq");
        assert_eq!(voices[1].name, "Albanian");
    }

    #[test]
    fn test_parse_spd_voices() {
        let voices = parse_spd_voices("NAME LANGUAGE VARIANT\nalbanian sq none\nenglish en none\n");
        assert_eq!(voices[0].lang, "sq");
        assert_eq!(voices[1].id, "english");
    }

    #[test]
    fn test_parse_say_voices() {
        let voices = parse_say_voices(
            "Alex                en_US    # Most people recognize me by my voice.\n\
             Bad News            en_US    # The light you see at the end of the tunnel.\n",
        );
        assert_eq!(voices.len(), 2);
        assert_eq!(voices[1].name, "Bad News");
        assert_eq!(voices[1].lang, "en_US");
    }

    #[test]
    fn test_default_voice_prefers_albanian() {
        let voices = voices();
        assert_eq!(default_voice(&voices).unwrap().id, "sq");

        let english = vec![voices[0].clone()];
        assert_eq!(default_voice(&english).unwrap().id, "en-gb");
        assert!(default_voice(&[]).is_none());
    }

    #[test]
    fn test_select_voice() {
        let mut speech = Speech::with_backend(Some(SpeechBackend::EspeakNg), None, voices());
        assert_eq!(speech.selected_voice().unwrap().id, "sq");

        assert!(speech.select_voice("EN-GB"));
        assert_eq!(speech.selected_voice().unwrap().id, "en-gb");
        assert!(!speech.select_voice("klingon"));
        assert_eq!(speech.selected_voice().unwrap().id, "en-gb");
    }

    #[test]
    fn test_rate_and_pitch_are_clamped() {
        let mut speech = Speech::with_backend(None, None, Vec::new());
        speech.set_rate(50.0);
        speech.set_pitch(-1.0);
        assert_eq!(speech.rate(), 10.0);
        assert_eq!(speech.pitch(), 0.0);

        assert_eq!(words_per_minute(1.0), 175);
        assert_eq!(espeak_pitch(1.0), 50);
        assert_eq!(espeak_pitch(2.0), 99);
        assert_eq!(percent_offset(1.0, 0.0, 2.0), 0);
        assert_eq!(percent_offset(2.0, 0.0, 2.0), 100);
    }

    #[test]
    fn test_empty_text_is_noop() {
        let mut speech = Speech::with_backend(None, None, Vec::new());
        assert!(speech.speak("   ").is_ok());
        assert!(matches!(
            speech.speak("mace"),
            Err(SpeechError::Unsupported(_))
        ));
        assert!(!speech.is_speaking());
    }

    #[test]
    fn test_decode_data_url() {
        let url = encode_data_url("audio/webm", b"RIFF");
        assert_eq!(url, "data:audio/webm;base64,UklGRg==");

        let (mime, bytes) = decode_data_url(&url).unwrap();
        assert_eq!(mime, "audio/webm");
        assert_eq!(bytes, b"RIFF");

        let (mime, _) = decode_data_url("data:audio/webm;codecs=opus;base64,UklGRg==").unwrap();
        assert_eq!(mime, "audio/webm");
    }

    #[test]
    fn test_decode_rejects_bad_urls() {
        for bad in [
            "https://example.com/a.wav",
            "data:audio/wav;base64",
            "data:audio/wav,plain",
            "data:audio/wav;base64,!!!",
            "data:audio/wav;base64,",
        ] {
            assert!(
                matches!(decode_data_url(bad), Err(SpeechError::InvalidRecording(_))),
                "accepted {}",
                bad
            );
        }
    }

    #[test]
    fn test_pronounce_without_capabilities() {
        let mut speech = Speech::with_backend(None, None, Vec::new());
        let entry = Entry::new(
            EntryDraft::new("mace", "animal", "Macja.")
                .with_recording(Some("data:audio/webm;base64,UklGRg==".into())),
        );
        assert!(matches!(
            speech.pronounce(&entry),
            Err(SpeechError::Unsupported("audio player"))
        ));
    }

    #[test]
    fn test_mime_and_extension() {
        assert_eq!(mime_for_extension("WAV"), "audio/wav");
        assert_eq!(extension_for("audio/wav"), "wav");
        assert_eq!(extension_for("audio/unknown"), "bin");
    }
}
