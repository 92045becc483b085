//! File-based cache of synthesized segments.
//!
//! Entries are WAV files named by the SHA-256 of the backend's cache tag and
//! the full synthesis request.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};

use crate::audio::io::{read_wav, write_wav};
use crate::error::SynthesisError;
use crate::synth::{SynthesisRequest, Synthesizer};
use crate::types::AudioBuffer;

/// Get the cache directory.
///
/// Uses `VOICESYNC_CACHE_DIR` env var if set, otherwise `~/.cache/voicesync`.
pub fn cache_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("VOICESYNC_CACHE_DIR") {
        return PathBuf::from(dir);
    }
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".cache").join("voicesync")
}

/// 64-character hex key for a request rendered by the backend tagged
/// `backend_tag`.
pub fn request_key(backend_tag: &str, request: &SynthesisRequest) -> String {
    let mut hasher = Sha256::new();
    let parts = [
        backend_tag.to_string(),
        request.voice.clone(),
        request.rate_string(),
        request.volume_string(),
        request.pitch_string(),
        request.text.clone(),
    ];
    for part in &parts {
        hasher.update(part.as_bytes());
        // Separator keeps ("ab", "c") and ("a", "bc") apart
        hasher.update([0u8]);
    }
    format!("{:x}", hasher.finalize())
}

/// Write a WAV via temp file + rename.
fn atomic_write_wav(target: &Path, audio: &AudioBuffer) -> Result<()> {
    let tmp_path = target.with_extension("tmp");
    write_wav(&tmp_path, audio)?;
    std::fs::rename(&tmp_path, target)
        .with_context(|| format!("Failed to move cache entry into place: {}", target.display()))?;
    Ok(())
}

/// Caching wrapper around any synthesizer.
pub struct CachedSynthesizer<S> {
    inner: S,
    dir: PathBuf,
}

impl<S: Synthesizer> CachedSynthesizer<S> {
    /// Cache under [`cache_dir`]`/synth`.
    pub fn new(inner: S) -> Self {
        Self::with_dir(inner, cache_dir().join("synth"))
    }

    pub fn with_dir(inner: S, dir: PathBuf) -> Self {
        Self { inner, dir }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.wav", key))
    }

    fn lookup(&self, key: &str) -> Option<AudioBuffer> {
        let path = self.entry_path(key);
        if !path.metadata().map(|m| m.len() > 0).unwrap_or(false) {
            return None;
        }
        match read_wav(&path) {
            Ok(audio) => {
                log::debug!("Cache hit: synthesis ({}...)", &key[..12]);
                Some(audio)
            }
            Err(e) => {
                log::warn!("Ignoring unreadable cache entry {}: {:#}", path.display(), e);
                None
            }
        }
    }

    fn store(&self, key: &str, audio: &AudioBuffer) -> Result<(), SynthesisError> {
        atomic_write_wav(&self.entry_path(key), audio)
            .map_err(|e| SynthesisError::Cache(format!("{:#}", e)))
    }
}

impl<S: Synthesizer> Synthesizer for CachedSynthesizer<S> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn cache_tag(&self) -> String {
        self.inner.cache_tag()
    }

    fn synthesize(&self, request: &SynthesisRequest) -> Result<AudioBuffer, SynthesisError> {
        let key = request_key(&self.inner.cache_tag(), request);
        if let Some(audio) = self.lookup(&key) {
            return Ok(audio);
        }

        let audio = self.inner.synthesize(request)?;
        // Store failures are logged, not returned
        if let Err(e) = self.store(&key, &audio) {
            log::warn!("{}", e);
        }
        Ok(audio)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSynth {
        calls: AtomicUsize,
        model: &'static str,
    }

    impl CountingSynth {
        fn new(model: &'static str) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                model,
            }
        }
    }

    impl Synthesizer for CountingSynth {
        fn name(&self) -> &str {
            "counting"
        }

        fn cache_tag(&self) -> String {
            format!("counting|{}", self.model)
        }

        fn synthesize(&self, request: &SynthesisRequest) -> Result<AudioBuffer, SynthesisError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let n = request.text.len() * 100;
            Ok(AudioBuffer::new(vec![0.25; n], 16000))
        }
    }

    fn temp_cache(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("voicesync_cache_{}_{}", name, std::process::id()))
    }

    #[test]
    fn test_request_key_stable_and_distinct() {
        let a = SynthesisRequest::new("hello", "v1");
        let k1 = request_key("http", &a);
        assert_eq!(k1, request_key("http", &a.clone()));
        assert_eq!(k1.len(), 64);
        assert_ne!(k1, request_key("http", &a.clone().with_rate(10)));
        assert_ne!(k1, request_key("other", &a));
        assert_ne!(k1, request_key("http", &SynthesisRequest::new("hello", "v2")));
    }

    #[test]
    fn test_second_call_hits_cache() {
        let dir = temp_cache("hit");
        let cached = CachedSynthesizer::with_dir(CountingSynth::new("m1"), dir.clone());
        let req = SynthesisRequest::new("cache me", "en-US-GuyNeural");

        let first = cached.synthesize(&req).unwrap();
        let second = cached.synthesize(&req).unwrap();
        assert_eq!(cached.inner.calls.load(Ordering::SeqCst), 1);
        assert_eq!(first.len(), second.len());
        assert_eq!(second.sample_rate, 16000);

        cached.synthesize(&req.clone().with_rate(5)).unwrap();
        assert_eq!(cached.inner.calls.load(Ordering::SeqCst), 2);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_backend_settings_split_entries() {
        let dir = temp_cache("tag");
        let req = SynthesisRequest::new("same text", "en-US-GuyNeural");
        let first = CachedSynthesizer::with_dir(CountingSynth::new("tts-1"), dir.clone());
        first.synthesize(&req).unwrap();
        first.synthesize(&req).unwrap();
        assert_eq!(first.inner.calls.load(Ordering::SeqCst), 1);

        // Same backend name and request, different model
        let second = CachedSynthesizer::with_dir(CountingSynth::new("tts-1-hd"), dir.clone());
        assert_eq!(second.cache_tag(), "counting|tts-1-hd");
        second.synthesize(&req).unwrap();
        assert_eq!(second.inner.calls.load(Ordering::SeqCst), 1);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_corrupt_entry_is_miss() {
        let dir = temp_cache("corrupt");
        std::fs::create_dir_all(&dir).unwrap();
        let cached = CachedSynthesizer::with_dir(CountingSynth::new("m1"), dir.clone());
        let req = SynthesisRequest::new("x", "v");
        let key = request_key("counting|m1", &req);
        std::fs::write(dir.join(format!("{}.wav", key)), b"not a wav").unwrap();

        let audio = cached.synthesize(&req).unwrap();
        assert_eq!(audio.len(), 100);
        assert_eq!(cached.inner.calls.load(Ordering::SeqCst), 1);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_cache_dir_default() {
        let dir = cache_dir();
        assert!(!dir.to_string_lossy().is_empty());
    }
}
