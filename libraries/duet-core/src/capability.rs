//! Capability oracle: which backend, if any, can play a given source
//!
//! Support tables are precomputed inputs supplied by the host at setup
//! time; this module only applies policy on top of them. Sniffing
//! heuristics live outside the system boundary.

use crate::error::{CoreError, Result};
use crate::types::{BackendKind, Setup};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Recognized audio formats
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    /// MPEG-1 Audio Layer 3
    Mp3,

    /// MPEG-4 / AAC family (mp4, m4a, aac)
    Mp4,

    /// Waveform audio
    Wav,

    /// Ogg Vorbis
    Ogg,

    /// Free Lossless Audio Codec
    Flac,

    /// Opus
    Opus,

    /// Anything else, keyed by extension or MIME subtype
    Other(String),
}

impl Format {
    /// Parse a format from a MIME type such as `audio/mpeg`
    pub fn from_mime(mime: &str) -> Option<Self> {
        let mime = mime.trim().to_ascii_lowercase();
        let subtype = mime.strip_prefix("audio/")?;
        // strip codec parameters, e.g. audio/ogg; codecs=vorbis
        let subtype = subtype.split(';').next().unwrap_or(subtype).trim();
        Some(match subtype {
            "mpeg" | "mp3" => Format::Mp3,
            "mp4" | "aac" | "x-m4a" => Format::Mp4,
            "wav" | "x-wav" | "wave" => Format::Wav,
            "ogg" | "vorbis" => Format::Ogg,
            "flac" | "x-flac" => Format::Flac,
            "opus" => Format::Opus,
            other => Format::Other(other.to_string()),
        })
    }

    /// Parse a format from a URL's file extension
    ///
    /// Query string and fragment are ignored. Returns `None` when the
    /// URL carries no extension at all.
    pub fn from_url(url: &str) -> Option<Self> {
        let path = url.split(['?', '#']).next().unwrap_or(url);
        let name = path.rsplit('/').next().unwrap_or(path);
        let (stem, ext) = name.rsplit_once('.')?;
        if stem.is_empty() {
            return None;
        }
        let ext = ext.to_ascii_lowercase();
        Some(match ext.as_str() {
            "mp3" => Format::Mp3,
            "mp4" | "m4a" | "aac" => Format::Mp4,
            "wav" => Format::Wav,
            "ogg" | "oga" => Format::Ogg,
            "flac" => Format::Flac,
            "opus" => Format::Opus,
            _ => Format::Other(ext),
        })
    }

    /// Parse either a MIME type or a URL, whichever matches first
    pub fn from_mime_or_url(source: &str) -> Option<Self> {
        Format::from_mime(source).or_else(|| Format::from_url(source))
    }
}

/// Per-backend format support table
///
/// Immutable once handed to the oracle. An empty table means the
/// backend has not been probed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BackendSupport {
    formats: HashMap<Format, bool>,
}

impl BackendSupport {
    /// Empty (unprobed) table
    pub fn unprobed() -> Self {
        Self::default()
    }

    /// Record a probe result for one format
    pub fn with(mut self, format: Format, playable: bool) -> Self {
        self.formats.insert(format, playable);
        self
    }

    /// Whether this backend reported it can play the format
    pub fn supports(&self, format: &Format) -> bool {
        self.formats.get(format).copied().unwrap_or(false)
    }

    /// Whether any probe result has been recorded
    pub fn is_probed(&self) -> bool {
        !self.formats.is_empty()
    }
}

/// Tri-state answer to "can this be played?"
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CanPlay {
    /// Playable, and this backend would service it
    Yes(BackendKind),

    /// No backend can play it
    No,

    /// No backend has been probed yet
    Unknown,
}

/// Resolved source for a sound: one URL and the backend that owns it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    /// The chosen URL
    pub url: String,

    /// Backend that will service it
    pub backend: BackendKind,

    /// Whether the URL was accepted by the oracle (false = fallback)
    pub playable: bool,
}

/// Capability policy over the two backend support tables
///
/// Pure and immutable after construction.
#[derive(Debug, Clone)]
pub struct CapabilityOracle {
    native: BackendSupport,
    plugin: BackendSupport,
    prefer_plugin: bool,
    force_native: bool,
}

impl CapabilityOracle {
    /// Build the oracle, refusing to start on a required-format gap
    pub fn new(setup: &Setup, native: BackendSupport, plugin: BackendSupport) -> Result<Self> {
        for format in &setup.required_formats {
            if !native.supports(format) && !plugin.supports(format) {
                return Err(CoreError::CapabilityGap {
                    format: format.clone(),
                });
            }
        }
        Ok(Self {
            native,
            plugin,
            prefer_plugin: setup.prefer_plugin,
            force_native: setup.force_native,
        })
    }

    /// Answer whether a MIME type or URL is playable, and by whom
    pub fn can_play(&self, mime_or_url: &str) -> CanPlay {
        if !self.native.is_probed() && !self.plugin.is_probed() {
            return CanPlay::Unknown;
        }
        let Some(format) = Format::from_mime_or_url(mime_or_url) else {
            return CanPlay::No;
        };
        match self.elect(&format) {
            Some(kind) => CanPlay::Yes(kind),
            None => CanPlay::No,
        }
    }

    /// Pick a backend for a playable format, applying preference policy
    fn elect(&self, format: &Format) -> Option<BackendKind> {
        let native_ok = self.native.supports(format);
        let plugin_ok = self.plugin.supports(format);
        if self.force_native && native_ok {
            return Some(BackendKind::Native);
        }
        match (native_ok, plugin_ok) {
            (true, true) => {
                if self.prefer_plugin {
                    Some(BackendKind::Plugin)
                } else {
                    Some(BackendKind::Native)
                }
            }
            (true, false) => Some(BackendKind::Native),
            (false, true) => Some(BackendKind::Plugin),
            (false, false) => None,
        }
    }

    /// Backend used for sources no backend admits to playing
    ///
    /// The first candidate still has to go somewhere; route it the way
    /// the default policy leans.
    fn fallback_backend(&self) -> BackendKind {
        if self.force_native || !self.plugin.is_probed() {
            BackendKind::Native
        } else if self.prefer_plugin || !self.native.is_probed() {
            BackendKind::Plugin
        } else {
            BackendKind::Native
        }
    }

    /// Resolve a candidate URL list to one playable source
    ///
    /// Array short-circuit: the first candidate the oracle accepts
    /// wins. If none is playable the first entry is used as fallback.
    pub fn resolve_url(&self, candidates: &[String]) -> Result<Resolved> {
        if candidates.is_empty() {
            return Err(CoreError::invalid_input("empty url candidate list"));
        }
        for url in candidates {
            if let CanPlay::Yes(backend) = self.can_play(url) {
                return Ok(Resolved {
                    url: url.clone(),
                    backend,
                    playable: true,
                });
            }
        }
        let fallback = candidates[0].clone();
        let backend = self.fallback_backend();
        tracing::debug!(url = %fallback, ?backend, "no playable candidate, using first entry");
        Ok(Resolved {
            url: fallback,
            backend,
            playable: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn both_mp3_setup() -> (Setup, BackendSupport, BackendSupport) {
        let native = BackendSupport::unprobed()
            .with(Format::Mp3, true)
            .with(Format::Ogg, true);
        let plugin = BackendSupport::unprobed()
            .with(Format::Mp3, true)
            .with(Format::Mp4, true);
        (Setup::default(), native, plugin)
    }

    #[test]
    fn format_from_mime() {
        assert_eq!(Format::from_mime("audio/mpeg"), Some(Format::Mp3));
        assert_eq!(
            Format::from_mime("audio/ogg; codecs=vorbis"),
            Some(Format::Ogg)
        );
        assert_eq!(Format::from_mime("video/mp4"), None);
    }

    #[test]
    fn format_from_url() {
        assert_eq!(
            Format::from_url("http://example.com/a/song.mp3?x=1#t"),
            Some(Format::Mp3)
        );
        assert_eq!(Format::from_url("song.M4A"), Some(Format::Mp4));
        assert_eq!(Format::from_url("http://example.com/stream"), None);
    }

    #[test]
    fn tie_breaks_toward_native_by_default() {
        let (setup, native, plugin) = both_mp3_setup();
        let oracle = CapabilityOracle::new(&setup, native, plugin).unwrap();
        assert_eq!(oracle.can_play("a.mp3"), CanPlay::Yes(BackendKind::Native));
    }

    #[test]
    fn prefer_plugin_flips_the_tie() {
        let (mut setup, native, plugin) = both_mp3_setup();
        setup.prefer_plugin = true;
        let oracle = CapabilityOracle::new(&setup, native, plugin).unwrap();
        assert_eq!(oracle.can_play("a.mp3"), CanPlay::Yes(BackendKind::Plugin));
        // plugin-only format still routes to plugin
        assert_eq!(oracle.can_play("a.m4a"), CanPlay::Yes(BackendKind::Plugin));
    }

    #[test]
    fn force_native_beats_prefer_plugin() {
        let (mut setup, native, plugin) = both_mp3_setup();
        setup.prefer_plugin = true;
        setup.force_native = true;
        let oracle = CapabilityOracle::new(&setup, native, plugin).unwrap();
        assert_eq!(oracle.can_play("a.mp3"), CanPlay::Yes(BackendKind::Native));
        // but cannot force what native can't play
        assert_eq!(oracle.can_play("a.m4a"), CanPlay::Yes(BackendKind::Plugin));
    }

    #[test]
    fn unknown_before_any_probe() {
        let oracle = CapabilityOracle::new(
            &Setup::default(),
            BackendSupport::unprobed(),
            BackendSupport::unprobed(),
        )
        .unwrap();
        assert_eq!(oracle.can_play("a.mp3"), CanPlay::Unknown);
    }

    #[test]
    fn required_format_gap_is_fatal() {
        let mut setup = Setup::default();
        setup.required_formats = vec![Format::Mp3];
        let native = BackendSupport::unprobed().with(Format::Mp3, false);
        let plugin = BackendSupport::unprobed().with(Format::Ogg, true);
        let err = CapabilityOracle::new(&setup, native, plugin).unwrap_err();
        assert!(matches!(err, CoreError::CapabilityGap { format } if format == Format::Mp3));
    }

    #[test]
    fn resolve_url_first_playable_wins() {
        let (setup, native, plugin) = both_mp3_setup();
        let oracle = CapabilityOracle::new(&setup, native, plugin).unwrap();
        let resolved = oracle
            .resolve_url(&[
                "a.xyz".to_string(),
                "a.mp3".to_string(),
                "a.ogg".to_string(),
            ])
            .unwrap();
        assert_eq!(resolved.url, "a.mp3");
        assert!(resolved.playable);
    }

    #[test]
    fn resolve_url_falls_back_to_first() {
        let (setup, native, plugin) = both_mp3_setup();
        let oracle = CapabilityOracle::new(&setup, native, plugin).unwrap();
        let resolved = oracle
            .resolve_url(&["a.xyz".to_string(), "b.qqq".to_string()])
            .unwrap();
        assert_eq!(resolved.url, "a.xyz");
        assert!(!resolved.playable);
    }

    #[test]
    fn resolve_url_rejects_empty_list() {
        let (setup, native, plugin) = both_mp3_setup();
        let oracle = CapabilityOracle::new(&setup, native, plugin).unwrap();
        assert!(oracle.resolve_url(&[]).is_err());
    }
}
