// Copyright the wfd-source authors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed configuration the embedder fills in before starting a session or
//! address pool. No file or CLI parsing: that's explicitly out of scope.

use crate::error::{wrap, ErrorInt, Result};
use crate::message::{AudioFormat, VideoNativeResolutionFamily};

/// Source-side capabilities and timeouts for one [`crate::session::Session`].
#[derive(Clone, Debug)]
pub struct SessionConfig {
    /// Seconds between M16 keep-alives is `session_timeout - 5`; the sink
    /// must respond within that trailing 5s window.
    pub session_timeout_secs: u32,

    /// Audio formats the source is willing to offer, in priority order
    /// (highest priority first). Must be non-empty.
    pub preferred_audio_formats: Vec<AudioFormat>,

    /// The native resolution family this source negotiates against.
    pub native_resolution_family: VideoNativeResolutionFamily,

    /// This source's supported-resolution bitmask within
    /// `native_resolution_family`.
    pub supported_resolution_mask: u32,

    /// Whether to advertise `wfd_content_protection` with HDCP2.x. Field
    /// carriage only — no cryptography is performed regardless.
    pub content_protection_enabled: bool,

    /// Whether M3 also queries `wfd_3d_video_formats`. Most sinks don't
    /// support 3D; defaults to off.
    pub video_3d_enabled: bool,
}

impl SessionConfig {
    /// Validates the configuration, matching the `InvalidArgument` cases a
    /// misconfigured embedder would otherwise only discover during
    /// negotiation.
    pub fn validate(&self) -> Result<()> {
        if self.session_timeout_secs <= 5 {
            return Err(wrap!(ErrorInt::InvalidArgument {
                description: format!(
                    "session_timeout_secs must be > 5, got {}",
                    self.session_timeout_secs
                ),
            }));
        }
        if self.preferred_audio_formats.is_empty() {
            return Err(wrap!(ErrorInt::InvalidArgument {
                description: "preferred_audio_formats must not be empty".to_string(),
            }));
        }
        if self.supported_resolution_mask == 0 {
            return Err(wrap!(ErrorInt::InvalidArgument {
                description: "supported_resolution_mask must have at least one bit set"
                    .to_string(),
            }));
        }
        Ok(())
    }

    /// Seconds between consecutive M16 sends.
    pub fn keep_alive_interval_secs(&self) -> u32 {
        self.session_timeout_secs - 5
    }
}

impl Default for SessionConfig {
    fn default() -> SessionConfig {
        SessionConfig {
            session_timeout_secs: 60,
            preferred_audio_formats: vec![AudioFormat::LPCM, AudioFormat::AAC, AudioFormat::AC3],
            native_resolution_family: VideoNativeResolutionFamily::Cea,
            supported_resolution_mask: 0,
            content_protection_enabled: false,
            video_3d_enabled: false,
        }
    }
}

/// One `add_range` call's worth of configuration for [`crate::pool::Pool`].
#[derive(Clone, Debug)]
pub struct PoolRangeConfig {
    pub min_addr: String,
    pub max_addr: String,
    pub min_port: u16,
    pub max_port: u16,
    pub ttl: u8,
}
