// Copyright the wfd-source authors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The WFD parameter message codec.
//!
//! A [`WfdMessage`] is an in-memory, typed representation of the
//! `attribute: value` lines carried in the body of RTSP `GET_PARAMETER` and
//! `SET_PARAMETER` requests during the Miracast capability-negotiation
//! handshake (M1–M7). Presence of a field is meaningful: an attribute that
//! was never set is never emitted, and is distinct from an attribute that
//! was set with an empty value (eg `wfd_standby`, `wfd_idr_request`).
//!
//! This module only defines the data model and the round-trip codec
//! (parse/serialize). Negotiation lives in [`crate::session::negotiate`].

pub mod parse;
pub mod resolution;
pub mod ser;

use bytes::Bytes;
pub use resolution::{CeaResolution, HhResolution, VesaResolution};
use smallvec::SmallVec;

/// Bitmask of supported audio sample formats. `0` means "unknown"/absent.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct AudioFormat(pub u8);

impl AudioFormat {
    pub const UNKNOWN: AudioFormat = AudioFormat(0);
    pub const LPCM: AudioFormat = AudioFormat(1 << 0);
    pub const AAC: AudioFormat = AudioFormat(1 << 1);
    pub const AC3: AudioFormat = AudioFormat(1 << 2);

    pub fn contains(self, other: AudioFormat) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn intersects(self, other: AudioFormat) -> bool {
        self.0 & other.0 != 0
    }

    /// Renders the canonical single-codec name used on the wire
    /// (`LPCM`/`AAC`/`AC3`), or `None` if this isn't exactly one bit.
    pub fn name(self) -> Option<&'static str> {
        match self {
            AudioFormat::LPCM => Some("LPCM"),
            AudioFormat::AAC => Some("AAC"),
            AudioFormat::AC3 => Some("AC3"),
            _ => None,
        }
    }

    pub fn from_name(s: &str) -> AudioFormat {
        match s {
            "LPCM" => AudioFormat::LPCM,
            "AAC" => AudioFormat::AAC,
            "AC3" => AudioFormat::AC3,
            _ => AudioFormat::UNKNOWN,
        }
    }
}

impl std::ops::BitOr for AudioFormat {
    type Output = AudioFormat;
    fn bitor(self, rhs: AudioFormat) -> AudioFormat {
        AudioFormat(self.0 | rhs.0)
    }
}

impl std::ops::BitAnd for AudioFormat {
    type Output = AudioFormat;
    fn bitand(self, rhs: AudioFormat) -> AudioFormat {
        AudioFormat(self.0 & rhs.0)
    }
}

/// Bitmask of supported audio sample rates.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct AudioFreq(pub u8);

impl AudioFreq {
    pub const UNKNOWN: AudioFreq = AudioFreq(0);
    pub const HZ_44100: AudioFreq = AudioFreq(1 << 0);
    pub const HZ_48000: AudioFreq = AudioFreq(1 << 1);
}

/// Bitmask of supported channel counts.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct AudioChannels(pub u8);

impl AudioChannels {
    pub const UNKNOWN: AudioChannels = AudioChannels(0);
    pub const CH_2: AudioChannels = AudioChannels(1 << 0);
    pub const CH_4: AudioChannels = AudioChannels(1 << 1);
    pub const CH_6: AudioChannels = AudioChannels(1 << 2);
    pub const CH_8: AudioChannels = AudioChannels(1 << 3);
}

/// Bitmask of supported video codecs. Only H.264 is defined by WFD.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct VideoCodec(pub u8);

impl VideoCodec {
    pub const UNKNOWN: VideoCodec = VideoCodec(0);
    pub const H264: VideoCodec = VideoCodec(1 << 0);
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum VideoNativeResolutionFamily {
    Cea = 0,
    Vesa = 1,
    Hh = 2,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct H264Profile(pub u8);

impl H264Profile {
    pub const UNKNOWN: H264Profile = H264Profile(0);
    pub const BASE: H264Profile = H264Profile(1 << 0);
    pub const HIGH: H264Profile = H264Profile(1 << 1);
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct H264Level(pub u8);

impl H264Level {
    pub const UNKNOWN: H264Level = H264Level(0);
    pub const L3_1: H264Level = H264Level(1 << 0);
    pub const L3_2: H264Level = H264Level(1 << 1);
    pub const L4: H264Level = H264Level(1 << 2);
    pub const L4_1: H264Level = H264Level(1 << 3);
    pub const L4_2: H264Level = H264Level(1 << 4);
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RtspTransport {
    Rtp,
    Rdt,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RtspProfile {
    Avp,
    Savp,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RtspLowerTransport {
    UdpUnicast,
    UdpMulticast,
    TcpUnicast,
    Http,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum HdcpVersion {
    None,
    V2_0,
    V2_1,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TriggerMethod {
    Setup,
    Pause,
    Teardown,
    Play,
}

impl TriggerMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            TriggerMethod::Setup => "SETUP",
            TriggerMethod::Pause => "PAUSE",
            TriggerMethod::Teardown => "TEARDOWN",
            TriggerMethod::Play => "PLAY",
        }
    }

    pub fn from_str(s: &str) -> Option<TriggerMethod> {
        match s {
            "SETUP" => Some(TriggerMethod::Setup),
            "PAUSE" => Some(TriggerMethod::Pause),
            "TEARDOWN" => Some(TriggerMethod::Teardown),
            "PLAY" => Some(TriggerMethod::Play),
            _ => None,
        }
    }
}

/// One element of `wfd_audio_codecs`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AudioCodec {
    pub format: AudioFormat,
    pub modes: u8,
    pub latency: u32,
}

/// The H.264-specific sub-record of a [`VideoFormat`].
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct H264Codec {
    pub profile: H264Profile,
    pub level: H264Level,
    pub cea_support: u32,
    pub vesa_support: u32,
    pub hh_support: u32,
    pub latency: u32,
    pub min_slice_size: u32,
    pub slice_enc_params: u32,
    pub frame_rate_control: u32,
}

/// The single element of `wfd_video_formats`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct VideoFormat {
    pub native: VideoNativeResolutionFamily,
    pub preferred_mode_supported: bool,
    pub h264: H264Codec,
    pub max_hres: u32,
    pub max_vres: u32,
}

/// `wfd_3d_video_formats`: same shape as [`VideoFormat`] but with a single
/// 64-bit capability mask instead of per-family masks.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Video3dFormat {
    pub native: VideoNativeResolutionFamily,
    pub preferred_mode_supported: bool,
    pub profile: H264Profile,
    pub level: H264Level,
    pub video_3d_capability: u64,
    pub latency: u32,
    pub max_hres: u32,
    pub max_vres: u32,
    pub min_slice_size: u32,
    pub slice_enc_params: u32,
    pub frame_rate_control: u32,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ContentProtection {
    pub version: HdcpVersion,
    pub port: u16,
}

/// `wfd_display_edid`. `present` distinguishes a real EDID block from the
/// literal `none` value (the attribute itself is still emitted either way;
/// see [`I2c`] for the same two-state shape). `payload` is exactly
/// `128 * block_count` bytes when `present`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DisplayEdid {
    pub present: bool,
    pub block_count: u32,
    pub payload: Bytes,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CoupledSink {
    pub status: u8,
    pub sink_address: String,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ClientRtpPorts {
    pub transport: RtspTransport,
    pub profile: RtspProfile,
    pub lower_transport: RtspLowerTransport,
    pub port0: u16,
    pub port1: u16,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Route {
    pub destination: String,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct I2c {
    pub present: bool,
    pub port: u32,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct AvFormatChangeTiming {
    pub pts: u64,
    pub dts: u64,
}

/// `wfd_preferred_display_mode`. `present` distinguishes a real mode from
/// the literal `none` value, the same two-state shape as [`I2c`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct PreferredDisplayMode {
    pub present: bool,
    pub clock: u32,
    pub timing: u32,
}

/// `wfd_connector_type`. `present` distinguishes a real connector code from
/// the literal `none` value, the same two-state shape as [`I2c`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ConnectorType {
    pub present: bool,
    pub value: u32,
}

/// A WFD parameter message: a sparse set of optionally-present attributes.
///
/// Every field is `Option` (or, for `wfd_audio_codecs`, an empty `SmallVec`
/// standing in for "absent"). Presence equals emission on serialization —
/// see the module docs.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct WfdMessage {
    pub audio_codecs: Option<SmallVec<[AudioCodec; 3]>>,
    pub video_formats: Option<VideoFormat>,
    pub video_3d_formats: Option<Video3dFormat>,
    pub content_protection: Option<ContentProtection>,
    pub display_edid: Option<DisplayEdid>,
    pub coupled_sink: Option<CoupledSink>,
    pub trigger_method: Option<TriggerMethod>,
    pub presentation_url: Option<(String, Option<String>)>,
    pub client_rtp_ports: Option<ClientRtpPorts>,
    pub route: Option<Route>,
    pub i2c: Option<I2c>,
    pub av_format_change_timing: Option<AvFormatChangeTiming>,
    pub preferred_display_mode: Option<PreferredDisplayMode>,
    pub standby_resume_capability: Option<bool>,
    pub standby: bool,
    pub connector_type: Option<ConnectorType>,
    pub idr_request: bool,
}

impl WfdMessage {
    pub fn new() -> WfdMessage {
        WfdMessage::default()
    }

    /// Returns the set of attribute names present on this message, in the
    /// fixed wire order used by both serializer flavors.
    pub(crate) fn present_attrs(&self) -> SmallVec<[&'static str; 16]> {
        let mut v = SmallVec::new();
        if self.audio_codecs.is_some() {
            v.push("wfd_audio_codecs");
        }
        if self.video_formats.is_some() {
            v.push("wfd_video_formats");
        }
        if self.video_3d_formats.is_some() {
            v.push("wfd_3d_video_formats");
        }
        if self.content_protection.is_some() {
            v.push("wfd_content_protection");
        }
        if self.display_edid.is_some() {
            v.push("wfd_display_edid");
        }
        if self.coupled_sink.is_some() {
            v.push("wfd_coupled_sink");
        }
        if self.trigger_method.is_some() {
            v.push("wfd_trigger_method");
        }
        if self.presentation_url.is_some() {
            v.push("wfd_presentation_URL");
        }
        if self.client_rtp_ports.is_some() {
            v.push("wfd_client_rtp_ports");
        }
        if self.route.is_some() {
            v.push("wfd_route");
        }
        if self.i2c.is_some() {
            v.push("wfd_I2C");
        }
        if self.av_format_change_timing.is_some() {
            v.push("wfd_av_format_change_timing");
        }
        if self.preferred_display_mode.is_some() {
            v.push("wfd_preferred_display_mode");
        }
        if self.standby_resume_capability.is_some() {
            v.push("wfd_standby_resume_capability");
        }
        if self.standby {
            v.push("wfd_standby");
        }
        if self.connector_type.is_some() {
            v.push("wfd_connector_type");
        }
        if self.idr_request {
            v.push("wfd_idr_request");
        }
        v
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn audio_format_bit_ops() {
        let both = AudioFormat::LPCM | AudioFormat::AAC;
        assert!(both.contains(AudioFormat::LPCM));
        assert!(both.contains(AudioFormat::AAC));
        assert!(!both.contains(AudioFormat::AC3));
        assert_eq!((both & AudioFormat::AAC).name(), Some("AAC"));
    }

    #[test]
    fn trigger_method_round_trips_through_str() {
        for t in [
            TriggerMethod::Setup,
            TriggerMethod::Pause,
            TriggerMethod::Teardown,
            TriggerMethod::Play,
        ] {
            assert_eq!(TriggerMethod::from_str(t.as_str()), Some(t));
        }
        assert_eq!(TriggerMethod::from_str("bogus"), None);
    }

    #[test]
    fn empty_message_has_no_present_attrs() {
        assert!(WfdMessage::new().present_attrs().is_empty());
    }
}
