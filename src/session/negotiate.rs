// Copyright the wfd-source authors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Audio/video capability intersection and EDID resolution extraction.
//!
//! `wfd_audio_codecs`' per-entry `modes` byte packs sample frequency and
//! channel count into one field: bits 0–1 are the frequency mask
//! (bit0=44100Hz, bit1=48000Hz) and bits 2–5 are the channel mask shifted up
//! two places from [`AudioChannels`]'s own bit assignment (bit2=2ch,
//! bit3=4ch, bit4=6ch, bit5=8ch). This mirrors how other WFD attributes pack
//! several small fields into one byte; it is not dictated by any external
//! wire capture, only by internal consistency between parse, serialize, and
//! negotiation.

use crate::error::{bail, wrap, ErrorInt, Result};
use crate::message::{
    AudioChannels, AudioCodec, AudioFormat, AudioFreq, H264Level, H264Profile,
    VideoNativeResolutionFamily,
};
use crate::message::resolution::{mode_for, ResolutionMode};

const AUDIO_PRIORITY: [AudioFormat; 3] = [AudioFormat::LPCM, AudioFormat::AAC, AudioFormat::AC3];

fn modes_freq(modes: u8) -> AudioFreq {
    AudioFreq(modes & 0b0000_0011)
}

/// Packs a frequency and channel mask back into one `modes` byte, the
/// inverse of [`modes_freq`].
pub fn pack_modes(freq: AudioFreq, channels: AudioChannels) -> u8 {
    (freq.0 & 0b0000_0011) | ((channels.0 & 0b0000_1111) << 2)
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct NegotiatedAudio {
    pub format: AudioFormat,
    pub freq: AudioFreq,
    pub channels: AudioChannels,
    pub latency: u32,
    pub bit_width: u8,
}

/// Picks the highest-priority codec (LPCM > AAC > AC3) present in both
/// `source` and `sink`'s entries, then negotiates frequency (prefer 48000,
/// else 44100) and clamps channels to 2 regardless of what the sink
/// advertises.
pub fn negotiate_audio(source: &[AudioCodec], sink: &[AudioCodec]) -> Result<NegotiatedAudio> {
    let source_mask = source.iter().fold(AudioFormat::UNKNOWN, |m, c| m | c.format);
    let sink_mask = sink.iter().fold(AudioFormat::UNKNOWN, |m, c| m | c.format);

    let chosen = AUDIO_PRIORITY
        .iter()
        .copied()
        .find(|&f| source_mask.contains(f) && sink_mask.contains(f));
    let chosen = match chosen {
        Some(f) => f,
        None => bail!(ErrorInt::NoCommonAudioCodec {
            source_mask: source_mask.0,
            sink_mask: sink_mask.0,
        }),
    };

    let sink_entry = sink
        .iter()
        .find(|c| c.format == chosen)
        .expect("chosen format came from sink_mask");
    let source_entry = source.iter().find(|c| c.format == chosen);

    let sink_freq = modes_freq(sink_entry.modes);
    let source_freq = source_entry.map(|c| modes_freq(c.modes)).unwrap_or(sink_freq);
    let common_freq = AudioFreq(source_freq.0 & sink_freq.0);
    let freq = if common_freq.0 & AudioFreq::HZ_48000.0 != 0 {
        AudioFreq::HZ_48000
    } else if common_freq.0 & AudioFreq::HZ_44100.0 != 0 {
        AudioFreq::HZ_44100
    } else {
        common_freq
    };

    Ok(NegotiatedAudio {
        format: chosen,
        freq,
        channels: AudioChannels::CH_2,
        latency: sink_entry.latency,
        bit_width: 16,
    })
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct NegotiatedVideo {
    pub mode: ResolutionMode,
    pub bit: u32,
    pub profile: H264Profile,
    pub level: H264Level,
}

/// Scans `source_mask & sink_mask` MSB-first within `family` and returns the
/// first bit both sides support, mapped to a concrete mode. Profile and
/// level are always Baseline/3.1, per the control plane's fixed encoding
/// choice.
pub fn negotiate_video(
    source_mask: u32,
    sink_mask: u32,
    family: VideoNativeResolutionFamily,
) -> Result<NegotiatedVideo> {
    let common = source_mask & sink_mask;
    for bit_index in (0..32).rev() {
        let bit = 1u32 << bit_index;
        if common & bit == 0 {
            continue;
        }
        if let Some(mode) = mode_for(family, bit) {
            return Ok(NegotiatedVideo {
                mode,
                bit,
                profile: H264Profile::BASE,
                level: H264Level::L3_1,
            });
        }
    }
    Err(wrap!(ErrorInt::NoCommonVideoResolution { family }))
}

/// EDID horizontal/vertical resolution, extracted from a detailed-timing
/// descriptor. `None` if the payload is too short or the extracted
/// dimensions fall outside the supported [640,1920]x[480,1080] range.
pub fn extract_edid_resolution(payload: &[u8]) -> Option<(u16, u16)> {
    if payload.len() < 62 {
        return None;
    }
    let hres = ((payload[58] as u16 & 0xf0) << 4) | payload[56] as u16;
    let vres = ((payload[61] as u16 & 0xf0) << 4) | payload[59] as u16;
    if (640..=1920).contains(&hres) && (480..=1080).contains(&vres) {
        Some((hres, vres))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codec(format: AudioFormat, freq: AudioFreq, channels: AudioChannels, latency: u32) -> AudioCodec {
        AudioCodec {
            format,
            modes: pack_modes(freq, channels),
            latency,
        }
    }

    #[test]
    fn audio_prefers_lpcm_over_aac_and_ac3() {
        let source = vec![
            codec(AudioFormat::LPCM, AudioFreq::HZ_48000, AudioChannels::CH_2, 0),
            codec(AudioFormat::AAC, AudioFreq::HZ_48000, AudioChannels::CH_2, 0),
        ];
        let sink = source.clone();
        let n = negotiate_audio(&source, &sink).unwrap();
        assert_eq!(n.format, AudioFormat::LPCM);
    }

    #[test]
    fn audio_negotiation_scenario_one_picks_sole_common_codec() {
        // Source offers only AAC; sink supports LPCM and AAC at 48000/2ch.
        let source = vec![codec(AudioFormat::AAC, AudioFreq::HZ_48000, AudioChannels::CH_2, 0)];
        let sink = vec![
            codec(AudioFormat::LPCM, AudioFreq::HZ_48000, AudioChannels::CH_2, 0),
            codec(AudioFormat::AAC, AudioFreq::HZ_48000, AudioChannels::CH_2, 0),
        ];
        let n = negotiate_audio(&source, &sink).unwrap();
        assert_eq!(n.format, AudioFormat::AAC);
        assert_eq!(n.freq, AudioFreq::HZ_48000);
        assert_eq!(n.channels, AudioChannels::CH_2);
        assert_eq!(n.latency, 0);
        assert_eq!(n.bit_width, 16);
    }

    #[test]
    fn audio_clamps_channels_to_two_even_if_sink_offers_more() {
        let source = vec![codec(AudioFormat::LPCM, AudioFreq::HZ_44100, AudioChannels::CH_8, 0)];
        let sink = vec![codec(AudioFormat::LPCM, AudioFreq::HZ_44100, AudioChannels::CH_8, 5)];
        let n = negotiate_audio(&source, &sink).unwrap();
        assert_eq!(n.channels, AudioChannels::CH_2);
    }

    #[test]
    fn audio_negotiation_fails_with_no_common_codec() {
        let source = vec![codec(AudioFormat::AC3, AudioFreq::HZ_48000, AudioChannels::CH_2, 0)];
        let sink = vec![codec(AudioFormat::LPCM, AudioFreq::HZ_48000, AudioChannels::CH_2, 0)];
        let err = negotiate_audio(&source, &sink).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::NegotiationFailure);
    }

    #[test]
    fn video_negotiation_picks_msb_first_common_bit() {
        use crate::message::resolution::CeaResolution;
        let source = CeaResolution::Cea640x480P60.bit() | CeaResolution::Cea1280x720P30.bit();
        let sink = CeaResolution::Cea1920x1080P60.bit() | CeaResolution::Cea1280x720P30.bit();
        let n = negotiate_video(source, sink, VideoNativeResolutionFamily::Cea).unwrap();
        assert_eq!(n.bit, CeaResolution::Cea1280x720P30.bit());
        assert_eq!((n.mode.width, n.mode.height, n.mode.framerate), (1280, 720, 30));
        assert_eq!(n.profile, H264Profile::BASE);
        assert_eq!(n.level, H264Level::L3_1);
    }

    #[test]
    fn video_negotiation_fails_without_intersection() {
        use crate::message::resolution::CeaResolution;
        let source = CeaResolution::Cea640x480P60.bit();
        let sink = CeaResolution::Cea1920x1080P60.bit();
        let err = negotiate_video(source, sink, VideoNativeResolutionFamily::Cea).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::NegotiationFailure);
    }

    #[test]
    fn edid_extracts_1920x1080() {
        let mut payload = vec![0u8; 128];
        // Detailed timing descriptor at bytes 54..=61 (0-indexed within the
        // 128-byte block), encoding 1920x1080 per the standard layout.
        payload[56] = 0x80; // Hres low byte -> 0x780 = 1920
        payload[58] = 0x70; // Hres high nibble in bits 7:4
        payload[59] = 0x38; // Vres low byte -> 0x438 = 1080
        payload[61] = 0x40; // Vres high nibble in bits 7:4
        let (hres, vres) = extract_edid_resolution(&payload).unwrap();
        assert_eq!((hres, vres), (1920, 1080));
    }

    #[test]
    fn edid_out_of_range_resolution_is_rejected() {
        let mut payload = vec![0u8; 128];
        payload[56] = 0xff;
        payload[58] = 0xf0; // Hres = 0xfff = 4095, out of range
        assert_eq!(extract_edid_resolution(&payload), None);
    }

    #[test]
    fn edid_too_short_payload_is_rejected() {
        assert_eq!(extract_edid_resolution(&[0u8; 10]), None);
    }
}
