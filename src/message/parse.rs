// Copyright the wfd-source authors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The WFD parameter message parser.
//!
//! Input is a buffer of zero or more CRLF-terminated `attribute: value`
//! lines (see the ABNF sketch in the system spec). Per the parser failure
//! policy, a malformed line never aborts the rest of the parse: unknown
//! attributes are ignored, and an attribute that parses partially keeps the
//! fields it could extract, defaulting missing numeric fields to zero.

use bytes::Bytes;
use log::warn;
use smallvec::SmallVec;

use super::{
    AudioCodec, AudioFormat, AvFormatChangeTiming, ClientRtpPorts, ConnectorType, ContentProtection,
    CoupledSink, DisplayEdid, H264Codec, H264Level, H264Profile, HdcpVersion, I2c,
    PreferredDisplayMode, Route, RtspLowerTransport, RtspProfile, RtspTransport, TriggerMethod,
    VideoFormat, VideoNativeResolutionFamily, WfdMessage,
};

impl WfdMessage {
    /// Parses a WFD parameter body. Never fails outright: malformed or
    /// unrecognized lines are skipped (and logged at `warn!`), matching the
    /// forward-compatible parser contract.
    pub fn parse(buf: &[u8]) -> WfdMessage {
        let text = String::from_utf8_lossy(buf);
        let mut msg = WfdMessage::new();
        for line in text.split("\r\n") {
            let line = line.trim_end_matches('\n');
            if line.is_empty() {
                continue;
            }
            let (attr, value) = match line.split_once(':') {
                Some((a, v)) => (a.trim(), v.trim_start()),
                None => {
                    warn!("wfd: skipping line with no ':': {:?}", line);
                    continue;
                }
            };
            if let Err(description) = apply_attr(&mut msg, attr, value) {
                warn!("wfd: skipping malformed attribute {:?}: {}", attr, description);
            }
        }
        msg
    }
}

fn fields(value: &str) -> Vec<&str> {
    value.split_whitespace().collect()
}

fn hex_u32(s: &str) -> u32 {
    u32::from_str_radix(s, 16).unwrap_or(0)
}

fn hex_u64(s: &str) -> u64 {
    u64::from_str_radix(s, 16).unwrap_or(0)
}

fn apply_attr(msg: &mut WfdMessage, attr: &str, value: &str) -> Result<(), String> {
    match attr {
        "wfd_audio_codecs" => {
            if value.trim().is_empty() || value.trim() == "none" {
                msg.audio_codecs = Some(SmallVec::new());
                return Ok(());
            }
            let mut out = SmallVec::new();
            for item in value.split(',') {
                let f = fields(item);
                if f.is_empty() {
                    continue;
                }
                let format = AudioFormat::from_name(f[0]);
                let modes = f.get(1).map(|s| hex_u32(s) as u8).unwrap_or(0);
                let latency = f.get(2).map(|s| hex_u32(s)).unwrap_or(0);
                out.push(AudioCodec { format, modes, latency });
            }
            msg.audio_codecs = Some(out);
            Ok(())
        }
        "wfd_video_formats" => {
            msg.video_formats = Some(parse_video_formats(value)?);
            Ok(())
        }
        "wfd_3d_video_formats" => {
            msg.video_3d_formats = Some(parse_video_3d_formats(value)?);
            Ok(())
        }
        "wfd_content_protection" => {
            if value.trim() == "none" {
                msg.content_protection = None;
                return Ok(());
            }
            let f = fields(value);
            let version = match f.first().copied() {
                Some("HDCP2.0") => HdcpVersion::V2_0,
                Some("HDCP2.1") => HdcpVersion::V2_1,
                _ => HdcpVersion::None,
            };
            let port = f
                .get(1)
                .and_then(|s| s.strip_prefix("port="))
                .and_then(|s| s.parse::<u16>().ok())
                .unwrap_or(0);
            msg.content_protection = Some(ContentProtection { version, port });
            Ok(())
        }
        "wfd_display_edid" => {
            if value.trim() == "none" {
                msg.display_edid = Some(DisplayEdid {
                    present: false,
                    block_count: 0,
                    payload: Bytes::new(),
                });
                return Ok(());
            }
            let f = fields(value);
            let block_count = f.first().map(|s| hex_u32(s)).unwrap_or(0);
            if block_count > 256 {
                return Err(format!("edid block count {} exceeds 256", block_count));
            }
            let payload = f
                .get(1)
                .map(|hexstr| Bytes::from(hex::decode(hexstr).unwrap_or_default()))
                .unwrap_or_default();
            msg.display_edid = Some(DisplayEdid {
                present: true,
                block_count,
                payload,
            });
            Ok(())
        }
        "wfd_coupled_sink" => {
            let f = fields(value);
            let status = f.first().map(|s| hex_u32(s) as u8).unwrap_or(0);
            let sink_address = f.get(1).map(|s| s.to_string()).unwrap_or_default();
            msg.coupled_sink = Some(CoupledSink { status, sink_address });
            Ok(())
        }
        "wfd_trigger_method" => {
            msg.trigger_method = TriggerMethod::from_str(value.trim());
            Ok(())
        }
        "wfd_presentation_URL" => {
            let f = fields(value);
            let primary = f.first().copied().unwrap_or("none").to_string();
            let secondary = f.get(1).and_then(|s| {
                if *s == "none" {
                    None
                } else {
                    Some(s.to_string())
                }
            });
            msg.presentation_url = Some((primary, secondary));
            Ok(())
        }
        "wfd_client_rtp_ports" => {
            let f = fields(value);
            let profile_str = f.first().copied().unwrap_or("");
            let (transport, profile, lower_transport) = parse_rtp_profile_str(profile_str);
            let port0 = f.get(1).and_then(|s| s.parse::<u16>().ok()).unwrap_or(0);
            let port1 = f.get(2).and_then(|s| s.parse::<u16>().ok()).unwrap_or(0);
            msg.client_rtp_ports = Some(ClientRtpPorts {
                transport,
                profile,
                lower_transport,
                port0,
                port1,
            });
            Ok(())
        }
        "wfd_route" => {
            msg.route = Some(Route {
                destination: value.trim().to_string(),
            });
            Ok(())
        }
        "wfd_I2C" => {
            if value.trim() == "none" {
                msg.i2c = Some(I2c { present: false, port: 0 });
                return Ok(());
            }
            let port = hex_u32(value.trim());
            msg.i2c = Some(I2c { present: true, port });
            Ok(())
        }
        "wfd_av_format_change_timing" => {
            let f = fields(value);
            let pts = f.first().map(|s| hex_u64(s)).unwrap_or(0);
            let dts = f.get(1).map(|s| hex_u64(s)).unwrap_or(0);
            msg.av_format_change_timing = Some(AvFormatChangeTiming { pts, dts });
            Ok(())
        }
        "wfd_preferred_display_mode" => {
            if value.trim() == "none" {
                msg.preferred_display_mode = Some(PreferredDisplayMode {
                    present: false,
                    clock: 0,
                    timing: 0,
                });
                return Ok(());
            }
            let f = fields(value);
            let clock = f.first().map(|s| hex_u32(s)).unwrap_or(0);
            let timing = f.get(1).map(|s| hex_u32(s)).unwrap_or(0);
            msg.preferred_display_mode = Some(PreferredDisplayMode {
                present: true,
                clock,
                timing,
            });
            Ok(())
        }
        "wfd_standby_resume_capability" => {
            msg.standby_resume_capability = Some(value.trim() == "supported");
            Ok(())
        }
        "wfd_standby" => {
            msg.standby = true;
            Ok(())
        }
        "wfd_connector_type" => {
            msg.connector_type = if value.trim() == "none" {
                Some(ConnectorType { present: false, value: 0 })
            } else {
                Some(ConnectorType {
                    present: true,
                    value: hex_u32(value.trim()),
                })
            };
            Ok(())
        }
        "wfd_idr_request" => {
            msg.idr_request = true;
            Ok(())
        }
        _ => {
            // Unknown attribute: forward-compatible, silently ignored.
            Ok(())
        }
    }
}

fn parse_rtp_profile_str(s: &str) -> (RtspTransport, RtspProfile, RtspLowerTransport) {
    let transport = if s.contains("RDT") {
        RtspTransport::Rdt
    } else {
        RtspTransport::Rtp
    };
    let profile = if s.contains("SAVP") {
        RtspProfile::Savp
    } else {
        RtspProfile::Avp
    };
    let lower_transport = if s.contains("HTTP") {
        RtspLowerTransport::Http
    } else if s.contains("unicast") && s.contains("TCP") {
        RtspLowerTransport::TcpUnicast
    } else if s.contains("multicast") {
        RtspLowerTransport::UdpMulticast
    } else {
        RtspLowerTransport::UdpUnicast
    };
    (transport, profile, lower_transport)
}

fn parse_video_formats(value: &str) -> Result<VideoFormat, String> {
    let f = fields(value);
    if f.len() < 4 {
        return Err("wfd_video_formats needs at least 4 fields".into());
    }
    let native_raw = hex_u32(f[0]);
    let native = match native_raw & 0x7 {
        0 => VideoNativeResolutionFamily::Cea,
        1 => VideoNativeResolutionFamily::Vesa,
        2 => VideoNativeResolutionFamily::Hh,
        other => return Err(format!("unknown native resolution family {}", other)),
    };
    let preferred_mode_supported = f[1].trim() != "00";
    let profile = H264Profile(f.get(2).map(|s| hex_u32(s) as u8).unwrap_or(0));
    let level = H264Level(f.get(3).map(|s| hex_u32(s) as u8).unwrap_or(0));
    let cea_support = f.get(4).map(|s| hex_u32(s)).unwrap_or(0);
    let vesa_support = f.get(5).map(|s| hex_u32(s)).unwrap_or(0);
    let hh_support = f.get(6).map(|s| hex_u32(s)).unwrap_or(0);
    let latency = f.get(7).map(|s| hex_u32(s)).unwrap_or(0);
    let max_hres = f.get(8).map(|s| hex_u32(s)).unwrap_or(0);
    let max_vres = f.get(9).map(|s| hex_u32(s)).unwrap_or(0);
    let min_slice_size = f.get(10).map(|s| hex_u32(s)).unwrap_or(0);
    let slice_enc_params = f.get(11).map(|s| hex_u32(s)).unwrap_or(0);
    let frame_rate_control = f.get(12).map(|s| hex_u32(s)).unwrap_or(0);
    Ok(VideoFormat {
        native,
        preferred_mode_supported,
        h264: H264Codec {
            profile,
            level,
            cea_support,
            vesa_support,
            hh_support,
            latency,
            min_slice_size,
            slice_enc_params,
            frame_rate_control,
        },
        max_hres,
        max_vres,
    })
}

fn parse_video_3d_formats(value: &str) -> Result<super::Video3dFormat, String> {
    let f = fields(value);
    if f.len() < 4 {
        return Err("wfd_3d_video_formats needs at least 4 fields".into());
    }
    let native_raw = hex_u32(f[0]);
    let native = match native_raw & 0x7 {
        0 => VideoNativeResolutionFamily::Cea,
        1 => VideoNativeResolutionFamily::Vesa,
        2 => VideoNativeResolutionFamily::Hh,
        other => return Err(format!("unknown native resolution family {}", other)),
    };
    let preferred_mode_supported = f[1].trim() != "00";
    let profile = H264Profile(f.get(2).map(|s| hex_u32(s) as u8).unwrap_or(0));
    let level = H264Level(f.get(3).map(|s| hex_u32(s) as u8).unwrap_or(0));
    let video_3d_capability = f.get(4).map(|s| hex_u64(s)).unwrap_or(0);
    let latency = f.get(5).map(|s| hex_u32(s)).unwrap_or(0);
    let max_hres = f.get(6).map(|s| hex_u32(s)).unwrap_or(0);
    let max_vres = f.get(7).map(|s| hex_u32(s)).unwrap_or(0);
    let min_slice_size = f.get(8).map(|s| hex_u32(s)).unwrap_or(0);
    let slice_enc_params = f.get(9).map(|s| hex_u32(s)).unwrap_or(0);
    let frame_rate_control = f.get(10).map(|s| hex_u32(s)).unwrap_or(0);
    Ok(super::Video3dFormat {
        native,
        preferred_mode_supported,
        profile,
        level,
        video_3d_capability,
        latency,
        max_hres,
        max_vres,
        min_slice_size,
        slice_enc_params,
        frame_rate_control,
    })
}
