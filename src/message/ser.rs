// Copyright the wfd-source authors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The WFD parameter message serializer.
//!
//! Two flavors are provided: [`WfdMessage::to_full_text`] emits every
//! present attribute's name and values, and [`WfdMessage::to_names_only`]
//! emits just the names (used by M3's `GET_PARAMETER` query). Field widths
//! on write follow §4.1 of the system spec: 2 hex digits for small codes, 4
//! for 16-bit masks, 8 for 32-bit masks, 10 for 40-bit PTS/DTS, 16 for the
//! 3D capability mask.

use std::fmt::Write as _;

use super::{HdcpVersion, RtspLowerTransport, RtspProfile, RtspTransport, WfdMessage};

impl WfdMessage {
    /// Full serialization: `name: value1 value2 ...\r\n` per present
    /// attribute, in the fixed wire order.
    pub fn to_full_text(&self) -> String {
        let mut out = String::new();
        for attr in self.present_attrs() {
            write_attr_line(&mut out, self, attr, true);
        }
        out
    }

    /// Names-only serialization: `name\r\n` per present attribute, no
    /// values. Used to build M3's `GET_PARAMETER` query body.
    pub fn to_names_only(&self) -> String {
        let mut out = String::new();
        for attr in self.present_attrs() {
            write_attr_line(&mut out, self, attr, false);
        }
        out
    }
}

fn write_attr_line(out: &mut String, msg: &WfdMessage, attr: &str, with_values: bool) {
    out.push_str(attr);
    if !with_values {
        out.push_str("\r\n");
        return;
    }
    out.push(':');
    match attr {
        "wfd_audio_codecs" => {
            out.push(' ');
            let codecs = msg.audio_codecs.as_ref().unwrap();
            let parts: Vec<String> = codecs
                .iter()
                .map(|c| {
                    format!(
                        "{} {:08x} {:02x}",
                        c.format.name().unwrap_or("none"),
                        c.modes,
                        c.latency
                    )
                })
                .collect();
            out.push_str(&parts.join(", "));
        }
        "wfd_video_formats" => {
            let v = msg.video_formats.as_ref().unwrap();
            let native = v.native as u32;
            let _ = write!(
                out,
                " {:02x} {:02x} {:02x} {:02x} {:08x} {:08x} {:08x} {:08x} {:08x} {:08x} {:02x} {:04x} {:02x}",
                native,
                v.preferred_mode_supported as u32,
                v.h264.profile.0,
                v.h264.level.0,
                v.h264.cea_support,
                v.h264.vesa_support,
                v.h264.hh_support,
                v.h264.latency,
                v.max_hres,
                v.max_vres,
                v.h264.min_slice_size,
                v.h264.slice_enc_params,
                v.h264.frame_rate_control,
            );
        }
        "wfd_3d_video_formats" => {
            let v = msg.video_3d_formats.as_ref().unwrap();
            let native = v.native as u32;
            let _ = write!(
                out,
                " {:02x} {:02x} {:02x} {:02x} {:016x} {:08x} {:08x} {:08x} {:02x} {:04x} {:02x}",
                native,
                v.preferred_mode_supported as u32,
                v.profile.0,
                v.level.0,
                v.video_3d_capability,
                v.latency,
                v.max_hres,
                v.max_vres,
                v.min_slice_size,
                v.slice_enc_params,
                v.frame_rate_control,
            );
        }
        "wfd_content_protection" => {
            let cp = msg.content_protection.as_ref().unwrap();
            let version = match cp.version {
                HdcpVersion::None => {
                    out.push_str(" none");
                    return finish_line(out);
                }
                HdcpVersion::V2_0 => "HDCP2.0",
                HdcpVersion::V2_1 => "HDCP2.1",
            };
            let _ = write!(out, " {} port={}", version, cp.port);
        }
        "wfd_display_edid" => {
            let edid = msg.display_edid.as_ref().unwrap();
            if edid.present {
                let _ = write!(out, " {:08x} {}", edid.block_count, hex::encode(&edid.payload));
            } else {
                out.push_str(" none");
            }
        }
        "wfd_coupled_sink" => {
            let cs = msg.coupled_sink.as_ref().unwrap();
            let _ = write!(out, " {:02x} {}", cs.status, cs.sink_address);
        }
        "wfd_trigger_method" => {
            let _ = write!(out, " {}", msg.trigger_method.unwrap().as_str());
        }
        "wfd_presentation_URL" => {
            let (primary, secondary) = msg.presentation_url.as_ref().unwrap();
            let _ = write!(out, " {} {}", primary, secondary.as_deref().unwrap_or("none"));
        }
        "wfd_client_rtp_ports" => {
            let p = msg.client_rtp_ports.as_ref().unwrap();
            let transport = match p.transport {
                RtspTransport::Rtp => "RTP",
                RtspTransport::Rdt => "RDT",
            };
            let profile = match p.profile {
                RtspProfile::Avp => "AVP",
                RtspProfile::Savp => "SAVP",
            };
            let lower = match p.lower_transport {
                RtspLowerTransport::UdpUnicast => "UDP;unicast",
                RtspLowerTransport::UdpMulticast => "UDP;multicast",
                RtspLowerTransport::TcpUnicast => "TCP;unicast",
                RtspLowerTransport::Http => "HTTP;unicast",
            };
            let _ = write!(
                out,
                " {}/{}/{} {} {} mode=play",
                transport, profile, lower, p.port0, p.port1
            );
        }
        "wfd_route" => {
            let _ = write!(out, " {}", msg.route.as_ref().unwrap().destination);
        }
        "wfd_I2C" => match msg.i2c {
            Some(i2c) if i2c.present => {
                let _ = write!(out, " {:04x}", i2c.port);
            }
            _ => out.push_str(" none"),
        },
        "wfd_av_format_change_timing" => {
            let t = msg.av_format_change_timing.unwrap();
            let _ = write!(out, " {:010x} {:010x}", t.pts, t.dts);
        }
        "wfd_preferred_display_mode" => {
            let m = msg.preferred_display_mode.unwrap();
            if m.present {
                let _ = write!(out, " {:08x} {:08x}", m.clock, m.timing);
            } else {
                out.push_str(" none");
            }
        }
        "wfd_standby_resume_capability" => {
            out.push_str(if msg.standby_resume_capability.unwrap() {
                " supported"
            } else {
                " none"
            });
        }
        "wfd_connector_type" => {
            let c = msg.connector_type.unwrap();
            if c.present {
                let _ = write!(out, " {:02x}", c.value);
            } else {
                out.push_str(" none");
            }
        }
        "wfd_standby" | "wfd_idr_request" => {}
        other => unreachable!("present_attrs() produced unknown attribute {:?}", other),
    }
    finish_line(out);
}

fn finish_line(out: &mut String) {
    out.push_str("\r\n");
}
