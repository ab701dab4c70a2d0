// Copyright the wfd-source authors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The per-sink WFD handshake driver: sequences M1…M5 and M16, negotiates
//! capabilities, and hands the result to a [`MediaFactory`].

pub mod negotiate;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use rtsp_types::Method;
use smallvec::smallvec;

use crate::config::SessionConfig;
use crate::error::{bail, wrap, Error, ErrorInt, Result};
use crate::event::{ClosedReason, EventSender, WfdEvent};
use crate::factory::{MediaFactory, MediaHandle};
use crate::message::{
    AudioCodec, ClientRtpPorts, ContentProtection, DisplayEdid, H264Codec, HdcpVersion,
    RtspLowerTransport, RtspProfile, RtspTransport, TriggerMethod, VideoFormat,
    VideoNativeResolutionFamily, WfdMessage,
};
use crate::pool::{AddressFlags, AddressHandle, Pool};
use crate::stats::{spawn_exporter, ReceiverReport, Stats};
use crate::transport::{normalize_path, Dispatcher, Request, Response, M2_PUBLIC_METHODS};
use negotiate::{extract_edid_resolution, negotiate_audio, negotiate_video, pack_modes, NegotiatedAudio, NegotiatedVideo};

/// Handshake state; see the control plane's state diagram (INIT through
/// CLOSED).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum State {
    Init,
    M1Sent,
    M2Wait,
    M2Done,
    M3Sent,
    M3Done,
    M4Sent,
    M4Done,
    SetupWait,
    Streaming,
    Closed,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct EdidSummary {
    pub supported: bool,
    pub hres: u16,
    pub vres: u16,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct HdcpSummary {
    pub enabled: bool,
    pub version: Option<HdcpVersionKind>,
    pub port: u16,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum HdcpVersionKind {
    V2_0,
    V2_1,
}

/// The keep-alive outstanding flag, under its own lock per the concurrency
/// model: both the response handler and a timer task touch it.
#[derive(Default)]
struct KeepAlive {
    outstanding: Mutex<bool>,
}

impl KeepAlive {
    fn mark_sent(&self) {
        *self.outstanding.lock().unwrap() = true;
    }

    /// Clears the flag, returning whether one was actually outstanding.
    fn mark_responded(&self) -> bool {
        let mut g = self.outstanding.lock().unwrap();
        std::mem::replace(&mut *g, false)
    }

    fn is_outstanding(&self) -> bool {
        *self.outstanding.lock().unwrap()
    }
}

/// Per-connection WFD handshake driver. Created once a sink's TCP connection
/// is accepted; mutated only by the dispatcher handling that connection.
pub struct Session<F: MediaFactory> {
    state: State,
    config: SessionConfig,
    pool: Option<Arc<Pool>>,
    address_handle: Option<AddressHandle>,
    events: EventSender,
    factory: F,
    media_handle: Option<F::Handle>,
    keep_alive: Arc<KeepAlive>,
    stats: Arc<Stats>,
    stats_exporter: Option<tokio::task::JoinHandle<()>>,
    sink_host: String,

    m1_done: bool,
    m3_done: bool,
    m4_done: bool,

    negotiated_audio: Option<NegotiatedAudio>,
    negotiated_video: Option<NegotiatedVideo>,
    edid: EdidSummary,
    hdcp: HdcpSummary,
    rtp_port0: u16,
    rtp_port1: u16,

    av_format_change_timing: Option<crate::message::AvFormatChangeTiming>,
    preferred_display_mode: Option<crate::message::PreferredDisplayMode>,
}

impl<F: MediaFactory> Session<F> {
    pub fn new(config: SessionConfig, events: EventSender, factory: F, sink_host: String) -> Session<F> {
        Session {
            state: State::Init,
            config,
            pool: None,
            address_handle: None,
            events,
            factory,
            media_handle: None,
            keep_alive: Arc::new(KeepAlive::default()),
            stats: Arc::new(Stats::new()),
            stats_exporter: None,
            sink_host,
            m1_done: false,
            m3_done: false,
            m4_done: false,
            negotiated_audio: None,
            negotiated_video: None,
            edid: EdidSummary::default(),
            hdcp: HdcpSummary::default(),
            rtp_port0: 0,
            rtp_port1: 0,
            av_format_change_timing: None,
            preferred_display_mode: None,
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn stats(&self) -> &Arc<Stats> {
        &self.stats
    }

    /// See §3.5: optional pass-through attributes the embedder may set
    /// before M4 is built.
    pub fn set_av_format_change_timing(&mut self, timing: crate::message::AvFormatChangeTiming) {
        self.av_format_change_timing = Some(timing);
    }

    pub fn set_preferred_display_mode(&mut self, mode: crate::message::PreferredDisplayMode) {
        self.preferred_display_mode = Some(mode);
    }

    /// Acquires the RTP/RTCP port pair this session will advertise in M4,
    /// from `pool`. The session releases it automatically on [`Session::close`].
    pub fn acquire_rtp_ports(&mut self, pool: Arc<Pool>, flags: AddressFlags) -> Result<()> {
        let handle = pool.acquire(flags, 2)?;
        self.rtp_port0 = handle.port0();
        self.rtp_port1 = handle.port0() + handle.n_ports() as u16 - 1;
        self.address_handle = Some(handle);
        self.pool = Some(pool);
        Ok(())
    }

    fn require_state(&self, expected: State) -> Result<()> {
        if self.state != expected {
            bail!(ErrorInt::ProtocolViolation {
                description: format!("expected state {:?}, got {:?}", expected, self.state),
            });
        }
        Ok(())
    }

    /// Builds M1: `OPTIONS * RTSP/1.0` with the WFD `Require` header.
    pub fn build_m1(&mut self) -> Result<Request> {
        self.require_state(State::Init)?;
        self.state = State::M1Sent;
        Ok(Request::new(Method::Options, "*").with_header("Require", "org.wfa.wfd1.0"))
    }

    pub fn handle_m1_response(&mut self, resp: &Response) -> Result<()> {
        self.require_state(State::M1Sent)?;
        if resp.status != 200 {
            bail!(ErrorInt::ProtocolViolation {
                description: format!("M1 failed with status {}", resp.status),
            });
        }
        self.m1_done = true;
        self.state = State::M2Wait;
        Ok(())
    }

    /// Handles the sink's M2 `OPTIONS` request, replying with the methods
    /// this source supports plus the WFD extension token.
    pub fn on_options_request(&mut self, req: &Request) -> Result<Response> {
        self.require_state(State::M2Wait)?;
        self.state = State::M2Done;
        self.events.send(WfdEvent::OptionsRequest);
        let mut resp = Response::ok().with_header("Public", M2_PUBLIC_METHODS);
        if let Some((_, ua)) = req.headers.iter().find(|(k, _)| k.eq_ignore_ascii_case("User-Agent")) {
            resp = resp.with_header("User-Agent", ua.clone());
        }
        Ok(resp)
    }

    /// Builds M3: `GET_PARAMETER` querying the sink's capabilities by name.
    /// The attribute values below are placeholders; only their presence
    /// (which names-only serialization emits) matters for this message.
    pub fn build_m3(&mut self) -> Result<Request> {
        self.require_state(State::M2Done)?;
        self.state = State::M3Sent;
        let mut query = WfdMessage::new();
        query.audio_codecs = Some(smallvec![]);
        query.video_formats = Some(VideoFormat {
            native: self.config.native_resolution_family,
            preferred_mode_supported: false,
            h264: H264Codec::default(),
            max_hres: 0,
            max_vres: 0,
        });
        query.content_protection = Some(ContentProtection {
            version: HdcpVersion::None,
            port: 0,
        });
        query.display_edid = Some(DisplayEdid {
            present: false,
            block_count: 0,
            payload: Default::default(),
        });
        query.client_rtp_ports = Some(ClientRtpPorts {
            transport: RtspTransport::Rtp,
            profile: RtspProfile::Avp,
            lower_transport: RtspLowerTransport::UdpUnicast,
            port0: 0,
            port1: 0,
        });
        if self.config.video_3d_enabled {
            query.video_3d_formats = Some(crate::message::Video3dFormat {
                native: self.config.native_resolution_family,
                preferred_mode_supported: false,
                profile: Default::default(),
                level: Default::default(),
                video_3d_capability: 0,
                latency: 0,
                max_hres: 0,
                max_vres: 0,
                min_slice_size: 0,
                slice_enc_params: 0,
                frame_rate_control: 0,
            });
        }
        Ok(Request::new(Method::GetParameter, "rtsp://localhost/wfd1.0")
            .with_body("text/parameters", query.to_names_only()))
    }

    /// Handles the sink's M3 response body: records its capabilities,
    /// negotiates audio/video, and extracts EDID resolution if present.
    pub fn handle_m3_response(&mut self, body: &[u8]) -> Result<()> {
        self.require_state(State::M3Sent)?;
        let sink = WfdMessage::parse(body);

        let source_audio = self
            .config
            .preferred_audio_formats
            .iter()
            .map(|&format| AudioCodec {
                format,
                modes: pack_modes(crate::message::AudioFreq::HZ_48000, crate::message::AudioChannels::CH_2),
                latency: 0,
            })
            .collect::<Vec<_>>();
        let sink_audio = sink.audio_codecs.clone().unwrap_or_default();
        let negotiated_audio = negotiate_audio(&source_audio, &sink_audio)?;

        let sink_video_mask = match (self.config.native_resolution_family, sink.video_formats.as_ref()) {
            (VideoNativeResolutionFamily::Cea, Some(v)) => v.h264.cea_support,
            (VideoNativeResolutionFamily::Vesa, Some(v)) => v.h264.vesa_support,
            (VideoNativeResolutionFamily::Hh, Some(v)) => v.h264.hh_support,
            (_, None) => bail!(ErrorInt::ParseError {
                description: "M3 response missing wfd_video_formats".to_string(),
            }),
        };
        let negotiated_video = negotiate_video(
            self.config.supported_resolution_mask,
            sink_video_mask,
            self.config.native_resolution_family,
        )?;

        self.edid = match sink.display_edid.as_ref() {
            Some(edid) if edid.present => match extract_edid_resolution(&edid.payload) {
                Some((hres, vres)) => EdidSummary {
                    supported: true,
                    hres,
                    vres,
                },
                None => EdidSummary::default(),
            },
            _ => EdidSummary::default(),
        };

        self.hdcp = match sink.content_protection.as_ref() {
            Some(cp) => HdcpSummary {
                enabled: true,
                version: match cp.version {
                    HdcpVersion::None => None,
                    HdcpVersion::V2_0 => Some(HdcpVersionKind::V2_0),
                    HdcpVersion::V2_1 => Some(HdcpVersionKind::V2_1),
                },
                port: cp.port,
            },
            None => HdcpSummary::default(),
        };

        self.events.send(WfdEvent::Negotiated {
            audio: negotiated_audio.format,
            width: negotiated_video.mode.width,
            height: negotiated_video.mode.height,
        });
        self.factory.set_audio_codec(negotiated_audio.format);
        self.factory
            .set_negotiated_resolution(negotiated_video.mode.width, negotiated_video.mode.height);

        self.negotiated_audio = Some(negotiated_audio);
        self.negotiated_video = Some(negotiated_video);
        self.m3_done = true;
        self.state = State::M3Done;
        Ok(())
    }

    /// Builds M4: `SET_PARAMETER` carrying the negotiated parameters.
    pub fn build_m4(&mut self) -> Result<Request> {
        self.require_state(State::M3Done)?;
        let audio = self
            .negotiated_audio
            .ok_or_else(|| wrap!(ErrorInt::ProtocolViolation {
                description: "build_m4 called before negotiation".to_string(),
            }))?;
        let video = self
            .negotiated_video
            .ok_or_else(|| wrap!(ErrorInt::ProtocolViolation {
                description: "build_m4 called before negotiation".to_string(),
            }))?;

        let mut msg = WfdMessage::new();
        msg.presentation_url = Some((
            format!("rtsp://{}/wfd1.0/streamid=0", self.sink_host),
            None,
        ));
        msg.audio_codecs = Some(smallvec![AudioCodec {
            format: audio.format,
            modes: pack_modes(audio.freq, audio.channels),
            latency: audio.latency,
        }]);

        let family = self.config.native_resolution_family;
        let mut h264 = H264Codec {
            profile: video.profile,
            level: video.level,
            ..H264Codec::default()
        };
        match family {
            VideoNativeResolutionFamily::Cea => h264.cea_support = video.bit,
            VideoNativeResolutionFamily::Vesa => h264.vesa_support = video.bit,
            VideoNativeResolutionFamily::Hh => h264.hh_support = video.bit,
        }
        msg.video_formats = Some(VideoFormat {
            native: family,
            preferred_mode_supported: true,
            h264,
            max_hres: video.mode.width,
            max_vres: video.mode.height,
        });
        msg.client_rtp_ports = Some(ClientRtpPorts {
            transport: RtspTransport::Rtp,
            profile: RtspProfile::Avp,
            lower_transport: RtspLowerTransport::UdpUnicast,
            port0: self.rtp_port0,
            port1: self.rtp_port1,
        });
        msg.av_format_change_timing = self.av_format_change_timing;
        msg.preferred_display_mode = self.preferred_display_mode;

        self.state = State::M4Sent;
        Ok(Request::new(Method::SetParameter, "rtsp://localhost/wfd1.0")
            .with_body("text/parameters", msg.to_full_text()))
    }

    pub fn handle_m4_response(&mut self, resp: &Response) -> Result<()> {
        self.require_state(State::M4Sent)?;
        if resp.status != 200 {
            bail!(ErrorInt::ProtocolViolation {
                description: format!("M4 failed with status {}", resp.status),
            });
        }
        self.m4_done = true;
        self.state = State::M4Done;
        Ok(())
    }

    /// Builds M5 (or a later reused trigger): `SET_PARAMETER` with
    /// `wfd_trigger_method`. Only `SETUP` advances the handshake state;
    /// `PAUSE`/`TEARDOWN`/`PLAY` reuse the mechanism post-session.
    pub fn build_trigger(&mut self, method: TriggerMethod) -> Result<Request> {
        if method == TriggerMethod::Setup {
            self.require_state(State::M4Done)?;
            self.state = State::SetupWait;
        }
        let mut msg = WfdMessage::new();
        msg.trigger_method = Some(method);
        Ok(Request::new(Method::SetParameter, "rtsp://localhost/wfd1.0")
            .with_body("text/parameters", msg.to_full_text()))
    }

    /// Handles the sink's `SETUP`/`PLAY` request, transitioning to
    /// STREAMING and handing the negotiated parameters off to the factory.
    pub fn on_setup_or_play(&mut self, req: &Request) -> Result<Response> {
        self.require_state(State::SetupWait)?;
        self.state = State::Streaming;
        let path = normalize_path(&req.uri);
        self.media_handle = Some(self.factory.create_media(path));

        // Only spawns when a transport is actually driving us from inside a
        // Tokio runtime; plain synchronous callers (tests, embedders that
        // poll stats themselves) get no background task.
        if tokio::runtime::Handle::try_current().is_ok() {
            let label = format!("{}{}", self.sink_host, path);
            self.stats_exporter = Some(spawn_exporter(self.stats.clone(), label));
        }

        self.events.send(WfdEvent::PlayingDone);
        Ok(Response::ok())
    }

    /// Bridges an inbound RTCP receiver report to both the per-stream
    /// [`MediaHandle`] (so the embedder's pipeline sees it) and this
    /// session's [`Stats`] (so the periodic exporter sees it).
    pub fn on_rtcp_receiver_report(&mut self, report: ReceiverReport) {
        if let Some(handle) = self.media_handle.as_mut() {
            handle.on_rtcp_receiver_report(report);
        }
        self.stats.on_receiver_report(report);
    }

    /// Handles an inbound `PAUSE`. This control plane models no separate
    /// paused state to resume from; like `TEARDOWN`, it ends the session.
    pub fn on_pause_request(&mut self, _req: &Request) -> Response {
        self.close(ClosedReason::Teardown);
        Response::ok()
    }

    /// Handles the sink's `TEARDOWN`, transitioning to CLOSED with a 200
    /// response.
    pub fn on_teardown_request(&mut self, _req: &Request) -> Response {
        self.close(ClosedReason::Teardown);
        Response::ok()
    }

    /// Builds M16: a keep-alive `GET_PARAMETER` with an empty body. Marks
    /// the keep-alive outstanding; see [`Session::check_keep_alive_timeout`].
    pub fn build_keep_alive(&mut self) -> Request {
        self.keep_alive.mark_sent();
        Request::new(Method::GetParameter, "rtsp://localhost/wfd1.0")
    }

    pub fn keep_alive_interval(&self) -> Duration {
        Duration::from_secs(self.config.keep_alive_interval_secs() as u64)
    }

    pub fn keep_alive_grace_period(&self) -> Duration {
        Duration::from_secs(5)
    }

    /// Called by the embedder's timer exactly [`Session::keep_alive_grace_period`]
    /// after a keep-alive was sent. If no response arrived meanwhile, emits
    /// `KeepAliveFail` and closes the session.
    pub fn check_keep_alive_timeout(&mut self) -> Option<Error> {
        if self.keep_alive.is_outstanding() {
            let err: Error = ErrorInt::KeepAliveTimeout {
                outstanding_secs: self.keep_alive_grace_period().as_secs(),
            }
            .into();
            log::warn!("wfd: {}", err);
            self.events.send(WfdEvent::KeepAliveFail);
            self.close(ClosedReason::KeepAliveTimeout);
            Some(err)
        } else {
            None
        }
    }

    /// Called by the external transport when the underlying connection
    /// fails outside the normal TEARDOWN flow (socket error, framing
    /// violation). Closes the session and returns the error for the
    /// transport to log or propagate.
    pub fn transport_error(&mut self, description: String) -> Error {
        let err: Error = ErrorInt::TransportError { description }.into();
        log::warn!("wfd: {}", err);
        self.close(ClosedReason::TransportError);
        err
    }

    fn on_keep_alive_response(&mut self) {
        self.keep_alive.mark_responded();
    }

    /// Single dispatch point for any response correlated to this session's
    /// connection: routes by the still-unset handshake flag, per the
    /// control plane's response-routing contract.
    pub fn handle_response(&mut self, resp: &Response) -> Result<()> {
        if !self.m1_done {
            self.handle_m1_response(resp)
        } else if !self.m3_done {
            self.handle_m3_response(&resp.body)
        } else if !self.m4_done {
            self.handle_m4_response(resp)
        } else if self.keep_alive.is_outstanding() {
            self.on_keep_alive_response();
            Ok(())
        } else {
            log::debug!("wfd: response with no pending request, ignoring");
            Ok(())
        }
    }

    /// Tears the session down: cancels timers (the caller owns their
    /// handles and must abort them), releases any acquired pool address,
    /// and transitions to CLOSED. Idempotent.
    pub fn close(&mut self, reason: ClosedReason) {
        if self.state == State::Closed {
            return;
        }
        if let (Some(pool), Some(handle)) = (self.pool.take(), self.address_handle.take()) {
            pool.release(handle);
        }
        if let Some(exporter) = self.stats_exporter.take() {
            exporter.abort();
        }
        self.state = State::Closed;
        self.events.send(WfdEvent::Closed { reason });
    }
}

impl<F: MediaFactory> Dispatcher for Session<F> {
    fn on_options(&mut self, req: &Request) -> Response {
        self.on_options_request(req).unwrap_or_else(dispatch_error)
    }

    /// Inbound `GET_PARAMETER` outside the handshake's own M3/M16 exchange
    /// (e.g. a bare capability probe from the sink) is acknowledged with an
    /// empty 200; this source has nothing further to report on demand.
    fn on_get_parameter(&mut self, _req: &Request) -> Response {
        Response::ok()
    }

    /// Inbound `SET_PARAMETER` outside the M4/trigger exchange this source
    /// itself drives (e.g. UIBC negotiation) isn't modeled; acknowledged
    /// without effect.
    fn on_set_parameter(&mut self, _req: &Request) -> Response {
        Response::ok()
    }

    fn on_setup(&mut self, req: &Request) -> Response {
        self.on_setup_or_play(req).unwrap_or_else(dispatch_error)
    }

    fn on_play(&mut self, req: &Request) -> Response {
        self.on_setup_or_play(req).unwrap_or_else(dispatch_error)
    }

    fn on_pause(&mut self, req: &Request) -> Response {
        self.on_pause_request(req)
    }

    fn on_teardown(&mut self, req: &Request) -> Response {
        self.on_teardown_request(req)
    }
}

fn dispatch_error(e: Error) -> Response {
    log::warn!("wfd: {}", e);
    Response::bad_request()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factory::test_support::RecordingFactory;
    use crate::message::resolution::CeaResolution;

    fn test_config() -> SessionConfig {
        SessionConfig {
            supported_resolution_mask: CeaResolution::Cea1280x720P30.bit()
                | CeaResolution::Cea640x480P60.bit(),
            native_resolution_family: VideoNativeResolutionFamily::Cea,
            ..SessionConfig::default()
        }
    }

    fn new_session() -> Session<RecordingFactory> {
        let (tx, _rx) = crate::event::channel();
        Session::new(test_config(), tx, RecordingFactory::default(), "10.0.0.1".to_string())
    }

    #[test]
    fn full_handshake_reaches_streaming() {
        let mut session = new_session();
        let m1 = session.build_m1().unwrap();
        assert_eq!(m1.method, Method::Options);
        session.handle_m1_response(&Response::ok()).unwrap();
        assert_eq!(session.state(), State::M2Wait);

        let options_req = Request::new(Method::Options, "*");
        let m2 = session.on_options_request(&options_req).unwrap();
        assert_eq!(m2.status, 200);
        assert_eq!(session.state(), State::M2Done);

        let _m3 = session.build_m3().unwrap();
        let sink_body = concat!(
            "wfd_audio_codecs: AAC 00000001 00\r\n",
            "wfd_video_formats: 00 00 01 01 00000120 00000000 00000000 00 00000500 000002d0 00 0000 00\r\n",
        );
        session.handle_m3_response(sink_body.as_bytes()).unwrap();
        assert_eq!(session.state(), State::M3Done);
        assert!(session.negotiated_audio.is_some());
        assert!(session.negotiated_video.is_some());

        let m4 = session.build_m4().unwrap();
        assert!(m4.body.len() > 0);
        session.handle_m4_response(&Response::ok()).unwrap();
        assert_eq!(session.state(), State::M4Done);

        let _m5 = session.build_trigger(TriggerMethod::Setup).unwrap();
        assert_eq!(session.state(), State::SetupWait);

        let setup_req = Request::new(Method::Setup, "rtsp://10.0.0.1/wfd1.0/streamid=0");
        let resp = session.on_setup_or_play(&setup_req).unwrap();
        assert_eq!(resp.status, 200);
        assert_eq!(session.state(), State::Streaming);
        assert_eq!(session.factory.audio_codec, Some(crate::message::AudioFormat::AAC));
    }

    #[test]
    fn keep_alive_timeout_without_response_closes_session() {
        let mut session = new_session();
        session.state = State::Streaming;
        session.m1_done = true;
        session.m3_done = true;
        session.m4_done = true;
        let _ = session.build_keep_alive();
        let err = session.check_keep_alive_timeout().unwrap();
        assert_eq!(err.kind(), crate::error::ErrorKind::KeepAliveTimeout);
        assert_eq!(session.state(), State::Closed);
    }

    #[test]
    fn keep_alive_response_before_timeout_prevents_close() {
        let mut session = new_session();
        session.state = State::Streaming;
        session.m1_done = true;
        session.m3_done = true;
        session.m4_done = true;
        let resp = Response::ok();
        let _ = session.build_keep_alive();
        session.handle_response(&resp).unwrap();
        assert!(session.check_keep_alive_timeout().is_none());
        assert_eq!(session.state(), State::Streaming);
    }

    #[test]
    fn setup_before_m4_is_a_protocol_violation() {
        let mut session = new_session();
        let setup_req = Request::new(Method::Setup, "*");
        let err = session.on_setup_or_play(&setup_req).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::ProtocolViolation);
    }

    #[test]
    fn close_is_idempotent_and_releases_pool_handle() {
        let pool = Arc::new(Pool::new());
        pool.add_range("10.0.0.1", "10.0.0.1", 5000, 5009, 1).unwrap();
        let mut session = new_session();
        session.acquire_rtp_ports(pool.clone(), AddressFlags::EVEN_PORT).unwrap();
        session.close(ClosedReason::Teardown);
        session.close(ClosedReason::Teardown);
        assert_eq!(session.state(), State::Closed);
    }

    fn streaming_session() -> Session<RecordingFactory> {
        let mut session = new_session();
        session.state = State::SetupWait;
        let setup_req = Request::new(Method::Setup, "rtsp://10.0.0.1/wfd1.0/streamid=0");
        session.on_setup_or_play(&setup_req).unwrap();
        session
    }

    #[test]
    fn on_teardown_request_closes_session_with_ok_response() {
        let mut session = streaming_session();
        let req = Request::new(Method::Teardown, "rtsp://10.0.0.1/wfd1.0/streamid=0");
        let resp = session.on_teardown_request(&req);
        assert_eq!(resp.status, 200);
        assert_eq!(session.state(), State::Closed);
    }

    #[test]
    fn on_pause_request_closes_session_with_ok_response() {
        let mut session = streaming_session();
        let req = Request::new(Method::Pause, "rtsp://10.0.0.1/wfd1.0/streamid=0");
        let resp = session.on_pause_request(&req);
        assert_eq!(resp.status, 200);
        assert_eq!(session.state(), State::Closed);
    }

    #[test]
    fn dispatcher_routes_teardown_to_close() {
        let mut session = streaming_session();
        let req = Request::new(Method::Teardown, "rtsp://10.0.0.1/wfd1.0/streamid=0");
        let resp = Dispatcher::on_teardown(&mut session, &req);
        assert_eq!(resp.status, 200);
        assert_eq!(session.state(), State::Closed);
    }

    #[test]
    fn dispatcher_routes_options_through_handshake() {
        let mut session = new_session();
        session.state = State::M2Wait;
        let req = Request::new(Method::Options, "*");
        let resp = Dispatcher::on_options(&mut session, &req);
        assert_eq!(resp.status, 200);
        assert_eq!(session.state(), State::M2Done);
    }

    #[test]
    fn on_rtcp_receiver_report_reaches_both_handle_and_stats() {
        let mut session = streaming_session();
        let rr = crate::stats::ReceiverReport {
            fraction_lost: 3,
            max_seqnum: 42,
            ..Default::default()
        };
        session.on_rtcp_receiver_report(rr);
        assert_eq!(session.media_handle.as_ref().unwrap().reports, vec![rr]);
        let snapshot = session.stats().export_delta();
        assert_eq!(snapshot.seqnum_delta, 42);
        assert_eq!(snapshot.cumulative_lost, 3);
    }

    #[test]
    fn transport_error_closes_session_and_reports_kind() {
        let mut session = new_session();
        let err = session.transport_error("connection reset".to_string());
        assert_eq!(err.kind(), crate::error::ErrorKind::TransportError);
        assert_eq!(session.state(), State::Closed);
    }

    #[tokio::test]
    async fn stats_exporter_spawns_inside_a_tokio_runtime() {
        let mut session = streaming_session();
        assert!(session.stats_exporter.is_some());
        session.close(ClosedReason::Teardown);
        assert!(session.stats_exporter.is_none());
    }
}
