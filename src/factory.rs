// Copyright the wfd-source authors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The media factory interface the session consumes. Pipeline construction
//! (encoders, muxer, RTP payloader, capture source) is entirely external;
//! this module only defines the seam.

use crate::message::AudioFormat;
use crate::stats::ReceiverReport;

/// Per-stream handle returned by [`MediaFactory::create_media`]. The
/// transport calls [`MediaHandle::on_rtcp_receiver_report`] as RTCP feedback
/// arrives so the session can keep [`crate::stats::Stats`] current.
pub trait MediaHandle: Send {
    fn on_rtcp_receiver_report(&mut self, report: ReceiverReport);
}

/// Consumed by [`crate::session::Session`] to push negotiated parameters and
/// obtain a stream handle once `SETUP` arrives.
pub trait MediaFactory: Send {
    type Handle: MediaHandle;

    /// Called once negotiation of M3's response completes.
    fn set_audio_codec(&mut self, codec: AudioFormat);

    /// Called while building M4's body.
    fn set_negotiated_resolution(&mut self, width: u32, height: u32);

    /// Called when the transport dispatches `SETUP` for `url`.
    fn create_media(&mut self, url: &str) -> Self::Handle;
}

/// In-memory [`MediaFactory`] used by unit and integration tests.
#[doc(hidden)]
pub mod test_support {
    use super::*;

    #[derive(Default)]
    pub struct RecordingHandle {
        pub reports: Vec<ReceiverReport>,
    }

    impl MediaHandle for RecordingHandle {
        fn on_rtcp_receiver_report(&mut self, report: ReceiverReport) {
            self.reports.push(report);
        }
    }

    #[derive(Default)]
    pub struct RecordingFactory {
        pub audio_codec: Option<AudioFormat>,
        pub resolution: Option<(u32, u32)>,
        pub created_urls: Vec<String>,
    }

    impl MediaFactory for RecordingFactory {
        type Handle = RecordingHandle;

        fn set_audio_codec(&mut self, codec: AudioFormat) {
            self.audio_codec = Some(codec);
        }

        fn set_negotiated_resolution(&mut self, width: u32, height: u32) {
            self.resolution = Some((width, height));
        }

        fn create_media(&mut self, url: &str) -> RecordingHandle {
            self.created_urls.push(url.to_string());
            RecordingHandle::default()
        }
    }
}
