// Copyright the wfd-source authors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session lifecycle events, delivered over a channel instead of the
//! original's GObject signals (`wfd-options-request`, `wfd-keep-alive-fail`,
//! `wfd-playing-done`).

use tokio::sync::mpsc;

/// One event per former signal, plus the fields an embedder needs to act on
/// it.
#[derive(Clone, Debug)]
pub enum WfdEvent {
    /// The sink sent its M2 `OPTIONS` request.
    OptionsRequest,
    /// Negotiation finished: the fields the media factory was configured
    /// with.
    Negotiated {
        audio: crate::message::AudioFormat,
        width: u32,
        height: u32,
    },
    /// `SETUP`/`PLAY` completed; the session is STREAMING.
    PlayingDone,
    /// Five seconds passed with no response to the outstanding M16.
    KeepAliveFail,
    /// The session reached CLOSED, for whatever reason.
    Closed { reason: ClosedReason },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ClosedReason {
    Teardown,
    KeepAliveTimeout,
    TransportError,
}

/// Creates a bounded event channel. A small bound is fine: events are
/// infrequent control-plane notifications, and a slow subscriber must not be
/// allowed to stall the session's hot path.
pub fn channel() -> (EventSender, mpsc::Receiver<WfdEvent>) {
    let (tx, rx) = mpsc::channel(16);
    (EventSender(tx), rx)
}

/// The session's handle for emitting events. Cloneable so timers (which run
/// as separate tasks) can emit independently of the main dispatch path.
#[derive(Clone, Debug)]
pub struct EventSender(mpsc::Sender<WfdEvent>);

impl EventSender {
    /// Sends an event, dropping it if the embedder's receiver has been
    /// dropped or the channel is full. Events are advisory; a full channel
    /// must never block the session.
    pub fn send(&self, event: WfdEvent) {
        if let Err(e) = self.0.try_send(event) {
            log::warn!("wfd: dropped event: {}", e);
        }
    }
}
