// Copyright the wfd-source authors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! A Wi-Fi Display (Miracast) source-side RTSP control plane.
//!
//! This crate drives the mandatory WFD capability-negotiation handshake
//! (M1–M7 plus the M16 keep-alive) on top of an externally supplied RTSP 1.0
//! transport, negotiates audio/video parameters against a sink's advertised
//! capabilities, allocates RTP/RTCP port ranges from a configurable address
//! pool, and hands the result to a pluggable [`factory::MediaFactory`].
//!
//! The three core pieces are [`message`] (the WFD parameter wire format),
//! [`pool`] (the multicast address allocator), and [`session`] (the
//! per-connection handshake driver and negotiation tables). [`transport`],
//! [`event`], [`stats`], [`config`], and [`error`] are the surrounding
//! ambient stack: request/response modeling, lifecycle notifications,
//! RTCP-derived statistics, typed configuration, and error handling.
//!
//! Logging uses the `log` facade at levels matching data sensitivity:
//! `debug!` for protocol-level traces, `info!` for negotiation outcomes,
//! `warn!` for malformed input the parser tolerated, `error!` for faults
//! that terminate a session. This crate never installs a `log` subscriber;
//! the embedder chooses one.

pub mod config;
pub mod error;
pub mod event;
pub mod factory;
pub mod message;
pub mod pool;
pub mod session;
pub mod stats;
pub mod transport;

pub use error::{Error, ErrorKind};
