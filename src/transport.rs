// Copyright the wfd-source authors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! A thin RTSP request/response model and the method-dispatch seam an
//! external RTSP 1.0 transport calls into.
//!
//! The transport itself (TCP framing, header parsing, session ids) is out of
//! scope; this module only defines what the transport hands to a
//! [`Session`](crate::session::Session) and what it gets back.

use std::fmt;

use bytes::Bytes;
use rtsp_types::Method;

/// A parsed inbound RTSP request, stripped of anything the session doesn't
/// need (header ordering, raw connection bytes).
#[derive(Clone, Debug)]
pub struct Request {
    pub method: Method,
    pub uri: String,
    pub headers: Vec<(String, String)>,
    pub content_type: Option<String>,
    pub body: Bytes,
}

impl Request {
    pub fn new(method: Method, uri: impl Into<String>) -> Request {
        Request {
            method,
            uri: uri.into(),
            headers: Vec::new(),
            content_type: None,
            body: Bytes::new(),
        }
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Request {
        self.headers.push((name.to_string(), value.into()));
        self
    }

    pub fn with_body(mut self, content_type: &str, body: impl Into<Bytes>) -> Request {
        self.content_type = Some(content_type.to_string());
        self.body = body.into();
        self
    }
}

/// An outbound (or received) RTSP response.
#[derive(Clone, Debug)]
pub struct Response {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

impl Response {
    pub fn ok() -> Response {
        Response {
            status: 200,
            headers: Vec::new(),
            body: Bytes::new(),
        }
    }

    pub fn bad_request() -> Response {
        Response {
            status: 400,
            headers: Vec::new(),
            body: Bytes::new(),
        }
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Response {
        self.headers.push((name.to_string(), value.into()));
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Response {
        self.body = body.into();
        self
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} header(s))", self.status, self.headers.len())
    }
}

/// The method-dispatch seam an external RTSP 1.0 transport calls into: one
/// method per RTSP method this source's control plane handles, each taking
/// the parsed inbound request and returning the response to send back.
///
/// A transport owns framing, connection lifecycle and session lookup; once
/// it has matched a request to a session, it dispatches through here instead
/// of calling session internals directly.
pub trait Dispatcher {
    fn on_options(&mut self, req: &Request) -> Response;
    fn on_get_parameter(&mut self, req: &Request) -> Response;
    fn on_set_parameter(&mut self, req: &Request) -> Response;
    fn on_setup(&mut self, req: &Request) -> Response;
    fn on_play(&mut self, req: &Request) -> Response;
    fn on_pause(&mut self, req: &Request) -> Response;
    fn on_teardown(&mut self, req: &Request) -> Response;
}

/// The standard RTSP 1.0 method set this source advertises in M2's `Public`
/// header, plus the WFD extension token.
pub const M2_PUBLIC_METHODS: &str =
    "OPTIONS, PAUSE, SETUP, PLAY, GET_PARAMETER, SET_PARAMETER, TEARDOWN, org.wfa.wfd1.0";

/// Normalizes any request URI to the single stream path this source exposes.
///
/// The sink may address requests to `*`, an absolute URL, or a path; all of
/// them map to the same stream.
pub fn normalize_path(_uri: &str) -> &'static str {
    "/wfd1.0/streamid=0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_path_is_constant_regardless_of_input() {
        assert_eq!(normalize_path("*"), "/wfd1.0/streamid=0");
        assert_eq!(
            normalize_path("rtsp://10.0.0.5/anything"),
            "/wfd1.0/streamid=0"
        );
    }

    #[test]
    fn public_methods_advertises_wfd_extension() {
        assert!(M2_PUBLIC_METHODS.contains("org.wfa.wfd1.0"));
        assert!(M2_PUBLIC_METHODS.contains("SETUP"));
    }

    #[test]
    fn response_builders_set_expected_status() {
        assert_eq!(Response::ok().status, 200);
        assert_eq!(Response::bad_request().status, 400);
    }
}
