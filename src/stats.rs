// Copyright the wfd-source authors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! RTCP receiver-report accumulation and the 2-second periodic stats export.

use std::sync::Mutex;
use std::time::Duration;

/// The interval on which [`Stats::snapshot`] deltas are logged.
pub const EXPORT_INTERVAL: Duration = Duration::from_secs(2);

/// One RTCP receiver report's fields, as carried on the wire.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct ReceiverReport {
    pub fraction_lost: u8,
    pub max_seqnum: u32,
    pub jitter: u32,
    pub lsr: u32,
    pub dlsr: u32,
}

/// Accumulated per-stream statistics, mutated by both the RTCP callback and
/// read by the periodic exporter — hence its own lock, matching the
/// session-local keep-alive flag's reasoning.
#[derive(Default)]
pub struct Stats {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    cumulative_lost: u64,
    last_rr: Option<ReceiverReport>,
    last_seqnum: u32,
    bytes_sent: u64,
    last_export_seqnum: u32,
    last_export_bytes_sent: u64,
}

/// Round-trip time derived from an RTCP receiver report's LSR/DLSR fields,
/// per RFC 3550 §6.4.1. `None` if the sink never echoed an SR (`lsr == 0`).
pub fn round_trip_time(now_ntp_mid: u32, rr: &ReceiverReport) -> Option<Duration> {
    if rr.lsr == 0 {
        return None;
    }
    let rtt_ticks = now_ntp_mid
        .wrapping_sub(rr.lsr)
        .wrapping_sub(rr.dlsr);
    // Ticks are in 1/65536s units (the middle 32 bits of an NTP timestamp).
    Some(Duration::from_secs_f64(rtt_ticks as f64 / 65536.0))
}

impl Stats {
    pub fn new() -> Stats {
        Stats::default()
    }

    /// Records an inbound receiver report, updating cumulative loss and the
    /// last-seen sequence number.
    pub fn on_receiver_report(&self, rr: ReceiverReport) {
        let mut inner = self.inner.lock().unwrap();
        inner.cumulative_lost += rr.fraction_lost as u64;
        if rr.max_seqnum > inner.last_seqnum {
            inner.last_seqnum = rr.max_seqnum;
        }
        inner.last_rr = Some(rr);
    }

    /// Records outbound RTP progress so the exporter can report a send-rate
    /// delta alongside receiver feedback.
    pub fn record_sent(&self, bytes: u64) {
        self.inner.lock().unwrap().bytes_sent += bytes;
    }

    /// Computes the delta since the last call and returns a loggable
    /// snapshot, without blocking whoever is feeding RTCP reports.
    pub fn export_delta(&self) -> StatsSnapshot {
        let mut inner = self.inner.lock().unwrap();
        let snapshot = StatsSnapshot {
            seqnum_delta: inner.last_seqnum.wrapping_sub(inner.last_export_seqnum),
            bytes_sent_delta: inner.bytes_sent - inner.last_export_bytes_sent,
            cumulative_lost: inner.cumulative_lost,
            last_rr: inner.last_rr,
        };
        inner.last_export_seqnum = inner.last_seqnum;
        inner.last_export_bytes_sent = inner.bytes_sent;
        snapshot
    }
}

#[derive(Clone, Copy, Debug)]
pub struct StatsSnapshot {
    pub seqnum_delta: u32,
    pub bytes_sent_delta: u64,
    pub cumulative_lost: u64,
    pub last_rr: Option<ReceiverReport>,
}

/// Spawns the periodic exporter task. Logs a `debug!` line every
/// [`EXPORT_INTERVAL`] until the returned handle is dropped (or aborted),
/// matching the session's "cancel on teardown" timer lifecycle.
pub fn spawn_exporter(stats: std::sync::Arc<Stats>, label: String) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(EXPORT_INTERVAL);
        loop {
            interval.tick().await;
            let snap = stats.export_delta();
            log::debug!(
                "wfd stats [{}]: +{} seq, +{} bytes, {} lost cumulative, rr={:?}",
                label,
                snap.seqnum_delta,
                snap.bytes_sent_delta,
                snap.cumulative_lost,
                snap.last_rr,
            );
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn export_delta_reports_progress_since_last_call() {
        let stats = Stats::new();
        stats.record_sent(1000);
        stats.on_receiver_report(ReceiverReport {
            fraction_lost: 2,
            max_seqnum: 50,
            ..Default::default()
        });
        let first = stats.export_delta();
        assert_eq!(first.seqnum_delta, 50);
        assert_eq!(first.bytes_sent_delta, 1000);
        assert_eq!(first.cumulative_lost, 2);

        stats.record_sent(500);
        stats.on_receiver_report(ReceiverReport {
            fraction_lost: 1,
            max_seqnum: 80,
            ..Default::default()
        });
        let second = stats.export_delta();
        assert_eq!(second.seqnum_delta, 30);
        assert_eq!(second.bytes_sent_delta, 500);
        assert_eq!(second.cumulative_lost, 3);
    }

    #[test]
    fn round_trip_time_is_none_without_prior_sender_report() {
        let rr = ReceiverReport::default();
        assert_eq!(round_trip_time(0x1234_5678, &rr), None);
    }

    #[test]
    fn round_trip_time_computes_from_lsr_dlsr() {
        let rr = ReceiverReport {
            lsr: 0x0001_0000,
            dlsr: 0x0000_8000,
            ..Default::default()
        };
        // now - lsr - dlsr = 0x18000 ticks = 1.5s.
        let now = 0x0001_0000u32 + 0x0000_8000 + 0x0001_8000;
        let rtt = round_trip_time(now, &rr).unwrap();
        assert!((rtt.as_secs_f64() - 1.5).abs() < 1e-9);
    }
}
