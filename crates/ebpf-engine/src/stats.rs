//! 통계 수집 — 카운터 스냅샷 기반 처리율 계산
//!
//! [`ProtocolStats`]는 보고 루프가 매 주기 읽은 [`CounterSnapshot`]을 받아
//! 누적값과 초당 패킷 수를 갱신하고 Prometheus 메트릭으로 내보냅니다.
//!
//! # 데이터 흐름
//! ```text
//! CounterSource ──poll──▶ CounterSnapshot ──update──▶ ProtocolStats ──▶ metrics
//!                         (CPU별 값 합산)              (rate 계산)
//! ```

use std::time::Instant;

use serde::Serialize;
use udpfilter_core::metrics as m;

use crate::counters::CounterSnapshot;

/// 프로토콜별 누적 카운터와 전체 처리율
///
/// # Rate 계산
/// `update()`를 호출할 때마다 이전 스냅샷과의 차이(delta)를 경과 시간으로 나누어
/// pps를 계산합니다. 첫 번째 호출의 pps는 0입니다.
#[derive(Debug, Clone, Serialize)]
pub struct ProtocolStats {
    /// 전체 누적 패킷 수
    pub total_packets: u64,
    /// 직전 주기 기준 초당 패킷 수
    pub pps: f64,
    /// 업데이트 횟수
    pub polls: u64,
    /// 이전 폴링의 원시 값 (delta 계산용, 직렬화 제외)
    #[serde(skip)]
    previous: Option<CounterSnapshot>,
    /// 마지막 업데이트 시각 (rate 계산용, 직렬화 제외)
    #[serde(skip)]
    last_poll: Option<Instant>,
}

impl ProtocolStats {
    pub fn new() -> Self {
        Self {
            total_packets: 0,
            pps: 0.0,
            polls: 0,
            previous: None,
            last_poll: None,
        }
    }

    /// 새 스냅샷으로 통계를 갱신하고 메트릭을 내보냅니다.
    pub fn update(&mut self, snapshot: &CounterSnapshot) {
        self.update_at(snapshot, Instant::now());
    }

    /// 지정한 시각 기준으로 갱신합니다.
    pub fn update_at(&mut self, snapshot: &CounterSnapshot, now: Instant) {
        let total = snapshot.total();

        match (&self.previous, self.last_poll) {
            (Some(prev), Some(last_time)) => {
                let elapsed = now.saturating_duration_since(last_time).as_secs_f64();
                if elapsed > 0.0 {
                    let delta = total.wrapping_sub(prev.total());
                    // 주기당 delta는 실용적으로 2^53 미만
                    #[allow(clippy::cast_precision_loss)]
                    {
                        self.pps = delta as f64 / elapsed;
                    }
                }
            }
            _ => {
                // 첫 번째 폴링 — 누적값만 설정, rate는 0
                self.pps = 0.0;
            }
        }

        self.total_packets = total;
        self.polls += 1;
        self.previous = Some(snapshot.clone());
        self.last_poll = Some(now);

        self.publish(snapshot);
    }

    /// 직전 스냅샷 (첫 폴링 전에는 `None`)
    pub fn previous(&self) -> Option<&CounterSnapshot> {
        self.previous.as_ref()
    }

    fn publish(&self, snapshot: &CounterSnapshot) {
        metrics::counter!(m::PACKETS_TOTAL).absolute(self.total_packets);
        metrics::gauge!(m::PACKETS_PER_SECOND).set(self.pps);

        for (index, count) in snapshot.non_zero() {
            metrics::counter!(
                m::PROTOCOL_PACKETS_TOTAL,
                m::LABEL_PROTOCOL => index.to_string()
            )
            .absolute(count);
        }
    }
}

impl Default for ProtocolStats {
    fn default() -> Self {
        Self::new()
    }
}
