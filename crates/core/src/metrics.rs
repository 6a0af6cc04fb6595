//! 메트릭 상수 및 설명 등록
//!
//! 모든 Prometheus 메트릭의 이름과 설명을 중앙에서 정의합니다.
//! 엔진과 데몬은 이 상수를 사용하여 `metrics::counter!()`, `metrics::gauge!()`
//! 매크로를 호출합니다.
//!
//! # 네이밍 컨벤션
//!
//! - 접두어: `udpfilter_`
//! - 접미어: `_total` (counter), 없음 (gauge)
//!
//! # 사용 예시
//!
//! ```ignore
//! use metrics::counter;
//!
//! counter!(udpfilter_core::metrics::PACKETS_TOTAL).absolute(42);
//! ```

// ─── 레이블 키 상수 ────────────────────────────────────────────────

/// 프로토콜 레이블 키 (IP 프로토콜 번호, 0..=255)
pub const LABEL_PROTOCOL: &str = "protocol";

// ─── 필터 메트릭 ────────────────────────────────────────────────────

/// 분류기에 도달한 전체 프레임 수 (counter)
pub const PACKETS_TOTAL: &str = "udpfilter_packets_total";

/// 프로토콜 번호별 프레임 수 (counter, label: protocol)
pub const PROTOCOL_PACKETS_TOTAL: &str = "udpfilter_protocol_packets_total";

/// 직전 보고 주기 기준 초당 프레임 수 (gauge)
pub const PACKETS_PER_SECOND: &str = "udpfilter_packets_per_second";

// ─── Daemon 메트릭 ──────────────────────────────────────────────────

/// 필터 어태치 상태 (gauge, 1 = attached)
pub const FILTER_ATTACHED: &str = "udpfilter_filter_attached";

/// Daemon: 빌드 정보 (gauge, 항상 1, label: version)
pub const DAEMON_BUILD_INFO: &str = "udpfilter_daemon_build_info";

// ─── 설명 등록 함수 ─────────────────────────────────────────────────

/// 모든 메트릭의 설명(description)을 등록합니다.
///
/// 전역 레코더 설치 후 한 번만 호출해야 합니다.
pub fn describe_all() {
    use metrics::{describe_counter, describe_gauge};

    describe_counter!(
        PACKETS_TOTAL,
        "Total number of frames that reached L3 dispatch"
    );
    describe_counter!(
        PROTOCOL_PACKETS_TOTAL,
        "Frames counted per IP protocol number"
    );
    describe_gauge!(
        PACKETS_PER_SECOND,
        "Frame rate over the last report interval (packets/sec)"
    );
    describe_gauge!(
        FILTER_ATTACHED,
        "Whether the XDP filter is attached (1) or not (0)"
    );
    describe_gauge!(
        DAEMON_BUILD_INFO,
        "Build information (always 1, with version label)"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_METRIC_NAMES: &[&str] = &[
        PACKETS_TOTAL,
        PROTOCOL_PACKETS_TOTAL,
        PACKETS_PER_SECOND,
        FILTER_ATTACHED,
        DAEMON_BUILD_INFO,
    ];

    #[test]
    fn all_metrics_start_with_udpfilter_prefix() {
        for name in ALL_METRIC_NAMES {
            assert!(
                name.starts_with("udpfilter_"),
                "Metric '{}' does not start with 'udpfilter_' prefix",
                name
            );
        }
    }

    #[test]
    fn metric_names_are_unique() {
        let mut names = ALL_METRIC_NAMES.to_vec();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), ALL_METRIC_NAMES.len());
    }

    #[test]
    fn describe_all_does_not_panic() {
        // 레코더가 설치되지 않아도 패닉하지 않아야 함
        describe_all();
    }

    #[test]
    fn label_key_is_lowercase() {
        assert_eq!(LABEL_PROTOCOL.to_lowercase(), LABEL_PROTOCOL);
    }
}
