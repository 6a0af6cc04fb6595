//! 카운터 테이블 — 프로토콜 번호별 패킷 수
//!
//! 인덱스 타입이 `u8`이므로 범위를 벗어난 인덱스는 표현할 수 없습니다.
//!
//! # 구성
//! ```text
//! 쓰기: classify_and_count ──CounterSink──▶ CounterTable (AtomicU64 x 256)
//!                                           PerCpuArray   (커널, CPU별 슬롯)
//! 읽기: Reporter ──CounterSource──▶ CounterSnapshot (모든 CPU 합산값)
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use udpfilter_common::{COUNTER_TABLE_SIZE, CounterSink};
use udpfilter_core::error::DriverError;

const SLOTS: usize = COUNTER_TABLE_SIZE as usize;

/// 유저스페이스 카운터 테이블
///
/// 소프트웨어 드라이버와 테스트에서 사용합니다. 증가는 `Relaxed` 원자 연산이며
/// `u64` 범위를 넘으면 0으로 돌아갑니다.
pub struct CounterTable {
    slots: [AtomicU64; SLOTS],
}

impl CounterTable {
    /// 모든 카운터가 0인 테이블을 생성합니다.
    pub fn new() -> Self {
        Self {
            slots: std::array::from_fn(|_| AtomicU64::new(0)),
        }
    }

    #[inline]
    pub fn increment(&self, index: u8) {
        self.slots[usize::from(index)].fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn get(&self, index: u8) -> u64 {
        self.slots[usize::from(index)].load(Ordering::Relaxed)
    }

    /// `(인덱스, 값)` 쌍을 순서대로 읽는 지연 반복자
    ///
    /// 각 슬롯은 읽는 시점의 값이며, 테이블 전체의 원자적 스냅샷은 아닙니다.
    pub fn iter(&self) -> impl Iterator<Item = (u8, u64)> + '_ {
        (0..=u8::MAX).map(move |index| (index, self.get(index)))
    }
}

impl Default for CounterTable {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CounterTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map()
            .entries(self.iter().filter(|&(_, count)| count != 0))
            .finish()
    }
}

impl CounterSink for CounterTable {
    #[inline]
    fn increment(&self, index: u8) {
        CounterTable::increment(self, index);
    }
}

/// 한 시점에 읽은 256개 카운터 값
#[derive(Clone, PartialEq, Eq)]
pub struct CounterSnapshot {
    values: [u64; SLOTS],
}

impl CounterSnapshot {
    /// 모든 값이 0인 스냅샷
    pub fn zeroed() -> Self {
        Self { values: [0; SLOTS] }
    }

    /// 인덱스 순서의 값 배열로 스냅샷을 만듭니다.
    pub fn from_values(values: [u64; SLOTS]) -> Self {
        Self { values }
    }

    pub fn get(&self, index: u8) -> u64 {
        self.values[usize::from(index)]
    }

    /// 0이 아닌 카운터를 인덱스 오름차순으로 반환합니다.
    pub fn non_zero(&self) -> impl Iterator<Item = (u8, u64)> + '_ {
        self.iter().filter(|&(_, count)| count != 0)
    }

    /// `previous` 이후 값이 바뀐 카운터를 반환합니다.
    pub fn changed_since<'a>(
        &'a self,
        previous: &'a CounterSnapshot,
    ) -> impl Iterator<Item = (u8, u64)> + 'a {
        self.iter()
            .filter(move |&(index, count)| previous.get(index) != count)
    }

    /// 전체 합계 (wrapping)
    pub fn total(&self) -> u64 {
        self.values
            .iter()
            .fold(0u64, |acc, &count| acc.wrapping_add(count))
    }

    pub fn iter(&self) -> impl Iterator<Item = (u8, u64)> + '_ {
        (0..=u8::MAX).map(move |index| (index, self.get(index)))
    }
}

impl Default for CounterSnapshot {
    fn default() -> Self {
        Self::zeroed()
    }
}

impl std::fmt::Debug for CounterSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map().entries(self.non_zero()).finish()
    }
}

/// 카운터 읽기 전용 접근
///
/// 보고 루프가 소비하는 인터페이스입니다. 커널 맵 읽기는 실패할 수 있으므로
/// `Result`를 반환합니다.
pub trait CounterSource: Send + Sync {
    /// 단일 카운터 값을 읽습니다 (커널 맵은 모든 CPU 합산).
    fn read(&self, index: u8) -> Result<u64, DriverError>;

    /// 256개 카운터를 모두 읽습니다.
    fn snapshot(&self) -> Result<CounterSnapshot, DriverError> {
        let mut values = [0u64; SLOTS];
        for (index, slot) in (0..=u8::MAX).zip(values.iter_mut()) {
            *slot = self.read(index)?;
        }
        Ok(CounterSnapshot::from_values(values))
    }
}

impl CounterSource for CounterTable {
    fn read(&self, index: u8) -> Result<u64, DriverError> {
        Ok(self.get(index))
    }
}

impl<T: CounterSource + ?Sized> CounterSource for Arc<T> {
    fn read(&self, index: u8) -> Result<u64, DriverError> {
        (**self).read(index)
    }

    fn snapshot(&self) -> Result<CounterSnapshot, DriverError> {
        (**self).snapshot()
    }
}
