//! 보고 루프 — 카운터를 주기적으로 읽어 출력
//!
//! 출력 형식 (stdout):
//! ```text
//! Passing packets, hit CTRL+C to stop
//!
//! {IP protocol-number}: {total dropped pkts}
//! 6: 120 pkts
//! 17: 3 pkts
//! ...
//! ```
//!
//! 머리말은 한 번만 쓰고, 이후 주기마다 0이 아닌 카운터를 한 줄씩 씁니다.
//! 루프는 [`CancellationToken`]이 취소되거나 출력이 닫히면 끝납니다.
//! 쓰기도 취소와 경쟁하므로 출력 상대편이 멈춰 있어도 취소는 바로 반영됩니다.

use std::fmt::Write as _;
use std::io;

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::ReportSettings;
use crate::counters::{CounterSnapshot, CounterSource};
use crate::stats::ProtocolStats;

/// 시작 안내 문구
pub const BANNER: &str = "Passing packets, hit CTRL+C to stop";
/// 카운터 목록 머리글
pub const HEADER: &str = "{IP protocol-number}: {total dropped pkts}";

/// 루프 종료 사유
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportOutcome {
    /// 취소 토큰에 의해 종료
    Cancelled,
    /// 출력 스트림이 닫혀 종료 (예: 파이프 상대편 종료)
    OutputClosed,
}

/// 카운터 보고기
pub struct Reporter<S: CounterSource> {
    source: S,
    settings: ReportSettings,
    stats: ProtocolStats,
}

impl<S: CounterSource> Reporter<S> {
    pub fn new(source: S, settings: ReportSettings) -> Self {
        Self {
            source,
            settings,
            stats: ProtocolStats::new(),
        }
    }

    pub fn stats(&self) -> &ProtocolStats {
        &self.stats
    }

    /// 한 주기의 출력 줄을 만들고 통계를 갱신합니다.
    ///
    /// 출력할 카운터가 없으면 빈 문자열입니다.
    pub fn render_cycle(&mut self, snapshot: &CounterSnapshot) -> String {
        let mut text = String::new();
        match (self.settings.only_changed, self.stats.previous()) {
            (true, Some(previous)) => {
                for (index, count) in snapshot.changed_since(previous) {
                    if count != 0 {
                        let _ = writeln!(text, "{index}: {count} pkts");
                    }
                }
            }
            _ => {
                for (index, count) in snapshot.non_zero() {
                    let _ = writeln!(text, "{index}: {count} pkts");
                }
            }
        }
        self.stats.update(snapshot);
        text
    }

    /// 취소되거나 출력이 닫힐 때까지 보고합니다.
    ///
    /// 출력 닫힘(`BrokenPipe`)은 정상 종료로 간주하고, 그 밖의 쓰기 에러만
    /// `Err`로 반환합니다. 카운터 읽기 실패는 경고 후 다음 주기에 재시도합니다.
    pub async fn run<W>(&mut self, out: &mut W, cancel: CancellationToken) -> io::Result<ReportOutcome>
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        let preamble = format!("{BANNER}\n\n{HEADER}\n");
        if let Some(outcome) = write_chunk(out, &preamble, &cancel).await? {
            return Ok(outcome);
        }

        loop {
            if cancel.is_cancelled() {
                return Ok(ReportOutcome::Cancelled);
            }

            match self.source.snapshot() {
                Ok(snapshot) => {
                    let text = self.render_cycle(&snapshot);
                    if !text.is_empty() {
                        if let Some(outcome) = write_chunk(out, &text, &cancel).await? {
                            return Ok(outcome);
                        }
                    }
                }
                Err(e) => warn!(error = %e, "failed to read counters"),
            }

            if self.settings.interval.is_zero() {
                // busy-poll이지만 취소가 늦지 않도록 런타임에 양보
                tokio::select! {
                    _ = cancel.cancelled() => return Ok(ReportOutcome::Cancelled),
                    _ = tokio::task::yield_now() => {}
                }
            } else {
                tokio::select! {
                    _ = cancel.cancelled() => return Ok(ReportOutcome::Cancelled),
                    _ = tokio::time::sleep(self.settings.interval) => {}
                }
            }
        }
    }
}

/// 출력이 닫혔으면 `Some(OutputClosed)`, 쓰는 중 취소되면 `Some(Cancelled)`를
/// 반환합니다.
async fn write_chunk<W>(
    out: &mut W,
    text: &str,
    cancel: &CancellationToken,
) -> io::Result<Option<ReportOutcome>>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    let write = async {
        out.write_all(text.as_bytes()).await?;
        out.flush().await
    };
    let result = tokio::select! {
        biased;
        result = write => result,
        _ = cancel.cancelled() => {
            debug!("report write abandoned on cancel");
            return Ok(Some(ReportOutcome::Cancelled));
        }
    };

    match result {
        Ok(()) => Ok(None),
        Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {
            debug!("report output closed");
            Ok(Some(ReportOutcome::OutputClosed))
        }
        Err(e) => Err(e),
    }
}
