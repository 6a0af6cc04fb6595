//! 프레임 버퍼 추상화
//!
//! 파서는 [`Frame`] trait만을 통해 바이트에 접근합니다.
//! 모든 접근은 bounds check를 거치며, 범위를 벗어나면 [`Truncated`]를 반환합니다.
//!
//! - 유저스페이스: `[u8]`에 대한 구현 (이 모듈)
//! - 커널: `XdpContext`의 `data`/`data_end`에 대한 구현 (`udpfilter-ebpf`)

/// 프레임이 요청한 헤더를 담기에 너무 짧음
///
/// 복구 가능한 에러이며 분류기 밖으로 전파되지 않습니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Truncated {
    /// 읽기를 시도한 오프셋
    pub offset: usize,
    /// 필요했던 바이트 수
    pub needed: usize,
}

/// 수신 프레임 한 개에 대한 바이트 뷰
///
/// 구현체는 프레임을 복사하지 않고 제자리에서 읽고 씁니다.
/// 멀티바이트 값은 네트워크 바이트 오더(big-endian)로 해석합니다.
pub trait Frame {
    /// 프레임 길이 (바이트)
    fn len(&self) -> usize;

    /// `offset`에서 `size` 바이트를 읽을 수 있는지 확인합니다.
    #[inline(always)]
    fn has(&self, offset: usize, size: usize) -> bool {
        match offset.checked_add(size) {
            Some(end) => end <= self.len(),
            None => false,
        }
    }

    /// 1바이트를 읽습니다.
    fn load_u8(&self, offset: usize) -> Result<u8, Truncated>;

    /// big-endian u16을 읽습니다.
    fn load_be16(&self, offset: usize) -> Result<u16, Truncated>;

    /// big-endian u32를 읽습니다.
    fn load_be32(&self, offset: usize) -> Result<u32, Truncated>;

    /// big-endian u16을 제자리에 씁니다.
    fn store_be16(&mut self, offset: usize, value: u16) -> Result<(), Truncated>;
}

impl Frame for [u8] {
    #[inline(always)]
    fn len(&self) -> usize {
        <[u8]>::len(self)
    }

    #[inline(always)]
    fn load_u8(&self, offset: usize) -> Result<u8, Truncated> {
        self.get(offset)
            .copied()
            .ok_or(Truncated { offset, needed: 1 })
    }

    #[inline(always)]
    fn load_be16(&self, offset: usize) -> Result<u16, Truncated> {
        bytes_at::<2>(self, offset).map(u16::from_be_bytes)
    }

    #[inline(always)]
    fn load_be32(&self, offset: usize) -> Result<u32, Truncated> {
        bytes_at::<4>(self, offset).map(u32::from_be_bytes)
    }

    #[inline(always)]
    fn store_be16(&mut self, offset: usize, value: u16) -> Result<(), Truncated> {
        let end = offset.checked_add(2).ok_or(Truncated { offset, needed: 2 })?;
        let dst = self
            .get_mut(offset..end)
            .ok_or(Truncated { offset, needed: 2 })?;
        dst.copy_from_slice(&value.to_be_bytes());
        Ok(())
    }
}

#[inline(always)]
fn bytes_at<const N: usize>(buf: &[u8], offset: usize) -> Result<[u8; N], Truncated> {
    let truncated = Truncated { offset, needed: N };
    let end = offset.checked_add(N).ok_or(truncated)?;
    let src = buf.get(offset..end).ok_or(truncated)?;
    let mut out = [0u8; N];
    out.copy_from_slice(src);
    Ok(out)
}
