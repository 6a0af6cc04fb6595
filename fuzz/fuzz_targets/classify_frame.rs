#![no_main]

use std::cell::Cell;

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use udpfilter_common::{CounterSink, FilterConfig, Verdict, classify_and_count};

#[derive(Debug, Arbitrary)]
struct Input {
    ingress_port: u16,
    egress_port: u16,
    frame: Vec<u8>,
}

/// 증가 횟수와 마지막 인덱스만 기록
#[derive(Default)]
struct Recorder {
    hits: Cell<u32>,
    last: Cell<Option<u8>>,
}

impl CounterSink for Recorder {
    fn increment(&self, index: u8) {
        self.hits.set(self.hits.get() + 1);
        self.last.set(Some(index));
    }
}

fuzz_target!(|input: Input| {
    let config = FilterConfig::new(input.ingress_port, input.egress_port, 0);
    let original = input.frame.clone();
    let mut frame = input.frame;
    let recorder = Recorder::default();

    // 어떤 입력에도 패닉 없이 판정해야 한다
    let result = classify_and_count(frame.as_mut_slice(), &config, &recorder);

    // 프레임당 최대 한 번 카운트
    assert!(recorder.hits.get() <= 1);
    assert_eq!(result.counted, recorder.hits.get() == 1);
    if result.counted {
        assert_eq!(recorder.last.get(), Some(result.index));
    }

    // 길이는 절대 바뀌지 않고, 재작성이 아니면 내용도 그대로
    assert_eq!(frame.len(), original.len());
    let changed: Vec<usize> = (0..frame.len())
        .filter(|&i| frame[i] != original[i])
        .collect();
    match result.verdict {
        Verdict::RewriteAndPass => {
            assert!(changed.len() <= 2);
            if let [first, ..] = changed.as_slice() {
                assert!(changed.iter().all(|&i| i <= first + 1));
            }
        }
        Verdict::Pass | Verdict::Drop => assert!(changed.is_empty()),
    }
});
