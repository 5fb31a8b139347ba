//! 帧编解码
//!
//! 串口是无边界的字节流，消息以 `<` 开始、`>` 结束。
//! [`FrameDecoder`] 维护跨读取调用的半帧状态，可以按任意粒度喂入字节。
//!
//! # 状态机
//!
//! ```text
//!            '<'                       '>' (emit)
//!   Idle ──────────▶ InMessage ─────────────────▶ Idle
//!    ▲ other: drop     │  '<': restart frame
//!    │                 │  other: append
//!    └─ overflow ──────┘
//! ```

use crate::ProtocolError;
use crate::constants::{DEFAULT_MAX_FRAME_LEN, START_DELIMITER, STOP_DELIMITER};

/// 解码器状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DecoderState {
    /// 等待起始符，期间的字节全部丢弃
    Idle,
    /// 已收到起始符，正在累积负载
    InMessage,
}

/// 增量帧解码器
///
/// # Example
///
/// ```
/// use thermocam_protocol::FrameDecoder;
///
/// let mut decoder = FrameDecoder::new();
/// let mut messages = Vec::new();
/// decoder.feed(b"noise<Scan:1:", |m| messages.push(m));
/// decoder.feed(b"2:12000>", |m| messages.push(m));
/// assert_eq!(messages, vec![Ok("Scan:1:2:12000".to_string())]);
/// ```
#[derive(Debug, Clone)]
pub struct FrameDecoder {
    state: DecoderState,
    accumulator: Vec<u8>,
    max_frame_len: usize,
}

impl FrameDecoder {
    /// 使用默认帧长上限创建解码器
    pub fn new() -> Self {
        Self::with_max_frame_len(DEFAULT_MAX_FRAME_LEN)
    }

    /// 指定帧长上限（负载字节数，不含分隔符）
    ///
    /// 未终止的 `<` 不会让累积缓冲区无限增长：超过上限后当前帧被丢弃。
    pub fn with_max_frame_len(max_frame_len: usize) -> Self {
        Self {
            state: DecoderState::Idle,
            accumulator: Vec::with_capacity(max_frame_len.min(DEFAULT_MAX_FRAME_LEN)),
            max_frame_len: max_frame_len.max(1),
        }
    }

    /// 帧长上限
    pub fn max_frame_len(&self) -> usize {
        self.max_frame_len
    }

    /// 是否处于半帧状态
    pub fn in_message(&self) -> bool {
        self.state == DecoderState::InMessage
    }

    /// 丢弃半帧，回到 `Idle`
    pub fn reset(&mut self) {
        self.state = DecoderState::Idle;
        self.accumulator.clear();
    }

    /// 处理单个字节
    ///
    /// 返回值：
    /// - `None`: 尚无完整帧
    /// - `Some(Ok(msg))`: 完整帧
    /// - `Some(Err(_))`: 当前帧被丢弃（编码错误或超长），解码器已回到 `Idle`
    pub fn push(&mut self, byte: u8) -> Option<Result<String, ProtocolError>> {
        match self.state {
            DecoderState::Idle => {
                if byte == START_DELIMITER {
                    self.state = DecoderState::InMessage;
                    self.accumulator.clear();
                }
                None
            },
            DecoderState::InMessage => match byte {
                STOP_DELIMITER => {
                    self.state = DecoderState::Idle;
                    let payload = std::mem::take(&mut self.accumulator);
                    let len = payload.len();
                    Some(String::from_utf8(payload).map_err(|_| ProtocolError::InvalidUtf8 { len }))
                },
                START_DELIMITER => {
                    // 帧内再次出现起始符：丢弃半帧，重新开始
                    self.accumulator.clear();
                    None
                },
                _ => {
                    if self.accumulator.len() >= self.max_frame_len {
                        self.reset();
                        return Some(Err(ProtocolError::FrameOverflow {
                            limit: self.max_frame_len,
                        }));
                    }
                    self.accumulator.push(byte);
                    None
                },
            },
        }
    }

    /// 处理一段字节，对每个完成（或被丢弃）的帧调用 `on_frame`
    pub fn feed<F>(&mut self, bytes: &[u8], mut on_frame: F)
    where
        F: FnMut(Result<String, ProtocolError>),
    {
        for &byte in bytes {
            if let Some(result) = self.push(byte) {
                on_frame(result);
            }
        }
    }
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}

/// 检查负载能否被无歧义地成帧
pub fn validate_payload(payload: &str) -> Result<(), ProtocolError> {
    if payload.bytes().any(|b| b == START_DELIMITER || b == STOP_DELIMITER) {
        return Err(ProtocolError::DelimiterInPayload(payload.to_string()));
    }
    Ok(())
}

/// 编码为线路字节：`'<' + payload + '>'`
///
/// 不做分隔符检查，调用方应在入队前使用 [`validate_payload`]。
pub fn encode_frame(payload: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(payload.len() + 2);
    out.push(START_DELIMITER);
    out.extend_from_slice(payload.as_bytes());
    out.push(STOP_DELIMITER);
    out
}
