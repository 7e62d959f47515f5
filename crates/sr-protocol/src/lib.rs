//! # SR Protocol
//!
//! 电机板、I/O 板（Ruggeduino）和电源板的线协议定义（无硬件依赖）
//!
//! ## 模块
//!
//! - `motor`: 电机板单字节命令与速度字节编码
//! - `ruggeduino`: I/O 板 ASCII 命令与响应解析
//! - `power`: 电源板 USB 控制传输 opcode 与定长响应解码
//! - `notes`: 蜂鸣器音符表与 beep 参数校验
//!
//! ## 两种协议形态
//!
//! ```text
//! 行协议（串口）:   [cmd][arg] ──▶  ... ──▶ "response\n"
//! 控制传输（USB）:  (opcode, wValue, data) ──▶ 定长小端缓冲区
//! ```
//!
//! 所有命令都编码为定长缓冲区，不做运行时字符串拼接。

use thiserror::Error;

pub mod motor;
pub mod notes;
pub mod power;
pub mod ruggeduino;

// 重新导出常用类型
pub use motor::*;
pub use notes::*;
pub use power::*;
pub use ruggeduino::*;

/// 行协议的响应终止符
pub const LINE_TERMINATOR: u8 = b'\n';

/// 协议编码/解码错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("Invalid response length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("{field} out of range: {value} (valid: {min}..={max})")]
    OutOfRange {
        field: &'static str,
        value: i64,
        min: i64,
        max: i64,
    },

    #[error("'{0}' is not a recognised note")]
    UnknownNote(String),

    #[error("a beep takes either a note or a frequency, not both")]
    ConflictingTone,
}

/// 判断一次行读取是否完整（非空且以 `\n` 结尾）
pub fn is_complete_line(response: &[u8]) -> bool {
    response.last() == Some(&LINE_TERMINATOR)
}

/// 版本字符串的固件族（去掉行尾后 `:` 之前的部分）
///
/// 例如 `"SRduino:1.2\n"` 的固件族是 `"SRduino"`。
pub fn firmware_family(response: &str) -> &str {
    let line = response.trim_end_matches(['\r', '\n']);
    line.split(':').next().unwrap_or(line)
}

/// 小端字节序转 i32
pub fn bytes_to_i32_le(bytes: [u8; 4]) -> i32 {
    i32::from_le_bytes(bytes)
}
