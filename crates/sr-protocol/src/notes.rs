//! 蜂鸣器音符表与 beep 参数校验
//!
//! 参数在发送前完成校验：每个 [`Beep`] 先解析成 [`PiezoTone`]，
//! 任何一个失败都不会产生 USB 传输。

use std::fmt;
use std::str::FromStr;

use crate::{PiezoTone, ProtocolError};

/// 既没有给音符也没有给频率时使用的频率（Hz，即 A4）
pub const DEFAULT_BEEP_FREQUENCY: u16 = 440;

/// 音符（C4 到 C5）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Note {
    C,
    D,
    E,
    F,
    G,
    A,
    B,
    /// 高八度 C（`"uc"`）
    UpperC,
}

impl Note {
    pub const ALL: [Note; 8] = [
        Note::C,
        Note::D,
        Note::E,
        Note::F,
        Note::G,
        Note::A,
        Note::B,
        Note::UpperC,
    ];

    /// 音符频率（Hz）
    pub fn frequency(self) -> u16 {
        match self {
            Note::C => 261,
            Note::D => 294,
            Note::E => 329,
            Note::F => 349,
            Note::G => 392,
            Note::A => 440,
            Note::B => 493,
            Note::UpperC => 523,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Note::C => "c",
            Note::D => "d",
            Note::E => "e",
            Note::F => "f",
            Note::G => "g",
            Note::A => "a",
            Note::B => "b",
            Note::UpperC => "uc",
        }
    }
}

impl fmt::Display for Note {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Note {
    type Err = ProtocolError;

    /// 不区分大小写
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_ascii_lowercase();
        Note::ALL
            .into_iter()
            .find(|note| note.name() == lower)
            .ok_or_else(|| ProtocolError::UnknownNote(s.to_string()))
    }
}

/// 一次 beep 请求（尚未校验）
///
/// `note` 与 `frequency` 最多给一个；都不给时使用 [`DEFAULT_BEEP_FREQUENCY`]。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Beep {
    pub duration_ms: u16,
    pub note: Option<String>,
    pub frequency: Option<u16>,
}

impl Beep {
    /// 默认频率的 beep
    pub fn new(duration_ms: u16) -> Self {
        Self {
            duration_ms,
            note: None,
            frequency: None,
        }
    }

    /// 按音符名的 beep
    pub fn note(duration_ms: u16, note: impl Into<String>) -> Self {
        Self {
            duration_ms,
            note: Some(note.into()),
            frequency: None,
        }
    }

    /// 按频率的 beep
    pub fn frequency(duration_ms: u16, frequency: u16) -> Self {
        Self {
            duration_ms,
            note: None,
            frequency: Some(frequency),
        }
    }

    /// 校验并解析为蜂鸣音
    pub fn resolve(&self) -> Result<PiezoTone, ProtocolError> {
        let frequency = match (&self.note, self.frequency) {
            (Some(_), Some(_)) => return Err(ProtocolError::ConflictingTone),
            (Some(note), None) => note.parse::<Note>()?.frequency(),
            (None, Some(frequency)) => frequency,
            (None, None) => DEFAULT_BEEP_FREQUENCY,
        };
        Ok(PiezoTone::new(frequency, self.duration_ms))
    }
}

/// 校验整组 beep；任何一个无效则整体失败
pub fn resolve_beeps(beeps: &[Beep]) -> Result<Vec<PiezoTone>, ProtocolError> {
    beeps.iter().map(Beep::resolve).collect()
}
