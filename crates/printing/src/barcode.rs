//! Code 128 symbology used for the EAN field printed on each label.
//! 標籤上 EAN 欄位所使用的 Code 128 條碼編碼。

use thiserror::Error;

/// Bar/space module widths for every Code 128 symbol value (0..=106).
const PATTERNS: [&str; 107] = [
    "212222", "222122", "222221", "121223", "121322", "131222", "122213", "122312", "132212",
    "221213", "221312", "231212", "112232", "122132", "122231", "113222", "123122", "123221",
    "223211", "221132", "221231", "213212", "223112", "312131", "311222", "321122", "321221",
    "312212", "322112", "322211", "212123", "212321", "232121", "111323", "131123", "131321",
    "112313", "132113", "132311", "211313", "231113", "231311", "112133", "112331", "132131",
    "113123", "113321", "133121", "313121", "211331", "231131", "213113", "213311", "213131",
    "311123", "311321", "331121", "312113", "312311", "332111", "314111", "221411", "431111",
    "111224", "111422", "121124", "121421", "141122", "141221", "112214", "112412", "122114",
    "122411", "142112", "142211", "241211", "221114", "413111", "241112", "134111", "111242",
    "121142", "121241", "114212", "124112", "124211", "411212", "421112", "421211", "212141",
    "214121", "412121", "111143", "111341", "131141", "114113", "114311", "411113", "411311",
    "113141", "114131", "311141", "411131", "211412", "211214", "211232", "2331112",
];

const CODE_C: u8 = 99;
const CODE_B: u8 = 100;
const START_A: u8 = 103;
const START_B: u8 = 104;
const START_C: u8 = 105;
const STOP: u8 = 106;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BarcodeError {
    #[error("barcode value is empty")]
    Empty,
    #[error("character {0:?} cannot be encoded in Code 128")]
    UnsupportedCharacter(char),
    #[error("scanline does not contain a Code 128 symbol")]
    Unreadable,
    #[error("checksum mismatch")]
    Checksum,
}

/// An encoded Code 128 symbol sequence, start through stop.
/// 已編碼的 Code 128 符號序列（含起始與結束碼）。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Code128 {
    value: String,
    symbols: Vec<u8>,
}

impl Code128 {
    /// Encodes `value`, switching to code set C for all-digit values.
    /// 編碼 `value`，全為數字時改用 C 字集以縮短條碼。
    pub fn encode(value: &str) -> Result<Self, BarcodeError> {
        if value.is_empty() {
            return Err(BarcodeError::Empty);
        }
        if let Some(ch) = value.chars().find(|ch| !(' '..='~').contains(ch)) {
            return Err(BarcodeError::UnsupportedCharacter(ch));
        }

        let bytes = value.as_bytes();
        let mut symbols = Vec::with_capacity(bytes.len() + 4);
        if bytes.len() >= 2 && bytes.iter().all(u8::is_ascii_digit) {
            let pairs = if bytes.len() % 2 == 0 {
                symbols.push(START_C);
                bytes
            } else {
                symbols.push(START_B);
                symbols.push(bytes[0] - b' ');
                symbols.push(CODE_C);
                &bytes[1..]
            };
            for pair in pairs.chunks(2) {
                symbols.push((pair[0] - b'0') * 10 + (pair[1] - b'0'));
            }
        } else {
            symbols.push(START_B);
            symbols.extend(bytes.iter().map(|byte| byte - b' '));
        }

        symbols.push(checksum(&symbols));
        symbols.push(STOP);

        Ok(Self {
            value: value.to_string(),
            symbols,
        })
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    /// Symbol values including start, checksum and stop.
    pub fn symbols(&self) -> &[u8] {
        &self.symbols
    }

    /// Module sequence where `true` is a bar, starting and ending with a bar.
    /// 模組序列，`true` 代表黑條，首尾皆為黑條。
    pub fn modules(&self) -> Vec<bool> {
        let mut modules = Vec::with_capacity(self.module_count());
        for symbol in &self.symbols {
            for (index, width) in PATTERNS[*symbol as usize].bytes().enumerate() {
                let bar = index % 2 == 0;
                modules.extend(std::iter::repeat(bar).take((width - b'0') as usize));
            }
        }
        modules
    }

    pub fn module_count(&self) -> usize {
        // Every symbol is 11 modules wide, the stop symbol 13.
        (self.symbols.len() - 1) * 11 + 13
    }
}

fn checksum(symbols: &[u8]) -> u8 {
    let weighted: u32 = symbols
        .iter()
        .enumerate()
        .map(|(position, value)| position.max(1) as u32 * u32::from(*value))
        .sum();
    (weighted % 103) as u8
}

/// Decodes alternating bar/space pixel runs (first run is a bar) back to text.
/// 將交錯的黑條與空白像素長度（首段為黑條）解碼回文字。
pub fn decode_runs(runs: &[u32]) -> Result<String, BarcodeError> {
    if runs.len() < 19 || (runs.len() - 7) % 6 != 0 {
        return Err(BarcodeError::Unreadable);
    }

    let (body, stop) = runs.split_at(runs.len() - 7);
    let mut symbols = Vec::with_capacity(body.len() / 6);
    for chunk in body.chunks(6) {
        symbols.push(match_symbol(chunk, 11).ok_or(BarcodeError::Unreadable)?);
    }
    if match_symbol(stop, 13) != Some(STOP) {
        return Err(BarcodeError::Unreadable);
    }

    let (check, data) = symbols.split_last().ok_or(BarcodeError::Unreadable)?;
    if checksum(data) != *check {
        return Err(BarcodeError::Checksum);
    }

    let mut code_set_c = match data.first() {
        Some(&START_B) => false,
        Some(&START_C) => true,
        _ => return Err(BarcodeError::Unreadable),
    };
    let mut text = String::new();
    for symbol in &data[1..] {
        match (*symbol, code_set_c) {
            (CODE_C, false) => code_set_c = true,
            (CODE_B, true) => code_set_c = false,
            (value, true) if value < 100 => text.push_str(&format!("{value:02}")),
            (value, false) if value < 95 => text.push(char::from(value + b' ')),
            _ => return Err(BarcodeError::Unreadable),
        }
    }
    Ok(text)
}

fn match_symbol(runs: &[u32], modules: u32) -> Option<u8> {
    let total: u32 = runs.iter().sum();
    if total == 0 {
        return None;
    }
    let unit = total as f32 / modules as f32;
    let widths: String = runs
        .iter()
        .map(|run| {
            let width = (*run as f32 / unit).round().clamp(1.0, 4.0) as u8;
            char::from(b'0' + width)
        })
        .collect();
    PATTERNS
        .iter()
        .position(|pattern| *pattern == widths)
        .filter(|position| *position as u8 != START_A)
        .map(|position| position as u8)
}
