/// 单个 word 能容纳的最大碱基数（32 位整数，每碱基 2 bit）
pub const MAX_WORD_LENGTH: usize = 16;

const ALPHABET: &[u8; 4] = b"ACGT";

/// 碱基 → 2 bit 编码：A=00, C=01, G=10, T/U=11；其他字符为 None
#[inline]
pub fn encode_base(b: u8) -> Option<u32> {
    match b {
        b'A' | b'a' => Some(0),
        b'C' | b'c' => Some(1),
        b'G' | b'g' => Some(2),
        b'T' | b't' | b'U' | b'u' => Some(3),
        _ => None,
    }
}

/// 低 `2k` 位全为 1 的掩码
#[inline]
pub fn word_mask(k: usize) -> u32 {
    debug_assert!((1..=MAX_WORD_LENGTH).contains(&k));
    u32::MAX >> (32 - 2 * k)
}

/// 将长度为 k 的序列打包为 word；最新追加的碱基位于最低位。
/// 含非法碱基时返回 None。
pub fn encode_word(seq: &[u8]) -> Option<u32> {
    if seq.is_empty() || seq.len() > MAX_WORD_LENGTH {
        return None;
    }
    let mut word = 0u32;
    for &b in seq {
        word = (word << 2) | encode_base(b)?;
    }
    Some(word)
}

/// `encode_word` 的逆运算，高位碱基先输出
pub fn decode_word(mut word: u32, k: usize) -> Vec<u8> {
    let mut out = vec![0u8; k];
    for i in 0..k {
        out[k - 1 - i] = ALPHABET[(word & 3) as usize];
        word >>= 2;
    }
    out
}

pub fn normalize_seq(seq: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(seq.len());
    for &b in seq {
        let up = b.to_ascii_uppercase();
        let nb = match up {
            b'A' | b'C' | b'G' | b'T' | b'N' => up,
            b'U' => b'T',
            _ => b'N',
        };
        out.push(nb);
    }
    out
}

#[inline]
pub fn complement(base: u8) -> Option<u8> {
    match base.to_ascii_uppercase() {
        b'A' => Some(b'T'),
        b'C' => Some(b'G'),
        b'G' => Some(b'C'),
        b'T' | b'U' => Some(b'A'),
        _ => None,
    }
}

/// 一次遍历完成反向互补。无法互补的字符写为 `N`（保持长度），
/// 此时返回的 bool 为 false。
pub fn reverse_complement(seq: &[u8]) -> (Vec<u8>, bool) {
    let mut out = Vec::with_capacity(seq.len());
    let mut valid = true;
    for &b in seq.iter().rev() {
        match complement(b) {
            Some(c) => out.push(c),
            None => {
                out.push(b'N');
                valid = false;
            }
        }
    }
    (out, valid)
}
