use std::ops::Range;

use crate::index::table::WordTable;
use crate::util::dna;

/// 查询上的一个种子：长度为 k 的窗口及其在索引中的命中
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Seed {
    /// 种子在 query 上的起点
    pub offset: usize,
    /// 命中 word 的位置段（在 `locations` 中）；窗口含非法碱基或未命中时为 None
    pub hits: Option<Range<usize>>,
}

/// 从 query 的 `0, step, 2·step, …` 处提取种子，直到剩余长度不足 k。
/// 无法编码或索引中不存在的种子仍计入返回值。
pub fn extract_seeds(query: &[u8], table: &WordTable, step: usize) -> Vec<Seed> {
    let k = table.wordlength;
    let mut seeds = Vec::new();
    if k == 0 || step == 0 || query.len() < k {
        return seeds;
    }
    let mut pos = 0usize;
    while pos + k <= query.len() {
        let hits = dna::encode_word(&query[pos..pos + k])
            .and_then(|w| table.find(w))
            .map(|i| table.run(i));
        seeds.push(Seed { offset: pos, hits });
        pos += step;
    }
    seeds
}
