use std::ops::Range;

use super::radix;
use crate::error::{Error, Result};

/// k-mer 索引表（CSR 布局）：
/// - `words`：去重后严格递增的 word
/// - `starts[i]`：word i 的位置列表在 `locations` 中的起点，最后一段延伸到 `locations.len()`
/// - `locations`：按 word 分段，每段内升序
///
/// 抽取阶段 `starts` 为空，`words` 与 `locations` 一一对应（未排序、可重复），
/// 调用 [`WordTable::finalize`] 后进入上述布局。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WordTable {
    pub wordlength: usize,
    pub words: Vec<u32>,
    pub starts: Vec<u32>,
    pub locations: Vec<u32>,
}

impl WordTable {
    pub fn new(wordlength: usize) -> Self {
        Self { wordlength, ..Default::default() }
    }

    /// 抽取阶段追加一个 (word, location)
    #[inline]
    pub fn push(&mut self, word: u32, location: u32) {
        self.words.push(word);
        self.locations.push(location);
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// 排序 + 去重 + 段内排序
    pub fn finalize(&mut self) {
        self.sort_dedup();
        self.sort_location_runs();
    }

    /// 对 (word, location) 对做基数排序，然后把相同 word 压缩为一项，
    /// `starts` 取各段长度的前缀和。
    pub fn sort_dedup(&mut self) {
        let n = self.words.len();
        if n == 0 {
            self.starts.clear();
            return;
        }
        radix::sort_words(&mut self.words, Some(&mut self.locations[..]), self.wordlength);

        self.starts.clear();
        let mut wi = 0usize;
        for ri in 0..n {
            if ri == 0 || self.words[ri] != self.words[ri - 1] {
                self.words[wi] = self.words[ri];
                self.starts.push(ri as u32);
                wi += 1;
            }
        }
        self.words.truncate(wi);
    }

    /// 抽取顺序不一定是位置顺序，逐段恢复升序
    pub fn sort_location_runs(&mut self) {
        for i in 0..self.words.len() {
            let run = self.run(i);
            if run.len() > 1 {
                radix::radix_sort(&mut self.locations[run], None, 24);
            }
        }
    }

    /// word i 的位置段 `[starts[i], starts[i+1])`
    #[inline]
    pub fn run(&self, i: usize) -> Range<usize> {
        let start = self.starts[i] as usize;
        let end = match self.starts.get(i + 1) {
            Some(&s) => s as usize,
            None => self.locations.len(),
        };
        start..end
    }

    #[inline]
    pub fn run_locations(&self, i: usize) -> &[u32] {
        &self.locations[self.run(i)]
    }

    /// 二分查找 word，返回其下标
    pub fn find(&self, word: u32) -> Option<usize> {
        search_word(word, &self.words)
    }

    /// 把另一张已 finalize 的表并入本表。
    ///
    /// 先统计仅出现在 `incoming` 中的新 word 数量，把本表扩容到最终大小，
    /// 然后从最高下标向下写（逆向双指针），因此可以原地合并而不覆盖尚未读取的数据。
    /// 相同 word 的两段位置做归并，保持升序。
    pub fn merge(&mut self, incoming: WordTable) -> Result<()> {
        if incoming.is_empty() {
            return Ok(());
        }
        if self.wordlength != incoming.wordlength {
            return Err(Error::WordLengthMismatch {
                expected: self.wordlength,
                found: incoming.wordlength,
            });
        }
        if self.is_empty() {
            *self = incoming;
            return Ok(());
        }

        let nw_a = self.words.len();
        let nw_b = incoming.words.len();
        let nloc_a = self.locations.len();
        let nloc_b = incoming.locations.len();

        let mut count_new = 0usize;
        let (mut i, mut j) = (0usize, 0usize);
        while i < nw_b {
            if j < nw_a && self.words[j] == incoming.words[i] {
                i += 1;
                j += 1;
            } else if j < nw_a && self.words[j] < incoming.words[i] {
                j += 1;
            } else {
                i += 1;
                count_new += 1;
            }
        }

        let total_words = nw_a + count_new;
        let total_locs = nloc_a + nloc_b;
        self.words.resize(total_words, 0);
        self.starts.resize(total_words, 0);
        self.locations.resize(total_locs, 0);

        // j / i 为两侧尚未消费的 word 数；a_end / b_end 为其位置段的当前上界。
        // 输出下标 k 始终 ≥ j，starts[j] 在写 starts[k] 之前读取。
        let mut j = nw_a;
        let mut i = nw_b;
        let mut a_end = nloc_a;
        let mut b_end = nloc_b;
        let mut w = total_locs;
        let mut k = total_words;

        while k > 0 {
            k -= 1;
            let take_a = j > 0 && (i == 0 || self.words[j - 1] > incoming.words[i - 1]);
            let equal = j > 0 && i > 0 && self.words[j - 1] == incoming.words[i - 1];

            if equal {
                let word = self.words[j - 1];
                let a_start = self.starts[j - 1] as usize;
                let b_start = incoming.starts[i - 1] as usize;
                let (mut pa, mut pb) = (a_end, b_end);
                while pb > b_start {
                    if pa > a_start && self.locations[pa - 1] > incoming.locations[pb - 1] {
                        w -= 1;
                        self.locations[w] = self.locations[pa - 1];
                        pa -= 1;
                    } else {
                        w -= 1;
                        self.locations[w] = incoming.locations[pb - 1];
                        pb -= 1;
                    }
                }
                // 剩余的 a 段已在正确位置左侧，整体右移
                while pa > a_start {
                    w -= 1;
                    self.locations[w] = self.locations[pa - 1];
                    pa -= 1;
                }
                self.words[k] = word;
                self.starts[k] = w as u32;
                a_end = a_start;
                b_end = b_start;
                j -= 1;
                i -= 1;
            } else if take_a {
                let word = self.words[j - 1];
                let a_start = self.starts[j - 1] as usize;
                let len = a_end - a_start;
                w -= len;
                self.locations.copy_within(a_start..a_end, w);
                self.words[k] = word;
                self.starts[k] = w as u32;
                a_end = a_start;
                j -= 1;
            } else {
                let b_start = incoming.starts[i - 1] as usize;
                let len = b_end - b_start;
                w -= len;
                self.locations[w..w + len].copy_from_slice(&incoming.locations[b_start..b_end]);
                self.words[k] = incoming.words[i - 1];
                self.starts[k] = w as u32;
                b_end = b_start;
                i -= 1;
            }
        }
        debug_assert_eq!(w, 0);
        Ok(())
    }

    /// 检查 CSR 不变量；返回首个违例的描述
    pub fn check(&self) -> std::result::Result<(), String> {
        if self.starts.len() != self.words.len() {
            return Err(format!(
                "{} words but {} starts",
                self.words.len(),
                self.starts.len()
            ));
        }
        if let Some(p) = self.words.windows(2).position(|w| w[0] >= w[1]) {
            return Err(format!("words not strictly increasing at index {}", p + 1));
        }
        if let Some(&s0) = self.starts.first() {
            if s0 != 0 {
                return Err(format!("first start is {} instead of 0", s0));
            }
        }
        if let Some(p) = self.starts.windows(2).position(|s| s[0] > s[1]) {
            return Err(format!("starts decrease at index {}", p + 1));
        }
        if let Some(&last) = self.starts.last() {
            if last as usize > self.locations.len() {
                return Err(format!(
                    "last start {} exceeds location count {}",
                    last,
                    self.locations.len()
                ));
            }
        }
        Ok(())
    }
}

/// 在严格递增的 `words` 中二分查找
pub fn search_word(word: u32, words: &[u32]) -> Option<usize> {
    if words.is_empty() {
        return None;
    }
    let (mut s, mut e) = (0usize, words.len());
    while e - s > 1 {
        let m = (s + e) / 2;
        if words[m] <= word {
            s = m;
        } else {
            e = m;
        }
    }
    (words[s] == word).then_some(s)
}
