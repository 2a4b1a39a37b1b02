use std::path::{Path, PathBuf};

use log::{debug, info};
use rayon::prelude::*;

use super::table::WordTable;
use crate::error::{Error, Result};
use crate::util::dna::{self, MAX_WORD_LENGTH};

/// 两条无关序列之间插入的坐标间隔，大于任何支持的 k 与 read 长度
pub const SEQUENCE_GAP: u32 = 10_000;

/// 一条输入序列在全局坐标中的起点
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceRecord {
    pub name: String,
    pub file: PathBuf,
    pub start: u32,
}

/// 单段数据的抽取结果，坐标相对于 `base`
#[derive(Debug, Default)]
pub struct Extraction {
    pub table: WordTable,
    /// (名称, 起点)
    pub sequences: Vec<(String, u32)>,
    /// 抽取结束时的坐标计数器
    pub end: u64,
}

#[derive(Clone, Copy, Debug)]
pub struct BuildOpt {
    pub word_length: usize,
    /// 0 表示使用全部 CPU
    pub threads: usize,
}

impl BuildOpt {
    pub fn validate(&self) -> Result<()> {
        if !(1..=MAX_WORD_LENGTH).contains(&self.word_length) {
            return Err(Error::Config(format!(
                "word length must be between 1 and {}, got {}",
                MAX_WORD_LENGTH, self.word_length
            )));
        }
        Ok(())
    }
}

/// 构建完成的全局索引
#[derive(Debug)]
pub struct BuiltIndex {
    pub table: WordTable,
    pub sequences: Vec<SequenceRecord>,
}

/// FASTA 中参与坐标计数的字节：header 行以外的非空白字节
#[inline]
pub fn is_sequence_byte(b: u8) -> bool {
    !b.is_ascii_whitespace()
}

/// FASTA 字节流中的一条记录：名称，以及 header 之外的非空白字节（未规范化）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord {
    pub name: String,
    pub seq: Vec<u8>,
}

/// 按参考序列的坐标规则划分记录，建索引与比对时加载染色体共用：
///
/// - 任意位置的 `>` 开始一个 header，直到行尾；行内首个空白前的内容为名称
/// - header 之外的非空白字节属于当前记录（包括非法字符）
/// - 首个 header 之前若有序列内容，记为名为 `default_name` 的记录
pub struct RecordScanner<'a> {
    data: &'a [u8],
    pos: usize,
    default_name: &'a str,
}

impl<'a> RecordScanner<'a> {
    pub fn new(data: &'a [u8], default_name: &'a str) -> Self {
        Self { data, pos: 0, default_name }
    }

    /// 从 `pos` 收集序列字节，直到下一个 `>` 或末尾
    fn take_sequence(&mut self) -> Vec<u8> {
        let rest = &self.data[self.pos..];
        let len = rest.iter().position(|&b| b == b'>').unwrap_or(rest.len());
        self.pos += len;
        rest[..len].iter().copied().filter(|&b| is_sequence_byte(b)).collect()
    }
}

impl Iterator for RecordScanner<'_> {
    type Item = RawRecord;

    fn next(&mut self) -> Option<RawRecord> {
        if self.pos == 0 {
            let seq = self.take_sequence();
            if !seq.is_empty() {
                return Some(RawRecord { name: self.default_name.to_string(), seq });
            }
        }
        if self.pos >= self.data.len() {
            return None;
        }
        // data[pos] == b'>'
        let rest = &self.data[self.pos + 1..];
        let line = rest.iter().position(|&b| b == b'\n').unwrap_or(rest.len());
        let name = header_name(&rest[..line], self.default_name);
        self.pos = (self.pos + 1 + line + 1).min(self.data.len());
        let seq = self.take_sequence();
        Some(RawRecord { name, seq })
    }
}

/// 无 header 内容的默认序列名：文件名去掉扩展名
pub fn default_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "seq".to_string())
}

/// 从原始字节流中抽取所有长度为 k 的 word。
///
/// 记录由 [`RecordScanner`] 划分；第二条及之后的记录前，计数器加 [`SEQUENCE_GAP`]。
/// 每个序列字节计数器加 1，非法字符重置滚动 word（与染色体加载时的坐标一致）。
/// 连续 k 个合法碱基构成一个窗口，位置为窗口首碱基的坐标。
pub fn extract(data: &[u8], k: usize, base: u64, default_name: &str) -> Result<Extraction> {
    let mask = dna::word_mask(k);
    let mut out = Extraction { table: WordTable::new(k), ..Default::default() };

    let mut pos = base;
    for (i, record) in RecordScanner::new(data, default_name).enumerate() {
        if i > 0 {
            pos += u64::from(SEQUENCE_GAP);
        }
        out.sequences.push((record.name, to_u32(pos)?));

        let mut word = 0u32;
        let mut m = 0usize;
        for &b in &record.seq {
            match dna::encode_base(b) {
                Some(v) => {
                    word = ((word << 2) | v) & mask;
                    m += 1;
                    if m >= k {
                        let loc = pos + 1 - k as u64;
                        out.table.push(word, to_u32(loc)?);
                    }
                }
                None => {
                    word = 0;
                    m = 0;
                }
            }
            pos += 1;
        }
    }
    out.end = pos;
    Ok(out)
}

fn header_name(raw: &[u8], default_name: &str) -> String {
    let text = String::from_utf8_lossy(raw);
    match text.split_whitespace().next() {
        Some(name) => name.to_string(),
        None => default_name.to_string(),
    }
}

fn to_u32(v: u64) -> Result<u32> {
    u32::try_from(v).map_err(|_| Error::CoordinateOverflow(v))
}

pub struct IndexBuilder {
    opt: BuildOpt,
}

impl IndexBuilder {
    pub fn new(opt: BuildOpt) -> Result<Self> {
        opt.validate()?;
        Ok(Self { opt })
    }

    /// 从多个 FASTA 文件构建全局索引。
    ///
    /// 各文件并行读取、抽取并排序（各自的局部坐标），
    /// 文件基址按顺序累加，最后依次 `merge` 进全局表。
    pub fn build_files<P: AsRef<Path> + Sync>(&self, paths: &[P]) -> Result<BuiltIndex> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.opt.threads)
            .build()?;
        pool.install(|| self.build_in_pool(paths))
    }

    fn build_in_pool<P: AsRef<Path> + Sync>(&self, paths: &[P]) -> Result<BuiltIndex> {
        let k = self.opt.word_length;
        let mut parts: Vec<(PathBuf, Extraction)> = paths
            .par_iter()
            .map(|p| {
                let path = p.as_ref();
                let data = std::fs::read(path).map_err(|e| Error::io(path, e))?;
                let ex = extract(&data, k, 0, &default_name(path))?;
                debug!("{}: {} bytes, {} words", path.display(), data.len(), ex.table.words.len());
                Ok((path.to_path_buf(), ex))
            })
            .collect::<Result<_>>()?;

        let bases = file_bases(&parts)?;
        let mut sequences = Vec::new();
        for ((path, ex), &base) in parts.iter().zip(&bases) {
            for (name, start) in &ex.sequences {
                sequences.push(SequenceRecord {
                    name: name.clone(),
                    file: path.clone(),
                    start: to_u32(u64::from(*start) + base)?,
                });
            }
        }

        parts
            .par_iter_mut()
            .zip(bases.par_iter())
            .for_each(|((_, ex), &base)| {
                let shift = base as u32;
                if shift > 0 {
                    for loc in ex.table.locations.iter_mut() {
                        *loc += shift;
                    }
                }
                ex.table.finalize();
            });

        let mut table = WordTable::new(k);
        for (path, ex) in parts {
            let n = ex.table.words.len();
            table.merge(ex.table)?;
            info!(
                "merged {} ({} unique words); index now {} words, {} locations",
                path.display(),
                n,
                table.words.len(),
                table.locations.len()
            );
        }
        Ok(BuiltIndex { table, sequences })
    }
}

/// 各文件在全局坐标中的基址：前一文件基址 + 跨度，有内容时再加间隔
fn file_bases(parts: &[(PathBuf, Extraction)]) -> Result<Vec<u64>> {
    let mut bases = Vec::with_capacity(parts.len());
    let mut next = 0u64;
    let mut any = false;
    for (_, ex) in parts {
        let has_content = !ex.sequences.is_empty();
        if any && has_content {
            next += u64::from(SEQUENCE_GAP);
        }
        bases.push(next);
        next += ex.end;
        any |= has_content;
        // 最后一个位置必须能用 u32 表示
        to_u32(next)?;
    }
    Ok(bases)
}
