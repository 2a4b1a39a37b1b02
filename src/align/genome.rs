//! 比对阶段的参考序列视图：按需从原始 FASTA 加载染色体，并切出候选窗口。

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use log::debug;

use crate::error::{Error, Result};
use crate::index::builder::{default_name, RawRecord, RecordScanner, SequenceRecord};
use crate::util::dna;

#[derive(Debug)]
pub struct Chromosome {
    pub name: String,
    pub file: PathBuf,
    /// 全局坐标起点
    pub start: u32,
    /// 在源文件中是第几条记录
    pub ordinal: usize,
    sequence: OnceLock<std::result::Result<Vec<u8>, String>>,
}

impl Chromosome {
    pub fn new(record: SequenceRecord, ordinal: usize) -> Self {
        Self {
            name: record.name,
            file: record.file,
            start: record.start,
            ordinal,
            sequence: OnceLock::new(),
        }
    }

    /// 规范化后的序列，首次访问时从源文件加载；加载失败的结果同样被缓存
    pub fn sequence(&self) -> Result<&[u8]> {
        self.sequence
            .get_or_init(|| load_sequence(&self.file, &self.name, self.ordinal))
            .as_deref()
            .map_err(|detail| Error::format(&self.file, detail.clone()))
    }
}

/// 按建索引时的记录划分读取源文件，取第 `ordinal` 条记录。
///
/// 该记录名称不符时按名称查找：唯一匹配则使用，多条同名为错误；
/// 无匹配且文件只有一条记录时直接使用。
fn load_sequence(path: &Path, name: &str, ordinal: usize) -> std::result::Result<Vec<u8>, String> {
    let data = std::fs::read(path).map_err(|e| format!("cannot read: {}", e))?;
    let stem = default_name(path);
    let mut records: Vec<RawRecord> = RecordScanner::new(&data, &stem).collect();

    let pick = if records.get(ordinal).is_some_and(|r| r.name == name) {
        ordinal
    } else {
        let named: Vec<usize> = (0..records.len()).filter(|&i| records[i].name == name).collect();
        match (named.as_slice(), records.len()) {
            ([i], _) => *i,
            ([], 1) => {
                debug!("'{}' not named in {}, using its only record", name, path.display());
                0
            }
            ([], 0) => return Err("no sequence records".to_string()),
            ([], n) => return Err(format!("no record named '{}' among {} records", name, n)),
            (many, _) => {
                return Err(format!("{} records named '{}', cannot tell them apart", many.len(), name))
            }
        }
    };
    let seq = std::mem::take(&mut records[pick].seq);
    debug!("loaded '{}' from {} ({} bp)", name, path.display(), seq.len());
    Ok(dna::normalize_seq(&seq))
}

/// 参考序列窗口
#[derive(Debug, Clone, Copy)]
pub struct Window<'a> {
    /// 在 [`Genome::chromosomes`] 中的下标
    pub chromosome: usize,
    /// 窗口首碱基的全局坐标
    pub start: u32,
    pub bases: &'a [u8],
}

#[derive(Debug, Default)]
pub struct Genome {
    chromosomes: Vec<Chromosome>,
}

impl Genome {
    /// 按起点排序；同一文件内的先后顺序即记录序号
    pub fn new(mut records: Vec<SequenceRecord>) -> Self {
        records.sort_by_key(|r| r.start);
        let mut seen: HashMap<PathBuf, usize> = HashMap::new();
        let chromosomes = records
            .into_iter()
            .map(|r| {
                let n = seen.entry(r.file.clone()).or_insert(0);
                let ordinal = *n;
                *n += 1;
                Chromosome::new(r, ordinal)
            })
            .collect();
        Self { chromosomes }
    }

    pub fn chromosomes(&self) -> &[Chromosome] {
        &self.chromosomes
    }

    /// 包含全局坐标 `loc` 的染色体：起点不大于 `loc` 的最后一条
    pub fn locate(&self, loc: u32) -> Option<usize> {
        let n = self.chromosomes.partition_point(|c| c.start <= loc);
        n.checked_sub(1)
    }

    /// 候选锚点 `anchor` 两侧各扩展 `lead` 的窗口，长度 `qlen + 2·lead`。
    /// 窗口越出染色体任一端时返回 `Ok(None)`。
    pub fn window(&self, anchor: u32, qlen: usize, lead: usize) -> Result<Option<Window<'_>>> {
        let Some(ci) = self.locate(anchor) else {
            return Ok(None);
        };
        let chr = &self.chromosomes[ci];
        let offset = (anchor - chr.start) as usize;
        let Some(wstart) = offset.checked_sub(lead) else {
            return Ok(None);
        };
        let seq = chr.sequence()?;
        let wend = wstart + qlen + 2 * lead;
        if wend > seq.len() {
            return Ok(None);
        }
        Ok(Some(Window {
            chromosome: ci,
            start: chr.start + wstart as u32,
            bases: &seq[wstart..wend],
        }))
    }
}
