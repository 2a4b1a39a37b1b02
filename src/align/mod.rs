//! 近似比对：种子投票找候选，再用半全局编辑距离在参考窗口上验证。

pub mod candidate;
pub mod edit;
pub mod genome;
pub mod seed;

use std::fmt;
use std::io::Write;
use std::path::Path;

use anyhow::Context;
use log::{debug, info, trace, warn};
use rayon::prelude::*;

pub use candidate::{find_candidates, Candidate, Region, MAX_CANDIDATES, MAX_REGIONS};
pub use edit::{align, edit_distance, Alignment, EditBuffer};
pub use genome::{Chromosome, Genome, Window};

use crate::error::{Error, Result};
use crate::index::file::{read_index, GenomeIndex};
use crate::io::names::read_names;
use crate::io::reads::ReadSource;
use crate::util::dna;

/// 允许的最大错配（编辑距离）
pub const MAX_MISMATCHES: u32 = 10;
/// 种子步长上限
pub const MAX_STEP: usize = 10;
/// 每批并行处理的 read 数
const READ_BATCH: usize = 4096;

#[derive(Clone, Copy, Debug)]
pub struct MapOpt {
    pub mismatches: u32,
    pub step: usize,
    pub max_candidates: usize,
    /// 0 表示使用全部 CPU
    pub threads: usize,
}

impl Default for MapOpt {
    fn default() -> Self {
        Self { mismatches: 0, step: 5, max_candidates: MAX_CANDIDATES, threads: 1 }
    }
}

impl MapOpt {
    pub fn validate(&self) -> Result<()> {
        if self.mismatches > MAX_MISMATCHES {
            return Err(Error::Config(format!(
                "mismatches must be between 0 and {}, got {}",
                MAX_MISMATCHES, self.mismatches
            )));
        }
        if !(1..=MAX_STEP).contains(&self.step) {
            return Err(Error::Config(format!(
                "step must be between 1 and {}, got {}",
                MAX_STEP, self.step
            )));
        }
        if self.max_candidates == 0 {
            return Err(Error::Config("max candidates must be at least 1".to_string()));
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Strand {
    Forward,
    Reverse,
}

impl fmt::Display for Strand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Strand::Forward => "F",
            Strand::Reverse => "R",
        })
    }
}

/// 一条 read 的一个比对位置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hit {
    /// 在 [`Genome::chromosomes`] 中的下标
    pub chromosome: usize,
    /// 染色体内 0 起始坐标
    pub position: u32,
    pub distance: u32,
    pub strand: Strand,
}

/// 比对一条 read 的正链与反向互补链。
///
/// 结果按 (链, 染色体, 位置) 排序；同一位置同一条链只保留距离最小的一次。
pub fn map_read(
    index: &GenomeIndex,
    genome: &Genome,
    read: &[u8],
    opt: &MapOpt,
    buf: &mut EditBuffer,
) -> Result<Vec<Hit>> {
    let forward = dna::normalize_seq(read);
    let (reverse, _) = dna::reverse_complement(&forward);
    let lead = opt.mismatches as usize;

    let mut hits = Vec::new();
    for (strand, query) in [(Strand::Forward, &forward), (Strand::Reverse, &reverse)] {
        let cands = find_candidates(query, &index.table, opt.step, opt.mismatches, opt.max_candidates);
        if cands.len() >= opt.max_candidates {
            debug!("candidate limit {} reached on {} strand", opt.max_candidates, strand);
        }
        for cand in &cands {
            let Some(win) = genome.window(cand.loc, query.len(), lead)? else {
                debug!("candidate at {} runs past a sequence boundary, skipped", cand.loc);
                continue;
            };
            let aln = align(query, win.bases, lead, buf);
            if aln.distance > opt.mismatches {
                continue;
            }
            let chr = &genome.chromosomes()[win.chromosome];
            let position = win.start - chr.start + aln.ref_start as u32;
            trace!(
                "{}:{} {} d={} {}\n  {}\n  {}",
                chr.name,
                position,
                strand,
                aln.distance,
                aln.cigar,
                String::from_utf8_lossy(&aln.query_aln),
                String::from_utf8_lossy(&aln.ref_aln),
            );
            hits.push(Hit { chromosome: win.chromosome, position, distance: aln.distance, strand });
        }
    }

    hits.sort_by_key(|h| (h.strand, h.chromosome, h.position, h.distance));
    hits.dedup_by_key(|h| (h.strand, h.chromosome, h.position));
    Ok(hits)
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MapStats {
    pub reads: u64,
    pub mapped: u64,
    pub hits: u64,
}

/// 按输入顺序写出一条 read 的结果：每个命中一行 `idx\tchr\tpos\tdist\tF|R`，
/// 无命中时 `idx\t-`
pub fn write_hits<W: Write>(
    out: &mut W,
    qidx: u64,
    hits: &[Hit],
    genome: &Genome,
) -> std::io::Result<()> {
    if hits.is_empty() {
        return writeln!(out, "{}\t-", qidx);
    }
    for h in hits {
        writeln!(
            out,
            "{}\t{}\t{}\t{}\t{}",
            qidx,
            genome.chromosomes()[h.chromosome].name,
            h.position,
            h.distance,
            h.strand
        )?;
    }
    Ok(())
}

/// 载入索引与名称文件，比对 `reads_path` 中的全部 read。
///
/// read 按批读取，批内并行比对（每个工作线程复用一个 [`EditBuffer`]），按输入顺序输出。
/// 空 read 占用一个序号但不输出。
pub fn map_reads(
    index_path: &Path,
    names_path: &Path,
    reads_path: &Path,
    out_path: Option<&Path>,
    opt: MapOpt,
) -> anyhow::Result<MapStats> {
    opt.validate()?;

    let index = read_index(index_path)?;
    info!(
        "loaded index {}: k={}, {} words, {} locations",
        index_path.display(),
        index.wordlength(),
        index.table.words.len(),
        index.table.locations.len()
    );
    let names = read_names(names_path)?;
    check_names(&index, &names);
    let genome = Genome::new(names);

    let mut reads = ReadSource::open(reads_path)?;

    let mut out: Box<dyn Write> = if let Some(p) = out_path {
        let f = std::fs::File::create(p)
            .with_context(|| format!("cannot create output '{}'", p.display()))?;
        Box::new(std::io::BufWriter::new(f))
    } else {
        Box::new(std::io::BufWriter::new(std::io::stdout()))
    };

    let pool = rayon::ThreadPoolBuilder::new().num_threads(opt.threads).build()?;
    let mut stats = MapStats::default();
    loop {
        let batch = reads.next_batch(READ_BATCH)?;
        if batch.is_empty() {
            break;
        }
        let results: Vec<Option<Vec<Hit>>> = pool.install(|| {
            batch
                .par_iter()
                .map_init(EditBuffer::new, |buf, read| {
                    if read.is_empty() {
                        return Ok(None);
                    }
                    map_read(&index, &genome, read, &opt, buf).map(Some)
                })
                .collect::<Result<_>>()
        })?;

        for hits in results {
            let qidx = stats.reads;
            stats.reads += 1;
            let Some(hits) = hits else {
                continue;
            };
            if !hits.is_empty() {
                stats.mapped += 1;
                stats.hits += hits.len() as u64;
            }
            write_hits(&mut out, qidx, &hits, &genome)?;
        }
        debug!("{} reads processed", stats.reads);
    }
    out.flush()?;

    info!("{} reads, {} mapped, {} hits", stats.reads, stats.mapped, stats.hits);
    Ok(stats)
}

/// 名称文件与索引头中的序列表不一致时只告警：比对以名称文件为准
fn check_names(index: &GenomeIndex, names: &[crate::index::builder::SequenceRecord]) {
    let header = &index.header.sequences;
    if header.len() != names.len() {
        warn!(
            "index lists {} sequences but names file has {}",
            header.len(),
            names.len()
        );
        return;
    }
    for (h, n) in header.iter().zip(names) {
        if h.name != n.name || h.start != n.start {
            warn!(
                "sequence mismatch: index has {}@{}, names file has {}@{}",
                h.name, h.start, n.name, n.start
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::builder::{BuildOpt, IndexBuilder};
    use crate::index::file::{IndexHeader, SequenceEntry};
    use std::fs;

    fn setup(fasta: &[u8], k: usize) -> (tempfile::TempDir, GenomeIndex, Genome) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ref.fa");
        fs::write(&path, fasta).unwrap();
        let built = IndexBuilder::new(BuildOpt { word_length: k, threads: 1 })
            .unwrap()
            .build_files(&[&path])
            .unwrap();
        let sequences: Vec<SequenceEntry> = built
            .sequences
            .iter()
            .map(|r| SequenceEntry { name: r.name.clone(), start: r.start })
            .collect();
        let header = IndexHeader {
            wordsize: k as i32,
            nwords: built.table.words.len() as u32,
            nlocations: built.table.locations.len() as u32,
            sequences,
        };
        let index = GenomeIndex { header, table: built.table };
        (dir, index, Genome::new(built.sequences))
    }

    const CHR1: &[u8] = b"TTGACCGTAGGCTAACGTTAGCCATGCAAGTCCGATGGTACTAGCATCGGA";

    fn fasta_of(seqs: &[(&str, &[u8])]) -> Vec<u8> {
        let mut out = Vec::new();
        for (name, seq) in seqs {
            out.extend_from_slice(format!(">{}\n", name).as_bytes());
            out.extend_from_slice(seq);
            out.push(b'\n');
        }
        out
    }

    #[test]
    fn validate_limits() {
        assert!(MapOpt::default().validate().is_ok());
        assert!(MapOpt { mismatches: 11, ..Default::default() }.validate().is_err());
        assert!(MapOpt { step: 0, ..Default::default() }.validate().is_err());
        assert!(MapOpt { step: 11, ..Default::default() }.validate().is_err());
        assert!(MapOpt { max_candidates: 0, ..Default::default() }.validate().is_err());
    }

    #[test]
    fn exact_forward_hit() {
        let (_dir, index, genome) = setup(&fasta_of(&[("chr1", CHR1)]), 6);
        let opt = MapOpt { step: 3, ..Default::default() };
        let hits = map_read(&index, &genome, &CHR1[10..34], &opt, &mut EditBuffer::new()).unwrap();
        assert_eq!(hits, vec![Hit { chromosome: 0, position: 10, distance: 0, strand: Strand::Forward }]);
    }

    #[test]
    fn reverse_strand_hit() {
        let (_dir, index, genome) = setup(&fasta_of(&[("chr1", CHR1)]), 6);
        let (rc, _) = dna::reverse_complement(&CHR1[10..34]);
        let opt = MapOpt { step: 3, ..Default::default() };
        let hits = map_read(&index, &genome, &rc, &opt, &mut EditBuffer::new()).unwrap();
        assert_eq!(hits, vec![Hit { chromosome: 0, position: 10, distance: 0, strand: Strand::Reverse }]);
    }

    #[test]
    fn substitution_within_budget() {
        let (_dir, index, genome) = setup(&fasta_of(&[("chr1", CHR1)]), 5);
        let mut read = CHR1[5..35].to_vec();
        read[15] = if read[15] == b'A' { b'C' } else { b'A' };
        let mut buf = EditBuffer::new();

        let opt = MapOpt { mismatches: 1, step: 5, ..Default::default() };
        let hits = map_read(&index, &genome, &read, &opt, &mut buf).unwrap();
        assert!(hits.contains(&Hit { chromosome: 0, position: 5, distance: 1, strand: Strand::Forward }));
        assert!(hits.iter().all(|h| h.distance <= 1));

        let opt = MapOpt { mismatches: 0, step: 5, ..Default::default() };
        assert!(map_read(&index, &genome, &read, &opt, &mut buf).unwrap().is_empty());
    }

    #[test]
    fn hit_on_second_sequence_uses_local_coordinates() {
        let chr2 = &CHR1[..30];
        let other = b"GGGGCCCCGGGGCCCCAAAATTTTAAAATTTT";
        let (_dir, index, genome) = setup(&fasta_of(&[("a", other), ("b", chr2)]), 6);
        let opt = MapOpt { step: 3, ..Default::default() };
        let hits = map_read(&index, &genome, &chr2[4..28], &opt, &mut EditBuffer::new()).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(genome.chromosomes()[hits[0].chromosome].name, "b");
        assert_eq!(hits[0].position, 4);
    }

    #[test]
    fn read_overhanging_sequence_end_is_skipped() {
        let (_dir, index, genome) = setup(&fasta_of(&[("chr1", CHR1)]), 6);
        let opt = MapOpt { mismatches: 2, step: 3, ..Default::default() };
        // 窗口需要 read 右侧再多 2 个碱基，末端 read 无法验证
        let read = &CHR1[CHR1.len() - 20..];
        assert!(map_read(&index, &genome, read, &opt, &mut EditBuffer::new()).unwrap().is_empty());
    }

    #[test]
    fn output_lines() {
        let p = std::path::PathBuf::from("g.fa");
        let genome = Genome::new(vec![crate::index::builder::SequenceRecord {
            name: "chr7".to_string(),
            file: p,
            start: 0,
        }]);
        let mut out = Vec::new();
        write_hits(&mut out, 3, &[], &genome).unwrap();
        let hits = [
            Hit { chromosome: 0, position: 12, distance: 0, strand: Strand::Forward },
            Hit { chromosome: 0, position: 40, distance: 2, strand: Strand::Reverse },
        ];
        write_hits(&mut out, 4, &hits, &genome).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "3\t-\n4\tchr7\t12\t0\tF\n4\tchr7\t40\t2\tR\n");
    }
}
