use log::trace;

use super::seed::{extract_seeds, Seed};
use crate::index::table::WordTable;

/// 每个候选最多记录的区域数
pub const MAX_REGIONS: usize = 4;
/// 每条 query（每条链）最多接受的候选数
pub const MAX_CANDIDATES: usize = 10_000;

/// query 上尚未被确认种子覆盖的区间 `[qstart, qend)`，`loc` 为 qstart 对应的基因组坐标
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub qstart: usize,
    pub qend: usize,
    pub loc: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// 锚点：query 首碱基对应的基因组坐标
    pub loc: u32,
    /// 未确认该锚点的种子数
    pub mismatches: u32,
    pub length: usize,
    pub regions: Vec<Region>,
}

impl Candidate {
    fn new(loc: u32, length: usize) -> Self {
        let mut regions = Vec::with_capacity(MAX_REGIONS);
        regions.push(Region { qstart: 0, qend: length, loc });
        Self { loc, mismatches: 0, length, regions }
    }

    /// 用一个确认种子覆盖的区间 `[sloc, sloc + k)` 切分最后一个区域
    fn cover(&mut self, sloc: usize, k: usize) {
        let anchor = self.loc;
        let Some(last) = self.regions.last_mut() else {
            return;
        };
        let send = sloc + k;
        if sloc > last.qstart && send < last.qend {
            // 落在区域内部：拆分；达到上限时丢弃右半部分
            let qend = last.qend;
            last.qend = sloc;
            if self.regions.len() < MAX_REGIONS {
                self.regions.push(Region {
                    qstart: send,
                    qend,
                    loc: anchor.saturating_add(send as u32),
                });
            }
        } else if sloc > last.qstart {
            last.qend = last.qend.min(sloc);
        } else if send < last.qend {
            last.qstart = last.qstart.max(send);
            last.loc = anchor.saturating_add(last.qstart as u32);
        } else {
            // 整个区域被覆盖
            self.regions.pop();
        }
    }
}

/// 种子数与允许错配数决定的最少确认种子数（至少为 1）。
/// 一个错配最多破坏 ceil(k/step) 个种子。
pub fn seed_cutoff(nseeds: usize, k: usize, step: usize, mismatches: u32) -> usize {
    let per_mismatch = if k % step == 0 { k / step } else { k / step + 1 };
    let cutoff = nseeds as i64 - (per_mismatch as i64) * i64::from(mismatches);
    cutoff.max(1) as usize
}

/// 查找 query 的候选位置。
///
/// 每个种子持有一个指向其位置段的游标；每轮选出投影锚点（位置 − 种子偏移）最小的种子，
/// 再扫描所有种子，锚点落在 `±mismatches` 内的种子确认该候选并前进游标。
/// 确认数达到 [`seed_cutoff`] 时接受候选；候选数达到 `max_candidates` 或所有段耗尽时停止。
pub fn find_candidates(
    query: &[u8],
    table: &WordTable,
    step: usize,
    mismatches: u32,
    max_candidates: usize,
) -> Vec<Candidate> {
    let seeds = extract_seeds(query, table, step);
    find_candidates_with_seeds(query.len(), &seeds, table, step, mismatches, max_candidates)
}

pub fn find_candidates_with_seeds(
    qlen: usize,
    seeds: &[Seed],
    table: &WordTable,
    step: usize,
    mismatches: u32,
    max_candidates: usize,
) -> Vec<Candidate> {
    let k = table.wordlength;
    let mut out = Vec::new();
    if seeds.is_empty() {
        return out;
    }
    let cutoff = seed_cutoff(seeds.len(), k, step, mismatches);
    trace!("{} seeds, cutoff {}", seeds.len(), cutoff);

    // 游标 [pos, end)
    let mut cursors: Vec<(usize, usize)> = seeds
        .iter()
        .map(|s| s.hits.as_ref().map_or((0, 0), |r| (r.start, r.end)))
        .collect();
    let anchor_of = |i: usize, pos: usize| -> i64 {
        i64::from(table.locations[pos]) - seeds[i].offset as i64
    };
    let mm = i64::from(mismatches);

    while out.len() < max_candidates {
        let mut min: Option<i64> = None;
        for (i, &(pos, end)) in cursors.iter().enumerate() {
            if pos < end {
                let a = anchor_of(i, pos);
                if min.map_or(true, |m| a < m) {
                    min = Some(a);
                }
            }
        }
        let Some(min) = min else {
            break;
        };

        let mut found = 0usize;
        let mut confirming: Vec<usize> = Vec::new();
        for (i, cur) in cursors.iter_mut().enumerate() {
            if cur.0 < cur.1 {
                let delta = anchor_of(i, cur.0) - min;
                if (-mm..=mm).contains(&delta) {
                    found += 1;
                    confirming.push(seeds[i].offset);
                    cur.0 += 1;
                }
            }
        }

        // 锚点在坐标 0 之前：read 伸出基因组起点，无法比对
        if min < 0 || found < cutoff {
            continue;
        }
        let mut cand = Candidate::new(min as u32, qlen);
        for sloc in confirming {
            cand.cover(sloc, k);
        }
        cand.mismatches = (seeds.len() - found) as u32;
        trace!("candidate at {} confirmed by {} seeds", cand.loc, found);
        out.push(cand);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::builder::extract;

    fn build_table(seq: &[u8], k: usize) -> WordTable {
        let mut data = b">chr1\n".to_vec();
        data.extend_from_slice(seq);
        let mut t = extract(&data, k, 0, "x").unwrap().table;
        t.finalize();
        t
    }

    const GENOME: &[u8] = b"TTGACCGTAGGCTAACGTTAGCCATGCAAGTCCGATGGTACTAGCATCGGA";

    #[test]
    fn cutoff_formula() {
        assert_eq!(seed_cutoff(10, 8, 4, 0), 10);
        assert_eq!(seed_cutoff(10, 8, 4, 2), 6);
        assert_eq!(seed_cutoff(10, 8, 3, 2), 4);
        assert_eq!(seed_cutoff(3, 8, 1, 5), 1);
    }

    #[test]
    fn exact_substring_yields_single_candidate() {
        let t = build_table(GENOME, 6);
        let query = &GENOME[10..34];
        let cands = find_candidates(query, &t, 3, 0, MAX_CANDIDATES);
        assert_eq!(cands.len(), 1);
        assert_eq!(cands[0].loc, 10);
        assert_eq!(cands[0].mismatches, 0);
        assert_eq!(cands[0].length, 24);
    }

    #[test]
    fn one_mismatch_still_found() {
        let t = build_table(GENOME, 5);
        let mut query = GENOME[5..35].to_vec();
        query[15] = if query[15] == b'A' { b'C' } else { b'A' };
        let cands = find_candidates(&query, &t, 5, 1, MAX_CANDIDATES);
        assert!(cands.iter().any(|c| c.loc == 5));
        let c = cands.iter().find(|c| c.loc == 5).unwrap();
        assert_eq!(c.mismatches, 1);
        // 被破坏的种子 [15,20) 仍在未覆盖区域中
        assert!(c.regions.iter().any(|r| r.qstart <= 15 && r.qend >= 20));
    }

    #[test]
    fn mismatch_rejected_with_zero_budget() {
        let t = build_table(GENOME, 5);
        let mut query = GENOME[5..35].to_vec();
        query[15] = if query[15] == b'A' { b'C' } else { b'A' };
        let cands = find_candidates(&query, &t, 5, 0, MAX_CANDIDATES);
        assert!(cands.is_empty());
    }

    #[test]
    fn candidate_cap_truncates() {
        let genome = b"ACGTACGTACGTACGTACGTACGTACGT";
        let t = build_table(genome, 4);
        let all = find_candidates(b"ACGT", &t, 4, 0, MAX_CANDIDATES);
        assert_eq!(all.len(), 7);
        assert!(all.windows(2).all(|w| w[0].loc < w[1].loc));
        let capped = find_candidates(b"ACGT", &t, 4, 0, 3);
        assert_eq!(capped.len(), 3);
        assert_eq!(capped[0].loc, 0);
    }

    #[test]
    fn region_split_and_cap() {
        let mut c = Candidate::new(100, 40);
        c.cover(10, 5);
        assert_eq!(c.regions, vec![
            Region { qstart: 0, qend: 10, loc: 100 },
            Region { qstart: 15, qend: 40, loc: 115 },
        ]);
        c.cover(15, 5);
        assert_eq!(c.regions[1], Region { qstart: 20, qend: 40, loc: 120 });
        c.cover(35, 5);
        assert_eq!(c.regions[1], Region { qstart: 20, qend: 35, loc: 120 });
        c.cover(25, 2);
        c.cover(29, 2);
        assert_eq!(c.regions.len(), MAX_REGIONS);
        c.cover(33, 1);
        assert_eq!(c.regions.len(), MAX_REGIONS);
        assert_eq!(c.regions[3].qend, 33);
    }

    #[test]
    fn region_loc_saturates_near_coordinate_limit() {
        let mut c = Candidate::new(u32::MAX - 2, 40);
        c.cover(10, 5);
        assert_eq!(c.regions[1], Region { qstart: 15, qend: 40, loc: u32::MAX });

        let mut c = Candidate::new(u32::MAX - 2, 40);
        c.cover(0, 5);
        assert_eq!(c.regions, vec![Region { qstart: 5, qend: 40, loc: u32::MAX }]);
    }

    #[test]
    fn anchor_before_genome_start_rejected() {
        let t = build_table(GENOME, 6);
        let control = find_candidates(&GENOME[..21], &t, 3, 1, MAX_CANDIDATES);
        assert_eq!(control.len(), 1);
        assert_eq!(control[0].loc, 0);

        // 前三个碱基伸出基因组起点，投影锚点为 -3
        let mut query = b"GGG".to_vec();
        query.extend_from_slice(&GENOME[..21]);
        assert!(find_candidates(&query, &t, 3, 1, MAX_CANDIDATES).is_empty());
    }

    #[test]
    fn no_seeds_no_candidates() {
        let t = build_table(GENOME, 8);
        assert!(find_candidates(b"ACG", &t, 2, 1, MAX_CANDIDATES).is_empty());
        assert!(find_candidates(b"NNNNNNNNNN", &t, 2, 0, MAX_CANDIDATES).is_empty());
    }
}
