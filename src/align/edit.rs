use std::fmt::Write as _;

use crate::util::dna;

/// 半全局编辑距离比对结果。坐标相对于传入的参考窗口。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alignment {
    pub distance: u32,
    /// query 首碱基在窗口中的对齐位置
    pub ref_start: usize,
    pub ref_end: usize,
    pub cigar: String,
    /// 带 `-` 空位的比对串
    pub query_aln: Vec<u8>,
    pub ref_aln: Vec<u8>,
}

/// DP 工作缓冲区，可跨调用复用（每个工作线程一个）
#[derive(Default)]
pub struct EditBuffer {
    d: Vec<u32>,
}

impl EditBuffer {
    pub fn new() -> Self {
        Self::default()
    }
}

/// 替换代价：只有相同的 ACGT 碱基相配为 0，N 等无效符号与任何碱基都计错配
#[inline]
fn substitution_cost(a: u8, b: u8) -> u32 {
    u32::from(a != b || dna::encode_base(a).is_none())
}

/// 填充 `(slen+1) × (qlen+1)` 编辑距离矩阵，行为窗口位置，列为 query 位置。
///
/// 与标准 Levenshtein 的区别：首列为 `max(0, si − 2·lead)`，
/// 即窗口前 `2·lead` 个碱基内的起点不计代价。返回 (最小距离, 其所在行)。
fn fill(query: &[u8], window: &[u8], lead: usize, buf: &mut EditBuffer) -> (u32, usize) {
    let qlen = query.len();
    let slen = window.len();
    let cols = qlen + 1;
    buf.d.clear();
    buf.d.resize((slen + 1) * cols, 0);
    let d = &mut buf.d;

    for si in 0..=slen {
        d[si * cols] = si.saturating_sub(2 * lead) as u32;
    }
    for qi in 1..=qlen {
        d[qi] = qi as u32;
    }
    for si in 1..=slen {
        for qi in 1..=qlen {
            let cost = substitution_cost(query[qi - 1], window[si - 1]);
            let diag = d[(si - 1) * cols + qi - 1] + cost;
            let left = d[si * cols + qi - 1] + 1;
            let up = d[(si - 1) * cols + qi] + 1;
            d[si * cols + qi] = diag.min(left).min(up);
        }
    }

    // 末端自由：最后一列上的最小值，取最靠前的行
    let mut best = u32::MAX;
    let mut last = 0usize;
    for si in 0..=slen {
        let v = d[si * cols + qlen];
        if v < best {
            best = v;
            last = si;
        }
    }
    (best, last)
}

/// 只计算距离，不回溯
pub fn edit_distance(query: &[u8], window: &[u8], lead: usize, buf: &mut EditBuffer) -> u32 {
    fill(query, window, lead, buf).0
}

/// 计算距离并回溯出比对；平局时优先对角线（匹配/错配）。
pub fn align(query: &[u8], window: &[u8], lead: usize, buf: &mut EditBuffer) -> Alignment {
    let (distance, last) = fill(query, window, lead, buf);
    let cols = query.len() + 1;
    let d = &buf.d;

    let mut ops: Vec<char> = Vec::new();
    let mut query_aln = Vec::new();
    let mut ref_aln = Vec::new();
    let (mut si, mut qi) = (last, query.len());
    while qi > 0 {
        let here = d[si * cols + qi];
        if si > 0 {
            let cost = substitution_cost(query[qi - 1], window[si - 1]);
            if here == d[(si - 1) * cols + qi - 1] + cost {
                ops.push('M');
                query_aln.push(query[qi - 1]);
                ref_aln.push(window[si - 1]);
                si -= 1;
                qi -= 1;
                continue;
            }
        }
        if here == d[si * cols + qi - 1] + 1 {
            ops.push('I');
            query_aln.push(query[qi - 1]);
            ref_aln.push(b'-');
            qi -= 1;
        } else {
            ops.push('D');
            query_aln.push(b'-');
            ref_aln.push(window[si - 1]);
            si -= 1;
        }
    }
    ops.reverse();
    query_aln.reverse();
    ref_aln.reverse();

    Alignment {
        distance,
        ref_start: si,
        ref_end: last,
        cigar: ops_to_cigar(&ops),
        query_aln,
        ref_aln,
    }
}

pub fn ops_to_cigar(ops: &[char]) -> String {
    let mut cigar = String::new();
    if ops.is_empty() {
        return cigar;
    }
    let mut cur = ops[0];
    let mut len = 1usize;
    for &op in &ops[1..] {
        if op == cur {
            len += 1;
        } else {
            let _ = write!(&mut cigar, "{}{}", len, cur);
            cur = op;
            len = 1;
        }
    }
    let _ = write!(&mut cigar, "{}{}", len, cur);
    cigar
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dist(q: &[u8], s: &[u8], lead: usize) -> u32 {
        edit_distance(q, s, lead, &mut EditBuffer::new())
    }

    #[test]
    fn identical_is_zero() {
        assert_eq!(dist(b"ACGTTGCA", b"ACGTTGCA", 0), 0);
        assert_eq!(dist(b"", b"ACGT", 0), 0);
    }

    #[test]
    fn single_substitution() {
        assert_eq!(dist(b"ACGT", b"ACGA", 0), 1);
        let a = align(b"AGGT", b"ACGT", 0, &mut EditBuffer::new());
        assert_eq!(a.distance, 1);
        assert_eq!(a.cigar, "4M");
    }

    #[test]
    fn ambiguous_bases_never_match() {
        assert_eq!(dist(b"ACNT", b"ACNT", 0), 1);
        assert_eq!(dist(b"NNNN", b"NNNN", 0), 4);
        let a = align(b"ACNT", b"ACGT", 0, &mut EditBuffer::new());
        assert_eq!(a.distance, 1);
        assert_eq!(a.cigar, "4M");
    }

    #[test]
    fn single_insertion() {
        let a = align(b"ACGGT", b"ACGT", 0, &mut EditBuffer::new());
        assert_eq!(a.distance, 1);
        assert_eq!(a.cigar, "2M1I2M");
        assert_eq!(a.query_aln, b"ACGGT");
        assert_eq!(a.ref_aln, b"AC-GT");
    }

    #[test]
    fn deletion_costs_one() {
        assert_eq!(dist(b"ACGTTA", b"ACGGTTA", 0), 1);
    }

    #[test]
    fn free_end_ignores_trailing_window() {
        let base = dist(b"ACGTTGCA", b"ACGTTGCA", 0);
        assert_eq!(dist(b"ACGTTGCA", b"ACGTTGCAGGGTTT", 0), base);
        assert_eq!(dist(b"ACGTAGCA", b"ACGTTGCA", 0), dist(b"ACGTAGCA", b"ACGTTGCATTTT", 0));
    }

    #[test]
    fn free_start_within_lead() {
        // query 在窗口中偏移 2 = lead：距离 0，起点为 2
        let a = align(b"ACGT", b"TTACGTGG", 2, &mut EditBuffer::new());
        assert_eq!(a.distance, 0);
        assert_eq!(a.ref_start, 2);
        assert_eq!(a.ref_end, 6);
        assert_eq!(a.cigar, "4M");

        // 偏移 4 仍在 2·lead 内
        let a = align(b"ACGT", b"TTGGACGT", 2, &mut EditBuffer::new());
        assert_eq!(a.distance, 0);
        assert_eq!(a.ref_start, 4);

        // 无 lead 时前导碱基需要计为删除
        assert_eq!(dist(b"ACGT", b"TTACGT", 0), 2);
    }

    #[test]
    fn buffer_reuse() {
        let mut buf = EditBuffer::new();
        assert_eq!(edit_distance(b"ACGTACGTAC", b"ACGTACGTAC", 0, &mut buf), 0);
        assert_eq!(edit_distance(b"AGGT", b"ACGT", 0, &mut buf), 1);
        assert_eq!(align(b"ACGT", b"ACGT", 0, &mut buf).cigar, "4M");
    }

    #[test]
    fn cigar_runs() {
        assert_eq!(ops_to_cigar(&['M', 'M', 'I', 'D', 'D', 'M']), "2M1I2D1M");
        assert_eq!(ops_to_cigar(&[]), "");
    }
}
