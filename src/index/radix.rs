/// 桶大小不超过该值时改用插入排序
pub const INSERTION_THRESHOLD: usize = 32;

/// 按 word 长度 k 排序：最高非零字节之上的位恒为 0，直接从该字节开始。
/// `locations` 若给出，与 `words` 同步交换。
pub fn sort_words(words: &mut [u32], locations: Option<&mut [u32]>, k: usize) {
    radix_sort(words, locations, top_shift(k));
}

/// 2k 位 word 的最高有效字节对应的位移
#[inline]
pub fn top_shift(k: usize) -> u32 {
    if k == 0 {
        return 0;
    }
    (((2 * k - 1) / 8) * 8).min(24) as u32
}

/// 原地 MSD 混合基数排序（256 路，每层 8 bit）。
/// 对 `(word >> shift) & 0xFF` 分桶，逐个把元素交换到所属桶的下一个空位（循环跟随），
/// 再以 `shift - 8` 递归各桶；小桶走插入排序。
pub fn radix_sort(words: &mut [u32], mut locations: Option<&mut [u32]>, shift: u32) {
    let n = words.len();
    if let Some(locs) = locations.as_deref() {
        debug_assert_eq!(locs.len(), n);
    }
    if n <= INSERTION_THRESHOLD {
        insertion_sort(words, locations);
        return;
    }

    let mut counts = [0usize; 256];
    for &w in words.iter() {
        counts[digit(w, shift)] += 1;
    }

    let mut starts = [0usize; 256];
    let mut acc = 0usize;
    for d in 0..256 {
        starts[d] = acc;
        acc += counts[d];
    }

    // next[d]：桶 d 中下一个待确认的位置
    let mut next = starts;
    for d in 0..256 {
        let end = starts[d] + counts[d];
        while next[d] < end {
            let i = next[d];
            let target = digit(words[i], shift);
            if target == d {
                next[d] += 1;
                continue;
            }
            let j = next[target];
            next[target] += 1;
            words.swap(i, j);
            if let Some(locs) = locations.as_deref_mut() {
                locs.swap(i, j);
            }
        }
    }

    if shift == 0 {
        return;
    }
    for d in 0..256 {
        if counts[d] > 1 {
            let range = starts[d]..starts[d] + counts[d];
            let locs = locations.as_deref_mut().map(|l| &mut l[range.clone()]);
            radix_sort(&mut words[range], locs, shift - 8);
        }
    }
}

fn insertion_sort(words: &mut [u32], mut locations: Option<&mut [u32]>) {
    for p in 1..words.len() {
        let mut q = p;
        while q > 0 && words[q] < words[q - 1] {
            words.swap(q, q - 1);
            if let Some(locs) = locations.as_deref_mut() {
                locs.swap(q, q - 1);
            }
            q -= 1;
        }
    }
}

#[inline]
fn digit(w: u32, shift: u32) -> usize {
    ((w >> shift) & 0xFF) as usize
}
