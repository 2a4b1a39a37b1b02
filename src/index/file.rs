//! 索引文件格式（小端序）：
//!
//! ```text
//! i32 wordsize | u32 nwords | u32 nlocations | u64 nseqs | nseqs × (name, u32 start)
//! u32[nwords] words | u32[nwords] starts | u32[nlocations] locations
//! ```
//!
//! 文件头用 bincode 序列化，三个数组为平铺的定宽整数。

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use bincode::Options;
use serde::{Deserialize, Serialize};

use super::table::WordTable;
use crate::error::{Error, Result};
use crate::util::dna::{decode_word, MAX_WORD_LENGTH};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceEntry {
    pub name: String,
    pub start: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexHeader {
    pub wordsize: i32,
    pub nwords: u32,
    pub nlocations: u32,
    pub sequences: Vec<SequenceEntry>,
}

/// 从文件加载的索引
#[derive(Debug)]
pub struct GenomeIndex {
    pub header: IndexHeader,
    pub table: WordTable,
}

impl GenomeIndex {
    pub fn wordlength(&self) -> usize {
        self.table.wordlength
    }

    /// 逐个 word 打印：`WORD\tstart`，下一行为该 word 的位置段
    pub fn dump<W: Write>(&self, w: &mut W) -> std::io::Result<()> {
        let k = self.wordlength();
        for (i, &word) in self.table.words.iter().enumerate() {
            let text = decode_word(word, k);
            writeln!(w, "{}\t{}", String::from_utf8_lossy(&text), self.table.starts[i])?;
            let locs: Vec<String> = self.table.run_locations(i).iter().map(u32::to_string).collect();
            writeln!(w, "{}", locs.join(" "))?;
        }
        Ok(())
    }
}

pub fn write_index(path: &Path, table: &WordTable, sequences: &[SequenceEntry]) -> Result<()> {
    let header = IndexHeader {
        wordsize: table.wordlength as i32,
        nwords: table.words.len() as u32,
        nlocations: table.locations.len() as u32,
        sequences: sequences.to_vec(),
    };
    let f = File::create(path).map_err(|e| Error::io(path, e))?;
    let mut w = BufWriter::new(f);
    header_codec().serialize_into(&mut w, &header)?;
    for arr in [&table.words, &table.starts, &table.locations] {
        write_u32s(&mut w, arr).map_err(|e| Error::io(path, e))?;
    }
    w.flush().map_err(|e| Error::io(path, e))?;
    Ok(())
}

pub fn read_index(path: &Path) -> Result<GenomeIndex> {
    let f = File::open(path).map_err(|e| Error::io(path, e))?;
    let file_len = f.metadata().map_err(|e| Error::io(path, e))?.len();
    let mut r = BufReader::new(f);

    let header: IndexHeader = header_codec()
        .with_limit(file_len)
        .deserialize_from(&mut r)
        .map_err(|e| Error::corrupt(path, format!("unreadable header: {}", e)))?;
    if header.wordsize < 1 || header.wordsize as usize > MAX_WORD_LENGTH {
        return Err(Error::corrupt(path, format!("word size {} out of range", header.wordsize)));
    }

    let header_len = header_codec().serialized_size(&header)?;
    let expected = 4 * (2 * u64::from(header.nwords) + u64::from(header.nlocations));
    let actual = file_len.saturating_sub(header_len);
    if actual != expected {
        return Err(Error::corrupt(
            path,
            format!(
                "header declares {} words and {} locations ({} bytes) but {} bytes follow",
                header.nwords, header.nlocations, expected, actual
            ),
        ));
    }

    let nwords = header.nwords as usize;
    let nloc = header.nlocations as usize;
    let mut read = |n: usize| read_u32s(&mut r, n).map_err(|e| Error::io(path, e));
    let words = read(nwords)?;
    let starts = read(nwords)?;
    let locations = read(nloc)?;

    let table = WordTable { wordlength: header.wordsize as usize, words, starts, locations };
    table.check().map_err(|detail| Error::corrupt(path, detail))?;
    Ok(GenomeIndex { header, table })
}

/// 定宽整数编码，与 `bincode::serialize` 默认配置一致
fn header_codec() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .allow_trailing_bytes()
}

fn write_u32s<W: Write>(w: &mut W, values: &[u32]) -> std::io::Result<()> {
    for v in values {
        w.write_all(&v.to_le_bytes())?;
    }
    Ok(())
}

fn read_u32s<R: Read>(r: &mut R, n: usize) -> std::io::Result<Vec<u32>> {
    let mut bytes = vec![0u8; n * 4];
    r.read_exact(&mut bytes)?;
    Ok(bytes
        .chunks_exact(4)
        .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_table() -> WordTable {
        let mut t = WordTable::new(4);
        for (w, l) in [(9, 30), (2, 4), (9, 12), (200, 0)] {
            t.push(w, l);
        }
        t.finalize();
        t
    }

    fn sample_seqs() -> Vec<SequenceEntry> {
        vec![
            SequenceEntry { name: "chr1".to_string(), start: 0 },
            SequenceEntry { name: "chr2".to_string(), start: 10_040 },
        ]
    }

    #[test]
    fn write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("g.idx");
        let t = sample_table();
        write_index(&path, &t, &sample_seqs()).unwrap();

        let idx = read_index(&path).unwrap();
        assert_eq!(idx.table, t);
        assert_eq!(idx.header.nwords, 3);
        assert_eq!(idx.header.nlocations, 4);
        assert_eq!(idx.header.sequences, sample_seqs());
    }

    #[test]
    fn layout_is_flat_after_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("g.idx");
        let t = sample_table();
        write_index(&path, &t, &[]).unwrap();
        let bytes = std::fs::read(&path).unwrap();

        // i32 + u32 + u32 + u64(空序列表)
        assert_eq!(&bytes[0..4], &4i32.to_le_bytes());
        assert_eq!(&bytes[4..8], &3u32.to_le_bytes());
        assert_eq!(&bytes[8..12], &4u32.to_le_bytes());
        assert_eq!(bytes.len(), 20 + 4 * (3 + 3 + 4));
        assert_eq!(&bytes[20..24], &2u32.to_le_bytes());
    }

    #[test]
    fn truncated_file_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("g.idx");
        write_index(&path, &sample_table(), &sample_seqs()).unwrap();
        let bytes = std::fs::read(&path).unwrap();
        std::fs::write(&path, &bytes[..bytes.len() - 4]).unwrap();
        assert!(matches!(read_index(&path), Err(Error::CorruptIndex { .. })));

        let mut extra = bytes.clone();
        extra.extend_from_slice(&[0, 0, 0, 0]);
        std::fs::write(&path, &extra).unwrap();
        assert!(matches!(read_index(&path), Err(Error::CorruptIndex { .. })));
    }

    #[test]
    fn unsorted_words_are_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("g.idx");
        let mut t = sample_table();
        t.words.swap(0, 1);
        write_index(&path, &t, &[]).unwrap();
        assert!(matches!(read_index(&path), Err(Error::CorruptIndex { .. })));
    }

    #[test]
    fn dump_lists_words_and_runs() {
        let t = sample_table();
        let header = IndexHeader { wordsize: 4, nwords: 3, nlocations: 4, sequences: vec![] };
        let idx = GenomeIndex { header, table: t };
        let mut out = Vec::new();
        idx.dump(&mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "AAAG\t0\n4\nAAGC\t1\n12 30\nTAGA\t3\n0\n");
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = read_index(Path::new("/nonexistent/dir/g.idx")).unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }
}
