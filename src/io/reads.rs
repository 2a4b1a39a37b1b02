use anyhow::{Context, Result};
use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use super::fasta::FastaReader;
use super::fastq::FastqReader;

/// 查询序列来源，按首个非空白字节自动识别：
/// `@` → FASTQ，`>` → FASTA，其余按空白分隔的原始序列处理。
pub enum ReadSource<R: BufRead> {
    Fasta(FastaReader<R>),
    Fastq(FastqReader<R>),
    Plain(PlainReader<R>),
}

impl ReadSource<BufReader<File>> {
    pub fn open(path: &Path) -> Result<Self> {
        let f = File::open(path)
            .with_context(|| format!("cannot open reads file '{}'", path.display()))?;
        Self::from_reader(BufReader::new(f))
    }
}

impl<R: BufRead> ReadSource<R> {
    pub fn from_reader(mut reader: R) -> Result<Self> {
        let first = loop {
            let buf = reader.fill_buf()?;
            if buf.is_empty() {
                break None;
            }
            match buf.iter().position(|b| !b.is_ascii_whitespace()) {
                Some(p) => {
                    let b = buf[p];
                    reader.consume(p);
                    break Some(b);
                }
                None => {
                    let len = buf.len();
                    reader.consume(len);
                }
            }
        };
        Ok(match first {
            Some(b'@') => ReadSource::Fastq(FastqReader::new(reader)),
            Some(b'>') => ReadSource::Fasta(FastaReader::new(reader)),
            _ => ReadSource::Plain(PlainReader::new(reader)),
        })
    }

    /// 下一条查询序列（原样返回，不做规范化）
    pub fn next_read(&mut self) -> Result<Option<Vec<u8>>> {
        Ok(match self {
            ReadSource::Fasta(r) => r.next_record()?.map(|rec| rec.seq),
            ReadSource::Fastq(r) => r.next_record()?.map(|rec| rec.seq),
            ReadSource::Plain(r) => r.next_token()?,
        })
    }

    /// 最多读取 `n` 条
    pub fn next_batch(&mut self, n: usize) -> Result<Vec<Vec<u8>>> {
        let mut out = Vec::with_capacity(n);
        while out.len() < n {
            match self.next_read()? {
                Some(r) => out.push(r),
                None => break,
            }
        }
        Ok(out)
    }
}

/// 每个空白分隔的 token 是一条 read
pub struct PlainReader<R: BufRead> {
    reader: R,
    line: Vec<u8>,
    pending: VecDeque<Vec<u8>>,
}

impl<R: BufRead> PlainReader<R> {
    pub fn new(reader: R) -> Self {
        Self { reader, line: Vec::new(), pending: VecDeque::new() }
    }

    fn next_token(&mut self) -> Result<Option<Vec<u8>>> {
        while self.pending.is_empty() {
            self.line.clear();
            if self.reader.read_until(b'\n', &mut self.line)? == 0 {
                return Ok(None);
            }
            self.pending.extend(
                self.line
                    .split(u8::is_ascii_whitespace)
                    .filter(|t| !t.is_empty())
                    .map(<[u8]>::to_vec),
            );
        }
        Ok(self.pending.pop_front())
    }
}
