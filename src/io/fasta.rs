use anyhow::Result;
use std::io::BufRead;

use crate::index::builder::is_sequence_byte;

#[derive(Debug, Clone)]
pub struct FastaRecord {
    pub id: String,
    pub seq: Vec<u8>,
}

/// 按行读取 FASTA，header 规则与建索引一致：任意位置的 `>` 开始一个 header，直到行尾。
/// 首个 header 之前的序列内容作为 id 为空的记录返回。
pub struct FastaReader<R: BufRead> {
    reader: R,
    buf: Vec<u8>,
    done: bool,
    peek_header: Option<Vec<u8>>,
}

impl<R: BufRead> FastaReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: Vec::new(),
            done: false,
            peek_header: None,
        }
    }

    fn read_line(&mut self) -> Result<bool> {
        self.buf.clear();
        Ok(self.reader.read_until(b'\n', &mut self.buf)? > 0)
    }

    pub fn next_record(&mut self) -> Result<Option<FastaRecord>> {
        if self.done {
            return Ok(None);
        }

        // peek_header 为空只可能发生在文件开头
        let mut seq: Vec<u8> = Vec::new();
        let header = match self.peek_header.take() {
            Some(h) => h,
            None => loop {
                if !self.read_line()? {
                    self.done = true;
                    if seq.is_empty() {
                        return Ok(None);
                    }
                    return Ok(Some(FastaRecord { id: String::new(), seq }));
                }
                let (body, header) = split_line(&self.buf);
                push_sequence(&mut seq, body);
                if let Some(h) = header {
                    if !seq.is_empty() {
                        // headerless leading content
                        self.peek_header = Some(h.to_vec());
                        return Ok(Some(FastaRecord { id: String::new(), seq }));
                    }
                    break h.to_vec();
                }
            },
        };

        let id = String::from_utf8_lossy(&header)
            .split_whitespace()
            .next()
            .unwrap_or("")
            .to_string();

        loop {
            if !self.read_line()? {
                self.done = true;
                break;
            }
            let (body, next) = split_line(&self.buf);
            push_sequence(&mut seq, body);
            if let Some(h) = next {
                self.peek_header = Some(h.to_vec());
                break;
            }
        }

        Ok(Some(FastaRecord { id, seq }))
    }
}

/// 行内首个 `>` 之前为序列，之后（到行尾）为下一条记录的 header
fn split_line(line: &[u8]) -> (&[u8], Option<&[u8]>) {
    match line.iter().position(|&b| b == b'>') {
        Some(p) => (&line[..p], Some(&line[p + 1..])),
        None => (line, None),
    }
}

fn push_sequence(seq: &mut Vec<u8>, line: &[u8]) {
    seq.extend(
        line.iter()
            .filter(|&&b| is_sequence_byte(b))
            .map(u8::to_ascii_uppercase),
    );
}
