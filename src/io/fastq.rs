use anyhow::{anyhow, Result};
use std::io::BufRead;

#[derive(Debug, Clone)]
pub struct FastqRecord {
    pub id: String,
    pub seq: Vec<u8>,
}

pub struct FastqReader<R: BufRead> {
    reader: R,
    buf: String,
    done: bool,
}

impl<R: BufRead> FastqReader<R> {
    pub fn new(reader: R) -> Self {
        Self { reader, buf: String::new(), done: false }
    }

    pub fn next_record(&mut self) -> Result<Option<FastqRecord>> {
        if self.done { return Ok(None); }

        // header line starting with '@', blank lines between records are tolerated
        let mut n;
        loop {
            self.buf.clear();
            n = self.reader.read_line(&mut self.buf)?;
            if n == 0 { self.done = true; return Ok(None); }
            if !self.buf.trim().is_empty() { break; }
        }
        if !self.buf.starts_with('@') {
            return Err(anyhow!("FASTQ header not starting with '@': {}", self.buf.trim_end()));
        }
        let id = self.buf[1..].split_whitespace().next().unwrap_or("").to_string();

        // sequence line
        self.buf.clear();
        n = self.reader.read_line(&mut self.buf)?;
        if n == 0 { return Err(anyhow!("unexpected EOF after header of '{}'", id)); }
        let seq = self.buf.trim_end().as_bytes().to_vec();

        // plus line
        self.buf.clear();
        n = self.reader.read_line(&mut self.buf)?;
        if n == 0 || !self.buf.starts_with('+') { return Err(anyhow!("missing '+' line in '{}'", id)); }

        // quality line
        self.buf.clear();
        n = self.reader.read_line(&mut self.buf)?;
        if n == 0 { return Err(anyhow!("missing quality line in '{}'", id)); }
        let qual_len = self.buf.trim_end().len();

        // line-wrapped FASTQ is not supported
        if qual_len != seq.len() { return Err(anyhow!("seq/qual length mismatch in '{}'", id)); }

        Ok(Some(FastqRecord { id, seq }))
    }
}
