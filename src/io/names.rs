//! 染色体描述文件：每行 `<名称> <源文件> <全局起点>`，由建索引时写出，比对时读入。

use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::index::builder::SequenceRecord;

pub fn write_names(path: &Path, records: &[SequenceRecord]) -> Result<()> {
    let f = std::fs::File::create(path).map_err(|e| Error::io(path, e))?;
    let mut w = std::io::BufWriter::new(f);
    for r in records {
        writeln!(w, "{} {} {}", r.name, r.file.display(), r.start).map_err(|e| Error::io(path, e))?;
    }
    w.flush().map_err(|e| Error::io(path, e))?;
    Ok(())
}

pub fn read_names(path: &Path) -> Result<Vec<SequenceRecord>> {
    let text = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
    parse_names(&text).map_err(|detail| Error::format(path, detail))
}

/// 解析描述文本，按起点升序返回
pub fn parse_names(text: &str) -> std::result::Result<Vec<SequenceRecord>, String> {
    let mut out = Vec::new();
    for (lineno, line) in text.lines().enumerate() {
        let mut fields = line.split_whitespace();
        let (name, file, start) = match (fields.next(), fields.next(), fields.next()) {
            (None, _, _) => continue,
            (Some(n), Some(f), Some(s)) => (n, f, s),
            _ => return Err(format!("line {}: expected '<name> <file> <start>'", lineno + 1)),
        };
        if fields.next().is_some() {
            return Err(format!("line {}: too many fields", lineno + 1));
        }
        let start: u32 = start
            .parse()
            .map_err(|_| format!("line {}: invalid start offset '{}'", lineno + 1, start))?;
        out.push(SequenceRecord { name: name.to_string(), file: PathBuf::from(file), start });
    }
    out.sort_by_key(|r| r.start);
    Ok(out)
}
