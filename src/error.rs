//! 库级错误类型。CLI 层继续使用 `anyhow::Result`。

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// 参数越界（k、错配数、步长等），在任何核心计算前报告
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("I/O error on '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// 索引文件头与数组长度不符，或 CSR 结构被破坏
    #[error("corrupt index '{}': {detail}", path.display())]
    CorruptIndex { path: PathBuf, detail: String },

    /// 名称文件或染色体 FASTA 的格式问题
    #[error("format error in '{}': {detail}", path.display())]
    Format { path: PathBuf, detail: String },

    #[error("word length mismatch: table has k={expected}, incoming k={found}")]
    WordLengthMismatch { expected: usize, found: usize },

    /// 坐标计数器超出 u32 范围
    #[error("location counter overflow: {0} does not fit in 32 bits")]
    CoordinateOverflow(u64),

    #[error("serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    #[error("cannot start worker threads: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io { path: path.into(), source }
    }

    pub fn corrupt(path: impl Into<PathBuf>, detail: impl Into<String>) -> Self {
        Error::CorruptIndex { path: path.into(), detail: detail.into() }
    }

    pub fn format(path: impl Into<PathBuf>, detail: impl Into<String>) -> Self {
        Error::Format { path: path.into(), detail: detail.into() }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
