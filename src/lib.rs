//! # kmer-mapper
//!
//! 基于 k-mer 位置表的基因组索引与近似序列比对。
//!
//! 本 crate 包括：
//!
//! - **索引构建**：从一个或多个 FASTA 文件抽取长度为 k 的 word，原地基数排序、去重，
//!   得到 CSR 形式的 word → 位置表，多个文件的表原地归并
//! - **候选查找**：按固定步长取种子，在位置表中二分查找，多种子投票得到候选锚点
//! - **比对验证**：在锚点附近的参考窗口上计算半全局编辑距离，正反两条链都比对
//!
//! ## 快速示例
//!
//! ```rust,no_run
//! use kmer_mapper::index::builder::{BuildOpt, IndexBuilder};
//! use kmer_mapper::align::{find_candidates, MAX_CANDIDATES};
//!
//! let builder = IndexBuilder::new(BuildOpt { word_length: 12, threads: 0 }).unwrap();
//! let built = builder.build_files(&["chr1.fa", "chr2.fa"]).unwrap();
//!
//! // 步长 4、最多 1 个错配
//! let cands = find_candidates(b"ACGTTGCATGCATTGACCGTAGGA", &built.table, 4, 1, MAX_CANDIDATES);
//! for c in &cands {
//!     println!("candidate at {} ({} seeds missed)", c.loc, c.mismatches);
//! }
//! ```
//!
//! ## 模块说明
//!
//! - [`util`]：2-bit k-mer 编码、反向互补
//! - [`index`]：基数排序、位置表、构建与归并、索引文件读写
//! - [`io`]：FASTA / FASTQ / 名称文件 / read 来源
//! - [`align`]：种子、候选、编辑距离验证与比对驱动
//! - [`error`]：库级错误类型

pub mod align;
pub mod error;
pub mod index;
pub mod io;
pub mod logging;
pub mod util;
