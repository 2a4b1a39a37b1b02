pub mod fasta;
pub mod fastq;
pub mod names;
pub mod reads;
