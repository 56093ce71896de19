// Byte literals used when parsing and writing reads
pub const U8_CHAR_NEWLINE: u8 = b'\n';
pub const U8_CHAR_FASTQ_RECORD: u8 = b'@';
pub const U8_CHAR_FASTQ_SEPERATOR: u8 = b'+';

/// Offset of Phred scores in FASTQ quality strings (Sanger / Illumina 1.8+)
pub const PHRED_OFFSET: u8 = 33;

/// Smallest number of read pairs handed to a worker during demultiplexing
pub const DEMUX_MIN_BATCH: usize = 1024;
