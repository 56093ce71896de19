use std::path::Path;

use rust_htslib::bam;
use rust_htslib::bam::record::{Aux, Cigar};
use rust_htslib::bam::Read;

use crate::common::PairId;
use crate::runtime::Error;

const FLAG_UNMAPPED: u16 = 0x4;
const FLAG_SECONDARY: u16 = 0x100;
const FLAG_SUPPLEMENTARY: u16 = 0x800;

///////////////////////////////
/// Primary alignment of one read, as reported by an aligner
#[derive(Debug, Clone, PartialEq)]
pub struct AlignmentRecord {
    pub pair_id: PairId,
    pub reference: String,
    /// 0-based leftmost position
    pub position: i64,
    pub mapq: u8,
    pub reverse: bool,
    /// Alignment columns: M, =, X, I and D operations
    pub aligned_length: u32,
    /// NM tag, if the aligner wrote it
    pub edit_distance: Option<u32>,
}

impl AlignmentRecord {
    ///////////////////////////////
    /// Fraction of alignment columns that are matches. Without an NM tag, assume a perfect alignment
    pub fn identity(&self) -> f64 {
        if self.aligned_length == 0 {
            return 0.0;
        }
        let nm = self.edit_distance.unwrap_or(0).min(self.aligned_length);
        1.0 - (nm as f64) / (self.aligned_length as f64)
    }
}

///////////////////////////////
/// Read primary mapped alignments from a SAM/BAM file. Read names must be pair ids
pub fn read_primary_alignments(path: &Path) -> Result<Vec<AlignmentRecord>, Error> {
    let mut reader = bam::Reader::from_path(path)
        .map_err(|e| Error::parse_error(format!("alignments {:?}", path), Some(e.to_string())))?;
    let header = reader.header().clone();

    let mut out = Vec::new();
    let mut record = bam::Record::new();
    while let Some(r) = reader.read(&mut record) {
        r.map_err(|e| Error::parse_error(format!("alignments {:?}", path), Some(e.to_string())))?;

        let flags = record.flags();
        if flags & (FLAG_UNMAPPED | FLAG_SECONDARY | FLAG_SUPPLEMENTARY) != 0 || record.tid() < 0 {
            continue;
        }

        let pair_id = parse_pair_id(record.qname())?;
        let reference = String::from_utf8_lossy(header.tid2name(record.tid() as u32)).to_string();

        let mut aligned_length: u32 = 0;
        for op in record.cigar().iter() {
            match op {
                Cigar::Match(l) | Cigar::Equal(l) | Cigar::Diff(l) | Cigar::Ins(l) | Cigar::Del(l) => {
                    aligned_length += *l
                }
                _ => {}
            }
        }

        out.push(AlignmentRecord {
            pair_id,
            reference,
            position: record.pos(),
            mapq: record.mapq(),
            reverse: record.is_reverse(),
            aligned_length,
            edit_distance: read_edit_distance(&record),
        });
    }
    Ok(out)
}

fn read_edit_distance(record: &bam::Record) -> Option<u32> {
    match record.aux(b"NM") {
        Ok(Aux::U8(v)) => Some(v as u32),
        Ok(Aux::I8(v)) => Some(v.max(0) as u32),
        Ok(Aux::U16(v)) => Some(v as u32),
        Ok(Aux::I16(v)) => Some(v.max(0) as u32),
        Ok(Aux::U32(v)) => Some(v),
        Ok(Aux::I32(v)) => Some(v.max(0) as u32),
        _ => None,
    }
}

///////////////////////////////
/// Pair ids are written as read names towards engines; some engines append /1 or a comment
pub fn parse_pair_id(qname: &[u8]) -> Result<PairId, Error> {
    let name = String::from_utf8_lossy(qname);
    let name = name
        .split(|c: char| c == ' ' || c == '/')
        .next()
        .unwrap_or_default();
    name.parse::<PairId>().map_err(|_| {
        Error::parse_error(
            "engine output",
            Some(format!("read name '{}' is not a pair id", name)),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_pair_id() {
        assert_eq!(parse_pair_id(b"42").unwrap(), PairId(42));
        assert_eq!(parse_pair_id(b"42/1").unwrap(), PairId(42));
        assert!(parse_pair_id(b"M03699:250").is_err());
    }

    #[test]
    fn test_identity() {
        let mut rec = AlignmentRecord {
            pair_id: PairId(1),
            reference: "Rn45s".to_string(),
            position: 10,
            mapq: 255,
            reverse: false,
            aligned_length: 50,
            edit_distance: Some(5),
        };
        assert!((rec.identity() - 0.9).abs() < 1e-9);
        rec.edit_distance = None;
        assert_eq!(rec.identity(), 1.0);
    }

    #[test]
    fn test_read_sam() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("aln.sam");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, "@HD\tVN:1.6\tSO:unsorted").unwrap();
        writeln!(f, "@SQ\tSN:chr19\tLN:100000").unwrap();
        writeln!(f, "0\t0\tchr19\t101\t255\t10M2I8M\t*\t0\t0\tACGTACGTACGTACGTACGT\t*\tNM:i:3").unwrap();
        writeln!(f, "0\t256\tchr19\t5001\t3\t20M\t*\t0\t0\tACGTACGTACGTACGTACGT\t*").unwrap();
        writeln!(f, "1\t4\t*\t0\t0\t*\t*\t0\t0\tACGT\t*").unwrap();
        writeln!(f, "2\t16\tchr19\t201\t255\t4M\t*\t0\t0\tACGT\t*").unwrap();
        drop(f);

        let records = read_primary_alignments(&path).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].pair_id, PairId(0));
        assert_eq!(records[0].reference, "chr19");
        assert_eq!(records[0].position, 100);
        assert_eq!(records[0].aligned_length, 20);
        assert_eq!(records[0].edit_distance, Some(3));
        assert_eq!(records[1].pair_id, PairId(2));
        assert!(records[1].reverse);
        assert_eq!(records[1].edit_distance, None);
    }
}
