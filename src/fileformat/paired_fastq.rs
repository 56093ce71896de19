use std::io::Write;
use std::path::Path;

use seq_io::fastq::Reader as FastqReader;
use seq_io::fastq::Record as FastqRecord;

use crate::common::{PairId, ReadPair, U8_CHAR_FASTQ_RECORD, U8_CHAR_FASTQ_SEPERATOR, U8_CHAR_NEWLINE};
use crate::runtime::Error;

///////////////////////////////
/////////////////////////////// Reader
///////////////////////////////

///////////////////////////////
/// Reads forward and reverse FASTQ in lockstep. Compressed input is detected from content.
/// Pairs are numbered in input order
pub struct PairedFastqReader {
    reader_r1: FastqReader<Box<dyn std::io::Read>>,
    reader_r2: FastqReader<Box<dyn std::io::Read>>,
    next_id: u64,
}

impl PairedFastqReader {
    pub fn new(path_r1: &Path, path_r2: &Path) -> Result<PairedFastqReader, Error> {
        Ok(PairedFastqReader {
            reader_r1: FastqReader::new(open_reader(path_r1)?),
            reader_r2: FastqReader::new(open_reader(path_r2)?),
            next_id: 0,
        })
    }

    pub fn from_readers(
        r1: Box<dyn std::io::Read>,
        r2: Box<dyn std::io::Read>,
    ) -> PairedFastqReader {
        PairedFastqReader {
            reader_r1: FastqReader::new(r1),
            reader_r2: FastqReader::new(r2),
            next_id: 0,
        }
    }
}

fn open_reader(path: &Path) -> Result<Box<dyn std::io::Read>, Error> {
    let (reader, _format) = niffler::from_path(path)
        .map_err(|e| Error::configuration(path, Some(format!("cannot open reads: {}", e))))?;
    Ok(reader)
}

impl Iterator for PairedFastqReader {
    type Item = Result<ReadPair, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        let (rec1, rec2) = match (self.reader_r1.next(), self.reader_r2.next()) {
            (None, None) => return None,
            (Some(Ok(rec1)), Some(Ok(rec2))) => (rec1, rec2),
            (Some(Err(e)), _) | (_, Some(Err(e))) => {
                return Some(Err(Error::parse_error("FASTQ", Some(e.to_string()))))
            }
            _ => {
                return Some(Err(Error::parse_error(
                    "FASTQ",
                    Some("forward and reverse files have a different number of reads"),
                )))
            }
        };

        let name = pair_name(rec1.head());
        if name != pair_name(rec2.head()) {
            return Some(Err(Error::parse_error(
                "FASTQ",
                Some(format!(
                    "forward read '{}' and reverse read '{}' are not mates",
                    String::from_utf8_lossy(rec1.head()),
                    String::from_utf8_lossy(rec2.head())
                )),
            )));
        }
        let name = name.to_vec();

        let rp = ReadPair {
            id: PairId(self.next_id),
            name,
            r1: rec1.seq().to_vec(),
            q1: rec1.qual().to_vec(),
            r2: rec2.seq().to_vec(),
            q2: rec2.qual().to_vec(),
        };
        self.next_id += 1;
        Some(Ok(rp))
    }
}

////////// Read name without comment and /1 or /2 mate suffix
fn pair_name(head: &[u8]) -> &[u8] {
    let name = head
        .split(|&b| b == b' ' || b == b'\t')
        .next()
        .unwrap_or_default();
    match name {
        [rest @ .., b'/', b'1' | b'2'] => rest,
        _ => name,
    }
}

///////////////////////////////
/////////////////////////////// Writer
///////////////////////////////

////////// Write one FASTQ read
pub fn write_fastq_read<W: Write>(
    writer: &mut W,
    head: &[u8],
    seq: &[u8],
    qual: &[u8],
) -> std::io::Result<()> {
    writer.write_all(&[U8_CHAR_FASTQ_RECORD])?;
    writer.write_all(head)?;
    writer.write_all(&[U8_CHAR_NEWLINE])?;
    writer.write_all(seq)?;
    writer.write_all(&[U8_CHAR_NEWLINE, U8_CHAR_FASTQ_SEPERATOR, U8_CHAR_NEWLINE])?;
    writer.write_all(qual)?;
    writer.write_all(&[U8_CHAR_NEWLINE])?;
    Ok(())
}

///////////////////////////////
/// Write the reverse (transcript) reads for an engine, named by pair id
pub fn write_reverse_reads_for_engine<'a, I>(path: &Path, reads: I) -> Result<(), Error>
where
    I: IntoIterator<Item = &'a ReadPair>,
{
    let file = std::fs::File::create(path)?;
    let mut writer = std::io::BufWriter::new(file);
    for rp in reads {
        write_fastq_read(&mut writer, rp.id.to_string().as_bytes(), &rp.r2, &rp.q2)?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const R1: &str = "@M03699:250:1:1102:5914 1:N:0\nAAAACCCCGGGG\n+\nIIIIIIIIIIII\n@M03699:250:1:1102:6000 1:N:0\nTTTTACGT\n+\nIIIIIIII\n";
    const R2: &str = "@M03699:250:1:1102:5914 2:N:0\nGATTACA\n+\nIIIII##\n@M03699:250:1:1102:6000 2:N:0\nCCCCCC\n+\nIIIIII\n";

    #[test]
    fn test_read_pairs() {
        let reader = PairedFastqReader::from_readers(
            Box::new(R1.as_bytes()),
            Box::new(R2.as_bytes()),
        );
        let pairs: Vec<ReadPair> = reader.collect::<Result<_, _>>().unwrap();
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0].id, PairId(0));
        assert_eq!(pairs[0].name, b"M03699:250:1:1102:5914".to_vec());
        assert_eq!(pairs[0].r1, b"AAAACCCCGGGG".to_vec());
        assert_eq!(pairs[0].q2, b"IIIII##".to_vec());
        assert_eq!(pairs[1].id, PairId(1));
        assert_eq!(pairs[1].r2, b"CCCCCC".to_vec());
    }

    #[test]
    fn test_unequal_files() {
        let short_r2 = "@M03699:250:1:1102:5914 2:N:0\nGATTACA\n+\nIIIIIII\n";
        let reader = PairedFastqReader::from_readers(
            Box::new(R1.as_bytes()),
            Box::new(short_r2.as_bytes()),
        );
        let res: Result<Vec<ReadPair>, Error> = reader.collect();
        assert!(res.is_err());
    }

    #[test]
    fn test_mate_suffix_ignored() {
        let r1 = "@frag7/1\nACGT\n+\nIIII\n";
        let r2 = "@frag7/2 extra\nTTTT\n+\nIIII\n";
        let reader = PairedFastqReader::from_readers(Box::new(r1.as_bytes()), Box::new(r2.as_bytes()));
        let pairs: Vec<ReadPair> = reader.collect::<Result<_, _>>().unwrap();
        assert_eq!(pairs[0].name, b"frag7".to_vec());
    }

    #[test]
    fn test_out_of_sync_files() {
        let r1 = "@readA 1:N:0\nACGT\n+\nIIII\n";
        let r2 = "@readZ 2:N:0\nTTTT\n+\nIIII\n";
        let mut reader = PairedFastqReader::from_readers(Box::new(r1.as_bytes()), Box::new(r2.as_bytes()));
        let err = reader.next().unwrap().unwrap_err();
        assert_eq!(err.kind(), "ParseError");
    }

    #[test]
    fn test_write_for_engine() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reads.fq");
        let rp = ReadPair {
            id: PairId(12),
            name: b"orig".to_vec(),
            r1: b"AAAA".to_vec(),
            q1: b"IIII".to_vec(),
            r2: b"GATTACA".to_vec(),
            q2: b"IIIII##".to_vec(),
        };
        write_reverse_reads_for_engine(&path, [&rp]).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "@12\nGATTACA\n+\nIIIII##\n");
    }
}
