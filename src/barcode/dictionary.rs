use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use log::{debug, info};
use rustc_hash::FxHashMap;

use crate::runtime::Error;

///////////////////////////////
/// One spot on the chip: its barcode sequence and its identifier
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SpatialBarcodeEntry {
    pub sequence: Vec<u8>,
    pub identifier: String,
}

///////////////////////////////
/// The chip barcode dictionary. All barcodes have the same length, and no sequence occurs twice.
/// Immutable once loaded
#[derive(Clone, Debug)]
pub struct BarcodeDictionary {
    entries: Vec<SpatialBarcodeEntry>,
    seq2index: FxHashMap<Vec<u8>, usize>,
    bc_length: usize,
}

impl BarcodeDictionary {
    ///////////////////////////////
    /// Build a dictionary, rejecting length mismatches, invalid bases and duplicate sequences
    pub fn from_entries(entries: Vec<SpatialBarcodeEntry>) -> Result<BarcodeDictionary, Error> {
        let bc_length = match entries.first() {
            Some(e) => e.sequence.len(),
            None => return Err(Error::parse_error("barcode dictionary", Some("no barcodes"))),
        };
        if bc_length == 0 {
            return Err(Error::parse_error(
                "barcode dictionary",
                Some("barcodes cannot be empty"),
            ));
        }

        let mut seq2index = FxHashMap::default();
        for (index, entry) in entries.iter().enumerate() {
            if entry.sequence.len() != bc_length {
                return Err(Error::parse_error(
                    "barcode dictionary",
                    Some(format!(
                        "barcode {} of spot {} has length {}, expected {}",
                        String::from_utf8_lossy(&entry.sequence),
                        entry.identifier,
                        entry.sequence.len(),
                        bc_length
                    )),
                ));
            }
            if let Some(b) = entry.sequence.iter().find(|b| !is_acgt(**b)) {
                return Err(Error::parse_error(
                    "barcode dictionary",
                    Some(format!(
                        "barcode {} contains invalid base '{}'",
                        String::from_utf8_lossy(&entry.sequence),
                        *b as char
                    )),
                ));
            }
            if let Some(prev) = seq2index.insert(entry.sequence.clone(), index) {
                return Err(Error::parse_error(
                    "barcode dictionary",
                    Some(format!(
                        "duplicate barcode {} for spots {} and {}",
                        String::from_utf8_lossy(&entry.sequence),
                        entries[prev].identifier,
                        entry.identifier
                    )),
                ));
            }
        }

        Ok(BarcodeDictionary {
            entries,
            seq2index,
            bc_length,
        })
    }

    ///////////////////////////////
    /// Read the dictionary from a tab- or whitespace-delimited file.
    /// Columns: barcode, then one or more identifier fields. Several fields (typically X and Y) are joined with 'x'
    pub fn read_barcodes(src: impl Read) -> Result<BarcodeDictionary, Error> {
        let reader = BufReader::new(src);
        let mut entries = Vec::new();

        for (lineno, line) in reader.lines().enumerate() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let mut fields = line.split_ascii_whitespace();
            let sequence = fields
                .next()
                .map(|s| s.to_ascii_uppercase().into_bytes())
                .unwrap_or_default();
            let id_fields: Vec<&str> = fields.collect();
            if id_fields.is_empty() {
                return Err(Error::parse_error(
                    "barcode dictionary",
                    Some(format!("line {} has no spot identifier", lineno + 1)),
                ));
            }

            entries.push(SpatialBarcodeEntry {
                sequence,
                identifier: id_fields.join("x"),
            });
        }

        BarcodeDictionary::from_entries(entries)
    }

    pub fn from_path(path: &Path) -> Result<BarcodeDictionary, Error> {
        debug!("Reading barcode dictionary {:?}", path);
        let file = File::open(path)
            .map_err(|e| Error::configuration(path, Some(format!("cannot open: {}", e))))?;
        let dict = BarcodeDictionary::read_barcodes(file).map_err(|e| match e {
            Error::ParseError { msg, .. } => Error::configuration(path, msg),
            other => other,
        })?;
        info!(
            "Loaded {} spatial barcodes of length {}",
            dict.len(),
            dict.barcode_length()
        );
        Ok(dict)
    }

    pub fn barcode_length(&self) -> usize {
        self.bc_length
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[SpatialBarcodeEntry] {
        &self.entries
    }

    pub fn get(&self, index: usize) -> &SpatialBarcodeEntry {
        &self.entries[index]
    }

    /// Index of an exactly matching barcode
    pub fn find_exact(&self, seq: &[u8]) -> Option<usize> {
        self.seq2index.get(seq).copied()
    }
}

fn is_acgt(b: u8) -> bool {
    matches!(b, b'A' | b'C' | b'G' | b'T')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_tab_and_space_delimited() {
        let text = "# barcode x y\nAAAA\t1\t2\nttTT 3 4\n\nCCCC spot_c\n";
        let dict = BarcodeDictionary::read_barcodes(text.as_bytes()).unwrap();
        assert_eq!(dict.len(), 3);
        assert_eq!(dict.barcode_length(), 4);
        assert_eq!(dict.get(0).identifier, "1x2");
        assert_eq!(dict.get(1).sequence, b"TTTT".to_vec());
        assert_eq!(dict.get(1).identifier, "3x4");
        assert_eq!(dict.get(2).identifier, "spot_c");
        assert_eq!(dict.find_exact(b"CCCC"), Some(2));
        assert_eq!(dict.find_exact(b"CCCA"), None);
    }

    #[test]
    fn test_reject_duplicates() {
        let text = "AAAA\t1\t1\nAAAA\t2\t2\n";
        let res = BarcodeDictionary::read_barcodes(text.as_bytes());
        assert!(matches!(res, Err(Error::ParseError { .. })));
    }

    #[test]
    fn test_reject_length_mismatch() {
        let text = "AAAA\t1\t1\nAAAAA\t2\t2\n";
        assert!(BarcodeDictionary::read_barcodes(text.as_bytes()).is_err());
    }

    #[test]
    fn test_reject_missing_identifier() {
        assert!(BarcodeDictionary::read_barcodes("AAAA\n".as_bytes()).is_err());
    }

    #[test]
    fn test_reject_empty() {
        assert!(BarcodeDictionary::read_barcodes("".as_bytes()).is_err());
    }

    #[test]
    fn test_reject_invalid_base() {
        assert!(BarcodeDictionary::read_barcodes("AANA\tspot\n".as_bytes()).is_err());
    }
}
