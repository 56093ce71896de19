use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use crate::runtime::Error;

///////////////////////////////
/// Count of reads for one spot and gene
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct ExpressionRecord {
    pub spot_id: String,
    pub gene_id: String,
    pub count: u64,
}

///////////////////////////////
/// Spot by gene count matrix. Sorted storage makes the output independent of insertion order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpressionMatrix {
    counts: BTreeMap<(String, String), u64>,
}

impl ExpressionMatrix {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, spot_id: &str, gene_id: &str, count: u64) {
        *self
            .counts
            .entry((spot_id.to_string(), gene_id.to_string()))
            .or_insert(0) += count;
    }

    pub fn get(&self, spot_id: &str, gene_id: &str) -> u64 {
        self.counts
            .get(&(spot_id.to_string(), gene_id.to_string()))
            .copied()
            .unwrap_or(0)
    }

    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    pub fn total_for_spot(&self, spot_id: &str) -> u64 {
        self.counts
            .iter()
            .filter(|((spot, _), _)| spot == spot_id)
            .map(|(_, cnt)| *cnt)
            .sum()
    }

    pub fn spots(&self) -> BTreeSet<&str> {
        self.counts.keys().map(|(spot, _)| spot.as_str()).collect()
    }

    pub fn genes(&self) -> BTreeSet<&str> {
        self.counts.keys().map(|(_, gene)| gene.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn records(&self) -> Vec<ExpressionRecord> {
        self.counts
            .iter()
            .map(|((spot_id, gene_id), count)| ExpressionRecord {
                spot_id: spot_id.clone(),
                gene_id: gene_id.clone(),
                count: *count,
            })
            .collect()
    }

    ///////////////////////////////
    /// Store as TSV: one row per spot, one column per gene, both sorted. First header cell is empty.
    /// An empty matrix gives an empty file
    pub fn save_to_tsv(&self, p: &Path) -> Result<(), Error> {
        let mut writer = csv::WriterBuilder::new()
            .delimiter(b'\t')
            .from_path(p)
            .map_err(|e| Error::parse_error(format!("writing matrix {:?}", p), Some(e.to_string())))?;
        if self.is_empty() {
            writer.flush()?;
            return Ok(());
        }

        let genes: Vec<&str> = self.genes().into_iter().collect();

        let mut header = Vec::with_capacity(genes.len() + 1);
        header.push("");
        header.extend(genes.iter().copied());
        write_row(&mut writer, &header, p)?;

        for spot in self.spots() {
            let mut row = Vec::with_capacity(genes.len() + 1);
            row.push(spot.to_string());
            for gene in genes.iter() {
                row.push(self.get(spot, gene).to_string());
            }
            write_row(&mut writer, &row, p)?;
        }
        writer.flush()?;
        Ok(())
    }
}

fn write_row<W: std::io::Write, S: AsRef<[u8]>>(
    writer: &mut csv::Writer<W>,
    row: &[S],
    p: &Path,
) -> Result<(), Error> {
    writer
        .write_record(row)
        .map_err(|e| Error::parse_error(format!("writing matrix {:?}", p), Some(e.to_string())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aggregate_and_records() {
        let mut m = ExpressionMatrix::new();
        m.add("2x3", "Gapdh", 1);
        m.add("1x1", "Actb", 1);
        m.add("2x3", "Gapdh", 2);
        m.add("2x3", "Actb", 1);

        assert_eq!(m.get("2x3", "Gapdh"), 3);
        assert_eq!(m.get("1x1", "Gapdh"), 0);
        assert_eq!(m.total(), 5);
        assert_eq!(m.total_for_spot("2x3"), 4);
        assert_eq!(
            m.records(),
            vec![
                ExpressionRecord {
                    spot_id: "1x1".to_string(),
                    gene_id: "Actb".to_string(),
                    count: 1
                },
                ExpressionRecord {
                    spot_id: "2x3".to_string(),
                    gene_id: "Actb".to_string(),
                    count: 1
                },
                ExpressionRecord {
                    spot_id: "2x3".to_string(),
                    gene_id: "Gapdh".to_string(),
                    count: 3
                },
            ]
        );
    }

    #[test]
    fn test_save_tsv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stdata.tsv");
        let mut m = ExpressionMatrix::new();
        m.add("2x3", "Gapdh", 3);
        m.add("1x1", "Actb", 1);
        m.save_to_tsv(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "\tActb\tGapdh\n1x1\t1\t0\n2x3\t0\t3\n");
    }

    #[test]
    fn test_save_empty_tsv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stdata.tsv");
        let m = ExpressionMatrix::new();
        assert!(m.is_empty());
        m.save_to_tsv(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "");
    }
}
