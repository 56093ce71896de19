use std::path::Path;

use serde::Serialize;

use crate::common::{DiscardReason, PairId, Stage, StageCounters, Verdict};
use crate::runtime::Error;

fn csv_error(p: &Path, e: csv::Error) -> Error {
    Error::parse_error(format!("writing {:?}", p), Some(e.to_string()))
}

///////////////////////////////
/// Store counters as TSV: one row per stage, a column per discard reason
pub fn write_stage_counters(p: &Path, counters: &StageCounters) -> Result<(), Error> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .from_path(p)
        .map_err(|e| csv_error(p, e))?;

    let mut header = vec!["stage", "input", "passed", "discarded", "deduplicated"];
    header.extend(DiscardReason::ALL.iter().map(|r| r.as_str()));
    writer.write_record(&header).map_err(|e| csv_error(p, e))?;

    for (stage, cnt) in counters.iter() {
        let mut row = vec![
            stage.as_str().to_string(),
            cnt.input.to_string(),
            cnt.passed.to_string(),
            cnt.discarded.to_string(),
            cnt.deduplicated.to_string(),
        ];
        row.extend(
            DiscardReason::ALL
                .iter()
                .map(|r| cnt.num_discarded_for(*r).to_string()),
        );
        writer.write_record(&row).map_err(|e| csv_error(p, e))?;
    }
    writer.flush()?;
    Ok(())
}

///////////////////////////////
/// One read that did not make it to the matrix
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiscardedRecord {
    pub pair_id: u64,
    pub read_name: String,
    pub stage: String,
    pub outcome: String,
}

impl DiscardedRecord {
    ///////////////////////////////
    /// Returns None for reads that passed
    pub fn from_verdict<T>(
        pair_id: PairId,
        read_name: &[u8],
        stage: Stage,
        verdict: &Verdict<T>,
    ) -> Option<DiscardedRecord> {
        let outcome = match verdict {
            Verdict::Pass(_) => return None,
            Verdict::Discarded(reason) => reason.as_str().to_string(),
            Verdict::Deduplicated(first) => format!("duplicate_of:{}", first),
        };
        Some(DiscardedRecord {
            pair_id: pair_id.0,
            read_name: String::from_utf8_lossy(read_name).to_string(),
            stage: stage.as_str().to_string(),
            outcome,
        })
    }
}

pub fn write_discarded(p: &Path, records: &[DiscardedRecord]) -> Result<(), Error> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .from_path(p)
        .map_err(|e| csv_error(p, e))?;
    for rec in records {
        writer.serialize(rec).map_err(|e| csv_error(p, e))?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_stage_counters() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("counters.tsv");

        let mut counters = StageCounters::new();
        counters.record(Stage::Trimming, &Verdict::Pass(()));
        counters.record(Stage::Trimming, &Verdict::<()>::Discarded(DiscardReason::TooShort));
        counters.record(Stage::Dedup, &Verdict::<()>::Deduplicated(PairId(0)));
        write_stage_counters(&path, &counters).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("stage\tinput\tpassed\tdiscarded\tdeduplicated\ttoo_short\t"));
        assert!(lines[1].starts_with("trimming\t2\t1\t1\t0\t1\t0"));
        assert!(lines[2].starts_with("dedup\t1\t0\t0\t1\t0"));
    }

    #[test]
    fn test_discarded_records() {
        assert_eq!(
            DiscardedRecord::from_verdict(PairId(3), b"r3", Stage::Trimming, &Verdict::Pass(())),
            None
        );

        let dup = DiscardedRecord::from_verdict(
            PairId(4),
            b"r4",
            Stage::Dedup,
            &Verdict::<()>::Deduplicated(PairId(1)),
        )
        .unwrap();
        assert_eq!(dup.outcome, "duplicate_of:1");

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("discarded.tsv");
        let chim = DiscardedRecord::from_verdict(
            PairId(5),
            b"r5",
            Stage::Dedup,
            &Verdict::<()>::Discarded(DiscardReason::Chimeric),
        )
        .unwrap();
        write_discarded(&path, &[dup, chim]).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            text,
            "pair_id\tread_name\tstage\toutcome\n4\tr4\tdedup\tduplicate_of:1\n5\tr5\tdedup\tchimeric\n"
        );
    }
}
