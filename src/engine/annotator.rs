use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use rustc_hash::FxHashSet;

use super::aligner::AlignmentOutput;
use super::process::run_engine;
use super::sam::parse_pair_id;
use crate::common::{PairId, Stage};
use crate::runtime::Error;

const FLAG_SECONDARY: u16 = 0x100;
const FLAG_SUPPLEMENTARY: u16 = 0x800;

///////////////////////////////
/// How a read overlapping several features is resolved
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum HtseqMode {
    Union,
    IntersectionStrict,
    IntersectionNonempty,
}

impl HtseqMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            HtseqMode::Union => "union",
            HtseqMode::IntersectionStrict => "intersection-strict",
            HtseqMode::IntersectionNonempty => "intersection-nonempty",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum Strandedness {
    Yes,
    No,
    Reverse,
}

impl Strandedness {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strandedness::Yes => "yes",
            Strandedness::No => "no",
            Strandedness::Reverse => "reverse",
        }
    }
}

///////////////////////////////
/// Settings passed unchanged to the counting engine
#[derive(Clone, Debug)]
pub struct AnnotationParams {
    pub mode: HtseqMode,
    pub no_ambiguous: bool,
    pub strandedness: Strandedness,
    pub feature_type: String,
    pub id_attribute: String,
}

impl Default for AnnotationParams {
    fn default() -> Self {
        AnnotationParams {
            mode: HtseqMode::IntersectionNonempty,
            no_ambiguous: false,
            strandedness: Strandedness::Yes,
            feature_type: "exon".to_string(),
            id_attribute: "gene_id".to_string(),
        }
    }
}

///////////////////////////////
/// What the counting engine decided for one read
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FeatureAssignment {
    Gene(String),
    /// Overlaps several genes; holds the engine's label, e.g. __ambiguous[g1+g2]
    Ambiguous(String),
    NoFeature,
}

impl FeatureAssignment {
    ///////////////////////////////
    /// Interpret an htseq-count XF label
    pub fn from_label(label: &str) -> FeatureAssignment {
        if label.starts_with("__ambiguous") {
            FeatureAssignment::Ambiguous(label.to_string())
        } else if label.starts_with("__") || label.is_empty() {
            FeatureAssignment::NoFeature
        } else {
            FeatureAssignment::Gene(label.to_string())
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GeneAssignment {
    pub pair_id: PairId,
    pub feature: FeatureAssignment,
}

///////////////////////////////
/// Capability of assigning aligned reads to genes of a gene model.
/// Any invocation failure is fatal for the run
pub trait AnnotationEngine {
    fn name(&self) -> &str;

    /// Pre-flight check that the engine can be started
    fn check_available(&self) -> Result<(), Error> {
        Ok(())
    }

    fn annotate(
        &self,
        alignments: &AlignmentOutput,
        path_annotation: &Path,
        params: &AnnotationParams,
        workdir: &Path,
    ) -> Result<Vec<GeneAssignment>, Error>;
}

///////////////////////////////
/// htseq-count, reporting per-read assignments through its SAM output (XF tag)
#[derive(Debug, Clone)]
pub struct HtseqCount {
    pub binary: PathBuf,
    pub timeout: Duration,
}

impl HtseqCount {
    pub fn new(timeout: Duration) -> HtseqCount {
        HtseqCount {
            binary: PathBuf::from("htseq-count"),
            timeout,
        }
    }

    pub fn build_command(
        &self,
        path_alignments: &Path,
        path_annotation: &Path,
        params: &AnnotationParams,
        path_samout: &Path,
    ) -> Command {
        let nonunique = if params.no_ambiguous { "none" } else { "all" };

        let mut cmd = Command::new(&self.binary);
        cmd.args(["-f", "bam", "-r", "name"])
            .arg("-s")
            .arg(params.strandedness.as_str())
            .arg("-t")
            .arg(&params.feature_type)
            .arg("-i")
            .arg(&params.id_attribute)
            .arg("-m")
            .arg(params.mode.as_str())
            .arg("--nonunique")
            .arg(nonunique)
            .arg("-o")
            .arg(path_samout)
            .arg(path_alignments)
            .arg(path_annotation);
        cmd
    }
}

impl AnnotationEngine for HtseqCount {
    fn name(&self) -> &str {
        "htseq-count"
    }

    fn check_available(&self) -> Result<(), Error> {
        crate::utils::check_executable(&self.binary.to_string_lossy())
    }

    fn annotate(
        &self,
        alignments: &AlignmentOutput,
        path_annotation: &Path,
        params: &AnnotationParams,
        workdir: &Path,
    ) -> Result<Vec<GeneAssignment>, Error> {
        let path_alignments = alignments.path.as_ref().ok_or_else(|| {
            Error::engine_invocation(
                Stage::Annotation,
                self.name(),
                "",
                None,
                Some("aligner did not provide an alignment file"),
            )
        })?;

        let path_samout = workdir.join("annotated.sam");
        let cmd = self.build_command(path_alignments, path_annotation, params, &path_samout);
        run_engine(
            Stage::Annotation,
            &self.binary.to_string_lossy(),
            cmd,
            workdir,
            self.timeout,
        )?;

        parse_htseq_samout(&path_samout)
    }
}

///////////////////////////////
/// Parse the SAM written by htseq-count -o. First primary line per read wins
pub fn parse_htseq_samout(path: &Path) -> Result<Vec<GeneAssignment>, Error> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .flexible(true)
        .quoting(false)
        .comment(Some(b'@'))
        .from_path(path)
        .map_err(|e| Error::parse_error(format!("annotation {:?}", path), Some(e.to_string())))?;

    let mut seen: FxHashSet<PairId> = FxHashSet::default();
    let mut out = Vec::new();
    for result in reader.byte_records() {
        let record = result
            .map_err(|e| Error::parse_error(format!("annotation {:?}", path), Some(e.to_string())))?;

        let flags: u16 = record
            .get(1)
            .and_then(|f| std::str::from_utf8(f).ok())
            .and_then(|f| f.parse().ok())
            .ok_or_else(|| {
                Error::parse_error(format!("annotation {:?}", path), Some("invalid FLAG field"))
            })?;
        if flags & (FLAG_SECONDARY | FLAG_SUPPLEMENTARY) != 0 {
            continue;
        }

        let pair_id = parse_pair_id(record.get(0).unwrap_or_default())?;
        if !seen.insert(pair_id) {
            continue;
        }

        let label = record
            .iter()
            .skip(11)
            .find_map(|field| field.strip_prefix(b"XF:Z:"))
            .map(|l| String::from_utf8_lossy(l).to_string())
            .unwrap_or_default();

        out.push(GeneAssignment {
            pair_id,
            feature: FeatureAssignment::from_label(&label),
        });
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::command_to_string;
    use std::io::Write;

    #[test]
    fn test_from_label() {
        assert_eq!(
            FeatureAssignment::from_label("ENSMUSG00000024831"),
            FeatureAssignment::Gene("ENSMUSG00000024831".to_string())
        );
        assert_eq!(
            FeatureAssignment::from_label("__ambiguous[g1+g2]"),
            FeatureAssignment::Ambiguous("__ambiguous[g1+g2]".to_string())
        );
        assert_eq!(FeatureAssignment::from_label("__no_feature"), FeatureAssignment::NoFeature);
        assert_eq!(FeatureAssignment::from_label("__too_low_aQual"), FeatureAssignment::NoFeature);
    }

    #[test]
    fn test_htseq_command_passes_settings() {
        let engine = HtseqCount::new(Duration::from_secs(60));
        let params = AnnotationParams {
            mode: HtseqMode::IntersectionStrict,
            no_ambiguous: true,
            ..AnnotationParams::default()
        };
        let cmd = engine.build_command(
            Path::new("aln.bam"),
            Path::new("genes.gtf"),
            &params,
            Path::new("out.sam"),
        );
        let s = command_to_string(&cmd);
        assert!(s.contains("-m intersection-strict"));
        assert!(s.contains("--nonunique none"));
        assert!(s.contains("-s yes"));
        assert!(s.ends_with("-o out.sam aln.bam genes.gtf"));
    }

    #[test]
    fn test_parse_samout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("annotated.sam");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, "@SQ\tSN:chr19\tLN:1000").unwrap();
        writeln!(f, "0\t0\tchr19\t101\t255\t4M\t*\t0\t0\tACGT\tIIII\tNH:i:1\tXF:Z:Gene1").unwrap();
        writeln!(f, "0\t256\tchr19\t301\t3\t4M\t*\t0\t0\tACGT\tIIII\tXF:Z:Gene9").unwrap();
        writeln!(f, "3\t16\tchr19\t201\t255\t4M\t*\t0\t0\tACGT\tIIII\tXF:Z:__ambiguous[Gene1+Gene2]").unwrap();
        writeln!(f, "5\t0\tchr19\t901\t255\t4M\t*\t0\t0\tACGT\tIIII\tXF:Z:__no_feature").unwrap();
        drop(f);

        let out = parse_htseq_samout(&path).unwrap();
        assert_eq!(
            out,
            vec![
                GeneAssignment {
                    pair_id: PairId(0),
                    feature: FeatureAssignment::Gene("Gene1".to_string())
                },
                GeneAssignment {
                    pair_id: PairId(3),
                    feature: FeatureAssignment::Ambiguous("__ambiguous[Gene1+Gene2]".to_string())
                },
                GeneAssignment {
                    pair_id: PairId(5),
                    feature: FeatureAssignment::NoFeature
                },
            ]
        );
    }
}
