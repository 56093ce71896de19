use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use super::process::run_engine;
use super::sam::{read_primary_alignments, AlignmentRecord};
use crate::common::Stage;
use crate::runtime::Error;

///////////////////////////////
/// What an aligner hands back: primary alignments, and the alignment file for downstream engines
#[derive(Debug, Clone, Default)]
pub struct AlignmentOutput {
    pub records: Vec<AlignmentRecord>,
    pub path: Option<PathBuf>,
}

///////////////////////////////
/// Capability of aligning reads (FASTQ, read names are pair ids) against a pre-built index.
/// Any invocation failure is fatal for the run
pub trait Aligner {
    fn name(&self) -> &str;

    /// Pre-flight check that the engine can be started
    fn check_available(&self) -> Result<(), Error> {
        Ok(())
    }

    fn align(
        &self,
        stage: Stage,
        path_reads: &Path,
        path_index: &Path,
        workdir: &Path,
    ) -> Result<AlignmentOutput, Error>;
}

///////////////////////////////
/// STAR, writing an unsorted BAM with unmapped reads kept
#[derive(Debug, Clone)]
pub struct StarAligner {
    pub binary: PathBuf,
    pub threads: usize,
    pub timeout: Duration,
    /// Reads mapping to more loci than this are reported unmapped
    pub multimap_max: u32,
}

impl StarAligner {
    pub fn new(threads: usize, timeout: Duration) -> StarAligner {
        StarAligner {
            binary: PathBuf::from("STAR"),
            threads,
            timeout,
            multimap_max: 1,
        }
    }

    pub fn build_command(&self, path_reads: &Path, path_index: &Path, workdir: &Path) -> Command {
        let mut prefix = workdir.as_os_str().to_os_string();
        prefix.push("/");

        let mut cmd = Command::new(&self.binary);
        cmd.arg("--runThreadN")
            .arg(self.threads.to_string())
            .arg("--genomeDir")
            .arg(path_index)
            .arg("--readFilesIn")
            .arg(path_reads)
            .arg("--outFileNamePrefix")
            .arg(prefix)
            .arg("--outSAMtype")
            .arg("BAM")
            .arg("Unsorted")
            .arg("--outSAMunmapped")
            .arg("Within")
            .arg("--outSAMattributes")
            .args(["NH", "HI", "AS", "nM", "NM"])
            .arg("--outFilterMultimapNmax")
            .arg(self.multimap_max.to_string());
        cmd
    }
}

impl Aligner for StarAligner {
    fn name(&self) -> &str {
        "STAR"
    }

    fn check_available(&self) -> Result<(), Error> {
        crate::utils::check_executable(&self.binary.to_string_lossy())
    }

    fn align(
        &self,
        stage: Stage,
        path_reads: &Path,
        path_index: &Path,
        workdir: &Path,
    ) -> Result<AlignmentOutput, Error> {
        let cmd = self.build_command(path_reads, path_index, workdir);
        run_engine(stage, &self.binary.to_string_lossy(), cmd, workdir, self.timeout)?;

        let path_bam = workdir.join("Aligned.out.bam");
        if !path_bam.exists() {
            return Err(Error::engine_invocation(
                stage,
                self.name(),
                crate::utils::command_to_string(&self.build_command(path_reads, path_index, workdir)),
                Some(0),
                Some(format!("expected output {:?} was not written", path_bam)),
            ));
        }

        Ok(AlignmentOutput {
            records: read_primary_alignments(&path_bam)?,
            path: Some(path_bam),
        })
    }
}
