use std::path::PathBuf;

use log::{debug, error, info, warn};
use rayon::iter::{IndexedParallelIterator, IntoParallelRefIterator, ParallelIterator};
use rustc_hash::{FxHashMap, FxHashSet};

use super::params;
use super::sanity;
use super::state::PipelineState;
use crate::barcode::{BarcodeDictionary, BarcodeMatch, BarcodeMatcher};
use crate::common::{
    DiscardReason, PairId, ReadPair, Stage, StageCounters, Verdict, DEMUX_MIN_BATCH,
};
use crate::engine::{Aligner, AlignmentOutput, AnnotationEngine, FeatureAssignment};
use crate::fileformat::paired_fastq::write_reverse_reads_for_engine;
use crate::fileformat::stage_report::{write_discarded, write_stage_counters};
use crate::fileformat::{DiscardedRecord, ExpressionMatrix, PairedFastqReader};
use crate::runtime::Error;
use crate::trim::{screen_contaminants, ReadFilter};
use crate::umi::{ChimeraDetector, SeenMolecules};

///////////////////////////////
/// Result of a completed run
#[derive(Debug)]
pub struct PipelineOutcome {
    pub matrix: ExpressionMatrix,
    pub counters: StageCounters,
    pub state: PipelineState,
    pub num_molecules: usize,
}

///////////////////////////////
/// Mutable state of one run. Created per run and threaded through every stage
#[derive(Debug)]
pub struct RunContext {
    pub state: PipelineState,
    pub counters: StageCounters,
    pub seen: SeenMolecules,
    discarded: Option<Vec<DiscardedRecord>>,
}

impl RunContext {
    pub fn new(keep_discarded: bool) -> RunContext {
        RunContext {
            state: PipelineState::Init,
            counters: StageCounters::new(),
            seen: SeenMolecules::new(),
            discarded: if keep_discarded { Some(Vec::new()) } else { None },
        }
    }

    fn enter(&mut self, next: PipelineState) {
        debug_assert_eq!(self.state.next(), Some(next));
        self.state = next;
        if let PipelineState::Running(stage) = next {
            self.counters.touch(stage);
            info!("Starting stage {}", stage);
        }
    }

    fn record<T>(&mut self, stage: Stage, rp: &ReadPair, verdict: &Verdict<T>) {
        self.counters.record(stage, verdict);
        if let Some(list) = self.discarded.as_mut() {
            if let Some(rec) = DiscardedRecord::from_verdict(rp.id, &rp.name, stage, verdict) {
                list.push(rec);
            }
        }
    }

    fn finish_stage(&mut self, stage: Stage) -> Result<(), Error> {
        self.counters.log_stage(stage);
        if let Some(cnt) = self.counters.get(stage) {
            if cnt.input > 0 && cnt.passed == 0 {
                warn!("No reads survived stage {}", stage);
            }
        }
        self.counters.check_integrity()
    }
}

///////////////////////////////
/// Runs all stages in order. Engines are injected so that the run can be driven without real tools
pub struct Pipeline {
    aligner: Box<dyn Aligner>,
    annotator: Box<dyn AnnotationEngine>,
}

impl Pipeline {
    pub fn new(aligner: Box<dyn Aligner>, annotator: Box<dyn AnnotationEngine>) -> Pipeline {
        Pipeline { aligner, annotator }
    }

    ///////////////////////////////
    /// Run to Done, or to Failed with a failure report in the log
    pub fn run(
        &self,
        params_io: &params::IO,
        params_runtime: &params::Runtime,
        params_threading: &params::Threading,
    ) -> Result<PipelineOutcome, Error> {
        info!("Running command: pipeline");
        info!("Experiment name: {}", params_io.exp_name);

        let mut ctx = RunContext::new(params_runtime.keep_discarded_files);
        match self.run_stages(params_io, params_runtime, params_threading, &mut ctx) {
            Ok(matrix) => {
                info!("Stage counters:");
                ctx.counters.log_snapshot(log::Level::Info);
                Ok(PipelineOutcome {
                    matrix,
                    counters: ctx.counters,
                    state: ctx.state,
                    num_molecules: ctx.seen.num_molecules(),
                })
            }
            Err(e) => {
                ctx.state = ctx.state.fail();
                report_failure(&e, &ctx, params_io);
                Err(e)
            }
        }
    }

    fn run_stages(
        &self,
        params_io: &params::IO,
        params_runtime: &params::Runtime,
        params_threading: &params::Threading,
        ctx: &mut RunContext,
    ) -> Result<ExpressionMatrix, Error> {
        sanity::check(
            params_io,
            params_runtime,
            self.aligner.as_ref(),
            self.annotator.as_ref(),
        )?;

        let dict = BarcodeDictionary::from_path(&params_io.path_ids)?;
        if dict.barcode_length() != params_runtime.demux.barcode_length {
            return Err(Error::configuration(
                &params_io.path_ids,
                Some(format!(
                    "barcodes have length {} but barcode_length is {}",
                    dict.barcode_length(),
                    params_runtime.demux.barcode_length
                )),
            ));
        }
        let matcher = BarcodeMatcher::new(dict, params_runtime.demux.allowed_missed);

        let thread_pool = rayon::ThreadPoolBuilder::new()
            .num_threads(params_threading.threads_work)
            .build()
            .map_err(|e| Error::invalid_parameter("threads", e.to_string()))?;

        let reads = self.run_trimming(params_io, params_runtime, ctx)?;
        let reads = self.run_contaminant_filter(params_io, params_runtime, reads, ctx)?;
        let reads = run_demux(&matcher, &params_runtime.demux, reads, &thread_pool, ctx)?;
        let reads = run_dedup(&params_runtime.demux, reads, ctx)?;
        let (reads, alignments) = self.run_alignment(params_io, reads, ctx)?;
        let matrix =
            self.run_annotation(params_io, params_runtime, &matcher, reads, &alignments, ctx)?;

        ctx.enter(PipelineState::Aggregate);
        aggregate(params_io, params_runtime, &matrix, ctx)?;
        ctx.enter(PipelineState::Done);
        info!("Pipeline has finished successfully");
        Ok(matrix)
    }

    ///////////////////////////////
    /// Length and quality checks on every input pair
    fn run_trimming(
        &self,
        params_io: &params::IO,
        params_runtime: &params::Runtime,
        ctx: &mut RunContext,
    ) -> Result<Vec<ReadPair>, Error> {
        ctx.enter(PipelineState::Running(Stage::Trimming));
        let filter = ReadFilter::new(params_runtime.filter.clone());

        let mut survivors = Vec::new();
        for rp in PairedFastqReader::new(&params_io.path_forward, &params_io.path_reverse)? {
            let rp = rp?;
            let verdict = filter.filter(&rp);
            ctx.record(Stage::Trimming, &rp, &verdict);
            if let Verdict::Pass(trimmed) = verdict {
                survivors.push(trimmed);
            }
        }

        ctx.finish_stage(Stage::Trimming)?;
        Ok(survivors)
    }

    ///////////////////////////////
    /// Align against the contaminant index and drop what aligns well enough
    fn run_contaminant_filter(
        &self,
        params_io: &params::IO,
        params_runtime: &params::Runtime,
        reads: Vec<ReadPair>,
        ctx: &mut RunContext,
    ) -> Result<Vec<ReadPair>, Error> {
        let stage = Stage::ContaminantFilter;
        ctx.enter(PipelineState::Running(stage));

        let screened = match &params_io.path_contaminant_index {
            Some(path_index) if !reads.is_empty() => {
                let workdir = stage_workdir(params_io, stage)?;
                let path_reads = workdir.join("reads.fastq");
                write_reverse_reads_for_engine(&path_reads, &reads)?;

                let out = self
                    .aligner
                    .align(stage, &path_reads, path_index, &workdir)?;
                check_known_reads(
                    stage,
                    reads.iter().map(|rp| rp.id),
                    out.records.iter().map(|r| r.pair_id),
                )?;
                debug!("{} alignments against the contaminant index", out.records.len());
                screen_contaminants(reads, &out.records, params_runtime.contaminant_min_identity)
            }
            Some(_) => Vec::new(),
            None => {
                info!("No contaminant index given; skipping contaminant screen");
                reads.into_iter().map(|rp| (rp, Verdict::Pass(()))).collect()
            }
        };

        let mut survivors = Vec::with_capacity(screened.len());
        for (rp, verdict) in screened {
            ctx.record(stage, &rp, &verdict);
            if verdict.is_pass() {
                survivors.push(rp);
            }
        }

        ctx.finish_stage(stage)?;
        Ok(survivors)
    }

    ///////////////////////////////
    /// Align to the reference; reads without a primary alignment are dropped
    fn run_alignment(
        &self,
        params_io: &params::IO,
        reads: Vec<(ReadPair, usize)>,
        ctx: &mut RunContext,
    ) -> Result<(Vec<(ReadPair, usize)>, AlignmentOutput), Error> {
        let stage = Stage::Alignment;
        ctx.enter(PipelineState::Running(stage));

        if reads.is_empty() {
            ctx.finish_stage(stage)?;
            return Ok((reads, AlignmentOutput::default()));
        }

        let workdir = stage_workdir(params_io, stage)?;
        let path_reads = workdir.join("reads.fastq");
        write_reverse_reads_for_engine(&path_reads, reads.iter().map(|(rp, _)| rp))?;

        let alignments = self
            .aligner
            .align(stage, &path_reads, &params_io.path_ref_map, &workdir)?;
        check_known_reads(
            stage,
            reads.iter().map(|(rp, _)| rp.id),
            alignments.records.iter().map(|r| r.pair_id),
        )?;
        let mapped: FxHashSet<PairId> = alignments.records.iter().map(|r| r.pair_id).collect();

        let mut survivors = Vec::with_capacity(mapped.len());
        for (rp, spot) in reads {
            let verdict = if mapped.contains(&rp.id) {
                Verdict::Pass(())
            } else {
                Verdict::Discarded(DiscardReason::Unmapped)
            };
            ctx.record(stage, &rp, &verdict);
            if verdict.is_pass() {
                survivors.push((rp, spot));
            }
        }

        ctx.finish_stage(stage)?;
        Ok((survivors, alignments))
    }

    ///////////////////////////////
    /// Assign aligned reads to genes and count them per spot
    fn run_annotation(
        &self,
        params_io: &params::IO,
        params_runtime: &params::Runtime,
        matcher: &BarcodeMatcher,
        reads: Vec<(ReadPair, usize)>,
        alignments: &AlignmentOutput,
        ctx: &mut RunContext,
    ) -> Result<ExpressionMatrix, Error> {
        let stage = Stage::Annotation;
        ctx.enter(PipelineState::Running(stage));

        let mut matrix = ExpressionMatrix::new();
        if reads.is_empty() {
            ctx.finish_stage(stage)?;
            return Ok(matrix);
        }

        let workdir = stage_workdir(params_io, stage)?;
        let params_annotation = &params_runtime.annotation;
        let assignments = self.annotator.annotate(
            alignments,
            &params_io.path_ref_annotation,
            params_annotation,
            &workdir,
        )?;

        //Unmapped reads may also be reported; they were already accounted for
        let mut by_read: FxHashMap<PairId, FeatureAssignment> = FxHashMap::default();
        for a in assignments {
            by_read.entry(a.pair_id).or_insert(a.feature);
        }

        for (rp, spot) in reads {
            let verdict = match by_read.remove(&rp.id) {
                Some(FeatureAssignment::Gene(gene)) => Verdict::Pass(gene),
                Some(FeatureAssignment::Ambiguous(_)) if params_annotation.no_ambiguous => {
                    Verdict::Discarded(DiscardReason::AmbiguousGene)
                }
                Some(FeatureAssignment::Ambiguous(label)) => Verdict::Pass(label),
                Some(FeatureAssignment::NoFeature) | None => {
                    Verdict::Discarded(DiscardReason::NoFeature)
                }
            };
            ctx.record(stage, &rp, &verdict);
            if let Verdict::Pass(gene) = verdict {
                matrix.add(&matcher.dictionary().get(spot).identifier, &gene, 1);
            }
        }

        ctx.finish_stage(stage)?;
        Ok(matrix)
    }
}

///////////////////////////////
/// Spatial barcode of one read, with its molecular barcode attached if used
fn demultiplex_read(
    matcher: &BarcodeMatcher,
    params_demux: &params::DemuxParams,
    rp: &ReadPair,
) -> Verdict<BarcodeMatch> {
    let observed = match rp.r1.get(params_demux.barcode_start..params_demux.barcode_end()) {
        Some(observed) => observed,
        None => return Verdict::Discarded(DiscardReason::TooShort),
    };
    let umi = if params_demux.molecular_barcodes {
        match rp.r1.get(params_demux.umi_start..params_demux.umi_end) {
            Some(umi) => Some(umi.to_vec()),
            None => return Verdict::Discarded(DiscardReason::TooShort),
        }
    } else {
        None
    };
    matcher.find(observed).map(|mut m| {
        m.molecular_barcode = umi;
        m
    })
}

///////////////////////////////
/// Barcode matching in parallel. Verdicts come back in input order
fn run_demux(
    matcher: &BarcodeMatcher,
    params_demux: &params::DemuxParams,
    reads: Vec<ReadPair>,
    thread_pool: &rayon::ThreadPool,
    ctx: &mut RunContext,
) -> Result<Vec<(ReadPair, BarcodeMatch)>, Error> {
    let stage = Stage::BarcodeDemux;
    ctx.enter(PipelineState::Running(stage));

    let verdicts: Vec<Verdict<BarcodeMatch>> = thread_pool.install(|| {
        reads
            .par_iter()
            .with_min_len(DEMUX_MIN_BATCH)
            .map(|rp| demultiplex_read(matcher, params_demux, rp))
            .collect()
    });

    let mut survivors = Vec::with_capacity(reads.len());
    for (rp, verdict) in reads.into_iter().zip(verdicts) {
        ctx.record(stage, &rp, &verdict);
        if let Verdict::Pass(m) = verdict {
            survivors.push((rp, m));
        }
    }

    ctx.finish_stage(stage)?;
    Ok(survivors)
}

///////////////////////////////
/// Chimera and duplicate removal. Sequential, in input order
fn run_dedup(
    params_demux: &params::DemuxParams,
    reads: Vec<(ReadPair, BarcodeMatch)>,
    ctx: &mut RunContext,
) -> Result<Vec<(ReadPair, usize)>, Error> {
    let stage = Stage::Dedup;
    ctx.enter(PipelineState::Running(stage));

    let detector = ChimeraDetector::new(params_demux.molecular_barcodes, params_demux.allowed_kimera);
    let mut survivors = Vec::with_capacity(reads.len());
    for (rp, m) in reads {
        let verdict = detector.classify(rp.id, &m, &mut ctx.seen);
        ctx.record(stage, &rp, &verdict);
        if verdict.is_pass() {
            survivors.push((rp, m.spot));
        }
    }

    if params_demux.molecular_barcodes {
        info!(
            "{} distinct molecules over {} spots",
            ctx.seen.num_molecules(),
            ctx.seen.num_spots()
        );
    }

    ctx.finish_stage(stage)?;
    Ok(survivors)
}

///////////////////////////////
/// Final accounting checks, then persist the matrix and reports
fn aggregate(
    params_io: &params::IO,
    params_runtime: &params::Runtime,
    matrix: &ExpressionMatrix,
    ctx: &mut RunContext,
) -> Result<(), Error> {
    ctx.counters.check_integrity()?;

    let assigned = ctx
        .counters
        .get(Stage::Annotation)
        .map(|cnt| cnt.passed)
        .unwrap_or(0);
    if matrix.total() != assigned {
        return Err(Error::integrity_violation(
            Stage::Annotation,
            format!(
                "matrix holds {} reads but {} were assigned a gene",
                matrix.total(),
                assigned
            ),
        ));
    }

    let path_matrix = params_io.path_matrix();
    if matrix.is_empty() {
        warn!("No reads were assigned a gene, the count matrix is empty");
    }
    matrix.save_to_tsv(&path_matrix)?;
    info!(
        "Wrote {} spots x {} genes to {:?}",
        matrix.spots().len(),
        matrix.genes().len(),
        path_matrix
    );

    write_stage_counters(&params_io.path_stage_counters(), &ctx.counters)?;
    if let Some(list) = &ctx.discarded {
        write_discarded(&params_io.path_discarded(), list)?;
        info!("Wrote {} discarded reads to {:?}", list.len(), params_io.path_discarded());
    }

    if params_runtime.clean {
        clean_workdirs(params_io)?;
    }
    Ok(())
}

///////////////////////////////
/// Per-stage scratch directory under the temp folder
fn stage_workdir(params_io: &params::IO, stage: Stage) -> Result<PathBuf, Error> {
    let workdir = params_io.path_tmp.join(stage.as_str());
    std::fs::create_dir_all(&workdir)?;
    Ok(workdir)
}

fn clean_workdirs(params_io: &params::IO) -> Result<(), Error> {
    for stage in Stage::ALL {
        let workdir = params_io.path_tmp.join(stage.as_str());
        if workdir.is_dir() {
            debug!("Removing {:?}", workdir);
            std::fs::remove_dir_all(&workdir)?;
        }
    }
    Ok(())
}

///////////////////////////////
/// An engine must only report reads it was given
fn check_known_reads(
    stage: Stage,
    given: impl Iterator<Item = PairId>,
    reported: impl Iterator<Item = PairId>,
) -> Result<(), Error> {
    let given: FxHashSet<PairId> = given.collect();
    for id in reported {
        if !given.contains(&id) {
            return Err(Error::integrity_violation(
                stage,
                format!("engine reported read {} which it was not given", id),
            ));
        }
    }
    Ok(())
}

///////////////////////////////
/// Human-readable report of a failed run: kind, stage, cause, and the counters so far
fn report_failure(e: &Error, ctx: &RunContext, params_io: &params::IO) {
    error!("Pipeline failed with {}", e.kind());
    match e.stage().or(ctx.state.stage()) {
        Some(stage) => error!("Failed stage: {}", stage),
        None => error!("Failed before any stage started"),
    }
    error!("{}", e);

    if ctx.counters.is_empty() {
        return;
    }
    error!("Stage counters at failure:");
    ctx.counters.log_snapshot(log::Level::Error);
    if params_io.path_output.is_dir() {
        if let Err(e) = write_stage_counters(&params_io.path_stage_counters(), &ctx.counters) {
            warn!("Could not write stage counters: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::barcode::SpatialBarcodeEntry;

    fn matcher() -> BarcodeMatcher {
        let dict = BarcodeDictionary::from_entries(vec![
            SpatialBarcodeEntry {
                sequence: b"AAAAAAAA".to_vec(),
                identifier: "1x1".to_string(),
            },
            SpatialBarcodeEntry {
                sequence: b"CCCCCCCC".to_vec(),
                identifier: "1x2".to_string(),
            },
        ])
        .unwrap();
        BarcodeMatcher::new(dict, 1)
    }

    fn demux_params(molecular_barcodes: bool) -> params::DemuxParams {
        params::DemuxParams {
            allowed_missed: 1,
            allowed_kimera: 1,
            barcode_start: 0,
            barcode_length: 8,
            molecular_barcodes,
            umi_start: 8,
            umi_end: 12,
        }
    }

    fn read(r1: &str) -> ReadPair {
        ReadPair {
            id: PairId(0),
            name: b"r0".to_vec(),
            r1: r1.as_bytes().to_vec(),
            q1: vec![b'I'; r1.len()],
            r2: b"ACGT".to_vec(),
            q2: b"IIII".to_vec(),
        }
    }

    #[test]
    fn test_demultiplex_attaches_umi() {
        let verdict = demultiplex_read(&matcher(), &demux_params(true), &read("CCCCCCCATTTG"));
        assert_eq!(
            verdict,
            Verdict::Pass(BarcodeMatch {
                spot: 1,
                mismatches: 1,
                molecular_barcode: Some(b"TTTG".to_vec()),
            })
        );
    }

    #[test]
    fn test_demultiplex_forward_read_ending_inside_umi() {
        let verdict = demultiplex_read(&matcher(), &demux_params(true), &read("AAAAAAAATT"));
        assert_eq!(verdict, Verdict::Discarded(DiscardReason::TooShort));

        // Without molecular barcodes the barcode alone is enough
        let verdict = demultiplex_read(&matcher(), &demux_params(false), &read("AAAAAAAATT"));
        assert!(verdict.is_pass());
    }
}
