use anyhow::Result;
use clap::Args;
use std::path::PathBuf;
use std::time::Duration;

use super::core::core::Pipeline;
use super::core::params;
use crate::engine::{AnnotationParams, HtseqCount, HtseqMode, StarAligner, Strandedness};
use crate::trim::FilterParams;
use crate::utils::determine_thread_counts;

pub const DEFAULT_PATH_TEMP: &str = "temp";
pub const DEFAULT_EXP_NAME: &str = "st_experiment";

///////////////////////////////
/// Process raw spatial transcriptomics reads into a spot by gene count matrix
#[derive(Args, Debug, Clone)]
pub struct PipelineCMD {
    // Inputs
    #[arg(long = "fw", value_parser)]
    pub path_forward: PathBuf,
    #[arg(long = "rv", value_parser)]
    pub path_reverse: PathBuf,
    #[arg(long = "ids", value_parser)]
    pub path_ids: PathBuf,
    #[arg(long = "ref-map", value_parser)]
    pub path_ref_map: PathBuf,
    #[arg(long = "ref-annotation", value_parser)]
    pub path_ref_annotation: PathBuf,
    #[arg(long = "contaminant-index", value_parser)]
    pub path_contaminant_index: Option<PathBuf>,

    // Outputs
    #[arg(short = 'o', long = "output-folder", value_parser)]
    pub path_output: PathBuf,
    #[arg(short = 't', long = "temp-folder", value_parser, default_value = DEFAULT_PATH_TEMP)]
    pub path_tmp: PathBuf,
    #[arg(long = "exp-name", default_value = DEFAULT_EXP_NAME)]
    pub exp_name: String,
    #[arg(long = "keep-discarded-files")]
    pub keep_discarded_files: bool,
    #[arg(long = "clean")]
    pub clean: bool,

    // Spatial and molecular barcodes
    #[arg(long = "allowed-missed", default_value_t = 6)]
    pub allowed_missed: u32,
    #[arg(long = "allowed-kimera", default_value_t = 7)]
    pub allowed_kimera: u32,
    #[arg(long = "barcode-start", default_value_t = 0)]
    pub barcode_start: usize,
    #[arg(long = "barcode-length", default_value_t = 27)]
    pub barcode_length: usize,
    #[arg(long = "molecular-barcodes")]
    pub molecular_barcodes: bool,
    #[arg(long = "umi-start", default_value_t = 18)]
    pub umi_start: usize,
    #[arg(long = "umi-end", default_value_t = 27)]
    pub umi_end: usize,

    // Trimming
    #[arg(long = "min-length-trimming", default_value_t = 28)]
    pub min_length_trimming: usize,
    #[arg(long = "min-quality-trimming", default_value_t = 20)]
    pub min_quality_trimming: u8,
    #[arg(long = "trimming-fw", default_value_t = 0)]
    pub trimming_fw: usize,
    #[arg(long = "trimming-rv", default_value_t = 0)]
    pub trimming_rv: usize,
    #[arg(long = "contaminant-min-identity", default_value_t = 0.0)]
    pub contaminant_min_identity: f64,

    // Annotation
    #[arg(long = "htseq-mode", value_enum, default_value_t = HtseqMode::IntersectionNonempty)]
    pub htseq_mode: HtseqMode,
    #[arg(long = "htseq-no-ambiguous")]
    pub htseq_no_ambiguous: bool,
    #[arg(long = "strandedness", value_enum, default_value_t = Strandedness::Yes)]
    pub strandedness: Strandedness,

    // Engines
    #[arg(short = '@', long = "threads", value_parser = clap::value_parser!(usize))]
    pub num_threads_total: Option<usize>,
    #[arg(long = "engine-timeout-secs", default_value_t = 86400)]
    pub engine_timeout_secs: u64,
}

impl PipelineCMD {
    /// Run with STAR and htseq-count
    pub fn try_execute(&mut self) -> Result<()> {
        let params_threading = params::Threading {
            threads_work: determine_thread_counts(self.num_threads_total)?,
        };
        let (params_io, params_runtime) = self.to_params();

        let pipeline = Pipeline::new(
            Box::new(StarAligner::new(
                params_threading.threads_work,
                params_runtime.engine_timeout,
            )),
            Box::new(HtseqCount::new(params_runtime.engine_timeout)),
        );
        let outcome = pipeline.run(&params_io, &params_runtime, &params_threading)?;

        log::info!(
            "Pipeline {}: {} reads counted in {} spot/gene entries",
            outcome.state,
            outcome.matrix.total(),
            outcome.matrix.records().len()
        );
        Ok(())
    }

    pub fn to_params(&self) -> (params::IO, params::Runtime) {
        let params_io = params::IO {
            path_forward: self.path_forward.clone(),
            path_reverse: self.path_reverse.clone(),
            path_ids: self.path_ids.clone(),
            path_ref_map: self.path_ref_map.clone(),
            path_ref_annotation: self.path_ref_annotation.clone(),
            path_contaminant_index: self.path_contaminant_index.clone(),
            path_output: self.path_output.clone(),
            path_tmp: self.path_tmp.clone(),
            exp_name: self.exp_name.clone(),
        };

        let demux = params::DemuxParams {
            allowed_missed: self.allowed_missed,
            allowed_kimera: self.allowed_kimera,
            barcode_start: self.barcode_start,
            barcode_length: self.barcode_length,
            molecular_barcodes: self.molecular_barcodes,
            umi_start: self.umi_start,
            umi_end: self.umi_end,
        };

        let params_runtime = params::Runtime {
            filter: FilterParams {
                min_length: self.min_length_trimming,
                min_quality: self.min_quality_trimming,
                forward_min_length: demux.forward_min_length().max(self.trimming_fw),
                trimming_rv: self.trimming_rv,
            },
            demux,
            annotation: AnnotationParams {
                mode: self.htseq_mode,
                no_ambiguous: self.htseq_no_ambiguous,
                strandedness: self.strandedness,
                ..AnnotationParams::default()
            },
            contaminant_min_identity: self.contaminant_min_identity,
            engine_timeout: Duration::from_secs(self.engine_timeout_secs),
            keep_discarded_files: self.keep_discarded_files,
            clean: self.clean,
        };

        (params_io, params_runtime)
    }
}
