use std::path::PathBuf;
use std::time::Duration;

use crate::engine::AnnotationParams;
use crate::runtime::Error;
use crate::trim::FilterParams;

///////////////////////////////
/// Input and output locations
#[derive(Debug, Clone)]
pub struct IO {
    pub path_forward: PathBuf,
    pub path_reverse: PathBuf,
    pub path_ids: PathBuf,
    pub path_ref_map: PathBuf,
    pub path_ref_annotation: PathBuf,
    pub path_contaminant_index: Option<PathBuf>,
    pub path_output: PathBuf,
    pub path_tmp: PathBuf,
    pub exp_name: String,
}

impl IO {
    pub fn path_matrix(&self) -> PathBuf {
        self.path_output.join(format!("{}_stdata.tsv", self.exp_name))
    }

    pub fn path_stage_counters(&self) -> PathBuf {
        self.path_output
            .join(format!("{}_stage_counters.tsv", self.exp_name))
    }

    pub fn path_discarded(&self) -> PathBuf {
        self.path_output.join(format!("{}_discarded.tsv", self.exp_name))
    }
}

///////////////////////////////
/// Where the spatial barcode and molecular barcode sit in the forward read
#[derive(Debug, Clone)]
pub struct DemuxParams {
    pub allowed_missed: u32,
    pub allowed_kimera: u32,
    pub barcode_start: usize,
    pub barcode_length: usize,
    pub molecular_barcodes: bool,
    pub umi_start: usize,
    pub umi_end: usize,
}

impl DemuxParams {
    pub fn barcode_end(&self) -> usize {
        self.barcode_start + self.barcode_length
    }

    /// Shortest forward read that holds the barcode, and the UMI if used
    pub fn forward_min_length(&self) -> usize {
        if self.molecular_barcodes {
            self.barcode_end().max(self.umi_end)
        } else {
            self.barcode_end()
        }
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.barcode_length == 0 {
            return Err(Error::invalid_parameter("barcode_length", "must be positive"));
        }
        if self.allowed_missed as usize >= self.barcode_length {
            return Err(Error::invalid_parameter(
                "allowed_missed",
                format!("must be below the barcode length {}", self.barcode_length),
            ));
        }
        if self.allowed_kimera as usize >= self.barcode_length {
            return Err(Error::invalid_parameter(
                "allowed_kimera",
                format!("must be below the barcode length {}", self.barcode_length),
            ));
        }
        if self.molecular_barcodes && self.umi_start >= self.umi_end {
            return Err(Error::invalid_parameter(
                "umi_start",
                format!("must be below umi_end ({} >= {})", self.umi_start, self.umi_end),
            ));
        }
        Ok(())
    }
}

///////////////////////////////
/// Read classification and engine settings
#[derive(Debug, Clone)]
pub struct Runtime {
    pub filter: FilterParams,
    pub demux: DemuxParams,
    pub annotation: AnnotationParams,
    pub contaminant_min_identity: f64,
    pub engine_timeout: Duration,
    pub keep_discarded_files: bool,
    pub clean: bool,
}

impl Runtime {
    pub fn validate(&self) -> Result<(), Error> {
        self.demux.validate()?;
        if self.filter.forward_min_length < self.demux.forward_min_length() {
            return Err(Error::invalid_parameter(
                "forward_min_length",
                format!(
                    "{} is shorter than the barcode and UMI span {}",
                    self.filter.forward_min_length,
                    self.demux.forward_min_length()
                ),
            ));
        }
        if self.filter.min_length == 0 {
            return Err(Error::invalid_parameter("min_length_trimming", "must be positive"));
        }
        if !(0.0..=1.0).contains(&self.contaminant_min_identity) {
            return Err(Error::invalid_parameter(
                "contaminant_min_identity",
                "must be within [0, 1]",
            ));
        }
        if self.engine_timeout.is_zero() {
            return Err(Error::invalid_parameter("engine_timeout_secs", "must be positive"));
        }
        Ok(())
    }
}

pub struct Threading {
    pub threads_work: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn demux() -> DemuxParams {
        DemuxParams {
            allowed_missed: 2,
            allowed_kimera: 3,
            barcode_start: 0,
            barcode_length: 4,
            molecular_barcodes: true,
            umi_start: 4,
            umi_end: 8,
        }
    }

    #[test]
    fn test_forward_min_length() {
        let mut p = demux();
        assert_eq!(p.forward_min_length(), 8);
        p.molecular_barcodes = false;
        assert_eq!(p.forward_min_length(), 4);
    }

    #[test]
    fn test_validate() {
        assert!(demux().validate().is_ok());

        let mut p = demux();
        p.allowed_missed = 4;
        assert_eq!(p.validate().unwrap_err().kind(), "ConfigurationError");

        let mut p = demux();
        p.umi_end = 4;
        assert!(p.validate().is_err());

        // UMI positions are not used without molecular barcodes
        p.molecular_barcodes = false;
        assert!(p.validate().is_ok());
    }

    fn runtime(forward_min_length: usize) -> Runtime {
        Runtime {
            filter: FilterParams {
                min_length: 10,
                min_quality: 20,
                forward_min_length,
                trimming_rv: 0,
            },
            demux: demux(),
            annotation: AnnotationParams::default(),
            contaminant_min_identity: 0.0,
            engine_timeout: Duration::from_secs(60),
            keep_discarded_files: false,
            clean: false,
        }
    }

    #[test]
    fn test_validate_forward_length_covers_umi() {
        assert!(runtime(8).validate().is_ok());
        assert!(runtime(12).validate().is_ok());

        // Barcode fits, UMI does not
        let err = runtime(4).validate().unwrap_err();
        assert_eq!(err.kind(), "ConfigurationError");

        let mut rt = runtime(4);
        rt.demux.molecular_barcodes = false;
        assert!(rt.validate().is_ok());
    }
}
