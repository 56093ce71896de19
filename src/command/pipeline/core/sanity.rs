use std::fs::File;
use std::path::Path;

use log::debug;

use super::params;
use crate::engine::{Aligner, AnnotationEngine};
use crate::runtime::Error;

fn check_readable_file(p: &Path) -> Result<(), Error> {
    debug!("Checking input file {:?}", p);
    if !p.is_file() {
        return Err(Error::configuration(p, Some("file does not exist")));
    }
    File::open(p).map_err(|e| Error::configuration(p, Some(format!("cannot be read: {}", e))))?;
    Ok(())
}

fn check_directory(p: &Path) -> Result<(), Error> {
    debug!("Checking index directory {:?}", p);
    if !p.is_dir() {
        return Err(Error::configuration(p, Some("directory does not exist")));
    }
    std::fs::read_dir(p)
        .map_err(|e| Error::configuration(p, Some(format!("cannot be read: {}", e))))?;
    Ok(())
}

fn check_or_create_directory(p: &Path) -> Result<(), Error> {
    if p.exists() && !p.is_dir() {
        return Err(Error::configuration(p, Some("exists but is not a directory")));
    }
    std::fs::create_dir_all(p)
        .map_err(|e| Error::configuration(p, Some(format!("cannot be created: {}", e))))
}

///////////////////////////////
/// Everything that can be verified before reading a single read. Any failure is a configuration error
pub fn check(
    params_io: &params::IO,
    params_runtime: &params::Runtime,
    aligner: &dyn Aligner,
    annotator: &dyn AnnotationEngine,
) -> Result<(), Error> {
    params_runtime.validate()?;

    if params_io.exp_name.is_empty() {
        return Err(Error::invalid_parameter("exp_name", "must not be empty"));
    }

    check_readable_file(&params_io.path_forward)?;
    check_readable_file(&params_io.path_reverse)?;
    check_readable_file(&params_io.path_ids)?;
    check_readable_file(&params_io.path_ref_annotation)?;
    check_directory(&params_io.path_ref_map)?;
    if let Some(p) = &params_io.path_contaminant_index {
        check_directory(p)?;
    }

    check_or_create_directory(&params_io.path_output)?;
    check_or_create_directory(&params_io.path_tmp)?;

    aligner.check_available()?;
    annotator.check_available()?;
    Ok(())
}
