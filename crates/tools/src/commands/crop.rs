//! `homepage circle-crop`

use std::path::PathBuf;

use clap::Args;

use crate::crop::crop_file;

#[derive(Args)]
pub struct CropArgs {
    /// Source image
    pub input: PathBuf,

    /// Destination PNG
    pub output: PathBuf,
}

pub fn execute(args: CropArgs) -> anyhow::Result<()> {
    crop_file(&args.input, &args.output)?;
    Ok(())
}
