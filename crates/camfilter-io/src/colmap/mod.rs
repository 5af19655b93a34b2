mod text;
mod types;

pub use text::*;
pub use types::*;

use std::path::Path;

use camfilter_core::collection::PoseCollection;

use crate::error::IoError;

/// Load the camera poses of a COLMAP reconstruction.
///
/// # Arguments
///
/// * `path` - The path to the images.txt file.
///
/// # Returns
///
/// The geometric pose collection, in file order.
pub fn load_reconstruction(path: impl AsRef<Path>) -> Result<PoseCollection, IoError> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(IoError::FileDoesNotExist(path.to_path_buf()));
    }

    log::info!("Loading COLMAP reconstruction from {}", path.display());
    let images = read_images_txt(path)?;
    let poses = PoseCollection::from_poses(images.iter().map(|image| (&image.name, image.pose())))?;
    log::info!("Loaded {} camera poses", poses.len());

    Ok(poses)
}
