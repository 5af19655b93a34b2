use std::{
    collections::{BTreeSet, HashSet},
    fs,
    path::{Path, PathBuf},
};

use camfilter_core::{
    collection::PoseCollection,
    id::{extract_identifier, ImageId},
};

use crate::{
    colmap::{
        read_images_txt, read_points3d_txt, write_images_txt, write_points3d_txt, ColmapImage,
        ColmapPoint3d,
    },
    error::IoError,
};

/// Sub directory receiving the poses that passed the filter.
pub const RIGHT_POSITIONS_DIR: &str = "right_positions";

/// Sub directory receiving the flagged poses.
pub const WRONG_POSITIONS_DIR: &str = "wrong_positions";

const CAMERAS_FILE: &str = "cameras.txt";
const POINTS_FILE: &str = "points3D.txt";

/// Number of images written on each side of a split.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitSummary {
    /// Images written to the right positions model.
    pub kept: usize,
    /// Images written to the wrong positions model.
    pub flagged: usize,
}

/// Split a COLMAP reconstruction into kept and flagged models.
///
/// Writes `right_positions/images.txt` and `wrong_positions/images.txt`
/// under `output_dir`. The cameras file of the source model is copied into
/// both directories. The points file is split as well: each model keeps the
/// 3D points observed only by its own images.
///
/// # Arguments
///
/// * `images_path` - The path to the source images.txt file.
/// * `flagged` - The identifiers of the flagged images.
/// * `output_dir` - The directory receiving both models.
/// * `model_dir` - The directory holding the other model files, defaults to
///   the parent directory of `images_path`.
pub fn split_reconstruction(
    images_path: impl AsRef<Path>,
    flagged: &BTreeSet<ImageId>,
    output_dir: impl AsRef<Path>,
    model_dir: Option<&Path>,
) -> Result<SplitSummary, IoError> {
    let images_path = images_path.as_ref();
    let output_dir = output_dir.as_ref();

    let mut kept = Vec::new();
    let mut wrong = Vec::new();
    for image in read_images_txt(images_path)? {
        match flagged.contains(&extract_identifier(&image.name)?) {
            true => wrong.push(image),
            false => kept.push(image),
        }
    }

    let model_dir = match model_dir {
        Some(dir) => dir.to_path_buf(),
        None => images_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default(),
    };

    write_model(&output_dir.join(RIGHT_POSITIONS_DIR), &kept, &model_dir)?;
    write_model(&output_dir.join(WRONG_POSITIONS_DIR), &wrong, &model_dir)?;

    log::info!(
        "{} kept and {} flagged images written to {}",
        kept.len(),
        wrong.len(),
        output_dir.display()
    );

    Ok(SplitSummary {
        kept: kept.len(),
        flagged: wrong.len(),
    })
}

fn write_model(dir: &Path, images: &[ColmapImage], model_dir: &Path) -> Result<(), IoError> {
    fs::create_dir_all(dir)?;
    write_images_txt(dir.join("images.txt"), images)?;

    let cameras = model_dir.join(CAMERAS_FILE);
    if cameras.exists() {
        fs::copy(&cameras, dir.join(CAMERAS_FILE))?;
    } else {
        log::warn!("No {CAMERAS_FILE} in {}, skipping", model_dir.display());
    }

    let points = model_dir.join(POINTS_FILE);
    if points.exists() {
        let image_ids = images.iter().map(|image| image.image_id).collect::<HashSet<_>>();
        let (kept, removed) = filter_points3d(&points, &image_ids)?;
        write_points3d_txt(dir.join(POINTS_FILE), &kept)?;
        log::info!(
            "{removed} points out of {} observed by other images removed from {}",
            kept.len() + removed,
            dir.display()
        );
    } else {
        log::warn!("No {POINTS_FILE} in {}, skipping", model_dir.display());
    }
    Ok(())
}

/// Read a points3D.txt file, keeping the points observed only by `image_ids`.
///
/// # Returns
///
/// The kept points, in file order, and the number of removed points.
pub fn filter_points3d(
    path: impl AsRef<Path>,
    image_ids: &HashSet<u32>,
) -> Result<(Vec<ColmapPoint3d>, usize), IoError> {
    let points = read_points3d_txt(path)?;
    let total = points.len();
    let kept = points
        .into_iter()
        .filter(|point| point.observed_only_by(|id| image_ids.contains(&id)))
        .collect::<Vec<_>>();
    let removed = total - kept.len();
    Ok((kept, removed))
}

/// Remove the image files of flagged or unregistered cameras.
///
/// Files without an image identifier in their name are left untouched.
///
/// # Arguments
///
/// * `dir` - The directory holding the image files.
/// * `flagged` - The identifiers of the flagged images.
/// * `reconstruction` - The reconstruction the images were registered in.
///
/// # Returns
///
/// The removed paths, sorted.
pub fn prune_image_directory(
    dir: impl AsRef<Path>,
    flagged: &BTreeSet<ImageId>,
    reconstruction: &PoseCollection,
) -> Result<Vec<PathBuf>, IoError> {
    let mut removed = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let Some(id) = path
            .file_name()
            .and_then(|name| name.to_str())
            .and_then(|name| extract_identifier(name).ok())
        else {
            continue;
        };

        if flagged.contains(&id) || !reconstruction.contains(id.as_str()) {
            log::debug!("Removing {}", path.display());
            fs::remove_file(&path)?;
            removed.push(path);
        }
    }

    removed.sort();
    log::info!("{} image files removed", removed.len());
    Ok(removed)
}
