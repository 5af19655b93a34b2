//! Reader of passage description files.
//!
//! A description lists capture passages; each passage groups the images of
//! one walk around the scene, either with measured camera positions or only
//! in capture order.

use std::{fs::File, io::BufReader, path::Path, str::FromStr};

use camfilter_core::collection::{NeighborMode, PoseCollection};
use serde::{Deserialize, Serialize};

use crate::error::IoError;

/// A camera position in the passage frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// x coordinate
    pub x: f64,
    /// y coordinate
    pub y: f64,
    /// z coordinate
    pub z: f64,
}

/// Pose of a passage camera.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PassagePose {
    /// Camera center.
    pub position: Position,
}

/// Camera of a passage image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PassageCamera {
    /// Camera pose.
    pub pose: PassagePose,
}

/// An image of a passage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PassagePoint {
    /// Image file name.
    pub filename: String,
    /// Camera of the image, absent for manually captured passages.
    #[serde(default)]
    pub camera: Option<PassageCamera>,
}

/// A passage of the description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PassageDescription {
    /// Style tag, e.g. `linear_manual`.
    pub style: String,
    /// Groups of images in capture order.
    pub points: Vec<Vec<PassagePoint>>,
}

/// The content of a description file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Description {
    /// The passages of the description.
    pub passages: Vec<PassageDescription>,
}

/// Shape of the capture path of a passage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassageShape {
    /// Walk around an object.
    Circular,
    /// Walk along a line.
    Linear,
    /// Calibration capture.
    Calibration,
}

/// Parsed style tag of a passage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PassageStyle {
    /// Shape of the capture path.
    pub shape: PassageShape,
    /// Whether the images were captured by hand, without positions.
    pub manual: bool,
}

impl PassageStyle {
    /// Get the neighbor search mode of passages with this style.
    pub fn mode(&self) -> NeighborMode {
        match self.manual {
            true => NeighborMode::Sequential,
            false => NeighborMode::Geometric,
        }
    }
}

impl FromStr for PassageStyle {
    type Err = IoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let shape = match s.split('_').next() {
            Some("circular") => PassageShape::Circular,
            Some("linear") => PassageShape::Linear,
            Some("calibration") => PassageShape::Calibration,
            _ => return Err(IoError::UnknownPassageStyle(s.to_string())),
        };
        // only the last token selects the capture mode
        let manual = s.rsplit('_').next() == Some("manual");
        Ok(Self { shape, manual })
    }
}

/// Summary of a passage, for listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PassageSummary {
    /// Index of the passage in the description.
    pub index: usize,
    /// Style tag of the passage.
    pub style: String,
    /// Number of images in the passage.
    pub num_images: usize,
}

impl PassageDescription {
    /// Parse the style tag of the passage.
    pub fn parse_style(&self) -> Result<PassageStyle, IoError> {
        self.style.parse()
    }

    /// Iterate over the images of the passage in capture order.
    pub fn images(&self) -> impl Iterator<Item = &PassagePoint> {
        self.points.iter().flatten()
    }

    /// Build the pose collection of the passage.
    ///
    /// Manual passages yield a sequential collection of the image names;
    /// any other passage yields a geometric one from the camera positions.
    pub fn to_collection(&self) -> Result<PoseCollection, IoError> {
        let style = self.parse_style()?;
        let collection = match style.mode() {
            NeighborMode::Sequential => {
                PoseCollection::from_sequence(self.images().map(|point| &point.filename))?
            }
            NeighborMode::Geometric => {
                let positions = self
                    .images()
                    .map(|point| match &point.camera {
                        Some(camera) => {
                            let Position { x, y, z } = camera.pose.position;
                            Ok((&point.filename, [x, y, z]))
                        }
                        None => Err(IoError::MissingPosition(point.filename.clone())),
                    })
                    .collect::<Result<Vec<_>, IoError>>()?;
                PoseCollection::from_positions(positions)?
            }
        };
        Ok(collection)
    }
}

impl Description {
    /// Get the passage at `index`.
    pub fn passage(&self, index: usize) -> Result<&PassageDescription, IoError> {
        self.passages.get(index).ok_or(IoError::PassageOutOfRange {
            index,
            count: self.passages.len(),
        })
    }
}

/// Read a passage description file.
///
/// # Arguments
///
/// * `path` - The path to the description JSON file.
pub fn read_description(path: impl AsRef<Path>) -> Result<Description, IoError> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(IoError::FileDoesNotExist(path.to_path_buf()));
    }
    let reader = BufReader::new(File::open(path)?);
    Ok(serde_json::from_reader(reader)?)
}

/// List the passages of a description with their image counts.
pub fn list_passages(description: &Description) -> Vec<PassageSummary> {
    description
        .passages
        .iter()
        .enumerate()
        .map(|(index, passage)| PassageSummary {
            index,
            style: passage.style.clone(),
            num_images: passage.images().count(),
        })
        .collect()
}

/// Load one passage of a description file as a pose collection.
///
/// # Arguments
///
/// * `path` - The path to the description JSON file.
/// * `index` - The index of the passage in the description.
pub fn load_passage(path: impl AsRef<Path>, index: usize) -> Result<PoseCollection, IoError> {
    let description = read_description(path)?;
    let passage = description.passage(index)?;
    let collection = passage.to_collection()?;
    log::info!(
        "Passage {index} ({}): {} images, {:?} neighbors",
        passage.style,
        collection.len(),
        collection.mode()
    );
    Ok(collection)
}
