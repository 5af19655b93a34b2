use std::{
    fs::File,
    io::{BufRead, BufReader, BufWriter, Write},
    path::Path,
};

use super::{ColmapImage, ColmapPoint3d};

/// Error types for the COLMAP module.
#[derive(Debug, thiserror::Error)]
pub enum ColmapError {
    /// Error reading or writing file
    #[error("error reading or writing file")]
    IoError(#[from] std::io::Error),

    /// Parse error
    #[error("Parse error {0}")]
    ParseError(String),
}

/// Read the images.txt file and return a vector of ColmapImage structs.
///
/// Comment lines starting with `#` are skipped; every image then spans two
/// lines, the second one possibly empty.
///
/// # Arguments
///
/// * `path` - The path to the images.txt file.
///
/// # Returns
///
/// A vector of ColmapImage structs.
pub fn read_images_txt(path: impl AsRef<Path>) -> Result<Vec<ColmapImage>, ColmapError> {
    // open the file and create a buffered reader
    let file = File::open(path)?;
    let reader = BufReader::new(file);

    let images = reader
        .lines()
        .filter(|line| !matches!(line, Ok(line) if line.starts_with('#')))
        .collect::<Result<Vec<_>, _>>()?
        .chunks(2)
        .map(|chunk| match chunk {
            [line1, line2] => parse_image_line(line1, line2),
            _ => Err(ColmapError::ParseError(
                "Invalid number of lines".to_string(),
            )),
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(images)
}

/// Write a vector of ColmapImage structs to an images.txt file.
///
/// # Arguments
///
/// * `path` - The path to the images.txt file.
/// * `images` - The images to write.
pub fn write_images_txt(path: impl AsRef<Path>, images: &[ColmapImage]) -> Result<(), ColmapError> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);

    let mean_observations = match images.len() {
        0 => 0.0,
        n => images.iter().map(|image| image.points2d.len()).sum::<usize>() as f64 / n as f64,
    };

    writeln!(writer, "# Image list with two lines of data per image:")?;
    writeln!(writer, "#   IMAGE_ID, QW, QX, QY, QZ, TX, TY, TZ, CAMERA_ID, NAME")?;
    writeln!(writer, "#   POINTS2D[] as (X, Y, POINT3D_ID)")?;
    writeln!(
        writer,
        "# Number of images: {}, mean observations per image: {}",
        images.len(),
        mean_observations
    )?;

    for image in images {
        let [qw, qx, qy, qz] = image.rotation;
        let [tx, ty, tz] = image.translation;
        writeln!(
            writer,
            "{} {qw} {qx} {qy} {qz} {tx} {ty} {tz} {} {}",
            image.image_id, image.camera_id, image.name
        )?;

        let points = image
            .points2d
            .iter()
            .map(|(x, y, id)| format!("{x} {y} {id}"))
            .collect::<Vec<_>>();
        writeln!(writer, "{}", points.join(" "))?;
    }

    writer.flush()?;
    Ok(())
}

/// Read the points3D.txt file and return a vector of ColmapPoint3d structs.
///
/// # Arguments
///
/// * `path` - The path to the points3D.txt file.
///
/// # Returns
///
/// A vector of ColmapPoint3d structs.
pub fn read_points3d_txt(path: impl AsRef<Path>) -> Result<Vec<ColmapPoint3d>, ColmapError> {
    // open the file and create a buffered reader
    let file = File::open(path)?;
    let reader = BufReader::new(file);

    // skip the header comments and blank lines, parse the rest
    let points = reader
        .lines()
        .filter(|line| !matches!(line, Ok(line) if line.starts_with('#') || line.trim().is_empty()))
        .map(|line| -> Result<ColmapPoint3d, ColmapError> {
            let line = line.map_err(ColmapError::from)?;
            parse_point3d_line(&line)
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(points)
}

/// Write a vector of ColmapPoint3d structs to a points3D.txt file.
///
/// # Arguments
///
/// * `path` - The path to the points3D.txt file.
/// * `points` - The points to write.
pub fn write_points3d_txt(
    path: impl AsRef<Path>,
    points: &[ColmapPoint3d],
) -> Result<(), ColmapError> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);

    let mean_track_length = match points.len() {
        0 => 0.0,
        n => points.iter().map(|point| point.track.len()).sum::<usize>() as f64 / n as f64,
    };

    writeln!(writer, "# 3D point list with one line of data per point:")?;
    writeln!(
        writer,
        "#   POINT3D_ID, X, Y, Z, R, G, B, ERROR, TRACK[] as (IMAGE_ID, POINT2D_IDX)"
    )?;
    writeln!(
        writer,
        "# Number of points: {}, mean track length: {}",
        points.len(),
        mean_track_length
    )?;

    for point in points {
        let [x, y, z] = point.xyz;
        let [r, g, b] = point.rgb;
        write!(writer, "{} {x} {y} {z} {r} {g} {b} {}", point.point3d_id, point.error)?;
        for (image_id, point2d_idx) in &point.track {
            write!(writer, " {image_id} {point2d_idx}")?;
        }
        writeln!(writer)?;
    }

    writer.flush()?;
    Ok(())
}

/// Utility functions for parsing COLMAP text files
fn parse_part<T: std::str::FromStr>(s: &str) -> Result<T, ColmapError>
where
    T::Err: std::fmt::Display,
{
    s.parse::<T>()
        .map_err(|e| ColmapError::ParseError(format!("{}: {}", s, e)))
}

/// Parse a point3d line and return a ColmapPoint3d struct.
/// #   POINT3D_ID, X, Y, Z, R, G, B, ERROR, TRACK[] as (IMAGE_ID, POINT2D_IDX)
fn parse_point3d_line(line: &str) -> Result<ColmapPoint3d, ColmapError> {
    // split the line into parts by whitespace
    let parts = line.split_whitespace().collect::<Vec<_>>();

    // check if the number of parts is correct
    if parts.len() < 8 || parts.len() % 2 != 0 {
        return Err(ColmapError::ParseError(format!(
            "Invalid number of parts: {}",
            parts.len()
        )));
    }

    Ok(ColmapPoint3d {
        point3d_id: parse_part(parts[0])?,
        xyz: parts[1..4]
            .iter()
            .map(|s| parse_part(s))
            .collect::<Result<Vec<_>, _>>()?
            .try_into()
            .map_err(|_| {
                ColmapError::ParseError("Invalid number of xyz coordinates".to_string())
            })?,
        rgb: parts[4..7]
            .iter()
            .map(|s| parse_part(s))
            .collect::<Result<Vec<_>, _>>()?
            .try_into()
            .map_err(|_| {
                ColmapError::ParseError("Invalid number of rgb coordinates".to_string())
            })?,
        error: parse_part(parts[7])?,
        track: parts[8..]
            .chunks_exact(2)
            .map(|chunk| -> Result<(u32, u32), ColmapError> {
                Ok((parse_part(chunk[0])?, parse_part(chunk[1])?))
            })
            .collect::<Result<Vec<_>, _>>()?,
    })
}

/// Parse an image line and return a ColmapImage struct.
/// #   IMAGE_ID, QW, QX, QY, QZ, TX, TY, TZ, CAMERA_ID, NAME
/// #   POINTS2D[] as (X, Y, POINT3D_ID)
fn parse_image_line(line1: &str, line2: &str) -> Result<ColmapImage, ColmapError> {
    // split the line into parts by whitespace
    let parts1 = line1.split_whitespace().collect::<Vec<_>>();
    let parts2 = line2.split_whitespace().collect::<Vec<_>>();

    if parts1.len() < 10 {
        return Err(ColmapError::ParseError(format!(
            "Invalid number of parts: {}",
            parts1.len()
        )));
    }
    if parts2.len() % 3 != 0 {
        return Err(ColmapError::ParseError(format!(
            "Invalid number of point2d parts: {}",
            parts2.len()
        )));
    }

    Ok(ColmapImage {
        image_id: parse_part(parts1[0])?,
        rotation: parts1[1..5]
            .iter()
            .map(|s| parse_part(s))
            .collect::<Result<Vec<_>, _>>()?
            .try_into()
            .map_err(|_| {
                ColmapError::ParseError("Invalid number of rotation coordinates".to_string())
            })?,
        translation: parts1[5..8]
            .iter()
            .map(|s| parse_part(s))
            .collect::<Result<Vec<_>, _>>()?
            .try_into()
            .map_err(|_| {
                ColmapError::ParseError("Invalid number of translation coordinates".to_string())
            })?,
        camera_id: parse_part(parts1[8])?,
        name: parts1[9].to_string(),
        points2d: parts2
            .chunks_exact(3)
            .map(|chunk| -> Result<(f64, f64, i64), ColmapError> {
                Ok((
                    parse_part(chunk[0])?,
                    parse_part(chunk[1])?,
                    parse_part(chunk[2])?,
                ))
            })
            .collect::<Result<Vec<_>, _>>()?,
    })
}
