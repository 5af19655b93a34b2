use std::fs;

use approx::assert_relative_eq;
use camfilter_core::filter::{run_filter, FilterConfig};
use camfilter_io::{
    colmap::{load_reconstruction, read_images_txt, write_images_txt, ColmapImage},
    passage::{list_passages, load_passage, read_description},
    sink::{split_reconstruction, RIGHT_POSITIONS_DIR, WRONG_POSITIONS_DIR},
    IoError,
};

const CLUSTERS: [f64; 6] = [0.0, 1.0, 2.0, 100.0, 101.0, 102.0];

fn write_reconstruction(path: &std::path::Path) -> Result<Vec<ColmapImage>, IoError> {
    // rotation of 90 degrees about z; the camera center is -R^T t
    let rotation = [std::f64::consts::FRAC_1_SQRT_2, 0.0, 0.0, std::f64::consts::FRAC_1_SQRT_2];
    let images = CLUSTERS
        .iter()
        .enumerate()
        .map(|(i, &x)| ColmapImage {
            name: format!("ios_{i}.jpg"),
            image_id: i as u32 + 1,
            camera_id: 1,
            rotation,
            // R * (x, 0, 0) = (0, x, 0)
            translation: [0.0, -x, 0.0],
            points2d: Vec::new(),
        })
        .collect::<Vec<_>>();
    write_images_txt(path, &images)?;
    Ok(images)
}

const DESCRIPTION: &str = r#"{
    "passages": [
        {
            "style": "linear_manual",
            "points": [
                [{"filename": "ios_0.jpg"}, {"filename": "ios_1.jpg"}, {"filename": "ios_2.jpg"}],
                [{"filename": "ios_3.jpg"}, {"filename": "ios_4.jpg"}, {"filename": "ios_5.jpg"}]
            ]
        }
    ]
}"#;

#[test]
fn load_reconstruction_world_points() -> Result<(), IoError> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("images.txt");
    write_reconstruction(&path)?;

    let poses = load_reconstruction(&path)?;
    assert_eq!(poses.len(), 6);
    let point = poses.point("4")?;
    assert_relative_eq!(point[0], 101.0, epsilon = 1e-9);
    assert_relative_eq!(point[1], 0.0, epsilon = 1e-9);
    assert_relative_eq!(point[2], 0.0, epsilon = 1e-9);
    Ok(())
}

#[test]
fn filter_with_passage_and_split() -> Result<(), IoError> {
    let dir = tempfile::tempdir()?;
    let images_path = dir.path().join("images.txt");
    let images = write_reconstruction(&images_path)?;
    fs::write(dir.path().join("points3D.txt"), "# points\n")?;

    let description_path = dir.path().join("description.json");
    fs::write(&description_path, DESCRIPTION)?;
    let summaries = list_passages(&read_description(&description_path)?);
    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0].num_images, 6);

    let reconstruction = load_reconstruction(&images_path)?;
    let passage = load_passage(&description_path, 0)?;
    let outcome = run_filter(&reconstruction, Some(&passage), &FilterConfig::default())?;
    let flagged = outcome
        .flagged_ids
        .iter()
        .map(|id| id.as_str())
        .collect::<Vec<_>>();
    assert_eq!(flagged, vec!["2", "3"]);

    let output = dir.path().join("filtered");
    let summary = split_reconstruction(&images_path, &outcome.flagged_ids, &output, None)?;
    assert_eq!((summary.kept, summary.flagged), (4, 2));

    let wrong = read_images_txt(output.join(WRONG_POSITIONS_DIR).join("images.txt"))?;
    assert_eq!(wrong, images[2..4].to_vec());
    assert!(output.join(RIGHT_POSITIONS_DIR).join("points3D.txt").exists());
    Ok(())
}
