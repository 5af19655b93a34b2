use argh::FromArgs;
use serde::de::DeserializeOwned;
use std::{fs::File, io::BufReader, path::Path, path::PathBuf};

use camfilter_core::{
    collection::PoseCollection,
    evaluate::{evaluate, EvaluationParams},
    filter::{run_filter, FilterConfig},
    neighbors::NeighborSearch,
};
use camfilter_io::{colmap, passage, sink};

#[derive(FromArgs)]
/// Detect misplaced camera poses in a COLMAP reconstruction
struct Args {
    #[argh(subcommand)]
    command: Command,
}

#[derive(FromArgs)]
#[argh(subcommand)]
enum Command {
    Filter(FilterArgs),
    Passages(PassagesArgs),
    Evaluate(EvaluateArgs),
}

#[derive(FromArgs)]
/// Filter the camera poses of a reconstruction
#[argh(subcommand, name = "filter")]
struct FilterArgs {
    /// path to the COLMAP images.txt file
    #[argh(option)]
    images: PathBuf,

    /// path to the passage description file
    #[argh(option)]
    description: Option<PathBuf>,

    /// index of the passage in the description
    #[argh(option, default = "0")]
    passage: usize,

    /// confidence level of the acceptance interval, in (0, 1)
    #[argh(option)]
    softness: Option<f64>,

    /// neighbor search strategy: exhaustive, parallel or kdtree
    #[argh(option)]
    search: Option<NeighborSearch>,

    /// path to a JSON file with the filter parameters
    #[argh(option)]
    config: Option<PathBuf>,

    /// directory receiving the right and wrong positions models
    #[argh(option)]
    output_dir: Option<PathBuf>,

    /// directory of image files to prune from flagged cameras
    #[argh(option)]
    images_dir: Option<PathBuf>,
}

#[derive(FromArgs)]
/// List the passages of a description file
#[argh(subcommand, name = "passages")]
struct PassagesArgs {
    /// path to the passage description file
    #[argh(option)]
    description: PathBuf,
}

#[derive(FromArgs)]
/// Score the filter on randomly perturbed poses
#[argh(subcommand, name = "evaluate")]
struct EvaluateArgs {
    /// path to the COLMAP images.txt file
    #[argh(option)]
    images: PathBuf,

    /// path to the passage description file
    #[argh(option)]
    description: Option<PathBuf>,

    /// index of the passage in the description
    #[argh(option, default = "0")]
    passage: usize,

    /// confidence level of the acceptance interval, in (0, 1)
    #[argh(option)]
    softness: Option<f64>,

    /// number of perturb-and-filter trials
    #[argh(option)]
    trials: Option<usize>,

    /// probability of perturbing each camera
    #[argh(option)]
    probability: Option<f64>,

    /// standard deviation of the perturbation
    #[argh(option)]
    noise_scale: Option<f64>,

    /// random seed for reproducible trials
    #[argh(option)]
    seed: Option<u64>,

    /// path to a JSON file with the evaluation parameters
    #[argh(option)]
    config: Option<PathBuf>,
}

/// Read parameters from an optional JSON file, falling back to the defaults.
fn load_config<T: DeserializeOwned + Default>(
    path: Option<&Path>,
) -> Result<T, Box<dyn std::error::Error>> {
    match path {
        Some(path) => {
            let reader = BufReader::new(File::open(path)?);
            Ok(serde_json::from_reader(reader)?)
        }
        None => Ok(T::default()),
    }
}

fn load_passage(
    description: Option<&Path>,
    index: usize,
) -> Result<Option<PoseCollection>, camfilter_io::IoError> {
    description
        .map(|path| passage::load_passage(path, index))
        .transpose()
}

fn run_filter_command(args: FilterArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut config: FilterConfig = load_config(args.config.as_deref())?;
    if let Some(softness) = args.softness {
        config.softness = softness;
    }
    if let Some(search) = args.search {
        config.search = search;
    }
    log::debug!("Filter parameters: {config:?}");

    let reconstruction = colmap::load_reconstruction(&args.images)?;
    let passage = load_passage(args.description.as_deref(), args.passage)?;

    let outcome = run_filter(&reconstruction, passage.as_ref(), &config)?;

    println!("{}", serde_json::to_string_pretty(&outcome.report)?);
    for id in &outcome.flagged_ids {
        println!("{id}");
    }

    if let Some(output_dir) = &args.output_dir {
        sink::split_reconstruction(&args.images, &outcome.flagged_ids, output_dir, None)?;
    }

    if let Some(images_dir) = &args.images_dir {
        let removed =
            sink::prune_image_directory(images_dir, &outcome.flagged_ids, &reconstruction)?;
        for path in removed {
            println!("removed {}", path.display());
        }
    }

    Ok(())
}

fn run_passages_command(args: PassagesArgs) -> Result<(), Box<dyn std::error::Error>> {
    let description = passage::read_description(&args.description)?;
    for summary in passage::list_passages(&description) {
        println!(
            "Passage: {}. Id: {}. Number of images: {}",
            summary.style, summary.index, summary.num_images
        );
    }
    Ok(())
}

fn run_evaluate_command(args: EvaluateArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut params: EvaluationParams = load_config(args.config.as_deref())?;
    if let Some(softness) = args.softness {
        params.filter.softness = softness;
    }
    if let Some(trials) = args.trials {
        params.trials = trials;
    }
    if let Some(probability) = args.probability {
        params.perturbation.probability = probability;
    }
    if let Some(noise_scale) = args.noise_scale {
        params.perturbation.noise_scale = noise_scale;
    }
    if args.seed.is_some() {
        params.perturbation.random_seed = args.seed;
    }
    log::debug!("Evaluation parameters: {params:?}");

    let images = colmap::read_images_txt(&args.images)?
        .into_iter()
        .map(|image| {
            let pose = image.pose();
            (image.name, pose)
        })
        .collect::<Vec<_>>();
    let passage = load_passage(args.description.as_deref(), args.passage)?;

    let scores = evaluate(&images, passage.as_ref(), &params)?;
    println!("{}", serde_json::to_string_pretty(&scores)?);

    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args: Args = argh::from_env();

    match args.command {
        Command::Filter(args) => run_filter_command(args),
        Command::Passages(args) => run_passages_command(args),
        Command::Evaluate(args) => run_evaluate_command(args),
    }
}
