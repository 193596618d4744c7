use pixel_forest::config::{load_run_config, RunConfig};
use pixel_forest::image::io::{load_grayscale_image, save_label_map};
use pixel_forest::mnist;
use pixel_forest::storage::{load_forest_file, save_forest_file};
use pixel_forest::{DecisionForest, DecisionForestParams, DecisionTreeParams, Image};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Instant;

fn main() {
    // The driver reports failures on stdout and always exits cleanly.
    match parse_args() {
        Ok(cli) => {
            if let Err(err) = run(cli) {
                println!("Error: {err}");
            }
        }
        Err(message) => println!("{message}"),
    }
}

enum Command {
    Train { output: PathBuf },
    Verify { input: PathBuf },
    Classify { forest: PathBuf, image: PathBuf },
}

struct Cli {
    command: Command,
    config_path: Option<PathBuf>,
    label_out: Option<PathBuf>,
}

fn run(cli: Cli) -> pixel_forest::Result<()> {
    let config = match &cli.config_path {
        Some(path) => load_run_config(path)?,
        None => RunConfig::default(),
    };

    match cli.command {
        Command::Train { output } => execute_training(&config, &output),
        Command::Verify { input } => execute_verification(&config, &input),
        Command::Classify { forest, image } => {
            execute_classification(&forest, &image, cli.label_out.as_deref())
        }
    }
}

fn execute_training(config: &RunConfig, output: &Path) -> pixel_forest::Result<()> {
    let (training_data, label_count) = mnist::load_image_sets(
        &config.data_dir.join(mnist::TRAINING_IMAGES),
        &config.data_dir.join(mnist::TRAINING_LABELS),
    )?;
    println!("Loaded {} training samples.", training_data.len());

    let mut tree_params = config.tree_params;
    if tree_params.class_count == 0 {
        tree_params.class_count = label_count;
    }

    println!("Initiating training sequence.");
    print_forest_params(&config.forest_params);
    print_tree_params(&tree_params);

    let started = Instant::now();
    let forest = DecisionForest::train(&config.forest_params, &tree_params, &training_data)?;
    println!(
        "Training took {:.3} seconds.",
        started.elapsed().as_secs_f32()
    );

    save_forest_file(output, &forest)?;
    println!("Forest written to {}.", output.display());
    Ok(())
}

fn execute_verification(config: &RunConfig, input: &Path) -> pixel_forest::Result<()> {
    let (classify_data, _) = mnist::load_image_sets(
        &config.data_dir.join(mnist::TEST_IMAGES),
        &config.data_dir.join(mnist::TEST_LABELS),
    )?;
    println!("Loaded {} test samples.", classify_data.len());

    let forest = load_forest_file(input)?;
    println!("Loaded forest with the following parameters:");
    print_forest_params(forest.forest_params());
    print_tree_params(forest.tree_params());

    let mut total_correct = 0usize;
    for set in &classify_data {
        if forest.classify(&set.image)? == set.codex {
            total_correct += 1;
        }
    }

    println!(
        "Current forest accuracy level: {:.2}%.",
        100.0 * total_correct as f32 / classify_data.len() as f32
    );
    Ok(())
}

fn execute_classification(
    forest_path: &Path,
    image_path: &Path,
    label_out: Option<&Path>,
) -> pixel_forest::Result<()> {
    let forest = load_forest_file(forest_path)?;
    let image = load_grayscale_image(image_path)?;

    let class = forest.classify(&image)?;
    println!("Dominant class: {class}");

    if let Some(path) = label_out {
        let mut labels = Image::new(image.width(), image.height());
        forest.classify_image(&image, &mut labels)?;
        save_label_map(&labels, forest.tree_params().class_count, path)?;
        println!("Label map written to {}.", path.display());
    }
    Ok(())
}

fn print_forest_params(params: &DecisionForestParams) {
    println!("  Tree count: {}", params.total_tree_count);
    println!(
        "  Tree train percentage: {}",
        params.tree_training_percentage
    );
}

fn print_tree_params(params: &DecisionTreeParams) {
    println!("  Class count: {}", params.class_count);
    println!("  Max tree depth: {}", params.max_tree_depth);
    println!("  Min node sample count: {}", params.min_sample_count);
    println!("  Max node trial count: {}", params.node_trial_count);
    println!("  Max visual search radius: {}", params.visual_search_radius);
}

fn parse_args() -> Result<Cli, String> {
    let program = env::args().next().unwrap_or_else(|| "pixel-forest".to_string());
    let mut args = env::args().skip(1);

    let mut command = None;
    let mut config_path = None;
    let mut label_out = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--help" | "-h" => {
                println!("{}", usage(&program));
                std::process::exit(0);
            }
            "--train" => {
                let output = args
                    .next()
                    .ok_or_else(|| format!("--train expects an output path\n{}", usage(&program)))?;
                set_command(&mut command, Command::Train { output: output.into() }, &program)?;
            }
            "--verify" => {
                let input = args
                    .next()
                    .ok_or_else(|| format!("--verify expects a forest path\n{}", usage(&program)))?;
                set_command(&mut command, Command::Verify { input: input.into() }, &program)?;
            }
            "--classify" => {
                let forest = args.next().ok_or_else(|| {
                    format!("--classify expects a forest path\n{}", usage(&program))
                })?;
                let image = args.next().ok_or_else(|| {
                    format!("--classify expects an image path\n{}", usage(&program))
                })?;
                set_command(
                    &mut command,
                    Command::Classify {
                        forest: forest.into(),
                        image: image.into(),
                    },
                    &program,
                )?;
            }
            "--config" => {
                let path = args
                    .next()
                    .ok_or_else(|| format!("--config expects a path\n{}", usage(&program)))?;
                config_path = Some(PathBuf::from(path));
            }
            "--label-out" => {
                let path = args
                    .next()
                    .ok_or_else(|| format!("--label-out expects a path\n{}", usage(&program)))?;
                label_out = Some(PathBuf::from(path));
            }
            other => {
                return Err(format!("Unknown option '{other}'\n{}", usage(&program)));
            }
        }
    }

    let command = command.ok_or_else(|| usage(&program))?;
    Ok(Cli {
        command,
        config_path,
        label_out,
    })
}

fn set_command(slot: &mut Option<Command>, command: Command, program: &str) -> Result<(), String> {
    if slot.is_some() {
        return Err(format!("Only one command may be given\n{}", usage(program)));
    }
    *slot = Some(command);
    Ok(())
}

fn usage(program: &str) -> String {
    format!(
        "Usage: {program} [--config params.json] --train <forest.bin>\n       \
         {program} --verify <forest.bin>\n       \
         {program} --classify <forest.bin> <image.png> [--label-out labels.png]\n\n\
         --train     Fits a forest against the MNIST training set and saves it.\n\
         --verify    Tests the accuracy of a saved forest against the MNIST test set.\n\
         --classify  Labels a single grayscale image with a saved forest.\n\
         --config    JSON file overriding the forest/tree parameter defaults.\n\
         --label-out Where --classify writes the per-pixel label map."
    )
}
