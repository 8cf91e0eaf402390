use std::{fs, io, path};
use std::io::Write as _;

use accel::{bvh, grid, IndexKind};

fn main() -> anyhow::Result<()> {
    let parsed = clap::Command::new(env!("CARGO_BIN_NAME"))
        .arg(
            clap::Arg::new("scene")
                .long("scene")
                .number_of_values(1)
                .required(true))
        .arg(
            clap::Arg::new("out")
                .long("out")
                .help("output file, or a directory when writing raw buffers")
                .number_of_values(1)
                .required(true))
        .arg(
            clap::Arg::new("config")
                .long("config")
                .number_of_values(1))
        .arg(
            clap::Arg::new("index-bvh")
                .long("index-bvh")
                .conflicts_with("index-grid")
                .action(clap::ArgAction::SetTrue))
        .arg(
            clap::Arg::new("index-grid")
                .long("index-grid")
                .conflicts_with("index-bvh")
                .action(clap::ArgAction::SetTrue))
        .arg(
            clap::Arg::new("max-prims")
                .long("max-prims")
                .number_of_values(1)
                .value_parser(clap::value_parser!(usize)))
        .arg(
            clap::Arg::new("buckets")
                .long("buckets")
                .number_of_values(1)
                .value_parser(clap::value_parser!(usize)))
        .arg(
            clap::Arg::new("traversal-cost")
                .long("traversal-cost")
                .number_of_values(1)
                .value_parser(clap::value_parser!(f32)))
        .arg(
            clap::Arg::new("resolution")
                .long("resolution")
                .number_of_values(1)
                .value_parser(clap::value_parser!(u32)))
        .arg(
            clap::Arg::new("grid-bounds")
                .long("grid-bounds")
                .help("min x, y, z followed by max x, y, z")
                .number_of_values(6)
                .value_parser(clap::value_parser!(f32)))
        .arg(
            clap::Arg::new("raw")
                .long("raw")
                .action(clap::ArgAction::SetTrue))
        .arg(
            clap::Arg::new("verbose")
                .long("verbose")
                .short('v')
                .action(clap::ArgAction::SetTrue))
        .get_matches();

    let flag = |name: &str| *parsed.get_one::<bool>(name).unwrap_or(&false);

    accel::init_logging(if flag("verbose") {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    })?;

    let mut config = match parsed.get_one::<String>("config") {
        Some(path) => accel::Config::from_file(path)?,
        None => accel::Config::default(),
    };

    if flag("index-bvh") {
        config.index = IndexKind::Bvh;
    } else if flag("index-grid") {
        config.index = IndexKind::Grid;
    }

    let bvh::BvhConfig {
        max_prims_in_node,
        buckets,
        traversal_cost,
    } = config.bvh;

    config.bvh = bvh::BvhConfig {
        max_prims_in_node: parsed
            .get_one::<usize>("max-prims")
            .copied()
            .unwrap_or(max_prims_in_node),
        buckets: parsed
            .get_one::<usize>("buckets")
            .copied()
            .unwrap_or(buckets),
        traversal_cost: parsed
            .get_one::<f32>("traversal-cost")
            .copied()
            .unwrap_or(traversal_cost),
    };

    if let Some(&resolution) = parsed.get_one::<u32>("resolution") {
        config.grid.resolution = resolution;
    }

    let grid_bounds = parsed
        .get_many::<f32>("grid-bounds")
        .unwrap_or_default()
        .copied()
        .collect::<Vec<_>>();

    if let [x0, y0, z0, x1, y1, z1] = grid_bounds[..] {
        config.grid.bounds = grid::GridBounds::Fixed {
            min: [x0, y0, z0],
            max: [x1, y1, z1],
        };
    }

    config.validate()?;

    // This is required so we can safely unwrap
    let scene_reader = io::BufReader::new({
        fs::File::open(parsed.get_one::<String>("scene").unwrap())?
    });

    let scene: accel::scene::Scene = //
        serde_json::from_reader(scene_reader)?;

    let index = accel::SceneIndex::build(scene, &config)?;

    let out = parsed
        .get_one::<String>("out")
        .map(path::PathBuf::from)
        .unwrap();

    if flag("raw") {
        fs::create_dir_all(&out)?;

        for accel::index::DeviceBuffer { name, contents } in index.buffers() {
            let path = out.join(format!("{}.bin", name));

            fs::File::create(&path)?.write_all(contents)?;

            log::info!("Wrote {} ({} bytes)", path.display(), contents.len());
        }
    } else {
        fs::File::create(&out)?
            .write_all(index.to_json()?.as_bytes())?;

        log::info!("Wrote {}", out.display());
    }

    Ok(())
}
