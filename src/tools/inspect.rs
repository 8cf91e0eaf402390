use std::{fs, path};

use accel::{draw, index};

fn main() -> anyhow::Result<()> {
    let parsed = clap::Command::new(env!("CARGO_BIN_NAME"))
        .arg(
            clap::Arg::new("index")
                .long("index")
                .number_of_values(1)
                .required(true))
        .arg(
            clap::Arg::new("svg")
                .long("svg")
                .number_of_values(1))
        .arg(
            clap::Arg::new("plane")
                .long("plane")
                .number_of_values(1)
                .value_parser(["xy", "xz", "zy"])
                .default_value("xy"))
        .arg(
            clap::Arg::new("dump")
                .long("dump")
                .action(clap::ArgAction::SetTrue))
        .get_matches();

    accel::init_logging(log::LevelFilter::Info)?;

    // This is required so we can safely unwrap
    let bytes = parsed
        .get_one::<String>("index")
        .map(fs::read)
        .unwrap()?;

    let index = accel::SceneIndex::from_slice(&bytes)?;

    println!(
        "{} triangles, {} materials",
        index.triangles.len(),
        index.materials.len()
    );

    let plane = match parsed.get_one::<String>("plane").map(String::as_str) {
        Some("xz") => draw::Plane::Xz,
        Some("zy") => draw::Plane::Zy,
        _ => draw::Plane::Xy,
    };

    let document = match &index.structure {
        index::Structure::Bvh(bvh) => {
            println!("{:#?}", bvh.stats);

            if *parsed.get_one::<bool>("dump").unwrap_or(&false) {
                print!("{}", bvh);
            }

            draw::bvh_svg(bvh, plane)
        },
        index::Structure::Grid(grid) => {
            println!(
                "resolution {}, bounds {:?} to {:?}",
                grid.resolution, grid.bounds.min, grid.bounds.max
            );
            println!("{:#?}", grid.stats);

            if *parsed.get_one::<bool>("dump").unwrap_or(&false) {
                for (idx, cell) in grid.cells.iter().enumerate().filter(|(_, c)| c.count > 0) {
                    println!("{:>8}: {:?}", idx, &grid.indices[cell.range()]);
                }
            }

            draw::grid_svg(grid, plane)
        },
    };

    if let Some(out) = parsed.get_one::<String>("svg").map(path::PathBuf::from) {
        svg::save(&out, &document)?;

        log::info!("Wrote {}", out.display());
    }

    Ok(())
}
