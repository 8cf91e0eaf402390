use std::{fs, path};
use std::io::Write as _;

use accel::{geom, scene};

fn main() -> anyhow::Result<()> {
    let cmd = clap::Command::new(env!("CARGO_BIN_NAME"))
        .arg(
            clap::Arg::new("material")
                .long("material")
                .help("type, diffuse (3), specular (3), emission (3), roughness, ior")
                .number_of_values(12)
                .value_parser(clap::value_parser!(f32))
                .action(clap::ArgAction::Append))
        .arg(
            clap::Arg::new("model")
                .long("model")
                .help("path to a wavefront file followed by its material index")
                .number_of_values(2)
                .action(clap::ArgAction::Append))
        .arg(
            clap::Arg::new("out")
                .long("out")
                .number_of_values(1)
                .required(true))
        .get_matches();

    accel::init_logging(log::LevelFilter::Info)?;

    let materials = cmd
        .get_many::<f32>("material")
        .unwrap_or_default()
        .copied()
        .collect::<Vec<_>>()
        .as_slice()
        .chunks_exact(12)
        .map(|values| {
            let &[ty, dr, dg, db, sr, sg, sb, er, eg, eb, roughness, ior] = values else {
                unreachable!();
            };

            geom::Material::new(
                ty as i32,
                [dr, dg, db],
                [sr, sg, sb],
                [er, eg, eb],
                roughness,
                ior,
            )
        }).collect::<Vec<_>>();

    let mut scene = scene::Scene {
        triangles: vec![],
        materials,
    };

    let models = cmd
        .get_many::<String>("model")
        .unwrap_or_default()
        .collect::<Vec<_>>();

    for pair in models.chunks_exact(2) {
        let [model, material] = pair else { unreachable!(); };

        let material = material.parse::<i32>()?;
        let obj = wavefront::Obj::from_file(path::Path::new(model.as_str()))?;

        let before = scene.triangles.len();

        scene.add_mesh(obj, material)?;

        log::info!(
            "Added {} triangles from {} with material {}",
            scene.triangles.len() - before, model, material
        );
    }

    let scene_serialized = serde_json::to_string_pretty(&scene)?;

    // This is required so we can safely unwrap
    let out = cmd.get_one::<String>("out").unwrap();

    fs::File::create(out)?
        .write_all(scene_serialized.as_bytes())?;

    log::info!("Wrote {} ({} triangles)", out, scene.triangles.len());

    Ok(())
}
