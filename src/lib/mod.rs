pub mod bounds;
pub mod bvh;
pub mod draw;
pub mod geom;
pub mod grid;
pub mod index;
pub mod scene;

pub use index::{IndexKind, SceneIndex};

use std::{fs, io, path};

// Config declaration. Every field falls back to its default when absent,
// so a config file only has to mention what it changes
#[derive(Clone, Copy, Default)]
#[derive(Debug, PartialEq)]
#[derive(serde::Deserialize, serde::Serialize)]
#[serde(default)]
pub struct Config {
    pub index: IndexKind,
    pub bvh: bvh::BvhConfig,
    pub grid: grid::GridConfig,
}

impl Config {
    pub fn from_file<P: AsRef<path::Path>>(path: P) -> anyhow::Result<Self> {
        let reader = io::BufReader::new({
            fs::File::open(path)?
        });

        let config: Self = serde_json::from_reader(reader)?;

        config.validate()?;

        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        self.bvh.validate()?;
        self.grid.validate()
    }
}

// Installs the logger used by the tools
pub fn init_logging(level: log::LevelFilter) -> anyhow::Result<()> {
    simple_logger::SimpleLogger::new()
        .with_level(level)
        .init()?;

    Ok(())
}
