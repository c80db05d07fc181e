use std::collections::BTreeMap;
use std::error::Error;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use clap::Parser;
use serde::Serialize;

use worldmap_generator::biomes::{Biome, DetailedBiomeMapper, SimpleBiomeMapper};
use worldmap_generator::config::WorldConfig;
use worldmap_generator::error::ConfigError;
use worldmap_generator::normalize::FieldStats;
use worldmap_generator::projection::{PolarDistorted, Projection, Topology, Toroidal};
use worldmap_generator::world::WorldMap;

#[derive(Parser, Debug)]
#[command(name = "worldmap_generator")]
#[command(about = "Generate wrapping world maps with rivers, lakes and biomes")]
struct Args {
    /// Load settings from a JSON config file; flags override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Width of the map in cells
    #[arg(short = 'W', long)]
    width: Option<usize>,

    /// Height of the map in cells
    #[arg(short = 'H', long)]
    height: Option<usize>,

    /// Random seed (uses random seed if not specified)
    #[arg(short, long)]
    seed: Option<u64>,

    /// World shape
    #[arg(short, long, value_enum)]
    topology: Option<Topology>,

    /// Sea level modifier (random if not specified)
    #[arg(long)]
    water: Option<f64>,

    /// Pole cooling modifier (random if not specified)
    #[arg(long)]
    cooling: Option<f64>,

    /// Skip river and lake carving
    #[arg(long)]
    no_rivers: bool,

    /// Scale the octave count of every noise field
    #[arg(long)]
    octave_multiplier: Option<f64>,

    /// Number of zoom levels to descend after generating
    #[arg(short, long, default_value = "0")]
    zoom: usize,

    /// Zoom centre X (default: centre of map)
    #[arg(long)]
    zoom_x: Option<usize>,

    /// Zoom centre Y (default: centre of map)
    #[arg(long)]
    zoom_y: Option<usize>,

    /// Use the blended biome classifier
    #[arg(long)]
    detailed: bool,

    /// Write the effective settings to a JSON file
    #[arg(long)]
    save_config: Option<PathBuf>,

    /// Write a JSON summary of the generated map
    #[arg(long)]
    report: Option<PathBuf>,
}

impl Args {
    fn resolve_config(&self) -> Result<WorldConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => WorldConfig::load(path)?,
            None => WorldConfig::default(),
        };
        if let Some(width) = self.width {
            config.width = width;
        }
        if let Some(height) = self.height {
            config.height = height;
        }
        if let Some(topology) = self.topology {
            config.topology = topology;
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }
        if self.water.is_some() {
            config.water = self.water;
        }
        if self.cooling.is_some() {
            config.cooling = self.cooling;
        }
        if self.no_rivers {
            config.generate_rivers = false;
        }
        if let Some(multiplier) = self.octave_multiplier {
            config.octave_multiplier = multiplier;
        }
        config.validate()?;
        Ok(config)
    }
}

#[derive(Serialize)]
struct Report<'a> {
    config: &'a WorldConfig,
    seed: u64,
    water_modifier: f64,
    cooling_modifier: f64,
    zoom: usize,
    window_origin: (usize, usize),
    land_cells: usize,
    river_cells: usize,
    lake_cells: usize,
    stats: FieldStats,
    biomes: BTreeMap<Biome, usize>,
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let args = Args::parse();
    let mut config = args.resolve_config()?;
    let seed = *config.seed.get_or_insert_with(rand::random);

    if let Some(path) = &args.save_config {
        config.save(path)?;
        println!("Saved config to {}", path.display());
    }

    match config.topology {
        Topology::Toroidal => run(Toroidal, &config, seed, &args),
        Topology::Polar => run(PolarDistorted, &config, seed, &args),
    }
}

fn run<P: Projection>(projection: P, config: &WorldConfig, seed: u64, args: &Args) -> Result<(), Box<dyn Error>> {
    println!("Generating {} world with seed: {}", config.topology, seed);
    println!("Map size: {}x{}", config.width, config.height);

    let mut world = WorldMap::with_settings(projection, config.width, config.height, seed, config.octave_multiplier);
    world.set_generate_rivers(config.generate_rivers);

    let (water, cooling) = config.resolved_modifiers();
    world.generate_with(water, cooling, seed);
    let (water, cooling) = world.modifiers();
    println!("Modifiers: water {:.3}, cooling {:.3}", water, cooling);

    if args.zoom > 0 {
        let cx = args.zoom_x.unwrap_or(config.width / 2).min(config.width - 1);
        let cy = args.zoom_y.unwrap_or(config.height / 2).min(config.height - 1);
        println!("Zooming {} levels at ({}, {})...", args.zoom, cx, cy);
        world.zoom_in_at(args.zoom, cx, cy);
    }

    let area = (config.width * config.height) as f64;
    let land_cells = world.land().len();
    let river_cells = world.partial_rivers().len();
    let lake_cells = world.partial_lakes().len();
    println!("Zoom level: {} (origin {:?})", world.zoom(), world.window_origins().last().copied().unwrap_or((0, 0)));
    println!("Land: {} cells ({:.1}%)", land_cells, 100.0 * land_cells as f64 / area);
    println!("Rivers: {} cells, lakes: {} cells", river_cells, lake_cells);

    let biomes = if args.detailed {
        let mut mapper = DetailedBiomeMapper::new();
        mapper.make_biomes(&world);
        histogram(mapper.biome_codes.iter().map(|(_, _, blend)| blend.biome_a()))
    } else {
        let mut mapper = SimpleBiomeMapper::new();
        mapper.make_biomes(&world);
        histogram(mapper.biome_codes.iter().map(|(x, y, _)| mapper.biome(x, y)))
    };

    println!("Biomes:");
    for (biome, count) in &biomes {
        println!("  {:<28} {:>8} ({:.1}%)", biome.display_name(), count, 100.0 * *count as f64 / area);
    }

    if let Some(path) = &args.report {
        let report = Report {
            config,
            seed,
            water_modifier: water,
            cooling_modifier: cooling,
            zoom: world.zoom(),
            window_origin: world.window_origins().last().copied().unwrap_or((0, 0)),
            land_cells,
            river_cells,
            lake_cells,
            stats: *world.stats(),
            biomes,
        };
        write_report(path, &report)?;
        println!("Wrote report to {}", path.display());
    }

    Ok(())
}

fn histogram(biomes: impl Iterator<Item = Biome>) -> BTreeMap<Biome, usize> {
    let mut counts = BTreeMap::new();
    for biome in biomes {
        *counts.entry(biome).or_insert(0) += 1;
    }
    counts
}

fn write_report(path: &Path, report: &Report) -> Result<(), ConfigError> {
    let file = File::create(path).map_err(|source| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::to_writer_pretty(BufWriter::new(file), report).map_err(ConfigError::Serialize)
}
