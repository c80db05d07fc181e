//! World map generation library
//!
//! Synthesizes wrapping heightmaps with heat and moisture fields, carves
//! rivers and lakes, zooms into windows of the same surface and classifies
//! biomes. Re-exports the main types for the binary and other tools.

pub mod biomes;
pub mod config;
pub mod error;
pub mod hydrology;
pub mod noise_field;
pub mod normalize;
pub mod projection;
pub mod region;
pub mod seeds;
pub mod tilemap;
pub mod world;

pub use biomes::{Biome, BlendedBiome, DetailedBiomeMapper, SimpleBiomeMapper};
pub use config::WorldConfig;
pub use error::ConfigError;
pub use projection::{PolarDistorted, Projection, Topology, Toroidal};
pub use region::Region;
pub use tilemap::Tilemap;
pub use world::{code_height, SphereMap, TilingMap, WorldMap};
