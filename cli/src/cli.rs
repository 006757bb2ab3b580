use std::path::PathBuf;

use clap::ValueEnum;

/// Historical topo-map lake extraction (classify, then label, then polygonize)
#[derive(clap::Parser, Debug)]
#[command(name = "topolakes", version, about, propagate_version = true)]
pub struct Cli {
    /// Increase log verbosity (-v, -vv); RUST_LOG overrides
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(clap::Subcommand, Debug)]
pub enum Commands {
    /// Resample and cluster every raster of a container; writes the manifest
    Classify(ClassifyArgs),

    /// Turn the labelled water class of every manifest row into lake polygons
    Polygonize(PolygonizeArgs),
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum Resampling {
    Nearest,
    Bilinear,
    Cubic,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum Naming {
    /// <stem>_iso
    Source,
    /// <location>_<year>_iso
    LocationYear,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum Connectivity {
    Four,
    Eight,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum Format {
    Shapefile,
    Geojson,
}

#[derive(clap::Args, Debug)]
pub struct ClassifyArgs {
    /// Directory of source GeoTIFFs
    #[arg(value_hint = clap::ValueHint::DirPath)]
    pub input: PathBuf,

    /// Directory receiving the classified rasters
    #[arg(value_hint = clap::ValueHint::DirPath)]
    pub output: PathBuf,

    /// Target cell size in map units
    #[arg(long)]
    pub cell_size: f64,

    /// Number of classes requested
    #[arg(long, default_value_t = 6)]
    pub classes: usize,

    /// Clusters with fewer cells are merged into their nearest neighbour
    #[arg(long, default_value_t = 20)]
    pub min_class_size: usize,

    /// Use every n-th row and column to fit the clusters
    #[arg(long, default_value_t = 10)]
    pub sample_interval: usize,

    #[arg(long, value_enum, default_value = "nearest")]
    pub resampling: Resampling,

    /// Manifest CSV, defaults to <OUTPUT>/classified_rasters.csv
    #[arg(long, value_hint = clap::ValueHint::FilePath)]
    pub manifest: Option<PathBuf>,

    /// Only classify rasters whose name matches this regular expression
    #[arg(long)]
    pub pattern: Option<String>,

    /// Directory levels to scan below INPUT
    #[arg(long, default_value_t = 1)]
    pub depth: usize,

    #[arg(long, value_enum, default_value = "source")]
    pub naming: Naming,

    /// Start a fresh manifest instead of appending to an existing one
    #[arg(long)]
    pub overwrite_manifest: bool,

    /// Skip rasters that are already classified and listed in the manifest
    #[arg(long)]
    pub skip_existing: bool,

    /// Maximum k-means iterations
    #[arg(long, default_value_t = 100)]
    pub max_iterations: u64,
}

#[derive(clap::Args, Debug)]
pub struct PolygonizeArgs {
    /// Manifest CSV with water_class filled in
    #[arg(value_hint = clap::ValueHint::FilePath)]
    pub manifest: PathBuf,

    /// Directory receiving the lake feature classes
    #[arg(value_hint = clap::ValueHint::DirPath)]
    pub output: PathBuf,

    /// Directory of classified rasters, defaults to the manifest's directory
    #[arg(long, value_hint = clap::ValueHint::DirPath)]
    pub rasters: Option<PathBuf>,

    /// Clip polygons to this layer (.shp or .geojson)
    #[arg(long, value_hint = clap::ValueHint::FilePath)]
    pub shoreline: Option<PathBuf>,

    /// Simplification tolerance in map units (0 disables)
    #[arg(long, default_value_t = 0.0)]
    pub tolerance: f64,

    /// Drop polygons whose area is not larger than this
    #[arg(long, default_value_t = 0.0)]
    pub min_area: f64,

    #[arg(long, value_enum, default_value = "four")]
    pub connectivity: Connectivity,

    /// Smooth the water mask with an 8-neighbour majority filter
    #[arg(long)]
    pub majority_filter: bool,

    /// Fill enclosed holes in the water mask
    #[arg(long)]
    pub fill_holes: bool,

    #[arg(long, value_enum, default_value = "shapefile")]
    pub format: Format,

    /// Skip rows whose feature class already exists
    #[arg(long)]
    pub skip_existing: bool,
}
