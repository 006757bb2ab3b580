use anyhow::Result;
use topolakes::{Connectivity, OutputFormat, PolygonizeConfig, Polygonizer};

use crate::cli::{self, Cli, Format, PolygonizeArgs};

pub fn run(_cli: &Cli, args: &PolygonizeArgs) -> Result<()> {
    let mut config = PolygonizeConfig::new(&args.manifest, &args.output);
    if let Some(rasters) = &args.rasters {
        config.rasters = rasters.clone();
    }
    config.shoreline = args.shoreline.clone();
    config.tolerance = args.tolerance;
    config.min_area = args.min_area;
    config.connectivity = match args.connectivity {
        cli::Connectivity::Four => Connectivity::Four,
        cli::Connectivity::Eight => Connectivity::Eight,
    };
    config.majority_filter = args.majority_filter;
    config.fill_holes = args.fill_holes;
    config.format = match args.format {
        Format::Shapefile => OutputFormat::Shapefile,
        Format::Geojson => OutputFormat::GeoJson,
    };
    config.skip_existing = args.skip_existing;

    tracing::info!("[polygonize] {} -> {}", config.manifest.display(), config.output.display());
    let summary = Polygonizer::new(config).run()?;
    print!("{summary}");
    Ok(())
}
