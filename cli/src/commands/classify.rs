use anyhow::Result;
use topolakes::manifest::ManifestMode;
use topolakes::naming::NamingScheme;
use topolakes::raster::ResampleMethod;
use topolakes::{ClassifyConfig, Classifier};

use crate::cli::{ClassifyArgs, Cli, Naming, Resampling};

pub fn run(_cli: &Cli, args: &ClassifyArgs) -> Result<()> {
    let mut config = ClassifyConfig::new(&args.input, &args.output, args.cell_size);
    if let Some(manifest) = &args.manifest {
        config.manifest = manifest.clone();
    }
    config.cluster.num_classes = args.classes;
    config.cluster.min_class_size = args.min_class_size;
    config.cluster.sample_interval = args.sample_interval;
    config.cluster.max_iterations = args.max_iterations;
    config.resampling = match args.resampling {
        Resampling::Nearest => ResampleMethod::Nearest,
        Resampling::Bilinear => ResampleMethod::Bilinear,
        Resampling::Cubic => ResampleMethod::Cubic,
    };
    config.pattern = args.pattern.clone();
    config.depth = args.depth;
    config.naming = match args.naming {
        Naming::Source => NamingScheme::Source,
        Naming::LocationYear => NamingScheme::LocationYear,
    };
    config.manifest_mode = if args.overwrite_manifest { ManifestMode::Overwrite } else { ManifestMode::Append };
    config.skip_existing = args.skip_existing;

    tracing::info!("[classify] {} -> {}", config.input.display(), config.output.display());
    let summary = Classifier::new(config).run()?;
    print!("{summary}");
    Ok(())
}
