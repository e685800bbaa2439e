use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context as _;
use clap::{Parser, Subcommand, ValueEnum};
use tilefield::{
    Config, CoverageRaster, FeatureSet, GeoExtent, JfaStrategy, SceneDef, SdfGenerator,
    TickOutcome, TileDevice, TileOutput, TileRasterizer,
};

#[derive(Parser, Debug)]
#[command(name = "tilefield", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build a distance field from coverage and write it as a grayscale PNG.
    Sdf(SdfArgs),
    /// Render a scene as a grid of tiles through the async tile rasterizer.
    Tiles(TilesArgs),
}

#[derive(Parser, Debug)]
struct SdfArgs {
    /// Coverage PNG; any pixel with non-zero alpha is a seed.
    #[arg(long = "in", conflicts_with = "scene", required_unless_present = "scene")]
    in_path: Option<PathBuf>,

    /// Scene JSON whose features are rasterized as coverage.
    #[arg(long)]
    scene: Option<PathBuf>,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,

    /// Rasterization resolution for `--scene` (power of two).
    #[arg(long, default_value_t = 256)]
    resolution: u32,

    /// Output distance field size; defaults to the field resolution.
    #[arg(long)]
    size: Option<u32>,

    /// Physical length of the field's full width.
    #[arg(long)]
    span: Option<f32>,

    /// Physical distance mapped to black.
    #[arg(long)]
    lo: Option<f32>,

    /// Physical distance mapped to white.
    #[arg(long)]
    hi: Option<f32>,

    #[arg(long, value_enum)]
    strategy: Option<StrategyChoice>,

    /// JSON config file.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct TilesArgs {
    /// Scene JSON.
    #[arg(long)]
    scene: PathBuf,

    /// Directory receiving one PNG per non-empty tile.
    #[arg(long)]
    out_dir: PathBuf,

    /// Tile size in pixels.
    #[arg(long, default_value_t = 256)]
    size: u32,

    /// Tiles per side.
    #[arg(long, default_value_t = 2)]
    grid: u32,

    #[arg(long, value_enum, default_value_t = BackendChoice::Cpu)]
    backend: BackendChoice,

    /// JSON config file.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum StrategyChoice {
    Cpu,
    CpuParallel,
    Gpu,
}

impl From<StrategyChoice> for JfaStrategy {
    fn from(c: StrategyChoice) -> Self {
        match c {
            StrategyChoice::Cpu => JfaStrategy::Cpu,
            StrategyChoice::CpuParallel => JfaStrategy::CpuParallel,
            StrategyChoice::Gpu => JfaStrategy::Gpu,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum BackendChoice {
    Cpu,
    #[cfg(feature = "gpu")]
    Gpu,
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();
    match cli.cmd {
        Command::Sdf(args) => cmd_sdf(args),
        Command::Tiles(args) => cmd_tiles(args),
    }
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    match path {
        Some(p) => Config::from_path(p).with_context(|| format!("load config '{}'", p.display())),
        None => Ok(Config::default()),
    }
}

fn ensure_parent(path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    Ok(())
}

fn cmd_sdf(args: SdfArgs) -> anyhow::Result<()> {
    let mut cfg = load_config(args.config.as_deref())?;
    if let Some(s) = args.strategy {
        cfg.sdf.strategy = s.into();
    }
    if let Some(span) = args.span {
        cfg.resolve.span = span;
    }
    if let Some(lo) = args.lo {
        cfg.resolve.lo = lo;
    }
    if let Some(hi) = args.hi {
        cfg.resolve.hi = hi;
    }

    let generator = SdfGenerator::new(cfg.sdf.clone())?;

    let nnf = match (&args.in_path, &args.scene) {
        (Some(png), _) => {
            let coverage = read_coverage_png(png)?;
            generator.create_nearest_neighbor_field_from_raster(&coverage)?
        }
        (None, Some(scene_path)) => {
            let scene = SceneDef::from_path(scene_path)
                .with_context(|| format!("load scene '{}'", scene_path.display()))?;
            let features = scene.to_feature_set()?;
            generator.create_nearest_neighbor_field(&features, args.resolution, scene.extent)?
        }
        (None, None) => anyhow::bail!("either --in or --scene is required"),
    };

    let size = args.size.unwrap_or(nnf.width());
    let mut sdf = generator.allocate_sdf(size, *nnf.extent())?;
    cfg.resolve.resolve(&nnf, &mut sdf)?;

    ensure_parent(&args.out)?;
    image::save_buffer_with_format(
        &args.out,
        &sdf.to_gray8_top_down(),
        sdf.width(),
        sdf.height(),
        image::ColorType::L8,
        image::ImageFormat::Png,
    )
    .with_context(|| format!("write png '{}'", args.out.display()))?;

    eprintln!(
        "wrote {} ({}x{}, strategy {:?})",
        args.out.display(),
        sdf.width(),
        sdf.height(),
        generator.effective_strategy()
    );
    Ok(())
}

/// Coverage from a PNG's alpha, mapped onto a pixel-unit extent.
fn read_coverage_png(path: &Path) -> anyhow::Result<CoverageRaster> {
    let img = image::open(path)
        .with_context(|| format!("open coverage png '{}'", path.display()))?
        .to_rgba8();
    let (w, h) = img.dimensions();
    let extent = GeoExtent::new(0.0, 0.0, f64::from(w), f64::from(h))?;
    Ok(CoverageRaster::from_rgba8_top_down(
        w,
        h,
        img.as_raw(),
        extent,
    )?)
}

fn cmd_tiles(args: TilesArgs) -> anyhow::Result<()> {
    let cfg = load_config(args.config.as_deref())?;
    let scene = SceneDef::from_path(&args.scene)
        .with_context(|| format!("load scene '{}'", args.scene.display()))?;
    let features = scene.to_feature_set()?;

    match args.backend {
        BackendChoice::Cpu => {
            let rasterizer = TileRasterizer::cpu(args.size, args.size, cfg.tiles.clone())?;
            run_tiles(rasterizer, features, &scene.extent, &args)
        }
        #[cfg(feature = "gpu")]
        BackendChoice::Gpu => {
            let device = tilefield::GpuTileDevice::new(args.size, args.size)?;
            let rasterizer = TileRasterizer::new(device, cfg.tiles.clone())?;
            run_tiles(rasterizer, features, &scene.extent, &args)
        }
    }
}

fn run_tiles<D>(
    mut rasterizer: TileRasterizer<D>,
    features: FeatureSet,
    extent: &GeoExtent,
    args: &TilesArgs,
) -> anyhow::Result<()>
where
    D: TileDevice<Content = FeatureSet>,
{
    let grid = args.grid.max(1);
    let cells = extent.subdivide(grid, grid);

    let handle = rasterizer.handle();
    let producer = std::thread::spawn(move || {
        cells
            .into_iter()
            .map(|cell| handle.render(features.clone(), cell))
            .collect::<Vec<_>>()
    });

    loop {
        let outcome = rasterizer.tick();
        if outcome == TickOutcome::Idle {
            if producer.is_finished() && rasterizer.pending() == 0 {
                break;
            }
            std::thread::sleep(Duration::from_millis(1));
        }
    }
    let futures = producer
        .join()
        .map_err(|_| anyhow::anyhow!("tile producer thread panicked"))?;

    std::fs::create_dir_all(&args.out_dir)
        .with_context(|| format!("create output dir '{}'", args.out_dir.display()))?;

    let (mut written, mut empty) = (0usize, 0usize);
    for (i, future) in futures.into_iter().enumerate() {
        let (col, row) = (i as u32 % grid, i as u32 / grid);
        match future.wait()? {
            TileOutput::Empty => {
                empty += 1;
                eprintln!("tile {col},{row}: empty");
            }
            TileOutput::Image(img) => {
                let path = args.out_dir.join(format!("tile_{col}_{row}.png"));
                image::save_buffer_with_format(
                    &path,
                    &img.to_straight_rgba8(),
                    img.width,
                    img.height,
                    image::ColorType::Rgba8,
                    image::ImageFormat::Png,
                )
                .with_context(|| format!("write png '{}'", path.display()))?;
                written += 1;
            }
        }
    }

    eprintln!(
        "wrote {written} tiles to {} ({empty} empty)",
        args.out_dir.display()
    );
    Ok(())
}
