//! occluder CLI - build an occlusion tree for a level and trace shadow rays
//!
//! Scenes are JSON files holding the compiled level, its entities, the
//! resolved shaders and any external models.

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Result;
use clap::{Parser, Subcommand};
use log::info;
use occluder::{BuildSettings, Occlusion, OcclusionTree, TraceRequest};
use occluder_math::Point3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

mod scene;

use scene::LoadedScene;

#[derive(Parser)]
#[command(name = "occluder")]
#[command(about = "Shadow ray tracing against compiled levels", long_about = None)]
struct Cli {
    /// TOML build settings
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the occlusion tree and print its statistics
    Info {
        /// Scene JSON file
        scene: PathBuf,
    },
    /// Trace a single ray
    Trace {
        /// Scene JSON file
        scene: PathBuf,
        /// Ray origin as x,y,z
        #[arg(long, value_parser = parse_point, allow_hyphen_values = true)]
        from: Point3,
        /// Ray end as x,y,z
        #[arg(long, value_parser = parse_point, allow_hyphen_values = true)]
        to: Point3,
        /// Ignore hits this close to the origin
        #[arg(long, default_value_t = 0.0)]
        inhibit: f64,
        /// Receive-shadow group of the sample
        #[arg(long, default_value_t = 1, allow_hyphen_values = true)]
        recv: i32,
        /// Keep tracing through solid space and into the skybox
        #[arg(long)]
        test_all: bool,
    },
    /// Trace random rays inside the level bounds
    Probe {
        /// Scene JSON file
        scene: PathBuf,
        /// Number of rays
        #[arg(short = 'n', long, default_value_t = 10000)]
        count: usize,
        /// Random seed
        #[arg(long, default_value_t = 0)]
        seed: u64,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    let settings = load_settings(cli.settings.as_deref())?;

    match cli.command {
        Commands::Info { scene } => show_info(&scene, &settings)?,
        Commands::Trace {
            scene,
            from,
            to,
            inhibit,
            recv,
            test_all,
        } => {
            let request = TraceRequest::new(from, to)
                .with_inhibit_radius(inhibit)
                .with_recv_shadows(recv)
                .with_test_all(test_all);
            trace_one(&scene, &settings, request)?;
        }
        Commands::Probe { scene, count, seed } => probe(&scene, &settings, count, seed)?,
    }

    Ok(())
}

fn parse_point(s: &str) -> std::result::Result<Point3, String> {
    let parts: Vec<f64> = s
        .split(',')
        .map(|p| p.trim().parse::<f64>().map_err(|e| format!("{p:?}: {e}")))
        .collect::<std::result::Result<_, _>>()?;
    match parts[..] {
        [x, y, z] => Ok(Point3::new(x, y, z)),
        _ => Err(format!("expected x,y,z, got {s:?}")),
    }
}

fn load_settings(path: Option<&Path>) -> Result<BuildSettings> {
    match path {
        Some(path) => {
            let text = std::fs::read_to_string(path)?;
            Ok(BuildSettings::from_toml_str(&text)?)
        }
        None => Ok(BuildSettings::default()),
    }
}

fn build(path: &Path, settings: &BuildSettings) -> Result<(LoadedScene, OcclusionTree)> {
    let loaded = LoadedScene::load(path)?;
    let start = Instant::now();
    let tree = OcclusionTree::build(loaded.scene(), settings)?;
    info!("built occlusion tree in {:.1?}", start.elapsed());
    Ok((loaded, tree))
}

fn show_info(path: &Path, settings: &BuildSettings) -> Result<()> {
    let (loaded, tree) = build(path, settings)?;
    let stats = tree.stats();

    println!("Scene: {}", path.display());
    println!("  Surfaces: {}", loaded.level.surfaces.len());
    println!("  Entities: {}", loaded.entities.len());
    println!("  Shaders: {}", loaded.shaders.len());
    println!();
    println!("Occlusion tree:");
    println!("  Polygons in: {}", stats.input_polygons);
    println!("  Degenerate: {}", stats.degenerate_polygons);
    println!("  Infos: {}", stats.infos);
    println!("  Windings: {}", stats.windings);
    println!("  Triangles: {}", stats.triangles);
    println!("  Nodes: {} ({} leaves)", stats.nodes, stats.leaves);
    println!("  Max depth: {}", stats.max_depth);
    Ok(())
}

fn trace_one(path: &Path, settings: &BuildSettings, mut request: TraceRequest) -> Result<()> {
    let (_, tree) = build(path, settings)?;
    let result = tree.trace(&mut request);

    match result {
        Occlusion::Unblocked => println!("Unblocked"),
        Occlusion::Blocked(occluder::Blocker::Solid) => println!("Blocked by solid space"),
        Occlusion::Blocked(occluder::Blocker::Surface { info, depth }) => {
            let info = tree.info(info);
            match info.surface {
                Some(surface) => println!(
                    "Blocked by {} (surface {surface}) at depth {depth:.3}",
                    info.shader.name
                ),
                None => println!("Blocked by {} at depth {depth:.3}", info.shader.name),
            }
        }
    }
    let hit = request.hit;
    println!("  Hit: {:.3} {:.3} {:.3}", hit.x, hit.y, hit.z);
    let [r, g, b] = request.color;
    println!("  Color: {r:.4} {g:.4} {b:.4}");
    println!("  Flags: {:?}", request.flags);
    println!("  Passed solid: {}", request.pass_solid);
    println!("  Triangles tested: {}", request.triangles_tested);
    Ok(())
}

fn probe(path: &Path, settings: &BuildSettings, count: usize, seed: u64) -> Result<()> {
    let (loaded, tree) = build(path, settings)?;
    let bounds = loaded.bounds();
    if bounds.is_empty() {
        anyhow::bail!("scene has no vertices to probe");
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut point = || {
        Point3::new(
            lerp(bounds.min.x, bounds.max.x, rng.gen()),
            lerp(bounds.min.y, bounds.max.y, rng.gen()),
            lerp(bounds.min.z, bounds.max.z, rng.gen()),
        )
    };
    let mut requests: Vec<TraceRequest> = (0..count)
        .map(|_| TraceRequest::new(point(), point()))
        .collect();

    let start = Instant::now();
    let results = tree.trace_all(&mut requests);
    let elapsed = start.elapsed();

    let blocked = results.iter().filter(|r| r.is_blocked()).count();
    let solid = results
        .iter()
        .filter(|r| matches!(r, Occlusion::Blocked(occluder::Blocker::Solid)))
        .count();
    let tested: usize = requests.iter().map(|r| r.triangles_tested).sum();
    let fraction = if count > 0 {
        blocked as f64 / count as f64
    } else {
        0.0
    };

    println!("Traced {count} rays in {elapsed:.1?}");
    println!("  Blocked: {blocked} ({:.1}%)", fraction * 100.0);
    println!("  By solid space: {solid}");
    println!(
        "  Triangles tested per ray: {:.1}",
        tested as f64 / count.max(1) as f64
    );
    Ok(())
}

fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}
