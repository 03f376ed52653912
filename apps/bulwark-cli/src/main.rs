use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use glam::IVec2;
use tracing_subscriber::EnvFilter;

use bulwark_game::{Level, can_build, place_tower};
use bulwark_render::{AsciiRenderer, RenderView, Renderer};
use bulwark_tools::LevelInspector;

#[derive(Parser)]
#[command(name = "bulwark-cli", about = "CLI tool for bulwark levels")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Level file (.json, .yaml or .yml); the built-in demo when omitted
    #[arg(short, long, global = true)]
    level: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print a level summary
    Info,
    /// Print the enemy route cell by cell
    Route,
    /// Check whether a tower could go at a cell
    Check { x: i32, y: i32 },
    /// Place towers in order, reporting rejections
    Build {
        /// Cells as `x,y`
        #[arg(required = true, value_parser = parse_cell)]
        cells: Vec<IVec2>,
        /// Draw the level afterwards
        #[arg(long)]
        render: bool,
    },
    /// Draw the level as text
    Render {
        /// Skip the route overlay
        #[arg(long)]
        no_route: bool,
    },
    /// Show terrain and entities at a cell
    Inspect { x: i32, y: i32 },
}

fn parse_cell(s: &str) -> Result<IVec2, String> {
    let (x, y) = s
        .split_once(',')
        .ok_or_else(|| format!("expected `x,y`, got `{s}`"))?;
    let parse = |v: &str| {
        v.trim()
            .parse::<i32>()
            .map_err(|e| format!("bad coordinate `{v}`: {e}"))
    };
    Ok(IVec2::new(parse(x)?, parse(y)?))
}

fn load(path: Option<&PathBuf>) -> anyhow::Result<Level> {
    let level = match path {
        Some(path) => Level::load(path)
            .with_context(|| format!("loading level {}", path.display()))?,
        None => Level::demo().context("building demo level")?,
    };
    tracing::debug!(
        name = %level.name,
        source = ?path,
        entities = level.manager.entity_count(),
        "level loaded"
    );
    Ok(level)
}

/// Place towers in order, printing each outcome. Returns how many stuck.
fn build_towers(level: &mut Level, cells: &[IVec2]) -> usize {
    let _span = tracing::info_span!("build_towers", requested = cells.len()).entered();
    let mut placed = 0usize;
    for cell in cells {
        match place_tower(level, *cell) {
            Ok(id) => {
                placed += 1;
                println!("placed tower {id} at ({}, {})", cell.x, cell.y);
            }
            Err(reason) => println!("skipped ({}, {}): {reason}", cell.x, cell.y),
        }
    }
    tracing::info!(placed, rejected = cells.len() - placed, "build finished");
    placed
}

fn draw(level: &Level, with_route: bool, highlight: Option<IVec2>) -> anyhow::Result<String> {
    let route = if with_route {
        level.route()?
    } else {
        Vec::new()
    };
    let view = RenderView { route, highlight };
    Ok(AsciiRenderer::new().render(level, &view))
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let mut level = load(cli.level.as_ref())?;

    match cli.command {
        Commands::Info => {
            println!("bulwark-cli v{}", env!("CARGO_PKG_VERSION"));
            println!("{}", LevelInspector::summary(&level));
        }
        Commands::Route => {
            let route = level.route()?;
            if route.is_empty() {
                println!("Route: blocked");
            } else {
                println!("Route: {} cells", route.len());
                for (i, p) in route.iter().enumerate() {
                    println!("  {i:>3}: ({}, {})", p.x, p.y);
                }
            }
        }
        Commands::Check { x, y } => {
            let cell = IVec2::new(x, y);
            let verdict = can_build(&level, cell);
            tracing::debug!(%cell, ok = verdict.is_ok(), "build check");
            match verdict {
                Ok(route) => {
                    println!("OK: ({x}, {y}) buildable, route becomes {} cells", route.len())
                }
                Err(reason) => println!("REJECTED: {reason}"),
            }
        }
        Commands::Build { cells, render } => {
            let placed = build_towers(&mut level, &cells);
            println!("{placed}/{} towers placed", cells.len());
            println!("{}", LevelInspector::summary(&level));
            if render {
                print!("{}", draw(&level, true, None)?);
            }
        }
        Commands::Render { no_route } => {
            print!("{}", draw(&level, !no_route, None)?);
        }
        Commands::Inspect { x, y } => {
            let cell = IVec2::new(x, y);
            match LevelInspector::inspect_cell(&level, cell) {
                Some(info) => println!("{info}"),
                None => anyhow::bail!("({x}, {y}) is outside the {} map", level.tile_map.size()),
            }
        }
    }

    Ok(())
}
