//! Schematic Bones CLI
//!
//! Compile block palettes into bone geometry and a texture atlas.

use clap::{Parser, Subcommand};
use schematic_bones::rules::ShapeResolver;
use schematic_bones::{
    load_rules, Block, BoneTemplate, Compiler, CompilerConfig, CompilerOutput, Diagnostics,
    DirectorySource, OutlineConfig, Severity, StateValue,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "schematic-bones")]
#[command(author, version, about = "Compile block palettes into bone geometry and a texture atlas", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a palette JSON file
    Compile {
        /// Input JSON file with a palette and optional block placements
        #[arg(short, long)]
        input: PathBuf,

        /// Path to the rule bundle (ZIP, directory or JSON file)
        #[arg(short, long)]
        rules: PathBuf,

        /// Texture root directory
        #[arg(short, long)]
        textures: PathBuf,

        /// Output directory
        #[arg(short, long)]
        output: PathBuf,

        /// Compiler configuration JSON file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Global scale factor
        #[arg(long)]
        scale: Option<f64>,

        /// Outline width in texture pixels
        #[arg(long)]
        outline: Option<f64>,

        /// Fail on self-referential or runaway copies
        #[arg(long)]
        strict: bool,
    },

    /// Show information about a rule bundle
    Info {
        /// Path to the rule bundle (ZIP, directory or JSON file)
        #[arg(short, long)]
        rules: PathBuf,

        /// Block names to look up, with or without properties ("name[key=value,...]")
        #[arg(short, long)]
        block: Vec<String>,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Compile {
            input,
            rules,
            textures,
            output,
            config,
            scale,
            outline,
            strict,
        } => {
            let mut config = match config {
                Some(path) => serde_json::from_str(&fs::read_to_string(path)?)?,
                None => CompilerConfig::default(),
            };
            if let Some(scale) = scale {
                config = config.with_scale(scale);
            }
            if let Some(width) = outline {
                config = config.with_outline(OutlineConfig {
                    width,
                    ..OutlineConfig::default()
                });
            }
            if strict {
                config = config.with_strict(true);
            }
            compile(&input, &rules, &textures, &output, config)?;
        }
        Commands::Info { rules, block } => {
            show_rules_info(&rules, &block)?;
        }
    }

    Ok(())
}

// JSON input format
#[derive(Deserialize)]
struct CompileInput {
    palette: Vec<Block>,
    #[serde(default)]
    blocks: Vec<BlockEntry>,
}

#[derive(Deserialize)]
struct BlockEntry {
    x: i32,
    y: i32,
    z: i32,
    /// Palette index.
    palette: usize,
}

#[derive(Serialize)]
struct GeometryOutput<'a> {
    atlas_width: u32,
    atlas_height: u32,
    efficiency: f64,
    bones: &'a [BoneTemplate],
    placed: Vec<BoneTemplate>,
    uv_table: &'a [schematic_bones::Placement],
    diagnostics: &'a [schematic_bones::Diagnostic],
}

fn compile(
    input_path: &Path,
    rules_path: &Path,
    textures: &Path,
    output_dir: &Path,
    config: CompilerConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    println!("Loading rules from {:?}...", rules_path);
    let rules = load_rules(rules_path)?;
    println!(
        "  {} named shapes, {} shape patterns, {} geometries",
        rules.shapes_by_name.len(),
        rules.shapes_by_pattern.len(),
        rules.shape_geometry.len()
    );

    println!("Loading palette from {:?}...", input_path);
    let input: CompileInput = serde_json::from_str(&fs::read_to_string(input_path)?)?;
    println!(
        "  {} palette entries, {} placed blocks",
        input.palette.len(),
        input.blocks.len()
    );

    let source = DirectorySource::new(textures);
    let output = Compiler::with_config(&rules, config).compile(&input.palette, &source)?;
    report(&output);

    fs::create_dir_all(output_dir)?;
    for (i, variant) in output.atlases.iter().enumerate() {
        let path = if output.atlases.len() == 1 {
            output_dir.join("atlas.png")
        } else {
            output_dir.join(format!("atlas_{}.png", i))
        };
        let png = variant.atlas.to_png()?;
        fs::write(&path, &png)?;
        println!("Wrote atlas at opacity {} ({} bytes) to {:?}", variant.opacity, png.len(), path);
    }

    let placed = input
        .blocks
        .iter()
        .filter_map(|entry| {
            let bone = output.bones.get(entry.palette);
            if bone.is_none() {
                log::warn!("Block at {},{},{} uses unknown palette index {}", entry.x, entry.y, entry.z, entry.palette);
            }
            bone.map(|bone| bone.place([entry.x, entry.y, entry.z]))
        })
        .collect();

    let geometry = GeometryOutput {
        atlas_width: output.atlas_width,
        atlas_height: output.atlas_height,
        efficiency: output.efficiency,
        bones: &output.bones,
        placed,
        uv_table: &output.uv_table,
        diagnostics: &output.diagnostics,
    };
    let path = output_dir.join("geometry.json");
    fs::write(&path, serde_json::to_string_pretty(&geometry)?)?;
    println!("Wrote geometry to {:?}", path);

    Ok(())
}

fn report(output: &CompilerOutput) {
    let cubes: usize = output.bones.iter().map(|bone| bone.cubes.len()).sum();
    println!("  Generated {} bones with {} cubes", output.bones.len(), cubes);
    println!(
        "  {} texture references, {} unique fragments",
        output.texture_references.len(),
        output.fragments.len()
    );
    println!(
        "  Atlas: {}x{} ({:.1}% filled)",
        output.atlas_width,
        output.atlas_height,
        output.efficiency * 100.0
    );

    let count = |severity: Severity| output.diagnostics.iter().filter(|d| d.severity == severity).count();
    println!(
        "  Diagnostics: {} errors, {} warnings, {} notes",
        count(Severity::Error),
        count(Severity::Warning),
        count(Severity::Info)
    );
}

fn show_rules_info(rules_path: &Path, blocks: &[String]) -> Result<(), Box<dyn std::error::Error>> {
    println!("Loading rules from {:?}...", rules_path);
    let rules = load_rules(rules_path)?;

    println!("\nRule Bundle Info:");
    println!("  Named shapes: {}", rules.shapes_by_name.len());
    println!("  Shape patterns: {}", rules.shapes_by_pattern.len());
    println!("  Shape geometries: {}", rules.shape_geometry.len());
    println!("  Block face tables: {}", rules.block_textures.len());
    println!("  Terrain textures: {}", rules.terrain_textures.len());
    println!("  Tints: {}", rules.tints.len());
    println!("  Ignored blocks: {}", rules.ignored_blocks.len());

    if blocks.is_empty() {
        return Ok(());
    }

    let diagnostics = Diagnostics::new();
    let shapes = ShapeResolver::new(&rules, &diagnostics);
    println!();
    for name in blocks {
        let block = parse_block(name)?;
        let shape = shapes.resolve(&block.name);
        let cubes = rules.geometry(&shape).map_or(0, Vec::len);
        println!("  {} -> {} ({} cube templates)", block.name, shape, cubes);
    }

    Ok(())
}

/// Parse "name" or "name[key=value,...]".
fn parse_block(input: &str) -> Result<Block, String> {
    let Some((name, rest)) = input.split_once('[') else {
        return Ok(Block::new(input));
    };
    let properties = rest
        .strip_suffix(']')
        .ok_or_else(|| format!("Invalid block '{}': missing ']'", input))?;

    let mut states = BTreeMap::new();
    for property in properties.split(',').filter(|p| !p.is_empty()) {
        let (key, value) = property
            .split_once('=')
            .ok_or_else(|| format!("Invalid property format: '{}'. Use key=value", property))?;
        let value = match value {
            "true" => StateValue::Bool(true),
            "false" => StateValue::Bool(false),
            v => v
                .parse::<i64>()
                .map(StateValue::Int)
                .unwrap_or_else(|_| StateValue::Str(v.to_string())),
        };
        states.insert(key.to_string(), value);
    }

    let mut block = Block::new(name);
    block.states = states;
    Ok(block)
}
