//! ChsModel CLI
//!
//! Exports JSON/YAML scene descriptions to ChsModel containers and inspects
//! existing `.chsmodel` files.

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::{debug, info, warn, Level};

use chsmodel_export::container::{is_chsmodel_path, ChsModelFile, MeshSummary, EXTENSION};
use chsmodel_export::logging::{self, TracingConfig};
use chsmodel_export::{
    ContainerFormat, ExportOptions, IndexWidth, IndexWidthPolicy, ModelExporter, SamplingSpace,
};
use chsmodel_scene::InMemoryScene;

/// chsmodel - export scenes to ChsModel containers
#[derive(Parser)]
#[command(name = "chsmodel")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose output (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Output format for reports
    #[arg(long, global = true, default_value = "text")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Unknown format: {}", s)),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Export a scene description to a ChsModel file
    Export(ExportArgs),

    /// Show information about a ChsModel file
    Info(InfoArgs),
}

#[derive(Args)]
struct ExportArgs {
    /// Scene description (.json, .yaml or .yml)
    scene: PathBuf,

    /// Output file, defaults to the scene path with a .chsmodel extension
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Export options file (.json, .yaml or .yml); flags below override it
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Write the text-only container instead of the hybrid one
    #[arg(long)]
    text: bool,

    /// How index width is chosen
    #[arg(long, value_enum)]
    index_width: Option<IndexWidthArg>,

    /// Sample positions and normals in world space
    #[arg(long)]
    world_space: bool,

    /// Write through a temporary file and rename into place
    #[arg(long)]
    atomic: bool,

    /// Model id, defaults to the output file stem
    #[arg(long)]
    model_id: Option<String>,

    /// Also export invisible and intermediate meshes
    #[arg(long)]
    include_hidden: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum IndexWidthArg {
    /// 16-bit while polygons * 3 stays below 65536
    TriangleEstimate,
    /// 16-bit while the deduplicated vertex count fits
    UniqueVertexCount,
}

impl From<IndexWidthArg> for IndexWidthPolicy {
    fn from(arg: IndexWidthArg) -> Self {
        match arg {
            IndexWidthArg::TriangleEstimate => IndexWidthPolicy::TriangleEstimate,
            IndexWidthArg::UniqueVertexCount => IndexWidthPolicy::UniqueVertexCount,
        }
    }
}

#[derive(Args)]
struct InfoArgs {
    /// Path to a .chsmodel file
    path: PathBuf,

    /// Show attributes, materials and curves per mesh
    #[arg(short, long)]
    detailed: bool,
}

fn setup_logging(verbosity: u8) {
    let level = match verbosity {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    logging::init_with_config(TracingConfig {
        default_level: level.to_string().to_lowercase(),
        show_target: verbosity >= 2,
        show_thread_ids: verbosity >= 3,
        show_file: verbosity >= 3,
        show_line_number: verbosity >= 3,
    });
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    match cli.command {
        Commands::Export(args) => cmd_export(args, cli.format),
        Commands::Info(args) => cmd_info(args, cli.format),
    }
}

/// Options file first, then command-line overrides
fn resolve_options(args: &ExportArgs) -> Result<ExportOptions> {
    let mut options = match &args.config {
        Some(path) => ExportOptions::from_path(path)
            .with_context(|| format!("Failed to load export options {:?}", path))?,
        None => ExportOptions::default(),
    };

    if args.text {
        options.format = ContainerFormat::Text;
    }
    if let Some(policy) = args.index_width {
        options.index_width_policy = policy.into();
    }
    if args.world_space {
        options.sampling_space = SamplingSpace::World;
    }
    if args.atomic {
        options.atomic_write = true;
    }
    if args.model_id.is_some() {
        options.model_id.clone_from(&args.model_id);
    }
    if args.include_hidden {
        options.skip_hidden = false;
    }

    debug!("Export options: {:?}", options);
    Ok(options)
}

fn cmd_export(args: ExportArgs, format: OutputFormat) -> Result<()> {
    if !args.scene.exists() {
        bail!("Scene not found: {:?}", args.scene);
    }

    let options = resolve_options(&args)?;
    let output = args
        .output
        .clone()
        .unwrap_or_else(|| args.scene.with_extension(EXTENSION));
    if !is_chsmodel_path(&output) {
        warn!("Output {:?} does not use the .{} extension", output, EXTENSION);
    }

    info!("Loading scene: {:?}", args.scene);
    let scene = InMemoryScene::from_path(&args.scene)
        .with_context(|| format!("Failed to load scene {:?}", args.scene))?;

    let start = Instant::now();
    let summary = ModelExporter::new(options)
        .export_to_path(&scene, &output)
        .with_context(|| format!("Failed to export {:?}", output))?;
    let elapsed = start.elapsed();

    match format {
        OutputFormat::Json => {
            let json = serde_json::json!({
                "output": output,
                "model_id": summary.model_id,
                "format": summary.format,
                "meshes_exported": summary.meshes_exported,
                "meshes_skipped": summary.meshes_skipped,
                "bytes_written": summary.bytes_written,
                "elapsed_ms": elapsed.as_millis() as u64,
            });
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        OutputFormat::Text => {
            println!("Exported {:?}", output);
            println!("  Model id:           {}", summary.model_id);
            println!("  Container:          {}", summary.format);
            println!("  Meshes exported:    {}", summary.meshes_exported);
            println!("  Meshes skipped:     {}", summary.meshes_skipped);
            println!("  Size:               {}", format_size(summary.bytes_written as u64));
            println!("  Time:               {:.2?}", elapsed);
        }
    }

    Ok(())
}

fn cmd_info(args: InfoArgs, format: OutputFormat) -> Result<()> {
    let path = &args.path;

    if !path.exists() {
        bail!("File not found: {:?}", path);
    }
    if !is_chsmodel_path(path) {
        bail!("Not a ChsModel file (expected .{}): {:?}", EXTENSION, path);
    }

    let file = ChsModelFile::from_path(path)
        .with_context(|| format!("Failed to read ChsModel file {:?}", path))?;

    match format {
        OutputFormat::Json => show_info_json(path, &file, args.detailed),
        OutputFormat::Text => {
            show_info_text(path, &file, args.detailed);
            Ok(())
        }
    }
}

fn show_info_json(path: &Path, file: &ChsModelFile, detailed: bool) -> Result<()> {
    let meshes = if detailed {
        serde_json::to_value(&file.summary.meshes)?
    } else {
        file.summary
            .meshes
            .iter()
            .map(|mesh| {
                serde_json::json!({
                    "id": mesh.id,
                    "vertices": mesh.vertex_count(),
                    "indices": mesh.index_count,
                    "index_bits": index_bits(mesh.index_width),
                })
            })
            .collect()
    };

    let json = serde_json::json!({
        "type": "ChsModel",
        "path": path,
        "format": file.format,
        "model_id": file.summary.model_id,
        "mesh_count": file.summary.mesh_count,
        "metadata_size": file.metadata.len(),
        "meshes": meshes,
    });
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}

fn show_info_text(path: &Path, file: &ChsModelFile, detailed: bool) {
    println!("ChsModel: {:?}", path);
    println!("  Model id:           {}", file.summary.model_id);
    println!("  Container:          {}", file.format);
    println!("  Meshes:             {}", file.summary.mesh_count);
    println!("  Metadata size:      {}", format_size(file.metadata.len() as u64));

    println!("\nMeshes:");
    for mesh in &file.summary.meshes {
        println!(
            "  {:<24} {:>8} vertices {:>8} indices  {}-bit",
            mesh.id,
            mesh.vertex_count(),
            mesh.index_count,
            index_bits(mesh.index_width)
        );
        if detailed {
            show_mesh_details(mesh);
        }
    }
}

fn show_mesh_details(mesh: &MeshSummary) {
    println!("      Attributes:     {} (stride {})", mesh.attributes.join(", "), mesh.total_stride);
    match (&mesh.texture, &mesh.diffuse_color) {
        (Some(texture), _) => println!("      Texture:        {}", texture),
        (None, Some(color)) => println!(
            "      Diffuse color:  {} {} {} {}",
            color.r, color.g, color.b, color.a
        ),
        (None, None) => {}
    }
    if mesh.has_vertex_color {
        println!("      Vertex colors:  yes");
    }
    for curve in &mesh.curves {
        println!("      Curve {:<14} {} keys", curve.name, curve.count);
    }
}

fn index_bits(width: IndexWidth) -> usize {
    width.bytes_per_index() * 8
}

fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;

    if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
