//! folio - progressive PDF page rasterization.
//!
//! This binary is a thin consumer of the render pipeline: it writes each page
//! image to disk as soon as it is produced.

use clap::Parser;
use std::process::ExitCode;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use folio::{
    config::{CheckConfig, Cli, Command, InspectConfig, RenderConfig},
    document::{DocumentLoader, PageSource, PdfiumLoader},
    render::{RenderEvent, RenderPipeline, RenderRequest, RenderState, Viewport},
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.into_command() {
        Command::Render(config) => run_render(config).await,
        Command::Inspect(config) => run_inspect(config).await,
        Command::Check(config) => run_check(config).await,
    }
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose { "folio=debug" } else { "folio=info" };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

// =============================================================================
// Render Command
// =============================================================================

async fn run_render(config: RenderConfig) -> ExitCode {
    init_logging(config.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    if let Err(e) = tokio::fs::create_dir_all(&config.out_dir).await {
        error!(
            "Failed to create output directory {}: {}",
            config.out_dir.display(),
            e
        );
        return ExitCode::FAILURE;
    }

    let loader = match PdfiumLoader::new(config.engine.loader_config()) {
        Ok(loader) => loader,
        Err(e) => {
            error!("Failed to create loader: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let pipeline = RenderPipeline::new(loader, config.pipeline_config());
    let request = RenderRequest::new(config.locator.clone());
    let mut state = RenderState::loading(&request, 1);
    let mut run = pipeline.start(request);

    while let Some(event) = run.next_event().await {
        match &event {
            RenderEvent::Loaded { total_pages } => {
                info!("Rendering {} page(s) to {}", total_pages, config.out_dir.display());
            }
            RenderEvent::PageRendered(image) => {
                let path = config.page_path(image.page_number());
                if let Err(e) = tokio::fs::write(&path, image.image_data()).await {
                    error!("Failed to write {}: {}", path.display(), e);
                    return ExitCode::FAILURE;
                }
                println!(
                    "{} ({}x{})",
                    path.display(),
                    image.width(),
                    image.height()
                );
            }
            RenderEvent::Progress {
                page_number,
                percent,
            } => {
                info!("[{:>3}%] page {}/{}", percent, page_number, state.total_pages);
            }
            RenderEvent::Done | RenderEvent::Failed(_) => {}
        }
        state.apply(event);
    }

    if let Some(e) = &state.error {
        error!("Failed to render {}: {}", config.locator, e);
        return ExitCode::FAILURE;
    }

    if state.loading {
        error!("Render of {} ended unexpectedly", config.locator);
        return ExitCode::FAILURE;
    }

    let missing = state.missing_pages();
    if !missing.is_empty() {
        warn!("{} page(s) could not be rendered: {:?}", missing.len(), missing);
    }
    info!(
        "Done: {}/{} page(s) written",
        state.images.len(),
        state.total_pages
    );

    ExitCode::SUCCESS
}

// =============================================================================
// Inspect Command
// =============================================================================

async fn run_inspect(config: InspectConfig) -> ExitCode {
    init_logging(config.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    let loader = match PdfiumLoader::new(config.engine.loader_config()) {
        Ok(loader) => loader,
        Err(e) => {
            error!("Failed to create loader: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let document = match loader.open(&config.locator).await {
        Ok(document) => document,
        Err(e) => {
            error!("Failed to open {}: {}", config.locator, e);
            return ExitCode::FAILURE;
        }
    };

    let density = config.raster.density;
    let mut pages = Vec::with_capacity(document.page_count() as usize);
    for page_number in 1..=document.page_count() {
        let page = match document.page_size(page_number).await {
            Ok(size) => match Viewport::for_page(size, density) {
                Ok(viewport) => serde_json::json!({
                    "page": page_number,
                    "width_pt": size.width,
                    "height_pt": size.height,
                    "scale": viewport.scale,
                    "width_px": viewport.width,
                    "height_px": viewport.height,
                }),
                Err(e) => serde_json::json!({ "page": page_number, "error": e.to_string() }),
            },
            Err(e) => serde_json::json!({ "page": page_number, "error": e.to_string() }),
        };
        pages.push(page);
    }

    let sniff = document.sniff();

    if config.json {
        let json = serde_json::json!({
            "locator": config.locator,
            "header": sniff,
            "page_count": document.page_count(),
            "display_density": density,
            "pages": pages,
        });
        match serde_json::to_string_pretty(&json) {
            Ok(text) => println!("{}", text),
            Err(e) => {
                error!("Failed to serialize output: {}", e);
                return ExitCode::FAILURE;
            }
        }
        return ExitCode::SUCCESS;
    }

    println!("Document: {}", config.locator);
    println!("  PDF version: {}", sniff.version);
    println!("  Size: {:.2} MB", sniff.size as f64 / (1024.0 * 1024.0));
    println!("  Linearized: {}", if sniff.linearized { "yes" } else { "no" });
    println!("  Pages: {}", document.page_count());
    println!();
    println!("  Page   Size (pt)          Raster (px) at density {}", density);
    for page in &pages {
        if let Some(error) = page.get("error") {
            println!(
                "  {:>4}   error: {}",
                page["page"].as_u64().unwrap_or_default(),
                error.as_str().unwrap_or_default()
            );
        } else {
            println!(
                "  {:>4}   {:>7.1} x {:<7.1}   {} x {}",
                page["page"].as_u64().unwrap_or_default(),
                page["width_pt"].as_f64().unwrap_or_default(),
                page["height_pt"].as_f64().unwrap_or_default(),
                page["width_px"],
                page["height_px"]
            );
        }
    }

    ExitCode::SUCCESS
}

// =============================================================================
// Check Command
// =============================================================================

async fn run_check(config: CheckConfig) -> ExitCode {
    if config.verbose {
        init_logging(true);
    }

    println!("folio Configuration Check");
    println!("═════════════════════════");
    println!();

    if let Err(e) = config.engine.validate() {
        println!("✗ Configuration: {}", e);
        return ExitCode::FAILURE;
    }

    let loader_config = config.engine.loader_config();
    let loader = match PdfiumLoader::new(loader_config.clone()) {
        Ok(loader) => loader,
        Err(e) => {
            println!("✗ HTTP client: {}", e);
            return ExitCode::FAILURE;
        }
    };

    print!("Loading pdfium... ");
    match loader.engine().await {
        Ok(engine) => {
            println!("✓ {}", engine.library());
        }
        Err(e) => {
            println!("✗ failed");
            println!();
            println!("Error: {}", e);
            println!();
            println!("Searched:");
            for path in loader_config.library.search_paths() {
                println!("  {}", path.display());
            }
            println!("  (system library path)");
            return ExitCode::FAILURE;
        }
    }

    if let Some(ref locator) = config.locator {
        println!();
        print!("Testing '{}'... ", locator);

        match loader.probe(locator).await {
            Ok((_, sniff)) => {
                println!("✓ PDF {}", sniff.version);
                println!("  Size: {:.2} MB", sniff.size as f64 / (1024.0 * 1024.0));
                if sniff.linearized {
                    println!("  Linearized: yes");
                }
                if sniff.encrypted_hint {
                    println!("  Encryption dictionary present");
                }
            }
            Err(e) => {
                println!("✗ failed");
                println!();
                println!("Error: {}", e);
                return ExitCode::FAILURE;
            }
        }
    }

    println!();
    println!("═════════════════════════");
    println!("✓ All checks passed!");

    ExitCode::SUCCESS
}
