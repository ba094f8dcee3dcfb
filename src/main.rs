#![warn(clippy::unwrap_used)]

use std::path::{Path, PathBuf};

use annexr::{
    assemble::{output_file_name, Assembler},
    configuration::BundleConfiguration,
    error::ContextError,
    fonts,
    model::{ExportRequest, FormattingOptions, ProjectModel},
    render::StandardRenderer,
};
use clap::Parser;
use time::OffsetDateTime;

#[derive(Parser)]
#[command(version, long_about = None)]
struct CliArguments {
    #[arg(long = "project", help = "Path to the project file in the JSON format")]
    project_path: PathBuf,
    #[arg(
        long = "documents",
        help = "Directory the document paths of the project are relative to, \
                by default the directory of the project file"
    )]
    documents_directory: Option<PathBuf>,
    #[arg(long = "configuration", help = "Path to the bundle configuration file")]
    configuration_path: Option<PathBuf>,
    #[arg(
        long = "output",
        help = "Directory the bundle is written to, overriding the configuration"
    )]
    output_directory: Option<PathBuf>,
    #[arg(long = "verbose", help = "Log everything the export does")]
    verbose: bool,
}

fn main() {
    if let Err(error) = fallible_main() {
        log::error!("{}", error);
        std::process::exit(1);
    }
}

fn fallible_main() -> Result<(), ContextError> {
    let CliArguments {
        project_path,
        documents_directory,
        configuration_path,
        output_directory,
        verbose,
    } = CliArguments::parse();

    let default_filter = if verbose { "trace" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    let project_directory = project_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();
    let documents_directory = documents_directory.unwrap_or_else(|| project_directory.clone());

    let configuration = BundleConfiguration::load(configuration_path.as_deref())?;
    let font_provider = configuration.font_provider(&project_directory);
    fonts::preload(font_provider.as_ref());

    let project = ProjectModel::from_path(&project_path)?;
    log::info!(
        "Loaded the project {:?} with {} annexes",
        project_path,
        project.annexes.len()
    );
    let mut request = project.export_request();
    read_file_contents(&mut request, &documents_directory);

    let bundle = Assembler::new(StandardRenderer, font_provider)
        .with_compression(configuration.compress_output)
        .assemble(&request)
        .map_err(|error| ContextError::with_error("Failed to export the bundle", &error))?;
    for issue in &bundle.issues {
        log::warn!(
            "Annex {}{}: {}",
            issue.annex_number,
            issue
                .file_name
                .as_ref()
                .map(|file_name| format!(" ({file_name})"))
                .unwrap_or_default(),
            issue.message
        );
    }

    let output_directory = output_directory.unwrap_or(configuration.output_directory);
    std::fs::create_dir_all(&output_directory).map_err(|error| {
        ContextError::with_error(
            format!("Failed to create the output directory {:?}", output_directory),
            &error,
        )
    })?;
    let output_path = output_directory.join(output_file_name(OffsetDateTime::now_utc()));
    std::fs::write(&output_path, &bundle.bytes).map_err(|error| {
        ContextError::with_error(format!("Failed to write the bundle {:?}", output_path), &error)
    })?;
    log::info!(
        "Wrote the bundle of {} pages to {:?}",
        bundle.page_count,
        output_path
    );

    Ok(())
}

/// Reads the documents and the logos of the request. A file which cannot be read is left without
/// content, so that the export replaces it with an error page.
fn read_file_contents(request: &mut ExportRequest, documents_directory: &Path) {
    for annex in request.annexes.iter_mut() {
        for document in annex.documents.iter_mut() {
            let document_path = documents_directory.join(&document.source_file_path);
            document.file_bytes = match std::fs::read(&document_path) {
                Ok(file_bytes) => Some(file_bytes),
                Err(error) => {
                    log::warn!("Unable to read the document {:?}: {}", document_path, error);
                    None
                }
            };
        }
    }

    read_logo(&mut request.opis_formatting, documents_directory);
    read_logo(&mut request.cover_formatting, documents_directory);
}

fn read_logo(formatting: &mut FormattingOptions, documents_directory: &Path) {
    let Some(logo_path) = formatting.logo_path.as_ref() else {
        return;
    };
    let logo_path = documents_directory.join(logo_path);
    match std::fs::read(&logo_path) {
        Ok(logo_bytes) => formatting.logo_file = Some(logo_bytes),
        Err(error) => log::warn!("Unable to read the logo {:?}: {}", logo_path, error),
    }
}
