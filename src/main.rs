//! markcv - a markdown CV editor with a printable export.
//!
//! # Usage
//!
//! ```bash
//! markcv serve --port 9876
//! markcv preview cv.md > preview.html
//! markcv upload photo.png --alt "Jane Doe" --line 1
//! markcv annotate /data/images/2f1c.png --align right --width 150
//! markcv export --template europass --paper-size letter -o cv.html
//! ```

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tokio::runtime::Handle;

use markcv::annotation::Align;
use markcv::api::{DEFAULT_EXPORT_TEMPLATE, PaperSize};
use markcv::app::{App, BoundingBox, ClickTarget, ImageRef, Message, OffsetAxis, ToastLevel};
use markcv::client::{ApiClient, UploadRequest};
use markcv::config::{
    ConfigFlags, ThemeMode, clear_config_flags, global_config_path, load_config_flags,
    local_override_path, parse_flag_tokens, save_config_flags,
};
use markcv::render::render;
use markcv::server::{self, ServerConfig};

const DEFAULT_SERVER: &str = "http://127.0.0.1:9876";

/// A markdown CV editor with live preview and printable export
#[derive(Parser, Debug)]
#[command(name = "markcv", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Backend used by the client commands
    #[arg(long, global = true, value_name = "URL")]
    server: Option<String>,

    /// Page theme for `preview`
    #[arg(long, global = true, value_enum)]
    theme: Option<ThemeMode>,

    /// Save current command-line flags as defaults
    #[arg(long, global = true)]
    save: bool,

    /// Clear saved defaults
    #[arg(long, global = true)]
    clear: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the backend server
    Serve {
        #[arg(long)]
        host: Option<String>,
        #[arg(long)]
        port: Option<u16>,
        /// Directory holding the CV, its images and exports
        #[arg(long, value_name = "DIR")]
        data_dir: Option<PathBuf>,
        #[arg(long, value_name = "DIR")]
        templates_dir: Option<PathBuf>,
        /// Frontend assets served at `/` and `/static`
        #[arg(long, value_name = "DIR")]
        static_dir: Option<PathBuf>,
    },
    /// Render a markdown file to an HTML preview page
    Preview {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// Print the CV source stored on the server
    Pull {
        #[arg(short, long, value_name = "FILE")]
        out: Option<PathBuf>,
    },
    /// Replace the CV source on the server
    Push {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// Upload an image and insert it into the CV
    Upload {
        #[arg(value_name = "IMAGE")]
        file: PathBuf,
        /// Alt text of the inserted image
        #[arg(long, default_value = "")]
        alt: String,
        /// Line to insert the image before (default: a new line at the end of the CV)
        #[arg(long)]
        line: Option<usize>,
    },
    /// Change width, alignment or position of an image in the CV
    Annotate {
        /// Image url as written in the CV
        url: String,
        #[arg(long, value_parser = parse_align)]
        align: Option<Align>,
        /// Width such as `150`, `150px` or `40%`
        #[arg(long)]
        width: Option<String>,
        /// Horizontal offset of the profile image
        #[arg(long, allow_hyphen_values = true)]
        x_offset: Option<i32>,
        /// Vertical offset of the profile image
        #[arg(long, allow_hyphen_values = true)]
        y_offset: Option<i32>,
    },
    /// List installed CV templates
    Templates,
    /// Download the printable export
    Export {
        #[arg(long, default_value = DEFAULT_EXPORT_TEMPLATE)]
        template: String,
        #[arg(long, default_value = "a4")]
        paper_size: PaperSize,
        #[arg(short, long, value_name = "FILE")]
        out: Option<PathBuf>,
    },
}

fn parse_align(s: &str) -> Result<Align, String> {
    s.parse()
        .map_err(|()| format!("expected left, center or right, got `{s}`"))
}

#[tokio::main]
async fn main() -> Result<()> {
    let raw_args = std::env::args().collect::<Vec<_>>();
    let cli = Cli::parse();

    // Initialize logging
    let level = if matches!(cli.command, Command::Serve { .. }) {
        tracing::Level::INFO
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .with_writer(std::io::stderr)
        .init();

    let global_path = global_config_path();
    let local_path = local_override_path();
    let cli_flags = parse_flag_tokens(&raw_args);

    if cli.clear {
        clear_config_flags(&global_path)?;
    }
    if cli.save {
        save_config_flags(&global_path, &cli_flags)?;
    }

    let file_flags = if cli.clear {
        ConfigFlags::default()
    } else {
        let global_flags = load_config_flags(&global_path)?;
        let local_flags = load_config_flags(&local_path)?;
        global_flags.union(&local_flags)
    };
    let mut effective = file_flags.union(&cli_flags);
    effective.server = cli.server.or(effective.server);
    effective.theme = cli.theme.or(effective.theme);
    let client = || ApiClient::new(effective.server.as_deref().unwrap_or(DEFAULT_SERVER));

    match cli.command {
        Command::Serve {
            host,
            port,
            data_dir,
            templates_dir,
            static_dir,
        } => {
            let flags = effective.union(&ConfigFlags {
                host,
                port,
                data_dir,
                templates_dir,
                static_dir,
                ..ConfigFlags::default()
            });
            server::run(server_config(&flags)).await
        }
        Command::Preview { file } => preview(&file, effective.theme.unwrap_or(ThemeMode::Light)),
        Command::Pull { out } => {
            let content = client()
                .load_markdown()
                .await
                .context("Failed to load CV")?;
            write_output(out.as_deref(), &content)
        }
        Command::Push { file } => push(client(), &file).await,
        Command::Upload { file, alt, line } => upload(client(), &file, alt, line).await,
        Command::Annotate {
            url,
            align,
            width,
            x_offset,
            y_offset,
        } => {
            let mut changes = Vec::new();
            if let Some(align) = align {
                changes.push(Message::AlignImage(align));
            }
            if let Some(width) = width {
                changes.push(Message::SetImageWidth(width));
            }
            for (axis, value) in [(OffsetAxis::X, x_offset), (OffsetAxis::Y, y_offset)] {
                if let Some(value) = value {
                    changes.push(Message::SetImageOffset {
                        axis,
                        value: value.to_string(),
                    });
                }
            }
            annotate(client(), &url, changes).await
        }
        Command::Templates => templates(client()).await,
        Command::Export {
            template,
            paper_size,
            out,
        } => {
            let html = client()
                .export(&template, paper_size)
                .await
                .context("Failed to export CV")?;
            write_output(out.as_deref(), &html)
        }
    }
}

fn server_config(flags: &ConfigFlags) -> ServerConfig {
    let defaults = ServerConfig::default();
    ServerConfig {
        host: flags.host.clone().unwrap_or(defaults.host),
        port: flags.port.unwrap_or(defaults.port),
        data_dir: flags.data_dir.clone().unwrap_or(defaults.data_dir),
        templates_dir: flags.templates_dir.clone().unwrap_or(defaults.templates_dir),
        static_dir: flags.static_dir.clone().unwrap_or(defaults.static_dir),
    }
}

fn preview(file: &Path, theme: ThemeMode) -> Result<()> {
    let source = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let preview = render(&source, 1);
    let page = format!(
        "<!DOCTYPE html>\n<html data-theme=\"{}\">\n<head><meta charset=\"utf-8\"></head>\n<body>\n{}</body>\n</html>\n",
        theme.as_str(),
        preview.html
    );
    write_output(None, &page)
}

fn write_output(out: Option<&Path>, content: &str) -> Result<()> {
    match out {
        Some(path) => std::fs::write(path, content)
            .with_context(|| format!("Failed to write {}", path.display())),
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(content.as_bytes())?;
            stdout.flush()?;
            Ok(())
        }
    }
}

/// Fail with the error toast left by the last request, if any.
fn check_toast(app: &App) -> Result<()> {
    match app.model().active_toast() {
        Some((message, ToastLevel::Error | ToastLevel::Warning)) => bail!("{message}"),
        _ => Ok(()),
    }
}

/// Load the CV into a fresh editor.
async fn load(client: ApiClient) -> Result<App> {
    let mut app = App::new(client, Handle::current());
    app.dispatch(Message::LoadRequested);
    app.settle().await;
    if let Some(err) = &app.model().load_error {
        bail!("Failed to load CV: {err}");
    }
    Ok(app)
}

async fn save(app: &mut App) -> Result<()> {
    app.dispatch(Message::SaveRequested);
    app.settle().await;
    check_toast(app)
}

async fn push(client: ApiClient, file: &Path) -> Result<()> {
    let source = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let mut app = App::new(client, Handle::current());
    app.dispatch(Message::EditorChanged(source));
    save(&mut app).await
}

async fn upload(client: ApiClient, file: &Path, alt: String, line: Option<usize>) -> Result<()> {
    let bytes = std::fs::read(file).with_context(|| format!("Failed to read {}", file.display()))?;
    let mime_type = image::ImageFormat::from_path(file)
        .or_else(|_| image::guess_format(&bytes))
        .map_or("application/octet-stream", |format| format.to_mime_type());
    let request = UploadRequest {
        file_name: file
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default(),
        mime_type: mime_type.to_string(),
        bytes,
        alt_text: alt.clone(),
    };

    let mut app = load(client).await?;
    app.dispatch(match line {
        Some(line) => Message::EditorMoveTo(line, 0),
        None => Message::EditorOpenLineAtEnd,
    });
    app.dispatch(Message::OpenUploadDialog);
    app.dispatch(Message::SetUploadAltText(alt));
    app.dispatch(Message::UploadRequested(Some(request)));
    app.settle().await;
    check_toast(&app)?;
    save(&mut app).await
}

async fn annotate(client: ApiClient, url: &str, changes: Vec<Message>) -> Result<()> {
    if changes.is_empty() {
        bail!("Nothing to change: pass --align, --width, --x-offset or --y-offset");
    }
    let mut app = load(client).await?;
    let preview = &app.model().preview;
    let Some(index) = preview.find_by_src(url) else {
        bail!("No image with url {url} in the CV");
    };
    let image = ImageRef {
        generation: preview.generation,
        index,
    };
    app.dispatch(Message::PreviewClick(ClickTarget::Image {
        image,
        rect: BoundingBox::default(),
        scroll: (0.0, 0.0),
    }));
    for change in changes {
        app.dispatch(change);
    }
    if !app.model().buffer.is_dirty() {
        tracing::warn!(url, "no changes applied");
        return Ok(());
    }
    save(&mut app).await
}

async fn templates(client: ApiClient) -> Result<()> {
    let mut app = App::new(client, Handle::current());
    app.dispatch(Message::TemplatesRequested);
    app.settle().await;
    let mut out = String::new();
    for template in &app.model().templates {
        out.push_str(&format!("{}\t{}\t{}\n", template.id, template.name, template.description));
    }
    if out.is_empty() {
        bail!("No templates available");
    }
    write_output(None, &out)
}
