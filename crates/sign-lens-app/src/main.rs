#![warn(missing_docs)]
//! # sign-lens binary
//!
//! Terminal front-end for sign-lens. A file on disk stands in for the camera
//! sensor; everything else runs the same session flow a mobile screen would.

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use async_trait::async_trait;
use clap::{Parser, Subcommand};
use sign_lens_app::{
    AppConfig, AppError, BACKEND_URL_ENV, CAPTURE_DELAY_ENV, DEFAULT_BACKEND_URL, SignLensApp,
    app_version, init_tracing,
};
use sign_lens_capture::{
    CameraDevice, DEFAULT_SETTLE_DELAY_MS, FileCamera, PermissionProvider, StaticPermissions,
};
use sign_lens_core::{AnalysisOutcome, PermissionState};
use sign_lens_ui::{project_view, render_text};
use sign_lens_upload::HttpTransport;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, error, info};

const INTERACTIVE_HELP: &str =
    "commands: permission | take | analyze | retake | dismiss | help | quit";

#[derive(Parser, Debug)]
#[command(
    name = "sign-lens",
    version = sign_lens_app::APP_VERSION,
    about = "Capture a traffic sign photo and have the analysis backend describe it"
)]
struct Cli {
    /// Analysis backend base URL.
    #[arg(long, global = true, env = BACKEND_URL_ENV, default_value = DEFAULT_BACKEND_URL)]
    backend_url: String,

    /// Delay before each capture, in milliseconds.
    #[arg(long, global = true, env = CAPTURE_DELAY_ENV, default_value_t = DEFAULT_SETTLE_DELAY_MS)]
    capture_delay_ms: u64,

    /// Treat camera access as already granted.
    #[arg(long, global = true)]
    grant_camera: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Capture IMAGE, analyze it once, and print the result.
    Analyze {
        /// Image file used as the camera source.
        image: PathBuf,
    },
    /// Run the single-screen session, capturing from IMAGE.
    Interactive {
        /// Image file used as the camera source.
        image: PathBuf,
    },
    /// Check that the backend is reachable.
    Health,
}

/// Asks for camera access on the terminal.
struct ConsolePermissions {
    preapproved: bool,
}

#[async_trait]
impl PermissionProvider for ConsolePermissions {
    async fn current(&self) -> PermissionState {
        if self.preapproved {
            PermissionState::Granted
        } else {
            PermissionState::Denied
        }
    }

    async fn request(&self) -> PermissionState {
        if self.preapproved {
            return PermissionState::Granted;
        }

        tokio::task::spawn_blocking(|| {
            print!("Allow sign-lens to use the camera? [y/N] ");
            std::io::stdout().flush()?;
            let mut answer = String::new();
            std::io::stdin().read_line(&mut answer)?;
            Ok::<_, std::io::Error>(answer)
        })
        .await
        .ok()
        .and_then(Result::ok)
        .map(|answer| match answer.trim().to_ascii_lowercase().as_str() {
            "y" | "yes" => PermissionState::Granted,
            _ => PermissionState::Denied,
        })
        .unwrap_or(PermissionState::Denied)
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(error) = init_tracing("info") {
        eprintln!("failed to initialise logging: {error}");
    }

    match run(cli).await {
        Ok(code) => code,
        Err(error) => {
            error!(%error, "sign-lens failed");
            eprintln!("error: {error}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode, AppError> {
    let config = AppConfig {
        backend_url: cli.backend_url,
        capture_delay_ms: cli.capture_delay_ms,
    };

    let permissions: Arc<dyn PermissionProvider> = match &cli.command {
        Command::Interactive { .. } => {
            let initial = if cli.grant_camera {
                PermissionState::Granted
            } else {
                PermissionState::Denied
            };
            Arc::new(StaticPermissions::new(initial, PermissionState::Granted))
        }
        _ => Arc::new(ConsolePermissions {
            preapproved: cli.grant_camera,
        }),
    };

    let app = Arc::new(SignLensApp::from_config(
        &config,
        permissions,
        Arc::new(HttpTransport::new()),
    )?);
    info!(
        version = app_version(),
        backend = %app.endpoint().base(),
        "sign-lens starting"
    );

    match cli.command {
        Command::Analyze { image } => analyze_once(&app, image).await,
        Command::Interactive { image } => interactive(app, image).await,
        Command::Health => health(&app).await,
    }
}

async fn analyze_once(app: &SignLensApp, image: PathBuf) -> Result<ExitCode, AppError> {
    let camera: Arc<dyn CameraDevice> = Arc::new(FileCamera::new(image));
    app.mount_camera(&camera);

    let mut permission = app.check_permission().await;
    if !permission.is_granted() {
        permission = app.request_permission().await;
    }
    if !permission.is_granted() {
        println!("{}", app.render());
        return Ok(ExitCode::FAILURE);
    }

    if let Err(error) = app.take_picture().await {
        debug!(%error, "capture did not produce a photo");
        println!("{}", app.render());
        return Ok(ExitCode::FAILURE);
    }

    let outcome = app.analyze().await?;
    println!("{}", app.render());
    app.unmount_camera();

    Ok(match outcome {
        AnalysisOutcome::Success(_) => ExitCode::SUCCESS,
        _ => ExitCode::FAILURE,
    })
}

async fn interactive(app: Arc<SignLensApp>, image: PathBuf) -> Result<ExitCode, AppError> {
    let camera: Arc<dyn CameraDevice> = Arc::new(FileCamera::new(image));
    app.mount_camera(&camera);
    app.check_permission().await;

    let mut updates = app.subscribe();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    println!("{INTERACTIVE_HELP}");
    println!("{}", app.render());

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };
                match line.trim() {
                    "" => continue,
                    "quit" | "q" => break,
                    "help" => {
                        println!("{INTERACTIVE_HELP}");
                        continue;
                    }
                    "permission" => {
                        app.request_permission().await;
                    }
                    "take" => {
                        if let Err(error) = app.take_picture().await {
                            debug!(%error, "capture did not produce a photo");
                        }
                    }
                    "analyze" => {
                        if let Err(error) = app.spawn_analysis() {
                            println!("{error}");
                        }
                    }
                    "retake" => app.retake(),
                    "dismiss" => app.dismiss_alert(),
                    other => {
                        println!("unknown command '{other}'; {INTERACTIVE_HELP}");
                        continue;
                    }
                }
                updates.borrow_and_update();
                println!("{}", app.render());
            }
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let view = project_view(&updates.borrow_and_update());
                println!("{}", render_text(&view));
            }
        }
    }

    app.unmount_camera();
    Ok(ExitCode::SUCCESS)
}

async fn health(app: &SignLensApp) -> Result<ExitCode, AppError> {
    match app.health_check().await {
        Ok(reply) => {
            println!("backend is up: {}", reply.message);
            Ok(ExitCode::SUCCESS)
        }
        Err(error) => {
            println!("backend health check failed: {error}");
            Ok(ExitCode::FAILURE)
        }
    }
}
