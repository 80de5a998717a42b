use crate::{
    config,
    controller::Controller,
    gallery::{Gallery, GalleryOptions, slug},
    image_io,
    store::SqliteUploadStore,
};
use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use pixel_filter::{EffectApplicator, FilterCatalog};
use std::{ops::ControlFlow, path::PathBuf, str::FromStr, sync::Arc};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

#[derive(Parser, Debug)]
#[command(
    name = "filterview",
    version,
    about = "Preview an image through every built-in pixel filter"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the filter names in gallery order
    Filters,

    /// Load an image, remember it and build its gallery
    Open {
        path: PathBuf,

        /// Write the gallery thumbnails into this directory
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Build the gallery of the remembered image
    Restore {
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Apply one filter and write the result as PNG
    Apply {
        path: PathBuf,
        filter: String,

        /// Defaults to `<stem>-<filter>.png` next to the input
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Forget the remembered image
    Clear,

    /// Run commands read line by line from stdin
    Session {
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

pub async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Filters => {
            let catalog = FilterCatalog::builtin()?;
            print_filters(&catalog);
        }
        Command::Open { path, out } => {
            let mut controller = controller(out).await?;
            controller.upload(&path).await?;
            print_gallery(controller.gallery());
        }
        Command::Restore { out } => {
            let mut controller = controller(out).await?;
            if controller.restore().await? {
                print_gallery(controller.gallery());
            } else {
                println!("No remembered image");
            }
        }
        Command::Apply {
            path,
            filter,
            output,
        } => {
            let conf = config::all();
            let applicator =
                EffectApplicator::new(Arc::new(FilterCatalog::builtin()?), conf.gallery.workers);

            let image = image_io::read_image(&path).await?;
            let image = applicator.query(image, &filter).await?;

            let output = output.unwrap_or_else(|| {
                let stem = path
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "image".to_string());
                path.with_file_name(format!("{stem}-{}.png", slug(&filter)))
            });
            image_io::write_png(&output, image).await?;
            println!("{}", output.display());
        }
        Command::Clear => {
            controller(None).await?.clear().await?;
            println!("Cleared");
        }
        Command::Session { out } => {
            let mut controller = controller(out).await?;
            let stdin = tokio::io::BufReader::new(tokio::io::stdin());
            session(&mut controller, stdin).await?;
        }
    }

    Ok(())
}

async fn controller(out: Option<PathBuf>) -> Result<Controller> {
    let conf = config::all();

    let catalog = Arc::new(FilterCatalog::builtin()?);
    let applicator = EffectApplicator::new(catalog, conf.gallery.workers);
    let store = SqliteUploadStore::open(&conf.db_path).await?;

    let mut options = GalleryOptions::default()
        .with_dispatch(conf.gallery.dispatch)
        .with_thumbnail_size(conf.gallery.thumbnail_size);
    options.out_dir = out;

    Ok(Controller::new(applicator, store)
        .with_options(options)
        .with_severity(conf.preference.severity))
}

/// One line of an interactive session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    Open(PathBuf),
    Select(String),
    Download(PathBuf),
    Filters,
    Gallery,
    Clear,
    Quit,
}

impl FromStr for SessionCommand {
    type Err = anyhow::Error;

    fn from_str(line: &str) -> Result<Self> {
        let line = line.trim();
        let (verb, rest) = match line.split_once(char::is_whitespace) {
            Some((verb, rest)) => (verb, rest.trim()),
            None => (line, ""),
        };

        let command = match verb {
            "open" if !rest.is_empty() => Self::Open(PathBuf::from(rest)),
            "select" if !rest.is_empty() => Self::Select(rest.to_string()),
            "download" if rest.is_empty() => Self::Download(PathBuf::from(".")),
            "download" => Self::Download(PathBuf::from(rest)),
            "filters" => Self::Filters,
            "gallery" => Self::Gallery,
            "clear" => Self::Clear,
            "quit" | "exit" => Self::Quit,
            "open" | "select" => bail!("`{verb}` needs an argument"),
            _ => bail!("unknown command `{line}`"),
        };

        Ok(command)
    }
}

/// Restores the remembered image, then runs one command per input line
/// until `quit` or end of input. Command errors go through
/// [`Controller::handle_error`].
///
/// Input is read one line ahead while a command runs. A queued command that
/// replaces the current image cancels the gallery build still in progress.
pub async fn session<R>(controller: &mut Controller, input: R) -> Result<()>
where
    R: AsyncBufRead + Unpin,
{
    if let Err(e) = controller.restore().await {
        controller.handle_error(e).await?;
    }

    let canceller = controller.canceller();
    let mut lines = input.lines();
    let mut queued: Option<Option<String>> = None;

    loop {
        let line = match queued.take() {
            Some(line) => line,
            None => lines.next_line().await.context("read session input failed")?,
        };
        let Some(line) = line else { break };
        if line.trim().is_empty() {
            continue;
        }

        let command = match line.parse::<SessionCommand>() {
            Ok(command) => command,
            Err(e) => {
                controller.handle_error(e).await?;
                continue;
            }
        };

        let flow = {
            let run = execute(controller, command);
            tokio::pin!(run);

            tokio::select! {
                biased;
                flow = &mut run => flow,
                next = lines.next_line() => {
                    let next = next.context("read session input failed")?;
                    if next.as_deref().is_some_and(supersedes) {
                        canceller.cancel();
                    }
                    queued = Some(next);
                    run.await
                }
            }
        };

        match flow {
            Ok(ControlFlow::Break(())) => break,
            Ok(ControlFlow::Continue(())) => {}
            Err(e) => controller.handle_error(e).await?,
        }
    }

    log::debug!("session finished");
    Ok(())
}

/// Whether `line` makes the gallery being built obsolete.
fn supersedes(line: &str) -> bool {
    matches!(
        line.parse::<SessionCommand>(),
        Ok(SessionCommand::Open(_)
            | SessionCommand::Select(_)
            | SessionCommand::Clear
            | SessionCommand::Quit)
    )
}

async fn execute(controller: &mut Controller, command: SessionCommand) -> Result<ControlFlow<()>> {
    match command {
        SessionCommand::Open(path) => {
            controller.upload(&path).await?;
            print_gallery(controller.gallery());
        }
        SessionCommand::Select(name) => {
            controller.select(&name).await?;
            print_gallery(controller.gallery());
        }
        SessionCommand::Download(dir) => {
            let path = controller.download(&dir).await?;
            println!("{}", path.display());
        }
        SessionCommand::Filters => print_filters(controller.catalog()),
        SessionCommand::Gallery => print_gallery(controller.gallery()),
        SessionCommand::Clear => controller.clear().await?,
        SessionCommand::Quit => return Ok(ControlFlow::Break(())),
    }

    Ok(ControlFlow::Continue(()))
}

fn print_filters(catalog: &FilterCatalog) {
    for (index, name) in catalog.definitions().into_iter().enumerate() {
        println!("{index:02} {name}");
    }
}

fn print_gallery(gallery: &Gallery) {
    for (index, entry) in gallery.entries().iter().enumerate() {
        println!(
            "{index:02} {} {}x{} ({} bytes thumbnail)",
            entry.name,
            entry.image.width,
            entry.image.height,
            entry.thumbnail.len()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_session_commands() {
        let parse = |line: &str| line.parse::<SessionCommand>().unwrap();

        assert_eq!(parse("open a b.png"), SessionCommand::Open("a b.png".into()));
        assert_eq!(
            parse("  select   Red emphasis "),
            SessionCommand::Select("Red emphasis".to_string())
        );
        assert_eq!(parse("download"), SessionCommand::Download(".".into()));
        assert_eq!(parse("download /tmp"), SessionCommand::Download("/tmp".into()));
        assert_eq!(parse("filters"), SessionCommand::Filters);
        assert_eq!(parse("gallery"), SessionCommand::Gallery);
        assert_eq!(parse("clear"), SessionCommand::Clear);
        assert_eq!(parse("exit"), SessionCommand::Quit);
    }

    #[test]
    fn test_parse_session_errors() {
        assert!("open".parse::<SessionCommand>().is_err());
        assert!("select  ".parse::<SessionCommand>().is_err());
        assert!("blur 3".parse::<SessionCommand>().is_err());
    }

    #[test]
    fn test_supersedes() {
        assert!(supersedes("open b.png"));
        assert!(supersedes("select Sepia"));
        assert!(supersedes("clear"));
        assert!(supersedes("quit"));
        assert!(!supersedes("download"));
        assert!(!supersedes("gallery"));
        assert!(!supersedes("open"));
    }

    #[test]
    fn test_cli_parse() {
        let cli = Cli::try_parse_from([
            "filterview",
            "apply",
            "cat.jpg",
            "Red emphasis",
            "--output",
            "out.png",
        ])
        .unwrap();

        match cli.command {
            Command::Apply {
                path,
                filter,
                output,
            } => {
                assert_eq!(path, PathBuf::from("cat.jpg"));
                assert_eq!(filter, "Red emphasis");
                assert_eq!(output, Some(PathBuf::from("out.png")));
            }
            command => panic!("unexpected {command:?}"),
        }

        assert!(Cli::try_parse_from(["filterview", "open"]).is_err());
    }
}
