use anyhow::{Context, Result, bail};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::{env, fs, process};
use text_polisher_client::OllamaClient;
use text_polisher_config::Config;
use text_polisher_engine::{
    ApplyOutcome, Decision, NodeId, Page, PolishError, Rect, RewriteService, SelectionContext,
    Session, Size, Surface, ToolControls,
};

const VIEWPORT: Size = Size {
    width: 1280.0,
    height: 800.0,
};

#[derive(Debug)]
struct Args {
    file: PathBuf,
    /// Char offsets; `None` targets the whole file
    selection: Option<(usize, usize)>,
}

fn parse_args(args: &[String]) -> Result<Args> {
    let program = args
        .first()
        .map(String::as_str)
        .unwrap_or("text-polisher-cli");
    let usage = format!("Usage: {program} <file> [<start> <end>]");

    match args {
        [_, file] => Ok(Args {
            file: PathBuf::from(file),
            selection: None,
        }),
        [_, file, start, end] => {
            let start: usize = start
                .parse()
                .with_context(|| format!("Invalid start offset '{start}'\n{usage}"))?;
            let end: usize = end
                .parse()
                .with_context(|| format!("Invalid end offset '{end}'\n{usage}"))?;
            if start > end {
                bail!("Start offset {start} is after end offset {end}\n{usage}");
            }
            Ok(Args {
                file: PathBuf::from(file),
                selection: Some((start, end)),
            })
        }
        _ => bail!("{usage}"),
    }
}

/// A page holding the polisher's trigger and one text area with the file in it
struct Workspace {
    page: Page,
    controls: ToolControls,
    area: NodeId,
}

impl Workspace {
    fn new(content: &str) -> Self {
        let mut page = Page::new(VIEWPORT);
        let trigger = page.append_element(page.body(), "button");
        page.set_rect(trigger, Rect::new(1210.0, 730.0, 50.0, 50.0));
        let area = page.append_textarea(page.body(), content);
        page.set_rect(area, Rect::new(40.0, 40.0, 1120.0, 720.0));
        page.focus(area, true);
        Self {
            page,
            controls: ToolControls::new(trigger),
            area,
        }
    }
}

/// `polished` ending with the whitespace `original` ended with, such as a final newline
fn keep_trailing_whitespace(original: &str, polished: &str) -> String {
    let trailing = &original[original.trim_end().len()..];
    format!("{}{trailing}", polished.trim_end())
}

fn ask(prompt: &str) -> Result<String> {
    print!("{prompt}");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim().to_lowercase())
}

fn run() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    let args = parse_args(&args)?;

    let config = Config::load_or_default()?;
    log::info!("Using model {} at {}", config.model, config.api_url);

    let content = fs::read_to_string(&args.file)
        .with_context(|| format!("Failed to read {}", args.file.display()))?;
    let mut workspace = Workspace::new(&content);
    let client = OllamaClient::from_config(&config);
    let mut session = Session::new(config.session_options());

    let request = match args.selection {
        Some((start, end)) => {
            workspace
                .page
                .set_selection_offsets(workspace.area, start, end)?;
            session.begin(&mut workspace.page, &workspace.controls)?
        }
        None => {
            let context = SelectionContext::whole_field(workspace.area, content.as_str());
            session.begin_with(&mut workspace.page, &workspace.controls, Some(context))?
        }
    };

    println!("Polishing with {}...", config.model);
    let outcome = client.rewrite(&request);
    let overlay = session.complete(&workspace.page, outcome)?;
    println!("\n{}\n", overlay.text);

    let apply_enabled = overlay.apply_enabled;
    let choice = if apply_enabled {
        ask("[a]pply / [c]opy / [d]ismiss: ")?
    } else {
        ask("[c]opy / [d]ismiss: ")?
    };

    match choice.as_str() {
        "a" | "apply" if apply_enabled => {
            let mut outcome = session.apply(&mut workspace.page)?;
            if let ApplyOutcome::AwaitingConfirmation { prompt } = &outcome {
                let answer = ask(&format!("{prompt}\n\n[y/N]: "))?;
                let decision = if answer == "y" || answer == "yes" {
                    Decision::Confirm
                } else {
                    Decision::Cancel
                };
                outcome = session.resolve(&mut workspace.page, decision)?;
            }
            match outcome {
                ApplyOutcome::Applied => {
                    let mut value = workspace
                        .page
                        .value(workspace.area)
                        .context("Text area disappeared")?;
                    if args.selection.is_none() {
                        value = keep_trailing_whitespace(&content, &value);
                    }
                    fs::write(&args.file, value)
                        .with_context(|| format!("Failed to write {}", args.file.display()))?;
                    println!("Updated {}", args.file.display());
                }
                ApplyOutcome::Cancelled => println!("Left {} unchanged", args.file.display()),
                ApplyOutcome::Fallback(dialog) => println!("{}\n{}", dialog.label, dialog.text),
                ApplyOutcome::AwaitingConfirmation { .. } => {}
            }
        }
        "c" | "copy" => {
            session.copy(&mut workspace.page)?;
            if let Some(copied) = workspace.page.clipboard() {
                println!("{copied}");
            }
        }
        _ => {
            session.dismiss(&mut workspace.page);
            log::debug!("Dismissed without applying");
        }
    }

    Ok(())
}

fn main() {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    if let Err(e) = run() {
        match e.downcast_ref::<PolishError>() {
            Some(error) => eprintln!("{error}"),
            None => eprintln!("Error: {e:#}"),
        }
        process::exit(1);
    }
}
