//! cert-forge – command-line certificate generator.
//!
//! Usage:
//!   cert-forge generate --name "Jane Doe" --event "AI Day" [--date 2025-01-15]
//!                       [--roster participants.csv] [--template background.png]
//!                       [--layout layout.json] [--fonts dir] [--out dir]
//!                       [--print] [--png]
//!   cert-forge suggest <query> --roster participants.csv
//!   cert-forge layout
//!
//! `generate` writes `Certificate_<name>_<millis>.pdf` into the output
//! directory (default: current directory).

use std::{env, fs, path::PathBuf, process};

use cert_forge::certificate::CertificateForm;
use cert_forge::error::CertError;
use cert_forge::export::encode_png;
use cert_forge::layout_config::LayoutConfig;
use cert_forge::session::{Session, SessionConfig};

#[derive(Default)]
struct Args {
    command: String,
    positional: Vec<String>,
    name: Option<String>,
    event: Option<String>,
    date: Option<String>,
    roster: Option<PathBuf>,
    template: Option<PathBuf>,
    layout: Option<PathBuf>,
    fonts: Option<PathBuf>,
    out: Option<PathBuf>,
    print: bool,
    png: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    env_logger::init();

    let argv: Vec<String> = env::args().collect();
    let args = parse_args(&argv);

    let result = match args.command.as_str() {
        "generate" => generate(&args).await,
        "suggest" => suggest(&args).await,
        "layout" => LayoutConfig::default().to_json().map(|json| println!("{json}")),
        _ => {
            print_usage(&argv[0]);
            process::exit(1);
        }
    };

    if let Err(e) = result {
        match e {
            CertError::Form(fields) => {
                for f in fields {
                    eprintln!("{}: {}", f.field.label(), f.message);
                }
            }
            CertError::Export(msg) => {
                eprintln!("Failed to generate PDF. Please try again. ({msg})");
            }
            other => eprintln!("Error: {other}"),
        }
        process::exit(1);
    }
}

fn parse_args(argv: &[String]) -> Args {
    let mut args = Args::default();
    let mut iter = argv.iter().skip(1);

    let value = |flag: &str, v: Option<&String>| match v {
        Some(v) => v.clone(),
        None => {
            eprintln!("Missing value for {flag}");
            process::exit(1);
        }
    };

    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--name" | "-n" => args.name = Some(value(arg.as_str(), iter.next())),
            "--event" | "-e" => args.event = Some(value(arg.as_str(), iter.next())),
            "--date" | "-d" => args.date = Some(value(arg.as_str(), iter.next())),
            "--roster" | "-r" => args.roster = Some(PathBuf::from(value(arg.as_str(), iter.next()))),
            "--template" | "-t" => args.template = Some(PathBuf::from(value(arg.as_str(), iter.next()))),
            "--layout" => args.layout = Some(PathBuf::from(value(arg.as_str(), iter.next()))),
            "--fonts" => args.fonts = Some(PathBuf::from(value(arg.as_str(), iter.next()))),
            "--out" | "-o" => args.out = Some(PathBuf::from(value(arg.as_str(), iter.next()))),
            "--print" => args.print = true,
            "--png" => args.png = true,
            "--help" | "-h" => {
                print_usage(&argv[0]);
                process::exit(0);
            }
            other if other.starts_with('-') => {
                eprintln!("Unknown flag: {other}");
                print_usage(&argv[0]);
                process::exit(1);
            }
            other => {
                if args.command.is_empty() {
                    args.command = other.to_string();
                } else {
                    args.positional.push(other.to_string());
                }
            }
        }
    }
    args
}

fn session_config(args: &Args) -> Result<SessionConfig, CertError> {
    let layout = match &args.layout {
        Some(path) => LayoutConfig::from_json(&fs::read_to_string(path)?)?,
        None => LayoutConfig::default(),
    };
    Ok(SessionConfig {
        layout,
        font_dir: args.fonts.clone(),
        ..SessionConfig::default()
    })
}

async fn generate(args: &Args) -> Result<(), CertError> {
    let mut session = Session::new(session_config(args)?)?;

    // Both loads are independent; the render below picks up whatever has
    // been published by then.
    let roster_load = args.roster.clone().map(|p| session.spawn_roster_load(p));
    let template_load = args.template.clone().map(|p| session.spawn_template_load(p));
    for handle in [roster_load, template_load].into_iter().flatten() {
        let _ = handle.await;
    }

    let mut form = CertificateForm::new(
        args.name.as_deref().unwrap_or_default(),
        args.event.as_deref().unwrap_or_default(),
    );
    if let Some(date) = &args.date {
        form = form.with_date(date);
    }

    let rendered = session.generate(&form)?;
    eprintln!("Generated certificate {}", rendered.record.certificate_id());

    let out_dir = args.out.clone().unwrap_or_else(|| PathBuf::from("."));

    if args.png {
        let png = encode_png(&rendered.surface)?;
        let path = out_dir.join(format!("{}.png", rendered.record.certificate_id().replace('/', "-")));
        fs::create_dir_all(&out_dir)?;
        fs::write(&path, png)?;
        eprintln!("Wrote '{}'", path.display());
    }

    let download = session.download().await?;
    let path = download.save_to(&out_dir)?;
    eprintln!("Wrote '{}' ({} bytes)", path.display(), download.bytes.len());

    if args.print {
        let doc = session.print()?;
        let path = doc.save_to(&out_dir.join("certificate-print.html"))?;
        eprintln!("Open '{}' to print", path.display());
    }
    Ok(())
}

async fn suggest(args: &Args) -> Result<(), CertError> {
    let session = Session::new(session_config(args)?)?;
    if let Some(path) = &args.roster {
        session.load_roster(path).await;
    }
    let query = args.positional.join(" ");
    if query.trim().chars().count() < 2 {
        return Ok(());
    }
    let suggestions = session.suggest(&query);
    if suggestions.is_empty() {
        eprintln!("No matching participants found");
    }
    for name in suggestions {
        println!("{name}");
    }
    Ok(())
}

fn print_usage(prog: &str) {
    eprintln!("cert-forge – certificate generator");
    eprintln!();
    eprintln!("Usage:");
    eprintln!("  {prog} generate --name <name> --event <event> [--date YYYY-MM-DD] [options]");
    eprintln!("  {prog} suggest <query> --roster <file.csv>");
    eprintln!("  {prog} layout");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --roster, -r     Participant CSV (names in column C, header row skipped)");
    eprintln!("  --template, -t   Background image; without it the built-in design is drawn");
    eprintln!("  --layout         Layout JSON (see `{prog} layout` for the default)");
    eprintln!("  --fonts          Directory of .ttf/.otf fonts used to draw text");
    eprintln!("  --out, -o        Output directory (default: current directory)");
    eprintln!("  --print          Also write a self-printing HTML page");
    eprintln!("  --png            Also write the rendered PNG");
    eprintln!("  --help           Print this message");
}
