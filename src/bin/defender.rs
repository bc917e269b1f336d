//! Defender CLI: sign and verify watermarked PDFs.
//!
//! Usage:
//!   defender sign -f <file.pdf> -m <message> -k <32-byte key> [-a anchors]
//!   defender verify -f <file.pdf> -k <32-byte key> [-a anchors]
//!
//! Anchors are a comma-separated subset of
//! `attachment,smask,content,visual`; the default runs all four.

use std::path::PathBuf;
use std::process::ExitCode;

use pdf_phantom::defender::{sign, verify, Anchor};

struct Args {
    file: Option<PathBuf>,
    message: Option<String>,
    key: Option<String>,
    anchors: Vec<Anchor>,
}

fn parse_args(args: &[String]) -> Result<Args, String> {
    let mut parsed = Args {
        file: None,
        message: None,
        key: None,
        anchors: Vec::new(),
    };

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "-f" | "--file" => {
                i += 1;
                parsed.file = args.get(i).map(PathBuf::from);
            }
            "-m" | "--message" => {
                i += 1;
                parsed.message = args.get(i).cloned();
            }
            "-k" | "--key" => {
                i += 1;
                parsed.key = args.get(i).cloned();
            }
            "-a" | "--anchors" => {
                i += 1;
                let list = args.get(i).cloned().unwrap_or_default();
                for name in list.split(',').filter(|s| !s.is_empty()) {
                    match Anchor::from_name(name) {
                        Some(anchor) => parsed.anchors.push(anchor),
                        None => return Err(format!("unknown anchor: {}", name)),
                    }
                }
            }
            other => return Err(format!("unknown argument: {}", other)),
        }
        i += 1;
    }
    Ok(parsed)
}

fn print_usage() {
    eprintln!("Defender CLI");
    eprintln!("Usage:");
    eprintln!("  defender sign -f <file.pdf> -m <message> -k <32-byte key> [-a anchors]");
    eprintln!("  defender verify -f <file.pdf> -k <32-byte key> [-a anchors]");
}

fn main() -> ExitCode {
    env_logger::init();

    let argv: Vec<String> = std::env::args().collect();
    if argv.len() < 2 {
        print_usage();
        return ExitCode::FAILURE;
    }

    let args = match parse_args(&argv[2..]) {
        Ok(args) => args,
        Err(err) => {
            eprintln!("Error: {}", err);
            print_usage();
            return ExitCode::FAILURE;
        }
    };

    let file = match args.file {
        Some(f) => f,
        None => {
            eprintln!("Error: -f <file> is required");
            return ExitCode::FAILURE;
        }
    };
    let key = match args.key {
        Some(k) => k,
        None => {
            eprintln!("Error: -k <key> is required");
            return ExitCode::FAILURE;
        }
    };

    match argv[1].as_str() {
        "sign" => {
            let message = match args.message {
                Some(m) => m,
                None => {
                    eprintln!("Error: -m <message> is required");
                    return ExitCode::FAILURE;
                }
            };
            match sign(&file, &message, key.as_bytes(), &args.anchors, None) {
                Ok(outcome) => {
                    for (i, name) in outcome.anchors.iter().enumerate() {
                        println!("[+] Anchor {}/{}: {} embedded", i + 1, outcome.anchors.len(), name);
                    }
                    println!("[+] Signed PDF written to {}", outcome.output.display());
                    ExitCode::SUCCESS
                }
                Err(err) => {
                    eprintln!("Error: {}", err);
                    ExitCode::FAILURE
                }
            }
        }
        "verify" => {
            let subset = if args.anchors.is_empty() {
                None
            } else {
                Some(args.anchors.as_slice())
            };
            match verify(&file, key.as_bytes(), subset) {
                Ok(verified) => {
                    println!("[+] Verified via anchor: {}", verified.anchor);
                    println!("[+] Message: {}", verified.message);
                    ExitCode::SUCCESS
                }
                Err(err) => {
                    eprintln!("Error: {}", err);
                    ExitCode::FAILURE
                }
            }
        }
        other => {
            eprintln!("Error: unknown command: {}", other);
            print_usage();
            ExitCode::FAILURE
        }
    }
}
