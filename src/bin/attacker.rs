//! Attacker CLI: scan PDFs for hidden data and neutralize watermarks.
//!
//! Usage:
//!   attacker <command> -f <file.pdf> [-t threshold]
//!
//! Commands:
//!   scan       tail scan, falling through to the gap scan when clean
//!   verify     structural integrity check (header, EOF, xref)
//!   clean      truncate data after the last %%EOF       -> *_cleaned.pdf
//!   sanitize   wipe non-whitespace inter-object gaps    -> *_sanitized.pdf
//!   rollback   drop the newest incremental revision     -> *_rollback.pdf
//!   prune      null out unreachable objects             -> *_pruned.pdf
//!   semantic   strip suspicious attachments             -> *_stream_cleaned.pdf
//!   watermark  wipe streams carrying the signature      -> *_watermark_cleaned.pdf
//!   heuristic  wipe high-frequency duplicate streams    -> *_heuristic_cleaned.pdf
//!   clean-all  attachments + soft masks + duplicates    -> *_final_cleaned.pdf

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use pdf_phantom::attacker;
use pdf_phantom::naming::suffixed_path;
use pdf_phantom::{Result, ScanConfig};

fn print_usage() {
    eprintln!("Attacker CLI");
    eprintln!("Usage: attacker <command> -f <file.pdf> [-t threshold] [--conservative]");
    eprintln!("Commands: scan verify clean sanitize rollback prune semantic watermark heuristic clean-all");
}

struct Args {
    file: Option<PathBuf>,
    threshold: Option<f64>,
    conservative: bool,
}

fn parse_args(args: &[String]) -> Result<Args> {
    let mut parsed = Args {
        file: None,
        threshold: None,
        conservative: false,
    };
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "-f" | "--file" => {
                i += 1;
                parsed.file = args.get(i).map(PathBuf::from);
            }
            "-t" | "--threshold" => {
                i += 1;
                parsed.threshold = args.get(i).and_then(|s| s.parse().ok());
            }
            "--conservative" => parsed.conservative = true,
            other => {
                return Err(pdf_phantom::Error::InvalidInput(format!(
                    "unknown argument: {}",
                    other
                )))
            }
        }
        i += 1;
    }
    Ok(parsed)
}

fn run(command: &str, file: &Path, config: &ScanConfig, conservative: bool) -> Result<()> {
    let buf = fs::read(file)?;

    match command {
        "scan" => {
            let tail = attacker::scan_tail(&buf)?;
            if tail.suspicious {
                println!("[!] Status: SUSPICIOUS (tail data)");
                println!("[!] {} bytes after %%EOF", tail.trailing_bytes);
            } else {
                let gaps = attacker::find_suspicious_gaps(&buf);
                if gaps.is_empty() {
                    println!("[+] Status: CLEAN");
                } else {
                    let bytes: usize = gaps.iter().map(|g| g.end - g.start).sum();
                    println!("[!] Status: SUSPICIOUS (internal gaps)");
                    println!("[!] {} anomalous gaps ({} bytes)", gaps.len(), bytes);
                }
            }
            println!("{}", serde_json::to_string_pretty(&tail)?);
        }
        "verify" => {
            let report = attacker::check_integrity(&buf);
            println!("{}", serde_json::to_string_pretty(&report)?);
            if !report.is_valid() {
                return Err(pdf_phantom::Error::InvalidPdf(
                    "integrity check failed".into(),
                ));
            }
        }
        "clean" => {
            let (cleaned, removed) = attacker::clean_tail(&buf)?;
            let out = write_output(file, "_cleaned", &cleaned)?;
            println!("[+] Removed {} bytes, saved to {}", removed, out.display());
        }
        "sanitize" => {
            let mut work = buf;
            let wiped = attacker::sanitize_gaps(&mut work);
            let out = write_output(file, "_sanitized", &work)?;
            println!("[+] Wiped {} gap bytes, saved to {}", wiped, out.display());
        }
        "rollback" => {
            let (truncated, result) = attacker::rollback(&buf)?;
            let out = write_output(file, "_rollback", &truncated)?;
            println!(
                "[+] {} revisions found, rolled back {} -> {} bytes, saved to {}",
                result.revisions_found,
                result.original_size,
                result.new_size,
                out.display()
            );
        }
        "prune" => {
            let analysis = attacker::analyze_graph(&buf)?;
            println!(
                "[*] {} objects, {} reachable, {} zombies",
                analysis.total_objects,
                analysis.reachable,
                analysis.zombies.len()
            );
            let mut work = buf;
            let pruned = attacker::prune_zombies(&mut work)?;
            let out = write_output(file, "_pruned", &work)?;
            println!("[+] Pruned {} objects, saved to {}", pruned, out.display());
        }
        "semantic" => {
            let source = file.display().to_string();
            if conservative {
                let mut work = buf;
                let (wiped, analysis) = attacker::wipe_suspicious_streams(&mut work, config);
                write_report(file, &analysis.to_report(&source))?;
                let out = write_output(file, "_stream_cleaned", &work)?;
                println!(
                    "[+] Wiped {} attachment streams, saved to {}",
                    wiped,
                    out.display()
                );
            } else {
                let (stripped, analysis) = attacker::strip_suspicious_attachments(&buf, config)?;
                write_report(file, &analysis.to_report(&source))?;
                let out = write_output(file, "_stream_cleaned", &stripped)?;
                println!(
                    "[+] Stripped {} suspicious attachments, saved to {}",
                    analysis.suspicious.len(),
                    out.display()
                );
            }
        }
        "watermark" => {
            let mut work = buf;
            let wiped = attacker::wipe_signature_streams(&mut work, config);
            let out = write_output(file, "_watermark_cleaned", &work)?;
            println!(
                "[+] Wiped {} signature streams, saved to {}",
                wiped,
                out.display()
            );
        }
        "heuristic" => {
            let scan = attacker::scan_duplicates(&buf, config);
            println!(
                "[*] {} pages, threshold {} repeats, {} hashes flagged",
                scan.pages,
                scan.min_count,
                scan.flagged.len()
            );
            let mut work = buf;
            let wiped = attacker::wipe_duplicates(&mut work, config);
            let out = write_output(file, "_heuristic_cleaned", &work)?;
            println!("[+] Wiped {} streams, saved to {}", wiped, out.display());
        }
        "clean-all" => {
            let mut work = buf;
            let result = attacker::clean_all(&mut work, config)?;
            let out = write_output(file, "_final_cleaned", &work)?;
            println!("{}", serde_json::to_string_pretty(&result)?);
            println!("[+] Saved to {}", out.display());
        }
        other => {
            return Err(pdf_phantom::Error::InvalidInput(format!(
                "unknown command: {}",
                other
            )))
        }
    }
    Ok(())
}

fn write_output(input: &Path, suffix: &str, data: &[u8]) -> Result<PathBuf> {
    let out = suffixed_path(input, suffix)?;
    fs::write(&out, data)?;
    Ok(out)
}

fn write_report(input: &Path, report: &str) -> Result<()> {
    let mut path = input.as_os_str().to_os_string();
    path.push("_semantic_report.txt");
    fs::write(PathBuf::from(path), report)?;
    Ok(())
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
            print_usage();
            return ExitCode::FAILURE;
        }
    };

    let mut config = ScanConfig::new();
    if let Some(threshold) = args.threshold {
        config = config.with_duplicate_threshold(threshold);
    }

    match run(&argv[1], &file, &config, args.conservative) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {}", err);
            ExitCode::FAILURE
        }
    }
}
