//! # PDF Phantom
//!
//! An adversarial pair operating over the PDF file format.
//!
//! The **defender** embeds a small, authenticated, encrypted payload (a
//! watermark carrying a tracking string) into a PDF through several
//! independent anchors, so that the watermark survives common
//! sanitization attempts while the document stays visually and
//! structurally valid. The **attacker** scans PDFs for hidden data and
//! neutralizes watermarks without destroying the document.
//!
//! Both sides share a byte-precise engine: objects are located by
//! pattern, DEFLATE streams are decoded and re-encoded, and edits either
//! preserve byte length exactly (keeping the original cross-reference
//! table valid) or re-serialize the file with a fresh one.
//!
//! ## Signing and verifying
//!
//! ```ignore
//! use pdf_phantom::defender::{sign, verify, Anchor};
//! use std::path::Path;
//!
//! let key = b"0123456789abcdef0123456789abcdef";
//! let outcome = sign(
//!     Path::new("report.pdf"),
//!     "UserID:12345",
//!     key,
//!     &Anchor::DEFAULT_ORDER,
//!     None,
//! )?;
//! println!("signed via {:?}", outcome.anchors);
//!
//! let verified = verify(&outcome.output, key, None)?;
//! assert_eq!(verified.message, "UserID:12345");
//! # Ok::<(), pdf_phantom::Error>(())
//! ```
//!
//! ## Scanning and cleaning
//!
//! ```ignore
//! use pdf_phantom::attacker;
//! use pdf_phantom::ScanConfig;
//!
//! let buf = std::fs::read("suspect.pdf")?;
//! let tail = attacker::scan_tail(&buf)?;
//! if tail.suspicious {
//!     let (cleaned, removed) = attacker::clean_tail(&buf)?;
//!     std::fs::write("suspect_cleaned.pdf", cleaned)?;
//!     println!("removed {} bytes", removed);
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![warn(missing_docs)]

pub mod error;

pub mod config;
pub mod engine;
pub mod naming;
pub mod payload;
pub mod rewrite;

pub mod attacker;
pub mod defender;

pub use config::{ScanConfig, WatermarkStyle};
pub use error::{Error, Result};
