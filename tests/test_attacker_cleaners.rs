//! Attacker detectors and cleaners against synthetic files.

mod common;

use common::{append_revision, TestPdf};
use pdf_phantom::{attacker, engine, Error, ScanConfig};

#[test]
fn appended_tail_detected_and_cleaned() {
    let mut buf = TestPdf::new().build();
    buf.extend_from_slice(&vec![0u8; 1234]);

    let scan = attacker::scan_tail(&buf).unwrap();
    assert!(scan.suspicious);
    assert_eq!(scan.trailing_bytes, 1234 + 1); // the builder's own newline

    let (cleaned, removed) = attacker::clean_tail(&buf).unwrap();
    assert_eq!(removed, 1234);
    assert!(cleaned.ends_with(b"%%EOF\n"));
    assert!(!attacker::scan_tail(&cleaned).unwrap().suspicious);

    // Idempotence: cleaning again changes nothing
    let (again, removed) = attacker::clean_tail(&cleaned).unwrap();
    assert_eq!(removed, 0);
    assert_eq!(cleaned, again);
}

#[test]
fn gap_sanitizer_preserves_everything_else() {
    let buf = TestPdf::new().build();
    // Park data in the gap after the first endobj
    let endobj = buf.windows(6).position(|w| w == b"endobj").unwrap() + 6;
    let mut tampered = buf[..endobj].to_vec();
    tampered.extend_from_slice(b"\nHIDDEN-CHANNEL-BYTES\n");
    tampered.extend_from_slice(&buf[endobj..]);

    let gaps = attacker::find_suspicious_gaps(&tampered);
    assert_eq!(gaps.len(), 1);

    let before = tampered.clone();
    let wiped = attacker::sanitize_gaps(&mut tampered);
    assert!(wiped > 0);
    assert_eq!(tampered.len(), before.len());
    for i in 0..before.len() {
        if i < gaps[0].start || i >= gaps[0].end {
            assert_eq!(before[i], tampered[i], "byte {} changed outside gaps", i);
        }
    }
    assert!(!tampered.windows(6).any(|w| w == b"HIDDEN"));

    // Idempotence
    let once = tampered.clone();
    attacker::sanitize_gaps(&mut tampered);
    assert_eq!(once, tampered);
}

#[test]
fn rollback_drops_last_revision() {
    let mut buf = TestPdf::new().build();
    append_revision(&mut buf, "rev-two");
    append_revision(&mut buf, "rev-three");

    let (out, result) = attacker::rollback(&buf).unwrap();
    assert_eq!(result.revisions_found, 3);
    assert!(out.ends_with(b"%%EOF\n"));
    assert!(out.windows(7).any(|w| w == b"rev-two"));
    assert!(!out.windows(9).any(|w| w == b"rev-three"));
    assert!(engine::find_last_eof(&out).is_some());
}

#[test]
fn rollback_needs_two_revisions() {
    let buf = TestPdf::new().build();
    assert!(matches!(
        attacker::rollback(&buf),
        Err(Error::NoPriorRevision(1))
    ));
}

#[test]
fn duplicate_streams_wiped_at_threshold() {
    // Ten pages, each with an identical extra watermark stream
    let base = TestPdf::new().pages(10).build();
    let mut rewriter = pdf_phantom::rewrite::PdfRewriter::parse(&base).unwrap();
    let watermark =
        engine::encode_stream_flate(b"q 0.5 g BT /F1 48 Tf 100 400 Td (TRACKED DOCUMENT) Tj ET Q");
    for _ in 0..10 {
        rewriter.add_stream("/Filter /FlateDecode", &watermark);
    }
    let buf = rewriter.serialize();

    let config = ScanConfig::new();
    let scan = attacker::scan_duplicates(&buf, &config);
    assert_eq!(scan.pages, 10);
    assert_eq!(scan.min_count, 8);
    assert_eq!(scan.flagged.len(), 1);
    assert_eq!(scan.flagged[0].count, 10);

    let mut work = buf.clone();
    let wiped = attacker::wipe_duplicates(&mut work, &config);
    assert_eq!(wiped, 10);
    assert_eq!(work.len(), buf.len());
    assert!(!work
        .windows(watermark.len())
        .any(|w| w == watermark.as_slice()));
    assert!(engine::find_last_eof(&work).is_some());
}

#[test]
fn seven_of_ten_copies_stay_below_threshold() {
    let base = TestPdf::new().pages(10).build();
    let mut rewriter = pdf_phantom::rewrite::PdfRewriter::parse(&base).unwrap();
    let watermark =
        engine::encode_stream_flate(b"q 0.5 g BT /F1 48 Tf 100 400 Td (TRACKED DOCUMENT) Tj ET Q");
    for _ in 0..7 {
        rewriter.add_stream("/Filter /FlateDecode", &watermark);
    }
    let buf = rewriter.serialize();

    let scan = attacker::scan_duplicates(&buf, &ScanConfig::new());
    assert!(scan.flagged.is_empty());
}

#[test]
fn zombie_pruning_spares_live_objects() {
    let base = TestPdf::new().build();
    let mut rewriter = pdf_phantom::rewrite::PdfRewriter::parse(&base).unwrap();
    // Unreferenced plain data object
    rewriter.add(b"<< /Length 12 >> (orphan data)".to_vec());
    let mut buf = rewriter.serialize();

    let analysis = attacker::analyze_graph(&buf).unwrap();
    assert_eq!(analysis.zombies.len(), 1);

    let before_len = buf.len();
    let pruned = attacker::prune_zombies(&mut buf).unwrap();
    assert_eq!(pruned, 1);
    assert_eq!(buf.len(), before_len);
    assert!(!buf.windows(6).any(|w| w == b"orphan"));
    // Live structure intact
    assert_eq!(engine::count_pages(&buf), 1);
    assert!(attacker::check_integrity(&buf).is_valid());
}

#[test]
fn cleaners_always_leave_an_eof() {
    let mut tailed = TestPdf::new().build();
    tailed.extend_from_slice(b"garbage");
    let (cleaned, _) = attacker::clean_tail(&tailed).unwrap();
    assert!(engine::find_last_eof(&cleaned).is_some());

    let mut buf = TestPdf::new().pages(2).build();
    attacker::sanitize_gaps(&mut buf);
    assert!(engine::find_last_eof(&buf).is_some());

    attacker::prune_zombies(&mut buf).unwrap();
    assert!(engine::find_last_eof(&buf).is_some());

    attacker::clean_all(&mut buf, &ScanConfig::new()).unwrap();
    assert!(engine::find_last_eof(&buf).is_some());
}
