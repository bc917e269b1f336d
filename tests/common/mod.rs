//! Shared helpers: build small synthetic PDFs in memory.
#![allow(dead_code)]

use pdf_phantom::engine;

/// Builder for minimal, well-formed test PDFs.
pub struct TestPdf {
    pages: usize,
    image: Option<(usize, usize)>,
}

impl TestPdf {
    pub fn new() -> Self {
        Self {
            pages: 1,
            image: None,
        }
    }

    pub fn pages(mut self, pages: usize) -> Self {
        self.pages = pages;
        self
    }

    pub fn image(mut self, width: usize, height: usize) -> Self {
        self.image = Some((width, height));
        self
    }

    pub fn build(self) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(b"%PDF-1.4\n");
        buf.extend_from_slice(b"1 0 obj\n<< /Type /Catalog /Pages 2 0 R >>\nendobj\n");

        let kids: Vec<String> = (0..self.pages).map(|i| format!("{} 0 R", 10 + i)).collect();
        buf.extend_from_slice(
            format!(
                "2 0 obj\n<< /Type /Pages /Kids [{}] /Count {} >>\nendobj\n",
                kids.join(" "),
                self.pages
            )
            .as_bytes(),
        );

        for i in 0..self.pages {
            let resources = if i == 0 && self.image.is_some() {
                " /Resources << /XObject << /Im0 90 0 R >> /Font << /F1 91 0 R >> >>"
            } else {
                " /Resources << /Font << /F1 91 0 R >> >>"
            };
            buf.extend_from_slice(
                format!(
                    "{} 0 obj\n<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Contents {} 0 R{} >>\nendobj\n",
                    10 + i,
                    50 + i,
                    resources
                )
                .as_bytes(),
            );
        }

        for i in 0..self.pages {
            let content = format!("BT /F1 12 Tf 72 720 Td (Page {}) Tj ET", i + 1);
            buf.extend_from_slice(
                format!("{} 0 obj\n<< /Length {} >>\nstream\n", 50 + i, content.len()).as_bytes(),
            );
            buf.extend_from_slice(content.as_bytes());
            buf.extend_from_slice(b"\nendstream\nendobj\n");
        }

        if let Some((width, height)) = self.image {
            let pixels: Vec<u8> = (0..width * height).map(|i| (i % 251) as u8).collect();
            let data = engine::encode_stream_flate(&pixels);
            buf.extend_from_slice(
                format!(
                    "90 0 obj\n<< /Type /XObject /Subtype /Image /Width {} /Height {} /ColorSpace /DeviceGray /BitsPerComponent 8 /Filter /FlateDecode /Length {} >>\nstream\n",
                    width, height, data.len()
                )
                .as_bytes(),
            );
            buf.extend_from_slice(&data);
            buf.extend_from_slice(b"\nendstream\nendobj\n");
        }

        buf.extend_from_slice(
            b"91 0 obj\n<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>\nendobj\n",
        );
        buf.extend_from_slice(b"trailer\n<< /Size 92 /Root 1 0 R >>\n%%EOF\n");
        buf
    }
}

/// Append a fake incremental update ending in its own `%%EOF`.
pub fn append_revision(buf: &mut Vec<u8>, marker: &str) {
    buf.extend_from_slice(
        format!(
            "200 0 obj\n<< /Note ({}) >>\nendobj\ntrailer\n<< /Size 201 /Root 1 0 R >>\n%%EOF\n",
            marker
        )
        .as_bytes(),
    );
}

/// Write bytes to a named file inside a temp dir, returning the path.
pub fn write_pdf(dir: &tempfile::TempDir, name: &str, data: &[u8]) -> std::path::PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, data).unwrap();
    path
}
