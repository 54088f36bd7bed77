//! Integration tests for PDF assembly, pagination and fallback documents.

use pdf_courier::converter::{ConversionOutcome, DocumentConverter};
use pdf_courier::writer::{
    paginate, paginate_tables, verify_structure, FallbackPdfFactory, Page, PageGeometry,
    PdfAssembler, MINIMAL_PDF,
};

/// Offsets listed in the xref table, parsed independently of the writer.
fn xref_offsets(pdf: &[u8]) -> (usize, Vec<usize>) {
    // The header's binary comment is not UTF-8; everything from the xref on is ASCII.
    let startxref = pdf.windows(10).rposition(|w| w == b"startxref\n").unwrap();
    let tail = std::str::from_utf8(&pdf[startxref + 10..]).unwrap();
    let xref_start: usize = tail.lines().next().unwrap().trim().parse().unwrap();
    let table = std::str::from_utf8(&pdf[xref_start..]).unwrap();
    assert!(table.starts_with("xref\n"));

    let mut lines = table.lines().skip(1);
    let header = lines.next().unwrap();
    let count: usize = header.split(' ').nth(1).unwrap().parse().unwrap();
    let offsets = lines
        .take(count)
        .skip(1)
        .map(|entry| {
            assert_eq!(entry.len() + 1, 20, "xref entry {:?} is not 20 bytes", entry);
            entry[..10].parse().unwrap()
        })
        .collect();
    (xref_start, offsets)
}

fn lines(texts: &[&str]) -> Vec<String> {
    texts.iter().map(|s| s.to_string()).collect()
}

mod assembly {
    use super::*;

    #[test]
    fn test_xref_offsets_point_at_objects() {
        let pages: Vec<Page> = vec![lines(&["first page"]), lines(&["second (page)", "caf\u{e9}"])];
        let pdf = PdfAssembler::default().with_title("Report").assemble(&pages).unwrap();

        let (_, offsets) = xref_offsets(&pdf);
        // catalog, page tree, two page/content pairs, info
        assert_eq!(offsets.len(), 7);
        for (index, offset) in offsets.iter().enumerate() {
            let marker = format!("{} 0 obj", index + 1);
            assert!(pdf[*offset..].starts_with(marker.as_bytes()), "object {}", index + 1);
        }
    }

    #[test]
    fn test_header_and_trailer() {
        let pdf = PdfAssembler::default().assemble(&[lines(&["x"])]).unwrap();
        let text = String::from_utf8_lossy(&pdf);

        assert!(pdf.starts_with(b"%PDF-1.4\n"));
        assert!(pdf.ends_with(b"%%EOF\n"));
        assert!(text.contains("/Root 1 0 R"));
        assert!(text.contains("/Size 5"));
        assert!(!text.contains("/Info"));
    }

    #[test]
    fn test_stream_lengths_match() {
        let pdf = PdfAssembler::default()
            .assemble(&[lines(&["alpha", "beta"]), lines(&["gamma"])])
            .unwrap();
        let text = String::from_utf8_lossy(&pdf).to_string();

        let mut search = 0;
        let mut streams = 0;
        while let Some(pos) = text[search..].find("/Length ") {
            let start = search + pos + 8;
            let length: usize = text[start..].split(|c: char| !c.is_ascii_digit()).next().unwrap().parse().unwrap();
            let body_start = start + text[start..].find("stream\n").unwrap() + 7;
            assert_eq!(&text[body_start + length..body_start + length + 10], "\nendstream");
            search = body_start + length;
            streams += 1;
        }
        assert_eq!(streams, 2);
    }

    #[test]
    fn test_pages_follow_geometry() {
        let geometry = PageGeometry::a4();
        let pdf = PdfAssembler::new(geometry).assemble(&[lines(&["x"])]).unwrap();
        let text = String::from_utf8_lossy(&pdf);
        assert!(text.contains("/MediaBox [0 0 595 842]"));
        assert!(text.contains("/BaseFont /Courier"));
    }

    #[test]
    fn test_empty_input_gives_one_page() {
        let pdf = PdfAssembler::default().assemble(&[]).unwrap();
        let text = String::from_utf8_lossy(&pdf);
        assert!(text.contains("/Count 1"));
        verify_structure(&pdf).unwrap();
    }
}

mod pagination {
    use super::*;

    #[test]
    fn test_long_text_spans_pages() {
        let geometry = PageGeometry::default();
        let source: Vec<String> = (1..=130).map(|i| format!("line {}", i)).collect();
        let pages = paginate(&source, geometry.max_chars_per_line(), geometry.max_lines_per_page());

        assert_eq!(pages.len(), 3);
        assert_eq!(pages[0].len(), geometry.max_lines_per_page());
        assert_eq!(pages[2].last().unwrap(), "line 130");

        let pdf = PdfAssembler::new(geometry).assemble(&pages).unwrap();
        assert!(String::from_utf8_lossy(&pdf).contains("/Count 3"));
    }

    #[test]
    fn test_table_lines_are_not_wrapped() {
        let table = "+".to_string() + &"-".repeat(120) + "+";
        let pages = paginate_tables(&[table.clone()], 85, 57);
        assert_eq!(pages, vec![vec![table]]);
    }
}

mod fallback {
    use super::*;

    #[test]
    fn test_minimal_pdf_is_well_formed() {
        verify_structure(MINIMAL_PDF).unwrap();
        let (xref_start, offsets) = xref_offsets(MINIMAL_PDF);
        assert_eq!(offsets, vec![9, 56, 111, 303]);
        assert_eq!(xref_start, 471);
    }

    #[test]
    fn test_fallback_names_file_and_reason() {
        let pdf = FallbackPdfFactory::default().build("unsupported document format", "scan.png");
        verify_structure(&pdf).unwrap();
        let text = String::from_utf8_lossy(&pdf);
        assert!(text.contains("scan.png"));
        assert!(text.contains("unsupported document format"));
    }

    #[test]
    fn test_empty_document_yields_single_page_fallback() {
        let converted = DocumentConverter::default().convert(Vec::new(), "empty.txt", Some("text/plain"));

        assert!(converted.outcome.is_fallback());
        verify_structure(&converted.pdf).unwrap();
        let text = String::from_utf8_lossy(&converted.pdf);
        assert!(text.contains("/Count 1"));
        match converted.outcome {
            ConversionOutcome::Fallback { reason } => assert!(reason.contains("no extractable text")),
            other => panic!("unexpected outcome {:?}", other),
        }
    }
}
