//! Property tests for key encoding, pagination and assembly.

use pdf_courier::storage::encode_key;
use pdf_courier::writer::{paginate, verify_structure, PdfAssembler};
use percent_encoding::percent_decode_str;
use proptest::prelude::*;

proptest! {
    #[test]
    fn prop_encoded_key_decodes_to_original(key in "[^%]{0,40}") {
        let encoded = encode_key(&key);
        let decoded = percent_decode_str(&encoded).decode_utf8().unwrap();
        prop_assert_eq!(decoded, key);
    }

    #[test]
    fn prop_encoded_key_is_url_safe(key in "\\PC{0,40}") {
        let encoded = encode_key(&key);
        prop_assert!(encoded
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b"-_.~/%".contains(&b)));
    }

    #[test]
    fn prop_encoding_is_idempotent(key in "[a-zA-Z0-9 ()!'/]{0,30}") {
        let once = encode_key(&key);
        prop_assert_eq!(encode_key(&once), once);
    }

    #[test]
    fn prop_paginate_keeps_every_word(
        words in prop::collection::vec("[a-z]{1,12}", 0..200),
        max_chars in 12usize..90,
        max_lines in 1usize..60,
    ) {
        let text: Vec<String> = words.chunks(7).map(|chunk| chunk.join(" ")).collect();
        let pages = paginate(&text, max_chars, max_lines);

        prop_assert!(!pages.is_empty());
        for page in &pages {
            prop_assert!(page.len() <= max_lines);
            for line in page {
                prop_assert!(line.chars().count() <= max_chars);
            }
        }

        let output: Vec<String> = pages
            .iter()
            .flatten()
            .flat_map(|line| line.split_whitespace().map(str::to_string).collect::<Vec<_>>())
            .collect();
        prop_assert_eq!(output, words);
    }

    #[test]
    fn prop_assembled_pdf_is_well_formed(
        lines in prop::collection::vec("\\PC{0,60}", 0..150),
    ) {
        let pages = paginate(&lines, 85, 57);
        let pdf = PdfAssembler::default().with_title("property").assemble(&pages).unwrap();
        prop_assert!(verify_structure(&pdf).is_ok());
    }
}
