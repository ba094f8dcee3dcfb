use unicode_normalization::UnicodeNormalization as _;

/// Maps the Romanian letters carrying diacritics to the ASCII letter they are built on,
/// including the legacy cedilla forms of `ș` and `ț` which are still common in older files.
fn transliterate(character: char) -> Option<char> {
    let replacement = match character {
        'ă' | 'â' => 'a',
        'î' => 'i',
        'ș' | 'ş' => 's',
        'ț' | 'ţ' => 't',
        'Ă' | 'Â' => 'A',
        'Î' => 'I',
        'Ș' | 'Ş' => 'S',
        'Ț' | 'Ţ' => 'T',
        _ => return None,
    };
    Some(replacement)
}

/// Returns whether the text contains any letter that `normalize` would replace.
pub fn has_diacritics(text: &str) -> bool {
    text.nfc().any(|character| transliterate(character).is_some())
}

/// Replaces the Romanian diacritics, which the fonts' single-byte encoding cannot represent,
/// with their ASCII base letter. The text is composed in the NFC form first so that letters
/// written as a base letter followed by a combining mark are replaced as well.
///
/// The function never fails and is idempotent, any other character is left untouched.
pub fn normalize(text: &str) -> String {
    let mut normalized: String = text.nfc().collect();
    // Stripping a letter can let the composition merge its base with a leftover combining mark
    // into another diacritic (`ş` followed by a comma below becomes `ș`), hence the loop
    while normalized
        .chars()
        .any(|character| transliterate(character).is_some())
    {
        normalized = normalized
            .chars()
            .map(|character| transliterate(character).unwrap_or(character))
            .nfc()
            .collect();
    }
    normalized
}

/// Greedily packs the words of the text into lines whose measured width does not exceed
/// `max_width`. A word which is wider than a line on its own is broken between characters.
/// The result always contains at least one line, which is empty for an empty text.
pub fn wrap_text<F>(text: &str, max_width: f32, measure: F) -> Vec<String>
where
    F: Fn(&str) -> f32,
{
    let mut lines = Vec::new();
    let mut current_line = String::new();

    for word in text.split_whitespace() {
        let candidate = if current_line.is_empty() {
            word.to_string()
        } else {
            format!("{current_line} {word}")
        };
        if measure(&candidate) <= max_width {
            current_line = candidate;
            continue;
        }

        if !current_line.is_empty() {
            lines.push(std::mem::take(&mut current_line));
        }
        if measure(word) <= max_width {
            current_line = word.to_string();
            continue;
        }

        // The word alone overflows the line, so split it where it stops fitting
        for character in word.chars() {
            let mut candidate = current_line.clone();
            candidate.push(character);
            if measure(&candidate) > max_width && !current_line.is_empty() {
                lines.push(std::mem::take(&mut current_line));
            }
            current_line.push(character);
        }
    }

    if !current_line.is_empty() || lines.is_empty() {
        lines.push(current_line);
    }

    lines
}

/// Encodes a character in the `WinAnsiEncoding` used by the standard PDF fonts.
pub(crate) fn win_ansi_byte(character: char) -> Option<u8> {
    let byte = match character {
        ' '..='~' | '\u{a0}'..='\u{ff}' => character as u32 as u8,
        '€' => 0x80,
        '‚' => 0x82,
        'ƒ' => 0x83,
        '„' => 0x84,
        '…' => 0x85,
        '†' => 0x86,
        '‡' => 0x87,
        'ˆ' => 0x88,
        '‰' => 0x89,
        'Š' => 0x8a,
        '‹' => 0x8b,
        'Œ' => 0x8c,
        'Ž' => 0x8e,
        '‘' => 0x91,
        '’' => 0x92,
        '“' => 0x93,
        '”' => 0x94,
        '•' => 0x95,
        '–' => 0x96,
        '—' => 0x97,
        '˜' => 0x98,
        '™' => 0x99,
        'š' => 0x9a,
        '›' => 0x9b,
        'œ' => 0x9c,
        'ž' => 0x9e,
        'Ÿ' => 0x9f,
        _ => return None,
    };
    Some(byte)
}

/// Encodes the whole text in `WinAnsiEncoding`, replacing what cannot be represented with `?`.
pub(crate) fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.nfc()
        .map(|character| {
            win_ansi_byte(character).unwrap_or_else(|| {
                log::warn!(
                    "Unable to encode the character {:?} with the standard fonts, replacing it",
                    character
                );
                b'?'
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_replaces_every_romanian_diacritic() {
        similar_asserts::assert_eq!(
            normalize("Hotărâre în ședința Consiliului Județean ŞI ŢARA ĂÂÎȘȚ"),
            "Hotarare in sedinta Consiliului Judetean SI TARA AAIST"
        );
    }

    #[test]
    fn normalize_composes_combining_marks_before_replacing() {
        // `s` followed by a combining comma below, and `a` followed by a combining breve
        assert_eq!(normalize("s\u{326}a\u{306}"), "sa");
    }

    #[test]
    fn normalize_strips_marks_left_over_by_the_replacement() {
        let normalized = normalize("s\u{327}\u{326}");
        assert!(!has_diacritics(&normalized));
        assert_eq!(normalize(&normalized), normalized);
    }

    #[test]
    fn normalize_leaves_other_text_untouched() {
        assert_eq!(normalize("Contract nr. 12/2024 (copie)"), "Contract nr. 12/2024 (copie)");
        assert_eq!(normalize(""), "");
    }

    #[test]
    fn normalize_is_idempotent_and_total_on_random_text() {
        let mut rng = rand::thread_rng();
        for length in 1..200 {
            let text = rand_utf8::rand_utf8(&mut rng, length).to_string();
            let normalized = normalize(&text);
            assert!(!has_diacritics(&normalized), "{normalized:?}");
            assert_eq!(normalize(&normalized), normalized);
        }
    }

    #[test]
    fn wrap_text_keeps_every_line_within_the_width() {
        let measure = |text: &str| text.chars().count() as f32;
        let lines = wrap_text("Contract de vanzare cumparare incheiat intre parti", 12.0, measure);
        assert!(lines.len() > 1);
        assert!(lines.iter().all(|line| measure(line) <= 12.0));
        assert_eq!(lines.join(" "), "Contract de vanzare cumparare incheiat intre parti");
    }

    #[test]
    fn wrap_text_breaks_words_wider_than_a_line() {
        let measure = |text: &str| text.chars().count() as f32;
        let lines = wrap_text("abcdefghij", 4.0, measure);
        assert_eq!(lines, vec!["abcd", "efgh", "ij"]);
    }

    #[test]
    fn wrap_text_returns_a_single_empty_line_for_blank_text() {
        assert_eq!(wrap_text("   ", 10.0, |text: &str| text.len() as f32), vec![""]);
    }

    #[test]
    fn win_ansi_replaces_unencodable_characters() {
        assert_eq!(encode_win_ansi("a€ș"), vec![b'a', 0x80, b'?']);
    }
}
