use wana_kana::IsJapaneseStr;

/// Convert every katakana letter to its hiragana counterpart, leaving all
/// other characters (kanji, latin, the long vowel mark ー) untouched.
/// Deinflection rules are written in hiragana, so lookup text gets normalized
/// through this before rule application.
pub fn katakana_to_hiragana(text: &str) -> String {
    text.chars()
        .map(|c| {
            if matches!(c, 'ァ'..='ヶ') {
                // Kana blocks are offset by 0x60 code points
                char::from_u32(c as u32 - 0x60).unwrap_or(c)
            } else {
                c
            }
        })
        .collect()
}

/// Whether a scan may start on this character. Matches kana, kanji and
/// Japanese punctuation/symbols; latin text is gated separately by the
/// alphanumeric scanning option.
pub fn is_scannable_start(c: char) -> bool {
    let mut buffer = [0u8; 4];
    let encoded: &str = c.encode_utf8(&mut buffer);
    encoded.is_japanese()
}

/// Tag names can carry a disambiguating suffix ("news:1"). Tag bank records
/// are keyed by the base name only.
pub fn tag_base_name(name: &str) -> &str {
    match name.find(':') {
        Some(index) => &name[..index],
        None => name,
    }
}

/// Some frequency dictionaries store numbers as strings ("1024"), others as
/// plain JSON numbers. Accept both.
pub fn deserialize_number_or_numeric_string<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::Deserialize;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrString {
        Number(u32),
        Text(String),
    }

    match NumberOrString::deserialize(deserializer)? {
        NumberOrString::Number(value) => Ok(value),
        NumberOrString::Text(text) => text.trim().parse::<u32>().map_err(serde::de::Error::custom),
    }
}
