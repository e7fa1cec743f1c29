//! Language label normalization.
//!
//! Providers label tracks inconsistently: `"en"`, `"eng"`, `"en-US"`,
//! `"English"`, `"English (forced)"`, `"english - SDH"`. Everything that can
//! be mapped collapses to a lowercase ISO 639-1 code.

/// `(iso639-1, iso639-2 codes, English names)`
const LANGUAGES: &[(&str, &[&str], &[&str])] = &[
    ("ar", &["ara"], &["arabic"]),
    ("bg", &["bul"], &["bulgarian"]),
    ("bn", &["ben"], &["bengali", "bangla"]),
    ("ca", &["cat"], &["catalan"]),
    ("cs", &["ces", "cze"], &["czech"]),
    ("da", &["dan"], &["danish"]),
    ("de", &["deu", "ger"], &["german"]),
    ("el", &["ell", "gre"], &["greek"]),
    ("en", &["eng"], &["english"]),
    ("es", &["spa"], &["spanish", "castilian", "latin american spanish"]),
    ("et", &["est"], &["estonian"]),
    ("fa", &["fas", "per"], &["persian", "farsi"]),
    ("fi", &["fin"], &["finnish"]),
    ("fr", &["fra", "fre"], &["french"]),
    ("he", &["heb"], &["hebrew"]),
    ("hi", &["hin"], &["hindi"]),
    ("hr", &["hrv"], &["croatian"]),
    ("hu", &["hun"], &["hungarian"]),
    ("id", &["ind"], &["indonesian"]),
    ("is", &["isl", "ice"], &["icelandic"]),
    ("it", &["ita"], &["italian"]),
    ("ja", &["jpn"], &["japanese"]),
    ("ko", &["kor"], &["korean"]),
    ("lt", &["lit"], &["lithuanian"]),
    ("lv", &["lav"], &["latvian"]),
    ("ml", &["mal"], &["malayalam"]),
    ("ms", &["msa", "may"], &["malay"]),
    ("nl", &["nld", "dut"], &["dutch", "flemish"]),
    ("no", &["nor", "nob", "nno"], &["norwegian", "norwegian bokmal"]),
    ("pl", &["pol"], &["polish"]),
    ("pt", &["por"], &["portuguese", "brazilian portuguese", "portuguese (brazil)"]),
    ("ro", &["ron", "rum"], &["romanian"]),
    ("ru", &["rus"], &["russian"]),
    ("sk", &["slk", "slo"], &["slovak"]),
    ("sl", &["slv"], &["slovenian", "slovene"]),
    ("sr", &["srp"], &["serbian"]),
    ("sv", &["swe"], &["swedish"]),
    ("ta", &["tam"], &["tamil"]),
    ("te", &["tel"], &["telugu"]),
    ("th", &["tha"], &["thai"]),
    ("tl", &["tgl", "fil"], &["tagalog", "filipino"]),
    ("tr", &["tur"], &["turkish"]),
    ("uk", &["ukr"], &["ukrainian"]),
    ("ur", &["urd"], &["urdu"]),
    ("vi", &["vie"], &["vietnamese"]),
    ("zh", &["zho", "chi"], &["chinese", "mandarin", "cantonese"]),
];

/// Map a provider language label to an ISO 639-1 code.
///
/// Returns `None` for empty, undetermined (`und`) or unrecognized labels.
#[must_use]
pub fn normalize_language(label: &str) -> Option<&'static str> {
    let label = label.trim().to_lowercase();
    if label.is_empty() {
        return None;
    }

    // "en-US", "pt_BR" -> "en", "pt"
    let primary = label
        .split(['-', '_'])
        .next()
        .unwrap_or(&label)
        .trim();
    if let Some(code) = lookup_code(primary) {
        return Some(code);
    }

    if let Some(code) = lookup_name(&label) {
        return Some(code);
    }

    // "english (forced)", "english - sdh", "english [cc]"
    let stripped = label
        .split(['(', '[', '-', ',', '/'])
        .next()
        .unwrap_or(&label)
        .trim();
    lookup_name(stripped)
}

fn lookup_code(code: &str) -> Option<&'static str> {
    LANGUAGES.iter().find_map(|(iso1, iso2, _)| {
        (*iso1 == code || iso2.contains(&code)).then_some(*iso1)
    })
}

fn lookup_name(name: &str) -> Option<&'static str> {
    LANGUAGES
        .iter()
        .find_map(|(iso1, _, names)| names.contains(&name).then_some(*iso1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iso_codes() {
        assert_eq!(normalize_language("en"), Some("en"));
        assert_eq!(normalize_language("ENG"), Some("en"));
        assert_eq!(normalize_language("ger"), Some("de"));
        assert_eq!(normalize_language("pt-BR"), Some("pt"));
        assert_eq!(normalize_language("zh_Hant"), Some("zh"));
    }

    #[test]
    fn english_names() {
        assert_eq!(normalize_language("English"), Some("en"));
        assert_eq!(normalize_language("  french "), Some("fr"));
        assert_eq!(normalize_language("Portuguese (Brazil)"), Some("pt"));
    }

    #[test]
    fn qualified_labels() {
        assert_eq!(normalize_language("English (forced)"), Some("en"));
        assert_eq!(normalize_language("Spanish - SDH"), Some("es"));
        assert_eq!(normalize_language("Dutch [CC]"), Some("nl"));
    }

    #[test]
    fn unknown_labels() {
        assert_eq!(normalize_language(""), None);
        assert_eq!(normalize_language("und"), None);
        assert_eq!(normalize_language("Klingon"), None);
    }
}
