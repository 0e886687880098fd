// SPDX-FileCopyrightText: 2026 Civiq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Correlation address encoding and decoding.
//!
//! Replies are routed back to their request by embedding the request id in
//! the reply-to address: `<slugified-name>.<id>@<domain>`. Decoding scans
//! the comma-separated recipients of an inbound `To` header, keeps those
//! whose addr-spec ends in `(.|-)<digits>@<domain>`, and extracts the id
//! from the first one in header order. If several recipients match, only
//! the first is authoritative.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

/// Transliteration table folding accented and non-Latin characters to ASCII,
/// built once per process and read-only afterwards.
static DOWNCODE: LazyLock<HashMap<char, &'static str>> = LazyLock::new(|| {
    let mut map = HashMap::new();
    for (from, to) in LATIN
        .iter()
        .chain(POLISH)
        .chain(CZECH)
        .chain(LATVIAN)
        .chain(TURKISH)
        .chain(CYRILLIC)
    {
        map.insert(*from, *to);
    }
    map
});

#[rustfmt::skip]
const LATIN: &[(char, &str)] = &[
    ('À', "A"), ('Á', "A"), ('Â', "A"), ('Ã', "A"), ('Ä', "A"), ('Å', "A"), ('Æ', "AE"),
    ('Ç', "C"), ('È', "E"), ('É', "E"), ('Ê', "E"), ('Ë', "E"), ('Ì', "I"), ('Í', "I"),
    ('Î', "I"), ('Ï', "I"), ('Ð', "D"), ('Ñ', "N"), ('Ò', "O"), ('Ó', "O"), ('Ô', "O"),
    ('Õ', "O"), ('Ö', "O"), ('Ø', "O"), ('Ù', "U"), ('Ú', "U"), ('Û', "U"), ('Ü', "U"),
    ('Ý', "Y"), ('Þ', "TH"), ('ß', "ss"),
    ('à', "a"), ('á', "a"), ('â', "a"), ('ã', "a"), ('ä', "a"), ('å', "a"), ('æ', "ae"),
    ('ç', "c"), ('è', "e"), ('é', "e"), ('ê', "e"), ('ë', "e"), ('ì', "i"), ('í', "i"),
    ('î', "i"), ('ï', "i"), ('ð', "d"), ('ñ', "n"), ('ò', "o"), ('ó', "o"), ('ô', "o"),
    ('õ', "o"), ('ö', "o"), ('ø', "o"), ('ù', "u"), ('ú', "u"), ('û', "u"), ('ü', "u"),
    ('ý', "y"), ('þ', "th"), ('ÿ', "y"),
];

#[rustfmt::skip]
const POLISH: &[(char, &str)] = &[
    ('ą', "a"), ('ć', "c"), ('ę', "e"), ('ł', "l"), ('ń', "n"), ('ś', "s"),
    ('ź', "z"), ('ż', "z"),
    ('Ą', "A"), ('Ć', "C"), ('Ę', "E"), ('Ł', "L"), ('Ń', "N"), ('Ś', "S"),
    ('Ź', "Z"), ('Ż', "Z"),
];

#[rustfmt::skip]
const CZECH: &[(char, &str)] = &[
    ('č', "c"), ('ď', "d"), ('ě', "e"), ('ň', "n"), ('ř', "r"), ('š', "s"),
    ('ť', "t"), ('ů', "u"), ('ž', "z"),
    ('Č', "C"), ('Ď', "D"), ('Ě', "E"), ('Ň', "N"), ('Ř', "R"), ('Š', "S"),
    ('Ť', "T"), ('Ů', "U"), ('Ž', "Z"),
];

#[rustfmt::skip]
const LATVIAN: &[(char, &str)] = &[
    ('ā', "a"), ('ē', "e"), ('ģ', "g"), ('ī', "i"), ('ķ', "k"), ('ļ', "l"),
    ('ņ', "n"), ('ū', "u"),
    ('Ā', "A"), ('Ē', "E"), ('Ģ', "G"), ('Ī', "I"), ('Ķ', "K"), ('Ļ', "L"),
    ('Ņ', "N"), ('Ū', "U"),
];

#[rustfmt::skip]
const TURKISH: &[(char, &str)] = &[
    ('ş', "s"), ('Ş', "S"), ('ı', "i"), ('İ', "I"), ('ğ', "g"), ('Ğ', "G"),
];

#[rustfmt::skip]
const CYRILLIC: &[(char, &str)] = &[
    ('а', "a"), ('б', "b"), ('в', "v"), ('г', "g"), ('д', "d"), ('е', "e"), ('ё', "yo"),
    ('ж', "zh"), ('з', "z"), ('и', "i"), ('й', "j"), ('к', "k"), ('л', "l"), ('м', "m"),
    ('н', "n"), ('о', "o"), ('п', "p"), ('р', "r"), ('с', "s"), ('т', "t"), ('у', "u"),
    ('ф', "f"), ('х', "h"), ('ц', "c"), ('ч', "ch"), ('ш', "sh"), ('щ', "sh"), ('ъ', ""),
    ('ы', "y"), ('ь', ""), ('э', "e"), ('ю', "yu"), ('я', "ya"),
    ('А', "A"), ('Б', "B"), ('В', "V"), ('Г', "G"), ('Д', "D"), ('Е', "E"), ('Ё', "Yo"),
    ('Ж', "Zh"), ('З', "Z"), ('И', "I"), ('Й', "J"), ('К', "K"), ('Л', "L"), ('М', "M"),
    ('Н', "N"), ('О', "O"), ('П', "P"), ('Р', "R"), ('С', "S"), ('Т', "T"), ('У', "U"),
    ('Ф', "F"), ('Х', "H"), ('Ц', "C"), ('Ч', "Ch"), ('Ш', "Sh"), ('Щ', "Sh"), ('Ъ', ""),
    ('Ы', "Y"), ('Ь', ""), ('Э', "E"), ('Ю', "Yu"), ('Я', "Ya"),
];

/// Fold a multilingual string to its closest ASCII representation.
pub fn downcode(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match DOWNCODE.get(&ch) {
            Some(replacement) => out.push_str(replacement),
            None => out.push(ch),
        }
    }
    out
}

/// Transliterate and reduce to a lowercase dash-separated slug suitable for
/// an address local part.
pub fn slugify(input: &str) -> String {
    let folded = downcode(input).to_lowercase();
    let mut slug = String::with_capacity(folded.len());
    let mut pending_dash = false;
    for ch in folded.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(ch);
        } else {
            pending_dash = true;
        }
    }
    slug
}

/// Encoder/decoder for correlation reply addresses on one mail domain.
///
/// The recipient pattern is compiled once at construction and the codec is
/// shared by reference afterwards.
#[derive(Debug, Clone)]
pub struct AddressCodec {
    domain: String,
    pattern: Regex,
}

impl AddressCodec {
    pub fn new(domain: &str) -> Self {
        // Delimiters include dash and dot; anchored at end of the addr-spec.
        let pattern = Regex::new(&format!(r"(\-|\.)\d+@{}$", regex::escape(domain)))
            .unwrap_or_else(|e| unreachable!("escaped domain pattern is always valid: {e}"));
        Self {
            domain: domain.to_string(),
            pattern,
        }
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Build the correlation reply address for a request, dot-delimited.
    pub fn encode(&self, requester_name: &str, request_id: i64) -> String {
        self.encode_with_delimiter(requester_name, request_id, '.')
    }

    /// Build the correlation reply address with an explicit delimiter
    /// (`.` or `-`).
    pub fn encode_with_delimiter(
        &self,
        requester_name: &str,
        request_id: i64,
        delimiter: char,
    ) -> String {
        format!(
            "{}{}{}@{}",
            slugify(requester_name),
            delimiter,
            request_id,
            self.domain
        )
    }

    /// The first recipient addr-spec carrying a correlation token, in header
    /// order. If several recipients match, only this one is authoritative.
    pub fn matched_address<'a>(&self, to_header: &'a str) -> Option<&'a str> {
        to_header
            .split(',')
            .map(str::trim)
            .map(addr_spec)
            .find(|spec| self.pattern.is_match(spec))
    }

    /// Recover the request id from an inbound `To` header value.
    ///
    /// Returns `None` when no recipient carries a correlation token; the
    /// caller treats that as unroutable mail, not as an error.
    pub fn decode(&self, to_header: &str) -> Option<i64> {
        let candidate = self.matched_address(to_header)?;

        let (local, _) = candidate.rsplit_once('@')?;
        // Both delimiter styles are tried, dot first, matching the encoder's
        // preference.
        for delimiter in ['.', '-'] {
            if let Some((_, digits)) = local.rsplit_once(delimiter)
                && let Ok(id) = digits.parse::<i64>()
            {
                return Some(id);
            }
        }
        None
    }
}

/// Extract the addr-spec from a recipient that may carry a display name,
/// e.g. `Jane Doe <jane.doe.417@example.org>`.
fn addr_spec(recipient: &str) -> &str {
    match (recipient.rfind('<'), recipient.rfind('>')) {
        (Some(start), Some(end)) if start < end => &recipient[start + 1..end],
        _ => recipient,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn encodes_with_slug_and_dot() {
        let codec = AddressCodec::new("example.org");
        assert_eq!(codec.encode("Jane Doe", 417), "jane-doe.417@example.org");
    }

    #[test]
    fn encodes_with_dash_delimiter() {
        let codec = AddressCodec::new("example.org");
        assert_eq!(
            codec.encode_with_delimiter("Jane Doe", 417, '-'),
            "jane-doe-417@example.org"
        );
    }

    #[test]
    fn slugify_transliterates() {
        assert_eq!(slugify("Łukasz Żółty"), "lukasz-zolty");
        assert_eq!(slugify("Müller & Söhne"), "muller-sohne");
    }

    #[test]
    fn decodes_plain_address() {
        let codec = AddressCodec::new("example.org");
        assert_eq!(codec.decode("jane.doe.417@example.org"), Some(417));
        assert_eq!(codec.decode("jane-doe-417@example.org"), Some(417));
    }

    #[test]
    fn decodes_display_name_form() {
        let codec = AddressCodec::new("example.org");
        assert_eq!(
            codec.decode("Jane Doe <jane.doe.417@example.org>, spam@other.org"),
            Some(417)
        );
    }

    #[test]
    fn first_matching_recipient_wins() {
        let codec = AddressCodec::new("example.org");
        assert_eq!(
            codec.decode("a.1@example.org, b.2@example.org"),
            Some(1)
        );
        assert_eq!(
            codec.decode("spam@other.org, b.2@example.org, a.1@example.org"),
            Some(2)
        );
    }

    #[test]
    fn rejects_foreign_domain_and_plain_addresses() {
        let codec = AddressCodec::new("example.org");
        assert_eq!(codec.decode("jane.doe.417@other.org"), None);
        assert_eq!(codec.decode("info@example.org"), None);
        assert_eq!(codec.decode(""), None);
    }

    #[test]
    fn rejects_domain_suffix_spoof() {
        let codec = AddressCodec::new("example.org");
        // evil-example.org must not satisfy the example.org pattern: the
        // delimiter+digits run immediately precedes the @.
        assert_eq!(codec.decode("jane.417@evil-example.org"), None);
    }

    #[test]
    fn mixed_delimiters_resolve_to_trailing_run() {
        let codec = AddressCodec::new("example.org");
        assert_eq!(codec.decode("jane.doe-417@example.org"), Some(417));
    }

    proptest! {
        #[test]
        fn round_trips_for_both_delimiters(
            name in "[A-Za-z]{1,12}( [A-Za-z]{1,12})?",
            id in 1i64..1_000_000,
            dotted in proptest::bool::ANY,
        ) {
            let codec = AddressCodec::new("example.org");
            let delimiter = if dotted { '.' } else { '-' };
            let encoded = codec.encode_with_delimiter(&name, id, delimiter);
            prop_assert_eq!(codec.decode(&encoded), Some(id));
        }
    }
}
