//! Scripture index codec.
//!
//! A scripture index is the composite key stored in `scriptures.scriptureIndex`:
//!
//! ```text
//! (Song of Solomon 2:1-3 WEBUS)
//!  └──── book ───┘ │ └┬┘ └─┬─┘
//!            chapter verses version
//! ```
//!
//! Inside the crate the index travels as a typed [`ScriptureRef`]; the legacy
//! string form is produced and parsed only where rows are read or written.
//! Book names map to the three-letter codes used by the passage API, e.g.
//! `1 John 4:8` becomes `1JN.4.8`.

use std::fmt;

use crate::error::ReferenceError;

/// English book name → passage API code.
const BOOK_CODES: &[(&str, &str)] = &[
    ("Genesis", "GEN"),
    ("Exodus", "EXO"),
    ("Leviticus", "LEV"),
    ("Numbers", "NUM"),
    ("Deuteronomy", "DEU"),
    ("Joshua", "JOS"),
    ("Judges", "JDG"),
    ("Ruth", "RUT"),
    ("1 Samuel", "1SA"),
    ("2 Samuel", "2SA"),
    ("1 Kings", "1KI"),
    ("2 Kings", "2KI"),
    ("1 Chronicles", "1CH"),
    ("2 Chronicles", "2CH"),
    ("Ezra", "EZR"),
    ("Nehemiah", "NEH"),
    ("Esther", "EST"),
    ("Job", "JOB"),
    ("Psalms", "PSA"),
    ("Proverbs", "PRO"),
    ("Ecclesiastes", "ECC"),
    ("Song of Solomon", "SNG"),
    ("Isaiah", "ISA"),
    ("Jeremiah", "JER"),
    ("Lamentations", "LAM"),
    ("Ezekiel", "EZK"),
    ("Daniel", "DAN"),
    ("Hosea", "HOS"),
    ("Joel", "JOL"),
    ("Amos", "AMO"),
    ("Obadiah", "OBA"),
    ("Jonah", "JON"),
    ("Micah", "MIC"),
    ("Nahum", "NAM"),
    ("Habakkuk", "HAB"),
    ("Zephaniah", "ZEP"),
    ("Haggai", "HAG"),
    ("Zechariah", "ZEC"),
    ("Malachi", "MAL"),
    ("Matthew", "MAT"),
    ("Mark", "MRK"),
    ("Luke", "LUK"),
    ("John", "JHN"),
    ("Acts", "ACT"),
    ("Romans", "ROM"),
    ("1 Corinthians", "1CO"),
    ("2 Corinthians", "2CO"),
    ("Galatians", "GAL"),
    ("Ephesians", "EPH"),
    ("Philippians", "PHP"),
    ("Colossians", "COL"),
    ("1 Thessalonians", "1TH"),
    ("2 Thessalonians", "2TH"),
    ("1 Timothy", "1TI"),
    ("2 Timothy", "2TI"),
    ("Titus", "TIT"),
    ("Philemon", "PHM"),
    ("Hebrews", "HEB"),
    ("James", "JAS"),
    ("1 Peter", "1PE"),
    ("2 Peter", "2PE"),
    ("1 John", "1JN"),
    ("2 John", "2JN"),
    ("3 John", "3JN"),
    ("Jude", "JUD"),
    ("Revelation", "REV"),
];

/// An index split into its three textual parts, before the verse is interpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decomposed {
    pub book: String,
    pub chapter_verse: String,
    pub version: String,
}

/// A single verse or a `start-end` range within one chapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerseSpan {
    Single(String),
    Range { start: String, end: String },
}

impl fmt::Display for VerseSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VerseSpan::Single(v) => write!(f, "{}", v),
            VerseSpan::Range { start, end } => write!(f, "{}-{}", start, end),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapterVerse {
    pub chapter: String,
    pub verses: VerseSpan,
}

/// Split an index into book, `chapter:verse`, and version tag.
///
/// Parentheses are dropped and the remainder is split on whitespace: the last
/// token is the version, the one before it the chapter and verse, and all
/// earlier tokens (joined with single spaces) the book name.
pub fn decompose(index: &str) -> Result<Decomposed, ReferenceError> {
    let cleaned = index.replace(['(', ')'], " ");
    let mut tokens: Vec<&str> = cleaned.split_whitespace().collect();
    if tokens.len() < 3 {
        return Err(ReferenceError::Parse(index.to_string()));
    }

    let version = tokens.pop().unwrap_or_default().to_string();
    let chapter_verse = tokens.pop().unwrap_or_default().to_string();
    let book = tokens.join(" ");

    Ok(Decomposed {
        book,
        chapter_verse,
        version,
    })
}

/// Split `3:16` or `13:34-35` into chapter and verse span.
pub fn split_verse(chapter_verse: &str) -> Result<ChapterVerse, ReferenceError> {
    let parse_err = || ReferenceError::Parse(chapter_verse.to_string());

    let (chapter, verse) = chapter_verse.split_once(':').ok_or_else(parse_err)?;
    if chapter.is_empty() || verse.is_empty() {
        return Err(parse_err());
    }

    let verses = match verse.split_once('-') {
        Some((start, end)) if is_number(start) && is_number(end) => VerseSpan::Range {
            start: start.to_string(),
            end: end.to_string(),
        },
        _ => VerseSpan::Single(verse.to_string()),
    };

    Ok(ChapterVerse {
        chapter: chapter.to_string(),
        verses,
    })
}

fn is_number(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

/// Look up the passage API code for an English book name. Exact match only.
pub fn book_code(book: &str) -> Result<&'static str, ReferenceError> {
    BOOK_CODES
        .iter()
        .find(|(name, _)| *name == book)
        .map(|(_, code)| *code)
        .ok_or_else(|| ReferenceError::UnknownBook(book.to_string()))
}

/// `JHN.3.16`, or `JHN.13.34-JHN.13.35` for a range.
pub fn api_reference(code: &str, chapter: &str, verses: &VerseSpan) -> String {
    match verses {
        VerseSpan::Single(v) => format!("{}.{}.{}", code, chapter, v),
        VerseSpan::Range { start, end } => format!(
            "{code}.{chapter}.{start}-{code}.{chapter}.{end}",
            code = code,
            chapter = chapter,
            start = start,
            end = end
        ),
    }
}

/// Inverse of [`decompose`]: `(<book> <chapter>:<verse> <version>)`.
pub fn compose_index(book: &str, chapter: &str, verse: &str, version: &str) -> String {
    format!("({} {}:{} {})", book, chapter, verse, version)
}

/// Typed form of a scripture index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptureRef {
    pub book: String,
    pub chapter: String,
    pub verses: VerseSpan,
    pub version: String,
}

impl ScriptureRef {
    pub fn parse(index: &str) -> Result<Self, ReferenceError> {
        let parts = decompose(index)?;
        let cv = split_verse(&parts.chapter_verse)?;
        Ok(Self {
            book: parts.book,
            chapter: cv.chapter,
            verses: cv.verses,
            version: parts.version,
        })
    }

    /// Same passage in another translation.
    pub fn with_version(&self, version: &str) -> Self {
        Self {
            version: version.to_string(),
            ..self.clone()
        }
    }

    /// The legacy string form stored in the `scriptures` table.
    pub fn to_index(&self) -> String {
        compose_index(
            &self.book,
            &self.chapter,
            &self.verses.to_string(),
            &self.version,
        )
    }

    /// Passage API reference, failing for books outside the code table.
    pub fn api_reference(&self) -> Result<String, ReferenceError> {
        let code = book_code(&self.book)?;
        Ok(api_reference(code, &self.chapter, &self.verses))
    }
}

impl fmt::Display for ScriptureRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_index())
    }
}

/// Trailing token of an index with the closing parenthesis removed, e.g. `WEBUS`.
pub fn version_tag(index: &str) -> Option<&str> {
    index
        .trim_end()
        .trim_end_matches(')')
        .split_whitespace()
        .last()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decompose_multi_word_number_book() {
        let parts = decompose("(1 John 4:8 WEBUS)").unwrap();
        assert_eq!(parts.book, "1 John");
        assert_eq!(parts.chapter_verse, "4:8");
        assert_eq!(parts.version, "WEBUS");

        let r = ScriptureRef::parse("(1 John 4:8 WEBUS)").unwrap();
        assert_eq!(r.chapter, "4");
        assert_eq!(r.verses, VerseSpan::Single("8".to_string()));
        assert_eq!(book_code(&r.book).unwrap(), "1JN");
        assert_eq!(r.api_reference().unwrap(), "1JN.4.8");
    }

    #[test]
    fn test_song_of_solomon_range() {
        let parts = decompose("(Song of Solomon 2:1-3 WEBUS)").unwrap();
        assert_eq!(parts.book, "Song of Solomon");
        assert_eq!(parts.chapter_verse, "2:1-3");

        let r = ScriptureRef::parse("(Song of Solomon 2:1-3 WEBUS)").unwrap();
        assert_eq!(
            r.verses,
            VerseSpan::Range {
                start: "1".to_string(),
                end: "3".to_string()
            }
        );
        assert_eq!(r.api_reference().unwrap(), "SNG.2.1-SNG.2.3");
    }

    #[test]
    fn test_decompose_too_few_tokens() {
        assert_eq!(
            decompose("(3:16 WEBUS)"),
            Err(ReferenceError::Parse("(3:16 WEBUS)".to_string()))
        );
        assert!(decompose("").is_err());
    }

    #[test]
    fn test_split_verse_requires_colon() {
        assert!(split_verse("316").is_err());
        assert!(split_verse(":16").is_err());
        assert!(split_verse("3:").is_err());
    }

    #[test]
    fn test_split_verse_non_numeric_range_is_single() {
        let cv = split_verse("3:16a-b").unwrap();
        assert_eq!(cv.verses, VerseSpan::Single("16a-b".to_string()));
    }

    #[test]
    fn test_unknown_book_is_error() {
        assert_eq!(
            book_code("Tobit"),
            Err(ReferenceError::UnknownBook("Tobit".to_string()))
        );
        // lookup is case-sensitive
        assert!(book_code("john").is_err());
        let r = ScriptureRef::parse("(Tobit 4:15 WEBUS)").unwrap();
        assert!(r.api_reference().is_err());
    }

    #[test]
    fn test_round_trip() {
        let cases = [
            ("John", "3", "16", "WEBUS"),
            ("Song of Solomon", "8", "6-7", "REINAVAL"),
            ("1 Corinthians", "13", "4", "FSPAN"),
            ("Psalms", "23", "1-6", "WEBUS"),
        ];
        for (book, chapter, verse, version) in cases {
            let index = compose_index(book, chapter, verse, version);
            let r = ScriptureRef::parse(&index).unwrap();
            assert_eq!(r.book, book);
            assert_eq!(r.chapter, chapter);
            assert_eq!(r.verses.to_string(), verse);
            assert_eq!(r.version, version);
            assert_eq!(r.to_index(), index);
        }
    }

    #[test]
    fn test_round_trip_ignores_extra_whitespace() {
        let r = ScriptureRef::parse("(  Song  of Solomon   2:1   WEBUS )").unwrap();
        assert_eq!(r.to_index(), "(Song of Solomon 2:1 WEBUS)");
    }

    #[test]
    fn test_with_version() {
        let r = ScriptureRef::parse("(John 3:16 WEBUS)").unwrap();
        assert_eq!(r.with_version("REINAVAL").to_index(), "(John 3:16 REINAVAL)");
    }

    #[test]
    fn test_every_book_has_three_char_code() {
        assert_eq!(BOOK_CODES.len(), 66);
        for (name, code) in BOOK_CODES {
            assert_eq!(code.len(), 3, "{}", name);
        }
    }

    #[test]
    fn test_version_tag() {
        assert_eq!(version_tag("(John 3:16 WEBUS)"), Some("WEBUS"));
        assert_eq!(version_tag("(John 3:16 FSPAN )"), Some("FSPAN"));
        assert_eq!(version_tag("   "), None);
    }
}
