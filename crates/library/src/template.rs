//! Naming patterns for library files.
//!
//! Converts a [`BookFile`](crate::models::BookFile)'s metadata into a relative path using a
//! user-configured pattern rendered by [upon]. Patterns use single braces for
//! placeholders and `{% %}` for blocks, so that the common case reads
//! naturally:
//!
//! ```text
//! {authors}/{% if series %}{series}/{seriesIndex} - {% endif %}{title}
//! ```
//!
//! Two library-specific extensions are registered:
//!
//! - **`slug`**: converts strings to URL-safe slugs, stripping quotation marks
//!   first to avoid artifacts like leading/trailing hyphens.
//! - **`truncate`**: truncates strings to a maximum byte length at a character
//!   boundary, usable as either `truncate(value, n)` or `{value|truncate: n}`.
//!
//! # Placeholders
//!
//! | Placeholder       | Description                                           |
//! |-------------------|-------------------------------------------------------|
//! | `title`           | Book title                                            |
//! | `subtitle`        | Book subtitle                                         |
//! | `authors`         | All authors, comma-separated                          |
//! | `author`          | First author                                          |
//! | `series`          | Series name                                           |
//! | `seriesIndex`     | Position in the series (`3`, or `3.5`)                |
//! | `year`            | Publication year                                      |
//! | `language`        | Language                                              |
//! | `publisher`       | Publisher                                             |
//! | `isbn`            | ISBN                                                  |
//! | `currentFilename` | The file's current name, extension included           |
//! | `extension`       | The file's current extension, without the dot         |
//!
//! A book without a title renders `title` as `Untitled`, and one without
//! authors renders `authors` and `author` as `Unknown Author`. Other missing
//! values render as empty strings (and are falsy in `{% if %}` blocks), as do
//! placeholders that aren't in the table. Values are stripped of characters
//! that aren't allowed in filenames on common filesystems, including path
//! separators, so metadata can never introduce extra directories.
//!
//! # Optional blocks
//!
//! Text wrapped in `<` and `>` is kept only if every placeholder inside it
//! has a value, so `{authors}/<{series}/><{seriesIndex} - >{title}` drops
//! the series directory and index prefix for standalone books. Blocks don't
//! nest; a `<` without a matching `>` is literal text.
//!
//! # Example
//!
//! ```
//! use tome_library::PathGenerator;
//! use tome_library::models::BookMetadata;
//!
//! let metadata = BookMetadata {
//!     title: Some("Title".into()),
//!     authors: vec!["J. Doe".into()],
//!     ..Default::default()
//! };
//! let generator: PathGenerator = "{author}/{title}".parse().unwrap();
//! let path = generator.generate(&metadata, "book.pdf").unwrap();
//! assert_eq!(path, "J. Doe/Title.pdf");
//! ```

use crate::error::{Error, ErrorKind, Result};
use crate::models::{BookMetadata, Library};
use exn::{OptionExt, ResultExt};
use std::borrow::Cow;
use std::collections::BTreeSet;
use std::path::Path;
use std::str::FromStr;
use tome_storage::validate_path;
use tracing::instrument;
use upon::{Engine, Syntax, Template, Value};

/// Used when neither the library nor the global settings name a pattern:
/// files keep their names and move to the library root.
pub const FALLBACK_PATTERN: &str = "{currentFilename}";

const PLACEHOLDERS: [&str; 12] = [
    "title",
    "subtitle",
    "authors",
    "author",
    "series",
    "seriesIndex",
    "year",
    "language",
    "publisher",
    "isbn",
    "currentFilename",
    "extension",
];
const UNKNOWN_AUTHOR: &str = "Unknown Author";
const UNTITLED: &str = "Untitled";
/// Prefix of the flags that switch optional blocks on and off.
const OPTIONAL_FLAG: &str = "optional_block_";

/// Picks the pattern that applies to a library: its own override, else the
/// global default, else [`FALLBACK_PATTERN`]. Blank patterns count as unset.
///
/// A pattern ending in a path separator names a directory, so the current
/// filename is appended to it.
pub fn effective_pattern<'a>(library: &'a Library, default: Option<&'a str>) -> Cow<'a, str> {
    let pattern = library
        .naming_pattern
        .as_deref()
        .filter(|p| !p.trim().is_empty())
        .or(default.filter(|p| !p.trim().is_empty()))
        .unwrap_or(FALLBACK_PATTERN);
    if pattern.ends_with('/') || pattern.ends_with('\\') {
        Cow::Owned(format!("{pattern}{FALLBACK_PATTERN}"))
    } else {
        Cow::Borrowed(pattern)
    }
}

/// Generates deterministic relative paths from [`BookMetadata`] and a
/// user-defined pattern.
///
/// Constructed via [`FromStr`], which compiles the pattern eagerly so that
/// syntax errors surface at creation time rather than at render time. The
/// compiled template is reusable across many [`generate`](Self::generate) calls.
///
/// Generated paths are normalized (trimmed, empty segments dropped) and
/// validated by [`tome_storage::validate_path`] to prevent directory traversal.
pub struct PathGenerator {
    engine: Engine<'static>,
    template: Template<'static>,
    /// Variables referenced by each optional block, in flag order.
    optional: Vec<BTreeSet<String>>,
    /// Referenced variables that aren't placeholders; they render empty.
    unknown: BTreeSet<String>,
}
impl FromStr for PathGenerator {
    type Err = Error;

    /// Compiles the given pattern into a reusable [`PathGenerator`].
    ///
    /// Returns [`ErrorKind::Template`] if the pattern syntax is invalid.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let syntax = Syntax::builder().expr("{", "}").block("{%", "%}").build();
        let mut engine = Engine::with_syntax(syntax);
        addons::configure(&mut engine);
        let (source, optional) = expand_optional_blocks(s);
        let unknown = variables(s)
            .into_iter()
            .filter(|name| !PLACEHOLDERS.contains(&name.as_str()))
            .collect();
        // Compile the template early so we can fail-fast in construction.
        let template = engine.compile(source).or_raise(|| ErrorKind::Template)?;
        Ok(Self {
            engine,
            template,
            optional,
            unknown,
        })
    }
}
impl PathGenerator {
    /// Renders the pattern for a file currently called `current_filename`,
    /// returning a relative, `/`-separated path including the filename.
    ///
    /// - A render that produces nothing (or only separators) falls back to
    ///   `current_filename`, as does a filename with nothing before its
    ///   extension.
    /// - The current extension is appended unless the rendered filename
    ///   already ends with it (compared case-insensitively).
    #[instrument(skip_all, fields(current_filename = current_filename))]
    pub fn generate(&self, metadata: &BookMetadata, current_filename: &str) -> Result<String> {
        let extension = Path::new(current_filename)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();
        let rendered = self
            .template
            .render(&self.engine, self.context(metadata, current_filename, extension))
            .to_string()
            .or_raise(|| ErrorKind::Template)?;

        let mut segments = Self::segments(&rendered);
        match segments.last() {
            None => segments.push(sanitize(current_filename)),
            Some(last) if Self::stem_is_empty(last, extension) => {
                segments.pop();
                segments.push(sanitize(current_filename));
            },
            Some(_) => {},
        }
        if let Some(last) = segments.last_mut()
            && !extension.is_empty()
            && strip_extension(last, extension).is_none()
        {
            last.push('.');
            last.push_str(extension);
        }
        Self::normalize(segments.join("/"))
    }

    /// Trimmed, non-empty path segments. Both separators are accepted since
    /// patterns may have been written on Windows.
    fn segments(rendered: &str) -> Vec<String> {
        rendered
            .split(['/', '\\'])
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }

    fn stem_is_empty(filename: &str, extension: &str) -> bool {
        let stem = strip_extension(filename, extension).unwrap_or(filename);
        stem.trim().trim_matches('.').is_empty()
    }

    /// Validates via [`tome_storage::validate_path`], which rejects anything
    /// that would leave the library root.
    fn normalize(path: String) -> Result<String> {
        validate_path(&path).or_raise(|| ErrorKind::Template).and_then(|p| {
            p.to_str()
                .map(|p| p.to_string())
                // Infallible: input was String, so won't fail. Here for completeness.
                .ok_or_raise(|| ErrorKind::Template)
        })
    }

    /// The placeholders, plus an empty string for every unknown variable and
    /// the on/off flag of every optional block.
    fn context(&self, metadata: &BookMetadata, current_filename: &str, extension: &str) -> Value {
        let mut context = Self::parameters(metadata, current_filename, extension);
        if let Value::Map(map) = &mut context {
            for name in &self.unknown {
                map.insert(name.clone(), Value::String(String::new()));
            }
            let flags: Vec<bool> = self
                .optional
                .iter()
                .map(|names| {
                    names
                        .iter()
                        .all(|name| matches!(map.get(name), Some(Value::String(v)) if !v.trim().is_empty()))
                })
                .collect();
            for (index, present) in flags.into_iter().enumerate() {
                map.insert(format!("{OPTIONAL_FLAG}{index}"), Value::Bool(present));
            }
        }
        context
    }

    /// Builds the [`upon::Value`] map exposed to the template engine. Every
    /// value is a (possibly empty) string.
    fn parameters(metadata: &BookMetadata, current_filename: &str, extension: &str) -> Value {
        let text = |value: &Option<String>| value.as_deref().map(sanitize).unwrap_or_default();
        let authors: Vec<String> = metadata
            .authors
            .iter()
            .map(|a| sanitize(a))
            .filter(|a| !a.is_empty())
            .collect();
        let title = Some(text(&metadata.title))
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| UNTITLED.to_string());
        let (all_authors, author) = match authors.first() {
            Some(first) => (authors.join(", "), first.clone()),
            None => (UNKNOWN_AUTHOR.to_string(), UNKNOWN_AUTHOR.to_string()),
        };
        upon::value! {
            title: title,
            subtitle: text(&metadata.subtitle),
            authors: all_authors,
            author: author,
            series: text(&metadata.series),
            seriesIndex: metadata.series_index.map(format_series_index).unwrap_or_default(),
            year: metadata.year.map(|y| y.to_string()).unwrap_or_default(),
            language: text(&metadata.language),
            publisher: text(&metadata.publisher),
            isbn: text(&metadata.isbn),
            currentFilename: sanitize(current_filename),
            extension: extension,
        }
    }
}

/// Rewrites every `<...>` block into `{% if optional_block_N %}...{% endif %}`
/// and returns the variables each block references.
fn expand_optional_blocks(pattern: &str) -> (String, Vec<BTreeSet<String>>) {
    let mut source = String::with_capacity(pattern.len());
    let mut optional = Vec::new();
    let mut rest = pattern;
    while let Some(start) = rest.find('<') {
        source.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        match after.find(['<', '>']) {
            Some(end) if end > 0 && after[end..].starts_with('>') => {
                let block = &after[..end];
                source.push_str(&format!("{{% if {OPTIONAL_FLAG}{} %}}{block}{{% endif %}}", optional.len()));
                optional.push(variables(block));
                rest = &after[end + 1..];
            },
            _ => {
                source.push('<');
                rest = after;
            },
        }
    }
    source.push_str(rest);
    (source, optional)
}

/// Names of the variables read by the expressions and blocks in `source`.
/// Filters, function names, keywords, literals and field accesses are left
/// out.
fn variables(source: &str) -> BTreeSet<String> {
    const KEYWORDS: [&str; 13] = [
        "if", "not", "else", "endif", "for", "in", "endfor", "with", "as", "endwith", "include", "true", "false",
    ];
    let mut names = BTreeSet::new();
    let mut rest = source;
    while let Some(open) = rest.find('{') {
        let inner = &rest[open + 1..];
        let (body, close) = match inner.strip_prefix('%') {
            Some(block) => (block, "%}"),
            None => (inner, "}"),
        };
        let Some(end) = body.find(close) else { break };
        let expression = &body[..end];
        rest = &body[end + close.len()..];

        let chars: Vec<char> = expression.chars().collect();
        let mut i = 0;
        let mut previous = ' ';
        while i < chars.len() {
            let c = chars[i];
            if c == '"' {
                i += chars[i + 1..].iter().position(|&q| q == '"').map_or(chars.len(), |p| p + 2);
                previous = '"';
            } else if c.is_ascii_alphanumeric() || c == '_' {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                let word: String = chars[start..i].iter().collect();
                let next = chars[i..].iter().find(|c| !c.is_whitespace()).copied();
                let is_variable = !c.is_ascii_digit()
                    && !matches!(previous, '|' | '.')
                    && next != Some('(')
                    && !KEYWORDS.contains(&word.as_str());
                if is_variable {
                    names.insert(word);
                }
                previous = 'a';
            } else {
                if !c.is_whitespace() {
                    previous = c;
                }
                i += 1;
            }
        }
    }
    names
}

/// `filename` without its `.extension` suffix, if it has one. Extensions
/// compare ASCII case-insensitively.
fn strip_extension<'a>(filename: &'a str, extension: &str) -> Option<&'a str> {
    let split = filename.len().checked_sub(extension.len() + 1)?;
    let (stem, suffix) = (filename.get(..split)?, filename.get(split..)?);
    let matches = suffix.starts_with('.') && suffix[1..].eq_ignore_ascii_case(extension);
    matches.then_some(stem)
}

/// `3.0` renders as `3`, `3.5` as `3.5`.
fn format_series_index(index: f64) -> String {
    if index.fract() == 0.0 && index.is_finite() {
        format!("{index:.0}")
    } else {
        index.to_string()
    }
}

/// Removes characters that can't appear in a filename on common filesystems
/// (separators included) and trims whitespace. A value made only of dots
/// would be read as a relative directory reference, so it becomes empty.
pub(crate) fn sanitize(value: &str) -> String {
    let cleaned: String = value
        .chars()
        .filter(|c| !matches!(c, '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|') && !c.is_control())
        .collect();
    let trimmed = cleaned.trim();
    if trimmed.chars().all(|c| c == '.') {
        String::new()
    } else {
        trimmed.to_string()
    }
}

/// Custom [`upon`] extensions for path-safe string manipulation.
mod addons {
    use rslug::slugify;
    use std::fmt::Write;
    use upon::{Engine, Value, fmt as upon_fmt};

    /// Custom formatter that converts strings to URL-safe slugs.
    ///
    /// Strips quotation marks before slugifying to avoid awkward slug output
    /// like `"hello"` becoming `-hello-`.
    fn slug_formatter(f: &mut upon_fmt::Formatter<'_>, value: &Value) -> upon_fmt::Result {
        match value {
            Value::String(s) => {
                // Various quotation marks: '"''""„"`«»
                let marks = [
                    '\u{0027}', '\u{0022}', '\u{2018}', '\u{2019}', '\u{201C}', '\u{201D}', '\u{201E}', '\u{201B}',
                    '\u{0060}', '\u{00AB}', '\u{00BB}', '\u{2039}', '\u{203A}',
                ];
                let stripped: String = s.chars().filter(|c| !marks.contains(c)).collect();
                write!(f, "{}", slugify!(&stripped))?
            },
            v => upon_fmt::default(f, v)?,
        };
        Ok(())
    }

    /// Truncates a string to a maximum byte length at a character boundary.
    fn truncate_to_char_boundary(s: &str, max_bytes: usize) -> String {
        s[..s.floor_char_boundary(max_bytes)].trim_end().to_string()
    }

    /// Registers the `slug` formatter and `truncate` function on the given engine.
    pub(crate) fn configure(engine: &mut Engine<'_>) {
        engine.add_formatter("slug", slug_formatter);
        engine.add_function("truncate", truncate_to_char_boundary);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use tome_watch::LibraryId;

    fn metadata() -> BookMetadata {
        BookMetadata {
            title: Some("Title".to_string()),
            subtitle: Some("A Subtitle".to_string()),
            authors: vec!["J. Doe".to_string(), "A. N. Other".to_string()],
            series: Some("The Series".to_string()),
            series_index: Some(3.0),
            year: Some(2021),
            language: Some("en".to_string()),
            publisher: Some("Publisher".to_string()),
            isbn: Some("9780000000000".to_string()),
        }
    }

    fn generate(pattern: &str, metadata: &BookMetadata, current: &str) -> String {
        let generator: PathGenerator = pattern.parse().unwrap();
        generator.generate(metadata, current).unwrap()
    }

    #[rstest]
    #[case("{author}/{title}", "J. Doe/Title.pdf")]
    #[case("{authors}/{title}", "J. Doe, A. N. Other/Title.pdf")]
    #[case("{series}/{seriesIndex} - {title}", "The Series/3 - Title.pdf")]
    #[case("{year}/{title} - {subtitle}", "2021/Title - A Subtitle.pdf")]
    #[case("{language}/{publisher}/{isbn}", "en/Publisher/9780000000000.pdf")]
    #[case("{title}.{extension}", "Title.pdf")]
    #[case("{title}.PDF", "Title.PDF")]
    #[case("/{author}//{title}/", "J. Doe/Title/book.pdf")]
    #[case("{currentFilename}", "book.pdf")]
    fn test_placeholders(#[case] pattern: &str, #[case] expected: &str) {
        let pattern = if pattern.ends_with('/') {
            format!("{pattern}{FALLBACK_PATTERN}")
        } else {
            pattern.to_string()
        };
        assert_eq!(generate(&pattern, &metadata(), "book.pdf"), expected);
    }

    #[test]
    fn test_optional_blocks() {
        let pattern = "{author}/{% if series %}{series}/{seriesIndex} - {% endif %}{title}";
        assert_eq!(generate(pattern, &metadata(), "book.pdf"), "J. Doe/The Series/3 - Title.pdf");
        let standalone = BookMetadata {
            series: None,
            series_index: None,
            ..metadata()
        };
        assert_eq!(generate(pattern, &standalone, "book.pdf"), "J. Doe/Title.pdf");
    }

    #[test]
    fn test_fractional_series_index() {
        let metadata = BookMetadata {
            series_index: Some(2.5),
            ..metadata()
        };
        assert_eq!(generate("{seriesIndex}", &metadata, "book.epub"), "2.5.epub");
    }

    #[test]
    fn test_values_cannot_add_directories() {
        let metadata = BookMetadata {
            title: Some("AC/DC: Live?".to_string()),
            authors: vec!["..".to_string()],
            ..Default::default()
        };
        assert_eq!(generate("{author}/{title}", &metadata, "book.pdf"), "Unknown Author/ACDC Live.pdf");
    }

    #[rstest]
    #[case("{series}")]
    #[case("{series}/{subtitle}")]
    #[case("<{series}>")]
    fn test_empty_render_falls_back_to_current_filename(#[case] pattern: &str) {
        let metadata = BookMetadata {
            series: Some("  ".to_string()),
            ..Default::default()
        };
        assert_eq!(generate(pattern, &metadata, "book.pdf"), "book.pdf");
    }

    #[test]
    fn test_empty_stem_falls_back_to_current_filename() {
        let metadata = BookMetadata {
            series: None,
            ..metadata()
        };
        assert_eq!(generate("{author}/{series}.pdf", &metadata, "book.pdf"), "J. Doe/book.pdf");
    }

    #[test]
    fn test_file_without_extension() {
        assert_eq!(generate("{title}", &metadata(), "README"), "Title");
    }

    #[test]
    fn test_slug_and_truncate() {
        let metadata = BookMetadata {
            title: Some("\"Hello\" World's 'Test'".to_string()),
            ..Default::default()
        };
        assert_eq!(generate("{title|slug}", &metadata, "a.epub"), "hello-worlds-test.epub");
        assert_eq!(generate("{truncate(title, 6)|slug}", &metadata, "a.epub"), "hello.epub");
        assert_eq!(generate("{title|truncate: 6}", &metadata, "a.epub"), "Hello.epub");
    }

    #[test]
    fn test_invalid_patterns() {
        assert!("{% if title %}unterminated".parse::<PathGenerator>().is_err());
        assert!("<{% if title %}>{title}".parse::<PathGenerator>().is_err());
    }

    #[rstest]
    #[case("{unknown}/{title}", "Title.pdf")]
    #[case("{author}/{Title}", "J. Doe.pdf")]
    #[case("{% if unknown %}{unknown}/{% endif %}{title}", "Title.pdf")]
    #[case("{author}/<{unknown} - >{title}", "J. Doe/Title.pdf")]
    fn test_unknown_placeholders_render_empty(#[case] pattern: &str, #[case] expected: &str) {
        assert_eq!(generate(pattern, &metadata(), "book.pdf"), expected);
    }

    #[rstest]
    #[case("{authors}/<{series}/>{title}", "J. Doe/Title.pdf")]
    #[case("{author}/<{series}/><{seriesIndex} - >{title}", "J. Doe/Title.pdf")]
    #[case("{author}/<{series} {year}/>{title}", "J. Doe/Title.pdf")]
    #[case("<{title|slug}>", "title.pdf")]
    #[case("{author}/<static/>{title}", "J. Doe/static/Title.pdf")]
    #[case("{title} <3", "Title <3.pdf")]
    fn test_angle_optional_blocks_without_values(#[case] pattern: &str, #[case] expected: &str) {
        let metadata = BookMetadata {
            title: Some("Title".to_string()),
            authors: vec!["J. Doe".to_string()],
            year: Some(2021),
            ..Default::default()
        };
        assert_eq!(generate(pattern, &metadata, "book.pdf"), expected);
    }

    #[test]
    fn test_angle_optional_blocks_with_values() {
        assert_eq!(
            generate("{author}/<{series}/><{seriesIndex} - >{title}", &metadata(), "book.pdf"),
            "J. Doe/The Series/3 - Title.pdf"
        );
        assert_eq!(
            generate("{author}/<{series} ({year})/>{title}", &metadata(), "book.pdf"),
            "J. Doe/The Series (2021)/Title.pdf"
        );
    }

    #[rstest]
    #[case(None, vec![], "Unknown Author/Untitled.pdf")]
    #[case(Some("  "), vec!["".to_string(), "..".to_string()], "Unknown Author/Untitled.pdf")]
    #[case(Some("Dune"), vec![], "Unknown Author/Dune.pdf")]
    #[case(None, vec!["F. Herbert".to_string()], "F. Herbert/Untitled.pdf")]
    fn test_missing_title_and_authors(
        #[case] title: Option<&str>,
        #[case] authors: Vec<String>,
        #[case] expected: &str,
    ) {
        let metadata = BookMetadata {
            title: title.map(str::to_string),
            authors,
            ..Default::default()
        };
        assert_eq!(generate("{author}/{title}", &metadata, "book.pdf"), expected);
        let authors = generate("{authors}", &metadata, "book.pdf");
        assert_eq!(authors, format!("{}.pdf", expected.split('/').next().unwrap()));
    }

    #[test]
    fn test_variables() {
        let names = variables(
            "{author}/{% if not loop.first %}{series}{% endif %}{truncate(title, 6)|slug}{year|truncate: 2}{\"x\"}",
        );
        let names: Vec<&str> = names.iter().map(String::as_str).collect();
        assert_eq!(names, ["author", "loop", "series", "title", "year"]);
    }

    #[test]
    fn test_traversal_in_pattern_is_rejected() {
        let generator: PathGenerator = "../{title}".parse().unwrap();
        assert!(generator.generate(&metadata(), "book.pdf").is_err());
    }

    #[test]
    fn test_effective_pattern() {
        let library = Library::new(LibraryId(1), "Books", "/books");
        assert_eq!(effective_pattern(&library, None), FALLBACK_PATTERN);
        assert_eq!(effective_pattern(&library, Some("  ")), FALLBACK_PATTERN);
        assert_eq!(effective_pattern(&library, Some("{title}")), "{title}");
        let library = library.with_naming_pattern("{author}/");
        assert_eq!(effective_pattern(&library, Some("{title}")), "{author}/{currentFilename}");
    }

    #[rstest]
    #[case("Title.pdf", "pdf", Some("Title"))]
    #[case("Title.PDF", "pdf", Some("Title"))]
    #[case(".pdf", "pdf", Some(""))]
    #[case("Title.epub", "pdf", None)]
    #[case("pdf", "pdf", None)]
    #[case("Titlepdf", "pdf", None)]
    fn test_strip_extension(#[case] filename: &str, #[case] extension: &str, #[case] expected: Option<&str>) {
        assert_eq!(strip_extension(filename, extension), expected);
    }

    #[test]
    fn test_sanitize() {
        assert_eq!(sanitize("  a/b\\c:d*e?f\"g<h>i|j\n "), "abcdefghij");
        assert_eq!(sanitize("..."), "");
        assert_eq!(sanitize("J. Doe"), "J. Doe");
    }
}
