//! Streaming TEI XML parser.
//!
//! Walks the document once with `quick-xml`, tracking the element path on a
//! stack. Elements are matched by local name so both default-namespace and
//! `tei:`-prefixed documents are accepted:
//!
//! - title:    `teiHeader/fileDesc/titleStmt/title[@type="main"]`
//! - doi:      `teiHeader/fileDesc/sourceDesc/biblStruct/idno[@type="doi" (any case)]`
//! - authors:  `teiHeader/fileDesc/sourceDesc/biblStruct/analytic/author` with a `persName`
//! - sections: `text/body/div`, first `head` as title, direct `p` children as text

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use papercorpus_shared::{Author, CorpusError, RawSection, Result};

use crate::TeiDocument;
use crate::cleanup::{clean_non_empty, clean_text};

const ROOT_ELEMENT: &str = "TEI";

const TITLE_PATH: &[&str] = &["teiHeader", "fileDesc", "titleStmt", "title"];
const IDNO_PATH: &[&str] = &["teiHeader", "fileDesc", "sourceDesc", "biblStruct", "idno"];
const AUTHOR_PATH: &[&str] = &[
    "teiHeader",
    "fileDesc",
    "sourceDesc",
    "biblStruct",
    "analytic",
    "author",
];
const SECTION_PATH: &[&str] = &["text", "body", "div"];

/// Parse TEI XML into its extracted fields.
pub(crate) fn parse_tei(xml: &str) -> Result<TeiDocument> {
    let mut reader = Reader::from_str(xml);
    let mut parser = TeiParser::default();
    let mut buf = Vec::new();

    loop {
        let event = reader.read_event_into(&mut buf).map_err(|e| {
            CorpusError::extraction(format!(
                "malformed XML at byte {}: {e}",
                reader.buffer_position()
            ))
        })?;

        match event {
            Event::Start(ref e) => {
                let (name, kind) = element_info(e)?;
                parser.on_start(&name, kind.as_deref())?;
            }
            Event::Empty(ref e) => {
                let (name, kind) = element_info(e)?;
                parser.on_start(&name, kind.as_deref())?;
                parser.on_end();
            }
            Event::Text(ref e) => {
                let text = e
                    .unescape()
                    .map_err(|e| CorpusError::extraction(format!("bad text content: {e}")))?;
                parser.on_text(&text);
            }
            Event::CData(e) => {
                parser.on_text(&String::from_utf8_lossy(&e.into_inner()));
            }
            Event::End(_) => parser.on_end(),
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    parser.finish()
}

/// Local name and `type` attribute of an element.
fn element_info(e: &BytesStart<'_>) -> Result<(String, Option<String>)> {
    let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
    let kind = e
        .try_get_attribute("type")
        .map_err(|err| CorpusError::extraction(format!("bad attribute on <{name}>: {err}")))?
        .map(|attr| {
            attr.unescape_value()
                .map(|v| v.into_owned())
                .map_err(|err| CorpusError::extraction(format!("bad type attribute: {err}")))
        })
        .transpose()?;
    Ok((name, kind))
}

// ---------------------------------------------------------------------------
// Parser state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
    Title,
    Doi,
    FirstName,
    MiddleName,
    Surname,
    Email,
    Head,
    Paragraph,
}

/// Text being collected for one element, including its inline descendants.
#[derive(Debug)]
struct Capture {
    target: Target,
    depth: usize,
    text: String,
}

#[derive(Debug)]
struct AuthorBuilder {
    depth: usize,
    has_pers_name: bool,
    author: Author,
}

#[derive(Debug)]
struct SectionBuilder {
    depth: usize,
    title: Option<String>,
    paragraphs: Vec<String>,
}

#[derive(Debug, Default)]
struct TeiParser {
    stack: Vec<String>,
    seen_root: bool,
    capture: Option<Capture>,
    author: Option<AuthorBuilder>,
    section: Option<SectionBuilder>,
    doc: TeiDocument,
}

impl TeiParser {
    fn on_start(&mut self, name: &str, kind: Option<&str>) -> Result<()> {
        if self.stack.is_empty() {
            if self.seen_root {
                return Err(CorpusError::extraction("more than one root element"));
            }
            if name != ROOT_ELEMENT {
                return Err(CorpusError::extraction(format!(
                    "root element is <{name}>, expected <{ROOT_ELEMENT}>"
                )));
            }
            self.seen_root = true;
        }

        self.stack.push(name.to_string());
        let depth = self.stack.len();

        // Inline markup inside a captured element only contributes text.
        if self.capture.is_some() {
            return Ok(());
        }

        let target = match name {
            "title" if self.path_ends_with(TITLE_PATH) && kind == Some("main") => {
                Some(Target::Title)
            }
            "idno"
                if self.path_ends_with(IDNO_PATH)
                    && kind.is_some_and(|k| k.eq_ignore_ascii_case("doi")) =>
            {
                Some(Target::Doi)
            }
            "author" if self.path_ends_with(AUTHOR_PATH) => {
                self.author = Some(AuthorBuilder {
                    depth,
                    has_pers_name: false,
                    author: Author::default(),
                });
                None
            }
            "persName" => {
                if let Some(a) = self.author.as_mut().filter(|a| depth == a.depth + 1) {
                    a.has_pers_name = true;
                }
                None
            }
            "forename" if self.in_pers_name(depth) => {
                let author = self.author.as_ref().map(|a| &a.author);
                match kind {
                    Some("first") if author.is_some_and(|a| a.first_name.is_none()) => {
                        Some(Target::FirstName)
                    }
                    Some("middle") if author.is_some_and(|a| a.middle_name.is_none()) => {
                        Some(Target::MiddleName)
                    }
                    _ => None,
                }
            }
            "surname"
                if self.in_pers_name(depth)
                    && self.author.as_ref().is_some_and(|a| a.author.surname.is_none()) =>
            {
                Some(Target::Surname)
            }
            "email"
                if self
                    .author
                    .as_ref()
                    .is_some_and(|a| depth == a.depth + 1 && a.author.email.is_none()) =>
            {
                Some(Target::Email)
            }
            "div" if self.section.is_none() && self.path_ends_with(SECTION_PATH) => {
                self.section = Some(SectionBuilder {
                    depth,
                    title: None,
                    paragraphs: Vec::new(),
                });
                None
            }
            "head"
                if self
                    .section
                    .as_ref()
                    .is_some_and(|s| depth == s.depth + 1 && s.title.is_none()) =>
            {
                Some(Target::Head)
            }
            "p" if self.section.as_ref().is_some_and(|s| depth == s.depth + 1) => {
                Some(Target::Paragraph)
            }
            _ => None,
        };

        if let Some(target) = target {
            self.capture = Some(Capture {
                target,
                depth,
                text: String::new(),
            });
        }

        Ok(())
    }

    fn on_text(&mut self, text: &str) {
        if let Some(capture) = self.capture.as_mut() {
            capture.text.push_str(text);
        }
    }

    fn on_end(&mut self) {
        let depth = self.stack.len();

        if self.capture.as_ref().is_some_and(|c| c.depth == depth) {
            if let Some(capture) = self.capture.take() {
                self.finish_capture(capture);
            }
        }

        if self.author.as_ref().is_some_and(|a| a.depth == depth) {
            if let Some(builder) = self.author.take() {
                if builder.has_pers_name {
                    self.doc.authors.push(builder.author);
                }
            }
        }

        if self.section.as_ref().is_some_and(|s| s.depth == depth) {
            if let Some(builder) = self.section.take() {
                self.doc.sections.push(RawSection {
                    section_title: builder.title.unwrap_or_default(),
                    text: clean_text(&builder.paragraphs.join(" ")),
                });
            }
        }

        self.stack.pop();
    }

    fn finish_capture(&mut self, capture: Capture) {
        let author = self.author.as_mut().map(|a| &mut a.author);
        match capture.target {
            Target::Title => self.doc.title.extend(clean_non_empty(&capture.text)),
            Target::Doi => self.doc.doi.extend(clean_non_empty(&capture.text)),
            Target::FirstName => {
                if let Some(a) = author {
                    a.first_name = clean_non_empty(&capture.text);
                }
            }
            Target::MiddleName => {
                if let Some(a) = author {
                    a.middle_name = clean_non_empty(&capture.text);
                }
            }
            Target::Surname => {
                if let Some(a) = author {
                    a.surname = clean_non_empty(&capture.text);
                }
            }
            Target::Email => {
                if let Some(a) = author {
                    a.email = clean_non_empty(&capture.text);
                }
            }
            Target::Head => {
                if let Some(s) = self.section.as_mut() {
                    s.title = Some(clean_text(&capture.text));
                }
            }
            Target::Paragraph => {
                if let Some(s) = self.section.as_mut() {
                    s.paragraphs.push(capture.text);
                }
            }
        }
    }

    fn finish(self) -> Result<TeiDocument> {
        if !self.seen_root {
            return Err(CorpusError::extraction("document has no root element"));
        }
        if let Some(open) = self.stack.last() {
            return Err(CorpusError::extraction(format!(
                "unexpected end of document inside <{open}>"
            )));
        }
        Ok(self.doc)
    }

    /// Whether the current element (top of the stack) sits at `suffix`.
    fn path_ends_with(&self, suffix: &[&str]) -> bool {
        self.stack.len() >= suffix.len()
            && self.stack[self.stack.len() - suffix.len()..]
                .iter()
                .zip(suffix)
                .all(|(a, b)| a == b)
    }

    /// Whether the element at `depth` is a direct child of the current author's `persName`.
    fn in_pers_name(&self, depth: usize) -> bool {
        self.author.as_ref().is_some_and(|a| {
            depth == a.depth + 2 && self.stack.get(depth - 2).is_some_and(|p| p == "persName")
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
