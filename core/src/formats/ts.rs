/// Qt Linguist `.ts` catalog reader and writer
///
/// Known elements and attributes are mapped onto `MessageEntry`; anything
/// else is kept as raw XML and written back after the known content of its
/// parent. Output always uses the canonical lupdate layout, so a document
/// written here parses and re-emits byte for byte.
use super::{CatalogFormat, FileFormat, FormatError, ParseError};
use crate::catalog::{
    Catalog, CatalogHeader, FormExtras, Location, MessageEntry, MessageKey, MessageStatus,
    RawAttribute, RawMarkup,
};
use quick_xml::escape::{escape, unescape};
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::QName;
use quick_xml::Reader;
use std::fmt::Write as _;

const DOCTYPE: &str = "<!DOCTYPE TS>";
const INDENT: &str = "    ";
// Qt joins the length variants of one translation with U+009C
const LENGTH_VARIANT_SEPARATOR: &str = "\u{9c}";

pub struct TsHandler;

impl TsHandler {
    pub fn new() -> Self {
        Self
    }
}

impl Default for TsHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl CatalogFormat for TsHandler {
    fn parse(&self, content: &str) -> Result<Catalog, FormatError> {
        Ok(parse_catalog(content)?)
    }

    fn emit(&self, catalog: &Catalog) -> String {
        emit_catalog(catalog)
    }

    fn format(&self) -> FileFormat {
        FileFormat::Ts
    }
}

pub fn parse_catalog(content: &str) -> Result<Catalog, ParseError> {
    Parser::new(content).parse_document()
}

struct Parser<'i> {
    content: &'i str,
    reader: Reader<&'i [u8]>,
    path: Vec<String>,
}

/// Decoded `<translation>` content, one slot per form.
#[derive(Default)]
struct TranslationBody {
    forms: Vec<String>,
    extras: Vec<FormExtras>,
    elements: Vec<String>,
}

impl<'i> Parser<'i> {
    fn new(content: &'i str) -> Self {
        Self {
            content,
            reader: Reader::from_str(content),
            path: Vec::new(),
        }
    }

    fn parse_document(mut self) -> Result<Catalog, ParseError> {
        let mut xml_encoding = None;
        loop {
            match self.next()? {
                Event::Decl(decl) => {
                    if let Some(Ok(value)) = decl.encoding() {
                        xml_encoding = Some(String::from_utf8_lossy(&value).into_owned());
                    }
                }
                Event::DocType(_) | Event::Comment(_) | Event::PI(_) => {}
                Event::Text(text) if is_blank(&text) => {}
                Event::Start(start) if start.name().as_ref() == b"TS" => {
                    let mut catalog = self.parse_ts(&start)?;
                    self.expect_end()?;
                    if let Some(encoding) = xml_encoding {
                        catalog.header_mut().xml_encoding = encoding;
                    }
                    return Ok(catalog);
                }
                Event::Eof => return Err(self.error("TS", "missing <TS> root element")),
                _ => return Err(self.error("TS", "unexpected content before <TS>")),
            }
        }
    }

    fn expect_end(&mut self) -> Result<(), ParseError> {
        loop {
            match self.next()? {
                Event::Eof => return Ok(()),
                Event::Comment(_) | Event::PI(_) => {}
                Event::Text(text) if is_blank(&text) => {}
                _ => return Err(self.error("TS", "unexpected content after </TS>")),
            }
        }
    }

    fn parse_ts(&mut self, start: &BytesStart<'i>) -> Result<Catalog, ParseError> {
        let mut header = CatalogHeader::new("");
        for attr in self.attributes(start, "TS")? {
            match attr.name.as_str() {
                "version" => header.version = self.unescape(&attr.raw_value, "TS")?,
                "language" => header.language = self.unescape(&attr.raw_value, "TS")?,
                "sourcelanguage" => {
                    header.source_language = Some(self.unescape(&attr.raw_value, "TS")?)
                }
                _ => header.extra_attributes.push(attr),
            }
        }

        let mut catalog = Catalog::with_header(header);
        self.path.push("TS".into());
        loop {
            match self.next()? {
                Event::Start(child) if child.name().as_ref() == b"context" => {
                    self.parse_context(&mut catalog)?;
                }
                Event::Start(child) => {
                    let raw = self.capture(&child, false)?;
                    catalog.header_mut().extra_elements.push(raw);
                }
                Event::Empty(child) => {
                    let raw = self.capture(&child, true)?;
                    catalog.header_mut().extra_elements.push(raw);
                }
                Event::End(_) => break,
                Event::Text(text) if is_blank(&text) => {}
                Event::Comment(_) => {}
                Event::Eof => return Err(self.error("TS", "unexpected end of document")),
                _ => return Err(self.error("TS", "unexpected text")),
            }
        }
        self.path.pop();
        Ok(catalog)
    }

    fn parse_context(&mut self, catalog: &mut Catalog) -> Result<(), ParseError> {
        let mut name: Option<String> = None;
        let mut position = 0usize;
        self.path.push("context".into());

        loop {
            match self.next()? {
                Event::Start(child) => match child.name().as_ref() {
                    b"name" => {
                        let text = self.read_text("name")?;
                        catalog.context_mut(&text);
                        if let Some(last) = self.path.last_mut() {
                            *last = format!("context[{text}]");
                        }
                        name = Some(text);
                    }
                    b"message" => {
                        let Some(context) = name.clone() else {
                            return Err(self.error("message", "<message> before context <name>"));
                        };
                        position += 1;
                        self.path.push(format!("message[{position}]"));
                        let entry = self.parse_message(&child, context)?;
                        if catalog.contains(entry.key()) {
                            return Err(self.error("", format!("duplicate message {}", entry.key())));
                        }
                        self.path.pop();
                        catalog.insert(entry);
                    }
                    _ => {
                        let raw = self.capture(&child, false)?;
                        self.push_context_extra(catalog, name.as_deref(), raw)?;
                    }
                },
                Event::Empty(child) => {
                    let raw = self.capture(&child, true)?;
                    self.push_context_extra(catalog, name.as_deref(), raw)?;
                }
                Event::End(_) => break,
                Event::Text(text) if is_blank(&text) => {}
                Event::Comment(_) => {}
                Event::Eof => return Err(self.error("", "unexpected end of document")),
                _ => return Err(self.error("", "unexpected text")),
            }
        }

        if name.is_none() {
            return Err(self.error("name", "context without <name>"));
        }
        self.path.pop();
        Ok(())
    }

    fn push_context_extra(
        &self,
        catalog: &mut Catalog,
        name: Option<&str>,
        raw: String,
    ) -> Result<(), ParseError> {
        match name {
            Some(name) => {
                catalog.context_mut(name).extras.push(raw);
                Ok(())
            }
            None => Err(self.error("name", "context content before <name>")),
        }
    }

    fn parse_message(
        &mut self,
        start: &BytesStart<'i>,
        context: String,
    ) -> Result<MessageEntry, ParseError> {
        let mut numerus = false;
        let mut unclaimed: Option<u32> = None;
        let mut message_attributes = Vec::new();
        for attr in self.attributes(start, "")? {
            match attr.name.as_str() {
                "numerus" => numerus = attr.raw_value == "yes",
                "unclaimed" => {
                    let value = attr.raw_value.parse().map_err(|_| {
                        self.error("", format!("invalid unclaimed count {:?}", attr.raw_value))
                    })?;
                    unclaimed = Some(value);
                }
                _ => message_attributes.push(attr),
            }
        }

        let mut locations = Vec::new();
        let mut source: Option<String> = None;
        let mut disambiguation = String::new();
        let mut has_comment = false;
        let mut old_source = None;
        let mut old_comment = None;
        let mut extra_comment = None;
        let mut translator_comment = None;
        let mut translation: Option<(TranslationBody, Option<String>, Vec<RawAttribute>)> = None;
        let mut elements = Vec::new();

        loop {
            match self.next()? {
                Event::Start(child) => match child.name().as_ref() {
                    b"location" => {
                        locations.push(self.location(&child)?);
                        self.skip_to_end(&child)?;
                    }
                    b"source" => source = Some(self.read_text("source")?),
                    b"oldsource" => old_source = Some(self.read_text("oldsource")?),
                    b"comment" => {
                        disambiguation = self.read_text("comment")?;
                        has_comment = true;
                    }
                    b"oldcomment" => old_comment = Some(self.read_text("oldcomment")?),
                    b"extracomment" => extra_comment = Some(self.read_text("extracomment")?),
                    b"translatorcomment" => {
                        translator_comment = Some(self.read_text("translatorcomment")?)
                    }
                    b"translation" => {
                        let (kind, attributes) = self.translation_attributes(&child)?;
                        let body = if numerus {
                            self.read_forms()?
                        } else {
                            let (text, markup) = self.read_content("translation")?;
                            TranslationBody {
                                forms: vec![text],
                                extras: vec![FormExtras {
                                    attributes: Vec::new(),
                                    markup,
                                }],
                                elements: Vec::new(),
                            }
                        };
                        translation = Some((body, kind, attributes));
                    }
                    _ => elements.push(self.capture(&child, false)?),
                },
                Event::Empty(child) => match child.name().as_ref() {
                    b"location" => locations.push(self.location(&child)?),
                    b"source" => source = Some(String::new()),
                    b"translation" => {
                        let (kind, attributes) = self.translation_attributes(&child)?;
                        translation = Some((TranslationBody::default(), kind, attributes));
                    }
                    b"oldsource" => old_source = Some(String::new()),
                    b"comment" => has_comment = true,
                    b"oldcomment" => old_comment = Some(String::new()),
                    b"extracomment" => extra_comment = Some(String::new()),
                    b"translatorcomment" => translator_comment = Some(String::new()),
                    _ => elements.push(self.capture(&child, true)?),
                },
                Event::End(_) => break,
                Event::Text(text) if is_blank(&text) => {}
                Event::Comment(_) => {}
                Event::Eof => return Err(self.error("", "unexpected end of document")),
                _ => return Err(self.error("", "unexpected text")),
            }
        }

        let source = source.ok_or_else(|| self.error("source", "message without <source>"))?;
        let empty_comment = has_comment && disambiguation.is_empty();
        let key = MessageKey::new(context, source, disambiguation);

        let (body, kind, translation_attributes) = translation
            .unwrap_or_else(|| (TranslationBody::default(), Some("unfinished".into()), Vec::new()));
        let status = MessageStatus::from_type_attr(kind.as_deref()).ok_or_else(|| {
            self.error(
                "translation",
                format!("unknown translation type {:?}", kind.unwrap_or_default()),
            )
        })?;
        let TranslationBody {
            mut forms,
            extras: form_extras,
            elements: translation_elements,
        } = body;
        if forms.is_empty() {
            forms.push(String::new());
        }

        let mut entry = MessageEntry::new(key, numerus, forms.len()).with_locations(locations);
        entry.translation = forms;
        entry.status = status;
        entry.old_source = old_source;
        entry.old_comment = old_comment;
        entry.extra_comment = extra_comment;
        entry.translator_comment = translator_comment;
        entry.unclaimed_passes = match (status, unclaimed) {
            (_, Some(count)) => count,
            (MessageStatus::Obsolete, None) => 1,
            _ => 0,
        };
        entry.extras.message_attributes = message_attributes;
        entry.extras.translation_attributes = translation_attributes;
        if form_extras.iter().any(|form| !form.is_empty()) {
            entry.extras.forms = form_extras;
        }
        entry.extras.translation_elements = translation_elements;
        entry.extras.empty_comment = empty_comment;
        entry.extras.elements = elements;
        Ok(entry)
    }

    fn translation_attributes(
        &self,
        start: &BytesStart<'i>,
    ) -> Result<(Option<String>, Vec<RawAttribute>), ParseError> {
        let mut kind = None;
        let mut rest = Vec::new();
        for attr in self.attributes(start, "translation")? {
            if attr.name == "type" {
                kind = Some(self.unescape(&attr.raw_value, "translation")?);
            } else {
                rest.push(attr);
            }
        }
        Ok((kind, rest))
    }

    fn read_forms(&mut self) -> Result<TranslationBody, ParseError> {
        let mut body = TranslationBody::default();
        loop {
            match self.next()? {
                Event::Start(child) if child.name().as_ref() == b"numerusform" => {
                    let attributes = self.attributes(&child, "numerusform")?;
                    let (text, markup) = self.read_content("numerusform")?;
                    body.forms.push(text);
                    body.extras.push(FormExtras { attributes, markup });
                }
                Event::Empty(child) if child.name().as_ref() == b"numerusform" => {
                    let attributes = self.attributes(&child, "numerusform")?;
                    body.forms.push(String::new());
                    body.extras.push(FormExtras {
                        attributes,
                        markup: None,
                    });
                }
                Event::Start(child) => body.elements.push(self.capture(&child, false)?),
                Event::Empty(child) => body.elements.push(self.capture(&child, true)?),
                Event::End(_) => return Ok(body),
                Event::Text(text) if is_blank(&text) => {}
                Event::Comment(_) => {}
                Event::Eof => return Err(self.error("translation", "unexpected end of document")),
                _ => {
                    return Err(self.error(
                        "translation",
                        "unexpected text inside numerus translation",
                    ))
                }
            }
        }
    }

    /// Translation text of a `<translation>` or `<numerusform>`. When the
    /// element holds markup its inner XML is returned too; the text is then
    /// the `<lengthvariant>` values joined the way Qt joins them.
    fn read_content(&mut self, element: &str) -> Result<(String, Option<RawMarkup>), ParseError> {
        let inner_start = self.reader.buffer_position();
        let mut text = String::new();
        let mut variants: Vec<String> = Vec::new();
        let mut has_markup = false;
        loop {
            match self.next()? {
                Event::Text(chunk) => {
                    let decoded = chunk
                        .unescape()
                        .map_err(|err| self.error(element, err.to_string()))?;
                    text.push_str(&decoded);
                }
                Event::CData(chunk) => {
                    has_markup = true;
                    text.push_str(&String::from_utf8_lossy(&chunk));
                }
                Event::Start(child) => {
                    has_markup = true;
                    if child.name().as_ref() == b"lengthvariant" {
                        variants.push(self.read_text("lengthvariant")?);
                    } else {
                        self.skip_to_end(&child)?;
                    }
                }
                Event::Empty(child) => {
                    has_markup = true;
                    if child.name().as_ref() == b"lengthvariant" {
                        variants.push(String::new());
                    }
                }
                Event::Comment(_) | Event::PI(_) => has_markup = true,
                Event::End(_) => break,
                Event::Eof => return Err(self.error(element, "unexpected end of document")),
                _ => {
                    return Err(self.error(element, format!("unexpected markup inside <{element}>")))
                }
            }
        }
        if !has_markup {
            return Ok((text, None));
        }

        let end = self.reader.buffer_position();
        let inner_end = self.content[..end].rfind("</").unwrap_or(end);
        let value = if variants.is_empty() {
            text
        } else {
            variants.join(LENGTH_VARIANT_SEPARATOR)
        };
        let markup = RawMarkup {
            inner: self.content[inner_start..inner_end].to_string(),
            text: value.clone(),
        };
        Ok((value, Some(markup)))
    }

    fn location(&self, start: &BytesStart<'i>) -> Result<Location, ParseError> {
        let mut file_path = String::new();
        let mut line_number = 0u32;
        let mut extra_attributes = Vec::new();
        for attr in self.attributes(start, "location")? {
            match attr.name.as_str() {
                "filename" => file_path = self.unescape(&attr.raw_value, "location")?,
                "line" => {
                    line_number = attr.raw_value.parse().map_err(|_| {
                        self.error(
                            "location",
                            format!("invalid line number {:?}", attr.raw_value),
                        )
                    })?;
                }
                _ => extra_attributes.push(attr),
            }
        }
        let mut location = Location::new(file_path, line_number);
        location.extra_attributes = extra_attributes;
        Ok(location)
    }

    /// Text content up to the closing tag of `element`.
    fn read_text(&mut self, element: &str) -> Result<String, ParseError> {
        let mut text = String::new();
        loop {
            match self.next()? {
                Event::Text(chunk) => {
                    let decoded = chunk
                        .unescape()
                        .map_err(|err| self.error(element, err.to_string()))?;
                    text.push_str(&decoded);
                }
                Event::CData(chunk) => text.push_str(&String::from_utf8_lossy(&chunk)),
                Event::End(_) => return Ok(text),
                Event::Comment(_) => {}
                Event::Eof => return Err(self.error(element, "unexpected end of document")),
                _ => {
                    return Err(self.error(element, format!("unexpected markup inside <{element}>")))
                }
            }
        }
    }

    fn skip_to_end(&mut self, start: &BytesStart<'i>) -> Result<(), ParseError> {
        let name = start.name().as_ref().to_vec();
        self.reader
            .read_to_end(QName(&name))
            .map_err(|err| self.error("", err.to_string()))?;
        Ok(())
    }

    /// Raw source text of the element that `start` opened.
    fn capture(&mut self, start: &BytesStart<'i>, empty: bool) -> Result<String, ParseError> {
        let tag_end = self.reader.buffer_position();
        // Attribute values cannot contain '<', so the last one opens this tag
        let begin = self.content[..tag_end].rfind('<').unwrap_or(0);
        if !empty {
            self.skip_to_end(start)?;
        }
        let end = self.reader.buffer_position();
        Ok(self.content[begin..end].to_string())
    }

    fn attributes(
        &self,
        start: &BytesStart<'i>,
        element: &str,
    ) -> Result<Vec<RawAttribute>, ParseError> {
        let mut attributes = Vec::new();
        for attr in start.attributes() {
            let attr = attr.map_err(|err| self.error(element, err.to_string()))?;
            attributes.push(RawAttribute::new(
                String::from_utf8_lossy(attr.key.as_ref()),
                String::from_utf8_lossy(&attr.value),
            ));
        }
        Ok(attributes)
    }

    fn unescape(&self, raw: &str, element: &str) -> Result<String, ParseError> {
        unescape(raw)
            .map(|value| value.into_owned())
            .map_err(|err| self.error(element, err.to_string()))
    }

    fn next(&mut self) -> Result<Event<'i>, ParseError> {
        self.reader
            .read_event()
            .map_err(|err| self.error("", err.to_string()))
    }

    fn error(&self, element: &str, message: impl Into<String>) -> ParseError {
        let position = self.reader.buffer_position().min(self.content.len());
        let before = &self.content.as_bytes()[..position];
        let line = before.iter().filter(|b| **b == b'\n').count() + 1;
        let line_start = before
            .iter()
            .rposition(|b| *b == b'\n')
            .map(|idx| idx + 1)
            .unwrap_or(0);

        let mut path = self.path.join("/");
        if !element.is_empty() && !path.ends_with(element) {
            if !path.is_empty() {
                path.push('/');
            }
            path.push_str(element);
        }

        ParseError {
            element: path,
            line,
            column: position - line_start + 1,
            message: message.into(),
        }
    }
}

fn is_blank(text: &[u8]) -> bool {
    text.iter().all(u8::is_ascii_whitespace)
}

pub fn emit_catalog(catalog: &Catalog) -> String {
    let header = catalog.header();
    let mut out = String::new();
    let _ = writeln!(
        out,
        "<?xml version=\"1.0\" encoding=\"{}\"?>",
        escape(&header.xml_encoding)
    );
    out.push_str(DOCTYPE);
    out.push('\n');

    let _ = write!(
        out,
        "<TS version=\"{}\" language=\"{}\"",
        escape(&header.version),
        escape(&header.language)
    );
    if let Some(source_language) = &header.source_language {
        let _ = write!(out, " sourcelanguage=\"{}\"", escape(source_language));
    }
    push_raw_attributes(&mut out, &header.extra_attributes);
    out.push_str(">\n");

    for raw in &header.extra_elements {
        out.push_str(raw);
        out.push('\n');
    }

    for group in catalog.contexts() {
        out.push_str("<context>\n");
        let _ = writeln!(out, "{INDENT}<name>{}</name>", escape(&group.name));
        for entry in &group.entries {
            emit_message(&mut out, entry);
        }
        for raw in &group.extras {
            let _ = writeln!(out, "{INDENT}{raw}");
        }
        out.push_str("</context>\n");
    }

    out.push_str("</TS>\n");
    out
}

fn emit_message(out: &mut String, entry: &MessageEntry) {
    let inner = INDENT.repeat(2);

    out.push_str(INDENT);
    out.push_str("<message");
    if entry.numerus {
        out.push_str(" numerus=\"yes\"");
    }
    if entry.status == MessageStatus::Obsolete && entry.unclaimed_passes > 1 {
        let _ = write!(out, " unclaimed=\"{}\"", entry.unclaimed_passes);
    }
    push_raw_attributes(out, &entry.extras.message_attributes);
    out.push_str(">\n");

    for location in &entry.locations {
        let _ = write!(
            out,
            "{inner}<location filename=\"{}\" line=\"{}\"",
            escape(&location.file_path),
            location.line_number
        );
        push_raw_attributes(out, &location.extra_attributes);
        out.push_str("/>\n");
    }

    push_text_element(out, &inner, "source", entry.source_text());
    if let Some(old_source) = &entry.old_source {
        push_text_element(out, &inner, "oldsource", old_source);
    }
    if entry.key().has_disambiguation() {
        push_text_element(out, &inner, "comment", &entry.key().disambiguation);
    } else if entry.extras.empty_comment {
        push_text_element(out, &inner, "comment", "");
    }
    if let Some(old_comment) = &entry.old_comment {
        push_text_element(out, &inner, "oldcomment", old_comment);
    }
    if let Some(extra_comment) = &entry.extra_comment {
        push_text_element(out, &inner, "extracomment", extra_comment);
    }
    if let Some(translator_comment) = &entry.translator_comment {
        push_text_element(out, &inner, "translatorcomment", translator_comment);
    }

    out.push_str(&inner);
    out.push_str("<translation");
    if let Some(kind) = entry.status.type_attr() {
        let _ = write!(out, " type=\"{kind}\"");
    }
    push_raw_attributes(out, &entry.extras.translation_attributes);
    out.push('>');
    if entry.numerus {
        out.push('\n');
        for (index, form) in entry.translation.iter().enumerate() {
            let extras = entry.extras.forms.get(index);
            out.push_str(&inner);
            out.push_str(INDENT);
            out.push_str("<numerusform");
            if let Some(extras) = extras {
                push_raw_attributes(out, &extras.attributes);
            }
            out.push('>');
            push_form_content(out, form, extras);
            out.push_str("</numerusform>\n");
        }
        for raw in &entry.extras.translation_elements {
            let _ = writeln!(out, "{inner}{INDENT}{raw}");
        }
        out.push_str(&inner);
    } else {
        let text = entry.translation.first().map(String::as_str).unwrap_or("");
        push_form_content(out, text, entry.extras.forms.first());
    }
    out.push_str("</translation>\n");

    for raw in &entry.extras.elements {
        let _ = writeln!(out, "{inner}{raw}");
    }

    out.push_str(INDENT);
    out.push_str("</message>\n");
}

/// Kept markup is written back only while the slot still holds the text
/// it was decoded to.
fn push_form_content(out: &mut String, text: &str, extras: Option<&FormExtras>) {
    match extras.and_then(|extras| extras.markup.as_ref()) {
        Some(markup) if markup.text == text => out.push_str(&markup.inner),
        _ => out.push_str(&escape(text)),
    }
}

fn push_text_element(out: &mut String, indent: &str, name: &str, text: &str) {
    let _ = writeln!(out, "{indent}<{name}>{}</{name}>", escape(text));
}

fn push_raw_attributes(out: &mut String, attributes: &[RawAttribute]) {
    for attr in attributes {
        let _ = write!(out, " {}=\"{}\"", attr.name, attr.raw_value);
    }
}
