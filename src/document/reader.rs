//! Project XML loading
//!
//! Property groups are parsed into the model; every other child of the root
//! is kept as verbatim markup.

use super::{Attributes, GroupId, ProjectDocument, PROPERTY_GROUP};
use crate::error::{ProjectEditError, Result};
use quick_xml::escape::unescape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use tracing::debug;

type XmlReader<'a> = Reader<&'a [u8]>;

pub(super) fn read_document(xml: &str) -> Result<ProjectDocument> {
    let xml = xml.strip_prefix('\u{feff}').unwrap_or(xml);
    let mut reader = Reader::from_str(xml);
    let mut doc = ProjectDocument::default();
    let mut prolog = Vec::new();

    loop {
        let before = position(&reader);
        match reader.read_event()? {
            Event::Start(start) => {
                doc.root_name = name_of(&start);
                doc.root_attributes = attributes_of(&start)?;
                read_root_children(&mut reader, xml, &mut doc)?;
                break;
            }
            Event::Empty(start) => {
                doc.root_name = name_of(&start);
                doc.root_attributes = attributes_of(&start)?;
                break;
            }
            Event::Eof => {
                return Err(ProjectEditError::Xml("Document has no root element".to_string()))
            }
            _ => push_trimmed(&mut prolog, &xml[before..position(&reader)]),
        }
    }

    doc.prolog = prolog.join("\n");
    doc.epilog = xml[position(&reader)..].trim().to_string();

    debug!(
        root = %doc.root_name,
        groups = doc.groups.len(),
        elements = doc.locations.len(),
        "Loaded project document"
    );
    Ok(doc)
}

fn read_root_children(reader: &mut XmlReader<'_>, xml: &str, doc: &mut ProjectDocument) -> Result<()> {
    loop {
        let before = position(reader);
        match reader.read_event()? {
            Event::Start(start) if is_property_group(&start) => {
                let group = doc.push_group(attributes_of(&start)?);
                read_group(reader, xml, doc, group)?;
            }
            Event::Empty(start) if is_property_group(&start) => {
                doc.push_group(attributes_of(&start)?);
            }
            Event::Start(start) => {
                reader.read_to_end(start.name())?;
                doc.push_root_markup(xml[before..position(reader)].to_string());
            }
            Event::End(_) => return Ok(()),
            Event::Eof => {
                return Err(ProjectEditError::Xml(format!(
                    "Unexpected end of document inside <{}>",
                    doc.root_name
                )))
            }
            _ => {
                let markup = xml[before..position(reader)].trim();
                if !markup.is_empty() {
                    doc.push_root_markup(markup.to_string());
                }
            }
        }
    }
}

fn read_group(reader: &mut XmlReader<'_>, xml: &str, doc: &mut ProjectDocument, group: GroupId) -> Result<()> {
    loop {
        let before = position(reader);
        match reader.read_event()? {
            Event::Start(start) => {
                let name = name_of(&start);
                let attributes = attributes_of(&start)?;
                let span = reader.read_to_end(start.name())?;
                let inner = &xml[span.start as usize..span.end as usize];

                // Nested markup is kept as written; plain text is unescaped
                let (value, raw) = if inner.contains('<') {
                    (inner.to_string(), true)
                } else {
                    let text = unescape(inner).map_err(|e| ProjectEditError::Xml(e.to_string()))?;
                    (text.into_owned(), false)
                };
                doc.push_loaded_element(group, name, value, attributes, raw);
            }
            Event::Empty(start) => {
                let name = name_of(&start);
                let attributes = attributes_of(&start)?;
                doc.push_loaded_element(group, name, String::new(), attributes, false);
            }
            Event::End(_) => return Ok(()),
            Event::Eof => {
                return Err(ProjectEditError::Xml(
                    "Unexpected end of document inside a property group".to_string(),
                ))
            }
            _ => {
                let markup = xml[before..position(reader)].trim();
                if !markup.is_empty() {
                    doc.push_group_markup(group, markup.to_string());
                }
            }
        }
    }
}

fn position(reader: &XmlReader<'_>) -> usize {
    reader.buffer_position() as usize
}

fn push_trimmed(parts: &mut Vec<String>, text: &str) {
    let text = text.trim();
    if !text.is_empty() {
        parts.push(text.to_string());
    }
}

fn is_property_group(start: &BytesStart<'_>) -> bool {
    start.local_name().as_ref() == PROPERTY_GROUP.as_bytes()
}

fn name_of(start: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(start.name().as_ref()).into_owned()
}

fn attributes_of(start: &BytesStart<'_>) -> Result<Attributes> {
    start
        .attributes()
        .map(|attr| -> Result<(String, String)> {
            let attr = attr?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = attr.unescape_value()?.into_owned();
            Ok((key, value))
        })
        .collect()
}
