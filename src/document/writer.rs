//! Project XML serialization

use super::{Attributes, GroupEntry, ProjectDocument, PropertyGroup, RootNode, PROPERTY_GROUP};
use quick_xml::escape::partial_escape;
use std::fmt::Write;

const INDENT: &str = "  ";

pub(super) fn write_document(doc: &ProjectDocument) -> String {
    let mut out = String::new();

    if !doc.prolog.is_empty() {
        out.push_str(&doc.prolog);
        out.push('\n');
    }

    open_tag(&mut out, &doc.root_name, &doc.root_attributes);
    if doc.children.is_empty() {
        out.push_str(" />\n");
    } else {
        out.push_str(">\n");
        let group_name = qualified(&doc.root_name, PROPERTY_GROUP);
        for child in &doc.children {
            match child {
                RootNode::Group(id) => {
                    if let Some(group) = doc.groups.get(id.index()) {
                        write_group(&mut out, &group_name, group);
                    }
                }
                RootNode::Markup(markup) => {
                    let _ = writeln!(out, "{}{}", INDENT, markup);
                }
            }
        }
        let _ = writeln!(out, "</{}>", doc.root_name);
    }

    if !doc.epilog.is_empty() {
        out.push_str(&doc.epilog);
        out.push('\n');
    }

    out
}

fn write_group(out: &mut String, name: &str, group: &PropertyGroup) {
    out.push_str(INDENT);
    open_tag(out, name, &group.attributes);
    if group.entries.is_empty() {
        out.push_str(" />\n");
        return;
    }
    out.push_str(">\n");

    for entry in &group.entries {
        out.push_str(INDENT);
        out.push_str(INDENT);
        match entry {
            GroupEntry::Property(element) => {
                open_tag(out, &element.name, &element.attributes);
                if element.value.is_empty() {
                    out.push_str(" />");
                } else if element.raw {
                    let _ = write!(out, ">{}</{}>", element.value, element.name);
                } else {
                    let _ = write!(out, ">{}</{}>", partial_escape(&element.value), element.name);
                }
            }
            GroupEntry::Markup(markup) => out.push_str(markup),
        }
        out.push('\n');
    }

    let _ = writeln!(out, "{}</{}>", INDENT, name);
}

fn open_tag(out: &mut String, name: &str, attributes: &Attributes) {
    out.push('<');
    out.push_str(name);
    for (key, value) in attributes {
        let _ = write!(out, " {}=\"{}\"", key, escape_attribute(value));
    }
}

/// Attribute values keep single quotes readable: conditions are full of them
///
/// Line breaks and tabs are written as character references.
fn escape_attribute(value: &str) -> String {
    partial_escape(value)
        .replace('"', "&quot;")
        .replace('\n', "&#10;")
        .replace('\r', "&#13;")
        .replace('\t', "&#9;")
}

/// `name` carrying the same namespace prefix as `root`
fn qualified(root: &str, name: &str) -> String {
    match root.rsplit_once(':') {
        Some((prefix, _)) => format!("{}:{}", prefix, name),
        None => name.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_round_trip() {
        let xml = r#"<?xml version="1.0" encoding="utf-8"?>
<Project ToolsVersion="15.0">
  <PropertyGroup>
    <OutputType>Library</OutputType>
    <!-- keep me -->
    <Empty />
  </PropertyGroup>
  <PropertyGroup Condition=" '$(Configuration)' == 'Debug' ">
    <DefineConstants>DEBUG&amp;TRACE</DefineConstants>
  </PropertyGroup>
  <ItemGroup>
    <Compile Include="Program.cs" />
  </ItemGroup>
</Project>
"#;
        let doc = ProjectDocument::parse(xml).unwrap();
        assert_eq!(doc.to_xml(), xml);
    }

    #[test]
    fn test_write_empty_root() {
        let doc = ProjectDocument::new("Project");
        assert_eq!(doc.to_xml(), "<Project />\n");
    }

    #[test]
    fn test_write_escapes_attribute_quotes() {
        let mut doc = ProjectDocument::new("Project");
        doc.add_property_group(Some(r#"'$(A)' == "b""#));
        assert_eq!(
            doc.to_xml(),
            "<Project>\n  <PropertyGroup Condition=\"'$(A)' == &quot;b&quot;\" />\n</Project>\n"
        );
    }

    #[test]
    fn test_write_preserves_attribute_whitespace() {
        let xml = "<Project>\n  <PropertyGroup Condition=\"'$(A)' == 'x'&#10;and&#13;&#9;'$(B)' == 'y'\" />\n</Project>\n";
        let doc = ProjectDocument::parse(xml).unwrap();
        let condition = doc.property_groups().next().unwrap().condition().unwrap();
        assert_eq!(condition, "'$(A)' == 'x'\nand\r\t'$(B)' == 'y'");

        assert_eq!(doc.to_xml(), xml);
        let reloaded = ProjectDocument::parse(&doc.to_xml()).unwrap();
        assert_eq!(reloaded.property_groups().next().unwrap().condition(), Some(condition));
    }

    #[test]
    fn test_write_keeps_namespace_prefix() {
        let doc = ProjectDocument::parse(
            r#"<ms:Project xmlns:ms="urn:x"><ms:PropertyGroup><ms:A>1</ms:A></ms:PropertyGroup></ms:Project>"#,
        )
        .unwrap();
        let xml = doc.to_xml();
        assert!(xml.contains("<ms:PropertyGroup>"));
        assert!(xml.contains("<ms:A>1</ms:A>"));
        assert!(xml.ends_with("</ms:Project>\n"));
    }
}
