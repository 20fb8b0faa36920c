//! UPPAAL output format for synthesized controllers
//!
//! The controller is persisted as an UPPAAL-compatible XML document: an
//! `<nta>` with a single `<template>` holding `<location>` and
//! `<transition>` elements, guards and resets as `<label>` children. The
//! module also reads the documents it writes, so a written controller can
//! be inspected and re-emitted; writing is canonical, so a read document
//! serializes back to the identical text.

use std::collections::BTreeSet;

use anyhow::{Error, anyhow, bail};

use vigil_automata::ta::TimedAutomaton;
use vigil_display_utils::comma_joined;

/// An UPPAAL document as vigil writes and reads it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UppaalDocument {
    /// The clock declarations
    pub clocks: Vec<String>,
    /// The template name
    pub name: String,
    /// Location ids, in document order
    pub locations: Vec<String>,
    /// The id of the initial location
    pub initial: String,
    /// The transitions, in document order
    pub transitions: Vec<UppaalTransition>,
}

/// A transition of an UPPAAL template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UppaalTransition {
    /// The source location id
    pub source: String,
    /// The target location id
    pub target: String,
    /// The synchronisation channel, without the `!` suffix
    pub synchronisation: Option<String>,
    /// The guard expression
    pub guard: Option<String>,
    /// The assignment expression (clock resets)
    pub assignment: Option<String>,
}

impl UppaalDocument {
    /// Build the document of a synthesized controller.
    pub fn from_controller<A>(controller: &TimedAutomaton<String, A>) -> Self
    where
        A: Clone + Ord + std::fmt::Debug + std::fmt::Display,
    {
        let transitions = controller
            .transitions()
            .map(|transition| {
                let guard = if transition.guards.is_empty() {
                    None
                } else {
                    Some(comma_joined(
                        transition.guards.iter().map(|(clock, constraint)| {
                            format!("{clock} {} {}", constraint.comparison, constraint.comparand)
                        }),
                        " && ",
                    ))
                };
                let assignment = if transition.resets.is_empty() {
                    None
                } else {
                    Some(comma_joined(
                        transition.resets.iter().map(|clock| format!("{clock} := 0")),
                        ", ",
                    ))
                };
                UppaalTransition {
                    source: transition.source.clone(),
                    target: transition.target.clone(),
                    synchronisation: Some(transition.symbol.to_string()),
                    guard,
                    assignment,
                }
            })
            .collect();
        UppaalDocument {
            clocks: controller.clocks().iter().cloned().collect(),
            name: "controller".to_string(),
            locations: controller.locations().iter().cloned().collect(),
            initial: controller.initial_location().clone(),
            transitions,
        }
    }

    /// Serialize the document.
    pub fn to_xml(&self) -> String {
        let mut xml = String::new();
        xml.push_str("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n");
        xml.push_str("<nta>\n");
        if self.clocks.is_empty() {
            xml.push_str("  <declaration></declaration>\n");
        } else {
            xml.push_str(&format!(
                "  <declaration>clock {};</declaration>\n",
                comma_joined(self.clocks.iter(), ", ")
            ));
        }
        xml.push_str("  <template>\n");
        xml.push_str(&format!("    <name>{}</name>\n", escape(&self.name)));
        for location in &self.locations {
            xml.push_str(&format!(
                "    <location id=\"{id}\"><name>{id}</name></location>\n",
                id = escape(location)
            ));
        }
        xml.push_str(&format!("    <init ref=\"{}\"/>\n", escape(&self.initial)));
        for transition in &self.transitions {
            xml.push_str("    <transition>\n");
            xml.push_str(&format!("      <source ref=\"{}\"/>\n", escape(&transition.source)));
            xml.push_str(&format!("      <target ref=\"{}\"/>\n", escape(&transition.target)));
            if let Some(synchronisation) = &transition.synchronisation {
                xml.push_str(&format!(
                    "      <label kind=\"synchronisation\">{}!</label>\n",
                    escape(synchronisation)
                ));
            }
            if let Some(guard) = &transition.guard {
                xml.push_str(&format!("      <label kind=\"guard\">{}</label>\n", escape(guard)));
            }
            if let Some(assignment) = &transition.assignment {
                xml.push_str(&format!(
                    "      <label kind=\"assignment\">{}</label>\n",
                    escape(assignment)
                ));
            }
            xml.push_str("    </transition>\n");
        }
        xml.push_str("  </template>\n");
        xml.push_str(&format!("  <system>system {};</system>\n", escape(&self.name)));
        xml.push_str("</nta>\n");
        xml
    }

    /// Parse a document previously written by [`UppaalDocument::to_xml`].
    pub fn parse(xml: &str) -> Result<Self, Error> {
        let mut reader = XmlReader::new(xml);
        reader.expect_declaration()?;
        reader.expect_open("nta")?;
        let clocks = match reader.peek_open()?.as_str() {
            "declaration" => {
                let text = reader.read_element("declaration")?;
                parse_clock_declaration(&text)?
            }
            other => bail!("expected <declaration>, found <{other}>"),
        };
        reader.expect_open("template")?;
        let name = reader.read_element("name")?;
        let mut locations = Vec::new();
        let mut initial = None;
        let mut transitions = Vec::new();
        loop {
            let tag = reader.next_tag()?;
            match tag {
                Tag::Open(tag_name) if tag_name == "location" => {
                    let id = reader
                        .last_attribute("id")
                        .ok_or_else(|| anyhow!("<location> without id"))?;
                    // Skip the nested name element.
                    reader.read_element("name")?;
                    reader.expect_close("location")?;
                    locations.push(id);
                }
                Tag::SelfClose(tag_name) if tag_name == "init" => {
                    initial = Some(
                        reader
                            .last_attribute("ref")
                            .ok_or_else(|| anyhow!("<init> without ref"))?,
                    );
                }
                Tag::Open(tag_name) if tag_name == "transition" => {
                    transitions.push(parse_transition(&mut reader)?);
                }
                Tag::Close(tag_name) if tag_name == "template" => break,
                tag => bail!("unexpected tag {tag:?} in template"),
            }
        }
        reader.read_element("system")?;
        reader.expect_close("nta")?;
        Ok(UppaalDocument {
            clocks,
            name,
            locations,
            initial: initial.ok_or_else(|| anyhow!("document misses <init>"))?,
            transitions,
        })
    }
}

fn parse_clock_declaration(text: &str) -> Result<Vec<String>, Error> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(Vec::new());
    }
    let body = text
        .strip_prefix("clock ")
        .and_then(|rest| rest.strip_suffix(';'))
        .ok_or_else(|| anyhow!("malformed clock declaration '{text}'"))?;
    Ok(body.split(',').map(|clock| clock.trim().to_string()).collect())
}

fn parse_transition(reader: &mut XmlReader<'_>) -> Result<UppaalTransition, Error> {
    let mut source = None;
    let mut target = None;
    let mut synchronisation = None;
    let mut guard = None;
    let mut assignment = None;
    loop {
        match reader.next_tag()? {
            Tag::SelfClose(tag_name) if tag_name == "source" => {
                source = reader.last_attribute("ref");
            }
            Tag::SelfClose(tag_name) if tag_name == "target" => {
                target = reader.last_attribute("ref");
            }
            Tag::Open(tag_name) if tag_name == "label" => {
                let kind = reader
                    .last_attribute("kind")
                    .ok_or_else(|| anyhow!("<label> without kind"))?;
                let text = reader.read_text_and_close("label")?;
                match kind.as_str() {
                    "synchronisation" => {
                        synchronisation = Some(
                            text.strip_suffix('!')
                                .ok_or_else(|| anyhow!("synchronisation without '!'"))?
                                .to_string(),
                        );
                    }
                    "guard" => guard = Some(text),
                    "assignment" => assignment = Some(text),
                    other => bail!("unknown label kind '{other}'"),
                }
            }
            Tag::Close(tag_name) if tag_name == "transition" => break,
            tag => bail!("unexpected tag {tag:?} in transition"),
        }
    }
    Ok(UppaalTransition {
        source: source.ok_or_else(|| anyhow!("transition without source"))?,
        target: target.ok_or_else(|| anyhow!("transition without target"))?,
        synchronisation,
        guard,
        assignment,
    })
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;").replace('"', "&quot;")
}

fn unescape(text: &str) -> String {
    text.replace("&lt;", "<").replace("&gt;", ">").replace("&quot;", "\"").replace("&amp;", "&")
}

#[derive(Debug, PartialEq, Eq)]
enum Tag {
    Open(String),
    Close(String),
    SelfClose(String),
}

/// A minimal XML reader for the fixed document shape this module writes.
struct XmlReader<'a> {
    input: &'a str,
    position: usize,
    attributes: Vec<(String, String)>,
}

impl<'a> XmlReader<'a> {
    fn new(input: &'a str) -> Self {
        XmlReader { input, position: 0, attributes: Vec::new() }
    }

    fn expect_declaration(&mut self) -> Result<(), Error> {
        self.skip_whitespace();
        if self.input[self.position..].starts_with("<?") {
            let end = self.input[self.position..]
                .find("?>")
                .ok_or_else(|| anyhow!("unterminated XML declaration"))?;
            self.position += end + 2;
        }
        Ok(())
    }

    fn skip_whitespace(&mut self) {
        while self.input[self.position..].starts_with(|c: char| c.is_whitespace()) {
            self.position += 1;
        }
    }

    /// Read the next tag, recording its attributes.
    fn next_tag(&mut self) -> Result<Tag, Error> {
        self.skip_whitespace();
        let rest = &self.input[self.position..];
        if !rest.starts_with('<') {
            bail!("expected a tag at position {}", self.position);
        }
        let end = rest.find('>').ok_or_else(|| anyhow!("unterminated tag"))?;
        let body = &rest[1..end];
        self.position += end + 1;
        if let Some(name) = body.strip_prefix('/') {
            return Ok(Tag::Close(name.trim().to_string()));
        }
        let (body, self_closing) = match body.strip_suffix('/') {
            Some(stripped) => (stripped, true),
            None => (body, false),
        };
        let mut parts = body.splitn(2, char::is_whitespace);
        let name = parts.next().unwrap_or_default().to_string();
        self.attributes.clear();
        if let Some(attribute_text) = parts.next() {
            let mut remaining = attribute_text.trim();
            while !remaining.is_empty() {
                let equals = remaining
                    .find("=\"")
                    .ok_or_else(|| anyhow!("malformed attribute in <{name}>"))?;
                let key = remaining[..equals].trim().to_string();
                let rest = &remaining[equals + 2..];
                let close = rest
                    .find('"')
                    .ok_or_else(|| anyhow!("unterminated attribute in <{name}>"))?;
                self.attributes.push((key, unescape(&rest[..close])));
                remaining = rest[close + 1..].trim();
            }
        }
        if self_closing {
            Ok(Tag::SelfClose(name))
        } else {
            Ok(Tag::Open(name))
        }
    }

    fn peek_open(&mut self) -> Result<String, Error> {
        let saved_position = self.position;
        let tag = self.next_tag()?;
        self.position = saved_position;
        match tag {
            Tag::Open(name) | Tag::SelfClose(name) => Ok(name),
            Tag::Close(name) => bail!("expected an opening tag, found </{name}>"),
        }
    }

    fn last_attribute(&self, key: &str) -> Option<String> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, value)| value.clone())
    }

    fn expect_open(&mut self, expected: &str) -> Result<(), Error> {
        match self.next_tag()? {
            Tag::Open(name) if name == expected => Ok(()),
            tag => bail!("expected <{expected}>, found {tag:?}"),
        }
    }

    fn expect_close(&mut self, expected: &str) -> Result<(), Error> {
        match self.next_tag()? {
            Tag::Close(name) if name == expected => Ok(()),
            tag => bail!("expected </{expected}>, found {tag:?}"),
        }
    }

    /// Read `<tag>text</tag>` and return the text.
    fn read_element(&mut self, expected: &str) -> Result<String, Error> {
        self.expect_open(expected)?;
        self.read_text_and_close(expected)
    }

    /// Read the text content up to the matching close tag.
    fn read_text_and_close(&mut self, expected: &str) -> Result<String, Error> {
        let rest = &self.input[self.position..];
        let end = rest.find('<').ok_or_else(|| anyhow!("unterminated element <{expected}>"))?;
        let text = unescape(rest[..end].trim());
        self.position += end;
        self.expect_close(expected)?;
        Ok(text)
    }
}

/// Check that an action set is consistent with a parsed document.
pub fn document_actions(document: &UppaalDocument) -> BTreeSet<String> {
    document
        .transitions
        .iter()
        .filter_map(|t| t.synchronisation.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use vigil_automata::ClockConstraint;
    use vigil_automata::ta::Transition;

    fn controller() -> TimedAutomaton<String, String> {
        let mut ta = TimedAutomaton::new(
            ["go".to_string()],
            "n0".to_string(),
            ["n0".to_string(), "n1".to_string()],
        );
        ta.add_clock("x");
        ta.add_transition(Transition::new(
            "n0".to_string(),
            "go".to_string(),
            "n1".to_string(),
            vec![
                ("x".to_string(), ClockConstraint::greater_equal(1)),
                ("x".to_string(), ClockConstraint::less(2)),
            ],
            ["x".to_string()],
        ))
        .unwrap();
        ta
    }

    #[test]
    fn documents_round_trip_byte_identically() {
        let document = UppaalDocument::from_controller(&controller());
        let xml = document.to_xml();
        let parsed = UppaalDocument::parse(&xml).unwrap();
        assert_eq!(parsed, document);
        assert_eq!(parsed.to_xml(), xml);
    }

    #[test]
    fn guards_are_escaped() {
        let document = UppaalDocument::from_controller(&controller());
        let xml = document.to_xml();
        assert!(xml.contains("x &gt;= 1 &amp;&amp; x &lt; 2"));
        assert!(xml.contains("<label kind=\"assignment\">x := 0</label>"));
        assert!(xml.contains("<label kind=\"synchronisation\">go!</label>"));
    }

    #[test]
    fn parsed_documents_expose_their_actions() {
        let document = UppaalDocument::from_controller(&controller());
        assert_eq!(document_actions(&document), BTreeSet::from(["go".to_string()]));
    }
}
