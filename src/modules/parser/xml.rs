//! XML documents flattened into `:`-delimited keys
//!
//! The root element only contributes its attributes. Below it every element
//! name is a key segment, attributes become `element:attribute` and text
//! becomes the value of the element key. A `Name` attribute adds its value
//! as an extra segment, and repeated siblings are told apart by an index
//! segment (`Servers:Server:0`, `Servers:Server:1`).

use layerconf_core::{key, ConfigData, ConfigError, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::path::Path;

const NAME_ATTRIBUTE: &str = "Name";

#[derive(Debug, Default)]
struct Element {
    name: String,
    attributes: Vec<(String, String)>,
    text: Option<String>,
    children: Vec<Element>,
}

impl Element {
    fn open(start: &BytesStart<'_>, path: &Path) -> Result<Self> {
        let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
        let mut attributes = Vec::new();

        for attribute in start.attributes() {
            let attribute = attribute.map_err(|e| {
                ConfigError::parse(path, format!("XML attribute error in <{}>: {}", name, e))
            })?;
            let attribute_name = String::from_utf8_lossy(attribute.key.as_ref()).into_owned();
            if attribute_name == "xmlns" || attribute_name.starts_with("xmlns:") {
                continue;
            }
            let value = attribute.unescape_value().map_err(|e| {
                ConfigError::parse(path, format!("XML attribute error in <{}>: {}", name, e))
            })?;
            attributes.push((attribute_name, value.into_owned()));
        }

        Ok(Self {
            name,
            attributes,
            ..Self::default()
        })
    }

    fn segment(&self) -> String {
        let name = self
            .attributes
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(NAME_ATTRIBUTE))
            .map(|(_, v)| v.as_str());
        match name {
            Some(name) => key::combine(&self.name, name),
            None => self.name.clone(),
        }
    }
}

fn read_root(content: &str, path: &Path) -> Result<Option<Element>> {
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(true);

    let mut open: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        let event = match reader.read_event() {
            Ok(event) => event,
            Err(e) => {
                return Err(ConfigError::parse(
                    path,
                    format!("XML parse error at position {}: {}", reader.buffer_position(), e),
                ))
            }
        };

        match event {
            Event::Start(start) => open.push(Element::open(&start, path)?),
            Event::Empty(start) => close(&mut open, &mut root, Element::open(&start, path)?, path)?,
            Event::End(_) => match open.pop() {
                Some(element) => close(&mut open, &mut root, element, path)?,
                None => return Err(ConfigError::parse(path, "unexpected XML end tag")),
            },
            Event::Text(text) => {
                let text = text
                    .unescape()
                    .map_err(|e| ConfigError::parse(path, format!("XML text error: {}", e)))?;
                append_text(&mut open, &text);
            }
            Event::CData(data) => append_text(&mut open, &String::from_utf8_lossy(&data.into_inner())),
            Event::Eof => break,
            _ => {}
        }
    }

    if let Some(element) = open.last() {
        return Err(ConfigError::parse(path, format!("unclosed XML element <{}>", element.name)));
    }
    Ok(root)
}

fn close(open: &mut [Element], root: &mut Option<Element>, element: Element, path: &Path) -> Result<()> {
    match open.last_mut() {
        Some(parent) => parent.children.push(element),
        None if root.is_some() => {
            return Err(ConfigError::parse(path, "XML document has more than one root element"))
        }
        None => *root = Some(element),
    }
    Ok(())
}

fn append_text(open: &mut [Element], text: &str) {
    if let Some(element) = open.last_mut() {
        element.text.get_or_insert_with(String::new).push_str(text);
    }
}

fn insert(data: &mut ConfigData, full_key: String, value: &str, path: &Path) -> Result<()> {
    if data.contains_key(&full_key) {
        return Err(ConfigError::parse(path, format!("Duplicate key '{}'", full_key)));
    }
    data.set(full_key, value);
    Ok(())
}

fn flatten_children(data: &mut ConfigData, prefix: &str, children: &[Element], path: &Path) -> Result<()> {
    let segments: Vec<String> = children.iter().map(Element::segment).collect();

    for (index, child) in children.iter().enumerate() {
        let segment = &segments[index];
        let repeated = segments.iter().filter(|s| key::keys_equal(s, segment)).count() > 1;
        let child_key = if repeated {
            let position = segments[..index]
                .iter()
                .filter(|s| key::keys_equal(s, segment))
                .count();
            key::combine(&key::combine(prefix, segment), &position.to_string())
        } else {
            key::combine(prefix, segment)
        };
        flatten_element(data, &child_key, child, path)?;
    }
    Ok(())
}

fn flatten_element(data: &mut ConfigData, element_key: &str, element: &Element, path: &Path) -> Result<()> {
    for (name, value) in &element.attributes {
        insert(data, key::combine(element_key, name), value, path)?;
    }
    match &element.text {
        Some(text) => insert(data, element_key.to_string(), text, path)?,
        None if element.attributes.is_empty() && element.children.is_empty() => {
            insert(data, element_key.to_string(), "", path)?
        }
        None => {}
    }
    flatten_children(data, element_key, &element.children, path)
}

/// Parse an XML document into flat key/value pairs
pub fn parse_xml(content: &str, path: &Path) -> Result<ConfigData> {
    let mut data = ConfigData::new();
    let Some(root) = read_root(content, path)? else {
        return Ok(data);
    };

    for (name, value) in &root.attributes {
        insert(&mut data, name.clone(), value, path)?;
    }
    flatten_children(&mut data, "", &root.children, path)?;
    Ok(data)
}
