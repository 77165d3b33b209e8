use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::model::Id;

pub const LINKS_KEY: &str = "_links";
pub const EMBEDDED_KEY: &str = "_embedded";

/// Key under which a flat resource carries its links.
pub const FLAT_LINKS_KEY: &str = "links";
/// Key under which a flat resource carries its embedded resources.
pub const FLAT_EMBEDDED_KEY: &str = "embedded";

/// A HAL link object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    pub href: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub templated: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Any other link attributes (type, deprecation, hreflang, ...)
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl Link {
    pub fn new(href: impl Into<String>) -> Self {
        Self {
            href: href.into(),
            templated: None,
            name: None,
            title: None,
            attributes: Map::new(),
        }
    }

    pub fn templated(href: impl Into<String>) -> Self {
        Self {
            templated: Some(true),
            ..Self::new(href)
        }
    }

    /// Accepts a link object or a bare href string.
    fn from_value(value: &Value) -> Option<Link> {
        match value {
            Value::String(href) => Some(Link::new(href.clone())),
            Value::Object(_) => serde_json::from_value(value.clone()).ok(),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LinkValue {
    One(Link),
    Many(Vec<Link>),
}

impl LinkValue {
    pub fn first(&self) -> Option<&Link> {
        match self {
            LinkValue::One(link) => Some(link),
            LinkValue::Many(links) => links.first(),
        }
    }

    fn to_value(&self) -> Value {
        match self {
            LinkValue::One(link) => serde_json::to_value(link).unwrap_or(Value::Null),
            LinkValue::Many(links) => serde_json::to_value(links).unwrap_or(Value::Null),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Embedded {
    One(Box<HalResource>),
    Many(Vec<HalResource>),
}

impl Embedded {
    fn resources(&self) -> Vec<&HalResource> {
        match self {
            Embedded::One(resource) => vec![resource.as_ref()],
            Embedded::Many(resources) => resources.iter().collect(),
        }
    }
}

/// A parsed HAL document: own properties, `_links` and `_embedded`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HalResource {
    properties: Map<String, Value>,
    links: Vec<(String, LinkValue)>,
    embedded: Vec<(String, Embedded)>,
}

impl HalResource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads a HAL document. Anything that is not a JSON object yields an
    /// empty resource.
    pub fn from_value(value: &Value) -> Self {
        let Some(object) = value.as_object() else {
            return Self::default();
        };

        let mut resource = Self::default();
        for (key, value) in object {
            match key.as_str() {
                LINKS_KEY => resource.links = parse_links(value),
                EMBEDDED_KEY => resource.embedded = parse_embedded(value),
                _ => {
                    resource.properties.insert(key.clone(), value.clone());
                }
            }
        }
        resource
    }

    pub fn property(&self, name: &str) -> Option<&Value> {
        self.properties.get(name)
    }

    pub fn properties(&self) -> &Map<String, Value> {
        &self.properties
    }

    pub fn link(&self, rel: &str) -> Option<&LinkValue> {
        self.links
            .iter()
            .find(|(name, _)| name == rel)
            .map(|(_, link)| link)
    }

    pub fn links(&self) -> impl Iterator<Item = (&str, &LinkValue)> {
        self.links.iter().map(|(rel, link)| (rel.as_str(), link))
    }

    pub fn href(&self, rel: &str) -> Option<&str> {
        self.link(rel)
            .and_then(LinkValue::first)
            .map(|link| link.href.as_str())
    }

    /// Embedded resources under `rel`, a single embedded resource counts as
    /// a list of one. Missing relations give an empty list.
    pub fn embedded_resources(&self, rel: &str) -> Vec<&HalResource> {
        self.embedded
            .iter()
            .find(|(name, _)| name == rel)
            .map(|(_, embedded)| embedded.resources())
            .unwrap_or_default()
    }

    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    pub fn with_link(mut self, rel: impl Into<String>, link: Link) -> Self {
        let rel = rel.into();
        match self.links.iter_mut().find(|(name, _)| *name == rel) {
            Some((_, existing)) => {
                let mut links = match existing.clone() {
                    LinkValue::One(first) => vec![first],
                    LinkValue::Many(links) => links,
                };
                links.push(link);
                *existing = LinkValue::Many(links);
            }
            None => self.links.push((rel, LinkValue::One(link))),
        }
        self
    }

    /// Adds an embedded resource. Adding a second resource under the same
    /// relation turns it into a list.
    pub fn with_resource(mut self, rel: impl Into<String>, resource: HalResource) -> Self {
        let rel = rel.into();
        match self.embedded.iter_mut().find(|(name, _)| *name == rel) {
            Some((_, existing)) => {
                let mut resources = match std::mem::replace(existing, Embedded::Many(vec![])) {
                    Embedded::One(first) => vec![*first],
                    Embedded::Many(resources) => resources,
                };
                resources.push(resource);
                *existing = Embedded::Many(resources);
            }
            None => self.embedded.push((rel, Embedded::One(Box::new(resource)))),
        }
        self
    }

    pub fn with_resources(mut self, rel: impl Into<String>, resources: Vec<HalResource>) -> Self {
        self.embedded.push((rel.into(), Embedded::Many(resources)));
        self
    }

    /// Serializes back into a HAL document.
    pub fn to_value(&self) -> Value {
        let mut object = Map::new();
        if !self.links.is_empty() {
            object.insert(LINKS_KEY.to_string(), self.links_value());
        }
        if !self.embedded.is_empty() {
            let embedded = self
                .embedded
                .iter()
                .map(|(rel, embedded)| {
                    let value = match embedded {
                        Embedded::One(resource) => resource.to_value(),
                        Embedded::Many(resources) => {
                            Value::Array(resources.iter().map(HalResource::to_value).collect())
                        }
                    };
                    (rel.clone(), value)
                })
                .collect();
            object.insert(EMBEDDED_KEY.to_string(), Value::Object(embedded));
        }
        object.extend(self.properties.clone());
        Value::Object(object)
    }

    /// Converts to the plain shape the admin UI expects: own properties plus
    /// `links` and `embedded`. Own properties win on a key clash.
    pub fn to_flat(&self) -> FlatResource {
        let mut flat = self.properties.clone();
        if !flat.contains_key(FLAT_LINKS_KEY) {
            flat.insert(FLAT_LINKS_KEY.to_string(), self.links_value());
        }
        if !flat.contains_key(FLAT_EMBEDDED_KEY) {
            let embedded = self
                .embedded
                .iter()
                .map(|(rel, embedded)| {
                    let value = match embedded {
                        Embedded::One(resource) => resource.to_flat().into_value(),
                        Embedded::Many(resources) => Value::Array(
                            resources
                                .iter()
                                .map(|resource| resource.to_flat().into_value())
                                .collect(),
                        ),
                    };
                    (rel.clone(), value)
                })
                .collect();
            flat.insert(FLAT_EMBEDDED_KEY.to_string(), Value::Object(embedded));
        }
        FlatResource(flat)
    }

    fn links_value(&self) -> Value {
        Value::Object(
            self.links
                .iter()
                .map(|(rel, link)| (rel.clone(), link.to_value()))
                .collect(),
        )
    }
}

fn parse_links(value: &Value) -> Vec<(String, LinkValue)> {
    let Some(object) = value.as_object() else {
        return Vec::new();
    };
    object
        .iter()
        .filter_map(|(rel, value)| {
            let link = match value {
                Value::Array(items) => {
                    LinkValue::Many(items.iter().filter_map(Link::from_value).collect())
                }
                other => LinkValue::One(Link::from_value(other)?),
            };
            Some((rel.clone(), link))
        })
        .collect()
}

fn parse_embedded(value: &Value) -> Vec<(String, Embedded)> {
    let Some(object) = value.as_object() else {
        return Vec::new();
    };
    object
        .iter()
        .map(|(rel, value)| {
            let embedded = match value {
                Value::Array(items) => {
                    Embedded::Many(items.iter().map(HalResource::from_value).collect())
                }
                other => Embedded::One(Box::new(HalResource::from_value(other))),
            };
            (rel.clone(), embedded)
        })
        .collect()
}

/// A resource flattened for the admin UI.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FlatResource(Map<String, Value>);

impl FlatResource {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn id(&self) -> Option<Id> {
        self.0.get("id").and_then(Id::from_value)
    }

    /// Puts the caller's prefixed id back in place of the id the API
    /// returned. Only applies when the resource carries an id at all.
    pub fn restore_id(&mut self, original: &Id) {
        if original.is_prefixed() && self.0.contains_key("id") {
            self.0.insert("id".to_string(), original.to_value());
        }
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

impl From<Map<String, Value>> for FlatResource {
    fn from(map: Map<String, Value>) -> Self {
        FlatResource(map)
    }
}
