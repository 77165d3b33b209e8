//! URI template expansion (RFC 6570, levels 1 to 4) for templated HAL links,
//! plus repeated-key query string serialization for parameters a template
//! does not consume.

use itertools::Itertools;
use serde_json::Value;

use crate::error::{DataProviderError, Result};
use crate::model::Params;

/// Result of expanding a template: the URL and the names of the variables
/// the template mentions.
#[derive(Debug, Clone, PartialEq)]
pub struct Expansion {
    pub url: String,
    pub variables: Vec<String>,
}

impl Expansion {
    /// Params the template did not mention, in their original order.
    pub fn unused(&self, params: &Params) -> Params {
        params
            .iter()
            .filter(|(name, _)| !self.variables.contains(*name))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect()
    }
}

struct Operator {
    first: &'static str,
    separator: &'static str,
    named: bool,
    if_empty: &'static str,
    allow_reserved: bool,
}

impl Operator {
    fn parse(c: char) -> Option<Operator> {
        let (first, separator, named, if_empty, allow_reserved) = match c {
            '+' => ("", ",", false, "", true),
            '#' => ("#", ",", false, "", true),
            '.' => (".", ".", false, "", false),
            '/' => ("/", "/", false, "", false),
            ';' => (";", ";", true, "", false),
            '?' => ("?", "&", true, "=", false),
            '&' => ("&", "&", true, "=", false),
            _ => return None,
        };
        Some(Operator {
            first,
            separator,
            named,
            if_empty,
            allow_reserved,
        })
    }

    fn simple() -> Operator {
        Operator {
            first: "",
            separator: ",",
            named: false,
            if_empty: "",
            allow_reserved: false,
        }
    }

    fn encode(&self, value: &str) -> String {
        if self.allow_reserved {
            encode_reserved(value)
        } else {
            urlencoding::encode(value).into_owned()
        }
    }
}

struct VarSpec {
    name: String,
    explode: bool,
    prefix: Option<usize>,
}

impl VarSpec {
    fn parse(spec: &str) -> Result<VarSpec> {
        if let Some(name) = spec.strip_suffix('*') {
            return Ok(VarSpec {
                name: name.to_string(),
                explode: true,
                prefix: None,
            });
        }
        match spec.split_once(':') {
            Some((name, length)) => {
                let length = length
                    .parse::<usize>()
                    .map_err(|_| DataProviderError::Template(format!("bad prefix in '{}'", spec)))?;
                Ok(VarSpec {
                    name: name.to_string(),
                    explode: false,
                    prefix: Some(length),
                })
            }
            None => Ok(VarSpec {
                name: spec.to_string(),
                explode: false,
                prefix: None,
            }),
        }
    }
}

enum TemplateValue {
    Scalar(String),
    List(Vec<String>),
    Pairs(Vec<(String, String)>),
}

fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        other => Some(other.to_string()),
    }
}

/// Undefined values (null, empty lists, empty objects) expand to nothing.
fn template_value(value: &Value) -> Option<TemplateValue> {
    match value {
        Value::Null => None,
        Value::Array(items) => {
            let items: Vec<String> = items.iter().filter_map(scalar).collect();
            (!items.is_empty()).then_some(TemplateValue::List(items))
        }
        Value::Object(object) => {
            let pairs: Vec<(String, String)> = object
                .iter()
                .filter_map(|(k, v)| scalar(v).map(|v| (k.clone(), v)))
                .collect();
            (!pairs.is_empty()).then_some(TemplateValue::Pairs(pairs))
        }
        other => scalar(other).map(TemplateValue::Scalar),
    }
}

pub fn expand(template: &str, params: &Params) -> Result<Expansion> {
    let mut url = String::with_capacity(template.len());
    let mut variables = Vec::new();
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        url.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        let end = after
            .find('}')
            .ok_or_else(|| DataProviderError::Template(format!("unclosed expression in '{}'", template)))?;
        let expression = &after[..end];
        url.push_str(&expand_expression(expression, params, &mut variables)?);
        rest = &after[end + 1..];
    }
    if rest.contains('}') {
        return Err(DataProviderError::Template(format!(
            "unmatched '}}' in '{}'",
            template
        )));
    }
    url.push_str(rest);

    Ok(Expansion { url, variables })
}

fn expand_expression(expression: &str, params: &Params, variables: &mut Vec<String>) -> Result<String> {
    let mut chars = expression.chars();
    let (operator, var_list) = match chars.next().and_then(Operator::parse) {
        Some(operator) => (operator, chars.as_str()),
        None => (Operator::simple(), expression),
    };
    if var_list.is_empty() {
        return Err(DataProviderError::Template("empty expression".to_string()));
    }

    let mut parts = Vec::new();
    for spec in var_list.split(',') {
        let spec = VarSpec::parse(spec.trim())?;
        if !variables.contains(&spec.name) {
            variables.push(spec.name.clone());
        }
        let Some(value) = params.get(&spec.name).and_then(template_value) else {
            continue;
        };
        parts.push(expand_variable(&operator, &spec, value));
    }

    if parts.is_empty() {
        return Ok(String::new());
    }
    Ok(format!("{}{}", operator.first, parts.join(operator.separator)))
}

fn expand_variable(op: &Operator, spec: &VarSpec, value: TemplateValue) -> String {
    let name = &spec.name;
    let named = |encoded: String| {
        if encoded.is_empty() {
            format!("{}{}", name, op.if_empty)
        } else {
            format!("{}={}", name, encoded)
        }
    };

    match value {
        TemplateValue::Scalar(value) => {
            let value = match spec.prefix {
                Some(length) => value.chars().take(length).collect(),
                None => value,
            };
            let encoded = op.encode(&value);
            if op.named {
                named(encoded)
            } else {
                encoded
            }
        }
        TemplateValue::List(items) => {
            if spec.explode {
                items
                    .iter()
                    .map(|item| {
                        let encoded = op.encode(item);
                        if op.named {
                            named(encoded)
                        } else {
                            encoded
                        }
                    })
                    .join(op.separator)
            } else {
                let joined = items.iter().map(|item| op.encode(item)).join(",");
                if op.named {
                    named(joined)
                } else {
                    joined
                }
            }
        }
        TemplateValue::Pairs(pairs) => {
            if spec.explode {
                pairs
                    .iter()
                    .map(|(k, v)| {
                        let encoded = op.encode(v);
                        if op.named && encoded.is_empty() {
                            format!("{}{}", op.encode(k), op.if_empty)
                        } else {
                            format!("{}={}", op.encode(k), encoded)
                        }
                    })
                    .join(op.separator)
            } else {
                let joined = pairs
                    .iter()
                    .flat_map(|(k, v)| [op.encode(k), op.encode(v)])
                    .join(",");
                if op.named {
                    named(joined)
                } else {
                    joined
                }
            }
        }
    }
}

const RESERVED: &str = ":/?#[]@!$&'()*+,;=";

fn encode_reserved(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut buf = [0u8; 4];
    for c in value.chars() {
        if c.is_ascii_alphanumeric() || "-._~".contains(c) || RESERVED.contains(c) {
            out.push(c);
        } else {
            out.push_str(&urlencoding::encode(c.encode_utf8(&mut buf)));
        }
    }
    out
}

/// Serializes params as `key=value` pairs, repeating the key for every
/// element of a list (`filter=a&filter=b`). Null values are skipped.
pub fn to_query_string(params: &Params) -> String {
    params
        .iter()
        .flat_map(|(key, value)| {
            let values: Vec<String> = match value {
                Value::Array(items) => items.iter().filter_map(scalar).collect(),
                other => scalar(other).into_iter().collect(),
            };
            values
                .into_iter()
                .map(move |v| format!("{}={}", urlencoding::encode(key), urlencoding::encode(&v)))
        })
        .join("&")
}

/// Appends a query string to a URL that may already carry one.
pub fn append_query(url: &str, query: &str) -> String {
    if query.is_empty() {
        url.to_string()
    } else if url.contains('?') {
        format!("{}&{}", url, query)
    } else {
        format!("{}?{}", url, query)
    }
}
