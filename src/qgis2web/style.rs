use serde::Serialize;
use std::collections::BTreeMap;

use crate::qgis2web::lexer::{Token, TokenKind};

/// Non-color visual attributes shared by every descriptor variant
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Paint {
    pub weight: Option<f64>,
    pub opacity: Option<f64>,
    pub fill_opacity: Option<f64>,
    pub stroke_enabled: Option<bool>,
    pub fill_enabled: Option<bool>,
}

/// What one returned style object literal contributes
///
/// Attributes absent from the literal stay `None` and serialize as `null`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StyleProps {
    pub stroke: Option<String>,
    pub fill: Option<String>,
    #[serde(flatten)]
    pub paint: Paint,
}

impl StyleProps {
    /// Extract the known attributes from the tokens between an object's braces
    ///
    /// Only top-level `key: value` entries are considered. For each attribute
    /// the first entry whose value has the expected literal type wins.
    pub fn from_object(tokens: &[Token<'_>]) -> Self {
        let entries = object_entries(tokens);
        let string = |key: &str| {
            entries
                .iter()
                .filter(|(k, _)| k == key)
                .find_map(|(_, value)| value.first().and_then(Token::string_value))
        };
        let number = |key: &str| {
            entries
                .iter()
                .filter(|(k, _)| k == key)
                .find_map(|(_, value)| value.first().and_then(Token::number_value))
        };
        let boolean = |key: &str| {
            entries
                .iter()
                .filter(|(k, _)| k == key)
                .find_map(|(_, value)| value.first().and_then(Token::bool_value))
        };

        Self {
            stroke: string("color"),
            fill: string("fillColor"),
            paint: Paint {
                weight: number("weight"),
                opacity: number("opacity"),
                fill_opacity: number("fillOpacity"),
                stroke_enabled: boolean("stroke"),
                fill_enabled: boolean("fill"),
            },
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Default color plus per-value overrides for one channel
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ColorMapping {
    pub default: Option<String>,
    pub values: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategorizedStyle {
    pub property: String,
    pub stroke: ColorMapping,
    pub fill: ColorMapping,
    #[serde(flatten)]
    pub paint: Paint,
}

impl CategorizedStyle {
    /// Build from the default arm and the labelled case arms
    ///
    /// Case arms only override colors; an empty color is treated as absent.
    pub fn new(property: String, default: StyleProps, cases: &BTreeMap<String, StyleProps>) -> Self {
        Self {
            property,
            stroke: ColorMapping {
                default: default.stroke,
                values: case_colors(cases, |p| p.stroke.as_ref()),
            },
            fill: ColorMapping {
                default: default.fill,
                values: case_colors(cases, |p| p.fill.as_ref()),
            },
            paint: default.paint,
        }
    }
}

fn case_colors(
    cases: &BTreeMap<String, StyleProps>,
    pick: fn(&StyleProps) -> Option<&String>,
) -> BTreeMap<String, String> {
    cases
        .iter()
        .filter_map(|(value, props)| {
            pick(props)
                .filter(|color| !color.is_empty())
                .map(|color| (value.clone(), color.clone()))
        })
        .collect()
}

/// One `[min, max]` class of a graduated renderer, with `min <= max`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RangeRule {
    pub min: f64,
    pub max: f64,
    #[serde(flatten)]
    pub style: StyleProps,
}

impl RangeRule {
    /// Bounds may arrive in either order depending on how the comparison was written
    pub fn new(a: f64, b: f64, style: StyleProps) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
            style,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraduatedStyle {
    pub property: String,
    pub rules: Vec<RangeRule>,
    #[serde(flatten)]
    pub paint: Paint,
}

impl GraduatedStyle {
    /// Shared paint is taken from the first rule
    pub fn new(property: String, rules: Vec<RangeRule>) -> Self {
        let paint = rules
            .first()
            .map(|rule| rule.style.paint.clone())
            .unwrap_or_default();
        Self {
            property,
            rules,
            paint,
        }
    }
}

/// Structured reconstruction of one layer's rendering rule
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum StyleDescriptor {
    Simple(StyleProps),
    Categorical(CategorizedStyle),
    Graduated(GraduatedStyle),
}

impl StyleDescriptor {
    pub fn kind(&self) -> &'static str {
        match self {
            StyleDescriptor::Simple(_) => "simple",
            StyleDescriptor::Categorical(_) => "categorical",
            StyleDescriptor::Graduated(_) => "graduated",
        }
    }
}

/// Split object-literal tokens into `(key, value tokens)` at top-level commas
fn object_entries<'t, 'a>(tokens: &'t [Token<'a>]) -> Vec<(String, &'t [Token<'a>])> {
    let mut entries = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;

    for (i, token) in tokens.iter().enumerate() {
        if token.kind != TokenKind::Punct {
            continue;
        }
        match token.text {
            "{" | "[" | "(" => depth += 1,
            "}" | "]" | ")" => depth -= 1,
            "," if depth == 0 => {
                entries.extend(entry(&tokens[start..i]));
                start = i + 1;
            }
            _ => {}
        }
    }
    entries.extend(entry(&tokens[start..]));
    entries
}

fn entry<'t, 'a>(tokens: &'t [Token<'a>]) -> Option<(String, &'t [Token<'a>])> {
    let (key, rest) = tokens.split_first()?;
    let (colon, value) = rest.split_first()?;
    if !colon.is_punct(":") {
        return None;
    }
    let key = match key.kind {
        TokenKind::Ident => key.text.to_string(),
        TokenKind::Str => key.string_value()?,
        _ => return None,
    };
    Some((key, value))
}
