use std::collections::BTreeMap;
use tracing::{debug, warn};

use crate::qgis2web::lexer::{matching_close, script_blocks, tokenize, Token, TokenKind};
use crate::qgis2web::style::{
    CategorizedStyle, GraduatedStyle, RangeRule, StyleDescriptor, StyleProps,
};

/// Interpreted styles keyed by layer identifier
pub type StyleMap = BTreeMap<String, StyleDescriptor>;

/// Reconstruct the style of every layer from the rule functions in an entry document
///
/// QGIS2Web emits one `function style_<layer>_0(feature) { ... }` per layer.
/// Only inline script elements are scanned. Functions whose body cannot be
/// delimited are skipped; a document without any rule function yields an
/// empty map. When a layer has several rule functions, the last recognizable
/// one wins.
pub fn interpret_styles(index_html: &str) -> StyleMap {
    let mut styles = StyleMap::new();

    for script in script_blocks(index_html) {
        let tokens = tokenize(script);
        for (layer_id, body) in rule_functions(&tokens) {
            match interpret_body(body) {
                Some(style) => {
                    debug!("Layer {} has a {} style", layer_id, style.kind());
                    styles.insert(layer_id, style);
                }
                None => debug!("No style recognized for layer {}", layer_id),
            }
        }
    }

    styles
}

/// Classify one rule-function body: categorical, then graduated, then simple
pub fn interpret_body(body: &[Token<'_>]) -> Option<StyleDescriptor> {
    if let Some(property) = first_property(body) {
        if body.iter().any(|t| t.is_ident("switch")) {
            return Some(StyleDescriptor::Categorical(categorical(property, body)));
        }
    }

    if let Some(style) = graduated(body) {
        return Some(StyleDescriptor::Graduated(style));
    }

    simple(body).map(StyleDescriptor::Simple)
}

/// `(layer id, body tokens)` for every well-formed rule function, in document order
fn rule_functions<'t, 'a>(tokens: &'t [Token<'a>]) -> Vec<(String, &'t [Token<'a>])> {
    let mut found = Vec::new();

    for (i, token) in tokens.iter().enumerate() {
        if !token.is_ident("function") {
            continue;
        }
        let Some(layer_id) = tokens.get(i + 1).and_then(rule_layer_id) else {
            continue;
        };
        if !tokens.get(i + 2).is_some_and(|t| t.is_punct("(")) {
            continue;
        }

        let Some(params_close) = matching_close(tokens, i + 2, "(", ")") else {
            warn!("Unbalanced parameter list in style function of layer {}, skipped", layer_id);
            continue;
        };
        let body_open = params_close + 1;
        if !tokens.get(body_open).is_some_and(|t| t.is_punct("{")) {
            debug!("Style function of layer {} has no body, skipped", layer_id);
            continue;
        }

        match matching_close(tokens, body_open, "{", "}") {
            Some(body_close) => found.push((layer_id, &tokens[body_open + 1..body_close])),
            None => warn!("Unbalanced body in style function of layer {}, skipped", layer_id),
        }
    }

    found
}

/// Layer id embedded in a `style_<id>_0` function name
fn rule_layer_id(token: &Token<'_>) -> Option<String> {
    if token.kind != TokenKind::Ident {
        return None;
    }
    let id = token.text.strip_prefix("style_")?.strip_suffix("_0")?;
    let valid = !id.is_empty() && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    valid.then(|| id.to_string())
}

fn first_property(body: &[Token<'_>]) -> Option<String> {
    (0..body.len()).find_map(|i| Cursor::at(body, i).property())
}

fn categorical(property: String, body: &[Token<'_>]) -> CategorizedStyle {
    let mut cases = BTreeMap::new();
    let mut default = None;

    for i in 0..body.len() {
        let mut cursor = Cursor::at(body, i);
        if let Some((label, props)) = cursor.case_arm() {
            cases.insert(label, props);
        } else if default.is_none() {
            default = Cursor::at(body, i).default_arm();
        }
    }

    CategorizedStyle::new(property, default.unwrap_or_default(), &cases)
}

fn graduated(body: &[Token<'_>]) -> Option<GraduatedStyle> {
    let mut property: Option<String> = None;
    let mut rules = Vec::new();

    for i in 0..body.len() {
        if !body[i].is_ident("if") {
            continue;
        }
        let Some(condition) = Cursor::at(body, i).range_condition() else {
            continue;
        };

        if condition.left != condition.right {
            debug!(
                "Range rule compares {} with {}, skipped",
                condition.left, condition.right
            );
            continue;
        }
        let field = property.get_or_insert_with(|| condition.left.clone());
        if *field != condition.left {
            debug!("Range rule on {} in a layer graduated on {}, skipped", condition.left, field);
            continue;
        }

        rules.push(RangeRule::new(
            condition.first,
            condition.second,
            StyleProps::from_object(condition.object),
        ));
    }

    property.map(|property| GraduatedStyle::new(property, rules))
}

fn simple(body: &[Token<'_>]) -> Option<StyleProps> {
    (0..body.len())
        .find_map(|i| {
            let mut cursor = Cursor::at(body, i);
            cursor.ident("return")?;
            cursor.object()
        })
        .filter(|object| !object.is_empty())
        .map(StyleProps::from_object)
}

/// `if (P op a && P op b) { return {...} }`
struct RangeCondition<'t, 'a> {
    left: String,
    right: String,
    first: f64,
    second: f64,
    object: &'t [Token<'a>],
}

/// Position in a token slice; every matcher returns `None` on mismatch
struct Cursor<'t, 'a> {
    tokens: &'t [Token<'a>],
    pos: usize,
}

impl<'t, 'a> Cursor<'t, 'a> {
    fn at(tokens: &'t [Token<'a>], pos: usize) -> Self {
        Self { tokens, pos }
    }

    fn next(&mut self) -> Option<&'t Token<'a>> {
        let token = self.tokens.get(self.pos)?;
        self.pos += 1;
        Some(token)
    }

    fn peek_is_punct(&self, punct: &str) -> bool {
        self.tokens.get(self.pos).is_some_and(|t| t.is_punct(punct))
    }

    fn ident(&mut self, name: &str) -> Option<()> {
        self.next().filter(|t| t.is_ident(name)).map(|_| ())
    }

    fn punct(&mut self, punct: &str) -> Option<()> {
        self.next().filter(|t| t.is_punct(punct)).map(|_| ())
    }

    fn string(&mut self) -> Option<String> {
        self.next()?.string_value()
    }

    /// `feature.properties['name']`
    fn property(&mut self) -> Option<String> {
        self.ident("feature")?;
        self.punct(".")?;
        self.ident("properties")?;
        self.punct("[")?;
        let name = self.string().filter(|name| !name.is_empty())?;
        self.punct("]")?;
        Some(name)
    }

    fn comparison(&mut self) -> Option<&'a str> {
        self.next()
            .filter(|t| t.kind == TokenKind::Punct && matches!(t.text, "<" | ">" | "<=" | ">="))
            .map(|t| t.text)
    }

    fn number(&mut self) -> Option<f64> {
        let negative = self.peek_is_punct("-");
        if negative {
            self.pos += 1;
        }
        let token = self.next().filter(|t| t.kind == TokenKind::Number)?;
        let Some(value) = token.number_value() else {
            warn!("Unparsable numeric literal {:?} in range rule, skipped", token.text);
            return None;
        };
        Some(if negative { -value } else { value })
    }

    /// Tokens between a `{` and its matching `}`; the cursor moves past the `}`
    fn object(&mut self) -> Option<&'t [Token<'a>]> {
        let close = matching_close(self.tokens, self.pos, "{", "}")?;
        let inner = &self.tokens[self.pos + 1..close];
        self.pos = close + 1;
        Some(inner)
    }

    /// `case 'label': return {...}`
    fn case_arm(&mut self) -> Option<(String, StyleProps)> {
        self.ident("case")?;
        let label = self.string()?;
        self.punct(":")?;
        self.ident("return")?;
        let object = self.object()?;
        Some((label, StyleProps::from_object(object)))
    }

    /// `default: return {...}`
    fn default_arm(&mut self) -> Option<StyleProps> {
        self.ident("default")?;
        self.punct(":")?;
        self.ident("return")?;
        self.object().map(StyleProps::from_object)
    }

    fn range_condition(&mut self) -> Option<RangeCondition<'t, 'a>> {
        self.ident("if")?;
        self.punct("(")?;
        let left = self.property()?;
        self.comparison()?;
        let first = self.number()?;
        self.punct("&&")?;
        let right = self.property()?;
        self.comparison()?;
        let second = self.number()?;
        self.punct(")")?;
        self.punct("{")?;
        self.ident("return")?;
        let object = self.object()?;
        if self.peek_is_punct(";") {
            self.pos += 1;
        }
        self.punct("}")?;

        Some(RangeCondition {
            left,
            right,
            first,
            second,
            object,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIMPLE: &str = r#"
        function style_Communes_1_0() {
            return {
                pane: 'pane_Communes_1',
                opacity: 1,
                color: 'rgba(35,35,35,1.0)',
                dashArray: '',
                weight: 1.0,
                fill: true,
                fillOpacity: 1,
                fillColor: 'rgba(190,178,151,0.2)',
                interactive: true,
            }
        }
    "#;

    const CATEGORICAL: &str = r#"
        function style_Occupation_2_0(feature) {
            switch(String(feature.properties['type'])) {
                case 'Forêt':
                    return {
                        pane: 'pane_Occupation_2',
                        color: 'rgba(35,35,35,1.0)',
                        fillColor: 'rgba(51,160,44,1.0)',
                        weight: 3.0,
                    }
                    break;
                case 'Garrigue':
                    return {
                        color: 'rgba(35,35,35,1.0)',
                        fillColor: 'rgba(178,223,138,1.0)',
                    }
                    break;
                default:
                    return {
                        opacity: 1,
                        color: 'rgba(0,0,0,1.0)',
                        weight: 1.0,
                        fillOpacity: 0.6,
                        fillColor: 'rgba(200,200,200,1.0)',
                    }
                    break;
            }
        }
    "#;

    const GRADUATED: &str = r#"
        function style_Incendies_3_0(feature) {
            if (feature.properties['surf_ha'] >= 0.0 && feature.properties['surf_ha'] <= 1.0 ) {
                return {
                    opacity: 1,
                    color: 'rgba(35,35,35,1.0)',
                    weight: 1.0,
                    fillOpacity: 1,
                    fillColor: 'rgba(255,255,178,1.0)',
                }
            }
            if (feature.properties['surf_ha'] > 10 && feature.properties['surf_ha'] <= 3) {
                return { fillColor: 'rgba(253,141,60,1.0)', }
            }
            if (feature.properties['surf_ha'] >= 50 && feature.properties['autre'] <= 100) {
                return { fillColor: 'rgba(0,0,0,1.0)', }
            }
        }
    "#;

    #[test]
    fn test_simple_style() {
        let styles = interpret_styles(SIMPLE);
        let Some(StyleDescriptor::Simple(style)) = styles.get("Communes_1") else {
            panic!("Expected simple style, got {styles:?}");
        };
        assert_eq!(style.stroke.as_deref(), Some("rgba(35,35,35,1.0)"));
        assert_eq!(style.fill.as_deref(), Some("rgba(190,178,151,0.2)"));
        assert_eq!(style.paint.weight, Some(1.0));
        assert_eq!(style.paint.fill_enabled, Some(true));
        assert_eq!(style.paint.stroke_enabled, None);
    }

    #[test]
    fn test_categorical_style() {
        let styles = interpret_styles(CATEGORICAL);
        let Some(StyleDescriptor::Categorical(style)) = styles.get("Occupation_2") else {
            panic!("Expected categorical style, got {styles:?}");
        };
        assert_eq!(style.property, "type");
        assert_eq!(style.stroke.default.as_deref(), Some("rgba(0,0,0,1.0)"));
        assert_eq!(style.fill.default.as_deref(), Some("rgba(200,200,200,1.0)"));
        assert_eq!(style.fill.values["Forêt"], "rgba(51,160,44,1.0)");
        assert_eq!(style.fill.values["Garrigue"], "rgba(178,223,138,1.0)");
        assert_eq!(style.stroke.values.len(), 2);
        // Non-color attributes come from the default arm only
        assert_eq!(style.paint.weight, Some(1.0));
        assert_eq!(style.paint.fill_opacity, Some(0.6));
    }

    #[test]
    fn test_graduated_style_normalizes_and_skips_mixed_fields() {
        let styles = interpret_styles(GRADUATED);
        let Some(StyleDescriptor::Graduated(style)) = styles.get("Incendies_3") else {
            panic!("Expected graduated style, got {styles:?}");
        };
        assert_eq!(style.property, "surf_ha");
        assert_eq!(style.rules.len(), 2);
        assert_eq!((style.rules[0].min, style.rules[0].max), (0.0, 1.0));
        assert_eq!((style.rules[1].min, style.rules[1].max), (3.0, 10.0));
        assert_eq!(style.rules[1].style.fill.as_deref(), Some("rgba(253,141,60,1.0)"));
        assert_eq!(style.paint.fill_opacity, Some(1.0));
    }

    #[test]
    fn test_graduated_rule_on_other_field_than_first_is_skipped() {
        let html = r#"
            function style_L_0(feature) {
                if (feature.properties['a'] >= 1 && feature.properties['a'] <= 2) { return { color: 'x' } }
                if (feature.properties['b'] >= 2 && feature.properties['b'] <= 3) { return { color: 'y' } }
                if (feature.properties['a'] >= -5 && feature.properties['a'] < 0) { return { color: 'z' } }
            }
        "#;
        let Some(StyleDescriptor::Graduated(style)) = interpret_styles(html).remove("L") else {
            panic!("Expected graduated style");
        };
        assert_eq!(style.property, "a");
        let bounds: Vec<_> = style.rules.iter().map(|r| (r.min, r.max)).collect();
        assert_eq!(bounds, vec![(1.0, 2.0), (-5.0, 0.0)]);
    }

    #[test]
    fn test_braces_in_strings_do_not_break_bodies() {
        let html = r#"
            function style_A_0() { return { color: '}}', weight: 2 } }
            function style_B_0() { return { color: '{', fillColor: 'blue' } }
        "#;
        let styles = interpret_styles(html);
        assert_eq!(styles.len(), 2);
        let Some(StyleDescriptor::Simple(b)) = styles.get("B") else {
            panic!("Expected simple style for B");
        };
        assert_eq!(b.fill.as_deref(), Some("blue"));
    }

    #[test]
    fn test_unbalanced_function_is_skipped_alone() {
        let html = r#"
            function style_Good_1_0() { return { color: 'red' } }
            function style_Broken_2_0() { return { color: 'blue' }
        "#;
        let styles = interpret_styles(html);
        assert!(styles.contains_key("Good_1"));
        assert!(!styles.contains_key("Broken_2"));
    }

    #[test]
    fn test_unparsable_bound_skips_that_rule() {
        let html = r#"
            function style_H_0(feature) {
                if (feature.properties['v'] >= 0x10 && feature.properties['v'] <= 20) { return { color: 'a' } }
                if (feature.properties['v'] >= 20 && feature.properties['v'] <= 30) { return { color: 'b' } }
            }
        "#;
        let Some(StyleDescriptor::Graduated(style)) = interpret_styles(html).remove("H") else {
            panic!("Expected graduated style");
        };
        assert_eq!(style.rules.len(), 1);
        assert_eq!(style.rules[0].min, 20.0);
    }

    #[test]
    fn test_stray_backtick_in_markup_does_not_hide_scripts() {
        let html = "<p>use `code here</p>\n<script>\nfunction style_Zones_1_0() { return { color: 'red' } }</script>";
        let styles = interpret_styles(html);
        assert_eq!(styles.keys().collect::<Vec<_>>(), vec!["Zones_1"]);
    }

    #[test]
    fn test_unclosed_template_literal_stays_in_its_script() {
        let html = r#"
            <script>var banner = `oops;</script>
            <SCRIPT type="text/javascript">
                function style_After_1_0() { return { fillColor: 'blue' } }
            </SCRIPT>
        "#;
        let Some(StyleDescriptor::Simple(style)) = interpret_styles(html).remove("After_1") else {
            panic!("Expected simple style");
        };
        assert_eq!(style.fill.as_deref(), Some("blue"));
    }

    #[test]
    fn test_no_rule_functions_is_empty() {
        assert!(interpret_styles("<html><body>l'été</body></html>").is_empty());
        assert!(interpret_styles("").is_empty());
    }

    #[test]
    fn test_empty_return_object_is_not_a_style() {
        assert!(interpret_styles("function style_E_0() { return {} }").is_empty());
    }

    #[test]
    fn test_invalid_layer_ids_are_ignored() {
        assert!(interpret_styles("function style__0() { return { color: 'a' } }").is_empty());
        assert!(interpret_styles("function style_x_1() { return { color: 'a' } }").is_empty());
    }

    #[test]
    fn test_later_definition_wins() {
        let html = r#"
            function style_D_0() { return { color: 'first' } }
            function style_D_0() { return { color: 'second' } }
        "#;
        let Some(StyleDescriptor::Simple(style)) = interpret_styles(html).remove("D") else {
            panic!("Expected simple style");
        };
        assert_eq!(style.stroke.as_deref(), Some("second"));
    }
}
