// QGIS2Web export bundles
//
// An export is a directory with an `index.html` entry document and one
// `data/<layer>.js` file per layer. Styles only exist as generated script in
// the entry document, so they are recovered by tokenizing that script.

pub mod catalog;
pub mod interpreter;
pub mod lexer;
pub mod style;

pub use catalog::{build_catalog, display_name, list_layers, order_key, LayerInfo, UNORDERED};
pub use interpreter::{interpret_styles, StyleMap};
pub use style::{CategorizedStyle, GraduatedStyle, Paint, RangeRule, StyleDescriptor, StyleProps};
