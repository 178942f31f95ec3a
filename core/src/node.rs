//! Render output: pre-built nodes, templated results and the [`Renderable`] sum type.

use core::fmt::Write as _;

use serde_json::Value;

/// A pre-built node handed to a rendering surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// An element with attributes and children.
    Element {
        /// Tag name, e.g. `button`.
        tag: String,
        /// Attributes in insertion order.
        attributes: Vec<(String, String)>,
        /// Child nodes.
        children: Vec<Node>,
    },
    /// A text node. Escaped when serialized.
    Text(String),
    /// A markup fragment parsed by the surface.
    Markup(String),
}

impl Node {
    /// Creates an empty element node.
    #[must_use]
    pub fn element(tag: impl Into<String>) -> Self {
        Self::Element {
            tag: tag.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Creates a text node.
    #[must_use]
    pub fn text(content: impl Into<String>) -> Self {
        Self::Text(content.into())
    }

    /// Creates a raw markup fragment.
    #[must_use]
    pub fn markup(content: impl Into<String>) -> Self {
        Self::Markup(content.into())
    }

    /// Adds an attribute. Ignored on text and markup nodes.
    #[must_use]
    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        if let Self::Element { attributes, .. } = &mut self {
            attributes.push((name.into(), value.into()));
        }
        self
    }

    /// Appends a child. Ignored on text and markup nodes.
    #[must_use]
    pub fn child(mut self, node: Self) -> Self {
        if let Self::Element { children, .. } = &mut self {
            children.push(node);
        }
        self
    }

    /// Serializes the node to markup.
    #[must_use]
    pub fn to_markup(&self) -> String {
        let mut out = String::new();
        self.write_markup(&mut out);
        out
    }

    fn write_markup(&self, out: &mut String) {
        match self {
            Self::Text(text) => escape_into(out, text, false),
            Self::Markup(markup) => out.push_str(markup),
            Self::Element {
                tag,
                attributes,
                children,
            } => {
                let _ = write!(out, "<{tag}");
                for (name, value) in attributes {
                    let _ = write!(out, " {name}=\"");
                    escape_into(out, value, true);
                    out.push('"');
                }
                out.push('>');
                for child in children {
                    child.write_markup(out);
                }
                let _ = write!(out, "</{tag}>");
            }
        }
    }
}

fn escape_into(out: &mut String, text: &str, attribute: bool) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if attribute => out.push_str("&quot;"),
            c => out.push(c),
        }
    }
}

/// Result of a template invocation: literal segments plus processed arguments.
///
/// Arguments are already reduced to plain values; callbacks have been replaced
/// with dispatch expressions by the template helper.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Template {
    strings: Vec<String>,
    values: Vec<Value>,
}

impl Template {
    /// Creates a template result from its parts.
    #[must_use]
    pub fn new(strings: Vec<String>, values: Vec<Value>) -> Self {
        Self { strings, values }
    }

    /// Literal text segments.
    #[must_use]
    pub fn strings(&self) -> &[String] {
        &self.strings
    }

    /// Processed arguments.
    #[must_use]
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Interleaves strings and stringified values.
    ///
    /// Each string is followed by the value at the same position, or nothing
    /// when values run out. Values without a preceding string are dropped.
    #[must_use]
    pub fn flatten(&self) -> String {
        let mut out = String::new();
        for (index, string) in self.strings.iter().enumerate() {
            out.push_str(string);
            if let Some(value) = self.values.get(index) {
                out.push_str(&stringify(value));
            }
        }
        out
    }
}

/// Renders a value the way template interpolation does: strings verbatim,
/// `null` as nothing, everything else as JSON text.
#[must_use]
pub fn stringify(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// What an element's render override produces.
#[derive(Debug, Clone, PartialEq)]
pub enum Renderable {
    /// Markup that replaces the surface content.
    Markup(String),
    /// A templated result, flattened to markup before it replaces the surface content.
    Template(Template),
    /// Nodes that replace every existing child, in order.
    Nodes(Vec<Node>),
    /// A node appended after the existing children.
    Node(Node),
}

impl Renderable {
    /// Output that clears the surface.
    #[must_use]
    pub fn empty() -> Self {
        Self::Markup(String::new())
    }
}

impl Default for Renderable {
    fn default() -> Self {
        Self::empty()
    }
}

impl From<String> for Renderable {
    fn from(value: String) -> Self {
        Self::Markup(value)
    }
}

impl From<&str> for Renderable {
    fn from(value: &str) -> Self {
        Self::Markup(value.to_string())
    }
}

impl From<Template> for Renderable {
    fn from(value: Template) -> Self {
        Self::Template(value)
    }
}

impl From<Vec<Node>> for Renderable {
    fn from(value: Vec<Node>) -> Self {
        Self::Nodes(value)
    }
}

impl From<Node> for Renderable {
    fn from(value: Node) -> Self {
        Self::Node(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn flatten_interleaves_and_tolerates_short_values() {
        let template = Template::new(
            vec!["Count: ".into(), " of ".into(), "".into()],
            vec![json!(3), json!("five")],
        );
        assert_eq!(template.flatten(), "Count: 3 of five");
    }

    #[test]
    fn null_values_render_as_nothing() {
        let template = Template::new(vec!["a".into(), "b".into()], vec![Value::Null]);
        assert_eq!(template.flatten(), "ab");
    }

    #[test]
    fn elements_serialize_with_escaping() {
        let node = Node::element("button")
            .attr("title", "say \"hi\"")
            .child(Node::text("1 < 2"))
            .child(Node::markup("<b>raw</b>"));
        assert_eq!(
            node.to_markup(),
            "<button title=\"say &quot;hi&quot;\">1 &lt; 2<b>raw</b></button>"
        );
    }

    #[test]
    fn builders_ignore_non_elements() {
        let node = Node::text("plain").attr("id", "x").child(Node::text("y"));
        assert_eq!(node, Node::text("plain"));
    }
}
