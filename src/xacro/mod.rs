//! In-process xacro expansion.
//!
//! Covers the directives robot description packages rely on: properties,
//! arguments, macros with block parameters, conditionals and includes, with
//! `${...}` expressions evaluated by [`eval`]. Anything else in the xacro
//! namespace is rejected with [`XacroError::UnsupportedDirective`].

pub mod document;
pub mod eval;
mod expander;
pub mod lexer;
pub mod macros;
mod scope;

use crate::error::XacroError;
use document::XacroDocument;
use expander::{expand_children, XacroContext};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use xmltree::{Element, XMLNode};

/// Namespace URIs used for xacro in the wild
const KNOWN_XACRO_URIS: &[&str] = &[
    "http://www.ros.org/wiki/xacro",
    "http://ros.org/wiki/xacro",
    "http://wiki.ros.org/xacro",
    "http://www.ros.org/xacro",
    "http://playerstage.sourceforge.net/gazebo/xmlschema/#xacro",
];

pub(crate) fn is_known_xacro_uri(uri: &str) -> bool {
    KNOWN_XACRO_URIS.contains(&uri)
}

/// The xacro namespace URI declared on `root`, preferring the `xacro` prefix.
pub(crate) fn xacro_namespace_of(root: &Element) -> Option<String> {
    let ns = root.namespaces.as_ref()?;
    ns.get("xacro")
        .filter(|uri| is_known_xacro_uri(uri))
        .or_else(|| {
            ns.0.values()
                .map(String::as_str)
                .find(|uri| is_known_xacro_uri(uri))
        })
        .map(str::to_string)
}

pub struct XacroProcessor {
    args: HashMap<String, String>,
    max_recursion_depth: usize,
}

impl XacroProcessor {
    pub const DEFAULT_MAX_DEPTH: usize = 100;

    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn builder() -> XacroBuilder {
        XacroBuilder::default()
    }

    /// Expand the file at `path` into a document.
    ///
    /// Relative includes resolve against the file's directory.
    pub fn process_file<P: AsRef<Path>>(
        &self,
        path: P,
    ) -> Result<XacroDocument, XacroError> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)?;
        let doc = XacroDocument::parse(file)?;
        let base = path.parent().map(Path::to_path_buf).unwrap_or_default();
        self.process_document(doc, base)
    }

    /// Expand the file at `path` and serialize the result.
    pub fn run<P: AsRef<Path>>(
        &self,
        path: P,
    ) -> Result<String, XacroError> {
        self.process_file(path)?.to_xml_string()
    }

    /// Expand xacro content held in memory.
    ///
    /// Relative includes resolve against the current working directory.
    pub fn run_from_string(
        &self,
        content: &str,
    ) -> Result<String, XacroError> {
        let doc = XacroDocument::parse(content.as_bytes())?;
        self.process_document(doc, PathBuf::from("."))?.to_xml_string()
    }

    fn process_document(
        &self,
        doc: XacroDocument,
        base_path: PathBuf,
    ) -> Result<XacroDocument, XacroError> {
        let XacroDocument { preamble, mut root } = doc;

        if let Some(uri) = root.namespaces.as_ref().and_then(|ns| ns.get("xacro")) {
            if !is_known_xacro_uri(uri) {
                return Err(XacroError::InvalidXml(format!(
                    "The 'xacro' prefix is bound to an unknown URI: '{}'. Known xacro URIs are: {}",
                    uri,
                    KNOWN_XACRO_URIS.join(", ")
                )));
            }
        }
        let xacro_ns = xacro_namespace_of(&root).unwrap_or_default();

        let ctx = XacroContext::new(
            base_path,
            xacro_ns,
            self.args.clone(),
            self.max_recursion_depth,
        );

        for value in root.attributes.values_mut() {
            *value = ctx.properties.substitute_all(value)?;
        }
        root.children = expand_children(core::mem::take(&mut root.children), &ctx)?;
        log::debug!(
            "expanded <{}> with {} included file(s)",
            root.name,
            ctx.all_includes.borrow().len()
        );

        finalize_tree(&mut root);
        Ok(XacroDocument { preamble, root })
    }
}

/// Drop every namespace prefix bound to a xacro URI from the output tree.
fn finalize_tree(element: &mut Element) {
    if let Some(ref mut ns) = element.namespaces {
        let prefixes: Vec<String> = ns
            .0
            .iter()
            .filter(|(_, uri)| is_known_xacro_uri(uri))
            .map(|(prefix, _)| prefix.clone())
            .collect();
        for prefix in prefixes {
            ns.0.remove(&prefix);
        }
    }

    for child in &mut element.children {
        if let XMLNode::Element(child) = child {
            finalize_tree(child);
        }
    }
}

/// Configures an [`XacroProcessor`].
pub struct XacroBuilder {
    args: HashMap<String, String>,
    max_recursion_depth: usize,
}

impl Default for XacroBuilder {
    fn default() -> Self {
        Self {
            args: HashMap::new(),
            max_recursion_depth: XacroProcessor::DEFAULT_MAX_DEPTH,
        }
    }
}

impl XacroBuilder {
    /// Value for `$(arg name)`, overriding the `xacro:arg` default.
    pub fn with_arg(
        mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.args.insert(name.into(), value.into());
        self
    }

    pub fn with_args<I, K, V>(
        mut self,
        args: I,
    ) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.args
            .extend(args.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    pub fn with_max_depth(
        mut self,
        depth: usize,
    ) -> Self {
        self.max_recursion_depth = depth;
        self
    }

    pub fn build(self) -> XacroProcessor {
        XacroProcessor {
            args: self.args,
            max_recursion_depth: self.max_recursion_depth,
        }
    }
}
