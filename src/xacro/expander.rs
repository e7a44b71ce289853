//! Single-pass recursive expander
//!
//! Nodes are processed in document order, so definitions are visible to
//! everything that follows them and conditionals skip whole subtrees without
//! evaluating them. One input node can expand to zero nodes (definitions),
//! one node (plain elements) or many (macro calls, includes).

use super::macros::{MacroDefinition, ParamDefault};
use super::scope::Properties;
use super::{is_known_xacro_uri, xacro_namespace_of};
use crate::error::XacroError;
use core::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use xmltree::{Element, XMLNode};

/// State shared by one expansion run.
pub struct XacroContext {
    pub properties: Properties,
    pub macros: RefCell<HashMap<String, Rc<MacroDefinition>>>,
    /// Files currently being included, for circular include detection
    pub include_stack: RefCell<Vec<PathBuf>>,
    /// Every file read during the run, in order
    pub all_includes: RefCell<Vec<PathBuf>>,
    /// xacro namespace URI per file on the include stack
    pub namespace_stack: RefCell<Vec<String>>,
    /// Pre-expanded block arguments of the macro calls in progress
    pub block_stack: RefCell<Vec<HashMap<String, Vec<XMLNode>>>>,
    /// Directory relative includes are resolved against
    pub base_path: RefCell<PathBuf>,
    pub recursion_depth: RefCell<usize>,
    pub max_recursion_depth: usize,
}

impl XacroContext {
    pub fn new(
        base_path: PathBuf,
        xacro_ns: String,
        args: HashMap<String, String>,
        max_recursion_depth: usize,
    ) -> Self {
        Self {
            properties: Properties::new(args),
            macros: RefCell::new(HashMap::new()),
            include_stack: RefCell::new(Vec::new()),
            all_includes: RefCell::new(Vec::new()),
            namespace_stack: RefCell::new(vec![xacro_ns]),
            block_stack: RefCell::new(Vec::new()),
            base_path: RefCell::new(base_path),
            recursion_depth: RefCell::new(0),
            max_recursion_depth,
        }
    }

    fn current_xacro_ns(&self) -> String {
        self.namespace_stack.borrow().last().cloned().unwrap_or_default()
    }
}

/// Decrements the recursion counter when dropped.
struct DepthGuard<'a> {
    depth: &'a RefCell<usize>,
}

impl<'a> DepthGuard<'a> {
    fn new(depth: &'a RefCell<usize>) -> Self {
        *depth.borrow_mut() += 1;
        Self { depth }
    }
}

impl Drop for DepthGuard<'_> {
    fn drop(&mut self) {
        let mut depth = self.depth.borrow_mut();
        *depth = depth.saturating_sub(1);
    }
}

/// Pops the macro parameter scope and block stack entry when dropped.
struct MacroScopeGuard<'a> {
    ctx: &'a XacroContext,
}

impl Drop for MacroScopeGuard<'_> {
    fn drop(&mut self) {
        self.ctx.properties.pop_scope();
        self.ctx.block_stack.borrow_mut().pop();
    }
}

/// Restores the base path and pops the include and namespace stacks.
struct IncludeGuard<'a> {
    ctx: &'a XacroContext,
    old_base_path: PathBuf,
}

impl Drop for IncludeGuard<'_> {
    fn drop(&mut self) {
        *self.ctx.base_path.borrow_mut() = core::mem::take(&mut self.old_base_path);
        self.ctx.include_stack.borrow_mut().pop();
        self.ctx.namespace_stack.borrow_mut().pop();
    }
}

/// Expand one node into the nodes that replace it.
pub fn expand_node(
    node: XMLNode,
    ctx: &XacroContext,
) -> Result<Vec<XMLNode>, XacroError> {
    let depth = *ctx.recursion_depth.borrow();
    if depth >= ctx.max_recursion_depth {
        return Err(XacroError::MacroRecursionLimit {
            depth,
            limit: ctx.max_recursion_depth,
        });
    }
    let _depth_guard = DepthGuard::new(&ctx.recursion_depth);

    match node {
        XMLNode::Element(elem) => expand_element(elem, ctx),
        XMLNode::Text(text) => Ok(vec![XMLNode::Text(ctx.properties.substitute_all(&text)?)]),
        other => Ok(vec![other]),
    }
}

pub fn expand_children(
    children: Vec<XMLNode>,
    ctx: &XacroContext,
) -> Result<Vec<XMLNode>, XacroError> {
    children.into_iter().try_fold(Vec::new(), |mut acc, child| {
        acc.extend(expand_node(child, ctx)?);
        Ok(acc)
    })
}

fn required_attr<'e>(
    elem: &'e Element,
    attribute: &str,
) -> Result<&'e String, XacroError> {
    elem.attributes
        .get(attribute)
        .ok_or_else(|| XacroError::MissingAttribute {
            element: format!("xacro:{}", elem.name),
            attribute: attribute.to_string(),
        })
}

fn is_xacro(
    elem: &Element,
    xacro_ns: &str,
) -> bool {
    !xacro_ns.is_empty()
        && elem
            .namespace
            .as_deref()
            .is_some_and(|ns| ns == xacro_ns || is_known_xacro_uri(ns))
}

fn expand_element(
    mut elem: Element,
    ctx: &XacroContext,
) -> Result<Vec<XMLNode>, XacroError> {
    let xacro_ns = ctx.current_xacro_ns();

    if !is_xacro(&elem, &xacro_ns) {
        // Plain element: substitute attributes, then recurse
        for value in elem.attributes.values_mut() {
            *value = ctx.properties.substitute_all(value)?;
        }
        elem.children = expand_children(core::mem::take(&mut elem.children), ctx)?;
        return Ok(vec![XMLNode::Element(elem)]);
    }

    match elem.name.as_str() {
        "property" => define_property(&elem, ctx).map(|()| vec![]),
        "arg" => {
            let name = required_attr(&elem, "name")?;
            let default = elem
                .attributes
                .get("default")
                .map(|d| ctx.properties.substitute_all(d))
                .transpose()?;
            ctx.properties.declare_arg(name, default);
            Ok(vec![])
        }
        "macro" => {
            let def = MacroDefinition::from_element(&elem)?;
            log::debug!("defined macro '{}' ({:?})", def.name, def.param_order);
            ctx.macros.borrow_mut().insert(def.name.clone(), Rc::new(def));
            Ok(vec![])
        }
        "if" | "unless" => {
            let condition = ctx.properties.eval_boolean(required_attr(&elem, "value")?)?;
            if condition == (elem.name == "if") {
                expand_children(elem.children, ctx)
            } else {
                Ok(vec![])
            }
        }
        "include" => expand_include(&elem, ctx),
        "insert_block" => {
            let name = ctx.properties.substitute_all(required_attr(&elem, "name")?)?;
            ctx.block_stack
                .borrow()
                .last()
                .and_then(|blocks| blocks.get(&name))
                .cloned()
                .ok_or(XacroError::UndefinedBlock { name })
        }
        // Anything else in the xacro namespace must be a macro call
        name => {
            let def = ctx.macros.borrow().get(name).cloned();
            match def {
                Some(def) => expand_macro_call(&elem, &def, ctx),
                None => Err(XacroError::UnsupportedDirective(name.to_string())),
            }
        }
    }
}

fn define_property(
    elem: &Element,
    ctx: &XacroContext,
) -> Result<(), XacroError> {
    let name = required_attr(elem, "name")?;
    match (elem.attributes.get("value"), elem.attributes.get("default")) {
        (Some(value), _) => ctx.properties.add_raw_property(name.clone(), value.clone()),
        (None, Some(default)) => {
            if !ctx.properties.has_property(name) {
                ctx.properties.add_raw_property(name.clone(), default.clone());
            }
        }
        (None, None) => {
            return Err(XacroError::MissingAttribute {
                element: "xacro:property".to_string(),
                attribute: "value or default".to_string(),
            })
        }
    }
    Ok(())
}

fn expand_macro_call(
    call: &Element,
    def: &MacroDefinition,
    ctx: &XacroContext,
) -> Result<Vec<XMLNode>, XacroError> {
    // Conditionals inside the call decide which children become blocks
    let mut call = call.clone();
    call.children = expand_children(core::mem::take(&mut call.children), ctx)?;
    let (args, raw_blocks) = def.collect_args(&call)?;

    // Arguments and blocks are evaluated in the caller's scope
    let mut blocks = HashMap::new();
    for (name, block) in raw_blocks {
        let expanded = if def.lazy_block_params.contains(&name) {
            expand_children(block.children, ctx)?
        } else {
            expand_node(XMLNode::Element(block), ctx)?
        };
        blocks.insert(name, expanded);
    }
    let mut evaluated = HashMap::new();
    for (name, value) in args {
        evaluated.insert(name, ctx.properties.substitute_all(&value)?);
    }
    let mut forwarded = HashMap::new();
    for (name, default) in &def.params {
        if let ParamDefault::Forward(_) = default {
            if let Some(value) = ctx.properties.lookup_raw(name) {
                forwarded.insert(name.clone(), ctx.properties.substitute_all(&value)?);
            }
        }
    }

    ctx.properties.push_scope(HashMap::new());
    ctx.block_stack.borrow_mut().push(blocks);
    let _scope_guard = MacroScopeGuard { ctx };

    // Declaration order lets later defaults reference earlier parameters
    for param in &def.param_order {
        if def.block_params.contains(param) {
            continue;
        }
        let value = match (evaluated.remove(param), &def.params[param]) {
            (Some(value), _) => value,
            (None, ParamDefault::Value(default)) => ctx.properties.substitute_all(default)?,
            (None, ParamDefault::Forward(default)) => match (forwarded.remove(param), default) {
                (Some(value), _) => value,
                (None, Some(default)) => ctx.properties.substitute_all(default)?,
                (None, None) => {
                    return Err(XacroError::PropertyNotFound(format!(
                        "'{}' forwarded to macro '{}' is not defined",
                        param, def.name
                    )))
                }
            },
            (None, ParamDefault::None) => {
                return Err(XacroError::MissingParameter {
                    macro_name: def.name.clone(),
                    param: param.clone(),
                })
            }
        };
        ctx.properties.add_to_current_scope(param.clone(), value);
    }

    expand_children(def.content.children.clone(), ctx)
}

fn expand_include(
    elem: &Element,
    ctx: &XacroContext,
) -> Result<Vec<XMLNode>, XacroError> {
    let filename = ctx.properties.substitute_all(required_attr(elem, "filename")?)?;
    let optional = match elem.attributes.get("optional") {
        Some(value) => ctx.properties.eval_boolean(value)?,
        None => false,
    };

    let path = {
        let candidate = Path::new(&filename);
        if candidate.is_absolute() {
            candidate.to_path_buf()
        } else {
            ctx.base_path.borrow().join(candidate)
        }
    };

    if !path.exists() {
        if optional {
            log::debug!("skipping optional include {}", path.display());
            return Ok(vec![]);
        }
        return Err(XacroError::Include(format!(
            "No such file: {}",
            path.display()
        )));
    }
    if ctx.include_stack.borrow().contains(&path) {
        return Err(XacroError::Include(format!(
            "Circular include detected: {}",
            path.display()
        )));
    }

    let content = std::fs::read_to_string(&path).map_err(|e| {
        XacroError::Include(format!("Failed to read file '{}': {}", path.display(), e))
    })?;
    let included = Element::parse(content.as_bytes()).map_err(|e| {
        XacroError::Include(format!(
            "Failed to parse XML in file '{}': {}",
            path.display(),
            e
        ))
    })?;
    let included_ns = xacro_namespace_of(&included).unwrap_or_else(|| ctx.current_xacro_ns());
    log::debug!("including {}", path.display());

    let new_base = path.parent().map(Path::to_path_buf).unwrap_or_default();
    let old_base_path = core::mem::replace(&mut *ctx.base_path.borrow_mut(), new_base);
    ctx.include_stack.borrow_mut().push(path.clone());
    ctx.namespace_stack.borrow_mut().push(included_ns);
    ctx.all_includes.borrow_mut().push(path);
    let _include_guard = IncludeGuard { ctx, old_base_path };

    expand_children(included.children, ctx)
}
