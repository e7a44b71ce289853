//! Macro definitions: parameter list parsing and call argument collection.

use crate::error::XacroError;
use std::collections::{HashMap, HashSet};
use xmltree::{Element, XMLNode};

#[derive(Debug, Clone, PartialEq)]
pub enum ParamDefault {
    None,
    /// `name:=expr`
    Value(String),
    /// `name:=^` or `name:=^|default`: take the caller's property of the same name
    Forward(Option<String>),
}

#[derive(Debug, Clone)]
pub struct MacroDefinition {
    pub name: String,
    pub params: HashMap<String, ParamDefault>,
    /// Declaration order; block arguments are matched positionally against it
    pub param_order: Vec<String>,
    pub block_params: HashSet<String>,
    /// `**name` blocks insert the children of the passed element only
    pub lazy_block_params: HashSet<String>,
    pub content: Element,
}

impl MacroDefinition {
    pub fn from_element(elem: &Element) -> Result<Self, XacroError> {
        let name = elem
            .attributes
            .get("name")
            .ok_or_else(|| XacroError::MissingAttribute {
                element: "xacro:macro".to_string(),
                attribute: "name".to_string(),
            })?
            .clone();
        let params_str = elem.attributes.get("params").map_or("", |s| s.as_str());

        let mut def = MacroDefinition {
            name,
            params: HashMap::new(),
            param_order: Vec::new(),
            block_params: HashSet::new(),
            lazy_block_params: HashSet::new(),
            content: elem.clone(),
        };
        def.parse_params(params_str)?;
        Ok(def)
    }

    fn parse_params(
        &mut self,
        params_str: &str,
    ) -> Result<(), XacroError> {
        for token in params_str.split_whitespace() {
            if let Some(stripped) = token.strip_prefix('*') {
                if token.contains(":=") {
                    return Err(XacroError::BlockParameterWithDefault {
                        param: token.to_string(),
                    });
                }
                let (param, lazy) = match stripped.strip_prefix('*') {
                    Some(inner) => (inner.to_string(), true),
                    None => (stripped.to_string(), false),
                };
                if lazy {
                    self.lazy_block_params.insert(param.clone());
                }
                self.block_params.insert(param.clone());
                self.params.insert(param.clone(), ParamDefault::None);
                self.param_order.push(param);
            } else if let Some((param, default)) = token.split_once(":=") {
                let default = match default.strip_prefix('^') {
                    Some(rest) => ParamDefault::Forward(rest.strip_prefix('|').map(str::to_string)),
                    None => ParamDefault::Value(default.to_string()),
                };
                self.params.insert(param.to_string(), default);
                self.param_order.push(param.to_string());
            } else {
                self.params.insert(token.to_string(), ParamDefault::None);
                self.param_order.push(token.to_string());
            }
        }
        Ok(())
    }

    /// Split a call into attribute arguments and block arguments.
    ///
    /// Element children of the call are assigned to the block parameters in
    /// declaration order.
    pub fn collect_args(
        &self,
        call: &Element,
    ) -> Result<(HashMap<String, String>, HashMap<String, Element>), XacroError> {
        let mut args = HashMap::new();
        for (name, value) in &call.attributes {
            if self.params.contains_key(name) && !self.block_params.contains(name) {
                args.insert(name.clone(), value.clone());
            } else {
                log::warn!(
                    "ignoring unknown parameter '{}' in call to macro '{}'",
                    name,
                    self.name
                );
            }
        }

        let mut children = call.children.iter().filter_map(XMLNode::as_element);
        let mut blocks = HashMap::new();
        for param in &self.param_order {
            if !self.block_params.contains(param) {
                continue;
            }
            let block = children
                .next()
                .ok_or_else(|| XacroError::MissingBlockParameter {
                    macro_name: self.name.clone(),
                    param: param.clone(),
                })?;
            blocks.insert(param.clone(), block.clone());
        }

        Ok((args, blocks))
    }
}
