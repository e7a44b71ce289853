//! Generation of URDF files from the `*.urdf.xacro` templates of a resource
//! directory.

use crate::engine::TemplateEngine;
use crate::error::{Error, Result};
use crate::xacro::XacroProcessor;
use log::{debug, info};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Suffix identifying template files
pub const TEMPLATE_SUFFIX: &str = ".urdf.xacro";

/// Subdirectory of a resource directory holding the templates
pub const TEMPLATE_DIR: &str = "xacro";

pub struct TemplateBuilder {
    engine: Box<dyn TemplateEngine>,
}

impl Default for TemplateBuilder {
    fn default() -> Self {
        Self::new(Box::new(XacroProcessor::new()))
    }
}

impl TemplateBuilder {
    pub fn new(engine: Box<dyn TemplateEngine>) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &dyn TemplateEngine {
        self.engine.as_ref()
    }

    /// All templates below `<resources_dir>/xacro`, sorted by path.
    ///
    /// A missing template directory yields no templates.
    pub fn discover(resources_dir: &Path) -> Result<Vec<PathBuf>> {
        let root = resources_dir.join(TEMPLATE_DIR);
        info!("Searching XACRO files in: {}", root.display());
        if !root.is_dir() {
            return Ok(Vec::new());
        }

        let mut templates = Vec::new();
        for entry in WalkDir::new(&root).sort_by_file_name() {
            let entry = entry.map_err(|e| {
                let path = e.path().unwrap_or(root.as_path()).to_path_buf();
                Error::io(path, e.into())
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let is_template = entry
                .file_name()
                .to_string_lossy()
                .ends_with(TEMPLATE_SUFFIX);
            if is_template {
                info!("- {}", entry.path().display());
                templates.push(entry.into_path());
            } else {
                debug!("skipping {}", entry.path().display());
            }
        }
        templates.sort();
        Ok(templates)
    }

    /// Where the template at `template` is generated to: its file name
    /// minus the final extension, directly inside `resources_dir`.
    ///
    /// `xacro/legs/bolt.urdf.xacro` becomes `<resources_dir>/bolt.urdf`.
    pub fn output_path(
        resources_dir: &Path,
        template: &Path,
    ) -> PathBuf {
        let stem = template.file_stem().unwrap_or(template.as_os_str());
        resources_dir.join(stem)
    }

    /// Generate every template of `resources_dir`.
    ///
    /// Returns the written files in build order. The first failure aborts
    /// the run; files generated before it are left in place.
    pub fn build_all(
        &self,
        resources_dir: &Path,
    ) -> Result<Vec<PathBuf>> {
        let templates = Self::discover(resources_dir)?;

        if !resources_dir.exists() {
            // Only the leaf is created; a missing parent is an error
            fs::create_dir(resources_dir).map_err(|e| Error::io(resources_dir, e))?;
            info!("Build folder [{}]", resources_dir.display());
        }

        let mut generated = Vec::with_capacity(templates.len());
        for template in &templates {
            let output = Self::output_path(resources_dir, template);
            self.build_single(template, &output)?;
            info!("Build: {}", output.display());
            generated.push(output);
        }
        Ok(generated)
    }

    /// Expand `input` and write the pretty-printed result to `output`.
    ///
    /// `output` is only opened once expansion succeeded, so a broken
    /// template never leaves an empty or truncated file behind.
    pub fn build_single(
        &self,
        input: &Path,
        output: &Path,
    ) -> Result<()> {
        info!(
            "building xacro file ({}) into ({}) with {}",
            input.display(),
            output.display(),
            self.engine.name()
        );

        let xml = self.render(input)?;
        fs::write(output, xml).map_err(|source| Error::Write {
            path: output.to_path_buf(),
            source,
        })
    }

    /// Expand `input` and serialize it the way [`TemplateBuilder::build_single`]
    /// writes it.
    pub fn render(
        &self,
        input: &Path,
    ) -> Result<String> {
        let doc = self
            .engine
            .expand(input)
            .map_err(|e| Error::expand(input, e))?;
        doc.to_xml_string().map_err(|e| Error::expand(input, e))
    }
}
