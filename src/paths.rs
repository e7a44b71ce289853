//! Resolution of the conventional asset paths of a robot description package.
//!
//! ```text
//! <package>/robot_properties_<family>/
//! ├── dynamic_graph_manager/dgm_parameters_<robot>.yaml
//! ├── <robot>.urdf
//! ├── bolt_passive_ankle.urdf
//! ├── srdf/<family>.srdf
//! ├── impedance_ctrl.yaml
//! └── xacro/**/*.urdf.xacro
//! ```

use crate::engine::TemplateEngine;
use crate::error::{Error, Result};
use crate::templates::TemplateBuilder;
use crate::xacro::XacroProcessor;
use log::{debug, info};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Family used when the caller does not name one
pub const DEFAULT_FAMILY: &str = "bolt";

/// Overrides the package root when no directory is configured explicitly
pub const PACKAGE_DIR_ENV: &str = "ROBOT_PROPERTIES_PACKAGE_DIR";

/// Simulation model shipped with every family under the same name
const SIMU_URDF: &str = "bolt_passive_ankle.urdf";

/// Paths of one robot's description and configuration files.
///
/// Paths are computed from naming conventions only; none of them is
/// guaranteed to exist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceBundle {
    pub package: PathBuf,
    pub resources: PathBuf,
    pub dgm_yaml: PathBuf,
    pub srdf: PathBuf,
    pub urdf: PathBuf,
    pub simu_urdf: PathBuf,
    pub imp_ctrl_yaml: PathBuf,
}

impl ResourceBundle {
    pub const KEYS: [&'static str; 7] = [
        "package",
        "resources",
        "dgm_yaml",
        "srdf",
        "urdf",
        "simu_urdf",
        "imp_ctrl_yaml",
    ];

    /// Lay out the bundle of `robot_name` inside `package`.
    pub fn new(
        package: &Path,
        robot_name: &str,
        robot_family: &str,
    ) -> Self {
        let resources = package.join(format!("robot_properties_{}", robot_family));
        ResourceBundle {
            package: package.to_path_buf(),
            dgm_yaml: resources
                .join("dynamic_graph_manager")
                .join(format!("dgm_parameters_{}.yaml", robot_name)),
            srdf: resources.join("srdf").join(format!("{}.srdf", robot_family)),
            urdf: resources.join(format!("{}.urdf", robot_name)),
            simu_urdf: resources.join(SIMU_URDF),
            imp_ctrl_yaml: resources.join("impedance_ctrl.yaml"),
            resources,
        }
    }

    pub fn get(
        &self,
        key: &str,
    ) -> Option<&Path> {
        let path = match key {
            "package" => &self.package,
            "resources" => &self.resources,
            "dgm_yaml" => &self.dgm_yaml,
            "srdf" => &self.srdf,
            "urdf" => &self.urdf,
            "simu_urdf" => &self.simu_urdf,
            "imp_ctrl_yaml" => &self.imp_ctrl_yaml,
            _ => return None,
        };
        Some(path)
    }

    /// `(key, path)` pairs in [`ResourceBundle::KEYS`] order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &Path)> + '_ {
        Self::KEYS
            .iter()
            .filter_map(move |key| self.get(key).map(|path| (*key, path)))
    }

    pub fn to_map(&self) -> BTreeMap<String, String> {
        self.iter()
            .map(|(key, path)| (key.to_string(), path.to_string_lossy().into_owned()))
            .collect()
    }
}

/// Resolves [`ResourceBundle`]s and generates the URDF when it is missing.
pub struct PathResolver {
    package_dir: Option<PathBuf>,
    builder: TemplateBuilder,
}

impl Default for PathResolver {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl PathResolver {
    pub fn builder() -> PathResolverBuilder {
        PathResolverBuilder::default()
    }

    /// The package root: the configured directory, else
    /// `$ROBOT_PROPERTIES_PACKAGE_DIR`, else this crate's own directory.
    pub fn package_dir(&self) -> Result<PathBuf> {
        let dir = match &self.package_dir {
            Some(dir) => dir.clone(),
            None => std::env::var_os(PACKAGE_DIR_ENV)
                .filter(|value| !value.is_empty())
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(env!("CARGO_MANIFEST_DIR"))),
        };
        std::path::absolute(&dir).map_err(|e| Error::io(dir, e))
    }

    /// Resolve the bundle of `robot_name`, generating its URDF first if the
    /// file does not exist yet.
    ///
    /// `robot_family` defaults to [`DEFAULT_FAMILY`].
    pub fn find_paths(
        &self,
        robot_name: &str,
        robot_family: Option<&str>,
    ) -> Result<ResourceBundle> {
        let family = robot_family.unwrap_or(DEFAULT_FAMILY);
        let bundle = ResourceBundle::new(&self.package_dir()?, robot_name, family);

        if bundle.urdf.exists() {
            debug!("found {}", bundle.urdf.display());
        } else {
            info!(
                "{} is missing, generating URDF files in {}",
                bundle.urdf.display(),
                bundle.resources.display()
            );
            self.builder.build_all(&bundle.resources)?;
        }

        Ok(bundle)
    }
}

/// Configures a [`PathResolver`].
#[derive(Default)]
pub struct PathResolverBuilder {
    package_dir: Option<PathBuf>,
    engine: Option<Box<dyn TemplateEngine>>,
    args: Vec<(String, String)>,
}

impl PathResolverBuilder {
    pub fn package_dir(
        mut self,
        dir: impl Into<PathBuf>,
    ) -> Self {
        self.package_dir = Some(dir.into());
        self
    }

    /// Engine used to generate missing URDF files.
    pub fn engine(
        mut self,
        engine: Box<dyn TemplateEngine>,
    ) -> Self {
        self.engine = Some(engine);
        self
    }

    /// Argument for the default builtin engine.
    ///
    /// Ignored when an engine is set with [`PathResolverBuilder::engine`].
    pub fn with_arg(
        mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.args.push((name.into(), value.into()));
        self
    }

    pub fn build(self) -> PathResolver {
        let engine: Box<dyn TemplateEngine> = match self.engine {
            Some(engine) => engine,
            None => Box::new(XacroProcessor::builder().with_args(self.args).build()),
        };
        PathResolver {
            package_dir: self.package_dir,
            builder: TemplateBuilder::new(engine),
        }
    }
}

/// Resolve the bundle of `robot_name` with the default configuration.
///
/// See [`PathResolver::find_paths`].
pub fn find_paths(
    robot_name: &str,
    robot_family: Option<&str>,
) -> Result<ResourceBundle> {
    PathResolver::default().find_paths(robot_name, robot_family)
}
