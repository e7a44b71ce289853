//! The templating engine seam.
//!
//! Template generation only needs "turn this xacro file into an XML tree".
//! [`XacroProcessor`] does that in-process; [`XacroCommand`] delegates to an
//! external `xacro` executable, such as the one shipped with ROS.

use crate::error::XacroError;
use crate::xacro::document::XacroDocument;
use crate::xacro::XacroProcessor;
use std::path::Path;
use std::process::Command;

pub trait TemplateEngine {
    /// Expand the template at `input` into a document tree.
    fn expand(
        &self,
        input: &Path,
    ) -> Result<XacroDocument, XacroError>;

    /// Short name used in log messages.
    fn name(&self) -> &str;
}

impl TemplateEngine for XacroProcessor {
    fn expand(
        &self,
        input: &Path,
    ) -> Result<XacroDocument, XacroError> {
        self.process_file(input)
    }

    fn name(&self) -> &str {
        "builtin"
    }
}

/// Runs an external xacro executable and parses what it prints.
#[derive(Debug, Clone)]
pub struct XacroCommand {
    program: String,
    args: Vec<(String, String)>,
}

impl Default for XacroCommand {
    fn default() -> Self {
        Self::new("xacro")
    }
}

impl XacroCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Pass `name:=value` on the command line.
    pub fn with_arg(
        mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.args.push((name.into(), value.into()));
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    fn command_line(
        &self,
        input: &Path,
    ) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.arg(input);
        for (name, value) in &self.args {
            cmd.arg(format!("{}:={}", name, value));
        }
        cmd
    }
}

impl TemplateEngine for XacroCommand {
    fn expand(
        &self,
        input: &Path,
    ) -> Result<XacroDocument, XacroError> {
        log::debug!("running {} {}", self.program, input.display());
        let output = self.command_line(input).output()?;

        if !output.status.success() {
            return Err(XacroError::Command {
                program: self.program.clone(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        XacroDocument::parse(output.stdout.as_slice())
    }

    fn name(&self) -> &str {
        &self.program
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_line_arguments() {
        let engine = XacroCommand::default().with_arg("robot_name", "bolt");
        let cmd = engine.command_line(Path::new("bolt.urdf.xacro"));

        assert_eq!(cmd.get_program(), "xacro");
        let args: Vec<_> = cmd.get_args().map(|a| a.to_string_lossy().into_owned()).collect();
        assert_eq!(args, ["bolt.urdf.xacro", "robot_name:=bolt"]);
    }

    #[test]
    fn test_missing_program_is_io_error() {
        let engine = XacroCommand::new("robot-properties-no-such-xacro-binary");
        let err = engine.expand(Path::new("bolt.urdf.xacro")).unwrap_err();
        assert!(matches!(err, XacroError::Io(_)), "got {:?}", err);
    }

    #[cfg(unix)]
    #[test]
    fn test_failing_program_reports_status() {
        let engine = XacroCommand::new("false");
        let err = engine.expand(Path::new("bolt.urdf.xacro")).unwrap_err();
        assert!(matches!(err, XacroError::Command { .. }), "got {:?}", err);
    }

    #[cfg(unix)]
    #[test]
    fn test_output_is_parsed() {
        // `cat` echoes the template back, standing in for an external engine
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("plain.urdf.xacro");
        std::fs::write(&input, r#"<robot name="plain"><link name="base"/></robot>"#).unwrap();

        let doc = XacroCommand::new("cat").expand(&input).unwrap();
        assert_eq!(doc.root.name, "robot");
        assert!(doc.root.get_child("link").is_some());
    }
}
