// Shared helpers for the integration tests
//
// - Expansion helpers: run_xacro(), test_xacro(), run_xacro_to_xml()
// - Package fixtures: write_file(), package_with_templates()
// - Assertion macros keep call-site line numbers

use robot_properties::{XacroError, XacroProcessor};
use std::path::{Path, PathBuf};
use std::sync::Once;
use tempfile::TempDir;
use xmltree::Element;

static INIT: Once = Once::new();

/// Route `log` output through the test harness. Safe to call repeatedly.
#[allow(dead_code)]
pub fn test_init() {
    INIT.call_once(|| {
        let _ = env_logger::builder().is_test(true).try_init();
    });
}

pub const XACRO_NS: &str = r#"xmlns:xacro="http://www.ros.org/wiki/xacro""#;

/// Wrap `body` in a `<robot>` root declaring the xacro namespace.
#[allow(dead_code)]
pub fn robot(body: &str) -> String {
    format!(r#"<robot name="test" {}>{}</robot>"#, XACRO_NS, body)
}

#[allow(dead_code)]
pub fn test_xacro(input: &str) -> Result<String, XacroError> {
    XacroProcessor::new().run_from_string(input)
}

#[allow(dead_code)]
pub fn run_xacro(input: &str) -> String {
    test_xacro(input).unwrap_or_else(|e| panic!("Xacro processing should succeed: {}", e))
}

#[allow(dead_code)]
pub fn run_xacro_to_xml(input: &str) -> Element {
    let output = run_xacro(input);
    Element::parse(output.as_bytes()).expect("Output should be valid XML")
}

#[allow(dead_code)]
pub fn run_xacro_with_args(
    input: &str,
    args: &[(&str, &str)],
) -> String {
    XacroProcessor::builder()
        .with_args(args.iter().copied())
        .build()
        .run_from_string(input)
        .unwrap_or_else(|e| panic!("Xacro processing with args should succeed: {}", e))
}

#[allow(dead_code)]
pub fn parse_xml(xml: &str) -> Element {
    Element::parse(xml.as_bytes()).expect("Should parse valid XML")
}

/// Panics if the attribute is missing.
#[allow(dead_code)]
pub fn get_attr<'a>(
    elem: &'a Element,
    name: &str,
) -> &'a str {
    elem.attributes
        .get(name)
        .map(String::as_str)
        .unwrap_or_else(|| panic!("Expected '{}' attribute on <{}>", name, elem.name))
}

/// Panics if the child is missing.
#[allow(dead_code)]
pub fn find_child<'a>(
    parent: &'a Element,
    name: &str,
) -> &'a Element {
    parent
        .get_child(name)
        .unwrap_or_else(|| panic!("Expected <{}> child element in <{}>", name, parent.name))
}

/// Child elements of `parent` named `name`, in document order.
#[allow(dead_code)]
pub fn children_named<'a>(
    parent: &'a Element,
    name: &'a str,
) -> impl Iterator<Item = &'a Element> + 'a {
    parent
        .children
        .iter()
        .filter_map(|node| node.as_element())
        .filter(move |elem| elem.name == name)
}

/// Write `content` to `path`, creating missing parent directories.
#[allow(dead_code)]
pub fn write_file(
    path: &Path,
    content: &str,
) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, content).unwrap();
}

/// A package root holding `robot_properties_<family>/xacro/<name>` for
/// every `(name, content)` template.
///
/// Returns the temporary package root and the resource directory.
#[allow(dead_code)]
pub fn package_with_templates(
    family: &str,
    templates: &[(&str, &str)],
) -> (TempDir, PathBuf) {
    let package = tempfile::tempdir().unwrap();
    let resources = package.path().join(format!("robot_properties_{}", family));
    std::fs::create_dir_all(&resources).unwrap();
    for (name, content) in templates {
        write_file(&resources.join("xacro").join(name), content);
    }
    (package, resources)
}

/// A minimal robot template with one parameterized link.
#[allow(dead_code)]
pub fn leg_template(robot_name: &str) -> String {
    format!(
        r#"<?xml version="1.0"?>
<robot name="{}" {}>
  <xacro:property name="leg_length" value="0.2"/>
  <xacro:macro name="leg" params="prefix length:=${{leg_length}}">
    <link name="${{prefix}}_UPPER_LEG">
      <visual><geometry><box size="0.02 0.02 ${{length}}"/></geometry></visual>
    </link>
  </xacro:macro>
  <link name="base_link"/>
  <xacro:leg prefix="FL"/>
  <xacro:leg prefix="FR" length="${{leg_length * 2}}"/>
</robot>
"#,
        robot_name, XACRO_NS
    )
}

#[macro_export]
macro_rules! assert_xacro_contains {
    ($output:expr, $expected:expr) => {
        if !$output.contains($expected) {
            panic!(
                "\nAssertion failed: output does not contain expected string\n\
                 Expected substring: \"{}\"\n\
                 Actual output:\n{}\n",
                $expected, $output
            );
        }
    };
}

#[macro_export]
macro_rules! assert_xacro_not_contains {
    ($output:expr, $unexpected:expr) => {
        if $output.contains($unexpected) {
            panic!(
                "\nAssertion failed: output contains unexpected string\n\
                 Unexpected substring: \"{}\"\n\
                 Actual output:\n{}\n",
                $unexpected, $output
            );
        }
    };
}

#[macro_export]
macro_rules! assert_xacro_attr {
    ($elem:expr, $name:expr, $expected:expr) => {
        let actual = $crate::common::get_attr($elem, $name);
        if actual != $expected {
            panic!(
                "\nAssertion failed: attribute mismatch\n\
                 Element: <{}>\n\
                 Attribute: {}\n\
                 Expected: \"{}\"\n\
                 Actual: \"{}\"\n",
                $elem.name, $name, $expected, actual
            );
        }
    };
}

/// Compare a numeric attribute within `$tolerance`.
#[macro_export]
macro_rules! assert_attr_float {
    ($elem:expr, $attr:expr, $expected:expr, $tolerance:expr) => {{
        let value_str = $crate::common::get_attr($elem, $attr);
        let value: f64 = value_str.parse().unwrap_or_else(|_| {
            panic!(
                "Attribute '{}' on <{}> is not a valid float: '{}'",
                $attr,
                ($elem).name,
                value_str
            )
        });
        assert!(
            (value - $expected).abs() < $tolerance,
            "Attribute '{}' on <{}>: expected {}, got {}",
            $attr,
            ($elem).name,
            $expected,
            value
        );
    }};
}

/// Assert that expansion fails with a message containing `$expected_msg`.
#[macro_export]
macro_rules! assert_xacro_error {
    ($input:expr, $expected_msg:expr) => {{
        match $crate::common::test_xacro($input) {
            Err(e) => {
                let err_msg = e.to_string();
                if !err_msg.contains($expected_msg) {
                    panic!(
                        "\nAssertion failed: error message mismatch\n\
                         Expected substring: \"{}\"\n\
                         Actual error:\n{}\n",
                        $expected_msg, err_msg
                    );
                }
            }
            Ok(out) => {
                panic!(
                    "\nAssertion failed: expected error but processing succeeded\n\
                     Expected error containing: \"{}\"\nOutput:\n{}\n",
                    $expected_msg, out
                );
            }
        }
    }};
}
