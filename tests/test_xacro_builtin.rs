mod common;
use common::*;

use robot_properties::XacroError;

#[test]
fn test_property_substitution() {
    let root = run_xacro_to_xml(&robot(
        r#"<xacro:property name="width" value="0.2"/>
           <xacro:property name="half" value="${width / 2}"/>
           <link name="base"><box size="${width} ${half} ${width * 3}"/></link>"#,
    ));
    let link = find_child(&root, "link");
    assert_xacro_attr!(find_child(link, "box"), "size", "0.2 0.1 0.6000000000000001");
}

#[test]
fn test_property_default_does_not_override() {
    let root = run_xacro_to_xml(&robot(
        r#"<xacro:property name="mass" value="2"/>
           <xacro:property name="mass" default="5"/>
           <xacro:property name="color" default="blue"/>
           <link name="${color}" mass="${mass}"/>"#,
    ));
    let link = find_child(&root, "link");
    assert_xacro_attr!(link, "name", "blue");
    assert_xacro_attr!(link, "mass", "2");
}

#[test]
fn test_lazy_property_definition_order() {
    // Properties are evaluated on use, so forward references resolve
    let root = run_xacro_to_xml(&robot(
        r#"<xacro:property name="total" value="${a + b}"/>
           <xacro:property name="a" value="1"/>
           <xacro:property name="b" value="2"/>
           <link name="l${total}"/>"#,
    ));
    assert_xacro_attr!(find_child(&root, "link"), "name", "l3");
}

#[test]
fn test_text_and_escapes() {
    let out = run_xacro(&robot(
        r#"<xacro:property name="pkg" value="bolt"/><mesh>package://${pkg}/$${literal}</mesh>"#,
    ));
    assert_xacro_contains!(out, "package://bolt/${literal}");
}

#[test]
fn test_macro_with_defaults_and_forwarding() {
    let root = run_xacro_to_xml(&robot(
        r#"<xacro:property name="parent" value="base_link"/>
           <xacro:macro name="joint" params="name axis:=1 parent:=^ offset:=${0.1 * 2}">
             <joint name="${name}" type="revolute">
               <parent link="${parent}"/>
               <axis xyz="0 0 ${axis}"/>
               <origin xyz="${offset} 0 0"/>
             </joint>
           </xacro:macro>
           <xacro:joint name="HFE"/>"#,
    ));
    let joint = find_child(&root, "joint");
    assert_xacro_attr!(joint, "name", "HFE");
    assert_xacro_attr!(find_child(joint, "parent"), "link", "base_link");
    assert_xacro_attr!(find_child(joint, "axis"), "xyz", "0 0 1");
    assert_xacro_attr!(find_child(joint, "origin"), "xyz", "0.2 0 0");
}

#[test]
fn test_macro_parameters_do_not_leak() {
    assert_xacro_error!(
        &robot(
            r#"<xacro:macro name="m" params="inner"><link name="${inner}"/></xacro:macro>
               <xacro:m inner="x"/>
               <link name="${inner}"/>"#,
        ),
        "inner"
    );
}

#[test]
fn test_missing_macro_parameter() {
    assert_xacro_error!(
        &robot(r#"<xacro:macro name="leg" params="prefix"><link/></xacro:macro><xacro:leg/>"#),
        "Missing parameter 'prefix' in macro 'leg'"
    );
}

#[test]
fn test_block_parameters() {
    let root = run_xacro_to_xml(&robot(
        r#"<xacro:macro name="body" params="name *origin **visuals">
             <link name="${name}">
               <xacro:insert_block name="origin"/>
               <xacro:insert_block name="visuals"/>
             </link>
           </xacro:macro>
           <xacro:body name="trunk">
             <origin xyz="0 0 1"/>
             <wrapper><visual name="a"/><visual name="b"/></wrapper>
           </xacro:body>"#,
    ));
    let link = find_child(&root, "link");
    assert_xacro_attr!(find_child(link, "origin"), "xyz", "0 0 1");
    assert!(link.get_child("wrapper").is_none());
    let visuals: Vec<_> = children_named(link, "visual").map(|v| get_attr(v, "name")).collect();
    assert_eq!(visuals, ["a", "b"]);
}

#[test]
fn test_missing_block_argument() {
    let err = test_xacro(&robot(
        r#"<xacro:macro name="m" params="*origin"><xacro:insert_block name="origin"/></xacro:macro><xacro:m/>"#,
    ))
    .unwrap_err();
    assert!(matches!(err, XacroError::MissingBlockParameter { .. }), "got {:?}", err);
}

#[test]
fn test_conditionals() {
    let root = run_xacro_to_xml(&robot(
        r#"<xacro:property name="has_foot" value="true"/>
           <xacro:property name="legs" value="2"/>
           <xacro:if value="${has_foot}"><link name="foot"/></xacro:if>
           <xacro:unless value="${has_foot}"><link name="stump"/></xacro:unless>
           <xacro:if value="${legs == 4 or legs > 3}"><link name="quadruped"/></xacro:if>
           <xacro:if value="1"><link name="literal"/></xacro:if>"#,
    ));
    let links: Vec<_> = children_named(&root, "link").map(|l| get_attr(l, "name")).collect();
    assert_eq!(links, ["foot", "literal"]);
}

#[test]
fn test_false_property_is_boolean() {
    let root = run_xacro_to_xml(&robot(
        r#"<xacro:property name="use_sim" value="false"/>
           <xacro:property name="has_imu" value="True"/>
           <xacro:if value="${not use_sim}"><link name="real"/></xacro:if>
           <xacro:if value="${use_sim and has_imu}"><link name="sim_imu"/></xacro:if>
           <xacro:unless value="${use_sim}"><link name="hardware"/></xacro:unless>"#,
    ));
    let links: Vec<_> = children_named(&root, "link").map(|l| get_attr(l, "name")).collect();
    assert_eq!(links, ["real", "hardware"]);
}

#[test]
fn test_guarded_expressions_skip_untaken_operand() {
    let input = robot(
        r#"<xacro:arg name="n" default="0"/>
           <xacro:property name="n" value="$(arg n)"/>
           <link name="body" mass="${10 / n if n else 1}" ratio="${n != 0 and 1 / n > 1}"/>"#,
    );
    let root = parse_xml(&run_xacro(&input));
    let link = find_child(&root, "link");
    assert_xacro_attr!(link, "mass", "1");
    assert_xacro_attr!(link, "ratio", "0");

    let root = parse_xml(&run_xacro_with_args(&input, &[("n", "4")]));
    let link = find_child(&root, "link");
    assert_xacro_attr!(link, "mass", "2.5");
    assert_xacro_attr!(link, "ratio", "0");
}

#[test]
fn test_non_finite_words_are_text() {
    let root = run_xacro_to_xml(&robot(
        r#"<xacro:property name="mode" value="nan"/>
           <xacro:property name="label" value="Infinity"/>
           <link name="${mode + '_' + label}"/>"#,
    ));
    assert_xacro_attr!(find_child(&root, "link"), "name", "nan_Infinity");
}

#[test]
fn test_non_boolean_condition_rejected() {
    assert_xacro_error!(
        &robot(r#"<xacro:if value="maybe"><link/></xacro:if>"#),
        "not a boolean"
    );
}

#[test]
fn test_args_and_overrides() {
    let input = robot(
        r#"<xacro:arg name="robot" default="bolt"/>
           <xacro:arg name="prefix" default=""/>
           <link name="$(arg prefix)$(arg robot)_base"/>"#,
    );
    let default = parse_xml(&run_xacro(&input));
    assert_xacro_attr!(find_child(&default, "link"), "name", "bolt_base");

    let overridden = parse_xml(&run_xacro_with_args(&input, &[("robot", "solo"), ("prefix", "left_")]));
    assert_xacro_attr!(find_child(&overridden, "link"), "name", "left_solo_base");
}

#[test]
fn test_undefined_arg() {
    assert_xacro_error!(&robot(r#"<link name="$(arg nope)"/>"#), "nope");
}

#[test]
fn test_optenv_fallback() {
    let root = run_xacro_to_xml(&robot(
        r#"<link name="$(optenv ROBOT_PROPERTIES_TEST_UNSET_VARIABLE fallback name)"/>"#,
    ));
    assert_xacro_attr!(find_child(&root, "link"), "name", "fallback name");
}

#[test]
fn test_math_functions() {
    let root = run_xacro_to_xml(&robot(
        r#"<joint name="j">
             <limit lower="${-pi/2}" upper="${radians(90)}" effort="${max(1, 2.5)}" velocity="${2**3}"/>
           </joint>"#,
    ));
    let limit = find_child(find_child(&root, "joint"), "limit");
    assert_attr_float!(limit, "lower", -core::f64::consts::FRAC_PI_2, 1e-12);
    assert_attr_float!(limit, "upper", core::f64::consts::FRAC_PI_2, 1e-12);
    assert_xacro_attr!(limit, "effort", "2.5");
    assert_xacro_attr!(limit, "velocity", "8");
}

#[test]
fn test_include_relative_to_including_file() {
    let dir = tempfile::tempdir().unwrap();
    write_file(
        &dir.path().join("xacro/include/leg.xacro"),
        &format!(
            r#"<robot {}>
                 <xacro:include filename="materials.xacro"/>
                 <xacro:macro name="leg" params="prefix"><link name="${{prefix}}_leg" color="${{leg_color}}"/></xacro:macro>
               </robot>"#,
            XACRO_NS
        ),
    );
    write_file(
        &dir.path().join("xacro/include/materials.xacro"),
        &robot(r#"<xacro:property name="leg_color" value="grey"/>"#),
    );
    let main = dir.path().join("xacro/bolt.urdf.xacro");
    write_file(
        &main,
        &robot(
            r#"<xacro:include filename="include/leg.xacro"/>
               <xacro:include filename="include/missing.xacro" optional="true"/>
               <xacro:leg prefix="FL"/>"#,
        ),
    );

    let out = robot_properties::XacroProcessor::new().run(&main).unwrap();
    let root = parse_xml(&out);
    let link = find_child(&root, "link");
    assert_xacro_attr!(link, "name", "FL_leg");
    assert_xacro_attr!(link, "color", "grey");
}

#[test]
fn test_missing_and_circular_includes() {
    let dir = tempfile::tempdir().unwrap();
    let a = dir.path().join("a.xacro");
    let b = dir.path().join("b.xacro");
    write_file(&a, &robot(r#"<xacro:include filename="b.xacro"/>"#));
    write_file(&b, &robot(r#"<xacro:include filename="a.xacro"/>"#));

    let err = robot_properties::XacroProcessor::new().run(&a).unwrap_err();
    assert!(err.to_string().contains("Circular include"), "got {}", err);

    let missing = dir.path().join("main.xacro");
    write_file(&missing, &robot(r#"<xacro:include filename="nope.xacro"/>"#));
    let err = robot_properties::XacroProcessor::new().run(&missing).unwrap_err();
    assert!(matches!(err, XacroError::Include(_)), "got {:?}", err);
}

#[test]
fn test_unknown_directive() {
    assert_xacro_error!(&robot(r#"<xacro:loop items="1 2"/>"#), "Unsupported xacro directive");
}

#[test]
fn test_comments_and_preamble_kept() {
    let out = run_xacro(&format!(
        "<!-- generated from bolt.urdf.xacro -->\n{}",
        robot("<!-- legs --><link name=\"base\"/>")
    ));
    assert_xacro_contains!(out, "<!-- generated from bolt.urdf.xacro -->");
    assert_xacro_contains!(out, "<!-- legs -->");
}
