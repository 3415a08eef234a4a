use std::f64::consts::FRAC_PI_2;

use approx::assert_relative_eq;
use nalgebra::Vector3;

use generic_sdf::{
    Element, FrameEdge, FrameGraph, FrameGraphElement, FrameGraphs, FrameRegistry, JointType, Model,
    Normalize, Result, Sdf, SdfError, SdfVersion, SpecificElement, World,
};

fn named(tag: &str, name: &str) -> SpecificElement {
    SpecificElement::new(tag).with_attribute("name", name)
}

fn pose(text: &str) -> SpecificElement {
    SpecificElement::new("pose").with_text(text)
}

fn joint(name: &str, joint_type: &str, parent: &str, child: &str) -> SpecificElement {
    named("joint", name)
        .with_attribute("type", joint_type)
        .with_value("parent", parent)
        .with_value("child", child)
}

fn limit(lower: &str, upper: &str) -> SpecificElement {
    SpecificElement::new("axis").with_child(
        SpecificElement::new("limit")
            .with_value("lower", lower)
            .with_value("upper", upper),
    )
}

fn robot(hinge: SpecificElement) -> SpecificElement {
    SpecificElement::new("sdf").with_child(
        named("world", "world").with_child(
            named("model", "robot")
                .with_child(named("link", "base"))
                .with_child(hinge.with_child(pose("1 0 0 0 0 0")))
                .with_child(named("link", "arm").with_child(pose("2 0 0 0 0 0"))),
        ),
    )
}

fn robot_graphs(hinge: SpecificElement) -> FrameGraphs {
    let (sdf, diagnostics) = Sdf::from_versioned(&robot(hinge), "1.7").unwrap();
    assert!(diagnostics.is_empty(), "{diagnostics:?}");
    sdf.frame_graphs().unwrap().remove(0)
}

#[test]
fn end_to_end_revolute_robot() {
    let mut graphs = robot_graphs(joint("hinge", "revolute", "base", "arm"));

    let names = graphs.static_frames.names();
    assert!(names.len() >= 5);
    for expected in ["robot", "robot::base", "robot::hinge", "robot::arm"] {
        assert!(names.contains(&expected), "missing {expected}");
    }

    // base <- hinge_parent <- (revolute) <- hinge_child <- arm
    let graph = &graphs.dynamic_graph;
    let frames = &graphs.dynamic_frames;
    let arm = frames.get("robot::arm").unwrap();
    let child = graph.parent(arm).unwrap();
    let parent = graph.parent(child).unwrap();
    assert_eq!(graph.name(child), "robot::hinge_child");
    assert_eq!(graph.name(parent), "robot::hinge_parent");
    assert_eq!(graph.parent(parent), frames.get("robot::base").ok());
    assert!(matches!(graph.edge(arm), Some(FrameEdge::Rigid(_))));
    assert!(matches!(graph.edge(child), Some(FrameEdge::Joint(_))));
    assert!(matches!(graph.edge(parent), Some(FrameEdge::Rigid(_))));

    let arm_before = graphs.dynamic_transform("robot::arm", "robot::base").unwrap();
    assert_relative_eq!(arm_before.translation_part(), Vector3::new(2.0, 0.0, 0.0), epsilon = 1e-12);
    let base_before = graphs.dynamic_transform("robot::base", "world").unwrap();

    graphs.set_joint_position("robot::hinge", FRAC_PI_2).unwrap();

    let arm_after = graphs.dynamic_transform("robot::arm", "robot::base").unwrap();
    assert_relative_eq!(arm_after.translation_part(), Vector3::new(1.0, 1.0, 0.0), epsilon = 1e-12);
    let base_after = graphs.dynamic_transform("robot::base", "world").unwrap();
    assert_eq!(base_before, base_after);

    // the static graph keeps the authored pose
    let authored = graphs.static_transform("robot::arm", "robot::base").unwrap();
    assert_relative_eq!(authored.translation_part(), Vector3::new(2.0, 0.0, 0.0), epsilon = 1e-12);
}

#[test]
fn revolute_initial_angle_is_clamped() {
    let inside = robot_graphs(joint("hinge", "revolute", "base", "arm").with_child(limit("-1", "1")));
    let staging = inside.dynamic_frames.get("robot::hinge_child").unwrap();
    assert_eq!(inside.dynamic_graph.joint_position(staging), Some(0.0));

    let above = robot_graphs(joint("hinge", "revolute", "base", "arm").with_child(limit("2", "5")));
    let staging = above.dynamic_frames.get("robot::hinge_child").unwrap();
    assert_eq!(above.dynamic_graph.joint_position(staging), Some(2.0));
}

#[test]
fn unimplemented_joint_types_are_flagged() {
    let graphs = robot_graphs(joint("hinge", "ball", "base", "arm"));
    let degraded = graphs.dynamic_graph.degraded_edges();
    assert_eq!(degraded.len(), 1);
    let (frame, joint_type) = degraded[0];
    assert_eq!(graphs.dynamic_graph.name(frame), "robot::hinge_child");
    assert_eq!(joint_type, JointType::Ball);

    let mut graphs = graphs;
    assert!(matches!(
        graphs.set_joint_position("robot::hinge", 0.5),
        Err(SdfError::NotAJoint(_))
    ));
}

#[test]
fn nested_scopes_resolve_through_two_model_hops() {
    let doc = SpecificElement::new("sdf").with_child(
        named("world", "w").with_child(
            named("model", "A").with_child(
                named("model", "B")
                    .with_child(pose("0 1 0 0 0 0"))
                    .with_child(named("link", "L").with_child(pose("0 0 1 0 0 0"))),
            ),
        ),
    );
    let (sdf, _) = Sdf::from_versioned(&doc, "1.7").unwrap();
    let world = &sdf.worlds()[0];

    let mut graph = FrameGraph::new();
    let frames = world.declared_frames(&mut graph).unwrap();
    for key in ["A", "A::__model__", "A::B", "A::B::L"] {
        assert!(frames.contains(key), "missing {key}");
    }
    world.to_static_graph(&frames, &mut graph).unwrap();

    let link = frames.get("A::B::L").unwrap();
    let chain: Vec<&str> = std::iter::successors(graph.parent(link), |f| graph.parent(*f))
        .map(|f| graph.name(f))
        .collect();
    assert_eq!(chain, vec!["A::B::__model__", "A::__model__", "world"]);

    let in_world = graph.transform(link, frames.get("world").unwrap()).unwrap();
    assert_relative_eq!(in_world.translation_part(), Vector3::new(0.0, 1.0, 1.0), epsilon = 1e-12);

    let graphs = FrameGraphs::build(world).unwrap();
    assert!(graphs.dynamic_transform("A::B::L", "world").is_ok());
    assert!(graphs.dynamic_transform("A", "A::B::L").is_ok());
}

#[test]
fn standalone_model_reaches_its_nested_models() {
    for static_ in ["false", "true"] {
        let node = named("model", "robot").with_child(named("link", "base")).with_child(
            named("model", "inner")
                .with_value("static", static_)
                .with_child(pose("0 0 5 0 0 0"))
                .with_child(named("link", "body")),
        );
        let model = Model::from_specific(&node, &mut Normalize::new(SdfVersion::V1_8)).unwrap();
        let graphs = FrameGraphs::build(&model).unwrap();

        for to in ["__model__", "base"] {
            let body = graphs.dynamic_transform("inner::body", to).unwrap();
            assert_relative_eq!(body.translation_part(), Vector3::new(0.0, 0.0, 5.0), epsilon = 1e-12);
        }
        assert!(graphs.dynamic_transform("inner", "base").is_ok());
    }
}

#[test]
fn frame_attached_to_joint_follows_it() {
    let doc = SpecificElement::new("sdf").with_child(
        named("world", "w").with_child(
            named("model", "robot")
                .with_child(named("link", "base"))
                .with_child(joint("hinge", "revolute", "base", "arm").with_child(pose("1 0 0 0 0 0")))
                .with_child(named("link", "arm").with_child(pose("2 0 0 0 0 0")))
                .with_child(
                    named("frame", "tip")
                        .with_attribute("attached_to", "hinge")
                        .with_child(pose("0.5 0 0 0 0 0").with_attribute("relative_to", "hinge")),
                ),
        ),
    );
    let (sdf, _) = Sdf::from_versioned(&doc, "1.7").unwrap();
    let mut graphs = sdf.frame_graphs().unwrap().remove(0);

    let tip = graphs.dynamic_transform("robot::tip", "robot::base").unwrap();
    assert_relative_eq!(tip.translation_part(), Vector3::new(1.5, 0.0, 0.0), epsilon = 1e-12);

    graphs.set_joint_position("robot::hinge", FRAC_PI_2).unwrap();
    let tip = graphs.dynamic_transform("robot::tip", "robot::base").unwrap();
    assert_relative_eq!(tip.translation_part(), Vector3::new(1.0, 0.5, 0.0), epsilon = 1e-12);
}

#[test]
fn attachment_cycles_are_rejected() {
    let doc = SpecificElement::new("sdf").with_child(
        named("world", "w").with_child(
            named("model", "robot")
                .with_child(named("link", "base"))
                .with_child(named("frame", "f1").with_attribute("attached_to", "f2"))
                .with_child(named("frame", "f2").with_attribute("attached_to", "f1")),
        ),
    );
    let (sdf, _) = Sdf::from_versioned(&doc, "1.7").unwrap();
    assert!(matches!(
        sdf.frame_graphs(),
        Err(SdfError::FrameCycle { child, parent }) if child == "robot::f2" && parent == "robot::f1"
    ));
}

#[test]
fn wiring_before_declaration_is_an_ordering_error() {
    let world = World::from_specific(
        &named("world", "w").with_child(named("model", "m").with_child(named("link", "l"))),
        &mut Normalize::new(SdfVersion::V1_8),
    )
    .unwrap();
    let mut graph = FrameGraph::new();
    assert!(matches!(
        world.to_static_graph(&FrameRegistry::new(), &mut graph),
        Err(SdfError::UndeclaredFrame(_))
    ));
    assert_eq!(graph.edge_count(), 0);
}

#[test]
fn declaring_twice_gives_fresh_frames() {
    let (sdf, _) = Sdf::from_versioned(&robot(joint("hinge", "fixed", "base", "arm")), "1.7").unwrap();
    let world = &sdf.worlds()[0];
    let mut graph = FrameGraph::new();
    let first = world.declared_frames(&mut graph).unwrap();
    let second = world.declared_frames(&mut graph).unwrap();
    assert_ne!(first.get("robot::arm").unwrap(), second.get("robot::arm").unwrap());
}

#[test]
fn normalization_is_deterministic() {
    let doc = robot(joint("hinge", "prismatic", "base", "arm"));
    let (first, _) = Sdf::from_versioned(&doc, "1.6").unwrap();
    let (second, _) = Sdf::from_versioned(&doc, "1.6").unwrap();
    assert_eq!(first, second);
}

#[test]
fn included_models_take_overrides() {
    let resolver = |uri: &str| -> Result<(String, String)> {
        assert_eq!(uri, "model://bar");
        Ok((String::new(), "1.6".to_string()))
    };
    let parser = |_: &str, _: SdfVersion| -> Result<SpecificElement> {
        Ok(SpecificElement::new("sdf").with_child(
            named("model", "bar")
                .with_value("static", "false")
                .with_child(named("link", "chassis").with_child(pose("0 0 0.5 0 0 0"))),
        ))
    };
    let doc = named("world", "w").with_child(
        SpecificElement::new("include")
            .with_value("uri", "model://bar")
            .with_value("name", "foo")
            .with_value("static", "true")
            .with_child(pose("3 0 0 0 0 0")),
    );
    let mut cx = Normalize::new(SdfVersion::V1_7).with_fetcher(&resolver, &parser);
    let world = World::from_specific(&doc, &mut cx).unwrap();
    assert!(cx.diagnostics().is_empty());

    let foo = &world.models[0];
    assert_eq!(foo.name, "foo");
    assert!(foo.static_);
    assert_eq!(foo.links[0].name, "chassis");
    assert_eq!(foo.pose.relative_to.as_deref(), Some("world"));
    assert!(world.includes.is_empty());

    let graphs = FrameGraphs::build(&world).unwrap();
    let chassis = graphs.dynamic_transform("foo::chassis", "world").unwrap();
    assert_relative_eq!(chassis.translation_part(), Vector3::new(3.0, 0.0, 0.5), epsilon = 1e-12);
}

#[test]
fn recursive_includes_hit_the_depth_limit() {
    let resolver = |_: &str| -> Result<(String, String)> { Ok((String::new(), "1.7".to_string())) };
    let parser = |_: &str, _: SdfVersion| -> Result<SpecificElement> {
        Ok(SpecificElement::new("sdf").with_child(
            named("model", "loop")
                .with_child(named("link", "l"))
                .with_child(SpecificElement::new("include").with_value("uri", "model://loop")),
        ))
    };
    let doc = named("world", "w")
        .with_child(SpecificElement::new("include").with_value("uri", "model://loop"));
    let mut cx = Normalize::new(SdfVersion::V1_7)
        .with_fetcher(&resolver, &parser)
        .with_max_include_depth(3);
    assert!(matches!(
        World::from_specific(&doc, &mut cx),
        Err(SdfError::IncludeDepth { depth: 3, .. })
    ));
}
