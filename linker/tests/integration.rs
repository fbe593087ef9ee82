use std::io::Write;

use cfgviz::schema::{Anchor, NodeRule, Schema};
use cfgviz::segment::ScanLimits;
use cfgviz::source::{LineFilter, SourceLines};
use cfgviz::{Error, Graph};
use linker::{CompiledSchema, Extractor, extract_graph};

const ROUTERS: &str = "host router1\n ip 10.0.0.1\n peer router2\nhost router2\n ip 10.0.0.2";

fn hosts_schema() -> Schema {
    Schema::new(vec![
        NodeRule::new("host", "host {{name}}").with_link("peer", "peer {{name}}"),
    ])
}

fn run(source: &str, schema: &Schema) -> Graph {
    let compiled = CompiledSchema::compile(schema, Anchor::Full).expect("schema should compile");
    let lines = SourceLines::parse(source, &LineFilter::default());
    extract_graph(&lines, &compiled).expect("extraction failed")
}

fn ids(graph: &Graph) -> Vec<&str> {
    graph.entities().map(|e| e.id.as_str()).collect()
}

const DEVICE: &str = "\
! generated by device
hostname edge1
:directive
interface eth0
 description uplink
 ip vrf forwarding blue
 ip access-group web in
interface eth1
 ip vrf forwarding red
ip vrf blue
 rd 65000:1
ip vrf red
 rd 65000:2
ip access-list extended web
 permit tcp any any eq 80
router bgp 65000
 neighbor 10.0.0.2 remote-as 65001
 address-family ipv4 vrf blue
 address-family ipv4 vrf red
";

fn device_schema() -> Schema {
    Schema::new(vec![
        NodeRule::new("interface", "interface {{name}}")
            .with_link("vrf", "ip vrf forwarding {{name}}")
            .with_link("acl", "ip access-group {{name}} {%...%}"),
        NodeRule::new("vrf", "ip vrf {{name}}"),
        NodeRule::new("acl", "ip access-list extended {{name}}"),
        NodeRule::new("bgp", "router bgp {{name}}").with_link("vrf", "address-family ipv4 vrf {{name}}"),
    ])
}

#[test]
fn scenario_a_two_hosts_and_a_peer_link() {
    let graph = run(ROUTERS, &hosts_schema());
    assert_eq!(ids(&graph), ["host router1", "host router2"]);

    let router1 = graph.entity("host router1").unwrap();
    assert_eq!(router1.text, ["host router1", " ip 10.0.0.1", " peer router2"]);
    assert_eq!(router1.links.as_slice(), ["peer router2"]);

    let router2 = graph.entity("host router2").unwrap();
    assert_eq!(router2.text, ["host router2", " ip 10.0.0.2"]);
    assert!(router2.links.is_empty());
}

#[test]
fn scenario_b_empty_source() {
    let graph = run("", &device_schema());
    assert!(graph.is_empty());
    assert_eq!(graph.groups.len(), 4);
    assert!(graph.groups.iter().all(|g| g.entities.is_empty()));
}

#[test]
fn scenario_c_adjacent_headers_are_separate_entities() {
    let graph = run("host a\nhost b\n", &hosts_schema());
    let group = graph.group("host").unwrap();
    assert_eq!(group.entities.len(), 2);
    assert!(group.entities.iter().all(|e| e.text.len() == 1));
}

#[test]
fn scenario_d_malformed_template_fails_before_scanning() {
    let schema = Schema::new(vec![NodeRule::new("host", "host {%...%}")]);
    match CompiledSchema::compile(&schema, Anchor::Full) {
        Err(Error::SchemaCompile(errors)) => {
            assert_eq!(errors.len(), 1);
            assert_eq!(errors[0].origin, "node[0]");
        }
        Ok(_) => panic!("malformed template compiled"),
        Err(other) => panic!("unexpected error: {}", other),
    }
}

#[test]
fn scenario_e_unmatched_reference_rule_yields_no_links() {
    let schema = Schema::new(vec![
        NodeRule::new("host", "host {{name}}").with_link("tunnel", "tunnel {{name}}"),
    ]);
    let graph = run(ROUTERS, &schema);
    assert_eq!(graph.len(), 2);
    assert!(graph.entities().all(|e| e.links.is_empty()));
}

#[test]
fn device_dump_groups_and_links() {
    let graph = run(DEVICE, &device_schema());

    let labels: Vec<&str> = graph.groups.iter().map(|g| g.type_label.as_str()).collect();
    assert_eq!(labels, ["interface", "vrf", "acl", "bgp"]);
    assert_eq!(
        ids(&graph),
        [
            "interface eth0",
            "interface eth1",
            "vrf blue",
            "vrf red",
            "acl web",
            "bgp 65000",
        ]
    );

    let eth0 = graph.entity("interface eth0").unwrap();
    assert_eq!(eth0.links.as_slice(), ["vrf blue", "acl web"]);
    assert_eq!(eth0.lines, 1..5);

    let bgp = graph.entity("bgp 65000").unwrap();
    assert_eq!(bgp.links.as_slice(), ["vrf blue", "vrf red"]);

    assert!(graph.dangling_links().is_empty());
}

#[test]
fn dangling_references_are_kept() {
    let graph = run("host a\n peer ghost\n", &hosts_schema());
    assert_eq!(graph.entity("host a").unwrap().links.as_slice(), ["peer ghost"]);
    assert_eq!(graph.dangling_links(), [("host a", "peer ghost")]);
}

#[test]
fn rules_overlap_independently() {
    let schema = Schema::new(vec![
        NodeRule::new("host", "host {{name}}"),
        NodeRule::new("ip", " ip {{name}}"),
    ]);
    let graph = run("host a\n ip x\n ip y\n", &schema);
    let host = graph.entity("host a").unwrap();
    assert_eq!(host.lines, 0..3);
    // The indented headers are separate blocks for the second rule.
    let ip: Vec<_> = graph.group("ip").unwrap().entities.iter().map(|e| e.lines.clone()).collect();
    assert_eq!(ip, [1..2, 2..3]);
}

#[test]
fn segmentation_is_idempotent() {
    let first = run(DEVICE, &device_schema());
    let second = run(DEVICE, &device_schema());
    assert_eq!(first, second);
}

#[test]
fn spans_are_disjoint_and_ordered_per_rule() {
    let graph = run(DEVICE, &device_schema());
    for group in &graph.groups {
        let mut previous_end = 0;
        for entity in &group.entities {
            assert!(entity.lines.start >= previous_end, "{} overlaps", entity.id);
            assert!(!entity.lines.is_empty(), "{} is empty", entity.id);
            assert_eq!(entity.text.len(), entity.lines.len());
            previous_end = entity.lines.end;
        }
    }
}

#[test]
fn parallel_matches_sequential() {
    let compiled = CompiledSchema::compile(&device_schema(), Anchor::Full).unwrap();
    let lines = SourceLines::parse(DEVICE, &LineFilter::default());
    let sequential = Extractor::new(&compiled).run(&lines).unwrap();
    let parallel = Extractor::new(&compiled).parallel(true).run(&lines).unwrap();
    assert_eq!(sequential, parallel);
}

#[test]
fn limits_bound_lines_and_entities() {
    let compiled = CompiledSchema::compile(&device_schema(), Anchor::Full).unwrap();
    let lines = SourceLines::parse(DEVICE, &LineFilter::default());

    let err = Extractor::new(&compiled)
        .with_limits(ScanLimits {
            max_lines: Some(3),
            max_entities: None,
        })
        .run(&lines)
        .unwrap_err();
    assert!(matches!(err, Error::BudgetExceeded { what: "lines", .. }));

    let err = Extractor::new(&compiled)
        .with_limits(ScanLimits {
            max_lines: None,
            max_entities: Some(5),
        })
        .run(&lines)
        .unwrap_err();
    assert!(matches!(err, Error::BudgetExceeded { what: "entities", limit: 5 }));
}

#[test]
fn prefix_anchor_accepts_trailing_text() {
    let schema = Schema::new(vec![NodeRule::new("host", "host {{name}}")]);
    let lines = SourceLines::parse("host a primary\n x\n", &LineFilter::default());

    let strict = CompiledSchema::compile(&schema, Anchor::Full).unwrap();
    assert!(extract_graph(&lines, &strict).unwrap().is_empty());

    let loose = CompiledSchema::compile(&schema, Anchor::Start).unwrap();
    assert_eq!(ids(&extract_graph(&lines, &loose).unwrap()), ["host a"]);
}

#[test]
fn graph_serializes_for_the_renderer() {
    let graph = run(ROUTERS, &hosts_schema());
    let json = serde_json::to_value(&graph).unwrap();
    let first = &json["groups"][0];
    assert_eq!(first["type"], "host");
    assert_eq!(first["entities"][0]["id"], "host router1");
    assert_eq!(first["entities"][0]["links"][0], "peer router2");
    assert_eq!(first["entities"][0]["lines"]["start"], 0);
    assert_eq!(first["entities"][0]["lines"]["end"], 3);
}

#[test]
fn loads_from_file() {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let path = dir.path().join("routers.cfg");
    let mut file = std::fs::File::create(&path).unwrap();
    write!(file, "! header\n{}\n", ROUTERS).unwrap();

    let lines = SourceLines::load(&path, &LineFilter::default()).unwrap();
    let compiled = CompiledSchema::compile(&hosts_schema(), Anchor::Full).unwrap();
    let graph = extract_graph(&lines, &compiled).unwrap();
    assert_eq!(ids(&graph), ["host router1", "host router2"]);
}

#[test]
fn missing_file_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let err = SourceLines::load(dir.path().join("nope.cfg"), &LineFilter::default()).unwrap_err();
    assert!(matches!(err, Error::ConfigNotFound(_)));
    assert!(err.to_string().contains("nope.cfg"));
}
