//! End-to-end grouping scenarios.

mod common;

use common::{a, engine, g, populate, steps_of};
use ml_core::{
    attributes, AttrValue, Cluster, EdgeFilter, EngineConfig, GroupError, GroupEventKind,
    GroupId, GroupingOptions, LinkType, Scheduler, TickOptions,
};
use rand::rngs::SmallRng;
use rand::SeedableRng;

fn link() -> LinkType {
    LinkType::default()
}

fn pair(x: &str, y: &str) -> Vec<(ml_core::EntityId, ml_core::EntityId)> {
    vec![(a(x), a(y))]
}

#[test]
fn test_pair_forms_group_and_leaves_schedule() {
    let (mut engine, _) = engine(EngineConfig::default(), &["A", "B", "C"]);
    let report = engine
        .group_iterate(&pair("A", "B"), &link(), &GroupingOptions::default())
        .unwrap();

    assert_eq!(report.formed, vec![GroupId::from("group_0")]);
    let group = engine.group(&GroupId::from("group_0")).unwrap();
    assert!(group.contains(&a("A")) && group.contains(&a("B")));
    assert_eq!(group.len(), 2);
    assert!(!engine.is_scheduled(&a("A")));
    assert!(!engine.is_scheduled(&a("B")));
    assert!(engine.is_scheduled(&a("C")));
    assert!(engine.is_scheduled(&g("group_0")));
    assert!(engine.graph().has_edge(&a("A"), &a("B")));
    engine.check_consistency().unwrap();
}

#[test]
fn test_unaffiliated_partner_joins_existing_group() {
    let (mut engine, _) = engine(EngineConfig::default(), &["A", "B", "C"]);
    let options = GroupingOptions::default();
    engine.group_iterate(&pair("A", "B"), &link(), &options).unwrap();
    let report = engine.group_iterate(&pair("B", "C"), &link(), &options).unwrap();

    assert!(report.formed.is_empty());
    assert_eq!(report.joined, 1);
    assert_eq!(engine.group_count(), 1);
    assert_eq!(engine.group(&GroupId::from("group_0")).unwrap().len(), 3);
    assert_eq!(engine.group_of(&a("C"), &link()), Some(GroupId::from("group_0")));
    assert!(!engine.is_scheduled(&a("C")));
    engine.check_consistency().unwrap();
}

fn abc_group(min_for_group: usize) -> ml_core::GroupEngine {
    let config = EngineConfig::default().with_min_for_group(min_for_group);
    let (mut engine, _) = engine(config, &["A", "B", "C"]);
    let options = GroupingOptions::default();
    engine.group_iterate(&pair("A", "B"), &link(), &options).unwrap();
    engine.group_iterate(&pair("B", "C"), &link(), &options).unwrap();
    engine
}

#[test]
fn test_reassessment_detaches_member_and_group_survives() {
    let mut engine = abc_group(2);
    let report = engine
        .reassess_group(Some(&link()), true, |group| {
            group.contains(&a("A")).then(|| vec![a("A"), a("B")])
        })
        .unwrap();

    assert_eq!(report.detached, 1);
    assert!(report.dissolved.is_empty());
    assert!(!engine.graph().has_edge(&a("A"), &a("B")));
    let group = engine.group(&GroupId::from("group_0")).unwrap();
    assert!(!group.contains(&a("A")));
    assert_eq!(group.len(), 2);
    assert!(engine.is_scheduled(&a("A")));
    assert!(!engine.is_scheduled(&a("B")));
    engine.check_consistency().unwrap();
}

#[test]
fn test_reassessment_below_floor_dissolves_and_reinstates_all() {
    let mut engine = abc_group(3);
    let report = engine
        .reassess_group(Some(&link()), true, |_| Some(vec![a("A"), a("B")]))
        .unwrap();

    assert_eq!(report.dissolved, vec![GroupId::from("group_0")]);
    assert_eq!(engine.group_count(), 0);
    assert!(!engine.is_scheduled(&g("group_0")));
    for name in ["A", "B", "C"] {
        assert!(engine.is_scheduled(&a(name)), "{} should be back on the schedule", name);
        assert!(!engine.reverse().is_grouped_anywhere(&a(name)));
    }
    engine.check_consistency().unwrap();
}

#[test]
fn test_reassessment_without_reintroduce() {
    let mut engine = abc_group(2);
    engine
        .reassess_group(None, false, |group| {
            group.contains(&a("A")).then(|| vec![a("A"), a("C")])
        })
        .unwrap();
    assert!(!engine.is_scheduled(&a("A")));
    assert!(!engine.reverse().is_grouped_anywhere(&a("A")));
}

#[test]
fn test_deregistration_cascades_through_nested_groups() {
    let config = EngineConfig::default().with_nesting(true);
    let (mut engine, _) = engine(config, &["A", "B", "C", "D"]);
    let kin = LinkType::from("kinship");
    let alliance = LinkType::from("alliance");
    let options = GroupingOptions::default();

    engine
        .group_iterate(&[(a("A"), a("B")), (a("C"), a("D"))], &kin, &options)
        .unwrap();
    let report = engine
        .group_iterate(&[(g("kinship_0"), g("kinship_1"))], &alliance, &options)
        .unwrap();
    assert_eq!(report.formed, vec![GroupId::from("alliance_2")]);
    assert!(!engine.is_scheduled(&g("kinship_0")));
    assert!(engine.graph().contains_node(&g("alliance_2")));
    engine.check_consistency().unwrap();
    engine.drain_events();

    assert!(engine.remove(&ml_core::AgentId::from("A")).unwrap());

    assert_eq!(engine.group_count(), 1);
    assert!(!engine.contains_group(&GroupId::from("kinship_0")));
    assert!(!engine.contains_group(&GroupId::from("alliance_2")));
    assert!(engine.contains_group(&GroupId::from("kinship_1")));
    assert!(engine.is_scheduled(&a("B")));
    assert!(engine.is_scheduled(&g("kinship_1")));
    assert!(!engine.graph().contains_node(&g("kinship_0")));
    assert!(!engine.graph().contains_node(&g("alliance_2")));
    engine.check_consistency().unwrap();

    let dissolved: Vec<_> = engine
        .drain_events()
        .into_iter()
        .filter(|ev| ev.kind == GroupEventKind::Dissolved)
        .filter_map(|ev| ev.group_id)
        .collect();
    assert_eq!(
        dissolved,
        vec![GroupId::from("kinship_0"), GroupId::from("alliance_2")]
    );
}

#[test]
fn test_nested_parent_survives_when_above_floor() {
    let config = EngineConfig::default().with_nesting(true);
    let (mut engine, _) = engine(config, &["A", "B", "C", "D", "E", "F"]);
    let kin = LinkType::from("kinship");
    let alliance = LinkType::from("alliance");
    let options = GroupingOptions::default();
    engine
        .group_iterate(
            &[(a("A"), a("B")), (a("C"), a("D")), (a("E"), a("F"))],
            &kin,
            &options,
        )
        .unwrap();
    engine
        .group_iterate(
            &[
                (g("kinship_0"), g("kinship_1")),
                (g("kinship_1"), g("kinship_2")),
            ],
            &alliance,
            &options,
        )
        .unwrap();
    assert_eq!(engine.group(&GroupId::from("alliance_3")).unwrap().len(), 3);

    engine.remove(&ml_core::AgentId::from("A")).unwrap();
    let parent = engine.group(&GroupId::from("alliance_3")).unwrap();
    assert_eq!(parent.len(), 2);
    assert!(!parent.contains(&g("kinship_0")));
    engine.check_consistency().unwrap();
}

#[test]
fn test_reassessment_dissolution_cascades_into_parent() {
    let config = EngineConfig::default().with_nesting(true);
    let (mut engine, _) = engine(config, &["A", "B", "C", "D"]);
    let kin = LinkType::from("kinship");
    let alliance = LinkType::from("alliance");
    let options = GroupingOptions::default();
    engine
        .group_iterate(&[(a("A"), a("B")), (a("C"), a("D"))], &kin, &options)
        .unwrap();
    engine
        .group_iterate(&[(g("kinship_0"), g("kinship_1"))], &alliance, &options)
        .unwrap();
    engine.drain_events();

    let report = engine
        .reassess_group(Some(&kin), true, |group| {
            group.contains(&a("A")).then(|| vec![a("A"), a("B")])
        })
        .unwrap();

    assert_eq!(report.examined, 2);
    assert_eq!(report.dissolved, vec![GroupId::from("kinship_0")]);
    assert!(!engine.contains_group(&GroupId::from("alliance_2")));
    assert_eq!(engine.group_count(), 1);
    assert!(!engine.graph().has_edge(&a("A"), &a("B")));
    assert!(!engine.graph().contains_node(&g("alliance_2")));

    let mut scheduled = engine.scheduled();
    scheduled.sort();
    let mut expected = vec![a("A"), a("B"), g("kinship_1")];
    expected.sort();
    assert_eq!(scheduled, expected);
    engine.check_consistency().unwrap();

    let dissolved: Vec<_> = engine
        .drain_events()
        .into_iter()
        .filter(|ev| ev.kind == GroupEventKind::Dissolved)
        .filter_map(|ev| ev.group_id)
        .collect();
    assert_eq!(
        dissolved,
        vec![GroupId::from("kinship_0"), GroupId::from("alliance_2")]
    );
}

#[test]
fn test_net_reassessment_cascades_into_parent() {
    let config = EngineConfig::default().with_nesting(true);
    let (mut engine, _) = engine(config, &["A", "B", "C", "D"]);
    engine
        .add_link(&[a("A"), a("B")], attributes([("kinship", 0.9)]))
        .unwrap();
    engine
        .add_link(&[a("C"), a("D")], attributes([("kinship", 0.8)]))
        .unwrap();
    let strong = EdgeFilter::at_least("kinship", 0.5);
    let report = engine.net_group(&strong, &GroupingOptions::default()).unwrap();
    assert_eq!(
        report.formed,
        vec![GroupId::from("kinship>=0.5_0"), GroupId::from("kinship>=0.5_1")]
    );
    engine
        .group_iterate(
            &[(g("kinship>=0.5_0"), g("kinship>=0.5_1"))],
            &LinkType::from("alliance"),
            &GroupingOptions::default(),
        )
        .unwrap();
    assert!(engine.contains_group(&GroupId::from("alliance_2")));

    if let Some(attrs) = engine.link_attributes_mut(&a("A"), &a("B")) {
        attrs.insert("kinship".to_string(), AttrValue::Number(0.1));
    }
    let report = engine.reassess_net_group(&strong, true).unwrap();

    assert_eq!(report.detached, 1);
    assert_eq!(report.dissolved, vec![GroupId::from("kinship>=0.5_0")]);
    assert!(!engine.contains_group(&GroupId::from("alliance_2")));
    assert!(engine.contains_group(&GroupId::from("kinship>=0.5_1")));
    assert!(engine.is_scheduled(&a("A")));
    assert!(engine.is_scheduled(&a("B")));
    assert!(engine.is_scheduled(&g("kinship>=0.5_1")));
    assert!(!engine.is_scheduled(&a("C")));
    // Membership changes only; the weakened tie stays on the graph
    assert!(engine.graph().has_edge(&a("A"), &a("B")));
    engine.check_consistency().unwrap();
}

#[test]
fn test_disjoint_groups_are_never_merged() {
    let (mut engine, _) = engine(EngineConfig::default(), &["A", "B", "C", "D"]);
    let options = GroupingOptions::default();
    engine
        .group_iterate(&[(a("A"), a("B")), (a("C"), a("D"))], &link(), &options)
        .unwrap();
    let report = engine.group_iterate(&pair("B", "C"), &link(), &options).unwrap();

    assert_eq!(report.linked, 1);
    assert_eq!(engine.group_count(), 2);
    assert_eq!(engine.group(&GroupId::from("group_0")).unwrap().len(), 2);
    assert_eq!(engine.group(&GroupId::from("group_1")).unwrap().len(), 2);
    assert!(engine.graph().has_edge(&a("B"), &a("C")));
    engine.check_consistency().unwrap();
}

#[test]
fn test_shared_group_pair_only_records_edge() {
    let (mut engine, _) = engine(EngineConfig::default(), &["A", "B", "C"]);
    let options = GroupingOptions::default();
    engine.group_iterate(&pair("A", "B"), &link(), &options).unwrap();
    engine.group_iterate(&pair("B", "C"), &link(), &options).unwrap();
    assert!(!engine.graph().has_edge(&a("A"), &a("C")));

    let report = engine.group_iterate(&pair("A", "C"), &link(), &options).unwrap();
    assert_eq!(report.linked, 1);
    assert!(engine.graph().has_edge(&a("A"), &a("C")));
    assert_eq!(engine.group(&GroupId::from("group_0")).unwrap().len(), 3);
}

#[test]
fn test_link_types_group_independently() {
    let (mut engine, _) = engine(EngineConfig::default(), &["A", "B"]);
    let options = GroupingOptions::default();
    engine
        .group_iterate(&pair("A", "B"), &LinkType::from("kinship"), &options)
        .unwrap();
    engine
        .group_iterate(&pair("A", "B"), &LinkType::from("trade"), &options)
        .unwrap();

    assert_eq!(engine.group_count(), 2);
    assert_eq!(engine.groups_of(&a("A"), &LinkType::from("trade")).len(), 1);
    engine.check_consistency().unwrap();
}

#[test]
fn test_explicit_clusters() {
    let (mut engine, _) = engine(EngineConfig::default(), &["A", "B", "C", "D", "E"]);
    let clusters = vec![
        Cluster::Members(vec![a("A"), a("B"), a("C")]),
        Cluster::Named(GroupId::from("pair"), vec![a("D"), a("E")]),
    ];
    let report = engine
        .form_group(clusters, &link(), &GroupingOptions::default())
        .unwrap();

    assert_eq!(report.formed, vec![GroupId::from("group_0"), GroupId::from("pair")]);
    assert_eq!(report.joined, 1);
    let hub_group = engine.group(&GroupId::from("group_0")).unwrap();
    assert_eq!(hub_group.len(), 3);
    assert!(engine.graph().has_edge(&a("A"), &a("C")));
    assert!(!engine.graph().has_edge(&a("B"), &a("C")));
    engine.check_consistency().unwrap();
}

#[test]
fn test_single_entity_cluster_is_a_contract_violation() {
    let (mut engine, _) = engine(EngineConfig::default(), &["A"]);
    let err = engine
        .form_group(
            vec![Cluster::Members(vec![a("A")])],
            &link(),
            &GroupingOptions::default(),
        )
        .unwrap_err();
    assert!(matches!(err, GroupError::ClusterTooSmall(1)));
}

#[test]
fn test_dead_entities_filtered_from_clusters() {
    let (mut engine, _) = engine(EngineConfig::default(), &["A", "B"]);
    let report = engine
        .form_group(
            vec![
                Cluster::Members(vec![a("A"), a("ghost")]),
                Cluster::Members(vec![a("ghost"), a("A"), a("B")]),
            ],
            &link(),
            &GroupingOptions::default(),
        )
        .unwrap();

    assert_eq!(report.skipped, 1);
    assert_eq!(report.formed.len(), 1);
    assert!(engine.graph().has_edge(&a("A"), &a("B")));
}

#[test]
fn test_net_group_by_text_tag() {
    let (mut engine, _) = engine(EngineConfig::default(), &["A", "B", "C", "D"]);
    engine.add_link(&[a("A"), a("B")], attributes([("trade", "salt")])).unwrap();
    engine.add_link(&[a("C"), a("D")], attributes([("trade", "iron")])).unwrap();

    let filter = EdgeFilter::equals("trade", "salt");
    let report = engine.net_group(&filter, &GroupingOptions::default()).unwrap();
    assert_eq!(report.formed, vec![GroupId::from("trade=salt_0")]);
    assert!(engine.is_scheduled(&a("C")));
    assert!(engine.reverse().is_grouped(&a("A"), &LinkType::from("trade=salt")));
}

#[test]
fn test_scheduler_steps_grouped_and_ungrouped_once() {
    let (mut engine, log) = engine(EngineConfig::default(), &["A", "B", "C"]);
    engine
        .group_iterate(&pair("A", "B"), &link(), &GroupingOptions::default())
        .unwrap();

    let mut scheduler = Scheduler::new();
    let mut rng = SmallRng::seed_from_u64(9);
    let report = scheduler.step(&engine, &TickOptions::default(), &mut rng);

    assert_eq!(report.agents, 3);
    assert_eq!(report.groups, 1);
    for name in ["A", "B", "C"] {
        assert_eq!(steps_of(&log, name), 1);
    }
    assert_eq!(scheduler.tick(), 1);
}

#[test]
fn test_double_grouping_steps_members_twice() {
    let (mut engine, log) = engine(EngineConfig::default(), &["A", "B"]);
    engine
        .group_iterate(&pair("A", "B"), &link(), &GroupingOptions::default().with_double(true))
        .unwrap();

    let mut rng = SmallRng::seed_from_u64(9);
    Scheduler::new().step(&engine, &TickOptions::default(), &mut rng);
    assert_eq!(steps_of(&log, "A"), 2);
    assert_eq!(steps_of(&log, "B"), 2);
}

#[test]
fn test_constant_kind_stepped_exactly_once() {
    let (mut engine, log) = engine(EngineConfig::default(), &["A"]);
    populate(&mut engine, &["E1", "E2"], "elder", &log);
    engine
        .group_iterate(&pair("A", "E1"), &link(), &GroupingOptions::default())
        .unwrap();

    let options = TickOptions {
        shuffled: true,
        by_type: None,
        constant: Some(ml_core::AgentKind::from("elder")),
    };
    let mut rng = SmallRng::seed_from_u64(3);
    let report = Scheduler::new().step(&engine, &options, &mut rng);

    assert_eq!(steps_of(&log, "E1"), 1);
    assert_eq!(steps_of(&log, "E2"), 1);
    assert_eq!(steps_of(&log, "A"), 1);
    assert_eq!(report.constant, 2);
    assert_eq!(report.agents, 1);
}

#[test]
fn test_suspended_group_is_not_stepped() {
    let (mut engine, log) = engine(EngineConfig::default(), &["A", "B"]);
    engine
        .group_iterate(&pair("A", "B"), &link(), &GroupingOptions::default())
        .unwrap();
    assert!(engine.set_group_active(&GroupId::from("group_0"), false));

    let mut rng = SmallRng::seed_from_u64(3);
    let report = Scheduler::new().step(&engine, &TickOptions::default(), &mut rng);
    assert_eq!(report.groups, 0);
    assert!(log.borrow().is_empty());
}

#[test]
fn test_nested_groups_step_their_leaves() {
    let config = EngineConfig::default().with_nesting(true);
    let (mut engine, log) = engine(config, &["A", "B", "C", "D"]);
    let options = GroupingOptions::default();
    engine
        .group_iterate(
            &[(a("A"), a("B")), (a("C"), a("D"))],
            &LinkType::from("kinship"),
            &options,
        )
        .unwrap();
    engine
        .group_iterate(
            &[(g("kinship_0"), g("kinship_1"))],
            &LinkType::from("alliance"),
            &options,
        )
        .unwrap();
    assert_eq!(engine.scheduled(), vec![g("alliance_2")]);

    let mut rng = SmallRng::seed_from_u64(5);
    let report = Scheduler::new().step(&engine, &TickOptions::default(), &mut rng);
    assert_eq!(report.groups, 3);
    assert_eq!(report.agents, 4);
    assert_eq!(log.borrow().len(), 4);
}

#[test]
fn test_snapshot_reflects_groups() {
    let (mut engine, _) = engine(EngineConfig::default(), &["A", "B", "C"]);
    engine
        .group_iterate(&pair("A", "B"), &link(), &GroupingOptions::default())
        .unwrap();

    let snap = engine.snapshot(12);
    assert_eq!(snap.groups.len(), 1);
    assert_eq!(snap.groups[0].size(), 2);
    assert!(snap.groups[0].scheduled);
    assert_eq!(snap.groups[0].members_by_kind["villager"], 2);
    assert_eq!(snap.active_count, 2);
    assert_eq!(snap.edge_count, 1);
    assert_eq!(snap.groups_of(&link()).len(), 1);
}
